//! Text formatting strategies used when rendering events as text.

use colored::Colorize;

/// Formatting hooks consulted by [`Event::write_text`](crate::event::Event::write_text).
///
/// The formatter is passed explicitly on every render so events carry no
/// dependency on global display state.
pub trait TextFormatter: Send + Sync {
    /// Renders a status code for display.
    fn colorize_status_code(&self, status_code: u16) -> String;
}

/// A formatter that writes status codes as plain numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

impl TextFormatter for PlainFormatter {
    fn colorize_status_code(&self, status_code: u16) -> String {
        status_code.to_string()
    }
}

/// A formatter that colors status codes with ANSI escapes.
///
/// Codes below 300 are green, 300-499 yellow and everything else red. Honors the
/// `colored` crate's global override and `NO_COLOR` handling.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiFormatter;

impl TextFormatter for AnsiFormatter {
    fn colorize_status_code(&self, status_code: u16) -> String {
        let text = status_code.to_string();
        match status_code {
            0..=299 => text.green().to_string(),
            300..=499 => text.yellow().to_string(),
            _ => text.red().to_string(),
        }
    }
}
