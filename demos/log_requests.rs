//! Logs a couple of requests to stdout as text and to `tracing`.
//!
//! This example shows how to:
//! - Build GET and POST requests fluently
//! - Attach a sink that prints every exchange with colored status codes
//! - Filter a sink down to response events only
//!
//! Run with: `cargo run --example log_requests`

use outbound::format::AnsiFormatter;
use outbound::sink::{OutputFormat, TracingSink, WriterSink};
use outbound::{Error, Flag, Request};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("outbound=debug,log_requests=info")
        .init();

    let console = Arc::new(WriterSink::new(std::io::stdout()).formatter(AnsiFormatter));

    println!("=== GET ===");
    let post = Request::new()
        .with_url("https://jsonplaceholder.typicode.com/posts/1")
        .with_logger(console.clone())
        .fetch_json_with_meta::<Post>()
        .await?;
    println!("Title: {} ({:?})", post.data.title, post.latency);
    println!();

    println!("=== POST ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };
    let created = Request::new()
        .as_post()
        .with_url("https://jsonplaceholder.typicode.com/posts")
        .with_json_body(&new_post)
        .with_logger(console)
        .fetch_json::<Post>()
        .await?;
    println!("Created post ID: {}", created.id);
    println!();

    println!("=== Responses only, as JSON ===");
    let json_sink = Arc::new(
        WriterSink::new(std::io::stdout())
            .format(OutputFormat::Json)
            .with_flags([Flag::RESPONSE]),
    );
    Request::new()
        .with_url("https://jsonplaceholder.typicode.com/posts?userId=1")
        .with_logger(json_sink)
        .execute()
        .await?;

    println!("=== Through tracing ===");
    Request::new()
        .as_delete()
        .with_url("https://jsonplaceholder.typicode.com/posts/1")
        .with_logger(Arc::new(TracingSink::new()))
        .execute()
        .await?;

    Ok(())
}
