//! Producer commands.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::http::{post_json_body, topic_url};

#[derive(Serialize)]
struct EnqueueRequest {
    meta: String,
    payload: String,
    priority: i64,
    deliver_after_ms: u64,
}

#[derive(Deserialize)]
struct EnqueueResponse {
    message_id: u64,
    node_id: String,
}

pub struct EnqueueArgs<'a> {
    pub topic: &'a str,
    pub meta: &'a str,
    pub payload: &'a [u8],
    pub priority: i64,
    pub after_ms: u64,
    /// Send the message this many times; meta gets a `-{i}` suffix when > 1.
    pub repeat: u32,
}

pub async fn cmd_enqueue(port: u16, args: EnqueueArgs<'_>) -> Result<()> {
    let url = topic_url(port, args.topic, Some("enqueue"))?;
    let payload = hex::encode(args.payload);
    let started = std::time::Instant::now();

    for i in 1..=args.repeat.max(1) {
        let meta = if args.repeat > 1 {
            format!("{}-{}", args.meta, i)
        } else {
            args.meta.to_string()
        };
        let req = EnqueueRequest {
            meta,
            payload: payload.clone(),
            priority: args.priority,
            deliver_after_ms: args.after_ms,
        };
        let resp: EnqueueResponse = post_json_body(&url, &req).await?;
        if args.repeat <= 1 {
            println!("Enqueued:");
            println!("  ID   : {}", resp.message_id);
            println!("  Node : {}", resp.node_id);
        }
    }

    if args.repeat > 1 {
        let secs = started.elapsed().as_secs_f64();
        println!(
            "Enqueued {} messages to '{}' in {:.2}s ({:.0} msg/s)",
            args.repeat,
            args.topic,
            secs,
            args.repeat as f64 / secs.max(f64::EPSILON)
        );
    }

    Ok(())
}
