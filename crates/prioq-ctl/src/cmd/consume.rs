//! Consumer commands: dequeue, ack, nack.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::http::{post_json_body, topic_url};

#[derive(Serialize)]
struct DequeueRequest {
    count: i64,
    lease_ms: u64,
}

#[derive(Deserialize)]
struct DequeueResponse {
    items: Vec<ItemJson>,
}

#[derive(Deserialize)]
struct ItemJson {
    message_id: u64,
    meta: String,
    payload: String,
    priority: i32,
}

#[derive(Serialize)]
struct AckRequest {
    message_id: u64,
}

#[derive(Serialize)]
struct NackRequest {
    message_id: u64,
    meta: Option<String>,
    deliver_after_ms: u64,
}

#[derive(Deserialize)]
struct SettleResponse {}

pub async fn cmd_dequeue(port: u16, topic: &str, count: i64, lease_ms: u64) -> Result<()> {
    let req = DequeueRequest { count, lease_ms };
    let resp: DequeueResponse =
        post_json_body(&topic_url(port, topic, Some("dequeue"))?, &req).await?;

    if resp.items.is_empty() {
        println!("nothing...");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  {} message(s) from '{}'", resp.items.len(), topic);
    println!("═══════════════════════════════════════");

    for m in &resp.items {
        println!("  ┌─ #{} [priority {}]", m.message_id, m.priority);
        println!("  │  meta    : {}", m.meta);
        println!("  └─ payload : {} bytes", m.payload.len() / 2);
    }
    if lease_ms > 0 {
        println!("\n  Leased for {} ms — ack or nack before it expires.", lease_ms);
    }

    Ok(())
}

pub async fn cmd_ack(port: u16, topic: &str, message_id: u64) -> Result<()> {
    let _: SettleResponse = post_json_body(
        &topic_url(port, topic, Some("ack"))?,
        &AckRequest { message_id },
    )
    .await?;
    println!("Acked message {} on '{}'.", message_id, topic);
    Ok(())
}

pub async fn cmd_nack(
    port: u16,
    topic: &str,
    message_id: u64,
    meta: Option<String>,
    after_ms: u64,
) -> Result<()> {
    let req = NackRequest {
        message_id,
        meta,
        deliver_after_ms: after_ms,
    };
    let _: SettleResponse =
        post_json_body(&topic_url(port, topic, Some("nack"))?, &req).await?;
    println!("Returned message {} to '{}'.", message_id, topic);
    Ok(())
}
