//! Introspection commands: topics, topic, status, shutdown.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json, post_json, topic_url};

#[derive(Deserialize)]
struct TopicsResponse {
    topics: Vec<TopicStats>,
}

#[derive(Deserialize)]
struct TopicStats {
    topic: String,
    ready: usize,
    delayed: usize,
    leased: usize,
    lanes: usize,
    last_id: u64,
    redelivered: u64,
}

#[derive(Deserialize)]
struct StatusResponse {
    node_id: String,
    topics: usize,
    uptime_secs: u64,
    counters: Counters,
}

#[derive(Deserialize)]
struct Counters {
    enqueued: u64,
    dequeued: u64,
    acked: u64,
    nacked: u64,
    rejected: u64,
}

#[derive(Deserialize)]
struct ShutdownResponse {
    message: String,
}

fn print_topic(t: &TopicStats) {
    println!("  ┌─ {}", t.topic);
    println!("  │  ready       : {}", t.ready);
    println!("  │  delayed     : {}", t.delayed);
    println!("  │  leased      : {}", t.leased);
    println!("  │  lanes       : {}", t.lanes);
    println!("  │  last id     : {}", t.last_id);
    println!("  └─ redelivered : {}", t.redelivered);
}

pub async fn cmd_topics(port: u16) -> Result<()> {
    let resp: TopicsResponse = get_json(&format!("{}/topics", base_url(port))).await?;

    if resp.topics.is_empty() {
        println!("No topics yet.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Topics ({})", resp.topics.len());
    println!("═══════════════════════════════════════");
    for t in &resp.topics {
        print_topic(t);
    }

    Ok(())
}

pub async fn cmd_topic(port: u16, topic: &str) -> Result<()> {
    let t: TopicStats = get_json(&topic_url(port, topic, None)?).await?;
    print_topic(&t);
    Ok(())
}

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  prioqd Status");
    println!("═══════════════════════════════════════");
    println!("  Node      : {}", resp.node_id);
    println!("  Uptime    : {}s", resp.uptime_secs);
    println!("  Topics    : {}", resp.topics);
    println!("  Enqueued  : {}", resp.counters.enqueued);
    println!("  Dequeued  : {}", resp.counters.dequeued);
    println!("  Acked     : {}", resp.counters.acked);
    println!("  Nacked    : {}", resp.counters.nacked);
    println!("  Rejected  : {}", resp.counters.rejected);

    Ok(())
}

pub async fn cmd_shutdown(port: u16) -> Result<()> {
    let resp: ShutdownResponse = post_json(&format!("{}/daemon/shutdown", base_url(port))).await?;
    println!("{}", resp.message);
    Ok(())
}
