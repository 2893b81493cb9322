//! prioqd — priority queue broker daemon.

use std::time::Duration;

use anyhow::Result;

use prioq_api::ApiState;
use prioq_core::config::PrioqConfig;
use prioq_services::{sweeper, QueueEngine};

const DRAIN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = PrioqConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = PrioqConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        PrioqConfig::defaults_with_env()
    });

    tracing::info!(
        node_id = %config.node.node_id,
        max_payload_bytes = config.queue.max_payload_bytes,
        max_resident_per_topic = config.queue.max_resident_per_topic,
        max_priority = config.queue.max_priority,
        "prioqd starting"
    );

    let sweep_every = Duration::from_millis(config.queue.sweep_interval_ms);
    let engine = QueueEngine::new(config.queue.clone());

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let sweeper_task = tokio::spawn(sweeper::run(
        engine.clone(),
        sweep_every,
        shutdown_tx.subscribe(),
    ));

    let stats_printer = {
        let engine = engine.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(10));
            loop {
                interval.tick().await;
                let c = engine.counters();
                tracing::info!(
                    topics = engine.registry().len(),
                    enqueued = c.enqueued,
                    dequeued = c.dequeued,
                    rejected = c.rejected,
                    "engine snapshot"
                );
            }
        })
    };

    let mut api_task = {
        let state = ApiState::new(engine, config.node.node_id.clone(), shutdown_tx.clone());
        let api = config.api.clone();
        tokio::spawn(async move {
            prioq_api::serve(state, &api.listen_addr, api.port, api.max_body_bytes).await
        })
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    let graceful = tokio::select! {
        biased;
        _ = shutdown_rx.recv() => { tracing::info!("shutting down"); true }
        r = &mut api_task      => { tracing::error!("API server exited: {:?}", r); false }
        r = sweeper_task       => { tracing::error!("sweeper exited: {:?}", r); false }
        r = stats_printer      => { tracing::error!("stats printer exited: {:?}", r); false }
    };

    // The API saw the same broadcast; let it finish in-flight requests.
    if graceful {
        match prioq_api::drain(api_task, DRAIN_GRACE).await {
            Ok(()) => tracing::info!("API drained"),
            Err(e) => tracing::warn!(error = %e, "API drain incomplete"),
        }
    }

    Ok(())
}
