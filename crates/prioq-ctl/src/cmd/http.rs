//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result, anyhow, bail};
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}/api", port)
}

/// `/api/topics/{topic}[/{action}]` with the topic percent-encoded as one
/// path segment, so names holding `/`, `?` or `#` reach the right topic.
pub fn topic_url(port: u16, topic: &str, action: Option<&str>) -> Result<String> {
    let mut url = Url::parse(&base_url(port)).context("invalid base url")?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| anyhow!("base url cannot take a path"))?;
        segments.push("topics").push(topic);
        if let Some(action) = action {
            segments.push(action);
        }
    }
    Ok(url.into())
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    kind: String,
}

async fn decode<R>(resp: reqwest::Response) -> Result<R>
where
    R: for<'de> Deserialize<'de>,
{
    let status = resp.status();
    if !status.is_success() {
        let body: ErrorBody = resp
            .json()
            .await
            .with_context(|| format!("request failed with {status}"))?;
        bail!("{} ({}): {}", status, body.kind, body.error);
    }
    resp.json::<R>().await.context("failed to parse response")
}

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    let resp = reqwest::get(url)
        .await
        .with_context(|| format!("failed to connect to prioqd at {} — is it running?", url))?;
    decode(resp).await
}

pub async fn post_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    let resp = reqwest::Client::new()
        .post(url)
        .send()
        .await
        .with_context(|| format!("failed to connect to prioqd at {} — is it running?", url))?;
    decode(resp).await
}

pub async fn post_json_body<T, R>(url: &str, body: &T) -> Result<R>
where
    T: Serialize,
    R: for<'de> Deserialize<'de>,
{
    let resp = reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| format!("failed to connect to prioqd at {} — is it running?", url))?;
    decode(resp).await
}
