use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use common::config::SupabaseConfig;
use common::{ChangePublisher, Error, Result, StrategyStatus};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Sentinel for empty string fields, so the remote table never has to
/// distinguish NULL from empty-string.
const EMPTY_SENTINEL: &str = "EMPTY";

/// REST publisher upserting one row per (strategy_name, instrument) into a
/// Supabase table. Inert when URL or key are missing: the monitor runs
/// fine without a configured remote store.
pub struct SupabasePublisher {
    endpoint: String,
    key: String,
    http: Client,
}

impl SupabasePublisher {
    /// Resolve URL and key (environment first, config second; the service
    /// role key falls back to the anon key) and build the upsert endpoint.
    pub fn from_config(cfg: &SupabaseConfig) -> Self {
        let url = cfg.resolved_url();
        let key = cfg.resolved_key();
        if url.is_empty() {
            warn!("Supabase URL not configured; publishing disabled");
        } else if key.is_empty() {
            warn!("Supabase API key not configured; publishing disabled");
        }

        Self {
            endpoint: build_endpoint(&url, &cfg.table),
            key,
            http: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty() && !self.key.is_empty()
    }
}

#[async_trait]
impl ChangePublisher for SupabasePublisher {
    async fn publish(&self, status: &StrategyStatus) -> Result<()> {
        if !self.is_configured() {
            return Ok(());
        }

        let payload = upsert_payload(status);
        debug!(endpoint = %self.endpoint, %payload, "Supabase upsert");

        let resp = self
            .http
            .post(&self.endpoint)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("Prefer", "resolution=merge-duplicates")
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let code = resp.status();
        if !code.is_success() {
            // Reported, never escalated; the monitor must keep tailing.
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %code, body = %body, "Supabase upsert returned unexpected status");
        }
        Ok(())
    }
}

fn build_endpoint(url: &str, table: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    format!(
        "{}/rest/v1/{table}?on_conflict=strategy_name,instrument",
        url.trim_end_matches('/')
    )
}

fn upsert_payload(status: &StrategyStatus) -> serde_json::Value {
    json!({
        "strategy_name": status.name,
        "instrument": non_empty(&status.instrument),
        "enabled": status.enabled,
        "connection": non_empty(&status.connection),
        "updated_at": Utc::now().to_rfc3339(),
    })
}

fn non_empty(value: &str) -> &str {
    if value.is_empty() {
        EMPTY_SENTINEL
    } else {
        value
    }
}
