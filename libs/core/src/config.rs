use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};

/// Process-wide configuration, read from the environment once at startup
/// and shared read-only behind an `Arc` from then on.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Slack signing secret used to verify inbound deliveries.
    pub signing_secret: String,
    /// Bot token for outbound Slack Web API calls.
    pub bot_token: String,
    /// Channel that receives emoji / channel announcements.
    pub notify_channel: String,
    /// DocBase team domain, e.g. `acme` in `acme.docbase.io`.
    pub docbase_domain: String,
    /// DocBase API token.
    pub docbase_token: String,
    /// Override for the Slack API base URL, mainly for tests.
    pub slack_api_base: Option<String>,
    /// Override for the DocBase API base URL, mainly for tests.
    pub docbase_api_base: Option<String>,
    /// Listen address for the local HTTP entry point.
    pub bind: SocketAddr,
}

pub const DEFAULT_BIND: &str = "0.0.0.0:8081";

impl RelayConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            signing_secret: required("SLACK_SIGNING_SECRET")?,
            bot_token: required("SLACK_BOT_TOKEN")?,
            notify_channel: required("NOTIFY_CHANNEL")?,
            docbase_domain: required("DOCBASE_DOMAIN")?,
            docbase_token: required("DOCBASE_TOKEN")?,
            slack_api_base: env::var("SLACK_API_BASE").ok(),
            docbase_api_base: env::var("DOCBASE_API_BASE").ok(),
            bind: env::var("BIND")
                .unwrap_or_else(|_| DEFAULT_BIND.into())
                .parse()
                .context("BIND is not a socket address")?,
        })
    }
}

fn required(name: &'static str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} required"))
}
