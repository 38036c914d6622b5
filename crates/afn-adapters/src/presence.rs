//! HTTP presence source.
//!
//! Polls an endpoint that lists hosts currently known to the network and
//! keeps only the configured targets that are online. Accepted payloads:
//! a bare list of host names, a list of `{hostname, status}` objects, or an
//! object wrapping that list under `devices`.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use afn_control::{ControlResult, PresenceSource};

use crate::error::AdapterResult;
use crate::http::ensure_success;

#[derive(Debug, Clone, Deserialize)]
pub struct HostEntry {
    #[serde(alias = "hostName", alias = "name")]
    pub hostname: String,
    /// Missing status means the host is listed because it is online
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PresencePayload {
    Names(Vec<String>),
    Hosts(Vec<HostEntry>),
    Wrapped { devices: Vec<HostEntry> },
}

impl PresencePayload {
    fn into_hosts(self) -> Vec<HostEntry> {
        match self {
            PresencePayload::Names(names) => names
                .into_iter()
                .map(|hostname| HostEntry {
                    hostname,
                    status: None,
                })
                .collect(),
            PresencePayload::Hosts(hosts) | PresencePayload::Wrapped { devices: hosts } => hosts,
        }
    }
}

/// Keep online hosts whose trimmed name matches a target, ignoring case.
/// The result is sorted.
pub fn filter_online(hosts: &[HostEntry], targets: &[String]) -> Vec<String> {
    let wanted: HashSet<String> = targets
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    let mut online: Vec<String> = hosts
        .iter()
        .filter(|host| {
            host.status
                .as_deref()
                .map_or(true, |status| status.trim().eq_ignore_ascii_case("online"))
        })
        .map(|host| host.hostname.trim())
        .filter(|name| !name.is_empty() && wanted.contains(&name.to_lowercase()))
        .map(str::to_string)
        .collect();
    online.sort();
    online.dedup();
    online
}

pub struct HttpPresenceSource {
    client: Client,
    url: String,
    targets: Vec<String>,
}

impl HttpPresenceSource {
    pub fn new(client: Client, url: impl Into<String>, targets: Vec<String>) -> Self {
        Self {
            client,
            url: url.into(),
            targets,
        }
    }

    async fn fetch(&self) -> AdapterResult<Vec<String>> {
        let response = self.client.get(&self.url).send().await?;
        let response = ensure_success(response).await?;
        let body = response.bytes().await?;
        let payload: PresencePayload = serde_json::from_slice(&body)?;

        let hosts = payload.into_hosts();
        let online = filter_online(&hosts, &self.targets);
        debug!(hosts = hosts.len(), online = ?online, "Presence hosts fetched");
        Ok(online)
    }
}

#[async_trait]
impl PresenceSource for HttpPresenceSource {
    async fn fetch_online(&self) -> ControlResult<Vec<String>> {
        Ok(self.fetch().await?)
    }
}
