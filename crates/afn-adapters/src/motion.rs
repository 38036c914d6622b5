//! HTTP motion source.
//!
//! Reads a JSON list of camera event items, each a `{name, value}` pair.
//! An item whose name contains "motion" (any case) is a motion indicator,
//! and its value reports motion when it reads `true` or `1`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use afn_control::{ControlResult, MotionReading, MotionSource};

use crate::error::AdapterResult;
use crate::http::{ensure_success, Credentials};

#[derive(Debug, Clone, Deserialize)]
pub struct EventItem {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Value")]
    pub value: Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MotionPayload {
    Items(Vec<EventItem>),
    Wrapped { items: Vec<EventItem> },
}

fn value_reports_motion(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s == "1"
        }
        _ => false,
    }
}

/// Reduce event items to a motion reading.
///
/// No indicator at all yields an unknown reading, which callers treat as
/// "no change".
pub fn parse_motion_items(items: &[EventItem]) -> MotionReading {
    let mut has_indicator = false;
    let mut names = Vec::new();

    for item in items {
        if item.name.is_empty() || !item.name.to_lowercase().contains("motion") {
            continue;
        }
        has_indicator = true;
        if value_reports_motion(&item.value) {
            names.push(item.name.clone());
        }
    }

    match (has_indicator, names.is_empty()) {
        (false, _) => MotionReading::unknown(),
        (true, true) => MotionReading::clear(),
        (true, false) => MotionReading::detected(names),
    }
}

pub struct HttpMotionSource {
    client: Client,
    url: String,
    credentials: Option<Credentials>,
}

impl HttpMotionSource {
    pub fn new(client: Client, url: impl Into<String>, credentials: Option<Credentials>) -> Self {
        Self {
            client,
            url: url.into(),
            credentials,
        }
    }

    async fn fetch(&self) -> AdapterResult<MotionReading> {
        let mut request = self.client.get(&self.url);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }
        let response = ensure_success(request.send().await?).await?;
        let body = response.bytes().await?;
        let payload: MotionPayload = serde_json::from_slice(&body)?;

        let items = match payload {
            MotionPayload::Items(items) | MotionPayload::Wrapped { items } => items,
        };
        Ok(parse_motion_items(&items))
    }
}

#[async_trait]
impl MotionSource for HttpMotionSource {
    async fn poll(&self) -> ControlResult<MotionReading> {
        Ok(self.fetch().await?)
    }
}
