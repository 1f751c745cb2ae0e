use crate::domain::RawRound;
use crate::error::{Error, Result};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Source of round history snapshots. Each call returns the full list the
/// feed currently exposes, in whatever order the feed delivers it.
pub trait HistoryFeed {
    fn fetch(&self) -> impl Future<Output = Result<Vec<RawRound>>> + Send;
}

/// History feed served as a JSON array over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpFeed {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl HistoryFeed for HttpFeed {
    async fn fetch(&self) -> Result<Vec<RawRound>> {
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            return Err(Error::Status(resp.status().as_u16()));
        }
        let data: Vec<Value> = resp.json().await?;
        parse_feed(&data)
    }
}

/// Field names used by the live feed, then their English aliases.
const ROUND_KEYS: [&str; 2] = ["Phien", "round_id"];
const RESULT_KEYS: [&str; 2] = ["Ket_qua", "result"];
const TIME_KEYS: [&str; 2] = ["Thoigian", "timestamp"];

fn field<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| item.get(*k)).filter(|v| !v.is_null())
}

/// Parse a feed payload. Any record without a usable round id or result
/// rejects the whole payload. Results stay unparsed strings here;
/// `normalize_snapshot` turns them into multipliers.
pub fn parse_feed(data: &[Value]) -> Result<Vec<RawRound>> {
    data.iter()
        .enumerate()
        .map(|(i, item)| {
            let round_id = field(item, &ROUND_KEYS)
                .and_then(|v| match v {
                    Value::Number(n) => n.as_u64(),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                })
                .ok_or_else(|| Error::malformed(format!("record {}: missing or invalid round id", i)))?;

            let result = match field(item, &RESULT_KEYS) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => {
                    return Err(Error::malformed(format!(
                        "round {}: missing or invalid result",
                        round_id
                    )))
                }
            };

            let timestamp = match field(item, &TIME_KEYS) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };

            Ok(RawRound {
                round_id,
                result,
                timestamp,
            })
        })
        .collect()
}
