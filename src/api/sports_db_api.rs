use crate::orchestrator::{ScoreEvent, ScoreFeed};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

/// Event lookup response. `events` is null or a string when the id is unknown.
#[derive(Debug, Deserialize)]
struct LookupEventResponse {
    #[serde(default)]
    events: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventData {
    #[serde(default)]
    str_status: Option<String>,
    #[serde(default)]
    int_home_score: Option<Value>,
    #[serde(default)]
    int_away_score: Option<Value>,
}

/// Scores arrive as strings or numbers depending on the league
fn score_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Pull the first event out of a lookup response body
pub fn parse_lookup_event(body: &str) -> Result<Option<ScoreEvent>> {
    let response: LookupEventResponse =
        serde_json::from_str(body).context("Failed to parse event lookup response")?;

    let Value::Array(events) = response.events else {
        return Ok(None);
    };
    let Some(first) = events.into_iter().next() else {
        return Ok(None);
    };

    let event: EventData =
        serde_json::from_value(first).context("Failed to parse event data")?;

    Ok(Some(ScoreEvent {
        status: event.str_status,
        away_score: score_text(event.int_away_score),
        home_score: score_text(event.int_home_score),
    }))
}

/// Client for the live score provider
pub struct SportsDbClient {
    client: Client,
    base_url: String,
}

impl SportsDbClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub async fn lookup_event(&self, id_event: &str) -> Result<Option<ScoreEvent>> {
        let url = format!("{}/lookupevent.php", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("id", id_event)])
            .send()
            .await
            .context("Failed to fetch event from live score API")?;

        if !response.status().is_success() {
            anyhow::bail!("Live score API returned error: {}", response.status());
        }

        let body = response
            .text()
            .await
            .context("Failed to read live score response")?;
        parse_lookup_event(&body)
    }
}

#[async_trait]
impl ScoreFeed for SportsDbClient {
    async fn lookup_event(&self, id_event: &str) -> Result<Option<ScoreEvent>> {
        SportsDbClient::lookup_event(self, id_event).await
    }
}
