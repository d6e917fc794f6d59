use crate::models::BetType;
use crate::slate::{is_draw_eligible, Candidate, League};
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

/// Only games that have not started can go on a slate
const STATUS_SCHEDULED: &str = "STATUS_SCHEDULED";

#[derive(Debug, Deserialize)]
struct ScoreboardResponse {
    #[serde(default)]
    leagues: Vec<ScheduleLeague>,
    #[serde(default)]
    events: Vec<ScheduleEvent>,
}

#[derive(Debug, Deserialize)]
struct ScheduleLeague {
    abbreviation: String,
}

#[derive(Debug, Deserialize)]
struct ScheduleEvent {
    id: String,
    date: String,
    #[serde(default)]
    name: String,
    status: EventStatus,
    #[serde(default)]
    competitions: Vec<Competition>,
}

#[derive(Debug, Deserialize)]
struct EventStatus {
    #[serde(rename = "type")]
    status_type: StatusType,
}

#[derive(Debug, Deserialize)]
struct StatusType {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Competition {
    #[serde(default)]
    competitors: Vec<Competitor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Competitor {
    home_away: String,
    team: Team,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Team {
    display_name: String,
}

/// Event dates come as RFC 3339, sometimes without seconds (`2023-03-01T02:30Z`)
fn parse_event_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|date| date.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ").map(|date| date.and_utc())
        })
        .ok()
}

/// "Away at Home" event names, used when competitors are not listed
fn teams_from_name(name: &str) -> Option<(String, String)> {
    let (away, home) = name.split_once(" at ")?;
    Some((away.trim().to_string(), home.trim().to_string()))
}

fn teams(event: &ScheduleEvent) -> Option<(String, String)> {
    let competitors = event
        .competitions
        .first()
        .map(|c| c.competitors.as_slice())
        .unwrap_or_default();
    let side = |home_away: &str| {
        competitors
            .iter()
            .find(|c| c.home_away == home_away)
            .map(|c| c.team.display_name.clone())
    };

    match (side("away"), side("home")) {
        (Some(away), Some(home)) => Some((away, home)),
        _ => teams_from_name(&event.name),
    }
}

/// Scheduled games from a scoreboard body whose local date falls inside `week`
pub fn parse_candidates(
    body: &str,
    league: &League,
    week: &[String],
    offset: FixedOffset,
) -> Result<Vec<Candidate>> {
    let response: ScoreboardResponse =
        serde_json::from_str(body).context("Failed to parse schedule response")?;

    let abbreviation = response
        .leagues
        .first()
        .map(|l| l.abbreviation.as_str())
        .unwrap_or_default();
    if abbreviation.is_empty() {
        return Ok(Vec::new());
    }

    let mut candidates = Vec::new();
    for event in response.events {
        let Some(start_time) = parse_event_date(&event.date) else {
            warn!(event_id = %event.id, date = %event.date, "Unreadable event date");
            continue;
        };
        let game_date = start_time.with_timezone(&offset).format("%Y%m%d").to_string();
        if !week.contains(&game_date) || event.status.status_type.name != STATUS_SCHEDULED {
            continue;
        }

        let Some((away_team, home_team)) = teams(&event) else {
            warn!(event_id = %event.id, name = %event.name, "Could not read teams from event");
            continue;
        };

        candidates.push(Candidate {
            id: Uuid::new_v4().to_string(),
            id_event: event.id,
            id_league: league.id.to_string(),
            away_team,
            home_team,
            start_time,
            draw_eligible: is_draw_eligible(league.id),
            bet_type: BetType::MoneyLine,
            admin_selected: false,
        });
    }

    Ok(candidates)
}

/// Client for the weekly schedule provider
pub struct ScheduleApiClient {
    client: Client,
    base_url: String,
}

impl ScheduleApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Fetch one league's scheduled games for every date in `week`.
    /// A failed date is logged and skipped.
    pub async fn fetch_candidates(
        &self,
        league: &League,
        week: &[String],
        offset: FixedOffset,
    ) -> Result<Vec<Candidate>> {
        let url = format!("{}/{}/scoreboard", self.base_url, league.slug);
        let mut candidates = Vec::new();

        for date in week {
            let response = match self
                .client
                .get(&url)
                .query(&[("dates", date.as_str())])
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => response,
                Ok(response) => {
                    warn!(league = league.slug, date = %date, status = %response.status(), "Schedule API returned error");
                    continue;
                }
                Err(e) => {
                    warn!(league = league.slug, date = %date, error = %e, "Schedule request failed");
                    continue;
                }
            };

            let body = response
                .text()
                .await
                .context("Failed to read schedule response")?;
            candidates.extend(parse_candidates(&body, league, week, offset)?);
        }

        // Neighbouring dates can list the same game
        candidates.sort_by(|a, b| a.id_event.cmp(&b.id_event));
        candidates.dedup_by(|a, b| a.id_event == b.id_event);
        Ok(candidates)
    }
}
