//! Daily slate construction.
//!
//! Games discovered on the schedule become candidates; the slate builder
//! keeps every admin-selected candidate and fills the remaining slots by
//! drawing leagues in proportion to their weight.

pub mod leagues;

pub use leagues::*;

use crate::models::{BetType, Matchup, MatchupStatus};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Days in a schedule window
const WEEK_LENGTH: i64 = 7;

/// A scheduled game that could be offered on a slate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub id_event: String,
    pub id_league: String,
    pub away_team: String,
    pub home_team: String,
    pub start_time: DateTime<Utc>,
    pub draw_eligible: bool,
    #[serde(default = "default_bet_type")]
    pub bet_type: BetType,
    #[serde(default)]
    pub admin_selected: bool,
}

fn default_bet_type() -> BetType {
    BetType::MoneyLine
}

impl Candidate {
    /// Turn the candidate into a trackable matchup
    pub fn into_matchup(self) -> Matchup {
        Matchup {
            id: self.id,
            id_event: self.id_event,
            id_league: self.id_league,
            // Assigned by an admin when a "win or draw" side is offered
            draw_team: None,
            away_team: self.away_team,
            home_team: self.home_team,
            start_time: self.start_time,
            bet_type: self.bet_type,
            draw_eligible: self.draw_eligible,
            admin_selected: self.admin_selected,
            locked: false,
            admin_unlocked: false,
            status: MatchupStatus::Scheduled,
            away_score: None,
            home_score: None,
            points_total: None,
        }
    }
}

/// Cumulative probability range `[start, end)` assigned to a league
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightRange {
    pub start: f64,
    pub end: f64,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Normalize the weights of the leagues playing today into consecutive ranges
/// over [0, 1], lightest league first. Leagues missing from the model get no range.
pub fn league_weight_ranges(
    leagues_with_games: &[&str],
    model: &WeightingModel,
) -> Vec<(String, WeightRange)> {
    let mut active: Vec<(&str, f64)> = model
        .iter()
        .filter(|(league, _)| leagues_with_games.contains(&league.as_str()))
        .map(|(league, weight)| (league.as_str(), *weight))
        .collect();

    let active_total: f64 = active.iter().map(|(_, weight)| weight).sum();
    if active_total <= 0.0 {
        return Vec::new();
    }

    active.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut lower_bound = 0.0;
    active
        .into_iter()
        .map(|(league, weight)| {
            let normalized = round3(weight / active_total);
            let range = WeightRange {
                start: round3(lower_bound),
                end: round3(lower_bound + normalized),
            };
            lower_bound += normalized;
            (league.to_string(), range)
        })
        .collect()
}

/// The league whose range contains `roll` (a draw from [0, 1))
pub fn pick_league(ranges: &[(String, WeightRange)], roll: f64) -> Option<&str> {
    ranges
        .iter()
        .find(|(_, range)| roll >= range.start && roll < range.end)
        .or_else(|| ranges.last())
        .map(|(league, _)| league.as_str())
}

/// Choose up to `slate_size` candidates: admin selections first, then a weighted
/// draw by league without replacement
pub fn build_slate<R: Rng>(
    candidates: Vec<Candidate>,
    model: &WeightingModel,
    slate_size: usize,
    rng: &mut R,
) -> Vec<Candidate> {
    let (mut slate, rest): (Vec<Candidate>, Vec<Candidate>) =
        candidates.into_iter().partition(|c| c.admin_selected);
    slate.truncate(slate_size);

    let mut by_league: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
    for candidate in rest {
        by_league
            .entry(candidate.id_league.clone())
            .or_default()
            .push(candidate);
    }

    while slate.len() < slate_size {
        let leagues: Vec<&str> = by_league
            .iter()
            .filter(|(_, games)| !games.is_empty())
            .map(|(league, _)| league.as_str())
            .collect();

        let ranges = league_weight_ranges(&leagues, model);
        let Some(league) = pick_league(&ranges, rng.gen::<f64>()).map(str::to_string) else {
            break;
        };

        if let Some(games) = by_league.get_mut(&league) {
            let index = rng.gen_range(0..games.len());
            slate.push(games.swap_remove(index));
        }
    }

    slate.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
    slate
}

/// The 7 `YYYYMMDD` dates of a schedule window starting `day_offset` days after `start`
pub fn upcoming_week_dates(start: NaiveDate, day_offset: i64) -> Vec<String> {
    (0..WEEK_LENGTH)
        .map(|i| {
            (start + Duration::days(i + day_offset))
                .format("%Y%m%d")
                .to_string()
        })
        .collect()
}

/// First and last instant of a local calendar day, in UTC
pub fn day_range(date: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let midnight = date.and_time(NaiveTime::MIN);
    let start = offset
        .from_local_datetime(&midnight)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight));
    let end = start + Duration::days(1) - Duration::milliseconds(1);
    (start, end)
}
