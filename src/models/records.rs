//! Persisted rows the lifecycle workers read and write.
//!
//! Rows keep the nullable columns of the provider data. They are parsed into
//! the strongly typed [`OddsSnapshot`] only at the grading boundary.

use super::{BetType, GradeResult, MoneyLineOdds, Odds, OddsSnapshot, PointSpreadOdds, TotalsOdds};
use crate::error::OddsFieldError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Where a matchup is in its lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchupStatus {
    #[default]
    #[serde(rename = "NS")]
    Scheduled,
    #[serde(rename = "IP")]
    InProgress,
    #[serde(rename = "FT")]
    Finished,
}

/// A game that made it onto a daily slate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matchup {
    pub id: String,
    pub id_event: String,
    pub id_league: String,
    pub away_team: String,
    pub home_team: String,
    pub start_time: DateTime<Utc>,
    pub bet_type: BetType,
    pub draw_eligible: bool,
    #[serde(default)]
    pub draw_team: Option<String>,
    #[serde(default)]
    pub admin_selected: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub admin_unlocked: bool,
    #[serde(default)]
    pub status: MatchupStatus,
    #[serde(default)]
    pub away_score: Option<i32>,
    #[serde(default)]
    pub home_score: Option<i32>,
    #[serde(default)]
    pub points_total: Option<i32>,
}

/// A sportsbook line as quoted by the provider. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    #[serde(default)]
    pub home_odds: Option<Odds>,
    #[serde(default)]
    pub away_odds: Option<Odds>,
    #[serde(default)]
    pub draw_odds: Option<Odds>,
    #[serde(default)]
    pub over_odds: Option<Odds>,
    #[serde(default)]
    pub under_odds: Option<Odds>,
    #[serde(default)]
    pub home_spread: Option<Decimal>,
    #[serde(default)]
    pub away_spread: Option<Decimal>,
    #[serde(default)]
    pub total: Option<Decimal>,
}

impl Line {
    /// Parse the line into the odds shape for `bet_type`, rejecting null mandatory
    /// fields and zero prices outside `drawOdds`
    pub fn snapshot(&self, bet_type: BetType) -> Result<OddsSnapshot, OddsFieldError> {
        let price = |value: Option<Odds>, field: &'static str| -> Result<Odds, OddsFieldError> {
            match required(value, bet_type, field)? {
                0 => Err(OddsFieldError::ZeroPrice { bet_type, field }),
                odds => Ok(odds),
            }
        };

        let snapshot = match bet_type {
            BetType::MoneyLine => OddsSnapshot::MoneyLine(MoneyLineOdds {
                home_odds: price(self.home_odds, "homeOdds")?,
                away_odds: price(self.away_odds, "awayOdds")?,
                draw_odds: required(self.draw_odds, bet_type, "drawOdds")?,
            }),
            BetType::PointSpread => OddsSnapshot::PointSpread(PointSpreadOdds {
                home_odds: price(self.home_odds, "homeOdds")?,
                away_odds: price(self.away_odds, "awayOdds")?,
                home_spread: required(self.home_spread, bet_type, "homeSpread")?,
                away_spread: required(self.away_spread, bet_type, "awaySpread")?,
            }),
            BetType::Totals => OddsSnapshot::Totals(TotalsOdds {
                over_odds: price(self.over_odds, "overOdds")?,
                under_odds: price(self.under_odds, "underOdds")?,
                total: required(self.total, bet_type, "total")?,
            }),
        };

        Ok(snapshot)
    }

    /// Whether every mandatory field for `bet_type` is present and priced
    pub fn is_complete(&self, bet_type: BetType) -> bool {
        self.snapshot(bet_type).is_ok()
    }

    /// Whether any mandatory field for `bet_type` moved between two lines
    pub fn differs_from(&self, other: &Line, bet_type: BetType) -> bool {
        match bet_type {
            BetType::MoneyLine => {
                (self.home_odds, self.away_odds, self.draw_odds)
                    != (other.home_odds, other.away_odds, other.draw_odds)
            }
            BetType::PointSpread => {
                (self.home_odds, self.away_odds, self.home_spread, self.away_spread)
                    != (other.home_odds, other.away_odds, other.home_spread, other.away_spread)
            }
            BetType::Totals => {
                (self.over_odds, self.under_odds, self.total)
                    != (other.over_odds, other.under_odds, other.total)
            }
        }
    }
}

fn required<T>(value: Option<T>, bet_type: BetType, field: &'static str) -> Result<T, OddsFieldError> {
    value.ok_or(OddsFieldError::Missing { bet_type, field })
}

/// One stored version of a matchup's odds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsRecord {
    pub id: String,
    pub matchup_id: String,
    #[serde(default)]
    pub odds_game_id: Option<String>,
    pub sportsbook: String,
    pub line: Line,
    pub last_update: DateTime<Utc>,
}

/// A user's pick on one matchup, always a leg of some parlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pick {
    pub id: String,
    pub matchup_id: String,
    pub parlay_id: String,
    /// The odds row the pick was made against
    pub odds_id: String,
    pub pick: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub grade: Option<GradeResult>,
}

/// A wager over one or more picks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parlay {
    pub id: String,
    pub wager: Decimal,
    #[serde(default)]
    pub locked: bool,
    /// Set once the parlay is finalized
    #[serde(default)]
    pub points_awarded: Option<Decimal>,
}
