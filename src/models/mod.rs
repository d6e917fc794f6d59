pub mod records;

pub use records::*;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// American odds (e.g., -110, +150). Zero means "no price offered".
pub type Odds = i32;

/// The three markets a matchup can be offered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BetType {
    #[serde(rename = "money-line")]
    MoneyLine,
    #[serde(rename = "pointspread", alias = "point-spread")]
    PointSpread,
    #[serde(rename = "totals")]
    Totals,
}

impl BetType {
    /// Wire name used by the lines provider and in persisted rows
    pub fn as_str(&self) -> &'static str {
        match self {
            BetType::MoneyLine => "money-line",
            BetType::PointSpread => "pointspread",
            BetType::Totals => "totals",
        }
    }
}

impl fmt::Display for BetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "money-line" | "moneyline" => Ok(BetType::MoneyLine),
            "pointspread" | "point-spread" => Ok(BetType::PointSpread),
            "totals" => Ok(BetType::Totals),
            other => Err(format!("Invalid bet type: {other}")),
        }
    }
}

/// Money-line prices. `draw_odds` is 0 when no draw market is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyLineOdds {
    pub home_odds: Odds,
    pub away_odds: Odds,
    pub draw_odds: Odds,
}

/// Point-spread prices. `away_spread` is always `-home_spread`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointSpreadOdds {
    pub home_odds: Odds,
    pub away_odds: Odds,
    pub home_spread: Decimal,
    pub away_spread: Decimal,
}

/// Over/under prices around a points total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalsOdds {
    pub over_odds: Odds,
    pub under_odds: Odds,
    pub total: Decimal,
}

/// The odds a pick was made against, one shape per bet type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OddsSnapshot {
    MoneyLine(MoneyLineOdds),
    PointSpread(PointSpreadOdds),
    Totals(TotalsOdds),
}

impl OddsSnapshot {
    /// The bet type this shape belongs to
    pub fn bet_type(&self) -> BetType {
        match self {
            OddsSnapshot::MoneyLine(_) => BetType::MoneyLine,
            OddsSnapshot::PointSpread(_) => BetType::PointSpread,
            OddsSnapshot::Totals(_) => BetType::Totals,
        }
    }
}

/// Everything needed to settle one pick on a finished game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchupOutcome {
    pub away_score: i32,
    pub home_score: i32,
    pub points_total: i32,
    #[serde(alias = "oddsType")]
    pub bet_type: BetType,
    pub draw_eligible: bool,
    #[serde(default)]
    pub draw_team: Option<String>,
    #[serde(alias = "strAwayTeam")]
    pub away_team: String,
    #[serde(alias = "strHomeTeam")]
    pub home_team: String,
    /// "over", "under", or a team name
    pub pick: String,
    pub odds: OddsSnapshot,
}

impl MatchupOutcome {
    /// Assemble an outcome from a finished matchup row, its final score and one pick
    pub fn new(
        matchup: &Matchup,
        away_score: i32,
        home_score: i32,
        odds: OddsSnapshot,
        pick: &str,
    ) -> Self {
        Self {
            away_score,
            home_score,
            points_total: away_score + home_score,
            bet_type: matchup.bet_type,
            draw_eligible: matchup.draw_eligible,
            draw_team: matchup.draw_team.clone(),
            away_team: matchup.away_team.clone(),
            home_team: matchup.home_team.clone(),
            pick: pick.to_string(),
            odds,
        }
    }
}

/// Settlement of a single pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickResult {
    Win,
    Loss,
    Push,
}

impl fmt::Display for PickResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PickResult::Win => f.write_str("win"),
            PickResult::Loss => f.write_str("loss"),
            PickResult::Push => f.write_str("push"),
        }
    }
}

/// Result of grading a pick. Winning odds are present only on a win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "GradeRow")]
pub struct GradeResult {
    #[serde(rename = "result")]
    outcome: PickResult,
    winning_odds: Option<Odds>,
}

/// A grade as stored, before its odds are checked against its result
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GradeRow {
    result: PickResult,
    #[serde(default)]
    winning_odds: Option<Odds>,
}

impl TryFrom<GradeRow> for GradeResult {
    type Error = String;

    fn try_from(row: GradeRow) -> Result<Self, Self::Error> {
        match (row.result, row.winning_odds) {
            (PickResult::Win, Some(odds)) if odds != 0 => Ok(GradeResult::win(odds)),
            (PickResult::Loss, None) => Ok(GradeResult::loss()),
            (PickResult::Push, None) => Ok(GradeResult::push()),
            (result, odds) => Err(format!(
                "a {result} grade cannot carry winning odds of {odds:?}"
            )),
        }
    }
}

impl GradeResult {
    pub fn win(winning_odds: Odds) -> Self {
        Self {
            outcome: PickResult::Win,
            winning_odds: Some(winning_odds),
        }
    }

    pub fn loss() -> Self {
        Self {
            outcome: PickResult::Loss,
            winning_odds: None,
        }
    }

    pub fn push() -> Self {
        Self {
            outcome: PickResult::Push,
            winning_odds: None,
        }
    }

    pub fn outcome(&self) -> PickResult {
        self.outcome
    }

    pub fn winning_odds(&self) -> Option<Odds> {
        self.winning_odds
    }
}
