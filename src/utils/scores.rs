use anyhow::{anyhow, Result};

/// Status strings reported by the live score provider
const NOT_STARTED: &[&str] = &["NS", "Not Started"];
const FINISHED: &[&str] = &["FT", "AOT", "AET", "PEN", "Match Finished", "AP"];
const VOIDED: &[&str] = &["POST", "PST", "SUSP", "CANC", "ABD", "AWD", "WO", "INTR", "INT"];

/// What a provider status means for the lifecycle of a matchup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    NotStarted,
    InProgress,
    Finished,
    /// Postponed, suspended, cancelled, abandoned or awarded
    Voided,
}

impl EventStatus {
    pub fn classify(status: &str) -> Self {
        if VOIDED.contains(&status) {
            EventStatus::Voided
        } else if NOT_STARTED.contains(&status) {
            EventStatus::NotStarted
        } else if FINISHED.contains(&status) {
            EventStatus::Finished
        } else {
            EventStatus::InProgress
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Away,
    Home,
    Draw,
}

/// Parse a provider score string. "0" is a valid score; blanks are not.
pub fn parse_score(raw: &str) -> Result<i32> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| anyhow!("Invalid input: \"{}\" is not a valid number.", raw))
}

/// Parse both raw scores, away first
pub fn parse_scores(away_raw: &str, home_raw: &str) -> Result<(i32, i32)> {
    Ok((parse_score(away_raw)?, parse_score(home_raw)?))
}

pub fn winner(away_score: i32, home_score: i32) -> Winner {
    if away_score == home_score {
        Winner::Draw
    } else if away_score > home_score {
        Winner::Away
    } else {
        Winner::Home
    }
}
