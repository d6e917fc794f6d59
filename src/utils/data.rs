use crate::models::{Matchup, Pick};
use crate::store::SlateState;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Save every row to a JSON state file
pub fn save_state(state: &SlateState, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(state).context("Failed to serialize slate state")?;
    std::fs::write(path, json).context("Failed to write state file")?;

    info!(
        path = %path.display(),
        matchups = state.matchups.len(),
        picks = state.picks.len(),
        "State saved"
    );
    Ok(())
}

/// Load a JSON state file. `None` if there is nothing saved yet.
pub fn load_state(path: &Path) -> Result<Option<SlateState>> {
    if !path.exists() {
        info!(path = %path.display(), "No saved state found, starting fresh");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path).context("Failed to read state file")?;
    let state: SlateState =
        serde_json::from_str(&json).context("Failed to deserialize slate state")?;
    Ok(Some(state))
}

/// One graded pick as exported to CSV
#[derive(Debug, Serialize)]
struct GradedPickRow<'a> {
    #[serde(rename = "Pick ID")]
    pick_id: &'a str,
    #[serde(rename = "Parlay ID")]
    parlay_id: &'a str,
    #[serde(rename = "Away Team")]
    away_team: &'a str,
    #[serde(rename = "Home Team")]
    home_team: &'a str,
    #[serde(rename = "Bet Type")]
    bet_type: &'a str,
    #[serde(rename = "Pick")]
    pick: &'a str,
    #[serde(rename = "Away Score")]
    away_score: Option<i32>,
    #[serde(rename = "Home Score")]
    home_score: Option<i32>,
    #[serde(rename = "Result")]
    result: String,
    #[serde(rename = "Winning Odds")]
    winning_odds: Option<i32>,
}

fn row<'a>(pick: &'a Pick, matchup: &'a Matchup) -> GradedPickRow<'a> {
    GradedPickRow {
        pick_id: &pick.id,
        parlay_id: &pick.parlay_id,
        away_team: &matchup.away_team,
        home_team: &matchup.home_team,
        bet_type: matchup.bet_type.as_str(),
        pick: &pick.pick,
        away_score: matchup.away_score,
        home_score: matchup.home_score,
        result: pick
            .grade
            .map(|grade| grade.outcome().to_string())
            .unwrap_or_default(),
        winning_odds: pick.grade.and_then(|grade| grade.winning_odds()),
    }
}

/// Write every graded pick to CSV. Returns the number of rows written.
pub fn save_graded_picks_to_csv(state: &SlateState, filename: &Path) -> Result<usize> {
    let mut writer = csv::Writer::from_path(filename).context("Failed to create CSV file")?;

    let mut written = 0;
    for pick in state.picks.iter().filter(|p| p.grade.is_some()) {
        let Some(matchup) = state.matchups.iter().find(|m| m.id == pick.matchup_id) else {
            continue;
        };
        writer
            .serialize(row(pick, matchup))
            .context("Failed to write CSV row")?;
        written += 1;
    }

    writer.flush().context("Failed to flush CSV file")?;
    Ok(written)
}
