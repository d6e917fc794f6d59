//! Matchup, odds, pick and parlay rows, and the store the workers share.

use crate::models::{GradeResult, Matchup, MatchupStatus, OddsRecord, Parlay, Pick};
use crate::utils::payout::{settle_parlay, ParlaySettlement};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Every persisted row, as saved to and loaded from disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlateState {
    #[serde(default)]
    pub matchups: Vec<Matchup>,
    #[serde(default)]
    pub odds: Vec<OddsRecord>,
    #[serde(default)]
    pub picks: Vec<Pick>,
    #[serde(default)]
    pub parlays: Vec<Parlay>,
}

/// Final score and per-pick grades for a game that just ended
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedGame {
    pub away_score: i32,
    pub home_score: i32,
    /// Pick id to grade. `None` leaves the pick for manual review.
    pub grades: Vec<(String, Option<GradeResult>)>,
}

#[async_trait]
pub trait MatchupStore: Send + Sync {
    async fn matchup(&self, id: &str) -> Result<Option<Matchup>>;

    /// Latest odds row stored for a matchup
    async fn latest_odds(&self, matchup_id: &str) -> Result<Option<OddsRecord>>;

    async fn odds_record(&self, id: &str) -> Result<Option<OddsRecord>>;

    async fn insert_odds(&self, record: OddsRecord) -> Result<()>;

    async fn picks_for_matchup(&self, matchup_id: &str) -> Result<Vec<Pick>>;

    /// Mark the matchup in progress and lock it with its picks and their parlays
    async fn lock_matchup(&self, id: &str) -> Result<()>;

    /// A postponed or abandoned game: finished with zero scores and handed back to an admin
    async fn void_matchup(&self, id: &str) -> Result<()>;

    /// Record the final score, the pick grades and every parlay they settle, all at once
    async fn finish_matchup(
        &self,
        id: &str,
        game: FinishedGame,
    ) -> Result<Vec<(String, ParlaySettlement)>>;
}

/// `MatchupStore` over an in-memory [`SlateState`]
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<SlateState>,
}

impl InMemoryStore {
    pub fn new(state: SlateState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Copy of every row, for saving or serving
    pub async fn snapshot(&self) -> SlateState {
        self.state.read().await.clone()
    }

    pub async fn matchups(&self) -> Vec<Matchup> {
        self.state.read().await.matchups.clone()
    }

    /// Add matchups, skipping ids that are already tracked
    pub async fn add_matchups(&self, matchups: Vec<Matchup>) -> usize {
        let mut state = self.state.write().await;
        let mut added = 0;
        for matchup in matchups {
            if state.matchups.iter().any(|m| m.id == matchup.id) {
                continue;
            }
            state.matchups.push(matchup);
            added += 1;
        }
        added
    }

    /// Place a parlay with its legs
    pub async fn place_parlay(&self, parlay: Parlay, picks: Vec<Pick>) -> Result<()> {
        let mut state = self.state.write().await;

        for pick in &picks {
            let matchup = state
                .matchups
                .iter()
                .find(|m| m.id == pick.matchup_id)
                .ok_or_else(|| anyhow!("Matchup {} not found", pick.matchup_id))?;
            if matchup.locked || matchup.status != MatchupStatus::Scheduled {
                return Err(anyhow!("Matchup {} is no longer open for picks", matchup.id));
            }
            if pick.parlay_id != parlay.id {
                return Err(anyhow!("Pick {} belongs to another parlay", pick.id));
            }
        }

        state.parlays.push(parlay);
        state.picks.extend(picks);
        Ok(())
    }
}

fn matchup_mut<'a>(state: &'a mut SlateState, id: &str) -> Result<&'a mut Matchup> {
    state
        .matchups
        .iter_mut()
        .find(|m| m.id == id)
        .ok_or_else(|| anyhow!("Matchup {id} not found"))
}

#[async_trait]
impl MatchupStore for InMemoryStore {
    async fn matchup(&self, id: &str) -> Result<Option<Matchup>> {
        let state = self.state.read().await;
        Ok(state.matchups.iter().find(|m| m.id == id).cloned())
    }

    async fn latest_odds(&self, matchup_id: &str) -> Result<Option<OddsRecord>> {
        let state = self.state.read().await;
        Ok(state
            .odds
            .iter()
            .filter(|o| o.matchup_id == matchup_id)
            .max_by_key(|o| o.last_update)
            .cloned())
    }

    async fn odds_record(&self, id: &str) -> Result<Option<OddsRecord>> {
        let state = self.state.read().await;
        Ok(state.odds.iter().find(|o| o.id == id).cloned())
    }

    async fn insert_odds(&self, record: OddsRecord) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.matchups.iter().any(|m| m.id == record.matchup_id) {
            return Err(anyhow!("Matchup {} not found", record.matchup_id));
        }
        state.odds.push(record);
        Ok(())
    }

    async fn picks_for_matchup(&self, matchup_id: &str) -> Result<Vec<Pick>> {
        let state = self.state.read().await;
        Ok(state
            .picks
            .iter()
            .filter(|p| p.matchup_id == matchup_id)
            .cloned()
            .collect())
    }

    async fn lock_matchup(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;

        let matchup = matchup_mut(&mut state, id)?;
        matchup.locked = true;
        matchup.status = MatchupStatus::InProgress;

        let mut parlay_ids = BTreeSet::new();
        for pick in state.picks.iter_mut().filter(|p| p.matchup_id == id) {
            pick.locked = true;
            parlay_ids.insert(pick.parlay_id.clone());
        }
        for parlay in state
            .parlays
            .iter_mut()
            .filter(|p| parlay_ids.contains(&p.id))
        {
            parlay.locked = true;
        }

        info!(matchup_id = %id, parlays = parlay_ids.len(), "Matchup, picks and parlays locked");
        Ok(())
    }

    async fn void_matchup(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let matchup = matchup_mut(&mut state, id)?;

        matchup.status = MatchupStatus::Finished;
        matchup.locked = false;
        matchup.admin_unlocked = true;
        matchup.away_score = Some(0);
        matchup.home_score = Some(0);
        matchup.points_total = Some(0);
        Ok(())
    }

    async fn finish_matchup(
        &self,
        id: &str,
        game: FinishedGame,
    ) -> Result<Vec<(String, ParlaySettlement)>> {
        let mut state = self.state.write().await;

        // Applied to a copy so a failure leaves every row as it was
        let mut next = state.clone();
        let settlements = apply_finished_game(&mut next, id, game)?;
        *state = next;

        Ok(settlements)
    }
}

fn apply_finished_game(
    state: &mut SlateState,
    id: &str,
    game: FinishedGame,
) -> Result<Vec<(String, ParlaySettlement)>> {
    let matchup = matchup_mut(state, id)?;
    matchup.status = MatchupStatus::Finished;
    matchup.locked = false;
    matchup.away_score = Some(game.away_score);
    matchup.home_score = Some(game.home_score);
    matchup.points_total = Some(game.away_score + game.home_score);

    let mut parlay_ids = BTreeSet::new();
    for (pick_id, grade) in game.grades {
        let pick = state
            .picks
            .iter_mut()
            .find(|p| p.id == pick_id && p.matchup_id == id)
            .with_context(|| format!("Pick {pick_id} not found on matchup {id}"))?;
        pick.grade = grade;
        pick.locked = false;
        parlay_ids.insert(pick.parlay_id.clone());
    }

    let mut settlements = Vec::with_capacity(parlay_ids.len());
    for parlay_id in parlay_ids {
        let legs: Vec<Option<GradeResult>> = state
            .picks
            .iter()
            .filter(|p| p.parlay_id == parlay_id)
            .map(|p| p.grade)
            .collect();

        let Some(parlay) = state.parlays.iter_mut().find(|p| p.id == parlay_id) else {
            error!(parlay_id = %parlay_id, matchup_id = %id, "Parlay not found when settling");
            continue;
        };

        let settlement = settle_parlay(parlay.wager, &legs)
            .with_context(|| format!("Failed to settle parlay {parlay_id}"))?;
        if let Some(points) = settlement.points_awarded() {
            parlay.points_awarded = Some(points);
            parlay.locked = false;
        }
        settlements.push((parlay_id, settlement));
    }

    Ok(settlements)
}
