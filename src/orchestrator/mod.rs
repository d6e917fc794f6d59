//! Lifecycle workers that carry a matchup from slate to settlement.
//!
//! Two queues drive every matchup. The odds queue refreshes its line until
//! game time, then hands the matchup to the live-score queue, which locks it,
//! follows the game and grades every pick once the final score is in.

pub mod live_score;
pub mod odds_update;
pub mod queue;

pub use live_score::LiveScoreWorker;
pub use odds_update::OddsUpdateWorker;
pub use queue::{handle_job, run_workers, RecordingQueue, TokioJobQueue, Workers};

use crate::models::{Line, Matchup};
use crate::utils::payout::ParlaySettlement;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueName {
    OddsUpdate,
    LiveScore,
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueName::OddsUpdate => f.write_str("oddsUpdate"),
            QueueName::LiveScore => f.write_str("liveScore"),
        }
    }
}

/// One unit of work: look at a single matchup on a single queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub queue: QueueName,
    pub matchup_id: String,
    #[serde(default)]
    pub attempts_made: u32,
}

impl Job {
    pub fn odds_update(matchup_id: impl Into<String>) -> Self {
        Self {
            queue: QueueName::OddsUpdate,
            matchup_id: matchup_id.into(),
            attempts_made: 0,
        }
    }

    pub fn live_score(matchup_id: impl Into<String>) -> Self {
        Self {
            queue: QueueName::LiveScore,
            matchup_id: matchup_id.into(),
            attempts_made: 0,
        }
    }
}

/// Raw event fields from the score provider. Any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreEvent {
    pub status: Option<String>,
    pub away_score: Option<String>,
    pub home_score: Option<String>,
}

/// A line quoted by a sportsbook for one game
#[derive(Debug, Clone, PartialEq)]
pub struct QuotedLine {
    pub sportsbook: String,
    pub odds_game_id: Option<String>,
    pub line: Line,
}

#[async_trait]
pub trait ScoreFeed: Send + Sync {
    /// `None` when the provider does not know the event
    async fn lookup_event(&self, id_event: &str) -> Result<Option<ScoreEvent>>;
}

#[async_trait]
pub trait OddsFeed: Send + Sync {
    /// `None` when no sportsbook quotes a complete line for the matchup
    async fn fetch_line(&self, matchup: &Matchup) -> Result<Option<QuotedLine>>;
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: Job, delay: Duration) -> Result<()>;
}

/// What a worker did with a job
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The matchup needs no more work on this queue
    Done,
    /// The matchup went back on a queue
    Requeued { queue: QueueName, delay: Duration },
    /// The game was postponed or abandoned
    Voided,
    /// Final score recorded and picks graded
    Graded {
        picks: usize,
        ungradable: usize,
        settlements: Vec<(String, ParlaySettlement)>,
    },
}
