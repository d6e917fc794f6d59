use super::{Job, JobOutcome, JobQueue, OddsFeed, QueueName};
use crate::models::{MatchupStatus, OddsRecord};
use crate::store::MatchupStore;
use crate::utils::game_clock::{game_time_in_past, odds_queue_delay, time_to_game};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Tracks a matchup's line until game time, then hands it to the live-score queue
pub struct OddsUpdateWorker {
    store: Arc<dyn MatchupStore>,
    feed: Arc<dyn OddsFeed>,
    queue: Arc<dyn JobQueue>,
}

impl OddsUpdateWorker {
    pub fn new(
        store: Arc<dyn MatchupStore>,
        feed: Arc<dyn OddsFeed>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self { store, feed, queue }
    }

    pub async fn process(&self, matchup_id: &str, now: DateTime<Utc>) -> Result<JobOutcome> {
        info!(matchup_id, "oddsUpdate queue processing");

        let matchup = self
            .store
            .matchup(matchup_id)
            .await?
            .ok_or_else(|| anyhow!("Matchup {matchup_id} not found"))?;

        if matchup.locked || matchup.status != MatchupStatus::Scheduled {
            info!(matchup_id, status = ?matchup.status, "Matchup no longer taking odds updates");
            return Ok(JobOutcome::Done);
        }

        let quoted = self
            .feed
            .fetch_line(&matchup)
            .await
            .context("Odds request failed")?;

        match quoted {
            Some(quoted) => {
                let stored = self.store.latest_odds(matchup_id).await?;
                let changed = stored
                    .as_ref()
                    .map_or(true, |record| {
                        quoted.line.differs_from(&record.line, matchup.bet_type)
                    });

                if changed {
                    let record = OddsRecord {
                        id: Uuid::new_v4().to_string(),
                        matchup_id: matchup_id.to_string(),
                        odds_game_id: quoted.odds_game_id,
                        sportsbook: quoted.sportsbook,
                        line: quoted.line,
                        last_update: now,
                    };
                    info!(matchup_id, odds_id = %record.id, sportsbook = %record.sportsbook, "Odds updated");
                    self.store.insert_odds(record).await?;
                } else {
                    info!(matchup_id, "Odds unchanged");
                }
            }
            None => {
                warn!(matchup_id, bet_type = %matchup.bet_type, "No complete line quoted");
            }
        }

        let delay = odds_queue_delay(matchup.start_time, now);
        let (job, delay) = if delay.is_zero() || game_time_in_past(matchup.start_time, now) {
            (
                Job::live_score(matchup_id),
                time_to_game(matchup.start_time, now),
            )
        } else {
            (Job::odds_update(matchup_id), delay)
        };

        let queue = job.queue;
        self.queue.enqueue(job, delay).await?;
        info!(
            matchup_id,
            queue = %queue,
            delay_ms = delay.as_millis() as u64,
            "Matchup queued"
        );

        Ok(JobOutcome::Requeued { queue, delay })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BetType, Line, Matchup};
    use crate::orchestrator::queue::RecordingQueue;
    use crate::orchestrator::QuotedLine;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeOddsFeed {
        line: Mutex<Option<Line>>,
    }

    impl FakeOddsFeed {
        fn quoting(line: Option<Line>) -> Arc<Self> {
            Arc::new(Self {
                line: Mutex::new(line),
            })
        }

        fn set(&self, line: Line) {
            *self.line.lock().unwrap() = Some(line);
        }
    }

    #[async_trait]
    impl OddsFeed for FakeOddsFeed {
        async fn fetch_line(&self, _matchup: &Matchup) -> Result<Option<QuotedLine>> {
            Ok(self.line.lock().unwrap().clone().map(|line| QuotedLine {
                sportsbook: "bet365".to_string(),
                odds_game_id: Some("289421".to_string()),
                line,
            }))
        }
    }

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 8, 19, 2, 0, 0).unwrap()
    }

    fn totals(over: i32, under: i32) -> Line {
        Line {
            over_odds: Some(over),
            under_odds: Some(under),
            total: Some(rust_decimal_macros::dec!(8.5)),
            ..Default::default()
        }
    }

    async fn store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::default());
        store
            .add_matchups(vec![Matchup {
                id: "m1".to_string(),
                id_event: "1602441".to_string(),
                id_league: "4424".to_string(),
                away_team: "Seattle Mariners".to_string(),
                home_team: "Los Angeles Angels".to_string(),
                start_time: start_time(),
                bet_type: BetType::Totals,
                draw_eligible: false,
                draw_team: None,
                admin_selected: false,
                locked: false,
                admin_unlocked: false,
                status: MatchupStatus::Scheduled,
                away_score: None,
                home_score: None,
                points_total: None,
            }])
            .await;
        store
    }

    #[tokio::test]
    async fn test_stores_line_only_when_it_moves() {
        let store = store().await;
        let feed = FakeOddsFeed::quoting(Some(totals(-115, -105)));
        let queue = Arc::new(RecordingQueue::default());
        let worker = OddsUpdateWorker::new(store.clone(), feed.clone(), queue.clone());
        let now = start_time() - ChronoDuration::hours(10);

        let outcome = worker.process("m1", now).await.unwrap();
        assert_eq!(
            outcome,
            JobOutcome::Requeued {
                queue: QueueName::OddsUpdate,
                delay: Duration::from_secs(4 * 3600)
            }
        );
        assert_eq!(store.snapshot().await.odds.len(), 1);

        worker.process("m1", now + ChronoDuration::hours(4)).await.unwrap();
        assert_eq!(store.snapshot().await.odds.len(), 1);

        feed.set(totals(-120, 100));
        worker.process("m1", now + ChronoDuration::hours(6)).await.unwrap();
        let state = store.snapshot().await;
        assert_eq!(state.odds.len(), 2);
        let latest = store.latest_odds("m1").await.unwrap().unwrap();
        assert_eq!(latest.line.over_odds, Some(-120));
        assert_eq!(latest.odds_game_id.as_deref(), Some("289421"));

        assert_eq!(queue.jobs().len(), 3);
    }

    #[tokio::test]
    async fn test_hands_off_to_live_score_near_game_time() {
        let store = store().await;
        let feed = FakeOddsFeed::quoting(Some(totals(-115, -105)));
        let queue = Arc::new(RecordingQueue::default());
        let worker = OddsUpdateWorker::new(store, feed, queue.clone());

        let outcome = worker
            .process("m1", start_time() - ChronoDuration::minutes(20))
            .await
            .unwrap();

        let delay = Duration::from_secs(20 * 60 + 5);
        assert_eq!(
            outcome,
            JobOutcome::Requeued {
                queue: QueueName::LiveScore,
                delay
            }
        );
        assert_eq!(queue.jobs(), vec![(Job::live_score("m1"), delay)]);
    }

    #[tokio::test]
    async fn test_missing_line_still_reschedules() {
        let store = store().await;
        let feed = FakeOddsFeed::quoting(None);
        let queue = Arc::new(RecordingQueue::default());
        let worker = OddsUpdateWorker::new(store.clone(), feed, queue.clone());

        let outcome = worker
            .process("m1", start_time() - ChronoDuration::hours(3))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Requeued {
                queue: QueueName::OddsUpdate,
                delay: Duration::from_secs(3600)
            }
        );
        assert!(store.snapshot().await.odds.is_empty());
    }

    #[tokio::test]
    async fn test_locked_matchup_is_left_to_live_score() {
        let store = store().await;
        store.lock_matchup("m1").await.unwrap();
        let feed = FakeOddsFeed::quoting(Some(totals(-115, -105)));
        let queue = Arc::new(RecordingQueue::default());
        let worker = OddsUpdateWorker::new(store.clone(), feed, queue.clone());

        let outcome = worker.process("m1", start_time()).await.unwrap();
        assert_eq!(outcome, JobOutcome::Done);
        assert!(queue.jobs().is_empty());
        assert!(store.snapshot().await.odds.is_empty());
    }
}
