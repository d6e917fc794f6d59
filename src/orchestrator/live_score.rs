use super::{Job, JobOutcome, JobQueue, QueueName, ScoreFeed};
use crate::models::{GradeResult, Matchup, MatchupOutcome, MatchupStatus, Pick};
use crate::store::{FinishedGame, MatchupStore};
use crate::utils::game_clock::{game_time_in_past, live_score_delay, time_to_game};
use crate::utils::grading::grade_pick;
use crate::utils::scores::{parse_scores, EventStatus};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Providers lag behind the scheduled start before flipping a game to live
const NOT_STARTED_RETRY: Duration = Duration::from_secs(60);

/// Follows a started game until it finishes, then grades it
pub struct LiveScoreWorker {
    store: Arc<dyn MatchupStore>,
    feed: Arc<dyn ScoreFeed>,
    queue: Arc<dyn JobQueue>,
}

impl LiveScoreWorker {
    pub fn new(
        store: Arc<dyn MatchupStore>,
        feed: Arc<dyn ScoreFeed>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self { store, feed, queue }
    }

    pub async fn process(&self, matchup_id: &str, now: DateTime<Utc>) -> Result<JobOutcome> {
        info!(matchup_id, "liveScore queue processing");

        let matchup = self
            .store
            .matchup(matchup_id)
            .await?
            .ok_or_else(|| anyhow!("Matchup {matchup_id} not found"))?;

        if matchup.status == MatchupStatus::Finished {
            info!(matchup_id, "Matchup already finished");
            return Ok(JobOutcome::Done);
        }

        if !matchup.locked {
            if !game_time_in_past(matchup.start_time, now) {
                let delay = time_to_game(matchup.start_time, now);
                info!(
                    matchup_id,
                    delay_ms = delay.as_millis() as u64,
                    "Game time in future, adding back to liveScore queue"
                );
                return self.requeue(matchup_id, delay).await;
            }
            self.store.lock_matchup(matchup_id).await?;
        }

        let event = self
            .feed
            .lookup_event(&matchup.id_event)
            .await
            .context("Live score request failed")?;

        let Some(event) = event else {
            error!(matchup_id, id_event = %matchup.id_event, id_league = %matchup.id_league, "Error in event response");
            bail!("Event {} not found for matchup {matchup_id}", matchup.id_event);
        };

        let status = event.status.as_deref().unwrap_or_default();

        match EventStatus::classify(status) {
            EventStatus::Voided => {
                self.store.void_matchup(matchup_id).await?;
                warn!(
                    matchup_id,
                    status, "Game is postponed, unlocking and setting scores to 0"
                );
                return Ok(JobOutcome::Voided);
            }
            EventStatus::NotStarted => {
                warn!(
                    matchup_id,
                    status,
                    start_time = %matchup.start_time,
                    "Game time in past but not started, adding back to liveScore queue"
                );
                return self.requeue(matchup_id, NOT_STARTED_RETRY).await;
            }
            EventStatus::Finished | EventStatus::InProgress => {}
        }

        let (away_raw, home_raw) = match (
            non_empty(event.away_score.as_deref()),
            non_empty(event.home_score.as_deref()),
            non_empty(Some(status)),
        ) {
            (Some(away), Some(home), Some(_)) => (away, home),
            _ => {
                error!(
                    matchup_id,
                    away_score = ?event.away_score,
                    home_score = ?event.home_score,
                    status,
                    "Missing mandatory field in event response"
                );
                bail!("Missing mandatory field in event response for matchup {matchup_id}");
            }
        };

        if EventStatus::classify(status) != EventStatus::Finished {
            let delay = live_score_delay(matchup.start_time, now);
            info!(
                matchup_id,
                status,
                delay_ms = delay.as_millis() as u64,
                "Game is in progress, adding back to liveScore queue"
            );
            return self.requeue(matchup_id, delay).await;
        }

        let (away_score, home_score) = parse_scores(away_raw, home_raw)?;
        self.grade_matchup(&matchup, away_score, home_score).await
    }

    async fn grade_matchup(
        &self,
        matchup: &Matchup,
        away_score: i32,
        home_score: i32,
    ) -> Result<JobOutcome> {
        info!(matchup_id = %matchup.id, away_score, home_score, "Grading finished matchup");

        let picks = self.store.picks_for_matchup(&matchup.id).await?;
        let mut grades = Vec::with_capacity(picks.len());
        for pick in &picks {
            let grade = self.grade(matchup, away_score, home_score, pick).await?;
            grades.push((pick.id.clone(), grade));
        }
        let ungradable = grades.iter().filter(|(_, grade)| grade.is_none()).count();

        let game = FinishedGame {
            away_score,
            home_score,
            grades,
        };
        let settlements = self.store.finish_matchup(&matchup.id, game).await?;

        for (parlay_id, settlement) in &settlements {
            info!(
                matchup_id = %matchup.id,
                parlay_id = %parlay_id,
                points_awarded = ?settlement.points_awarded(),
                "Parlay settled"
            );
        }
        info!(
            matchup_id = %matchup.id,
            picks = picks.len(),
            ungradable,
            "Matchup finished, picks and parlays unlocked"
        );

        Ok(JobOutcome::Graded {
            picks: picks.len(),
            ungradable,
            settlements,
        })
    }

    /// Grade one pick. Picks that cannot be graded are logged and left for review.
    async fn grade(
        &self,
        matchup: &Matchup,
        away_score: i32,
        home_score: i32,
        pick: &Pick,
    ) -> Result<Option<GradeResult>> {
        let record = self
            .store
            .odds_record(&pick.odds_id)
            .await?
            .ok_or_else(|| anyhow!("Odds {} not found for pick {}", pick.odds_id, pick.id))?;

        let odds = match record.line.snapshot(matchup.bet_type) {
            Ok(odds) => odds,
            Err(e) => {
                error!(matchup_id = %matchup.id, pick_id = %pick.id, odds_id = %record.id, error = %e, "Odds row cannot be graded");
                return Ok(None);
            }
        };

        let outcome = MatchupOutcome::new(matchup, away_score, home_score, odds, &pick.pick);
        match grade_pick(&outcome) {
            Ok(grade) => Ok(Some(grade)),
            Err(e) => {
                error!(matchup_id = %matchup.id, pick_id = %pick.id, error = %e, "Ungradable pick");
                Ok(None)
            }
        }
    }

    async fn requeue(&self, matchup_id: &str, delay: Duration) -> Result<JobOutcome> {
        self.queue
            .enqueue(Job::live_score(matchup_id), delay)
            .await?;
        Ok(JobOutcome::Requeued {
            queue: QueueName::LiveScore,
            delay,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BetType, Line, OddsRecord, Parlay, PickResult};
    use crate::orchestrator::queue::RecordingQueue;
    use crate::orchestrator::ScoreEvent;
    use crate::store::InMemoryStore;
    use crate::utils::payout::ParlaySettlement;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeScoreFeed {
        event: Option<ScoreEvent>,
        calls: AtomicUsize,
    }

    impl FakeScoreFeed {
        fn new(event: Option<ScoreEvent>) -> Arc<Self> {
            Arc::new(Self {
                event,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ScoreFeed for FakeScoreFeed {
        async fn lookup_event(&self, _id_event: &str) -> Result<Option<ScoreEvent>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.event.clone())
        }
    }

    fn event(status: &str, away: &str, home: &str) -> Option<ScoreEvent> {
        Some(ScoreEvent {
            status: Some(status.to_string()),
            away_score: Some(away.to_string()),
            home_score: Some(home.to_string()),
        })
    }

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 8, 18, 23, 5, 0).unwrap()
    }

    fn matchup() -> Matchup {
        Matchup {
            id: "m1".to_string(),
            id_event: "1602441".to_string(),
            id_league: "4424".to_string(),
            away_team: "Boston Red Sox".to_string(),
            home_team: "New York Yankees".to_string(),
            start_time: start_time(),
            bet_type: BetType::MoneyLine,
            draw_eligible: false,
            draw_team: None,
            admin_selected: false,
            locked: false,
            admin_unlocked: false,
            status: MatchupStatus::Scheduled,
            away_score: None,
            home_score: None,
            points_total: None,
        }
    }

    fn pick(id: &str, parlay_id: &str, odds_id: &str, team: &str) -> Pick {
        Pick {
            id: id.to_string(),
            matchup_id: "m1".to_string(),
            parlay_id: parlay_id.to_string(),
            odds_id: odds_id.to_string(),
            pick: team.to_string(),
            locked: false,
            grade: None,
        }
    }

    fn odds(id: &str, line: Line) -> OddsRecord {
        OddsRecord {
            id: id.to_string(),
            matchup_id: "m1".to_string(),
            odds_game_id: None,
            sportsbook: "bet365".to_string(),
            line,
            last_update: start_time() - ChronoDuration::hours(2),
        }
    }

    async fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::default());
        store.add_matchups(vec![matchup()]).await;
        store
            .insert_odds(odds(
                "o1",
                Line {
                    home_odds: Some(-150),
                    away_odds: Some(130),
                    draw_odds: Some(0),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();
        // Missing the draw price, so picks against it cannot be graded
        store
            .insert_odds(odds(
                "o2",
                Line {
                    home_odds: Some(-150),
                    away_odds: Some(130),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();

        for (parlay_id, pick_id, odds_id, team) in [
            ("p1", "a", "o1", "Boston Red Sox"),
            ("p2", "b", "o1", "New York Yankees"),
            ("p3", "c", "o2", "Boston Red Sox"),
        ] {
            store
                .place_parlay(
                    Parlay {
                        id: parlay_id.to_string(),
                        wager: dec!(100),
                        locked: false,
                        points_awarded: None,
                    },
                    vec![pick(pick_id, parlay_id, odds_id, team)],
                )
                .await
                .unwrap();
        }
        store
    }

    fn worker(
        store: Arc<InMemoryStore>,
        feed: Arc<FakeScoreFeed>,
        queue: Arc<RecordingQueue>,
    ) -> LiveScoreWorker {
        LiveScoreWorker::new(store, feed, queue)
    }

    #[tokio::test]
    async fn test_future_game_is_requeued_at_game_time() {
        let store = seeded_store().await;
        let feed = FakeScoreFeed::new(event("NS", "", ""));
        let queue = Arc::new(RecordingQueue::default());
        let now = start_time() - ChronoDuration::minutes(10);

        let outcome = worker(store.clone(), feed.clone(), queue.clone())
            .process("m1", now)
            .await
            .unwrap();

        let delay = Duration::from_secs(10 * 60 + 5);
        assert_eq!(
            outcome,
            JobOutcome::Requeued {
                queue: QueueName::LiveScore,
                delay
            }
        );
        assert_eq!(queue.jobs(), vec![(Job::live_score("m1"), delay)]);
        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
        assert!(!store.matchup("m1").await.unwrap().unwrap().locked);
    }

    #[tokio::test]
    async fn test_started_game_is_locked_and_followed() {
        let store = seeded_store().await;
        let feed = FakeScoreFeed::new(event("3", "1", "0"));
        let queue = Arc::new(RecordingQueue::default());
        let now = start_time() + ChronoDuration::minutes(70);

        let outcome = worker(store.clone(), feed, queue.clone())
            .process("m1", now)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Requeued {
                queue: QueueName::LiveScore,
                delay: Duration::from_secs(10 * 60)
            }
        );
        let state = store.snapshot().await;
        assert!(state.matchups[0].locked);
        assert_eq!(state.matchups[0].status, MatchupStatus::InProgress);
        assert!(state.picks.iter().all(|p| p.locked));
        assert!(state.parlays.iter().all(|p| p.locked));
    }

    #[tokio::test]
    async fn test_not_started_status_after_start_time_retries_in_a_minute() {
        let store = seeded_store().await;
        let feed = FakeScoreFeed::new(event("NS", "", ""));
        let queue = Arc::new(RecordingQueue::default());

        let outcome = worker(store, feed, queue.clone())
            .process("m1", start_time() + ChronoDuration::minutes(2))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Requeued {
                queue: QueueName::LiveScore,
                delay: NOT_STARTED_RETRY
            }
        );
    }

    #[tokio::test]
    async fn test_postponed_game_is_voided() {
        let store = seeded_store().await;
        let feed = FakeScoreFeed::new(event("PST", "", ""));
        let queue = Arc::new(RecordingQueue::default());

        let outcome = worker(store.clone(), feed, queue.clone())
            .process("m1", start_time() + ChronoDuration::minutes(2))
            .await
            .unwrap();

        assert_eq!(outcome, JobOutcome::Voided);
        assert!(queue.jobs().is_empty());
        let matchup = store.matchup("m1").await.unwrap().unwrap();
        assert_eq!(matchup.status, MatchupStatus::Finished);
        assert!(matchup.admin_unlocked);
        assert!(!matchup.locked);
    }

    #[tokio::test]
    async fn test_missing_score_fails_the_job() {
        let store = seeded_store().await;
        let feed = FakeScoreFeed::new(event("FT", "4", ""));
        let queue = Arc::new(RecordingQueue::default());

        let result = worker(store.clone(), feed, queue)
            .process("m1", start_time() + ChronoDuration::hours(3))
            .await;

        assert!(result.is_err());
        let matchup = store.matchup("m1").await.unwrap().unwrap();
        assert_ne!(matchup.status, MatchupStatus::Finished);
    }

    #[tokio::test]
    async fn test_unknown_event_fails_the_job() {
        let store = seeded_store().await;
        let feed = FakeScoreFeed::new(None);
        let queue = Arc::new(RecordingQueue::default());

        let result = worker(store, feed, queue)
            .process("m1", start_time() + ChronoDuration::hours(1))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_finished_game_grades_picks_and_settles_parlays() {
        let store = seeded_store().await;
        let feed = FakeScoreFeed::new(event("FT", "5", "3"));
        let queue = Arc::new(RecordingQueue::default());

        let outcome = worker(store.clone(), feed, queue.clone())
            .process("m1", start_time() + ChronoDuration::hours(3))
            .await
            .unwrap();

        let JobOutcome::Graded {
            picks,
            ungradable,
            settlements,
        } = outcome
        else {
            panic!("expected a graded outcome, got {outcome:?}");
        };
        assert_eq!(picks, 3);
        assert_eq!(ungradable, 1);
        assert!(settlements.contains(&(
            "p1".to_string(),
            ParlaySettlement::Paid { payout: dec!(230) }
        )));
        assert!(settlements.contains(&("p2".to_string(), ParlaySettlement::Lost)));
        assert!(settlements.contains(&("p3".to_string(), ParlaySettlement::Pending)));
        assert!(queue.jobs().is_empty());

        let state = store.snapshot().await;
        let matchup = &state.matchups[0];
        assert_eq!(matchup.status, MatchupStatus::Finished);
        assert_eq!(matchup.points_total, Some(8));
        assert!(!matchup.locked);

        let grade_of = |id: &str| state.picks.iter().find(|p| p.id == id).unwrap().grade;
        assert_eq!(grade_of("a").unwrap().outcome(), PickResult::Win);
        assert_eq!(grade_of("a").unwrap().winning_odds(), Some(130));
        assert_eq!(grade_of("b").unwrap().outcome(), PickResult::Loss);
        assert_eq!(grade_of("c"), None);
    }

    #[tokio::test]
    async fn test_finished_matchup_is_not_looked_up_again() {
        let store = seeded_store().await;
        store.void_matchup("m1").await.unwrap();
        let feed = FakeScoreFeed::new(event("FT", "5", "3"));
        let queue = Arc::new(RecordingQueue::default());

        let outcome = worker(store, feed.clone(), queue)
            .process("m1", start_time() + ChronoDuration::hours(3))
            .await
            .unwrap();

        assert_eq!(outcome, JobOutcome::Done);
        assert_eq!(feed.calls.load(Ordering::SeqCst), 0);
    }
}
