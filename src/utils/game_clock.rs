//! Timing rules for re-polling a matchup as its start time approaches and
//! while it is being played.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;

/// Added to the start time so a job scheduled "at game time" lands after it
const GAME_TIME_BUFFER_SECS: i64 = 5;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;

/// Time until the game starts, plus a small buffer. Zero once it has started.
pub fn time_to_game(start_time: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let until = start_time + ChronoDuration::seconds(GAME_TIME_BUFFER_SECS) - now;
    until.to_std().unwrap_or(Duration::ZERO)
}

pub fn game_time_in_past(start_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    start_time < now
}

/// How long to wait before checking odds again. Polls more often as the game nears
/// and returns zero inside the last 30 minutes.
pub fn odds_queue_delay(start_time: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let until = start_time - now;
    let hours = until.num_hours();
    let minutes = until.num_minutes();

    if hours > 8 {
        Duration::from_secs(4 * HOUR)
    } else if hours > 4 {
        Duration::from_secs(2 * HOUR)
    } else if hours > 1 {
        Duration::from_secs(HOUR)
    } else if minutes > 30 {
        Duration::from_secs(20 * MINUTE)
    } else {
        Duration::ZERO
    }
}

/// How long to wait before checking a live game's score again. Games are
/// unlikely to end early on, so the interval shrinks the longer one runs.
pub fn live_score_delay(start_time: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let elapsed_hours = (now - start_time).num_hours();

    if elapsed_hours >= 3 {
        Duration::from_secs(3 * MINUTE)
    } else if elapsed_hours >= 1 {
        Duration::from_secs(10 * MINUTE)
    } else {
        Duration::from_secs(30 * MINUTE)
    }
}
