pub mod data;
pub mod game_clock;
pub mod grading;
pub mod odds_converter;
pub mod payout;
pub mod scores;
