pub mod lines_api;
pub mod schedule_api;
pub mod sports_db_api;
