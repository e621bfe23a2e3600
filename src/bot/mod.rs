pub mod classify;
pub mod dedup;
pub mod format;
pub mod goals;
pub mod recap;
pub mod runner;
pub mod schedule;

pub use runner::MatchdayBot;
