#![deny(
    warnings,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs
)]
//! Two snakes race for food on separate, identical boards: one steered by
//! breadth first search, the other by A*. Both boards draw food from random
//! sources seeded with the same value, so until their routes diverge they
//! chase the same food, and the number of search nodes each algorithm
//! expands can be compared directly.
//!
//! you will likely be most interested in [`race::RaceOrchestrator`], which
//! runs the MENU -> RACE -> RESULTS state machine one tick at a time, and
//! [`results::ResultsSnapshot`], which is what a finished race produces.
//! ```
//! # use snake_race::config::RaceConfig;
//! # use snake_race::race::{RaceOrchestrator, TickOutcome};
//! let config = RaceConfig { time_limit_ticks: 64, ..RaceConfig::default() };
//! let mut race = RaceOrchestrator::new(config).expect("valid config");
//! race.start_race(Some(42)).expect("starts from the menu");
//! let results = loop {
//!     if let TickOutcome::Finished(results) = race.tick().expect("racing") {
//!         break results;
//!     }
//! };
//! assert!(results.duration_ticks <= 64);
//! ```

pub mod agent;
pub mod config;
pub mod food;
pub mod grid;
pub mod race;
pub mod results;
pub mod search;
pub mod types;
