//! Final race statistics and the append-only results log
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use num_format::{Locale, ToFormattedString};
use serde::Serialize;
use thiserror::Error;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::debug;

use crate::agent::Agent;
use crate::config::RaceConfig;
use crate::search::Algorithm;

/// header row of the results log. `timestamp` is UTC, `YYYY-MM-DD HH:MM:SS`.
pub const CSV_HEADER: &str = "timestamp,seed,race_duration,bfs_foods,bfs_alive,bfs_nodes,astar_foods,astar_alive,astar_nodes";

/// default results log file name
pub const DEFAULT_LOG_PATH: &str = "race_results.csv";

/// Failures writing results out. These never touch the race itself.
#[derive(Debug, Error)]
pub enum ExportError {
    #[allow(missing_docs)]
    #[error("results log io error: {0}")]
    Io(#[from] std::io::Error),
    #[allow(missing_docs)]
    #[error("could not format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// How one algorithm did in a finished race
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlgorithmStats {
    #[allow(missing_docs)]
    pub algorithm: Algorithm,
    #[allow(missing_docs)]
    pub foods: u32,
    /// ticks survived, see `Agent::ticks_alive`
    pub alive_ticks: u64,
    /// `alive_ticks` in seconds
    pub alive_secs: f64,
    /// expansions over the whole race
    pub nodes_expanded: u64,
}

impl AlgorithmStats {
    fn from_agent(agent: &Agent, config: &RaceConfig) -> Self {
        AlgorithmStats {
            algorithm: agent.algorithm(),
            foods: agent.foods_eaten(),
            alive_ticks: agent.ticks_alive(),
            alive_secs: config.ticks_to_secs(agent.ticks_alive()),
            nodes_expanded: agent.nodes_expanded(),
        }
    }
}

/// Immutable record of one finished race
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResultsSnapshot {
    #[allow(missing_docs)]
    pub seed: u64,
    /// race length in ticks, never more than the time limit
    pub duration_ticks: u64,
    /// `duration_ticks` in seconds
    pub duration_secs: f64,
    #[allow(missing_docs)]
    pub breadth_first: AlgorithmStats,
    #[allow(missing_docs)]
    pub a_star: AlgorithmStats,
}

impl ResultsSnapshot {
    /// gather the stats of both agents at the end of a race
    pub fn from_agents(
        seed: u64,
        config: &RaceConfig,
        duration_ticks: u64,
        breadth_first: &Agent,
        a_star: &Agent,
    ) -> Self {
        let duration_ticks = duration_ticks.min(config.time_limit_ticks);
        ResultsSnapshot {
            seed,
            duration_ticks,
            duration_secs: config.ticks_to_secs(duration_ticks),
            breadth_first: AlgorithmStats::from_agent(breadth_first, config),
            a_star: AlgorithmStats::from_agent(a_star, config),
        }
    }

    /// the stats for one algorithm
    pub fn stats(&self, algorithm: Algorithm) -> &AlgorithmStats {
        match algorithm {
            Algorithm::BreadthFirst => &self.breadth_first,
            Algorithm::AStar => &self.a_star,
        }
    }

    /// the algorithm that ate more, `None` on a draw
    pub fn leader(&self) -> Option<Algorithm> {
        leader_by_foods(self.breadth_first.foods, self.a_star.foods)
    }

    /// one results log row, without the trailing newline
    pub fn csv_row(&self, timestamp: &str) -> String {
        let b = &self.breadth_first;
        let a = &self.a_star;
        format!(
            "{},{},{:.3},{},{:.3},{},{},{:.3},{}",
            timestamp,
            self.seed,
            self.duration_secs,
            b.foods,
            b.alive_secs,
            b.nodes_expanded,
            a.foods,
            a.alive_secs,
            a.nodes_expanded
        )
    }
}

pub(crate) fn leader_by_foods(breadth_first: u32, a_star: u32) -> Option<Algorithm> {
    match breadth_first.cmp(&a_star) {
        std::cmp::Ordering::Greater => Some(Algorithm::BreadthFirst),
        std::cmp::Ordering::Less => Some(Algorithm::AStar),
        std::cmp::Ordering::Equal => None,
    }
}

impl fmt::Display for ResultsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "seed {} | race time {:.1}s",
            self.seed, self.duration_secs
        )?;
        for algorithm in Algorithm::ALL {
            let s = self.stats(algorithm);
            writeln!(
                f,
                "{:<3} - Foods: {} | Alive: {:.1}s | Nodes: {}",
                algorithm.to_string(),
                s.foods,
                s.alive_secs,
                s.nodes_expanded.to_formatted_string(&Locale::en)
            )?;
        }
        match self.leader() {
            Some(algorithm) => write!(f, "Leader: {}", algorithm),
            None => write!(f, "Leader: Draw"),
        }
    }
}

/// Produces the snapshot for a session exactly once; later calls hand back
/// the first one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultsRecorder {
    recorded: Option<ResultsSnapshot>,
}

impl ResultsRecorder {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// record the snapshot built by `build` unless one was already recorded
    pub fn record(&mut self, build: impl FnOnce() -> ResultsSnapshot) -> ResultsSnapshot {
        *self.recorded.get_or_insert_with(build)
    }

    /// the recorded snapshot, if the race is over
    pub fn snapshot(&self) -> Option<&ResultsSnapshot> {
        self.recorded.as_ref()
    }
}

/// Somewhere finished race results can be appended to
pub trait ResultsExporter: fmt::Debug {
    /// append one snapshot
    fn export(&mut self, snapshot: &ResultsSnapshot) -> Result<(), ExportError>;
}

/// Append-only CSV results log. The header is written only when the file
/// doesn't exist yet. Rows saved through [`ResultsExporter::export`] are
/// stamped with the current UTC time, not local time.
#[derive(Debug, Clone)]
pub struct CsvResultsLog {
    path: PathBuf,
}

impl CsvResultsLog {
    #[allow(missing_docs)]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvResultsLog { path: path.into() }
    }

    #[allow(missing_docs)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// append a row stamped with `at`, converted to UTC
    pub fn append(
        &self,
        snapshot: &ResultsSnapshot,
        at: OffsetDateTime,
    ) -> Result<(), ExportError> {
        let timestamp = at.to_offset(UtcOffset::UTC).format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))?;
        let exists = self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if !exists {
            writeln!(file, "{}", CSV_HEADER)?;
        }
        writeln!(file, "{}", snapshot.csv_row(&timestamp))?;
        debug!(path = %self.path.display(), seed = snapshot.seed, "appended race results");
        Ok(())
    }
}

impl Default for CsvResultsLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_PATH)
    }
}

impl ResultsExporter for CsvResultsLog {
    fn export(&mut self, snapshot: &ResultsSnapshot) -> Result<(), ExportError> {
        self.append(snapshot, OffsetDateTime::now_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use time::macros::datetime;

    fn snapshot() -> ResultsSnapshot {
        let config = RaceConfig::default();
        let grid = Grid::new(20, 20);
        let bfs = Agent::new(Algorithm::BreadthFirst, grid, 9);
        let astar = Agent::new(Algorithm::AStar, grid, 9);
        ResultsSnapshot::from_agents(9, &config, 2000, &bfs, &astar)
    }

    #[test]
    fn test_duration_is_clamped() {
        let s = snapshot();
        assert_eq!(s.duration_ticks, 960);
        assert_eq!(s.duration_secs, 60.0);
        assert_eq!(s.leader(), None);
    }

    #[test]
    fn test_recorder_keeps_first_snapshot() {
        let mut recorder = ResultsRecorder::new();
        assert!(recorder.snapshot().is_none());
        let first = snapshot();
        recorder.record(|| first);
        let mut second = first;
        second.seed = 10;
        assert_eq!(recorder.record(|| second), first);
        assert_eq!(recorder.snapshot(), Some(&first));
    }

    #[test]
    fn test_csv_row_format() {
        let mut s = snapshot();
        s.breadth_first.foods = 3;
        s.breadth_first.alive_secs = 12.5;
        s.breadth_first.nodes_expanded = 1234;
        s.a_star.foods = 4;
        s.a_star.alive_secs = 60.0;
        s.a_star.nodes_expanded = 321;
        assert_eq!(
            s.csv_row("2024-01-02 03:04:05"),
            "2024-01-02 03:04:05,9,60.000,3,12.500,1234,4,60.000,321"
        );
        assert_eq!(s.leader(), Some(Algorithm::AStar));
        assert!(s.to_string().contains("Nodes: 1,234"));
        assert!(s.to_string().ends_with("Leader: A*"));
    }

    #[test]
    fn test_log_writes_header_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = CsvResultsLog::new(dir.path().join("results.csv"));
        let s = snapshot();
        let at = datetime!(2024-05-06 07:08:09 UTC);
        log.append(&s, at).expect("first write");
        log.append(&s, at).expect("second write");

        let contents = std::fs::read_to_string(log.path()).expect("log exists");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].starts_with("2024-05-06 07:08:09,9,60.000,"));
        assert_eq!(lines[1], lines[2]);
    }

    #[test]
    fn test_log_stamps_rows_in_utc() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = CsvResultsLog::new(dir.path().join("results.csv"));
        log.append(&snapshot(), datetime!(2024-05-06 09:08:09 +2))
            .expect("write");
        let contents = std::fs::read_to_string(log.path()).expect("log exists");
        assert!(contents
            .lines()
            .nth(1)
            .map_or(false, |row| row.starts_with("2024-05-06 07:08:09,")));
    }

    #[test]
    fn test_unwritable_log_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut log = CsvResultsLog::new(dir.path().join("missing").join("results.csv"));
        assert!(matches!(log.export(&snapshot()), Err(ExportError::Io(_))));
    }
}
