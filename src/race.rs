//! The race state machine
//!
//! ```plain
//! MENU --start--> RACE --tick--> RACE
//!                 RACE --time limit or both dead--> RESULTS
//! RESULTS --replay same seed | replay new seed--> RACE
//! RESULTS --menu--> MENU
//! ```
//!
//! Every race is a brand new [`RaceSession`], a finished session is never
//! resumed.
use std::fmt;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::agent::{Agent, StepOutcome};
use crate::config::{ConfigError, RaceConfig};
use crate::results::{
    leader_by_foods, ExportError, ResultsExporter, ResultsRecorder, ResultsSnapshot,
};
use crate::search::Algorithm;

/// Where the orchestrator is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    /// idle, waiting for a start
    Menu,
    /// both agents ticking
    Race,
    /// finished, waiting for the next command
    Results,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Menu => write!(f, "MENU"),
            Phase::Race => write!(f, "RACE"),
            Phase::Results => write!(f, "RESULTS"),
        }
    }
}

/// The commands an outer driver can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// MENU -> RACE with a fresh seed
    StartRace,
    /// RESULTS -> RACE with the last seed
    ReplaySameSeed,
    /// RESULTS -> RACE with a fresh seed
    ReplayNewSeed,
    /// export the last results, stays in RESULTS
    SaveResults,
    /// RESULTS -> MENU
    ReturnToMenu,
    /// stop the driver
    Quit,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::StartRace => "start-race",
            Command::ReplaySameSeed => "replay-same-seed",
            Command::ReplayNewSeed => "replay-new-seed",
            Command::SaveResults => "save-results",
            Command::ReturnToMenu => "return-to-menu",
            Command::Quit => "quit",
        };
        write!(f, "{}", name)
    }
}

/// What the driver should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    #[allow(missing_docs)]
    Continue,
    #[allow(missing_docs)]
    Quit,
}

/// The result of one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// the race goes on
    Running,
    /// this tick ended the race
    Finished(ResultsSnapshot),
}

/// Errors from driving the orchestrator
#[derive(Debug, Error)]
pub enum RaceError {
    /// ticks only make sense during a race
    #[error("cannot tick while in {phase}")]
    NotRacing {
        #[allow(missing_docs)]
        phase: Phase,
    },
    /// the command isn't accepted in the current phase
    #[error("{command} is not available in {phase}")]
    InvalidCommand {
        #[allow(missing_docs)]
        command: Command,
        #[allow(missing_docs)]
        phase: Phase,
    },
    /// nothing to save yet
    #[error("no finished race to save")]
    NoResults,
    #[allow(missing_docs)]
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[allow(missing_docs)]
    #[error("saving results failed: {0}")]
    Export(#[from] ExportError),
}

/// One race: two fresh agents fed from identically seeded random sources.
#[derive(Debug, Clone)]
pub struct RaceSession {
    config: RaceConfig,
    seed: u64,
    elapsed_ticks: u64,
    end_tick: Option<u64>,
    breadth_first: Agent,
    a_star: Agent,
    recorder: ResultsRecorder,
}

impl RaceSession {
    /// Set up a race. Invalid configs are rejected here, before any agent exists.
    pub fn new(config: RaceConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = config.grid();
        debug!(seed, width = grid.width(), height = grid.height(), "new race session");
        Ok(RaceSession {
            config,
            seed,
            elapsed_ticks: 0,
            end_tick: None,
            breadth_first: Agent::new(Algorithm::BreadthFirst, grid, seed),
            a_star: Agent::new(Algorithm::AStar, grid, seed),
            recorder: ResultsRecorder::new(),
        })
    }

    #[allow(missing_docs)]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[allow(missing_docs)]
    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    /// completed ticks
    pub fn elapsed_ticks(&self) -> u64 {
        self.elapsed_ticks
    }

    /// the tick the race ended on, `None` while racing
    pub fn end_tick(&self) -> Option<u64> {
        self.end_tick
    }

    #[allow(missing_docs)]
    pub fn is_finished(&self) -> bool {
        self.end_tick.is_some()
    }

    /// the agent steered by `algorithm`
    pub fn agent(&self, algorithm: Algorithm) -> &Agent {
        match algorithm {
            Algorithm::BreadthFirst => &self.breadth_first,
            Algorithm::AStar => &self.a_star,
        }
    }

    /// both agents, in `Algorithm::ALL` order
    pub fn agents(&self) -> [&Agent; 2] {
        [&self.breadth_first, &self.a_star]
    }

    /// the agent with more food so far, `None` when level
    pub fn leader(&self) -> Option<Algorithm> {
        leader_by_foods(self.breadth_first.foods_eaten(), self.a_star.foods_eaten())
    }

    #[allow(missing_docs)]
    pub fn elapsed_secs(&self) -> f64 {
        self.config.ticks_to_secs(self.elapsed_ticks)
    }

    /// time left before the limit, zero once finished on time
    pub fn remaining_secs(&self) -> f64 {
        let remaining = self.config.time_limit_ticks.saturating_sub(self.elapsed_ticks);
        self.config.ticks_to_secs(remaining)
    }

    /// the recorded results, once the race is over
    pub fn results(&self) -> Option<&ResultsSnapshot> {
        self.recorder.snapshot()
    }

    /// Step both agents once and check whether the race is over. The agents
    /// live on separate grids with separate random sources, so neither sees
    /// the other's move and the order they're stepped in doesn't matter.
    /// Ticking a finished session returns its results unchanged.
    pub fn tick(&mut self) -> TickOutcome {
        if let Some(results) = self.recorder.snapshot() {
            return TickOutcome::Finished(*results);
        }

        let bfs = self.breadth_first.step();
        let astar = self.a_star.step();
        self.elapsed_ticks += 1;
        for (algorithm, outcome) in [(Algorithm::BreadthFirst, bfs), (Algorithm::AStar, astar)] {
            if let StepOutcome::Died(mv) = outcome {
                debug!(tick = self.elapsed_ticks, %algorithm, %mv, "agent out of the race");
            }
        }

        let out_of_time = self.elapsed_ticks >= self.config.time_limit_ticks;
        let all_dead = !self.breadth_first.is_alive() && !self.a_star.is_alive();
        if !(out_of_time || all_dead) {
            return TickOutcome::Running;
        }

        let end_tick = self.elapsed_ticks.min(self.config.time_limit_ticks);
        self.end_tick = Some(end_tick);
        let (seed, config) = (self.seed, self.config);
        let (breadth_first, a_star) = (&self.breadth_first, &self.a_star);
        let results = self.recorder.record(|| {
            ResultsSnapshot::from_agents(seed, &config, end_tick, breadth_first, a_star)
        });
        debug!(
            seed,
            end_tick,
            out_of_time,
            all_dead,
            bfs_foods = results.breadth_first.foods,
            astar_foods = results.a_star.foods,
            "race finished"
        );
        TickOutcome::Finished(results)
    }
}

/// Read only view of the orchestrator for renderers
#[derive(Debug, Clone, Copy)]
pub struct RaceView<'a> {
    #[allow(missing_docs)]
    pub phase: Phase,
    /// the current or just finished session
    pub session: Option<&'a RaceSession>,
    /// seconds raced so far, or the recorded race length in RESULTS
    pub elapsed_secs: f64,
    /// seconds left before the time limit
    pub remaining_secs: f64,
}

/// Owns the current session and moves between MENU, RACE and RESULTS.
#[derive(Debug)]
pub struct RaceOrchestrator {
    config: RaceConfig,
    phase: Phase,
    seed: u64,
    seeds: SmallRng,
    session: Option<RaceSession>,
}

impl RaceOrchestrator {
    /// An orchestrator drawing fresh seeds from entropy
    pub fn new(config: RaceConfig) -> Result<Self, ConfigError> {
        Self::with_seed_source(config, SmallRng::from_entropy())
    }

    /// An orchestrator drawing fresh seeds from `seeds`
    pub fn with_seed_source(config: RaceConfig, mut seeds: SmallRng) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = Self::draw_seed(&mut seeds);
        Ok(RaceOrchestrator {
            config,
            phase: Phase::Menu,
            seed,
            seeds,
            session: None,
        })
    }

    fn draw_seed(seeds: &mut SmallRng) -> u64 {
        u64::from(seeds.gen::<u32>())
    }

    #[allow(missing_docs)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[allow(missing_docs)]
    pub fn config(&self) -> &RaceConfig {
        &self.config
    }

    /// the seed of the current or last race
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// the current session, `None` in MENU
    pub fn session(&self) -> Option<&RaceSession> {
        self.session.as_ref()
    }

    /// the last recorded results, only in RESULTS
    pub fn results(&self) -> Option<&ResultsSnapshot> {
        self.session.as_ref().and_then(RaceSession::results)
    }

    /// what a renderer needs for the current frame
    pub fn view(&self) -> RaceView<'_> {
        let session = self.session.as_ref();
        let elapsed_secs = match (self.phase, self.results()) {
            (Phase::Results, Some(results)) => results.duration_secs,
            _ => session.map_or(0.0, RaceSession::elapsed_secs),
        };
        RaceView {
            phase: self.phase,
            session,
            elapsed_secs,
            remaining_secs: (self.config.time_limit_secs() - elapsed_secs).max(0.0),
        }
    }

    /// MENU -> RACE. With `None` a fresh seed is drawn.
    pub fn start_race(&mut self, seed: Option<u64>) -> Result<(), RaceError> {
        self.expect_phase(Phase::Menu, Command::StartRace)?;
        let seed = seed.unwrap_or_else(|| Self::draw_seed(&mut self.seeds));
        self.begin(seed)
    }

    /// RESULTS -> RACE with the same seed, so the same food sequence
    pub fn replay_same_seed(&mut self) -> Result<(), RaceError> {
        self.expect_phase(Phase::Results, Command::ReplaySameSeed)?;
        self.begin(self.seed)
    }

    /// RESULTS -> RACE with a freshly drawn seed
    pub fn replay_new_seed(&mut self) -> Result<(), RaceError> {
        self.expect_phase(Phase::Results, Command::ReplayNewSeed)?;
        let seed = Self::draw_seed(&mut self.seeds);
        self.begin(seed)
    }

    /// RESULTS -> MENU, the finished session is dropped
    pub fn return_to_menu(&mut self) -> Result<(), RaceError> {
        self.expect_phase(Phase::Results, Command::ReturnToMenu)?;
        self.session = None;
        self.phase = Phase::Menu;
        info!("back to menu");
        Ok(())
    }

    /// Hand the last results to `exporter`. A failed export is returned but
    /// leaves the orchestrator in RESULTS with its results intact.
    pub fn save_results(&self, exporter: &mut dyn ResultsExporter) -> Result<(), RaceError> {
        self.expect_phase(Phase::Results, Command::SaveResults)?;
        let results = self.results().ok_or(RaceError::NoResults)?;
        if let Err(e) = exporter.export(results) {
            warn!(error = %e, seed = results.seed, "could not save results");
            return Err(e.into());
        }
        info!(seed = results.seed, "results saved");
        Ok(())
    }

    /// Advance the running race by one tick, moving to RESULTS when it ends.
    /// Ticking outside RACE is an error.
    #[instrument(level = "trace", skip_all, fields(seed = self.seed))]
    pub fn tick(&mut self) -> Result<TickOutcome, RaceError> {
        let session = match (self.phase, self.session.as_mut()) {
            (Phase::Race, Some(session)) => session,
            (phase, _) => return Err(RaceError::NotRacing { phase }),
        };
        let outcome = session.tick();
        if let TickOutcome::Finished(results) = &outcome {
            self.phase = Phase::Results;
            info!(
                seed = results.seed,
                duration_secs = results.duration_secs,
                leader = ?results.leader(),
                "race over"
            );
        }
        Ok(outcome)
    }

    /// Dispatch a driver command
    pub fn handle(
        &mut self,
        command: Command,
        exporter: &mut dyn ResultsExporter,
    ) -> Result<Control, RaceError> {
        match command {
            Command::StartRace => self.start_race(None)?,
            Command::ReplaySameSeed => self.replay_same_seed()?,
            Command::ReplayNewSeed => self.replay_new_seed()?,
            Command::SaveResults => self.save_results(exporter)?,
            Command::ReturnToMenu => self.return_to_menu()?,
            Command::Quit => return Ok(Control::Quit),
        }
        Ok(Control::Continue)
    }

    fn expect_phase(&self, phase: Phase, command: Command) -> Result<(), RaceError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(RaceError::InvalidCommand {
                command,
                phase: self.phase,
            })
        }
    }

    fn begin(&mut self, seed: u64) -> Result<(), RaceError> {
        let session = RaceSession::new(self.config, seed)?;
        self.seed = seed;
        self.session = Some(session);
        self.phase = Phase::Race;
        info!(seed, "race started");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Collect {
        rows: Vec<ResultsSnapshot>,
        fail: bool,
    }

    impl ResultsExporter for Collect {
        fn export(&mut self, snapshot: &ResultsSnapshot) -> Result<(), ExportError> {
            if self.fail {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
            }
            self.rows.push(*snapshot);
            Ok(())
        }
    }

    fn orchestrator(config: RaceConfig) -> RaceOrchestrator {
        RaceOrchestrator::with_seed_source(config, SmallRng::seed_from_u64(1))
            .expect("valid config")
    }

    fn run_to_end(o: &mut RaceOrchestrator) -> ResultsSnapshot {
        loop {
            if let TickOutcome::Finished(results) = o.tick().expect("racing") {
                return results;
            }
        }
    }

    #[test]
    fn test_first_tick_both_close_in_on_the_same_food() {
        let mut o = orchestrator(RaceConfig::default());
        o.start_race(Some(5)).expect("from menu");
        let session = o.session().expect("racing");
        let food = session.agent(Algorithm::BreadthFirst).food();
        assert_eq!(food, session.agent(Algorithm::AStar).food());
        let start = o.config().grid().center();
        let distance = start.manhattan_distance(&food);

        assert_eq!(o.tick().expect("racing"), TickOutcome::Running);
        for agent in o.session().expect("racing").agents() {
            assert_eq!(agent.head().manhattan_distance(&start), 1);
            if distance > 1 {
                assert_eq!(agent.head().manhattan_distance(&food), distance - 1);
            }
        }
    }

    #[test]
    fn test_time_limit_ends_race() {
        let config = RaceConfig {
            time_limit_ticks: 10,
            ..RaceConfig::default()
        };
        let mut o = orchestrator(config);
        o.start_race(Some(3)).expect("from menu");
        let results = run_to_end(&mut o);
        assert_eq!(o.phase(), Phase::Results);
        assert_eq!(results.duration_ticks, 10);
        assert_eq!(o.session().and_then(RaceSession::end_tick), Some(10));
        assert_eq!(o.view().remaining_secs, 0.0);
        assert!(matches!(o.tick(), Err(RaceError::NotRacing { phase: Phase::Results })));
    }

    #[test]
    fn test_replay_same_seed_is_identical() {
        let config = RaceConfig {
            time_limit_ticks: 200,
            ..RaceConfig::default()
        };
        let mut o = orchestrator(config);
        o.start_race(Some(77)).expect("from menu");
        let first = run_to_end(&mut o);
        o.replay_same_seed().expect("from results");
        assert_eq!(o.phase(), Phase::Race);
        let second = run_to_end(&mut o);
        assert_eq!(first, second);
        assert_eq!(second.seed, 77);
    }

    #[test]
    fn test_commands_follow_the_state_machine() {
        let mut log = Collect::default();
        let mut o = orchestrator(RaceConfig {
            time_limit_ticks: 5,
            ..RaceConfig::default()
        });
        assert!(matches!(o.tick(), Err(RaceError::NotRacing { phase: Phase::Menu })));
        assert!(matches!(
            o.handle(Command::ReplaySameSeed, &mut log),
            Err(RaceError::InvalidCommand { .. })
        ));
        assert_eq!(o.handle(Command::StartRace, &mut log).ok(), Some(Control::Continue));
        assert!(matches!(
            o.handle(Command::SaveResults, &mut log),
            Err(RaceError::InvalidCommand { phase: Phase::Race, .. })
        ));
        run_to_end(&mut o);
        let seed = o.seed();

        o.handle(Command::SaveResults, &mut log).expect("saved");
        assert_eq!(log.rows.len(), 1);
        assert_eq!(log.rows[0].seed, seed);

        o.handle(Command::ReplayNewSeed, &mut log).expect("from results");
        assert_eq!(o.phase(), Phase::Race);
        run_to_end(&mut o);

        o.handle(Command::ReturnToMenu, &mut log).expect("from results");
        assert_eq!(o.phase(), Phase::Menu);
        assert!(o.session().is_none());
        assert_eq!(o.handle(Command::Quit, &mut log).ok(), Some(Control::Quit));
    }

    #[test]
    fn test_failed_save_keeps_results() {
        let mut o = orchestrator(RaceConfig {
            time_limit_ticks: 3,
            ..RaceConfig::default()
        });
        o.start_race(None).expect("from menu");
        let results = run_to_end(&mut o);
        let mut broken = Collect {
            fail: true,
            ..Collect::default()
        };
        assert!(matches!(
            o.save_results(&mut broken),
            Err(RaceError::Export(ExportError::Io(_)))
        ));
        assert_eq!(o.phase(), Phase::Results);
        assert_eq!(o.results(), Some(&results));
    }

    #[test]
    fn test_invalid_config_never_races() {
        let bad = RaceConfig {
            width: 0,
            ..RaceConfig::default()
        };
        assert!(RaceOrchestrator::new(bad).is_err());
        assert!(RaceSession::new(bad, 1).is_err());
    }

    #[test]
    fn test_session_tick_after_finish_is_stable() {
        let config = RaceConfig {
            time_limit_ticks: 2,
            ..RaceConfig::default()
        };
        let mut session = RaceSession::new(config, 4).expect("valid");
        assert_eq!(session.tick(), TickOutcome::Running);
        let done = session.tick();
        assert!(matches!(done, TickOutcome::Finished(_)));
        assert_eq!(session.tick(), done);
        assert_eq!(session.elapsed_ticks(), 2);
    }
}
