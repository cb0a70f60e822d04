//! Coordinator state machine
//!
//! Glues dispatch, collection, and shutdown into one run:
//!
//! ```text
//! Idle → Dispatching → Collecting → Completing → Terminated
//! ```
//!
//! Each state is entered exactly once, strictly in order. Dispatch finishes
//! before collection begins; the two could be overlapped, but correctness
//! does not depend on it. The whole coordinator is single-threaded and
//! cooperative: one connection, one channel, one consume loop, and the
//! collector's accumulators are only ever touched from that loop.

pub mod collector;
pub mod dispatcher;
pub mod shutdown;

pub use collector::{Progress, ResultCollector};
pub use dispatcher::TaskDispatcher;
pub use shutdown::ShutdownBroadcaster;

use crate::broker::Broker;
use crate::catalog::SampleCatalog;
use crate::config::Config;
use crate::frames::EventBatch;
use crate::protocol::{self, ResultBody};
use crate::Result;
use anyhow::Context;
use futures_util::StreamExt;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Coordinator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Dispatching,
    Collecting,
    Completing,
    Terminated,
}

impl State {
    /// The single legal successor state, if any
    pub fn next(self) -> Option<State> {
        match self {
            State::Idle => Some(State::Dispatching),
            State::Dispatching => Some(State::Collecting),
            State::Collecting => Some(State::Completing),
            State::Completing => Some(State::Terminated),
            State::Terminated => None,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Idle => "idle",
            State::Dispatching => "dispatching",
            State::Collecting => "collecting",
            State::Completing => "completing",
            State::Terminated => "terminated",
        };
        write!(f, "{name}")
    }
}

/// Final product of a coordinator run, handed to the presentation layer
#[derive(Debug)]
pub struct AnalysisOutcome {
    /// Concatenated dataset per sample group
    pub datasets: BTreeMap<String, EventBatch>,
    /// Number of fragments collected per sample group
    pub fragment_counts: BTreeMap<String, usize>,
    /// Fixed task count of the run
    pub total_tasks: u64,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

/// Drives one analysis run end to end
pub struct AnalysisCoordinator {
    config: Config,
    catalog: SampleCatalog,
    state: State,
}

impl AnalysisCoordinator {
    /// Create a coordinator over a validated config and resolved catalog
    pub fn new(config: Config, catalog: SampleCatalog) -> Self {
        Self {
            config,
            catalog,
            state: State::Idle,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> State {
        self.state
    }

    fn advance(&mut self) {
        let next = self
            .state
            .next()
            .expect("coordinator advanced past the terminated state");
        if self.config.runtime.debug {
            eprintln!("DEBUG: state {} -> {}", self.state, next);
        }
        self.state = next;
    }

    /// Run the analysis: dispatch, collect, broadcast termination
    pub async fn run(mut self) -> Result<AnalysisOutcome> {
        let started = Instant::now();

        // A broker that cannot be reached is a fatal startup fault; there is
        // no retry loop.
        self.advance();
        let broker = Broker::connect(&self.config.broker).await?;

        let dispatcher = TaskDispatcher::new(&self.catalog);
        let total_tasks = dispatcher.total_tasks();
        println!("Dispatching {total_tasks} task(s)...");

        let published = dispatcher.dispatch(&broker).await?;
        debug_assert_eq!(published, total_tasks);

        self.advance();
        let mut collector = ResultCollector::new(self.catalog.labels(), total_tasks);
        self.collect(&broker, &mut collector).await?;

        self.advance();
        let broadcaster = ShutdownBroadcaster::new(self.config.workers.count);
        broadcaster.broadcast(&broker).await?;
        broker.close().await?;
        self.advance();

        let elapsed = started.elapsed();
        let frames = collector.into_frames();
        let fragment_counts = self
            .catalog
            .labels()
            .into_iter()
            .map(|label| {
                let count = frames.fragment_count(&label);
                (label, count)
            })
            .collect();

        Ok(AnalysisOutcome {
            datasets: frames.into_datasets(),
            fragment_counts,
            total_tasks,
            elapsed,
        })
    }

    /// Consume result messages until every task is accounted for
    ///
    /// The only suspension point is awaiting the next delivery. There is no
    /// timeout: if fewer result units arrive than tasks were dispatched, this
    /// blocks indefinitely.
    async fn collect(&self, broker: &Broker, collector: &mut ResultCollector) -> Result<()> {
        if collector.is_complete() {
            return Ok(());
        }

        let mut consumer = broker.consume_results("fourlep-collector").await?;
        println!("Waiting for results...");

        let mut done = false;
        while !done {
            let delivery = match consumer.next().await {
                Some(delivery) => delivery.context("Failed to receive from result queue")?,
                None => anyhow::bail!("Result queue consumer ended before all tasks completed"),
            };

            let message = protocol::decode_result(&delivery.properties, &delivery.data)?;
            let progress_line = match &message.body {
                ResultBody::Data { batch, .. } => Some((message.sample.clone(), *batch)),
                ResultBody::NoData => None,
            };

            done = collector.observe(message)?;

            if let Some((sample, batch)) = progress_line {
                println!(" {}  {}  {}", collector.progress().units(), sample, batch);
            }
        }

        // Unsubscribe only; the connection stays open for the termination
        // broadcast.
        broker.cancel(&consumer).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CatalogConfig, SampleSpec};

    fn test_config() -> Config {
        Config {
            broker: Default::default(),
            workers: Default::default(),
            catalog: Default::default(),
            samples: vec![SampleSpec {
                label: "Data".to_string(),
                files: vec!["a.root".to_string()],
                dids: Vec::new(),
                color: None,
            }],
            output: Default::default(),
            runtime: Default::default(),
        }
    }

    #[test]
    fn test_states_advance_in_one_order() {
        let mut state = State::Idle;
        let mut seen = vec![state];
        while let Some(next) = state.next() {
            state = next;
            seen.push(state);
        }

        assert_eq!(
            seen,
            vec![
                State::Idle,
                State::Dispatching,
                State::Collecting,
                State::Completing,
                State::Terminated,
            ]
        );
    }

    #[test]
    fn test_terminated_has_no_successor() {
        assert_eq!(State::Terminated.next(), None);
    }

    #[test]
    fn test_coordinator_starts_idle() {
        let config = test_config();
        let catalog = SampleCatalog::resolve(&config.samples, &CatalogConfig::default()).unwrap();
        let coordinator = AnalysisCoordinator::new(config, catalog);

        assert_eq!(coordinator.state(), State::Idle);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(State::Collecting.to_string(), "collecting");
        assert_eq!(State::Terminated.to_string(), "terminated");
    }
}
