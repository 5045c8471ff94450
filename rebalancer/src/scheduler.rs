//! The outer loop: every pair in order, forever.
//!
//! Pairs are processed strictly one after another with `pair_delay` between
//! them, and rounds are separated by `round_delay`. Any error is fatal: it is
//! logged, announced, and returned to the caller, which stops the process.

use std::convert::Infallible;
use std::thread;

use log::{error, info};
use pairbalance::PairConfig;
use pairbalance_broker::Broker;

use crate::config::ScheduleConfig;
use crate::engine::{CycleReport, Engine};
use crate::error::Result;
use crate::notify::{Notice, Notifier};
use crate::store::StickStore;

pub struct Scheduler<B, S, N> {
    engine: Engine<B, S, N>,
    pairs: Vec<PairConfig>,
    schedule: ScheduleConfig,
}

impl<B: Broker, S: StickStore, N: Notifier> Scheduler<B, S, N> {
    pub fn new(engine: Engine<B, S, N>, pairs: Vec<PairConfig>, schedule: ScheduleConfig) -> Self {
        Self {
            engine,
            pairs,
            schedule,
        }
    }

    pub fn engine(&self) -> &Engine<B, S, N> {
        &self.engine
    }

    /// One pass over every configured pair.
    pub fn run_round(&mut self) -> Result<Vec<CycleReport>> {
        let mut reports = Vec::with_capacity(self.pairs.len());
        for pair in &self.pairs {
            info!("--- {} ---", pair.symbol);
            reports.push(self.engine.run_pair(pair)?);
            thread::sleep(self.schedule.pair_delay());
        }
        Ok(reports)
    }

    /// Connect and run a single round.
    pub fn run_once(&mut self) -> Result<Vec<CycleReport>> {
        let result = self.engine.connect().and_then(|()| self.run_round());
        self.fail_on_error(result)
    }

    /// Connect and loop until the first error.
    pub fn run(&mut self) -> Result<Infallible> {
        let connected = self.engine.connect();
        self.fail_on_error(connected)?;
        self.engine.notify(Notice::Started {
            pairs: self.pairs.iter().map(|p| p.symbol.clone()).collect(),
        });

        let mut round: u64 = 0;
        loop {
            round += 1;
            info!("Round {round}");
            let result = self.run_round();
            self.fail_on_error(result)?;
            thread::sleep(self.schedule.round_delay());
        }
    }

    fn fail_on_error<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            error!("{e}");
            self.engine.notify(Notice::Failed {
                message: e.to_string(),
            });
        }
        result
    }
}
