// src/simulation/session.rs

use crate::io::snapshot::{self, SnapshotStore};
use crate::model::state::SimulationState;
use crate::simulation::config::{time_units_per_step, SimulationConfig, SimulationParams};
use crate::simulation::engine;
use crate::simulation::metrics::DisplayMetrics;
use std::ops::ControlFlow;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Owns the simulation state between intervals and applies the host's actions
/// (start, pause, reset) to it.
pub struct Session<S: SnapshotStore> {
    params: SimulationParams,
    state: SimulationState,
    interval_ms: u64,
    running: bool,
    reset_token: u64,
    store: S,
}

impl<S: SnapshotStore> Session<S> {
    /// Opens a session, resuming from the store when it holds a snapshot for
    /// this reset token and starting fresh otherwise.
    pub fn new(params: SimulationParams, config: &SimulationConfig, store: S) -> Self {
        let params = params.sanitized();
        let reset_token = config.reset_token;
        let state = Self::resume_or_fresh(&store, reset_token, &params);
        Self {
            params,
            state,
            interval_ms: config.base_interval_ms,
            running: config.start_running,
            reset_token,
            store,
        }
    }

    fn resume_or_fresh(store: &S, reset_token: u64, params: &SimulationParams) -> SimulationState {
        let stored = match store.load() {
            Ok(stored) => stored,
            Err(err) => {
                warn!("Unable to read saved state: {}", err);
                None
            }
        };
        let Some(text) = stored else {
            return SimulationState::initial(params);
        };
        match snapshot::decode(&text, reset_token, params) {
            Ok(state) => {
                info!(tick = state.tick, score = state.score, "session.resumed");
                state
            }
            Err(err) => {
                warn!("Discarding saved state: {}", err);
                SimulationState::initial(params)
            }
        }
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// New host parameters take effect from the next interval.
    pub fn set_params(&mut self, params: SimulationParams) {
        self.params = params.sanitized();
    }

    pub fn reset_token(&self) -> u64 {
        self.reset_token
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Simulated days per interval at the current speed.
    pub fn time_units_per_step(&self) -> f64 {
        time_units_per_step(self.interval_ms, self.params.speed_unit)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn toggle(&mut self) -> bool {
        self.running = !self.running;
        self.running
    }

    /// Stops the session, throws away the stored snapshot and starts over.
    pub fn reset(&mut self) {
        self.running = false;
        self.reset_token += 1;
        self.state = SimulationState::initial(&self.params);
        if let Err(err) = self.store.clear() {
            warn!("Unable to clear saved state: {}", err);
        }
        self.persist();
        debug!(reset_token = self.reset_token, "session.reset");
    }

    /// One ticker interval: tick when running, then project and persist.
    pub fn on_interval(&mut self) -> DisplayMetrics {
        if self.running {
            let dt = self.time_units_per_step();
            let state = std::mem::take(&mut self.state);
            self.state = engine::tick(state, &self.params, dt);
        } else {
            engine::sync_planning(&mut self.state, &self.params);
        }
        let metrics = self.metrics();
        self.persist();
        metrics
    }

    pub fn metrics(&self) -> DisplayMetrics {
        DisplayMetrics::project(&self.state, &self.params)
    }

    fn persist(&mut self) {
        let result = snapshot::encode(&self.state, self.reset_token)
            .and_then(|text| self.store.save(text));
        if let Err(err) = result {
            warn!("Unable to persist state: {}", err);
        }
    }
}

/// Fixed-interval driver for a session loop.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    realtime: bool,
}

impl Ticker {
    pub fn new(interval: Duration, realtime: bool) -> Self {
        Self { interval, realtime }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_interval_ms),
            config.realtime,
        )
    }

    /// Calls `on_tick` up to `limit` times in order. Returning `Break` stops the
    /// ticker; no later interval runs. Returns the number of intervals fired.
    pub fn run<F>(&self, limit: usize, mut on_tick: F) -> usize
    where
        F: FnMut(usize) -> ControlFlow<()>,
    {
        let mut deadline = Instant::now();
        for index in 0..limit {
            if self.realtime {
                deadline += self.interval;
                let now = Instant::now();
                if deadline > now {
                    thread::sleep(deadline - now);
                }
            }
            if on_tick(index).is_break() {
                return index + 1;
            }
        }
        limit
    }
}
