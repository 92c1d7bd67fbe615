// src/io/sweep.rs

//! Monte Carlo "what if" runs: perturb demand and lead time, replay a session
//! headlessly for each draw, and summarize how the score holds up.

use crate::model::state::SimulationState;
use crate::simulation::config::{SimulationConfig, SimulationParams, SweepConfig};
use crate::simulation::engine::tick;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, NormalError};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("invalid demand distribution: {0}")]
    Distribution(#[from] NormalError),
}

/// Outcome of one perturbed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRecord {
    pub run: usize,
    pub market_demand: f64,
    pub lead_time: f64,
    pub final_score: i64,
    pub final_backlog: f64,
    pub trucks_arrived: u64,
    pub delivered: f64,
    pub shutdown_ticks: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepSummary {
    pub runs: usize,
    pub mean_score: f64,
    pub std_dev_score: f64,
    pub min_score: i64,
    pub max_score: i64,
    pub percentile_10: i64,
    pub percentile_50: i64,
    pub percentile_90: i64,
}

/// Draws `runs` parameter sets around `base`. Demand follows a normal
/// distribution clamped at zero; lead time is uniform within the spread.
pub fn sample_params(
    base: &SimulationParams,
    sweep: &SweepConfig,
    rng: &mut impl Rng,
) -> Result<Vec<SimulationParams>, SweepError> {
    let demand = Normal::new(base.market_demand, sweep.demand_std_dev.max(0.0))?;
    let spread = sweep.lead_time_spread.clamp(0.0, 1.0);
    let lead_low = base.lead_time * (1.0 - spread);
    let lead_high = base.lead_time * (1.0 + spread);

    let mut draws = Vec::with_capacity(sweep.runs);
    for _ in 0..sweep.runs {
        let market_demand = demand.sample(rng).round().max(0.0);
        let lead_time = if lead_high > lead_low {
            rng.gen_range(lead_low..=lead_high)
        } else {
            base.lead_time
        };
        draws.push(SimulationParams {
            market_demand,
            lead_time,
            ..base.clone()
        });
    }
    Ok(draws)
}

/// Runs one fresh session for `ticks` intervals without persistence.
pub fn run_headless(
    params: &SimulationParams,
    config: &SimulationConfig,
    ticks: usize,
) -> (SimulationState, u64) {
    let dt = config.time_units_per_step(params.speed_unit);
    let mut state = SimulationState::initial(params);
    let mut shutdown_ticks = 0;
    for _ in 0..ticks {
        state = tick(state, params, dt);
        if state.production_shutdown {
            shutdown_ticks += 1;
        }
    }
    (state, shutdown_ticks)
}

pub fn run_sweep(
    base: &SimulationParams,
    config: &SimulationConfig,
) -> Result<Vec<SweepRecord>, SweepError> {
    let sweep = &config.sweep;
    let mut rng = StdRng::seed_from_u64(sweep.seed);
    let draws = sample_params(&base.sanitized(), sweep, &mut rng)?;

    let records: Vec<SweepRecord> = draws
        .iter()
        .enumerate()
        .map(|(run, params)| {
            let (state, shutdown_ticks) = run_headless(params, config, sweep.ticks_per_run);
            SweepRecord {
                run,
                market_demand: params.market_demand,
                lead_time: params.lead_time,
                final_score: state.score,
                final_backlog: state.backlog,
                trucks_arrived: state.ledger.trucks_arrived,
                delivered: state.ledger.delivered,
                shutdown_ticks,
            }
        })
        .collect();

    info!(runs = records.len(), seed = sweep.seed, "sweep finished");
    Ok(records)
}

pub fn summarize(records: &[SweepRecord]) -> Option<SweepSummary> {
    if records.is_empty() {
        return None;
    }
    let mut scores: Vec<i64> = records.iter().map(|r| r.final_score).collect();
    scores.sort_unstable();

    let n = scores.len() as f64;
    let mean = scores.iter().map(|&s| s as f64).sum::<f64>() / n;
    let variance = scores.iter().map(|&s| (s as f64 - mean).powi(2)).sum::<f64>() / n;

    let percentile = |p: f64| {
        let index = ((p / 100.0) * (n - 1.0)).round() as usize;
        scores[index.min(scores.len() - 1)]
    };

    Some(SweepSummary {
        runs: scores.len(),
        mean_score: mean,
        std_dev_score: variance.sqrt(),
        min_score: scores[0],
        max_score: scores[scores.len() - 1],
        percentile_10: percentile(10.0),
        percentile_50: percentile(50.0),
        percentile_90: percentile(90.0),
    })
}
