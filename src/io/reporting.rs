// src/io/reporting.rs

use crate::io::sweep::SweepRecord;
use crate::model::state::SimulationState;
use crate::simulation::metrics::DisplayMetrics;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One row of the per-tick history export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub tick: u64,
    pub elapsed_days: f64,
    pub factory_stock: f64,
    pub warehouse_stock: f64,
    pub finished_goods_stock: f64,
    pub backlog: f64,
    pub worker_progress: f64,
    pub worker_load: f64,
    pub truck_phase: &'static str,
    pub truck_delivery: f64,
    pub production_shutdown: bool,
    pub score: i64,
    pub net_cash_flow: f64,
    pub alerts: String,
}

impl HistoryRecord {
    pub fn capture(state: &SimulationState, metrics: &DisplayMetrics) -> Self {
        Self {
            tick: state.tick,
            elapsed_days: state.elapsed_days,
            factory_stock: state.factory_stock,
            warehouse_stock: state.warehouse_stock,
            finished_goods_stock: state.finished_goods_stock,
            backlog: state.backlog,
            worker_progress: state.worker.progress,
            worker_load: state.worker.load,
            truck_phase: state.truck.phase_name(),
            truck_delivery: state.truck.delivery(),
            production_shutdown: state.production_shutdown,
            score: state.score,
            net_cash_flow: metrics.net_cash_flow.value,
            alerts: metrics
                .alerts
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write CSV to {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write CSV: {0}")]
    Stream(#[from] csv::Error),
    #[error("failed to flush CSV output: {0}")]
    Flush(#[from] io::Error),
}

/// Serializes `data` as CSV rows into any writer.
pub fn write_records<W, T>(writer: W, data: &[T]) -> Result<(), ReportError>
where
    W: io::Write,
    T: Serialize,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for record in data {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_file<T: Serialize>(file_path: &Path, data: &[T]) -> Result<(), ReportError> {
    let with_path = |source| ReportError::Csv {
        path: file_path.to_path_buf(),
        source,
    };
    let mut wtr = csv::Writer::from_path(file_path).map_err(with_path)?;
    for record in data {
        wtr.serialize(record).map_err(with_path)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the tick history to a CSV file.
pub fn write_simulation_log(file_path: &Path, data: &[HistoryRecord]) -> Result<(), ReportError> {
    write_file(file_path, data)?;
    tracing::info!(rows = data.len(), path = %file_path.display(), "history exported");
    Ok(())
}

/// Writes one row per sweep run to a CSV file.
pub fn write_sweep_results(file_path: &Path, data: &[SweepRecord]) -> Result<(), ReportError> {
    write_file(file_path, data)?;
    tracing::info!(rows = data.len(), path = %file_path.display(), "sweep exported");
    Ok(())
}
