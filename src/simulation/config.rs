// src/simulation/config.rs

use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One in-game day per simulation time unit.
pub const SIM_TIME_UNITS_PER_DAY: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scenario {
    #[default]
    Accurate,
    Biased,
}

impl Scenario {
    /// Unknown labels fall back to the accurate scenario.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "biased forecast" | "biased" => Scenario::Biased,
            _ => Scenario::Accurate,
        }
    }

    pub fn is_biased(self) -> bool {
        matches!(self, Scenario::Biased)
    }

    /// Forecast error applied to the planned production rate.
    pub fn production_bias(self) -> f64 {
        match self {
            Scenario::Accurate => 1.0,
            Scenario::Biased => 1.2,
        }
    }

    /// Forecast error applied to market demand.
    pub fn demand_bias(self) -> f64 {
        match self {
            Scenario::Accurate => 1.0,
            Scenario::Biased => 1.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeedUnit {
    #[default]
    Minute,
    TenSeconds,
    Second,
}

impl SpeedUnit {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "10-second" => SpeedUnit::TenSeconds,
            "second" => SpeedUnit::Second,
            _ => SpeedUnit::Minute,
        }
    }

    pub fn factor(self) -> f64 {
        match self {
            SpeedUnit::Minute => 1.0,
            SpeedUnit::TenSeconds => 6.0,
            SpeedUnit::Second => 60.0,
        }
    }
}

/// The host-controlled knobs of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    /// Supplier lead time in days.
    pub lead_time: f64,
    /// Minimum order quantity per truck.
    pub moq: f64,
    /// Nominal production requirement (units/day). Production itself follows the plan.
    pub production_rate: f64,
    /// Market demand (units/day).
    pub market_demand: f64,
    /// Raw-material safety stock, shared by factory and warehouse.
    pub safety_stock: f64,
    pub fg_safety_stock: f64,
    pub initial_fg_stock: f64,
    /// Shuttle batch size.
    pub factory_batch: f64,
    pub scenario: Scenario,
    pub speed_unit: SpeedUnit,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            lead_time: 6.0,
            moq: 160.0,
            production_rate: 200.0,
            market_demand: 180.0,
            safety_stock: 180.0,
            fg_safety_stock: 160.0,
            initial_fg_stock: 200.0,
            factory_batch: 40.0,
            scenario: Scenario::Accurate,
            speed_unit: SpeedUnit::Minute,
        }
    }
}

impl SimulationParams {
    /// Builds params from loosely typed JSON. Missing or malformed numbers take
    /// the default, negative ones are floored at zero.
    pub fn from_value(value: &Value) -> Self {
        let defaults = Self::default();
        let field = |key: &str, fallback: f64| safe_number(value.get(key), fallback).max(0.0);
        let scenario = value
            .get("scenario")
            .and_then(Value::as_str)
            .map(Scenario::from_label)
            .unwrap_or(defaults.scenario);
        let speed_unit = value
            .get("speed_unit")
            .and_then(Value::as_str)
            .map(SpeedUnit::from_label)
            .unwrap_or(defaults.speed_unit);

        Self {
            lead_time: field("lead_time", defaults.lead_time),
            moq: field("moq", defaults.moq),
            production_rate: field("production_rate", defaults.production_rate),
            market_demand: field("market_demand", defaults.market_demand),
            safety_stock: field("safety_stock", defaults.safety_stock),
            fg_safety_stock: field("fg_safety_stock", defaults.fg_safety_stock),
            initial_fg_stock: field("initial_fg_stock", defaults.initial_fg_stock),
            factory_batch: field("factory_batch", defaults.factory_batch),
            scenario,
            speed_unit,
        }
    }

    /// Re-applies the floors to params built in code.
    pub fn sanitized(&self) -> Self {
        let clean = |v: f64, fallback: f64| if v.is_finite() { v.max(0.0) } else { fallback };
        let defaults = Self::default();
        Self {
            lead_time: clean(self.lead_time, defaults.lead_time),
            moq: clean(self.moq, defaults.moq),
            production_rate: clean(self.production_rate, defaults.production_rate),
            market_demand: clean(self.market_demand, defaults.market_demand),
            safety_stock: clean(self.safety_stock, defaults.safety_stock),
            fg_safety_stock: clean(self.fg_safety_stock, defaults.fg_safety_stock),
            initial_fg_stock: clean(self.initial_fg_stock, defaults.initial_fg_stock),
            factory_batch: clean(self.factory_batch, defaults.factory_batch),
            scenario: self.scenario,
            speed_unit: self.speed_unit,
        }
    }

    /// Units the worker shuttle carries per trip. Never below one.
    pub fn worker_capacity(&self) -> f64 {
        self.factory_batch.max(1.0)
    }

    /// High-water mark for finished goods before the display flags overstock.
    pub fn fg_high_stock_threshold(&self) -> f64 {
        (self.fg_safety_stock * 2.0).max(self.initial_fg_stock + self.market_demand.max(0.0) * 2.0)
    }
}

/// Reads a JSON number (or numeric string) as a finite f64.
pub fn safe_number(value: Option<&Value>, fallback: f64) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(num) if num.is_finite() => num,
        _ => fallback,
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub runs: usize,
    pub ticks_per_run: usize,
    pub seed: u64,
    /// Standard deviation of sampled daily demand.
    pub demand_std_dev: f64,
    /// Lead time is drawn uniformly from `lead_time * (1 ± lead_time_spread)`.
    pub lead_time_spread: f64,
    pub output_path: Option<PathBuf>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            runs: 0,
            ticks_per_run: 2_000,
            seed: 7,
            demand_std_dev: 30.0,
            lead_time_spread: 0.25,
            output_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Wall-clock length of one ticker interval.
    pub base_interval_ms: u64,
    pub max_ticks: usize,
    /// Sleep between intervals instead of running as fast as possible.
    pub realtime: bool,
    pub start_running: bool,
    pub reset_token: u64,
    pub history_path: Option<PathBuf>,
    pub snapshot_path: Option<PathBuf>,
    /// Log a progress line every this many ticks (0 disables).
    pub log_every: usize,
    pub sweep: SweepConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: 120,
            max_ticks: 5_000,
            realtime: false,
            start_running: true,
            reset_token: 0,
            history_path: Some(PathBuf::from("simulation_results.csv")),
            snapshot_path: None,
            log_every: 500,
            sweep: SweepConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Simulated days covered by one interval at the given speed.
    pub fn time_units_per_step(&self, speed: SpeedUnit) -> f64 {
        time_units_per_step(self.base_interval_ms, speed)
    }
}

/// Simulated days covered by one interval of `base_interval_ms` at `speed`.
pub fn time_units_per_step(base_interval_ms: u64, speed: SpeedUnit) -> f64 {
    (base_interval_ms as f64 / 60_000.0) * speed.factor()
}

/// On-disk layout of a run configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub params: SimulationParams,
    pub config: SimulationConfig,
}

impl ConfigFile {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let root: Value = serde_json::from_str(json)?;
        if !root.is_object() {
            return Err(ConfigError::NotAnObject);
        }
        let params = root
            .get("params")
            .map(SimulationParams::from_value)
            .unwrap_or_default();
        let config = match root.get("config") {
            Some(section) => serde_json::from_value(section.clone())?,
            None => SimulationConfig::default(),
        };
        Ok(Self { params, config })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse simulation config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read simulation config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("simulation config must be a JSON object")]
    NotAnObject,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        let params = SimulationParams::from_value(&json!({
            "lead_time": "abc",
            "moq": -20,
            "market_demand": "250",
            "factory_batch": null
        }));
        assert_eq!(params.lead_time, 6.0);
        assert_eq!(params.moq, 0.0);
        assert_eq!(params.market_demand, 250.0);
        assert_eq!(params.factory_batch, 40.0);
    }

    #[test]
    fn labels_map_to_enums() {
        let params = SimulationParams::from_value(&json!({
            "scenario": "Biased forecast",
            "speed_unit": "10-second"
        }));
        assert_eq!(params.scenario, Scenario::Biased);
        assert_eq!(params.speed_unit, SpeedUnit::TenSeconds);

        assert_eq!(Scenario::from_label("nonsense"), Scenario::Accurate);
        assert_eq!(SpeedUnit::from_label("hour"), SpeedUnit::Minute);
    }

    #[test]
    fn worker_capacity_has_a_floor() {
        let params = SimulationParams {
            factory_batch: 0.0,
            ..SimulationParams::default()
        };
        assert_eq!(params.worker_capacity(), 1.0);
    }

    #[test]
    fn time_scale_follows_speed() {
        let config = SimulationConfig::default();
        assert!((config.time_units_per_step(SpeedUnit::Minute) - 0.002).abs() < 1e-12);
        assert!((config.time_units_per_step(SpeedUnit::Second) - 0.12).abs() < 1e-12);
    }

    #[test]
    fn config_file_reads_both_sections() {
        let file = ConfigFile::from_json_str(
            r#"{
                "params": { "lead_time": 3.5, "scenario": "Biased forecast" },
                "config": { "max_ticks": 42, "history_path": null }
            }"#,
        )
        .unwrap();
        assert_eq!(file.params.lead_time, 3.5);
        assert!(file.params.scenario.is_biased());
        assert_eq!(file.config.max_ticks, 42);
        assert_eq!(file.config.history_path, None);
        assert_eq!(file.config.base_interval_ms, 120);
    }

    #[test]
    fn config_file_params_are_read_leniently() {
        let file = ConfigFile::from_json_str(
            r#"{ "params": { "moq": "300", "safety_stock": null, "speed_unit": 7 } }"#,
        )
        .unwrap();
        assert_eq!(file.params.moq, 300.0);
        assert_eq!(file.params.safety_stock, 180.0);
        assert_eq!(file.params.speed_unit, SpeedUnit::Minute);
    }

    #[test]
    fn config_file_rejects_non_objects() {
        assert!(matches!(
            ConfigFile::from_json_str("[1, 2]"),
            Err(ConfigError::NotAnObject)
        ));
        assert!(matches!(
            ConfigFile::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
