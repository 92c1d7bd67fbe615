use std::env;
use std::ops::ControlFlow;
use std::path::Path;
use std::process::ExitCode;

use supply_chain_sim::io::reporting::{self, HistoryRecord};
use supply_chain_sim::io::snapshot::{FileSlot, MemorySlot, SnapshotStore};
use supply_chain_sim::io::sweep;
use supply_chain_sim::simulation::config::{ConfigFile, SimulationConfig};
use supply_chain_sim::{DisplayMetrics, Session, Ticker};
use tracing::{info, warn};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Supply Chain Simulation ===");

    // 1. SETUP CONFIGURATION
    let file = match env::args().nth(1) {
        Some(path) => match ConfigFile::from_file(Path::new(&path)) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => ConfigFile::default(),
    };
    let ConfigFile { params, config } = file;
    println!(
        "Scenario: {:?}, speed: {:?}, lead time {} days, MOQ {}, nominal rate {}/day",
        params.scenario, params.speed_unit, params.lead_time, params.moq, params.production_rate
    );

    // 2. RUN SESSION
    let history = match &config.snapshot_path {
        Some(path) => {
            let slot = FileSlot::new(path.clone());
            info!(path = %slot.path().display(), "snapshot.file");
            run_session(Session::new(params.clone(), &config, slot), &config)
        }
        None => run_session(
            Session::new(params.clone(), &config, MemorySlot::new()),
            &config,
        ),
    };

    // 3. EXPORT HISTORY
    if let Some(path) = &config.history_path {
        match reporting::write_simulation_log(path, &history.records) {
            Ok(()) => println!("Success! History written to {}", path.display()),
            Err(e) => eprintln!("Error writing CSV: {}", e),
        }
    }

    // 4. PRINT SUMMARY
    println!("\n=== Final State (tick {}) ===", history.last.tick);
    println!("Score: {} ({})", history.last.score.value, history.last.score.level);
    println!("Factory stock: {:.1}", history.last.factory_stock.value);
    println!("Warehouse stock: {:.1}", history.last.warehouse_stock.value);
    println!("Finished goods: {:.1}", history.last.finished_goods_stock.value);
    println!("Backlog: {:.1}", history.last.backlog.value);
    println!("Net cash flow: ${:.2}", history.last.net_cash_flow.value);
    let alerts = history.last.alert_text();
    if !alerts.is_empty() {
        println!("Alerts:\n{}", alerts);
    }

    // 5. OPTIONAL SWEEP
    if config.sweep.runs > 0 {
        println!("\n=== Sweep ({} runs) ===", config.sweep.runs);
        let records = match sweep::run_sweep(&params, &config) {
            Ok(records) => records,
            Err(e) => {
                eprintln!("Error running sweep: {}", e);
                return ExitCode::FAILURE;
            }
        };
        if let Some(summary) = sweep::summarize(&records) {
            println!(
                "Score mean {:.1} (sd {:.1}), p10 {}, p50 {}, p90 {}, range {}..{}",
                summary.mean_score,
                summary.std_dev_score,
                summary.percentile_10,
                summary.percentile_50,
                summary.percentile_90,
                summary.min_score,
                summary.max_score
            );
        }
        if let Some(path) = &config.sweep.output_path {
            if let Err(e) = reporting::write_sweep_results(path, &records) {
                eprintln!("Error writing sweep CSV: {}", e);
            }
        }
    }

    println!("\nSimulation Complete.");
    ExitCode::SUCCESS
}

struct RunOutput {
    records: Vec<HistoryRecord>,
    last: DisplayMetrics,
}

fn run_session<S: SnapshotStore>(
    mut session: Session<S>,
    config: &SimulationConfig,
) -> RunOutput {
    let ticker = Ticker::from_config(config);
    let log_every = config.log_every;

    let mut records = Vec::with_capacity(config.max_ticks);
    let mut last = session.metrics();
    info!(
        scenario = ?session.params().scenario,
        reset_token = session.reset_token(),
        "session.opened"
    );
    if !session.is_running() {
        warn!("session starts paused; intervals will only refresh the display");
    }

    ticker.run(config.max_ticks, |index| {
        last = session.on_interval();
        records.push(HistoryRecord::capture(session.state(), &last));
        if log_every > 0 && (index + 1) % log_every == 0 {
            info!(
                tick = last.tick,
                score = last.score.value,
                factory = last.factory_stock.value,
                warehouse = last.warehouse_stock.value,
                backlog = last.backlog.value,
                truck = last.truck_phase,
                "progress"
            );
        }
        ControlFlow::Continue(())
    });

    RunOutput { records, last }
}
