use std::{
    io::{BufRead, ErrorKind},
    path::PathBuf,
    sync::OnceLock,
    time::{Duration, Instant},
};

use anyhow::{anyhow, bail, Context};
use serde::Serialize;
use tokio::{sync::mpsc, time::MissedTickBehavior};
use tracing::{debug, info, warn};

use aircon_common::{
    AccessoryStatus, ConvergenceEngine, Field, HeaterCooler, RuntimeConfig, Scheduler,
    SensorError, Sequences, StateStore, TargetMode, TemperatureReader,
};

use crate::{
    flash::FileByteStore,
    ir::{IrDiagnostics, IrTransmitter},
};

type Controller = Scheduler<IrTransmitter, FileByteStore, SimulatedThermometer, HeaterCooler>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Write(Field, i32),
    Status,
}

#[derive(Debug, Serialize)]
struct ControllerStatus {
    accessory: AccessoryStatus,
    ir: IrDiagnostics,
}

struct AppStore {
    data_dir: PathBuf,
    runtime_path: PathBuf,
}

struct SimulatedThermometer {
    base_celsius: f32,
    reads: u64,
}

impl TemperatureReader for SimulatedThermometer {
    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        self.reads = self.reads.saturating_add(1);
        Ok(self.base_celsius + (self.reads % 8) as f32 * 0.2)
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = AppStore::new();
    let mut runtime = store.load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err:#}");
        RuntimeConfig::default()
    });
    if !runtime.sanitize() {
        warn!("mode cycle must list every target mode once, restored the default table");
    }
    if !tokio::fs::try_exists(&store.runtime_path).await.unwrap_or(false) {
        if let Err(err) = store.save_runtime_config(&runtime).await {
            warn!("failed to write default runtime config: {err:#}");
        }
    }

    let loop_ms = std::env::var("AIRCON_LOOP_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(10)
        .max(1);
    let base_celsius = std::env::var("AIRCON_SIMULATED_TEMP")
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .unwrap_or(24.0);

    let flash = FileByteStore::open(store.data_dir.join("state.bin"))
        .context("failed to open persisted state")?;
    info!("persisted state at {}", flash.path().display());

    let defaults = runtime.defaults;
    let sequences = Sequences::new(&runtime.ranges, &runtime.mode_cycle);
    let engine = ConvergenceEngine::new(
        IrTransmitter::new(),
        StateStore::new(flash),
        runtime.ir,
        sequences,
        &defaults,
    );
    let accessory = HeaterCooler::new(runtime.ranges.clone(), &defaults.configuration());
    let thermometer = SimulatedThermometer {
        base_celsius,
        reads: 0,
    };
    let mut controller = Scheduler::new(
        runtime.scheduler.clone(),
        runtime.ranges.current,
        engine,
        thermometer,
        accessory,
        monotonic_ms(),
    );

    let mut line_rx = spawn_stdin_reader().context("failed to start stdin reader")?;

    info!("controller started, loop every {loop_ms}ms");

    let mut interval = tokio::time::interval(Duration::from_millis(loop_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => controller.tick(monotonic_ms()),
            Some(line) = line_rx.recv() => handle_line(&mut controller, &line),
            result = &mut shutdown => {
                result.context("failed to listen for shutdown signal")?;
                break;
            }
        }
    }

    if controller
        .flush()
        .context("failed to flush state on shutdown")?
    {
        info!("flushed pending state before exit");
    }
    info!("controller stopped");
    Ok(())
}

// A blocked stdin read cannot be cancelled, so it lives on its own thread
// instead of the runtime's blocking pool, which would hold up shutdown.
fn spawn_stdin_reader() -> std::io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || forward_lines(std::io::stdin().lock(), &tx))?;
    Ok(rx)
}

fn forward_lines(reader: impl BufRead, tx: &mpsc::Sender<String>) {
    for line in reader.lines() {
        match line {
            Ok(line) => {
                if tx.blocking_send(line).is_err() {
                    return;
                }
            }
            Err(err) => {
                warn!("stdin read error: {err}");
                return;
            }
        }
    }
    debug!("stdin closed, no more commands");
}

fn handle_line(controller: &mut Controller, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    match parse_command(line) {
        Ok(Command::Status) => {
            let status = ControllerStatus {
                accessory: controller.status(),
                ir: controller.engine().emitter().diagnostics(),
            };
            match serde_json::to_string_pretty(&status) {
                Ok(json) => println!("{json}"),
                Err(err) => warn!("failed to encode status: {err}"),
            }
        }
        Ok(Command::Write(field, value)) => {
            let now_ms = monotonic_ms();
            match controller.accessory_mut().write(field, value, now_ms) {
                Ok(true) => {
                    info!("{} set to {value}", field.as_str());
                    controller.notify_configuration_changed(now_ms);
                }
                Ok(false) => debug!("{} already {value}", field.as_str()),
                Err(err) => warn!("rejected write: {err}"),
            }
        }
        Err(err) => warn!("{err:#}"),
    }
}

fn parse_command(line: &str) -> anyhow::Result<Command> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default().to_ascii_lowercase();
    let argument = words.next();
    if words.next().is_some() {
        bail!("too many arguments in {line:?}");
    }

    if verb == "status" {
        return Ok(Command::Status);
    }

    let argument = argument.ok_or_else(|| anyhow!("{verb} needs a value"))?;
    let command = match verb.as_str() {
        "active" => Command::Write(Field::Active, parse_switch(argument)?),
        "swing" => Command::Write(Field::Swing, parse_switch(argument)?),
        "mode" => {
            let mode = match argument.to_ascii_lowercase().as_str() {
                "auto" => TargetMode::Auto,
                "heat" => TargetMode::Heat,
                "cool" => TargetMode::Cool,
                other => bail!("unknown mode {other:?}, expected auto, heat or cool"),
            };
            Command::Write(Field::TargetMode, i32::from(mode.value()))
        }
        "cool" => Command::Write(Field::CoolingThreshold, parse_celsius(argument)?),
        "heat" => Command::Write(Field::HeatingThreshold, parse_celsius(argument)?),
        other => bail!("unknown command {other:?}"),
    };

    Ok(command)
}

fn parse_switch(argument: &str) -> anyhow::Result<i32> {
    match argument.to_ascii_lowercase().as_str() {
        "1" | "on" => Ok(1),
        "0" | "off" => Ok(0),
        other => bail!("expected on/off, got {other:?}"),
    }
}

fn parse_celsius(argument: &str) -> anyhow::Result<i32> {
    argument
        .parse::<i32>()
        .with_context(|| format!("invalid temperature {argument:?}"))
}

impl AppStore {
    fn new() -> Self {
        let data_dir = std::env::var("AIRCON_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.aircon"));

        Self {
            runtime_path: data_dir.join("runtime.json"),
            data_dir,
        }
    }

    async fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        match tokio::fs::read(&self.runtime_path).await {
            Ok(raw) => Ok(RuntimeConfig::from_json(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save_runtime_config(&self, runtime: &RuntimeConfig) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let payload = serde_json::to_vec_pretty(runtime)?;
        tokio::fs::write(&self.runtime_path, payload).await?;
        Ok(())
    }
}

pub(crate) fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
