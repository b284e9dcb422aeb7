use std::{
    io::ErrorKind,
    path::PathBuf,
    sync::OnceLock,
    time::{Duration, Instant},
};

use anyhow::Context;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use aircon_common::{EchoSensor, LevelMonitor, RuntimeConfig};

const ECHO_US_PER_CM: f32 = 58.2;

struct SimulatedEcho {
    distance_cm: f32,
    samples: u64,
}

impl EchoSensor for SimulatedEcho {
    fn measure_echo_us(&mut self) -> u32 {
        self.samples = self.samples.saturating_add(1);

        // Every so often the echo is lost, like a loose sensor cable.
        if self.samples % 13 == 0 {
            return 0;
        }

        let jitter_cm = (self.samples % 5) as f32 * 0.1 - 0.2;
        ((self.distance_cm + jitter_cm).max(0.0) * ECHO_US_PER_CM).round() as u32
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut runtime = load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config: {err:#}");
        RuntimeConfig::default()
    });
    runtime.sanitize();

    let distance_cm = std::env::var("LEVEL_SIMULATED_CM")
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .unwrap_or(12.0);

    let probe = runtime.level_probe;
    info!(
        "level sensor started, {} samples every {}ms",
        probe.sample_count, probe.poll_interval_ms
    );

    let mut monitor = LevelMonitor::new(
        SimulatedEcho {
            distance_cm,
            samples: 0,
        },
        probe,
    );

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Some(reading) = monitor.tick(monotonic_ms()) {
                    let payload = serde_json::to_string(&reading)
                        .context("failed to encode level reading")?;
                    println!("{payload}");
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for shutdown signal")?;
                info!("level sensor stopped");
                return Ok(());
            }
        }
    }
}

async fn load_runtime_config() -> anyhow::Result<RuntimeConfig> {
    let path = std::env::var("AIRCON_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./.aircon"))
        .join("runtime.json");

    match tokio::fs::read(&path).await {
        Ok(raw) => RuntimeConfig::from_json(&raw)
            .with_context(|| format!("invalid config in {}", path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
        Err(err) => Err(err.into()),
    }
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aircon_common::{level::probe_level, LevelProbeConfig};

    #[test]
    fn simulated_tank_reads_close_to_its_distance() {
        let mut echo = SimulatedEcho {
            distance_cm: 15.0,
            samples: 0,
        };

        // 14 cm into a 28 cm tank.
        let level = probe_level(&mut echo, &LevelProbeConfig {
            sample_spacing_ms: 0,
            ..LevelProbeConfig::default()
        });

        assert!((48..=52).contains(&level), "level was {level}");
    }
}
