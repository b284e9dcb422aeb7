use std::{thread, time::Duration};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::LevelProbeConfig;

const MICROS_PER_CM: f32 = 29.1;

pub trait EchoSensor {
    /// Zero when nothing came back.
    fn measure_echo_us(&mut self) -> u32;

    fn pause(&mut self, spacing: Duration) {
        thread::sleep(spacing);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelReading {
    pub percent: u8,
    #[serde(rename = "lowLevel")]
    pub low_level: bool,
}

pub fn level_percent(echo_us: u32, config: &LevelProbeConfig) -> f32 {
    // A missing echo maps to an empty reading rather than being dropped.
    if echo_us == 0 {
        warn!("level sample failed, no echo received");
        return 0.0;
    }

    let distance_cm = (echo_us as f32 / 2.0) / MICROS_PER_CM - config.sensor_offset_cm;
    let empty_share = (distance_cm / config.empty_distance_cm * 100.0).clamp(0.0, 100.0);
    100.0 - empty_share
}

pub fn probe_level<E: EchoSensor>(sensor: &mut E, config: &LevelProbeConfig) -> u8 {
    let count = config.sample_count.max(1);
    let spacing = Duration::from_millis(config.sample_spacing_ms);

    let mut samples = Vec::with_capacity(count);
    for index in 0..count {
        let echo_us = sensor.measure_echo_us();
        let percent = level_percent(echo_us, config);
        debug!("level sample #{} = {percent:.2}% ({echo_us}µs)", index + 1);
        samples.push(percent);
        sensor.pause(spacing);
    }

    samples.sort_by(f32::total_cmp);
    let median = samples[(count / 2).saturating_sub(1)];
    median.round() as u8
}

#[derive(Debug)]
pub struct LevelMonitor<E> {
    sensor: E,
    config: LevelProbeConfig,
    last_probe_ms: Option<u64>,
    last_reading: Option<LevelReading>,
}

impl<E: EchoSensor> LevelMonitor<E> {
    pub fn new(sensor: E, config: LevelProbeConfig) -> Self {
        Self {
            sensor,
            config,
            last_probe_ms: None,
            last_reading: None,
        }
    }

    pub fn last_reading(&self) -> Option<LevelReading> {
        self.last_reading
    }

    pub fn tick(&mut self, now_ms: u64) -> Option<LevelReading> {
        if let Some(last) = self.last_probe_ms {
            if now_ms.saturating_sub(last) < self.config.poll_interval_ms {
                return None;
            }
        }

        let percent = probe_level(&mut self.sensor, &self.config);
        let reading = LevelReading {
            percent,
            low_level: percent <= self.config.low_level_percent,
        };

        info!("water level {percent}%");
        if reading.low_level {
            warn!("water level is low ({percent}% <= {}%)", self.config.low_level_percent);
        }

        self.last_probe_ms = Some(now_ms);
        self.last_reading = Some(reading);
        Some(reading)
    }
}
