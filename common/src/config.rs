use serde::{Deserialize, Serialize};

use crate::types::{Active, Configuration, Signal, SwingMode, TargetMode};

pub const MAX_THRESHOLD_STEPS: u8 = 15;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub poll_interval_ms: u64,
    pub converge_interval_ms: u64,
    pub settle_interval_ms: u64,
    pub commit_interval_ms: u64,
    pub commit_quiet_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 30_000,
            converge_interval_ms: 500,
            settle_interval_ms: 2_000,
            commit_interval_ms: 5_000,
            commit_quiet_ms: 5_000,
        }
    }
}

impl SchedulerConfig {
    pub fn sanitize(&mut self) {
        self.poll_interval_ms = self.poll_interval_ms.max(1_000);
        self.converge_interval_ms = self.converge_interval_ms.max(50);
        self.settle_interval_ms = self.settle_interval_ms.max(self.converge_interval_ms);
        self.commit_interval_ms = self.commit_interval_ms.max(250);
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IrCommandSet {
    pub address: u8,
    pub switch_power: u8,
    pub switch_mode: u8,
    pub toggle_fan_speed: u8,
    pub toggle_swing: u8,
    pub toggle_timer: u8,
    pub temperature_up: u8,
    pub temperature_down: u8,
}

impl Default for IrCommandSet {
    fn default() -> Self {
        Self {
            address: 0x81,
            switch_power: 0x6B,
            switch_mode: 0x66,
            toggle_fan_speed: 0x64,
            toggle_swing: 0x67,
            toggle_timer: 0x69,
            temperature_up: 0x65,
            temperature_down: 0x68,
        }
    }
}

impl IrCommandSet {
    pub fn command(&self, signal: Signal) -> u8 {
        match signal {
            Signal::SwitchPower => self.switch_power,
            Signal::SwitchMode => self.switch_mode,
            Signal::TemperatureUp => self.temperature_up,
            Signal::TemperatureDown => self.temperature_down,
            Signal::ToggleSwing => self.toggle_swing,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThresholdRange {
    pub min: u8,
    pub max: u8,
}

impl ThresholdRange {
    pub fn contains(&self, value: u8) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn values(&self) -> Vec<u8> {
        (self.min..=self.max).collect()
    }

    fn sanitize(&mut self, fallback: ThresholdRange) {
        if self.min > self.max {
            *self = fallback;
            return;
        }
        if self.max - self.min >= MAX_THRESHOLD_STEPS {
            self.max = self.min + MAX_THRESHOLD_STEPS - 1;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RangeConfig {
    pub cooling: ThresholdRange,
    pub heating: ThresholdRange,
    pub current: ThresholdRange,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            cooling: ThresholdRange { min: 18, max: 32 },
            heating: ThresholdRange { min: 13, max: 27 },
            current: ThresholdRange { min: 0, max: 50 },
        }
    }
}

impl RangeConfig {
    pub fn sanitize(&mut self) {
        let fallback = Self::default();
        self.cooling.sanitize(fallback.cooling);
        self.heating.sanitize(fallback.heating);
        if self.current.min > self.current.max {
            self.current = fallback.current;
        }
    }
}

/// Order in which the unit walks through its modes when the mode button is
/// pressed. This is per-unit data: check it against the physical remote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ModeCycle(pub Vec<TargetMode>);

impl Default for ModeCycle {
    fn default() -> Self {
        Self(vec![
            TargetMode::Heat,
            TargetMode::CoolAuto,
            TargetMode::Cool,
            TargetMode::Dry,
            TargetMode::Auto,
        ])
    }
}

impl ModeCycle {
    pub fn is_complete(&self) -> bool {
        self.0.len() == TargetMode::ALL.len()
            && TargetMode::ALL
                .iter()
                .all(|mode| self.0.iter().filter(|entry| *entry == mode).count() == 1)
    }

    pub fn sanitize(&mut self) -> bool {
        if self.is_complete() {
            return true;
        }
        *self = Self::default();
        false
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedDefaults {
    pub active: Active,
    pub target_mode: TargetMode,
    pub cooling_threshold: u8,
    pub heating_threshold: u8,
    pub swing: SwingMode,
}

impl Default for PersistedDefaults {
    fn default() -> Self {
        Self {
            active: Active::Inactive,
            target_mode: TargetMode::Auto,
            cooling_threshold: 20,
            heating_threshold: 16,
            swing: SwingMode::Enabled,
        }
    }
}

impl PersistedDefaults {
    pub fn configuration(&self) -> Configuration {
        Configuration {
            active: self.active,
            target_mode: self.target_mode,
            cooling_threshold: self.cooling_threshold,
            heating_threshold: self.heating_threshold,
            swing: self.swing,
        }
    }

    pub fn sanitize(&mut self, ranges: &RangeConfig) {
        self.cooling_threshold = self
            .cooling_threshold
            .clamp(ranges.cooling.min, ranges.cooling.max);
        self.heating_threshold = self
            .heating_threshold
            .clamp(ranges.heating.min, ranges.heating.max);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LevelProbeConfig {
    pub sample_count: usize,
    pub sample_spacing_ms: u64,
    pub sensor_offset_cm: f32,
    pub empty_distance_cm: f32,
    pub low_level_percent: u8,
    pub poll_interval_ms: u64,
}

impl Default for LevelProbeConfig {
    fn default() -> Self {
        Self {
            sample_count: 10,
            sample_spacing_ms: 10,
            sensor_offset_cm: 1.0,
            empty_distance_cm: 28.0,
            low_level_percent: 20,
            poll_interval_ms: 600_000,
        }
    }
}

impl LevelProbeConfig {
    pub fn sanitize(&mut self) {
        self.sample_count = self.sample_count.clamp(1, 32);
        // Samples block the loop thread, keep the whole batch short.
        self.sample_spacing_ms = self.sample_spacing_ms.min(50);
        if !(self.empty_distance_cm.is_finite() && self.empty_distance_cm > 0.0) {
            self.empty_distance_cm = 28.0;
        }
        if !self.sensor_offset_cm.is_finite() {
            self.sensor_offset_cm = 0.0;
        }
        self.low_level_percent = self.low_level_percent.min(100);
        self.poll_interval_ms = self.poll_interval_ms.max(1_000);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub ir: IrCommandSet,
    #[serde(default)]
    pub ranges: RangeConfig,
    #[serde(default)]
    pub mode_cycle: ModeCycle,
    #[serde(default)]
    pub defaults: PersistedDefaults,
    #[serde(default)]
    pub level_probe: LevelProbeConfig,
}

impl RuntimeConfig {
    pub fn from_json(raw: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(raw)
    }

    pub fn sanitize(&mut self) -> bool {
        self.scheduler.sanitize();
        self.ranges.sanitize();
        self.defaults.sanitize(&self.ranges);
        self.level_probe.sanitize();
        self.mode_cycle.sanitize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_mode_cycle_matches_unit_button_order() {
        assert_eq!(
            ModeCycle::default().0,
            vec![
                TargetMode::Heat,
                TargetMode::CoolAuto,
                TargetMode::Cool,
                TargetMode::Dry,
                TargetMode::Auto,
            ]
        );
        assert!(ModeCycle::default().is_complete());
    }

    #[test]
    fn incomplete_mode_cycle_is_reset() {
        let mut cycle = ModeCycle(vec![TargetMode::Heat, TargetMode::Cool, TargetMode::Cool]);
        assert!(!cycle.sanitize());
        assert_eq!(cycle, ModeCycle::default());
    }

    #[test]
    fn settle_interval_never_shorter_than_converge() {
        let mut config = SchedulerConfig {
            converge_interval_ms: 800,
            settle_interval_ms: 100,
            ..SchedulerConfig::default()
        };
        config.sanitize();
        assert_eq!(config.settle_interval_ms, 800);
    }

    #[test]
    fn threshold_ranges_are_capped_to_remote_steps() {
        let mut ranges = RangeConfig {
            cooling: ThresholdRange { min: 10, max: 40 },
            heating: ThresholdRange { min: 30, max: 20 },
            ..RangeConfig::default()
        };
        ranges.sanitize();
        assert_eq!(ranges.cooling, ThresholdRange { min: 10, max: 24 });
        assert_eq!(ranges.heating, ThresholdRange { min: 13, max: 27 });
        assert_eq!(ranges.cooling.values().len(), 15);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let raw = br#"{"scheduler":{"poll_interval_ms":10000,"converge_interval_ms":250,"settle_interval_ms":1000,"commit_interval_ms":5000,"commit_quiet_ms":5000},"mode_cycle":["HEAT","COOL_AUTO","COOL","DRY","AUTO"]}"#;
        let mut config = RuntimeConfig::from_json(raw).unwrap();
        assert!(config.sanitize());

        assert_eq!(config.scheduler.converge_interval_ms, 250);
        assert_eq!(config.ir, IrCommandSet::default());
        assert_eq!(config.defaults.cooling_threshold, 20);
    }
}
