use thiserror::Error;

use crate::{
    config::{RangeConfig, ThresholdRange},
    types::{Active, Configuration, CurrentMode, Field, SwingMode, TargetMode},
};

pub trait AccessoryFacade {
    fn desired(&self) -> Configuration;
    fn force_desired(&mut self, configuration: &Configuration);
    fn publish_current_mode(&mut self, mode: CurrentMode);
    fn publish_temperature(&mut self, celsius: f32);
    fn current_temperature(&self) -> Option<f32>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessoryError {
    #[error("{field} value {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: i32,
        min: u8,
        max: u8,
    },
    #[error("{field} does not accept value {value}")]
    InvalidValue { field: &'static str, value: i32 },
}

#[derive(Debug, Clone, Copy)]
pub struct Characteristic<T> {
    value: T,
    last_write_ms: Option<u64>,
}

impl<T: Copy + PartialEq> Characteristic<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            last_write_ms: None,
        }
    }

    pub fn get(&self) -> T {
        self.value
    }

    pub fn time_since_write(&self, now_ms: u64) -> Option<u64> {
        self.last_write_ms.map(|last| now_ms.saturating_sub(last))
    }

    fn write(&mut self, value: T, now_ms: u64) -> bool {
        self.last_write_ms = Some(now_ms);
        if self.value == value {
            return false;
        }
        self.value = value;
        true
    }
}

#[derive(Debug, Clone)]
pub struct HeaterCooler {
    ranges: RangeConfig,
    active: Characteristic<Active>,
    target_mode: Characteristic<TargetMode>,
    cooling_threshold: Characteristic<u8>,
    heating_threshold: Characteristic<u8>,
    swing: Characteristic<SwingMode>,
    current_mode: CurrentMode,
    current_temperature: Option<f32>,
}

impl HeaterCooler {
    pub fn new(ranges: RangeConfig, initial: &Configuration) -> Self {
        Self {
            ranges,
            active: Characteristic::new(initial.active),
            target_mode: Characteristic::new(initial.target_mode),
            cooling_threshold: Characteristic::new(initial.cooling_threshold),
            heating_threshold: Characteristic::new(initial.heating_threshold),
            swing: Characteristic::new(initial.swing),
            current_mode: initial.current_mode(),
            current_temperature: None,
        }
    }

    pub fn current_mode(&self) -> CurrentMode {
        self.current_mode
    }

    pub fn time_since_write(&self, field: Field, now_ms: u64) -> Option<u64> {
        match field {
            Field::Active => self.active.time_since_write(now_ms),
            Field::TargetMode => self.target_mode.time_since_write(now_ms),
            Field::CoolingThreshold => self.cooling_threshold.time_since_write(now_ms),
            Field::HeatingThreshold => self.heating_threshold.time_since_write(now_ms),
            Field::Swing => self.swing.time_since_write(now_ms),
        }
    }

    pub fn write(&mut self, field: Field, value: i32, now_ms: u64) -> Result<bool, AccessoryError> {
        let changed = match field {
            Field::Active => {
                let active = byte(value)
                    .and_then(Active::from_value)
                    .ok_or_else(|| invalid(field, value))?;
                self.active.write(active, now_ms)
            }
            Field::TargetMode => {
                let mode = byte(value)
                    .and_then(TargetMode::from_value)
                    .filter(|mode| mode.is_user_selectable())
                    .ok_or_else(|| invalid(field, value))?;
                self.target_mode.write(mode, now_ms)
            }
            Field::CoolingThreshold => {
                let threshold = in_range(field, value, self.ranges.cooling)?;
                self.cooling_threshold.write(threshold, now_ms)
            }
            Field::HeatingThreshold => {
                let threshold = in_range(field, value, self.ranges.heating)?;
                self.heating_threshold.write(threshold, now_ms)
            }
            Field::Swing => {
                let swing = byte(value)
                    .and_then(SwingMode::from_value)
                    .ok_or_else(|| invalid(field, value))?;
                self.swing.write(swing, now_ms)
            }
        };

        Ok(changed)
    }
}

impl AccessoryFacade for HeaterCooler {
    fn desired(&self) -> Configuration {
        Configuration {
            active: self.active.get(),
            target_mode: self.target_mode.get(),
            cooling_threshold: self.cooling_threshold.get(),
            heating_threshold: self.heating_threshold.get(),
            swing: self.swing.get(),
        }
    }

    fn force_desired(&mut self, configuration: &Configuration) {
        self.active.value = configuration.active;
        self.target_mode.value = configuration.target_mode;
        self.cooling_threshold.value = configuration.cooling_threshold;
        self.heating_threshold.value = configuration.heating_threshold;
        self.swing.value = configuration.swing;
    }

    fn publish_current_mode(&mut self, mode: CurrentMode) {
        self.current_mode = mode;
    }

    fn publish_temperature(&mut self, celsius: f32) {
        let range = self.ranges.current;
        let celsius = celsius.round().clamp(f32::from(range.min), f32::from(range.max));
        self.current_temperature = Some(celsius);
    }

    fn current_temperature(&self) -> Option<f32> {
        self.current_temperature
    }
}

fn byte(value: i32) -> Option<u8> {
    u8::try_from(value).ok()
}

fn invalid(field: Field, value: i32) -> AccessoryError {
    AccessoryError::InvalidValue {
        field: field.as_str(),
        value,
    }
}

fn in_range(field: Field, value: i32, range: ThresholdRange) -> Result<u8, AccessoryError> {
    byte(value)
        .filter(|threshold| range.contains(*threshold))
        .ok_or(AccessoryError::OutOfRange {
            field: field.as_str(),
            value,
            min: range.min,
            max: range.max,
        })
}
