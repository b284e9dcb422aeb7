use tracing::{info, warn};

use crate::{
    config::{IrCommandSet, PersistedDefaults},
    sequence::{step, Direction, Overflow, Sequences, Step},
    store::{address, ByteStore, StateStore, StoreError},
    types::{Active, Configuration, CurrentMode, Field, Signal, TargetMode},
};

pub trait SignalEmitter {
    fn emit(&mut self, address: u8, command: u8);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub field: Field,
    pub signal: Signal,
    pub recovered: bool,
    pub current_mode: Option<CurrentMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Converged,
    Stepped(StepReport),
}

impl TickOutcome {
    pub fn has_converged(&self) -> bool {
        matches!(self, Self::Converged)
    }
}

#[derive(Debug)]
pub struct ConvergenceEngine<E, S> {
    emitter: E,
    store: StateStore<S>,
    commands: IrCommandSet,
    sequences: Sequences,
    confirmed: Configuration,
    sent_signals: u64,
}

impl<E: SignalEmitter, S: ByteStore> ConvergenceEngine<E, S> {
    pub fn new(
        emitter: E,
        store: StateStore<S>,
        commands: IrCommandSet,
        sequences: Sequences,
        defaults: &PersistedDefaults,
    ) -> Self {
        let confirmed = store.load_configuration(defaults, &sequences);
        info!(
            "confirmed state loaded: active={}, mode={}, cool={}°C, heat={}°C, swing={}",
            confirmed.active.as_str(),
            confirmed.target_mode.as_str(),
            confirmed.cooling_threshold,
            confirmed.heating_threshold,
            confirmed.swing.as_str(),
        );

        Self {
            emitter,
            store,
            commands,
            sequences,
            confirmed,
            sent_signals: 0,
        }
    }

    pub fn confirmed(&self) -> &Configuration {
        &self.confirmed
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    pub fn store(&self) -> &StateStore<S> {
        &self.store
    }

    pub fn sent_signals(&self) -> u64 {
        self.sent_signals
    }

    pub fn commit_if_dirty(&mut self) -> Result<bool, StoreError> {
        self.store.commit_if_dirty()
    }

    pub fn tick(&mut self, desired: &Configuration, now_ms: u64) -> TickOutcome {
        // [HIGH] power
        if desired.active != self.confirmed.active {
            let next = step(
                &self.sequences.active,
                self.confirmed.active,
                Direction::Forward,
                Overflow::Wrap,
            );
            self.confirmed.active = next.value();
            self.stage(Field::Active, next.value().value(), now_ms);
            return self.dispatch(Field::Active, Signal::SwitchPower, next, None);
        }

        // [HIGH] target mode
        if desired.target_mode != self.confirmed.target_mode {
            let next = step(
                &self.sequences.target_mode,
                self.confirmed.target_mode,
                Direction::Forward,
                Overflow::Wrap,
            );
            self.confirmed.target_mode = next.value();
            self.stage(Field::TargetMode, next.value().value(), now_ms);

            let landed = self.confirmed.target_mode == desired.target_mode;
            let current_mode = landed.then(|| self.confirmed.current_mode());
            return self.dispatch(Field::TargetMode, Signal::SwitchMode, next, current_mode);
        }

        // Setpoint and swing buttons are ignored by the unit when off or in auto.
        if self.confirmed.active != Active::Active
            || self.confirmed.target_mode == TargetMode::Auto
        {
            return TickOutcome::Converged;
        }

        // [MEDIUM] cooling threshold
        if self.confirmed.target_mode == TargetMode::Cool
            && setpoint_actionable(
                Field::CoolingThreshold,
                &self.sequences.cooling_threshold,
                desired.cooling_threshold,
                self.confirmed.cooling_threshold,
            )
        {
            let direction =
                Direction::towards(self.confirmed.cooling_threshold, desired.cooling_threshold);
            let next = step(
                &self.sequences.cooling_threshold,
                self.confirmed.cooling_threshold,
                direction,
                Overflow::Clamp,
            );
            self.confirmed.cooling_threshold = next.value();
            self.stage(Field::CoolingThreshold, next.value(), now_ms);
            let signal = temperature_signal(direction);
            return self.dispatch(Field::CoolingThreshold, signal, next, None);
        }

        // [MEDIUM] heating threshold
        if self.confirmed.target_mode == TargetMode::Heat
            && setpoint_actionable(
                Field::HeatingThreshold,
                &self.sequences.heating_threshold,
                desired.heating_threshold,
                self.confirmed.heating_threshold,
            )
        {
            let direction =
                Direction::towards(self.confirmed.heating_threshold, desired.heating_threshold);
            let next = step(
                &self.sequences.heating_threshold,
                self.confirmed.heating_threshold,
                direction,
                Overflow::Clamp,
            );
            self.confirmed.heating_threshold = next.value();
            self.stage(Field::HeatingThreshold, next.value(), now_ms);
            let signal = temperature_signal(direction);
            return self.dispatch(Field::HeatingThreshold, signal, next, None);
        }

        // [LOW] swing
        if desired.swing != self.confirmed.swing {
            let next = step(
                &self.sequences.swing,
                self.confirmed.swing,
                Direction::Forward,
                Overflow::Wrap,
            );
            self.confirmed.swing = next.value();
            self.stage(Field::Swing, next.value().value(), now_ms);
            return self.dispatch(Field::Swing, Signal::ToggleSwing, next, None);
        }

        TickOutcome::Converged
    }

    fn stage(&mut self, field: Field, value: u8, now_ms: u64) {
        self.store.stage(address(field), value, now_ms);
    }

    fn dispatch<T: Copy>(
        &mut self,
        field: Field,
        signal: Signal,
        next: Step<T>,
        current_mode: Option<CurrentMode>,
    ) -> TickOutcome {
        if next.is_recovered() {
            warn!(
                "confirmed {} was not found in its sequence, reset to first value",
                field.as_str()
            );
        }

        info!(
            "converge {} with {:?} (confirmed now {})",
            field.as_str(),
            signal,
            self.describe(field)
        );

        self.emitter
            .emit(self.commands.address, self.commands.command(signal));
        self.sent_signals = self.sent_signals.saturating_add(1);

        TickOutcome::Stepped(StepReport {
            field,
            signal,
            recovered: next.is_recovered(),
            current_mode,
        })
    }

    fn describe(&self, field: Field) -> String {
        match field {
            Field::Active => self.confirmed.active.as_str().to_string(),
            Field::TargetMode => self.confirmed.target_mode.as_str().to_string(),
            Field::CoolingThreshold => format!("{}°C", self.confirmed.cooling_threshold),
            Field::HeatingThreshold => format!("{}°C", self.confirmed.heating_threshold),
            Field::Swing => self.confirmed.swing.as_str().to_string(),
        }
    }
}

fn setpoint_actionable(field: Field, sequence: &[u8], desired: u8, confirmed: u8) -> bool {
    if desired == confirmed {
        return false;
    }

    // A confirmed value outside the sequence still steps, so it recovers.
    if !sequence.contains(&desired) {
        warn!(
            "desired {} {desired}°C is outside the unit range, not converging it",
            field.as_str()
        );
        return false;
    }

    true
}

fn temperature_signal(direction: Direction) -> Signal {
    match direction {
        Direction::Forward => Signal::TemperatureUp,
        Direction::Backward => Signal::TemperatureDown,
    }
}
