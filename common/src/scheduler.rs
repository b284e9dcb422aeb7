use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    accessory::AccessoryFacade,
    config::{SchedulerConfig, ThresholdRange},
    engine::{ConvergenceEngine, SignalEmitter, TickOutcome},
    store::{ByteStore, StoreError},
    types::{AccessoryStatus, CurrentMode},
};

#[derive(Debug, Error, PartialEq)]
pub enum SensorError {
    #[error("sensor unavailable: {0}")]
    Unavailable(String),
    #[error("sensor returned a non-numeric reading")]
    NotANumber,
    #[error("reading {value} is outside {min}..={max}")]
    OutOfRange { value: f32, min: u8, max: u8 },
}

pub trait TemperatureReader {
    fn read_celsius(&mut self) -> Result<f32, SensorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Converging,
    Settled,
}

pub struct Scheduler<E, S, T, A> {
    config: SchedulerConfig,
    current_range: ThresholdRange,
    engine: ConvergenceEngine<E, S>,
    reader: T,
    accessory: A,
    cadence: Cadence,
    next_poll_ms: u64,
    next_converge_ms: u64,
    next_commit_ms: u64,
    published_mode: CurrentMode,
}

impl<E, S, T, A> Scheduler<E, S, T, A>
where
    E: SignalEmitter,
    S: ByteStore,
    T: TemperatureReader,
    A: AccessoryFacade,
{
    pub fn new(
        config: SchedulerConfig,
        current_range: ThresholdRange,
        engine: ConvergenceEngine<E, S>,
        reader: T,
        mut accessory: A,
        now_ms: u64,
    ) -> Self {
        let confirmed = *engine.confirmed();
        accessory.force_desired(&confirmed);
        let published_mode = confirmed.current_mode();
        accessory.publish_current_mode(published_mode);

        Self {
            next_poll_ms: now_ms,
            next_converge_ms: now_ms,
            next_commit_ms: now_ms.saturating_add(config.commit_interval_ms),
            config,
            current_range,
            engine,
            reader,
            accessory,
            cadence: Cadence::Converging,
            published_mode,
        }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn next_converge_ms(&self) -> u64 {
        self.next_converge_ms
    }

    pub fn engine(&self) -> &ConvergenceEngine<E, S> {
        &self.engine
    }

    pub fn accessory(&self) -> &A {
        &self.accessory
    }

    /// Writes through this handle must be followed by
    /// [`Scheduler::notify_configuration_changed`].
    pub fn accessory_mut(&mut self) -> &mut A {
        &mut self.accessory
    }

    pub fn notify_configuration_changed(&mut self, now_ms: u64) {
        self.cadence = Cadence::Converging;
        self.next_converge_ms = now_ms.saturating_add(self.config.settle_interval_ms);
        debug!("desired configuration changed, converging from {}", self.next_converge_ms);
    }

    pub fn tick(&mut self, now_ms: u64) {
        if now_ms >= self.next_poll_ms {
            self.next_poll_ms = now_ms.saturating_add(self.config.poll_interval_ms);
            self.poll();
        }

        if now_ms >= self.next_converge_ms {
            self.converge(now_ms);
        }

        if now_ms >= self.next_commit_ms {
            self.next_commit_ms = now_ms.saturating_add(self.config.commit_interval_ms);
            self.commit(now_ms);
        }
    }

    // Ignores the quiet period.
    pub fn flush(&mut self) -> Result<bool, StoreError> {
        self.engine.commit_if_dirty()
    }

    pub fn status(&self) -> AccessoryStatus {
        let desired = self.accessory.desired();
        AccessoryStatus {
            active: desired.active.as_str(),
            target_mode: desired.target_mode.as_str(),
            current_mode: self.published_mode.as_str(),
            cooling_threshold: desired.cooling_threshold,
            heating_threshold: desired.heating_threshold,
            swing: desired.swing.as_str(),
            current_temp: self.accessory.current_temperature(),
            confirmed: *self.engine.confirmed(),
            converging: self.cadence == Cadence::Converging,
            commit_pending: self.engine.store().is_dirty(),
            sent_frames: self.engine.sent_signals(),
        }
    }

    fn poll(&mut self) {
        match self.read_temperature() {
            Ok(celsius) => {
                debug!("temperature {celsius:.1}°C");
                self.accessory.publish_temperature(celsius);
            }
            Err(err) => warn!("temperature poll skipped: {err}"),
        }
    }

    fn read_temperature(&mut self) -> Result<f32, SensorError> {
        let celsius = self.reader.read_celsius()?;
        if celsius.is_nan() {
            return Err(SensorError::NotANumber);
        }

        // Whole degrees are published, so the edges of the range round in.
        let celsius = celsius.round();
        let range = self.current_range;
        if celsius < f32::from(range.min) || celsius > f32::from(range.max) {
            return Err(SensorError::OutOfRange {
                value: celsius,
                min: range.min,
                max: range.max,
            });
        }

        Ok(celsius)
    }

    fn converge(&mut self, now_ms: u64) {
        let desired = self.accessory.desired();
        let outcome = self.engine.tick(&desired, now_ms);

        match outcome {
            TickOutcome::Stepped(report) => {
                if let Some(mode) = report.current_mode {
                    self.publish_mode(mode);
                }
                self.cadence = Cadence::Converging;
                self.next_converge_ms = now_ms.saturating_add(self.config.converge_interval_ms);
            }
            TickOutcome::Converged => {
                self.publish_mode(self.engine.confirmed().current_mode());
                if self.cadence == Cadence::Converging {
                    info!("unit converged after {} signal(s)", self.engine.sent_signals());
                }
                self.cadence = Cadence::Settled;
                self.next_converge_ms = now_ms.saturating_add(self.config.settle_interval_ms);
            }
        }
    }

    fn publish_mode(&mut self, mode: CurrentMode) {
        if mode == self.published_mode {
            return;
        }
        info!("current mode {}", mode.as_str());
        self.published_mode = mode;
        self.accessory.publish_current_mode(mode);
    }

    fn commit(&mut self, now_ms: u64) {
        let store = self.engine.store();
        if !store.is_dirty() {
            return;
        }

        let quiet_for = store
            .last_staged_ms()
            .map(|last| now_ms.saturating_sub(last))
            .unwrap_or(u64::MAX);
        if quiet_for < self.config.commit_quiet_ms {
            return;
        }

        if let Err(err) = self.engine.commit_if_dirty() {
            warn!("state commit failed, will retry: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accessory::HeaterCooler,
        config::{IrCommandSet, PersistedDefaults, RangeConfig},
        sequence::Sequences,
        store::{MemoryByteStore, StateStore},
        types::{Active, Configuration, Field, SwingMode, TargetMode},
    };
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default)]
    struct CountingEmitter {
        frames: usize,
    }

    impl SignalEmitter for CountingEmitter {
        fn emit(&mut self, _address: u8, _command: u8) {
            self.frames += 1;
        }
    }

    struct ScriptedReader {
        readings: Vec<Result<f32, SensorError>>,
    }

    impl TemperatureReader for ScriptedReader {
        fn read_celsius(&mut self) -> Result<f32, SensorError> {
            if self.readings.is_empty() {
                return Err(SensorError::Unavailable("script exhausted".to_string()));
            }
            self.readings.remove(0)
        }
    }

    struct FlakyStore {
        inner: MemoryByteStore,
        fail_commits: usize,
    }

    impl ByteStore for FlakyStore {
        fn read(&self, address: u8) -> Result<u8, StoreError> {
            self.inner.read(address)
        }

        fn write(&mut self, address: u8, value: u8) -> Result<(), StoreError> {
            self.inner.write(address, value)
        }

        fn commit(&mut self) -> Result<(), StoreError> {
            if self.fail_commits > 0 {
                self.fail_commits -= 1;
                return Err(StoreError::Io(std::io::Error::other("write protected")));
            }
            self.inner.commit()
        }
    }

    type TestScheduler<S> = Scheduler<CountingEmitter, S, ScriptedReader, HeaterCooler>;

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            poll_interval_ms: 30_000,
            converge_interval_ms: 500,
            settle_interval_ms: 2_000,
            commit_interval_ms: 5_000,
            commit_quiet_ms: 5_000,
        }
    }

    fn scheduler_on<S: ByteStore>(
        backend: S,
        readings: Vec<Result<f32, SensorError>>,
    ) -> TestScheduler<S> {
        let defaults = PersistedDefaults::default();
        let ranges = RangeConfig::default();
        let engine = ConvergenceEngine::new(
            CountingEmitter::default(),
            StateStore::new(backend),
            IrCommandSet::default(),
            Sequences::default(),
            &defaults,
        );
        let accessory = HeaterCooler::new(ranges.clone(), &defaults.configuration());
        Scheduler::new(
            config(),
            ranges.current,
            engine,
            ScriptedReader { readings },
            accessory,
            0,
        )
    }

    fn scheduler(readings: Vec<Result<f32, SensorError>>) -> TestScheduler<MemoryByteStore> {
        // Active, Cool, 20°C cooling, 16°C heating, swing on.
        scheduler_on(MemoryByteStore::with_durable([1, 2, 20, 16, 1]), readings)
    }

    fn write(scheduler: &mut TestScheduler<MemoryByteStore>, field: Field, value: i32, now: u64) {
        scheduler
            .accessory_mut()
            .write(field, value, now)
            .unwrap();
        scheduler.notify_configuration_changed(now);
    }

    fn frames<S: ByteStore>(scheduler: &TestScheduler<S>) -> usize {
        scheduler.engine.emitter().frames
    }

    #[test]
    fn startup_mirrors_confirmed_state_without_emitting() {
        let mut scheduler = scheduler(vec![Ok(24.0)]);

        assert_eq!(scheduler.accessory().desired(), *scheduler.engine().confirmed());
        assert_eq!(scheduler.accessory().current_mode(), CurrentMode::Cooling);

        scheduler.tick(0);

        assert_eq!(frames(&scheduler), 0);
        assert_eq!(scheduler.cadence(), Cadence::Settled);
        assert_eq!(scheduler.accessory().current_temperature(), Some(24.0));
    }

    #[test]
    fn cooling_setpoint_walks_after_debounce() {
        let mut scheduler = scheduler(vec![Ok(24.0)]);
        scheduler.tick(0);

        write(&mut scheduler, Field::CoolingThreshold, 23, 1_000);

        scheduler.tick(2_999);
        assert_eq!(frames(&scheduler), 0);

        scheduler.tick(3_000);
        scheduler.tick(3_500);
        scheduler.tick(4_000);
        assert_eq!(frames(&scheduler), 3);
        assert_eq!(scheduler.engine().confirmed().cooling_threshold, 23);
        assert_eq!(scheduler.cadence(), Cadence::Converging);

        scheduler.tick(4_500);
        assert_eq!(frames(&scheduler), 3);
        assert_eq!(scheduler.cadence(), Cadence::Settled);
        assert_eq!(scheduler.next_converge_ms(), 6_500);
    }

    #[test]
    fn repeated_writes_keep_postponing_convergence() {
        let mut scheduler = scheduler(vec![Ok(24.0)]);
        scheduler.tick(0);

        for (index, value) in [21, 22, 23, 24].into_iter().enumerate() {
            let now = 10_000 + index as u64 * 1_500;
            write(&mut scheduler, Field::CoolingThreshold, value, now);
            scheduler.tick(now + 1_000);
            assert_eq!(frames(&scheduler), 0);
        }

        assert_eq!(scheduler.next_converge_ms(), 16_500);
        scheduler.tick(16_500);
        assert_eq!(frames(&scheduler), 1);
    }

    #[test]
    fn switching_off_republishes_current_mode_on_convergence() {
        let mut scheduler = scheduler(vec![Ok(24.0)]);
        scheduler.tick(0);

        write(&mut scheduler, Field::Active, 0, 100);
        scheduler.tick(2_100);
        assert_eq!(scheduler.accessory().current_mode(), CurrentMode::Cooling);

        scheduler.tick(2_600);
        assert_eq!(scheduler.accessory().current_mode(), CurrentMode::Inactive);
        assert_eq!(frames(&scheduler), 1);
    }

    #[test]
    fn mode_change_publishes_current_mode_when_it_lands() {
        let mut scheduler = scheduler(vec![Ok(24.0)]);
        scheduler.tick(0);

        // Cool -> Dry -> Auto -> Heat on the unit's cycle.
        write(&mut scheduler, Field::TargetMode, 1, 0);
        scheduler.tick(2_000);
        scheduler.tick(2_500);
        assert_eq!(scheduler.accessory().current_mode(), CurrentMode::Cooling);

        scheduler.tick(3_000);
        assert_eq!(scheduler.engine().confirmed().target_mode, TargetMode::Heat);
        assert_eq!(scheduler.accessory().current_mode(), CurrentMode::Heating);
        assert_eq!(frames(&scheduler), 3);
    }

    #[test]
    fn failed_poll_keeps_last_published_temperature() {
        let mut scheduler = scheduler(vec![
            Ok(21.4),
            Err(SensorError::Unavailable("bus timeout".to_string())),
            Ok(f32::NAN),
            Ok(85.0),
        ]);

        for now in [0, 30_000, 60_000, 90_000] {
            scheduler.tick(now);
            assert_eq!(scheduler.accessory().current_temperature(), Some(21.0));
        }
    }

    #[test]
    fn readings_at_the_range_edges_round_into_range() {
        let mut scheduler = scheduler(vec![Ok(50.3), Ok(-0.4), Ok(50.6)]);

        scheduler.tick(0);
        assert_eq!(scheduler.accessory().current_temperature(), Some(50.0));

        scheduler.tick(30_000);
        assert_eq!(scheduler.accessory().current_temperature(), Some(0.0));

        scheduler.tick(60_000);
        assert_eq!(scheduler.accessory().current_temperature(), Some(0.0));
    }

    #[test]
    fn commit_waits_for_quiet_period() {
        let mut scheduler = scheduler(vec![Ok(24.0)]);
        scheduler.tick(0);

        write(&mut scheduler, Field::Swing, 0, 1_000);
        scheduler.tick(3_000);
        assert!(scheduler.engine().store().is_dirty());

        scheduler.tick(5_000);
        assert!(scheduler.engine().store().is_dirty());

        scheduler.tick(10_000);
        assert!(!scheduler.engine().store().is_dirty());
        assert_eq!(scheduler.engine().store().backend().durable(), [1, 2, 20, 16, 0]);
        assert_eq!(scheduler.engine().store().backend().commits(), 1);
    }

    #[test]
    fn failed_commit_is_retried_next_interval() {
        let backend = FlakyStore {
            inner: MemoryByteStore::with_durable([1, 2, 20, 16, 1]),
            fail_commits: 1,
        };
        let mut scheduler = scheduler_on(backend, vec![Ok(24.0)]);
        scheduler.tick(0);

        scheduler.accessory_mut().write(Field::Swing, 0, 0).unwrap();
        scheduler.notify_configuration_changed(0);
        scheduler.tick(2_000);

        scheduler.tick(10_000);
        assert!(scheduler.engine().store().is_dirty());

        scheduler.tick(15_000);
        assert!(!scheduler.engine().store().is_dirty());
        assert_eq!(scheduler.engine().store().backend().inner.durable()[4], 0);
    }

    #[test]
    fn status_reports_desired_and_confirmed_views() {
        let mut scheduler = scheduler(vec![Ok(22.0)]);
        scheduler.tick(0);
        write(&mut scheduler, Field::CoolingThreshold, 25, 100);

        let status = scheduler.status();

        assert_eq!(status.cooling_threshold, 25);
        assert_eq!(status.confirmed.cooling_threshold, 20);
        assert_eq!(status.current_mode, "COOLING");
        assert_eq!(status.current_temp, Some(22.0));
        assert!(status.converging);
        assert!(!status.commit_pending);
    }

    #[test]
    fn erased_store_starts_from_defaults() {
        let mut scheduler = scheduler_on(MemoryByteStore::default(), vec![Ok(24.0)]);
        scheduler.tick(0);

        assert_eq!(
            *scheduler.engine().confirmed(),
            Configuration {
                active: Active::Inactive,
                target_mode: TargetMode::Auto,
                cooling_threshold: 20,
                heating_threshold: 16,
                swing: SwingMode::Enabled,
            }
        );
        assert_eq!(scheduler.accessory().current_mode(), CurrentMode::Inactive);
        assert_eq!(frames(&scheduler), 0);
    }
}
