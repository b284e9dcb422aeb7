pub mod accessory;
pub mod config;
pub mod engine;
pub mod ir;
pub mod level;
pub mod scheduler;
pub mod sequence;
pub mod store;
pub mod types;

pub use accessory::{AccessoryError, AccessoryFacade, HeaterCooler};
pub use config::{IrCommandSet, LevelProbeConfig, PersistedDefaults, RuntimeConfig};
pub use engine::{ConvergenceEngine, SignalEmitter, StepReport, TickOutcome};
pub use level::{EchoSensor, LevelMonitor, LevelReading};
pub use scheduler::{Cadence, Scheduler, SensorError, TemperatureReader};
pub use sequence::{step, Direction, Overflow, Sequences, Step};
pub use store::{ByteStore, MemoryByteStore, StateStore, StoreError};
pub use types::{
    AccessoryStatus, Active, Configuration, CurrentMode, Field, Signal, SwingMode, TargetMode,
};
