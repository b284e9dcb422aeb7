use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::PersistedDefaults,
    sequence::Sequences,
    types::{Active, Configuration, Field, SwingMode, TargetMode},
};

/// Byte value of a cell that was never written.
pub const ERASED: u8 = 0xFF;

pub const RECORD_SIZE: usize = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("address {0} is outside the {RECORD_SIZE}-byte record")]
    OutOfRange(u8),
    #[error("byte store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable byte-addressable storage. Writes only survive power loss once
/// `commit` returns.
pub trait ByteStore {
    fn read(&self, address: u8) -> Result<u8, StoreError>;
    fn write(&mut self, address: u8, value: u8) -> Result<(), StoreError>;
    fn commit(&mut self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct MemoryByteStore {
    cells: [u8; RECORD_SIZE],
    durable: [u8; RECORD_SIZE],
    commits: usize,
}

impl Default for MemoryByteStore {
    fn default() -> Self {
        Self {
            cells: [ERASED; RECORD_SIZE],
            durable: [ERASED; RECORD_SIZE],
            commits: 0,
        }
    }
}

impl MemoryByteStore {
    pub fn with_durable(durable: [u8; RECORD_SIZE]) -> Self {
        Self {
            cells: durable,
            durable,
            commits: 0,
        }
    }

    pub fn durable(&self) -> [u8; RECORD_SIZE] {
        self.durable
    }

    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl ByteStore for MemoryByteStore {
    fn read(&self, address: u8) -> Result<u8, StoreError> {
        self.cells
            .get(address as usize)
            .copied()
            .ok_or(StoreError::OutOfRange(address))
    }

    fn write(&mut self, address: u8, value: u8) -> Result<(), StoreError> {
        let cell = self
            .cells
            .get_mut(address as usize)
            .ok_or(StoreError::OutOfRange(address))?;
        *cell = value;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.durable = self.cells;
        self.commits += 1;
        Ok(())
    }
}

pub fn address(field: Field) -> u8 {
    match field {
        Field::Active => 0,
        Field::TargetMode => 1,
        Field::CoolingThreshold => 2,
        Field::HeatingThreshold => 3,
        Field::Swing => 4,
    }
}

#[derive(Debug)]
pub struct StateStore<S> {
    backend: S,
    staged: BTreeMap<u8, u8>,
    last_staged_ms: Option<u64>,
}

impl<S: ByteStore> StateStore<S> {
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            staged: BTreeMap::new(),
            last_staged_ms: None,
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn is_dirty(&self) -> bool {
        !self.staged.is_empty()
    }

    pub fn last_staged_ms(&self) -> Option<u64> {
        self.last_staged_ms
    }

    pub fn read_or_default(&self, address: u8, default: u8) -> u8 {
        if let Some(value) = self.staged.get(&address) {
            return *value;
        }

        match self.backend.read(address) {
            Ok(ERASED) => default,
            Ok(value) => value,
            Err(err) => {
                warn!("byte store read at {address} failed, using default: {err}");
                default
            }
        }
    }

    pub fn stage(&mut self, address: u8, value: u8, now_ms: u64) {
        self.staged.insert(address, value);
        self.last_staged_ms = Some(now_ms);
    }

    // On error the staged writes are kept so the next call retries them.
    pub fn commit_if_dirty(&mut self) -> Result<bool, StoreError> {
        if self.staged.is_empty() {
            return Ok(false);
        }

        for (address, value) in &self.staged {
            self.backend.write(*address, *value)?;
        }
        self.backend.commit()?;

        debug!("committed {} staged byte(s)", self.staged.len());
        self.staged.clear();
        Ok(true)
    }

    pub fn load_configuration(
        &self,
        defaults: &PersistedDefaults,
        sequences: &Sequences,
    ) -> Configuration {
        let active = self.load_field(
            Field::Active,
            defaults.active,
            Active::value,
            Active::from_value,
            &sequences.active,
        );
        let target_mode = self.load_field(
            Field::TargetMode,
            defaults.target_mode,
            TargetMode::value,
            TargetMode::from_value,
            &sequences.target_mode,
        );
        let cooling_threshold = self.load_field(
            Field::CoolingThreshold,
            defaults.cooling_threshold,
            |value| value,
            Some,
            &sequences.cooling_threshold,
        );
        let heating_threshold = self.load_field(
            Field::HeatingThreshold,
            defaults.heating_threshold,
            |value| value,
            Some,
            &sequences.heating_threshold,
        );
        let swing = self.load_field(
            Field::Swing,
            defaults.swing,
            SwingMode::value,
            SwingMode::from_value,
            &sequences.swing,
        );

        Configuration {
            active,
            target_mode,
            cooling_threshold,
            heating_threshold,
            swing,
        }
    }

    fn load_field<T: Copy + PartialEq>(
        &self,
        field: Field,
        default: T,
        encode: impl Fn(T) -> u8,
        decode: impl Fn(u8) -> Option<T>,
        sequence: &[T],
    ) -> T {
        let raw = self.read_or_default(address(field), encode(default));
        match decode(raw) {
            Some(value) if sequence.contains(&value) => value,
            _ => {
                warn!(
                    "persisted {} value {raw} is not valid, using default",
                    field.as_str()
                );
                default
            }
        }
    }
}
