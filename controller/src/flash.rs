use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use aircon_common::{
    store::{ERASED, RECORD_SIZE},
    ByteStore, StoreError,
};

#[derive(Debug)]
pub struct FileByteStore {
    path: PathBuf,
    cells: [u8; RECORD_SIZE],
}

impl FileByteStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut cells = [ERASED; RECORD_SIZE];

        match fs::read(&path) {
            Ok(raw) => {
                for (cell, byte) in cells.iter_mut().zip(raw) {
                    *cell = byte;
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        Ok(Self { path, cells })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteStore for FileByteStore {
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

    // Runs inside the scheduler tick on a runtime worker, so the blocking
    // file I/O hands the worker's other tasks off first.
    fn commit(&mut self) -> Result<(), StoreError> {
        tokio::task::block_in_place(|| write_record(&self.path, &self.cells))?;
        Ok(())
    }
}

fn write_record(path: &Path, cells: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let staging = path.with_extension("tmp");
    fs::write(&staging, cells)?;
    fs::rename(&staging, path)
}
