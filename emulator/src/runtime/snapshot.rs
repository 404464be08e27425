//! Binary save states: PC + registers + memory, in fixed order.

use std::fs;
use std::io;

use camino::Utf8Path;
use thiserror::Error;
use tracing::debug;

use crate::constants::{Address, Word, MEMORY_SIZE};

use super::registers::REGISTER_COUNT;
use super::Emulator;

/// Exact size of a snapshot blob: 4-byte PC, 32 big-endian register words,
/// then the whole memory buffer. No version tag, no checksum.
pub const SNAPSHOT_SIZE: usize = 4 + REGISTER_COUNT * 2 + MEMORY_SIZE;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("wrong snapshot size: expected {SNAPSHOT_SIZE} bytes, got {0}")]
    WrongSize(usize),

    #[error("could not access snapshot target: {0}")]
    Io(#[from] io::Error),
}

impl Emulator {
    /// Serialize the full machine state.
    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SNAPSHOT_SIZE);
        bytes.extend_from_slice(&u32::from(self.pc).to_be_bytes());
        for value in self.registers.values() {
            bytes.extend_from_slice(&value.to_be_bytes());
        }
        bytes.extend_from_slice(self.memory.raw());
        bytes
    }

    /// Overwrite PC, all registers and the whole memory buffer from a blob.
    ///
    /// # Errors
    ///
    /// A blob of the wrong length is rejected before anything is touched,
    /// leaving the engine state unchanged.
    pub fn restore(&mut self, bytes: &[u8]) -> Result<(), SnapshotError> {
        if bytes.len() != SNAPSHOT_SIZE {
            return Err(SnapshotError::WrongSize(bytes.len()));
        }

        let pc = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        self.pc = pc as Address;

        let mut values = [0 as Word; REGISTER_COUNT];
        for (index, value) in values.iter_mut().enumerate() {
            let offset = 4 + index * 2;
            *value = Word::from_be_bytes([bytes[offset], bytes[offset + 1]]);
        }
        self.registers.load(values);

        let memory_offset = 4 + REGISTER_COUNT * 2;
        let buffer: &[u8; MEMORY_SIZE] = bytes[memory_offset..]
            .try_into()
            .map_err(|_| SnapshotError::WrongSize(bytes.len()))?;
        self.memory.load_raw(buffer);

        Ok(())
    }

    /// Write a snapshot to the persistence target.
    ///
    /// # Errors
    ///
    /// A failed write may leave a partially-written target behind; that is
    /// the caller's problem, not corrected here.
    pub fn save_state(&self, path: &Utf8Path) -> Result<(), SnapshotError> {
        fs::write(path, self.snapshot())?;
        debug!(%path, "Saved machine state");
        Ok(())
    }

    /// Load a snapshot from the persistence target.
    ///
    /// # Errors
    ///
    /// An unreadable or wrong-sized file leaves the engine untouched.
    pub fn load_state(&mut self, path: &Utf8Path) -> Result<(), SnapshotError> {
        let bytes = fs::read(path)?;
        self.restore(&bytes)?;
        debug!(%path, "Restored machine state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::ControlFlow;
    use super::*;

    #[test]
    fn snapshot_round_trips_into_a_fresh_engine() {
        let mut engine = Emulator::default();
        engine.set_pc(0x8204);
        for index in 1..32u8 {
            engine.registers.set(index, 0x1000 + Word::from(index));
        }
        engine.memory.write_word(0x4000, 0x5678);
        engine.memory.write_byte(0x2345, 0x99);

        let blob = engine.snapshot();
        assert_eq!(blob.len(), SNAPSHOT_SIZE);

        let mut fresh = Emulator::default();
        fresh.restore(&blob).unwrap();

        assert_eq!(fresh.pc(), 0x8204);
        for index in 0..32u8 {
            assert_eq!(fresh.registers.get(index), engine.registers.get(index));
        }
        assert_eq!(fresh.memory.raw()[..], engine.memory.raw()[..]);
    }

    #[test]
    fn snapshot_layout_is_fixed() {
        let mut engine = Emulator::default();
        engine.set_pc(0x0102);
        engine.registers.set(1, 0xABCD);

        let blob = engine.snapshot();
        assert_eq!(&blob[..4], &[0x00, 0x00, 0x01, 0x02]);
        // register 0 always serializes as 0
        assert_eq!(&blob[4..6], &[0x00, 0x00]);
        assert_eq!(&blob[6..8], &[0xAB, 0xCD]);
    }

    #[test]
    fn wrong_length_blob_leaves_state_unchanged() {
        let mut engine = Emulator::default();
        engine.set_pc(0x1234);
        engine.registers.set(5, 42);

        let err = engine.restore(&[0u8; 100]).unwrap_err();
        assert!(matches!(err, SnapshotError::WrongSize(100)));
        assert_eq!(engine.pc(), 0x1234);
        assert_eq!(engine.registers.get(5), 42);
    }

    #[test]
    fn restored_engine_keeps_running() {
        let mut engine = Emulator::default();
        // addi r1 = r0 + 3 ; j 0
        let addi = (10u32 << 26) | (1 << 16) | 3;
        let jump = 61u32 << 26;
        engine.memory.write_word(0x0100, (addi >> 16) as u16);
        engine.memory.write_word(0x0102, (addi & 0xFFFF) as u16);
        engine.memory.write_word(0x0104, (jump >> 16) as u16);
        engine.memory.write_word(0x0106, (jump & 0xFFFF) as u16);
        engine.set_pc(0x0100);

        let blob = engine.snapshot();
        let mut fresh = Emulator::default();
        fresh.restore(&blob).unwrap();

        assert_eq!(fresh.run_until_return(), ControlFlow::Continue);
        assert_eq!(fresh.registers.get(1), 3);
    }
}
