//! SLUG ROM images and their fixed big-endian header.

use std::fs;
use std::io;

use camino::Utf8Path;
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::{Address, ROM_SIZE};

/// Byte offsets of the header fields within the image.
mod header {
    pub const MAGIC: u16 = 0x0000;
    pub const SETUP: u16 = 0x01E0;
    pub const LOOP: u16 = 0x01E4;
    pub const DATA_SOURCE: u16 = 0x01E8;
    pub const DATA_DESTINATION: u16 = 0x01EC;
    pub const DATA_SIZE: u16 = 0x01F0;
}

/// The magic signature every well-formed image starts with: ASCII "SLUG"
pub const ROM_MAGIC: u32 = 0x534C_5547;

/// File extension of ROM images
pub const ROM_EXTENSION: &str = "slug";

#[derive(Debug, Error)]
pub enum RomError {
    #[error("unsupported file extension (expected .{ROM_EXTENSION})")]
    WrongExtension,

    #[error("wrong image size: expected {ROM_SIZE} bytes, got {0}")]
    WrongSize(usize),

    #[error("could not read ROM file: {0}")]
    Io(#[from] io::Error),
}

/// A validated 32KiB SLUG image.
///
/// The six header fields are read lazily out of the raw bytes; the rest of
/// the image is opaque until it gets mounted into memory.
#[derive(Clone)]
pub struct Rom {
    contents: Box<[u8; ROM_SIZE]>,
}

impl std::fmt::Debug for Rom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rom")
            .field("setup_entry", &self.setup_entry())
            .field("loop_entry", &self.loop_entry())
            .field("data_source", &self.data_source())
            .field("data_destination", &self.data_destination())
            .field("data_size", &self.data_size())
            .finish_non_exhaustive()
    }
}

impl Rom {
    /// Wrap an in-memory image, checking only its size.
    ///
    /// # Errors
    ///
    /// Fails if the buffer is not exactly [`ROM_SIZE`] bytes long.
    pub fn parse(bytes: Vec<u8>) -> Result<Self, RomError> {
        let len = bytes.len();
        let contents: Box<[u8; ROM_SIZE]> = bytes
            .into_boxed_slice()
            .try_into()
            .map_err(|_| RomError::WrongSize(len))?;

        let rom = Self { contents };
        if rom.magic() != ROM_MAGIC {
            warn!(magic = %format_args!("{:#010x}", rom.magic()), "ROM magic is not \"SLUG\"");
        }
        Ok(rom)
    }

    /// Load and validate an image from disk.
    ///
    /// # Errors
    ///
    /// Fails on a wrong extension, a wrong file size or an unreadable file.
    /// Any of those is fatal: the session must not start.
    pub fn load(path: &Utf8Path) -> Result<Self, RomError> {
        if path.extension() != Some(ROM_EXTENSION) {
            return Err(RomError::WrongExtension);
        }

        let bytes = fs::read(path)?;
        let rom = Self::parse(bytes)?;
        debug!(%path, rom = ?rom, "Loaded ROM image");
        Ok(rom)
    }

    #[must_use]
    pub fn contents(&self) -> &[u8; ROM_SIZE] {
        &self.contents
    }

    /// Read a big-endian 32-bit header field.
    ///
    /// Like every word-sized access on this machine, the offset is rounded
    /// down to the nearest aligned unit.
    fn read32(&self, offset: u16) -> u32 {
        let index = (offset as usize / 4) * 4;
        u32::from_be_bytes([
            self.contents[index],
            self.contents[index + 1],
            self.contents[index + 2],
            self.contents[index + 3],
        ])
    }

    #[must_use]
    pub fn magic(&self) -> u32 {
        self.read32(header::MAGIC)
    }

    /// Address of the first instruction of the setup phase
    #[must_use]
    pub fn setup_entry(&self) -> Address {
        self.read32(header::SETUP) as Address
    }

    /// Address of the first instruction of each loop iteration
    #[must_use]
    pub fn loop_entry(&self) -> Address {
        self.read32(header::LOOP) as Address
    }

    /// Address (in ROM space) of the initial-data block to relocate
    #[must_use]
    pub fn data_source(&self) -> u32 {
        self.read32(header::DATA_SOURCE)
    }

    /// RAM address the initial-data block gets copied to
    #[must_use]
    pub fn data_destination(&self) -> u32 {
        self.read32(header::DATA_DESTINATION)
    }

    /// Size of the initial-data block, in bytes
    #[must_use]
    pub fn data_size(&self) -> u32 {
        self.read32(header::DATA_SIZE)
    }
}

/// Build a blank image with the given header fields, for tests.
#[cfg(test)]
pub(crate) fn sample_image(setup: u32, loop_: u32, source: u32, dest: u32, size: u32) -> Vec<u8> {
    let mut bytes = vec![0u8; ROM_SIZE];
    bytes[..4].copy_from_slice(&ROM_MAGIC.to_be_bytes());
    bytes[0x01E0..0x01E4].copy_from_slice(&setup.to_be_bytes());
    bytes[0x01E4..0x01E8].copy_from_slice(&loop_.to_be_bytes());
    bytes[0x01E8..0x01EC].copy_from_slice(&source.to_be_bytes());
    bytes[0x01EC..0x01F0].copy_from_slice(&dest.to_be_bytes());
    bytes[0x01F0..0x01F4].copy_from_slice(&size.to_be_bytes());
    bytes
}
