use std::io::{self, Read, Write};

use bitflags::bitflags;
use tracing::warn;

use crate::constants::{
    Address, EncodedInstruction, Word, CONTROLLER_PORT, MEMORY_SIZE, RAM_SIZE, ROM_SIZE, ROM_START,
    STDERR_PORT, STDIN_PORT, STDOUT_PORT, STOP_PORT, VIDEO_BASE, VIDEO_HEIGHT, VIDEO_WIDTH,
};
use crate::controller::ControllerState;
use crate::rom::Rom;

bitflags! {
    /// Access rights of an address region.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u8 {
        const READ    = 1 << 0;
        const WRITE   = 1 << 1;
        const EXECUTE = 1 << 2;
    }
}

/// The static address map, first match wins.
#[must_use]
pub fn permissions(address: Address) -> Permissions {
    if address < RAM_SIZE {
        return Permissions::READ | Permissions::WRITE;
    }
    match address {
        CONTROLLER_PORT | STDIN_PORT => Permissions::READ,
        STDOUT_PORT | STDERR_PORT | STOP_PORT => Permissions::WRITE,
        a if a >= ROM_START => Permissions::READ | Permissions::EXECUTE,
        _ => Permissions::empty(),
    }
}

/// The unified 64KiB memory space.
///
/// A flat byte buffer overlaid with RAM, video memory, the ROM image and a
/// handful of ports. Every access goes through the address map; violations
/// degrade to 0-reads and no-op writes with a diagnostic rather than
/// stopping the machine. Multi-byte values live in big-endian wire format
/// and are converted on every access.
pub struct Memory {
    buffer: Box<[u8; MEMORY_SIZE]>,
    controller: ControllerState,
    input: Box<dyn Read + Send>,
    output: Box<dyn Write + Send>,
    error: Box<dyn Write + Send>,
    halt_pending: bool,
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("controller", &self.controller)
            .field("halt_pending", &self.halt_pending)
            .finish_non_exhaustive()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(
            Box::new(io::empty()),
            Box::new(io::sink()),
            Box::new(io::sink()),
        )
    }
}

impl Memory {
    #[must_use]
    pub fn new(
        input: Box<dyn Read + Send>,
        output: Box<dyn Write + Send>,
        error: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            buffer: vec![0u8; MEMORY_SIZE]
                .into_boxed_slice()
                .try_into()
                .unwrap_or_else(|_| unreachable!()),
            controller: ControllerState::default(),
            input,
            output,
            error,
            halt_pending: false,
        }
    }

    /// Wire the ports to the host's stdin/stdout/stderr.
    #[must_use]
    pub fn host() -> Self {
        Self::new(
            Box::new(io::stdin()),
            Box::new(io::stdout()),
            Box::new(io::stderr()),
        )
    }

    /// Read one byte.
    ///
    /// Takes `&mut self` because the input port consumes from the input
    /// stream. Unreadable addresses degrade to 0.
    pub fn read_byte(&mut self, address: Address) -> u8 {
        if !permissions(address).contains(Permissions::READ) {
            warn!(address = %format_args!("{address:#06x}"), "invalid read, returning 0");
            return 0;
        }

        match address {
            CONTROLLER_PORT => self.controller.state(),
            STDIN_PORT => {
                let mut byte = [0u8; 1];
                match self.input.read(&mut byte) {
                    Ok(1) => byte[0],
                    Ok(_) => 0,
                    Err(e) => {
                        warn!(error = %e, "input stream read failed, returning 0");
                        0
                    }
                }
            }
            _ => self.buffer[address as usize],
        }
    }

    /// Read a big-endian word.
    ///
    /// The address is rounded down to the nearest word boundary: the byte
    /// offset used is `(address / 2) * 2`, so `read_word(a)` and
    /// `read_word(a + 1)` within the same unit return the same value.
    #[must_use]
    pub fn read_word(&self, address: Address) -> Word {
        if !permissions(address).contains(Permissions::READ) {
            warn!(address = %format_args!("{address:#06x}"), "invalid read, returning 0");
            return 0;
        }
        if address == STDIN_PORT || address == CONTROLLER_PORT {
            warn!(address = %format_args!("{address:#06x}"), "word-sized read on byte port, returning 0");
            return 0;
        }

        let index = (address as usize / 2) * 2;
        Word::from_be_bytes([self.buffer[index], self.buffer[index + 1]])
    }

    /// Read a big-endian instruction word.
    ///
    /// Allowed wherever Read *or* Execute is granted. Same rounding rule as
    /// [`Self::read_word`], with a 4-byte unit.
    #[must_use]
    pub fn read_instruction(&self, address: Address) -> EncodedInstruction {
        if (permissions(address) & (Permissions::READ | Permissions::EXECUTE)).is_empty() {
            warn!(
                address = %format_args!("{address:#06x}"),
                "read/execute not set for instruction fetch, returning 0"
            );
            return 0;
        }

        let index = (address as usize / 4) * 4;
        EncodedInstruction::from_be_bytes([
            self.buffer[index],
            self.buffer[index + 1],
            self.buffer[index + 2],
            self.buffer[index + 3],
        ])
    }

    /// Write one byte, dispatching port addresses to device behavior.
    pub fn write_byte(&mut self, address: Address, byte: u8) {
        if !permissions(address).contains(Permissions::WRITE) {
            warn!(address = %format_args!("{address:#06x}"), "invalid write, performing nop");
            return;
        }

        match address {
            STDOUT_PORT => {
                if let Err(e) = self.output.write_all(&[byte]) {
                    warn!(error = %e, "output stream write failed");
                }
            }
            STDERR_PORT => {
                if let Err(e) = self.error.write_all(&[byte]) {
                    warn!(error = %e, "error stream write failed");
                }
            }
            STOP_PORT => {
                self.halt_pending = true;
            }
            _ => self.buffer[address as usize] = byte,
        }
    }

    /// Write a big-endian word, with the same rounding rule as reads.
    pub fn write_word(&mut self, address: Address, word: Word) {
        if !permissions(address).contains(Permissions::WRITE) {
            warn!(address = %format_args!("{address:#06x}"), "invalid write, performing nop");
            return;
        }
        if address == STDOUT_PORT || address == STDERR_PORT || address == STOP_PORT {
            warn!(address = %format_args!("{address:#06x}"), "word-sized write on byte port, performing nop");
            return;
        }

        let index = (address as usize / 2) * 2;
        self.buffer[index..index + 2].copy_from_slice(&word.to_be_bytes());
    }

    /// Mount a ROM image.
    ///
    /// Copies the full image into the ROM region, then seeds the program's
    /// initial writable data by copying the relocation block described by
    /// the header into RAM. A header describing an out-of-range block is
    /// diagnosed and the copy skipped.
    pub fn mount_rom(&mut self, rom: &Rom) {
        self.buffer[ROM_START as usize..].copy_from_slice(rom.contents());

        let size = rom.data_size() as usize;
        if size == 0 {
            return;
        }

        let source = rom.data_source() as usize;
        let destination = rom.data_destination() as usize;
        let in_rom = source
            .checked_sub(ROM_START as usize)
            .and_then(|offset| offset.checked_add(size).map(|end| (offset, end)))
            .filter(|(_, end)| *end <= ROM_SIZE);

        let Some((offset, end)) = in_rom else {
            warn!(source, size, "relocation source outside the ROM image, skipping");
            return;
        };
        if destination + size > MEMORY_SIZE {
            warn!(destination, size, "relocation destination overflows memory, skipping");
            return;
        }

        let block = &rom.contents()[offset..end];
        self.buffer[destination..destination + size].copy_from_slice(block);
    }

    /// True once a stop-port write happened; reading it clears it.
    pub fn take_halt(&mut self) -> bool {
        std::mem::take(&mut self.halt_pending)
    }

    #[must_use]
    pub fn controller(&self) -> &ControllerState {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ControllerState {
        &mut self.controller
    }

    /// Read-only view of the video window, for the rendering collaborator.
    #[must_use]
    pub fn video(&self) -> &[u8] {
        let base = VIDEO_BASE as usize;
        &self.buffer[base..base + VIDEO_WIDTH * VIDEO_HEIGHT]
    }

    pub(crate) fn raw(&self) -> &[u8; MEMORY_SIZE] {
        &self.buffer
    }

    pub(crate) fn load_raw(&mut self, bytes: &[u8; MEMORY_SIZE]) {
        self.buffer.copy_from_slice(bytes);
    }
}
