//! Shared types and fixed addresses of the SLUG machine.

/// A 16-bit address into the unified memory space
pub type Address = u16;

/// The machine word: 16 bits, stored big-endian in memory
pub type Word = u16;

/// A raw, not-yet-decoded instruction word
pub type EncodedInstruction = u32;

/// Total size of the unified memory space
pub const MEMORY_SIZE: usize = 0x10000;

/// Start of general-purpose RAM
pub const RAM_START: Address = 0x0000;

/// Size of the RAM region; everything below this is readable and writable
pub const RAM_SIZE: Address = 0x7000;

/// Initial stack pointer value, seeded into register 29 at startup
pub const STACK_START: Address = 0x3400;

/// Base of the video frame buffer, one byte per pixel, row-major
pub const VIDEO_BASE: Address = 0x3400;

/// Video window width in pixels
pub const VIDEO_WIDTH: usize = 128;

/// Video window height in pixels
pub const VIDEO_HEIGHT: usize = 120;

/// Read-only port exposing the live controller bitmask
pub const CONTROLLER_PORT: Address = 0x7000;

/// Read-only port consuming one byte from the input stream
pub const STDIN_PORT: Address = 0x7100;

/// Write-only port emitting one byte to the output stream
pub const STDOUT_PORT: Address = 0x7110;

/// Write-only port emitting one byte to the error stream
pub const STDERR_PORT: Address = 0x7120;

/// Write-only port raising the halt signal; the written value is ignored
pub const STOP_PORT: Address = 0x7200;

/// Base of the mounted ROM image
pub const ROM_START: Address = 0x8000;

/// Exact size of a SLUG ROM image
pub const ROM_SIZE: usize = 0x8000;

/// Register holding the return address after a `jal`
pub const LINK_REGISTER: u8 = 31;

/// Register conventionally holding the stack pointer
pub const STACK_REGISTER: u8 = 29;

/// Duration of one frame of the loop phase (60Hz)
pub const FRAME_PERIOD: std::time::Duration = std::time::Duration::from_micros(16_670);
