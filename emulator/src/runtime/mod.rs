//! The fetch-decode-execute core and its surrounding machinery.

use tracing::{debug, trace, warn};

use crate::constants::{Address, Word, LINK_REGISTER, STACK_REGISTER, STACK_START};
use crate::rom::Rom;

pub mod instructions;
mod memory;
mod registers;
mod scheduler;
mod snapshot;

pub use self::instructions::{decode, Function, IType, Instruction, Opcode, RType, RTYPE_OPCODE};
pub use self::memory::{permissions, Memory, Permissions};
pub use self::registers::{RegisterFile, REGISTER_COUNT};
pub use self::scheduler::{
    ExitReason, InputEvent, InputSource, NoInput, NoRenderer, RenderingBackend, Scheduler,
    VideoFrame,
};
pub use self::snapshot::{SnapshotError, SNAPSHOT_SIZE};

/// Outcome of executing one instruction.
///
/// The engine never aborts on malformed instructions or permission
/// violations; the only way out is the halt signal, surfaced as a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    Halt,
}

/// The two phases of a program's life.
///
/// `Setup` runs once; when the program counter reaches the 0 sentinel the
/// engine moves to `Loop` and never comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Loop,
}

/// The SLUG execution engine.
///
/// Owns the register file and the memory subsystem, and drives the
/// fetch-decode-dispatch cycle over them.
pub struct Emulator {
    pub registers: RegisterFile,
    pub memory: Memory,
    pc: Address,
    phase: Phase,
    loop_entry: Address,
}

impl std::fmt::Debug for Emulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Emulator {{ pc: {:#06x}, phase: {:?}, registers: {}, memory: [...] }}",
            self.pc, self.phase, self.registers
        )
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new(Memory::default())
    }
}

impl Emulator {
    #[must_use]
    pub fn new(memory: Memory) -> Self {
        Self {
            registers: RegisterFile::default(),
            memory,
            pc: 0,
            phase: Phase::Setup,
            loop_entry: 0,
        }
    }

    #[must_use]
    pub fn pc(&self) -> Address {
        self.pc
    }

    pub fn set_pc(&mut self, pc: Address) {
        self.pc = pc;
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Mount a ROM and point the machine at its setup entry.
    ///
    /// Seeds the stack register and clears the link register, then leaves
    /// the engine in `Setup` ready to run.
    pub fn start(&mut self, rom: &Rom) {
        self.memory.mount_rom(rom);
        self.registers.set(STACK_REGISTER, STACK_START);
        self.registers.set(LINK_REGISTER, 0);
        self.pc = rom.setup_entry();
        self.loop_entry = rom.loop_entry();
        self.phase = Phase::Setup;
        debug!(
            setup = %format_args!("{:#06x}", self.pc),
            loop_entry = %format_args!("{:#06x}", self.loop_entry),
            "Machine started"
        );
    }

    /// Point the program counter back at the loop entry for a new frame.
    pub fn begin_frame(&mut self) {
        self.pc = self.loop_entry;
    }

    /// Fetch, decode and execute a single instruction.
    pub fn step(&mut self) -> ControlFlow {
        let word = self.memory.read_instruction(self.pc);
        let instruction = decode(word);
        trace!(pc = %format_args!("{:#06x}", self.pc), %instruction, "Executing");
        match instruction {
            Instruction::I(fields) => self.execute_i(&fields),
            Instruction::R(fields) => self.execute_r(&fields),
        }

        if self.memory.take_halt() {
            debug!("Halt signal raised");
            ControlFlow::Halt
        } else {
            ControlFlow::Continue
        }
    }

    /// Execute instructions until the program counter reaches the 0
    /// sentinel, marking the current phase complete.
    ///
    /// Pure of any timing or host I/O concern; the frame scheduler wraps it.
    pub fn run_until_return(&mut self) -> ControlFlow {
        while self.pc != 0 {
            if self.step() == ControlFlow::Halt {
                return ControlFlow::Halt;
            }
        }

        if self.phase == Phase::Setup {
            debug!("Setup phase complete");
            self.phase = Phase::Loop;
        }
        ControlFlow::Continue
    }

    fn execute_i(&mut self, fields: &IType) {
        let a = self.registers.get(fields.reg_a);
        let b = self.registers.get(fields.reg_b);
        let immediate = fields.immediate;

        let opcode = match Opcode::try_from(fields.opcode) {
            Ok(opcode) => opcode,
            Err(code) => {
                warn!(code, "unknown opcode, treating as nop");
                self.pc = self.pc.wrapping_add(4);
                return;
            }
        };

        match opcode {
            Opcode::Ori => self.registers.set(fields.reg_b, a | immediate),
            Opcode::Addi => self.registers.set(fields.reg_b, a.wrapping_add(immediate)),
            Opcode::Beq => {
                if a == b {
                    self.pc = self.pc.wrapping_add(immediate.wrapping_mul(4));
                }
            }
            Opcode::Bne => {
                if a != b {
                    self.pc = self.pc.wrapping_add(immediate.wrapping_mul(4));
                }
            }
            Opcode::Sb => self
                .memory
                .write_byte(a.wrapping_add(immediate), (b & 0xFF) as u8),
            Opcode::Lbu => {
                let byte = self.memory.read_byte(a.wrapping_add(immediate));
                self.registers.set(fields.reg_b, Word::from(byte));
            }
            Opcode::Jal => {
                self.registers.set(LINK_REGISTER, self.pc.wrapping_add(4));
                self.pc = immediate.wrapping_mul(4);
            }
            Opcode::Lw => {
                let word = self.memory.read_word(a.wrapping_add(immediate));
                self.registers.set(fields.reg_b, word);
            }
            Opcode::Sw => self.memory.write_word(a.wrapping_add(immediate), b),
            Opcode::J => self.pc = immediate.wrapping_mul(4),
        }

        // Every I-type except the two absolute jumps takes the default
        // update; a taken branch therefore lands at pc + imm*4 + 4.
        if !matches!(opcode, Opcode::Jal | Opcode::J) {
            self.pc = self.pc.wrapping_add(4);
        }
    }

    fn execute_r(&mut self, fields: &RType) {
        if fields.opcode != RTYPE_OPCODE {
            warn!(opcode = fields.opcode, "R-type sentinel mismatch, treating as nop");
            self.pc = self.pc.wrapping_add(4);
            return;
        }

        let a = self.registers.get(fields.reg_a);
        let b = self.registers.get(fields.reg_b);

        let function = match Function::try_from(fields.function) {
            Ok(function) => function,
            Err(code) => {
                warn!(code, "unknown function code, treating as nop");
                self.pc = self.pc.wrapping_add(4);
                return;
            }
        };

        match function {
            Function::Nor => self.registers.set(fields.reg_c, !(a | b)),
            // Signed views are explicit two's-complement reinterpretations
            // of the stored bits
            Function::Slt => self
                .registers
                .set(fields.reg_c, Word::from((a as i16) < (b as i16))),
            // Shifts widen to 32 bits first so the 5-bit shift amount
            // behaves like integer-promoted arithmetic
            Function::Sll => self
                .registers
                .set(fields.reg_c, (u32::from(b) << fields.shift) as Word),
            Function::Sra => self
                .registers
                .set(fields.reg_c, (i32::from(b as i16) >> fields.shift) as Word),
            Function::Jr => self.pc = a,
            Function::Srl => self
                .registers
                .set(fields.reg_c, (u32::from(b) >> fields.shift) as Word),
            Function::Or => self.registers.set(fields.reg_c, a | b),
            Function::Sub => self.registers.set(fields.reg_c, a.wrapping_sub(b)),
            Function::Add => self.registers.set(fields.reg_c, a.wrapping_add(b)),
            Function::And => self.registers.set(fields.reg_c, a & b),
        }

        if function != Function::Jr {
            self.pc = self.pc.wrapping_add(4);
        }
    }
}
