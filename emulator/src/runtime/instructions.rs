use parse_display::Display;

use crate::constants::{EncodedInstruction, Word};

/// Opcode field value that selects the R-type layout
pub const RTYPE_OPCODE: u8 = 28;

/// Known I-type opcodes.
///
/// Anything else in the 6-bit field decodes fine but has no handler; the
/// engine treats it as a diagnosed no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum Opcode {
    Ori = 0,
    Addi = 10,
    Beq = 12,
    Bne = 25,
    Sb = 30,
    Lbu = 40,
    Jal = 51,
    Lw = 55,
    Sw = 60,
    J = 61,
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, u8> {
        match code {
            0 => Ok(Self::Ori),
            10 => Ok(Self::Addi),
            12 => Ok(Self::Beq),
            25 => Ok(Self::Bne),
            30 => Ok(Self::Sb),
            40 => Ok(Self::Lbu),
            51 => Ok(Self::Jal),
            55 => Ok(Self::Lw),
            60 => Ok(Self::Sw),
            61 => Ok(Self::J),
            other => Err(other),
        }
    }
}

/// Known R-type function codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "lowercase")]
pub enum Function {
    Nor = 0,
    Slt = 10,
    Sll = 13,
    Sra = 16,
    Jr = 22,
    Srl = 25,
    Or = 31,
    Sub = 33,
    Add = 34,
    And = 58,
}

impl TryFrom<u8> for Function {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, u8> {
        match code {
            0 => Ok(Self::Nor),
            10 => Ok(Self::Slt),
            13 => Ok(Self::Sll),
            16 => Ok(Self::Sra),
            22 => Ok(Self::Jr),
            25 => Ok(Self::Srl),
            31 => Ok(Self::Or),
            33 => Ok(Self::Sub),
            34 => Ok(Self::Add),
            58 => Ok(Self::And),
            other => Err(other),
        }
    }
}

/// Fields of the I-type layout: opcode(6) | reg_a(5) | reg_b(5) | imm(16)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("i-type {{ op: {opcode}; ra: {reg_a}; rb: {reg_b}; imm: {immediate} }}")]
pub struct IType {
    pub opcode: u8,
    pub reg_a: u8,
    pub reg_b: u8,
    pub immediate: Word,
}

/// Fields of the R-type layout:
/// opcode(6) | reg_a(5) | reg_b(5) | reg_c(5) | shift(5) | function(6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("r-type {{ ra: {reg_a}; rb: {reg_b}; rc: {reg_c}; sh: {shift}; fn: {function} }}")]
pub struct RType {
    pub opcode: u8,
    pub reg_a: u8,
    pub reg_b: u8,
    pub reg_c: u8,
    pub shift: u8,
    pub function: u8,
}

/// A decoded instruction, one of the two fixed layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Instruction {
    #[display("{0}")]
    I(IType),

    #[display("{0}")]
    R(RType),
}

#[must_use]
pub fn opcode(word: EncodedInstruction) -> u8 {
    (word >> 26) as u8
}

/// Extract the I-type fields out of any word.
#[must_use]
pub fn decode_i(word: EncodedInstruction) -> IType {
    IType {
        opcode: opcode(word),
        reg_a: ((word >> 21) & 0x1F) as u8,
        reg_b: ((word >> 16) & 0x1F) as u8,
        immediate: (word & 0xFFFF) as Word,
    }
}

/// Extract the R-type fields out of any word.
///
/// The opcode field is carried along as-is; whether it actually holds the
/// R-type sentinel is checked at dispatch time, not here.
#[must_use]
pub fn decode_r(word: EncodedInstruction) -> RType {
    RType {
        opcode: opcode(word),
        reg_a: ((word >> 21) & 0x1F) as u8,
        reg_b: ((word >> 16) & 0x1F) as u8,
        reg_c: ((word >> 11) & 0x1F) as u8,
        shift: ((word >> 6) & 0x1F) as u8,
        function: (word & 0x3F) as u8,
    }
}

/// Total decode: every 32-bit value yields exactly one of the two shapes.
#[must_use]
pub fn decode(word: EncodedInstruction) -> Instruction {
    if opcode(word) == RTYPE_OPCODE {
        Instruction::R(decode_r(word))
    } else {
        Instruction::I(decode_i(word))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn decode_i_type() {
        let decoded = decode(0x65E0_FFFF);
        assert_eq!(
            decoded,
            Instruction::I(IType {
                opcode: 25,
                reg_a: 15,
                reg_b: 0,
                immediate: 65535,
            })
        );
    }

    #[test]
    fn decode_r_type() {
        let decoded = decode(0x73FF_4B90);
        assert_eq!(
            decoded,
            Instruction::R(RType {
                opcode: 28,
                reg_a: 31,
                reg_b: 31,
                reg_c: 9,
                shift: 14,
                function: 16,
            })
        );
    }

    #[test]
    fn decode_is_total() {
        // The all-ones and all-zeroes words both decode to something
        assert!(matches!(decode(0x0000_0000), Instruction::I(_)));
        assert!(matches!(decode(0xFFFF_FFFF), Instruction::I(_)));
        // Opcode 28 selects the R-type layout
        assert!(matches!(decode(28 << 26), Instruction::R(_)));
    }

    #[test]
    fn rtype_fields_are_extractable_from_any_word() {
        // decode_r never fails, even when the opcode field is not 28
        let fields = decode_r(0x0000_0022);
        assert_eq!(fields.opcode, 0);
        assert_eq!(fields.function, 34);
    }

    #[test]
    fn display_is_compact() {
        let decoded = decode(0x65E0_FFFF);
        assert_eq!(
            decoded.to_string(),
            "i-type { op: 25; ra: 15; rb: 0; imm: 65535 }"
        );
    }
}
