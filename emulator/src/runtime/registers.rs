use crate::constants::Word;

/// Number of architectural registers
pub const REGISTER_COUNT: usize = 32;

/// The 32 general-purpose 16-bit registers.
///
/// Register 0 is the zero register: it reads as 0 and discards writes, no
/// matter what was stored before. Indices come out of 5-bit instruction
/// fields so they are always in range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    registers: [Word; REGISTER_COUNT],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self {
            registers: [0; REGISTER_COUNT],
        }
    }
}

impl RegisterFile {
    #[must_use]
    pub fn get(&self, index: u8) -> Word {
        if index == 0 {
            return 0;
        }
        self.registers[index as usize % REGISTER_COUNT]
    }

    pub fn set(&mut self, index: u8, value: Word) {
        if index == 0 {
            return;
        }
        self.registers[index as usize % REGISTER_COUNT] = value;
    }

    /// Snapshot view of all 32 cells, in index order.
    ///
    /// The zero register reports its architectural value, not its storage.
    pub(crate) fn values(&self) -> [Word; REGISTER_COUNT] {
        let mut values = self.registers;
        values[0] = 0;
        values
    }

    pub(crate) fn load(&mut self, values: [Word; REGISTER_COUNT]) {
        self.registers = values;
        self.registers[0] = 0;
    }
}

impl std::fmt::Display for RegisterFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, value) in self.values().iter().enumerate() {
            if index != 0 {
                write!(f, " ")?;
            }
            write!(f, "r{index}={value:#06x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn registers_hold_what_was_written() {
        let mut registers = RegisterFile::default();
        for index in 1..32u8 {
            registers.set(index, Word::from(index) * 3 + 1);
        }
        for index in 1..32u8 {
            assert_eq!(registers.get(index), Word::from(index) * 3 + 1);
        }
    }

    #[test]
    fn zero_register_discards_writes() {
        let mut registers = RegisterFile::default();
        registers.set(0, 0xDEAD);
        assert_eq!(registers.get(0), 0);
        registers.set(0, 1);
        registers.set(0, 0xFFFF);
        assert_eq!(registers.get(0), 0);
    }

    #[test]
    fn values_are_restored_wholesale() {
        let mut registers = RegisterFile::default();
        let mut values = [0u16; REGISTER_COUNT];
        for (index, value) in values.iter_mut().enumerate() {
            *value = index as u16;
        }
        registers.load(values);
        assert_eq!(registers.get(0), 0);
        assert_eq!(registers.get(17), 17);
        assert_eq!(registers.values()[0], 0);
    }
}
