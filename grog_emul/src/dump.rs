use std::fmt;

use itertools::Itertools;

use crate::addr::REGISTER_COUNT;

/// Human-readable listing of the register file, one `rX: 0xVV` line per register.
#[derive(Clone, Copy, Debug)]
pub struct RegisterDump<'a> {
    registers: &'a [u8; REGISTER_COUNT],
}

impl<'a> RegisterDump<'a> {
    pub fn new(registers: &'a [u8; REGISTER_COUNT]) -> Self {
        Self { registers }
    }
}

impl fmt::Display for RegisterDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self
            .registers
            .iter()
            .enumerate()
            .map(|(idx, value)| format!("r{idx:X}: 0x{value:02X}"))
            .join("\n");
        f.write_str(&lines)
    }
}
