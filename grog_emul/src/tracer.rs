use std::fmt;

use crate::{
    addr::{ByteAddr, Cycle},
    isa::{DecodedInstruction, InsnKind},
};

/// An instruction and its context in an execution trace.
///
/// `cycle` counts executed instructions, starting at 1 for the first one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepRecord {
    cycle: Cycle,
    pc: Change<ByteAddr>,
    insn: DecodedInstruction,
}

impl StepRecord {
    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    pub fn pc(&self) -> Change<ByteAddr> {
        self.pc
    }

    pub fn insn(&self) -> DecodedInstruction {
        self.insn
    }

    pub fn kind(&self) -> InsnKind {
        self.insn.kind
    }

    /// Whether the instruction moved the pc anywhere but to the next instruction.
    pub fn jumped(&self) -> bool {
        self.pc.after != self.pc.before + self.insn.length
    }
}

/// Follows the execution and produces one `StepRecord` per completed instruction.
#[derive(Debug, Default)]
pub struct Tracer {
    cycle: Cycle,
    pc_before: ByteAddr,
    last: Option<StepRecord>,
}

impl Tracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instructions that completed normally.
    pub fn executed_insts(&self) -> Cycle {
        self.cycle
    }

    pub fn last_record(&self) -> Option<&StepRecord> {
        self.last.as_ref()
    }

    pub(crate) fn start(&mut self, pc: ByteAddr) {
        self.pc_before = pc;
    }

    pub(crate) fn finish(&mut self, insn: &DecodedInstruction, pc_after: ByteAddr) -> StepRecord {
        self.cycle += 1;
        let record = StepRecord {
            cycle: self.cycle,
            pc: Change::new(self.pc_before, pc_after),
            insn: *insn,
        };
        self.last = Some(record);
        record
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Change<T> {
    pub before: T,
    pub after: T,
}

impl<T> Change<T> {
    pub fn new(before: T, after: T) -> Change<T> {
        Change { before, after }
    }
}

impl<T: fmt::Debug> fmt::Debug for Change<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} -> {:?}", self.before, self.after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{AddressingMode, DecodeTable};

    #[test]
    fn test_records_count_up() {
        let table = DecodeTable::new();
        let add = table
            .decode(ByteAddr(0), InsnKind::ADD.opcode_byte(AddressingMode::Immediate))
            .unwrap();
        let mut tracer = Tracer::new();

        tracer.start(ByteAddr(0));
        let first = tracer.finish(&add, ByteAddr(2));
        tracer.start(ByteAddr(2));
        let second = tracer.finish(&add, ByteAddr(0));

        assert_eq!(first.cycle(), 1);
        assert!(!first.jumped());
        assert_eq!(second.cycle(), 2);
        assert!(second.jumped());
        assert_eq!(tracer.executed_insts(), 2);
        assert_eq!(tracer.last_record(), Some(&second));
        assert_eq!(format!("{:?}", second.pc()), "0x0002 -> 0x0000");
    }
}
