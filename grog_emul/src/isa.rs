use strum_macros::{Display, EnumIter};

use crate::{addr::ByteAddr, emulator::TrapCause};

/// Bits of the opcode byte holding the addressing mode.
pub const MODE_MASK: u8 = 0xc0;
/// Bits of the opcode byte holding the logical opcode.
pub const OPCODE_MASK: u8 = 0x3f;

const DECODE_SLOTS: usize = OPCODE_MASK as usize + 1;

/// How the operand bytes of an instruction map to an effective address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, Display)]
pub enum AddressingMode {
    /// The operand byte itself is the value.
    Immediate,
    /// Two operand bytes form a big-endian address.
    Absolute,
    /// `pc` plus a signed operand byte.
    Offset,
    /// `pc` plus the contents of the register named by the operand byte.
    /// An operand byte of 16 or more is an invalid register.
    Register,
}

impl AddressingMode {
    /// The mode bits as they appear in the opcode byte.
    pub const fn bits(self) -> u8 {
        match self {
            AddressingMode::Immediate => 0x00,
            AddressingMode::Absolute => 0x40,
            AddressingMode::Offset => 0x80,
            AddressingMode::Register => 0xc0,
        }
    }

    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x00 => Some(AddressingMode::Immediate),
            0x40 => Some(AddressingMode::Absolute),
            0x80 => Some(AddressingMode::Offset),
            0xc0 => Some(AddressingMode::Register),
            _ => None,
        }
    }

    /// Number of address-operand bytes following the fixed part of the instruction.
    pub const fn operand_width(self) -> u32 {
        match self {
            AddressingMode::Absolute => 2,
            _ => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsnCategory {
    Compute,
    Branch,
    Load,
    Store,
    Io,
    System,
}
use InsnCategory::*;

/// Operand layout of an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsnFormat {
    /// `op`
    Bare,
    /// `op (hi << 4 | lo)`
    Pair,
    /// `op reg addr..`
    RegAddr,
    /// `op (a << 4 | b) addr..`
    PairAddr,
}
use InsnFormat::*;

impl InsnFormat {
    /// Whether the mode bits of the opcode byte are meaningful.
    pub const fn takes_mode(self) -> bool {
        matches!(self, RegAddr | PairAddr)
    }

    /// Encoded length in bytes, which is also the pc increment when not jumping.
    pub const fn length(self, mode: AddressingMode) -> u32 {
        match self {
            Bare => 1,
            Pair => 2,
            RegAddr | PairAddr => 2 + mode.operand_width(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, Display)]
#[allow(clippy::upper_case_acronyms)]
pub enum InsnKind {
    /// Halt and catch fire.
    HCF,
    LOAD,
    STORE,
    IN,
    OUT,
    ADD,
    SUB,
    MUL,
    DIV,
    AND,
    OR,
    XOR,
    JMP,
    BEQ,
    BNE,
    BLT,
    BGE,
}
use InsnKind::*;

impl InsnKind {
    pub const fn codes(self) -> InsnCodes {
        GROG_ISA[self as usize]
    }

    pub const fn category(self) -> InsnCategory {
        self.codes().category
    }

    pub const fn format(self) -> InsnFormat {
        self.codes().format
    }

    pub const fn opcode(self) -> u8 {
        self.codes().opcode
    }

    /// The raw opcode byte for this instruction in the given mode.
    pub const fn opcode_byte(self, mode: AddressingMode) -> u8 {
        self.opcode() | mode.bits()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct InsnCodes {
    pub format: InsnFormat,
    pub kind: InsnKind,
    pub category: InsnCategory,
    pub opcode: u8,
}

const fn insn(format: InsnFormat, kind: InsnKind, category: InsnCategory, opcode: u8) -> InsnCodes {
    InsnCodes {
        format,
        kind,
        category,
        opcode,
    }
}

type InstructionTable = [InsnCodes; 17];

const GROG_ISA: InstructionTable = [
    insn(Bare, HCF, System, 0x00),
    insn(RegAddr, LOAD, Load, 0x01),
    insn(RegAddr, STORE, Store, 0x02),
    insn(Pair, IN, Io, 0x03),
    insn(Pair, OUT, Io, 0x04),
    insn(Pair, ADD, Compute, 0x10),
    insn(Pair, SUB, Compute, 0x11),
    insn(Pair, MUL, Compute, 0x12),
    insn(Pair, DIV, Compute, 0x13),
    insn(Pair, AND, Compute, 0x14),
    insn(Pair, OR, Compute, 0x15),
    insn(Pair, XOR, Compute, 0x16),
    insn(PairAddr, JMP, Branch, 0x20),
    insn(PairAddr, BEQ, Branch, 0x21),
    insn(PairAddr, BNE, Branch, 0x22),
    insn(PairAddr, BLT, Branch, 0x23),
    insn(PairAddr, BGE, Branch, 0x24),
];

/// Split an opcode byte into its logical opcode and its mode bits.
pub const fn split_opcode_byte(byte: u8) -> (u8, u8) {
    (byte & OPCODE_MASK, byte & MODE_MASK)
}

/// Maps a logical opcode to its instruction.
///
/// The mode bits are stripped before the lookup, so every raw byte that shares
/// the low six bits of a registered opcode reaches the same instruction.
#[derive(Clone, Debug)]
pub struct DecodeTable {
    slots: [Option<InsnKind>; DECODE_SLOTS],
}

impl DecodeTable {
    pub fn new() -> Self {
        let mut slots = [None; DECODE_SLOTS];
        for codes in GROG_ISA.iter() {
            let slot = &mut slots[(codes.opcode & OPCODE_MASK) as usize];
            assert!(
                slot.is_none(),
                "opcode 0x{:02x} registered twice",
                codes.opcode
            );
            *slot = Some(codes.kind);
        }
        Self { slots }
    }

    pub fn lookup(&self, opcode: u8) -> Option<InsnKind> {
        self.slots[(opcode & OPCODE_MASK) as usize]
    }

    /// Decode the opcode byte fetched at `pc`.
    pub fn decode(&self, pc: ByteAddr, raw: u8) -> Result<DecodedInstruction, TrapCause> {
        let (opcode, mode_bits) = split_opcode_byte(raw);
        let kind = self
            .lookup(opcode)
            .ok_or(TrapCause::UnknownOpcode { pc, opcode: raw })?;
        let format = kind.format();
        let mode = match AddressingMode::from_bits(mode_bits) {
            Some(mode) if format.takes_mode() || mode == AddressingMode::Immediate => mode,
            _ => return Err(TrapCause::InvalidAddressingMode { pc, raw }),
        };
        Ok(DecodedInstruction {
            kind,
            mode,
            raw,
            length: format.length(mode),
        })
    }
}

impl Default for DecodeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The opcode byte of an instruction, split into its fields.
///
/// Operand bytes are not part of it: they are read from memory while the
/// instruction executes, which keeps self-modifying code working.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub kind: InsnKind,
    /// `Immediate` for instructions that take no addressing mode.
    pub mode: AddressingMode,
    pub raw: u8,
    pub length: u32,
}
