use anyhow::{Result, anyhow};
use thiserror::Error;

use crate::{
    addr::{ByteAddr, DeviceId, RegIdx, REGISTER_COUNT, split_nibbles},
    addressing::{check_range, read_operand, resolve},
    isa::{AddressingMode, DecodeTable, DecodedInstruction, InsnCategory, InsnKind},
    ops,
};

pub trait EmuContext {
    // Stop execution after the current instruction
    fn halt(&mut self);

    // Handle a trap
    fn trap(&mut self, cause: TrapCause) -> Result<bool>;

    // Callback when instructions end normally
    fn on_normal_end(&mut self, _decoded: &DecodedInstruction) {}

    // Get the program counter
    fn get_pc(&self) -> ByteAddr;

    // Set the program counter
    fn set_pc(&mut self, addr: ByteAddr);

    // Load from a register
    fn load_register(&mut self, idx: RegIdx) -> Result<u8>;

    // Store to a register
    fn store_register(&mut self, idx: RegIdx, data: u8) -> Result<()>;

    // Load from memory
    fn load_memory(&mut self, addr: ByteAddr) -> Result<u8>;

    // Store to memory
    fn store_memory(&mut self, addr: ByteAddr, data: u8) -> Result<()>;

    // Get the value of a register without side-effects.
    fn peek_register(&self, idx: RegIdx) -> u8;

    // Get the value of a memory byte without side-effects, if addressable.
    fn peek_memory(&self, addr: ByteAddr) -> Option<u8>;

    // Load from memory, in the context of instruction fetching.
    fn fetch(&mut self, pc: ByteAddr) -> Result<u8>;

    // Read a byte from a device. `None` when nothing is attached for input.
    fn device_input(&mut self, device: DeviceId) -> Result<Option<u8>>;

    // Write a byte to a device. `false` when nothing is attached for output.
    fn device_output(&mut self, device: DeviceId, value: u8) -> Result<bool>;

    // Check access for instruction load
    fn check_insn_load(&self, _addr: ByteAddr) -> bool {
        true
    }

    // Check access for data load and store
    fn check_data_access(&self, _addr: ByteAddr) -> bool {
        true
    }
}

/// A fatal execution fault. Every variant carries the pc of the faulting instruction.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TrapCause {
    #[error("unknown opcode 0x{opcode:02x} at pc={pc}")]
    UnknownOpcode { pc: ByteAddr, opcode: u8 },
    #[error("invalid addressing mode in opcode byte 0x{raw:02x} at pc={pc}")]
    InvalidAddressingMode { pc: ByteAddr, raw: u8 },
    #[error("invalid register id {reg} at pc={pc}")]
    InvalidRegister { pc: ByteAddr, reg: u8 },
    #[error("division by zero at pc={pc}: {dividend} / {divisor}")]
    DivisionByZero {
        pc: ByteAddr,
        dividend: u8,
        divisor: u8,
    },
    #[error("address {addr} out of range at pc={pc}")]
    AddressOutOfRange { pc: ByteAddr, addr: i64 },
    #[error("device {device} failed at pc={pc}: {message}")]
    DeviceError {
        pc: ByteAddr,
        device: DeviceId,
        message: String,
    },
    #[error("step limit of {steps} reached at pc={pc}")]
    StepLimitExceeded { pc: ByteAddr, steps: u64 },
}

impl TrapCause {
    pub fn pc(&self) -> ByteAddr {
        match self {
            TrapCause::UnknownOpcode { pc, .. }
            | TrapCause::InvalidAddressingMode { pc, .. }
            | TrapCause::InvalidRegister { pc, .. }
            | TrapCause::DivisionByZero { pc, .. }
            | TrapCause::AddressOutOfRange { pc, .. }
            | TrapCause::DeviceError { pc, .. }
            | TrapCause::StepLimitExceeded { pc, .. } => *pc,
        }
    }
}

// Evaluate a fallible decode or resolve step, trapping on failure.
macro_rules! try_trap {
    ($ctx:expr, $res:expr) => {
        match $res {
            Ok(value) => value,
            Err(cause) => return $ctx.trap(cause),
        }
    };
}

/// The instruction set: decoding and functional units.
///
/// The decode table is built once here and never changes afterwards.
#[derive(Clone, Debug, Default)]
pub struct Emulator {
    table: DecodeTable,
}

impl Emulator {
    pub fn new() -> Self {
        Self {
            table: DecodeTable::new(),
        }
    }

    pub fn decode_table(&self) -> &DecodeTable {
        &self.table
    }

    pub fn step<C: EmuContext>(&self, ctx: &mut C) -> Result<()> {
        let pc = ctx.get_pc();

        if !ctx.check_insn_load(pc) {
            ctx.trap(TrapCause::AddressOutOfRange {
                pc,
                addr: pc.into(),
            })?;
            return Err(anyhow!("Fatal: could not fetch instruction at pc={:?}", pc));
        }

        let raw = ctx.fetch(pc)?;
        let insn = match self.table.decode(pc, raw) {
            Ok(insn) => insn,
            Err(cause) => {
                ctx.trap(cause)?;
                return Err(anyhow!("Fatal: could not decode 0x{:02x} at pc={:?}", raw, pc));
            }
        };
        tracing::trace!("pc: {:?}, kind: {:?}, mode: {:?}", pc, insn.kind, insn.mode);

        if match insn.kind.category() {
            InsnCategory::Compute => self.step_compute(ctx, &insn)?,
            InsnCategory::Branch => self.step_branch(ctx, &insn)?,
            InsnCategory::Load => self.step_load(ctx, &insn)?,
            InsnCategory::Store => self.step_store(ctx, &insn)?,
            InsnCategory::Io => self.step_io(ctx, &insn)?,
            InsnCategory::System => self.step_system(ctx, &insn)?,
        } {
            ctx.on_normal_end(&insn);
        };

        Ok(())
    }

    fn step_compute<M: EmuContext>(
        &self,
        ctx: &mut M,
        decoded: &DecodedInstruction,
    ) -> Result<bool> {
        use InsnKind::*;

        let pc = ctx.get_pc();
        let (dst, src) = split_nibbles(try_trap!(ctx, read_operand(&*ctx, pc, pc + 1)));
        let lhs = ctx.load_register(dst)?;
        let rhs = ctx.load_register(src)?;

        let out = match decoded.kind {
            ADD => ops::add_bytes(lhs, rhs),
            SUB => ops::sub_bytes(lhs, rhs),
            MUL => ops::mul_bytes(lhs, rhs),
            DIV => match ops::div_bytes(lhs, rhs) {
                Some(quotient) => quotient,
                None => {
                    return ctx.trap(TrapCause::DivisionByZero {
                        pc,
                        dividend: lhs,
                        divisor: rhs,
                    });
                }
            },
            AND => ops::and_bytes(lhs, rhs),
            OR => ops::or_bytes(lhs, rhs),
            XOR => ops::xor_bytes(lhs, rhs),
            _ => unreachable!("Illegal compute instruction: {:?}", decoded),
        };
        ctx.store_register(dst, out)?;
        ctx.set_pc(pc + decoded.length);
        Ok(true)
    }

    fn step_branch<M: EmuContext>(
        &self,
        ctx: &mut M,
        decoded: &DecodedInstruction,
    ) -> Result<bool> {
        use InsnKind::*;

        let pc = ctx.get_pc();
        let (a, b) = split_nibbles(try_trap!(ctx, read_operand(&*ctx, pc, pc + 1)));
        let lhs = ctx.load_register(a)?;
        let rhs = ctx.load_register(b)?;

        let taken = match decoded.kind {
            JMP => ops::always(lhs, rhs),
            BEQ => ops::equal(lhs, rhs),
            BNE => ops::not_equal(lhs, rhs),
            BLT => ops::less_than(lhs, rhs),
            BGE => ops::greater_or_equal(lhs, rhs),
            _ => unreachable!("Illegal branch instruction: {:?}", decoded.kind),
        };

        let new_pc = if taken {
            try_trap!(ctx, branch_target(&*ctx, decoded.mode, pc))
        } else {
            pc + decoded.length
        };
        ctx.set_pc(new_pc);
        Ok(true)
    }

    fn step_load<M: EmuContext>(&self, ctx: &mut M, decoded: &DecodedInstruction) -> Result<bool> {
        let pc = ctx.get_pc();
        let reg = try_trap!(ctx, register_operand(&*ctx, pc));
        let addr = try_trap!(ctx, resolve(&*ctx, decoded.mode, pc, pc + 2));
        let data = ctx.load_memory(addr)?;
        ctx.store_register(reg, data)?;
        ctx.set_pc(pc + decoded.length);
        Ok(true)
    }

    fn step_store<M: EmuContext>(&self, ctx: &mut M, decoded: &DecodedInstruction) -> Result<bool> {
        let pc = ctx.get_pc();
        let reg = try_trap!(ctx, register_operand(&*ctx, pc));
        let addr = try_trap!(ctx, resolve(&*ctx, decoded.mode, pc, pc + 2));
        let data = ctx.load_register(reg)?;
        ctx.store_memory(addr, data)?;
        ctx.set_pc(pc + decoded.length);
        Ok(true)
    }

    fn step_io<M: EmuContext>(&self, ctx: &mut M, decoded: &DecodedInstruction) -> Result<bool> {
        let pc = ctx.get_pc();
        let (device, reg) = split_nibbles(try_trap!(ctx, read_operand(&*ctx, pc, pc + 1)));

        let result = match decoded.kind {
            InsnKind::IN => match ctx.device_input(device) {
                Ok(Some(value)) => ctx.store_register(reg, value),
                Ok(None) => {
                    tracing::debug!("IN from unattached device {device} at pc={pc:?}");
                    Ok(())
                }
                Err(err) => Err(err),
            },
            InsnKind::OUT => {
                let value = ctx.load_register(reg)?;
                ctx.device_output(device, value).map(|attached| {
                    if !attached {
                        tracing::debug!("OUT to unattached device {device} at pc={pc:?}");
                    }
                })
            }
            _ => unreachable!("Illegal io instruction: {:?}", decoded.kind),
        };
        if let Err(err) = result {
            return ctx.trap(TrapCause::DeviceError {
                pc,
                device,
                message: format!("{err:#}"),
            });
        }
        ctx.set_pc(pc + decoded.length);
        Ok(true)
    }

    fn step_system<M: EmuContext>(
        &self,
        ctx: &mut M,
        decoded: &DecodedInstruction,
    ) -> Result<bool> {
        match decoded.kind {
            // The pc stays on the halt instruction.
            InsnKind::HCF => {
                ctx.halt();
                Ok(true)
            }
            _ => unreachable!("Illegal system instruction: {:?}", decoded.kind),
        }
    }
}

fn register_operand<C: EmuContext + ?Sized>(ctx: &C, pc: ByteAddr) -> Result<RegIdx, TrapCause> {
    let reg = read_operand(ctx, pc, pc + 1)?;
    if (reg as usize) < REGISTER_COUNT {
        Ok(reg as RegIdx)
    } else {
        Err(TrapCause::InvalidRegister { pc, reg })
    }
}

/// Where a taken branch goes. In Immediate mode the inline byte is the destination.
fn branch_target<C: EmuContext + ?Sized>(
    ctx: &C,
    mode: AddressingMode,
    pc: ByteAddr,
) -> Result<ByteAddr, TrapCause> {
    let addr = resolve(ctx, mode, pc, pc + 2)?;
    match mode {
        AddressingMode::Immediate => {
            let target = ByteAddr(read_operand(ctx, pc, addr)?.into());
            check_range(ctx, pc, target)
        }
        _ => Ok(addr),
    }
}
