use crate::{
    addr::{ByteAddr, REGISTER_COUNT, RegIdx},
    emulator::{EmuContext, TrapCause},
    isa::AddressingMode,
};

/// Compute the effective address of an instruction operand.
///
/// `pc` is the address of the opcode byte and `operand_addr` the address of the
/// first address-operand byte. Only reads the context; the same inputs always
/// give the same address.
pub fn resolve<C: EmuContext + ?Sized>(
    ctx: &C,
    mode: AddressingMode,
    pc: ByteAddr,
    operand_addr: ByteAddr,
) -> Result<ByteAddr, TrapCause> {
    let addr = match mode {
        AddressingMode::Immediate => operand_addr,
        AddressingMode::Absolute => {
            let hi = read_operand(ctx, pc, operand_addr)?;
            let lo = read_operand(ctx, pc, operand_addr + 1)?;
            ByteAddr::from(u16::from_be_bytes([hi, lo]))
        }
        AddressingMode::Offset => {
            let offset = read_operand(ctx, pc, operand_addr)? as i8;
            pc.checked_offset(offset.into())
                .ok_or(TrapCause::AddressOutOfRange {
                    pc,
                    addr: i64::from(pc) + i64::from(offset),
                })?
        }
        AddressingMode::Register => {
            let reg = read_operand(ctx, pc, operand_addr)?;
            if reg as usize >= REGISTER_COUNT {
                return Err(TrapCause::InvalidRegister { pc, reg });
            }
            pc + u32::from(ctx.peek_register(reg as RegIdx))
        }
    };
    check_range(ctx, pc, addr)
}

/// Read one operand byte of the instruction at `pc`.
pub(crate) fn read_operand<C: EmuContext + ?Sized>(
    ctx: &C,
    pc: ByteAddr,
    addr: ByteAddr,
) -> Result<u8, TrapCause> {
    ctx.peek_memory(addr).ok_or(TrapCause::AddressOutOfRange {
        pc,
        addr: addr.into(),
    })
}

pub(crate) fn check_range<C: EmuContext + ?Sized>(
    ctx: &C,
    pc: ByteAddr,
    addr: ByteAddr,
) -> Result<ByteAddr, TrapCause> {
    if ctx.check_data_access(addr) {
        Ok(addr)
    } else {
        Err(TrapCause::AddressOutOfRange {
            pc,
            addr: addr.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GROG_PLATFORM, VMState};
    use proptest::prelude::*;

    fn vm_with(bytes: &[u8]) -> VMState {
        let mut vm = VMState::new(GROG_PLATFORM, Default::default());
        vm.load_image(bytes).unwrap();
        vm
    }

    #[test]
    fn test_immediate() {
        let vm = vm_with(&[0; 8]);
        assert_eq!(
            resolve(&vm, AddressingMode::Immediate, ByteAddr(2), ByteAddr(4)),
            Ok(ByteAddr(4))
        );
    }

    #[test]
    fn test_absolute_is_big_endian() {
        let vm = vm_with(&[0x00, 0x00, 0x12, 0x34]);
        assert_eq!(
            resolve(&vm, AddressingMode::Absolute, ByteAddr(0), ByteAddr(2)),
            Ok(ByteAddr(0x1234))
        );
    }

    #[test]
    fn test_offset_is_signed() {
        let vm = vm_with(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0xfd]);
        assert_eq!(
            resolve(&vm, AddressingMode::Offset, ByteAddr(4), ByteAddr(5)),
            Ok(ByteAddr(9))
        );
        assert_eq!(
            resolve(&vm, AddressingMode::Offset, ByteAddr(4), ByteAddr(6)),
            Ok(ByteAddr(1))
        );
        // 0xfd is -3; from pc=1 that lands before address 0.
        assert_eq!(
            resolve(&vm, AddressingMode::Offset, ByteAddr(1), ByteAddr(6)),
            Err(TrapCause::AddressOutOfRange {
                pc: ByteAddr(1),
                addr: -2
            })
        );
    }

    #[test]
    fn test_register_indexed() {
        let mut vm = vm_with(&[0x00, 0x00, 0x03]);
        vm.init_register(3, 0x20).unwrap();
        assert_eq!(
            resolve(&vm, AddressingMode::Register, ByteAddr(0x10), ByteAddr(2)),
            Ok(ByteAddr(0x30))
        );
    }

    #[test]
    fn test_register_indexed_rejects_high_nibble() {
        let mut vm = vm_with(&[0x00, 0x00, 0x13]);
        vm.init_register(3, 0x01).unwrap();
        assert_eq!(
            resolve(&vm, AddressingMode::Register, ByteAddr(0), ByteAddr(2)),
            Err(TrapCause::InvalidRegister {
                pc: ByteAddr(0),
                reg: 0x13
            })
        );
    }

    #[test]
    fn test_out_of_range() {
        let mut vm = VMState::new(GROG_PLATFORM.with_memory_size(0x100), Default::default());
        vm.load_image(&[0x00, 0x01, 0x00]).unwrap();
        assert_eq!(
            resolve(&vm, AddressingMode::Absolute, ByteAddr(0), ByteAddr(1)),
            Err(TrapCause::AddressOutOfRange {
                pc: ByteAddr(0),
                addr: 0x100
            })
        );
        // The operand itself lies outside memory.
        assert_eq!(
            resolve(&vm, AddressingMode::Offset, ByteAddr(0xff), ByteAddr(0x100)),
            Err(TrapCause::AddressOutOfRange {
                pc: ByteAddr(0xff),
                addr: 0x100
            })
        );
    }

    proptest! {
        #[test]
        fn resolve_is_pure(
            image in proptest::collection::vec(any::<u8>(), 4..64),
            registers in proptest::array::uniform16(any::<u8>()),
            pc in 0u32..64,
            mode_idx in 0usize..4,
        ) {
            let mut vm = vm_with(&image);
            for (idx, value) in registers.into_iter().enumerate() {
                vm.init_register(idx, value).unwrap();
            }
            let mode = [
                AddressingMode::Immediate,
                AddressingMode::Absolute,
                AddressingMode::Offset,
                AddressingMode::Register,
            ][mode_idx];
            let pc = ByteAddr(pc);
            let before_regs = *vm.registers();
            let before_mem = vm.memory().to_vec();

            let first = resolve(&vm, mode, pc, pc + 1);
            let second = resolve(&vm, mode, pc, pc + 1);

            prop_assert_eq!(first, second);
            prop_assert_eq!(&before_regs, vm.registers());
            prop_assert_eq!(before_mem, vm.memory().to_vec());
        }
    }
}
