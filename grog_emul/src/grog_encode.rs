use crate::{
    addr::pack_nibbles,
    isa::{AddressingMode, InsnFormat, InsnKind},
};

const MASK_4_BITS: u8 = 0x0f;

/// Encode one instruction.
///
/// - `Bare`: only `kind` is used.
/// - `Pair`: `hi` and `lo` are packed into the operand byte (dst/src, or device/register).
/// - `RegAddr`: `lo` is the register, `operand` the address operand.
/// - `PairAddr`: `hi`/`lo` are the compared registers, `operand` the target.
///
/// The address operand takes one byte, or two big-endian bytes in Absolute
/// mode. Non-mode instructions ignore `mode`.
pub fn encode_grog(kind: InsnKind, mode: AddressingMode, hi: u8, lo: u8, operand: u16) -> Vec<u8> {
    match kind.format() {
        InsnFormat::Bare => vec![kind.opcode()],
        InsnFormat::Pair => vec![kind.opcode(), pack_nibbles(hi, lo)],
        InsnFormat::RegAddr => with_operand(
            vec![kind.opcode_byte(mode), lo & MASK_4_BITS],
            mode,
            operand,
        ),
        InsnFormat::PairAddr => with_operand(
            vec![kind.opcode_byte(mode), pack_nibbles(hi, lo)],
            mode,
            operand,
        ),
    }
}

fn with_operand(mut bytes: Vec<u8>, mode: AddressingMode, operand: u16) -> Vec<u8> {
    match mode {
        AddressingMode::Absolute => bytes.extend(operand.to_be_bytes()),
        _ => bytes.push(operand as u8),
    }
    bytes
}

pub fn encode_hcf() -> Vec<u8> {
    encode_grog(InsnKind::HCF, AddressingMode::Immediate, 0, 0, 0)
}

/// `kind dst, src` for the register-pair ALU instructions.
pub fn encode_alu(kind: InsnKind, dst: u8, src: u8) -> Vec<u8> {
    encode_grog(kind, AddressingMode::Immediate, dst, src, 0)
}

pub fn encode_load(mode: AddressingMode, reg: u8, operand: u16) -> Vec<u8> {
    encode_grog(InsnKind::LOAD, mode, 0, reg, operand)
}

pub fn encode_store(mode: AddressingMode, reg: u8, operand: u16) -> Vec<u8> {
    encode_grog(InsnKind::STORE, mode, 0, reg, operand)
}

pub fn encode_branch(kind: InsnKind, mode: AddressingMode, a: u8, b: u8, target: u16) -> Vec<u8> {
    encode_grog(kind, mode, a, b, target)
}

pub fn encode_out(device: u8, reg: u8) -> Vec<u8> {
    encode_grog(InsnKind::OUT, AddressingMode::Immediate, device, reg, 0)
}

pub fn encode_in(device: u8, reg: u8) -> Vec<u8> {
    encode_grog(InsnKind::IN, AddressingMode::Immediate, device, reg, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::DecodeTable;
    use crate::ByteAddr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_reference_encoding() {
        assert_eq!(encode_load(AddressingMode::Immediate, 0, 0x05), vec![0x01, 0x00, 0x05]);
        assert_eq!(
            encode_store(AddressingMode::Absolute, 3, 0x1234),
            vec![0x42, 0x03, 0x12, 0x34]
        );
        assert_eq!(encode_alu(InsnKind::ADD, 0, 1), vec![0x10, 0x01]);
        assert_eq!(
            encode_branch(InsnKind::BEQ, AddressingMode::Offset, 2, 3, 0xfe),
            vec![0xa1, 0x23, 0xfe]
        );
        assert_eq!(encode_out(0, 4), vec![0x04, 0x04]);
        assert_eq!(encode_hcf(), vec![0x00]);
    }

    #[test]
    fn test_encoded_length_matches_decoder() {
        let table = DecodeTable::new();
        for kind in InsnKind::iter() {
            for mode in AddressingMode::iter() {
                let bytes = encode_grog(kind, mode, 1, 2, 3);
                let decoded = table.decode(ByteAddr(0), bytes[0]).unwrap();
                assert_eq!(decoded.kind, kind);
                assert_eq!(decoded.length as usize, bytes.len(), "{kind} {mode}");
            }
        }
    }
}
