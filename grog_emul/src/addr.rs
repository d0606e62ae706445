use std::{fmt, ops};

/// Size of the reference memory space: 64 KiB.
pub const MEMORY_SIZE: u32 = 1 << 16;

/// Number of general-purpose byte registers.
pub const REGISTER_COUNT: usize = 16;

/// Number of device slots. A device id is encoded on 4 bits.
pub const DEVICE_COUNT: usize = 16;

pub type Byte = u8;
pub type RegIdx = usize;
pub type DeviceId = usize;
pub type Cycle = u64;

/// A memory address. Wide enough that `pc + operand` never wraps before the range check.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteAddr(pub u32);

impl ByteAddr {
    /// Apply a signed displacement. `None` when the result is negative or does not fit.
    pub fn checked_offset(self, delta: i64) -> Option<ByteAddr> {
        u32::try_from(i64::from(self.0) + delta).ok().map(ByteAddr)
    }
}

impl From<u16> for ByteAddr {
    fn from(addr: u16) -> Self {
        ByteAddr(addr.into())
    }
}

impl From<ByteAddr> for u32 {
    fn from(addr: ByteAddr) -> Self {
        addr.0
    }
}

impl From<ByteAddr> for i64 {
    fn from(addr: ByteAddr) -> Self {
        addr.0.into()
    }
}

impl ops::Add<u32> for ByteAddr {
    type Output = ByteAddr;

    fn add(self, rhs: u32) -> ByteAddr {
        ByteAddr(self.0.saturating_add(rhs))
    }
}

impl ops::AddAssign<u32> for ByteAddr {
    fn add_assign(&mut self, rhs: u32) {
        *self = *self + rhs;
    }
}

impl fmt::Debug for ByteAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

impl fmt::Display for ByteAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Split a packed operand byte into its high and low nibbles.
pub const fn split_nibbles(byte: u8) -> (usize, usize) {
    ((byte >> 4) as usize, (byte & 0x0f) as usize)
}

/// Pack two 4-bit ids into one operand byte: `(hi << 4) | lo`.
pub const fn pack_nibbles(hi: u8, lo: u8) -> u8 {
    ((hi & 0x0f) << 4) | (lo & 0x0f)
}
