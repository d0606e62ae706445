use std::{fmt, ops::Range};

use crate::addr::{ByteAddr, DeviceId, MEMORY_SIZE};

/// The Platform struct holds the parameters of the VM.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Platform {
    /// Number of addressable bytes. Addresses at or above this fault.
    pub memory_size: u32,
    /// Where execution begins. Images are always loaded at address 0.
    pub pc_start: u32,
    /// Device slot bound to the console sink by default.
    pub console_device: DeviceId,
    /// Stop with a fault after this many executed instructions.
    pub max_steps: Option<u64>,
}

pub const GROG_PLATFORM: Platform = Platform {
    memory_size: MEMORY_SIZE,
    pc_start: 0,
    console_device: 0,
    max_steps: None,
};

impl Default for Platform {
    fn default() -> Self {
        GROG_PLATFORM
    }
}

impl Platform {
    pub fn memory_range(&self) -> Range<u32> {
        0..self.memory_size
    }

    pub fn is_addressable(&self, addr: ByteAddr) -> bool {
        self.memory_range().contains(&addr.0)
    }

    pub fn pc_start(&self) -> ByteAddr {
        ByteAddr(self.pc_start)
    }

    pub fn with_memory_size(self, memory_size: u32) -> Self {
        Self {
            memory_size,
            ..self
        }
    }

    pub fn with_max_steps(self, max_steps: Option<u64>) -> Self {
        Self { max_steps, ..self }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "memory: {} bytes, pc_start: {}, console: device {}",
            self.memory_size,
            self.pc_start(),
            self.console_device,
        )?;
        match self.max_steps {
            Some(steps) => write!(f, ", max_steps: {steps}"),
            None => Ok(()),
        }
    }
}
