mod addr;
pub use addr::*;

mod platform;
pub use platform::*;

pub mod ops;

mod isa;
pub use isa::*;

mod addressing;
pub use addressing::resolve;

mod emulator;
pub use emulator::{EmuContext, Emulator, TrapCause};

mod device;
pub use device::*;

mod image;
pub use image::{LoadError, read_image};

mod tracer;
pub use tracer::{Change, StepRecord, Tracer};

mod vm_state;
pub use vm_state::{MachineStatus, RunSummary, VMState};

mod dump;
pub use dump::RegisterDump;

mod grog_encode;
pub use grog_encode::*;
