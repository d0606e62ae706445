use std::{iter::from_fn, path::Path, sync::Arc};

use anyhow::{Result, anyhow, bail};

use crate::{
    addr::{ByteAddr, Cycle, DeviceId, REGISTER_COUNT, RegIdx},
    device::{DeviceTable, PortContext},
    dump::RegisterDump,
    emulator::{EmuContext, Emulator, TrapCause},
    image::{LoadError, check_fits, read_image},
    isa::DecodedInstruction,
    platform::Platform,
    tracer::{StepRecord, Tracer},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MachineStatus {
    /// Constructed and possibly loaded; nothing executed yet.
    Ready,
    Running,
    /// Terminal: after a halt instruction or a fault.
    Halted,
}

/// What a run that ended with a halt instruction looked like.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Instructions executed, including the halt.
    pub steps: Cycle,
    /// Address of the halt instruction.
    pub pc: ByteAddr,
}

/// An implementation of the machine state and of the side-effects of operations.
pub struct VMState {
    platform: Platform,
    emulator: Arc<Emulator>,
    pc: ByteAddr,
    memory: Vec<u8>,
    registers: [u8; REGISTER_COUNT],
    devices: DeviceTable,
    status: MachineStatus,
    fault: Option<TrapCause>,
    tracer: Tracer,
}

impl VMState {
    pub fn new(platform: Platform, devices: DeviceTable) -> Self {
        let pc = platform.pc_start();
        let memory = vec![0; platform.memory_size as usize];
        Self {
            platform,
            emulator: Arc::new(Emulator::new()),
            pc,
            memory,
            registers: [0; REGISTER_COUNT],
            devices,
            status: MachineStatus::Ready,
            fault: None,
            tracer: Tracer::new(),
        }
    }

    /// A machine with the stdout console bound to the platform's console device.
    pub fn with_console(platform: Platform) -> Self {
        let devices = DeviceTable::with_console(platform.console_device);
        Self::new(platform, devices)
    }

    /// Copy an image into memory starting at address 0.
    ///
    /// An image larger than memory is rejected without touching memory, and
    /// the machine is halted so it cannot run half-configured.
    pub fn load_image(&mut self, image: &[u8]) -> Result<(), LoadError> {
        if let Err(err) = check_fits(image.len(), self.memory.len()) {
            tracing::error!("{err}");
            self.status = MachineStatus::Halted;
            return Err(err);
        }
        self.memory[..image.len()].copy_from_slice(image);
        tracing::debug!("loaded {} bytes", image.len());
        Ok(())
    }

    pub fn load_image_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), LoadError> {
        let image = read_image(path)?;
        self.load_image(&image)
    }

    /// Set a register before the machine starts.
    pub fn init_register(&mut self, idx: RegIdx, value: u8) -> Result<()> {
        let reg = self
            .registers
            .get_mut(idx)
            .ok_or_else(|| anyhow!("register {idx} does not exist"))?;
        *reg = value;
        Ok(())
    }

    /// Set a memory byte before the machine starts.
    pub fn init_memory(&mut self, addr: ByteAddr, value: u8) -> Result<()> {
        let cell = self
            .memory
            .get_mut(addr.0 as usize)
            .ok_or_else(|| anyhow!("address {addr:?} is outside memory"))?;
        *cell = value;
        Ok(())
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn status(&self) -> MachineStatus {
        self.status
    }

    pub fn halted(&self) -> bool {
        self.status == MachineStatus::Halted
    }

    /// The run flag: true while executing.
    pub fn is_running(&self) -> bool {
        self.status == MachineStatus::Running
    }

    /// The fault that stopped the machine, if any.
    pub fn fault(&self) -> Option<&TrapCause> {
        self.fault.as_ref()
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.registers
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn devices(&self) -> &DeviceTable {
        &self.devices
    }

    pub fn register_dump(&self) -> RegisterDump<'_> {
        RegisterDump::new(&self.registers)
    }

    /// Execute one instruction. `Ok(None)` once the machine has halted.
    pub fn step(&mut self) -> Result<Option<StepRecord>> {
        if self.halted() {
            return Ok(None);
        }
        if let Some(limit) = self.platform.max_steps {
            if self.tracer.executed_insts() >= limit {
                self.trap(TrapCause::StepLimitExceeded {
                    pc: self.pc,
                    steps: limit,
                })?;
            }
        }
        if self.status == MachineStatus::Ready {
            tracing::debug!("starting at pc={:?} on {}", self.pc, self.platform);
            self.status = MachineStatus::Running;
        }

        let emulator = Arc::clone(&self.emulator);
        self.tracer.start(self.pc);
        emulator.step(self)?;
        Ok(self.tracer.last_record().copied())
    }

    pub fn iter_until_halt(&mut self) -> impl Iterator<Item = Result<StepRecord>> + '_ {
        from_fn(move || self.step().transpose())
    }

    /// Run until a halt instruction or the first fault. A halted machine does not resume.
    pub fn run(&mut self) -> Result<RunSummary> {
        if self.halted() {
            bail!("machine is halted at pc={:?}", self.pc);
        }
        for step in self.iter_until_halt() {
            step?;
        }
        let summary = RunSummary {
            steps: self.tracer.executed_insts(),
            pc: self.pc,
        };
        tracing::debug!("halted at pc={:?} after {} steps", summary.pc, summary.steps);
        Ok(summary)
    }
}

impl EmuContext for VMState {
    fn halt(&mut self) {
        self.status = MachineStatus::Halted;
    }

    fn trap(&mut self, cause: TrapCause) -> Result<bool> {
        tracing::error!("trap: {cause}");
        self.status = MachineStatus::Halted;
        self.fault = Some(cause.clone());
        Err(cause.into()) // Crash.
    }

    fn on_normal_end(&mut self, decoded: &DecodedInstruction) {
        let record = self.tracer.finish(decoded, self.pc);
        tracing::trace!("{:?}", record);
    }

    fn get_pc(&self) -> ByteAddr {
        self.pc
    }

    fn set_pc(&mut self, addr: ByteAddr) {
        self.pc = addr;
    }

    fn load_register(&mut self, idx: RegIdx) -> Result<u8> {
        Ok(self.registers[idx])
    }

    fn store_register(&mut self, idx: RegIdx, data: u8) -> Result<()> {
        self.registers[idx] = data;
        Ok(())
    }

    fn load_memory(&mut self, addr: ByteAddr) -> Result<u8> {
        self.peek_memory(addr)
            .ok_or_else(|| anyhow!("load from {addr:?} is outside memory"))
    }

    fn store_memory(&mut self, addr: ByteAddr, data: u8) -> Result<()> {
        let cell = self
            .memory
            .get_mut(addr.0 as usize)
            .ok_or_else(|| anyhow!("store to {addr:?} is outside memory"))?;
        *cell = data;
        Ok(())
    }

    fn peek_register(&self, idx: RegIdx) -> u8 {
        self.registers[idx]
    }

    fn peek_memory(&self, addr: ByteAddr) -> Option<u8> {
        self.memory.get(addr.0 as usize).copied()
    }

    fn fetch(&mut self, pc: ByteAddr) -> Result<u8> {
        self.load_memory(pc)
    }

    fn device_input(&mut self, device: DeviceId) -> Result<Option<u8>> {
        let ctx = PortContext {
            pc: self.pc,
            registers: &self.registers,
        };
        self.devices.input(device, &ctx)
    }

    fn device_output(&mut self, device: DeviceId, value: u8) -> Result<bool> {
        let ctx = PortContext {
            pc: self.pc,
            registers: &self.registers,
        };
        self.devices.output(device, &ctx, value)
    }

    fn check_insn_load(&self, addr: ByteAddr) -> bool {
        self.platform.is_addressable(addr)
    }

    fn check_data_access(&self, addr: ByteAddr) -> bool {
        self.platform.is_addressable(addr)
    }
}
