use std::{
    collections::VecDeque,
    fmt,
    io::{self, Write},
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::{Context, Result, anyhow};

use crate::addr::{ByteAddr, DEVICE_COUNT, DeviceId, REGISTER_COUNT};

/// Read-only view of the machine handed to a device on every access.
#[derive(Clone, Copy, Debug)]
pub struct PortContext<'a> {
    pub pc: ByteAddr,
    pub registers: &'a [u8; REGISTER_COUNT],
}

/// A device that can be read by `IN`.
pub trait InputPort: Send {
    fn input(&mut self, ctx: &PortContext<'_>) -> Result<u8>;
}

/// A device that can be written by `OUT`.
pub trait OutputPort: Send {
    fn output(&mut self, ctx: &PortContext<'_>, value: u8) -> Result<()>;
}

/// The capabilities bound to one device id. Either direction may be absent.
#[derive(Default)]
pub struct DeviceSlot {
    input: Option<Box<dyn InputPort>>,
    output: Option<Box<dyn OutputPort>>,
}

impl DeviceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(self, port: impl InputPort + 'static) -> Self {
        Self {
            input: Some(Box::new(port)),
            ..self
        }
    }

    pub fn with_output(self, port: impl OutputPort + 'static) -> Self {
        Self {
            output: Some(Box::new(port)),
            ..self
        }
    }

    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }
}

impl fmt::Debug for DeviceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSlot")
            .field("input", &self.has_input())
            .field("output", &self.has_output())
            .finish()
    }
}

/// Device slots indexed by device id, filled before the machine runs.
#[derive(Debug)]
pub struct DeviceTable {
    slots: [DeviceSlot; DEVICE_COUNT],
}

impl Default for DeviceTable {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| DeviceSlot::default()),
        }
    }
}

impl DeviceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table with the stdout console bound to `device`.
    pub fn with_console(device: DeviceId) -> Self {
        Self::new().bind(device, DeviceSlot::new().with_output(Console::stdout()))
    }

    /// Bind a slot, replacing whatever was there.
    pub fn bind(mut self, device: DeviceId, slot: DeviceSlot) -> Self {
        assert!(
            device < DEVICE_COUNT,
            "device id {device} out of range (max {})",
            DEVICE_COUNT - 1
        );
        self.slots[device] = slot;
        self
    }

    pub fn slot(&self, device: DeviceId) -> Option<&DeviceSlot> {
        self.slots.get(device)
    }

    /// Read from `device`. `Ok(None)` when no input capability is bound.
    pub fn input(&mut self, device: DeviceId, ctx: &PortContext<'_>) -> Result<Option<u8>> {
        match self.slots.get_mut(device).and_then(|slot| slot.input.as_mut()) {
            Some(port) => port.input(ctx).map(Some),
            None => Ok(None),
        }
    }

    /// Write to `device`. `Ok(false)` when no output capability is bound.
    pub fn output(&mut self, device: DeviceId, ctx: &PortContext<'_>, value: u8) -> Result<bool> {
        match self.slots.get_mut(device).and_then(|slot| slot.output.as_mut()) {
            Some(port) => port.output(ctx, value).map(|()| true),
            None => Ok(false),
        }
    }
}

/// Console sink: prints each byte as a decimal numeral on its own line and flushes.
pub struct Console<W> {
    out: W,
}

impl Console<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> Console<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> OutputPort for Console<W> {
    fn output(&mut self, _ctx: &PortContext<'_>, value: u8) -> Result<()> {
        writeln!(self.out, "{value}").context("console write failed")?;
        self.out.flush().context("console flush failed")
    }
}

#[derive(Debug, Default)]
struct Buffer {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

/// An in-memory device. Clones share the same buffers, so the host keeps a
/// handle to inspect what the program wrote or to queue more input.
///
/// Reading an empty input queue yields 0.
#[derive(Clone, Debug, Default)]
pub struct BufferDevice {
    inner: Arc<Mutex<Buffer>>,
}

impl BufferDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(bytes: impl IntoIterator<Item = u8>) -> Self {
        let device = Self::new();
        device.push_input(bytes);
        device
    }

    pub fn push_input(&self, bytes: impl IntoIterator<Item = u8>) {
        self.lock().input.extend(bytes);
    }

    /// Every byte written so far.
    pub fn output(&self) -> Vec<u8> {
        self.lock().output.clone()
    }

    /// Bytes still waiting to be read.
    pub fn pending_input(&self) -> usize {
        self.lock().input.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Buffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl InputPort for BufferDevice {
    fn input(&mut self, _ctx: &PortContext<'_>) -> Result<u8> {
        let mut buffer = self
            .inner
            .lock()
            .map_err(|_| anyhow!("buffer device lock poisoned"))?;
        Ok(buffer.input.pop_front().unwrap_or(0))
    }
}

impl OutputPort for BufferDevice {
    fn output(&mut self, _ctx: &PortContext<'_>, value: u8) -> Result<()> {
        let mut buffer = self
            .inner
            .lock()
            .map_err(|_| anyhow!("buffer device lock poisoned"))?;
        buffer.output.push(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static REGISTERS: [u8; REGISTER_COUNT] = [0; REGISTER_COUNT];

    fn ctx() -> PortContext<'static> {
        PortContext {
            pc: ByteAddr(0),
            registers: &REGISTERS,
        }
    }

    #[test]
    fn test_console_prints_decimal() -> Result<()> {
        let mut console = Console::new(Vec::new());
        console.output(&ctx(), 65)?;
        console.output(&ctx(), 7)?;
        assert_eq!(String::from_utf8(console.into_inner())?, "65\n7\n");
        Ok(())
    }

    #[test]
    fn test_unbound_slots_are_noops() -> Result<()> {
        let mut table = DeviceTable::new();
        assert_eq!(table.input(3, &ctx())?, None);
        assert!(!table.output(3, &ctx(), 1)?);
        // Ids past the table behave like empty slots.
        assert_eq!(table.input(DEVICE_COUNT, &ctx())?, None);
        Ok(())
    }

    #[test]
    fn test_one_direction_only() -> Result<()> {
        let sink = BufferDevice::new();
        let mut table = DeviceTable::new().bind(2, DeviceSlot::new().with_output(sink.clone()));
        assert!(table.output(2, &ctx(), 9)?);
        assert_eq!(table.input(2, &ctx())?, None);
        assert_eq!(sink.output(), vec![9]);
        Ok(())
    }

    #[test]
    fn test_buffer_device_input() -> Result<()> {
        let source = BufferDevice::with_input([4, 5]);
        let mut table = DeviceTable::new().bind(1, DeviceSlot::new().with_input(source.clone()));
        assert_eq!(table.input(1, &ctx())?, Some(4));
        assert_eq!(source.pending_input(), 1);
        assert_eq!(table.input(1, &ctx())?, Some(5));
        assert_eq!(table.input(1, &ctx())?, Some(0));
        Ok(())
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_bind_rejects_large_id() {
        let _ = DeviceTable::new().bind(DEVICE_COUNT, DeviceSlot::new());
    }
}
