//! Machine memory bus: flat RAM with peripheral interception.
//!
//! Peripherals own contiguous address ranges; any read or write landing in a
//! bound range is delegated to the peripheral's callbacks instead of RAM.

use std::fmt;

use emu_core::{Bus6502, BusError};

use crate::MachineError;

/// Full 16-bit address space.
pub const RAM_SIZE: usize = 0x10000;

/// Failure reported by a peripheral callback. The bus maps it onto the
/// faulting address; the callback's internals stay opaque to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeripheralFault;

/// A device bound to an address range.
///
/// Callbacks must not block; the bus calls them synchronously from the
/// middle of instruction execution.
pub trait Peripheral {
    fn read(&mut self, addr: u16) -> Result<u8, PeripheralFault>;
    fn write(&mut self, addr: u16, value: u8) -> Result<(), PeripheralFault>;
}

struct Binding {
    start: u16,
    end: u16,
    device: Box<dyn Peripheral>,
}

impl Binding {
    fn contains(&self, addr: u16) -> bool {
        addr >= self.start && addr <= self.end
    }

    fn overlaps(&self, start: u16, end: u16) -> bool {
        start <= self.end && end >= self.start
    }
}

/// 64 KiB RAM plus peripheral bindings.
pub struct MachineBus {
    ram: Box<[u8; RAM_SIZE]>,
    bindings: Vec<Binding>,
    /// Addresses below this base are rejected with `InvalidAddress`.
    /// Disabled by default.
    reserved_base: Option<u16>,
}

impl MachineBus {
    pub fn new() -> Self {
        Self {
            ram: Box::new([0; RAM_SIZE]),
            bindings: Vec::new(),
            reserved_base: None,
        }
    }

    pub fn with_reserved_base(reserved_base: Option<u16>) -> Self {
        Self {
            reserved_base,
            ..Self::new()
        }
    }

    /// Bind a peripheral to `[start, end]`. Ranges must be well-formed and
    /// must not overlap an existing binding.
    pub fn attach(
        &mut self,
        start: u16,
        end: u16,
        device: Box<dyn Peripheral>,
    ) -> Result<(), MachineError> {
        if start > end {
            return Err(MachineError::PeripheralRangeEmpty { start, end });
        }
        if let Some(existing) = self.bindings.iter().find(|b| b.overlaps(start, end)) {
            return Err(MachineError::PeripheralOverlap {
                new_start: start,
                new_end: end,
                old_start: existing.start,
                old_end: existing.end,
            });
        }
        log::debug!("peripheral bound to {start:#06x}..={end:#06x}");
        self.bindings.push(Binding { start, end, device });
        Ok(())
    }

    fn check_reserved(&self, addr: u16) -> Result<(), BusError> {
        match self.reserved_base {
            Some(base) if addr < base => Err(BusError::InvalidAddress { addr }),
            _ => Ok(()),
        }
    }

    /// Raw RAM view, bypassing peripherals. Debug/dump use only.
    pub fn ram(&self) -> &[u8] {
        &self.ram[..]
    }
}

impl Default for MachineBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MachineBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineBus")
            .field("peripherals", &self.bindings.len())
            .field("reserved_base", &self.reserved_base)
            .finish()
    }
}

impl Bus6502 for MachineBus {
    fn read(&mut self, addr: u16) -> Result<u8, BusError> {
        self.check_reserved(addr)?;
        for binding in &mut self.bindings {
            if binding.contains(addr) {
                return binding
                    .device
                    .read(addr)
                    .map_err(|PeripheralFault| BusError::PeripheralRead { addr });
            }
        }
        Ok(self.ram[addr as usize])
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        self.check_reserved(addr)?;
        for binding in &mut self.bindings {
            if binding.contains(addr) {
                return binding
                    .device
                    .write(addr, value)
                    .map_err(|PeripheralFault| BusError::PeripheralWrite { addr });
            }
        }
        self.ram[addr as usize] = value;
        Ok(())
    }
}
