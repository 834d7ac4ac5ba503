//! Generic 6502 machine: 64 KiB RAM bus with peripheral bindings, program
//! loader, and the run loop driving the shared CPU core.

mod bus;
mod machine;

pub use bus::{MachineBus, Peripheral, PeripheralFault, RAM_SIZE};
pub use machine::{Machine, RunSettings, RunSummary, StopReason};

use emu_core::{BusError, CatalogError, CpuError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MachineError {
    #[error("instruction catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("cpu fault: {0}")]
    Cpu(#[from] CpuError),
    #[error("bus fault: {0}")]
    Bus(#[from] BusError),
    #[error(
        "peripheral range {new_start:#06x}..={new_end:#06x} overlaps \
         {old_start:#06x}..={old_end:#06x}"
    )]
    PeripheralOverlap {
        new_start: u16,
        new_end: u16,
        old_start: u16,
        old_end: u16,
    },
    #[error("peripheral range start {start:#06x} is above its end {end:#06x}")]
    PeripheralRangeEmpty { start: u16, end: u16 },
    #[error("{len} bytes at {addr:#06x} run past the end of memory")]
    ProgramTooLarge { addr: u16, len: usize },
}
