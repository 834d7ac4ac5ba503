//! Core emulator primitives: the 6502 instruction catalog, register file,
//! address resolver, and execution engine.

pub mod cpu_6502;

pub use cpu_6502::catalog::{AddrMode, CatalogError, Mnemonic, Variant};
pub use cpu_6502::registers::{Flag, Registers};
pub use cpu_6502::{Bus6502, BusError, Control, Cpu6502, CpuError, StepOutcome};
