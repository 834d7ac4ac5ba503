//! MOS 6502 CPU core.
//!
//! A reusable, table-driven 6502 execution engine. Systems plug in memory by
//! implementing the [`Bus6502`] trait; the engine fetches, decodes against
//! the static instruction catalog, resolves the addressing mode, and applies
//! the instruction's semantics in a single synchronous step.

pub mod addressing;
pub mod catalog;
mod execute;
pub mod registers;

use thiserror::Error;

use catalog::{dispatch_map, AddrMode, CatalogError, DispatchMap};
use registers::Registers;

/// Memory interface for the 6502 CPU.
///
/// Reads take `&mut self` because bus implementations may route an access to
/// a peripheral with its own state. Both directions can fail; any failure is
/// fatal to the current run.
pub trait Bus6502 {
    fn read(&mut self, addr: u16) -> Result<u8, BusError>;
    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError>;
}

/// Memory/bus access failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    #[error("peripheral failed to read {addr:#06x}")]
    PeripheralRead { addr: u16 },
    #[error("peripheral failed to write {addr:#06x}")]
    PeripheralWrite { addr: u16 },
    #[error("access to reserved address {addr:#06x}")]
    InvalidAddress { addr: u16 },
}

/// Execution faults. All of these abort the current run; a CPU that has
/// decoded garbage has no safe way to continue.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CpuError {
    #[error("unknown opcode {opcode:#04x} at {pc:#06x}")]
    UnknownOpcode { opcode: u8, pc: u16 },
    #[error("no effective address for addressing mode {mode:?}")]
    InvalidAddressingMode { mode: AddrMode },
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Control-flow effect reported by one instruction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Fall through to the next instruction.
    Continue,
    /// BRK executed: return address and status are pushed, the interrupt
    /// disable flag is set. Vector dispatch is the machine's job.
    Break,
}

/// Result of executing one instruction to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    /// Cycles consumed, including any page-cross or taken-branch penalty.
    pub cycles: u32,
    pub control: Control,
}

const STACK_PAGE: u16 = 0x0100;

/// MOS 6502 CPU state and execution engine.
///
/// Generic over the memory bus, in the same way every system supplies its
/// own memory map to a shared core.
pub struct Cpu6502<B: Bus6502> {
    pub regs: Registers,
    /// Total cycles executed
    pub cycles: u64,
    /// Memory interface
    pub bus: B,
    dispatch: &'static DispatchMap,
}

impl<B: Bus6502> Cpu6502<B> {
    /// Create a new CPU around the given bus. Fails only if the instruction
    /// catalog cannot be built (duplicate opcode assignment).
    pub fn new(bus: B) -> Result<Self, CatalogError> {
        Ok(Self {
            regs: Registers::new(),
            cycles: 0,
            bus,
            dispatch: dispatch_map()?,
        })
    }

    /// Reset registers to the power-on state (memory is preserved).
    pub fn reset(&mut self, load_addr: u16, stack_base: u8) {
        self.regs.reset(load_addr, stack_base);
        self.cycles = 0;
    }

    #[inline]
    fn fetch_u8(&mut self) -> Result<u8, CpuError> {
        let v = self.bus.read(self.regs.pc)?;
        self.regs.pc = self.regs.pc.wrapping_add(1);
        Ok(v)
    }

    #[inline]
    fn fetch_u16(&mut self) -> Result<u16, CpuError> {
        let lo = self.fetch_u8()?;
        let hi = self.fetch_u8()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    #[inline]
    pub(crate) fn push_u8(&mut self, value: u8) -> Result<(), CpuError> {
        self.bus
            .write(STACK_PAGE.wrapping_add(self.regs.sp as u16), value)?;
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        Ok(())
    }

    #[inline]
    pub(crate) fn pop_u8(&mut self) -> Result<u8, CpuError> {
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let v = self.bus.read(STACK_PAGE.wrapping_add(self.regs.sp as u16))?;
        Ok(v)
    }

    #[inline]
    pub(crate) fn push_u16(&mut self, value: u16) -> Result<(), CpuError> {
        let [lo, hi] = value.to_le_bytes();
        self.push_u8(hi)?;
        self.push_u8(lo)
    }

    #[inline]
    pub(crate) fn pop_u16(&mut self) -> Result<u16, CpuError> {
        let lo = self.pop_u8()?;
        let hi = self.pop_u8()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    /// Execute one instruction and report its cycle cost and control effect.
    ///
    /// Fetches the opcode at PC, decodes it against the dispatch map, fetches
    /// the variant's operand bytes little-endian, resolves the effective
    /// address when the mode has one, and applies the instruction semantics.
    pub fn step(&mut self) -> Result<StepOutcome, CpuError> {
        let pc = self.regs.pc;
        let opcode = self.fetch_u8()?;
        let entry = self
            .dispatch
            .lookup(opcode)
            .ok_or(CpuError::UnknownOpcode { opcode, pc })?;

        let arg = match entry.variant.length {
            2 => self.fetch_u8()? as u16,
            3 => self.fetch_u16()?,
            _ => 0,
        };

        let outcome = self.execute(entry, arg)?;
        self.cycles = self.cycles.wrapping_add(outcome.cycles as u64);
        Ok(outcome)
    }
}

/// Flat 64 KiB RAM bus for tests and benchmarks.
pub struct RamBus {
    pub data: [u8; 0x10000],
}

impl RamBus {
    pub fn new() -> Self {
        Self { data: [0; 0x10000] }
    }

    /// Copy a program image into RAM at the given offset.
    pub fn load_program(&mut self, offset: u16, data: &[u8]) {
        let off = offset as usize;
        self.data[off..off + data.len()].copy_from_slice(data);
    }
}

impl Default for RamBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus6502 for RamBus {
    fn read(&mut self, addr: u16) -> Result<u8, BusError> {
        Ok(self.data[addr as usize])
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<(), BusError> {
        self.data[addr as usize] = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::registers::Flag;
    use super::*;

    fn cpu_with(offset: u16, program: &[u8]) -> Cpu6502<RamBus> {
        let mut bus = RamBus::new();
        bus.load_program(offset, program);
        let mut cpu = Cpu6502::new(bus).unwrap();
        cpu.reset(offset, 0xFF);
        cpu
    }

    #[test]
    fn lda_immediate_sets_a_and_flags() {
        let mut cpu = cpu_with(0x0600, &[0xA9, 0x05, 0xEA]);
        let out = cpu.step().unwrap();
        assert_eq!(out.cycles, 2);
        assert_eq!(out.control, Control::Continue);
        assert_eq!(cpu.regs.a, 5);
        assert!(!cpu.regs.get_flag(Flag::Zero));
        let out = cpu.step().unwrap();
        assert_eq!(out.cycles, 2);
    }

    #[test]
    fn lda_zero_sets_zero_flag() {
        let mut cpu = cpu_with(0x0600, &[0xA9, 0x00]);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.a, 0);
        assert!(cpu.regs.get_flag(Flag::Zero));
    }

    #[test]
    fn unknown_opcode_is_fatal() {
        let mut cpu = cpu_with(0x0600, &[0x02]);
        let err = cpu.step().unwrap_err();
        assert_eq!(
            err,
            CpuError::UnknownOpcode {
                opcode: 0x02,
                pc: 0x0600
            }
        );
    }

    #[test]
    fn absolute_x_page_cross_charges_extra_cycle() {
        // LDA $00FF,X with X=1 crosses into page 1.
        let mut cpu = cpu_with(0x0600, &[0xBD, 0xFF, 0x00]);
        cpu.regs.x = 1;
        cpu.bus.data[0x0100] = 0x42;
        let out = cpu.step().unwrap();
        assert_eq!(out.cycles, 5);
        assert_eq!(cpu.regs.a, 0x42);

        // Same instruction without the crossing stays at the base cost.
        let mut cpu = cpu_with(0x0600, &[0xBD, 0x10, 0x00]);
        cpu.regs.x = 1;
        cpu.bus.data[0x0011] = 0x24;
        let out = cpu.step().unwrap();
        assert_eq!(out.cycles, 4);
        assert_eq!(cpu.regs.a, 0x24);
    }

    #[test]
    fn sta_absolute_x_never_charges_extra_cycle() {
        let mut cpu = cpu_with(0x0600, &[0x9D, 0xFF, 0x00]);
        cpu.regs.a = 0x55;
        cpu.regs.x = 1;
        let out = cpu.step().unwrap();
        assert_eq!(out.cycles, 5);
        assert_eq!(cpu.bus.data[0x0100], 0x55);
    }

    #[test]
    fn jmp_indirect_replicates_page_wrap_bug() {
        let mut cpu = cpu_with(0x0600, &[0x6C, 0xFF, 0x02]);
        cpu.bus.data[0x02FF] = 0x34;
        cpu.bus.data[0x0200] = 0x12;
        cpu.bus.data[0x0300] = 0xEE;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x1234);
    }

    #[test]
    fn taken_branch_costs_one_more_cycle() {
        // BNE +2 with Z clear: taken.
        let mut cpu = cpu_with(0x0600, &[0xD0, 0x02]);
        cpu.regs.clear_flag(Flag::Zero);
        let out = cpu.step().unwrap();
        assert_eq!(out.cycles, 3);
        assert_eq!(cpu.regs.pc, 0x0604);

        // Same branch with Z set: fall through at base cost.
        let mut cpu = cpu_with(0x0600, &[0xD0, 0x02]);
        cpu.regs.set_flag(Flag::Zero);
        let out = cpu.step().unwrap();
        assert_eq!(out.cycles, 2);
        assert_eq!(cpu.regs.pc, 0x0602);
    }

    #[test]
    fn backward_branch_wraps_through_pc_arithmetic() {
        let mut cpu = cpu_with(0x0600, &[0xD0, 0xFC]); // BNE -4
        cpu.regs.clear_flag(Flag::Zero);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x05FE);
    }

    #[test]
    fn jsr_rts_round_trip() {
        let mut cpu = cpu_with(0x0600, &[0x20, 0x00, 0x07]); // JSR $0700
        cpu.bus.data[0x0700] = 0x60; // RTS
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x0700);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x0603);
    }

    #[test]
    fn brk_pushes_state_and_signals_break() {
        let mut cpu = cpu_with(0x0600, &[0x00]);
        cpu.regs.set_flag(Flag::Carry);
        let sp_before = cpu.regs.sp;
        let out = cpu.step().unwrap();
        assert_eq!(out.control, Control::Break);
        assert_eq!(out.cycles, 7);
        assert!(cpu.regs.get_flag(Flag::InterruptDisable));
        assert_eq!(cpu.regs.sp, sp_before.wrapping_sub(3));

        // Return address skips BRK's padding byte; pushed status carries the
        // break and unused bits.
        let stack = &cpu.bus.data;
        let base = STACK_PAGE as usize;
        let pushed_status = stack[base + sp_before as usize - 2];
        let ret_lo = stack[base + sp_before as usize - 1];
        let ret_hi = stack[base + sp_before as usize];
        assert_eq!(u16::from_le_bytes([ret_lo, ret_hi]), 0x0602);
        assert_eq!(pushed_status & 0x30, 0x30);
        assert_eq!(pushed_status & 0x01, 0x01);
    }

    #[test]
    fn php_plp_round_trip_masks_break_bit() {
        let mut cpu = cpu_with(0x0600, &[0x08, 0x28]); // PHP; PLP
        cpu.regs.set_flag(Flag::Carry);
        cpu.regs.set_flag(Flag::Negative);
        let status_before = cpu.regs.status;
        cpu.step().unwrap();
        cpu.regs.status = 0;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.status, status_before | 0x20);
        assert_eq!(cpu.regs.status & 0x10, 0);
    }

    #[test]
    fn end_to_end_store_and_add() {
        // LDA #$05; STA $10; LDA $10; ADC #$03; BRK
        let program = [0xA9, 0x05, 0x85, 0x10, 0xA5, 0x10, 0x69, 0x03, 0x00];
        let mut cpu = cpu_with(0x0600, &program);
        loop {
            let out = cpu.step().unwrap();
            if out.control == Control::Break {
                break;
            }
        }
        assert_eq!(cpu.regs.a, 8);
        assert!(!cpu.regs.get_flag(Flag::Zero));
        assert!(!cpu.regs.get_flag(Flag::Negative));
        assert!(!cpu.regs.get_flag(Flag::Carry));
        assert_eq!(cpu.bus.data[0x0010], 0x05);
    }
}
