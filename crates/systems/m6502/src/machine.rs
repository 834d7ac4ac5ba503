//! The emulated machine: loader, run loop, and inspection helpers.

use serde::Serialize;
use serde_json::{json, Value};

use emu_core::{Bus6502, Control, Cpu6502, Registers};

use crate::bus::{MachineBus, Peripheral};
use crate::MachineError;

/// IRQ/BRK vector location.
const BRK_VECTOR: u16 = 0xFFFE;

/// Per-run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    /// Where programs load and execution starts.
    pub load_addr: u16,
    /// Initial stack pointer within the $0100 stack page.
    pub stack_base: u8,
    /// Stop once PC passes the last loaded byte.
    pub stop_on_end: bool,
    /// Instruction-count safeguard, checked at instruction boundaries only.
    pub step_limit: Option<u64>,
    /// Reject accesses below this address when set.
    pub reserved_base: Option<u16>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            load_addr: 0x0600,
            stack_base: 0xFF,
            stop_on_end: false,
            step_limit: None,
            reserved_base: None,
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// PC passed the end of the loaded program.
    EndOfProgram,
    /// BRK executed with no IRQ/BRK vector installed.
    Break,
    /// The step-count safeguard ran out.
    StepLimit,
}

/// Final machine state handed back to the caller for inspection.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RunSummary {
    pub registers: Registers,
    pub cycles: u64,
    pub reason: StopReason,
}

/// One emulated machine: CPU core plus RAM/peripheral bus. Each machine is
/// independent; running several concurrently means one `Machine` each.
pub struct Machine {
    cpu: Cpu6502<MachineBus>,
    settings: RunSettings,
    end_addr: Option<u16>,
}

impl Machine {
    pub fn new(settings: RunSettings) -> Result<Self, MachineError> {
        let bus = MachineBus::with_reserved_base(settings.reserved_base);
        let mut cpu = Cpu6502::new(bus)?;
        cpu.reset(settings.load_addr, settings.stack_base);
        Ok(Self {
            cpu,
            settings,
            end_addr: None,
        })
    }

    /// Bind a peripheral to an address range before the run begins.
    pub fn attach_peripheral(
        &mut self,
        start: u16,
        end: u16,
        device: Box<dyn Peripheral>,
    ) -> Result<(), MachineError> {
        self.cpu.bus.attach(start, end, device)
    }

    /// Write a program image through the bus starting at `addr` and record
    /// the end-of-program address for the stop condition.
    pub fn load(&mut self, addr: u16, data: &[u8]) -> Result<(), MachineError> {
        let end = addr as usize + data.len();
        if end > crate::bus::RAM_SIZE {
            return Err(MachineError::ProgramTooLarge {
                addr,
                len: data.len(),
            });
        }
        for (i, byte) in data.iter().enumerate() {
            self.cpu.bus.write(addr + i as u16, *byte)?;
        }
        self.end_addr = Some(addr.wrapping_add(data.len() as u16));
        log::info!("loaded {} bytes at {addr:#06x}", data.len());
        Ok(())
    }

    /// Load at the configured load address.
    pub fn load_program(&mut self, data: &[u8]) -> Result<(), MachineError> {
        self.load(self.settings.load_addr, data)
    }

    /// Reset the CPU and run until a stop condition or a fatal fault.
    pub fn run(&mut self) -> Result<RunSummary, MachineError> {
        self.cpu
            .reset(self.settings.load_addr, self.settings.stack_base);

        let mut steps: u64 = 0;
        let reason = loop {
            if self.settings.stop_on_end {
                if let Some(end) = self.end_addr {
                    if self.cpu.regs.pc >= end {
                        break StopReason::EndOfProgram;
                    }
                }
            }
            if let Some(limit) = self.settings.step_limit {
                if steps >= limit {
                    log::warn!("step limit of {limit} reached at {:#06x}", self.cpu.regs.pc);
                    break StopReason::StepLimit;
                }
            }

            let outcome = self.cpu.step()?;
            steps += 1;

            if outcome.control == Control::Continue {
                continue;
            }

            // BRK: the core pushed state; vector dispatch happens here. An
            // uninstalled vector (0x0000) halts the run.
            let vector = self.read_u16(BRK_VECTOR)?;
            if vector == 0 {
                break StopReason::Break;
            }
            log::debug!("break vector transfer to {vector:#06x}");
            self.cpu.regs.pc = vector;
        };

        Ok(RunSummary {
            registers: self.cpu.regs,
            cycles: self.cpu.cycles,
            reason,
        })
    }

    pub fn registers(&self) -> Registers {
        self.cpu.regs
    }

    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    /// Read an inclusive memory range through the bus (peripherals
    /// intercept). An empty range yields no bytes.
    pub fn memory_range(&mut self, start: u16, end: u16) -> Result<Vec<u8>, MachineError> {
        if start > end {
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(end.saturating_sub(start) as usize + 1);
        let mut addr = start;
        loop {
            out.push(self.cpu.bus.read(addr)?);
            if addr == end {
                break;
            }
            addr += 1;
        }
        Ok(out)
    }

    /// JSON snapshot of registers and cycle count for dump tooling.
    pub fn state_json(&self) -> Value {
        json!({
            "registers": self.cpu.regs,
            "cycles": self.cpu.cycles,
        })
    }

    fn read_u16(&mut self, addr: u16) -> Result<u16, MachineError> {
        let lo = self.cpu.bus.read(addr)?;
        let hi = self.cpu.bus.read(addr.wrapping_add(1))?;
        Ok(u16::from_le_bytes([lo, hi]))
    }
}
