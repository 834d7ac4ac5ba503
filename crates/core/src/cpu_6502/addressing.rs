//! Effective-address resolution for the memory addressing modes.

use super::catalog::AddrMode;
use super::registers::Registers;
use super::{Bus6502, CpuError};

/// A resolved effective address. `page_crossed` reports the extra-cycle
/// signal for indexed modes; whether it is charged depends on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub addr: u16,
    pub page_crossed: bool,
}

fn indexed(base: u16, index: u8) -> Resolved {
    let addr = base.wrapping_add(index as u16);
    Resolved {
        addr,
        page_crossed: (base & 0xFF00) != (addr & 0xFF00),
    }
}

fn zero_page_pointer<B: Bus6502>(bus: &mut B, zp: u8) -> Result<u16, CpuError> {
    let lo = bus.read(zp as u16)?;
    let hi = bus.read(zp.wrapping_add(1) as u16)?;
    Ok(u16::from_le_bytes([lo, hi]))
}

/// Compute the effective address for `mode` given the raw operand `arg`.
///
/// Modes that carry no effective address (immediate, accumulator, implied,
/// stack, register, branch, status) are a catalog/engine inconsistency here
/// and fail with [`CpuError::InvalidAddressingMode`].
pub fn resolve<B: Bus6502>(
    mode: AddrMode,
    arg: u16,
    regs: &Registers,
    bus: &mut B,
) -> Result<Resolved, CpuError> {
    let resolved = match mode {
        AddrMode::ZeroPage => Resolved {
            addr: arg & 0x00FF,
            page_crossed: false,
        },
        // Indexed zero-page access wraps within the zero page.
        AddrMode::ZeroPageX => Resolved {
            addr: (arg as u8).wrapping_add(regs.x) as u16,
            page_crossed: false,
        },
        AddrMode::ZeroPageY => Resolved {
            addr: (arg as u8).wrapping_add(regs.y) as u16,
            page_crossed: false,
        },
        AddrMode::Absolute => Resolved {
            addr: arg,
            page_crossed: false,
        },
        AddrMode::AbsoluteX => indexed(arg, regs.x),
        AddrMode::AbsoluteY => indexed(arg, regs.y),
        AddrMode::Indirect => {
            // The NMOS 6502 never carries into the pointer's high byte: a
            // pointer at $xxFF reads its high byte from $xx00.
            let lo = bus.read(arg)?;
            let hi_addr = (arg & 0xFF00) | (arg.wrapping_add(1) & 0x00FF);
            let hi = bus.read(hi_addr)?;
            Resolved {
                addr: u16::from_le_bytes([lo, hi]),
                page_crossed: false,
            }
        }
        AddrMode::IndirectX => {
            let zp = (arg as u8).wrapping_add(regs.x);
            Resolved {
                addr: zero_page_pointer(bus, zp)?,
                page_crossed: false,
            }
        }
        AddrMode::IndirectY => {
            let base = zero_page_pointer(bus, arg as u8)?;
            indexed(base, regs.y)
        }
        mode => return Err(CpuError::InvalidAddressingMode { mode }),
    };
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::super::RamBus;
    use super::*;

    fn regs_with(x: u8, y: u8) -> Registers {
        let mut regs = Registers::new();
        regs.x = x;
        regs.y = y;
        regs
    }

    #[test]
    fn zero_page_x_wraps_within_page() {
        let mut bus = RamBus::new();
        let regs = regs_with(2, 0);
        let r = resolve(AddrMode::ZeroPageX, 0x00FF, &regs, &mut bus).unwrap();
        assert_eq!(r.addr, 0x0001);
        assert!(!r.page_crossed);
    }

    #[test]
    fn absolute_x_signals_page_cross() {
        let mut bus = RamBus::new();
        let regs = regs_with(1, 0);
        let crossed = resolve(AddrMode::AbsoluteX, 0x00FF, &regs, &mut bus).unwrap();
        assert_eq!(crossed.addr, 0x0100);
        assert!(crossed.page_crossed);

        let stayed = resolve(AddrMode::AbsoluteX, 0x0010, &regs, &mut bus).unwrap();
        assert_eq!(stayed.addr, 0x0011);
        assert!(!stayed.page_crossed);
    }

    #[test]
    fn indirect_high_byte_wraps_within_page() {
        let mut bus = RamBus::new();
        bus.data[0x02FF] = 0x34;
        bus.data[0x0200] = 0x12;
        bus.data[0x0300] = 0xEE; // must not be used
        let regs = Registers::new();
        let r = resolve(AddrMode::Indirect, 0x02FF, &regs, &mut bus).unwrap();
        assert_eq!(r.addr, 0x1234);
    }

    #[test]
    fn indirect_x_reads_pointer_from_wrapped_zero_page() {
        let mut bus = RamBus::new();
        bus.data[0x0001] = 0xCD;
        bus.data[0x0002] = 0xAB;
        let regs = regs_with(2, 0);
        let r = resolve(AddrMode::IndirectX, 0x00FF, &regs, &mut bus).unwrap();
        assert_eq!(r.addr, 0xABCD);
    }

    #[test]
    fn indirect_y_adds_y_after_pointer_fetch() {
        let mut bus = RamBus::new();
        bus.data[0x0010] = 0xFF;
        bus.data[0x0011] = 0x00;
        let regs = regs_with(0, 0x01);
        let r = resolve(AddrMode::IndirectY, 0x0010, &regs, &mut bus).unwrap();
        assert_eq!(r.addr, 0x0100);
        assert!(r.page_crossed);
    }

    #[test]
    fn modes_without_addresses_are_rejected() {
        let mut bus = RamBus::new();
        let regs = Registers::new();
        let err = resolve(AddrMode::Immediate, 0x42, &regs, &mut bus).unwrap_err();
        assert_eq!(
            err,
            CpuError::InvalidAddressingMode {
                mode: AddrMode::Immediate
            }
        );
    }
}
