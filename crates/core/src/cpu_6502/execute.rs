//! Per-instruction semantics, dispatched by exhaustive match over the
//! mnemonic so a missing behavior is a compile error rather than a runtime
//! fault.

use super::addressing::{self, Resolved};
use super::catalog::{AddrMode, Entry, Mnemonic, Variant};
use super::registers::{Flag, Registers, STATUS_BREAK, STATUS_UNUSED};
use super::{Bus6502, Control, Cpu6502, CpuError, StepOutcome};

impl<B: Bus6502> Cpu6502<B> {
    pub(crate) fn execute(&mut self, entry: Entry, arg: u16) -> Result<StepOutcome, CpuError> {
        let variant = entry.variant;
        let mut extra = false;
        let mut control = Control::Continue;

        match entry.instruction.mnemonic {
            // Loads and stores
            Mnemonic::Lda => {
                let m = self.operand(variant, arg, &mut extra)?;
                self.regs.a = m;
                self.regs.update_zero_negative(m);
            }
            Mnemonic::Ldx => {
                let m = self.operand(variant, arg, &mut extra)?;
                self.regs.x = m;
                self.regs.update_zero_negative(m);
            }
            Mnemonic::Ldy => {
                let m = self.operand(variant, arg, &mut extra)?;
                self.regs.y = m;
                self.regs.update_zero_negative(m);
            }
            Mnemonic::Sta => self.store(variant, arg, self.regs.a)?,
            Mnemonic::Stx => self.store(variant, arg, self.regs.x)?,
            Mnemonic::Sty => self.store(variant, arg, self.regs.y)?,

            // Arithmetic
            Mnemonic::Adc => {
                let m = self.operand(variant, arg, &mut extra)?;
                self.add_with_carry(m);
            }
            Mnemonic::Sbc => {
                // A - M - (1 - C) is A + !M + C with the same flag rules.
                let m = self.operand(variant, arg, &mut extra)?;
                self.add_with_carry(!m);
            }
            Mnemonic::Cmp => {
                let m = self.operand(variant, arg, &mut extra)?;
                self.compare(self.regs.a, m);
            }
            Mnemonic::Cpx => {
                let m = self.operand(variant, arg, &mut extra)?;
                self.compare(self.regs.x, m);
            }
            Mnemonic::Cpy => {
                let m = self.operand(variant, arg, &mut extra)?;
                self.compare(self.regs.y, m);
            }

            // Bitwise
            Mnemonic::And => {
                let m = self.operand(variant, arg, &mut extra)?;
                self.regs.a &= m;
                self.regs.update_zero_negative(self.regs.a);
            }
            Mnemonic::Ora => {
                let m = self.operand(variant, arg, &mut extra)?;
                self.regs.a |= m;
                self.regs.update_zero_negative(self.regs.a);
            }
            Mnemonic::Eor => {
                let m = self.operand(variant, arg, &mut extra)?;
                self.regs.a ^= m;
                self.regs.update_zero_negative(self.regs.a);
            }
            Mnemonic::Bit => {
                // Z from A & M, N and V straight from the operand's top bits.
                let m = self.operand(variant, arg, &mut extra)?;
                self.regs.set_flag_to(Flag::Zero, self.regs.a & m == 0);
                self.regs.set_flag_to(Flag::Negative, m & 0x80 != 0);
                self.regs.set_flag_to(Flag::Overflow, m & 0x40 != 0);
            }

            // Shifts and rotates
            Mnemonic::Asl => {
                let v = self.read_modify_write(variant, arg, |regs, old| {
                    regs.set_flag_to(Flag::Carry, old & 0x80 != 0);
                    old << 1
                })?;
                self.regs.update_zero_negative(v);
            }
            Mnemonic::Lsr => {
                let v = self.read_modify_write(variant, arg, |regs, old| {
                    regs.set_flag_to(Flag::Carry, old & 0x01 != 0);
                    old >> 1
                })?;
                self.regs.update_zero_negative(v);
            }
            Mnemonic::Rol => {
                let v = self.read_modify_write(variant, arg, |regs, old| {
                    let carry_in = regs.get_flag(Flag::Carry) as u8;
                    regs.set_flag_to(Flag::Carry, old & 0x80 != 0);
                    (old << 1) | carry_in
                })?;
                self.regs.update_zero_negative(v);
            }
            Mnemonic::Ror => {
                let v = self.read_modify_write(variant, arg, |regs, old| {
                    let carry_in = (regs.get_flag(Flag::Carry) as u8) << 7;
                    regs.set_flag_to(Flag::Carry, old & 0x01 != 0);
                    (old >> 1) | carry_in
                })?;
                self.regs.update_zero_negative(v);
            }

            // Increments and decrements
            Mnemonic::Inc => {
                let v = self.read_modify_write(variant, arg, |_, old| old.wrapping_add(1))?;
                self.regs.update_zero_negative(v);
            }
            Mnemonic::Dec => {
                let v = self.read_modify_write(variant, arg, |_, old| old.wrapping_sub(1))?;
                self.regs.update_zero_negative(v);
            }
            Mnemonic::Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.regs.update_zero_negative(self.regs.x);
            }
            Mnemonic::Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.regs.update_zero_negative(self.regs.y);
            }
            Mnemonic::Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.regs.update_zero_negative(self.regs.x);
            }
            Mnemonic::Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.regs.update_zero_negative(self.regs.y);
            }

            // Register transfers
            Mnemonic::Tax => {
                self.regs.x = self.regs.a;
                self.regs.update_zero_negative(self.regs.x);
            }
            Mnemonic::Tay => {
                self.regs.y = self.regs.a;
                self.regs.update_zero_negative(self.regs.y);
            }
            Mnemonic::Txa => {
                self.regs.a = self.regs.x;
                self.regs.update_zero_negative(self.regs.a);
            }
            Mnemonic::Tya => {
                self.regs.a = self.regs.y;
                self.regs.update_zero_negative(self.regs.a);
            }
            Mnemonic::Tsx => {
                self.regs.x = self.regs.sp;
                self.regs.update_zero_negative(self.regs.x);
            }
            // TXS is the one transfer that affects no flags.
            Mnemonic::Txs => self.regs.sp = self.regs.x,

            // Stack
            Mnemonic::Pha => self.push_u8(self.regs.a)?,
            Mnemonic::Php => {
                // The pushed copy always carries the break and unused bits.
                self.push_u8(self.regs.status | STATUS_BREAK | STATUS_UNUSED)?
            }
            Mnemonic::Pla => {
                let v = self.pop_u8()?;
                self.regs.a = v;
                self.regs.update_zero_negative(v);
            }
            Mnemonic::Plp => {
                let v = self.pop_u8()?;
                self.regs.status = (v | STATUS_UNUSED) & !STATUS_BREAK;
            }

            // Flag manipulation
            Mnemonic::Clc => self.regs.clear_flag(Flag::Carry),
            Mnemonic::Sec => self.regs.set_flag(Flag::Carry),
            Mnemonic::Cli => self.regs.clear_flag(Flag::InterruptDisable),
            Mnemonic::Sei => self.regs.set_flag(Flag::InterruptDisable),
            Mnemonic::Clv => self.regs.clear_flag(Flag::Overflow),
            // The decimal flag is tracked but never consulted: BCD arithmetic
            // is not implemented, ADC/SBC stay binary.
            Mnemonic::Cld => self.regs.clear_flag(Flag::Decimal),
            Mnemonic::Sed => self.regs.set_flag(Flag::Decimal),

            // Control flow
            Mnemonic::Jmp => {
                self.regs.pc = match variant.mode {
                    AddrMode::Absolute => arg,
                    _ => self.resolve(variant, arg)?.addr,
                };
            }
            Mnemonic::Jsr => {
                let ret = self.regs.pc.wrapping_sub(1);
                self.push_u16(ret)?;
                self.regs.pc = arg;
            }
            Mnemonic::Rts => {
                let ret = self.pop_u16()?;
                self.regs.pc = ret.wrapping_add(1);
            }
            Mnemonic::Rti => {
                let status = self.pop_u8()?;
                self.regs.status = (status | STATUS_UNUSED) & !STATUS_BREAK;
                self.regs.pc = self.pop_u16()?;
            }
            Mnemonic::Bcc => self.branch(arg, !self.regs.get_flag(Flag::Carry), &mut extra),
            Mnemonic::Bcs => self.branch(arg, self.regs.get_flag(Flag::Carry), &mut extra),
            Mnemonic::Bne => self.branch(arg, !self.regs.get_flag(Flag::Zero), &mut extra),
            Mnemonic::Beq => self.branch(arg, self.regs.get_flag(Flag::Zero), &mut extra),
            Mnemonic::Bpl => self.branch(arg, !self.regs.get_flag(Flag::Negative), &mut extra),
            Mnemonic::Bmi => self.branch(arg, self.regs.get_flag(Flag::Negative), &mut extra),
            Mnemonic::Bvc => self.branch(arg, !self.regs.get_flag(Flag::Overflow), &mut extra),
            Mnemonic::Bvs => self.branch(arg, self.regs.get_flag(Flag::Overflow), &mut extra),

            Mnemonic::Brk => {
                // BRK occupies two bytes; the padding byte is skipped on
                // return.
                let ret = self.regs.pc.wrapping_add(1);
                self.push_u16(ret)?;
                self.push_u8(self.regs.status | STATUS_BREAK | STATUS_UNUSED)?;
                self.regs.set_flag(Flag::InterruptDisable);
                control = Control::Break;
            }

            Mnemonic::Nop => {}
        }

        let mut cycles = variant.cycles as u32;
        if extra && variant.extra_cycle {
            cycles += 1;
        }
        Ok(StepOutcome { cycles, control })
    }

    fn resolve(&mut self, variant: &Variant, arg: u16) -> Result<Resolved, CpuError> {
        addressing::resolve(variant.mode, arg, &self.regs, &mut self.bus)
    }

    /// Fetch the instruction's input value: the operand itself for immediate
    /// mode, the accumulator for accumulator mode, a memory read otherwise.
    fn operand(&mut self, variant: &Variant, arg: u16, extra: &mut bool) -> Result<u8, CpuError> {
        match variant.mode {
            AddrMode::Immediate => Ok(arg as u8),
            AddrMode::Accumulator => Ok(self.regs.a),
            _ => {
                let resolved = self.resolve(variant, arg)?;
                if resolved.page_crossed {
                    *extra = true;
                }
                Ok(self.bus.read(resolved.addr)?)
            }
        }
    }

    fn store(&mut self, variant: &Variant, arg: u16, value: u8) -> Result<(), CpuError> {
        let resolved = self.resolve(variant, arg)?;
        self.bus.write(resolved.addr, value)?;
        Ok(())
    }

    /// Apply `f` to the accumulator or to the addressed memory cell,
    /// writing the result back where it came from.
    fn read_modify_write(
        &mut self,
        variant: &Variant,
        arg: u16,
        f: impl FnOnce(&mut Registers, u8) -> u8,
    ) -> Result<u8, CpuError> {
        if variant.mode == AddrMode::Accumulator {
            let a = self.regs.a;
            let v = f(&mut self.regs, a);
            self.regs.a = v;
            Ok(v)
        } else {
            let resolved = self.resolve(variant, arg)?;
            let old = self.bus.read(resolved.addr)?;
            let v = f(&mut self.regs, old);
            self.bus.write(resolved.addr, v)?;
            Ok(v)
        }
    }

    fn add_with_carry(&mut self, m: u8) {
        let a = self.regs.a;
        let carry_in = self.regs.get_flag(Flag::Carry) as u16;
        let sum = a as u16 + m as u16 + carry_in;
        let result = sum as u8;
        self.regs.set_flag_to(Flag::Carry, sum > 0xFF);
        // Signed overflow: both inputs share a sign the result lacks.
        self.regs
            .set_flag_to(Flag::Overflow, (!(a ^ m) & (a ^ result)) & 0x80 != 0);
        self.regs.a = result;
        self.regs.update_zero_negative(result);
    }

    /// Shared CMP/CPX/CPY: subtract without borrow, discard the result,
    /// keep the flags.
    fn compare(&mut self, reg: u8, m: u8) {
        let result = reg.wrapping_sub(m);
        self.regs.set_flag_to(Flag::Carry, reg >= m);
        self.regs.update_zero_negative(result);
    }

    fn branch(&mut self, arg: u16, taken: bool, extra: &mut bool) {
        if taken {
            let offset = arg as u8 as i8;
            self.regs.pc = self.regs.pc.wrapping_add(offset as u16);
            *extra = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Control, Cpu6502, RamBus};
    use super::*;

    fn run_program(program: &[u8]) -> Cpu6502<RamBus> {
        let mut bus = RamBus::new();
        bus.load_program(0x0600, program);
        let mut cpu = Cpu6502::new(bus).unwrap();
        cpu.reset(0x0600, 0xFF);
        loop {
            match cpu.step().unwrap() {
                StepOutcome {
                    control: Control::Break,
                    ..
                } => break,
                _ => {}
            }
        }
        cpu
    }

    #[test]
    fn adc_unsigned_carry_out() {
        // LDA #$FF; ADC #$01; BRK
        let cpu = run_program(&[0xA9, 0xFF, 0x69, 0x01, 0x00]);
        assert_eq!(cpu.regs.a, 0x00);
        assert!(cpu.regs.get_flag(Flag::Carry));
        assert!(cpu.regs.get_flag(Flag::Zero));
        assert!(!cpu.regs.get_flag(Flag::Overflow));
    }

    #[test]
    fn adc_signed_overflow() {
        // LDA #$7F; ADC #$01; BRK
        let cpu = run_program(&[0xA9, 0x7F, 0x69, 0x01, 0x00]);
        assert_eq!(cpu.regs.a, 0x80);
        assert!(!cpu.regs.get_flag(Flag::Carry));
        assert!(cpu.regs.get_flag(Flag::Overflow));
        assert!(cpu.regs.get_flag(Flag::Negative));
    }

    #[test]
    fn adc_negative_operands_overflow() {
        // LDA #$80; ADC #$FF -> 0x7F with carry out; two negatives made a
        // positive, so V is set.
        let cpu = run_program(&[0xA9, 0x80, 0x69, 0xFF, 0x00]);
        assert_eq!(cpu.regs.a, 0x7F);
        assert!(cpu.regs.get_flag(Flag::Carry));
        assert!(cpu.regs.get_flag(Flag::Overflow));
        assert!(!cpu.regs.get_flag(Flag::Negative));
    }

    #[test]
    fn sbc_is_adc_of_complement() {
        // SEC; LDA #$10; SBC #$03; BRK -> 0x0D, no borrow.
        let cpu = run_program(&[0x38, 0xA9, 0x10, 0xE9, 0x03, 0x00]);
        assert_eq!(cpu.regs.a, 0x0D);
        assert!(cpu.regs.get_flag(Flag::Carry));

        // CLC borrows one more: 0x10 - 0x03 - 1 = 0x0C.
        let cpu = run_program(&[0x18, 0xA9, 0x10, 0xE9, 0x03, 0x00]);
        assert_eq!(cpu.regs.a, 0x0C);
    }

    #[test]
    fn sbc_borrow_clears_carry() {
        // SEC; LDA #$03; SBC #$10 -> 0xF3 with borrow (carry clear).
        let cpu = run_program(&[0x38, 0xA9, 0x03, 0xE9, 0x10, 0x00]);
        assert_eq!(cpu.regs.a, 0xF3);
        assert!(!cpu.regs.get_flag(Flag::Carry));
        assert!(cpu.regs.get_flag(Flag::Negative));
    }

    #[test]
    fn adc_then_sbc_inverts() {
        // For a sample of operand pairs: ADC m then SEC+SBC m restores A.
        for (a, m) in [(0x00u8, 0x00u8), (0x12, 0x34), (0x7F, 0x01), (0xFF, 0xFF), (0x80, 0x7F)] {
            // CLC; LDA #a; ADC #m; SEC; SBC #m; BRK
            let cpu = run_program(&[0x18, 0xA9, a, 0x69, m, 0x38, 0xE9, m, 0x00]);
            assert_eq!(cpu.regs.a, a, "a={a:#04x} m={m:#04x}");
        }
    }

    #[test]
    fn cmp_sets_carry_zero_negative() {
        // LDA #$10; CMP #$10 -> equal: C and Z set.
        let cpu = run_program(&[0xA9, 0x10, 0xC9, 0x10, 0x00]);
        assert!(cpu.regs.get_flag(Flag::Carry));
        assert!(cpu.regs.get_flag(Flag::Zero));
        assert_eq!(cpu.regs.a, 0x10, "comparison must not clobber A");

        // LDA #$10; CMP #$20 -> less: C clear, N from 0xF0.
        let cpu = run_program(&[0xA9, 0x10, 0xC9, 0x20, 0x00]);
        assert!(!cpu.regs.get_flag(Flag::Carry));
        assert!(cpu.regs.get_flag(Flag::Negative));
    }

    #[test]
    fn cpx_cpy_compare_index_registers() {
        // LDX #$05; CPX #$03; BRK
        let cpu = run_program(&[0xA2, 0x05, 0xE0, 0x03, 0x00]);
        assert!(cpu.regs.get_flag(Flag::Carry));
        assert!(!cpu.regs.get_flag(Flag::Zero));

        // LDY #$01; CPY #$02; BRK
        let cpu = run_program(&[0xA0, 0x01, 0xC0, 0x02, 0x00]);
        assert!(!cpu.regs.get_flag(Flag::Carry));
    }

    #[test]
    fn asl_and_rol_move_bit7_through_carry() {
        // SEC; LDA #$81; ASL A -> 0x02, carry set from bit 7, carry-in lost.
        let cpu = run_program(&[0x38, 0xA9, 0x81, 0x0A, 0x00]);
        assert_eq!(cpu.regs.a, 0x02);
        assert!(cpu.regs.get_flag(Flag::Carry));

        // SEC; LDA #$81; ROL A -> 0x03, previous carry rotated into bit 0.
        let cpu = run_program(&[0x38, 0xA9, 0x81, 0x2A, 0x00]);
        assert_eq!(cpu.regs.a, 0x03);
        assert!(cpu.regs.get_flag(Flag::Carry));
    }

    #[test]
    fn lsr_and_ror_move_bit0_through_carry() {
        // LDA #$01; LSR A -> 0, carry set, zero set.
        let cpu = run_program(&[0xA9, 0x01, 0x4A, 0x00]);
        assert_eq!(cpu.regs.a, 0x00);
        assert!(cpu.regs.get_flag(Flag::Carry));
        assert!(cpu.regs.get_flag(Flag::Zero));

        // SEC; LDA #$02; ROR A -> 0x81: carry-in lands in bit 7.
        let cpu = run_program(&[0x38, 0xA9, 0x02, 0x6A, 0x00]);
        assert_eq!(cpu.regs.a, 0x81);
        assert!(!cpu.regs.get_flag(Flag::Carry));
        assert!(cpu.regs.get_flag(Flag::Negative));
    }

    #[test]
    fn shift_on_memory_writes_back() {
        // ASL $10; BRK
        let mut bus = RamBus::new();
        bus.load_program(0x0600, &[0x06, 0x10, 0x00]);
        bus.data[0x0010] = 0x40;
        let mut cpu = Cpu6502::new(bus).unwrap();
        cpu.reset(0x0600, 0xFF);
        cpu.step().unwrap();
        assert_eq!(cpu.bus.data[0x0010], 0x80);
        assert!(cpu.regs.get_flag(Flag::Negative));
    }

    #[test]
    fn bit_sets_flags_from_operand_bits() {
        // LDA #$01; BIT $10 where $10 = 0xC0: Z set (no common bits),
        // N from bit 7, V from bit 6.
        let mut bus = RamBus::new();
        bus.load_program(0x0600, &[0xA9, 0x01, 0x24, 0x10, 0x00]);
        bus.data[0x0010] = 0xC0;
        let mut cpu = Cpu6502::new(bus).unwrap();
        cpu.reset(0x0600, 0xFF);
        cpu.step().unwrap();
        cpu.step().unwrap();
        assert!(cpu.regs.get_flag(Flag::Zero));
        assert!(cpu.regs.get_flag(Flag::Negative));
        assert!(cpu.regs.get_flag(Flag::Overflow));
        assert_eq!(cpu.regs.a, 0x01);
    }

    #[test]
    fn inc_dec_wrap() {
        let mut bus = RamBus::new();
        bus.load_program(0x0600, &[0xE6, 0x10, 0xC6, 0x11, 0x00]); // INC $10; DEC $11
        bus.data[0x0010] = 0xFF;
        bus.data[0x0011] = 0x00;
        let mut cpu = Cpu6502::new(bus).unwrap();
        cpu.reset(0x0600, 0xFF);
        cpu.step().unwrap();
        assert!(cpu.regs.get_flag(Flag::Zero));
        cpu.step().unwrap();
        assert_eq!(cpu.bus.data[0x0010], 0x00);
        assert_eq!(cpu.bus.data[0x0011], 0xFF);
        assert!(cpu.regs.get_flag(Flag::Negative));
    }

    #[test]
    fn transfers_and_stack_ops() {
        // LDA #$80; TAX; TXS; PHA; PLA; BRK
        let cpu = run_program(&[0xA9, 0x80, 0xAA, 0x9A, 0x48, 0x68, 0x00]);
        assert_eq!(cpu.regs.x, 0x80);
        assert_eq!(cpu.regs.a, 0x80);
        assert!(cpu.regs.get_flag(Flag::Negative));
    }

    #[test]
    fn indirect_indexed_load_stores() {
        // Pointer at $10 -> $0700; LDA ($10),Y with Y=2 reads $0702.
        let mut bus = RamBus::new();
        bus.load_program(0x0600, &[0xA0, 0x02, 0xB1, 0x10, 0x00]); // LDY #$02; LDA ($10),Y
        bus.data[0x0010] = 0x00;
        bus.data[0x0011] = 0x07;
        bus.data[0x0702] = 0x99;
        let mut cpu = Cpu6502::new(bus).unwrap();
        cpu.reset(0x0600, 0xFF);
        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.regs.a, 0x99);
    }
}
