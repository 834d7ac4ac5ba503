//! Static catalog of the documented 6502 instruction set.
//!
//! Every instruction carries its variant list (opcode byte, addressing mode,
//! total length in bytes, base cycle count); the dense 256-slot dispatch map
//! is built from it once per process and verified for duplicate opcode
//! assignments at build time.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use thiserror::Error;

/// Addressing-mode tag carried by each opcode variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrMode {
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
    Immediate,
    Accumulator,
    Branch,
    Implied,
    Stack,
    Register,
    Status,
}

impl AddrMode {
    /// True when the mode produces an effective memory address.
    pub fn has_address(self) -> bool {
        matches!(
            self,
            AddrMode::ZeroPage
                | AddrMode::ZeroPageX
                | AddrMode::ZeroPageY
                | AddrMode::Absolute
                | AddrMode::AbsoluteX
                | AddrMode::AbsoluteY
                | AddrMode::Indirect
                | AddrMode::IndirectX
                | AddrMode::IndirectY
        )
    }
}

/// The documented 6502 instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
}

impl Mnemonic {
    /// Canonical 3-character uppercase name.
    pub fn name(self) -> &'static str {
        match self {
            Mnemonic::Adc => "ADC", Mnemonic::And => "AND", Mnemonic::Asl => "ASL",
            Mnemonic::Bcc => "BCC", Mnemonic::Bcs => "BCS", Mnemonic::Beq => "BEQ",
            Mnemonic::Bit => "BIT", Mnemonic::Bmi => "BMI", Mnemonic::Bne => "BNE",
            Mnemonic::Bpl => "BPL", Mnemonic::Brk => "BRK", Mnemonic::Bvc => "BVC",
            Mnemonic::Bvs => "BVS", Mnemonic::Clc => "CLC", Mnemonic::Cld => "CLD",
            Mnemonic::Cli => "CLI", Mnemonic::Clv => "CLV", Mnemonic::Cmp => "CMP",
            Mnemonic::Cpx => "CPX", Mnemonic::Cpy => "CPY", Mnemonic::Dec => "DEC",
            Mnemonic::Dex => "DEX", Mnemonic::Dey => "DEY", Mnemonic::Eor => "EOR",
            Mnemonic::Inc => "INC", Mnemonic::Inx => "INX", Mnemonic::Iny => "INY",
            Mnemonic::Jmp => "JMP", Mnemonic::Jsr => "JSR", Mnemonic::Lda => "LDA",
            Mnemonic::Ldx => "LDX", Mnemonic::Ldy => "LDY", Mnemonic::Lsr => "LSR",
            Mnemonic::Nop => "NOP", Mnemonic::Ora => "ORA", Mnemonic::Pha => "PHA",
            Mnemonic::Php => "PHP", Mnemonic::Pla => "PLA", Mnemonic::Plp => "PLP",
            Mnemonic::Rol => "ROL", Mnemonic::Ror => "ROR", Mnemonic::Rti => "RTI",
            Mnemonic::Rts => "RTS", Mnemonic::Sbc => "SBC", Mnemonic::Sec => "SEC",
            Mnemonic::Sed => "SED", Mnemonic::Sei => "SEI", Mnemonic::Sta => "STA",
            Mnemonic::Stx => "STX", Mnemonic::Sty => "STY", Mnemonic::Tax => "TAX",
            Mnemonic::Tay => "TAY", Mnemonic::Tsx => "TSX", Mnemonic::Txa => "TXA",
            Mnemonic::Txs => "TXS", Mnemonic::Tya => "TYA",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mnemonic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        INSTRUCTIONS
            .iter()
            .map(|i| i.mnemonic)
            .find(|m| m.name() == upper)
            .ok_or(())
    }
}

/// One opcode assignment of an instruction.
///
/// `length` counts the opcode byte plus operand bytes (1-3); `cycles` is the
/// base cost before any page-cross or taken-branch penalty. `extra_cycle`
/// marks the variants that pay such a penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
    pub opcode: u8,
    pub cycles: u8,
    pub length: u8,
    pub mode: AddrMode,
    pub extra_cycle: bool,
}

/// An instruction and its opcode variants.
#[derive(Debug, PartialEq, Eq)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub variants: &'static [Variant],
}

const fn v(opcode: u8, cycles: u8, length: u8, mode: AddrMode) -> Variant {
    Variant { opcode, cycles, length, mode, extra_cycle: false }
}

/// Variant that costs one more cycle when the address resolution crosses a
/// page boundary (or, for branches, when the branch is taken).
const fn vx(opcode: u8, cycles: u8, length: u8, mode: AddrMode) -> Variant {
    Variant { opcode, cycles, length, mode, extra_cycle: true }
}

const fn instr(mnemonic: Mnemonic, variants: &'static [Variant]) -> Instruction {
    Instruction { mnemonic, variants }
}

use AddrMode::*;

/// All 151 documented opcodes.
pub static INSTRUCTIONS: &[Instruction] = &[
    instr(Mnemonic::Adc, &[
        v(0x69, 2, 2, Immediate),
        v(0x65, 3, 2, ZeroPage),
        v(0x75, 4, 2, ZeroPageX),
        v(0x6D, 4, 3, Absolute),
        vx(0x7D, 4, 3, AbsoluteX),
        vx(0x79, 4, 3, AbsoluteY),
        v(0x61, 6, 2, IndirectX),
        vx(0x71, 5, 2, IndirectY),
    ]),
    instr(Mnemonic::And, &[
        v(0x29, 2, 2, Immediate),
        v(0x25, 3, 2, ZeroPage),
        v(0x35, 4, 2, ZeroPageX),
        v(0x2D, 4, 3, Absolute),
        vx(0x3D, 4, 3, AbsoluteX),
        vx(0x39, 4, 3, AbsoluteY),
        v(0x21, 6, 2, IndirectX),
        vx(0x31, 5, 2, IndirectY),
    ]),
    instr(Mnemonic::Asl, &[
        v(0x0A, 2, 1, Accumulator),
        v(0x06, 5, 2, ZeroPage),
        v(0x16, 6, 2, ZeroPageX),
        v(0x0E, 6, 3, Absolute),
        v(0x1E, 7, 3, AbsoluteX),
    ]),
    instr(Mnemonic::Bcc, &[vx(0x90, 2, 2, Branch)]),
    instr(Mnemonic::Bcs, &[vx(0xB0, 2, 2, Branch)]),
    instr(Mnemonic::Beq, &[vx(0xF0, 2, 2, Branch)]),
    instr(Mnemonic::Bit, &[
        v(0x24, 3, 2, ZeroPage),
        v(0x2C, 4, 3, Absolute),
    ]),
    instr(Mnemonic::Bmi, &[vx(0x30, 2, 2, Branch)]),
    instr(Mnemonic::Bne, &[vx(0xD0, 2, 2, Branch)]),
    instr(Mnemonic::Bpl, &[vx(0x10, 2, 2, Branch)]),
    instr(Mnemonic::Brk, &[v(0x00, 7, 1, Implied)]),
    instr(Mnemonic::Bvc, &[vx(0x50, 2, 2, Branch)]),
    instr(Mnemonic::Bvs, &[vx(0x70, 2, 2, Branch)]),
    instr(Mnemonic::Clc, &[v(0x18, 2, 1, Status)]),
    instr(Mnemonic::Cld, &[v(0xD8, 2, 1, Status)]),
    instr(Mnemonic::Cli, &[v(0x58, 2, 1, Status)]),
    instr(Mnemonic::Clv, &[v(0xB8, 2, 1, Status)]),
    instr(Mnemonic::Cmp, &[
        v(0xC9, 2, 2, Immediate),
        v(0xC5, 3, 2, ZeroPage),
        v(0xD5, 4, 2, ZeroPageX),
        v(0xCD, 4, 3, Absolute),
        vx(0xDD, 4, 3, AbsoluteX),
        vx(0xD9, 4, 3, AbsoluteY),
        v(0xC1, 6, 2, IndirectX),
        vx(0xD1, 5, 2, IndirectY),
    ]),
    instr(Mnemonic::Cpx, &[
        v(0xE0, 2, 2, Immediate),
        v(0xE4, 3, 2, ZeroPage),
        v(0xEC, 4, 3, Absolute),
    ]),
    instr(Mnemonic::Cpy, &[
        v(0xC0, 2, 2, Immediate),
        v(0xC4, 3, 2, ZeroPage),
        v(0xCC, 4, 3, Absolute),
    ]),
    instr(Mnemonic::Dec, &[
        v(0xC6, 5, 2, ZeroPage),
        v(0xD6, 6, 2, ZeroPageX),
        v(0xCE, 6, 3, Absolute),
        v(0xDE, 7, 3, AbsoluteX),
    ]),
    instr(Mnemonic::Dex, &[v(0xCA, 2, 1, Register)]),
    instr(Mnemonic::Dey, &[v(0x88, 2, 1, Register)]),
    instr(Mnemonic::Eor, &[
        v(0x49, 2, 2, Immediate),
        v(0x45, 3, 2, ZeroPage),
        v(0x55, 4, 2, ZeroPageX),
        v(0x4D, 4, 3, Absolute),
        vx(0x5D, 4, 3, AbsoluteX),
        vx(0x59, 4, 3, AbsoluteY),
        v(0x41, 6, 2, IndirectX),
        vx(0x51, 5, 2, IndirectY),
    ]),
    instr(Mnemonic::Inc, &[
        v(0xE6, 5, 2, ZeroPage),
        v(0xF6, 6, 2, ZeroPageX),
        v(0xEE, 6, 3, Absolute),
        v(0xFE, 7, 3, AbsoluteX),
    ]),
    instr(Mnemonic::Inx, &[v(0xE8, 2, 1, Register)]),
    instr(Mnemonic::Iny, &[v(0xC8, 2, 1, Register)]),
    instr(Mnemonic::Jmp, &[
        v(0x4C, 3, 3, Absolute),
        v(0x6C, 5, 3, Indirect),
    ]),
    instr(Mnemonic::Jsr, &[v(0x20, 6, 3, Absolute)]),
    instr(Mnemonic::Lda, &[
        v(0xA9, 2, 2, Immediate),
        v(0xA5, 3, 2, ZeroPage),
        v(0xB5, 4, 2, ZeroPageX),
        v(0xAD, 4, 3, Absolute),
        vx(0xBD, 4, 3, AbsoluteX),
        vx(0xB9, 4, 3, AbsoluteY),
        v(0xA1, 6, 2, IndirectX),
        vx(0xB1, 5, 2, IndirectY),
    ]),
    instr(Mnemonic::Ldx, &[
        v(0xA2, 2, 2, Immediate),
        v(0xA6, 3, 2, ZeroPage),
        v(0xB6, 4, 2, ZeroPageY),
        v(0xAE, 4, 3, Absolute),
        vx(0xBE, 4, 3, AbsoluteY),
    ]),
    instr(Mnemonic::Ldy, &[
        v(0xA0, 2, 2, Immediate),
        v(0xA4, 3, 2, ZeroPage),
        v(0xB4, 4, 2, ZeroPageX),
        v(0xAC, 4, 3, Absolute),
        vx(0xBC, 4, 3, AbsoluteX),
    ]),
    instr(Mnemonic::Lsr, &[
        v(0x4A, 2, 1, Accumulator),
        v(0x46, 5, 2, ZeroPage),
        v(0x56, 6, 2, ZeroPageX),
        v(0x4E, 6, 3, Absolute),
        v(0x5E, 7, 3, AbsoluteX),
    ]),
    instr(Mnemonic::Nop, &[v(0xEA, 2, 1, Implied)]),
    instr(Mnemonic::Ora, &[
        v(0x09, 2, 2, Immediate),
        v(0x05, 3, 2, ZeroPage),
        v(0x15, 4, 2, ZeroPageX),
        v(0x0D, 4, 3, Absolute),
        vx(0x1D, 4, 3, AbsoluteX),
        vx(0x19, 4, 3, AbsoluteY),
        v(0x01, 6, 2, IndirectX),
        vx(0x11, 5, 2, IndirectY),
    ]),
    instr(Mnemonic::Pha, &[v(0x48, 3, 1, Stack)]),
    instr(Mnemonic::Php, &[v(0x08, 3, 1, Stack)]),
    instr(Mnemonic::Pla, &[v(0x68, 4, 1, Stack)]),
    instr(Mnemonic::Plp, &[v(0x28, 4, 1, Stack)]),
    instr(Mnemonic::Rol, &[
        v(0x2A, 2, 1, Accumulator),
        v(0x26, 5, 2, ZeroPage),
        v(0x36, 6, 2, ZeroPageX),
        v(0x2E, 6, 3, Absolute),
        v(0x3E, 7, 3, AbsoluteX),
    ]),
    instr(Mnemonic::Ror, &[
        v(0x6A, 2, 1, Accumulator),
        v(0x66, 5, 2, ZeroPage),
        v(0x76, 6, 2, ZeroPageX),
        v(0x6E, 6, 3, Absolute),
        v(0x7E, 7, 3, AbsoluteX),
    ]),
    instr(Mnemonic::Rti, &[v(0x40, 6, 1, Stack)]),
    instr(Mnemonic::Rts, &[v(0x60, 6, 1, Stack)]),
    instr(Mnemonic::Sbc, &[
        v(0xE9, 2, 2, Immediate),
        v(0xE5, 3, 2, ZeroPage),
        v(0xF5, 4, 2, ZeroPageX),
        v(0xED, 4, 3, Absolute),
        vx(0xFD, 4, 3, AbsoluteX),
        vx(0xF9, 4, 3, AbsoluteY),
        v(0xE1, 6, 2, IndirectX),
        vx(0xF1, 5, 2, IndirectY),
    ]),
    instr(Mnemonic::Sec, &[v(0x38, 2, 1, Status)]),
    instr(Mnemonic::Sed, &[v(0xF8, 2, 1, Status)]),
    instr(Mnemonic::Sei, &[v(0x78, 2, 1, Status)]),
    instr(Mnemonic::Sta, &[
        v(0x85, 3, 2, ZeroPage),
        v(0x95, 4, 2, ZeroPageX),
        v(0x8D, 4, 3, Absolute),
        v(0x9D, 5, 3, AbsoluteX),
        v(0x99, 5, 3, AbsoluteY),
        v(0x81, 6, 2, IndirectX),
        v(0x91, 6, 2, IndirectY),
    ]),
    instr(Mnemonic::Stx, &[
        v(0x86, 3, 2, ZeroPage),
        v(0x96, 4, 2, ZeroPageY),
        v(0x8E, 4, 3, Absolute),
    ]),
    instr(Mnemonic::Sty, &[
        v(0x84, 3, 2, ZeroPage),
        v(0x94, 4, 2, ZeroPageX),
        v(0x8C, 4, 3, Absolute),
    ]),
    instr(Mnemonic::Tax, &[v(0xAA, 2, 1, Register)]),
    instr(Mnemonic::Tay, &[v(0xA8, 2, 1, Register)]),
    instr(Mnemonic::Tsx, &[v(0xBA, 2, 1, Register)]),
    instr(Mnemonic::Txa, &[v(0x8A, 2, 1, Register)]),
    instr(Mnemonic::Txs, &[v(0x9A, 2, 1, Register)]),
    instr(Mnemonic::Tya, &[v(0x98, 2, 1, Register)]),
];

/// Catalog construction failures. Fatal at startup.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CatalogError {
    #[error("opcode {opcode:#04x} assigned to both {first} and {second}")]
    DuplicateOpcode {
        opcode: u8,
        first: Mnemonic,
        second: Mnemonic,
    },
}

/// A dispatch-map slot: the instruction and the variant that owns the opcode.
#[derive(Debug, Clone, Copy)]
pub struct Entry {
    pub instruction: &'static Instruction,
    pub variant: &'static Variant,
}

/// Dense map from opcode byte to instruction variant. Immutable once built.
pub struct DispatchMap {
    slots: [Option<Entry>; 256],
}

impl DispatchMap {
    /// Populate the map from [`INSTRUCTIONS`], rejecting any opcode byte
    /// claimed twice.
    pub fn build() -> Result<Self, CatalogError> {
        let mut slots: [Option<Entry>; 256] = [None; 256];
        for instruction in INSTRUCTIONS {
            for variant in instruction.variants {
                let slot = &mut slots[variant.opcode as usize];
                if let Some(prev) = slot {
                    return Err(CatalogError::DuplicateOpcode {
                        opcode: variant.opcode,
                        first: prev.instruction.mnemonic,
                        second: instruction.mnemonic,
                    });
                }
                *slot = Some(Entry { instruction, variant });
            }
        }
        Ok(Self { slots })
    }

    pub fn lookup(&self, opcode: u8) -> Option<Entry> {
        self.slots[opcode as usize]
    }

    /// Number of assigned opcode bytes.
    pub fn assigned(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

/// Process-wide dispatch map, built once and shared by reference.
pub fn dispatch_map() -> Result<&'static DispatchMap, CatalogError> {
    static MAP: OnceLock<DispatchMap> = OnceLock::new();
    if let Some(map) = MAP.get() {
        return Ok(map);
    }
    let built = DispatchMap::build()?;
    Ok(MAP.get_or_init(|| built))
}

/// Find the instruction entry for a mnemonic.
pub fn instruction(mnemonic: Mnemonic) -> Option<&'static Instruction> {
    INSTRUCTIONS.iter().find(|i| i.mnemonic == mnemonic)
}

/// Variant lookup for the assembler. An instruction with exactly one variant
/// (implied, stack, register, status, branch) matches regardless of the
/// requested mode.
pub fn lookup_by_name_and_mode(mnemonic: Mnemonic, mode: AddrMode) -> Option<&'static Variant> {
    let instruction = instruction(mnemonic)?;
    if let [only] = instruction.variants {
        return Some(only);
    }
    instruction.variants.iter().find(|variant| variant.mode == mode)
}
