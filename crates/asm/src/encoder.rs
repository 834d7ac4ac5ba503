//! Variant selection and byte emission.

use emu_core::cpu_6502::catalog::{self, AddrMode, Mnemonic, Variant};

use crate::parser::{Operand, Statement, Value};
use crate::symbols::SymbolTable;
use crate::{AssembleError, Program};

/// An instruction pinned to its address and opcode variant, with the operand
/// still possibly a label.
struct Item<'a> {
    line: usize,
    addr: u16,
    variant: &'static Variant,
    value: &'a Value,
}

static NO_OPERAND: Value = Value::Literal(0);

fn is_branch(mnemonic: Mnemonic) -> bool {
    matches!(
        catalog::instruction(mnemonic),
        Some(instruction) if instruction.variants[0].mode == AddrMode::Branch
    )
}

/// True when the value is known to fit a single byte already in pass one.
/// Labels resolve later and get the 16-bit form, same as the original
/// translator's choice.
fn fits_zero_page(value: &Value) -> bool {
    matches!(value, Value::Literal(n) if *n <= 0xFF)
}

fn zero_page_or_absolute(mnemonic: Mnemonic, value: &Value, zp: AddrMode, abs: AddrMode) -> AddrMode {
    if fits_zero_page(value) && catalog::lookup_by_name_and_mode(mnemonic, zp).map(|v| v.mode) == Some(zp) {
        zp
    } else {
        abs
    }
}

/// Choose the addressing mode implied by the operand's shape, then the
/// catalog variant for it.
fn select_variant<'a>(
    mnemonic: Mnemonic,
    operand: &'a Operand,
    line: usize,
) -> Result<(&'static Variant, &'a Value), AssembleError> {
    let (mode, value) = match operand {
        Operand::None => (AddrMode::Implied, &NO_OPERAND),
        Operand::Accumulator => (AddrMode::Accumulator, &NO_OPERAND),
        Operand::Immediate(value) => (AddrMode::Immediate, value),
        Operand::Direct(value) => {
            if is_branch(mnemonic) {
                (AddrMode::Branch, value)
            } else {
                (
                    zero_page_or_absolute(mnemonic, value, AddrMode::ZeroPage, AddrMode::Absolute),
                    value,
                )
            }
        }
        Operand::DirectX(value) => (
            zero_page_or_absolute(mnemonic, value, AddrMode::ZeroPageX, AddrMode::AbsoluteX),
            value,
        ),
        Operand::DirectY(value) => (
            zero_page_or_absolute(mnemonic, value, AddrMode::ZeroPageY, AddrMode::AbsoluteY),
            value,
        ),
        Operand::Indirect(value) => (AddrMode::Indirect, value),
        Operand::IndirectX(value) => (AddrMode::IndirectX, value),
        Operand::IndirectY(value) => (AddrMode::IndirectY, value),
    };

    let illegal = || AssembleError::IllegalMode { line, mnemonic, mode };
    let variant = catalog::lookup_by_name_and_mode(mnemonic, mode).ok_or_else(illegal)?;

    // The catalog's single-variant rule answers for any requested mode, so
    // check the operand shape actually fits what came back.
    let compatible = match operand {
        Operand::None => variant.length == 1,
        _ => variant.mode == mode,
    };
    if !compatible {
        return Err(illegal());
    }
    Ok((variant, value))
}

fn resolve(value: &Value, symbols: &SymbolTable, line: usize) -> Result<u16, AssembleError> {
    match value {
        Value::Literal(n) => Ok(*n),
        Value::Label(name) => symbols.resolve(name, line),
    }
}

/// Second pass over one instruction: emit opcode plus operand bytes.
fn emit(item: &Item<'_>, symbols: &SymbolTable, out: &mut Vec<u8>) -> Result<(), AssembleError> {
    out.push(item.variant.opcode);
    let target = resolve(item.value, symbols, item.line)?;

    match item.variant.length {
        1 => {}
        2 if item.variant.mode == AddrMode::Branch => {
            // Relative to the PC after the branch's own two bytes.
            let offset = target as i32 - (item.addr as i32 + 2);
            if !(-128..=127).contains(&offset) {
                return Err(AssembleError::BranchOutOfRange {
                    line: item.line,
                    offset,
                });
            }
            out.push(offset as i8 as u8);
        }
        2 => {
            if target > 0xFF {
                return Err(AssembleError::OperandRange {
                    line: item.line,
                    value: target,
                });
            }
            out.push(target as u8);
        }
        _ => out.extend_from_slice(&target.to_le_bytes()),
    }
    Ok(())
}

/// Two-pass encoding: lay out addresses and labels, then resolve and emit.
pub fn encode(statements: &[Statement], origin: u16) -> Result<Program, AssembleError> {
    let mut symbols = SymbolTable::new();
    let mut items = Vec::new();
    let mut addr = origin;

    for statement in statements {
        if let Some(label) = &statement.label {
            symbols.define(label, addr, statement.line)?;
        }
        if let Some((mnemonic, operand)) = &statement.instr {
            let (variant, value) = select_variant(*mnemonic, operand, statement.line)?;
            items.push(Item {
                line: statement.line,
                addr,
                variant,
                value,
            });
            addr = addr.wrapping_add(variant.length as u16);
        }
    }

    let mut bytes = Vec::with_capacity(addr.wrapping_sub(origin) as usize);
    for item in &items {
        emit(item, &symbols, &mut bytes)?;
    }

    Ok(Program {
        origin,
        bytes,
        symbols: symbols.into_inner(),
    })
}
