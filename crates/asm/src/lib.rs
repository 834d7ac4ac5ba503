//! 6502 assembler.
//!
//! Translates line-oriented assembly source into the flat machine-code
//! stream the emulator loads: opcode byte followed by 0-2 little-endian
//! operand bytes per instruction, concatenated in program order.
//!
//! Two passes: the first parses statements, picks opcode variants, and
//! records label definitions; the second resolves label operands and emits
//! bytes. Branch targets encode as signed PC-relative offsets.

mod encoder;
mod parser;
mod symbols;

pub use parser::{Operand, Statement, Value};
pub use symbols::SymbolTable;

use std::collections::BTreeMap;

use emu_core::{AddrMode, Mnemonic};
use thiserror::Error;

/// Assembled program image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// Address the image is meant to load at.
    pub origin: u16,
    /// Machine code, no header, no metadata.
    pub bytes: Vec<u8>,
    /// Resolved label addresses.
    pub symbols: BTreeMap<String, u16>,
}

/// Assembly failures. Line numbers are 1-based.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssembleError {
    #[error("line {line}: syntax error: {text}")]
    Syntax { line: usize, text: String },
    #[error("line {line}: unknown instruction {name}")]
    UnknownInstruction { line: usize, name: String },
    #[error("line {line}: {mnemonic} does not support {mode:?} addressing")]
    IllegalMode {
        line: usize,
        mnemonic: Mnemonic,
        mode: AddrMode,
    },
    #[error("line {line}: duplicate label {name}")]
    DuplicateLabel { line: usize, name: String },
    #[error("line {line}: undefined label {name}")]
    UndefinedLabel { line: usize, name: String },
    #[error("line {line}: branch target {offset} bytes away is out of range")]
    BranchOutOfRange { line: usize, offset: i32 },
    #[error("line {line}: operand {value:#06x} does not fit in one byte")]
    OperandRange { line: usize, value: u16 },
}

/// Assemble `source` into a program image based at `origin`.
pub fn assemble(source: &str, origin: u16) -> Result<Program, AssembleError> {
    let statements = parser::parse_source(source)?;
    let program = encoder::encode(&statements, origin)?;
    log::debug!(
        "assembled {} bytes at {:#06x} ({} labels)",
        program.bytes.len(),
        program.origin,
        program.symbols.len()
    );
    Ok(program)
}
