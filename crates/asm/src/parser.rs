//! Line-oriented statement parsing.

use emu_core::Mnemonic;

use crate::AssembleError;

/// A literal operand or a label reference resolved in the second pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Literal(u16),
    Label(String),
}

/// Parsed operand syntax, before an addressing mode is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// No operand text.
    None,
    /// `A`
    Accumulator,
    /// `#$NN`
    Immediate(Value),
    /// `$NN`, `$NNNN`, or a bare label.
    Direct(Value),
    /// `$NN,X` / `$NNNN,X`
    DirectX(Value),
    /// `$NN,Y` / `$NNNN,Y`
    DirectY(Value),
    /// `($NNNN)`
    Indirect(Value),
    /// `($NN,X)`
    IndirectX(Value),
    /// `($NN),Y`
    IndirectY(Value),
}

/// One source line worth of meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub line: usize,
    pub label: Option<String>,
    pub instr: Option<(Mnemonic, Operand)>,
}

fn is_label(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_value(text: &str, line: usize) -> Result<Value, AssembleError> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix('$') {
        return u16::from_str_radix(hex, 16)
            .map(Value::Literal)
            .map_err(|_| AssembleError::Syntax {
                line,
                text: text.to_string(),
            });
    }
    if text.chars().all(|c| c.is_ascii_digit()) && !text.is_empty() {
        return text
            .parse::<u16>()
            .map(Value::Literal)
            .map_err(|_| AssembleError::Syntax {
                line,
                text: text.to_string(),
            });
    }
    if is_label(text) {
        return Ok(Value::Label(text.to_string()));
    }
    Err(AssembleError::Syntax {
        line,
        text: text.to_string(),
    })
}

/// Strip one index-register suffix (`,X` or `,Y`), case-insensitively.
fn split_index_suffix(text: &str) -> Option<(&str, char)> {
    let (head, tail) = text.rsplit_once(',')?;
    match tail.trim() {
        r if r.eq_ignore_ascii_case("x") => Some((head.trim_end(), 'X')),
        r if r.eq_ignore_ascii_case("y") => Some((head.trim_end(), 'Y')),
        _ => None,
    }
}

fn parse_operand(text: &str, line: usize) -> Result<Operand, AssembleError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Operand::None);
    }
    if text.eq_ignore_ascii_case("A") {
        return Ok(Operand::Accumulator);
    }
    if let Some(imm) = text.strip_prefix('#') {
        return Ok(Operand::Immediate(parse_value(imm, line)?));
    }
    if let Some(rest) = text.strip_prefix('(') {
        // `($NN),Y` closes the parens before the index register.
        if let Some((inner, index)) = split_index_suffix(text) {
            if index == 'Y' {
                let inner = inner
                    .strip_prefix('(')
                    .and_then(|s| s.trim_end().strip_suffix(')'))
                    .ok_or_else(|| AssembleError::Syntax {
                        line,
                        text: text.to_string(),
                    })?;
                return Ok(Operand::IndirectY(parse_value(inner, line)?));
            }
        }
        let inner = rest.strip_suffix(')').ok_or_else(|| AssembleError::Syntax {
            line,
            text: text.to_string(),
        })?;
        // `($NN,X)` keeps the index register inside the parens.
        if let Some((addr, index)) = split_index_suffix(inner) {
            if index == 'X' {
                return Ok(Operand::IndirectX(parse_value(addr, line)?));
            }
            return Err(AssembleError::Syntax {
                line,
                text: text.to_string(),
            });
        }
        return Ok(Operand::Indirect(parse_value(inner, line)?));
    }
    if let Some((addr, index)) = split_index_suffix(text) {
        let value = parse_value(addr, line)?;
        return Ok(match index {
            'X' => Operand::DirectX(value),
            _ => Operand::DirectY(value),
        });
    }
    Ok(Operand::Direct(parse_value(text, line)?))
}

fn parse_line(raw: &str, line: usize) -> Result<Option<Statement>, AssembleError> {
    // Comments run to end of line.
    let text = raw.split(';').next().unwrap_or("").trim();
    if text.is_empty() {
        return Ok(None);
    }

    let (label, rest) = match text.split_once(':') {
        Some((head, rest)) if is_label(head.trim()) => {
            (Some(head.trim().to_string()), rest.trim())
        }
        _ => (None, text),
    };

    let instr = if rest.is_empty() {
        None
    } else {
        let (name, operand_text) = match rest.split_once(char::is_whitespace) {
            Some((name, operand)) => (name, operand),
            None => (rest, ""),
        };
        let mnemonic: Mnemonic =
            name.parse().map_err(|()| AssembleError::UnknownInstruction {
                line,
                name: name.to_string(),
            })?;
        Some((mnemonic, parse_operand(operand_text, line)?))
    };

    Ok(Some(Statement { line, label, instr }))
}

/// Parse a whole source file. Line numbers are 1-based; empty and
/// comment-only lines produce no statement.
pub fn parse_source(source: &str) -> Result<Vec<Statement>, AssembleError> {
    let mut statements = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        if let Some(statement) = parse_line(raw, index + 1)? {
            statements.push(statement);
        }
    }
    Ok(statements)
}
