//! Label definitions, ordered by name.

use std::collections::BTreeMap;

use crate::AssembleError;

/// Label-to-address table built during the first pass.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    symbols: BTreeMap<String, u16>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a definition; a second definition of the same name is an error.
    pub fn define(&mut self, name: &str, addr: u16, line: usize) -> Result<(), AssembleError> {
        if self.symbols.contains_key(name) {
            return Err(AssembleError::DuplicateLabel {
                line,
                name: name.to_string(),
            });
        }
        self.symbols.insert(name.to_string(), addr);
        Ok(())
    }

    pub fn resolve(&self, name: &str, line: usize) -> Result<u16, AssembleError> {
        self.symbols
            .get(name)
            .copied()
            .ok_or_else(|| AssembleError::UndefinedLabel {
                line,
                name: name.to_string(),
            })
    }

    pub fn into_inner(self) -> BTreeMap<String, u16> {
        self.symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_resolve() {
        let mut table = SymbolTable::new();
        table.define("loop", 0x0605, 2).unwrap();
        assert_eq!(table.resolve("loop", 5).unwrap(), 0x0605);
    }

    #[test]
    fn duplicates_and_unknowns_error_with_line() {
        let mut table = SymbolTable::new();
        table.define("a", 0, 1).unwrap();
        assert_eq!(
            table.define("a", 4, 9).unwrap_err(),
            AssembleError::DuplicateLabel {
                line: 9,
                name: "a".into()
            }
        );
        assert_eq!(
            table.resolve("b", 3).unwrap_err(),
            AssembleError::UndefinedLabel {
                line: 3,
                name: "b".into()
            }
        );
    }
}
