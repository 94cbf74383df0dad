//! Symbol table: interned constants, identifiers and their reference counts.
//!
//! Every structure that stores a copy of a symbol holds one reference on
//! it. Constants and variables are interned by value, so making the same
//! constant twice returns the same handle with one more reference.
//! Identifiers are always fresh. A symbol is destroyed the moment its count
//! drops to zero.

use std::collections::HashMap;
use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::arena::{arena_id, Arena};
use crate::error::{Result, TempMemError};

arena_id!(
    /// Handle to a symbol in one agent's symbol table.
    SymbolId,
    "sym"
);

/// Depth of a goal in the context stack. Only the ordering is meaningful:
/// the smaller of two levels is the shallower goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GoalLevel(pub u32);

impl fmt::Display for GoalLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical value of a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolValue {
    Identifier { letter: char, number: u64 },
    Str(String),
    Int(i64),
    Float(OrderedFloat<f64>),
    Variable(String),
}

impl fmt::Display for SymbolValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier { letter, number } => write!(f, "{letter}{number}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{}", x.0),
            Self::Variable(v) => write!(f, "<{v}>"),
        }
    }
}

/// Goal metadata carried by identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierInfo {
    pub isa_goal: bool,
    pub level: Option<GoalLevel>,
}

#[derive(Debug, Clone)]
struct SymbolEntry {
    value: SymbolValue,
    reference_count: u32,
    identifier: Option<IdentifierInfo>,
}

/// Per-agent symbol table.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Arena<SymbolEntry>,
    interned: HashMap<SymbolValue, SymbolId>,
    id_counters: HashMap<char, u64>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, sym: SymbolId) -> bool {
        self.symbols.contains(sym.0)
    }

    /// Mint a new identifier with one reference owned by the caller.
    /// Non-alphabetic letters fall back to `I`.
    pub fn make_identifier(&mut self, letter: char, level: Option<GoalLevel>) -> Result<SymbolId> {
        let letter = if letter.is_ascii_alphabetic() {
            letter.to_ascii_uppercase()
        } else {
            'I'
        };
        let counter = self.id_counters.entry(letter).or_insert(0);
        *counter += 1;
        let entry = SymbolEntry {
            value: SymbolValue::Identifier {
                letter,
                number: *counter,
            },
            reference_count: 1,
            identifier: Some(IdentifierInfo {
                isa_goal: false,
                level,
            }),
        };
        let sym = self.allocate(entry)?;
        trace!(symbol = %sym, name = %self.describe(sym), "identifier created");
        Ok(sym)
    }

    pub fn make_str_constant(&mut self, s: &str) -> Result<SymbolId> {
        self.intern(SymbolValue::Str(s.to_string()))
    }

    pub fn make_int_constant(&mut self, i: i64) -> Result<SymbolId> {
        self.intern(SymbolValue::Int(i))
    }

    pub fn make_float_constant(&mut self, x: f64) -> Result<SymbolId> {
        self.intern(SymbolValue::Float(OrderedFloat(x)))
    }

    pub fn make_variable(&mut self, name: &str) -> Result<SymbolId> {
        self.intern(SymbolValue::Variable(name.to_string()))
    }

    /// Look up an interned constant without taking a reference.
    pub fn find(&self, value: &SymbolValue) -> Option<SymbolId> {
        self.interned.get(value).copied()
    }

    pub fn find_str_constant(&self, s: &str) -> Option<SymbolId> {
        self.find(&SymbolValue::Str(s.to_string()))
    }

    /// Take one more reference on `sym`. Returns the new count.
    pub fn add_ref(&mut self, sym: SymbolId) -> Result<u32> {
        let entry = self
            .symbols
            .get_mut(sym.0)
            .ok_or(TempMemError::UnknownSymbol(sym))?;
        entry.reference_count += 1;
        let count = entry.reference_count;
        trace!(symbol = %sym, count, "symbol add_ref");
        Ok(count)
    }

    /// Drop one reference on `sym`. Returns `true` when this was the last
    /// reference and the symbol has been destroyed.
    pub fn remove_ref(&mut self, sym: SymbolId) -> Result<bool> {
        let entry = self
            .symbols
            .get_mut(sym.0)
            .ok_or(TempMemError::UnknownSymbol(sym))?;
        debug_assert!(entry.reference_count > 0, "live symbol {sym} with zero refs");
        entry.reference_count -= 1;
        let count = entry.reference_count;
        trace!(symbol = %sym, count, "symbol remove_ref");
        if count > 0 {
            return Ok(false);
        }

        if let Some(entry) = self.symbols.remove(sym.0) {
            if entry.identifier.is_none() {
                self.interned.remove(&entry.value);
            }
            trace!(symbol = %sym, value = %entry.value, "symbol deallocated");
        }
        Ok(true)
    }

    pub fn reference_count(&self, sym: SymbolId) -> Option<u32> {
        self.symbols.get(sym.0).map(|e| e.reference_count)
    }

    pub fn value(&self, sym: SymbolId) -> Option<&SymbolValue> {
        self.symbols.get(sym.0).map(|e| &e.value)
    }

    pub fn identifier(&self, sym: SymbolId) -> Option<&IdentifierInfo> {
        self.symbols.get(sym.0).and_then(|e| e.identifier.as_ref())
    }

    pub fn is_identifier(&self, sym: SymbolId) -> bool {
        self.identifier(sym).is_some()
    }

    pub fn is_goal(&self, sym: SymbolId) -> bool {
        self.identifier(sym).is_some_and(|info| info.isa_goal)
    }

    pub fn goal_level(&self, sym: SymbolId) -> Option<GoalLevel> {
        self.identifier(sym).and_then(|info| info.level)
    }

    /// Flag an identifier as a goal at `level`.
    pub fn mark_goal(&mut self, sym: SymbolId, level: GoalLevel) -> Result<()> {
        let info = self.identifier_mut(sym)?;
        info.isa_goal = true;
        info.level = Some(level);
        Ok(())
    }

    /// Clear the goal flag; the level is kept.
    pub fn unmark_goal(&mut self, sym: SymbolId) -> Result<()> {
        self.identifier_mut(sym)?.isa_goal = false;
        Ok(())
    }

    pub fn set_level(&mut self, sym: SymbolId, level: Option<GoalLevel>) -> Result<()> {
        self.identifier_mut(sym)?.level = level;
        Ok(())
    }

    /// Printable name for `sym`, or its handle if it is gone.
    pub fn describe(&self, sym: SymbolId) -> String {
        match self.value(sym) {
            Some(value) => value.to_string(),
            None => sym.to_string(),
        }
    }

    fn identifier_mut(&mut self, sym: SymbolId) -> Result<&mut IdentifierInfo> {
        let entry = self
            .symbols
            .get_mut(sym.0)
            .ok_or(TempMemError::UnknownSymbol(sym))?;
        entry
            .identifier
            .as_mut()
            .ok_or(TempMemError::NotAnIdentifier(sym))
    }

    fn intern(&mut self, value: SymbolValue) -> Result<SymbolId> {
        if let Some(&sym) = self.interned.get(&value) {
            self.add_ref(sym)?;
            return Ok(sym);
        }
        let sym = self.allocate(SymbolEntry {
            value: value.clone(),
            reference_count: 1,
            identifier: None,
        })?;
        trace!(symbol = %sym, %value, "constant interned");
        self.interned.insert(value, sym);
        Ok(sym)
    }

    fn allocate(&mut self, entry: SymbolEntry) -> Result<SymbolId> {
        let capacity = self.symbols.len();
        self.symbols
            .insert(entry)
            .map(SymbolId)
            .ok_or(TempMemError::PoolExhausted {
                pool: "symbol",
                capacity,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_are_interned() {
        let mut table = SymbolTable::new();
        let a = table.make_str_constant("color").unwrap();
        let b = table.make_str_constant("color").unwrap();
        assert_eq!(a, b);
        assert_eq!(table.reference_count(a), Some(2));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_identifiers_are_fresh() {
        let mut table = SymbolTable::new();
        let s1 = table.make_identifier('s', None).unwrap();
        let s2 = table.make_identifier('S', None).unwrap();
        assert_ne!(s1, s2);
        assert_eq!(table.describe(s1), "S1");
        assert_eq!(table.describe(s2), "S2");
    }

    #[test]
    fn test_last_remove_ref_destroys() {
        let mut table = SymbolTable::new();
        let sym = table.make_str_constant("red").unwrap();
        table.add_ref(sym).unwrap();
        assert!(!table.remove_ref(sym).unwrap());
        assert!(table.remove_ref(sym).unwrap());
        assert!(!table.contains(sym));
        assert!(table.find_str_constant("red").is_none());

        // Re-interning yields a new handle.
        let again = table.make_str_constant("red").unwrap();
        assert_ne!(again, sym);
    }

    #[test]
    fn test_remove_ref_on_dead_symbol_errors() {
        let mut table = SymbolTable::new();
        let sym = table.make_int_constant(7).unwrap();
        table.remove_ref(sym).unwrap();
        assert!(matches!(
            table.remove_ref(sym),
            Err(TempMemError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn test_goal_metadata() {
        let mut table = SymbolTable::new();
        let g = table.make_identifier('S', None).unwrap();
        assert!(!table.is_goal(g));
        table.mark_goal(g, GoalLevel(2)).unwrap();
        assert!(table.is_goal(g));
        assert_eq!(table.goal_level(g), Some(GoalLevel(2)));

        let c = table.make_str_constant("operator").unwrap();
        assert!(matches!(
            table.mark_goal(c, GoalLevel(1)),
            Err(TempMemError::NotAnIdentifier(_))
        ));
    }

    #[test]
    fn test_float_and_variable_display() {
        let mut table = SymbolTable::new();
        let x = table.make_float_constant(0.5).unwrap();
        let v = table.make_variable("o").unwrap();
        assert_eq!(table.describe(x), "0.5");
        assert_eq!(table.describe(v), "<o>");
        assert_eq!(table.make_float_constant(0.5).unwrap(), x);
    }
}
