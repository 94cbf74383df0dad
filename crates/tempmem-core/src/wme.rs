//! Working memory elements.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::arena::{arena_id, Arena};
use crate::error::{Result, TempMemError};
use crate::symtab::{SymbolId, SymbolTable};

arena_id!(
    /// Handle to a WME in one agent's WME pool.
    WmeId,
    "wme"
);

/// One (id, attr, value) fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wme {
    pub id: SymbolId,
    pub attr: SymbolId,
    pub value: SymbolId,
    /// Acceptable-preference WME rather than a decided value.
    pub acceptable: bool,
    pub timetag: u64,
}

/// Per-agent WME pool. Each WME holds one reference on each of its symbols.
#[derive(Debug, Default)]
pub struct WmeStore {
    wmes: Arena<Wme>,
    next_timetag: u64,
}

impl WmeStore {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            wmes: capacity.map(Arena::with_capacity_limit).unwrap_or_default(),
            next_timetag: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.wmes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wmes.is_empty()
    }

    pub fn get(&self, wme: WmeId) -> Option<&Wme> {
        self.wmes.get(wme.0)
    }

    pub(crate) fn make(
        &mut self,
        symbols: &mut SymbolTable,
        id: SymbolId,
        attr: SymbolId,
        value: SymbolId,
        acceptable: bool,
    ) -> Result<WmeId> {
        for sym in [id, attr, value] {
            if !symbols.contains(sym) {
                return Err(TempMemError::UnknownSymbol(sym));
            }
        }
        let timetag = self.next_timetag.max(1);
        let capacity = self.wmes.len();
        let handle = self
            .wmes
            .insert(Wme {
                id,
                attr,
                value,
                acceptable,
                timetag,
            })
            .map(WmeId)
            .ok_or(TempMemError::PoolExhausted {
                pool: "wme",
                capacity,
            })?;
        self.next_timetag = timetag + 1;
        for sym in [id, attr, value] {
            symbols.add_ref(sym)?;
        }
        trace!(wme = %handle, timetag, "wme created");
        Ok(handle)
    }

    pub(crate) fn release(&mut self, symbols: &mut SymbolTable, wme: WmeId) -> Result<Wme> {
        let w = self.wmes.remove(wme.0).ok_or(TempMemError::UnknownWme(wme))?;
        for sym in [w.id, w.attr, w.value] {
            if let Err(err) = symbols.remove_ref(sym) {
                warn!(wme = %wme, %err, "releasing wme symbol failed");
                debug_assert!(false, "wme {wme} held a dead symbol");
            }
        }
        trace!(wme = %wme, timetag = w.timetag, "wme deallocated");
        Ok(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timetags_increase() {
        let mut table = SymbolTable::new();
        let id = table.make_identifier('B', None).unwrap();
        let attr = table.make_str_constant("color").unwrap();
        let value = table.make_str_constant("red").unwrap();
        let mut store = WmeStore::new(None);

        let a = store.make(&mut table, id, attr, value, false).unwrap();
        let b = store.make(&mut table, id, attr, value, true).unwrap();
        assert!(store.get(a).unwrap().timetag < store.get(b).unwrap().timetag);
        assert_eq!(table.reference_count(value), Some(3));

        store.release(&mut table, a).unwrap();
        store.release(&mut table, b).unwrap();
        assert_eq!(table.reference_count(value), Some(1));
        assert!(store.is_empty());
    }
}
