//! Preferences and the per-slot lists that anchor them.
//!
//! Preferences are produced outside this crate (by rule firings) and are
//! reference counted. The creator gets the first reference; a slot that
//! holds the preference takes another, and so does a CDPS entry. When the
//! count reaches zero the preference is deallocated and releases its
//! symbols.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::arena::{arena_id, Arena};
use crate::error::{Result, TempMemError};
use crate::slot::SlotId;
use crate::symtab::{SymbolId, SymbolTable};

arena_id!(
    /// Handle to a preference in one agent's preference pool.
    PreferenceId,
    "pref"
);

/// Number of distinct preference types, and the length of a slot's
/// per-type list array.
pub const NUM_PREFERENCE_TYPES: usize = 12;

/// Preference type. The discriminant is the slot list index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceType {
    Acceptable = 0,
    Require = 1,
    Reject = 2,
    Prohibit = 3,
    Reconsider = 4,
    UnaryIndifferent = 5,
    Best = 6,
    Worst = 7,
    BinaryIndifferent = 8,
    Better = 9,
    Worse = 10,
    NumericIndifferent = 11,
}

impl PreferenceType {
    pub const ALL: [PreferenceType; NUM_PREFERENCE_TYPES] = [
        Self::Acceptable,
        Self::Require,
        Self::Reject,
        Self::Prohibit,
        Self::Reconsider,
        Self::UnaryIndifferent,
        Self::Best,
        Self::Worst,
        Self::BinaryIndifferent,
        Self::Better,
        Self::Worse,
        Self::NumericIndifferent,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Binary preferences compare the value against a referent.
    pub fn is_binary(self) -> bool {
        matches!(self, Self::BinaryIndifferent | Self::Better | Self::Worse)
    }

    /// Types whose changes affect the acceptable-preference WMEs.
    pub fn affects_acceptables(self) -> bool {
        matches!(self, Self::Acceptable | Self::Require)
    }
}

impl fmt::Display for PreferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Acceptable => "acceptable",
            Self::Require => "require",
            Self::Reject => "reject",
            Self::Prohibit => "prohibit",
            Self::Reconsider => "reconsider",
            Self::UnaryIndifferent => "unary_indifferent",
            Self::Best => "best",
            Self::Worst => "worst",
            Self::BinaryIndifferent => "binary_indifferent",
            Self::Better => "better",
            Self::Worse => "worse",
            Self::NumericIndifferent => "numeric_indifferent",
        };
        f.write_str(s)
    }
}

/// One preference.
#[derive(Debug, Clone)]
pub struct Preference {
    pub(crate) kind: PreferenceType,
    pub(crate) id: SymbolId,
    pub(crate) attr: SymbolId,
    pub(crate) value: SymbolId,
    pub(crate) referent: Option<SymbolId>,
    pub(crate) reference_count: u32,
    pub(crate) slot: Option<SlotId>,
}

impl Preference {
    pub fn kind(&self) -> PreferenceType {
        self.kind
    }

    pub fn id(&self) -> SymbolId {
        self.id
    }

    pub fn attr(&self) -> SymbolId {
        self.attr
    }

    pub fn value(&self) -> SymbolId {
        self.value
    }

    pub fn referent(&self) -> Option<SymbolId> {
        self.referent
    }

    pub fn reference_count(&self) -> u32 {
        self.reference_count
    }

    /// Slot this preference is attached to, if it is in temporary memory.
    pub fn slot(&self) -> Option<SlotId> {
        self.slot
    }

    pub fn in_tm(&self) -> bool {
        self.slot.is_some()
    }

    fn symbols(&self) -> impl Iterator<Item = SymbolId> {
        [Some(self.id), Some(self.attr), Some(self.value), self.referent]
            .into_iter()
            .flatten()
    }
}

/// Per-type preference lists held by a slot.
#[derive(Debug, Clone, Default)]
pub struct PreferenceLists {
    lists: [Vec<PreferenceId>; NUM_PREFERENCE_TYPES],
}

impl PreferenceLists {
    pub fn of_type(&self, kind: PreferenceType) -> &[PreferenceId] {
        &self.lists[kind.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    /// All preferences in type order.
    pub fn iter(&self) -> impl Iterator<Item = PreferenceId> + '_ {
        self.lists.iter().flat_map(|l| l.iter().copied())
    }

    pub(crate) fn push(&mut self, kind: PreferenceType, pref: PreferenceId) {
        self.lists[kind.index()].push(pref);
    }

    pub(crate) fn remove(&mut self, kind: PreferenceType, pref: PreferenceId) -> bool {
        let list = &mut self.lists[kind.index()];
        match list.iter().position(|p| *p == pref) {
            Some(pos) => {
                list.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Per-agent preference pool.
#[derive(Debug, Default)]
pub struct PreferenceStore {
    prefs: Arena<Preference>,
}

impl PreferenceStore {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            prefs: capacity.map(Arena::with_capacity_limit).unwrap_or_default(),
        }
    }

    pub fn len(&self) -> usize {
        self.prefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefs.is_empty()
    }

    pub fn get(&self, pref: PreferenceId) -> Option<&Preference> {
        self.prefs.get(pref.0)
    }

    pub(crate) fn get_mut(&mut self, pref: PreferenceId) -> Option<&mut Preference> {
        self.prefs.get_mut(pref.0)
    }

    /// Create a preference owned by the caller (reference count 1). Takes
    /// one reference on each of its symbols.
    pub fn make(
        &mut self,
        symbols: &mut SymbolTable,
        kind: PreferenceType,
        id: SymbolId,
        attr: SymbolId,
        value: SymbolId,
        referent: Option<SymbolId>,
    ) -> Result<PreferenceId> {
        if kind.is_binary() && referent.is_none() {
            return Err(TempMemError::MissingReferent {
                kind: kind.to_string(),
            });
        }
        if !symbols.is_identifier(id) {
            return Err(TempMemError::NotAnIdentifier(id));
        }
        let pref = Preference {
            kind,
            id,
            attr,
            value,
            referent: if kind.is_binary() { referent } else { None },
            reference_count: 1,
            slot: None,
        };
        for sym in pref.symbols() {
            if !symbols.contains(sym) {
                return Err(TempMemError::UnknownSymbol(sym));
            }
        }

        let capacity = self.prefs.len();
        let handle = self
            .prefs
            .insert(pref)
            .map(PreferenceId)
            .ok_or(TempMemError::PoolExhausted {
                pool: "preference",
                capacity,
            })?;
        if let Some(p) = self.prefs.get(handle.0) {
            for sym in p.symbols() {
                symbols.add_ref(sym)?;
            }
        }
        trace!(preference = %handle, %kind, "preference created");
        Ok(handle)
    }

    pub fn add_ref(&mut self, pref: PreferenceId) -> Result<u32> {
        let p = self
            .prefs
            .get_mut(pref.0)
            .ok_or(TempMemError::UnknownPreference(pref))?;
        p.reference_count += 1;
        Ok(p.reference_count)
    }

    /// Drop one reference. At zero the preference is deallocated and its
    /// symbol references released; returns `true` in that case.
    pub fn remove_ref(&mut self, symbols: &mut SymbolTable, pref: PreferenceId) -> Result<bool> {
        let p = self
            .prefs
            .get_mut(pref.0)
            .ok_or(TempMemError::UnknownPreference(pref))?;
        debug_assert!(p.reference_count > 0, "live preference {pref} with zero refs");
        p.reference_count -= 1;
        if p.reference_count > 0 {
            return Ok(false);
        }
        debug_assert!(p.slot.is_none(), "deallocating preference {pref} still in a slot");

        if let Some(p) = self.prefs.remove(pref.0) {
            for sym in p.symbols() {
                if let Err(err) = symbols.remove_ref(sym) {
                    warn!(preference = %pref, %err, "releasing preference symbol failed");
                    debug_assert!(false, "preference {pref} held a dead symbol");
                }
            }
            trace!(preference = %pref, kind = %p.kind, "preference deallocated");
        }
        Ok(true)
    }
}
