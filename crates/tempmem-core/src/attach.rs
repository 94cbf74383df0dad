//! Anchoring preferences and WMEs to slots.
//!
//! Preferences and WME values come from outside (rule firings, the
//! decider); these calls only link them into the right slot, keep the
//! counts straight, and notify the change tracker and the collector.

use tracing::trace;

use crate::agent::Agent;
use crate::error::{Result, TempMemError};
use crate::pref::{Preference, PreferenceId, PreferenceType};
use crate::slot::{ImpasseType, SlotId};
use crate::symtab::SymbolId;
use crate::wme::{Wme, WmeId};

impl Agent {
    /// Create a preference owned by the caller (one reference).
    pub fn make_preference(
        &mut self,
        kind: PreferenceType,
        id: SymbolId,
        attr: SymbolId,
        value: SymbolId,
        referent: Option<SymbolId>,
    ) -> Result<PreferenceId> {
        self.preferences
            .make(&mut self.symbols, kind, id, attr, value, referent)
    }

    pub fn preference(&self, pref: PreferenceId) -> Option<&Preference> {
        self.preferences.get(pref)
    }

    pub fn preference_add_ref(&mut self, pref: PreferenceId) -> Result<u32> {
        self.preferences.add_ref(pref)
    }

    /// Drop a caller-held reference. Returns `true` if the preference was
    /// deallocated.
    pub fn preference_remove_ref(&mut self, pref: PreferenceId) -> Result<bool> {
        self.preferences.remove_ref(&mut self.symbols, pref)
    }

    /// Link `pref` into the slot for its (id, attr), creating the slot if
    /// needed. The slot takes a reference and is marked changed.
    pub fn add_preference_to_slot(&mut self, pref: PreferenceId) -> Result<SlotId> {
        let p = self
            .preferences
            .get(pref)
            .ok_or(TempMemError::UnknownPreference(pref))?;
        if p.in_tm() {
            return Err(TempMemError::PreferenceAlreadyInSlot(pref));
        }
        let (kind, id, attr) = (p.kind(), p.id(), p.attr());

        let slot = self.make_slot(id, attr)?;
        self.slots.require_mut(slot)?.preferences.push(kind, pref);
        if let Some(p) = self.preferences.get_mut(pref) {
            p.slot = Some(slot);
        }
        self.preferences.add_ref(pref)?;
        trace!(slot = %slot, preference = %pref, %kind, "preference added to slot");

        self.mark_slot_as_changed(slot)?;
        if kind.affects_acceptables() {
            self.mark_acceptable_preference_changed(slot)?;
        }
        Ok(slot)
    }

    /// Unlink `pref` from its slot and drop the slot's reference. A slot
    /// left without preferences is marked for possible removal.
    pub fn remove_preference_from_slot(&mut self, pref: PreferenceId) -> Result<SlotId> {
        let p = self
            .preferences
            .get(pref)
            .ok_or(TempMemError::UnknownPreference(pref))?;
        let slot = p.slot().ok_or(TempMemError::PreferenceNotInSlot(pref))?;
        let kind = p.kind();

        let s = self.slots.require_mut(slot)?;
        let removed = s.preferences.remove(kind, pref);
        debug_assert!(removed, "preference {pref} missing from its slot {slot}");
        // Context slots live as long as their goal.
        let now_without_prefs = s.preferences.is_empty() && !s.isa_context_slot;
        if let Some(p) = self.preferences.get_mut(pref) {
            p.slot = None;
        }
        trace!(slot = %slot, preference = %pref, %kind, "preference removed from slot");

        self.mark_slot_as_changed(slot)?;
        if kind.affects_acceptables() {
            self.mark_acceptable_preference_changed(slot)?;
        }
        if now_without_prefs {
            self.mark_slot_for_possible_removal(slot)?;
        }
        self.preferences.remove_ref(&mut self.symbols, pref)?;
        Ok(slot)
    }

    /// Add a WME for (`id`, `attr`, `value`) to its slot. Acceptable WMEs go
    /// on the slot's acceptable-preference WME list.
    pub fn add_wme_to_slot(
        &mut self,
        id: SymbolId,
        attr: SymbolId,
        value: SymbolId,
        acceptable: bool,
    ) -> Result<WmeId> {
        for sym in [id, attr, value] {
            if !self.symbols.contains(sym) {
                return Err(TempMemError::UnknownSymbol(sym));
            }
        }
        let existed = self.slots.find(Some(id), attr).is_some();
        let slot = self.make_slot(id, attr)?;
        let wme = match self
            .wmes
            .make(&mut self.symbols, id, attr, value, acceptable)
        {
            Ok(wme) => wme,
            Err(err) => {
                if !existed {
                    self.mark_slot_for_possible_removal(slot)?;
                }
                return Err(err);
            }
        };
        let s = self.slots.require_mut(slot)?;
        if acceptable {
            s.acceptable_preference_wmes.push(wme);
        } else {
            s.wmes.push(wme);
        }
        trace!(slot = %slot, wme = %wme, acceptable, "wme added to slot");
        Ok(wme)
    }

    pub fn wme(&self, wme: WmeId) -> Option<&Wme> {
        self.wmes.get(wme)
    }

    /// Remove a WME from its slot and release it. A slot left empty is
    /// marked for possible removal.
    pub fn remove_wme_from_slot(&mut self, wme: WmeId) -> Result<()> {
        let w = self.wmes.get(wme).ok_or(TempMemError::UnknownWme(wme))?;
        let slot = self.slots.find(Some(w.id), w.attr);
        debug_assert!(slot.is_some(), "wme {wme} has no slot");

        let mut now_empty = false;
        if let Some(slot) = slot {
            let s = self.slots.require_mut(slot)?;
            s.wmes.retain(|x| *x != wme);
            s.acceptable_preference_wmes.retain(|x| *x != wme);
            now_empty = !s.has_content() && !s.isa_context_slot;
            if now_empty {
                self.mark_slot_for_possible_removal(slot)?;
            }
        }
        self.wmes.release(&mut self.symbols, wme)?;
        trace!(wme = %wme, slot_now_empty = now_empty, "wme removed from slot");
        Ok(())
    }

    /// Record an impasse on `slot`. The impasse identifier is referenced by
    /// the slot until cleared or until the slot is collected.
    pub fn set_slot_impasse(
        &mut self,
        slot: SlotId,
        impasse_type: ImpasseType,
        impasse_id: Option<SymbolId>,
    ) -> Result<()> {
        if let Some(sym) = impasse_id {
            if !self.symbols.is_identifier(sym) {
                return Err(TempMemError::NotAnIdentifier(sym));
            }
        }
        self.slots.require(slot)?;
        if let Some(sym) = impasse_id {
            self.symbols.add_ref(sym)?;
        }
        let s = self.slots.require_mut(slot)?;
        let previous = s.impasse_id.take();
        s.impasse_type = impasse_type;
        s.impasse_id = impasse_id;
        if let Some(old) = previous {
            self.release_symbol(old);
        }
        Ok(())
    }

    pub fn clear_slot_impasse(&mut self, slot: SlotId) -> Result<()> {
        self.set_slot_impasse(slot, ImpasseType::None, None)
    }
}
