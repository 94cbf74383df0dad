//! Context-dependent preference sets.
//!
//! A slot's CDPS records the preferences a decision on that slot depended
//! on, for justification building. Each entry holds one preference
//! reference. CDPS work only happens when the agent was configured with
//! `chunk_through_evaluation_rules`; otherwise the set is never built.

use tracing::{trace, warn};

use crate::agent::Agent;
use crate::error::{Result, TempMemError};
use crate::pref::PreferenceId;
use crate::slot::SlotId;

impl Agent {
    /// Add `pref` to `slot`'s CDPS, taking a reference. Returns `false`
    /// when CDPS tracking is disabled or `pref` is already in the set.
    pub fn add_to_cdps(&mut self, slot: SlotId, pref: PreferenceId) -> Result<bool> {
        if !self.config.chunk_through_evaluation_rules {
            return Ok(false);
        }
        if self.preferences.get(pref).is_none() {
            return Err(TempMemError::UnknownPreference(pref));
        }
        let s = self.slots.require_mut(slot)?;
        if s.cdps.contains(&pref) {
            return Ok(false);
        }
        s.cdps.push(pref);
        self.preferences.add_ref(pref)?;
        trace!(slot = %slot, preference = %pref, "added to cdps");
        Ok(true)
    }

    /// Clear `slot`'s CDPS and release every preference reference it held.
    /// Returns the number released; 0 when CDPS tracking is disabled.
    ///
    /// Part of slot deallocation: the slot must already be empty.
    pub fn clear_cdps(&mut self, slot: SlotId) -> Result<usize> {
        if !self.config.chunk_through_evaluation_rules {
            return Ok(0);
        }
        let s = self.slots.require(slot)?;
        debug_assert!(!s.has_content(), "clearing the CDPS of live slot {slot}");
        Ok(self.release_cdps(slot))
    }

    /// Detach the list first, then release each entry. A second call finds
    /// an empty list.
    pub(crate) fn release_cdps(&mut self, slot: SlotId) -> usize {
        let cdps = match self.slots.get_mut(slot) {
            Some(s) => std::mem::take(&mut s.cdps),
            None => return 0,
        };
        let released = cdps.len();
        for pref in cdps {
            if let Err(err) = self.preferences.remove_ref(&mut self.symbols, pref) {
                warn!(slot = %slot, preference = %pref, %err, "releasing cdps preference failed");
                debug_assert!(false, "cdps of {slot} held a dead preference");
            }
        }
        self.metrics.add_cdps_released(released);
        trace!(slot = %slot, released, "cdps cleared");
        released
    }
}

#[cfg(test)]
mod tests {
    use crate::agent::Agent;
    use crate::config::AgentConfig;
    use crate::pref::PreferenceType;

    fn learning_agent() -> Agent {
        Agent::new(AgentConfig {
            chunk_through_evaluation_rules: true,
            ..AgentConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_add_to_cdps_dedups() {
        let mut agent = learning_agent();
        let b = agent.symbols_mut().make_identifier('B', None).unwrap();
        let color = agent.symbols_mut().make_str_constant("color").unwrap();
        let red = agent.symbols_mut().make_str_constant("red").unwrap();
        let slot = agent.make_slot(b, color).unwrap();
        let pref = agent
            .make_preference(PreferenceType::Acceptable, b, color, red, None)
            .unwrap();

        assert!(agent.add_to_cdps(slot, pref).unwrap());
        assert!(!agent.add_to_cdps(slot, pref).unwrap());
        assert_eq!(agent.slot(slot).unwrap().cdps(), &[pref]);
        assert_eq!(agent.preference(pref).unwrap().reference_count(), 2);
    }

    #[test]
    fn test_clear_releases_each_reference_once() {
        let mut agent = learning_agent();
        let b = agent.symbols_mut().make_identifier('B', None).unwrap();
        let color = agent.symbols_mut().make_str_constant("color").unwrap();
        let red = agent.symbols_mut().make_str_constant("red").unwrap();
        let slot = agent.make_slot(b, color).unwrap();
        let pref = agent
            .make_preference(PreferenceType::Best, b, color, red, None)
            .unwrap();
        agent.add_to_cdps(slot, pref).unwrap();

        assert_eq!(agent.clear_cdps(slot).unwrap(), 1);
        assert_eq!(agent.clear_cdps(slot).unwrap(), 0);
        assert_eq!(agent.preference(pref).unwrap().reference_count(), 1);
    }

    #[test]
    fn test_disabled_capability_is_noop() {
        let mut agent = Agent::new(AgentConfig::default()).unwrap();
        let b = agent.symbols_mut().make_identifier('B', None).unwrap();
        let color = agent.symbols_mut().make_str_constant("color").unwrap();
        let red = agent.symbols_mut().make_str_constant("red").unwrap();
        let slot = agent.make_slot(b, color).unwrap();
        let pref = agent
            .make_preference(PreferenceType::Best, b, color, red, None)
            .unwrap();

        assert!(!agent.add_to_cdps(slot, pref).unwrap());
        assert_eq!(agent.clear_cdps(slot).unwrap(), 0);
        assert!(agent.slot(slot).unwrap().cdps().is_empty());
        assert_eq!(agent.preference(pref).unwrap().reference_count(), 1);
    }
}
