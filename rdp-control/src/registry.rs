// Breakpoint registry
//
// Owns every breakpoint of one debuggee, indexed by location and by id.
// Shared between the execution hook (reads) and the command channel (writes);
// each operation holds the lock for exactly its own duration.

use crate::breakpoint::{normalize_condition, Breakpoint};
use crate::protocol::{ControlError, ControlResult};
use crate::types::{BreakpointId, SourceLocation};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct RegistryInner {
    by_location: HashMap<SourceLocation, BreakpointId>,
    by_id: BTreeMap<BreakpointId, Breakpoint>,
    next_id: u64,
}

/// Cloneable handle to a debuggee's breakpoint set
#[derive(Debug, Clone, Default)]
pub struct BreakpointRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl BreakpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation completes before the guard drops, so a poisoned lock
    // still holds consistent state.
    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set a breakpoint at a location.
    ///
    /// Setting again at an occupied location overwrites it: the condition is
    /// replaced, the breakpoint is re-enabled and the existing id is returned.
    pub fn set(&self, location: SourceLocation, condition: Option<&str>) -> BreakpointId {
        let mut inner = self.lock();

        if let Some(&id) = inner.by_location.get(&location) {
            if let Some(bp) = inner.by_id.get_mut(&id) {
                bp.condition = normalize_condition(condition);
                bp.enabled = true;
                info!("Re-armed breakpoint {} at {}", id, location);
                return id;
            }
        }

        inner.next_id += 1;
        let id = BreakpointId(inner.next_id);
        let bp = Breakpoint::new(id, location.clone(), condition);
        info!(
            "Set breakpoint {} at {} (conditional: {})",
            id,
            location,
            bp.is_conditional()
        );
        inner.by_location.insert(location, id);
        inner.by_id.insert(id, bp);
        id
    }

    /// Remove a breakpoint.
    ///
    /// Does not affect a pause the breakpoint already caused.
    pub fn remove(&self, id: BreakpointId) -> ControlResult<Breakpoint> {
        let mut inner = self.lock();
        let bp = inner.by_id.remove(&id).ok_or(ControlError::NotFound(id))?;
        inner.by_location.remove(&bp.location);
        info!("Removed breakpoint {} at {}", id, bp.location);
        Ok(bp)
    }

    /// Find the breakpoint for a reached location.
    ///
    /// An exact (line, column) entry wins over a line-wide entry.
    pub fn lookup(&self, location: &SourceLocation) -> Option<Breakpoint> {
        let inner = self.lock();
        let id = match inner.by_location.get(location) {
            Some(id) => Some(id),
            None if location.column.is_some() => inner.by_location.get(&location.line_wide()),
            None => None,
        }?;
        inner.by_id.get(id).cloned()
    }

    pub fn get(&self, id: BreakpointId) -> ControlResult<Breakpoint> {
        self.lock()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(ControlError::NotFound(id))
    }

    /// Enable or disable a breakpoint, keeping its condition
    pub fn enable(&self, id: BreakpointId, enabled: bool) -> ControlResult<()> {
        let mut inner = self.lock();
        let bp = inner.by_id.get_mut(&id).ok_or(ControlError::NotFound(id))?;
        bp.enabled = enabled;
        debug!("Breakpoint {} enabled={}", id, enabled);
        Ok(())
    }

    pub fn update_condition(&self, id: BreakpointId, condition: Option<&str>) -> ControlResult<()> {
        let mut inner = self.lock();
        let bp = inner.by_id.get_mut(&id).ok_or(ControlError::NotFound(id))?;
        bp.condition = normalize_condition(condition);
        debug!("Breakpoint {} condition={:?}", id, bp.condition);
        Ok(())
    }

    /// Count a pause caused by this breakpoint
    pub fn record_hit(&self, id: BreakpointId) {
        if let Some(bp) = self.lock().by_id.get_mut(&id) {
            bp.hit_count += 1;
        }
    }

    /// All breakpoints, ordered by id
    pub fn list(&self) -> Vec<Breakpoint> {
        self.lock().by_id.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.by_location.clear();
        inner.by_id.clear();
    }
}
