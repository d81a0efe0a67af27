// Breakpoint value type

use crate::types::{BreakpointId, SourceLocation};
use serde::Serialize;
use std::sync::Arc;

/// A source location bound to an optional condition.
///
/// Owned by the registry; callers only ever see clones.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
    #[serde(rename = "actor")]
    pub id: BreakpointId,
    pub location: SourceLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Arc<str>>,
    pub enabled: bool,
    pub hit_count: u64,
}

impl Breakpoint {
    pub(crate) fn new(id: BreakpointId, location: SourceLocation, condition: Option<&str>) -> Self {
        Self {
            id,
            location,
            condition: normalize_condition(condition),
            enabled: true,
            hit_count: 0,
        }
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }
}

// A blank condition is the same as no condition
pub(crate) fn normalize_condition(condition: Option<&str>) -> Option<Arc<str>> {
    condition
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(Arc::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_condition_is_unconditional() {
        let bp = Breakpoint::new(BreakpointId(1), SourceLocation::new("a.js", 1), Some("   "));
        assert!(!bp.is_conditional());

        let bp = Breakpoint::new(BreakpointId(2), SourceLocation::new("a.js", 2), Some(" x > 1 "));
        assert_eq!(bp.condition(), Some("x > 1"));
        assert!(bp.enabled);
    }
}
