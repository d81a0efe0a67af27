// Breakpoint condition evaluation
//
// Conditions run in the debuggee's live scope. Whatever happens inside them
// (thrown values, syntax errors, panics in the sandbox) is caught here and
// reported as `ConditionOutcome::Threw`.

use crate::debuggee::{EvalError, ExecutionContext};
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::debug;

/// Condition threw or failed to parse
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[error("{message}")]
pub struct ConditionEvaluationError {
    pub message: String,
}

impl From<EvalError> for ConditionEvaluationError {
    fn from(err: EvalError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionOutcome {
    True,
    False,
    Threw(ConditionEvaluationError),
}

impl ConditionOutcome {
    pub fn is_true(&self) -> bool {
        matches!(self, ConditionOutcome::True)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a breakpoint condition; `None` means unconditional
    pub fn evaluate(
        &self,
        condition: Option<&str>,
        context: &mut dyn ExecutionContext,
    ) -> ConditionOutcome {
        let Some(condition) = condition.map(str::trim).filter(|c| !c.is_empty()) else {
            return ConditionOutcome::True;
        };

        // A panicking sandbox is responsible for its own scope invariants.
        let result = panic::catch_unwind(AssertUnwindSafe(|| context.evaluate(condition)));

        let outcome = match result {
            Ok(Ok(value)) if value.is_truthy() => ConditionOutcome::True,
            Ok(Ok(_)) => ConditionOutcome::False,
            Ok(Err(err)) => ConditionOutcome::Threw(err.into()),
            Err(payload) => ConditionOutcome::Threw(ConditionEvaluationError {
                message: format!("evaluation panicked: {}", panic_message(payload.as_ref())),
            }),
        };

        debug!("Condition {:?} -> {:?}", condition, outcome);
        outcome
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
