// Controller configuration

use serde::{Deserialize, Serialize};

/// What to do when a breakpoint condition throws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionErrorPolicy {
    /// Treat the breakpoint as not hit and keep running silently
    #[default]
    Skip,
    /// Pause and report the error with a `breakpointConditionThrown` reason
    Pause,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControllerConfig {
    pub pause_on_exceptions: bool,
    pub condition_errors: ConditionErrorPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: ControllerConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.pause_on_exceptions);
        assert_eq!(config.condition_errors, ConditionErrorPolicy::Skip);

        let config: ControllerConfig =
            serde_json::from_str(r#"{"conditionErrors":"pause","pauseOnExceptions":true}"#)
                .unwrap();
        assert!(config.pause_on_exceptions);
        assert_eq!(config.condition_errors, ConditionErrorPolicy::Pause);
    }
}
