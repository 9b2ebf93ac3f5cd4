//! Engine configuration.
//!
//! Environment variables:
//! - `TETHER_REENTRANCY_GUARD` (bool)
//! - `TETHER_UNREACHABLE_TARGET` = skip|panic
//! - `TETHER_TRACE_EMISSIONS` (bool)

use std::env;
use std::fmt;

use crate::error::ConfigError;

const ENV_REENTRANCY_GUARD: &str = "TETHER_REENTRANCY_GUARD";
const ENV_UNREACHABLE_TARGET: &str = "TETHER_UNREACHABLE_TARGET";
const ENV_TRACE_EMISSIONS: &str = "TETHER_TRACE_EMISSIONS";

/// What a binding does when the target's intermediate link is null at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnreachableTargetPolicy {
    /// Drop the write, log at `warn`, and count it in the binding stats.
    #[default]
    Skip,
    /// Panic with [`ChainError::WriteTargetUnreachable`](crate::error::ChainError).
    Panic,
}

impl UnreachableTargetPolicy {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" => Some(Self::Skip),
            "panic" => Some(Self::Panic),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Panic => "panic",
        }
    }
}

impl fmt::Display for UnreachableTargetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime knobs shared by observers and binding sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TetherConfig {
    /// Two-way sessions drop emissions that arrive while they are applying a write.
    ///
    /// This includes the emission of a target setter that normalizes what it
    /// is given (clamping, trimming): the normalized value is not copied back,
    /// and the two sides keep different values until one of them changes
    /// again. Turn the guard off for such targets; the echo then settles
    /// through the hosts' "unchanged value is not re-announced" convention.
    pub reentrancy_guard: bool,
    /// Behavior for null intermediate links on the write path.
    pub unreachable_target: UnreachableTargetPolicy,
    /// Log every leaf emission at `trace`.
    pub trace_emissions: bool,
}

impl Default for TetherConfig {
    fn default() -> Self {
        Self {
            reentrancy_guard: true,
            unreachable_target: UnreachableTargetPolicy::Skip,
            trace_emissions: false,
        }
    }
}

/// Configuration parse diagnostics (env + validation).
#[derive(Debug, Clone)]
pub struct TetherConfigParse {
    pub config: TetherConfig,
    pub errors: Vec<ConfigError>,
}

impl TetherConfig {
    #[must_use]
    pub fn with_reentrancy_guard(mut self, enabled: bool) -> Self {
        self.reentrancy_guard = enabled;
        self
    }

    #[must_use]
    pub fn with_unreachable_target(mut self, policy: UnreachableTargetPolicy) -> Self {
        self.unreachable_target = policy;
        self
    }

    #[must_use]
    pub fn with_trace_emissions(mut self, enabled: bool) -> Self {
        self.trace_emissions = enabled;
        self
    }

    /// Parse config from environment variables.
    #[must_use]
    pub fn from_env() -> TetherConfig {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> TetherConfigParse {
        from_env_with(|key| env::var(key).ok())
    }

    /// Short human-readable summary for logs.
    #[must_use]
    pub fn summary_short(&self) -> String {
        let guard = if self.reentrancy_guard { "on" } else { "off" };
        format!(
            "guard={guard} unreachable={} trace={}",
            self.unreachable_target, self.trace_emissions
        )
    }
}

/// Build a config from an arbitrary key lookup. Unparseable values keep the
/// default and are reported in [`TetherConfigParse::errors`].
pub fn from_env_with<F>(mut get: F) -> TetherConfigParse
where
    F: FnMut(&str) -> Option<String>,
{
    let mut config = TetherConfig::default();
    let mut errors = Vec::new();

    if let Some(value) = get(ENV_REENTRANCY_GUARD) {
        match parse_bool(&value) {
            Some(parsed) => config.reentrancy_guard = parsed,
            None => errors.push(ConfigError::new(
                "reentrancy_guard",
                value,
                "expected bool (1/0/true/false)",
            )),
        }
    }

    if let Some(value) = get(ENV_UNREACHABLE_TARGET) {
        match UnreachableTargetPolicy::parse(&value) {
            Some(parsed) => config.unreachable_target = parsed,
            None => errors.push(ConfigError::new(
                "unreachable_target",
                value,
                "expected skip|panic",
            )),
        }
    }

    if let Some(value) = get(ENV_TRACE_EMISSIONS) {
        match parse_bool(&value) {
            Some(parsed) => config.trace_emissions = parsed,
            None => errors.push(ConfigError::new(
                "trace_emissions",
                value,
                "expected bool (1/0/true/false)",
            )),
        }
    }

    TetherConfigParse { config, errors }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(pairs: &[(&str, &str)]) -> TetherConfigParse {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        from_env_with(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let parsed = parse(&[]);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.config, TetherConfig::default());
        assert!(parsed.config.reentrancy_guard);
        assert_eq!(parsed.config.unreachable_target, UnreachableTargetPolicy::Skip);
    }

    #[test]
    fn reads_all_fields() {
        let parsed = parse(&[
            (ENV_REENTRANCY_GUARD, "off"),
            (ENV_UNREACHABLE_TARGET, "PANIC"),
            (ENV_TRACE_EMISSIONS, "1"),
        ]);
        assert!(parsed.errors.is_empty());
        assert!(!parsed.config.reentrancy_guard);
        assert_eq!(parsed.config.unreachable_target, UnreachableTargetPolicy::Panic);
        assert!(parsed.config.trace_emissions);
    }

    #[test]
    fn bad_values_keep_defaults_and_report() {
        let parsed = parse(&[
            (ENV_REENTRANCY_GUARD, "sometimes"),
            (ENV_UNREACHABLE_TARGET, "queue"),
        ]);
        assert_eq!(parsed.errors.len(), 2);
        assert_eq!(parsed.errors[0].field, "reentrancy_guard");
        assert_eq!(parsed.errors[1].field, "unreachable_target");
        assert_eq!(parsed.config, TetherConfig::default());
    }

    #[test]
    fn builder_and_summary() {
        let config = TetherConfig::default()
            .with_reentrancy_guard(false)
            .with_unreachable_target(UnreachableTargetPolicy::Panic)
            .with_trace_emissions(true);
        assert_eq!(
            config.summary_short(),
            "guard=off unreachable=panic trace=true"
        );
    }
}
