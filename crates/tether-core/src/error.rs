//! Error taxonomy for chain construction, accessor lookup, and binding writes.
//!
//! # Failure Modes
//!
//! | Failure | Raised by | Behavior |
//! |---------|-----------|----------|
//! | Malformed chain | [`ChainBuilder`](crate::chain::ChainBuilder) | `Err` before any subscription |
//! | Null intermediate link | Chain observer | Not an error: emissions suspend |
//! | Unreachable write target | Binding write path | Handled per [`UnreachableTargetPolicy`](crate::config::UnreachableTargetPolicy) |
//! | Accessor mismatch | [`AccessorCache`](crate::accessor::AccessorCache) | `Err`; never retried |

use std::fmt;

/// Errors produced while resolving chains, accessors, or bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// A chain expression could not be turned into member-access steps.
    InvalidChain { reason: String },
    /// A chain must have at least one step.
    EmptyChain,
    /// The declaring type exposes no member with this name.
    UnknownMember {
        type_name: &'static str,
        member: String,
    },
    /// Step `index` is declared on a type other than the previous step's value type.
    StepDiscontinuity {
        index: usize,
        expected: &'static str,
        actual: &'static str,
    },
    /// The root object is not an instance of the chain's root type.
    RootTypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    /// Two leaf types that must agree (identity binding, typed stream) do not.
    LeafTypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    /// An accessor was looked up on a type that does not declare it.
    AccessorMismatch {
        type_name: &'static str,
        member: String,
    },
    /// A write was requested through a member without a setter.
    ReadOnlyMember {
        type_name: &'static str,
        member: String,
    },
    /// Combine-latest accepts between 2 and 12 chains.
    ArityOutOfRange { got: usize },
    /// The target's chain has a null link at write time.
    WriteTargetUnreachable { path: String, null_at: usize },
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChain { reason } => write!(f, "invalid chain: {reason}"),
            Self::EmptyChain => write!(f, "chain has no steps"),
            Self::UnknownMember { type_name, member } => {
                write!(f, "type '{type_name}' has no member '{member}'")
            }
            Self::StepDiscontinuity {
                index,
                expected,
                actual,
            } => write!(
                f,
                "step {index} is declared on '{actual}' but the previous step yields '{expected}'"
            ),
            Self::RootTypeMismatch { expected, actual } => {
                write!(f, "root is '{actual}' but the chain starts at '{expected}'")
            }
            Self::LeafTypeMismatch { expected, actual } => {
                write!(f, "leaf type '{actual}' does not match '{expected}'")
            }
            Self::AccessorMismatch { type_name, member } => {
                write!(f, "no accessor for '{type_name}.{member}'")
            }
            Self::ReadOnlyMember { type_name, member } => {
                write!(f, "member '{type_name}.{member}' has no setter")
            }
            Self::ArityOutOfRange { got } => {
                write!(f, "combine-latest takes 2 to 12 chains, got {got}")
            }
            Self::WriteTargetUnreachable { path, null_at } => {
                write!(f, "write target '{path}' is unreachable: link {null_at} is null")
            }
        }
    }
}

impl std::error::Error for ChainError {}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ChainError>;

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl ConfigError {
    pub(crate) fn new(
        field: &'static str,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}
