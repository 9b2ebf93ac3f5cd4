//! Resolved property chains.
//!
//! A [`PropertyChain`] is the validated, ordered list of [`ChainStep`]s from a
//! root type to a leaf. It is immutable and cheap to clone, so one chain can
//! be built per shape and shared by every observer of that shape.
//!
//! # Invariants
//!
//! 1. A chain has at least one step.
//! 2. `steps[i].value_type == steps[i + 1].declaring_type`.
//! 3. Every step's declaring type is a host type exposing that member.

use std::fmt;
use std::sync::Arc;

use crate::accessor::PropertyHost;
use crate::error::{ChainError, Result};
use crate::value::TypeKey;

/// One member access: `declaring_type.member -> value_type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainStep {
    member: String,
    declaring: TypeKey,
    value_type: TypeKey,
}

impl ChainStep {
    #[must_use]
    pub fn new(member: impl Into<String>, declaring: TypeKey, value_type: TypeKey) -> Self {
        Self {
            member: member.into(),
            declaring,
            value_type,
        }
    }

    #[must_use]
    pub fn member(&self) -> &str {
        &self.member
    }

    #[must_use]
    pub fn declaring_type(&self) -> TypeKey {
        self.declaring
    }

    #[must_use]
    pub fn value_type(&self) -> TypeKey {
        self.value_type
    }
}

/// An immutable, validated chain of member accesses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyChain {
    steps: Arc<[ChainStep]>,
}

impl PropertyChain {
    /// Start building a chain rooted at `R`.
    #[must_use]
    pub fn builder<R: PropertyHost>() -> ChainBuilder {
        ChainBuilder::new(TypeKey::host::<R>())
    }

    /// Resolve a dotted member path such as `"child.value"` against `R`.
    pub fn from_path<R: PropertyHost>(path: &str) -> Result<Self> {
        let mut builder = Self::builder::<R>();
        for segment in path.split('.') {
            let segment = segment.trim();
            if segment.is_empty() {
                return Err(ChainError::InvalidChain {
                    reason: format!("empty segment in '{path}'"),
                });
            }
            builder = builder.member(segment);
        }
        builder.build()
    }

    /// Validate steps produced by an external resolver.
    pub fn from_steps(steps: Vec<ChainStep>) -> Result<Self> {
        let first = steps.first().ok_or(ChainError::EmptyChain)?;
        if !first.declaring.is_host() {
            return Err(ChainError::InvalidChain {
                reason: format!("root type '{}' exposes no members", first.declaring.name()),
            });
        }
        for (index, pair) in steps.windows(2).enumerate() {
            if pair[0].value_type != pair[1].declaring {
                return Err(ChainError::StepDiscontinuity {
                    index: index + 1,
                    expected: pair[0].value_type.name(),
                    actual: pair[1].declaring.name(),
                });
            }
        }
        for step in &steps {
            let accessor =
                step.declaring
                    .resolve(&step.member)
                    .ok_or_else(|| ChainError::UnknownMember {
                        type_name: step.declaring.name(),
                        member: step.member.clone(),
                    })?;
            if accessor.value_type() != step.value_type {
                return Err(ChainError::InvalidChain {
                    reason: format!(
                        "'{}.{}' yields '{}', not '{}'",
                        step.declaring.name(),
                        step.member,
                        accessor.value_type().name(),
                        step.value_type.name()
                    ),
                });
            }
        }
        Ok(Self {
            steps: steps.into(),
        })
    }

    #[must_use]
    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn root_type(&self) -> TypeKey {
        self.steps[0].declaring
    }

    #[must_use]
    pub fn leaf_type(&self) -> TypeKey {
        self.leaf_step().value_type
    }

    #[must_use]
    pub fn leaf_step(&self) -> &ChainStep {
        &self.steps[self.steps.len() - 1]
    }

    /// Every step except the last: the walk to the leaf's parent object.
    #[must_use]
    pub fn parent_steps(&self) -> &[ChainStep] {
        &self.steps[..self.steps.len() - 1]
    }

    /// Dotted member path, e.g. `"child.value"`.
    #[must_use]
    pub fn path(&self) -> String {
        self.steps
            .iter()
            .map(ChainStep::member)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for PropertyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", short_name(self.root_type().name()), self.path())
    }
}

fn short_name(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

/// Step-by-step chain construction. The first error is kept and reported by
/// [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    current: TypeKey,
    steps: Vec<ChainStep>,
    error: Option<ChainError>,
}

impl ChainBuilder {
    #[must_use]
    pub fn new(root: TypeKey) -> Self {
        Self {
            current: root,
            steps: Vec::new(),
            error: None,
        }
    }

    /// Append an access of `name` on the current type.
    #[must_use]
    pub fn member(mut self, name: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.current.resolve(name) {
            Some(accessor) => {
                let value_type = accessor.value_type();
                self.steps
                    .push(ChainStep::new(name, self.current, value_type));
                self.current = value_type;
            }
            None => {
                self.error = Some(ChainError::UnknownMember {
                    type_name: self.current.name(),
                    member: name.to_owned(),
                });
            }
        }
        self
    }

    pub fn build(self) -> Result<PropertyChain> {
        if let Some(err) = self.error {
            return Err(err);
        }
        PropertyChain::from_steps(self.steps)
    }
}
