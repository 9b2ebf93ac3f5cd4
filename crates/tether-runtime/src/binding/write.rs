#![forbid(unsafe_code)]

//! Write side of a binding: walk to the leaf's parent, then set.

use std::any::Any;
use std::rc::Rc;
use std::sync::Arc;

use tether_core::{
    Accessor, AccessorCache, ChainError, PropertyChain, Result, UnreachableTargetPolicy, Value,
};

use super::StatsCell;

pub(crate) struct TargetWriter {
    target: Value,
    parents: Vec<Arc<Accessor>>,
    leaf: Arc<Accessor>,
    path: Rc<str>,
    policy: UnreachableTargetPolicy,
    stats: Rc<StatsCell>,
}

impl TargetWriter {
    pub(crate) fn new(
        cache: &AccessorCache,
        target: Value,
        chain: &PropertyChain,
        policy: UnreachableTargetPolicy,
        stats: Rc<StatsCell>,
    ) -> Result<Self> {
        let root = chain.root_type();
        if let Some(any) = target.as_any() {
            if Any::type_id(any) != root.id() {
                return Err(ChainError::RootTypeMismatch {
                    expected: root.name(),
                    actual: "an instance of another type",
                });
            }
        }
        let parents = chain
            .parent_steps()
            .iter()
            .map(|step| cache.accessor(&step.declaring_type(), step.member()))
            .collect::<Result<Vec<_>>>()?;
        let leaf_step = chain.leaf_step();
        let leaf = cache.accessor(&leaf_step.declaring_type(), leaf_step.member())?;
        if !leaf.is_writable() {
            return Err(ChainError::ReadOnlyMember {
                type_name: leaf_step.declaring_type().name(),
                member: leaf_step.member().to_owned(),
            });
        }
        Ok(Self {
            target,
            parents,
            leaf,
            path: chain.to_string().into(),
            policy,
            stats,
        })
    }

    /// The object owning the leaf, walked from the target now.
    fn resolve_parent(&self) -> Result<Value> {
        let mut current = self.target.clone();
        for (index, accessor) in self.parents.iter().enumerate() {
            if current.is_null() {
                return Err(self.unreachable(index));
            }
            current = accessor.get(&current).unwrap_or_default();
        }
        if current.is_null() {
            return Err(self.unreachable(self.parents.len()));
        }
        Ok(current)
    }

    fn unreachable(&self, null_at: usize) -> ChainError {
        ChainError::WriteTargetUnreachable {
            path: self.path.to_string(),
            null_at,
        }
    }

    /// Assign `value` to the target's leaf.
    ///
    /// # Panics
    ///
    /// Panics when the target is unreachable and the policy is
    /// [`UnreachableTargetPolicy::Panic`].
    pub(crate) fn write(&self, value: &Value) {
        let parent = match self.resolve_parent() {
            Ok(parent) => parent,
            Err(err) => {
                match self.policy {
                    UnreachableTargetPolicy::Skip => {
                        self.stats.record_skipped();
                        tracing::warn!(target_chain = %self.path, error = %err, "binding write skipped");
                    }
                    UnreachableTargetPolicy::Panic => panic!("{err}"),
                }
                return;
            }
        };
        if self.leaf.set(&parent, value) {
            self.stats.record_applied();
            tracing::trace!(target_chain = %self.path, value = ?value, "binding write");
        } else {
            self.stats.record_skipped();
            tracing::warn!(target_chain = %self.path, value = ?value, "binding write rejected by setter");
        }
    }
}
