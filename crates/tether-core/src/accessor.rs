//! Member accessors and the shared accessor cache.
//!
//! An [`Accessor`] is the get/set capability for one member of one host type.
//! Host types publish their members through [`PropertyHost::property`]; the
//! [`AccessorCache`] memoizes the result per `(declaring type, member)` so the
//! lookup cost is paid once for the lifetime of the cache.
//!
//! # Invariants
//!
//! 1. Concurrent lookups of the same key return the same `Arc<Accessor>`.
//! 2. Entries are never evicted.
//! 3. A cached accessor's declaring type and member equal its key.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{ChainError, Result};
use crate::notify::NotifyPropertyChanged;
use crate::value::{ChainValue, TypeKey, Value};

/// Reads a member from an instance of the declaring type. `None` means the
/// instance was not of that type.
pub type Getter = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;

/// Writes a member. Returns `false` if the instance or value had the wrong type.
pub type Setter = Arc<dyn Fn(&dyn Any, &Value) -> bool + Send + Sync>;

/// A change-notifying type that exposes named members to chains.
///
/// ```ignore
/// impl PropertyHost for Person {
///     fn property(name: &str) -> Option<Accessor> {
///         match name {
///             "name" => Some(Accessor::read_write("name", Person::name, Person::set_name)),
///             "age" => Some(Accessor::read_only("age", Person::age)),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait PropertyHost: NotifyPropertyChanged + Sized {
    fn property(name: &str) -> Option<Accessor>;
}

/// Get/set capability for one member of one host type.
#[derive(Clone)]
pub struct Accessor {
    member: &'static str,
    declaring: TypeKey,
    value_type: TypeKey,
    getter: Getter,
    setter: Option<Setter>,
}

impl Accessor {
    /// Accessor for a readable and writable member.
    pub fn read_write<H, V, G, S>(member: &'static str, get: G, set: S) -> Self
    where
        H: PropertyHost,
        V: ChainValue,
        G: Fn(&H) -> V + Send + Sync + 'static,
        S: Fn(&H, V) + Send + Sync + 'static,
    {
        let setter: Setter = Arc::new(move |any: &dyn Any, value: &Value| {
            match (any.downcast_ref::<H>(), V::from_value(value)) {
                (Some(host), Some(value)) => {
                    set(host, value);
                    true
                }
                _ => false,
            }
        });
        Self {
            setter: Some(setter),
            ..Self::read_only(member, get)
        }
    }

    /// Accessor for a member without a setter.
    pub fn read_only<H, V, G>(member: &'static str, get: G) -> Self
    where
        H: PropertyHost,
        V: ChainValue,
        G: Fn(&H) -> V + Send + Sync + 'static,
    {
        let getter: Getter = Arc::new(move |any: &dyn Any| {
            any.downcast_ref::<H>().map(|host| get(host).into_value())
        });
        Self {
            member,
            declaring: TypeKey::host::<H>(),
            value_type: V::type_key(),
            getter,
            setter: None,
        }
    }

    #[must_use]
    pub fn member(&self) -> &'static str {
        self.member
    }

    #[must_use]
    pub fn declaring_type(&self) -> TypeKey {
        self.declaring
    }

    #[must_use]
    pub fn value_type(&self) -> TypeKey {
        self.value_type
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    #[must_use]
    pub fn getter(&self) -> &Getter {
        &self.getter
    }

    #[must_use]
    pub fn setter(&self) -> Option<&Setter> {
        self.setter.as_ref()
    }

    /// Read this member from `parent`. `None` if `parent` is null or of
    /// another type.
    #[must_use]
    pub fn get(&self, parent: &Value) -> Option<Value> {
        parent.as_any().and_then(|any| (self.getter)(any))
    }

    /// Write `value` into this member of `parent`.
    pub fn set(&self, parent: &Value, value: &Value) -> bool {
        match (&self.setter, parent.as_any()) {
            (Some(setter), Some(any)) => setter(any, value),
            _ => false,
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("member", &self.member)
            .field("declaring", &self.declaring)
            .field("value_type", &self.value_type)
            .field("writable", &self.is_writable())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AccessorKey {
    declaring: TypeKey,
    member: String,
}

/// Memoized accessors keyed by `(declaring type, member name)`.
///
/// Pass one cache (usually behind an `Arc`) to every observer and binding
/// that should share lookups.
#[derive(Default)]
pub struct AccessorCache {
    entries: RwLock<HashMap<AccessorKey, Arc<Accessor>>>,
    misses: AtomicU64,
}

impl fmt::Debug for AccessorCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorCache")
            .field("len", &self.len())
            .field("misses", &self.miss_count())
            .finish()
    }
}

impl AccessorCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the accessor for `declaring.member`.
    pub fn accessor(&self, declaring: &TypeKey, member: &str) -> Result<Arc<Accessor>> {
        let key = AccessorKey {
            declaring: *declaring,
            member: member.to_owned(),
        };

        // The map only grows, so a poisoned lock still holds consistent entries.
        if let Some(found) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(found));
        }

        let resolved = declaring
            .resolve(member)
            .filter(|acc| acc.declaring == *declaring && acc.member == member)
            .ok_or_else(|| ChainError::AccessorMismatch {
                type_name: declaring.name(),
                member: member.to_owned(),
            })?;

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(key).or_insert_with(|| {
            self.misses.fetch_add(1, Ordering::Relaxed);
            #[cfg(feature = "tracing")]
            tracing::debug!(
                declaring = declaring.name(),
                member,
                "accessor cache miss"
            );
            Arc::new(resolved)
        });
        Ok(Arc::clone(entry))
    }

    pub fn getter(&self, declaring: &TypeKey, member: &str) -> Result<Getter> {
        Ok(Arc::clone(self.accessor(declaring, member)?.getter()))
    }

    pub fn setter(&self, declaring: &TypeKey, member: &str) -> Result<Setter> {
        let accessor = self.accessor(declaring, member)?;
        accessor
            .setter()
            .cloned()
            .ok_or_else(|| ChainError::ReadOnlyMember {
                type_name: declaring.name(),
                member: member.to_owned(),
            })
    }

    /// Number of cached accessors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of accessors created (one per distinct key).
    #[must_use]
    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
