//! Dynamically typed values flowing through property chains.
//!
//! Chains mix host objects (which raise change notifications and expose
//! members) with plain leaf values. [`Value`] carries either, or `Null` for an
//! absent link. [`ChainValue`] converts between Rust types and `Value`, and
//! [`TypeKey`] identifies the static type a chain step declares.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::accessor::{Accessor, PropertyHost};
use crate::notify::{AsAny, NotifyPropertyChanged};

/// Member lookup for a host type.
pub type MemberTable = fn(&str) -> Option<Accessor>;

/// Static type identity of a chain step's declaring or value type.
///
/// Equality and hashing use the `TypeId` only.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
    members: Option<MemberTable>,
}

impl TypeKey {
    /// Key for a type that only ever appears as a leaf.
    #[must_use]
    pub fn leaf<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            members: None,
        }
    }

    /// Key for a host type, carrying its member table.
    #[must_use]
    pub fn host<H: PropertyHost>() -> Self {
        Self {
            id: TypeId::of::<H>(),
            name: std::any::type_name::<H>(),
            members: Some(H::property),
        }
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this type exposes members (can appear as a non-leaf link).
    #[must_use]
    pub fn is_host(&self) -> bool {
        self.members.is_some()
    }

    /// Look up a member accessor declared on this type.
    #[must_use]
    pub fn resolve(&self, member: &str) -> Option<Accessor> {
        self.members.and_then(|table| table(member))
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeKey").field(&self.name).finish()
    }
}

/// A value at some position in a chain.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent link. Observers suspend below a null link.
    #[default]
    Null,
    /// A change-notifying host object.
    Node(Rc<dyn NotifyPropertyChanged>),
    /// Any other value.
    Leaf(Rc<dyn Any>),
}

impl Value {
    #[must_use]
    pub fn leaf<T: Any>(value: T) -> Self {
        Value::Leaf(Rc::new(value))
    }

    #[must_use]
    pub fn node<H: NotifyPropertyChanged>(node: Rc<H>) -> Self {
        Value::Node(node)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The notification capability, if this is a host object.
    #[must_use]
    pub fn as_notifier(&self) -> Option<&Rc<dyn NotifyPropertyChanged>> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    /// The concrete object behind this value, for downcasting.
    #[must_use]
    pub fn as_any(&self) -> Option<&dyn Any> {
        match self {
            Value::Null => None,
            // Explicit deref: `Rc<dyn ..>` is itself `Any`.
            Value::Node(node) => Some(AsAny::as_any(&**node)),
            Value::Leaf(leaf) => Some(&**leaf),
        }
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().and_then(|any| any.downcast_ref::<T>())
    }

    /// Recover a shared handle to a host object of type `H`.
    #[must_use]
    pub fn downcast_node<H: Any>(&self) -> Option<Rc<H>> {
        match self {
            Value::Node(node) => AsAny::into_any_rc(Rc::clone(node)).downcast::<H>().ok(),
            _ => None,
        }
    }

    /// Identity comparison: same allocation, or both null.
    #[must_use]
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Node(a), Value::Node(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            (Value::Leaf(a), Value::Leaf(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Node(node) => write!(f, "Node({:p})", Rc::as_ptr(node)),
            Value::Leaf(_) => f.write_str("Leaf(..)"),
        }
    }
}

/// Conversion between a Rust type and [`Value`].
pub trait ChainValue: Sized + 'static {
    fn type_key() -> TypeKey;
    fn into_value(self) -> Value;
    fn from_value(value: &Value) -> Option<Self>;
}

/// Implement [`ChainValue`] for `Clone` leaf types.
///
/// ```ignore
/// #[derive(Clone)]
/// struct Celsius(f64);
/// tether_core::leaf_value!(Celsius);
/// ```
#[macro_export]
macro_rules! leaf_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::value::ChainValue for $ty {
                fn type_key() -> $crate::value::TypeKey {
                    $crate::value::TypeKey::leaf::<$ty>()
                }

                fn into_value(self) -> $crate::value::Value {
                    $crate::value::Value::leaf(self)
                }

                fn from_value(value: &$crate::value::Value) -> Option<Self> {
                    value.downcast_ref::<$ty>().cloned()
                }
            }
        )+
    };
}

leaf_value!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, (),
);

impl<H: PropertyHost> ChainValue for Rc<H> {
    fn type_key() -> TypeKey {
        TypeKey::host::<H>()
    }

    fn into_value(self) -> Value {
        Value::Node(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.downcast_node::<H>()
    }
}

impl<T: ChainValue> ChainValue for Option<T> {
    fn type_key() -> TypeKey {
        T::type_key()
    }

    fn into_value(self) -> Value {
        match self {
            Some(inner) => inner.into_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        if value.is_null() {
            Some(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}
