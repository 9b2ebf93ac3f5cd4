#![forbid(unsafe_code)]

//! Core: values, change notification, accessors, and property chains.
//!
//! # Role in tether
//! `tether-core` defines what a chain is made of. It owns the dynamic
//! [`Value`] model, the [`NotifyPropertyChanged`] capability host objects
//! expose, the memoizing [`AccessorCache`], and validated [`PropertyChain`]s.
//!
//! # Primary responsibilities
//! - **Value model**: [`Value`], [`ChainValue`], [`TypeKey`].
//! - **Notification**: [`NotifyPropertyChanged`], [`PropertyChangedEvent`].
//! - **Accessors**: [`Accessor`], [`PropertyHost`], [`AccessorCache`].
//! - **Chains**: [`ChainStep`], [`PropertyChain`], [`ChainBuilder`].
//! - **Ambient**: [`ChainError`], [`TetherConfig`], `logging`.
//!
//! # How it fits in the system
//! The runtime (`tether-runtime`) turns a root object plus a `PropertyChain`
//! into a live stream and drives bindings from it. Nothing in this crate
//! subscribes to anything; it only describes chains and how to read and write
//! their members.

pub mod accessor;
pub mod chain;
pub mod config;
pub mod error;
pub mod logging;
pub mod notify;
pub mod value;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};

pub use accessor::{Accessor, AccessorCache, Getter, PropertyHost, Setter};
pub use chain::{ChainBuilder, ChainStep, PropertyChain};
pub use config::{TetherConfig, TetherConfigParse, UnreachableTargetPolicy};
pub use error::{ChainError, ConfigError, Result};
pub use notify::{
    AsAny, HandlerToken, NotifyPropertyChanged, PropertyChangedEvent, PropertyChangedHandler,
};
pub use value::{ChainValue, MemberTable, TypeKey, Value};
