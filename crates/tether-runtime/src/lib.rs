#![forbid(unsafe_code)]

//! Runtime: live chain observation, combine-latest, and bindings.
//!
//! # Role in tether
//! `tether-runtime` turns a root object and a [`PropertyChain`] into a live
//! stream of the chain's leaf value, and drives one-way and two-way bindings
//! from those streams.
//!
//! # Primary responsibilities
//! - **Observation**: [`ChainObserver`] and its per-level [`ChainSubscription`].
//! - **Combination**: [`CombineLatest`] over 2 to 12 chains.
//! - **Binding**: [`OneWayBind`], [`TwoWayBind`], [`BindingHandle`].
//! - **Plumbing**: [`Stream`], [`Subscription`], [`Scheduler`].
//!
//! # Architecture
//! Everything here is single-threaded (`Rc`/`RefCell`/`Cell`) and
//! synchronous: a change notification is handled on the caller's stack,
//! including any rebinding and binding writes it causes. A [`Scheduler`] is
//! the only way to defer delivery. The [`AccessorCache`] passed in is the one
//! piece of state that may be shared across threads.
//!
//! # Invariants
//! 1. Disposing any subscription or binding handle unregisters every change
//!    handler it holds, even if one of the teardowns panics.
//! 2. Nothing is delivered to a sink after its subscription is disposed.
//!
//! [`PropertyChain`]: tether_core::PropertyChain
//! [`AccessorCache`]: tether_core::AccessorCache

pub mod binding;
pub mod combine;
pub mod observer;
pub mod scheduler;
pub mod stream;
pub mod subscription;

pub use binding::{BindingHandle, BindingStats, Converter, OneWayBind, TwoWayBind, converter};
pub use combine::CombineLatest;
pub use observer::{ChainObserver, ChainSubscription};
pub use scheduler::{ImmediateScheduler, QueueScheduler, Scheduler, Task};
pub use stream::{Sink, Stream};
pub use subscription::{CompositeSubscription, Subscription};
