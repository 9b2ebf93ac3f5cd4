#![forbid(unsafe_code)]

//! Observe nested property chains on change-notifying objects and bind them
//! together.
//!
//! # Role in tether
//! `tether` is the public facade. A [`Tether`] owns the shared
//! [`AccessorCache`] and the [`TetherConfig`], and hands out typed streams and
//! binding builders backed by `tether-runtime`.
//!
//! # Example
//!
//! ```ignore
//! use tether::prelude::*;
//!
//! let tether = Tether::new();
//! let chain = tether.chain::<Person>("address.city")?;
//! let sub = tether
//!     .when_changed::<_, String>(&person, &chain)?
//!     .subscribe(|city| println!("now in {city}"));
//!
//! let handle = tether
//!     .bind(&form, &tether.chain::<Form>("city")?, &person, &chain)
//!     .bind()?;
//! ```
//!
//! # Crate layout
//! - `tether-core`: values, accessors, chains, errors, config.
//! - `tether-runtime`: observers, combine-latest, bindings, schedulers.
//! - `tether` (this crate): [`Tether`] and the [`prelude`].

use std::rc::Rc;
use std::sync::Arc;

pub use tether_core::{
    Accessor, AccessorCache, ChainBuilder, ChainError, ChainStep, ChainValue, ConfigError,
    HandlerToken, NotifyPropertyChanged, PropertyChain, PropertyChangedEvent,
    PropertyChangedHandler, PropertyHost, Result, TetherConfig, TypeKey,
    UnreachableTargetPolicy, Value, leaf_value,
};
pub use tether_runtime::{
    BindingHandle, BindingStats, ChainObserver, ChainSubscription, CombineLatest,
    CompositeSubscription, Converter, ImmediateScheduler, OneWayBind, QueueScheduler, Scheduler,
    Stream, Subscription, TwoWayBind, converter,
};

#[cfg(feature = "tracing-json")]
pub use tether_core::logging::init_json_subscriber;

/// Engine object: one accessor cache plus configuration.
///
/// Cloning shares the cache.
#[derive(Debug, Clone, Default)]
pub struct Tether {
    cache: Arc<AccessorCache>,
    config: TetherConfig,
}

macro_rules! when_changed_n {
    ($(#[$doc:meta])* $name:ident => $($T:ident $chain:ident $idx:tt),+) => {
        $(#[$doc])*
        #[allow(clippy::too_many_arguments)]
        pub fn $name<H, $($T,)+ R, F>(
            &self,
            root: &Rc<H>,
            $($chain: &PropertyChain,)+
            f: F,
        ) -> Result<Stream<R>>
        where
            H: PropertyHost,
            $($T: ChainValue,)+
            R: 'static,
            F: Fn($($T),+) -> R + 'static,
        {
            $(check_leaf::<$T>($chain)?;)+
            self.combine(root, &[$($chain.clone()),+], move |values: &[Value]| {
                Some(f($($T::from_value(&values[$idx])?),+))
            })
        }
    };
}

impl Tether {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration from `TETHER_*` environment variables. Unparseable
    /// values are logged at `warn` and replaced by their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let parsed = TetherConfig::from_env_with_diagnostics();
        for err in &parsed.errors {
            tracing::warn!(field = err.field, value = %err.value, "{}", err.message);
        }
        Self::with_config(parsed.config)
    }

    #[must_use]
    pub fn with_config(config: TetherConfig) -> Self {
        tracing::debug!(config = %config.summary_short(), "tether configured");
        Self {
            cache: Arc::default(),
            config,
        }
    }

    /// Share an existing cache, e.g. between engines with different configs.
    #[must_use]
    pub fn with_cache(cache: Arc<AccessorCache>, config: TetherConfig) -> Self {
        Self { cache, config }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<AccessorCache> {
        &self.cache
    }

    #[must_use]
    pub fn config(&self) -> &TetherConfig {
        &self.config
    }

    /// Resolve a dotted member path rooted at `H`.
    pub fn chain<H: PropertyHost>(&self, path: &str) -> Result<PropertyChain> {
        PropertyChain::from_path::<H>(path)
    }

    /// Untyped leaf stream. A null link suspends it; the leaf itself may be
    /// [`Value::Null`].
    pub fn when_changed_value<H: PropertyHost>(
        &self,
        root: &Rc<H>,
        chain: &PropertyChain,
    ) -> Result<Stream<Value>> {
        Ok(self.observer(root, chain)?.stream())
    }

    /// Typed leaf stream. `T` must be the chain's leaf type; use `Option<T>`
    /// to also receive null leaves.
    pub fn when_changed<H, T>(&self, root: &Rc<H>, chain: &PropertyChain) -> Result<Stream<T>>
    where
        H: PropertyHost,
        T: ChainValue,
    {
        check_leaf::<T>(chain)?;
        Ok(self
            .observer(root, chain)?
            .stream()
            .filter_map(|value| T::from_value(&value)))
    }

    /// Combine-latest over 2 to 12 chains through an untyped projection.
    pub fn combine_latest<H, R>(
        &self,
        root: &Rc<H>,
        chains: &[PropertyChain],
        f: impl Fn(&[Value]) -> R + 'static,
    ) -> Result<Stream<R>>
    where
        H: PropertyHost,
        R: 'static,
    {
        self.combine(root, chains, move |values| Some(f(values)))
    }

    when_changed_n!(
        /// Combine two typed chains.
        when_changed2 => T1 c1 0, T2 c2 1
    );
    when_changed_n!(when_changed3 => T1 c1 0, T2 c2 1, T3 c3 2);
    when_changed_n!(when_changed4 => T1 c1 0, T2 c2 1, T3 c3 2, T4 c4 3);
    when_changed_n!(when_changed5 => T1 c1 0, T2 c2 1, T3 c3 2, T4 c4 3, T5 c5 4);
    when_changed_n!(when_changed6 => T1 c1 0, T2 c2 1, T3 c3 2, T4 c4 3, T5 c5 4, T6 c6 5);
    when_changed_n!(
        when_changed7 => T1 c1 0, T2 c2 1, T3 c3 2, T4 c4 3, T5 c5 4, T6 c6 5, T7 c7 6
    );
    when_changed_n!(
        when_changed8 => T1 c1 0, T2 c2 1, T3 c3 2, T4 c4 3, T5 c5 4, T6 c6 5, T7 c7 6,
        T8 c8 7
    );
    when_changed_n!(
        when_changed9 => T1 c1 0, T2 c2 1, T3 c3 2, T4 c4 3, T5 c5 4, T6 c6 5, T7 c7 6,
        T8 c8 7, T9 c9 8
    );
    when_changed_n!(
        when_changed10 => T1 c1 0, T2 c2 1, T3 c3 2, T4 c4 3, T5 c5 4, T6 c6 5, T7 c7 6,
        T8 c8 7, T9 c9 8, T10 c10 9
    );
    when_changed_n!(
        when_changed11 => T1 c1 0, T2 c2 1, T3 c3 2, T4 c4 3, T5 c5 4, T6 c6 5, T7 c7 6,
        T8 c8 7, T9 c9 8, T10 c10 9, T11 c11 10
    );
    when_changed_n!(
        /// Combine twelve typed chains, the largest supported arity.
        when_changed12 => T1 c1 0, T2 c2 1, T3 c3 2, T4 c4 3, T5 c5 4, T6 c6 5, T7 c7 6,
        T8 c8 7, T9 c9 8, T10 c10 9, T11 c11 10, T12 c12 11
    );

    /// Two-way binding builder. Configured with this engine's config; the
    /// host's value wins at bind time.
    pub fn bind<H, G>(
        &self,
        host: &Rc<H>,
        host_chain: &PropertyChain,
        target: &Rc<G>,
        target_chain: &PropertyChain,
    ) -> TwoWayBind<'_>
    where
        H: PropertyHost,
        G: PropertyHost,
    {
        TwoWayBind::new(
            &self.cache,
            Value::node(Rc::clone(host)),
            host_chain,
            Value::node(Rc::clone(target)),
            target_chain,
        )
        .with_config(self.config.clone())
    }

    /// One-way (host to target) binding builder.
    pub fn one_way_bind<H, G>(
        &self,
        host: &Rc<H>,
        host_chain: &PropertyChain,
        target: &Rc<G>,
        target_chain: &PropertyChain,
    ) -> OneWayBind<'_>
    where
        H: PropertyHost,
        G: PropertyHost,
    {
        OneWayBind::new(
            &self.cache,
            Value::node(Rc::clone(host)),
            host_chain,
            Value::node(Rc::clone(target)),
            target_chain,
        )
        .with_config(self.config.clone())
    }

    fn observer<H: PropertyHost>(&self, root: &Rc<H>, chain: &PropertyChain) -> Result<ChainObserver> {
        check_root::<H>(chain)?;
        Ok(
            ChainObserver::new(&self.cache, Value::node(Rc::clone(root)), chain)?
                .with_trace(self.config.trace_emissions),
        )
    }

    fn combine<H, R>(
        &self,
        root: &Rc<H>,
        chains: &[PropertyChain],
        project: impl Fn(&[Value]) -> Option<R> + 'static,
    ) -> Result<Stream<R>>
    where
        H: PropertyHost,
        R: 'static,
    {
        for chain in chains {
            check_root::<H>(chain)?;
        }
        Ok(
            CombineLatest::new(&self.cache, Value::node(Rc::clone(root)), chains, project)?
                .with_trace(self.config.trace_emissions)
                .stream(),
        )
    }
}

fn check_root<H: PropertyHost>(chain: &PropertyChain) -> Result<()> {
    if chain.root_type() == TypeKey::host::<H>() {
        Ok(())
    } else {
        Err(ChainError::RootTypeMismatch {
            expected: chain.root_type().name(),
            actual: std::any::type_name::<H>(),
        })
    }
}

fn check_leaf<T: ChainValue>(chain: &PropertyChain) -> Result<()> {
    if chain.leaf_type() == T::type_key() {
        Ok(())
    } else {
        Err(ChainError::LeafTypeMismatch {
            expected: chain.leaf_type().name(),
            actual: T::type_key().name(),
        })
    }
}

/// Everything needed to declare host types and observe or bind them.
pub mod prelude {
    pub use crate::{
        Accessor, BindingHandle, ChainValue, NotifyPropertyChanged, PropertyChain,
        PropertyChangedEvent, PropertyHost, Stream, Subscription, Tether, TetherConfig, Value,
        converter,
    };
}
