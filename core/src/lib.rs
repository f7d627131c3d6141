//! # Bedspace Core
//!
//! Core traits and types shared by every Bedspace crate.
//!
//! The occupancy engine is written as a set of reducers. A reducer validates a
//! command against the current state, applies the resulting fact to that state,
//! and returns descriptions of the side effects that should follow (journal
//! appends, tenant/owner notifications). The engine executes those
//! descriptions; reducers never perform I/O themselves.
//!
//! ## Core Concepts
//!
//! - **State**: everything a reducer needs to validate a command
//! - **Action**: the commands a reducer accepts
//! - **Reducer**: `(State, Action, Environment) → Effects`
//! - **Effect**: a side effect description (not its execution)
//! - **Environment**: injected collaborators (clock, notifier)
//!
//! ## Example
//!
//! ```ignore
//! impl Reducer for BookingReducer {
//!     type State = OccupancyState;
//!     type Action = BookingAction;
//!     type Environment = OccupancyEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut OccupancyState,
//!         action: BookingAction,
//!         env: &OccupancyEnvironment,
//!     ) -> SmallVec<[Effect; 4]> {
//!         // validate, apply, describe effects
//!         SmallVec::new()
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod event;
pub mod event_log;
pub mod stream;

pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

/// Reducer module - the trait every business component implements.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// A command handler over shared state
    ///
    /// A reducer is deterministic given its state, action and environment.
    /// Validation failures are recorded in the state (the engine reads them
    /// back under the same lock) rather than returned, so a reducer call is a
    /// single uninterrupted unit of work.
    pub trait Reducer {
        /// State read and written
        type State;

        /// Commands accepted
        type Action;

        /// Injected collaborators
        type Environment;

        /// Validates `action`, updates `state`, and describes follow-up work
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect; 4]>;
    }
}

/// Effect module - side effect descriptions returned by reducers.
pub mod effect {
    use crate::event::SerializedEvent;
    use std::future::Future;
    use std::pin::Pin;

    /// Boxed fire-and-forget future carried by [`Effect::Future`].
    pub type EffectFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

    /// Work a reducer asks the engine to do after a state change
    ///
    /// Effects are NOT executed by the reducer. The engine walks them after
    /// the reducer returns: [`Effect::Append`] entries are forwarded to the
    /// event journal in emission order, [`Effect::Future`] entries are
    /// spawned and never block the caller.
    pub enum Effect {
        /// No-op effect
        None,

        /// Independent effects
        Parallel(Vec<Effect>),

        /// Effects in order
        Sequential(Vec<Effect>),

        /// Append a committed fact to the event journal
        Append(SerializedEvent),

        /// Arbitrary async side effect whose failure is handled internally
        Future(EffectFuture),
    }

    impl std::fmt::Debug for Effect {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Append(event) => f
                    .debug_tuple("Effect::Append")
                    .field(&event.event_type)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl Effect {
        /// Groups independent effects
        #[must_use]
        pub const fn merge(effects: Vec<Effect>) -> Effect {
            Effect::Parallel(effects)
        }

        /// Groups effects whose order matters
        #[must_use]
        pub const fn chain(effects: Vec<Effect>) -> Effect {
            Effect::Sequential(effects)
        }

        /// Wrap an async block as a fire-and-forget effect
        #[must_use]
        pub fn future<F>(future: F) -> Effect
        where
            F: Future<Output = ()> + Send + 'static,
        {
            Effect::Future(Box::pin(future))
        }

        /// Journal entries contained in this effect, in emission order.
        #[must_use]
        pub fn appended_events(&self) -> Vec<&SerializedEvent> {
            match self {
                Effect::Append(event) => vec![event],
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    effects.iter().flat_map(Effect::appended_events).collect()
                },
                Effect::None | Effect::Future(_) => Vec::new(),
            }
        }
    }
}

/// Environment module - dependency injection traits
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Source of "now" for timestamps and the review gate
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by [`Utc::now`].
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
