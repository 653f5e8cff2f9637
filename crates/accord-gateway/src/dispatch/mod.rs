//! Dispatch routing
//!
//! Routes named dispatch events through the registry handlers, gating
//! everything except GUILD_CREATE behind bootstrap completion. Deferred
//! dispatches replay in arrival order once `ready` has been emitted.

pub mod handlers;
mod registry;

pub use registry::DispatchRegistry;

use accord_cache::CachePool;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::events::{names, EventBus};
use crate::session::{DeferredDispatch, SessionState};

/// What a handler reports back through its completion
#[derive(Debug, Clone)]
pub enum HandlerOutcome {
    /// Emit the event with this value
    Success(Value),
    /// Log a warning; nothing is emitted
    Failure(String),
    /// Non-terminal progress signal; log only
    Notify(Value),
}

/// Registry-driven dispatcher
#[derive(Debug)]
pub struct Dispatcher {
    registry: DispatchRegistry,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: DispatchRegistry) -> Self {
        Self { registry }
    }

    /// Route one dispatch event
    ///
    /// Before `ready`, every event except GUILD_CREATE is queued instead
    /// of executed; GUILD_CREATE is part of bootstrap and runs inline.
    pub fn dispatch(
        &self,
        state: &mut SessionState,
        cache: &dyn CachePool,
        bus: &EventBus,
        name: &str,
        data: Value,
    ) {
        if !self.registry.contains(name) {
            trace!(event = name, "Dispatch not in registry; skipping");
            return;
        }

        if !state.emitted_ready && name != names::GUILD_CREATE {
            trace!(event = name, "Deferring dispatch until ready");
            state.deferred.push_back(DeferredDispatch {
                name: name.to_string(),
                data,
            });
            return;
        }

        self.invoke(state, cache, bus, name, data);
    }

    /// Drain the deferred queue in enqueue order
    ///
    /// Called immediately after `ready` is emitted.
    pub fn drain_deferred(&self, state: &mut SessionState, cache: &dyn CachePool, bus: &EventBus) {
        while let Some(deferred) = state.deferred.pop_front() {
            self.invoke(state, cache, bus, &deferred.name, deferred.data);
        }
    }

    /// Run a handler and act on its outcome
    fn invoke(
        &self,
        state: &mut SessionState,
        cache: &dyn CachePool,
        bus: &EventBus,
        name: &str,
        data: Value,
    ) {
        match handlers::handle(name, state, cache, &data) {
            HandlerOutcome::Success(value) => {
                let snapshot = state.snapshot();
                bus.emit_with_snapshot(name, value.clone(), snapshot);
                for alias in self.registry.aliases(name) {
                    bus.emit(*alias, value.clone());
                }
            }
            HandlerOutcome::Failure(error) => {
                warn!(event = name, error = %error, "Dispatch handler failed");
            }
            HandlerOutcome::Notify(value) => {
                debug!(event = name, data = %value, "Dispatch handler notification");
            }
        }
    }
}
