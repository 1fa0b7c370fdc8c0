//! Lifecycle listeners keyed by stage.

use std::collections::HashMap;

use forge_core::Stage;

use crate::error::RunError;
use crate::forge::Forge;

/// Callback invoked when its stage is reached.
pub type Listener = Box<dyn FnMut(&mut Forge) -> Result<(), RunError>>;

/// Registered listeners, run in registration order per stage.
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<Stage, Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, stage: Stage, listener: F)
    where
        F: FnMut(&mut Forge) -> Result<(), RunError> + 'static,
    {
        self.listeners.entry(stage).or_default().push(Box::new(listener));
    }

    pub fn count(&self, stage: Stage) -> usize {
        self.listeners.get(&stage).map_or(0, Vec::len)
    }

    /// Run every listener for `stage`; the first failure stops the rest.
    pub fn emit(&mut self, stage: Stage, forge: &mut Forge) -> Result<(), RunError> {
        let Some(listeners) = self.listeners.get_mut(&stage) else {
            return Ok(());
        };
        tracing::debug!(stage = %stage, listeners = listeners.len(), "emitting stage event");
        for listener in listeners.iter_mut() {
            listener(forge)?;
        }
        Ok(())
    }
}
