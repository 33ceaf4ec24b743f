//! Process-wide, read-only catalogue of screen definitions.

use crate::errors::EngineError;
use crate::screen::{Screen, ScreenOrder};
use std::collections::HashMap;
use tracing::warn;

/// Append-only registry keyed by screen name. Loaded once at process
/// start; safe for concurrent reads by unrelated batches.
#[derive(Debug, Default)]
pub struct ScreenRegistry {
    screens: HashMap<String, Screen>,
}

impl ScreenRegistry {
    pub fn new() -> ScreenRegistry {
        ScreenRegistry::default()
    }

    pub fn register(&mut self, screen: Screen) -> &mut ScreenRegistry {
        if self
            .screens
            .insert(screen.name.clone(), screen.clone())
            .is_some()
        {
            warn!(
                screen = %screen.name,
                "duplicate screen registration; later definition overrides earlier"
            );
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Screen> {
        self.screens.get(name)
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    /// Every screen a sequence references must exist; a dangling name is
    /// a configuration error caught before any GUI work starts.
    pub fn validate_sequence(&self, sequence: &[ScreenOrder]) -> Result<(), EngineError> {
        for order in sequence {
            if !self.screens.contains_key(&order.name) {
                return Err(EngineError::Configuration(format!(
                    "no screen mapping registered for '{}'",
                    order.name
                )));
            }
        }
        Ok(())
    }
}

impl FromIterator<Screen> for ScreenRegistry {
    fn from_iter<I: IntoIterator<Item = Screen>>(iter: I) -> ScreenRegistry {
        let mut registry = ScreenRegistry::new();
        for screen in iter {
            registry.register(screen);
        }
        registry
    }
}
