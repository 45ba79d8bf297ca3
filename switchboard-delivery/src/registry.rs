// ABOUTME: Prioritized registry for runtime UI driver selection.
// ABOUTME: Factories are tried in registration order; the first that succeeds wins.

use crate::ui::{NoopDriver, UiDriver, XdotoolDriver};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Concrete UI drivers known to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    Xdotool,
    Noop,
}

impl DriverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xdotool => "xdotool",
            Self::Noop => "noop",
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the configuration asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverPreference {
    /// Try every registered driver in priority order
    #[default]
    Auto,
    Xdotool,
    Noop,
}

impl FromStr for DriverPreference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "xdotool" => Ok(Self::Xdotool),
            "noop" | "none" => Ok(Self::Noop),
            other => Err(anyhow!(
                "Unknown UI driver '{}' (expected auto, xdotool or noop)",
                other
            )),
        }
    }
}

impl DriverPreference {
    fn only(&self) -> Option<DriverKind> {
        match self {
            Self::Auto => None,
            Self::Xdotool => Some(DriverKind::Xdotool),
            Self::Noop => Some(DriverKind::Noop),
        }
    }
}

/// Factory function that builds a driver, failing when its prerequisites are missing
pub type DriverFactory = Box<dyn Fn() -> Result<Arc<dyn UiDriver>> + Send + Sync>;

/// Registry for runtime driver selection
pub struct DriverRegistry {
    factories: Vec<(DriverKind, DriverFactory)>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Append a factory. Earlier registrations have higher priority.
    pub fn register<F>(mut self, kind: DriverKind, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn UiDriver>> + Send + Sync + 'static,
    {
        self.factories.retain(|(k, _)| *k != kind);
        self.factories.push((kind, Box::new(factory)));
        self
    }

    /// Registered kinds in priority order
    pub fn available(&self) -> Vec<DriverKind> {
        self.factories.iter().map(|(k, _)| *k).collect()
    }

    /// Pick a driver for the given preference.
    pub fn select(&self, preference: DriverPreference) -> Result<(DriverKind, Arc<dyn UiDriver>)> {
        let mut failures = Vec::new();
        for (kind, factory) in &self.factories {
            if preference.only().is_some_and(|wanted| wanted != *kind) {
                continue;
            }
            match factory() {
                Ok(driver) => {
                    tracing::info!(driver = %kind, ?preference, "UI driver selected");
                    return Ok((*kind, driver));
                }
                Err(e) => {
                    tracing::debug!(driver = %kind, error = %e, "UI driver unavailable");
                    failures.push(format!("{}: {}", kind, e));
                }
            }
        }
        if failures.is_empty() {
            Err(anyhow!("No UI driver registered for {:?}", preference))
        } else {
            Err(anyhow!("No usable UI driver: {}", failures.join("; ")))
        }
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
            .register(DriverKind::Xdotool, || {
                Ok(Arc::new(XdotoolDriver::detect()?) as Arc<dyn UiDriver>)
            })
            .register(DriverKind::Noop, || Ok(Arc::new(NoopDriver) as Arc<dyn UiDriver>))
    }
}
