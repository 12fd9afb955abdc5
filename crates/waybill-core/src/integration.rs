//! Optional integrations with third-party feature sets.
//!
//! Absence of an integration is a normal state, not an error.

use std::cell::Cell as Flag;

/// A feature an integration may contribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Capability {
    /// Shuttles and landing zones.
    AdvancedTransport,
}

pub trait Integration {
    fn name(&self) -> &str;
    fn provides(&self, capability: Capability) -> bool;
}

/// Integration with a fixed capability set.
#[derive(Debug, Clone)]
pub struct StaticIntegration {
    name: String,
    capabilities: Vec<Capability>,
}

impl StaticIntegration {
    pub fn new(name: impl Into<String>, capabilities: Vec<Capability>) -> Self {
        Self {
            name: name.into(),
            capabilities,
        }
    }
}

impl Integration for StaticIntegration {
    fn name(&self) -> &str {
        &self.name
    }

    fn provides(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Registered integrations.
#[derive(Default)]
pub struct Integrations {
    registered: Vec<Box<dyn Integration>>,
    reported_absent: Flag<bool>,
}

impl Integrations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, integration: Box<dyn Integration>) {
        log::info!("integration registered: {}", integration.name());
        self.registered.push(integration);
    }

    /// Whether any registered integration provides the capability.
    pub fn has(&self, capability: Capability) -> bool {
        if self.registered.is_empty() {
            if !self.reported_absent.replace(true) {
                log::debug!("no integrations registered; {:?} unavailable", capability);
            }
            return false;
        }
        self.registered.iter().any(|i| i.provides(capability))
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }
}
