use crate::domain::donation::PaymentMethod;
use crate::error::{Error, Result};
use crate::payment::PaymentProvider;
use serde_json::Value;
use std::sync::Arc;

/// Registry of payment providers.
///
/// Registration order matters: the first registered provider is the default
/// until an explicit default is configured. The registry is a plain value
/// handed to the orchestrator at construction; there is no process-wide
/// instance.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn PaymentProvider>>,
    default_name: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn PaymentProvider>) {
        self.providers.push(provider);
    }

    /// Marks a registered provider as the default.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if self.get(name).is_none() {
            return Err(Error::ValidationError(format!(
                "Unknown payment provider: {name}"
            )));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PaymentProvider>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    /// The configured default, or the first registered provider.
    pub fn default_provider(&self) -> Option<Arc<dyn PaymentProvider>> {
        match &self.default_name {
            Some(name) => self.get(name),
            None => self.providers.first().cloned(),
        }
    }

    /// Resolves the requested provider by name, or falls back to the default.
    pub fn resolve(&self, name: Option<&str>) -> Option<Arc<dyn PaymentProvider>> {
        match name {
            Some(name) => self.get(name),
            None => self.default_provider(),
        }
    }

    /// Maps a transaction id back to the provider whose id shape it matches.
    ///
    /// Compatibility fallback for rows settled before the provider name was
    /// recorded alongside the transaction id. New code reads
    /// [`crate::domain::donation::Donation::settled_provider`] instead; id
    /// prefixes are a formatting detail, not a routing contract.
    pub fn resolve_for_transaction(&self, transaction_id: &str) -> Option<Arc<dyn PaymentProvider>> {
        self.providers
            .iter()
            .find(|p| p.verify_payment(transaction_id, &Value::Null).valid)
            .cloned()
    }

    /// Name and supported methods of every registered provider.
    pub fn available(&self) -> Vec<(&'static str, &[PaymentMethod])> {
        self.providers
            .iter()
            .map(|p| (p.name(), p.supported_methods()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
