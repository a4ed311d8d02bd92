use crate::domain::money::Currency;
use crate::error::Result;

/// Payment settings handed to the orchestrator at construction.
///
/// Deliberately a plain value: provider selection is wired where the
/// orchestrator is built, not read from ambient global state.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Name of the provider used when a request does not pick one. `None`
    /// falls back to the first registered provider.
    pub default_provider: Option<String>,
    pub default_currency: Currency,
    pub supported_currencies: Vec<Currency>,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            default_provider: None,
            default_currency: Currency::USD,
            supported_currencies: vec![
                Currency::USD,
                Currency::EUR,
                Currency::GBP,
                Currency::CAD,
            ],
        }
    }
}

impl PaymentConfig {
    /// Reads the configuration from environment variables, falling back to
    /// the defaults above. `PAYMENT_SUPPORTED_CURRENCIES` is a
    /// comma-separated list of ISO 4217 codes.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let default_provider = std::env::var("PAYMENT_DEFAULT_PROVIDER")
            .ok()
            .filter(|s| !s.is_empty());
        let default_currency = match std::env::var("PAYMENT_DEFAULT_CURRENCY") {
            Ok(code) => Currency::parse(&code)?,
            Err(_) => defaults.default_currency,
        };
        let mut supported_currencies = match std::env::var("PAYMENT_SUPPORTED_CURRENCIES") {
            Ok(list) => list
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(Currency::parse)
                .collect::<Result<Vec<_>>>()?,
            Err(_) => defaults.supported_currencies,
        };
        if !supported_currencies.contains(&default_currency) {
            supported_currencies.push(default_currency);
        }

        Ok(Self {
            default_provider,
            default_currency,
            supported_currencies,
        })
    }

    pub fn supports(&self, currency: Currency) -> bool {
        self.supported_currencies.contains(&currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PaymentConfig::default();
        assert_eq!(config.default_currency, Currency::USD);
        assert!(config.supports(Currency::USD));
        assert!(config.supports(Currency::EUR));
        assert!(!config.supports(Currency::parse("JPY").unwrap()));
        assert!(config.default_provider.is_none());
    }
}
