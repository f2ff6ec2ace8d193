//! Provider configuration built once at startup.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Provider used when no order is configured.
pub const DEFAULT_ORDER: &str = "geonames";

/// Default overall deadline for one walk of the provider chain.
pub const DEFAULT_CHAIN_DEADLINE: Duration = Duration::from_secs(15);

/// Ordered sequence of provider identifiers.
///
/// Parsed from a comma-separated list. Surrounding whitespace is trimmed and
/// empty segments are dropped; duplicates are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderOrder(Vec<String>);

impl ProviderOrder {
    /// Creates an order from identifiers, in priority order.
    #[must_use]
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(Into::into).collect())
    }

    /// Parses a comma-separated list such as `"geonames, openplz"`.
    #[must_use]
    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty()),
        )
    }

    /// Iterates identifiers in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns the number of identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no identifier is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ProviderOrder {
    fn default() -> Self {
        Self::parse(DEFAULT_ORDER)
    }
}

impl FromStr for ProviderOrder {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for ProviderOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

/// Immutable provider configuration.
///
/// Credentials are keyed by their configuration key name (for example
/// `GEONAMES_USERNAME` or `ZIPBASE_TEMPLATE`), case-insensitively.
#[derive(Clone)]
pub struct ProviderSettings {
    /// Fallback order consulted for every request.
    pub order: ProviderOrder,
    /// Deadline for one walk of the chain; `None` disables it.
    pub chain_deadline: Option<Duration>,
    credentials: BTreeMap<String, String>,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("order", &self.order)
            .field("chain_deadline", &self.chain_deadline)
            .field("credentials", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self::new(ProviderOrder::default())
    }
}

impl ProviderSettings {
    /// Creates settings with the given order, the default deadline and no credentials.
    #[must_use]
    pub fn new(order: ProviderOrder) -> Self {
        Self {
            order,
            chain_deadline: Some(DEFAULT_CHAIN_DEADLINE),
            credentials: BTreeMap::new(),
        }
    }

    /// Sets the chain deadline.
    #[must_use]
    pub const fn with_chain_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.chain_deadline = deadline;
        self
    }

    /// Adds one configuration value, such as a template or an API key.
    #[must_use]
    pub fn with_credential(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.credentials
            .insert(key.as_ref().to_uppercase(), value.into());
        self
    }

    /// Adds every configuration value from `credentials`.
    #[must_use]
    pub fn with_credentials<I, K, V>(self, credentials: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        credentials
            .into_iter()
            .fold(self, |settings, (key, value)| settings.with_credential(key, value))
    }

    /// Returns a configuration value. Blank values count as absent.
    #[must_use]
    pub fn credential(&self, key: &str) -> Option<String> {
        self.credentials
            .get(&key.to_uppercase())
            .filter(|value| !value.trim().is_empty())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_trims_and_drops_empty_segments() {
        let order = ProviderOrder::parse(" geonames , ,openplz,, ");
        assert_eq!(order.iter().collect::<Vec<_>>(), vec!["geonames", "openplz"]);
        assert_eq!(order.to_string(), "geonames,openplz");
    }

    #[test]
    fn order_keeps_duplicates() {
        let order = ProviderOrder::parse("zipbase,zipbase");
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn default_order_is_geonames() {
        assert_eq!(ProviderOrder::default(), ProviderOrder::new(["geonames"]));
        assert!(ProviderOrder::parse("").is_empty());
    }

    #[test]
    fn credentials_are_case_insensitive_and_blank_is_absent() {
        let settings = ProviderSettings::default()
            .with_credential("geonames_username", "demo")
            .with_credentials([("ZIPBASE_KEY", "  ")]);

        assert_eq!(settings.credential("GEONAMES_USERNAME").as_deref(), Some("demo"));
        assert!(settings.credential("ZIPBASE_KEY").is_none());
        assert!(settings.credential("OPENPLZ_TEMPLATE").is_none());
    }

    #[test]
    fn debug_hides_credential_values() {
        let settings = ProviderSettings::default().with_credential("ZIPAPI_KEY", "secret_key_12345");
        let debug_str = format!("{settings:?}");
        assert!(debug_str.contains("ZIPAPI_KEY"));
        assert!(!debug_str.contains("secret_key_12345"));
    }
}
