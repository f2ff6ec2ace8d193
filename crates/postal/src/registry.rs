//! Provider registry: the static catalog of known providers.

use std::fmt;
use std::sync::Arc;

use postal_core::PostalProvider;
use tracing::debug;

use crate::settings::ProviderSettings;

/// How a catalog entry builds its adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdapterKind {
    /// GeoNames, authenticated with a username.
    GeoNames {
        /// Key holding the username.
        username_key: &'static str,
    },
    /// Generic URL-template provider.
    Template {
        /// Key holding the URL template.
        template_key: &'static str,
        /// Key holding the API key, if the provider takes one.
        api_key_key: Option<&'static str>,
    },
}

impl AdapterKind {
    /// Configuration keys the adapter reads.
    #[must_use]
    pub fn config_keys(&self) -> Vec<&'static str> {
        match *self {
            Self::GeoNames { username_key } => vec![username_key],
            Self::Template {
                template_key,
                api_key_key,
            } => std::iter::once(template_key).chain(api_key_key).collect(),
        }
    }
}

/// One entry of the built-in catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Registry identifier.
    pub id: &'static str,
    /// Adapter family and its configuration keys.
    pub kind: AdapterKind,
}

impl CatalogEntry {
    const fn template(
        id: &'static str,
        template_key: &'static str,
        api_key_key: Option<&'static str>,
    ) -> Self {
        Self {
            id,
            kind: AdapterKind::Template {
                template_key,
                api_key_key,
            },
        }
    }
}

/// The built-in providers, in listing order.
pub const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: "geonames",
        kind: AdapterKind::GeoNames {
            username_key: "GEONAMES_USERNAME",
        },
    },
    CatalogEntry::template(
        "postalcodesapp",
        "POSTALCODESAPP_TEMPLATE",
        Some("POSTALCODESAPP_KEY"),
    ),
    CatalogEntry::template("zipcodestack", "ZIPCODESTACK_TEMPLATE", Some("ZIPCODESTACK_KEY")),
    CatalogEntry::template("zipbase", "ZIPBASE_TEMPLATE", Some("ZIPBASE_KEY")),
    CatalogEntry::template("zipapi", "ZIPAPI_TEMPLATE", Some("ZIPAPI_KEY")),
    CatalogEntry::template("openplz", "OPENPLZ_TEMPLATE", None),
];

/// Configuration keys read by every catalog entry, for configuration loaders.
#[must_use]
pub fn catalog_config_keys() -> Vec<&'static str> {
    CATALOG
        .iter()
        .flat_map(|entry| entry.kind.config_keys())
        .collect()
}

/// A registered provider: identifier, adapter, and the configuration it reads.
#[derive(Clone, Debug)]
pub struct ProviderDescriptor {
    id: String,
    required_keys: Vec<&'static str>,
    adapter: Arc<dyn PostalProvider>,
}

impl ProviderDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        required_keys: Vec<&'static str>,
        adapter: Arc<dyn PostalProvider>,
    ) -> Self {
        Self {
            id: id.into(),
            required_keys,
            adapter,
        }
    }

    /// Registry identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Configuration keys this provider reads.
    #[must_use]
    pub fn required_keys(&self) -> &[&'static str] {
        &self.required_keys
    }

    /// The adapter.
    #[must_use]
    pub const fn adapter(&self) -> &Arc<dyn PostalProvider> {
        &self.adapter
    }
}

/// Read-only catalog mapping provider identifiers to adapters.
///
/// Built once at startup, either from [`ProviderSettings`] with
/// [`from_settings`](Self::from_settings) or explicitly with
/// [`with_provider`](Self::with_provider). There is no way to add or remove
/// providers afterwards.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<ProviderDescriptor>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.list())
            .finish()
    }
}

impl ProviderRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the built-in catalog with adapters configured from `settings`.
    ///
    /// All adapters share one HTTP client. Entries whose adapter family is
    /// compiled out are left out of the registry.
    #[must_use]
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        let client = reqwest::Client::new();
        CATALOG.iter().fold(Self::new(), |registry, entry| {
            match build_adapter(entry, settings, &client) {
                Some(adapter) => registry.with_provider(entry.id, entry.kind.config_keys(), adapter),
                None => registry,
            }
        })
    }

    /// Register a provider. Registering an identifier twice keeps the first.
    #[must_use]
    pub fn with_provider(
        mut self,
        id: impl Into<String>,
        required_keys: Vec<&'static str>,
        adapter: Arc<dyn PostalProvider>,
    ) -> Self {
        let descriptor = ProviderDescriptor::new(id, required_keys, adapter);
        if self.resolve(descriptor.id()).is_none() {
            debug!(provider = descriptor.id(), "Registering provider");
            self.providers.push(descriptor);
        }
        self
    }

    /// Registered identifiers, in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        self.providers.iter().map(ProviderDescriptor::id).collect()
    }

    /// Look up a provider by identifier.
    #[must_use]
    pub fn resolve(&self, id: &str) -> Option<&ProviderDescriptor> {
        self.providers.iter().find(|descriptor| descriptor.id() == id)
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[allow(unused_variables)]
fn build_adapter(
    entry: &CatalogEntry,
    settings: &ProviderSettings,
    client: &reqwest::Client,
) -> Option<Arc<dyn PostalProvider>> {
    match entry.kind {
        #[cfg(feature = "geonames")]
        AdapterKind::GeoNames { username_key } => Some(Arc::new(
            postal_geonames::GeoNamesProvider::with_client(
                client.clone(),
                settings.credential(username_key),
            ),
        )),
        #[cfg(feature = "template")]
        AdapterKind::Template {
            template_key,
            api_key_key,
        } => Some(Arc::new(postal_template::TemplateProvider::with_client(
            client.clone(),
            entry.id,
            settings.credential(template_key),
            api_key_key.and_then(|key| settings.credential(key)),
        ))),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}
