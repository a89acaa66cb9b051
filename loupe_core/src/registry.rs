//! Provider registry keeps track of the active provider clients.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use loupe_api::ProviderSettings;
use loupe_providers::{ProviderClient, ProviderEndpoints};
use tracing::{info, warn};

use crate::settings::{self, ConfigFailure};
use crate::{Error, Result};

/// One immutable generation of configured providers.
#[derive(Debug, Default)]
pub struct ProviderSet {
    settings: Vec<ProviderSettings>,
    clients: HashMap<String, Arc<ProviderClient>>,
}

impl ProviderSet {
    /// Client registered under `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<ProviderClient>> {
        self.clients.get(id).map(Arc::clone)
    }

    /// Settings this generation was built from, in configuration order.
    #[must_use]
    pub fn settings(&self) -> &[ProviderSettings] {
        &self.settings
    }

    /// Identifiers in configuration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.settings.iter().map(|entry| entry.id.as_str())
    }

    /// Number of configured providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    /// Whether no provider is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

/// Holds the active [`ProviderSet`] and swaps it wholesale on reconfiguration.
///
/// Readers never block: [`ProviderRegistry::resolve`] loads the current
/// generation and clones one client handle out of it. Writers are serialized
/// and either install a complete new generation or leave the old one intact.
pub struct ProviderRegistry {
    current: ArcSwap<ProviderSet>,
    writer: Mutex<()>,
    endpoints: ProviderEndpoints,
}

impl ProviderRegistry {
    /// Create an empty registry whose clients use `endpoints` for transport.
    #[must_use]
    pub fn new(endpoints: ProviderEndpoints) -> Self {
        Self {
            current: ArcSwap::from_pointee(ProviderSet::default()),
            writer: Mutex::new(()),
            endpoints,
        }
    }

    /// Replace the whole provider set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] naming every rejected entry; the
    /// previously active set is kept in that case.
    pub fn configure(&self, settings: Vec<ProviderSettings>) -> Result<()> {
        let _writer = self.writer.lock()?;

        settings::validate(&settings).map_err(|failures| Error::InvalidConfiguration { failures })?;

        let mut clients = HashMap::with_capacity(settings.len());
        let mut failures = Vec::new();
        for entry in &settings {
            match ProviderClient::connect(&entry.module, &self.endpoints) {
                Ok(client) => {
                    clients.insert(entry.id.clone(), Arc::new(client));
                }
                Err(err) => failures.push(ConfigFailure::new(&entry.id, err.to_string())),
            }
        }
        if !failures.is_empty() {
            warn!(rejected = failures.len(), "provider configuration rejected");
            return Err(Error::InvalidConfiguration { failures });
        }

        let ids: Vec<&str> = settings.iter().map(|entry| entry.id.as_str()).collect();
        info!(providers = ?ids, "installing provider set");
        self.current.store(Arc::new(ProviderSet { settings, clients }));
        Ok(())
    }

    /// Client for `id` in the current set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProviderNotFound`] when `id` is not configured right now.
    pub fn resolve(&self, id: &str) -> Result<Arc<ProviderClient>> {
        self.current
            .load()
            .get(id)
            .ok_or_else(|| Error::ProviderNotFound {
                provider: id.to_owned(),
            })
    }

    /// The whole current generation.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ProviderSet> {
        self.current.load_full()
    }

    /// Settings of the current generation.
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderSettings> {
        self.current.load().settings.clone()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current.load();
        let ids: Vec<&str> = current.ids().collect();
        f.debug_struct("ProviderRegistry")
            .field("providers", &ids)
            .finish_non_exhaustive()
    }
}
