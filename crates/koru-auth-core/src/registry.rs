//! Scoped provider registry
//!
//! Consumers that cannot be handed an [`AuthProvider`] directly look one up
//! by [`ScopeToken`]. Each registry is independent, so tests never share
//! state through it.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::error::UsageError;
use crate::provider::AuthProvider;
use crate::view::{AuthView, ConfigView};

/// Identifies one mounted provider within a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeToken(u64);

impl ScopeToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: DashMap<ScopeToken, AuthProvider>,
    next_id: AtomicU64,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider and return the token consumers look it up by
    pub fn mount(&self, provider: AuthProvider) -> ScopeToken {
        let token = ScopeToken(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.providers.insert(token, provider);
        token
    }

    /// Remove a provider; its token becomes a usage error
    pub fn unmount(&self, token: &ScopeToken) -> Option<AuthProvider> {
        self.providers.remove(token).map(|(_, provider)| provider)
    }

    /// Get the provider mounted under the token
    pub fn provider(&self, token: &ScopeToken) -> Result<AuthProvider, UsageError> {
        self.providers
            .get(token)
            .map(|p| p.value().clone())
            .ok_or(UsageError { scope: token.0 })
    }

    /// Authorization view for the scope; an unmounted scope is a usage error
    pub fn use_auth(&self, token: &ScopeToken) -> Result<AuthView, UsageError> {
        self.provider(token).map(|p| p.view())
    }

    pub fn use_config(&self, token: &ScopeToken) -> Result<ConfigView, UsageError> {
        self.provider(token).map(|p| p.config_view())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::config::AuthParams;
    use crate::resolver::Resolver;

    fn provider(site: &str) -> AuthProvider {
        AuthProvider::new(
            Resolver::new(CacheStore::default()),
            AuthParams::new(site, "a1", "http://koru.test"),
        )
    }

    #[test]
    fn test_mount_and_lookup() {
        let registry = ProviderRegistry::new();
        let a = registry.mount(provider("s1"));
        let b = registry.mount(provider("s2"));
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.provider(&b).unwrap().params().website_id, "s2");
        assert!(registry.use_auth(&a).unwrap().loading);
        assert!(registry.use_config(&a).unwrap().config.is_none());
    }

    #[test]
    fn test_unmounted_scope_is_usage_error() {
        let registry = ProviderRegistry::new();
        let token = registry.mount(provider("s1"));
        assert!(registry.unmount(&token).is_some());
        assert!(registry.unmount(&token).is_none());

        let err = registry.use_auth(&token).unwrap_err();
        assert_eq!(err, UsageError { scope: token.id() });
        assert!(registry.use_config(&token).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registries_are_independent() {
        let first = ProviderRegistry::new();
        let second = ProviderRegistry::new();
        let token = first.mount(provider("s1"));
        assert!(first.use_auth(&token).is_ok());
        // same numeric id, different registry
        assert!(second.use_auth(&token).is_err());
    }
}
