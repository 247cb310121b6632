//! koru-auth-core: Authorization client for the Koru platform
//!
//! Answers "is this website/app installation authorized, and with which
//! configuration?" by asking the platform once, caching the answer, and
//! publishing it to consumers.
//!
//! # Features
//!
//! - **Cache**: one timestamped record per (website, app), in memory or on disk
//! - **Retry**: exponential backoff around the platform call
//! - **Provider**: Loading / Resolved / Failed state with reload and supersession
//! - **Gating**: three-way loading / fallback / content decision
//!
//! # Example
//!
//! ```rust,ignore
//! use koru_auth_core::prelude::*;
//!
//! let resolver = Resolver::new(CacheStore::new(FileStore::new(".koru-cache")));
//! let params = AuthParams::new("site-id", "app-id", "https://app.koru.com");
//!
//! let (provider, task) = AuthProvider::mount(resolver, params);
//! task.await?;
//!
//! let view = provider.view();
//! match gate(&provider.state()) {
//!     Gate::Loading => println!("Checking authorization..."),
//!     Gate::Fallback => println!("Not authorized"),
//!     Gate::Content => println!("Token: {:?}", view.token),
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod retry;
pub mod types;
pub mod view;

// Re-export public types
pub use cache::{cache_key, CacheStore, FileStore, KeyValueStore, MemoryStore};
pub use config::{AuthParams, KoruOptions, ProviderConfig};
pub use error::{AuthError, CacheError, UsageError};
pub use provider::AuthProvider;
pub use registry::{ProviderRegistry, ScopeToken};
pub use resolver::{AuthMetrics, AuthRequest, Authority, HttpAuthority, NoopMetrics, Resolver};
pub use retry::RetryPolicy;
pub use types::{AppInfo, AuthResponse, CachedRecord, KoruConfig, ResolutionState, WebsiteInfo};
pub use view::{gate, AuthView, ConfigView, Gate};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cache::{CacheStore, FileStore, MemoryStore};
    pub use crate::config::{AuthParams, KoruOptions, ProviderConfig};
    pub use crate::provider::AuthProvider;
    pub use crate::registry::{ProviderRegistry, ScopeToken};
    pub use crate::resolver::Resolver;
    pub use crate::types::{AuthResponse, ResolutionState};
    pub use crate::view::{gate, AuthView, ConfigView, Gate};
}
