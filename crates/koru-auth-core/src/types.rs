//! Wire and state types shared across the crate

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Opaque configuration blob attached to an authorization.
///
/// The core never inspects it; consumers decode it with their own schema.
pub type KoruConfig = serde_json::Map<String, serde_json::Value>;

/// Response from the platform's widget authorization endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Whether the app may run on this website
    pub authorized: bool,
    /// App configuration, passed through untouched
    #[serde(default)]
    pub config: KoruConfig,
    /// Credential for platform API calls, passed through unvalidated
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub app: AppInfo,
    #[serde(default)]
    pub website: WebsiteInfo,
    /// Custom data echoed back by the platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<String>,
}

/// App metadata from the platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    /// Unique app identifier
    #[serde(default)]
    pub id: String,
    /// Human-readable app name
    #[serde(default)]
    pub name: String,
    /// App description
    #[serde(default)]
    pub description: String,
}

/// Website metadata from the platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteInfo {
    /// Unique website identifier
    #[serde(default)]
    pub id: String,
    /// Website URL
    #[serde(default)]
    pub url: String,
    /// Whether the website is an e-commerce site
    #[serde(default)]
    pub is_ecommerce: bool,
    /// Customer identifier
    #[serde(default)]
    pub customer: String,
}

/// Persisted form of a cached authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedRecord {
    pub data: AuthResponse,
    /// Unix epoch milliseconds at which the record was written
    pub timestamp: i64,
}

/// Current authorization state of a mounted provider
#[derive(Debug, Clone, Default)]
pub enum ResolutionState {
    /// Initial state, and the state during every resolution attempt
    #[default]
    Loading,
    /// The platform answered; the answer may still be a denial
    Resolved(Arc<AuthResponse>),
    /// Retries were exhausted
    Failed(Arc<AuthError>),
}

impl ResolutionState {
    /// Check if a resolution is in progress
    pub fn is_loading(&self) -> bool {
        matches!(self, ResolutionState::Loading)
    }

    /// Resolved and allowed
    pub fn is_authorized(&self) -> bool {
        matches!(self, ResolutionState::Resolved(r) if r.authorized)
    }

    /// Resolved but not allowed. Distinct from a failed resolution.
    pub fn is_denied(&self) -> bool {
        matches!(self, ResolutionState::Resolved(r) if !r.authorized)
    }

    /// Get the response if resolved, allowed or denied
    pub fn response(&self) -> Option<&Arc<AuthResponse>> {
        match self {
            ResolutionState::Resolved(r) => Some(r),
            _ => None,
        }
    }

    /// Get the terminal error if resolution failed
    pub fn error(&self) -> Option<&Arc<AuthError>> {
        match self {
            ResolutionState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_response() {
        let body = json!({
            "authorized": true,
            "config": {"title": "Shop widget", "limit": 5},
            "token": "tok-123",
            "app": {"id": "a1", "name": "Widget", "description": "A widget"},
            "website": {"id": "s1", "url": "https://shop.example", "is_ecommerce": true, "customer": "c9"},
            "custom_data": "ref=42"
        });

        let parsed: AuthResponse = serde_json::from_value(body).unwrap();
        assert!(parsed.authorized);
        assert_eq!(parsed.token, "tok-123");
        assert_eq!(parsed.config.get("limit"), Some(&json!(5)));
        assert!(parsed.website.is_ecommerce);
        assert_eq!(parsed.custom_data.as_deref(), Some("ref=42"));
    }

    #[test]
    fn test_parse_minimal_response() {
        let parsed: AuthResponse =
            serde_json::from_value(json!({"authorized": false})).unwrap();
        assert!(!parsed.authorized);
        assert!(parsed.config.is_empty());
        assert_eq!(parsed.app, AppInfo::default());
    }

    #[test]
    fn test_missing_authorized_is_rejected() {
        assert!(serde_json::from_value::<AuthResponse>(json!({"token": "T"})).is_err());
    }

    #[test]
    fn test_denied_is_not_failed() {
        let denied = ResolutionState::Resolved(Arc::new(
            serde_json::from_value(json!({"authorized": false})).unwrap(),
        ));
        assert!(denied.is_denied());
        assert!(!denied.is_authorized());
        assert!(denied.error().is_none());
        assert!(!ResolutionState::Loading.is_denied());
    }
}
