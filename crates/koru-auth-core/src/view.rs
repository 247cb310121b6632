//! Consumer-facing projections of a [`ResolutionState`]

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::AuthError;
use crate::types::{AuthResponse, KoruConfig, ResolutionState};

/// Everything a consumer needs to gate on an authorization
#[derive(Debug, Clone)]
pub struct AuthView {
    pub is_authorized: bool,
    pub loading: bool,
    pub error: Option<Arc<AuthError>>,
    pub auth_data: Option<Arc<AuthResponse>>,
    pub token: Option<String>,
    pub config: Option<KoruConfig>,
}

impl AuthView {
    pub fn from_state(state: &ResolutionState) -> Self {
        let auth_data = state.response().cloned();
        Self {
            is_authorized: state.is_authorized(),
            loading: state.is_loading(),
            error: state.error().cloned(),
            token: auth_data.as_ref().map(|d| d.token.clone()),
            config: auth_data.as_ref().map(|d| d.config.clone()),
            auth_data,
        }
    }
}

/// Configuration-only projection
#[derive(Debug, Clone)]
pub struct ConfigView {
    pub config: Option<KoruConfig>,
    pub loading: bool,
    pub error: Option<Arc<AuthError>>,
}

impl ConfigView {
    pub fn from_state(state: &ResolutionState) -> Self {
        Self {
            config: state.response().map(|d| d.config.clone()),
            loading: state.is_loading(),
            error: state.error().cloned(),
        }
    }

    /// Decode the opaque config with the caller's schema.
    ///
    /// `Ok(None)` while there is no resolved config.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.config
            .as_ref()
            .map(|c| serde_json::from_value(serde_json::Value::Object(c.clone())))
            .transpose()
    }
}

/// Which branch gated content should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Loading,
    /// Failed, or resolved but not authorized
    Fallback,
    Content,
}

impl Gate {
    /// Pick one of three values by branch
    pub fn select<T>(self, loading: T, fallback: T, content: T) -> T {
        match self {
            Gate::Loading => loading,
            Gate::Fallback => fallback,
            Gate::Content => content,
        }
    }

    /// Like [`select`](Self::select) but only builds the chosen branch
    pub fn select_with<T>(
        self,
        loading: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
        content: impl FnOnce() -> T,
    ) -> T {
        match self {
            Gate::Loading => loading(),
            Gate::Fallback => fallback(),
            Gate::Content => content(),
        }
    }
}

/// Decide the branch for a state: loading while resolving, content only
/// when resolved and authorized, fallback otherwise
pub fn gate(state: &ResolutionState) -> Gate {
    match state {
        ResolutionState::Loading => Gate::Loading,
        ResolutionState::Resolved(r) if r.authorized => Gate::Content,
        ResolutionState::Resolved(_) | ResolutionState::Failed(_) => Gate::Fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn resolved(body: serde_json::Value) -> ResolutionState {
        ResolutionState::Resolved(Arc::new(serde_json::from_value(body).unwrap()))
    }

    fn failed() -> ResolutionState {
        ResolutionState::Failed(Arc::new(AuthError::Status {
            status: 502,
            status_text: "Bad Gateway".to_string(),
        }))
    }

    #[test]
    fn test_gate_branches() {
        assert_eq!(gate(&ResolutionState::Loading), Gate::Loading);
        assert_eq!(gate(&resolved(json!({"authorized": true}))), Gate::Content);
        assert_eq!(gate(&resolved(json!({"authorized": false}))), Gate::Fallback);
        assert_eq!(gate(&failed()), Gate::Fallback);
    }

    #[test]
    fn test_gate_select() {
        let pick = |state: ResolutionState| gate(&state).select("Loading...", "Not authorized", "app");
        assert_eq!(pick(ResolutionState::Loading), "Loading...");
        assert_eq!(pick(failed()), "Not authorized");
        assert_eq!(pick(resolved(json!({"authorized": true}))), "app");

        let built = gate(&ResolutionState::Loading).select_with(
            || "spinner".to_string(),
            || "fallback".to_string(),
            || "content".to_string(),
        );
        assert_eq!(built, "spinner");
    }

    #[test]
    fn test_auth_view_projection() {
        let view = AuthView::from_state(&resolved(json!({
            "authorized": true,
            "token": "T",
            "config": {"x": 1}
        })));
        assert!(view.is_authorized);
        assert!(!view.loading);
        assert_eq!(view.token.as_deref(), Some("T"));
        assert_eq!(view.config.unwrap().get("x"), Some(&json!(1)));
        assert!(view.error.is_none());

        let loading = AuthView::from_state(&ResolutionState::Loading);
        assert!(loading.loading);
        assert!(!loading.is_authorized);
        assert!(loading.token.is_none());
        assert!(loading.auth_data.is_none());

        let failed = AuthView::from_state(&failed());
        assert!(!failed.loading);
        assert_eq!(failed.error.unwrap().status(), Some(502));
        assert!(failed.auth_data.is_none());
    }

    #[test]
    fn test_denied_view_keeps_data() {
        let view = AuthView::from_state(&resolved(json!({"authorized": false, "token": "T"})));
        assert!(!view.is_authorized);
        assert!(view.error.is_none());
        assert!(view.auth_data.is_some());
    }

    #[test]
    fn test_config_view_decode() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct WidgetConfig {
            title: String,
            #[serde(rename = "apiUrl")]
            api_url: String,
        }

        let view = ConfigView::from_state(&resolved(json!({
            "authorized": true,
            "config": {"title": "Deals", "apiUrl": "https://api.example"}
        })));
        let decoded: WidgetConfig = view.decode().unwrap().unwrap();
        assert_eq!(decoded.title, "Deals");
        assert_eq!(decoded.api_url, "https://api.example");

        let pending = ConfigView::from_state(&ResolutionState::Loading);
        assert!(pending.decode::<WidgetConfig>().unwrap().is_none());

        let wrong = ConfigView::from_state(&resolved(json!({"authorized": true, "config": {}})));
        assert!(wrong.decode::<WidgetConfig>().is_err());
    }
}
