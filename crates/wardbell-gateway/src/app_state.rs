//! Shared application state for the Wardbell gateway.
//!
//! The registry is constructed here and injected into every handler through
//! axum state; nothing lives in a global.

use std::sync::Arc;

use wardbell_core::error::Result;

use crate::config::GatewayConfig;
use crate::context::{Authenticator, StaticTokens};
use crate::obs::GatewayMetrics;
use crate::realtime::{ConnectionRegistry, ConnectionSettings, Notifier};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    settings: ConnectionSettings,
    registry: Arc<ConnectionRegistry>,
    notifier: Notifier,
    auth: Arc<dyn Authenticator>,
    metrics: Arc<GatewayMetrics>,
}

impl AppState {
    /// Build state with the config's static token table.
    /// Must be called inside a tokio runtime (spawns the broadcast loop).
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let auth = StaticTokens::from_config(&cfg.auth)?;
        if auth.is_empty() {
            tracing::warn!("auth.tokens is empty; every socket handshake will be rejected");
        }
        Ok(Self::with_authenticator(&cfg, Arc::new(auth)))
    }

    pub fn with_authenticator(cfg: &GatewayConfig, auth: Arc<dyn Authenticator>) -> Self {
        let metrics = Arc::new(GatewayMetrics::default());
        let registry = ConnectionRegistry::start(Arc::clone(&metrics));
        let notifier = Notifier::new(Arc::clone(&registry));
        let settings = cfg.connection.settings();

        Self {
            inner: Arc::new(AppStateInner {
                settings,
                registry,
                notifier,
                auth,
                metrics,
            }),
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.inner.settings
    }

    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.inner.auth.as_ref()
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.inner.metrics
    }

    pub fn set_draining(&self) {
        self.inner.metrics.set_draining();
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }

    /// Registry gauges appended to `/metrics`.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        let stats = self.inner.registry.stats();
        vec![
            ("wardbell_registry_users", stats.users as u64),
            ("wardbell_registry_doctors", stats.doctors as u64),
            ("wardbell_registry_admins", stats.admins as u64),
        ]
    }
}
