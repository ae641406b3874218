//! Component health tracking for `/healthz` and `/readyz`
//!
//! The service is ready once an artifact bundle is installed. Chat never
//! makes the service unhealthy; an unavailable provider only degrades it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Component names for health tracking
pub mod components {
    /// Artifact bundle resolution (cache load, training, reload)
    pub const ARTIFACTS: &str = "artifacts";
    pub const PREDICTOR: &str = "predictor";
    pub const CHAT: &str = "chat";
}

/// Ordered from best to worst, so the overall status is the maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Serving with reduced capability (e.g. chat unavailable)
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        *self != ComponentStatus::Unhealthy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Unix seconds of the last status change
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthResponse {
    fn from_components(components: BTreeMap<String, ComponentHealth>) -> Self {
        let status = components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        Self { status, components }
    }

    /// Names of components in the given state, in name order
    pub fn components_with(&self, status: ComponentStatus) -> Vec<&str> {
        self.components
            .iter()
            .filter(|(_, c)| c.status == status)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct HealthState {
    components: BTreeMap<String, ComponentHealth>,
    bundle_installed: bool,
}

/// Shared, cloneable view of component health and readiness
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a component, starting healthy
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    /// Replace a component's health; unknown names are registered on the fly
    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.state
            .write()
            .await
            .components
            .insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Flip readiness once the predictor holds a bundle
    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.bundle_installed = ready;
    }

    /// Current status of one component, `None` if never registered
    pub async fn status_of(&self, name: &str) -> Option<ComponentStatus> {
        self.state
            .read()
            .await
            .components
            .get(name)
            .map(|c| c.status)
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.state.read().await.components.clone();
        HealthResponse::from_components(components)
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let (installed, health) = {
            let state = self.state.read().await;
            (
                state.bundle_installed,
                HealthResponse::from_components(state.components.clone()),
            )
        };

        let reason = if !installed {
            Some("Artifact bundle not yet installed".to_string())
        } else if health.status == ComponentStatus::Unhealthy {
            let failing = health.components_with(ComponentStatus::Unhealthy);
            Some(format!("Unhealthy components: {}", failing.join(", ")))
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering() {
        assert!(ComponentStatus::Healthy < ComponentStatus::Degraded);
        assert!(ComponentStatus::Degraded < ComponentStatus::Unhealthy);
        assert!(ComponentStatus::Degraded.is_operational());
    }

    #[tokio::test]
    async fn test_empty_registry_is_healthy_but_not_ready() {
        let registry = HealthRegistry::new();

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("Artifact bundle not yet installed")
        );
    }

    #[tokio::test]
    async fn test_chat_unavailable_only_degrades() {
        let registry = HealthRegistry::new();
        registry.register(components::ARTIFACTS).await;
        registry.register(components::PREDICTOR).await;
        registry
            .set_degraded(components::CHAT, "Chat service is unavailable")
            .await;
        registry.set_ready(true).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(health.components_with(ComponentStatus::Degraded), ["chat"]);
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_failed_artifacts_make_service_unhealthy() {
        let registry = HealthRegistry::new();
        registry.register(components::PREDICTOR).await;
        registry
            .set_unhealthy(components::ARTIFACTS, "dataset not found")
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert_eq!(
            health.components[components::ARTIFACTS].message.as_deref(),
            Some("dataset not found")
        );
    }

    #[tokio::test]
    async fn test_readiness_names_unhealthy_components() {
        let registry = HealthRegistry::new();
        registry.register(components::CHAT).await;
        registry.set_ready(true).await;
        registry.set_unhealthy(components::PREDICTOR, "poisoned").await;
        registry.set_unhealthy(components::ARTIFACTS, "corrupt").await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("Unhealthy components: artifacts, predictor")
        );
    }

    #[tokio::test]
    async fn test_recovery_restores_readiness() {
        let registry = HealthRegistry::new();
        registry.set_ready(true).await;
        registry
            .set_degraded(components::ARTIFACTS, "last reload failed")
            .await;
        assert!(registry.readiness().await.ready);

        registry.set_healthy(components::ARTIFACTS).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
        assert_eq!(
            registry.status_of(components::ARTIFACTS).await,
            Some(ComponentStatus::Healthy)
        );
        assert_eq!(registry.status_of(components::CHAT).await, None);
    }
}
