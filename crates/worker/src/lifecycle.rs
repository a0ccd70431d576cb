use std::sync::Arc;

use client::{AdminApi, GhostClient};
use ghostwatch_core::config::Settings;
use ghostwatch_core::error::{CredentialError, CycleError};
use ghostwatch_core::push::{self, MalformedPayload, Notification};
use ghostwatch_core::types::{Registration, Snapshot};
use nanoid::nanoid;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::coordinator::{Coordinator, Status};
use crate::jobs::refresh;
use crate::webhooks;

const NOTIFICATION_CAPACITY: usize = 64;
const REDACTED: &str = "**REDACTED**";

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid admin api key: {0}")]
    Credential(#[from] CredentialError),
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("ghost is not ready: {0}")]
    NotReady(String),
}

/// Failure to replace the admin key.
#[derive(Debug, Error)]
pub enum ReauthError {
    /// The replacement key is malformed. The current instance is handed
    /// back untouched.
    #[error("invalid admin api key: {error}")]
    Rejected {
        integration: Box<Integration>,
        error: CredentialError,
    },
    /// The old instance was torn down but the new one failed to load.
    #[error(transparent)]
    Setup(#[from] SetupError),
}

impl ReauthError {
    /// The instance that is still loaded, if any.
    pub fn into_integration(self) -> Option<Integration> {
        match self {
            ReauthError::Rejected { integration, .. } => Some(*integration),
            ReauthError::Setup(_) => None,
        }
    }
}

impl From<CycleError> for SetupError {
    fn from(err: CycleError) -> Self {
        match err {
            CycleError::AuthFailed(message) => SetupError::AuthFailed(message),
            CycleError::Transient(message) => SetupError::NotReady(message),
        }
    }
}

/// Runtime state of one loaded integration instance. Created by
/// [`Integration::setup`], consumed by [`Integration::teardown`].
pub struct Integration {
    settings: Settings,
    api: Arc<dyn AdminApi>,
    coordinator: Coordinator,
    site_title: String,
    receiver_id: String,
    webhooks_enabled: bool,
    registrations: Vec<Registration>,
    notifications: broadcast::Sender<Notification>,
    timer: Option<JoinHandle<()>>,
}

impl Integration {
    /// Parses the credential before any network call, then connects.
    pub async fn setup(settings: Settings) -> Result<Self, SetupError> {
        let client = GhostClient::from_settings(&settings)?;
        Self::setup_with(settings, Arc::new(client)).await
    }

    /// Setup against an already built API. The API is closed again if any
    /// step fails.
    pub async fn setup_with(settings: Settings, api: Arc<dyn AdminApi>) -> Result<Self, SetupError> {
        match Self::start(settings, api.clone()).await {
            Ok(integration) => Ok(integration),
            Err(err) => {
                warn!(error = %err, "setup failed");
                api.close().await;
                Err(err)
            }
        }
    }

    async fn start(settings: Settings, api: Arc<dyn AdminApi>) -> Result<Self, SetupError> {
        let site = api.site_info().await.map_err(CycleError::from)?;
        info!(site = %site.title, api_url = %settings.api_url, "connected to ghost");

        let coordinator = Coordinator::new(api.clone(), settings.optional_policy.clone());
        coordinator.refresh().await?;

        let receiver_id = format!("ghost_{}", nanoid!());
        let callback_base = settings.callback_base();
        let registrations = match callback_base.as_deref() {
            Some(base) => {
                let target_url = webhooks::receiver_url(base, &receiver_id);
                webhooks::register(api.as_ref(), &target_url).await
            }
            None => {
                debug!(site = %site.title, "no https callback url, webhooks disabled");
                Vec::new()
            }
        };

        let timer = refresh::spawn(coordinator.clone(), settings.scan_interval);
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        info!(
            site = %site.title,
            receiver_id = %receiver_id,
            webhooks = registrations.len(),
            "integration loaded"
        );

        Ok(Self {
            settings,
            api,
            coordinator,
            site_title: site.title,
            receiver_id,
            webhooks_enabled: callback_base.is_some(),
            registrations,
            notifications,
            timer: Some(timer),
        })
    }

    /// Stops the timer, deletes the webhooks this instance created and
    /// closes the connection.
    pub async fn teardown(mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            if let Err(err) = timer.await {
                if !err.is_cancelled() {
                    warn!(error = %err, "refresh timer stopped abnormally");
                }
            }
        }
        self.coordinator.cancel().await;

        let deleted = webhooks::unregister(self.api.as_ref(), &self.registrations).await;
        self.registrations.clear();
        self.api.close().await;

        info!(
            site = %self.site_title,
            receiver_id = %self.receiver_id,
            deleted_webhooks = deleted,
            "integration unloaded"
        );
    }

    /// Replaces the admin key by unloading and loading again. A malformed
    /// key is rejected before anything is torn down.
    pub async fn reauthenticate(self, admin_api_key: &str) -> Result<Self, ReauthError> {
        let mut settings = self.settings.clone();
        settings.admin_api_key = admin_api_key.trim().to_string();
        if let Err(error) = settings.credential() {
            warn!(site = %self.site_title, error = %error, "replacement key rejected");
            return Err(ReauthError::Rejected {
                integration: Box::new(self),
                error,
            });
        }

        self.teardown().await;
        Ok(Self::setup(settings).await?)
    }

    /// Parses and classifies a pushed body, then fans the notification out
    /// to subscribers. Unrecognized shapes are logged and dropped.
    pub fn receive(&self, body: &[u8]) -> Result<Option<Notification>, MalformedPayload> {
        let payload = push::parse_body(body)?;
        let Some(notification) = push::classify(&self.receiver_id, &payload) else {
            warn!(receiver_id = %self.receiver_id, "unrecognized webhook payload");
            return Ok(None);
        };

        info!(
            event_type = %notification.event_type,
            id = notification.data.id.as_deref().unwrap_or_default(),
            "received ghost event"
        );
        // No subscribers is not an error.
        let _ = self.notifications.send(notification.clone());
        Ok(Some(notification))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn diagnostics(&self) -> Value {
        let status = self.coordinator.status();
        json!({
            "config": {
                "api_url": self.settings.api_url,
                "admin_api_key": REDACTED,
                "external_url": self.settings.external_url,
                "scan_interval_secs": self.settings.scan_interval.as_secs(),
                "optional_policy": self.settings.optional_policy,
            },
            "snapshot": self.coordinator.snapshot().as_deref(),
            "last_update_success": status.last_update_success,
            "state": status.state,
            "last_error": status.last_error,
            "receiver_id": self.receiver_id,
            "webhooks_enabled": self.webhooks_enabled,
            "webhook_count": self.registrations.len(),
        })
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.coordinator.snapshot()
    }

    pub fn status(&self) -> Status {
        self.coordinator.status()
    }

    pub fn site_title(&self) -> &str {
        &self.site_title
    }

    pub fn receiver_id(&self) -> &str {
        &self.receiver_id
    }

    pub fn webhooks_enabled(&self) -> bool {
        self.webhooks_enabled
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }
}

impl std::fmt::Debug for Integration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Integration")
            .field("site_title", &self.site_title)
            .field("receiver_id", &self.receiver_id)
            .field("webhooks", &self.registrations.len())
            .finish_non_exhaustive()
    }
}

impl Drop for Integration {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
