use client::AdminApi;
use ghostwatch_core::types::Registration;
use tracing::{debug, info, warn};

/// Remote events this integration subscribes to.
pub const WEBHOOK_EVENTS: &[&str] = &[
    "member.added",
    "member.edited",
    "member.deleted",
    "post.published",
    "post.unpublished",
    "post.edited",
    "page.published",
];

pub const RECEIVER_PATH: &str = "/api/webhook";

pub fn receiver_url(callback_base: &str, receiver_id: &str) -> String {
    format!("{}{}/{}", callback_base, RECEIVER_PATH, receiver_id)
}

/// Registers every event independently. Events that fail are skipped, so
/// the result may cover only part of [`WEBHOOK_EVENTS`].
pub async fn register(api: &dyn AdminApi, target_url: &str) -> Vec<Registration> {
    info!(target_url, "registering ghost webhooks");

    let mut created = Vec::with_capacity(WEBHOOK_EVENTS.len());
    for event in WEBHOOK_EVENTS {
        match api.create_webhook(event, target_url).await {
            Ok(registration) => {
                debug!(event, id = %registration.id, "created webhook");
                created.push(registration);
            }
            Err(err) => warn!(event, error = %err, "failed to create webhook"),
        }
    }

    info!(count = created.len(), "created ghost webhooks");
    created
}

/// Deletes each registration once, continuing past failures. Returns how
/// many were deleted.
pub async fn unregister(api: &dyn AdminApi, registrations: &[Registration]) -> usize {
    let mut deleted = 0;
    for registration in registrations {
        match api.delete_webhook(&registration.id).await {
            Ok(()) => {
                debug!(id = %registration.id, "deleted webhook");
                deleted += 1;
            }
            Err(err) => warn!(id = %registration.id, error = %err, "failed to delete webhook"),
        }
    }
    deleted
}
