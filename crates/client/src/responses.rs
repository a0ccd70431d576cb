//! Wire shapes of the Admin API responses this crate reads.

use chrono::{DateTime, Utc};
use ghostwatch_core::types::{
    CurrencyAmount, EmailCampaign, LatestPost, Newsletter, Registration, SiteInfo,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct SiteEnvelope {
    pub site: SiteInfo,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Pagination {
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListMeta {
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Any list response; only the reported total is read.
#[derive(Debug, Deserialize)]
pub(crate) struct CountEnvelope {
    #[serde(default)]
    pub meta: Option<ListMeta>,
}

impl CountEnvelope {
    pub fn total(&self) -> u64 {
        self.meta
            .as_ref()
            .and_then(|m| m.pagination.as_ref())
            .and_then(|p| p.total)
            .unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostsEnvelope {
    #[serde(default)]
    pub posts: Vec<PostRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub email: Option<EmailRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmailRecord {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub email_count: Option<u64>,
    #[serde(default)]
    pub delivered_count: Option<u64>,
    #[serde(default)]
    pub opened_count: Option<u64>,
    #[serde(default)]
    pub clicked_count: Option<u64>,
    #[serde(default)]
    pub failed_count: Option<u64>,
}

impl PostRecord {
    pub fn into_latest_post(self) -> LatestPost {
        LatestPost {
            title: self.title,
            slug: self.slug,
            url: self.url,
            published_at: self.published_at,
        }
    }

    pub fn into_campaign(self) -> Option<EmailCampaign> {
        let email = self.email?;
        Some(EmailCampaign {
            title: self.title,
            slug: self.slug,
            published_at: self.published_at,
            subject: email.subject,
            submitted_at: email.submitted_at,
            email_count: email.email_count.unwrap_or(0),
            delivered_count: email.delivered_count.unwrap_or(0),
            opened_count: email.opened_count.unwrap_or(0),
            clicked_count: email.clicked_count.unwrap_or(0),
            failed_count: email.failed_count.unwrap_or(0),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MrrEnvelope {
    #[serde(default)]
    pub meta: Option<MrrMeta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MrrMeta {
    #[serde(default)]
    pub totals: Vec<MrrTotal>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MrrTotal {
    pub currency: String,
    #[serde(default)]
    pub mrr: i64,
}

impl MrrEnvelope {
    pub fn into_amounts(self) -> Vec<CurrencyAmount> {
        self.meta
            .map(|m| m.totals)
            .unwrap_or_default()
            .into_iter()
            .map(|t| CurrencyAmount {
                currency: t.currency,
                amount: t.mrr,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewslettersEnvelope {
    #[serde(default)]
    pub newsletters: Vec<NewsletterRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewsletterRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub count: Option<NewsletterCount>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewsletterCount {
    #[serde(default)]
    pub members: Option<u64>,
}

impl From<NewsletterRecord> for Newsletter {
    fn from(record: NewsletterRecord) -> Self {
        Newsletter {
            id: record.id,
            name: record.name.unwrap_or_else(|| "Newsletter".to_string()),
            status: record.status.unwrap_or_default(),
            subscribers: record.count.and_then(|c| c.members).unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WebhooksEnvelope {
    #[serde(default)]
    pub webhooks: Vec<WebhookRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WebhookRecord {
    pub id: String,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
}

impl WebhookRecord {
    pub fn into_registration(self, event: &str, target_url: &str) -> Registration {
        Registration {
            id: self.id,
            event: self.event.unwrap_or_else(|| event.to_string()),
            target_url: self.target_url.unwrap_or_else(|| target_url.to_string()),
        }
    }
}

/// ActivityPub collection summary.
#[derive(Debug, Deserialize)]
pub(crate) struct Collection {
    #[serde(default, rename = "totalItems")]
    pub total_items: Option<u64>,
}
