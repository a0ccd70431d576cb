//! Named, read-only values derived from a [`Snapshot`].
//!
//! Each description is a pure function of the snapshot; nothing here depends
//! on another entry having been evaluated first.

use serde::Serialize;
use serde_json::{json, Value};

use crate::types::{Newsletter, Snapshot};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SensorValue {
    Count(u64),
    Amount(i64),
    Percent(f64),
    Text(String),
}

pub struct SensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub unit: Option<&'static str>,
    pub value: fn(&Snapshot) -> Option<SensorValue>,
    pub attributes: Option<fn(&Snapshot) -> Option<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    pub key: String,
    pub name: String,
    pub icon: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub value: Option<SensorValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,
}

fn count(n: u64) -> Option<SensorValue> {
    Some(SensorValue::Count(n))
}

fn latest_post_attributes(s: &Snapshot) -> Option<Value> {
    s.latest_post.as_ref().map(|p| {
        json!({
            "url": p.url,
            "published_at": p.published_at,
            "slug": p.slug,
        })
    })
}

fn latest_email_attributes(s: &Snapshot) -> Option<Value> {
    s.latest_email.as_ref().map(|e| {
        json!({
            "subject": e.campaign.subject,
            "sent_at": e.campaign.submitted_at,
            "sent_to": e.campaign.email_count,
            "delivered": e.campaign.delivered_count,
            "opened": e.campaign.opened_count,
            "clicked": e.campaign.clicked_count,
            "failed": e.campaign.failed_count,
            "open_rate": e.open_rate,
            "click_rate": e.click_rate,
        })
    })
}

pub const SENSORS: &[SensorDescription] = &[
    SensorDescription {
        key: "total_members",
        name: "Total Members",
        icon: "mdi:account-group",
        unit: None,
        value: |s| count(s.members.total),
        attributes: None,
    },
    SensorDescription {
        key: "paid_members",
        name: "Paid Members",
        icon: "mdi:account-cash",
        unit: None,
        value: |s| count(s.members.paid),
        attributes: None,
    },
    SensorDescription {
        key: "free_members",
        name: "Free Members",
        icon: "mdi:account-outline",
        unit: None,
        value: |s| count(s.members.free),
        attributes: None,
    },
    SensorDescription {
        key: "comped_members",
        name: "Comped Members",
        icon: "mdi:account-star",
        unit: None,
        value: |s| count(s.members.comped),
        attributes: None,
    },
    SensorDescription {
        key: "published_posts",
        name: "Published Posts",
        icon: "mdi:post",
        unit: None,
        value: |s| count(s.posts.published),
        attributes: None,
    },
    SensorDescription {
        key: "draft_posts",
        name: "Draft Posts",
        icon: "mdi:file-edit-outline",
        unit: None,
        value: |s| count(s.posts.drafts),
        attributes: None,
    },
    SensorDescription {
        key: "scheduled_posts",
        name: "Scheduled Posts",
        icon: "mdi:clock-outline",
        unit: None,
        value: |s| count(s.posts.scheduled),
        attributes: None,
    },
    SensorDescription {
        key: "latest_post",
        name: "Latest Post",
        icon: "mdi:newspaper",
        unit: None,
        value: |s| {
            s.latest_post
                .as_ref()
                .and_then(|p| p.title.clone())
                .map(SensorValue::Text)
        },
        attributes: Some(latest_post_attributes),
    },
    SensorDescription {
        key: "latest_email",
        name: "Latest Email",
        icon: "mdi:email-newsletter",
        unit: None,
        value: |s| {
            s.latest_email
                .as_ref()
                .and_then(|e| e.campaign.title.clone())
                .map(SensorValue::Text)
        },
        attributes: Some(latest_email_attributes),
    },
    SensorDescription {
        key: "latest_email_sent",
        name: "Latest Email Sent",
        icon: "mdi:send",
        unit: None,
        value: |s| s.latest_email.as_ref().and_then(|e| count(e.campaign.email_count)),
        attributes: None,
    },
    SensorDescription {
        key: "latest_email_opened",
        name: "Latest Email Opened",
        icon: "mdi:email-open",
        unit: None,
        value: |s| s.latest_email.as_ref().and_then(|e| count(e.campaign.opened_count)),
        attributes: None,
    },
    SensorDescription {
        key: "latest_email_open_rate",
        name: "Latest Email Open Rate",
        icon: "mdi:email-open-outline",
        unit: Some("%"),
        value: |s| {
            s.latest_email
                .as_ref()
                .map(|e| SensorValue::Percent(e.open_rate))
        },
        attributes: None,
    },
    SensorDescription {
        key: "latest_email_clicked",
        name: "Latest Email Clicked",
        icon: "mdi:cursor-default-click",
        unit: None,
        value: |s| s.latest_email.as_ref().and_then(|e| count(e.campaign.clicked_count)),
        attributes: None,
    },
    SensorDescription {
        key: "latest_email_click_rate",
        name: "Latest Email Click Rate",
        icon: "mdi:cursor-default-click-outline",
        unit: Some("%"),
        value: |s| {
            s.latest_email
                .as_ref()
                .map(|e| SensorValue::Percent(e.click_rate))
        },
        attributes: None,
    },
    SensorDescription {
        key: "socialweb_followers",
        name: "SocialWeb Followers",
        icon: "mdi:account-multiple",
        unit: None,
        value: |s| count(s.social_web.followers),
        attributes: None,
    },
    SensorDescription {
        key: "socialweb_following",
        name: "SocialWeb Following",
        icon: "mdi:account-multiple-outline",
        unit: None,
        value: |s| count(s.social_web.following),
        attributes: None,
    },
    SensorDescription {
        key: "total_comments",
        name: "Total Comments",
        icon: "mdi:comment-multiple",
        unit: None,
        value: |s| count(s.comments),
        attributes: None,
    },
    SensorDescription {
        key: "mrr",
        name: "MRR",
        icon: "mdi:cash-multiple",
        unit: None,
        value: |s| s.revenue.as_ref().map(|r| SensorValue::Amount(r.monthly)),
        attributes: None,
    },
    SensorDescription {
        key: "arr",
        name: "ARR",
        icon: "mdi:cash-multiple",
        unit: None,
        value: |s| s.revenue.as_ref().map(|r| SensorValue::Amount(r.annual)),
        attributes: None,
    },
];

impl SensorDescription {
    pub fn read(&self, snapshot: &Snapshot) -> SensorReading {
        // Money sensors carry the snapshot's currency as their unit.
        let unit = match self.key {
            "mrr" | "arr" => snapshot.revenue.as_ref().map(|r| r.currency.clone()),
            _ => self.unit.map(str::to_string),
        };
        SensorReading {
            key: self.key.to_string(),
            name: self.name.to_string(),
            icon: self.icon,
            unit,
            value: (self.value)(snapshot),
            attributes: self.attributes.and_then(|attrs| attrs(snapshot)),
        }
    }
}

pub fn find(key: &str) -> Option<&'static SensorDescription> {
    SENSORS.iter().find(|d| d.key == key)
}

fn newsletter_reading(newsletter: &Newsletter) -> SensorReading {
    SensorReading {
        key: format!("newsletter_{}", newsletter.id),
        name: format!("{} Subscribers", newsletter.name),
        icon: "mdi:email-newsletter",
        unit: None,
        value: Some(SensorValue::Count(newsletter.subscribers)),
        attributes: Some(json!({
            "newsletter_id": newsletter.id,
            "status": newsletter.status,
        })),
    }
}

/// All readings for a snapshot: the fixed table followed by one entry per
/// active newsletter.
pub fn read_all(snapshot: &Snapshot) -> Vec<SensorReading> {
    SENSORS
        .iter()
        .map(|d| d.read(snapshot))
        .chain(
            snapshot
                .newsletters
                .iter()
                .filter(|n| n.is_active())
                .map(newsletter_reading),
        )
        .collect()
}
