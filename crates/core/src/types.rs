use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCounts {
    pub published: u64,
    pub drafts: u64,
    pub scheduled: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberCounts {
    pub total: u64,
    pub paid: u64,
    pub free: u64,
    pub comped: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestPost {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Raw delivery counters of the most recent emailed post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailCampaign {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub subject: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub email_count: u64,
    pub delivered_count: u64,
    pub opened_count: u64,
    pub clicked_count: u64,
    pub failed_count: u64,
}

/// An [`EmailCampaign`] with engagement rates filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailStats {
    #[serde(flatten)]
    pub campaign: EmailCampaign,
    pub open_rate: f64,
    pub click_rate: f64,
}

impl EmailStats {
    pub fn from_campaign(campaign: EmailCampaign) -> Self {
        let open_rate = percentage(campaign.opened_count, campaign.email_count);
        let click_rate = percentage(campaign.clicked_count, campaign.email_count);
        Self {
            campaign,
            open_rate,
            click_rate,
        }
    }
}

/// `part / whole * 100` rounded to one decimal place; zero when nothing was sent.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialWebStats {
    pub followers: u64,
    pub following: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyAmount {
    pub currency: String,
    /// Minor units (cents).
    pub amount: i64,
}

/// Recurring revenue in whole currency units, derived once per cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revenue {
    pub currency: String,
    pub monthly: i64,
    pub annual: i64,
}

impl Revenue {
    /// Uses the first reported currency.
    pub fn from_mrr(mrr: &[CurrencyAmount]) -> Option<Self> {
        let first = mrr.first()?;
        let monthly = (first.amount as f64 / 100.0).round() as i64;
        Some(Self {
            currency: first.currency.to_ascii_uppercase(),
            monthly,
            annual: monthly * 12,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Newsletter {
    pub id: String,
    pub name: String,
    pub status: String,
    pub subscribers: u64,
}

impl Newsletter {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

/// Everything one refresh cycle produced. Never partially filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub site: SiteInfo,
    pub posts: PostCounts,
    pub members: MemberCounts,
    pub latest_post: Option<LatestPost>,
    pub latest_email: Option<EmailStats>,
    pub social_web: SocialWebStats,
    pub mrr: Vec<CurrencyAmount>,
    pub revenue: Option<Revenue>,
    pub comments: u64,
    pub newsletters: Vec<Newsletter>,
    pub fetched_at: DateTime<Utc>,
}

/// A webhook created on the remote side by this instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: String,
    pub event: String,
    pub target_url: String,
}
