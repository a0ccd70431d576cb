use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use client::{AdminApi, ClientResult};
use ghostwatch_core::error::ClientError;
use ghostwatch_core::types::{
    CurrencyAmount, EmailCampaign, LatestPost, MemberCounts, Newsletter, PostCounts,
    Registration, SiteInfo, SocialWebStats,
};

/// In-memory Admin API with per-method call counts and injectable failures.
#[derive(Default)]
pub(crate) struct FakeApi {
    calls: Mutex<HashMap<String, usize>>,
    failures: Mutex<HashMap<String, ClientError>>,
    deleted: Mutex<Vec<String>>,
    pending: AtomicUsize,
    delay: Option<Duration>,
}

/// Counts a call as pending until its future completes or is dropped.
struct PendingGuard<'a>(&'a AtomicUsize);

impl<'a> PendingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `key` fail. Keys are method names, or `create_webhook:<event>` /
    /// `delete_webhook:<id>` for a single call.
    pub fn failing(self, key: &str, err: ClientError) -> Self {
        self.failures.lock().unwrap().insert(key.to_string(), err);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_failure(&self, key: &str, err: Option<ClientError>) {
        let mut failures = self.failures.lock().unwrap();
        match err {
            Some(err) => failures.insert(key.to_string(), err),
            None => failures.remove(key),
        };
    }

    pub fn calls(&self, key: &str) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    /// Calls started but not yet finished or dropped.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    async fn hit(&self, key: &str) -> ClientResult<()> {
        *self.calls.lock().unwrap().entry(key.to_string()).or_default() += 1;
        let _pending = PendingGuard::enter(&self.pending);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.lock().unwrap().get(key) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn sample_newsletters() -> Vec<Newsletter> {
    vec![
        Newsletter {
            id: "nl1".to_string(),
            name: "Weekly".to_string(),
            status: "active".to_string(),
            subscribers: 800,
        },
        Newsletter {
            id: "nl2".to_string(),
            name: "Archive".to_string(),
            status: "archived".to_string(),
            subscribers: 200,
        },
    ]
}

#[async_trait]
impl AdminApi for FakeApi {
    async fn site_info(&self) -> ClientResult<SiteInfo> {
        self.hit("site_info").await?;
        Ok(SiteInfo {
            title: "Test Ghost".to_string(),
            url: Some("https://test.ghost.io".to_string()),
            ..Default::default()
        })
    }

    async fn post_counts(&self) -> ClientResult<PostCounts> {
        self.hit("post_counts").await?;
        Ok(PostCounts {
            published: 42,
            drafts: 5,
            scheduled: 2,
        })
    }

    async fn member_counts(&self) -> ClientResult<MemberCounts> {
        self.hit("member_counts").await?;
        Ok(MemberCounts {
            total: 1000,
            paid: 100,
            free: 850,
            comped: 50,
        })
    }

    async fn latest_post(&self) -> ClientResult<Option<LatestPost>> {
        self.hit("latest_post").await?;
        Ok(Some(LatestPost {
            title: Some("Latest Post".to_string()),
            slug: Some("latest-post".to_string()),
            url: Some("https://test.ghost.io/latest-post/".to_string()),
            published_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).single(),
        }))
    }

    async fn latest_email(&self) -> ClientResult<Option<EmailCampaign>> {
        self.hit("latest_email").await?;
        Ok(Some(EmailCampaign {
            title: Some("Newsletter #1".to_string()),
            subject: Some("Newsletter #1".to_string()),
            email_count: 500,
            delivered_count: 490,
            opened_count: 200,
            clicked_count: 50,
            failed_count: 10,
            ..Default::default()
        }))
    }

    async fn social_web_stats(&self) -> ClientResult<SocialWebStats> {
        self.hit("social_web_stats").await?;
        Ok(SocialWebStats {
            followers: 150,
            following: 25,
        })
    }

    async fn mrr(&self) -> ClientResult<Vec<CurrencyAmount>> {
        self.hit("mrr").await?;
        Ok(vec![CurrencyAmount {
            currency: "usd".to_string(),
            amount: 500000,
        }])
    }

    async fn comment_count(&self) -> ClientResult<u64> {
        self.hit("comment_count").await?;
        Ok(156)
    }

    async fn newsletters(&self) -> ClientResult<Vec<Newsletter>> {
        self.hit("newsletters").await?;
        Ok(sample_newsletters())
    }

    async fn create_webhook(&self, event: &str, target_url: &str) -> ClientResult<Registration> {
        self.hit("create_webhook").await?;
        self.hit(&format!("create_webhook:{}", event)).await?;
        Ok(Registration {
            id: format!("wh_{}", event.replace('.', "_")),
            event: event.to_string(),
            target_url: target_url.to_string(),
        })
    }

    async fn delete_webhook(&self, id: &str) -> ClientResult<()> {
        self.hit("delete_webhook").await?;
        self.hit(&format!("delete_webhook:{}", id)).await?;
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(())
    }

    async fn close(&self) {
        *self.calls.lock().unwrap().entry("close".to_string()).or_default() += 1;
    }
}
