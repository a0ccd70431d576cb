use async_trait::async_trait;
use ghostwatch_core::error::ClientError;
use ghostwatch_core::types::{
    CurrencyAmount, EmailCampaign, LatestPost, MemberCounts, Newsletter, PostCounts,
    Registration, SiteInfo, SocialWebStats,
};

mod client;
mod responses;

pub use client::{GhostClient, ACCEPT_VERSION, ADMIN_PREFIX, SOCIAL_WEB_ACCEPT};

pub type ClientResult<T> = Result<T, ClientError>;

/// The remote resources one refresh cycle reads, plus webhook management.
#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn site_info(&self) -> ClientResult<SiteInfo>;
    async fn post_counts(&self) -> ClientResult<PostCounts>;
    async fn member_counts(&self) -> ClientResult<MemberCounts>;
    async fn latest_post(&self) -> ClientResult<Option<LatestPost>>;
    async fn latest_email(&self) -> ClientResult<Option<EmailCampaign>>;
    async fn social_web_stats(&self) -> ClientResult<SocialWebStats>;
    async fn mrr(&self) -> ClientResult<Vec<CurrencyAmount>>;
    async fn comment_count(&self) -> ClientResult<u64>;
    async fn newsletters(&self) -> ClientResult<Vec<Newsletter>>;
    async fn create_webhook(&self, event: &str, target_url: &str) -> ClientResult<Registration>;
    async fn delete_webhook(&self, id: &str) -> ClientResult<()>;
    /// Release the underlying connection. Safe to call repeatedly.
    async fn close(&self);
}
