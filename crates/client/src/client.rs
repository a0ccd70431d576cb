use async_trait::async_trait;
use ghostwatch_core::auth::Credential;
use ghostwatch_core::config::{normalize_url, Settings};
use ghostwatch_core::error::{ClientError, CredentialError};
use ghostwatch_core::types::{
    CurrencyAmount, EmailCampaign, LatestPost, MemberCounts, Newsletter, PostCounts,
    Registration, SiteInfo, SocialWebStats,
};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::responses::{
    Collection, CountEnvelope, MrrEnvelope, NewslettersEnvelope, PostsEnvelope, SiteEnvelope,
    WebhooksEnvelope,
};
use crate::{AdminApi, ClientResult};

pub const ADMIN_PREFIX: &str = "/ghost/api/admin";
pub const ACCEPT_VERSION: &str = "v5.0";
pub const SOCIAL_WEB_ACCEPT: &str = "application/activity+json";
const SOCIAL_WEB_PREFIX: &str = "/.ghost/activitypub";
const EMAIL_SCAN_LIMIT: &str = "10";

/// Admin API client. Every request carries a freshly signed token.
pub struct GhostClient {
    api_url: String,
    credential: Credential,
    session: RwLock<Option<reqwest::Client>>,
}

impl GhostClient {
    pub fn new(api_url: &str, credential: Credential) -> Self {
        Self {
            api_url: normalize_url(api_url),
            credential,
            session: RwLock::new(None),
        }
    }

    /// Fails without touching the network when the key is malformed.
    pub fn from_settings(settings: &Settings) -> Result<Self, CredentialError> {
        Ok(Self::new(&settings.api_url, settings.credential()?))
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub async fn is_open(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Probe used before accepting a configuration.
    pub async fn validate_credentials(&self) -> ClientResult<SiteInfo> {
        self.site_info().await
    }

    async fn session(&self) -> ClientResult<reqwest::Client> {
        if let Some(client) = self.session.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut guard = self.session.write().await;
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("ghostwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| ClientError::Connection(err.to_string()))?;
        debug!(api_url = %self.api_url, "opened http session");
        *guard = Some(client.clone());
        Ok(client)
    }

    /// Signed request against the Admin API; `resource` is relative to the
    /// admin prefix, e.g. `posts/`.
    pub async fn request(
        &self,
        method: Method,
        resource: &str,
        params: &[(&str, &str)],
        body: Option<Value>,
    ) -> ClientResult<Value> {
        let session = self.session().await?;
        let url = format!("{}{}/{}", self.api_url, ADMIN_PREFIX, resource);

        let mut req = session
            .request(method, &url)
            .header(AUTHORIZATION, self.credential.authorization_header())
            .header("Accept-Version", ACCEPT_VERSION)
            .query(params);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await.map_err(transport_error)?;
        read_json(resp).await
    }

    async fn get<T: DeserializeOwned>(&self, resource: &str, params: &[(&str, &str)]) -> ClientResult<T> {
        let value = self.request(Method::GET, resource, params, None).await?;
        serde_json::from_value(value).map_err(ClientError::malformed)
    }

    async fn count(&self, resource: &str, filter: Option<&str>) -> ClientResult<u64> {
        let mut params = vec![("limit", "1")];
        if let Some(filter) = filter {
            params.push(("filter", filter));
        }
        let envelope: CountEnvelope = self.get(resource, &params).await?;
        Ok(envelope.total())
    }

    async fn social_web_total(&self, collection: &str) -> ClientResult<u64> {
        let session = self.session().await?;
        let url = format!("{}{}/{}/index", self.api_url, SOCIAL_WEB_PREFIX, collection);
        let resp = session
            .get(&url)
            .header(ACCEPT, SOCIAL_WEB_ACCEPT)
            .send()
            .await
            .map_err(transport_error)?;
        let value = read_json(resp).await?;
        let collection: Collection = serde_json::from_value(value).map_err(ClientError::malformed)?;
        Ok(collection.total_items.unwrap_or(0))
    }
}

#[async_trait]
impl AdminApi for GhostClient {
    async fn site_info(&self) -> ClientResult<SiteInfo> {
        let envelope: SiteEnvelope = self.get("site/", &[]).await?;
        Ok(envelope.site)
    }

    async fn post_counts(&self) -> ClientResult<PostCounts> {
        let (published, drafts, scheduled) = tokio::join!(
            self.count("posts/", Some("status:published")),
            self.count("posts/", Some("status:draft")),
            self.count("posts/", Some("status:scheduled")),
        );
        Ok(PostCounts {
            published: published?,
            drafts: drafts?,
            scheduled: scheduled?,
        })
    }

    async fn member_counts(&self) -> ClientResult<MemberCounts> {
        let (total, paid, free, comped) = tokio::join!(
            self.count("members/", None),
            self.count("members/", Some("status:paid")),
            self.count("members/", Some("status:free")),
            self.count("members/", Some("status:comped")),
        );
        Ok(MemberCounts {
            total: total?,
            paid: paid?,
            free: free?,
            comped: comped?,
        })
    }

    async fn latest_post(&self) -> ClientResult<Option<LatestPost>> {
        let envelope: PostsEnvelope = self
            .get(
                "posts/",
                &[
                    ("limit", "1"),
                    ("order", "published_at desc"),
                    ("filter", "status:published"),
                ],
            )
            .await?;
        Ok(envelope.posts.into_iter().next().map(|p| p.into_latest_post()))
    }

    async fn latest_email(&self) -> ClientResult<Option<EmailCampaign>> {
        let envelope: PostsEnvelope = self
            .get(
                "posts/",
                &[
                    ("limit", EMAIL_SCAN_LIMIT),
                    ("order", "published_at desc"),
                    ("filter", "status:published"),
                    ("include", "email"),
                ],
            )
            .await?;
        Ok(envelope.posts.into_iter().find_map(|p| p.into_campaign()))
    }

    async fn social_web_stats(&self) -> ClientResult<SocialWebStats> {
        let (followers, following) = tokio::join!(
            self.social_web_total("followers"),
            self.social_web_total("following"),
        );
        Ok(SocialWebStats {
            followers: total_or_zero("followers", followers),
            following: total_or_zero("following", following),
        })
    }

    async fn mrr(&self) -> ClientResult<Vec<CurrencyAmount>> {
        let envelope: MrrEnvelope = self.get("stats/mrr/", &[]).await?;
        Ok(envelope.into_amounts())
    }

    async fn comment_count(&self) -> ClientResult<u64> {
        self.count("comments/", None).await
    }

    async fn newsletters(&self) -> ClientResult<Vec<Newsletter>> {
        let envelope: NewslettersEnvelope = self
            .get("newsletters/", &[("limit", "all"), ("include", "count.members")])
            .await?;
        Ok(envelope.newsletters.into_iter().map(Newsletter::from).collect())
    }

    async fn create_webhook(&self, event: &str, target_url: &str) -> ClientResult<Registration> {
        let body = json!({
            "webhooks": [{
                "event": event,
                "target_url": target_url,
            }]
        });
        let value = self.request(Method::POST, "webhooks/", &[], Some(body)).await?;
        let envelope: WebhooksEnvelope = serde_json::from_value(value).map_err(ClientError::malformed)?;
        let record = envelope
            .webhooks
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::malformed("webhook response contained no webhook"))?;
        Ok(record.into_registration(event, target_url))
    }

    async fn delete_webhook(&self, id: &str) -> ClientResult<()> {
        let resource = format!("webhooks/{}/", id);
        self.request(Method::DELETE, &resource, &[], None).await?;
        Ok(())
    }

    async fn close(&self) {
        if self.session.write().await.take().is_some() {
            debug!(api_url = %self.api_url, "closed http session");
        }
    }
}

/// Each social web count falls back to zero on its own.
fn total_or_zero(collection: &str, result: ClientResult<u64>) -> u64 {
    result.unwrap_or_else(|err| {
        warn!(collection, error = %err, "social web count unavailable, using 0");
        0
    })
}

fn transport_error(err: reqwest::Error) -> ClientError {
    ClientError::Connection(err.to_string())
}

async fn read_json(resp: Response) -> ClientResult<Value> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::from_status(status.as_u16(), &body));
    }
    if status == StatusCode::NO_CONTENT {
        return Ok(Value::Null);
    }

    let bytes = resp.bytes().await.map_err(transport_error)?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(ClientError::malformed)
}
