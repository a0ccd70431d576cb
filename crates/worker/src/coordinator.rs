use std::sync::Arc;

use chrono::{DateTime, Utc};
use client::{AdminApi, ClientResult};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use ghostwatch_core::config::{OptionalPolicy, OptionalResource};
use ghostwatch_core::error::{ClientError, CycleError};
use ghostwatch_core::types::{
    CurrencyAmount, EmailCampaign, EmailStats, LatestPost, MemberCounts, Newsletter, PostCounts,
    Revenue, SiteInfo, Snapshot, SocialWebStats,
};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

pub type CycleResult = Result<Arc<Snapshot>, CycleError>;

type Cycle = Shared<BoxFuture<'static, CycleResult>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Fetching,
    Aggregating,
    Published,
    TransientFailed,
    /// Terminal until the credential is replaced.
    AuthFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub state: CycleState,
    pub last_update_success: bool,
    pub last_error: Option<CycleError>,
}

/// Owns the fetch-aggregate-publish cycle for one integration instance.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

struct Inner {
    api: Arc<dyn AdminApi>,
    policy: OptionalPolicy,
    snapshot: watch::Sender<Option<Arc<Snapshot>>>,
    status: watch::Sender<Status>,
    inflight: Mutex<Option<Cycle>>,
}

/// Raw outcome of every sub-fetch of one cycle.
pub struct Fetched {
    pub site: ClientResult<SiteInfo>,
    pub posts: ClientResult<PostCounts>,
    pub members: ClientResult<MemberCounts>,
    pub latest_post: ClientResult<Option<LatestPost>>,
    pub latest_email: ClientResult<Option<EmailCampaign>>,
    pub social_web: ClientResult<SocialWebStats>,
    pub mrr: ClientResult<Vec<CurrencyAmount>>,
    pub comments: ClientResult<u64>,
    pub newsletters: ClientResult<Vec<Newsletter>>,
}

impl Coordinator {
    pub fn new(api: Arc<dyn AdminApi>, policy: OptionalPolicy) -> Self {
        let (snapshot, _) = watch::channel(None);
        let (status, _) = watch::channel(Status {
            state: CycleState::Idle,
            last_update_success: false,
            last_error: None,
        });
        Self {
            inner: Arc::new(Inner {
                api,
                policy,
                snapshot,
                status,
                inflight: Mutex::new(None),
            }),
        }
    }

    /// Runs one cycle, or joins the one already in flight.
    pub async fn refresh(&self) -> CycleResult {
        if let Some(err) = self.auth_failure() {
            debug!("refresh refused, credentials were rejected");
            return Err(err);
        }

        let cycle = {
            let mut slot = self.inner.inflight.lock().await;
            match slot.as_ref() {
                Some(cycle) => {
                    debug!("joining in-flight refresh");
                    cycle.clone()
                }
                None => {
                    let inner = self.inner.clone();
                    let cycle = async move { inner.run_cycle().await }.boxed().shared();
                    *slot = Some(cycle.clone());
                    cycle
                }
            }
        };

        cycle.await
    }

    /// Drops the cycle in flight, if any, without publishing it.
    pub async fn cancel(&self) {
        if self.inner.inflight.lock().await.take().is_none() {
            return;
        }
        debug!("in-flight refresh cancelled");
        self.inner.status.send_modify(|status| {
            if matches!(status.state, CycleState::Fetching | CycleState::Aggregating) {
                status.state = CycleState::Idle;
            }
        });
    }

    /// Last published snapshot. Failed cycles never replace it.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.inner.snapshot.subscribe()
    }

    pub fn status(&self) -> Status {
        self.inner.status.borrow().clone()
    }

    pub fn state(&self) -> CycleState {
        self.inner.status.borrow().state
    }

    pub fn last_update_success(&self) -> bool {
        self.inner.status.borrow().last_update_success
    }

    fn auth_failure(&self) -> Option<CycleError> {
        let status = self.inner.status.borrow();
        match status.state {
            CycleState::AuthFailed => Some(
                status
                    .last_error
                    .clone()
                    .unwrap_or_else(|| CycleError::AuthFailed("credentials rejected".to_string())),
            ),
            _ => None,
        }
    }
}

impl Inner {
    async fn run_cycle(&self) -> CycleResult {
        self.set_state(CycleState::Fetching);
        let fetched = self.fetch().await;

        self.set_state(CycleState::Aggregating);
        let outcome = aggregate(fetched, &self.policy, Utc::now()).map(Arc::new);

        match &outcome {
            Ok(snapshot) => {
                self.snapshot.send_replace(Some(snapshot.clone()));
                self.status.send_modify(|status| {
                    status.state = CycleState::Published;
                    status.last_update_success = true;
                    status.last_error = None;
                });
                info!(
                    site = %snapshot.site.title,
                    members = snapshot.members.total,
                    posts = snapshot.posts.published,
                    "snapshot published"
                );
                self.set_state(CycleState::Idle);
            }
            Err(err @ CycleError::AuthFailed(_)) => {
                error!(error = %err, "refresh failed, credentials must be replaced");
                self.fail(CycleState::AuthFailed, err.clone());
            }
            Err(err @ CycleError::Transient(_)) => {
                warn!(error = %err, "refresh failed, retrying next interval");
                self.fail(CycleState::TransientFailed, err.clone());
                self.set_state(CycleState::Idle);
            }
        }

        *self.inflight.lock().await = None;
        outcome
    }

    async fn fetch(&self) -> Fetched {
        let api = self.api.as_ref();
        let (site, posts, members, latest_post, latest_email, social_web, mrr, comments, newsletters) = tokio::join!(
            api.site_info(),
            api.post_counts(),
            api.member_counts(),
            api.latest_post(),
            api.latest_email(),
            api.social_web_stats(),
            api.mrr(),
            api.comment_count(),
            api.newsletters(),
        );

        Fetched {
            site,
            posts,
            members,
            latest_post,
            latest_email,
            social_web,
            mrr,
            comments,
            newsletters,
        }
    }

    fn set_state(&self, state: CycleState) {
        self.status.send_modify(|status| status.state = state);
    }

    fn fail(&self, state: CycleState, err: CycleError) {
        self.status.send_modify(|status| {
            status.state = state;
            status.last_update_success = false;
            status.last_error = Some(err);
        });
    }
}

/// Folds one cycle's results into a snapshot. Any authentication failure
/// wins over every other failure.
pub fn aggregate(
    fetched: Fetched,
    policy: &OptionalPolicy,
    fetched_at: DateTime<Utc>,
) -> Result<Snapshot, CycleError> {
    let social_web = fetched.social_web.unwrap_or_else(|err| {
        warn!(error = %err, "social web counts unavailable, using defaults");
        SocialWebStats::default()
    });
    let comments = degrade(policy, OptionalResource::Comments, fetched.comments);
    let newsletters = degrade(policy, OptionalResource::Newsletters, fetched.newsletters);

    let failure = first_failure(&[
        fetched.site.as_ref().err(),
        fetched.posts.as_ref().err(),
        fetched.members.as_ref().err(),
        fetched.latest_post.as_ref().err(),
        fetched.latest_email.as_ref().err(),
        fetched.mrr.as_ref().err(),
        comments.as_ref().err(),
        newsletters.as_ref().err(),
    ]);
    if let Some(err) = failure {
        return Err(err);
    }

    let mrr = fetched.mrr?;
    Ok(Snapshot {
        site: fetched.site?,
        posts: fetched.posts?,
        members: fetched.members?,
        latest_post: fetched.latest_post?,
        latest_email: fetched.latest_email?.map(EmailStats::from_campaign),
        social_web,
        revenue: Revenue::from_mrr(&mrr),
        mrr,
        comments: comments?,
        newsletters: newsletters?,
        fetched_at,
    })
}

fn first_failure(errors: &[Option<&ClientError>]) -> Option<CycleError> {
    let mut errors = errors.iter().flatten();
    let first = errors.clone().next()?;
    let chosen = errors.find(|err| err.is_auth()).unwrap_or(first);
    Some(CycleError::from((*chosen).clone()))
}

fn degrade<T: Default>(
    policy: &OptionalPolicy,
    resource: OptionalResource,
    result: ClientResult<T>,
) -> ClientResult<T> {
    match result {
        Err(err) if policy.degrades(resource) => {
            warn!(resource = resource.as_str(), error = %err, "optional resource unavailable, using default");
            Ok(T::default())
        }
        other => other,
    }
}
