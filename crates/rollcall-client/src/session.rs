//! The client session.
//!
//! Owns the lifecycle state machine around an active identity and serves
//! the UI-facing calls. State transitions are driven only by the calls
//! below and by the periodic reconciliation pass; there are no ambient
//! timers mutating shared state behind the caller's back.
//!
//! Ledger work is serialized per session: a second state-changing call
//! is not pipelined while one is in flight (callers disable the
//! corresponding action while a call is pending). Concurrent sessions of
//! the same identity are tolerated through the ledger's own atomicity:
//! only one Register, and one CheckIn per day, can ever succeed.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::gateway::{LedgerGateway, RejectReason};
use crate::leaderboard::{Leaderboard, Projector};
use crate::models::{DailyRecord, Identity, Profile};
use crate::operation::Operation;
use crate::reconcile::{ReconcileConfig, Reconciler, ResolvedState};
use crate::signer::SignerProvider;
use crate::submit::{SubmitConfig, SubmitOutcome, Submitter};
use rollcall_addressing::day_index;

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No profile exists for the identity (or none observed yet).
    Unregistered,
    /// Register submitted, not yet observed on the ledger.
    RegisteredPending,
    /// Profile confirmed on the ledger; no check-in today.
    RegisteredConfirmed,
    /// Today's check-in record exists (or is optimistically assumed).
    CheckedInToday,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unregistered => write!(f, "Unregistered"),
            Self::RegisteredPending => write!(f, "RegisteredPending"),
            Self::RegisteredConfirmed => write!(f, "RegisteredConfirmed"),
            Self::CheckedInToday => write!(f, "CheckedInToday"),
        }
    }
}

/// Session tuning.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub submit: SubmitConfig,
    pub reconcile: ReconcileConfig,
}

impl SessionConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = env_u64("ROLLCALL_RECONCILE_INTERVAL_SECS") {
            config.reconcile.interval = Duration::from_secs(secs);
        }
        if let Some(rounds) = env_u64("ROLLCALL_CONFIRM_ROUNDS") {
            config.submit.confirm_rounds = rounds as u32;
        }
        config
    }

    /// Create a config with near-zero waits (tests, local ledgers).
    #[must_use]
    pub fn fast() -> Self {
        Self {
            submit: SubmitConfig::fast(),
            reconcile: ReconcileConfig::fast(),
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

struct SessionView {
    state: SessionState,
    profile: Option<Profile>,
}

/// A client session bound to one signing provider.
pub struct Session<G, S> {
    signer: Arc<S>,
    submitter: Submitter<G>,
    reconciler: Reconciler<G>,
    projector: Projector<G>,
    view: RwLock<SessionView>,
    shutdown: Notify,
}

impl<G, S> Session<G, S>
where
    G: LedgerGateway + 'static,
    S: SignerProvider + 'static,
{
    /// Create a session over a shared gateway handle and signer.
    pub fn new(gateway: Arc<G>, signer: Arc<S>, config: SessionConfig) -> Self {
        Self {
            signer,
            submitter: Submitter::new(Arc::clone(&gateway), config.submit),
            reconciler: Reconciler::new(Arc::clone(&gateway), config.reconcile),
            projector: Projector::new(gateway),
            view: RwLock::new(SessionView {
                state: SessionState::Unregistered,
                profile: None,
            }),
            shutdown: Notify::new(),
        }
    }

    fn identity(&self) -> Result<Identity> {
        self.signer.identity().ok_or(Error::NoIdentity)
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SessionState {
        self.view.read().await.state
    }

    /// The most recently adopted profile, if any.
    pub async fn cached_profile(&self) -> Option<Profile> {
        self.view.read().await.profile.clone()
    }

    async fn set_view(&self, state: SessionState, profile: Option<Profile>) {
        let mut view = self.view.write().await;
        if view.state != state {
            debug!(from = %view.state, to = %state, "session state transition");
        }
        view.state = state;
        view.profile = profile;
    }

    /// Execute the one-time system bootstrap as the administrator.
    pub async fn bootstrap(&self) -> Result<SubmitOutcome> {
        let identity = self.identity()?;
        self.submitter
            .submit(Operation::bootstrap(identity), &*self.signer)
            .await
    }

    /// Register the active identity under `name`.
    ///
    /// Validation failures never reach the network. On success the
    /// fetched profile is adopted; when the ledger has accepted the
    /// operation but the profile is not readable yet, a provisional
    /// zero-count profile is returned and the periodic pass confirms it.
    pub async fn register(&self, name: &str) -> Result<Profile> {
        let identity = self.identity()?;
        let operation = Operation::register(identity, name)?;

        self.set_view(SessionState::RegisteredPending, None).await;
        match self.submitter.submit(operation, &*self.signer).await {
            Ok(_) => match self.reconciler.current(identity).await {
                Ok(Some(profile)) => {
                    self.set_view(SessionState::RegisteredConfirmed, Some(profile.clone()))
                        .await;
                    Ok(profile)
                }
                Ok(None) | Err(_) => {
                    let provisional = Profile {
                        owner: identity,
                        display_name: name.to_string(),
                        check_in_count: 0,
                        last_check_in: 0,
                    };
                    self.set_view(SessionState::RegisteredPending, Some(provisional.clone()))
                        .await;
                    Ok(provisional)
                }
            },
            Err(Error::Rejected(RejectReason::AlreadyRegistered)) => {
                // The profile exists; converge instead of leaving the
                // state machine mid-transition, then surface the
                // rejection verbatim.
                if let Err(e) = self.refresh().await {
                    warn!(error = %e, "refresh after already-registered failed");
                }
                Err(Error::Rejected(RejectReason::AlreadyRegistered))
            }
            Err(e) => {
                self.set_view(SessionState::Unregistered, None).await;
                Err(e)
            }
        }
    }

    /// Perform today's check-in.
    ///
    /// An already-clocked-in rejection resolves to the normal
    /// "already done today" state with the authoritative count; it is
    /// never surfaced as an error.
    pub async fn check_in(&self) -> Result<ResolvedState> {
        let identity = self.identity()?;
        let Some(prior) = self.reconciler.current(identity).await? else {
            return Err(Error::Rejected(RejectReason::NotRegistered));
        };

        let operation = Operation::check_in(identity, unix_now());
        match self.submitter.submit(operation, &*self.signer).await {
            Ok(_) => {
                // Confirmed or not, the ledger is the referee from here.
                let resolved = self.reconciler.reconcile(identity, &prior).await;
                self.set_view(SessionState::CheckedInToday, Some(resolved.profile().clone()))
                    .await;
                Ok(resolved)
            }
            Err(Error::Rejected(RejectReason::AlreadyClockedInToday)) => {
                let resolved = self
                    .reconciler
                    .resolve_already_checked_in(identity, &prior)
                    .await;
                self.set_view(SessionState::CheckedInToday, Some(resolved.profile().clone()))
                    .await;
                Ok(resolved)
            }
            Err(e) => Err(e),
        }
    }

    /// Current profile straight from the ledger; `None` when the
    /// identity is not registered. Also converges the session view.
    pub async fn profile(&self) -> Result<Option<Profile>> {
        self.refresh().await?;
        Ok(self.view.read().await.profile.clone())
    }

    /// Project the current leaderboard.
    pub async fn leaderboard(&self) -> Leaderboard {
        self.projector.project().await
    }

    /// Check-in records over the most recent `days` buckets, newest first.
    pub async fn history(&self, days: u32) -> Result<Vec<DailyRecord>> {
        let identity = self.identity()?;
        self.reconciler.history(identity, days, unix_now()).await
    }

    /// One reconciliation pass: converge the session view with ledger
    /// state. Detects day rollover (CheckedInToday drops back once
    /// today's record address is empty again).
    pub async fn refresh(&self) -> Result<()> {
        let identity = self.identity()?;
        match self.reconciler.current(identity).await? {
            None => {
                let mut view = self.view.write().await;
                // A pending registration may still land; keep waiting.
                if view.state != SessionState::RegisteredPending {
                    view.state = SessionState::Unregistered;
                    view.profile = None;
                }
            }
            Some(profile) => {
                let today = day_index(unix_now());
                let checked_in = self.reconciler.checked_in_on(identity, today).await?;
                let state = if checked_in {
                    SessionState::CheckedInToday
                } else {
                    SessionState::RegisteredConfirmed
                };
                self.set_view(state, Some(profile)).await;
            }
        }
        Ok(())
    }

    /// Start the periodic reconciliation task. The task runs until
    /// [`shutdown`](Self::shutdown) and is joined through the returned
    /// handle, so a disconnected session leaks nothing.
    pub fn spawn_reconciler(self: Arc<Self>) -> JoinHandle<()> {
        let session = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(session.reconciler.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = session.shutdown.notified() => {
                        debug!("reconciliation task stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        match session.refresh().await {
                            Ok(()) => trace!("periodic reconciliation pass"),
                            Err(Error::NoIdentity) => trace!("no active identity, skipping pass"),
                            Err(e) => warn!(error = %e, "periodic reconciliation failed"),
                        }
                    }
                }
            }
        })
    }

    /// Signal the background task to stop.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}
