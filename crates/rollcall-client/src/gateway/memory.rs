//! In-process reference ledger.
//!
//! Enforces the same invariants a production ledger would: one profile
//! per identity, at most one check-in record per (owner, day), creation
//! failing rather than overwriting, and a signature check on every
//! operation. Used by the integration tests and the demo binary, and
//! doubling as the executable description of what the client expects
//! from a real gateway.
//!
//! Accounts are stored as versioned wire payloads and every read runs
//! the explicit decode step, the same path a gateway adapter over a real
//! ledger takes.
//!
//! The authoritative day for a check-in comes from THIS ledger's clock
//! at execution time; the record address hint carried by the operation
//! is ignored, exactly as a production execution engine re-derives it.
//!
//! Test controls: the clock can be pinned and advanced, confirmations
//! can be lagged, profile reads can be held at a pre-execution snapshot,
//! and fetches can be made to fail, so eventual-consistency windows are
//! reproducible.

use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use ed25519_dalek::VerifyingKey;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::codec::{
    decode_profile, decode_record, decode_registry, encode_profile, encode_record,
    encode_registry,
};
use crate::error::{DecodeError, Error, Result};
use crate::gateway::{Confirmation, LedgerGateway, RejectReason, Ticket};
use crate::models::{DailyRecord, Identity, Profile, SystemRegistry};
use crate::operation::{Operation, SignedOperation};
use rollcall_addressing::{
    daily_record_address, day_index, profile_address, registry_address, Address,
};

fn system_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

struct TicketState {
    executed_at: i64,
    polls_until_visible: u32,
}

#[derive(Default)]
struct Inner {
    registry: Option<Vec<u8>>,
    profiles: HashMap<Address, Vec<u8>>,
    profile_order: Vec<Address>,
    records: HashMap<Address, Vec<u8>>,
    seen: HashSet<[u8; 64]>,
    tickets: HashMap<u64, TicketState>,
    next_ticket: u64,
    now_override: Option<i64>,
    confirmation_lag: u32,
    stale_profile_reads: u32,
    profile_snapshot: HashMap<Address, Vec<u8>>,
    failing_fetches: u32,
}

impl Inner {
    fn now(&self) -> i64 {
        self.now_override.unwrap_or_else(system_now)
    }

    /// Burn one injected fetch failure, if armed.
    fn take_fetch_failure(&mut self) -> Result<()> {
        if self.failing_fetches > 0 {
            self.failing_fetches -= 1;
            return Err(Error::Transport("injected fetch failure".to_string()));
        }
        Ok(())
    }
}

/// An in-memory ledger with a controllable clock.
pub struct MemoryLedger {
    admin: Identity,
    inner: Mutex<Inner>,
}

impl MemoryLedger {
    /// Create an empty ledger administered by `admin`.
    ///
    /// The ledger starts un-bootstrapped: Register is rejected until the
    /// administrator has executed Bootstrap.
    pub fn new(admin: Identity) -> Self {
        Self {
            admin,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Pin the ledger clock to a fixed timestamp.
    pub async fn set_clock(&self, epoch_seconds: i64) {
        self.inner.lock().await.now_override = Some(epoch_seconds);
    }

    /// Advance the pinned clock. Pins to the system clock first if needed.
    pub async fn advance_clock(&self, seconds: i64) {
        let mut inner = self.inner.lock().await;
        let now = inner.now();
        inner.now_override = Some(now + seconds);
    }

    /// Require `lag` confirmation polls per ticket before reporting
    /// `Confirmed`.
    pub async fn set_confirmation_lag(&self, lag: u32) {
        self.inner.lock().await.confirmation_lag = lag;
    }

    /// Serve the next `reads` profile fetches from the snapshot taken
    /// before the most recent execution.
    pub async fn hold_profile_visibility(&self, reads: u32) {
        self.inner.lock().await.stale_profile_reads = reads;
    }

    /// Fail the next `count` fetches with a transport error.
    pub async fn fail_next_fetches(&self, count: u32) {
        self.inner.lock().await.failing_fetches = count;
    }

    /// Plant a raw account payload at a profile address (tests only care
    /// about decode behavior on odd payloads).
    pub async fn plant_profile_payload(&self, address: Address, payload: Vec<u8>) {
        let mut inner = self.inner.lock().await;
        inner.profiles.insert(address, payload);
        inner.profile_order.push(address);
    }

    /// Number of daily records in existence (test observability).
    pub async fn record_count(&self) -> usize {
        self.inner.lock().await.records.len()
    }

    fn verify_signature(op: &SignedOperation) -> std::result::Result<(), RejectReason> {
        let key = VerifyingKey::from_bytes(op.public_key.as_bytes())
            .map_err(|_| RejectReason::Unauthorized)?;
        key.verify_strict(&op.payload(), &op.signature)
            .map_err(|_| RejectReason::Unauthorized)
    }

    fn apply(&self, inner: &mut Inner, op: &SignedOperation) -> Result<()> {
        let now = inner.now();
        match &op.operation {
            Operation::Bootstrap {
                administrator,
                registry,
            } => {
                if *registry != registry_address() {
                    warn!(%registry, "bootstrap with mismatched registry address");
                    return Err(Error::Rejected(RejectReason::Unauthorized));
                }
                if op.public_key != self.admin || *administrator != self.admin {
                    return Err(Error::Rejected(RejectReason::Unauthorized));
                }
                if inner.registry.is_some() {
                    return Err(Error::Rejected(RejectReason::AlreadyRegistered));
                }
                inner.registry = Some(encode_registry(&SystemRegistry {
                    administrator: *administrator,
                    total_registered: 0,
                }));
                debug!(admin = %administrator, "registry bootstrapped");
                Ok(())
            }
            Operation::Register {
                identity,
                display_name,
                profile,
                registry,
            } => {
                if op.public_key != *identity {
                    return Err(Error::Rejected(RejectReason::Unauthorized));
                }
                if *profile != profile_address(identity.as_bytes())
                    || *registry != registry_address()
                {
                    warn!(%identity, "register with mismatched address derivation");
                    return Err(Error::Rejected(RejectReason::Unauthorized));
                }
                let Some(registry_bytes) = inner.registry.as_deref() else {
                    warn!("register before bootstrap");
                    return Err(Error::Rejected(RejectReason::Unauthorized));
                };
                let mut reg = decode_registry(registry_bytes)?;
                if inner.profiles.contains_key(profile) {
                    return Err(Error::Rejected(RejectReason::AlreadyRegistered));
                }
                reg.total_registered += 1;
                inner.registry = Some(encode_registry(&reg));
                inner.profiles.insert(
                    *profile,
                    encode_profile(&Profile {
                        owner: *identity,
                        display_name: display_name.clone(),
                        check_in_count: 0,
                        last_check_in: 0,
                    }),
                );
                inner.profile_order.push(*profile);
                debug!(%identity, name = %display_name, "profile registered");
                Ok(())
            }
            Operation::CheckIn {
                identity, profile, ..
            } => {
                if op.public_key != *identity {
                    return Err(Error::Rejected(RejectReason::Unauthorized));
                }
                if *profile != profile_address(identity.as_bytes()) {
                    warn!(%identity, "check-in with mismatched profile address");
                    return Err(Error::Rejected(RejectReason::Unauthorized));
                }
                let Some(profile_bytes) = inner.profiles.get(profile) else {
                    return Err(Error::Rejected(RejectReason::NotRegistered));
                };
                let mut prof = decode_profile(profile_bytes)?;
                // The ledger derives the record address from its own
                // clock; the hint in the operation does not participate.
                let day = day_index(now);
                let record = daily_record_address(identity.as_bytes(), day);
                if inner.records.contains_key(&record) {
                    return Err(Error::Rejected(RejectReason::AlreadyClockedInToday));
                }
                inner.records.insert(
                    record,
                    encode_record(&DailyRecord {
                        owner: *identity,
                        day,
                        created_at: now,
                    }),
                );
                prof.check_in_count = prof.check_in_count.saturating_add(1);
                prof.last_check_in = now;
                inner.profiles.insert(*profile, encode_profile(&prof));
                debug!(%identity, day, "checked in");
                Ok(())
            }
        }
    }
}

impl LedgerGateway for MemoryLedger {
    async fn execute(&self, op: &SignedOperation) -> Result<Ticket> {
        let mut inner = self.inner.lock().await;

        if let Err(reason) = Self::verify_signature(op) {
            return Err(Error::Rejected(reason));
        }
        let signature = op.signature.to_bytes();
        if inner.seen.contains(&signature) {
            return Err(Error::Rejected(RejectReason::DuplicateSubmission));
        }
        inner.seen.insert(signature);

        // Snapshot for read-visibility holds before mutating.
        inner.profile_snapshot = inner.profiles.clone();

        self.apply(&mut inner, op)?;

        let id = inner.next_ticket;
        inner.next_ticket += 1;
        let executed_at = inner.now();
        let polls_until_visible = inner.confirmation_lag;
        inner.tickets.insert(
            id,
            TicketState {
                executed_at,
                polls_until_visible,
            },
        );
        Ok(Ticket(id))
    }

    async fn confirmation(&self, ticket: &Ticket) -> Result<Confirmation> {
        let mut inner = self.inner.lock().await;
        match inner.tickets.get_mut(&ticket.0) {
            Some(state) if state.polls_until_visible > 0 => {
                state.polls_until_visible -= 1;
                Ok(Confirmation::Pending)
            }
            Some(state) => Ok(Confirmation::Confirmed {
                executed_at: state.executed_at,
            }),
            None => Err(Error::Transport("unknown ticket".to_string())),
        }
    }

    async fn fetch_profile(&self, address: Address) -> Result<Option<Profile>> {
        let mut inner = self.inner.lock().await;
        inner.take_fetch_failure()?;
        let bytes = if inner.stale_profile_reads > 0 {
            inner.stale_profile_reads -= 1;
            inner.profile_snapshot.get(&address)
        } else {
            inner.profiles.get(&address)
        };
        Ok(bytes.map(|b| decode_profile(b)).transpose()?)
    }

    async fn fetch_daily_record(&self, address: Address) -> Result<Option<DailyRecord>> {
        let mut inner = self.inner.lock().await;
        inner.take_fetch_failure()?;
        Ok(inner
            .records
            .get(&address)
            .map(|b| decode_record(b))
            .transpose()?)
    }

    async fn fetch_registry(&self) -> Result<Option<SystemRegistry>> {
        let mut inner = self.inner.lock().await;
        inner.take_fetch_failure()?;
        Ok(inner
            .registry
            .as_deref()
            .map(decode_registry)
            .transpose()?)
    }

    async fn fetch_all_profiles(&self) -> Result<Vec<Profile>> {
        let mut inner = self.inner.lock().await;
        inner.take_fetch_failure()?;
        let profiles: std::result::Result<Vec<Profile>, DecodeError> = inner
            .profile_order
            .iter()
            .filter_map(|address| inner.profiles.get(address))
            .map(|bytes| decode_profile(bytes))
            .collect();
        Ok(profiles?)
    }
}
