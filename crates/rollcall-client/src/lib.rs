//! Rollcall client core
//!
//! A client for a daily check-in ledger: a participant proves once per
//! calendar day that they checked in, and any observer can recompute
//! cumulative counts and a leaderboard purely from ledger state.
//!
//! # Architecture
//!
//! - **Models**: Profile, DailyRecord, SystemRegistry, plus the
//!   versioned account codec
//! - **Gateway**: the ledger seam ([`LedgerGateway`]), with an
//!   in-process reference ledger for tests and local development
//! - **Operation**: pure construction and signing of Register, CheckIn
//!   and Bootstrap
//! - **Submit**: sign, send, bounded confirmation polling
//! - **Reconcile**: converge optimistic local state with ledger state
//! - **Leaderboard**: read-only top-ten projection
//! - **Session**: the lifecycle state machine served to the UI layer
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rollcall_client::{gateway::memory::MemoryLedger, LocalSigner, Session, SessionConfig};
//! use rollcall_client::SignerProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let admin = LocalSigner::generate();
//!     let ledger = Arc::new(MemoryLedger::new(admin.identity().unwrap()));
//!
//!     let signer = Arc::new(LocalSigner::generate());
//!     let session = Arc::new(Session::new(ledger, signer, SessionConfig::default()));
//!     let reconciler = Arc::clone(&session).spawn_reconciler();
//!
//!     session.register("Alice").await?;
//!     session.check_in().await?;
//!
//!     session.shutdown();
//!     reconciler.await?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod error;
pub mod gateway;
pub mod leaderboard;
pub mod models;
pub mod operation;
pub mod reconcile;
pub mod session;
pub mod signer;
pub mod submit;

pub use error::{DecodeError, Error, Result, ValidationError};
pub use gateway::{Confirmation, LedgerGateway, RejectReason, Ticket};
pub use leaderboard::{Leaderboard, LeaderboardEntry, Projector};
pub use models::{DailyRecord, Identity, Profile, SystemRegistry};
pub use operation::{Operation, SignedOperation};
pub use reconcile::{ReconcileConfig, Reconciler, ResolvedState};
pub use session::{Session, SessionConfig, SessionState};
pub use signer::{LocalSigner, SignerProvider};
pub use submit::{SubmitConfig, SubmitOutcome, Submitter};
