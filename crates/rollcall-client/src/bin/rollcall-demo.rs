//! Rollcall demo
//!
//! Drives the full client flow against the in-process ledger: bootstrap,
//! register, check in, check in again the same day, then print the
//! leaderboard. A zero-network smoke path for the whole client.

use std::sync::Arc;

use rollcall_client::gateway::memory::MemoryLedger;
use rollcall_client::{
    LocalSigner, ResolvedState, Session, SessionConfig, SignerProvider,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollcall_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let admin = LocalSigner::generate();
    let admin_identity = admin.identity().expect("local signer has an identity");
    let ledger = Arc::new(MemoryLedger::new(admin_identity));

    // One-time system bootstrap by the administrator.
    let admin_session = Session::new(
        Arc::clone(&ledger),
        Arc::new(admin),
        SessionConfig::from_env(),
    );
    admin_session.bootstrap().await?;
    tracing::info!(admin = %admin_identity, "system bootstrapped");

    // A participant session with its own signer.
    let session = Arc::new(Session::new(
        Arc::clone(&ledger),
        Arc::new(LocalSigner::generate()),
        SessionConfig::from_env(),
    ));
    let reconciler = Arc::clone(&session).spawn_reconciler();

    let profile = session.register("Alice").await?;
    tracing::info!(name = %profile.display_name, "registered");

    let resolved = session.check_in().await?;
    tracing::info!(
        count = resolved.profile().check_in_count,
        authoritative = resolved.is_authoritative(),
        "checked in"
    );

    // A second attempt the same day resolves, it does not error.
    match session.check_in().await? {
        ResolvedState::AlreadyCheckedIn(profile) => {
            tracing::info!(count = profile.check_in_count, "already checked in today");
        }
        other => tracing::warn!(?other, "expected the already-checked-in resolution"),
    }

    let board = session.leaderboard().await;
    println!("{}", serde_json::to_string_pretty(&board)?);

    session.shutdown();
    reconciler.await?;
    Ok(())
}
