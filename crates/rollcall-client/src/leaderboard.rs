//! Leaderboard projection.
//!
//! Read-only: fetch every profile, rank by cumulative check-in count,
//! keep the top ten. A failed fetch yields an empty, error-flagged board
//! rather than a partial one.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::gateway::LedgerGateway;

/// Number of entries a board keeps.
pub const BOARD_SIZE: usize = 10;

/// One ranked row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub display_name: String,
    pub check_in_count: u64,
}

/// A projected leaderboard.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Leaderboard {
    /// Ranked entries, highest count first; ties keep fetch order.
    pub entries: Vec<LeaderboardEntry>,
    /// Set when the underlying fetch failed; `entries` is empty then.
    pub fetch_error: Option<String>,
}

/// Projects the leaderboard from ledger state. No mutation, no retries
/// beyond the gateway's own surfacing.
pub struct Projector<G> {
    gateway: Arc<G>,
}

impl<G: LedgerGateway> Projector<G> {
    /// Create a projector over a shared gateway handle.
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Project the current top ten.
    pub async fn project(&self) -> Leaderboard {
        let profiles = match self.gateway.fetch_all_profiles().await {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!(error = %e, "leaderboard fetch failed");
                return Leaderboard {
                    entries: Vec::new(),
                    fetch_error: Some(e.to_string()),
                };
            }
        };

        let mut entries: Vec<LeaderboardEntry> = profiles
            .into_iter()
            .map(|profile| LeaderboardEntry {
                display_name: profile.display_name,
                check_in_count: profile.check_in_count,
            })
            .collect();
        // Stable sort: ties keep the fetch's arrival order.
        entries.sort_by(|a, b| b.check_in_count.cmp(&a.check_in_count));
        entries.truncate(BOARD_SIZE);

        Leaderboard {
            entries,
            fetch_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryLedger;
    use crate::operation::Operation;
    use crate::signer::{LocalSigner, SignerProvider};
    use crate::submit::{SubmitConfig, Submitter};

    const DAY0: i64 = 1_700_006_400;

    /// Register users and give each `counts[i]` check-ins by walking the
    /// ledger clock forward one day at a time.
    async fn seeded(names: &[&str], counts: &[u64]) -> Arc<MemoryLedger> {
        let admin = LocalSigner::generate();
        let ledger = Arc::new(MemoryLedger::new(admin.identity().unwrap()));
        ledger.set_clock(DAY0).await;
        let submitter = Submitter::new(Arc::clone(&ledger), SubmitConfig::fast());
        submitter
            .submit(Operation::bootstrap(admin.identity().unwrap()), &admin)
            .await
            .unwrap();

        let signers: Vec<LocalSigner> =
            names.iter().map(|_| LocalSigner::generate()).collect();
        for (signer, name) in signers.iter().zip(names) {
            submitter
                .submit(
                    Operation::register(signer.identity().unwrap(), name).unwrap(),
                    signer,
                )
                .await
                .unwrap();
        }

        let max = counts.iter().copied().max().unwrap_or(0);
        for day in 0..max {
            let now = DAY0 + day as i64 * 86_400;
            for (signer, target) in signers.iter().zip(counts) {
                if day < *target {
                    submitter
                        .submit(Operation::check_in(signer.identity().unwrap(), now), signer)
                        .await
                        .unwrap();
                }
            }
            ledger.advance_clock(86_400).await;
        }
        ledger
    }

    #[tokio::test]
    async fn ranks_descending_with_stable_ties() {
        let ledger = seeded(&["ann", "bo", "cy", "dee"], &[5, 20, 20, 1]).await;
        let board = Projector::new(ledger).project().await;

        assert!(board.fetch_error.is_none());
        let ranked: Vec<(&str, u64)> = board
            .entries
            .iter()
            .map(|e| (e.display_name.as_str(), e.check_in_count))
            .collect();
        // Ties preserve arrival order: bo registered before cy.
        assert_eq!(ranked, vec![("bo", 20), ("cy", 20), ("ann", 5), ("dee", 1)]);
    }

    #[tokio::test]
    async fn truncates_to_ten() {
        let names: Vec<String> = (0..12).map(|i| format!("user{i}")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let counts: Vec<u64> = (1..=12).collect();
        let ledger = seeded(&name_refs, &counts).await;

        let board = Projector::new(ledger).project().await;
        assert_eq!(board.entries.len(), BOARD_SIZE);
        assert_eq!(board.entries[0].check_in_count, 12);
        assert_eq!(board.entries[BOARD_SIZE - 1].check_in_count, 3);
    }

    #[tokio::test]
    async fn fetch_failure_flags_an_empty_board() {
        let ledger = seeded(&["ann"], &[2]).await;
        ledger.fail_next_fetches(1).await;

        let board = Projector::new(Arc::clone(&ledger)).project().await;
        assert!(board.entries.is_empty());
        assert!(board.fetch_error.is_some());

        // The next projection recovers.
        let board = Projector::new(ledger).project().await;
        assert_eq!(board.entries.len(), 1);
        assert!(board.fetch_error.is_none());
    }
}
