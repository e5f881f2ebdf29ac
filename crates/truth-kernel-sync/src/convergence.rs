//! Convergence check between engines.
//!
//! Two engines that hold the same set of records produce the same digest,
//! regardless of the order in which records arrived or which peer they came
//! from. Comparing digests is enough to tell whether a round is still needed.

use truth_kernel_core::{Blake3Hash, RecordId};
use truth_kernel_store::Store;

use crate::error::Result;

const DIGEST_DOMAIN: &[u8] = b"truth-kernel/store-digest/v1";

/// Digest of a set of record ids.
///
/// Algorithm:
/// 1. Sort ids ascending
/// 2. H = Blake3(domain || count || id_1 || ... || id_n)
pub fn digest_ids(ids: &[RecordId]) -> Blake3Hash {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut hasher = blake3::Hasher::new();
    hasher.update(DIGEST_DOMAIN);
    hasher.update(&(sorted.len() as u64).to_be_bytes());
    for id in &sorted {
        hasher.update(id.as_bytes());
    }
    Blake3Hash(*hasher.finalize().as_bytes())
}

/// Digest of everything a store holds.
pub async fn store_digest<S: Store + ?Sized>(store: &S) -> Result<Blake3Hash> {
    let ids = store.ids().await?;
    Ok(digest_ids(&ids))
}

/// Result of comparing two stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceResult {
    /// Both hold the same record set.
    Converged,
    /// The sets differ.
    Diverged {
        local: Blake3Hash,
        remote: Blake3Hash,
    },
}

/// Compare a local store against a remote digest.
pub async fn verify_convergence<S: Store + ?Sized>(
    local: &S,
    remote: &Blake3Hash,
) -> Result<ConvergenceResult> {
    let local = store_digest(local).await?;
    if local.as_bytes() == remote.as_bytes() {
        Ok(ConvergenceResult::Converged)
    } else {
        Ok(ConvergenceResult::Diverged {
            local,
            remote: *remote,
        })
    }
}
