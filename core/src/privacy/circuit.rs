// Circuit selection — distinct relays from a registry snapshot
//
// Uniform selection without replacement via a bounded partial Fisher-Yates
// shuffle. The too-small-universe case is an explicit failure checked up
// front; rejection sampling over a small pool never terminates reliably.

use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::debug;

use crate::registry::NodeDescriptor;

#[derive(Debug, Error)]
pub enum CircuitError {
    #[error("not enough registered relays for a {needed}-hop circuit (have {available})")]
    InsufficientNodes { needed: usize, available: usize },
}

/// Select `length` pairwise-distinct relays uniformly at random, without
/// replacement, from a point-in-time registry snapshot.
///
/// The returned circuit is ordered entry first. It is built fresh per
/// message and never persisted.
pub fn build_circuit(
    snapshot: &[NodeDescriptor],
    length: usize,
) -> Result<Vec<NodeDescriptor>, CircuitError> {
    if snapshot.len() < length {
        return Err(CircuitError::InsufficientNodes {
            needed: length,
            available: snapshot.len(),
        });
    }

    let mut pool = snapshot.to_vec();
    let mut rng = rand::thread_rng();
    let (selected, _) = pool.partial_shuffle(&mut rng, length);

    debug!(
        hops = ?selected.iter().map(|n| n.node_id).collect::<Vec<_>>(),
        "circuit selected"
    );
    Ok(selected.to_vec())
}
