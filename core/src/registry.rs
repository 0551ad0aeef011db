// Directory seam — (node id, public key) registration and snapshots
//
// The directory is an external collaborator; the core consumes it through
// this trait. `MemoryDirectory` is the in-process implementation used by the
// demo overlay and the integration tests.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("node {0} is already registered")]
    AlreadyRegistered(u32),
}

/// A registered relay: node id plus its base64 SPKI public key.
///
/// Immutable once registered. The serde names match the directory exchange
/// shape (`{"nodeId": …, "pubKey": …}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    #[serde(rename = "nodeId")]
    pub node_id: u32,
    #[serde(rename = "pubKey")]
    pub pub_key: String,
}

/// Directory collaborator: register once, list a point-in-time snapshot.
/// No subscription or change notification.
pub trait Directory: Send + Sync {
    /// Register a node. A conflict rejects only the offending attempt; the
    /// existing registration stands.
    fn register(&self, node: NodeDescriptor) -> Result<(), RegistryError>;

    /// Point-in-time snapshot of every registered node
    fn snapshot(&self) -> Vec<NodeDescriptor>;
}

/// In-process directory for harnesses
#[derive(Default)]
pub struct MemoryDirectory {
    nodes: RwLock<Vec<NodeDescriptor>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Directory for MemoryDirectory {
    fn register(&self, node: NodeDescriptor) -> Result<(), RegistryError> {
        let mut nodes = self.nodes.write();
        if nodes.iter().any(|n| n.node_id == node.node_id) {
            return Err(RegistryError::AlreadyRegistered(node.node_id));
        }
        info!(node_id = node.node_id, "node registered");
        nodes.push(node);
        Ok(())
    }

    fn snapshot(&self) -> Vec<NodeDescriptor> {
        self.nodes.read().clone()
    }
}
