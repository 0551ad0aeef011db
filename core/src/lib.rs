// Shallot Core — layered hybrid-encryption onion overlay
//
// A sender wraps a message in nested encryption layers; each relay peels
// exactly one layer, learns only the next hop's address, and forwards the
// remainder. Nobody on the path sees the origin, the destination, and the
// plaintext at once.
//
// The transport that moves blobs between processes and the directory that
// maps node ids to public keys are external collaborators, consumed through
// the trait seams in `transport` and `registry`.

pub mod config;
pub mod crypto;
pub mod message;
pub mod privacy;
pub mod registry;
pub mod relay;
pub mod transport;
pub mod user;

pub use config::ProtocolConfig;
pub use crypto::{decrypt_layer, encrypt_for_hop, CipherError, KeyError, SymmetricKey};
pub use message::{HopAddress, PlaintextEnvelope};
pub use privacy::{build_circuit, build_onion, CircuitError, OnionError};
pub use registry::{Directory, MemoryDirectory, NodeDescriptor, RegistryError};
pub use relay::{RelayNode, RelayError, RelayOutcome};
pub use transport::{DeliveryAck, DeliveryError, InboundHandler, LoopbackTransport, Transport};
pub use user::{SendError, UserNode};
