// Message module — address tokens and plaintext envelope framing

pub mod address;
pub mod envelope;

pub use address::{AddressError, HopAddress, ADDRESS_WIDTH};
pub use envelope::{EnvelopeError, PlaintextEnvelope};
