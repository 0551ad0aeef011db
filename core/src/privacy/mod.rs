// Privacy core — circuit selection and onion construction
//
// A circuit is chosen fresh for every outgoing message; the onion is built
// innermost-first so each hop can learn only its successor's address.

pub mod circuit;
pub mod onion;

pub use circuit::{build_circuit, CircuitError};
pub use onion::{build_onion, OnionError};
