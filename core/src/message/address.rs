// Hop address tokens — fixed-width decimal protocol framing
//
// An address is exactly 10 ASCII digits, zero-left-padded. The width is
// protocol framing, not a display convention: every decrypted envelope is
// split at this boundary with no delimiter.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Width of an encoded address token in ASCII digits
pub const ADDRESS_WIDTH: usize = 10;

/// Largest value an address token can carry (10 decimal digits)
const MAX_ADDRESS: u64 = 9_999_999_999;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address token must be exactly {ADDRESS_WIDTH} characters, got {0}")]
    BadLength(usize),
    #[error("address token contains a non-digit character")]
    NonNumeric,
    #[error("address value {0} does not fit in {ADDRESS_WIDTH} digits")]
    OutOfRange(u64),
}

/// A routing key resolvable by the transport to a live relay or user process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HopAddress(u64);

impl HopAddress {
    /// Wrap a numeric token, rejecting values wider than 10 digits
    pub fn new(value: u64) -> Result<Self, AddressError> {
        if value > MAX_ADDRESS {
            return Err(AddressError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    /// The numeric token value
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Encode as a zero-left-padded 10-digit string
    pub fn encode(&self) -> String {
        format!("{:0width$}", self.0, width = ADDRESS_WIDTH)
    }

    /// Decode a 10-digit token. Rejects wrong-length and non-numeric input;
    /// there is no lenient mode, an unparsable prefix means "not an address".
    pub fn decode(token: &str) -> Result<Self, AddressError> {
        if token.len() != ADDRESS_WIDTH {
            return Err(AddressError::BadLength(token.len()));
        }
        if !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AddressError::NonNumeric);
        }
        // 10 digits always fit in u64
        let value = token.parse::<u64>().map_err(|_| AddressError::NonNumeric)?;
        Ok(Self(value))
    }
}

impl fmt::Display for HopAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
