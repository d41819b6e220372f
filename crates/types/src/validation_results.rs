// This file is part of opgas.
//
// opgas is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// opgas is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with opgas.
// If not, see https://www.gnu.org/licenses/.

use std::fmt;

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{Panic, Revert, SolError};
use opgas_contracts::{
    v0_6::IEntryPoint::FailedOp as FailedOpV0_6,
    v0_7::IEntryPoint::{FailedOp as FailedOpV0_7, FailedOpWithRevert as FailedOpWithRevertV0_7},
};
use serde::{Deserialize, Serialize};

/// Failure reported by the entry point while validating or executing an operation
#[derive(Clone, Debug, thiserror::Error, Eq, PartialEq)]
pub enum ValidationRevert {
    /// The entry point reverted
    #[error("{0}")]
    EntryPoint(String),
    /// The operation reverted
    #[error("{}", Self::display_operation_error(.entry_point_reason, .inner_revert_reason))]
    Operation {
        /// Error message returned by entry point
        entry_point_reason: String,
        /// Revert data of the validation failure returned by an entity
        inner_revert_data: Bytes,
        /// Message parsed from the inner revert data, either a `revert`/`require`
        /// reason or the description of a panic code
        inner_revert_reason: Option<String>,
    },
    /// Validation reverted with an unknown signature
    #[error("revert with bytes: {0:?}")]
    Unknown(Bytes),
    /// Validation reverted with a panic
    #[error("panic: {}", panic_reason(.0))]
    Panic(Panic),
}

impl ValidationRevert {
    /// The reason string reported by the entry point, if any.
    pub fn entry_point_reason(&self) -> Option<&str> {
        match self {
            Self::EntryPoint(reason) => Some(reason),
            Self::Operation {
                entry_point_reason, ..
            } => Some(entry_point_reason),
            Self::Unknown(_) | Self::Panic(_) => None,
        }
    }

    /// Extracts the error code string returned by the entry point, e.g.
    /// `"AA24"`, if it exists.
    pub fn entry_point_error_code(&self) -> Option<&str> {
        self.entry_point_reason()
            .filter(|m| m.len() >= 4 && m.starts_with("AA"))
            .map(|m| &m[..4])
    }

    /// Decodes arbitrary revert data, falling back to `Unknown`.
    pub fn from_revert_data(data: &Bytes) -> Self {
        if let Ok(revert) = Revert::abi_decode(data) {
            revert.into()
        } else if let Ok(panic) = Panic::abi_decode(data) {
            panic.into()
        } else {
            Self::Unknown(data.clone())
        }
    }

    fn display_operation_error(
        entry_point_message: &str,
        inner_message: &Option<String>,
    ) -> String {
        match inner_message {
            Some(inner_message) => format!("{entry_point_message} : {inner_message}"),
            None => entry_point_message.to_owned(),
        }
    }
}

/// Human readable description of a Solidity panic code
pub fn panic_reason(panic: &Panic) -> String {
    match panic.kind() {
        Some(kind) => kind.as_str().to_string(),
        None => format!("unknown panic code {:#x}", panic.code),
    }
}

impl From<Revert> for ValidationRevert {
    fn from(value: Revert) -> Self {
        ValidationRevert::EntryPoint(value.reason)
    }
}

impl From<Panic> for ValidationRevert {
    fn from(value: Panic) -> Self {
        ValidationRevert::Panic(value)
    }
}

impl From<FailedOpV0_6> for ValidationRevert {
    fn from(value: FailedOpV0_6) -> Self {
        ValidationRevert::EntryPoint(value.reason)
    }
}

impl From<FailedOpV0_7> for ValidationRevert {
    fn from(value: FailedOpV0_7) -> Self {
        ValidationRevert::EntryPoint(value.reason)
    }
}

impl From<FailedOpWithRevertV0_7> for ValidationRevert {
    fn from(value: FailedOpWithRevertV0_7) -> Self {
        let inner_message = Revert::abi_decode(&value.inner)
            .map(|err| err.reason)
            .ok()
            .or_else(|| {
                Panic::abi_decode(&value.inner)
                    .ok()
                    .map(|panic| panic_reason(&panic))
            });
        ValidationRevert::Operation {
            entry_point_reason: value.reason,
            inner_revert_data: value.inner,
            inner_revert_reason: inner_message,
        }
    }
}

/// Window of timestamps in which an operation is valid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidTimeRange {
    /// The operation is valid after this timestamp
    pub valid_after: u64,
    /// The operation is valid until this timestamp, `u64::MAX` when unbounded
    pub valid_until: u64,
}

impl Default for ValidTimeRange {
    fn default() -> Self {
        Self::all_time()
    }
}

impl ValidTimeRange {
    /// Creates a range, treating a zero `valid_until` as unbounded
    pub fn new(valid_after: u64, valid_until: u64) -> Self {
        let valid_until = if valid_until == 0 {
            u64::MAX
        } else {
            valid_until
        };
        Self {
            valid_after,
            valid_until,
        }
    }

    /// A range that is always valid
    pub fn all_time() -> Self {
        Self {
            valid_after: 0,
            valid_until: u64::MAX,
        }
    }

    /// Returns true if the range puts no bound on either side
    pub fn is_unbounded(&self) -> bool {
        *self == Self::all_time()
    }

    /// The range in which both `self` and `other` are valid
    pub fn intersect(self, other: Self) -> Self {
        Self {
            valid_after: self.valid_after.max(other.valid_after),
            valid_until: self.valid_until.min(other.valid_until),
        }
    }
}

/// Parsed form of the packed validation data word returned by accounts and paymasters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidationData {
    /// Aggregator address, or a signature failure marker
    pub aggregator: Address,
    /// Valid after timestamp
    pub valid_after: u64,
    /// Valid until timestamp, `u64::MAX` when unbounded
    pub valid_until: u64,
}

impl ValidationData {
    /// Valid time range for the validation data
    pub fn valid_time_range(&self) -> ValidTimeRange {
        ValidTimeRange::new(self.valid_after, self.valid_until)
    }
}

impl From<U256> for ValidationData {
    /// Layout: `validAfter (6 bytes) | validUntil (6 bytes) | aggregator (20 bytes)`
    fn from(data: U256) -> Self {
        let slice: [u8; 32] = data.to_be_bytes();
        let aggregator = Address::from_slice(&slice[12..]);

        let mut buf = [0; 8];
        buf[2..8].copy_from_slice(&slice[6..12]);
        let mut valid_until = u64::from_be_bytes(buf);
        if valid_until == 0 {
            valid_until = u64::MAX;
        }

        let mut buf = [0; 8];
        buf[2..8].copy_from_slice(&slice[..6]);
        let valid_after = u64::from_be_bytes(buf);

        Self {
            aggregator,
            valid_after,
            valid_until,
        }
    }
}

impl fmt::Display for ValidTimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.valid_after, self.valid_until)
    }
}
