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

//! Utilities for working with EVM revert data.

use alloy_primitives::Bytes;
use alloy_sol_types::{Revert, SolError};

/// Parses the revert message from the revert data
pub fn parse_revert_message(revert_data: &[u8]) -> Option<String> {
    Revert::abi_decode(revert_data)
        .ok()
        .map(|err| err.reason)
}

/// Returns the 4 byte selector of revert data, if there is one
pub fn revert_selector(revert_data: &Bytes) -> Option<[u8; 4]> {
    revert_data.get(..4)?.try_into().ok()
}

#[cfg(test)]
mod tests {
    use alloy_primitives::bytes;

    use super::*;

    #[test]
    fn test_parse_revert_message() {
        let data = Revert {
            reason: "transfer failed".to_string(),
        }
        .abi_encode();
        assert_eq!(
            parse_revert_message(&data),
            Some("transfer failed".to_string())
        );
        assert_eq!(parse_revert_message(&[0xde, 0xad]), None);
    }

    #[test]
    fn test_revert_selector() {
        assert_eq!(
            revert_selector(&bytes!("08c379a0ff")),
            Some([0x08, 0xc3, 0x79, 0xa0])
        );
        assert_eq!(revert_selector(&bytes!("08c3")), None);
    }
}
