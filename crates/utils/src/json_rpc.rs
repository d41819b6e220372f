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

//! JSON-RPC utilities

use alloy_primitives::Bytes;
use serde_json::Value;

/// The error code nodes use for reverted `eth_call`s
pub const EXECUTION_REVERTED_CODE: i64 = 3;

/// Check if a JSON-RPC error message indicates an execution revert
pub fn check_execution_reverted(message: &str) -> bool {
    message.starts_with("execution reverted")
}

/// Follows `path` through nested JSON objects.
///
/// An empty path returns `value` itself.
pub fn value_at_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |value, key| value.get(key))
}

/// Decodes a `0x` prefixed hex string value into bytes
pub fn hex_bytes(value: &Value) -> Option<Bytes> {
    let s = value.as_str()?;
    if !s.starts_with("0x") {
        return None;
    }
    const_hex::decode(s).ok().map(Bytes::from)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_value_at_path() {
        let value = json!({"cause": {"cause": {"data": "0x1234"}}});
        assert_eq!(
            value_at_path(&value, &["cause", "cause", "data"]),
            Some(&json!("0x1234"))
        );
        assert_eq!(value_at_path(&value, &["cause", "data"]), None);
        assert_eq!(value_at_path(&value, &[]), Some(&value));
    }

    #[test]
    fn test_hex_bytes() {
        assert_eq!(
            hex_bytes(&json!("0x1234")),
            Some(Bytes::from(vec![0x12, 0x34]))
        );
        assert_eq!(hex_bytes(&json!("0x")), Some(Bytes::new()));
        assert_eq!(hex_bytes(&json!("1234")), None);
        assert_eq!(hex_bytes(&json!("0xzz")), None);
        assert_eq!(hex_bytes(&json!(12)), None);
    }

    #[test]
    fn test_check_execution_reverted() {
        assert!(check_execution_reverted("execution reverted"));
        assert!(check_execution_reverted("execution reverted: AA21"));
        assert!(!check_execution_reverted("header not found"));
    }
}
