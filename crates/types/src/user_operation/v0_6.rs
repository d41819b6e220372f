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

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};
use opgas_contracts::v0_6::{IEntryPoint, UserOperation as ContractUserOperation};
use serde::{Deserialize, Serialize};

use super::{GasOverrides, UserOperation as UserOperationTrait};
use crate::EntryPointVersion;

/// User operation for entry point v0.6, in its unpacked wire form
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    /// Sender
    pub sender: Address,
    /// Semi-abstracted nonce, 192 bit key and 64 bit sequence
    pub nonce: U256,
    /// Factory address followed by its calldata, empty if already deployed
    #[serde(default)]
    pub init_code: Bytes,
    /// Calldata
    pub call_data: Bytes,
    /// Call gas limit
    #[serde(default)]
    pub call_gas_limit: U256,
    /// Verification gas limit
    #[serde(default)]
    pub verification_gas_limit: U256,
    /// Pre verification gas
    #[serde(default)]
    pub pre_verification_gas: U256,
    /// Max fee per gas
    #[serde(default)]
    pub max_fee_per_gas: U256,
    /// Max priority fee per gas
    #[serde(default)]
    pub max_priority_fee_per_gas: U256,
    /// Paymaster address followed by its data, empty if no paymaster
    #[serde(default)]
    pub paymaster_and_data: Bytes,
    /// Signature
    #[serde(default)]
    pub signature: Bytes,
}

impl UserOperation {
    /// Converts to the ABI form used as entry point calldata
    pub fn pack(&self) -> ContractUserOperation {
        ContractUserOperation {
            sender: self.sender,
            nonce: self.nonce,
            initCode: self.init_code.clone(),
            callData: self.call_data.clone(),
            callGasLimit: self.call_gas_limit,
            verificationGasLimit: self.verification_gas_limit,
            preVerificationGas: self.pre_verification_gas,
            maxFeePerGas: self.max_fee_per_gas,
            maxPriorityFeePerGas: self.max_priority_fee_per_gas,
            paymasterAndData: self.paymaster_and_data.clone(),
            signature: self.signature.clone(),
        }
    }

    fn pack_for_hash(&self) -> Vec<u8> {
        (
            self.sender,
            self.nonce,
            keccak256(&self.init_code),
            keccak256(&self.call_data),
            self.call_gas_limit,
            self.verification_gas_limit,
            self.pre_verification_gas,
            self.max_fee_per_gas,
            self.max_priority_fee_per_gas,
            keccak256(&self.paymaster_and_data),
        )
            .abi_encode()
    }
}

impl UserOperationTrait for UserOperation {
    fn entry_point_version() -> EntryPointVersion {
        EntryPointVersion::V0_6
    }

    fn sender(&self) -> Address {
        self.sender
    }

    fn nonce(&self) -> U256 {
        self.nonce
    }

    fn factory(&self) -> Option<Address> {
        get_address_from_field(&self.init_code)
    }

    fn paymaster(&self) -> Option<Address> {
        get_address_from_field(&self.paymaster_and_data)
    }

    fn call_data(&self) -> &Bytes {
        &self.call_data
    }

    fn call_gas_limit(&self) -> U256 {
        self.call_gas_limit
    }

    fn verification_gas_limit(&self) -> U256 {
        self.verification_gas_limit
    }

    fn pre_verification_gas(&self) -> U256 {
        self.pre_verification_gas
    }

    fn max_fee_per_gas(&self) -> U256 {
        self.max_fee_per_gas
    }

    fn max_priority_fee_per_gas(&self) -> U256 {
        self.max_priority_fee_per_gas
    }

    fn hash(&self, entry_point: Address, chain_id: u64) -> B256 {
        keccak256(
            (
                keccak256(self.pack_for_hash()),
                entry_point,
                U256::from(chain_id),
            )
                .abi_encode(),
        )
    }

    fn with_gas(&self, overrides: &GasOverrides) -> Self {
        Self {
            pre_verification_gas: overrides
                .pre_verification_gas
                .unwrap_or(self.pre_verification_gas),
            verification_gas_limit: overrides
                .verification_gas_limit
                .unwrap_or(self.verification_gas_limit),
            call_gas_limit: overrides.call_gas_limit.unwrap_or(self.call_gas_limit),
            max_fee_per_gas: overrides.max_fee_per_gas.unwrap_or(self.max_fee_per_gas),
            max_priority_fee_per_gas: overrides
                .max_priority_fee_per_gas
                .unwrap_or(self.max_priority_fee_per_gas),
            ..self.clone()
        }
    }

    fn abi_encode_with_hashed_signature(&self) -> Vec<u8> {
        let mut op = self.pack();
        op.signature = keccak256(&self.signature).to_vec().into();
        op.abi_encode()
    }

    fn handle_ops_calldata(&self, beneficiary: Address) -> Bytes {
        IEntryPoint::handleOpsCall {
            ops: vec![self.pack()],
            beneficiary,
        }
        .abi_encode()
        .into()
    }
}

fn get_address_from_field(data: &Bytes) -> Option<Address> {
    if data.len() < 20 {
        None
    } else {
        Some(Address::from_slice(&data[..20]))
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, b256, bytes};

    use super::*;
    use crate::UserOperationId;

    fn test_op() -> UserOperation {
        UserOperation {
            sender: address!("0000000000000000000000000000000000000000"),
            nonce: U256::ZERO,
            init_code: Bytes::default(),
            call_data: Bytes::default(),
            call_gas_limit: U256::ZERO,
            verification_gas_limit: U256::ZERO,
            pre_verification_gas: U256::ZERO,
            max_fee_per_gas: U256::ZERO,
            max_priority_fee_per_gas: U256::ZERO,
            paymaster_and_data: Bytes::default(),
            signature: Bytes::default(),
        }
    }

    #[test]
    fn test_hash_zeroed() {
        // Testing a user operation hash against the hash generated by the
        // entrypoint contract getUserOpHash() function with entrypoint address
        // at 0x66a15edcc3b50a663e72f1457ffd49b9ae284ddc and chain ID 1337.
        let hash = test_op().hash(address!("66a15edcc3b50a663e72f1457ffd49b9ae284ddc"), 1337);
        assert_eq!(
            hash,
            b256!("dca97c3b49558ab360659f6ead939773be8bf26631e61bb17045bb70dc983b2d")
        );
    }

    #[test]
    fn test_hash() {
        // Hash generated by getUserOpHash() with the entry point at
        // 0x66a15edcc3b50a663e72f1457ffd49b9ae284ddc and chain ID 1337.
        let op = UserOperation {
            sender: address!("1306b01bc3e4ad202612d3843387e94737673f53"),
            nonce: U256::from(8942),
            init_code: bytes!("6942069420694206942069420694206942069420"),
            call_data: bytes!("0000000000000000000000000000000000000000080085"),
            call_gas_limit: U256::from(10_000),
            verification_gas_limit: U256::from(100_000),
            pre_verification_gas: U256::from(100),
            max_fee_per_gas: U256::from(99_999),
            max_priority_fee_per_gas: U256::from(9_999_999),
            paymaster_and_data: bytes!(
                "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"
            ),
            signature: bytes!("da0929f527cded8d0a1eaf2e8861d7f7e2d8160b7b13942f99dd367df4473a"),
        };
        assert_eq!(
            op.hash(address!("66a15edcc3b50a663e72f1457ffd49b9ae284ddc"), 1337),
            b256!("484add9e4d8c3172d11b5feb6a3cc712280e176d278027cfa02ee396eb28afa1")
        );
    }

    #[test]
    fn test_hash_is_deterministic_and_field_sensitive() {
        let entry_point = address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");
        let op = UserOperation {
            sender: address!("1306b01bc3e4ad202612d3843387e94737673f53"),
            nonce: U256::from(8942),
            call_data: bytes!("0000000000000000000000000000000000000000080085"),
            call_gas_limit: U256::from(10_000),
            verification_gas_limit: U256::from(100_000),
            pre_verification_gas: U256::from(100),
            max_fee_per_gas: U256::from(99_999),
            max_priority_fee_per_gas: U256::from(9_999_999),
            signature: bytes!("da0929f527cded8d0a1eaf2e8861d7f7e2d8160b7b13942f99dd367df4473a"),
            ..test_op()
        };

        let hash = op.hash(entry_point, 1);
        assert_eq!(hash, op.clone().hash(entry_point, 1));

        let bumped = UserOperation {
            nonce: U256::from(8943),
            ..op.clone()
        };
        assert_ne!(hash, bumped.hash(entry_point, 1));
        assert_ne!(hash, op.hash(entry_point, 10));
    }

    #[test]
    fn test_with_gas_copies() {
        let op = UserOperation {
            call_gas_limit: U256::from(5),
            verification_gas_limit: U256::from(6),
            ..test_op()
        };
        let copy = op.with_gas(&GasOverrides {
            call_gas_limit: Some(U256::ZERO),
            ..Default::default()
        });
        assert_eq!(copy.call_gas_limit, U256::ZERO);
        assert_eq!(copy.verification_gas_limit, U256::from(6));
        assert_eq!(op.call_gas_limit, U256::from(5));
    }

    #[test]
    fn test_factory_and_paymaster() {
        let op = UserOperation {
            init_code: bytes!("1306b01bc3e4ad202612d3843387e94737673f53deadbeef"),
            paymaster_and_data: bytes!("1234"),
            ..test_op()
        };
        assert_eq!(
            op.factory(),
            Some(address!("1306b01bc3e4ad202612d3843387e94737673f53"))
        );
        assert_eq!(op.paymaster(), None);
    }

    #[test]
    fn test_id_ignores_gas_fields() {
        let op = UserOperation {
            sender: address!("1306b01bc3e4ad202612d3843387e94737673f53"),
            nonce: U256::from(3),
            ..test_op()
        };
        let repriced = op.with_gas(&GasOverrides {
            call_gas_limit: Some(U256::from(100_000)),
            max_fee_per_gas: Some(U256::from(7)),
            ..Default::default()
        });

        assert_eq!(
            op.id(),
            UserOperationId {
                sender: op.sender,
                nonce: U256::from(3),
            }
        );
        assert_eq!(repriced.id(), op.id());
        assert_ne!(
            UserOperation {
                nonce: U256::from(4),
                ..op.clone()
            }
            .id(),
            op.id()
        );
    }

    #[test]
    fn test_hashed_signature_encoding_ignores_signature_length() {
        let short = UserOperation {
            signature: bytes!("01"),
            ..test_op()
        };
        let long = UserOperation {
            signature: Bytes::from(vec![1u8; 65]),
            ..test_op()
        };
        assert_eq!(
            short.abi_encode_with_hashed_signature().len(),
            long.abi_encode_with_hashed_signature().len()
        );
    }
}
