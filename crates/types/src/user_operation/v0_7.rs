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
use opgas_contracts::v0_7::{IEntryPoint, PackedUserOperation};
use serde::{Deserialize, Serialize};

use super::{concat_128, saturating_u128, GasOverrides, UserOperation as UserOperationTrait};
use crate::EntryPointVersion;

/// User operation for entry point v0.7
///
/// Off-chain form with every field split out, [`UserOperation::pack`] produces
/// the form the entry point consumes.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    /// Sender
    pub sender: Address,
    /// Semi-abstracted nonce, 192 bit key and 64 bit sequence
    pub nonce: U256,
    /// Factory, set only when the sender is not yet deployed
    #[serde(default)]
    pub factory: Option<Address>,
    /// Factory data
    #[serde(default)]
    pub factory_data: Bytes,
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
    /// Max priority fee per gas
    #[serde(default)]
    pub max_priority_fee_per_gas: U256,
    /// Max fee per gas
    #[serde(default)]
    pub max_fee_per_gas: U256,
    /// Paymaster, if any
    #[serde(default)]
    pub paymaster: Option<Address>,
    /// Paymaster verification gas limit
    #[serde(default)]
    pub paymaster_verification_gas_limit: U256,
    /// Paymaster post-op gas limit
    #[serde(default)]
    pub paymaster_post_op_gas_limit: U256,
    /// Paymaster data
    #[serde(default)]
    pub paymaster_data: Bytes,
    /// Signature
    #[serde(default)]
    pub signature: Bytes,
}

impl UserOperation {
    /// Packs the operation into the form the entry point consumes.
    ///
    /// Gas values are packed in 16 byte halves, saturating at `u128::MAX`.
    pub fn pack(&self) -> PackedUserOperation {
        let init_code = self
            .factory
            .map(|factory| {
                let mut init_code = factory.to_vec();
                init_code.extend_from_slice(&self.factory_data);
                Bytes::from(init_code)
            })
            .unwrap_or_default();

        let paymaster_and_data = self
            .paymaster
            .map(|paymaster| {
                let mut paymaster_and_data = paymaster.to_vec();
                paymaster_and_data.extend_from_slice(
                    &saturating_u128(self.paymaster_verification_gas_limit).to_be_bytes(),
                );
                paymaster_and_data.extend_from_slice(
                    &saturating_u128(self.paymaster_post_op_gas_limit).to_be_bytes(),
                );
                paymaster_and_data.extend_from_slice(&self.paymaster_data);
                Bytes::from(paymaster_and_data)
            })
            .unwrap_or_default();

        PackedUserOperation {
            sender: self.sender,
            nonce: self.nonce,
            initCode: init_code,
            callData: self.call_data.clone(),
            accountGasLimits: concat_128(self.verification_gas_limit, self.call_gas_limit),
            preVerificationGas: self.pre_verification_gas,
            gasFees: concat_128(self.max_priority_fee_per_gas, self.max_fee_per_gas),
            paymasterAndData: paymaster_and_data,
            signature: self.signature.clone(),
        }
    }
}

impl UserOperationTrait for UserOperation {
    fn entry_point_version() -> EntryPointVersion {
        EntryPointVersion::V0_7
    }

    fn sender(&self) -> Address {
        self.sender
    }

    fn nonce(&self) -> U256 {
        self.nonce
    }

    fn factory(&self) -> Option<Address> {
        self.factory
    }

    fn paymaster(&self) -> Option<Address> {
        self.paymaster
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
        hash_packed_user_operation(&self.pack(), entry_point, chain_id)
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
            paymaster_verification_gas_limit: overrides
                .paymaster_verification_gas_limit
                .unwrap_or(self.paymaster_verification_gas_limit),
            ..self.clone()
        }
    }

    fn abi_encode_with_hashed_signature(&self) -> Vec<u8> {
        let mut packed = self.pack();
        packed.signature = keccak256(&self.signature).to_vec().into();
        packed.abi_encode()
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

/// Hash of a packed operation, as returned by the entry point's `getUserOpHash`
pub fn hash_packed_user_operation(
    puo: &PackedUserOperation,
    entry_point: Address,
    chain_id: u64,
) -> B256 {
    let hashed = (
        puo.sender,
        puo.nonce,
        keccak256(&puo.initCode),
        keccak256(&puo.callData),
        puo.accountGasLimits,
        puo.preVerificationGas,
        puo.gasFees,
        keccak256(&puo.paymasterAndData),
    )
        .abi_encode();

    keccak256((keccak256(hashed), entry_point, U256::from(chain_id)).abi_encode())
}
