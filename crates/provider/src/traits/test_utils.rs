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

use alloy_primitives::U256;

use crate::{DAGasOracle, DAGasRequest, ProviderResult};

mockall::mock! {
    pub DAGasOracle {}

    #[async_trait::async_trait]
    impl DAGasOracle for DAGasOracle {
        fn requires_base_fee(&self) -> bool;
        async fn estimate_da_gas(&self, request: DAGasRequest) -> ProviderResult<U256>;
    }
}
