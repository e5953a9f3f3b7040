// This file is part of operator-rewards.
// Copyright (C) 2025 The operator-rewards Authors
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::{
    domain::{OperatorId, StrikeSource, ValidatorStrikes},
    infra::{
        chain::RpcChainClient,
        http::{HttpSourceError, decode_json},
        ipfs::{self, IpfsGateways},
    },
};
use fastrace::trace;
use serde::Deserialize;
use serde_with::{DisplayFromStr, PickFirst, serde_as};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Number of strikes at which a validator gets ejected.
    #[serde(default = "ejection_threshold_default")]
    pub ejection_threshold: u32,

    #[serde(rename = "ipfs", default)]
    pub ipfs_config: ipfs::Config,
}

fn ejection_threshold_default() -> u32 {
    3
}

/// A [StrikeSource] implementation reading the strikes tree whose content id is published by the
/// strikes contract.
#[derive(Debug, Clone)]
pub struct IpfsStrikeSource {
    chain: RpcChainClient,
    gateways: IpfsGateways,
    ejection_threshold: u32,
}

impl IpfsStrikeSource {
    pub fn new(config: Config, chain: RpcChainClient) -> Result<Self, HttpSourceError> {
        let gateways = IpfsGateways::new(config.ipfs_config)?;

        Ok(Self {
            chain,
            gateways,
            ejection_threshold: config.ejection_threshold,
        })
    }
}

impl StrikeSource for IpfsStrikeSource {
    type Error = HttpSourceError;

    #[trace]
    async fn operator_strikes(&self, id: OperatorId) -> Result<Vec<ValidatorStrikes>, Self::Error> {
        let cid = self.chain.strikes_tree_cid().await?;
        if cid.is_empty() {
            return Ok(vec![]);
        }

        let body = self.gateways.fetch(&cid).await?;
        let tree = decode_json::<StrikesTree>(&body, &cid)?;

        Ok(tree.operator_strikes(id))
    }

    async fn ejection_threshold(&self, _id: OperatorId) -> Result<u32, Self::Error> {
        Ok(self.ejection_threshold)
    }
}

/// Dump of a standard merkle tree with leaves `(operator id, pubkey, strikes per frame)`.
#[derive(Debug, Deserialize)]
struct StrikesTree {
    values: Vec<StrikesLeaf>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct StrikesLeaf {
    #[serde_as(as = "(PickFirst<(_, DisplayFromStr)>, _, Vec<PickFirst<(_, DisplayFromStr)>>)")]
    value: (u64, String, Vec<u32>),
}

impl StrikesTree {
    fn operator_strikes(self, id: OperatorId) -> Vec<ValidatorStrikes> {
        self.values
            .into_iter()
            .filter(|leaf| leaf.value.0 == id.0)
            .map(|leaf| {
                let (_, pubkey, strikes) = leaf.value;
                ValidatorStrikes { pubkey, strikes }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::OperatorId,
        infra::{
            http::{HttpSourceError, decode_json},
            strikes::StrikesTree,
        },
    };

    #[test]
    fn test_strikes_tree() -> Result<(), HttpSourceError> {
        let body = r#"{
            "format": "standard-v1",
            "leafEncoding": ["uint256", "bytes", "uint256[]"],
            "tree": ["0x01", "0x02", "0x03"],
            "values": [
                {"value": [7, "0xaa", [0, 1, 1, 0, 0, 1]], "treeIndex": 1},
                {"value": ["8", "0xbb", ["1", "0"]], "treeIndex": 2},
                {"value": [7, "0xcc", []], "treeIndex": 3}
            ]
        }"#;

        let strikes = decode_json::<StrikesTree>(body, "tree")?.operator_strikes(OperatorId(7));
        assert_eq!(strikes.len(), 2);
        assert_eq!(strikes[0].pubkey, "0xaa");
        assert_eq!(strikes[0].total(), 3);
        assert_eq!(strikes[1].total(), 0);

        let strikes = decode_json::<StrikesTree>(body, "tree")?.operator_strikes(OperatorId(8));
        assert_eq!(strikes.len(), 1);
        assert_eq!(strikes[0].strikes, vec![1, 0]);

        Ok(())
    }
}
