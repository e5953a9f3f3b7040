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

use crate::domain::OperatorId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const MANIFEST_KEY_PREFIX: &str = "CSM Operator ";

/// The published rewards manifest, keyed by "CSM Operator <id>".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RewardsManifest {
    entries: HashMap<String, RewardsManifestEntry>,
}

/// Cumulative reward claim of one operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardsManifestEntry {
    pub cumulative_fee_shares: u128,
    /// Merkle proof, passed through untouched.
    #[serde(default)]
    pub proof: Vec<String>,
}

impl RewardsManifest {
    pub fn new(entries: impl IntoIterator<Item = (OperatorId, RewardsManifestEntry)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(operator_id, entry)| (manifest_key(operator_id), entry))
            .collect();

        Self { entries }
    }

    pub fn entry(&self, operator_id: OperatorId) -> Option<&RewardsManifestEntry> {
        self.entries.get(&manifest_key(operator_id))
    }

    /// Ids of all operators in this manifest in ascending order. Keys which do not encode an
    /// operator id are ignored.
    pub fn operator_ids(&self) -> Vec<OperatorId> {
        let mut ids = self
            .entries
            .keys()
            .filter_map(|key| key.strip_prefix(MANIFEST_KEY_PREFIX))
            .filter_map(|id| id.parse::<u64>().ok())
            .map(OperatorId)
            .collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn manifest_key(operator_id: OperatorId) -> String {
    format!("{MANIFEST_KEY_PREFIX}{operator_id}")
}

/// Shares owed but not yet distributed; never negative.
pub fn unclaimed_shares(cumulative_shares: u128, distributed_shares: u128) -> u128 {
    cumulative_shares.saturating_sub(distributed_shares)
}
