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

use alloy_primitives::Address;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Node operator identifier as assigned by the staking module contract.
#[derive(
    Debug,
    Default,
    Display,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    From,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct OperatorId(pub u64);

/// Snapshot of a node operator record read from the staking module contract.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorRecord {
    pub id: OperatorId,
    pub total_added_keys: u32,
    pub total_withdrawn_keys: u32,
    pub total_deposited_keys: u32,
    pub total_vetted_keys: u32,
    pub stuck_validators_count: u32,
    pub depositable_validators_count: u32,
    pub target_limit: u32,
    pub target_limit_mode: u8,
    pub total_exited_keys: u32,
    pub enqueued_count: u32,
    pub manager_address: Address,
    pub proposed_manager_address: Address,
    pub reward_address: Address,
    pub proposed_reward_address: Address,
    pub extended_manager_permissions: bool,
}

impl OperatorRecord {
    /// Whether the given address is the manager or the reward address of this operator.
    /// Addresses are compared as bytes, hence independent of hex letter case.
    pub fn is_owned_by(&self, address: &Address) -> bool {
        self.manager_address == *address || self.reward_address == *address
    }

    pub fn active_validators(&self) -> u32 {
        self.total_deposited_keys
            .saturating_sub(self.total_exited_keys)
    }
}

/// How a caller identifies an operator: by numeric id or by manager/reward address.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Identifier {
    Id(OperatorId),
    Address(Address),
}

impl FromStr for Identifier {
    type Err = InvalidIdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            s.parse::<u64>()
                .map(|id| Self::Id(OperatorId(id)))
                .map_err(|_| InvalidIdentifierError(s.to_owned()))
        } else if s.starts_with("0x") || s.starts_with("0X") {
            s.parse::<Address>()
                .map(Self::Address)
                .map_err(|_| InvalidIdentifierError(s.to_owned()))
        } else {
            Err(InvalidIdentifierError(s.to_owned()))
        }
    }
}

#[derive(Debug, Error)]
#[error("invalid identifier {0}: expected numeric operator id or 0x-prefixed address")]
pub struct InvalidIdentifierError(String);

#[cfg(test)]
mod tests {
    use crate::domain::{Identifier, OperatorId, OperatorRecord};
    use alloy_primitives::{Address, address};
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_identifier() {
        assert_matches!("42".parse::<Identifier>(), Ok(Identifier::Id(OperatorId(42))));

        let parsed = "0xdA7dE2ECdDfccC6c3AF10108Db212ACBBf9EA83F".parse::<Identifier>();
        assert_matches!(
            parsed,
            Ok(Identifier::Address(a)) if a == address!("da7de2ecddfccc6c3af10108db212acbbf9ea83f")
        );

        // Lowercase addresses are accepted, i.e. no checksum validation.
        let parsed = "0xda7de2ecddfccc6c3af10108db212acbbf9ea83f".parse::<Identifier>();
        assert_matches!(parsed, Ok(Identifier::Address(_)));

        assert!("operator".parse::<Identifier>().is_err());
        assert!("0x1234".parse::<Identifier>().is_err());
        assert!("".parse::<Identifier>().is_err());
    }

    #[test]
    fn test_is_owned_by() {
        let manager = address!("1111111111111111111111111111111111111111");
        let reward = address!("2222222222222222222222222222222222222222");
        let operator = OperatorRecord {
            manager_address: manager,
            reward_address: reward,
            ..operator(7)
        };

        assert!(operator.is_owned_by(&manager));
        assert!(operator.is_owned_by(&reward));
        assert!(!operator.is_owned_by(&Address::ZERO));
    }

    #[test]
    fn test_active_validators() {
        let operator = OperatorRecord {
            total_deposited_keys: 10,
            total_exited_keys: 3,
            ..operator(1)
        };
        assert_eq!(operator.active_validators(), 7);
    }

    fn operator(id: u64) -> OperatorRecord {
        OperatorRecord {
            id: OperatorId(id),
            ..Default::default()
        }
    }
}
