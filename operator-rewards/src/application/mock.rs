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

//! In-memory sources recording how often they are called.

use crate::domain::{
    BeaconSource, BondRateSource, ChainSource, DistributionLog, LogArchive, LogReference,
    ManifestSource, OperatorId, OperatorRecord, RewardsManifest, ShareTransfer, StrikeSource,
    ValidatorInfo, ValidatorStatus, ValidatorStrikes,
};
use alloy_primitives::Address;
use rust_decimal::Decimal;
use std::{
    collections::{HashMap, HashSet},
    ops::Range,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use thiserror::Error;

pub const ETH: u128 = 1_000_000_000_000_000_000;

#[derive(Debug, Error)]
#[error("mock failure: {0}")]
pub struct MockError(&'static str);

#[derive(Debug, Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    fn record(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Chain with the given operators; one share is worth one wei.
#[derive(Debug, Clone, Default)]
pub struct MockChain {
    pub operators: Vec<OperatorRecord>,
    /// Batch reads of windows starting at or after this id fail.
    pub batch_fails_from: Option<u64>,
    /// Single reads of these ids fail.
    pub failing_ids: HashSet<u64>,
    pub bonds: HashMap<OperatorId, (u128, u128)>,
    pub distributed: HashMap<OperatorId, u128>,
    pub log_references: Vec<LogReference>,
    pub transfers: Vec<ShareTransfer>,
    pub fail_transfers: bool,
    pub batch_calls: Calls,
    pub single_calls: Calls,
    pub conversion_calls: Calls,
}

impl MockChain {
    pub fn with_operators(count: u64) -> Self {
        let operators = (0..count)
            .map(|id| OperatorRecord {
                id: OperatorId(id),
                manager_address: address_for(id, 0x11),
                reward_address: address_for(id, 0x22),
                ..Default::default()
            })
            .collect();

        Self {
            operators,
            ..Default::default()
        }
    }
}

/// Distinct address per operator id and role.
pub fn address_for(id: u64, role: u8) -> Address {
    let mut bytes = [0; 20];
    bytes[0] = role;
    bytes[12..].copy_from_slice(&id.to_be_bytes());
    Address::from(bytes)
}

impl ChainSource for MockChain {
    type Error = MockError;

    async fn operator_count(&self) -> Result<u64, Self::Error> {
        Ok(self.operators.len() as u64)
    }

    async fn operator(&self, id: OperatorId) -> Result<Option<OperatorRecord>, Self::Error> {
        self.single_calls.record();

        if self.failing_ids.contains(&id.0) {
            return Err(MockError("operator"));
        }
        Ok(self.operators.iter().find(|record| record.id == id).cloned())
    }

    async fn operators_batch(&self, ids: Range<u64>) -> Result<Vec<OperatorRecord>, Self::Error> {
        self.batch_calls.record();

        if self.batch_fails_from.is_some_and(|from| ids.start >= from) {
            return Err(MockError("batch"));
        }
        Ok(self
            .operators
            .iter()
            .filter(|record| ids.contains(&record.id.0))
            .cloned()
            .collect())
    }

    async fn bond_summary(&self, id: OperatorId) -> Result<(u128, u128), Self::Error> {
        self.bonds
            .get(&id)
            .copied()
            .ok_or(MockError("bond summary"))
    }

    async fn distributed_shares(&self, id: OperatorId) -> Result<u128, Self::Error> {
        Ok(self.distributed.get(&id).copied().unwrap_or_default())
    }

    async fn shares_to_value(&self, shares: u128) -> Result<u128, Self::Error> {
        self.conversion_calls.record();
        Ok(shares)
    }

    async fn signing_keys(
        &self,
        _id: OperatorId,
        start: u32,
        count: u32,
    ) -> Result<Vec<String>, Self::Error> {
        Ok((start..start + count).map(|n| format!("0x{n:096x}")).collect())
    }

    async fn distribution_log_history(&self) -> Result<Vec<LogReference>, Self::Error> {
        Ok(self.log_references.clone())
    }

    async fn withdrawal_events(
        &self,
        _reward_address: Address,
    ) -> Result<Vec<ShareTransfer>, Self::Error> {
        if self.fail_transfers {
            return Err(MockError("withdrawals"));
        }
        Ok(self.transfers.clone())
    }
}

/// Manifest source failing if there is no manifest.
#[derive(Debug, Clone, Default)]
pub struct MockManifest {
    pub manifest: Option<RewardsManifest>,
    pub calls: Calls,
}

impl ManifestSource for MockManifest {
    type Error = MockError;

    async fn fetch_manifest(&self) -> Result<RewardsManifest, Self::Error> {
        self.calls.record();
        self.manifest.clone().ok_or(MockError("manifest"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockArchive {
    pub logs: HashMap<String, Vec<DistributionLog>>,
    pub calls: Calls,
}

impl LogArchive for MockArchive {
    type Error = MockError;

    async fn fetch_log(&self, cid: &str) -> Result<Vec<DistributionLog>, Self::Error> {
        self.calls.record();
        self.logs.get(cid).cloned().ok_or(MockError("log"))
    }
}

/// Beacon reporting every validator as active with 32 ETH.
#[derive(Debug, Clone, Default)]
pub struct MockBeacon {
    pub fail: bool,
    pub calls: Calls,
}

impl BeaconSource for MockBeacon {
    type Error = MockError;

    async fn validators(&self, pubkeys: &[String]) -> Result<Vec<ValidatorInfo>, Self::Error> {
        self.calls.record();

        if self.fail {
            return Err(MockError("beacon"));
        }
        Ok(pubkeys
            .iter()
            .enumerate()
            .map(|(index, pubkey)| ValidatorInfo {
                pubkey: pubkey.to_owned(),
                index: Some(index as u64),
                status: ValidatorStatus::Active,
                balance_gwei: Some(32_000_000_000),
                activation_epoch: Some(100),
                effectiveness: Some(95.0),
            })
            .collect())
    }
}

/// Strike source failing if there are no strikes.
#[derive(Debug, Clone, Default)]
pub struct MockStrikes {
    pub strikes: Option<Vec<ValidatorStrikes>>,
    pub calls: Calls,
}

impl StrikeSource for MockStrikes {
    type Error = MockError;

    async fn operator_strikes(
        &self,
        _id: OperatorId,
    ) -> Result<Vec<ValidatorStrikes>, Self::Error> {
        self.calls.record();
        self.strikes.clone().ok_or(MockError("strikes"))
    }

    async fn ejection_threshold(&self, _id: OperatorId) -> Result<u32, Self::Error> {
        Ok(3)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockBondRate {
    pub rate: Option<Decimal>,
}

impl BondRateSource for MockBondRate {
    type Error = MockError;

    async fn bond_apr(&self) -> Result<Option<Decimal>, Self::Error> {
        self.rate.map(Some).ok_or(MockError("bond rate"))
    }
}
