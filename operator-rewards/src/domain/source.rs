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

use crate::domain::{
    DistributionLog, LogReference, OperatorId, OperatorRecord, RewardsManifest, ShareTransfer,
    ValidatorInfo, ValidatorStrikes,
};
use alloy_primitives::Address;
use rust_decimal::Decimal;
use std::{error::Error as StdError, ops::Range};

/// Read access to the staking protocol contracts.
#[trait_variant::make(Send)]
pub trait ChainSource
where
    Self: Clone + Send + Sync + 'static,
{
    type Error: StdError + Send + Sync + 'static;

    async fn operator_count(&self) -> Result<u64, Self::Error>;

    /// The operator with the given id or `None` if the id does not exist.
    async fn operator(&self, id: OperatorId) -> Result<Option<OperatorRecord>, Self::Error>;

    /// All operators with ids in the given range, fetched in a single round trip. Fails as a whole
    /// if the provider rejects batched requests.
    async fn operators_batch(&self, ids: Range<u64>) -> Result<Vec<OperatorRecord>, Self::Error>;

    /// Current and required bond in wei.
    async fn bond_summary(&self, id: OperatorId) -> Result<(u128, u128), Self::Error>;

    async fn distributed_shares(&self, id: OperatorId) -> Result<u128, Self::Error>;

    /// Convert shares of the yield-bearing token into wei at the current protocol rate.
    async fn shares_to_value(&self, shares: u128) -> Result<u128, Self::Error>;

    /// Public keys of the operator's signing keys, hex encoded with 0x prefix.
    async fn signing_keys(
        &self,
        id: OperatorId,
        start: u32,
        count: u32,
    ) -> Result<Vec<String>, Self::Error>;

    /// References to all published distribution logs, oldest first.
    async fn distribution_log_history(&self) -> Result<Vec<LogReference>, Self::Error>;

    /// Share transfers from the accounting contract to the given reward address, oldest first.
    async fn withdrawal_events(
        &self,
        reward_address: Address,
    ) -> Result<Vec<ShareTransfer>, Self::Error>;
}

/// The published rewards manifest.
#[trait_variant::make(Send)]
pub trait ManifestSource
where
    Self: Clone + Send + Sync + 'static,
{
    type Error: StdError + Send + Sync + 'static;

    async fn fetch_manifest(&self) -> Result<RewardsManifest, Self::Error>;
}

/// Content-addressed archive of distribution logs.
#[trait_variant::make(Send)]
pub trait LogArchive
where
    Self: Clone + Send + Sync + 'static,
{
    type Error: StdError + Send + Sync + 'static;

    /// All frames of the log document with the given content id.
    async fn fetch_log(&self, cid: &str) -> Result<Vec<DistributionLog>, Self::Error>;
}

/// Beacon chain validator status.
#[trait_variant::make(Send)]
pub trait BeaconSource
where
    Self: Clone + Send + Sync + 'static,
{
    type Error: StdError + Send + Sync + 'static;

    /// One entry per given public key in the same order; unknown keys yield
    /// [ValidatorInfo::unknown].
    async fn validators(&self, pubkeys: &[String]) -> Result<Vec<ValidatorInfo>, Self::Error>;
}

/// Per-validator performance strikes.
#[trait_variant::make(Send)]
pub trait StrikeSource
where
    Self: Clone + Send + Sync + 'static,
{
    type Error: StdError + Send + Sync + 'static;

    async fn operator_strikes(&self, id: OperatorId)
    -> Result<Vec<ValidatorStrikes>, Self::Error>;

    /// Number of strikes at which a validator gets ejected.
    async fn ejection_threshold(&self, id: OperatorId) -> Result<u32, Self::Error>;
}

/// Current annualized yield of the bond token in percent.
#[trait_variant::make(Send)]
pub trait BondRateSource
where
    Self: Clone + Send + Sync + 'static,
{
    type Error: StdError + Send + Sync + 'static;

    async fn bond_apr(&self) -> Result<Option<Decimal>, Self::Error>;
}
