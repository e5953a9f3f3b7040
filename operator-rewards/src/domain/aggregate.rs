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
    ApyMetrics, DataSource, HealthStatus, OperatorId, ValidatorInfo, ValidatorStatus,
};
use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Point-in-time snapshot of everything known about an operator; constructed once per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorRewards {
    pub operator_id: OperatorId,
    pub manager_address: Address,
    pub reward_address: Address,

    pub current_bond: Decimal,
    pub required_bond: Decimal,
    pub excess_bond: Decimal,

    pub cumulative_rewards_shares: u128,
    pub cumulative_rewards_value: Decimal,
    pub distributed_shares: u128,
    pub distributed_value: Decimal,
    pub unclaimed_shares: u128,
    pub unclaimed_value: Decimal,

    /// Excess bond plus unclaimed rewards.
    pub total_claimable: Decimal,

    pub total_validators: u32,
    pub active_validators: u32,
    pub exited_validators: u32,

    pub validator_details: Vec<ValidatorInfo>,
    pub validators_by_status: Option<BTreeMap<ValidatorStatus, usize>>,
    pub avg_effectiveness: Option<f64>,
    pub active_since: Option<DateTime<Utc>>,

    pub apy: Option<ApyMetrics>,
    pub health: Option<HealthStatus>,
    pub withdrawals: Option<Vec<WithdrawalEvent>>,

    /// Optional sources which failed while building this snapshot; their fields hold defaults.
    pub unavailable_sources: Vec<DataSource>,
}

/// A transfer of reward shares to the operator's reward address as read from the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareTransfer {
    pub block_number: u64,
    pub timestamp: Option<DateTime<Utc>>,
    pub shares: u128,
    pub tx_hash: String,
}

/// A claim of rewards, i.e. a [ShareTransfer] together with its current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawalEvent {
    pub block_number: u64,
    pub timestamp: Option<DateTime<Utc>>,
    pub shares: u128,
    pub value: Decimal,
    pub tx_hash: String,
}

impl WithdrawalEvent {
    pub fn new(transfer: ShareTransfer, value: Decimal) -> Self {
        let ShareTransfer {
            block_number,
            timestamp,
            shares,
            tx_hash,
        } = transfer;

        Self {
            block_number,
            timestamp,
            shares,
            value,
            tx_hash,
        }
    }
}
