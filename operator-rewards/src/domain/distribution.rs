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
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Beacon chain genesis (mainnet) in seconds since the Unix epoch.
pub const BEACON_GENESIS_TIME: i64 = 1_606_824_023;
pub const SECONDS_PER_SLOT: i64 = 12;
pub const SLOTS_PER_EPOCH: i64 = 32;
const SECONDS_PER_DAY: i64 = 86_400;

/// Start of the given beacon chain epoch.
pub fn epoch_to_datetime(epoch: u64) -> DateTime<Utc> {
    let seconds = i64::try_from(epoch)
        .unwrap_or(i64::MAX / (SECONDS_PER_SLOT * SLOTS_PER_EPOCH))
        .saturating_mul(SECONDS_PER_SLOT * SLOTS_PER_EPOCH);
    DateTime::from_timestamp(BEACON_GENESIS_TIME.saturating_add(seconds), 0).unwrap_or_default()
}

/// Reference to one published distribution log, taken from an on-chain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogReference {
    pub block_number: u64,
    pub log_cid: String,
}

/// One frame of a published distribution log document. A document either holds a single frame or
/// a list of frames.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DistributionLog {
    /// Start and end epoch.
    pub frame: (u64, u64),

    #[serde(default)]
    pub operators: HashMap<String, OperatorLogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OperatorLogEntry {
    #[serde(alias = "distributed", default)]
    pub distributed_rewards: u128,

    /// Strikes per validator key, if the log carries them.
    #[serde(default)]
    pub validators: HashMap<String, ValidatorLogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidatorLogEntry {
    #[serde(default)]
    pub slashed: bool,

    #[serde(default)]
    pub strikes: u32,
}

impl DistributionLog {
    pub fn frame_for(&self, operator_id: OperatorId) -> Option<DistributionFrame> {
        let (start_epoch, end_epoch) = self.frame;
        self.operators
            .get(&operator_id.to_string())
            .map(|entry| DistributionFrame {
                start_epoch,
                end_epoch,
                distributed_shares: entry.distributed_rewards,
            })
    }
}

/// One historical distribution period of one operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DistributionFrame {
    pub start_epoch: u64,
    pub end_epoch: u64,
    /// Shares distributed within this frame, not cumulative.
    pub distributed_shares: u128,
}

impl DistributionFrame {
    /// Both the start and the end epoch belong to the frame.
    pub fn duration_days(&self) -> Decimal {
        let epochs = self
            .end_epoch
            .checked_sub(self.start_epoch)
            .map_or(0, |epochs| epochs + 1);
        epochs_to_days(epochs)
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        epoch_to_datetime(self.start_epoch)
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        epoch_to_datetime(self.end_epoch)
    }
}

pub fn epochs_to_days(epochs: u64) -> Decimal {
    Decimal::from(epochs) * Decimal::from(SECONDS_PER_SLOT * SLOTS_PER_EPOCH)
        / Decimal::from(SECONDS_PER_DAY)
}

/// Order frames by start epoch and drop frames overlapping their predecessor, e.g. the same frame
/// published twice.
pub fn normalize_frames(mut frames: Vec<DistributionFrame>) -> Vec<DistributionFrame> {
    frames.sort_by_key(|frame| (frame.start_epoch, frame.end_epoch));

    let mut normalized = Vec::<DistributionFrame>::with_capacity(frames.len());
    for frame in frames {
        match normalized.last() {
            Some(last) if frame.start_epoch <= last.end_epoch => {}
            _ => normalized.push(frame),
        }
    }

    normalized
}

/// Start and end date of a recent frame, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameDates {
    pub start: String,
    pub end: String,
}

impl From<&DistributionLog> for FrameDates {
    fn from(log: &DistributionLog) -> Self {
        let (start_epoch, end_epoch) = log.frame;
        Self {
            start: epoch_to_datetime(start_epoch).format("%b %d").to_string(),
            end: epoch_to_datetime(end_epoch).format("%b %d").to_string(),
        }
    }
}
