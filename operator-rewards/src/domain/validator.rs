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

use crate::domain::epoch_to_datetime;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::Serialize;
use std::collections::BTreeMap;

/// Length of a validator public key in bytes.
pub const PUBKEY_LENGTH: usize = 48;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorStatus {
    #[display("active")]
    Active,

    #[display("pending")]
    Pending,

    #[display("exiting")]
    Exiting,

    #[display("exited")]
    Exited,

    #[display("slashed")]
    Slashed,

    #[display("unknown")]
    Unknown,
}

/// Beacon chain state of one validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatorInfo {
    pub pubkey: String,
    pub index: Option<u64>,
    pub status: ValidatorStatus,
    pub balance_gwei: Option<u64>,
    pub activation_epoch: Option<u64>,
    /// Attestation effectiveness in percent.
    pub effectiveness: Option<f64>,
}

impl ValidatorInfo {
    /// A validator whose key is not known to the beacon chain.
    pub fn unknown(pubkey: impl Into<String>) -> Self {
        Self {
            pubkey: pubkey.into(),
            index: None,
            status: ValidatorStatus::Unknown,
            balance_gwei: None,
            activation_epoch: None,
            effectiveness: None,
        }
    }

    /// A validator still in service whose balance fell below the given minimum.
    pub fn is_at_risk(&self, min_balance_gwei: u64) -> bool {
        matches!(
            self.status,
            ValidatorStatus::Active | ValidatorStatus::Exiting
        ) && self
            .balance_gwei
            .is_some_and(|balance| balance < min_balance_gwei)
    }
}

pub fn validators_by_status(validators: &[ValidatorInfo]) -> BTreeMap<ValidatorStatus, usize> {
    validators.iter().fold(BTreeMap::new(), |mut counts, validator| {
        *counts.entry(validator.status).or_default() += 1;
        counts
    })
}

/// Average effectiveness over the validators reporting one.
pub fn average_effectiveness(validators: &[ValidatorInfo]) -> Option<f64> {
    let values = validators
        .iter()
        .filter_map(|validator| validator.effectiveness)
        .collect::<Vec<_>>();

    (!values.is_empty()).then(|| {
        let average = values.iter().sum::<f64>() / values.len() as f64;
        (average * 100.0).round() / 100.0
    })
}

/// Activation time of the earliest activated validator.
pub fn earliest_activation(validators: &[ValidatorInfo]) -> Option<DateTime<Utc>> {
    validators
        .iter()
        .filter_map(|validator| validator.activation_epoch)
        .min()
        .map(epoch_to_datetime)
}

pub fn count_slashed(validators: &[ValidatorInfo]) -> usize {
    validators
        .iter()
        .filter(|validator| validator.status == ValidatorStatus::Slashed)
        .count()
}

pub fn count_at_risk(validators: &[ValidatorInfo], min_balance_gwei: u64) -> usize {
    validators
        .iter()
        .filter(|validator| validator.is_at_risk(min_balance_gwei))
        .count()
}

#[cfg(test)]
mod tests {
    use crate::domain::{
        ValidatorInfo, ValidatorStatus, average_effectiveness, count_at_risk, count_slashed,
        earliest_activation, epoch_to_datetime, validators_by_status,
    };

    const MIN_BALANCE: u64 = 32_000_000_000;

    fn validator(status: ValidatorStatus, balance_gwei: u64) -> ValidatorInfo {
        ValidatorInfo {
            status,
            balance_gwei: Some(balance_gwei),
            ..ValidatorInfo::unknown("0x00")
        }
    }

    #[test]
    fn test_classification() {
        let validators = vec![
            validator(ValidatorStatus::Active, 32_010_000_000),
            validator(ValidatorStatus::Active, 31_900_000_000),
            validator(ValidatorStatus::Slashed, 30_000_000_000),
            validator(ValidatorStatus::Exited, 0),
            validator(ValidatorStatus::Pending, 32_000_000_000),
            ValidatorInfo::unknown("0x01"),
        ];

        assert_eq!(count_slashed(&validators), 1);
        assert_eq!(count_at_risk(&validators, MIN_BALANCE), 1);

        let by_status = validators_by_status(&validators);
        assert_eq!(by_status.get(&ValidatorStatus::Active), Some(&2));
        assert_eq!(by_status.get(&ValidatorStatus::Unknown), Some(&1));
        assert_eq!(by_status.get(&ValidatorStatus::Exiting), None);
    }

    #[test]
    fn test_aggregates() {
        let mut first = validator(ValidatorStatus::Active, MIN_BALANCE);
        first.effectiveness = Some(98.5);
        first.activation_epoch = Some(300_000);
        let mut second = validator(ValidatorStatus::Active, MIN_BALANCE);
        second.effectiveness = Some(95.0);
        second.activation_epoch = Some(250_000);
        let third = ValidatorInfo::unknown("0x02");

        let validators = vec![first, second, third];
        assert_eq!(average_effectiveness(&validators), Some(96.75));
        assert_eq!(
            earliest_activation(&validators),
            Some(epoch_to_datetime(250_000))
        );

        assert_eq!(average_effectiveness(&[]), None);
        assert_eq!(earliest_activation(&[]), None);
    }
}
