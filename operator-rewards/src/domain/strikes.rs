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

use serde::Serialize;

/// Strikes of one validator over the most recent frames, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatorStrikes {
    pub pubkey: String,
    pub strikes: Vec<u32>,
}

impl ValidatorStrikes {
    pub fn total(&self) -> u32 {
        self.strikes.iter().sum()
    }
}

/// Aggregated strike state of an operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StrikeSummary {
    pub total_validators_with_strikes: usize,
    /// Validators which reached the ejection threshold.
    pub validators_at_risk: usize,
    /// Validators one strike below the ejection threshold.
    pub validators_near_ejection: usize,
    pub total_strikes: u32,
    pub max_strikes: u32,
    pub ejection_threshold: u32,
}

impl StrikeSummary {
    pub fn new(validators: &[ValidatorStrikes], ejection_threshold: u32) -> Self {
        let totals = validators.iter().map(ValidatorStrikes::total);

        let summary = Self {
            ejection_threshold,
            ..Default::default()
        };
        totals.fold(summary, |mut summary, total| {
            if total > 0 {
                summary.total_validators_with_strikes += 1;
            }
            if ejection_threshold > 0 && total >= ejection_threshold {
                summary.validators_at_risk += 1;
            } else if ejection_threshold > 1 && total == ejection_threshold - 1 {
                summary.validators_near_ejection += 1;
            }
            summary.total_strikes += total;
            summary.max_strikes = summary.max_strikes.max(total);
            summary
        })
    }

    pub fn any_at_threshold(&self) -> bool {
        self.validators_at_risk > 0
    }
}

/// Per-validator strike detail of an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorStrikes {
    pub ejection_threshold: u32,
    pub validators: Vec<ValidatorStrikeDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatorStrikeDetail {
    pub pubkey: String,
    pub strikes: Vec<u32>,
    pub total: u32,
    pub at_ejection_threshold: bool,
}

impl OperatorStrikes {
    pub fn new(validators: Vec<ValidatorStrikes>, ejection_threshold: u32) -> Self {
        let validators = validators
            .into_iter()
            .map(|validator| {
                let total = validator.total();
                ValidatorStrikeDetail {
                    pubkey: validator.pubkey,
                    strikes: validator.strikes,
                    total,
                    at_ejection_threshold: ejection_threshold > 0 && total >= ejection_threshold,
                }
            })
            .collect();

        Self {
            ejection_threshold,
            validators,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{OperatorStrikes, StrikeSummary, ValidatorStrikes};

    fn strikes(strikes: &[u32]) -> ValidatorStrikes {
        ValidatorStrikes {
            pubkey: "0xab".to_owned(),
            strikes: strikes.to_vec(),
        }
    }

    #[test]
    fn test_summary() {
        let validators = vec![
            strikes(&[0, 0, 0]),
            strikes(&[1, 0, 1]),
            strikes(&[1, 1, 1]),
            strikes(&[0, 1, 0]),
        ];

        let summary = StrikeSummary::new(&validators, 3);
        assert_eq!(
            summary,
            StrikeSummary {
                total_validators_with_strikes: 3,
                validators_at_risk: 1,
                validators_near_ejection: 1,
                total_strikes: 6,
                max_strikes: 3,
                ejection_threshold: 3,
            }
        );
        assert!(summary.any_at_threshold());

        let summary = StrikeSummary::new(&[], 3);
        assert_eq!(summary.total_validators_with_strikes, 0);
        assert!(!summary.any_at_threshold());
    }

    #[test]
    fn test_operator_strikes() {
        let detail = OperatorStrikes::new(vec![strikes(&[1, 1, 1]), strikes(&[1])], 3);
        assert!(detail.validators[0].at_ejection_threshold);
        assert_eq!(detail.validators[0].total, 3);
        assert!(!detail.validators[1].at_ejection_threshold);
    }
}
