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

use crate::domain::{BondSummary, StrikeSummary, ValidatorInfo, count_at_risk, count_slashed};
use rust_decimal::Decimal;
use serde::Serialize;

/// Health of an operator's bond and validators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub bond_healthy: bool,
    pub bond_deficit: Decimal,
    pub stuck_validators_count: u32,
    pub slashed_validators_count: usize,
    pub validators_at_risk_count: usize,
    pub strikes: StrikeSummary,
    pub has_issues: bool,
}

impl HealthStatus {
    pub fn new(
        bond: &BondSummary,
        stuck_validators_count: u32,
        validators: &[ValidatorInfo],
        min_balance_gwei: u64,
        strikes: StrikeSummary,
    ) -> Self {
        let bond_healthy = bond.is_healthy();
        let slashed_validators_count = count_slashed(validators);
        let validators_at_risk_count = count_at_risk(validators, min_balance_gwei);

        let has_issues = !bond_healthy
            || stuck_validators_count > 0
            || slashed_validators_count > 0
            || validators_at_risk_count > 0
            || strikes.any_at_threshold();

        Self {
            bond_healthy,
            bond_deficit: bond.deficit(),
            stuck_validators_count,
            slashed_validators_count,
            validators_at_risk_count,
            strikes,
            has_issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{
        BondSummary, HealthStatus, StrikeSummary, ValidatorInfo, ValidatorStatus,
        ValidatorStrikes,
    };
    use rust_decimal::Decimal;

    const ETH: u128 = 1_000_000_000_000_000_000;
    const MIN_BALANCE: u64 = 32_000_000_000;

    fn active(balance_gwei: u64) -> ValidatorInfo {
        ValidatorInfo {
            status: ValidatorStatus::Active,
            balance_gwei: Some(balance_gwei),
            ..ValidatorInfo::unknown("0xaa")
        }
    }

    #[test]
    fn test_healthy() {
        let bond = BondSummary::new(3 * ETH, 2 * ETH);
        let health = HealthStatus::new(
            &bond,
            0,
            &[active(MIN_BALANCE)],
            MIN_BALANCE,
            StrikeSummary::default(),
        );

        assert!(health.bond_healthy);
        assert_eq!(health.bond_deficit, Decimal::ZERO);
        assert!(!health.has_issues);
    }

    #[test]
    fn test_issues() {
        let healthy_bond = BondSummary::new(3 * ETH, 2 * ETH);

        let health = HealthStatus::new(
            &BondSummary::new(ETH, 2 * ETH),
            0,
            &[],
            MIN_BALANCE,
            StrikeSummary::default(),
        );
        assert!(!health.bond_healthy);
        assert_eq!(health.bond_deficit, Decimal::ONE);
        assert!(health.has_issues);

        let health = HealthStatus::new(&healthy_bond, 1, &[], MIN_BALANCE, Default::default());
        assert!(health.has_issues);

        let slashed = ValidatorInfo {
            status: ValidatorStatus::Slashed,
            ..active(MIN_BALANCE)
        };
        let health =
            HealthStatus::new(&healthy_bond, 0, &[slashed], MIN_BALANCE, Default::default());
        assert_eq!(health.slashed_validators_count, 1);
        assert!(health.has_issues);

        let health = HealthStatus::new(
            &healthy_bond,
            0,
            &[active(MIN_BALANCE - 1)],
            MIN_BALANCE,
            Default::default(),
        );
        assert_eq!(health.validators_at_risk_count, 1);
        assert!(health.has_issues);

        let strikes = StrikeSummary::new(
            &[ValidatorStrikes {
                pubkey: "0xaa".to_owned(),
                strikes: vec![1, 1, 1],
            }],
            3,
        );
        let health = HealthStatus::new(&healthy_bond, 0, &[], MIN_BALANCE, strikes);
        assert!(health.has_issues);
    }
}
