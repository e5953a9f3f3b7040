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

use rust_decimal::Decimal;
use serde::Serialize;

/// Number of decimals of the bond token and of the value the yield-bearing shares convert to.
pub const TOKEN_DECIMALS: u32 = 18;

/// Convert an amount in the smallest unit (wei) into its decimal value. Amounts beyond the
/// precision of [Decimal] saturate, which cannot happen for realistic supplies.
pub fn to_decimal_value(wei: u128) -> Decimal {
    i128::try_from(wei)
        .ok()
        .and_then(|wei| Decimal::try_from_i128_with_scale(wei, TOKEN_DECIMALS).ok())
        .unwrap_or(Decimal::MAX)
}

/// Collateral position of an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BondSummary {
    pub current_bond_wei: u128,
    pub required_bond_wei: u128,
    pub current_bond: Decimal,
    pub required_bond: Decimal,
    /// Never negative.
    pub excess_bond: Decimal,
}

impl BondSummary {
    pub fn new(current_bond_wei: u128, required_bond_wei: u128) -> Self {
        let current_bond = to_decimal_value(current_bond_wei);
        let required_bond = to_decimal_value(required_bond_wei);
        let excess_bond = (current_bond - required_bond).max(Decimal::ZERO);

        Self {
            current_bond_wei,
            required_bond_wei,
            current_bond,
            required_bond,
            excess_bond,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.current_bond >= self.required_bond
    }

    /// Never negative.
    pub fn deficit(&self) -> Decimal {
        (self.required_bond - self.current_bond).max(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{BondSummary, to_decimal_value};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const ETH: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn test_excess_never_negative() {
        let pairs = [
            (0, 0),
            (2 * ETH, ETH),
            (ETH, 2 * ETH),
            (ETH / 3, ETH / 7),
            (0, u64::MAX as u128),
        ];

        for (current, required) in pairs {
            let bond = BondSummary::new(current, required);
            assert!(bond.excess_bond >= Decimal::ZERO);
            assert!(bond.deficit() >= Decimal::ZERO);
            assert_eq!(
                bond.excess_bond,
                (bond.current_bond - bond.required_bond).max(Decimal::ZERO)
            );
            assert_eq!(bond.is_healthy(), current >= required);
        }
    }

    #[test]
    fn test_bond_summary() {
        let bond = BondSummary::new(2_500_000_000_000_000_000, ETH);
        assert_eq!(bond.current_bond, Decimal::from_str("2.5").unwrap());
        assert_eq!(bond.excess_bond, Decimal::from_str("1.5").unwrap());
        assert_eq!(bond.deficit(), Decimal::ZERO);

        let bond = BondSummary::new(ETH, 2_400_000_000_000_000_000);
        assert_eq!(bond.excess_bond, Decimal::ZERO);
        assert_eq!(bond.deficit(), Decimal::from_str("1.4").unwrap());
        assert!(!bond.is_healthy());
    }

    #[test]
    fn test_to_decimal_value() {
        assert_eq!(to_decimal_value(0), Decimal::ZERO);
        assert_eq!(to_decimal_value(1), Decimal::from_str("0.000000000000000001").unwrap());
        assert_eq!(to_decimal_value(u128::MAX), Decimal::MAX);
    }
}
