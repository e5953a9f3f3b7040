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

use crate::domain::{DistributionFrame, epoch_to_datetime};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

const DAYS_PER_YEAR: u32 = 365;

/// Parameters for estimating the next distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionParams {
    /// Epochs between the end of the current frame and the next distribution.
    pub next_frame_epoch_offset: u64,
    /// Length of the projected frame in days.
    pub projection_days: u32,
}

/// Distribution history of an operator with share amounts converted to values. Frames are ordered
/// oldest first and there is at least one.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuedHistory {
    pub frames: Vec<DistributionFrame>,
    pub current_value: Decimal,
    pub previous_value: Option<Decimal>,
    /// Value of the sum of all distributed shares.
    pub lifetime_value: Decimal,
    /// Value of each frame, only present when the full history was requested.
    pub frame_values: Option<Vec<Decimal>>,
}

/// Yield figures of an operator. All percentages are annualized and rounded to two decimals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApyMetrics {
    pub previous_distribution_value: Option<Decimal>,
    pub previous_distribution_apy: Option<Decimal>,
    pub previous_net_apy: Option<Decimal>,

    pub current_distribution_value: Option<Decimal>,
    pub current_distribution_apy: Option<Decimal>,

    pub next_distribution_date: Option<DateTime<Utc>>,
    pub next_distribution_estimate: Option<Decimal>,

    pub lifetime_distribution_value: Option<Decimal>,

    /// Reward APY of the most recent frame.
    pub reward_apy_28d: Option<Decimal>,
    /// Reward APY over all frames: total value over total duration.
    pub reward_apy_lifetime: Option<Decimal>,

    pub bond_apy: Option<Decimal>,
    pub net_apy_28d: Option<Decimal>,
    pub net_apy_lifetime: Option<Decimal>,

    pub previous_bond_earnings: Option<Decimal>,
    pub current_bond_earnings: Option<Decimal>,
    pub lifetime_bond_earnings: Option<Decimal>,

    pub previous_net_total: Option<Decimal>,
    pub current_net_total: Option<Decimal>,
    pub lifetime_net_total: Option<Decimal>,

    pub frames: Option<Vec<FrameMetrics>>,
}

/// One materialized frame of the history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameMetrics {
    /// One-based, oldest first.
    pub frame_number: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub value: Decimal,
    pub shares: u128,
    pub duration_days: Decimal,
    pub apy: Option<Decimal>,
}

/// `(value / bond) * (365 / days) * 100`, rounded to two decimals; undefined for a
/// non-positive duration or bond.
pub fn annualized_apy(value: Decimal, bond: Decimal, days: Decimal) -> Option<Decimal> {
    if days <= Decimal::ZERO || bond <= Decimal::ZERO {
        return None;
    }

    let apy = (value / bond) * (Decimal::from(DAYS_PER_YEAR) / days) * Decimal::ONE_HUNDRED;
    Some(round(apy, 2))
}

/// Sum of the reward APY and the bond APY; falls back to the bond APY alone when the reward APY
/// is undefined, undefined without a bond APY.
pub fn net_apy(reward_apy: Option<Decimal>, bond_apy: Option<Decimal>) -> Option<Decimal> {
    match (reward_apy, bond_apy) {
        (Some(reward_apy), Some(bond_apy)) => Some(round(reward_apy + bond_apy, 2)),
        (None, Some(bond_apy)) => Some(round(bond_apy, 2)),
        (_, None) => None,
    }
}

impl ApyMetrics {
    pub fn compute(
        bond: Decimal,
        history: Option<&ValuedHistory>,
        bond_apy: Option<Decimal>,
        params: ProjectionParams,
    ) -> Self {
        let mut metrics = Self {
            bond_apy,
            ..Default::default()
        };

        let history = history.and_then(|history| {
            history
                .frames
                .last()
                .map(|current| (history, current, history.frames.len()))
        });

        if let Some((history, current, len)) = history {
            let current_days = current.duration_days();
            metrics.current_distribution_value = Some(history.current_value);
            metrics.current_distribution_apy =
                annualized_apy(history.current_value, bond, current_days);
            metrics.reward_apy_28d = metrics.current_distribution_apy;

            if len >= 2 {
                let previous = &history.frames[len - 2];
                metrics.previous_distribution_value = history.previous_value;
                metrics.previous_distribution_apy = history
                    .previous_value
                    .and_then(|value| annualized_apy(value, bond, previous.duration_days()));
            }

            metrics.lifetime_distribution_value = Some(history.lifetime_value);
            if history.lifetime_value > Decimal::ZERO {
                let total_days = history
                    .frames
                    .iter()
                    .map(DistributionFrame::duration_days)
                    .sum::<Decimal>();
                metrics.reward_apy_lifetime =
                    annualized_apy(history.lifetime_value, bond, total_days);
            }

            metrics.next_distribution_date = Some(epoch_to_datetime(
                current
                    .end_epoch
                    .saturating_add(params.next_frame_epoch_offset),
            ));
            if current_days > Decimal::ZERO {
                let daily = history.current_value / current_days;
                metrics.next_distribution_estimate =
                    Some(round(daily * Decimal::from(params.projection_days), 6));
            }

            if let Some(bond_apy) = bond_apy.filter(|_| bond > Decimal::ZERO) {
                let earnings = |days: Decimal| {
                    (days > Decimal::ZERO).then(|| {
                        let earnings = bond * (bond_apy / Decimal::ONE_HUNDRED) * days
                            / Decimal::from(DAYS_PER_YEAR);
                        round(earnings, 6)
                    })
                };

                if len >= 2 {
                    metrics.previous_bond_earnings =
                        earnings(history.frames[len - 2].duration_days());
                }
                metrics.current_bond_earnings = earnings(current_days);
                metrics.lifetime_bond_earnings = earnings(
                    history
                        .frames
                        .iter()
                        .map(DistributionFrame::duration_days)
                        .sum(),
                );
            }

            if let Some(frame_values) = &history.frame_values {
                let frames = history
                    .frames
                    .iter()
                    .zip(frame_values)
                    .enumerate()
                    .map(|(index, (frame, value))| FrameMetrics {
                        frame_number: index + 1,
                        start: frame.starts_at(),
                        end: frame.ends_at(),
                        value: *value,
                        shares: frame.distributed_shares,
                        duration_days: round(frame.duration_days(), 1),
                        apy: annualized_apy(*value, bond, frame.duration_days()),
                    })
                    .collect();
                metrics.frames = Some(frames);
            }
        }

        metrics.net_apy_28d = net_apy(metrics.reward_apy_28d, bond_apy);
        metrics.net_apy_lifetime = net_apy(metrics.reward_apy_lifetime, bond_apy);
        metrics.previous_net_apy = metrics
            .previous_distribution_apy
            .zip(bond_apy)
            .map(|(reward_apy, bond_apy)| round(reward_apy + bond_apy, 2));

        metrics.previous_net_total = net_total(
            metrics.previous_distribution_value,
            metrics.previous_bond_earnings,
        );
        metrics.current_net_total = net_total(
            metrics.current_distribution_value,
            metrics.current_bond_earnings,
        );
        metrics.lifetime_net_total = net_total(
            metrics.lifetime_distribution_value,
            metrics.lifetime_bond_earnings,
        );

        metrics
    }
}

fn net_total(distribution: Option<Decimal>, bond_earnings: Option<Decimal>) -> Option<Decimal> {
    (distribution.is_some() || bond_earnings.is_some()).then(|| {
        round(
            distribution.unwrap_or_default() + bond_earnings.unwrap_or_default(),
            6,
        )
    })
}

fn round(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use crate::domain::{
        ApyMetrics, DistributionFrame, ProjectionParams, ValuedHistory, annualized_apy,
        epoch_to_datetime, net_apy,
    };
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const PARAMS: ProjectionParams = ProjectionParams {
        next_frame_epoch_offset: 6300,
        projection_days: 28,
    };

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    /// Two frames of 28 and 30 days with values 1.0 and 1.2.
    fn history(frame_values: bool) -> ValuedHistory {
        let frames = vec![
            DistributionFrame {
                start_epoch: 1_000,
                end_epoch: 7_299,
                distributed_shares: 1_000,
            },
            DistributionFrame {
                start_epoch: 7_300,
                end_epoch: 14_049,
                distributed_shares: 1_200,
            },
        ];

        ValuedHistory {
            frames,
            current_value: dec("1.2"),
            previous_value: Some(dec("1.0")),
            lifetime_value: dec("2.2"),
            frame_values: frame_values.then(|| vec![dec("1.0"), dec("1.2")]),
        }
    }

    #[test]
    fn test_annualized_apy() {
        assert_eq!(
            annualized_apy(dec("1.0"), dec("100"), dec("28")),
            Some(dec("13.04"))
        );
        assert_eq!(annualized_apy(dec("1.0"), dec("100"), Decimal::ZERO), None);
        assert_eq!(annualized_apy(dec("1.0"), Decimal::ZERO, dec("28")), None);
        assert_eq!(annualized_apy(dec("1.0"), dec("-1"), dec("28")), None);
    }

    #[test]
    fn test_lifetime_apy_is_not_average() {
        let metrics = ApyMetrics::compute(dec("100"), Some(&history(false)), None, PARAMS);

        let expected = (dec("2.2") / dec("100")) * (dec("365") / dec("58")) * dec("100");
        assert_eq!(metrics.reward_apy_lifetime, Some(expected.round_dp(2)));
        assert_eq!(metrics.reward_apy_lifetime, Some(dec("13.84")));

        let previous = metrics.previous_distribution_apy.unwrap();
        let current = metrics.current_distribution_apy.unwrap();
        assert_eq!(previous, dec("13.04"));
        assert_eq!(current, dec("14.60"));
        assert_ne!(
            metrics.reward_apy_lifetime,
            Some(((previous + current) / dec("2")).round_dp(2))
        );
    }

    #[test]
    fn test_compute() {
        let metrics = ApyMetrics::compute(
            dec("100"),
            Some(&history(false)),
            Some(dec("2.5")),
            PARAMS,
        );

        assert_eq!(metrics.reward_apy_28d, Some(dec("14.6")));
        assert_eq!(metrics.net_apy_28d, Some(dec("17.1")));
        assert_eq!(metrics.net_apy_lifetime, Some(dec("16.34")));
        assert_eq!(metrics.previous_net_apy, Some(dec("15.54")));
        assert_eq!(metrics.current_distribution_value, Some(dec("1.2")));
        assert_eq!(metrics.lifetime_distribution_value, Some(dec("2.2")));

        // 6300 epochs after the end of the current frame.
        assert_eq!(
            metrics.next_distribution_date,
            Some(epoch_to_datetime(14_049 + 6_300))
        );
        // 1.2 over 30 days projected to 28 days.
        assert_eq!(metrics.next_distribution_estimate, Some(dec("1.12")));

        // 100 * 2.5% * 30 / 365
        assert_eq!(metrics.current_bond_earnings, Some(dec("0.205479")));
        assert_eq!(metrics.previous_bond_earnings, Some(dec("0.191781")));
        assert_eq!(metrics.lifetime_bond_earnings, Some(dec("0.397260")));
        assert_eq!(metrics.current_net_total, Some(dec("1.405479")));
        assert_eq!(metrics.lifetime_net_total, Some(dec("2.597260")));

        assert!(metrics.frames.is_none());
    }

    #[test]
    fn test_frames() {
        let metrics = ApyMetrics::compute(dec("100"), Some(&history(true)), None, PARAMS);

        let frames = metrics.frames.unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].frame_number, 1);
        assert_eq!(frames[0].duration_days, dec("28"));
        assert_eq!(frames[0].apy, Some(dec("13.04")));
        assert_eq!(frames[1].frame_number, 2);
        assert_eq!(frames[1].shares, 1_200);
        assert_eq!(frames[1].start, epoch_to_datetime(7_300));
        assert_eq!(frames[1].apy, Some(dec("14.6")));
    }

    #[test]
    fn test_without_history() {
        let metrics = ApyMetrics::compute(dec("100"), None, Some(dec("2.5")), PARAMS);
        assert_eq!(metrics.reward_apy_28d, None);
        assert_eq!(metrics.net_apy_28d, Some(dec("2.5")));
        assert_eq!(metrics.net_apy_lifetime, Some(dec("2.5")));
        assert_eq!(metrics.current_net_total, None);

        let metrics = ApyMetrics::compute(dec("100"), None, None, PARAMS);
        assert_eq!(metrics, ApyMetrics::default());
    }

    #[test]
    fn test_net_apy() {
        assert_eq!(net_apy(Some(dec("1.5")), Some(dec("2.5"))), Some(dec("4")));
        assert_eq!(net_apy(None, Some(dec("2.5"))), Some(dec("2.5")));
        assert_eq!(net_apy(Some(dec("1.5")), None), None);
        assert_eq!(net_apy(None, None), None);
    }
}
