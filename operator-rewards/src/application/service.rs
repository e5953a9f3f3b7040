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

use crate::{
    application::{
        BondRateReader, ChainReader, Config, HistoryReader, ManifestReader, StrikeReader,
    },
    domain::{
        ApyMetrics, BeaconSource, BondRateSource, BondSummary, ChainSource, DataSource,
        FrameDates, HealthStatus, Identifier, LogArchive, ManifestSource, OperatorId,
        OperatorRecord, OperatorRewards, OperatorStrikes, Sourced, StrikeSource, StrikeSummary,
        ValidatorInfo, ValuedHistory, average_effectiveness, earliest_activation,
        unclaimed_shares, validators_by_status,
    },
};
use alloy_primitives::Address;
use futures::{join, try_join};
use log::{debug, info, warn};
use operator_common::error::{BoxError, StdErrorExt};
use rust_decimal::Decimal;
use std::error::Error as StdError;
use thiserror::Error;

/// Which optional parts an aggregate should contain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Include {
    /// Validator details, APY and health.
    pub validators: bool,
    /// Per-frame APY figures, only together with validators.
    pub history: bool,
    pub withdrawals: bool,
}

/// Fatal errors: the core chain data could not be read, so no meaningful aggregate exists.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("cannot read chain")]
    Chain(#[source] BoxError),
}

fn chain_error<E>(error: E) -> ServiceError
where
    E: StdError + Send + Sync + 'static,
{
    ServiceError::Chain(error.into())
}

/// Reading the distribution history involves both the chain and the log archive.
#[derive(Debug, Error)]
enum HistoryError<C, L> {
    #[error("cannot read chain")]
    Chain(#[source] C),

    #[error("cannot fetch distribution log")]
    Archive(#[source] L),
}

/// Builds operator reward aggregates from the chain and the optional sources, each wrapped in its
/// own cache. Failures of optional sources degrade the respective parts of an aggregate.
pub struct Service<C, M, L, B, S, R> {
    config: Config,
    chain: ChainReader<C>,
    manifest: ManifestReader<M>,
    history: HistoryReader<L>,
    beacon: B,
    strikes: StrikeReader<S>,
    bond_rate: BondRateReader<R>,
}

impl<C, M, L, B, S, R> Service<C, M, L, B, S, R>
where
    C: ChainSource,
    M: ManifestSource,
    L: LogArchive,
    B: BeaconSource,
    S: StrikeSource,
    R: BondRateSource,
{
    pub fn new(
        config: Config,
        chain: C,
        manifest: M,
        archive: L,
        beacon: B,
        strikes: S,
        bond_rate: R,
    ) -> Self {
        let chain = ChainReader::new(chain, config.cache.clone(), config.resolver.clone());
        let manifest = ManifestReader::new(manifest, &config.cache);
        let history = HistoryReader::new(archive, &config.cache);
        let strikes = StrikeReader::new(strikes, &config.cache);
        let bond_rate = BondRateReader::new(bond_rate, &config.cache);

        Self {
            config,
            chain,
            manifest,
            history,
            beacon,
            strikes,
            bond_rate,
        }
    }

    /// The id of the operator with the given identifier, if there is one.
    pub async fn resolve(
        &self,
        identifier: Identifier,
    ) -> Result<Option<OperatorId>, ServiceError> {
        match identifier {
            Identifier::Id(id) => {
                let record = self.chain.operator(id).await.map_err(chain_error)?;
                Ok(record.map(|record| record.id))
            }

            Identifier::Address(address) => self.chain.resolve(address).await.map_err(chain_error),
        }
    }

    /// Resolve the given address and build the aggregate for the operator found, if any.
    pub async fn get_by_address(
        &self,
        address: Address,
        include: Include,
    ) -> Result<Option<OperatorRewards>, ServiceError> {
        let Some(id) = self.chain.resolve(address).await.map_err(chain_error)? else {
            return Ok(None);
        };

        self.get_by_id(id, include).await
    }

    /// Build the aggregate for the given operator; `None` if there is no such operator.
    pub async fn get_by_id(
        &self,
        id: OperatorId,
        include: Include,
    ) -> Result<Option<OperatorRewards>, ServiceError> {
        let Some(record) = self.chain.operator(id).await.map_err(chain_error)? else {
            debug!(operator_id:% = id; "operator not found");
            return Ok(None);
        };

        let (bond, manifest, distributed_shares) = join!(
            self.chain.bond_summary(id),
            self.manifest.manifest(),
            self.chain.distributed_shares(id)
        );
        let bond = bond.map_err(chain_error)?;
        let distributed_shares = distributed_shares.map_err(chain_error)?;
        let manifest = Sourced::from_result(manifest, DataSource::RewardsManifest);

        let mut unavailable_sources = manifest.unavailable().into_iter().collect::<Vec<_>>();

        let cumulative_shares = manifest
            .available()
            .and_then(|manifest| manifest.entry(id).map(|entry| entry.cumulative_fee_shares))
            .unwrap_or_default();
        let unclaimed_shares = unclaimed_shares(cumulative_shares, distributed_shares);

        let (cumulative_value, distributed_value, unclaimed_value) = try_join!(
            self.chain.shares_to_value(cumulative_shares),
            self.chain.shares_to_value(distributed_shares),
            self.chain.shares_to_value(unclaimed_shares)
        )
        .map_err(chain_error)?;

        let mut validator_details = vec![];
        let mut validators_by_status_counts = None;
        let mut avg_effectiveness = None;
        let mut active_since = None;
        let mut apy = None;
        let mut health = None;

        if include.validators && record.total_deposited_keys > 0 {
            let (validators, (apy_metrics, apy_unavailable), strikes) = join!(
                self.validator_details(&record),
                self.apy(id, bond.current_bond, include.history),
                self.strike_summary(id)
            );
            let validators = validators?;

            unavailable_sources.extend(validators.unavailable());
            unavailable_sources.extend(apy_unavailable);
            unavailable_sources.extend(strikes.unavailable());

            validator_details = validators.or_default();
            validators_by_status_counts = Some(validators_by_status(&validator_details));
            avg_effectiveness = average_effectiveness(&validator_details);
            active_since = earliest_activation(&validator_details);
            apy = Some(apy_metrics);
            health = Some(HealthStatus::new(
                &bond,
                record.stuck_validators_count,
                &validator_details,
                self.config.health.min_balance_gwei,
                strikes.or_default(),
            ));
        }

        let withdrawals = if include.withdrawals {
            let withdrawals = Sourced::from_result(
                self.chain.withdrawals(record.reward_address).await,
                DataSource::Withdrawals,
            );
            unavailable_sources.extend(withdrawals.unavailable());
            Some(withdrawals.or_default())
        } else {
            None
        };

        let BondSummary {
            current_bond,
            required_bond,
            excess_bond,
            ..
        } = bond;

        let rewards = OperatorRewards {
            operator_id: id,
            manager_address: record.manager_address,
            reward_address: record.reward_address,
            current_bond,
            required_bond,
            excess_bond,
            cumulative_rewards_shares: cumulative_shares,
            cumulative_rewards_value: cumulative_value,
            distributed_shares,
            distributed_value,
            unclaimed_shares,
            unclaimed_value,
            total_claimable: excess_bond + unclaimed_value,
            total_validators: record.total_deposited_keys,
            active_validators: record.active_validators(),
            exited_validators: record.total_exited_keys,
            validator_details,
            validators_by_status: validators_by_status_counts,
            avg_effectiveness,
            active_since,
            apy,
            health,
            withdrawals,
            unavailable_sources,
        };

        info!(
            operator_id:% = id,
            unavailable_sources = rewards.unavailable_sources.len();
            "operator rewards built"
        );

        Ok(Some(rewards))
    }

    /// Yield figures of the given operator for the given bond value. Always completes; parts
    /// depending on an unavailable source are absent.
    pub async fn compute_apy(
        &self,
        id: OperatorId,
        bond_value: Decimal,
        want_full_history: bool,
    ) -> ApyMetrics {
        self.apy(id, bond_value, want_full_history).await.0
    }

    /// Health of the given operator. Always completes; unavailable strikes count as none.
    pub async fn compute_health(
        &self,
        id: OperatorId,
        bond: &BondSummary,
        stuck_validators_count: u32,
        validators: &[ValidatorInfo],
    ) -> HealthStatus {
        let strikes = self.strike_summary(id).await.or_default();

        HealthStatus::new(
            bond,
            stuck_validators_count,
            validators,
            self.config.health.min_balance_gwei,
            strikes,
        )
    }

    /// Ids of all operators in the rewards manifest in ascending order.
    pub async fn operator_ids_with_rewards(&self) -> Sourced<Vec<OperatorId>> {
        let manifest = self.manifest.manifest().await;
        Sourced::from_result(manifest, DataSource::RewardsManifest)
            .map(|manifest| manifest.operator_ids())
    }

    /// Per-validator strikes of the given operator.
    pub async fn operator_strikes(&self, id: OperatorId) -> Sourced<OperatorStrikes> {
        let strikes = self.strikes.strikes(id).await;

        Sourced::from_result(strikes, DataSource::Strikes).map(|strikes| {
            OperatorStrikes::new(strikes.validators.to_vec(), strikes.ejection_threshold)
        })
    }

    /// Start and end dates of the most recent `count` frames, oldest first. Missing frames are
    /// padded at the front with numbered placeholders, logs which cannot be fetched are skipped.
    pub async fn recent_frame_dates(&self, count: usize) -> Sourced<Vec<FrameDates>> {
        let references = match self.chain.distribution_log_history().await {
            Ok(references) => references,
            Err(error) => return Sourced::from_result(Err(error), DataSource::DistributionHistory),
        };

        let recent = &references[references.len().saturating_sub(count)..];
        let mut dates = Vec::with_capacity(count);
        for reference in recent {
            match self.history.logs(&reference.log_cid).await {
                Ok(logs) => dates.extend(logs.last().map(FrameDates::from)),

                Err(error) => warn!(
                    log_cid:% = reference.log_cid,
                    error:% = error.as_chain();
                    "cannot fetch distribution log, skipping frame"
                ),
            }
        }

        let padding = count.saturating_sub(dates.len());
        let placeholders = (1..=padding).rev().map(|number| FrameDates {
            start: format!("Frame {number}"),
            end: String::new(),
        });

        Sourced::Available(placeholders.chain(dates).collect())
    }

    /// Remove expired entries from all caches, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let purged = self.chain.purge_expired()
            + self.manifest.purge_expired()
            + self.history.purge_expired()
            + self.strikes.purge_expired()
            + self.bond_rate.purge_expired();
        debug!(purged; "expired cache entries purged");
        purged
    }

    pub fn clear(&self) {
        self.chain.clear();
        self.manifest.clear();
        self.history.clear();
        self.strikes.clear();
        self.bond_rate.clear();
    }

    async fn validator_details(
        &self,
        record: &OperatorRecord,
    ) -> Result<Sourced<Vec<ValidatorInfo>>, ServiceError> {
        let pubkeys = self
            .chain
            .signing_keys(record.id, 0, record.total_deposited_keys)
            .await
            .map_err(chain_error)?;

        let validators = self.beacon.validators(&pubkeys).await;
        Ok(Sourced::from_result(validators, DataSource::Beacon))
    }

    async fn strike_summary(&self, id: OperatorId) -> Sourced<StrikeSummary> {
        let strikes = self.strikes.strikes(id).await;

        Sourced::from_result(strikes, DataSource::Strikes)
            .map(|strikes| StrikeSummary::new(&strikes.validators, strikes.ejection_threshold))
    }

    async fn apy(
        &self,
        id: OperatorId,
        bond_value: Decimal,
        want_full_history: bool,
    ) -> (ApyMetrics, Vec<DataSource>) {
        let (history, bond_apr) = join!(
            self.valued_history(id, want_full_history),
            self.bond_rate.bond_apr()
        );
        let history = Sourced::from_result(history, DataSource::DistributionHistory);
        let bond_apr = Sourced::from_result(bond_apr, DataSource::BondRate);

        let unavailable = history
            .unavailable()
            .into_iter()
            .chain(bond_apr.unavailable())
            .collect();

        let metrics = ApyMetrics::compute(
            bond_value,
            history.available().flatten().as_ref(),
            bond_apr.available().flatten(),
            self.config.apy.into(),
        );

        (metrics, unavailable)
    }

    /// The operator's frames with values; `None` if the operator has no frame yet. Per-frame
    /// values are only converted if requested.
    async fn valued_history(
        &self,
        id: OperatorId,
        want_full_history: bool,
    ) -> Result<Option<ValuedHistory>, HistoryError<C::Error, L::Error>> {
        let references = self
            .chain
            .distribution_log_history()
            .await
            .map_err(HistoryError::Chain)?;
        let frames = self
            .history
            .frames(&references, id)
            .await
            .map_err(HistoryError::Archive)?;

        let Some(current) = frames.last() else {
            return Ok(None);
        };

        let current_value = self
            .chain
            .shares_to_value(current.distributed_shares)
            .await
            .map_err(HistoryError::Chain)?;

        let previous_value = match frames.iter().rev().nth(1) {
            Some(previous) => Some(
                self.chain
                    .shares_to_value(previous.distributed_shares)
                    .await
                    .map_err(HistoryError::Chain)?,
            ),
            None => None,
        };

        let lifetime_shares = frames
            .iter()
            .map(|frame| frame.distributed_shares)
            .fold(0, u128::saturating_add);
        let lifetime_value = self
            .chain
            .shares_to_value(lifetime_shares)
            .await
            .map_err(HistoryError::Chain)?;

        let frame_values = if want_full_history {
            let mut values = Vec::with_capacity(frames.len());
            for frame in &frames {
                let value = self
                    .chain
                    .shares_to_value(frame.distributed_shares)
                    .await
                    .map_err(HistoryError::Chain)?;
                values.push(value);
            }
            Some(values)
        } else {
            None
        };

        Ok(Some(ValuedHistory {
            frames,
            current_value,
            previous_value,
            lifetime_value,
            frame_values,
        }))
    }
}
