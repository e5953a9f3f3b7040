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
    application::{CacheConfig, ResolverConfig},
    domain::{
        BondSummary, ChainSource, LogReference, OperatorId, OperatorRecord, WithdrawalEvent,
        to_decimal_value,
    },
};
use alloy_primitives::Address;
use log::{debug, info, warn};
use metrics::counter;
use operator_common::{cache::ExpiringCache, error::StdErrorExt};
use rust_decimal::Decimal;
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;

/// Cached read access to the staking contracts.
pub struct ChainReader<C> {
    source: C,
    resolver_config: ResolverConfig,
    ttls: CacheConfig,
    operator_count: ExpiringCache<(), u64>,
    operators: ExpiringCache<OperatorId, Option<OperatorRecord>>,
    bonds: ExpiringCache<OperatorId, BondSummary>,
    distributed: ExpiringCache<OperatorId, u128>,
    conversions: ExpiringCache<u128, Decimal>,
    signing_keys: ExpiringCache<(OperatorId, u32, u32), Arc<Vec<String>>>,
    log_history: ExpiringCache<(), Arc<Vec<LogReference>>>,
}

impl<C> ChainReader<C>
where
    C: ChainSource,
{
    pub fn new(source: C, cache_config: CacheConfig, resolver_config: ResolverConfig) -> Self {
        let CacheConfig {
            max_size,
            default_ttl,
            ..
        } = cache_config;

        Self {
            source,
            resolver_config,
            operator_count: ExpiringCache::new("operator_count", 1, default_ttl),
            operators: ExpiringCache::new("operators", max_size, default_ttl),
            bonds: ExpiringCache::new("bonds", max_size, default_ttl),
            distributed: ExpiringCache::new("distributed_shares", max_size, default_ttl),
            conversions: ExpiringCache::new("share_conversions", max_size, default_ttl),
            signing_keys: ExpiringCache::new("signing_keys", max_size, default_ttl),
            log_history: ExpiringCache::new("log_history", 1, default_ttl),
            ttls: cache_config,
        }
    }

    pub async fn operator_count(&self) -> Result<u64, C::Error> {
        self.operator_count
            .get_or_try_insert_with((), Some(self.ttls.operator_count_ttl), || {
                self.source.operator_count()
            })
            .await
    }

    /// The operator with the given id or `None` if there is none.
    pub async fn operator(&self, id: OperatorId) -> Result<Option<OperatorRecord>, C::Error> {
        self.operators
            .get_or_try_insert_with(id, Some(self.ttls.operator_ttl), || {
                self.source.operator(id)
            })
            .await
    }

    pub async fn bond_summary(&self, id: OperatorId) -> Result<BondSummary, C::Error> {
        self.bonds
            .get_or_try_insert_with(id, Some(self.ttls.bond_ttl), || async {
                let (current, required) = self.source.bond_summary(id).await?;
                Ok::<_, C::Error>(BondSummary::new(current, required))
            })
            .await
    }

    pub async fn distributed_shares(&self, id: OperatorId) -> Result<u128, C::Error> {
        self.distributed
            .get_or_try_insert_with(id, Some(self.ttls.distributed_ttl), || {
                self.source.distributed_shares(id)
            })
            .await
    }

    /// Value of the given amount of shares in ETH; zero shares are worth zero without asking the
    /// chain.
    pub async fn shares_to_value(&self, shares: u128) -> Result<Decimal, C::Error> {
        if shares == 0 {
            return Ok(Decimal::ZERO);
        }

        self.conversions
            .get_or_try_insert_with(shares, Some(self.ttls.conversion_ttl), || async {
                let wei = self.source.shares_to_value(shares).await?;
                Ok::<_, C::Error>(to_decimal_value(wei))
            })
            .await
    }

    /// Public keys of the deposited validators of the given operator.
    pub async fn signing_keys(
        &self,
        id: OperatorId,
        start: u32,
        count: u32,
    ) -> Result<Arc<Vec<String>>, C::Error> {
        if count == 0 {
            return Ok(Arc::default());
        }

        self.signing_keys
            .get_or_try_insert_with((id, start, count), Some(self.ttls.operator_ttl), || async {
                let keys = self.source.signing_keys(id, start, count).await?;
                Ok::<_, C::Error>(Arc::new(keys))
            })
            .await
    }

    pub async fn distribution_log_history(&self) -> Result<Arc<Vec<LogReference>>, C::Error> {
        self.log_history
            .get_or_try_insert_with((), Some(self.ttls.log_history_ttl), || async {
                let references = self.source.distribution_log_history().await?;
                Ok::<_, C::Error>(Arc::new(references))
            })
            .await
    }

    /// Reward claims to the given address, valued at the current share rate.
    pub async fn withdrawals(
        &self,
        reward_address: Address,
    ) -> Result<Vec<WithdrawalEvent>, C::Error> {
        let transfers = self.source.withdrawal_events(reward_address).await?;

        let mut withdrawals = Vec::with_capacity(transfers.len());
        for transfer in transfers {
            let value = self.shares_to_value(transfer.shares).await?;
            withdrawals.push(WithdrawalEvent::new(transfer, value));
        }

        Ok(withdrawals)
    }

    /// Resolve the given address to the lowest id of an operator having it as manager or reward
    /// address. Operators are read in windows with one batch request each; once a batch request
    /// fails, the remaining operators are read one by one with pauses in between, treating a
    /// failed read as no match.
    pub async fn resolve(&self, address: Address) -> Result<Option<OperatorId>, C::Error> {
        let total = self.operator_count().await?;
        let window_size = self.resolver_config.window_size.max(1);

        let mut batched = true;
        let mut start = 0;

        while start < total {
            let end = start.saturating_add(window_size).min(total);

            if batched {
                match self.source.operators_batch(start..end).await {
                    Ok(records) => {
                        let mut found = None;
                        for record in records {
                            if found.is_none() && record.is_owned_by(&address) {
                                found = Some(record.id);
                            }
                            self.operators.set(
                                record.id,
                                Some(record),
                                Some(self.ttls.operator_ttl),
                            );
                        }

                        if let Some(id) = found {
                            info!(address:%, operator_id:% = id; "address resolved");
                            return Ok(Some(id));
                        }

                        start = end;
                        continue;
                    }

                    Err(error) => {
                        warn!(
                            start,
                            end,
                            error:% = error.as_chain();
                            "batch read failed, falling back to sequential reads"
                        );
                        counter!("resolver_batch_fallbacks_total").increment(1);
                        batched = false;
                    }
                }
            }

            if let Some(id) = self.scan_sequentially(address, start, end).await {
                info!(address:%, operator_id:% = id; "address resolved");
                return Ok(Some(id));
            }
            start = end;
        }

        debug!(address:%, total; "address not resolved");
        Ok(None)
    }

    async fn scan_sequentially(
        &self,
        address: Address,
        start: u64,
        end: u64,
    ) -> Option<OperatorId> {
        for id in (start..end).map(OperatorId) {
            let delay = match self.operator(id).await {
                Ok(Some(record)) if record.is_owned_by(&address) => return Some(id),
                Ok(_) => self.resolver_config.sequential_delay,

                Err(error) => {
                    debug!(operator_id:% = id, error:% = error.as_chain(); "cannot read operator");
                    self.resolver_config.failure_delay
                }
            };

            pause(delay).await;
        }

        None
    }

    pub fn purge_expired(&self) -> usize {
        self.operator_count.purge_expired()
            + self.operators.purge_expired()
            + self.bonds.purge_expired()
            + self.distributed.purge_expired()
            + self.conversions.purge_expired()
            + self.signing_keys.purge_expired()
            + self.log_history.purge_expired()
    }

    pub fn clear(&self) {
        self.operator_count.clear();
        self.operators.clear();
        self.bonds.clear();
        self.distributed.clear();
        self.conversions.clear();
        self.signing_keys.clear();
        self.log_history.clear();
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        application::{
            CacheConfig, ChainReader, ResolverConfig,
            mock::{MockChain, address_for},
        },
        domain::OperatorId,
    };
    use alloy_primitives::Address;
    use operator_common::error::BoxError;
    use rust_decimal::Decimal;
    use tokio::time::Instant;

    fn reader(chain: MockChain) -> ChainReader<MockChain> {
        ChainReader::new(chain, CacheConfig::default(), ResolverConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_batched() -> Result<(), BoxError> {
        let chain = MockChain::with_operators(120);
        let reader = reader(chain.clone());

        let id = reader.resolve(address_for(57, 0x22)).await?;
        assert_eq!(id, Some(OperatorId(57)));
        assert_eq!(chain.batch_calls.count(), 2);
        assert_eq!(chain.single_calls.count(), 0);

        // Records of scanned windows are cached.
        let record = reader.operator(OperatorId(3)).await?;
        assert_eq!(record.map(|record| record.id), Some(OperatorId(3)));
        assert_eq!(chain.single_calls.count(), 0);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_falls_back_to_sequential() -> Result<(), BoxError> {
        let chain = MockChain {
            batch_fails_from: Some(50),
            ..MockChain::with_operators(150)
        };
        let reader = reader(chain.clone());

        let id = reader.resolve(address_for(120, 0x11)).await?;
        assert_eq!(id, Some(OperatorId(120)));

        // Window 1 batched, window 2 failed and never retried batched.
        assert_eq!(chain.batch_calls.count(), 2);
        assert_eq!(chain.single_calls.count(), 71);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_skips_failed_reads() -> Result<(), BoxError> {
        let chain = MockChain {
            batch_fails_from: Some(0),
            failing_ids: [5, 6].into(),
            ..MockChain::with_operators(10)
        };
        let reader = reader(chain);
        let ResolverConfig {
            sequential_delay,
            failure_delay,
            ..
        } = ResolverConfig::default();

        // Ids 0 to 4 read, 5 and 6 failed, no pause after the match.
        let started_at = Instant::now();
        let id = reader.resolve(address_for(7, 0x22)).await?;
        assert_eq!(id, Some(OperatorId(7)));
        assert_eq!(started_at.elapsed(), sequential_delay * 5 + failure_delay * 2);

        let started_at = Instant::now();
        let id = reader.resolve(address_for(6, 0x22)).await?;
        assert_eq!(id, None);
        assert_eq!(started_at.elapsed(), sequential_delay * 8 + failure_delay * 2);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_lowest_id_wins() -> Result<(), BoxError> {
        let mut chain = MockChain::with_operators(80);
        let shared = address_for(1_000, 0x33);
        chain.operators[12].reward_address = shared;
        chain.operators[70].manager_address = shared;
        let reader = reader(chain);

        let id = reader.resolve(shared).await?;
        assert_eq!(id, Some(OperatorId(12)));

        let id = reader.resolve(Address::ZERO).await?;
        assert_eq!(id, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_shares_to_value() -> Result<(), BoxError> {
        let reader = reader(MockChain::default());

        assert_eq!(reader.shares_to_value(0).await?, Decimal::ZERO);
        assert_eq!(
            reader.shares_to_value(1_500_000_000_000_000_000).await?,
            Decimal::new(15, 1)
        );

        Ok(())
    }
}
