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
    application::CacheConfig,
    domain::{OperatorId, StrikeSource, ValidatorStrikes},
};
use futures::try_join;
use log::debug;
use operator_common::cache::ExpiringCache;
use std::sync::Arc;

/// Per-validator strikes of an operator together with the ejection threshold applying to them.
#[derive(Debug, Clone)]
pub struct StrikeRecord {
    pub validators: Arc<Vec<ValidatorStrikes>>,
    pub ejection_threshold: u32,
}

/// Cached access to the strikes of operators' validators.
pub struct StrikeReader<S> {
    source: S,
    strikes: ExpiringCache<OperatorId, StrikeRecord>,
}

impl<S> StrikeReader<S>
where
    S: StrikeSource,
{
    pub fn new(source: S, cache_config: &CacheConfig) -> Self {
        Self {
            source,
            strikes: ExpiringCache::new(
                "strikes",
                cache_config.max_size,
                cache_config.strikes_ttl,
            ),
        }
    }

    pub async fn strikes(&self, id: OperatorId) -> Result<StrikeRecord, S::Error> {
        self.strikes
            .get_or_try_insert_with(id, None, || async {
                let (validators, ejection_threshold) = try_join!(
                    self.source.operator_strikes(id),
                    self.source.ejection_threshold(id)
                )?;
                debug!(operator_id:% = id, validators = validators.len(); "strikes fetched");

                Ok::<_, S::Error>(StrikeRecord {
                    validators: Arc::new(validators),
                    ejection_threshold,
                })
            })
            .await
    }

    pub fn purge_expired(&self) -> usize {
        self.strikes.purge_expired()
    }

    pub fn clear(&self) {
        self.strikes.clear();
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        application::{CacheConfig, StrikeReader, mock::MockStrikes},
        domain::{OperatorId, ValidatorStrikes},
    };
    use assert_matches::assert_matches;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_strikes_cached_per_operator() {
        let source = MockStrikes {
            strikes: Some(vec![ValidatorStrikes {
                pubkey: "0xaa".to_owned(),
                strikes: vec![0, 1],
            }]),
            ..Default::default()
        };
        let cache_config = CacheConfig::default();
        let reader = StrikeReader::new(source.clone(), &cache_config);

        for _ in 0..3 {
            let record = reader.strikes(OperatorId(7)).await;
            assert_matches!(
                record,
                Ok(record) if record.validators.len() == 1 && record.ejection_threshold == 3
            );
        }
        assert_eq!(source.calls.count(), 1);

        let _ = reader.strikes(OperatorId(8)).await;
        assert_eq!(source.calls.count(), 2);

        tokio::time::advance(cache_config.strikes_ttl + Duration::from_secs(1)).await;
        assert_eq!(reader.purge_expired(), 2);
        let _ = reader.strikes(OperatorId(7)).await;
        assert_eq!(source.calls.count(), 3);
    }

    #[tokio::test]
    async fn test_failures_not_cached() {
        let source = MockStrikes::default();
        let reader = StrikeReader::new(source.clone(), &CacheConfig::default());

        assert!(reader.strikes(OperatorId(7)).await.is_err());
        assert!(reader.strikes(OperatorId(7)).await.is_err());
        assert_eq!(source.calls.count(), 2);
    }
}
