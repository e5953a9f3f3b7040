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

use crate::{application::CacheConfig, domain::BondRateSource};
use operator_common::cache::ExpiringCache;
use rust_decimal::Decimal;

/// Cached access to the current yield of the bond token.
pub struct BondRateReader<R> {
    source: R,
    rate: ExpiringCache<(), Option<Decimal>>,
}

impl<R> BondRateReader<R>
where
    R: BondRateSource,
{
    pub fn new(source: R, cache_config: &CacheConfig) -> Self {
        Self {
            source,
            rate: ExpiringCache::new("bond_rate", 1, cache_config.bond_rate_ttl),
        }
    }

    pub async fn bond_apr(&self) -> Result<Option<Decimal>, R::Error> {
        self.rate
            .get_or_try_insert_with((), None, || self.source.bond_apr())
            .await
    }

    pub fn purge_expired(&self) -> usize {
        self.rate.purge_expired()
    }

    pub fn clear(&self) {
        self.rate.clear();
    }
}
