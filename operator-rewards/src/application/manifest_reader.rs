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
    domain::{ManifestSource, RewardsManifest},
};
use log::debug;
use operator_common::cache::ExpiringCache;
use std::sync::Arc;

/// Cached access to the published rewards manifest.
pub struct ManifestReader<M> {
    source: M,
    manifest: ExpiringCache<(), Arc<RewardsManifest>>,
}

impl<M> ManifestReader<M>
where
    M: ManifestSource,
{
    pub fn new(source: M, cache_config: &CacheConfig) -> Self {
        Self {
            source,
            manifest: ExpiringCache::new("rewards_manifest", 1, cache_config.manifest_ttl),
        }
    }

    pub async fn manifest(&self) -> Result<Arc<RewardsManifest>, M::Error> {
        self.manifest
            .get_or_try_insert_with((), None, || async {
                let manifest = self.source.fetch_manifest().await?;
                debug!(entries = manifest.len(); "rewards manifest fetched");
                Ok::<_, M::Error>(Arc::new(manifest))
            })
            .await
    }

    pub fn purge_expired(&self) -> usize {
        self.manifest.purge_expired()
    }

    pub fn clear(&self) {
        self.manifest.clear();
    }
}
