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
    domain::{
        DistributionFrame, DistributionLog, LogArchive, LogReference, OperatorId,
        normalize_frames,
    },
};
use futures::future::try_join_all;
use operator_common::cache::ExpiringCache;
use std::sync::Arc;

/// Cached access to published distribution logs. Published logs never change, hence they are
/// kept for long.
pub struct HistoryReader<L> {
    archive: L,
    logs: ExpiringCache<String, Arc<Vec<DistributionLog>>>,
}

impl<L> HistoryReader<L>
where
    L: LogArchive,
{
    pub fn new(archive: L, cache_config: &CacheConfig) -> Self {
        Self {
            archive,
            logs: ExpiringCache::new(
                "distribution_logs",
                cache_config.max_size,
                cache_config.log_document_ttl,
            ),
        }
    }

    /// All frames of the log document with the given content id.
    pub async fn logs(&self, cid: &str) -> Result<Arc<Vec<DistributionLog>>, L::Error> {
        self.logs
            .get_or_try_insert_with(cid.to_owned(), None, || async {
                let logs = self.archive.fetch_log(cid).await?;
                Ok::<_, L::Error>(Arc::new(logs))
            })
            .await
    }

    /// Frames of the given operator across all referenced logs, ordered and free of overlaps.
    /// Frames not mentioning the operator are skipped.
    pub async fn frames(
        &self,
        references: &[LogReference],
        operator_id: OperatorId,
    ) -> Result<Vec<DistributionFrame>, L::Error> {
        let documents =
            try_join_all(references.iter().map(|reference| self.logs(&reference.log_cid))).await?;

        let frames = documents
            .iter()
            .flat_map(|logs| logs.iter())
            .filter_map(|log| log.frame_for(operator_id))
            .collect::<Vec<_>>();

        Ok(normalize_frames(frames))
    }

    pub fn purge_expired(&self) -> usize {
        self.logs.purge_expired()
    }

    pub fn clear(&self) {
        self.logs.clear();
    }
}
