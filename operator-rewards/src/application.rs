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

mod bond_rate_reader;
mod chain_reader;
mod history_reader;
mod manifest_reader;
mod service;
mod strike_reader;
#[cfg(test)]
mod mock;

pub use bond_rate_reader::*;
pub use chain_reader::*;
pub use history_reader::*;
pub use manifest_reader::*;
pub use service::*;
pub use strike_reader::*;

use crate::domain::ProjectionParams;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub apy: ApyConfig,

    #[serde(default)]
    pub health: HealthConfig,
}

/// Size and TTLs of the caches. Immutable data like published distribution logs is kept long.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_size: usize,

    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,

    #[serde(with = "humantime_serde")]
    pub operator_count_ttl: Duration,

    #[serde(with = "humantime_serde")]
    pub operator_ttl: Duration,

    #[serde(with = "humantime_serde")]
    pub bond_ttl: Duration,

    #[serde(with = "humantime_serde")]
    pub distributed_ttl: Duration,

    #[serde(with = "humantime_serde")]
    pub conversion_ttl: Duration,

    #[serde(with = "humantime_serde")]
    pub manifest_ttl: Duration,

    #[serde(with = "humantime_serde")]
    pub log_history_ttl: Duration,

    #[serde(with = "humantime_serde")]
    pub log_document_ttl: Duration,

    #[serde(with = "humantime_serde")]
    pub bond_rate_ttl: Duration,

    #[serde(with = "humantime_serde")]
    pub strikes_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1_000,
            default_ttl: Duration::from_secs(5 * 60),
            operator_count_ttl: Duration::from_secs(60),
            operator_ttl: Duration::from_secs(5 * 60),
            bond_ttl: Duration::from_secs(60),
            distributed_ttl: Duration::from_secs(60),
            conversion_ttl: Duration::from_secs(60),
            manifest_ttl: Duration::from_secs(60 * 60),
            log_history_ttl: Duration::from_secs(10 * 60),
            log_document_ttl: Duration::from_secs(24 * 60 * 60),
            bond_rate_ttl: Duration::from_secs(60 * 60),
            strikes_ttl: Duration::from_secs(10 * 60),
        }
    }
}

/// Address resolution: operators are scanned in windows, batched while the provider allows it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub window_size: u64,

    /// Pause after each successful read once fallen back to sequential reads.
    #[serde(with = "humantime_serde")]
    pub sequential_delay: Duration,

    /// Pause after a failed sequential read.
    #[serde(with = "humantime_serde")]
    pub failure_delay: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            window_size: 50,
            sequential_delay: Duration::from_millis(50),
            failure_delay: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ApyConfig {
    pub next_frame_epoch_offset: u64,
    pub projection_days: u32,
}

impl Default for ApyConfig {
    fn default() -> Self {
        Self {
            next_frame_epoch_offset: 6_300,
            projection_days: 28,
        }
    }
}

impl From<ApyConfig> for ProjectionParams {
    fn from(config: ApyConfig) -> Self {
        Self {
            next_frame_epoch_offset: config.next_frame_epoch_offset,
            projection_days: config.projection_days,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Validators in service with a balance below this are at risk.
    pub min_balance_gwei: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            min_balance_gwei: 32_000_000_000,
        }
    }
}
