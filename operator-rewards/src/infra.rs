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

pub mod beacon;
pub mod bond_rate;
pub mod chain;
pub mod http;
pub mod ipfs;
pub mod manifest;
pub mod strikes;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "chain")]
    pub chain_config: chain::Config,

    #[serde(rename = "manifest")]
    pub manifest_config: manifest::Config,

    #[serde(rename = "log_archive")]
    pub log_archive_config: ipfs::Config,

    #[serde(rename = "beacon")]
    pub beacon_config: beacon::Config,

    #[serde(rename = "bond_rate")]
    pub bond_rate_config: bond_rate::Config,

    #[serde(rename = "strikes")]
    pub strikes_config: strikes::Config,
}
