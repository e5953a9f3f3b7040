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
    domain::BondRateSource,
    infra::http::{HttpSourceError, get_json, make_client},
};
use fastrace::trace;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub url: String,

    #[serde(with = "humantime_serde", default = "timeout_default")]
    pub timeout: Duration,
}

fn timeout_default() -> Duration {
    Duration::from_secs(30)
}

/// A [BondRateSource] implementation reading the moving average APR of the bond token from the
/// Lido API.
#[derive(Debug, Clone)]
pub struct LidoBondRateSource {
    http: Client,
    url: String,
}

impl LidoBondRateSource {
    pub fn new(config: Config) -> Result<Self, HttpSourceError> {
        let http = make_client(config.timeout)?;
        Ok(Self {
            http,
            url: config.url,
        })
    }
}

impl BondRateSource for LidoBondRateSource {
    type Error = HttpSourceError;

    #[trace]
    async fn bond_apr(&self) -> Result<Option<Decimal>, Self::Error> {
        let response = get_json::<AprResponse>(&self.http, &self.url).await?;
        Ok(response.data.sma_apr)
    }
}

#[derive(Debug, Deserialize)]
struct AprResponse {
    data: AprData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AprData {
    #[serde(default)]
    sma_apr: Option<Decimal>,
}
