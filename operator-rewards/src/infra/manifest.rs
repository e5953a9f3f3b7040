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
    domain::{ManifestSource, RewardsManifest},
    infra::http::{HttpSourceError, get_json, make_client},
};
use fastrace::trace;
use reqwest::Client;
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

/// A [ManifestSource] implementation fetching the manifest JSON via HTTP.
#[derive(Debug, Clone)]
pub struct HttpManifestSource {
    http: Client,
    url: String,
}

impl HttpManifestSource {
    pub fn new(config: Config) -> Result<Self, HttpSourceError> {
        let http = make_client(config.timeout)?;
        Ok(Self {
            http,
            url: config.url,
        })
    }
}

impl ManifestSource for HttpManifestSource {
    type Error = HttpSourceError;

    #[trace]
    async fn fetch_manifest(&self) -> Result<RewardsManifest, Self::Error> {
        get_json(&self.http, &self.url).await
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::{OperatorId, RewardsManifest},
        infra::http::{HttpSourceError, decode_json},
    };
    use assert_matches::assert_matches;

    #[test]
    fn test_decode_manifest() -> Result<(), HttpSourceError> {
        let body = r#"{
            "CSM Operator 0": {
                "cumulativeFeeShares": 304687403773285400,
                "proof": ["0x01", "0x02"]
            },
            "CSM Operator 12": {
                "cumulativeFeeShares": 123456789012345678901234,
                "proof": []
            }
        }"#;
        let manifest = decode_json::<RewardsManifest>(body, "proofs.json")?;

        assert_eq!(manifest.operator_ids(), vec![OperatorId(0), OperatorId(12)]);
        assert_matches!(
            manifest.entry(OperatorId(12)),
            Some(entry) if entry.cumulative_fee_shares == 123_456_789_012_345_678_901_234
        );
        assert_matches!(
            manifest.entry(OperatorId(0)),
            Some(entry) if entry.proof.len() == 2
        );

        assert_matches!(
            decode_json::<RewardsManifest>("<html>", "proofs.json"),
            Err(HttpSourceError::Decode(..))
        );

        Ok(())
    }
}
