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
    domain::{DistributionLog, LogArchive},
    infra::http::{HttpSourceError, fetch_text, make_client},
};
use fastrace::trace;
use log::debug;
use operator_common::error::StdErrorExt;
use reqwest::Client;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Gateway base URLs, tried in the given order.
    #[serde(default = "gateways_default")]
    pub gateways: Vec<String>,

    #[serde(with = "humantime_serde", default = "timeout_default")]
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateways: gateways_default(),
            timeout: timeout_default(),
        }
    }
}

fn gateways_default() -> Vec<String> {
    vec![
        "https://ipfs.io/ipfs".to_owned(),
        "https://dweb.link/ipfs".to_owned(),
        "https://gateway.pinata.cloud/ipfs".to_owned(),
    ]
}

fn timeout_default() -> Duration {
    Duration::from_secs(30)
}

/// Content-addressed documents fetched from the first IPFS gateway able to serve them.
#[derive(Debug, Clone)]
pub struct IpfsGateways {
    http: Client,
    gateways: Arc<Vec<String>>,
}

impl IpfsGateways {
    pub fn new(config: Config) -> Result<Self, HttpSourceError> {
        let http = make_client(config.timeout)?;
        let gateways = config
            .gateways
            .into_iter()
            .map(|gateway| gateway.trim_end_matches('/').to_owned())
            .collect();

        Ok(Self {
            http,
            gateways: Arc::new(gateways),
        })
    }

    pub async fn fetch(&self, cid: &str) -> Result<String, HttpSourceError> {
        if cid.is_empty() || !cid.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(HttpSourceError::UnexpectedResponse(format!(
                "invalid content id {cid}"
            )));
        }

        let mut last_error = HttpSourceError::NoGateway;
        for gateway in self.gateways.iter() {
            let url = format!("{gateway}/{cid}");

            match fetch_text(self.http.get(&url), &url).await {
                Ok(body) => return Ok(body),

                Err(error) => {
                    debug!(url, error:% = error.as_chain(); "gateway failed, trying next");
                    last_error = error;
                }
            }
        }

        Err(last_error)
    }
}

/// A [LogArchive] implementation based on IPFS gateways.
#[derive(Debug, Clone)]
pub struct IpfsLogArchive {
    gateways: IpfsGateways,
}

impl IpfsLogArchive {
    pub fn new(config: Config) -> Result<Self, HttpSourceError> {
        let gateways = IpfsGateways::new(config)?;
        Ok(Self { gateways })
    }
}

impl LogArchive for IpfsLogArchive {
    type Error = HttpSourceError;

    #[trace]
    async fn fetch_log(&self, cid: &str) -> Result<Vec<DistributionLog>, Self::Error> {
        let body = self.gateways.fetch(cid).await?;
        parse_log_document(&body).map_err(|error| HttpSourceError::Decode(cid.to_owned(), error))
    }
}

/// A log document holds either a single frame or a list of frames. Share amounts may exceed
/// `u64`, hence the document is deserialized directly instead of via an untagged enum.
fn parse_log_document(body: &str) -> Result<Vec<DistributionLog>, serde_json::Error> {
    if body.trim_start().starts_with('[') {
        serde_json::from_str(body)
    } else {
        serde_json::from_str(body).map(|log| vec![log])
    }
}

#[cfg(test)]
mod tests {
    use crate::{domain::OperatorId, infra::ipfs::parse_log_document};
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_single_log() -> Result<(), serde_json::Error> {
        let body = r#"{
            "blockstamp": {"block_number": 21000000},
            "frame": [326250, 332549],
            "operators": {
                "7": {
                    "distributed_rewards": 123456789012345678901234,
                    "validators": {
                        "100": {"slashed": false, "strikes": 1}
                    }
                },
                "8": {"distributed": 42, "validators": {}}
            }
        }"#;
        let logs = parse_log_document(body)?;
        assert_eq!(logs.len(), 1);

        let frame = logs[0].frame_for(OperatorId(7));
        assert_matches!(frame, Some(frame) => {
            assert_eq!(frame.start_epoch, 326_250);
            assert_eq!(frame.end_epoch, 332_549);
            assert_eq!(frame.distributed_shares, 123_456_789_012_345_678_901_234);
        });
        assert_matches!(
            logs[0].frame_for(OperatorId(8)),
            Some(frame) if frame.distributed_shares == 42
        );
        assert_eq!(logs[0].frame_for(OperatorId(9)), None);

        Ok(())
    }

    #[test]
    fn test_parse_log_list() -> Result<(), serde_json::Error> {
        let body = r#"
            [
                {"frame": [1, 10], "operators": {"1": {"distributed_rewards": 5}}},
                {"frame": [11, 20], "operators": {}}
            ]
        "#;
        let logs = parse_log_document(body)?;
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1].frame, (11, 20));

        assert!(parse_log_document(r#"{"operators": {}}"#).is_err());

        Ok(())
    }
}
