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
    domain::{BeaconSource, ValidatorInfo, ValidatorStatus},
    infra::http::{HttpSourceError, decode_json, fetch_text, make_client},
};
use fastrace::trace;
use itertools::Itertools;
use log::warn;
use operator_common::error::StdErrorExt;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};

/// Activation epoch of validators not yet activated.
const FAR_FUTURE_EPOCH: u64 = u64::MAX >> 1;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub url: String,

    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Maximum number of validators per request.
    #[serde(default = "batch_size_default")]
    pub batch_size: usize,

    /// Whether to also query attestation effectiveness.
    #[serde(default = "effectiveness_default")]
    pub effectiveness: bool,

    #[serde(with = "humantime_serde", default = "timeout_default")]
    pub timeout: Duration,
}

fn batch_size_default() -> usize {
    100
}

fn effectiveness_default() -> bool {
    true
}

fn timeout_default() -> Duration {
    Duration::from_secs(30)
}

/// A [BeaconSource] implementation based on the beaconcha.in API.
#[derive(Debug, Clone)]
pub struct BeaconchainClient {
    http: Client,
    config: Config,
}

impl BeaconchainClient {
    pub fn new(config: Config) -> Result<Self, HttpSourceError> {
        let http = make_client(config.timeout)?;
        Ok(Self { http, config })
    }

    async fn get<T>(&self, path: &str) -> Result<Vec<T>, HttpSourceError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{path}", self.config.url.trim_end_matches('/'));

        let mut request = self.http.get(&url);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("apikey", api_key.expose_secret());
        }

        let body = fetch_text(request, &url).await?;
        decode_json::<BeaconResponse<T>>(&body, &url).map(|response| response.data.into_vec())
    }

    async fn validator_chunk(
        &self,
        pubkeys: &[String],
    ) -> Result<Vec<ValidatorInfo>, HttpSourceError> {
        let path = format!("validator/{}", pubkeys.iter().join(","));
        let validators = self.get::<BeaconValidator>(&path).await?;

        let mut validators = validators
            .into_iter()
            .map(|validator| (validator.pubkey.to_ascii_lowercase(), validator.into_info()))
            .collect::<HashMap<_, _>>();

        if self.config.effectiveness {
            let indices = validators
                .values()
                .filter_map(|validator| validator.index)
                .collect::<Vec<_>>();

            match self.effectiveness(&indices).await {
                Ok(effectiveness) => {
                    for validator in validators.values_mut() {
                        validator.effectiveness = validator
                            .index
                            .and_then(|index| effectiveness.get(&index).copied());
                    }
                }

                Err(error) => {
                    warn!(error:% = error.as_chain(); "cannot read attestation effectiveness")
                }
            }
        }

        Ok(pubkeys
            .iter()
            .map(|pubkey| {
                validators
                    .remove(&pubkey.to_ascii_lowercase())
                    .unwrap_or_else(|| ValidatorInfo::unknown(pubkey.to_owned()))
            })
            .collect())
    }

    async fn effectiveness(&self, indices: &[u64]) -> Result<HashMap<u64, f64>, HttpSourceError> {
        if indices.is_empty() {
            return Ok(HashMap::new());
        }

        let path = format!("validator/{}/attestationefficiency", indices.iter().join(","));
        let efficiencies = self.get::<AttestationEfficiency>(&path).await?;

        Ok(efficiencies
            .into_iter()
            .filter_map(|efficiency| {
                efficiency_to_effectiveness(efficiency.attestation_efficiency)
                    .map(|effectiveness| (efficiency.validatorindex, effectiveness))
            })
            .collect())
    }
}

impl BeaconSource for BeaconchainClient {
    type Error = HttpSourceError;

    #[trace]
    async fn validators(&self, pubkeys: &[String]) -> Result<Vec<ValidatorInfo>, Self::Error> {
        let mut validators = Vec::with_capacity(pubkeys.len());

        for chunk in pubkeys.chunks(self.config.batch_size.max(1)) {
            validators.extend(self.validator_chunk(chunk).await?);
        }

        Ok(validators)
    }
}

#[derive(Debug, Deserialize)]
struct BeaconResponse<T> {
    data: OneOrMany<T>,
}

/// A single result is not wrapped in an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(values) => values,
            Self::One(value) => vec![value],
        }
    }
}

#[derive(Debug, Deserialize)]
struct BeaconValidator {
    pubkey: String,

    #[serde(default)]
    validatorindex: Option<u64>,

    status: String,

    #[serde(default)]
    balance: Option<u64>,

    #[serde(default)]
    activationepoch: Option<u64>,

    #[serde(default)]
    slashed: bool,
}

impl BeaconValidator {
    fn into_info(self) -> ValidatorInfo {
        ValidatorInfo {
            status: map_status(&self.status, self.slashed),
            index: self.validatorindex,
            balance_gwei: self.balance,
            activation_epoch: self
                .activationepoch
                .filter(|&epoch| epoch < FAR_FUTURE_EPOCH),
            effectiveness: None,
            pubkey: self.pubkey,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AttestationEfficiency {
    validatorindex: u64,
    attestation_efficiency: Option<f64>,
}

fn map_status(status: &str, slashed: bool) -> ValidatorStatus {
    let status = status.to_ascii_lowercase();

    if slashed || status.starts_with("slash") {
        ValidatorStatus::Slashed
    } else if status.starts_with("active") {
        ValidatorStatus::Active
    } else if status.starts_with("exiting") {
        ValidatorStatus::Exiting
    } else if status.starts_with("exited") || status.starts_with("withdraw") {
        ValidatorStatus::Exited
    } else if status.starts_with("pending") || status == "deposited" {
        ValidatorStatus::Pending
    } else {
        ValidatorStatus::Unknown
    }
}

/// Attestation efficiency is 1 at best and grows with inclusion delay; effectiveness is its
/// inverse in percent, capped at 100.
fn efficiency_to_effectiveness(efficiency: Option<f64>) -> Option<f64> {
    efficiency
        .filter(|&efficiency| efficiency > 0.0)
        .map(|efficiency| {
            let effectiveness = (100.0 / efficiency).min(100.0);
            (effectiveness * 100.0).round() / 100.0
        })
}
