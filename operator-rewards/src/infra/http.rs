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

use crate::infra::chain::ChainClientError;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Create an HTTP client with the given request timeout.
pub fn make_client(timeout: Duration) -> Result<Client, HttpSourceError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(HttpSourceError::Client)
}

/// Send the given request and return the body of a successful response.
pub async fn fetch_text(request: RequestBuilder, url: &str) -> Result<String, HttpSourceError> {
    let response = request
        .send()
        .await
        .map_err(|error| HttpSourceError::Request(url.to_owned(), error))?;

    let status = response.status();
    if !status.is_success() {
        return Err(HttpSourceError::Status {
            url: url.to_owned(),
            status,
        });
    }

    response
        .text()
        .await
        .map_err(|error| HttpSourceError::Request(url.to_owned(), error))
}

/// GET the given URL and decode the JSON body.
pub async fn get_json<T>(client: &Client, url: &str) -> Result<T, HttpSourceError>
where
    T: DeserializeOwned,
{
    let body = fetch_text(client.get(url), url).await?;
    decode_json(&body, url)
}

pub fn decode_json<T>(body: &str, url: &str) -> Result<T, HttpSourceError>
where
    T: DeserializeOwned,
{
    serde_json::from_str(body).map_err(|error| HttpSourceError::Decode(url.to_owned(), error))
}

/// Errors of the HTTP based sources.
#[derive(Debug, Error)]
pub enum HttpSourceError {
    #[error("cannot create HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("cannot request {0}")]
    Request(String, #[source] reqwest::Error),

    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: StatusCode },

    #[error("cannot decode response from {0}")]
    Decode(String, #[source] serde_json::Error),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("no gateway configured")]
    NoGateway,

    #[error("cannot read chain")]
    Chain(#[from] ChainClientError),
}
