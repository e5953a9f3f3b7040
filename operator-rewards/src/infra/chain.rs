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

//! JSON-RPC client for the staking module, accounting, fee distributor, strikes and token
//! contracts.

use crate::domain::{
    ChainSource, LogReference, OperatorId, OperatorRecord, PUBKEY_LENGTH, ShareTransfer,
};
use alloy_primitives::{Address, B256, Bytes, U64, U256};
use alloy_sol_types::{SolCall, SolEvent, sol};
use chrono::{DateTime, Utc};
use fastrace::trace;
use log::{debug, warn};
use operator_common::error::StdErrorExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{collections::HashMap, ops::Range, time::Duration};
use thiserror::Error;

sol! {
    #![sol(all_derives)]

    struct NodeOperator {
        uint32 totalAddedKeys;
        uint32 totalWithdrawnKeys;
        uint32 totalDepositedKeys;
        uint32 totalVettedKeys;
        uint32 stuckValidatorsCount;
        uint32 depositableValidatorsCount;
        uint32 targetLimit;
        uint8 targetLimitMode;
        uint32 totalExitedKeys;
        uint32 enqueuedCount;
        address managerAddress;
        address proposedManagerAddress;
        address rewardAddress;
        address proposedRewardAddress;
        bool extendedManagerPermissions;
    }

    function getNodeOperatorsCount() external view returns (uint256);
    function getNodeOperator(uint256 nodeOperatorId) external view returns (NodeOperator memory);
    function getSigningKeys(uint256 nodeOperatorId, uint256 startIndex, uint256 keysCount)
        external view returns (bytes memory);

    function getBondSummary(uint256 nodeOperatorId)
        external view returns (uint256 current, uint256 required);

    function distributedShares(uint256 nodeOperatorId) external view returns (uint256);
    event DistributionLogUpdated(string logCid);

    function getPooledEthByShares(uint256 sharesAmount) external view returns (uint256);
    event TransferShares(address indexed from, address indexed to, uint256 sharesValue);

    function treeCid() external view returns (string memory);
}

/// Config for the chain connection.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub url: String,

    pub module_address: Address,
    pub accounting_address: Address,
    pub fee_distributor_address: Address,
    pub token_address: Address,

    /// Strikes contract publishing the strikes tree; without it strikes are unavailable.
    #[serde(default)]
    pub strikes_address: Option<Address>,

    /// First block to search for events, e.g. the deployment block of the fee distributor.
    pub log_from_block: u64,

    /// Number of blocks per event query.
    #[serde(default = "log_block_range_default")]
    pub log_block_range: u64,

    #[serde(with = "humantime_serde", default = "timeout_default")]
    pub timeout: Duration,
}

fn log_block_range_default() -> u64 {
    50_000
}

fn timeout_default() -> Duration {
    Duration::from_secs(30)
}

/// A [ChainSource] implementation based on JSON-RPC over HTTP.
#[derive(Debug, Clone)]
pub struct RpcChainClient {
    http: Client,
    config: Config,
}

impl RpcChainClient {
    /// Create a new [RpcChainClient] with the given [Config].
    pub fn new(config: Config) -> Result<Self, ChainClientError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ChainClientError::Client)?;

        Ok(Self { http, config })
    }

    /// Content id of the current strikes tree.
    #[trace]
    pub async fn strikes_tree_cid(&self) -> Result<String, ChainClientError> {
        let Some(strikes_address) = self.config.strikes_address else {
            return Err(ChainClientError::NotConfigured("strikes_address"));
        };

        let cid = self
            .call(strikes_address, treeCidCall {})
            .await?
            ._0;
        Ok(cid)
    }

    async fn call<C>(&self, to: Address, call: C) -> Result<C::Return, ChainClientError>
    where
        C: SolCall,
    {
        let result = self.request("eth_call", eth_call_params(to, &call)).await?;
        decode_call::<C>(&result)
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ChainClientError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 0,
            method,
            params,
        };
        let body = self.post(method, &request).await?;

        let response = serde_json::from_str::<RpcResponse>(&body)
            .map_err(|error| ChainClientError::Decode(method.to_owned(), error))?;
        response.into_result(method)
    }

    /// Send all given requests as one JSON-RPC batch; fails as a whole if the provider rejects
    /// the batch or any single request fails.
    async fn batch(&self, requests: Vec<(&str, Value)>) -> Result<Vec<Value>, ChainClientError> {
        if requests.is_empty() {
            return Ok(vec![]);
        }

        let len = requests.len();
        let requests = requests
            .into_iter()
            .enumerate()
            .map(|(id, (method, params))| RpcRequest {
                jsonrpc: "2.0",
                id: id as u64,
                method,
                params,
            })
            .collect::<Vec<_>>();

        let body = self.post("batch", &requests).await?;
        parse_batch(&body, len)
    }

    async fn post<T>(&self, method: &str, body: &T) -> Result<String, ChainClientError>
    where
        T: Serialize + ?Sized,
    {
        let response = self
            .http
            .post(&self.config.url)
            .json(body)
            .send()
            .await
            .map_err(|error| ChainClientError::Request(method.to_owned(), error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainClientError::Status {
                method: method.to_owned(),
                status,
            });
        }

        response
            .text()
            .await
            .map_err(|error| ChainClientError::Request(method.to_owned(), error))
    }

    async fn block_number(&self) -> Result<u64, ChainClientError> {
        let result = self.request("eth_blockNumber", json!([])).await?;
        let block_number = serde_json::from_value::<U64>(result)
            .map_err(|error| ChainClientError::Decode("eth_blockNumber".to_owned(), error))?;
        Ok(block_number.to::<u64>())
    }

    /// Logs of the given contract matching the given topics, from the configured first block to
    /// the latest one, queried in chunks.
    async fn logs(
        &self,
        address: Address,
        topics: Vec<Option<B256>>,
    ) -> Result<Vec<RpcLog>, ChainClientError> {
        let latest = self.block_number().await?;
        let range = self.config.log_block_range.max(1);

        let mut logs = vec![];
        let mut from = self.config.log_from_block;
        while from <= latest {
            let to = from.saturating_add(range - 1).min(latest);
            let params = json!([{
                "address": address,
                "topics": topics,
                "fromBlock": quantity(from),
                "toBlock": quantity(to),
            }]);

            let result = self.request("eth_getLogs", params).await?;
            let chunk = serde_json::from_value::<Vec<RpcLog>>(result)
                .map_err(|error| ChainClientError::Decode("eth_getLogs".to_owned(), error))?;
            debug!(from, to, logs = chunk.len(); "logs fetched");
            logs.extend(chunk);

            from = to.saturating_add(1);
        }

        Ok(logs)
    }

    /// Timestamps of the given blocks, read in one batch.
    async fn block_timestamps(
        &self,
        block_numbers: &[u64],
    ) -> Result<HashMap<u64, DateTime<Utc>>, ChainClientError> {
        let requests = block_numbers
            .iter()
            .map(|&number| ("eth_getBlockByNumber", json!([quantity(number), false])))
            .collect();
        let blocks = self.batch(requests).await?;

        block_numbers
            .iter()
            .zip(blocks)
            .map(|(&number, block)| {
                let block = serde_json::from_value::<RpcBlock>(block).map_err(|error| {
                    ChainClientError::Decode("eth_getBlockByNumber".to_owned(), error)
                })?;
                let timestamp = i64::try_from(block.timestamp.to::<u64>())
                    .ok()
                    .and_then(|timestamp| DateTime::from_timestamp(timestamp, 0))
                    .ok_or_else(|| {
                        ChainClientError::UnexpectedResponse(format!(
                            "invalid timestamp of block {number}"
                        ))
                    })?;
                Ok((number, timestamp))
            })
            .collect()
    }
}

impl ChainSource for RpcChainClient {
    type Error = ChainClientError;

    #[trace]
    async fn operator_count(&self) -> Result<u64, Self::Error> {
        let count = self
            .call(self.config.module_address, getNodeOperatorsCountCall {})
            .await?
            ._0;
        to_u64(count, "operator count")
    }

    #[trace]
    async fn operator(&self, id: OperatorId) -> Result<Option<OperatorRecord>, Self::Error> {
        let call = getNodeOperatorCall {
            nodeOperatorId: U256::from(id.0),
        };

        match self.call(self.config.module_address, call).await {
            Ok(operator) => Ok(to_record(id, operator._0)),
            Err(error) if error.is_revert() => Ok(None),
            Err(error) => Err(error),
        }
    }

    #[trace]
    async fn operators_batch(&self, ids: Range<u64>) -> Result<Vec<OperatorRecord>, Self::Error> {
        let requests = ids
            .clone()
            .map(|id| {
                let call = getNodeOperatorCall {
                    nodeOperatorId: U256::from(id),
                };
                ("eth_call", eth_call_params(self.config.module_address, &call))
            })
            .collect();
        let results = self.batch(requests).await?;

        ids.zip(results)
            .filter_map(|(id, result)| {
                decode_call::<getNodeOperatorCall>(&result)
                    .map(|operator| to_record(OperatorId(id), operator._0))
                    .transpose()
            })
            .collect()
    }

    #[trace]
    async fn bond_summary(&self, id: OperatorId) -> Result<(u128, u128), Self::Error> {
        let call = getBondSummaryCall {
            nodeOperatorId: U256::from(id.0),
        };
        let getBondSummaryReturn { current, required } =
            self.call(self.config.accounting_address, call).await?;

        Ok((to_u128(current, "current bond")?, to_u128(required, "required bond")?))
    }

    #[trace]
    async fn distributed_shares(&self, id: OperatorId) -> Result<u128, Self::Error> {
        let call = distributedSharesCall {
            nodeOperatorId: U256::from(id.0),
        };
        let shares = self
            .call(self.config.fee_distributor_address, call)
            .await?
            ._0;
        to_u128(shares, "distributed shares")
    }

    #[trace]
    async fn shares_to_value(&self, shares: u128) -> Result<u128, Self::Error> {
        let call = getPooledEthBySharesCall {
            sharesAmount: U256::from(shares),
        };
        let value = self.call(self.config.token_address, call).await?._0;
        to_u128(value, "pooled ether")
    }

    #[trace]
    async fn signing_keys(
        &self,
        id: OperatorId,
        start: u32,
        count: u32,
    ) -> Result<Vec<String>, Self::Error> {
        let call = getSigningKeysCall {
            nodeOperatorId: U256::from(id.0),
            startIndex: U256::from(start),
            keysCount: U256::from(count),
        };
        let keys = self.call(self.config.module_address, call).await?._0;
        split_signing_keys(&keys)
    }

    #[trace]
    async fn distribution_log_history(&self) -> Result<Vec<LogReference>, Self::Error> {
        let topics = vec![Some(DistributionLogUpdated::SIGNATURE_HASH)];
        let logs = self
            .logs(self.config.fee_distributor_address, topics)
            .await?;

        logs.iter().map(log_reference).collect()
    }

    #[trace]
    async fn withdrawal_events(
        &self,
        reward_address: Address,
    ) -> Result<Vec<ShareTransfer>, Self::Error> {
        let topics = vec![
            Some(TransferShares::SIGNATURE_HASH),
            Some(self.config.accounting_address.into_word()),
            Some(reward_address.into_word()),
        ];
        let logs = self.logs(self.config.token_address, topics).await?;

        let mut block_numbers = logs
            .iter()
            .map(|log| log.block_number.to::<u64>())
            .collect::<Vec<_>>();
        block_numbers.dedup();

        let timestamps = self
            .block_timestamps(&block_numbers)
            .await
            .inspect_err(|error| {
                warn!(error:% = error.as_chain(); "cannot read block timestamps");
            })
            .unwrap_or_default();

        logs.iter()
            .map(|log| share_transfer(log, &timestamps))
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum ChainClientError {
    #[error("cannot create HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("cannot send JSON-RPC request {0}")]
    Request(String, #[source] reqwest::Error),

    #[error("JSON-RPC request {method} failed with status {status}")]
    Status { method: String, status: StatusCode },

    #[error("cannot decode JSON-RPC response for {0}")]
    Decode(String, #[source] serde_json::Error),

    #[error("JSON-RPC error {code} for {method}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    #[error("batch request rejected: {0}")]
    BatchRejected(String),

    #[error("cannot ABI decode result of {0}")]
    Abi(&'static str, #[source] alloy_sol_types::Error),

    #[error("cannot hex decode result")]
    Hex(#[from] const_hex::FromHexError),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("{0} not configured")]
    NotConfigured(&'static str),
}

impl ChainClientError {
    /// Whether the called contract reverted, e.g. for an unknown id.
    pub fn is_revert(&self) -> bool {
        match self {
            Self::Rpc { code, message, .. } => {
                *code == 3 || message.to_ascii_lowercase().contains("revert")
            }
            _ => false,
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    id: Option<u64>,

    #[serde(default)]
    result: Option<Value>,

    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl RpcResponse {
    fn into_result(self, method: &str) -> Result<Value, ChainClientError> {
        match self.error {
            Some(RpcErrorObject { code, message }) => Err(ChainClientError::Rpc {
                method: method.to_owned(),
                code,
                message,
            }),
            None => Ok(self.result.unwrap_or_default()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    topics: Vec<B256>,
    data: Bytes,
    block_number: U64,
    transaction_hash: B256,
}

#[derive(Debug, Deserialize)]
struct RpcBlock {
    timestamp: U64,
}

fn quantity(n: u64) -> String {
    format!("{n:#x}")
}

fn eth_call_params<C>(to: Address, call: &C) -> Value
where
    C: SolCall,
{
    let data = const_hex::encode_prefixed(call.abi_encode());
    json!([{ "to": to, "data": data }, "latest"])
}

fn decode_call<C>(result: &Value) -> Result<C::Return, ChainClientError>
where
    C: SolCall,
{
    let data = result.as_str().ok_or_else(|| {
        ChainClientError::UnexpectedResponse(format!("expected hex data for {}", C::SIGNATURE))
    })?;
    let data = const_hex::decode(data)?;

    C::abi_decode_returns(&data, true).map_err(|error| ChainClientError::Abi(C::SIGNATURE, error))
}

/// Parse a batch response: it must be an array with one successful response per request.
fn parse_batch(body: &str, len: usize) -> Result<Vec<Value>, ChainClientError> {
    let value = serde_json::from_str::<Value>(body)
        .map_err(|error| ChainClientError::Decode("batch".to_owned(), error))?;
    let Value::Array(responses) = value else {
        return Err(ChainClientError::BatchRejected(value.to_string()));
    };
    if responses.len() != len {
        return Err(ChainClientError::BatchRejected(format!(
            "expected {len} responses, got {}",
            responses.len()
        )));
    }

    let mut responses = responses
        .into_iter()
        .map(serde_json::from_value::<RpcResponse>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| ChainClientError::Decode("batch".to_owned(), error))?;
    responses.sort_by_key(|response| response.id);

    responses
        .into_iter()
        .map(|response| response.into_result("batch"))
        .collect()
}

/// Unknown ids yield an empty record without a manager.
fn to_record(id: OperatorId, operator: NodeOperator) -> Option<OperatorRecord> {
    if operator.managerAddress.is_zero() {
        return None;
    }

    Some(OperatorRecord {
        id,
        total_added_keys: operator.totalAddedKeys,
        total_withdrawn_keys: operator.totalWithdrawnKeys,
        total_deposited_keys: operator.totalDepositedKeys,
        total_vetted_keys: operator.totalVettedKeys,
        stuck_validators_count: operator.stuckValidatorsCount,
        depositable_validators_count: operator.depositableValidatorsCount,
        target_limit: operator.targetLimit,
        target_limit_mode: operator.targetLimitMode,
        total_exited_keys: operator.totalExitedKeys,
        enqueued_count: operator.enqueuedCount,
        manager_address: operator.managerAddress,
        proposed_manager_address: operator.proposedManagerAddress,
        reward_address: operator.rewardAddress,
        proposed_reward_address: operator.proposedRewardAddress,
        extended_manager_permissions: operator.extendedManagerPermissions,
    })
}

fn split_signing_keys(keys: &[u8]) -> Result<Vec<String>, ChainClientError> {
    if keys.len() % PUBKEY_LENGTH != 0 {
        return Err(ChainClientError::UnexpectedResponse(format!(
            "signing keys of {} bytes are not a multiple of {PUBKEY_LENGTH}",
            keys.len()
        )));
    }

    Ok(keys
        .chunks(PUBKEY_LENGTH)
        .map(const_hex::encode_prefixed)
        .collect())
}

fn log_reference(log: &RpcLog) -> Result<LogReference, ChainClientError> {
    let (log_cid,) = DistributionLogUpdated::abi_decode_data(&log.data, true)
        .map_err(|error| ChainClientError::Abi(DistributionLogUpdated::SIGNATURE, error))?;

    Ok(LogReference {
        block_number: log.block_number.to::<u64>(),
        log_cid,
    })
}

fn share_transfer(
    log: &RpcLog,
    timestamps: &HashMap<u64, DateTime<Utc>>,
) -> Result<ShareTransfer, ChainClientError> {
    if log.topics.first() != Some(&TransferShares::SIGNATURE_HASH) {
        return Err(ChainClientError::UnexpectedResponse(
            "log is not a share transfer".to_owned(),
        ));
    }

    let (shares,) = TransferShares::abi_decode_data(&log.data, true)
        .map_err(|error| ChainClientError::Abi(TransferShares::SIGNATURE, error))?;
    let block_number = log.block_number.to::<u64>();

    Ok(ShareTransfer {
        block_number,
        timestamp: timestamps.get(&block_number).copied(),
        shares: to_u128(shares, "transferred shares")?,
        tx_hash: log.transaction_hash.to_string(),
    })
}

fn to_u128(value: U256, what: &str) -> Result<u128, ChainClientError> {
    u128::try_from(value)
        .map_err(|_| ChainClientError::UnexpectedResponse(format!("{what} {value} exceeds u128")))
}

fn to_u64(value: U256, what: &str) -> Result<u64, ChainClientError> {
    u64::try_from(value)
        .map_err(|_| ChainClientError::UnexpectedResponse(format!("{what} {value} exceeds u64")))
}
