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

use fastrace::collector::{Config as CollectorConfig, ConsoleReporter};
use log::info;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use serde::Deserialize;
use std::net::IpAddr;

/// Telemetry configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(rename = "tracing", default)]
    pub tracing_config: TracingConfig,

    #[serde(rename = "metrics", default)]
    pub metrics_config: MetricsConfig,
}

/// Tracing configuration; spans are reported to the console when enabled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TracingConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Metrics configuration for the Prometheus exporter.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    pub address: IpAddr,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: [0, 0, 0, 0].into(),
            port: 9000,
        }
    }
}

/// Initialize logging; the level is taken from `RUST_LOG`, defaulting to info.
pub fn init_logging() {
    logforth::starter_log::stdout().apply();
}

/// Initialize tracing: install a console reporter if enabled.
pub fn init_tracing(config: TracingConfig) {
    if config.enabled {
        fastrace::set_reporter(ConsoleReporter, CollectorConfig::default());
        info!("tracing enabled");
    }
}

/// Initialize metrics: install a Prometheus exporter listening on the configured address and
/// port if enabled. Must be called within a Tokio runtime.
pub fn init_metrics(config: MetricsConfig) -> Result<(), BuildError> {
    let MetricsConfig {
        enabled,
        address,
        port,
    } = config;

    if enabled {
        PrometheusBuilder::new()
            .with_http_listener((address, port))
            .install()?;
        info!(address:?, port; "metrics exporter listening");
    }

    Ok(())
}

/// Flush pending spans, to be called before the process exits.
pub fn shutdown() {
    fastrace::flush();
}
