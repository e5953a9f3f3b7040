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

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use fastrace::{Span, future::FutureExt, prelude::SpanContext};
use log::{error, info, warn};
use operator_common::{config::ConfigExt, telemetry};
use operator_rewards::{
    application::{Include, Service},
    config::Config,
    domain::{FrameDates, Identifier, OperatorId, OperatorStrikes, Sourced},
    infra::{
        self,
        beacon::BeaconchainClient,
        bond_rate::LidoBondRateSource,
        chain::RpcChainClient,
        ipfs::IpfsLogArchive,
        manifest::HttpManifestSource,
        strikes::IpfsStrikeSource,
    },
};
use serde::Serialize;
use std::panic;
use tokio::{select, signal};

type OperatorService = Service<
    RpcChainClient,
    HttpManifestSource,
    IpfsLogArchive,
    BeaconchainClient,
    IpfsStrikeSource,
    LidoBondRateSource,
>;

/// Bond, rewards and health of staking module node operators.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the rewards of an operator given by numeric id or manager/reward address.
    Show {
        identifier: Identifier,

        /// Include validator details, APY and health.
        #[arg(long)]
        validators: bool,

        /// Include per-frame APY figures; implies --validators.
        #[arg(long)]
        history: bool,

        /// Include claimed rewards.
        #[arg(long)]
        withdrawals: bool,
    },

    /// List the ids of all operators with rewards.
    List,

    /// Show the strikes of an operator's validators and the dates of the recent frames.
    Strikes {
        identifier: Identifier,

        #[arg(long, default_value_t = 6)]
        frames: usize,
    },
}

#[tokio::main]
async fn main() {
    telemetry::init_logging();
    panic::set_hook(Box::new(|panic| error!(panic:%; "process panicked")));

    if let Err(error) = run().await {
        let backtrace = error.backtrace();
        let error = format!("{error:#}");
        error!(error, backtrace:%; "process exited with ERROR");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load().context("load configuration")?;
    info!(config:?; "starting");
    let Config {
        application_config,
        infra_config,
        telemetry_config:
            telemetry::Config {
                tracing_config,
                metrics_config,
            },
    } = config;

    telemetry::init_tracing(tracing_config);
    telemetry::init_metrics(metrics_config).context("initialize metrics")?;

    let infra::Config {
        chain_config,
        manifest_config,
        log_archive_config,
        beacon_config,
        bond_rate_config,
        strikes_config,
    } = infra_config;

    if chain_config.strikes_address.is_none() {
        warn!("no strikes contract configured, strikes will be unavailable");
    }
    let chain = RpcChainClient::new(chain_config).context("create chain client")?;
    let manifest =
        HttpManifestSource::new(manifest_config).context("create rewards manifest source")?;
    let archive = IpfsLogArchive::new(log_archive_config).context("create log archive")?;
    let beacon = BeaconchainClient::new(beacon_config).context("create beacon client")?;
    let bond_rate = LidoBondRateSource::new(bond_rate_config).context("create bond rate source")?;
    let strikes =
        IpfsStrikeSource::new(strikes_config, chain.clone()).context("create strike source")?;

    let service = Service::new(
        application_config,
        chain,
        manifest,
        archive,
        beacon,
        strikes,
        bond_rate,
    );

    // Dropping the command future on interrupt stops all further network work.
    let result = select! {
        result = execute(cli.command, &service)
            .in_span(Span::root("execute-command", SpanContext::random())) => result,

        _ = signal::ctrl_c() => {
            warn!("interrupted");
            Ok(())
        }
    };

    service.clear();
    telemetry::shutdown();

    result
}

async fn execute(command: Command, service: &OperatorService) -> anyhow::Result<()> {
    match command {
        Command::Show {
            identifier,
            validators,
            history,
            withdrawals,
        } => {
            let include = Include {
                validators: validators || history,
                history,
                withdrawals,
            };

            let rewards = match identifier {
                Identifier::Id(id) => service.get_by_id(id, include).await,
                Identifier::Address(address) => service.get_by_address(address, include).await,
            }
            .context("get operator rewards")?;

            match rewards {
                Some(rewards) => print_json(&rewards),
                None => bail!("operator {identifier} not found"),
            }
        }

        Command::List => match service.operator_ids_with_rewards().await {
            Sourced::Available(ids) => print_json(&ids),
            Sourced::Unavailable(source) => bail!("{source} unavailable"),
        },

        Command::Strikes { identifier, frames } => {
            let Some(id) = service
                .resolve(identifier)
                .await
                .context("resolve operator")?
            else {
                bail!("operator {identifier} not found");
            };

            let (strikes, frame_dates) =
                futures::join!(service.operator_strikes(id), service.recent_frame_dates(frames));

            let strikes = match strikes {
                Sourced::Available(strikes) => strikes,
                Sourced::Unavailable(source) => bail!("{source} unavailable"),
            };

            print_json(&StrikesReport {
                operator_id: id,
                strikes,
                frame_dates: frame_dates.or_default(),
            })
        }
    }
}

#[derive(Serialize)]
struct StrikesReport {
    operator_id: OperatorId,
    strikes: OperatorStrikes,
    frame_dates: Vec<FrameDates>,
}

fn print_json<T>(value: &T) -> anyhow::Result<()>
where
    T: Serialize,
{
    let json = serde_json::to_string_pretty(value).context("serialize output")?;
    println!("{json}");
    Ok(())
}
