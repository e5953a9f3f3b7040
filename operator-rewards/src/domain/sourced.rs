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

use derive_more::Display;
use log::warn;
use metrics::counter;
use operator_common::error::StdErrorExt;
use serde::Serialize;
use std::error::Error as StdError;

/// External sources whose failure degrades an aggregate instead of failing it.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    #[display("rewards manifest")]
    RewardsManifest,

    #[display("distribution history")]
    DistributionHistory,

    #[display("beacon chain")]
    Beacon,

    #[display("strikes")]
    Strikes,

    #[display("bond rate")]
    BondRate,

    #[display("withdrawals")]
    Withdrawals,
}

/// Outcome of reading an optional source: either its value or the explicit marker that the source
/// was unavailable, which must not be confused with an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sourced<T> {
    Available(T),
    Unavailable(DataSource),
}

impl<T> Sourced<T> {
    /// Convert the given result, logging a warning if the source failed.
    pub fn from_result<E>(result: Result<T, E>, source: DataSource) -> Self
    where
        E: StdError,
    {
        match result {
            Ok(value) => Self::Available(value),

            Err(error) => {
                warn!(source:%, error:% = error.as_chain(); "source unavailable");
                counter!("source_unavailable_total", "source" => source.to_string()).increment(1);
                Self::Unavailable(source)
            }
        }
    }

    pub fn available(self) -> Option<T> {
        match self {
            Self::Available(value) => Some(value),
            Self::Unavailable(_) => None,
        }
    }

    pub fn unavailable(&self) -> Option<DataSource> {
        match self {
            Self::Available(_) => None,
            Self::Unavailable(source) => Some(*source),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sourced<U> {
        match self {
            Self::Available(value) => Sourced::Available(f(value)),
            Self::Unavailable(source) => Sourced::Unavailable(source),
        }
    }

    /// The value, or the default for an unavailable source.
    pub fn or_default(self) -> T
    where
        T: Default,
    {
        self.available().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{DataSource, Sourced};
    use std::io;

    #[test]
    fn test_sourced() {
        let sourced = Sourced::from_result(Ok::<_, io::Error>(vec![1]), DataSource::Strikes);
        assert_eq!(sourced.unavailable(), None);
        assert_eq!(sourced.or_default(), vec![1]);

        let sourced = Sourced::<Vec<u32>>::from_result(
            Err(io::Error::other("down")),
            DataSource::Strikes,
        );
        assert_eq!(sourced.unavailable(), Some(DataSource::Strikes));
        assert_eq!(sourced.clone().map(|v| v.len()), Sourced::Unavailable(DataSource::Strikes));
        assert_eq!(sourced.or_default(), Vec::<u32>::new());
    }
}
