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

use std::{error::Error as StdError, fmt};

/// Boxed error, e.g. for the source of an error variant wrapping arbitrary errors.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Extension methods for errors.
pub trait StdErrorExt
where
    Self: StdError,
{
    /// Display this error together with its chain of sources, separated by colons.
    fn as_chain(&self) -> ErrorChain<'_, Self> {
        ErrorChain(self)
    }
}

impl<T> StdErrorExt for T where T: StdError {}

pub struct ErrorChain<'a, E: ?Sized>(&'a E);

impl<E> fmt::Display for ErrorChain<'_, E>
where
    E: StdError + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;

        let mut source = self.0.source();
        while let Some(error) = source {
            write!(f, ": {error}")?;
            source = error.source();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::StdErrorExt;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] Inner);

    #[derive(Debug, Error)]
    #[error("inner")]
    struct Inner;

    #[test]
    fn test_as_chain() {
        assert_eq!(Outer(Inner).as_chain().to_string(), "outer: inner");
        assert_eq!(Inner.as_chain().to_string(), "inner");
    }
}
