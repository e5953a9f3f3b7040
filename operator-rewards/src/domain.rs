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

mod aggregate;
mod apy;
mod bond;
mod distribution;
mod health;
mod operator;
mod rewards;
mod source;
mod sourced;
mod strikes;
mod validator;

pub use aggregate::*;
pub use apy::*;
pub use bond::*;
pub use distribution::*;
pub use health::*;
pub use operator::*;
pub use rewards::*;
pub use source::*;
pub use sourced::*;
pub use strikes::*;
pub use validator::*;
