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

//! A bounded key-value cache with per-entry expiry.
//!
//! Expiry is checked lazily: an expired entry is only removed when it is read or when
//! [ExpiringCache::purge_expired] runs. Capacity is enforced eagerly on insertion by evicting the
//! least recently used entry, where both reads and writes count as use.

use log::debug;
use metrics::counter;
use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    future::Future,
    hash::Hash,
    time::Duration,
};
use tokio::time::Instant;

/// Combined LRU and TTL cache. Mutation is serialized through an internal lock which is never held
/// across a suspension point, hence a cache may be shared between the readers of one process.
pub struct ExpiringCache<K, V> {
    name: &'static str,
    max_size: usize,
    default_ttl: Duration,
    inner: Mutex<Inner<K, V>>,
}

struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    /// Access order: the entry with the smallest tick is the least recently used one.
    order: BTreeMap<u64, K>,
    tick: u64,
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
    tick: u64,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    /// Create an empty cache holding at most `max_size` entries, at least one.
    pub fn new(name: &'static str, max_size: usize, default_ttl: Duration) -> Self {
        Self {
            name,
            max_size: max_size.max(1),
            default_ttl,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                tick: 0,
            }),
        }
    }

    /// Get the value for the given key unless absent or expired. A hit marks the entry as most
    /// recently used, an expired entry is removed.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();

        let Some(expires_at) = inner.entries.get(key).map(|entry| entry.expires_at) else {
            counter!("cache_misses_total", "cache" => self.name).increment(1);
            return None;
        };
        if Instant::now() >= expires_at {
            inner.remove(key);
            counter!("cache_misses_total", "cache" => self.name).increment(1);
            return None;
        }

        let tick = inner.next_tick();
        let entry = inner.entries.get_mut(key)?;
        let old_tick = entry.tick;
        entry.tick = tick;
        let value = entry.value.clone();
        inner.order.remove(&old_tick);
        inner.order.insert(tick, key.to_owned());

        counter!("cache_hits_total", "cache" => self.name).increment(1);
        Some(value)
    }

    /// Insert the given value with the given TTL or the default one, evicting least recently used
    /// entries if the cache is full.
    pub fn set(&self, key: K, value: V, ttl: Option<Duration>) {
        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        let mut inner = self.inner.lock();

        inner.remove(&key);
        while inner.entries.len() >= self.max_size {
            let Some((_, evicted)) = inner.order.pop_first() else {
                break;
            };
            inner.entries.remove(&evicted);
            counter!("cache_evictions_total", "cache" => self.name).increment(1);
            debug!(cache = self.name, key:? = evicted; "cache eviction");
        }

        let tick = inner.next_tick();
        inner.order.insert(tick, key.clone());
        inner.entries.insert(
            key,
            Entry {
                value,
                expires_at,
                tick,
            },
        );
    }

    /// Get the cached value for the given key or compute, cache and return it. Errors are not
    /// cached. The lock is released while computing.
    pub async fn get_or_try_insert_with<F, Fut, E>(
        &self,
        key: K,
        ttl: Option<Duration>,
        f: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = f().await?;
        self.set(key, value.clone(), ttl);

        Ok(value)
    }

    /// Remove all entries.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Remove all expired entries and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let expired = inner
            .entries
            .iter()
            .filter(|(_, entry)| now >= entry.expires_at)
            .map(|(key, _)| key.to_owned())
            .collect::<Vec<_>>();
        for key in &expired {
            inner.remove(key);
        }

        expired.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash,
{
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn remove(&mut self, key: &K) {
        if let Some(entry) = self.entries.remove(key) {
            self.order.remove(&entry.tick);
        }
    }
}
