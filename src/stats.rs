//! Service-level routing counters
//!
//! Shared across every session of one service instance. All counters are
//! relaxed atomics: values are approximate and for diagnostics only.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-service routing statistics
#[derive(Debug, Default)]
pub struct ServiceStats {
    n_queries: AtomicU64,
    n_master: AtomicU64,
    n_slave: AtomicU64,
    n_all: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub n_queries: u64,
    pub n_master: u64,
    pub n_slave: u64,
    pub n_all: u64,
}

impl ServiceStats {
    #[inline]
    pub fn add_query(&self) {
        self.n_queries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_master(&self) {
        self.n_master.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_slave(&self) {
        self.n_slave.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_all(&self) {
        self.n_all.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            n_queries: self.n_queries.load(Ordering::Relaxed),
            n_master: self.n_master.load(Ordering::Relaxed),
            n_slave: self.n_slave.load(Ordering::Relaxed),
            n_all: self.n_all.load(Ordering::Relaxed),
        }
    }
}
