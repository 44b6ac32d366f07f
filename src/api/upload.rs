// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tracking of uploads held in memory
//!
//! Every upload read from a request holds an [`UploadLease`]. The lease is
//! released when it is dropped, so the count of held uploads returns to zero
//! on every exit path of the handler.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicU64,
    held: AtomicUsize,
}

/// Shared counters of opened and currently held uploads
#[derive(Debug, Clone, Default)]
pub struct UploadTracker {
    counters: Arc<Counters>,
}

impl UploadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly opened upload
    pub fn open(&self) -> UploadLease {
        let opened = self.counters.opened.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.held.fetch_add(1, Ordering::SeqCst);
        UploadLease {
            tracker: self.clone(),
            id: opened,
        }
    }

    /// Uploads read and not yet released
    pub fn held(&self) -> usize {
        self.counters.held.load(Ordering::SeqCst)
    }

    /// Uploads opened since startup
    pub fn opened_total(&self) -> u64 {
        self.counters.opened.load(Ordering::SeqCst)
    }
}

/// Guard for one upload; releases on drop
#[derive(Debug)]
pub struct UploadLease {
    tracker: UploadTracker,
    id: u64,
}

impl UploadLease {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for UploadLease {
    fn drop(&mut self) {
        self.tracker.counters.held.fetch_sub(1, Ordering::SeqCst);
        debug!("Upload {} released", self.id);
    }
}
