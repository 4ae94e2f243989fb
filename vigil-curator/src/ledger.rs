//! Decision history and review counters under one lock
//!
//! The store reads the ledger while deriving statuses; the action processor
//! holds it for the whole of a decision, which serializes concurrent
//! decisions against each other and against scans.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::history::{Decision, ProcessLocalHistory};

/// Process-lifetime review counters
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct Stats {
    pub confirmed_count: u64,
    pub dismissed_count: u64,
}

impl Stats {
    pub fn count(&mut self, decision: Decision) {
        match decision {
            Decision::Confirmed => self.confirmed_count += 1,
            Decision::Dismissed => self.dismissed_count += 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct Ledger {
    pub history: ProcessLocalHistory,
    pub stats: Stats,
}

impl Ledger {
    pub fn new(history: ProcessLocalHistory) -> Self {
        Self {
            history,
            stats: Stats::default(),
        }
    }
}

/// Ledger shared between store, action processor and handlers
pub type SharedLedger = Arc<Mutex<Ledger>>;

pub fn shared(ledger: Ledger) -> SharedLedger {
    Arc::new(Mutex::new(ledger))
}
