//! Rolling latency windows per operation category.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Operation categories tracked by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// Key pair generation
    KeyGeneration,
    /// Direct message encryption
    Encryption,
    /// Direct message decryption
    Decryption,
    /// Chat secret derivation
    ChatSecret,
    /// Chat message encryption
    ChatEncryption,
    /// Chat message decryption
    ChatDecryption,
    /// Memo encryption
    MemoEncryption,
    /// Memo decryption
    MemoDecryption,
    /// Pairwise session key agreement
    SessionKey,
}

impl Operation {
    /// Stable name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::KeyGeneration => "key_generation",
            Operation::Encryption => "encryption",
            Operation::Decryption => "decryption",
            Operation::ChatSecret => "chat_secret",
            Operation::ChatEncryption => "chat_encryption",
            Operation::ChatDecryption => "chat_decryption",
            Operation::MemoEncryption => "memo_encryption",
            Operation::MemoDecryption => "memo_decryption",
            Operation::SessionKey => "session_key",
        }
    }
}

/// Latency summary for one operation category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyStats {
    /// Fastest sample in the window
    pub min_ms: f64,
    /// Mean of the window
    pub avg_ms: f64,
    /// Slowest sample in the window
    pub max_ms: f64,
    /// Number of samples in the window
    pub count: usize,
}

/// Latency summaries keyed by operation
pub type PerformanceStats = HashMap<Operation, LatencyStats>;

/// Rolling latency telemetry
pub struct Telemetry {
    windows: Mutex<HashMap<Operation, VecDeque<f64>>>,
    capacity: usize,
    budget_ms: f64,
}

impl Telemetry {
    /// Keep the last `capacity` samples per operation; warn when the average exceeds `budget_ms`
    pub fn new(capacity: usize, budget_ms: f64) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            budget_ms,
        }
    }

    /// Record one sample
    pub fn record(&self, op: Operation, elapsed_ms: f64) {
        let avg = {
            let mut windows = self.windows.lock();
            let window = windows.entry(op).or_insert_with(|| VecDeque::with_capacity(self.capacity));
            if window.len() == self.capacity {
                window.pop_front();
            }
            window.push_back(elapsed_ms);
            window.iter().sum::<f64>() / window.len() as f64
        };

        if avg > self.budget_ms {
            tracing::warn!(
                operation = op.as_str(),
                avg_ms = avg,
                budget_ms = self.budget_ms,
                "Average latency over budget"
            );
        }
    }

    /// Summary for one operation, if it has samples
    pub fn stats(&self, op: Operation) -> Option<LatencyStats> {
        self.windows.lock().get(&op).and_then(summarize)
    }

    /// Summaries for every operation with samples
    pub fn snapshot(&self) -> PerformanceStats {
        self.windows
            .lock()
            .iter()
            .filter_map(|(op, window)| summarize(window).map(|stats| (*op, stats)))
            .collect()
    }
}

fn summarize(window: &VecDeque<f64>) -> Option<LatencyStats> {
    if window.is_empty() {
        return None;
    }
    let min_ms = window.iter().copied().fold(f64::INFINITY, f64::min);
    let max_ms = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg_ms = window.iter().sum::<f64>() / window.len() as f64;

    Some(LatencyStats {
        min_ms,
        avg_ms,
        max_ms,
        count: window.len(),
    })
}
