//! In-process metric primitives

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Samples a histogram keeps unless told otherwise
pub const DEFAULT_WINDOW: usize = 1024;

/// Point-in-time value of a named metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    pub name: String,
    pub value: f64,
}

/// Monotonic count. Clones share the same value.
#[derive(Debug, Clone)]
pub struct Counter {
    name: Arc<str>,
    value: Arc<AtomicU64>,
}

impl Counter {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            value: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            name: self.name.to_string(),
            value: self.get() as f64,
        }
    }
}

/// Up/down count of things currently in progress
#[derive(Debug, Clone)]
pub struct Gauge {
    name: Arc<str>,
    value: Arc<AtomicI64>,
}

impl Gauge {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            value: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            name: self.name.to_string(),
            value: self.get() as f64,
        }
    }
}

/// Sliding window of the most recent samples
#[derive(Debug, Clone)]
pub struct Histogram {
    name: Arc<str>,
    capacity: usize,
    window: Arc<Mutex<VecDeque<f64>>>,
}

impl Histogram {
    pub fn new(name: &str) -> Self {
        Self::with_capacity(name, DEFAULT_WINDOW)
    }

    pub fn with_capacity(name: &str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name: Arc::from(name),
            capacity,
            window: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
        }
    }

    pub fn record(&self, sample: f64) {
        if !sample.is_finite() {
            return;
        }
        let mut window = self.window.lock();
        if window.len() == self.capacity {
            window.pop_front();
        }
        window.push_back(sample);
    }

    pub fn count(&self) -> usize {
        self.window.lock().len()
    }

    pub fn mean(&self) -> f64 {
        let window = self.window.lock();
        if window.is_empty() {
            0.0
        } else {
            window.iter().sum::<f64>() / window.len() as f64
        }
    }

    /// Nearest-rank percentile over the window; 0 when empty.
    pub fn percentile(&self, p: f64) -> f64 {
        let mut sorted: Vec<f64> = self.window.lock().iter().copied().collect();
        if sorted.is_empty() {
            return 0.0;
        }
        sorted.sort_by(f64::total_cmp);
        let rank = ((p.clamp(0.0, 100.0) / 100.0) * sorted.len() as f64).ceil() as usize;
        sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
    }

    /// Window mean under the histogram's name
    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            name: self.name.to_string(),
            value: self.mean(),
        }
    }
}
