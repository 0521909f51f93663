use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::source::Analyser;
use crate::task::RepeatingTask;

/// Speaking-level meter sampled at animation-frame cadence
pub struct LevelMeter {
    level: Arc<AtomicU8>,
    task: RepeatingTask,
}

impl LevelMeter {
    pub fn start(analyser: Arc<dyn Analyser>, interval: Duration) -> Self {
        let level = Arc::new(AtomicU8::new(0));
        let published = Arc::clone(&level);
        let mut bins = vec![0u8; analyser.bin_count()];

        let task = RepeatingTask::spawn("level-meter", interval, move || {
            analyser.frequency_data(&mut bins);
            published.store(normalize_level(&bins), Ordering::Relaxed);
            ControlFlow::Continue(())
        });

        Self { level, task }
    }

    pub fn level(&self) -> u8 {
        self.level.load(Ordering::Relaxed)
    }

    pub fn is_active(&self) -> bool {
        self.task.is_active()
    }

    pub async fn stop(mut self) {
        self.task.cancel().await;
    }

    pub fn stop_now(mut self) {
        self.task.cancel_now();
    }
}

/// Map byte frequency magnitudes to a 0-100 level
///
/// A mean magnitude of 128 (half scale) already reads as full speaking volume.
pub fn normalize_level(bins: &[u8]) -> u8 {
    if bins.is_empty() {
        return 0;
    }

    let sum: u32 = bins.iter().map(|&b| b as u32).sum();
    let mean = sum as f64 / bins.len() as f64;

    (mean / 128.0 * 100.0).round().min(100.0) as u8
}
