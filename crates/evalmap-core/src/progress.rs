//! 進捗報告
//!
//! 観測用のみで、処理の流れには影響しない。

use std::sync::Mutex;

/// ワーカーの進捗の受け取り先
pub trait ProgressReporter: Send + Sync {
    /// 担当範囲の処理開始
    fn start_range(&self, worker: usize, start: u64, end: u64);

    /// 担当範囲内の現在位置
    fn advance(&self, worker: usize, position: u64);

    /// 担当範囲の処理完了
    fn finish_range(&self, worker: usize, positions: i64);
}

/// 何もしない
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn start_range(&self, _worker: usize, _start: u64, _end: u64) {}
    fn advance(&self, _worker: usize, _position: u64) {}
    fn finish_range(&self, _worker: usize, _positions: i64) {}
}

/// 担当範囲に対する割合をログに出す
#[derive(Debug, Default)]
pub struct LogProgress {
    ranges: Mutex<Vec<(u64, u64)>>,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn fraction(&self, worker: usize, position: u64) -> Option<f64> {
        let ranges = self.ranges.lock().ok()?;
        let &(start, end) = ranges.get(worker)?;
        Some(range_fraction(start, end, position))
    }
}

/// `[start, end)` のうち `position` までの割合（0.0..=1.0）
pub fn range_fraction(start: u64, end: u64, position: u64) -> f64 {
    if end <= start {
        return 1.0;
    }
    let done = position.saturating_sub(start).min(end - start);
    done as f64 / (end - start) as f64
}

impl ProgressReporter for LogProgress {
    fn start_range(&self, worker: usize, start: u64, end: u64) {
        if let Ok(mut ranges) = self.ranges.lock() {
            if ranges.len() <= worker {
                ranges.resize(worker + 1, (0, 0));
            }
            ranges[worker] = (start, end);
        }
        log::info!("worker {worker}: {start} - {end}");
    }

    fn advance(&self, worker: usize, position: u64) {
        if let Some(f) = self.fraction(worker, position) {
            log::info!("worker {worker} @ {:.1}%", f * 100.0);
        }
    }

    fn finish_range(&self, worker: usize, positions: i64) {
        log::info!("worker {worker} done ({positions} positions)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_fraction() {
        assert_eq!(range_fraction(100, 200, 150), 0.5);
        assert_eq!(range_fraction(100, 200, 50), 0.0);
        assert_eq!(range_fraction(100, 200, 250), 1.0);
        assert_eq!(range_fraction(0, 0, 0), 1.0);
    }

    #[test]
    fn test_log_progress_tracks_ranges() {
        let progress = LogProgress::new();
        progress.start_range(2, 10, 20);
        assert_eq!(progress.fraction(2, 15), Some(0.5));
        assert_eq!(progress.fraction(0, 15), Some(1.0));
        assert_eq!(progress.fraction(5, 15), None);
    }
}
