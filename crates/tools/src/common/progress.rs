//! ワーカーごとのプログレスバー

use std::sync::Mutex;

use evalmap_core::ProgressReporter;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle, style::TemplateError};

/// `MultiProgress` にワーカー 1 つにつき 1 本のバーを並べる
pub struct BarProgress {
    multi: MultiProgress,
    style: ProgressStyle,
    bars: Mutex<Vec<Option<(u64, ProgressBar)>>>,
}

impl BarProgress {
    pub fn new() -> Result<Self, TemplateError> {
        let style = ProgressStyle::with_template(
            "[{elapsed_precise}] {prefix:>10} {bar:40.cyan/blue} {bytes}/{total_bytes} {msg}",
        )?
        .progress_chars("=>-");
        Ok(Self {
            multi: MultiProgress::new(),
            style,
            bars: Mutex::new(Vec::new()),
        })
    }

    fn with_bar(&self, worker: usize, f: impl FnOnce(u64, &ProgressBar)) {
        if let Ok(bars) = self.bars.lock()
            && let Some(Some((start, bar))) = bars.get(worker)
        {
            f(*start, bar);
        }
    }
}

impl ProgressReporter for BarProgress {
    fn start_range(&self, worker: usize, start: u64, end: u64) {
        let bar = self.multi.add(ProgressBar::new(end.saturating_sub(start)));
        bar.set_style(self.style.clone());
        bar.set_prefix(format!("worker {worker}"));
        if let Ok(mut bars) = self.bars.lock() {
            if bars.len() <= worker {
                bars.resize(worker + 1, None);
            }
            bars[worker] = Some((start, bar));
        }
    }

    fn advance(&self, worker: usize, position: u64) {
        self.with_bar(worker, |start, bar| {
            bar.set_position(position.saturating_sub(start))
        });
    }

    fn finish_range(&self, worker: usize, positions: i64) {
        self.with_bar(worker, |_, bar| {
            bar.finish_with_message(format!("{positions} positions"))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;

    #[test]
    fn test_bars_follow_worker_ranges() {
        let progress = BarProgress::new().unwrap();
        progress.multi.set_draw_target(ProgressDrawTarget::hidden());
        progress.start_range(1, 100, 300);
        progress.advance(1, 150);
        progress.advance(0, 10);

        let bars = progress.bars.lock().unwrap();
        assert!(bars[0].is_none());
        let (start, bar) = bars[1].as_ref().unwrap();
        assert_eq!(*start, 100);
        assert_eq!(bar.position(), 50);
        assert_eq!(bar.length(), Some(200));
        drop(bars);

        progress.finish_range(1, 7);
        let bars = progress.bars.lock().unwrap();
        assert!(bars[1].as_ref().unwrap().1.is_finished());
    }
}
