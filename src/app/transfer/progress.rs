//! Byte progress of one multipart transfer
//!
//! Part uploads push their part number onto a bounded queue; a reporter task
//! drains it and drives the bar. Closing every sender ends the reporter.

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::constants::progress::BAR_TEMPLATE;
use crate::errors::{TransferError, TransferResult};

/// Position estimate from completed part numbers
///
/// The lowest part number seen, minus one, is the baseline: parts below it
/// are assumed stored by an earlier run. The position counts completions on
/// top of the baseline, so it is an approximation when parts finish out of
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartProgress {
    part_size: u64,
    total: u64,
    baseline: Option<u64>,
    completed: u64,
}

impl PartProgress {
    pub fn new(total: u64, part_size: u64) -> Self {
        Self {
            part_size,
            total,
            baseline: None,
            completed: 0,
        }
    }

    /// Record a completed part and return the new byte position
    pub fn record(&mut self, part_number: i32) -> u64 {
        let below = u64::try_from(part_number.max(1) - 1).unwrap_or_default();
        self.baseline = Some(self.baseline.map_or(below, |baseline| baseline.min(below)));
        self.completed += 1;
        self.position()
    }

    pub fn baseline(&self) -> Option<u64> {
        self.baseline
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn position(&self) -> u64 {
        let parts = self.baseline.unwrap_or_default() + self.completed;
        parts.saturating_mul(self.part_size).min(self.total)
    }
}

/// Background task rendering a [`PartProgress`]
#[derive(Debug)]
pub struct ProgressReporter {
    handle: JoinHandle<PartProgress>,
}

impl ProgressReporter {
    /// Spawn the reporter and return the sending side of its queue
    ///
    /// # Errors
    ///
    /// Returns `TransferError::Progress` if the bar style is invalid.
    pub fn spawn(
        total: u64,
        part_size: u64,
        capacity: usize,
        visible: bool,
    ) -> TransferResult<(Self, mpsc::Sender<i32>)> {
        let bar = if visible {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(BAR_TEMPLATE)
                    .map_err(|e| TransferError::Progress(format!("template error: {}", e)))?
                    .progress_chars("##-"),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        let (sender, mut receiver) = mpsc::channel::<i32>(capacity.max(1));
        let handle = tokio::spawn(async move {
            let mut progress = PartProgress::new(total, part_size);
            while let Some(part_number) = receiver.recv().await {
                if progress.baseline().is_none() {
                    debug!("first completed part: {}", part_number);
                }
                bar.set_position(progress.record(part_number));
            }
            bar.finish();
            progress
        });
        Ok((Self { handle }, sender))
    }

    /// Wait for the queue to close and return the final tally
    pub async fn finish(self) -> TransferResult<PartProgress> {
        Ok(self.handle.await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_upload_counts_from_zero() {
        let mut progress = PartProgress::new(25, 10);
        assert_eq!(progress.record(1), 10);
        assert_eq!(progress.record(2), 20);
        assert_eq!(progress.record(3), 25);
    }

    #[test]
    fn test_resumed_upload_starts_at_baseline() {
        let mut progress = PartProgress::new(100, 10);
        assert_eq!(progress.record(6), 60);
        assert_eq!(progress.baseline(), Some(5));
        assert_eq!(progress.record(8), 70);
    }

    #[test]
    fn test_lower_part_lowers_baseline() {
        let mut progress = PartProgress::new(100, 10);
        progress.record(4);
        progress.record(3);
        assert_eq!(progress.baseline(), Some(2));
        assert_eq!(progress.position(), 40);
    }

    #[tokio::test]
    async fn test_reporter_drains_until_closed() {
        let (reporter, sender) = ProgressReporter::spawn(30, 10, 2, false).unwrap();
        for part in [1, 3, 2] {
            sender.send(part).await.unwrap();
        }
        drop(sender);

        let progress = reporter.finish().await.unwrap();
        assert_eq!(progress.completed(), 3);
        assert_eq!(progress.position(), 30);
    }
}
