//! Progress bars for download runs, one per frequency group.

use std::sync::{Mutex, PoisonError};

use floodtiles_core::download::{BatchObserver, FetchOutcome};
use floodtiles_core::target::Job;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str = "Downloading {prefix} [{pos}/{len}] {wide_bar} {elapsed_precise}";

/// Renders `Downloading <frequency> [done/total]` while a group runs.
pub(crate) struct ProgressObserver {
    current: Mutex<Option<ProgressBar>>,
    draw_target: fn() -> ProgressDrawTarget,
}

impl ProgressObserver {
    /// Draws to stderr.
    pub(crate) fn stderr() -> Self {
        Self {
            current: Mutex::new(None),
            draw_target: ProgressDrawTarget::stderr,
        }
    }

    #[cfg(test)]
    fn hidden() -> Self {
        Self {
            current: Mutex::new(None),
            draw_target: ProgressDrawTarget::hidden,
        }
    }

    #[cfg(test)]
    fn position(&self) -> Option<(u64, Option<u64>)> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|bar| (bar.position(), bar.length()))
    }
}

impl BatchObserver for ProgressObserver {
    fn group_started(&self, frequency: &str, total: usize) {
        let bar = ProgressBar::with_draw_target(Some(total as u64), (self.draw_target)());
        bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_prefix(frequency.to_string());
        let previous = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(bar);
        if let Some(previous) = previous {
            previous.finish();
        }
    }

    fn job_finished(&self, _job: &Job, _outcome: &FetchOutcome) {
        if let Some(bar) = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            bar.inc(1);
        }
    }

    fn group_finished(&self, _frequency: &str) {
        if let Some(bar) = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            bar.finish();
        }
    }
}
