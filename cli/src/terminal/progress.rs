use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use colored::*;
use gscn_common::network::target::ProbeTarget;
use gscn_core::DiscoveryObserver;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::info;

use crate::terminal::colors;

const TICK_RATE: Duration = Duration::from_millis(100);

static PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

/// Draw target shared by every bar, so log lines can suspend it.
pub fn multi() -> &'static MultiProgress {
    PROGRESS.get_or_init(MultiProgress::new)
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg} [{bar:30.green/white}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ])
}

/// Shows discovery progress while probes go out and replies come in.
pub struct TerminalProgress {
    quiet: u8,
    current: Mutex<Option<ProgressBar>>,
}

impl TerminalProgress {
    pub fn new(quiet: u8) -> Self {
        Self {
            quiet,
            current: Mutex::new(None),
        }
    }

    /// Removes whatever is still drawn.
    pub fn clear(&self) {
        self.replace(None);
    }

    fn slot(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, bar: Option<ProgressBar>) {
        let mut slot = self.slot();
        if let Some(old) = slot.take() {
            old.finish_and_clear();
            multi().remove(&old);
        }
        *slot = bar;
    }

    fn spinner(&self, msg: String) {
        if self.quiet > 0 {
            return;
        }
        let bar = multi().add(ProgressBar::new_spinner());
        bar.set_style(spinner_style());
        bar.set_message(msg);
        bar.enable_steady_tick(TICK_RATE);
        self.replace(Some(bar));
    }
}

impl DiscoveryObserver for TerminalProgress {
    fn on_sending_started(&self, target: &ProbeTarget, total: u128) {
        info!(
            "Probing {} via {} on {}",
            target.prefix.masked().to_string().color(colors::ACCENT),
            target.family.protocol_name(),
            target.interface.name
        );
        if self.quiet > 0 {
            return;
        }
        let bar = multi().add(ProgressBar::new(u64::try_from(total).unwrap_or(u64::MAX)));
        bar.set_style(bar_style());
        bar.set_message("Sending probes");
        bar.enable_steady_tick(TICK_RATE);
        self.replace(Some(bar));
    }

    fn on_address_done(&self, _addr: IpAddr) {
        if let Some(bar) = self.slot().as_ref() {
            bar.inc(1);
        }
    }

    fn on_sending_finished(&self, sent: u64) {
        self.clear();
        info!("Sent {} probes", sent.to_string().color(colors::ACCENT));
    }

    fn on_wait_started(&self, timeout: Duration) {
        self.spinner(format!(
            "Waiting for response timeout ({}s)",
            timeout.as_secs()
        ));
    }

    fn on_wait_finished(&self) {
        self.clear();
        info!("Timeout reached.");
    }

    fn on_resolving(&self, count: usize) {
        self.spinner(format!("Resolving host names of {count} hosts"));
    }
}
