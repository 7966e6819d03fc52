// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Terminal progress bar.
//!
//! A background task redraws one line in place on a fixed interval:
//!
//! ```text
//! [=========================+++++++++                              ] 42%  118.3 per second
//!  └ present at destination └ copied    └ remaining
//! ```
//!
//! The reporter only ever reads a [`StatsSnapshot`]; it never touches the
//! engine's state. Snapshots are racy, so every width and percentage is
//! clamped.

use crate::config::ProgressConfig;
use crate::shutdown::{self, ShutdownHandle};
use crate::stats::StatsSnapshot;
use std::io::Write;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Line shown before the first source object has been listed.
pub const LISTING_PLACEHOLDER: &str = "[…] listing…";

/// Render one progress line (without carriage return or newline).
///
/// `rate` is in objects per second. `width` is the bar width in cells.
pub fn render_line(snapshot: &StatsSnapshot, rate: f64, width: usize) -> String {
    let found = snapshot.found;
    if found == 0 {
        return LISTING_PLACEHOLDER.to_string();
    }

    let present = snapshot.present().min(found);
    let copied = snapshot.copied.min(found - present);
    let scale = |n: u64| ((n as u128 * width as u128) / found as u128) as usize;

    let present_cells = scale(present).min(width);
    let copied_cells = scale(copied).min(width - present_cells);
    let remaining_cells = width - present_cells - copied_cells;
    let pct = ((present + copied) as u128 * 100 / found as u128).min(100);
    let rate = if rate.is_finite() && rate > 0.0 { rate } else { 0.0 };

    let mut line = String::with_capacity(width + 32);
    line.push('[');
    line.extend(std::iter::repeat('=').take(present_cells));
    line.extend(std::iter::repeat('+').take(copied_cells));
    line.extend(std::iter::repeat(' ').take(remaining_cells));
    line.push(']');
    line.push_str(&format!(" {pct}%  {rate:.1} per second"));
    line
}

/// Throughput tracker: objects copied between two ticks over wall time.
#[derive(Debug)]
struct Rate {
    last_copied: u64,
    last_tick: Instant,
}

impl Rate {
    fn new() -> Self {
        Self {
            last_copied: 0,
            last_tick: Instant::now(),
        }
    }

    fn tick(&mut self, copied: u64) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick).as_secs_f64();
        let delta = copied.saturating_sub(self.last_copied);
        self.last_copied = copied;
        self.last_tick = now;
        if elapsed > 0.0 {
            delta as f64 / elapsed
        } else {
            0.0
        }
    }
}

/// Running progress display. Dropping it without [`stop()`](Self::stop)
/// aborts the task and leaves the line unterminated.
pub struct ProgressReporter {
    stop: ShutdownHandle,
    task: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    /// Start drawing to stdout.
    pub fn start<F>(snapshot: F, config: &ProgressConfig) -> Self
    where
        F: Fn() -> StatsSnapshot + Send + 'static,
    {
        Self::start_with_writer(snapshot, config, std::io::stdout())
    }

    /// Start drawing to an arbitrary sink.
    pub fn start_with_writer<F, W>(snapshot: F, config: &ProgressConfig, mut out: W) -> Self
    where
        F: Fn() -> StatsSnapshot + Send + 'static,
        W: Write + Send + 'static,
    {
        let (stop, mut stopped) = shutdown::channel();
        let period = config.interval_duration().max(Duration::from_millis(1));
        let width = config.width;

        let task = tokio::spawn(async move {
            let mut rate = Rate::new();
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stopped.requested() => break,
                    _ = ticker.tick() => {
                        let snap = snapshot();
                        let line = render_line(&snap, rate.tick(snap.copied), width);
                        if let Err(e) = write!(out, "\r{line}").and_then(|_| out.flush()) {
                            debug!(error = %e, "Progress output failed, stopping reporter");
                            return;
                        }
                    }
                }
            }

            let snap = snapshot();
            let line = render_line(&snap, rate.tick(snap.copied), width);
            if let Err(e) = writeln!(out, "\r{line}").and_then(|_| out.flush()) {
                debug!(error = %e, "Progress output failed");
            }
        });

        Self {
            stop,
            task: Some(task),
        }
    }

    /// Draw the final line, terminate it, and wait for the task.
    pub async fn stop(mut self) {
        self.stop.trigger();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                debug!(error = %e, "Progress task ended abnormally");
            }
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
