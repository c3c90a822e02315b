//! Waiting for the host to notice a board being powered on or off.

use std::{thread, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use log::debug;

const TICK: Duration = Duration::from_millis(100);

/// Sleep for `period`, showing the countdown on the terminal.
pub(crate) fn settle(period: Duration, what: &str) {
    if period == Duration::from_secs(0) {
        return;
    }
    debug!("settling {:?} after {}", period, what);

    let ticks = (period.as_millis() / TICK.as_millis()) as u64;
    let pb = ProgressBar::new(ticks);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[bench] ⏳ {msg} [{bar:30.cyan/blue}] {elapsed}/{eta}")
            .progress_chars("=>-"),
    );
    pb.set_message(format!("waiting after {}", what));

    for _ in 0..ticks {
        thread::sleep(TICK);
        pb.inc(1);
    }
    let rest = period - TICK * ticks as u32;
    if rest > Duration::from_secs(0) {
        thread::sleep(rest);
    }
    pb.finish_and_clear();
}
