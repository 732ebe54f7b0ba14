use crate::ui::icons::{CHECK, CLOCK, DOWNLOAD};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Receiver for signing progress.
///
/// Implementations must be cheap and non-blocking: downloads call
/// [`ProgressSink::on_bytes`] once per received chunk.
pub trait ProgressSink: Send + Sync {
    /// Human-readable status change, e.g. "Waiting for approval".
    fn on_status(&self, _message: &str) {}

    /// Aggregate download progress. `expected` is `None` when any in-flight
    /// download did not advertise its length.
    fn on_bytes(&self, received: u64, expected: Option<u64>);

    /// All downloads finished.
    fn on_complete(&self);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_bytes(&self, _received: u64, _expected: Option<u64>) {}
    fn on_complete(&self) {}
}

/// Terminal progress rendered with an `indicatif` bar.
///
/// Starts as a spinner while waiting on the service, switches to a byte bar
/// once downloads report a total, and falls back to a byte-counting spinner
/// when the total is unknown.
pub struct TerminalProgress {
    bar: ProgressBar,
    bar_style: ProgressStyle,
    spinner_style: ProgressStyle,
    mode: Mutex<Mode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Spinner,
    Bytes,
    Done,
}

impl TerminalProgress {
    pub fn new() -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner} {msg} {bytes:.dim}")
            .expect("progress bar template is a valid static string");
        let bar_style = ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style.clone());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self {
            bar,
            bar_style,
            spinner_style,
            mode: Mutex::new(Mode::Spinner),
        }
    }

    fn switch(&self, next: Mode) {
        let Ok(mut mode) = self.mode.lock() else {
            return;
        };
        if *mode == next || *mode == Mode::Done {
            return;
        }
        match next {
            Mode::Bytes => self.bar.set_style(self.bar_style.clone()),
            Mode::Spinner => self.bar.set_style(self.spinner_style.clone()),
            Mode::Done => {}
        }
        *mode = next;
    }

    /// Remove the spinner if the run ended before downloads completed.
    pub fn clear(&self) {
        if let Ok(mut mode) = self.mode.lock()
            && *mode != Mode::Done
        {
            *mode = Mode::Done;
            self.bar.finish_and_clear();
        }
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TerminalProgress {
    fn on_status(&self, message: &str) {
        self.bar
            .set_message(format!("{} {}", CLOCK, style(message).dim()));
    }

    fn on_bytes(&self, received: u64, expected: Option<u64>) {
        match expected {
            Some(total) => {
                self.switch(Mode::Bytes);
                self.bar.set_length(total);
            }
            None => self.switch(Mode::Spinner),
        }
        self.bar
            .set_message(format!("{} {}", DOWNLOAD, style("Downloading").cyan()));
        self.bar.set_position(received);
    }

    fn on_complete(&self) {
        self.switch(Mode::Done);
        self.bar
            .finish_with_message(format!("{} {}", CHECK, style("Downloaded").green()));
    }
}
