//! Progress reporting for a single download invocation.

use crate::error::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

const BYTES_TEMPLATE: &str =
    "{spinner:.green} {msg} {bar:40.cyan/blue} {bytes}/{total_bytes} {bytes_per_sec} {eta}";
const LABEL_TEMPLATE: &str = "{spinner:.green} {msg}";

pub const INITIALIZING_LABEL: &str = "Initializing...";
pub const DOWNLOADING_LABEL: &str = "Downloading...";
pub const PROCESSING_LABEL: &str = "Processing completion...";

/// A progress report emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Bytes are being transferred. `total` is absent for streams of unknown length.
    Downloading {
        /// Total size in bytes, exact or estimated.
        total: Option<u64>,
        /// Bytes transferred so far.
        downloaded: u64,
    },
    /// Retrieval of the current file is done, post-processing may follow.
    Finished,
    /// Any other status reported by the engine.
    Unknown(String),
}

/// The observable quantities of a progress indicator.
pub trait ProgressDisplay {
    /// Sets the expected total, in bytes.
    fn set_total(&mut self, total: u64);
    /// Sets the number of bytes transferred.
    fn set_completed(&mut self, completed: u64);
    /// Removes the numeric progress from the display.
    fn clear_progress(&mut self);
    /// Replaces the textual label.
    fn set_label(&mut self, label: &str);
}

/// The state of a [`ProgressRelay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Initializing,
    Downloading,
    Finished,
}

/// Forwards engine progress events to a display.
#[derive(Debug)]
pub struct ProgressRelay<D> {
    display: D,
    state: RelayState,
}

impl<D: ProgressDisplay> ProgressRelay<D> {
    pub fn new(display: D) -> Self {
        Self {
            display,
            state: RelayState::Initializing,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Applies one event. Unknown statuses leave everything untouched.
    pub fn handle(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Downloading { total, downloaded } => {
                if self.state == RelayState::Finished {
                    self.display.set_label(DOWNLOADING_LABEL);
                }
                self.state = RelayState::Downloading;

                if let Some(total) = total.filter(|t| *t > 0) {
                    self.display.set_total(total);
                }
                self.display.set_completed(downloaded);
            }
            ProgressEvent::Finished => {
                self.state = RelayState::Finished;
                self.display.clear_progress();
                self.display.set_label(PROCESSING_LABEL);
            }
            ProgressEvent::Unknown(status) => {
                log::trace!("Ignoring progress status: {}", status);
            }
        }
    }
}

/// A handle on the bar shared with the engine callback.
#[derive(Clone)]
pub struct BarHandle {
    bar: ProgressBar,
    bytes_style: ProgressStyle,
    label_style: ProgressStyle,
    cleared: bool,
}

impl BarHandle {
    fn restore_numbers(&mut self) {
        if self.cleared {
            self.bar.set_style(self.bytes_style.clone());
            self.cleared = false;
        }
    }
}

impl ProgressDisplay for BarHandle {
    fn set_total(&mut self, total: u64) {
        self.restore_numbers();
        self.bar.set_length(total);
    }

    fn set_completed(&mut self, completed: u64) {
        self.restore_numbers();
        self.bar.set_position(completed);
    }

    fn clear_progress(&mut self) {
        self.bar.set_style(self.label_style.clone());
        self.cleared = true;
    }

    fn set_label(&mut self, label: &str) {
        self.bar.set_message(label.to_string());
    }
}

/// The terminal progress bar of one invocation.
///
/// The bar is closed by [`TaskBar::finish`] or, failing that, when dropped, so
/// the terminal is restored on every exit path.
pub struct TaskBar {
    handle: BarHandle,
    finished: bool,
}

impl TaskBar {
    /// Creates a bar drawn through the given multi-progress target.
    pub fn new(multi: &MultiProgress) -> Result<Self> {
        Self::with_bar(multi.add(ProgressBar::no_length()))
    }

    /// Creates a bar that never draws.
    pub fn hidden() -> Result<Self> {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Result<Self> {
        let bytes_style = ProgressStyle::with_template(BYTES_TEMPLATE)?.progress_chars("#>-");
        let label_style = ProgressStyle::with_template(LABEL_TEMPLATE)?;

        bar.set_style(bytes_style.clone());
        bar.set_message(INITIALIZING_LABEL);

        Ok(Self {
            handle: BarHandle {
                bar,
                bytes_style,
                label_style,
                cleared: false,
            },
            finished: false,
        })
    }

    /// Marks the task as started.
    pub fn start(&self) {
        self.handle.bar.set_message(DOWNLOADING_LABEL);
        self.handle.bar.enable_steady_tick(Duration::from_millis(100));
    }

    /// Returns a relay bound to this bar.
    pub fn relay(&self) -> ProgressRelay<BarHandle> {
        ProgressRelay::new(self.handle.clone())
    }

    /// Closes the bar and removes it from the terminal.
    pub fn finish(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if !self.finished {
            self.handle.bar.finish_and_clear();
            self.finished = true;
        }
    }
}

impl Drop for TaskBar {
    fn drop(&mut self) {
        self.close();
    }
}
