use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

const ALL_NORMAL: &str = "All Normal";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
    disable_pretty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool, disable_pretty: bool) -> Self {
        Self {
            mode,
            is_tty,
            disable_pretty,
        }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool, disable_pretty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty, disable_pretty)
    }

    fn use_pretty(&self) -> bool {
        self.is_tty
            && match self.mode {
                UiMode::Pretty => true,
                UiMode::Auto => !self.disable_pretty,
                UiMode::Plain => false,
            }
    }

    fn spinner(&self) -> Option<ProgressBar> {
        if !self.use_pretty() {
            return None;
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_draw_target(ProgressDrawTarget::stderr());
        spinner.enable_steady_tick(Duration::from_millis(120));
        let style = ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        Some(spinner)
    }

    /// Timed startup stage; reports completion when dropped.
    pub fn stage(&self, name: &str) -> StageGuard {
        match self.spinner() {
            Some(spinner) => {
                spinner.set_message(format!("{name}…"));
                StageGuard::new(name.to_string(), Some(spinner))
            }
            None => {
                eprintln!("==> {}", name);
                StageGuard::new(name.to_string(), None)
            }
        }
    }

    /// Live alert status line for the monitoring loop.
    pub fn status_line(&self) -> StatusLine {
        StatusLine::new(self.spinner())
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = format!("✔ {} ({})", self.name, format_duration(elapsed));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

/// Current alert state as one line of text.
///
/// Pretty mode keeps a spinner whose message tracks the state; plain mode
/// prints a line only when the text changes.
pub struct StatusLine {
    spinner: Option<ProgressBar>,
    current: Option<String>,
}

impl StatusLine {
    fn new(spinner: Option<ProgressBar>) -> Self {
        Self {
            spinner,
            current: None,
        }
    }

    /// Show the alerts for this frame, or "All Normal" when there are none.
    pub fn update(&mut self, alerts: &[&str]) {
        let text = if alerts.is_empty() {
            ALL_NORMAL.to_string()
        } else {
            alerts.join(" | ")
        };
        self.set(text);
    }

    /// Replace the status with an arbitrary message.
    pub fn message(&mut self, text: &str) {
        self.set(text.to_string());
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    fn set(&mut self, text: String) {
        if self.current.as_deref() == Some(text.as_str()) {
            return;
        }
        match &self.spinner {
            Some(spinner) => spinner.set_message(text.clone()),
            None => eprintln!("==> {}", text),
        }
        self.current = Some(text);
    }
}

impl Drop for StatusLine {
    fn drop(&mut self) {
        if let Some(spinner) = &self.spinner {
            spinner.finish();
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
