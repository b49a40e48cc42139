use std::{
    fmt::{self, Debug, Display, Write},
    panic::{self, AssertUnwindSafe},
};

use chrono::{DateTime, Local, TimeDelta};
use log::warn;

pub const DATE_FORMAT: &str = "%m-%d %H:%M:%S";

/// Sent in place of a return value that cannot be rendered.
pub const RENDER_PLACEHOLDER: &str = "ERROR str(value)";

const MICROS_PER_SECOND: i64 = 1_000_000;
const SECONDS_PER_DAY: i64 = 86_400;

/// Timing and outcome of one invocation of a wrapped job.
#[derive(Debug, Clone)]
pub struct NotificationContext {
    host: String,
    func_name: String,
    started_at: DateTime<Local>,
    finished_at: Option<DateTime<Local>>,
    outcome: Option<String>,
}

impl NotificationContext {
    pub fn new(host: String, func_name: &str, started_at: DateTime<Local>) -> Self {
        Self {
            host,
            func_name: func_name.to_string(),
            started_at,
            finished_at: None,
            outcome: None,
        }
    }

    pub fn elapsed(&self) -> Option<TimeDelta> {
        self.finished_at.map(|end| end - self.started_at)
    }

    pub fn complete(&mut self, outcome: String) {
        self.complete_at(Local::now(), outcome);
    }

    pub fn complete_at(&mut self, finished_at: DateTime<Local>, outcome: String) {
        self.finished_at = Some(finished_at);
        self.outcome = Some(outcome);
    }

    /// Body lines for the STARTED message: host, job name, start time.
    pub fn started_lines(&self) -> Vec<String> {
        vec![
            self.host.clone(),
            self.func_name.clone(),
            self.started_at.format(DATE_FORMAT).to_string(),
        ]
    }

    /// Body lines for DONE and CRASHED messages. Falls back to the STARTED
    /// lines while the invocation is still running.
    pub fn finished_lines(&self) -> Vec<String> {
        let (Some(finished_at), Some(elapsed)) = (self.finished_at, self.elapsed()) else {
            return self.started_lines();
        };
        let mut lines = self.started_lines();
        lines.push(finished_at.format(DATE_FORMAT).to_string());
        lines.push(format_elapsed(elapsed));
        lines.push(self.outcome.clone().unwrap_or_default());
        lines
    }
}

/// Formats a duration as `[N day(s), ]H:MM:SS[.ffffff]`.
pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let micros = elapsed.num_microseconds().unwrap_or(i64::MAX).max(0);
    let total_seconds = micros / MICROS_PER_SECOND;
    let fraction = micros % MICROS_PER_SECOND;

    let days = total_seconds / SECONDS_PER_DAY;
    let seconds_of_day = total_seconds % SECONDS_PER_DAY;
    let hours = seconds_of_day / 3600;
    let minutes = (seconds_of_day % 3600) / 60;
    let seconds = seconds_of_day % 60;

    let mut out = String::new();
    match days {
        0 => {}
        1 => out.push_str("1 day, "),
        n => out.push_str(&format!("{} days, ", n)),
    }
    out.push_str(&format!("{}:{:02}:{:02}", hours, minutes, seconds));
    if fraction != 0 {
        out.push_str(&format!(".{:06}", fraction));
    }
    out
}

/// Renders a job's return value with `Debug`.
pub fn render_value<T: Debug + ?Sized>(value: &T) -> String {
    render_with(value, |out, value| write!(out, "{:?}", value))
}

/// Renders a job's return value with `Display`, for text results.
pub fn render_display<T: Display + ?Sized>(value: &T) -> String {
    render_with(value, |out, value| write!(out, "{}", value))
}

/// Falls back to [`RENDER_PLACEHOLDER`] when the formatter returns an error
/// or panics.
fn render_with<T, W>(value: &T, write: W) -> String
where
    T: ?Sized,
    W: FnOnce(&mut String, &T) -> fmt::Result,
{
    let mut out = String::new();
    match panic::catch_unwind(AssertUnwindSafe(|| write(&mut out, value))) {
        Ok(Ok(())) => out,
        Ok(Err(_)) => {
            warn!("Failed to render return value, using placeholder");
            RENDER_PLACEHOLDER.to_string()
        }
        Err(_) => {
            warn!("Rendering return value panicked, using placeholder");
            RENDER_PLACEHOLDER.to_string()
        }
    }
}
