// ABOUTME: Operator-facing messages for the CLI, separate from tracing logs.
// ABOUTME: Renders progress, warnings, and results as plain text, final-result-only, or JSON lines.

use serde::Serialize;
use std::io::Write;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Normal,
    /// Final results and problems only; for CI logs.
    Quiet,
    /// One JSON object per line.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Event {
    Progress,
    Warning,
    Success,
    Error,
}

impl Event {
    fn shown_when_quiet(self) -> bool {
        self != Event::Progress
    }

    fn to_stderr(self) -> bool {
        matches!(self, Event::Warning | Event::Error)
    }

    fn text_prefix(self) -> &'static str {
        match self {
            Event::Warning => "Warning: ",
            Event::Error => "Error: ",
            Event::Progress | Event::Success => "",
        }
    }
}

#[derive(Serialize)]
struct Line<'a> {
    event: Event,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Debug)]
pub struct Output {
    mode: OutputMode,
    started: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            started: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Success messages report time since this call.
    pub fn start_timer(&mut self) {
        self.started = Some(Instant::now());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started.map_or(0.0, |t| t.elapsed().as_secs_f64())
    }

    pub fn progress(&self, message: &str) {
        self.emit(Event::Progress, message);
    }

    pub fn warning(&self, message: &str) {
        self.emit(Event::Warning, message);
    }

    pub fn success(&self, message: &str) {
        self.emit(Event::Success, message);
    }

    pub fn error(&self, message: &str) {
        self.emit(Event::Error, message);
    }

    /// Pre-rendered text in normal and quiet mode; `value` as one JSON document otherwise.
    pub fn document<T: Serialize>(&self, text: &str, value: &T) {
        match self.mode {
            OutputMode::Json => match serde_json::to_string_pretty(value) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::warn!(error = %e, "could not serialize document"),
            },
            OutputMode::Normal | OutputMode::Quiet => print!("{text}"),
        }
    }

    fn emit(&self, event: Event, message: &str) {
        if self.mode == OutputMode::Quiet && !event.shown_when_quiet() {
            return;
        }
        let Some(line) = self.render(event, message) else {
            return;
        };
        // Write errors such as a closed pipe are ignored.
        let _ = if event.to_stderr() {
            writeln!(std::io::stderr().lock(), "{line}")
        } else {
            writeln!(std::io::stdout().lock(), "{line}")
        };
    }

    fn render(&self, event: Event, message: &str) -> Option<String> {
        let timed = event == Event::Success || event == Event::Error;
        let duration_secs = self.started.filter(|_| timed).map(|_| self.elapsed_secs());

        match self.mode {
            OutputMode::Json => serde_json::to_string(&Line {
                event,
                message,
                duration_secs,
            })
            .ok(),
            OutputMode::Normal if event == Event::Success => Some(match duration_secs {
                Some(secs) => format!("{message} ({secs:.1}s)"),
                None => message.to_string(),
            }),
            OutputMode::Normal | OutputMode::Quiet => {
                Some(format!("{}{}", event.text_prefix(), message))
            }
        }
    }
}
