//! Terminal output: status lines, extraction spinner, download bar and final report.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::download::ProgressState;
use crate::session::SessionReport;

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Download,
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Download => "↓",
    }
}

/// Print a styled status message.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => println!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => eprintln!("{} {}", icon.yellow().bold(), msg),
        Status::Download => println!("{} {}", icon.magenta(), msg),
    }
}

/// Format a duration as "Xm Ys" or "Xs".
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Spinner shown while the result feed is paged.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    /// Create a new spinner with the given message; hidden when `quiet`.
    pub fn new(msg: &str, quiet: bool) -> Self {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        pb.set_style(style("{spinner:.cyan} {msg}").tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    pub fn is_finished(&self) -> bool {
        self.pb.is_finished()
    }

    /// Finish with success message.
    pub fn finish_with_success(&self, msg: &str) {
        self.pb.set_style(style("{msg:.green}"));
        self.pb.finish_with_message(format!("{} {}", status_icon(Status::Success), msg));
    }

    /// Finish with error message.
    pub fn finish_with_error(&self, msg: &str) {
        self.pb.set_style(style("{msg:.red}"));
        self.pb.finish_with_message(format!("{} {}", status_icon(Status::Error), msg));
    }
}

/// Progress bar over `succeeded / target` for the download phase.
#[derive(Clone)]
pub struct DownloadBar {
    pb: ProgressBar,
}

impl DownloadBar {
    pub fn new(target: usize, quiet: bool) -> Self {
        let pb = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(target as u64)
        };
        pb.set_length(target as u64);
        pb.set_style(
            style("{msg}: {bar:40.cyan/blue} {pos}/{len} ({percent}%)").progress_chars("█▓▒░ "),
        );
        pb.set_message(format!("{} Downloading", status_icon(Status::Download)));

        Self { pb }
    }

    /// Apply one progress update
    pub fn update(&self, state: &ProgressState) {
        self.pb.set_position(state.succeeded as u64);
        if state.failed > 0 {
            self.pb.set_message(format!(
                "{} Downloading ({} failed)",
                status_icon(Status::Download),
                state.failed
            ));
        }
    }

    /// Callback suitable for [`ProgressTracker::with_observer`](crate::download::ProgressTracker::with_observer)
    pub fn observer(&self) -> impl Fn(&ProgressState) + Send + Sync + 'static {
        let bar = self.clone();
        move |state| bar.update(state)
    }

    pub fn position(&self) -> u64 {
        self.pb.position()
    }

    pub fn finish(&self) {
        self.pb.finish();
    }
}

/// `Images Downloaded: <succeeded> of <target> in <elapsed>`
pub fn report_line(succeeded: usize, target: usize, elapsed: Duration) -> String {
    format!(
        "Images Downloaded: {} of {} in {}",
        succeeded,
        target,
        format_duration(elapsed)
    )
}

/// Print the final colored report.
pub fn print_report(report: &SessionReport, elapsed: Duration) {
    let line = report_line(report.progress.succeeded, report.target, elapsed);
    if report.progress.succeeded >= report.target {
        println!("{} {}", status_icon(Status::Success).green().bold(), line.green());
    } else {
        println!("{} {}", status_icon(Status::Warning).yellow().bold(), line.yellow());
    }

    if report.progress.failed > 0 {
        println!(
            "  {} {} failed downloads",
            "─".dimmed(),
            report.progress.failed.to_string().red()
        );
    }
    println!("  {} {}", "─".dimmed(), report.storage_folder.display().cyan());
}
