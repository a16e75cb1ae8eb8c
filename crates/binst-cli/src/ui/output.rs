//! Console output for commands.
//!
//! Everything human-readable goes to stderr so stdout stays clean for
//! `--json` and `hash`. `Output` also implements the core [`Reporter`]
//! trait, drawing a single progress line while an artifact downloads.

use std::io::{IsTerminal, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use binst_core::Reporter;
use binst_schema::{Digest, InstalledArtifact};
use crossterm::style::Stylize;
use crossterm::{cursor, queue, terminal};

/// Redraw the progress line at most once per this many bytes.
const PROGRESS_STEP: u64 = 256 * 1024;

/// Console output handle.
#[derive(Debug)]
pub struct Output {
    quiet: bool,
    interactive: bool,
    progress_active: AtomicBool,
    last_drawn: AtomicU64,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            interactive: std::io::stderr().is_terminal(),
            progress_active: AtomicBool::new(false),
            last_drawn: AtomicU64::new(0),
        }
    }

    /// Prints an informational message.
    pub fn info(&self, msg: &str) {
        if self.quiet {
            return;
        }
        self.clear_progress();
        eprintln!("{} {msg}", "•".blue());
    }

    /// Prints a success message.
    pub fn success(&self, msg: &str) {
        if self.quiet {
            return;
        }
        self.clear_progress();
        eprintln!("{} {}", "✓".green(), msg.green());
    }

    /// Prints an error. Shown even when quiet.
    pub fn error(&self, label: &str, msg: &str) {
        self.clear_progress();
        eprintln!("{} {msg}", format!("{label}:").red().bold());
    }

    fn draw_progress(&self, url: &str, current: u64, total: Option<u64>) {
        if self.quiet || !self.interactive {
            return;
        }
        let last = self.last_drawn.load(Ordering::Relaxed);
        let finished = total == Some(current);
        if current >= last && current - last < PROGRESS_STEP && !finished {
            return;
        }
        self.last_drawn.store(current, Ordering::Relaxed);
        self.progress_active.store(true, Ordering::Relaxed);

        let name = binst_core::filename_from_url(url);
        let amount = match total {
            Some(total) => format!("{} / {}", format_size(current), format_size(total)),
            None => format_size(current),
        };
        let mut stderr = std::io::stderr();
        let _ = queue!(
            stderr,
            cursor::MoveToColumn(0),
            terminal::Clear(terminal::ClearType::CurrentLine)
        );
        let _ = write!(stderr, "{} {name} {}", "↓".cyan(), amount.dark_grey());
        let _ = stderr.flush();
    }

    fn clear_progress(&self) {
        if !self.progress_active.swap(false, Ordering::Relaxed) {
            return;
        }
        self.last_drawn.store(0, Ordering::Relaxed);
        let mut stderr = std::io::stderr();
        let _ = queue!(
            stderr,
            cursor::MoveToColumn(0),
            terminal::Clear(terminal::ClearType::CurrentLine)
        );
        let _ = stderr.flush();
    }
}

impl Reporter for Output {
    fn fetching(&self, url: &str, current: u64, total: Option<u64>) {
        self.draw_progress(url, current, total);
    }

    fn verifying(&self, actual: &Digest) {
        self.info(&format!("Fetched {}", actual.to_string().dark_grey()));
    }

    fn installing(&self, target: &Path) {
        self.info(&format!("Installing {}", target.display()));
    }

    fn done(&self, artifact: &InstalledArtifact) {
        self.success(&format!(
            "Installed {} ({})",
            artifact.path.display(),
            format_size(artifact.size_bytes)
        ));
    }

    fn failed(&self, _reason: &str) {
        // main prints the error once with its exit label
        self.clear_progress();
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
