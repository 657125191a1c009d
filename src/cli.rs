//! Command-line interface.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::Parser;

/// embermon - a live, self-sorting terminal view of filesystem activity.
///
/// Watches a directory tree and continuously redraws it with each entry
/// ranked by a decaying activity "heat", fitting the most important
/// entries into the available terminal rows.
#[derive(Parser, Debug, Clone)]
#[command(name = "embermon", version, about)]
pub struct Cli {
    /// Directory to watch.
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Rolling history size; recently-evented entries get a ranking boost.
    #[arg(short = 'n', long = "history", default_value_t = 4, value_name = "INT")]
    pub history: usize,

    /// Glob to ignore (repeatable).
    #[arg(
        short = 'i',
        long = "ignore",
        value_name = "GLOB",
        default_values_t = [
            "node_modules".to_string(),
            ".git".to_string(),
            "dist".to_string(),
        ]
    )]
    pub ignore: Vec<String>,

    /// Debounce window for filesystem events, in milliseconds.
    #[arg(long, default_value_t = 100, value_name = "MS")]
    pub interval: u64,

    /// Ghost ticks a deleted entry stays visible while fading out.
    #[arg(long = "ghost-steps", default_value_t = 3, value_name = "INT")]
    pub ghost_steps: u8,

    /// Disable git status integration.
    #[arg(long = "no-git")]
    pub no_git: bool,

    /// Idle redraw period while anything is hot, in milliseconds.
    #[arg(short = 'b', long = "breathe", default_value_t = 2_000, value_name = "MS")]
    pub breathe: u64,
}

impl Cli {
    /// Default arguments for a specific path; used by embedders and tests.
    pub fn for_path(path: impl AsRef<Path>) -> Self {
        Self::parse_from([
            OsString::from("embermon"),
            path.as_ref().as_os_str().to_os_string(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_contract() {
        let cli = Cli::parse_from(["embermon"]);
        assert_eq!(cli.path, PathBuf::from("."));
        assert_eq!(cli.history, 4);
        assert_eq!(cli.ignore, vec!["node_modules", ".git", "dist"]);
        assert_eq!(cli.interval, 100);
        assert_eq!(cli.ghost_steps, 3);
        assert!(!cli.no_git);
        assert_eq!(cli.breathe, 2_000);
    }

    #[test]
    fn short_flags_and_repeats_parse() {
        let cli = Cli::parse_from([
            "embermon", "/tmp", "-n", "8", "-i", "target", "-i", "*.log", "-b", "500",
            "--no-git", "--ghost-steps", "5", "--interval", "250",
        ]);
        assert_eq!(cli.path, PathBuf::from("/tmp"));
        assert_eq!(cli.history, 8);
        assert_eq!(cli.ignore, vec!["target", "*.log"]);
        assert_eq!(cli.interval, 250);
        assert_eq!(cli.ghost_steps, 5);
        assert!(cli.no_git);
        assert_eq!(cli.breathe, 500);
    }
}
