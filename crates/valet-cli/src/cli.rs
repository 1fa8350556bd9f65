//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

/// Default location scanned for application profiles.
pub const DEFAULT_PROFILE_DIR: &str = "/etc/valet/profiles";

#[derive(Parser)]
#[command(
    name = "valet",
    version,
    about = "AppImage Valet - install and keep desktop bundles up to date",
    long_about = "Install self-contained application bundles (AppImages), wire them\n\
                  into the desktop launcher, and keep them current: the generated\n\
                  launcher entry runs `valet update`, which fetches a newer bundle\n\
                  when the remote content changed and then starts the application."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Download and install a bundle, then provision desktop integration.
    Install(InstallArgs),

    /// Check for a newer bundle, install it when stale, then launch.
    Update(UpdateArgs),
}

#[derive(Parser)]
pub struct InstallArgs {
    /// Profile file, or a directory scanned for profile JSON files.
    #[arg(long = "profile", value_name = "PATH", default_value = DEFAULT_PROFILE_DIR)]
    pub profile: PathBuf,

    /// Skip desktop-entry, icon, and updater provisioning.
    #[arg(long = "no-desktop")]
    pub no_desktop: bool,
}

#[derive(Parser)]
pub struct UpdateArgs {
    /// Profile file, or a directory scanned for profile JSON files.
    #[arg(long = "profile", value_name = "PATH", default_value = DEFAULT_PROFILE_DIR)]
    pub profile: PathBuf,

    /// Arguments passed through verbatim to the launched application.
    #[arg(last = true, value_name = "ARGS")]
    pub launch_args: Vec<String>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn update_collects_launch_args_after_separator() {
        let cli = Cli::parse_from([
            "valet",
            "update",
            "--profile",
            "/etc/valet/profiles/acme.json",
            "--",
            "--minimized",
            "--new-window",
        ]);
        match cli.command {
            Command::Update(args) => {
                assert_eq!(args.launch_args, vec!["--minimized", "--new-window"]);
            }
            Command::Install(_) => panic!("expected update"),
        }
    }
}
