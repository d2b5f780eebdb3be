use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gd-tools")]
#[command(author = "gd-tools contributors")]
#[command(version)]
#[command(about = "Provision and reconcile a gd-tools production host", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Bring this host in line with its desired state
    System(SystemArgs),

    /// Show what `system` would change
    Diff(DiffArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct SystemArgs {
    /// Print every command instead of running it
    #[arg(short = 'n', long, visible_alias = "dry-run")]
    pub preview: bool,

    /// Show a progress bar instead of one line per step
    #[arg(short, long)]
    pub progress: bool,

    /// Refresh the package index and upgrade installed packages first
    #[arg(short, long)]
    pub upgrade: bool,

    /// Desired-state file (default: /etc/gd-tools-config.json)
    #[arg(short, long, env = "GD_TOOLS_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Parser)]
pub struct DiffArgs {
    /// Only this step: "packages", "mount:/var/gd-tools", ...
    pub target: Option<String>,

    /// Desired-state file (default: /etc/gd-tools-config.json)
    #[arg(short, long, env = "GD_TOOLS_CONFIG")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_system_flags() {
        let cli = Cli::try_parse_from(["gd-tools", "-vv", "system", "--dry-run", "-u"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::System(args) = cli.command else {
            panic!("expected system");
        };
        assert!(args.preview);
        assert!(args.upgrade);
        assert!(!args.progress);
    }

    #[test]
    fn test_diff_target() {
        let cli = Cli::try_parse_from(["gd-tools", "diff", "mount:/var/gd-tools"]).unwrap();
        let Command::Diff(args) = cli.command else {
            panic!("expected diff");
        };
        assert_eq!(args.target.as_deref(), Some("mount:/var/gd-tools"));
    }
}
