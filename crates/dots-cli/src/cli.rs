//! CLI argument definitions using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dots_meta::ConflictResolution;

/// Keep configuration files in sync with cloud storage
#[derive(Parser, Debug)]
#[command(name = "dotsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to <config dir>/dotsync/config.toml)
    #[arg(long, global = true, env = "DOTSYNC_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the configuration files found under the scan root
    Scan {
        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Include files outside the active profile
        #[arg(long)]
        all: bool,
    },

    /// Compare tracked files against the remote
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Upload local changes
    Push {
        /// Preview what would be uploaded without making changes
        #[arg(long)]
        dry_run: bool,

        /// Limit the push to these files (relative path or filename)
        paths: Vec<String>,
    },

    /// Download remote changes
    Pull {
        /// Preview what would be downloaded without making changes
        #[arg(long)]
        dry_run: bool,

        /// Limit the pull to these files (relative path or filename)
        paths: Vec<String>,
    },

    /// Resolve a conflicted file
    Resolve {
        /// Tracked file (relative path or filename)
        path: String,

        /// Which side wins: local, remote, merge, or skip
        #[arg(long = "use", value_name = "SIDE")]
        resolution: ConflictResolution,
    },

    /// Watch tracked files and react to changes until interrupted
    Watch {
        /// Upload changed files instead of only reporting them
        #[arg(long)]
        auto_sync: bool,
    },

    /// Check that the configured backend is reachable
    TestConnection,

    /// Report credential-looking content in a file
    CheckSecrets {
        /// File to scan
        path: PathBuf,
    },

    /// Print a file with credential values redacted
    Sanitize {
        /// File to sanitize
        path: PathBuf,
    },

    /// List the built-in sync profiles, or pick the active one
    Profiles {
        /// Profile to make active from now on
        #[arg(long = "use", value_name = "NAME")]
        select: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_push_with_paths() {
        let cli = Cli::parse_from(["dotsync", "push", "--dry-run", ".zshrc", ".vimrc"]);
        match cli.command {
            Some(Commands::Push { dry_run, paths }) => {
                assert!(dry_run);
                assert_eq!(paths, vec![".zshrc", ".vimrc"]);
            }
            other => panic!("Expected Push, got {:?}", other),
        }
    }

    #[test]
    fn parse_resolve_side() {
        let cli = Cli::parse_from(["dotsync", "resolve", ".gitconfig", "--use", "remote"]);
        match cli.command {
            Some(Commands::Resolve { path, resolution }) => {
                assert_eq!(path, ".gitconfig");
                assert_eq!(resolution, ConflictResolution::UseRemote);
            }
            other => panic!("Expected Resolve, got {:?}", other),
        }
    }

    #[test]
    fn parse_profile_selection() {
        let cli = Cli::parse_from(["dotsync", "profiles", "--use", "minimal"]);
        match cli.command {
            Some(Commands::Profiles { select }) => assert_eq!(select.as_deref(), Some("minimal")),
            other => panic!("Expected Profiles, got {:?}", other),
        }
    }

    #[test]
    fn resolve_rejects_unknown_side() {
        let result = Cli::try_parse_from(["dotsync", "resolve", ".gitconfig", "--use", "theirs"]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["dotsync", "status", "--config", "/tmp/c.toml", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }
}
