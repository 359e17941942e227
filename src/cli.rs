//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands. All
//! configuration is supplied on the command line; the platform is resolved
//! once here (host default, `--platform` override) and threaded through the
//! rest of the generator explicitly.

use crate::flags::Platform;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Declarative Ninja build-graph generator for a multi-platform embedded
/// Forth system.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project root directory containing the top-level `BUILD.yml`.
    #[arg(short = 'C', long, value_name = "DIR", default_value = ".")]
    pub directory: Utf8PathBuf,

    /// Target platform; defaults to the platform the generator runs on.
    #[arg(long, value_enum, value_name = "PLATFORM")]
    pub platform: Option<Platform>,

    /// Build with the size-minimising flag set.
    #[arg(long)]
    pub minimize: bool,

    /// Project version embedded in the generated description.
    #[arg(long, value_name = "VERSION", default_value = "7.0.7.16")]
    pub project_version: String,

    /// Source revision; defaults to the current git commit.
    #[arg(long, value_name = "REV")]
    pub revision: Option<String>,

    /// Path prefix from the build directory to the project sources.
    #[arg(long, value_name = "DIR", default_value = "..")]
    pub source_root: Utf8PathBuf,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Optional subcommand to execute; defaults to `emit -` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Emit {
                file: Utf8PathBuf::from("-"),
            });
        }
        self
    }
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone)]
pub enum Commands {
    /// Write the generated build description to the specified file.
    Emit {
        /// Output path for the generated description.
        ///
        /// Use `-` to write to stdout.
        #[arg(value_name = "FILE", default_value = "-")]
        file: Utf8PathBuf,
    },

    /// Construct and validate the graph without emitting anything.
    Check,
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
    fn default_command_is_emit_to_stdout() {
        let cli = Cli::parse_from(["confgen"]).with_default_command();
        assert_eq!(
            cli.command,
            Some(Commands::Emit {
                file: Utf8PathBuf::from("-")
            })
        );
    }
}
