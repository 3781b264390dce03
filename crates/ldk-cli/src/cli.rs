use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "ldk",
    about = "Loading kit: classpath resolution and native library registry",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Classpath to search, separated by the platform path separator
    #[arg(long = "classpath", visible_alias = "cp", global = true, default_value = "")]
    pub classpath: String,

    /// TOML file with [resolver], [native] and [coordinator] tables
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Find the first resource with a name
    Find(FindArgs),
    /// List every resource with a name, in classpath order
    List(FindArgs),
    /// Load the bytes of a class by binary name
    Class(ClassArgs),
    /// Materialize the classpath and show its units in order
    Units,
    /// Show an archive's manifest
    Manifest(ManifestArgs),
    /// Load a native library and look up symbols
    LoadLib(LoadLibArgs),
    /// Show the platform file names for a library name
    MapName(MapNameArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args)]
pub struct FindArgs {
    pub name: String,
}

#[derive(Args)]
pub struct ClassArgs {
    pub binary_name: String,
}

#[derive(Args)]
pub struct ManifestArgs {
    pub archive: PathBuf,
}

#[derive(Args)]
pub struct LoadLibArgs {
    pub name: String,
    #[arg(short, long)]
    pub symbol: Vec<String>,
}

#[derive(Args)]
pub struct MapNameArgs {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_find() {
        let cli = Cli::try_parse_from(["ldk", "find", "a/b.txt", "--cp", "x.jar"]).unwrap();
        assert_eq!(cli.classpath, "x.jar");
        if let Command::Find(args) = cli.command {
            assert_eq!(args.name, "a/b.txt");
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_load_lib_symbols() {
        let cli = Cli::try_parse_from(["ldk", "load-lib", "z", "-s", "inflate", "-s", "deflate"]).unwrap();
        if let Command::LoadLib(args) = cli.command {
            assert_eq!(args.name, "z");
            assert_eq!(args.symbol, vec!["inflate".to_string(), "deflate".to_string()]);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from(["ldk", "units", "--format", "json", "-v", "--config", "ldk.toml"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("ldk.toml")));
        assert!(matches!(cli.command, Command::Units));
    }

    #[test]
    fn classpath_defaults_to_empty() {
        let cli = Cli::try_parse_from(["ldk", "config"]).unwrap();
        assert!(cli.classpath.is_empty());
        assert_eq!(cli.format, OutputFormat::Text);
    }
}
