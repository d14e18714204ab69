//! CLI tool for jarkit jar operations.

mod commands;
mod exit_codes;
mod output;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use jarkit::CompressionLevel;

use exit_codes::ExitCode;

/// Jar content tool
#[derive(Parser)]
#[command(name = "jarkit")]
#[command(author, version, about = "Inspect, merge and repack jar files", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Number of threads (0 = auto)
    #[arg(long, short = 't', default_value = "0", global = true)]
    threads: usize,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List the classes and resources of a jar (alias: l)
    #[command(alias = "l")]
    List {
        /// Jar file to list
        jar: PathBuf,
    },

    /// Find the first jar holding an entry
    Find {
        /// Entry key, e.g. com/acme/Main.class
        key: String,

        /// Jar files to search, highest priority first
        #[arg(required = true)]
        jars: Vec<PathBuf>,

        /// Write the entry data to this file
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Merge jars into one; earlier jars win on duplicate keys (alias: m)
    #[command(alias = "m")]
    Merge {
        /// Jar file to create
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Jar files to merge, highest priority first
        #[arg(required = true, num_args = 2..)]
        jars: Vec<PathBuf>,

        /// Compression level: store, default or 0-9
        #[arg(short = 'l', long, default_value = "default")]
        level: CompressionLevel,
    },

    /// Rewrite a jar, dropping or relocating entries
    Repack {
        /// Jar file to read
        jar: PathBuf,

        /// Jar file to create
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Drop entries whose key starts with this prefix
        #[arg(short = 'x', long)]
        exclude: Vec<String>,

        /// Rename key prefixes, given as FROM=TO
        #[arg(short = 'r', long, value_parser = commands::parse_rename)]
        rename_prefix: Vec<(String, String)>,

        /// Compression level: store, default or 0-9
        #[arg(short = 'l', long, default_value = "default")]
        level: CompressionLevel,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let settings = commands::Settings {
        format: cli.format,
        thread_count: cli.threads,
    };

    let exit_code = match cli.command {
        Commands::List { jar } => commands::list(&jar, &settings),

        Commands::Find { key, jars, output } => {
            commands::find(&key, &jars, output.as_deref(), &settings)
        }

        Commands::Merge {
            output,
            jars,
            level,
        } => commands::merge(&jars, &output, level, &settings),

        Commands::Repack {
            jar,
            output,
            exclude,
            rename_prefix,
            level,
        } => commands::repack(&commands::RepackConfig {
            jar_path: &jar,
            output_path: &output,
            exclude: &exclude,
            rename_prefix: &rename_prefix,
            level,
            settings: &settings,
        }),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}
