use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use kv_migrate::migrate::{KeyPatterns, StdCopyRecorder};
use kv_migrate::{MigrateConfig, runner, subscriber};

/// Placement of migrated list items.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ListOrderArg {
    /// Push each item to the head (reverses source order).
    Prepend,
    /// Push each item to the tail (keeps source order).
    Append,
}

impl ListOrderArg {
    fn as_str(self) -> &'static str {
        match self {
            ListOrderArg::Prepend => "prepend",
            ListOrderArg::Append => "append",
        }
    }
}

#[derive(Parser)]
#[command(name = "kv-migrate")]
#[command(about = "Copy typed key-value data between an ordered store and a key-value server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy every matching key from the source to the destination
    Copy {
        /// Path to the migration config file
        #[arg(short, long, default_value = "kv-migrate.toml", env = "KV_MIGRATE_CONFIG")]
        config: PathBuf,

        /// Include pattern (replaces [filter].includes; repeatable)
        #[arg(long)]
        include: Vec<String>,

        /// Exclude pattern (replaces [filter].excludes; repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        /// Destination key prefix (replaces [destination].prefix)
        #[arg(long)]
        prefix: Option<String>,

        /// Where list items are pushed in the destination
        #[arg(long, value_enum)]
        list_order: Option<ListOrderArg>,
    },

    /// Validate filter patterns and show which keys they let through
    CheckPatterns {
        /// Include pattern (repeatable)
        #[arg(long)]
        include: Vec<String>,

        /// Exclude pattern (repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        /// Key names to test against the patterns
        keys: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Copy {
            config,
            include,
            exclude,
            prefix,
            list_order,
        } => {
            let mut config = MigrateConfig::from_file(&config)?;
            if !include.is_empty() {
                config.filter.includes = include;
            }
            if !exclude.is_empty() {
                config.filter.excludes = exclude;
            }
            if prefix.is_some() {
                config.destination.prefix = prefix;
            }
            if let Some(order) = list_order {
                config.copy.list_order = order.as_str().to_string();
            }
            config.validate()?;

            subscriber::init(&config.logging)?;

            let mut recorder = StdCopyRecorder::stdout();
            let summary = runner::run(&config, &mut recorder)?;
            eprintln!("{}", summary.summary());
            if summary.has_errors() {
                std::process::exit(1);
            }
        }

        Commands::CheckPatterns {
            include,
            exclude,
            keys,
        } => {
            let patterns = KeyPatterns::new(&include, &exclude)?;
            println!(
                "{} include and {} exclude patterns are valid",
                include.len(),
                exclude.len()
            );
            for key in keys {
                let verdict = if patterns.allows(&key) { "copy" } else { "skip" };
                println!("{}: {}", verdict, key);
            }
        }
    }

    Ok(())
}
