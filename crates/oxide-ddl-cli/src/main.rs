//! oxide-ddl CLI
//!
//! Command-line tool for validating schema snapshots against a dialect,
//! rendering their DDL and planning migrations between two snapshots.

mod commands;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use oxide_ddl_core::capability::Dialect;
use oxide_ddl_core::generate::GenerateOptions;

use crate::commands::{DiffOptions, ValidateOptions};

/// Dialect-aware DDL generation and migration planning.
#[derive(Parser)]
#[command(name = "oxide-ddl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Target dialect (postgres, cockroachdb, nile, sqlite, d1).
    #[arg(short, long, env = "OXIDE_DDL_DIALECT", default_value = "postgres")]
    dialect: Dialect,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the dialect's capability set as JSON.
    Capabilities,

    /// Check a schema snapshot against the dialect.
    Validate {
        /// Schema snapshot (JSON).
        #[arg(short, long)]
        schema: PathBuf,

        /// Exit with status 1 when the schema has errors.
        #[arg(long, env = "OXIDE_DDL_STRICT")]
        strict: bool,

        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,

        /// Treat lookup-style table names as shared tables on Nile.
        #[arg(long)]
        name_heuristics: bool,
    },

    /// Print the DDL creating a schema snapshot.
    Generate {
        /// Schema snapshot (JSON).
        #[arg(short, long)]
        schema: PathBuf,

        /// Add IF NOT EXISTS to CREATE statements.
        #[arg(long)]
        if_not_exists: bool,

        /// Use identity columns instead of serial types.
        #[arg(long)]
        identity: bool,

        /// Emit COMMENT ON statements.
        #[arg(long)]
        comments: bool,
    },

    /// Print the migration from one snapshot to another.
    Diff {
        /// Current schema snapshot (JSON).
        #[arg(long)]
        from: PathBuf,

        /// Desired schema snapshot (JSON).
        #[arg(long)]
        to: PathBuf,

        /// Exit with status 0 even when the plan can lose data.
        #[arg(long)]
        allow_destructive: bool,

        /// Print the plan as JSON.
        #[arg(long)]
        json: bool,

        /// Append the statements recording the plan as migration NAME.
        #[arg(long, value_name = "NAME")]
        record: Option<String>,

        /// Batch number used with --record.
        #[arg(long, default_value_t = 1)]
        batch: u32,
    },

    /// Rewrite a SQL script for the dialect. Use - to read stdin.
    Rewrite {
        /// Script to rewrite.
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut out = io::stdout().lock();
    let dialect = cli.dialect;

    let code = match cli.command {
        Commands::Capabilities => commands::capabilities(dialect, &mut out)?,

        Commands::Validate {
            schema,
            strict,
            json,
            name_heuristics,
        } => {
            let options = ValidateOptions {
                strict,
                json,
                name_heuristics,
            };
            commands::validate(dialect, &schema, &options, &mut out)?
        }

        Commands::Generate {
            schema,
            if_not_exists,
            identity,
            comments,
        } => {
            let options = GenerateOptions {
                if_not_exists,
                identity_columns: identity,
                comments,
                ..GenerateOptions::default()
            };
            commands::generate(dialect, &schema, &options, &mut out)?
        }

        Commands::Diff {
            from,
            to,
            allow_destructive,
            json,
            record,
            batch,
        } => {
            let options = DiffOptions {
                allow_destructive,
                json,
                record,
                batch,
            };
            commands::diff(dialect, &from, &to, &options, &mut out)?
        }

        Commands::Rewrite { input } => {
            commands::rewrite(dialect, &input, &mut out, &mut io::stderr())?
        }
    };

    Ok(ExitCode::from(code))
}
