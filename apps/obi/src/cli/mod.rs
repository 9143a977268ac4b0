//! # Obi CLI Module
//!
//! This module implements the CLI interface for Obi.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Initialize a new database and write the configured templates
//! - `ingest` - Mirror a roster/attendance snapshot from a JSON file
//! - `evaluate` - Evaluate one member
//! - `scan` - List READY and APPROACHING members of an academy
//! - `graduate` - Record a graduation
//! - `confirm` / `cancel` - Move a record through its lifecycle
//! - `history` - An academy's graduation history
//! - `rules` - List, set or reset rules
//! - `belts` - Show the belt ladder

mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use obi_core::ObiError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Obi - graduation eligibility and progression engine
///
/// Decides from attendance and per-academy rules whether a member is ready
/// for the next degree or belt, and records graduation decisions.
#[derive(Parser, Debug)]
#[command(name = "obi")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the database
    #[arg(short = 'D', long, global = true, default_value = "obi.redb")]
    pub database: PathBuf,

    /// Storage backend: "redb" (ACID database) or "memory" (volatile)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// TOML file with the belt ladder and default rule templates
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Initialize a new database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Mirror members, enrollments, attendance and initial ranks from a JSON file
    Ingest {
        /// Path to the snapshot file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Evaluate one member's readiness
    Evaluate {
        #[arg(short, long)]
        academy: u64,

        #[arg(short, long)]
        member: u64,

        /// Evaluation date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// List READY and APPROACHING members of an academy
    Scan {
        #[arg(short, long)]
        academy: u64,

        /// Evaluation date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Record a graduation
    Graduate {
        #[arg(short, long)]
        academy: u64,

        #[arg(short, long)]
        member: u64,

        /// Target belt slug
        #[arg(short, long)]
        belt: String,

        /// Target degree (0-based)
        #[arg(short = 'g', long, default_value = "0")]
        degree: u8,

        /// Member granting the rank
        #[arg(long)]
        granted_by: u64,

        /// Decision date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Class the grant happened in
        #[arg(long)]
        class: Option<u64>,

        #[arg(long)]
        notes: Option<String>,

        /// Create as PENDING instead of granting directly
        #[arg(long)]
        pending: bool,

        /// Grant outside the automatic rules (needs --justification)
        #[arg(long)]
        manual: bool,

        #[arg(long)]
        justification: Option<String>,
    },

    /// Confirm a pending graduation
    Confirm {
        #[arg(long)]
        id: u64,
    },

    /// Cancel a graduation
    Cancel {
        #[arg(long)]
        id: u64,
    },

    /// Show an academy's graduation history
    History {
        #[arg(short, long)]
        academy: u64,

        #[arg(short, long)]
        member: Option<u64>,

        /// Earliest decision date (inclusive)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Latest decision date (inclusive)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// PENDING, CONFIRMED or CANCELLED
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Rule administration
    Rules {
        #[command(subcommand)]
        action: RulesCommand,
    },

    /// Show the belt ladder
    Belts {
        /// Only regular (adult) belts
        #[arg(short, long)]
        regular: bool,
    },
}

/// Rule subcommands.
#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// Effective rule for every belt
    List {
        #[arg(short, long)]
        academy: u64,
    },

    /// Set an academy rule, or the default template when no academy is given.
    /// Config templates are only written by `init`, so this edit persists.
    Set {
        #[arg(short, long)]
        academy: Option<u64>,

        #[arg(short, long)]
        belt: String,

        #[arg(long)]
        min_classes: u32,

        #[arg(long)]
        min_months: u32,

        #[arg(long)]
        classes_per_degree: u32,

        /// Advisory weekly frequency, in tenths of a class per week
        #[arg(long)]
        min_weekly_frequency_tenths: Option<u32>,
    },

    /// Replace an academy's rules with the default templates
    Reset {
        #[arg(short, long)]
        academy: u64,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), ObiError> {
    let ctx = Context {
        database: cli.database,
        backend: cli.backend,
        config: cli.config,
        json_mode: cli.json_mode,
    };

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(&ctx, &host, port).await,
        Some(Commands::Init { force }) => cmd_init(&ctx, force),
        Some(Commands::Ingest { file }) => cmd_ingest(&ctx, &file),
        Some(Commands::Evaluate {
            academy,
            member,
            as_of,
        }) => cmd_evaluate(&ctx, academy, member, as_of),
        Some(Commands::Scan { academy, as_of }) => cmd_scan(&ctx, academy, as_of),
        Some(Commands::Graduate {
            academy,
            member,
            belt,
            degree,
            granted_by,
            date,
            class,
            notes,
            pending,
            manual,
            justification,
        }) => cmd_graduate(
            &ctx,
            GraduateArgs {
                academy,
                member,
                belt,
                degree,
                granted_by,
                date,
                class,
                notes,
                pending,
                manual,
                justification,
            },
        ),
        Some(Commands::Confirm { id }) => cmd_confirm(&ctx, id),
        Some(Commands::Cancel { id }) => cmd_cancel(&ctx, id),
        Some(Commands::History {
            academy,
            member,
            from,
            to,
            status,
        }) => cmd_history(&ctx, academy, member, from, to, status.as_deref()),
        Some(Commands::Rules { action }) => match action {
            RulesCommand::List { academy } => cmd_rules_list(&ctx, academy),
            RulesCommand::Set {
                academy,
                belt,
                min_classes,
                min_months,
                classes_per_degree,
                min_weekly_frequency_tenths,
            } => {
                let rule = obi_core::GraduationRule {
                    min_weekly_frequency_tenths,
                    ..obi_core::GraduationRule::new(min_classes, min_months, classes_per_degree)
                };
                cmd_rules_set(&ctx, academy, &belt, rule)
            }
            RulesCommand::Reset { academy } => cmd_rules_reset(&ctx, academy),
        },
        Some(Commands::Belts { regular }) => cmd_belts(&ctx, regular),
        None => cmd_belts(&ctx, false),
    }
}
