//! immom CLI - Inspect and edit an IMM model snapshot
//!
//! This CLI enables operators to:
//! - Browse the object tree and read object attributes
//! - Describe classes and their attribute flags
//! - Export the model as IMM XML
//! - Apply a file of changes as one CCB

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use immom_cli::commands;
use immom_cli::config::GlobalArgs;
use immom_cli::error::CliResult;

/// immom CLI - IMM object management
#[derive(Parser)]
#[command(name = "immom")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the model as IMM XML
    Dump(commands::dump::DumpArgs),

    /// Show every attribute of an object
    Show(commands::show::ShowArgs),

    /// Show the object tree below a DN
    Tree(commands::tree::TreeArgs),

    /// List the direct children of a DN
    Children(commands::tree::ChildrenArgs),

    /// List the instances of a class
    Instances(commands::tree::InstancesArgs),

    /// List registered classes
    Classes(commands::class::ClassesArgs),

    /// Show a class definition
    Class(commands::class::ClassArgs),

    /// Split a DN into its RDN and parent
    SplitDn(commands::split_dn::SplitDnArgs),

    /// Apply a change file as one CCB
    Apply(commands::apply::ApplyArgs),
}

fn init_tracing(verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        EnvFilter::new(level)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let global = cli.global;
    match cli.command {
        Commands::Dump(args) => commands::dump::execute(args, &global).await,
        Commands::Show(args) => commands::show::execute(args, &global).await,
        Commands::Tree(args) => commands::tree::execute(args, &global).await,
        Commands::Children(args) => commands::tree::execute_children(args, &global).await,
        Commands::Instances(args) => commands::tree::execute_instances(args, &global).await,
        Commands::Classes(args) => commands::class::execute_list(args, &global).await,
        Commands::Class(args) => commands::class::execute(args, &global).await,
        Commands::SplitDn(args) => commands::split_dn::execute(args),
        Commands::Apply(args) => commands::apply::execute(args, &global).await,
    }
}
