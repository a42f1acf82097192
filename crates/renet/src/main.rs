use clap::{Parser, Subcommand};
use colored::Colorize;
use env_logger::Env;

mod apply;
mod groups;
mod output;

#[derive(Parser)]
#[command(name = "renet")]
#[command(about = "Renumber laser-driver nets on KiCad boards", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Renumber group nets and save the board
    #[command(alias = "a")]
    Apply(apply::ApplyArgs),

    /// List board groups and their role assignment
    #[command(alias = "g")]
    Groups(groups::GroupsArgs),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e}", "Error:".red());
        for cause in e.chain().skip(1) {
            eprintln!("  {cause}");
        }
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // --debug only moves the default; RUST_LOG still wins
    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("error")
    };
    env_logger::Builder::from_env(env).init();

    match cli.command {
        Commands::Apply(args) => apply::execute(args),
        Commands::Groups(args) => groups::execute(args),
    }
}
