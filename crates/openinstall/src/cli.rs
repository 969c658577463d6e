//! CLI argument parsing with clap

use clap::{Args, Parser, Subcommand};

/// openinstall - guided installation of host monitoring integrations
#[derive(Parser, Debug)]
#[command(name = "openinstall")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install monitoring integrations on this host
    Install(InstallArgs),
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Install only the named recipes (plus the core bundle)
    #[arg(short = 'n', long = "recipe")]
    pub recipes: Vec<String>,

    /// Install recipes from explicit file paths or URLs
    #[arg(long = "recipe-path")]
    pub recipe_paths: Vec<String>,

    /// Answer yes to every prompt
    #[arg(short = 'y', long = "assume-yes")]
    pub assume_yes: bool,

    /// Load the recipe catalog from a local directory instead of the service
    #[arg(long = "local-recipes")]
    pub local_recipes: Option<String>,

    /// Skip running-process discovery
    #[arg(long)]
    pub skip_discovery: bool,

    /// Skip the infrastructure agent recipe
    #[arg(long)]
    pub skip_infra: bool,

    /// Skip the logging recipe
    #[arg(long)]
    pub skip_logging: bool,

    /// Install only the core bundle, skipping all other integrations
    #[arg(long)]
    pub skip_integrations: bool,
}
