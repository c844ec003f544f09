use clap::{Parser, Subcommand};

use crate::models::ResourceType;

#[derive(Debug, Parser)]
#[command(about = "Renatlas CLI.")]
pub struct Cli {
    #[arg(env = "RENATLAS_DATABASE_URL", short, long)]
    pub database_url: String,
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Http {
        #[arg(env = "RENATLAS_SERVER_ADDRESS")]
        address: std::net::SocketAddr,
    },
    Db(DbCommand),
    Sweep(SweepArgs),
}

#[derive(Debug, Parser)]
pub struct DbCommand {
    #[command(subcommand)]
    pub cmd: DbSubCommand,
}

#[derive(Debug, Subcommand)]
pub enum DbSubCommand {
    Reset,
    Migrate,
}

#[derive(Debug, Parser)]
pub struct SweepArgs {
    /// Resource to score (solar or wind)
    #[arg(long)]
    pub resource: ResourceType,
    /// Bounding box overrides; defaults to the national extent
    #[arg(long)]
    pub lat_min: Option<f64>,
    #[arg(long)]
    pub lat_max: Option<f64>,
    #[arg(long)]
    pub lon_min: Option<f64>,
    #[arg(long)]
    pub lon_max: Option<f64>,
    /// Grid step in degrees
    #[arg(long, default_value_t = 0.5)]
    pub step: f64,
    /// Pause between provider calls, in seconds
    #[arg(long, default_value_t = 1.0)]
    pub pacing_secs: f64,
}
