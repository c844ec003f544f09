use clap::Parser;
use cli::{Cli, Command};

mod cli;
mod climate;
mod config;
mod db;
mod interpolate;
mod models;
mod power_curve;
mod repos;
mod retry;
mod server;
mod solar;
mod store;
mod sweep;
mod tools;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Cli::parse();

    match args.cmd {
        Command::Http { address } => server::run(address, &args.database_url).await,
        Command::Db(db_cmd) => match db_cmd.cmd {
            cli::DbSubCommand::Migrate => {
                db::migrate(&args.database_url).await.unwrap();
            }
            cli::DbSubCommand::Reset => {
                let confirmed = dialoguer::Confirm::new()
                    .with_prompt("Drop and recreate the whole schema?")
                    .default(false)
                    .interact()
                    .unwrap();
                if confirmed {
                    db::reset(&args.database_url).await.unwrap();
                }
            }
        },
        Command::Sweep(sweep_args) => {
            tools::sweep::exec(&args.database_url, sweep_args)
                .await
                .unwrap();
        }
    }
}
