mod cli;
mod import;
mod infra;
mod routes;
mod server;

use hive_directory::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
