mod cli;
mod commands;
mod infra;
mod narrator;
mod routes;
mod server;

use prospectus::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
