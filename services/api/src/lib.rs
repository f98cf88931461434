mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use iq_programs::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
