mod cli;
mod infra;
mod runner;

use row_priority::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
