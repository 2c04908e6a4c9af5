use log::{error, info, LevelFilter};
use std::process::ExitCode;

const TARGET_URL: &str = "https://www.google.com";

/// Fetch `url` once and log either the body or the error.
fn run(url: &str) -> ExitCode {
    match http_smoke::client::get(url) {
        Ok(body) => {
            info!("{}", body);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .init();

    run(TARGET_URL)
}
