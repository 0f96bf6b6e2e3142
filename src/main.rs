//! crisp-bootstrap CLI
//!
//! All CLI logic lives in the `cli` module. This file is just the entry point.

mod cli;

#[tokio::main]
async fn main() {
    if let Err(err) = cli::run().await {
        crisp_bootstrap::utils::console::failure(&format!("{:#}", err));
        std::process::exit(cli::exit_code(&err));
    }
}
