//! # Anvil Command-Line Entry Point
//!
//! ## Startup Sequence
//! 1. Parse arguments
//! 2. Initialize tracing (logging)
//! 3. Load configuration
//! 4. Open database & run migrations
//! 5. App-open lock (when enabled for the shop)
//! 6. Run the command, print the result

use clap::Parser;

use anvil_cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    // The actual setup is in lib.rs for better testability
    if let Err(err) = anvil_cli::run(cli).await {
        if json {
            match serde_json::to_string(&err) {
                Ok(text) => eprintln!("{}", text),
                Err(_) => eprintln!("{}", err.message),
            }
        } else {
            eprintln!("error: {}", err.message);
        }
        std::process::exit(err.code.exit_code());
    }
}
