use clap::Parser;
use ghcnd_ingest::cli::{run, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        eprintln!("Error: {}", error);
        std::process::exit(1);
    }
}
