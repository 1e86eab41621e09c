use hostca::cli::{handle_command, Cli};
use hostca::utils::errors::Result;

#[tokio::main]
async fn main() -> Result<()> {
    use clap::Parser;
    let cli = Cli::parse();

    if let Err(e) = handle_command(cli).await {
        eprintln!("{}", e.error_body());
        std::process::exit(1);
    }

    Ok(())
}
