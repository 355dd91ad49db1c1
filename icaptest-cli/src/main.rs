use clap::Parser;

use icaptest_cli::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = icaptest_cli::run(cli).await {
        eprintln!("{err}");
        std::process::exit(err.exit_code());
    }
}
