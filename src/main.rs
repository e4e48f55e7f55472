use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = pswproxy::cli::Cli::parse();
    if let Err(e) = pswproxy::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
