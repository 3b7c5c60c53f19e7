use clap::Parser;
use nd_cli::logging::{init_logging, level_from_flags};
use nd_cli::{handle_command, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(level_from_flags(cli.verbose, cli.quiet));
    handle_command(cli).await
}
