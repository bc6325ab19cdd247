use clap::Parser;
use papertrade_server::cli::{serve, Cli, Commands};
use papertrade_server::config::Config;
use papertrade_server::{build_state, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(&config.log_format);
    let state = build_state(&config).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(state, &config).await?,
        Commands::Quote(args) => args.execute(&state).await?,
        Commands::History(args) => args.execute(&state).await?,
    }
    Ok(())
}
