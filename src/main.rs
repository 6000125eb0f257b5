mod commands;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

use halakat::api::ApiError;
use halakat::{config, logging, session};
use commands::Output;

#[derive(Parser, Debug)]
#[command(name = "halakat")]
#[command(about = "Command-line client for the halakat Quran teaching platform")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/halakat/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Bearer token (overrides HALAKAT_TOKEN)
  #[arg(long, global = true)]
  token: Option<String>,

  /// Print JSON instead of text
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log)?;

  let session = session::Session::new(&config)?;
  if let Some(token) = args.token {
    session.login(token);
  }
  let output = if args.json { Output::Json } else { Output::Text };

  let result = commands::run(&session, args.command, output).await;

  let stats = session.cache().stats();
  tracing::debug!(
    hits = stats.hits(),
    misses = stats.misses(),
    evictions = stats.evictions(),
    "cache stats"
  );

  if let Err(err) = result {
    if err
      .downcast_ref::<ApiError>()
      .is_some_and(ApiError::requires_login)
    {
      eprintln!("Session expired or missing. Set HALAKAT_TOKEN and try again.");
    }
    return Err(err);
  }

  Ok(())
}
