//! Operator tooling for a running `ledhub` process: manual triggers, status and reset, plus a
//! generator for the game's state integration config file.

use clap::Parser;
use std::io;

#[derive(clap::Subcommand)]
enum CliCommand {
  /// Enqueue a named action, using the policy it was configured with.
  Trigger { service: String, action: String },

  /// Print the scheduler snapshot.
  Status,

  /// Clear the queue and background override.
  Reset,

  /// Print a `gamestate_integration_ledhub.cfg` pointing at the server, with a fresh auth token.
  GsiConfig,
}

#[derive(clap::Parser)]
#[command(author, version = option_env!("LEDHUB_VERSION").unwrap_or("dev"), about, long_about = None)]
struct CommandLineOptions {
  /// Base url of the running ledhub server.
  #[arg(short = 's', long, default_value = "http://127.0.0.1:8081")]
  server: String,

  #[command(subcommand)]
  command: CliCommand,
}

fn bad_request<E>(error: E) -> io::Error
where
  E: std::fmt::Display,
{
  io::Error::new(io::ErrorKind::Other, format!("request failed - {error}"))
}

async fn print_response(mut response: surf::Response) -> io::Result<()> {
  let status = response.status();
  let body = response.body_string().await.map_err(bad_request)?;

  if !status.is_success() {
    log::warn!("server responded with {status}");
    return Err(io::Error::new(io::ErrorKind::Other, format!("bad response - {status}")));
  }

  println!("{body}");
  Ok(())
}

fn gsi_config(server: &str, token: &str) -> String {
  format!(
    r#""ledhub"
{{
  "uri" "{server}/gsi"
  "timeout" "1.1"
  "buffer" "0.0"
  "throttle" "0.1"
  "heartbeat" "30.0"
  "auth"
  {{
    "token" "{token}"
  }}
  "data"
  {{
    "provider" "1"
    "map" "1"
    "round" "1"
    "player_id" "1"
    "player_state" "1"
  }}
}}
"#
  )
}

async fn run(args: CommandLineOptions) -> io::Result<()> {
  let server = args.server.trim_end_matches('/');

  match args.command {
    CliCommand::Trigger { service, action } => {
      let mut url = surf::Url::parse(&format!("{server}/service")).map_err(bad_request)?;
      url
        .query_pairs_mut()
        .append_pair("service", &service)
        .append_pair("action", &action);

      log::info!("triggering '{service}/{action}'");
      print_response(surf::get(url).await.map_err(bad_request)?).await
    }
    CliCommand::Status => print_response(surf::get(format!("{server}/status")).await.map_err(bad_request)?).await,
    CliCommand::Reset => print_response(surf::post(format!("{server}/reset")).await.map_err(bad_request)?).await,
    CliCommand::GsiConfig => {
      let token = uuid::Uuid::new_v4().to_string();
      println!("{}", gsi_config(server, &token));
      eprintln!("add this to the server configuration:\n\n[gsi]\ntoken = \"{token}\"");
      Ok(())
    }
  }
}

fn main() -> io::Result<()> {
  if dotenv::dotenv().is_err() {
    eprintln!("warning: no '.env' file detected'");
  }

  env_logger::init();
  let args = CommandLineOptions::parse();
  async_std::task::block_on(run(args))
}
