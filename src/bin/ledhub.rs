use clap::Parser;
use std::io::Result;
use std::sync::Arc;

use async_std::channel;
use async_std::prelude::FutureExt;
use async_std::sync::RwLock;

#[derive(clap::Parser)]
#[command(author, version = option_env!("LEDHUB_VERSION").unwrap_or("dev"), about, long_about = None)]
struct CommandLineOptions {
  /// Path to the toml configuration file.
  config: String,

  /// Overrides the serial device from the configuration file.
  #[arg(short = 'd', long)]
  device: Option<String>,
}

async fn serve(config: ledhub::config::RuntimeConfiguration) -> Result<()> {
  log::info!("thread running, preparing channels");
  let dispatches = channel::unbounded();
  let completions = channel::bounded(10);

  let catalog = config.catalog()?;
  log::info!("catalog ready ({} services)", catalog.services().len());

  let scheduler = ledhub::scheduler::Scheduler::new(
    ledhub::device::DeviceExecutor::new(dispatches.0),
    catalog.background().clone(),
  );
  let catalog = Arc::new(RwLock::new(catalog));

  let hooks = ledhub::hooks::CsgoHooks::new(scheduler.clone(), catalog.clone());
  let state = ledhub::server::State::builder()
    .scheduler(scheduler.clone())
    .catalog(catalog)
    .feed(ledhub::hooks::GameFeed::new(hooks))
    .gsi(config.gsi)
    .build()?;

  log::info!("spawning device worker thread");
  let device_thread = async_std::task::spawn(ledhub::device::run(config.device, dispatches.1, completions.0));

  log::info!("spawning scheduler completion thread");
  let scheduler_thread = async_std::task::spawn(scheduler.clone().run(completions.1));
  scheduler.start().await;

  let addr = std::env::var("LEDHUB_LISTENER_ADDR").unwrap_or(config.server.addr);
  log::info!("preparing web thread on addr '{}'", addr);

  ledhub::server::listen(state, addr)
    .race(device_thread)
    .race(scheduler_thread)
    .await?;

  Ok(())
}

fn main() -> Result<()> {
  if dotenv::dotenv().is_err() {
    eprintln!("warning: no '.env' file detected'");
  }

  env_logger::init();
  let args = CommandLineOptions::parse();
  let mut parsed = ledhub::config::RuntimeConfiguration::load(&args.config)?;

  if let Some(device) = args.device {
    parsed.device.device = Some(device);
  }

  log::info!("starting async main thread");
  async_std::task::block_on(serve(parsed))?;
  Ok(())
}
