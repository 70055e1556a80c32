use std::io::{Error, ErrorKind, Result};
use std::sync::Arc;

use async_std::sync::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tide::{Request, Response};

use crate::{catalog::Catalog, gsi::GsiConfiguration, hooks::GameFeed, scheduler::Scheduler};

pub mod catalog;
pub mod gsi;
pub mod trigger;

/// The `[server]` configuration section.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Configuration {
  /// The address the http listener binds to.
  pub addr: String,
}

impl Default for Configuration {
  fn default() -> Self {
    Self {
      addr: "0.0.0.0:8081".into(),
    }
  }
}

/// Every json response from the api is wrapped in this type.
#[derive(Debug, Serialize)]
struct ApiResponse<T> {
  /// Whether the request did what it asked for.
  ok: bool,

  /// The current time.
  timestamp: chrono::DateTime<chrono::Utc>,

  /// Route specific payload.
  #[serde(skip_serializing_if = "Option::is_none")]
  data: Option<T>,
}

impl<T> ApiResponse<T>
where
  T: Serialize,
{
  fn ok(data: T) -> Self {
    Self {
      ok: true,
      timestamp: chrono::Utc::now(),
      data: Some(data),
    }
  }

  fn respond(&self, status: u16) -> tide::Result {
    tide::Body::from_json(self).map(|bod| Response::builder(status).body(bod).build())
  }
}

#[derive(Default, Clone)]
pub struct StateBuilder {
  scheduler: Option<Scheduler>,
  catalog: Option<Arc<RwLock<Catalog>>>,
  feed: Option<Arc<Mutex<GameFeed>>>,
  gsi: Option<GsiConfiguration>,
}

impl StateBuilder {
  pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
    self.scheduler = Some(scheduler);
    self
  }

  pub fn catalog(mut self, catalog: Arc<RwLock<Catalog>>) -> Self {
    self.catalog = Some(catalog);
    self
  }

  pub fn feed(mut self, feed: GameFeed) -> Self {
    self.feed = Some(Arc::new(Mutex::new(feed)));
    self
  }

  pub fn gsi(mut self, config: GsiConfiguration) -> Self {
    self.gsi = Some(config);
    self
  }

  pub fn build(self) -> Result<State> {
    let scheduler = self
      .scheduler
      .ok_or_else(|| Error::new(ErrorKind::Other, "missing scheduler"))?;
    let catalog = self
      .catalog
      .ok_or_else(|| Error::new(ErrorKind::Other, "missing catalog"))?;
    let feed = self
      .feed
      .ok_or_else(|| Error::new(ErrorKind::Other, "missing game feed"))?;
    Ok(State {
      scheduler,
      catalog,
      feed,
      gsi: self.gsi.unwrap_or_default(),
    })
  }
}

#[derive(Clone)]
pub struct State {
  scheduler: Scheduler,
  catalog: Arc<RwLock<Catalog>>,
  feed: Arc<Mutex<GameFeed>>,
  gsi: GsiConfiguration,
}

impl State {
  pub fn builder() -> StateBuilder {
    StateBuilder::default()
  }

  pub fn scheduler(&self) -> &Scheduler {
    &self.scheduler
  }

  pub fn catalog(&self) -> &Arc<RwLock<Catalog>> {
    &self.catalog
  }
}

pub async fn missing(req: Request<State>) -> tide::Result {
  log::warn!("[warning] unknown request received - '{}'", req.url().path());
  Ok(Response::builder(404).build())
}

/// Registers every route on a fresh tide app.
pub fn app(state: State) -> tide::Server<State> {
  let mut app = tide::with_state(state);
  app.at("/service").get(trigger::trigger);
  app.at("/status").get(trigger::status);
  app.at("/reset").post(trigger::reset);

  app.at("/gsi").post(gsi::receive);

  app.at("/services").get(catalog::list);
  app.at("/services").post(catalog::create);
  app.at("/services/:name/actions").post(catalog::add_action);
  app.at("/services/:name/trigger").post(catalog::trigger);

  app.at("/*").all(missing);
  app
}

pub async fn listen<S>(state: State, addr: S) -> std::io::Result<()>
where
  S: std::convert::AsRef<str>,
{
  log::info!("listening on '{}'", addr.as_ref());
  app(state).listen(addr.as_ref()).await
}
