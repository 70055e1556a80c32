use tide::{Request, Response, Result};

use super::State;
use crate::gsi::GameState;

/// ROUTE: receives game state posts. Unreadable bodies are logged and acknowledged so the game
/// keeps posting.
pub async fn receive(mut req: Request<State>) -> Result {
  let body = req
    .body_json::<GameState>()
    .await
    .map_err(|error| {
      log::warn!("unable to read game state body - '{}'", error);
      error
    })
    .unwrap_or_default();

  if !body.authorized(&req.state().gsi) {
    log::warn!("unauthorized game state post");
    return Ok(Response::builder(404).build());
  }

  let events = req.state().feed.lock().await.receive(body).await;
  log::debug!("game state post handled ({events} events)");
  Ok(Response::builder(200).build())
}
