use serde::{Deserialize, Serialize};
use tide::{Error, Request, Result};

use super::{ApiResponse, State};
use crate::{catalog::CatalogError, scheduler::Outcome};

/// The manual trigger names a catalog action by its service and action name.
#[derive(Debug, Default, Deserialize)]
struct TriggerQuery {
  /// Service name, matched case-insensitively.
  service: Option<String>,

  /// Action name, matched case-insensitively.
  action: Option<String>,
}

/// Reported back after a manual trigger.
#[derive(Debug, Serialize)]
struct TriggerResponse {
  /// What the scheduler did with the effect; `dropped` is not a failure.
  outcome: Outcome,
}

/// ROUTE: resolves `?service=..&action=..` through the catalog and enqueues the effect.
pub async fn trigger(req: Request<State>) -> Result {
  let query = req.query::<TriggerQuery>().map_err(|error| {
    log::warn!("unable to parse trigger query - {}", error);
    Error::from_str(422, "bad-query")
  })?;

  let (service, action) = query.service.zip(query.action).ok_or_else(|| {
    log::warn!("trigger request missing service or action");
    Error::from_str(422, "missing-parameters")
  })?;

  let effect = {
    let catalog = req.state().catalog.read().await;
    catalog.lookup(&service, &action).cloned().map_err(|error| {
      log::warn!("unable to trigger - {error}");
      match error {
        CatalogError::UnknownService(_) => Error::from_str(404, "unknown-service"),
        _ => Error::from_str(404, "unknown-action"),
      }
    })?
  };

  let outcome = req.state().scheduler.enqueue(effect).await;
  log::info!("manual trigger '{service}/{action}' - {outcome:?}");
  ApiResponse::ok(TriggerResponse { outcome }).respond(200)
}

/// ROUTE: the current scheduler snapshot.
pub async fn status(req: Request<State>) -> Result {
  let snapshot = req.state().scheduler.snapshot().await;
  ApiResponse::ok(snapshot).respond(200)
}

/// ROUTE: clears the queue and the background override.
pub async fn reset(req: Request<State>) -> Result {
  req.state().scheduler.reset().await;
  let snapshot = req.state().scheduler.snapshot().await;
  ApiResponse::ok(snapshot).respond(200)
}
