use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tide::{Error, Request, Result};

use super::{ApiResponse, State};
use crate::{catalog::CatalogError, effects::Effect, scheduler::Outcome};

#[derive(Debug, Deserialize)]
struct CreateServicePayload {
  name: String,
}

#[derive(Debug, Deserialize)]
struct AddActionPayload {
  name: String,
  effect: Effect,
}

#[derive(Debug, Serialize)]
struct TriggerServiceResponse {
  /// One entry per action, in action name order.
  outcomes: Vec<Outcome>,
}

#[derive(Debug, Serialize)]
struct AddActionResponse {
  /// True when an action with the same name was overwritten.
  replaced: bool,
}

/// ROUTE: every service and its actions.
pub async fn list(req: Request<State>) -> Result {
  let catalog = req.state().catalog.read().await;
  let services = catalog
    .services()
    .values()
    .map(|service| (service.name().to_string(), service.actions().clone()))
    .collect::<HashMap<String, HashMap<String, Effect>>>();
  ApiResponse::ok(services).respond(200)
}

/// ROUTE: registers an empty service.
pub async fn create(mut req: Request<State>) -> Result {
  let payload = req.body_json::<CreateServicePayload>().await.map_err(|error| {
    log::warn!("unable to parse service payload - {}", error);
    Error::from_str(422, "bad-payload")
  })?;

  let mut catalog = req.state().catalog.write().await;
  catalog.create_service(&payload.name).map_err(|error| {
    log::warn!("unable to create service - {error}");
    Error::from_str(409, "duplicate-service")
  })?;

  ApiResponse::ok(payload.name).respond(201)
}

/// ROUTE: adds (or replaces) an action on an existing service.
pub async fn add_action(mut req: Request<State>) -> Result {
  let payload = req.body_json::<AddActionPayload>().await.map_err(|error| {
    log::warn!("unable to parse action payload - {}", error);
    Error::from_str(422, "bad-payload")
  })?;
  let service = req.param("name")?.to_string();

  let mut catalog = req.state().catalog.write().await;
  let previous = catalog
    .add_action(&service, &payload.name, payload.effect)
    .map_err(|error| {
      log::warn!("unable to add action - {error}");
      match error {
        CatalogError::UnknownService(_) => Error::from_str(404, "unknown-service"),
        _ => Error::from_str(500, "bad-catalog"),
      }
    })?;

  ApiResponse::ok(AddActionResponse {
    replaced: previous.is_some(),
  })
  .respond(200)
}

/// ROUTE: enqueues every action of a service at once.
pub async fn trigger(req: Request<State>) -> Result {
  let name = req.param("name")?;
  let catalog = req.state().catalog.read().await;
  let service = catalog.service(name).ok_or_else(|| {
    log::warn!("unable to trigger unknown service '{name}'");
    Error::from_str(404, "unknown-service")
  })?;

  let outcomes = req.state().scheduler.enqueue_service(service).await;
  log::info!("triggered {} actions of service '{}'", outcomes.len(), service.name());
  ApiResponse::ok(TriggerServiceResponse { outcomes }).respond(200)
}
