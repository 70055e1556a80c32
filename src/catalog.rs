use serde::Serialize;
use std::collections::HashMap;

use crate::effects::{Color, Effect};

/// The background used when neither the configuration nor a producer supplied one.
pub const FALLBACK_BACKGROUND: Color = Color::new(16, 16, 16);

/// Enumerates the things that can go wrong while reading or mutating the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
  /// No service is registered under the requested name.
  UnknownService(String),

  /// The service exists, but has no action with the requested name.
  UnknownAction(String, String),

  /// `create_service` was called with a name that is already taken.
  DuplicateService(String),
}

impl std::fmt::Display for CatalogError {
  fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
    match self {
      Self::UnknownService(name) => write!(formatter, "unknown service '{name}'"),
      Self::UnknownAction(service, action) => write!(formatter, "unknown action '{action}' on service '{service}'"),
      Self::DuplicateService(name) => write!(formatter, "service '{name}' already exists"),
    }
  }
}

impl std::error::Error for CatalogError {}

impl From<CatalogError> for std::io::Error {
  fn from(error: CatalogError) -> Self {
    let kind = match error {
      CatalogError::DuplicateService(_) => std::io::ErrorKind::AlreadyExists,
      _ => std::io::ErrorKind::NotFound,
    };
    std::io::Error::new(kind, error)
  }
}

/// A named group of effects, keyed by (lowercase) action name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
  name: String,
  actions: HashMap<String, Effect>,
}

impl Service {
  fn new(name: String) -> Self {
    Self {
      name,
      actions: HashMap::new(),
    }
  }

  /// The name the service was created with (not normalized).
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Case-insensitive action lookup.
  pub fn action<T>(&self, name: T) -> Option<&Effect>
  where
    T: AsRef<str>,
  {
    self.actions.get(&name.as_ref().to_lowercase())
  }

  pub fn actions(&self) -> &HashMap<String, Effect> {
    &self.actions
  }
}

/// Maps service names to their effects, and holds the default background.
#[derive(Debug, Clone)]
pub struct Catalog {
  services: HashMap<String, Service>,
  background: Effect,
}

impl Default for Catalog {
  fn default() -> Self {
    Self::new(Effect::background(FALLBACK_BACKGROUND))
  }
}

impl Catalog {
  /// Creates an empty catalog whose default background is `background`.
  pub fn new(background: Effect) -> Self {
    if !background.is_background() {
      log::warn!("default background configured with a '{}' effect", background.label());
    }

    Self {
      services: HashMap::new(),
      background,
    }
  }

  /// The effect shown when nothing else is pending and no override is set.
  pub fn background(&self) -> &Effect {
    &self.background
  }

  /// Registers an empty service. Existing services are never replaced; the caller gets a
  /// `DuplicateService` error instead.
  pub fn create_service<T>(&mut self, name: T) -> Result<&mut Service, CatalogError>
  where
    T: AsRef<str>,
  {
    let key = name.as_ref().to_lowercase();

    if self.services.contains_key(&key) {
      return Err(CatalogError::DuplicateService(name.as_ref().to_string()));
    }

    log::info!("creating service '{}'", name.as_ref());
    Ok(
      self
        .services
        .entry(key)
        .or_insert_with(|| Service::new(name.as_ref().to_string())),
    )
  }

  /// Adds a named effect to an existing service. An action with the same name is replaced and
  /// returned.
  pub fn add_action<S, A>(&mut self, service: S, action: A, effect: Effect) -> Result<Option<Effect>, CatalogError>
  where
    S: AsRef<str>,
    A: AsRef<str>,
  {
    let entry = self
      .services
      .get_mut(&service.as_ref().to_lowercase())
      .ok_or_else(|| CatalogError::UnknownService(service.as_ref().to_string()))?;

    let previous = entry.actions.insert(action.as_ref().to_lowercase(), effect);

    if previous.is_some() {
      log::warn!("replaced action '{}' on service '{}'", action.as_ref(), entry.name);
    }

    Ok(previous)
  }

  /// Case-insensitive service lookup.
  pub fn service<T>(&self, name: T) -> Option<&Service>
  where
    T: AsRef<str>,
  {
    self.services.get(&name.as_ref().to_lowercase())
  }

  /// Resolves a service + action pair, reporting which half was missing.
  pub fn lookup<S, A>(&self, service: S, action: A) -> Result<&Effect, CatalogError>
  where
    S: AsRef<str>,
    A: AsRef<str>,
  {
    let found = self
      .service(&service)
      .ok_or_else(|| CatalogError::UnknownService(service.as_ref().to_string()))?;

    found
      .action(&action)
      .ok_or_else(|| CatalogError::UnknownAction(found.name.clone(), action.as_ref().to_string()))
  }

  /// Every known service, keyed by normalized name.
  pub fn services(&self) -> &HashMap<String, Service> {
    &self.services
  }
}

#[cfg(test)]
mod tests {
  use super::{Catalog, CatalogError};
  use crate::effects::{Color, Effect, QueuePolicy};
  use std::time::Duration;

  fn red() -> Effect {
    Effect::solid(Color::new(255, 0, 0), Duration::from_millis(100), QueuePolicy::AlwaysQueue)
  }

  #[test]
  fn lookups_ignore_case() {
    let mut catalog = Catalog::default();
    catalog.create_service("CSGO").unwrap();
    catalog.add_action("csgo", "onHitRed", red()).unwrap();

    assert_eq!(catalog.lookup("Csgo", "ONHITRED"), Ok(&red()));
    assert_eq!(catalog.service("csgo").map(|s| s.name()), Some("CSGO"));
  }

  #[test]
  fn duplicate_services_are_rejected() {
    let mut catalog = Catalog::default();
    catalog.create_service("csgo").unwrap();
    catalog.add_action("csgo", "black", red()).unwrap();

    assert_eq!(
      catalog.create_service("CsGo").map(|_| ()),
      Err(CatalogError::DuplicateService("CsGo".into()))
    );
    assert!(catalog.lookup("csgo", "black").is_ok());
  }

  #[test]
  fn adding_to_unknown_service_fails() {
    let mut catalog = Catalog::default();
    assert_eq!(
      catalog.add_action("nope", "black", red()),
      Err(CatalogError::UnknownService("nope".into()))
    );
  }

  #[test]
  fn replacing_an_action_returns_the_previous() {
    let mut catalog = Catalog::default();
    catalog.create_service("csgo").unwrap();
    assert_eq!(catalog.add_action("csgo", "flash", red()), Ok(None));

    let green = Effect::solid(Color::new(0, 255, 0), Duration::from_millis(5), QueuePolicy::JumpQueue);
    assert_eq!(catalog.add_action("csgo", "FLASH", green.clone()), Ok(Some(red())));
    assert_eq!(catalog.lookup("csgo", "flash"), Ok(&green));
  }

  #[test]
  fn missing_names_never_partially_match() {
    let mut catalog = Catalog::default();
    catalog.create_service("csgo").unwrap();
    catalog.add_action("csgo", "bombFlash", red()).unwrap();

    assert_eq!(
      catalog.lookup("csgo", "bomb"),
      Err(CatalogError::UnknownAction("csgo".into(), "bomb".into()))
    );
    assert_eq!(catalog.lookup("cs", "bombFlash"), Err(CatalogError::UnknownService("cs".into())));
  }

  #[test]
  fn default_background_is_dim() {
    let catalog = Catalog::default();
    assert!(catalog.background().is_background());
  }
}
