use serde::Deserialize;
use std::collections::HashMap;
use std::io::{Error, ErrorKind, Result};
use std::path::Path;

use crate::catalog::Catalog;
use crate::device::DeviceConfiguration;
use crate::effects::Effect;
use crate::gsi::GsiConfiguration;

/// The actions of one `[services.<name>]` table.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ServiceConfiguration {
  #[serde(default)]
  pub actions: HashMap<String, Effect>,
}

/// Everything read from the toml file given to the `ledhub` binary.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RuntimeConfiguration {
  #[serde(default)]
  pub device: DeviceConfiguration,

  #[serde(default)]
  pub server: crate::server::Configuration,

  #[serde(default)]
  pub gsi: GsiConfiguration,

  /// The default background. Must be a `background` effect.
  pub background: Option<Effect>,

  #[serde(default)]
  pub services: HashMap<String, ServiceConfiguration>,
}

impl RuntimeConfiguration {
  pub fn parse<S>(source: S) -> Result<Self>
  where
    S: AsRef<str>,
  {
    toml::from_str(source.as_ref()).map_err(|error| {
      log::warn!("unable to parse configuration - {error}");
      Error::new(ErrorKind::InvalidData, error)
    })
  }

  pub fn load<P>(path: P) -> Result<Self>
  where
    P: AsRef<Path>,
  {
    log::info!("loading config from '{:?}'", path.as_ref());
    let contents = std::fs::read_to_string(path)?;
    Self::parse(contents)
  }

  /// Builds the initial catalog from the configured services and background.
  pub fn catalog(&self) -> Result<Catalog> {
    let mut catalog = match self.background.as_ref() {
      Some(background) if !background.is_background() => {
        let message = format!("configured background is a '{}' effect", background.label());
        return Err(Error::new(ErrorKind::InvalidData, message));
      }
      Some(background) => Catalog::new(background.clone()),
      None => Catalog::default(),
    };

    for (name, service) in &self.services {
      catalog.create_service(name)?;

      for (action, effect) in &service.actions {
        catalog.add_action(name, action, effect.clone())?;
      }

      log::info!("loaded service '{name}' with {} actions", service.actions.len());
    }

    Ok(catalog)
  }
}

#[cfg(test)]
mod tests {
  use super::RuntimeConfiguration;
  use crate::effects::{Color, EffectKind, QueuePolicy};

  const SAMPLE: &str = r#"
[device]
device = "/dev/ttyACM0"
baud = 9600

[server]
addr = "127.0.0.1:3000"

[gsi]
token = "secret"

[background]
kind = "background"
color = { red = 0, green = 0, blue = 40 }
breathe_ms = 4000

[services.CSGO.actions.bombFlash]
kind = "blink"
on = { red = 255, green = 0, blue = 0 }
interval_ms = 200
duration_ms = 200

[services.csgo_extra.actions.black]
kind = "static"
color = { red = 0, green = 0, blue = 0 }
duration_ms = 100
policy = "jump_queue"
"#;

  #[test]
  fn parses_a_full_configuration() {
    let config = RuntimeConfiguration::parse(SAMPLE).unwrap();
    assert_eq!(config.device.device.as_deref(), Some("/dev/ttyACM0"));
    assert_eq!(config.device.baud, 9600);
    assert_eq!(config.server.addr, "127.0.0.1:3000");
    assert_eq!(config.gsi.token.as_deref(), Some("secret"));

    let catalog = config.catalog().unwrap();
    assert_eq!(
      catalog.background().kind,
      EffectKind::Background {
        color: Color::new(0, 0, 40),
        breathe_ms: Some(4000),
      }
    );
    assert!(catalog.lookup("csgo", "BOMBFLASH").is_ok());
    assert_eq!(
      catalog.lookup("csgo_extra", "black").map(|effect| effect.policy),
      Ok(QueuePolicy::JumpQueue)
    );
  }

  #[test]
  fn empty_configuration_uses_defaults() {
    let config = RuntimeConfiguration::parse("").unwrap();
    assert_eq!(config.device.device, None);
    let catalog = config.catalog().unwrap();
    assert!(catalog.background().is_background());
    assert!(catalog.services().is_empty());
  }

  #[test]
  fn rejects_non_background_default() {
    let config = RuntimeConfiguration::parse(
      r#"
[background]
kind = "static"
color = { red = 1, green = 1, blue = 1 }
duration_ms = 5
"#,
    )
    .unwrap();
    assert!(config.catalog().is_err());
  }

  #[test]
  fn duplicate_service_names_collide() {
    let config = RuntimeConfiguration::parse("[services.csgo]\n[services.CSGO]\n").unwrap();
    assert!(config.catalog().is_err());
  }
}
