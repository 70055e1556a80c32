//! Parsing and diffing of the game state integration feed. The game posts its complete view of the
//! world on every change; the `Tracker` compares each post with the last one and turns the
//! differences into `GameEvent`s.

use serde::Deserialize;

/// The `[gsi]` configuration section.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct GsiConfiguration {
  /// When set, posts must carry `auth.token` equal to this value.
  pub token: Option<String>,
}

#[allow(clippy::missing_docs_in_private_items)]
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ProviderState {
  pub name: Option<String>,
  pub steamid: Option<String>,
  pub timestamp: Option<u64>,
}

#[allow(clippy::missing_docs_in_private_items)]
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct MapState {
  pub name: Option<String>,
  pub mode: Option<String>,
  pub phase: Option<String>,
  pub round: Option<u32>,
}

#[allow(clippy::missing_docs_in_private_items)]
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct RoundState {
  pub phase: Option<String>,
  pub bomb: Option<String>,
  pub win_team: Option<String>,
}

#[allow(clippy::missing_docs_in_private_items)]
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PlayerVitals {
  pub health: Option<u32>,
  pub armor: Option<u32>,
  pub flashed: Option<u8>,
  pub smoked: Option<u8>,
  pub burning: Option<u8>,
}

#[allow(clippy::missing_docs_in_private_items)]
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PlayerState {
  pub steamid: Option<String>,
  pub name: Option<String>,
  pub team: Option<String>,
  pub activity: Option<String>,
  pub state: Option<PlayerVitals>,
}

#[allow(clippy::missing_docs_in_private_items)]
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct AuthState {
  pub token: Option<String>,
}

/// One post from the game. Every section is optional; the game only sends what the integration
/// config subscribed to.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct GameState {
  pub provider: Option<ProviderState>,
  pub map: Option<MapState>,
  pub round: Option<RoundState>,
  pub player: Option<PlayerState>,
  pub auth: Option<AuthState>,
}

impl GameState {
  /// Whether this post is allowed in by `configuration`.
  pub fn authorized(&self, configuration: &GsiConfiguration) -> bool {
    match configuration.token.as_ref() {
      None => true,
      Some(expected) => self.auth.as_ref().and_then(|auth| auth.token.as_ref()) == Some(expected),
    }
  }

  fn map_name(&self) -> Option<&String> {
    self.map.as_ref()?.name.as_ref()
  }

  fn map_round(&self) -> Option<u32> {
    self.map.as_ref()?.round
  }

  fn bomb(&self) -> Option<&String> {
    self.round.as_ref()?.bomb.as_ref()
  }

  fn team(&self) -> Option<String> {
    self.player.as_ref()?.team.as_ref().map(|team| team.to_lowercase())
  }

  fn vitals(&self) -> Option<&PlayerVitals> {
    self.player.as_ref()?.state.as_ref()
  }
}

/// The semantic events raised from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
  MapChanged(String),
  RoundReset,
  TeamChanged(String),
  HealthChanged(u32),
  FlashedChanged(u8),
  BombPlanted,
  BombDefused,
  BombExploded,
}

/// Remembers the last post and reports what changed.
#[derive(Debug, Default)]
pub struct Tracker {
  previous: GameState,
}

impl Tracker {
  pub fn observe(&mut self, current: GameState) -> Vec<GameEvent> {
    let previous = &self.previous;
    let mut events = Vec::with_capacity(4);

    if let Some(name) = current.map_name().filter(|name| previous.map_name() != Some(*name)) {
      events.push(GameEvent::MapChanged(name.clone()));
    }

    if let (Some(before), Some(after)) = (previous.map_round(), current.map_round()) {
      if before != after {
        events.push(GameEvent::RoundReset);
      }
    }

    if let Some(team) = current.team().filter(|team| previous.team().as_ref() != Some(team)) {
      events.push(GameEvent::TeamChanged(team));
    }

    if current.bomb() != previous.bomb() {
      match current.bomb().map(|bomb| bomb.as_str()) {
        Some("planted") => events.push(GameEvent::BombPlanted),
        Some("defused") => events.push(GameEvent::BombDefused),
        Some("exploded") => events.push(GameEvent::BombExploded),
        _ => log::trace!("bomb state now {:?}", current.bomb()),
      }
    }

    let before = previous.vitals().cloned().unwrap_or_default();
    let after = current.vitals().cloned().unwrap_or_default();

    if let Some(health) = after.health.filter(|health| before.health != Some(*health)) {
      events.push(GameEvent::HealthChanged(health));
    }

    if let Some(flashed) = after.flashed.filter(|flashed| before.flashed != Some(*flashed)) {
      events.push(GameEvent::FlashedChanged(flashed));
    }

    log::debug!("game state produced {} events", events.len());
    self.previous = current;
    events
  }
}

#[cfg(test)]
mod tests {
  use super::{GameEvent, GameState, GsiConfiguration, Tracker};

  fn parse(source: &str) -> GameState {
    serde_json::from_str(source).unwrap()
  }

  #[test]
  fn first_post_reports_everything_present() {
    let mut tracker = Tracker::default();
    let events = tracker.observe(parse(
      r#"{
        "provider": { "name": "Counter-Strike: Global Offensive", "steamid": "1", "timestamp": 10 },
        "map": { "name": "de_dust2", "phase": "live", "round": 3 },
        "player": { "team": "CT", "state": { "health": 100, "flashed": 0 } }
      }"#,
    ));

    assert_eq!(
      events,
      vec![
        GameEvent::MapChanged("de_dust2".into()),
        GameEvent::TeamChanged("ct".into()),
        GameEvent::HealthChanged(100),
        GameEvent::FlashedChanged(0),
      ]
    );
  }

  #[test]
  fn unchanged_posts_are_quiet() {
    let mut tracker = Tracker::default();
    let body = r#"{ "map": { "name": "de_nuke", "round": 1 }, "player": { "team": "T" } }"#;
    tracker.observe(parse(body));
    assert!(tracker.observe(parse(body)).is_empty());
  }

  #[test]
  fn bomb_transitions() {
    let mut tracker = Tracker::default();
    tracker.observe(parse(r#"{ "round": { "phase": "live" } }"#));
    assert_eq!(
      tracker.observe(parse(r#"{ "round": { "phase": "live", "bomb": "planted" } }"#)),
      vec![GameEvent::BombPlanted]
    );
    assert_eq!(
      tracker.observe(parse(r#"{ "round": { "phase": "over", "bomb": "defused" } }"#)),
      vec![GameEvent::BombDefused]
    );
  }

  #[test]
  fn new_round_number_resets() {
    let mut tracker = Tracker::default();
    tracker.observe(parse(r#"{ "map": { "name": "de_inferno", "round": 4 } }"#));
    assert_eq!(
      tracker.observe(parse(r#"{ "map": { "name": "de_inferno", "round": 5 } }"#)),
      vec![GameEvent::RoundReset]
    );
  }

  #[test]
  fn token_is_checked_when_configured() {
    let state = parse(r#"{ "auth": { "token": "abc" } }"#);
    assert!(state.authorized(&GsiConfiguration::default()));
    assert!(state.authorized(&GsiConfiguration {
      token: Some("abc".into())
    }));
    assert!(!state.authorized(&GsiConfiguration {
      token: Some("xyz".into())
    }));
    assert!(!GameState::default().authorized(&GsiConfiguration {
      token: Some("xyz".into())
    }));
  }
}
