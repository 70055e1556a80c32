use async_std::sync::RwLock;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::Catalog;
use crate::effects::{Color, Effect, QueuePolicy};
use crate::gsi::{GameEvent, GameState, Tracker};
use crate::scheduler::Scheduler;

/// The catalog service every game reaction is looked up in.
pub const SERVICE: &str = "csgo";

/// How many times `bombFlash` is queued when the bomb gets planted.
const BOMB_FLASHES: usize = 40;

/// How many two-step pulses follow a defuse or explosion.
const BOMB_OUTCOME_PULSES: usize = 5;

/// Translates game events into scheduler work.
pub struct CsgoHooks {
  scheduler: Scheduler,
  catalog: Arc<RwLock<Catalog>>,
  bomb_flashing: bool,
}

impl CsgoHooks {
  pub fn new(scheduler: Scheduler, catalog: Arc<RwLock<Catalog>>) -> Self {
    Self {
      scheduler,
      catalog,
      bomb_flashing: false,
    }
  }

  /// Misses are logged and resolve to `None`, which the scheduler treats as a no-op.
  async fn action(&self, name: &str) -> Option<Effect> {
    let catalog = self.catalog.read().await;

    catalog
      .lookup(SERVICE, name)
      .map_err(|error| {
        log::debug!("no reaction available - {error}");
        error
      })
      .ok()
      .cloned()
  }

  pub async fn handle(&mut self, event: GameEvent) {
    log::debug!("handling game event {event:?}");

    match event {
      GameEvent::MapChanged(name) => {
        log::info!("map changed to '{name}', resetting scheduler");
        self.bomb_flashing = false;
        self.scheduler.reset().await;
      }
      GameEvent::RoundReset => self.bomb_flashing = false,
      GameEvent::TeamChanged(team) => {
        let action = match team.as_str() {
          "ct" => "ctTeam",
          "t" => "tTeam",
          other => {
            log::debug!("no reaction for team '{other}'");
            return;
          }
        };
        self.scheduler.enqueue(self.action(action).await).await;
      }
      GameEvent::HealthChanged(health) => {
        let action = if health == 100 { "onHitGreen" } else { "onHitRed" };
        self.scheduler.enqueue(self.action(action).await).await;
      }
      GameEvent::FlashedChanged(_) if self.bomb_flashing => log::debug!("ignoring flash while bomb is flashing"),
      GameEvent::FlashedChanged(flashed) => {
        let hold = if flashed > 0 { 7500 } else { 250 };
        let effect = Effect::solid(Color::gray(flashed), Duration::from_millis(hold), QueuePolicy::JumpQueue);
        self.scheduler.enqueue(effect).await;
      }
      GameEvent::BombPlanted => {
        self.bomb_flashing = true;

        match self.action("bombFlash").await {
          Some(flash) => {
            for _ in 0..BOMB_FLASHES {
              self.scheduler.enqueue(flash.clone()).await;
            }
          }
          None => log::warn!("bomb planted but no 'bombFlash' action is configured"),
        }
      }
      GameEvent::BombExploded => self.bomb_outcome("bombExplode1", "bombExplode2").await,
      GameEvent::BombDefused => self.bomb_outcome("bombDefuse1", "bombDefuse2").await,
    }
  }

  /// Flushes any queued flashes, blacks out, then alternates between the two given actions.
  async fn bomb_outcome(&mut self, first: &str, second: &str) {
    self.bomb_flashing = false;
    let cleared = self.scheduler.clear_pending().await;
    log::debug!("bomb resolved, cleared {cleared} pending effects");

    let first = self.action(first).await;
    let second = self.action(second).await;
    self.scheduler.enqueue(self.action("black").await).await;

    for _ in 0..BOMB_OUTCOME_PULSES {
      self.scheduler.enqueue(first.clone()).await;
      self.scheduler.enqueue(second.clone()).await;
    }
  }
}

/// The game-facing producer: remembers the previous post and forwards the differences to the hooks.
pub struct GameFeed {
  tracker: Tracker,
  hooks: CsgoHooks,
}

impl GameFeed {
  pub fn new(hooks: CsgoHooks) -> Self {
    Self {
      tracker: Tracker::default(),
      hooks,
    }
  }

  /// Returns the number of events the post produced.
  pub async fn receive(&mut self, state: GameState) -> usize {
    let events = self.tracker.observe(state);
    let amount = events.len();

    for event in events {
      self.hooks.handle(event).await;
    }

    amount
  }
}
