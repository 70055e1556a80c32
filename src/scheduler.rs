use std::collections::VecDeque;
use std::io::Result;
use std::sync::Arc;

use async_std::channel::Receiver;
use async_std::sync::Mutex;
use serde::Serialize;

use crate::catalog::Service;
use crate::effects::{Effect, QueuePolicy};

/// One effect handed to the executor, tagged with the generation it was dispatched under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
  /// Increases by one for every dispatch the scheduler makes.
  pub generation: u64,

  /// What to render.
  pub effect: Effect,
}

/// Sent back by the executor once a dispatched effect finished its natural duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
  /// The generation of the finished dispatch.
  pub generation: u64,
}

/// The device side of the scheduling protocol. Implementations must return without waiting on the
/// effect itself; completion is reported asynchronously with a `Completion` carrying the same
/// generation. Background effects never complete.
pub trait Executor: Send + Sync {
  fn dispatch(&self, dispatch: Dispatch) -> Result<()>;
}

/// What `enqueue` did with an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
  /// No effect was given.
  Ignored,

  /// The effect replaced the background override.
  Background,

  /// The effect was appended to the pending queue.
  Queued,

  /// The effect went straight to the device.
  Dispatched,

  /// `RunIfFree` found the device busy.
  Dropped,
}

/// A point-in-time view of the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
  pub pending: usize,
  pub idle: bool,
  pub generation: u64,
  pub dropped: u64,
  pub background_override: bool,
}

/// Everything guarded by the scheduler lock.
struct Queue {
  /// Waiting effects, dispatched front to back.
  pending: VecDeque<Effect>,

  /// Set by producers enqueuing a background effect; cleared by `reset`.
  background: Option<Effect>,

  /// Used when `background` is empty.
  fallback: Effect,

  /// True while the device is showing a background effect.
  idle: bool,

  /// The generation of the most recent dispatch.
  generation: u64,

  /// Number of `RunIfFree` effects that found the device busy.
  dropped: u64,
}

/// The shared, cloneable handle every producer enqueues through.
#[derive(Clone)]
pub struct Scheduler {
  queue: Arc<Mutex<Queue>>,
  executor: Arc<dyn Executor>,
}

impl Scheduler {
  /// Creates an idle scheduler with nothing dispatched yet. `fallback` is the catalog-wide default
  /// background.
  pub fn new<E>(executor: E, fallback: Effect) -> Self
  where
    E: Executor + 'static,
  {
    Self {
      queue: Arc::new(Mutex::new(Queue {
        pending: VecDeque::new(),
        background: None,
        fallback,
        idle: true,
        generation: 0,
        dropped: 0,
      })),
      executor: Arc::new(executor),
    }
  }

  /// Puts the background effect on the device; called once at process start.
  pub async fn start(&self) {
    log::info!("starting scheduler");
    self.advance().await;
  }

  /// Accepts an effect from any producer and decides whether to buffer it, dispatch it or drop it.
  pub async fn enqueue<T>(&self, effect: T) -> Outcome
  where
    T: Into<Option<Effect>>,
  {
    let effect = match effect.into() {
      Some(effect) => effect,
      None => {
        log::debug!("ignoring empty enqueue");
        return Outcome::Ignored;
      }
    };

    let mut queue = self.queue.lock().await;
    self.place(&mut queue, effect)
  }

  /// Enqueues every action of `service` under a single lock, in action name order.
  pub async fn enqueue_service(&self, service: &Service) -> Vec<Outcome> {
    let mut actions = service.actions().iter().collect::<Vec<_>>();
    actions.sort_by(|(a, _), (b, _)| a.cmp(b));
    log::debug!("enqueuing {} actions of service '{}'", actions.len(), service.name());

    let mut queue = self.queue.lock().await;
    actions
      .into_iter()
      .map(|(_, effect)| self.place(&mut queue, effect.clone()))
      .collect()
  }

  /// The enqueue decision; callers hold the lock.
  fn place(&self, queue: &mut Queue, effect: Effect) -> Outcome {
    if effect.is_background() {
      log::debug!("replacing background effect");
      queue.background = Some(effect);
      return Outcome::Background;
    }

    let policy = effect.policy;

    match policy {
      QueuePolicy::AlwaysQueue => {
        queue.pending.push_back(effect);

        if queue.pending.len() == 1 && queue.idle {
          self.step(queue);
          return Outcome::Dispatched;
        }

        log::trace!("queued effect ({} pending)", queue.pending.len());
        Outcome::Queued
      }
      QueuePolicy::JumpQueue => {
        queue.idle = false;
        self.send(queue, effect);
        Outcome::Dispatched
      }
      QueuePolicy::RunIfFree if queue.idle => {
        queue.idle = false;
        self.send(queue, effect);
        Outcome::Dispatched
      }
      QueuePolicy::RunIfFree => {
        queue.dropped += 1;
        log::debug!("device busy, dropping '{}' effect ({} dropped)", effect.label(), queue.dropped);
        Outcome::Dropped
      }
    }
  }

  /// Dispatches the next pending effect, or the background when nothing is pending.
  pub async fn advance(&self) {
    let mut queue = self.queue.lock().await;
    self.step(&mut queue);
  }

  /// Handles a completion signal from the executor. Completions for anything other than the latest
  /// dispatch are ignored.
  pub async fn complete(&self, completion: Completion) -> bool {
    let mut queue = self.queue.lock().await;

    if completion.generation != queue.generation {
      log::debug!(
        "ignoring stale completion for generation {} (current {})",
        completion.generation,
        queue.generation
      );
      return false;
    }

    self.step(&mut queue);
    true
  }

  /// Empties the queue, drops the background override and puts the default background back on the
  /// device. Whatever was running before becomes stale.
  pub async fn reset(&self) {
    let mut queue = self.queue.lock().await;
    log::info!("resetting scheduler ({} pending discarded)", queue.pending.len());
    queue.pending.clear();
    queue.background = None;
    self.step(&mut queue);
  }

  /// Discards pending effects without touching the device.
  pub async fn clear_pending(&self) -> usize {
    let mut queue = self.queue.lock().await;
    let amount = queue.pending.len();
    queue.pending.clear();
    amount
  }

  pub async fn snapshot(&self) -> Snapshot {
    let queue = self.queue.lock().await;
    Snapshot {
      pending: queue.pending.len(),
      idle: queue.idle,
      generation: queue.generation,
      dropped: queue.dropped,
      background_override: queue.background.is_some(),
    }
  }

  /// Feeds executor completions back into the scheduler until the channel closes.
  pub async fn run(self, completions: Receiver<Completion>) -> Result<()> {
    log::debug!("scheduler listening for completions");

    while let Ok(completion) = completions.recv().await {
      self.complete(completion).await;
    }

    log::warn!("completion channel closed");
    Err(std::io::Error::new(std::io::ErrorKind::Other, "closed completion loop"))
  }

  /// The advance step; callers hold the lock.
  fn step(&self, queue: &mut Queue) {
    match queue.pending.pop_front() {
      Some(effect) => {
        queue.idle = false;
        self.send(queue, effect);
      }
      None => {
        queue.idle = true;
        let background = queue.background.clone().unwrap_or_else(|| queue.fallback.clone());
        self.send(queue, background);
      }
    }
  }

  fn send(&self, queue: &mut Queue, effect: Effect) {
    queue.generation += 1;
    log::debug!("dispatching '{}' effect (generation {})", effect.label(), queue.generation);

    let dispatch = Dispatch {
      generation: queue.generation,
      effect,
    };

    if let Err(error) = self.executor.dispatch(dispatch) {
      log::warn!("unable to dispatch effect - {error}");
    }
  }
}
