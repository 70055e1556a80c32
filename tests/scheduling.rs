use std::sync::{Arc, Mutex};
use std::time::Duration;

use ledhub::effects::{Color, Effect, QueuePolicy};
use ledhub::scheduler::{Completion, Dispatch, Executor, Outcome, Scheduler};

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Dispatch>>>);

impl Executor for Recorder {
  fn dispatch(&self, dispatch: Dispatch) -> std::io::Result<()> {
    self.0.lock().unwrap().push(dispatch);
    Ok(())
  }
}

impl Recorder {
  fn last(&self) -> Dispatch {
    self.0.lock().unwrap().last().cloned().unwrap()
  }
}

fn numbered(index: u8) -> Effect {
  Effect::solid(Color::new(index, 0, 0), Duration::from_millis(1), QueuePolicy::AlwaysQueue)
}

#[async_std::test]
async fn concurrent_producers_never_lose_or_duplicate_work() {
  let recorder = Recorder::default();
  let scheduler = Scheduler::new(recorder.clone(), Effect::background(Color::gray(1)));
  scheduler.start().await;

  // occupy the device so every producer's effect lands in the queue
  scheduler
    .enqueue(Effect::solid(Color::gray(2), Duration::from_secs(1), QueuePolicy::JumpQueue))
    .await;

  let producers = (0..32u8)
    .map(|index| {
      let scheduler = scheduler.clone();
      async_std::task::spawn(async move { scheduler.enqueue(numbered(index)).await })
    })
    .collect::<Vec<_>>();

  for producer in producers {
    assert_eq!(producer.await, Outcome::Queued);
  }

  assert_eq!(scheduler.snapshot().await.pending, 32);

  let mut seen = Vec::with_capacity(32);
  for _ in 0..32 {
    let generation = recorder.last().generation;
    assert!(scheduler.complete(Completion { generation }).await);
    seen.push(recorder.last().effect);
  }

  let mut reds = seen
    .iter()
    .map(|effect| effect.color_at(Duration::ZERO).red)
    .collect::<Vec<u8>>();
  reds.sort_unstable();
  assert_eq!(reds, (0..32u8).collect::<Vec<u8>>());

  let generation = recorder.last().generation;
  scheduler.complete(Completion { generation }).await;
  assert!(scheduler.snapshot().await.idle);
}

#[async_std::test]
async fn queue_order_follows_arrival_order() {
  let recorder = Recorder::default();
  let scheduler = Scheduler::new(recorder.clone(), Effect::background(Color::gray(1)));
  scheduler.start().await;
  scheduler
    .enqueue(Effect::solid(Color::gray(2), Duration::from_secs(1), QueuePolicy::JumpQueue))
    .await;

  // every producer is spawned up front, then released one at a time in a scrambled order
  let arrival = [5u8, 2, 7, 0, 3, 6, 1, 4];
  let (outcomes_tx, outcomes_rx) = async_std::channel::unbounded();
  let gates = (0..8u8)
    .map(|index| {
      let (gate_tx, gate_rx) = async_std::channel::bounded::<()>(1);
      let scheduler = scheduler.clone();
      let outcomes = outcomes_tx.clone();
      async_std::task::spawn(async move {
        if gate_rx.recv().await.is_ok() {
          let outcome = scheduler.enqueue(numbered(index)).await;
          outcomes.send(outcome).await.unwrap();
        }
      });
      gate_tx
    })
    .collect::<Vec<_>>();

  for index in arrival {
    gates[index as usize].send(()).await.unwrap();
    assert_eq!(outcomes_rx.recv().await.unwrap(), Outcome::Queued);
  }

  let mut drained = Vec::with_capacity(arrival.len());
  for _ in 0..arrival.len() {
    let generation = recorder.last().generation;
    assert!(scheduler.complete(Completion { generation }).await);
    drained.push(recorder.last().effect.color_at(Duration::ZERO).red);
  }

  assert_eq!(drained, arrival.to_vec());
}

#[async_std::test]
async fn jumped_effect_completion_resumes_the_queue() {
  let recorder = Recorder::default();
  let scheduler = Scheduler::new(recorder.clone(), Effect::background(Color::gray(1)));
  scheduler.start().await;

  scheduler.enqueue(numbered(1)).await;
  scheduler.enqueue(numbered(2)).await;
  scheduler
    .enqueue(Effect::solid(Color::gray(9), Duration::from_millis(1), QueuePolicy::JumpQueue))
    .await;

  let generation = recorder.last().generation;
  scheduler.complete(Completion { generation }).await;
  assert_eq!(recorder.last().effect, numbered(2));
  assert_eq!(scheduler.snapshot().await.pending, 0);
}

#[async_std::test]
async fn device_worker_drives_the_scheduler_back_to_idle() {
  let (dispatch_tx, dispatch_rx) = async_std::channel::unbounded();
  let (completion_tx, completion_rx) = async_std::channel::unbounded();
  let configuration = ledhub::device::DeviceConfiguration {
    frame_interval_ms: Some(1),
    ..Default::default()
  };

  let scheduler = Scheduler::new(
    ledhub::device::DeviceExecutor::new(dispatch_tx),
    Effect::background(Color::gray(1)),
  );
  let _device = async_std::task::spawn(ledhub::device::run(configuration, dispatch_rx, completion_tx));
  let _loop = async_std::task::spawn(scheduler.clone().run(completion_rx));
  scheduler.start().await;

  scheduler.enqueue(numbered(1)).await;
  scheduler.enqueue(numbered(2)).await;
  scheduler.enqueue(numbered(3)).await;

  let mut waited = Duration::ZERO;
  while !scheduler.snapshot().await.idle && waited < Duration::from_secs(2) {
    async_std::task::sleep(Duration::from_millis(5)).await;
    waited += Duration::from_millis(5);
  }

  let snapshot = scheduler.snapshot().await;
  assert!(snapshot.idle);
  assert_eq!(snapshot.pending, 0);
  assert_eq!(snapshot.generation, 5);
}
