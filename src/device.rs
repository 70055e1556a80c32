use async_std::channel;
use async_std::stream::StreamExt;
use serde::Deserialize;
use std::io::{Result, Write};
use std::time::{Duration, Instant};

use crate::effects::Color;
use crate::scheduler::{Completion, Dispatch, Executor};

/// How long to wait between attempts at opening the serial port.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[allow(clippy::missing_docs_in_private_items)]
#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct DeviceConfiguration {
  /// The serial port of the led controller. Without one, frames are only logged.
  pub device: Option<String>,

  pub baud: u32,

  pub frame_interval_ms: Option<u64>,
}

impl Default for DeviceConfiguration {
  fn default() -> Self {
    Self {
      device: None,
      baud: 115200,
      frame_interval_ms: None,
    }
  }
}

impl DeviceConfiguration {
  fn frame_interval(&self) -> Duration {
    Duration::from_millis(self.frame_interval_ms.unwrap_or(20).max(1))
  }
}

/// The scheduler-facing half of the device; hands dispatches to the worker spawned with `run`.
#[derive(Clone)]
pub struct DeviceExecutor {
  sender: channel::Sender<Dispatch>,
}

impl DeviceExecutor {
  pub fn new(sender: channel::Sender<Dispatch>) -> Self {
    Self { sender }
  }
}

impl Executor for DeviceExecutor {
  fn dispatch(&self, dispatch: Dispatch) -> Result<()> {
    self
      .sender
      .try_send(dispatch)
      .map_err(|error| std::io::Error::new(std::io::ErrorKind::Other, error.to_string()))
  }
}

/// Attempts to open the configured serial port.
fn connect(configuration: &DeviceConfiguration) -> Option<Box<dyn serialport::SerialPort>> {
  let device = configuration.device.as_ref()?;
  log::info!("attempting to establish serial connection to led controller: {configuration:?}");

  serialport::new(device, configuration.baud)
    .open()
    .map_err(|error| {
      log::error!("unable to connect - {error}");
      error
    })
    .and_then(|mut port| {
      port.set_timeout(Duration::from_millis(10))?;
      Ok(port)
    })
    .ok()
}

/// The effect currently on the device.
struct Active {
  dispatch: Dispatch,
  started: Instant,

  /// The last color that actually reached the port.
  last_color: Option<Color>,
}

impl Active {
  fn new(dispatch: Dispatch) -> Self {
    Self {
      dispatch,
      started: Instant::now(),
      last_color: None,
    }
  }

  /// The frame to write `elapsed` into the effect, unless the device already shows it.
  fn frame(&self, elapsed: Duration) -> Option<Color> {
    let color = self.dispatch.effect.color_at(elapsed);
    Some(color).filter(|color| self.last_color != Some(*color))
  }

  fn shown(&mut self, color: Color) {
    self.last_color = Some(color);
  }

  /// A fresh connection knows nothing about what was written before it.
  fn forget(&mut self) {
    self.last_color = None;
  }
}

/// The device worker. Renders the latest dispatch every frame and reports completions once an
/// effect's duration has elapsed. A newer dispatch replaces the active one without completing it.
pub async fn run(
  configuration: DeviceConfiguration,
  dispatches: channel::Receiver<Dispatch>,
  completions: channel::Sender<Completion>,
) -> Result<()> {
  log::debug!("starting led device runtime");
  let mut timer = async_std::stream::interval(configuration.frame_interval());
  let mut connection = connect(&configuration);
  let mut last_attempt = Instant::now();
  let mut active: Option<Active> = None;

  loop {
    if connection.is_none()
      && configuration.device.is_some()
      && Instant::now().duration_since(last_attempt) > RECONNECT_DELAY
    {
      last_attempt = Instant::now();
      connection = connect(&configuration);

      if let (Some(_), Some(current)) = (connection.as_ref(), active.as_mut()) {
        current.forget();
      }
    }

    loop {
      match dispatches.try_recv() {
        Ok(dispatch) => {
          if let Some(previous) = active.as_ref() {
            log::trace!("generation {} superseded", previous.dispatch.generation);
          }

          active = Some(Active::new(dispatch));
        }
        Err(error) if error.is_closed() => {
          log::warn!("dispatch channel closed - {error}");
          return Err(std::io::Error::new(std::io::ErrorKind::Other, "closed device loop"));
        }
        Err(_) => break,
      }
    }

    let finished = match active.as_mut() {
      Some(current) => {
        let elapsed = current.started.elapsed();

        if let Some(color) = current.frame(elapsed) {
          connection = write_frame(connection.take(), color);

          if connection.is_some() {
            current.shown(color);
          }
        }

        current
          .dispatch
          .effect
          .duration()
          .filter(|duration| elapsed >= *duration)
          .map(|_| current.dispatch.generation)
      }
      None => None,
    };

    if let Some(generation) = finished {
      active = None;

      if let Err(error) = completions.send(Completion { generation }).await {
        log::warn!("unable to send completion - {error}");
        return Err(std::io::Error::new(std::io::ErrorKind::Other, error.to_string()));
      }
    }

    timer.next().await;
  }
}

/// Writes a single frame, dropping the connection if the write fails so the next tick reconnects.
fn write_frame(
  connection: Option<Box<dyn serialport::SerialPort>>,
  color: Color,
) -> Option<Box<dyn serialport::SerialPort>> {
  match connection {
    Some(mut con) => {
      log::trace!("writing frame '{color}'");

      if let Err(error) = writeln!(con, "{color}") {
        log::warn!("unable to write frame - {error}");
        return None;
      }

      Some(con)
    }

    None => {
      log::trace!("no serial connection, skipping frame '{color}'");
      None
    }
  }
}
