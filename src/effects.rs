use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single rgb value, written to the device as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Color {
  /// Red channel.
  pub red: u8,

  /// Green channel.
  pub green: u8,

  /// Blue channel.
  pub blue: u8,
}

impl Color {
  /// Builds a color from its three channels.
  pub const fn new(red: u8, green: u8, blue: u8) -> Self {
    Self { red, green, blue }
  }

  /// The same value on every channel; used for the "flashed" white-out.
  pub const fn gray(level: u8) -> Self {
    Self::new(level, level, level)
  }

  /// Linear interpolation between two colors, `step` out of `total`.
  fn lerp(from: Color, to: Color, step: u128, total: u128) -> Color {
    let channel = |a: u8, b: u8| -> u8 {
      if total == 0 {
        return b;
      }
      let (a, b) = (a as i128, b as i128);
      let step = step.min(total) as i128;
      (a + (b - a) * step / total as i128) as u8
    };

    Color::new(
      channel(from.red, to.red),
      channel(from.green, to.green),
      channel(from.blue, to.blue),
    )
  }

  /// Scales every channel by `numerator / 255`.
  fn scale(self, numerator: u8) -> Color {
    let channel = |c: u8| ((c as u16 * numerator as u16) / 255) as u8;
    Color::new(channel(self.red), channel(self.green), channel(self.blue))
  }
}

impl std::fmt::Display for Color {
  fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(formatter, "{} {} {}", self.red, self.green, self.blue)
  }
}

/// Determines what the scheduler does with a non-background effect when it is enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePolicy {
  /// Wait behind everything already pending.
  #[default]
  AlwaysQueue,

  /// Skip the queue and replace whatever is currently on the device.
  JumpQueue,

  /// Replace the background effect if it is showing, otherwise drop the effect.
  RunIfFree,
}

/// The kind-specific payload of an effect.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectKind {
  /// Hold a single color.
  Static {
    /// The color to hold.
    color: Color,

    /// How long the color is held.
    duration_ms: u64,
  },

  /// Alternate between two colors.
  Blink {
    /// First half of each interval.
    on: Color,

    /// Second half of each interval.
    #[serde(default)]
    off: Color,

    /// The length of one on/off cycle.
    interval_ms: u64,

    /// Total running time.
    duration_ms: u64,
  },

  /// Linear transition between two colors.
  Fade {
    /// Starting color.
    from: Color,

    /// Final color, reached once the duration elapses.
    to: Color,

    /// Transition time.
    duration_ms: u64,
  },

  /// The idle effect. Runs until something replaces it.
  Background {
    /// The base color.
    color: Color,

    /// When present, the brightness slowly pulses with this period.
    #[serde(default)]
    breathe_ms: Option<u64>,
  },
}

/// One schedulable lighting action.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Effect {
  /// What gets rendered.
  #[serde(flatten)]
  pub kind: EffectKind,

  /// Ignored for background effects.
  #[serde(default)]
  pub policy: QueuePolicy,
}

impl Effect {
  pub fn new(kind: EffectKind, policy: QueuePolicy) -> Self {
    Self { kind, policy }
  }

  /// A solid color held for `duration`.
  pub fn solid(color: Color, duration: Duration, policy: QueuePolicy) -> Self {
    let duration_ms = duration.as_millis() as u64;
    Self::new(EffectKind::Static { color, duration_ms }, policy)
  }

  /// A non-breathing background effect.
  pub fn background(color: Color) -> Self {
    Self::new(EffectKind::Background { color, breathe_ms: None }, QueuePolicy::default())
  }

  pub fn is_background(&self) -> bool {
    matches!(self.kind, EffectKind::Background { .. })
  }

  /// The time this effect occupies the device before it is considered finished; `None` for
  /// background effects, which have no natural end.
  pub fn duration(&self) -> Option<Duration> {
    match self.kind {
      EffectKind::Static { duration_ms, .. }
      | EffectKind::Blink { duration_ms, .. }
      | EffectKind::Fade { duration_ms, .. } => Some(Duration::from_millis(duration_ms)),
      EffectKind::Background { .. } => None,
    }
  }

  /// The color that should be on the device `elapsed` after this effect was dispatched.
  pub fn color_at(&self, elapsed: Duration) -> Color {
    let millis = elapsed.as_millis();

    match self.kind {
      EffectKind::Static { color, .. } => color,
      EffectKind::Blink { on, off, interval_ms, .. } => {
        if interval_ms == 0 {
          return on;
        }
        let position = millis % interval_ms as u128;
        if position < (interval_ms as u128) / 2 {
          on
        } else {
          off
        }
      }
      EffectKind::Fade { from, to, duration_ms } => Color::lerp(from, to, millis, duration_ms as u128),
      EffectKind::Background { color, breathe_ms: None } => color,
      EffectKind::Background { color, breathe_ms: Some(period) } => {
        if period == 0 {
          return color;
        }
        // triangle wave between 20% and 100% brightness
        let period = period as u128;
        let position = millis % period;
        let half = (period / 2).max(1);
        let distance = if position < half { half - position } else { position - half };
        let level = 51 + (204 * distance / half) as u8;
        color.scale(level)
      }
    }
  }

  /// A short, human readable label for logs and snapshots.
  pub fn label(&self) -> &'static str {
    match self.kind {
      EffectKind::Static { .. } => "static",
      EffectKind::Blink { .. } => "blink",
      EffectKind::Fade { .. } => "fade",
      EffectKind::Background { .. } => "background",
    }
  }
}
