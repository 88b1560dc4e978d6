use crate::audio::Soundtrack;
use crate::tween::Easing;
use log::{info, warn};
use std::time::Duration;

const REVEAL_DELAY: Duration = Duration::from_millis(400);
const FADE_IN: Duration = Duration::from_millis(800);
/// Radians per second of the sealed envelope's breathing.
const PULSE_RATE: f32 = 3.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Envelope {
  Sealed,
  Opened { at: Duration },
  Revealed,
}

/// The envelope that hides the scene until the first activation.
#[derive(Copy, Clone, Debug)]
pub struct Intro {
  envelope: Envelope,
}

impl Intro {
  pub fn sealed() -> Self {
    Self {
      envelope: Envelope::Sealed,
    }
  }

  pub fn revealed() -> Self {
    Self {
      envelope: Envelope::Revealed,
    }
  }

  pub fn is_open(&self) -> bool {
    self.envelope != Envelope::Sealed
  }

  /// The envelope is gone once the fade has finished; until then it keeps
  /// catching activations.
  pub fn is_interactive(&self, now: Duration) -> bool {
    match self.envelope {
      Envelope::Sealed => false,
      Envelope::Revealed => true,
      Envelope::Opened { at } => now.saturating_sub(at) >= REVEAL_DELAY + FADE_IN,
    }
  }

  /// Open the envelope and start the music. Audio failures are logged and
  /// otherwise ignored. Returns false if it was already open.
  pub fn open(&mut self, now: Duration, soundtrack: &mut dyn Soundtrack) -> bool {
    if self.is_open() {
      return false;
    }
    if let Err(err) = soundtrack.play() {
      warn!("Audio play failed: {err}");
    }
    info!("envelope opened");
    self.envelope = Envelope::Opened { at: now };
    true
  }

  /// Scene opacity: hidden while sealed, then an ease-out fade after a short
  /// delay for the envelope animation.
  pub fn opacity(&self, now: Duration) -> f32 {
    match self.envelope {
      Envelope::Sealed => 0.0,
      Envelope::Revealed => 1.0,
      Envelope::Opened { at } => {
        let since = now.saturating_sub(at);
        if since < REVEAL_DELAY {
          return 0.0;
        }
        let k = (since - REVEAL_DELAY).as_secs_f32() / FADE_IN.as_secs_f32();
        Easing::QuadraticOut.apply(k)
      }
    }
  }

  /// The envelope card fades out exactly as the scene fades in.
  pub fn envelope_opacity(&self, now: Duration) -> f32 {
    1.0 - self.opacity(now)
  }

  /// Envelope size multiplier: a slow pulse while it waits for a click,
  /// then a swell while it opens.
  pub fn envelope_scale(&self, now: Duration) -> f32 {
    match self.envelope {
      Envelope::Sealed => 1.0 + 0.05 * (now.as_secs_f32() * PULSE_RATE).sin(),
      Envelope::Revealed => 1.0,
      Envelope::Opened { at } => {
        let k = now.saturating_sub(at).as_secs_f32() / (REVEAL_DELAY + FADE_IN).as_secs_f32();
        1.0 + 0.2 * Easing::QuadraticOut.apply(k)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::audio::Silence;
  use std::io;

  struct Broken(usize);

  impl Soundtrack for Broken {
    fn play(&mut self) -> io::Result<()> {
      self.0 += 1;
      Err(io::Error::new(io::ErrorKind::Other, "autoplay blocked"))
    }
  }

  fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
  }

  #[test]
  fn fades_in_after_the_delay() {
    let mut intro = Intro::sealed();
    assert_eq!(intro.opacity(ms(5000)), 0.0);
    assert!(intro.open(ms(1000), &mut Silence));
    assert_eq!(intro.opacity(ms(1000)), 0.0);
    assert_eq!(intro.opacity(ms(1399)), 0.0);
    let mid = intro.opacity(ms(1800));
    assert!(mid > 0.5 && mid < 1.0);
    assert_eq!(intro.opacity(ms(2200)), 1.0);
    assert_eq!(intro.opacity(ms(9000)), 1.0);
  }

  #[test]
  fn envelope_blocks_input_until_gone() {
    let mut intro = Intro::sealed();
    assert!(!intro.is_interactive(ms(0)));
    intro.open(ms(100), &mut Silence);
    assert!(!intro.is_interactive(ms(1299)));
    assert!(intro.is_interactive(ms(1300)));
    assert!(Intro::revealed().is_interactive(ms(0)));
  }

  #[test]
  fn audio_failure_still_reveals() {
    let mut intro = Intro::sealed();
    let mut broken = Broken(0);
    assert!(intro.open(ms(0), &mut broken));
    assert!(!intro.open(ms(10), &mut broken));
    assert_eq!(broken.0, 1);
    assert_eq!(intro.opacity(ms(1200)), 1.0);
  }

  #[test]
  fn envelope_fades_out_over_the_reveal() {
    let mut intro = Intro::sealed();
    assert_eq!(intro.envelope_opacity(ms(0)), 1.0);
    assert_eq!(intro.envelope_opacity(ms(60_000)), 1.0);

    intro.open(ms(1000), &mut Silence);
    assert_eq!(intro.envelope_opacity(ms(1399)), 1.0);
    let mid = intro.envelope_opacity(ms(1800));
    assert!(mid > 0.0 && mid < 0.5);
    assert_eq!(intro.envelope_opacity(ms(2200)), 0.0);
    assert_eq!(Intro::revealed().envelope_opacity(ms(0)), 0.0);
  }

  #[test]
  fn sealed_envelope_pulses_then_swells() {
    let mut intro = Intro::sealed();
    let sizes: Vec<f32> = (0..40).map(|i| intro.envelope_scale(ms(i * 50))).collect();
    assert!(sizes.iter().all(|s| (0.94..=1.06).contains(s)));
    let (lo, hi) = sizes
      .iter()
      .fold((f32::MAX, f32::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    assert!(hi - lo > 0.05);

    intro.open(ms(2000), &mut Silence);
    assert_eq!(intro.envelope_scale(ms(2000)), 1.0);
    assert!(intro.envelope_scale(ms(2600)) > 1.1);
    assert!((intro.envelope_scale(ms(3200)) - 1.2).abs() < 1e-6);
  }

  #[test]
  fn skipped_intro_is_visible() {
    let mut intro = Intro::revealed();
    assert!(intro.is_open());
    assert_eq!(intro.opacity(Duration::ZERO), 1.0);
    assert!(!intro.open(ms(0), &mut Silence));
  }
}
