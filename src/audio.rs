use log::warn;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

/// Something that can start the intro music.
pub trait Soundtrack {
  fn play(&mut self) -> io::Result<()>;
}

/// No music.
#[derive(Debug, Default)]
pub struct Silence;

impl Soundtrack for Silence {
  fn play(&mut self) -> io::Result<()> {
    Ok(())
  }
}

/// Plays a track through an external player process. The process is
/// stopped and reaped when the player is stopped or dropped.
#[derive(Debug)]
pub struct PlayerCommand {
  program: String,
  args: Vec<String>,
  track: PathBuf,
  child: Option<Child>,
}

impl PlayerCommand {
  /// `player` is a whitespace separated command line; the track path is
  /// appended as the last argument.
  pub fn new(player: &str, track: impl Into<PathBuf>) -> Option<Self> {
    let mut words = player.split_whitespace().map(str::to_owned);
    let program = words.next()?;
    Some(Self {
      program,
      args: words.collect(),
      track: track.into(),
      child: None,
    })
  }

  pub fn program(&self) -> &str {
    &self.program
  }

  pub fn args(&self) -> &[String] {
    &self.args
  }

  /// OS id of the running player, if one was started.
  pub fn pid(&self) -> Option<u32> {
    self.child.as_ref().map(Child::id)
  }

  /// Kill the player if it is still running and wait for it to exit.
  pub fn stop(&mut self) {
    let Some(mut child) = self.child.take() else {
      return;
    };
    match child.try_wait() {
      Ok(Some(_)) => return,
      Ok(None) => {}
      Err(err) => warn!("could not poll audio player {}: {err}", child.id()),
    }
    if let Err(err) = child.kill() {
      warn!("could not kill audio player {}: {err}", child.id());
    }
    if let Err(err) = child.wait() {
      warn!("could not reap audio player {}: {err}", child.id());
    }
  }
}

impl Drop for PlayerCommand {
  fn drop(&mut self) {
    self.stop();
  }
}

impl Soundtrack for PlayerCommand {
  fn play(&mut self) -> io::Result<()> {
    if !self.track.is_file() {
      return Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no audio file at {}", self.track.display()),
      ));
    }
    self.stop();
    let child = Command::new(&self.program)
      .args(&self.args)
      .arg(&self.track)
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .spawn()?;
    self.child = Some(child);
    Ok(())
  }
}
