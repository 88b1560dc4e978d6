use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use tree_particles::audio::{PlayerCommand, Silence, Soundtrack};
use tree_particles::state::RunOptions;
use tree_particles::tier::PerformanceTier;
use tree_particles::{CameraParams, Sampling, SnowParams, TreeParams};

/// Christmas tree particle effect: click to scatter, click again to gather
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
  /// Particle budget tier; probed from the display and GPU when omitted
  #[arg(short, long, value_enum)]
  tier: Option<PerformanceTier>,
  /// Number of snowflakes
  #[arg(long, default_value_t = 1000)]
  snow: usize,
  /// Seed for the particle layout
  #[arg(long)]
  seed: Option<u64>,
  /// How points are spread inside the tree and the scattered cloud
  #[arg(long, value_enum, default_value_t = Sampling::Original)]
  sampling: Sampling,
  /// Start with the envelope already open
  #[arg(long, default_value_t = false)]
  skip_intro: bool,
  /// Track played when the envelope opens
  #[arg(long)]
  audio: Option<PathBuf>,
  /// Player command line; the track path is appended
  #[arg(long, default_value = "ffplay -nodisp -autoexit -loglevel quiet")]
  audio_player: String,
  /// Run in headless mode (no window)
  #[arg(long, default_value_t = false)]
  headless: bool,
  /// Stop headless mode after this many frames
  #[arg(long)]
  frames: Option<u64>,
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Generate shell completion scripts
  Completions {
    /// The shell to generate the script for
    #[arg(value_enum)]
    shell: Shell,
  },
}

fn main() {
  let args = Args::parse();

  if let Some(Commands::Completions { shell }) = args.command {
    let mut cmd = Args::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    return;
  }

  let soundtrack: Box<dyn Soundtrack> = match &args.audio {
    Some(track) => match PlayerCommand::new(&args.audio_player, track) {
      Some(player) => Box::new(player),
      None => Box::new(Silence),
    },
    None => Box::new(Silence),
  };

  tree_particles::state::run(RunOptions {
    tier: args.tier,
    tree: TreeParams {
      sampling: args.sampling,
      ..Default::default()
    },
    snow: SnowParams {
      count: args.snow,
      ..Default::default()
    },
    camera: CameraParams::default(),
    seed: args.seed,
    skip_intro: args.skip_intro,
    soundtrack,
    headless: args.headless,
    frames: args.frames,
  });
}
