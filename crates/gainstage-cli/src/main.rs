mod logger;
mod process;
mod wav;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gainstage_engine::dsp::scale::{fixed_gain, FIXED_UNITY};
use gainstage_engine::{AudioFormat, ReplayGainData, SampleFormat, VolumeFilter, VolumeOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gainstage", version, about = "Volume / replaygain stage")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show how the stage resolves its gain
    Gain {
        #[command(flatten)]
        stage: StageArgs,
        /// Print the resolved options as a JSON document for `--config`
        #[arg(long)]
        dump_config: bool,
        /// Sample format of the input stream
        #[arg(long, value_enum, default_value_t = FormatArg::S16)]
        format: FormatArg,
        #[arg(long)]
        planar: bool,
        #[arg(long, default_value_t = 2)]
        channels: u16,
        #[arg(long, default_value_t = 48000)]
        rate: u32,
    },
    /// Run a WAV file through the stage
    Process {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        stage: StageArgs,
        /// Sample frames per processed block
        #[arg(long, default_value_t = 1024)]
        block: usize,
    },
    /// Play a WAV file through the stage; type `v <volume>` to change volume
    #[cfg(feature = "device")]
    Play {
        input: PathBuf,
        #[command(flatten)]
        stage: StageArgs,
        /// Output device (substring match)
        #[arg(long)]
        device: Option<String>,
    },
    /// List output devices
    #[cfg(feature = "device")]
    Devices,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    U8,
    S16,
    S32,
    Float,
    Double,
}

impl From<FormatArg> for SampleFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::U8 => SampleFormat::U8,
            FormatArg::S16 => SampleFormat::S16,
            FormatArg::S32 => SampleFormat::S32,
            FormatArg::Float => SampleFormat::Float,
            FormatArg::Double => SampleFormat::Double,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct StageArgs {
    /// Option string, e.g. `volumedb=-3:replaygain-track:softclip`
    #[arg(short, long)]
    options: Option<String>,
    /// JSON file with the same option names; `--options` is applied on top
    #[arg(long)]
    config: Option<PathBuf>,
    /// User volume (the stage applies volume^3)
    #[arg(long, default_value_t = 1.0)]
    volume: f32,
    #[arg(long, allow_hyphen_values = true)]
    track_gain: Option<f32>,
    #[arg(long)]
    track_peak: Option<f32>,
    #[arg(long, allow_hyphen_values = true)]
    album_gain: Option<f32>,
    #[arg(long)]
    album_peak: Option<f32>,
}

impl StageArgs {
    fn options(&self) -> Result<VolumeOptions> {
        let mut opts = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                VolumeOptions::from_json(&text)
                    .with_context(|| format!("invalid options in {}", path.display()))?
            }
            None => VolumeOptions::default(),
        };
        if let Some(s) = &self.options {
            opts.apply(s)?;
        }
        log::debug!("options: {opts}");
        Ok(opts)
    }

    /// Metadata from the command line; missing peaks default to 1.0.
    fn replaygain(&self) -> Option<ReplayGainData> {
        if self.track_gain.is_none() && self.album_gain.is_none() {
            return None;
        }
        Some(ReplayGainData {
            track_gain: self.track_gain.unwrap_or(0.0),
            track_peak: self.track_peak.unwrap_or(1.0),
            album_gain: self.album_gain.unwrap_or(0.0),
            album_peak: self.album_peak.unwrap_or(1.0),
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    match cli.cmd {
        Command::Gain { stage, dump_config, format, planar, channels, rate } => {
            if dump_config {
                println!("{}", stage.options()?.to_json()?);
                return Ok(());
            }
            let input = AudioFormat {
                sample: format.into(),
                planar,
                channels,
                rate,
            };
            show_gain(&stage, &input)
        }
        Command::Process { input, output, stage, block } => {
            let wav = wav::WavData::read(&input)?;
            let rendered =
                process::render(&wav, &stage.options()?, stage.volume, stage.replaygain(), block)?;
            rendered.output.write(&output)?;
            println!(
                "wrote {} samples to {}{}",
                rendered.output.samples.len(),
                output.display(),
                if rendered.detached { " (stage detached)" } else { "" }
            );
            Ok(())
        }
        #[cfg(feature = "device")]
        Command::Play { input, stage, device } => play(&input, &stage, device),
        #[cfg(feature = "device")]
        Command::Devices => gainstage_engine::devices::print_devices(),
    }
}

fn show_gain(stage: &StageArgs, input: &AudioFormat) -> Result<()> {
    let opts = stage.options()?;
    let mut filter = VolumeFilter::new(&opts);
    filter.set_volume(stage.volume);
    let n = filter.reinit(input, stage.replaygain().as_ref())?;

    let s = filter.state();
    let gain = filter.effective_gain();
    println!("volume          {}", s.user_volume);
    println!("level           {}", s.level);
    println!("replaygain      {} ({:?})", s.replay_gain, s.replay_gain_mode);
    println!("static gain     {} dB", s.static_gain_db);
    println!("effective gain  {gain}");
    println!("fixed-point     {}/{}", fixed_gain(gain), FIXED_UNITY);
    println!(
        "format          {:?} {}, {} ch @ {} Hz",
        n.format.repr,
        if n.format.planar { "planar" } else { "interleaved" },
        n.format.channels,
        n.format.rate
    );
    println!("detach          {}", if n.detach { "yes" } else { "no" });
    Ok(())
}

#[cfg(feature = "device")]
fn play(path: &std::path::Path, stage: &StageArgs, device: Option<String>) -> Result<()> {
    use gainstage_engine::player::{Player, PlayerConfig};
    use gainstage_engine::{Control, SharedFilter};
    use std::io::BufRead;
    use std::sync::mpsc;
    use std::time::Duration;

    let wav = wav::WavData::read(path)?;
    let filter = SharedFilter::new(VolumeFilter::new(&stage.options()?));
    filter.control(Control::SetVolume(stage.volume))?;

    let cfg = PlayerConfig {
        output_name: device,
        replaygain: stage.replaygain(),
    };
    let player = Player::start(
        &cfg,
        wav.samples.to_f32(),
        wav.spec.channels,
        wav.spec.sample_rate,
        filter,
    )?;
    if player.is_detached() {
        println!("stage is neutral and bypassed; a volume change brings it back");
    }
    println!("playing {} (`v <volume>` to change volume, `q` to stop)", path.display());

    let (tx, rx) = mpsc::channel::<String>();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines().map_while(|l| l.ok()) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    while !player.is_finished() {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(line) => {
                let line = line.trim();
                if line == "q" {
                    break;
                }
                match line.strip_prefix('v').map(str::trim).map(str::parse::<f32>) {
                    Some(Ok(vol)) => {
                        player.set_volume(vol)?;
                        println!(
                            "volume {vol} at {:.1}s{}",
                            player.elapsed(),
                            if player.is_detached() { " (bypassed)" } else { "" }
                        );
                    }
                    _ => println!("unrecognized command `{line}`"),
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                std::thread::sleep(Duration::from_millis(100));
            }
        }
    }
    Ok(())
}
