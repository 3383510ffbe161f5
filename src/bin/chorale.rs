use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

use chorale::{
    ArtifactStore, FfmpegEngine, FfprobeProbe, Pipeline, RenderOptions, ReverbType, ShelfPacker,
    Song, plan_song,
};

#[derive(Parser, Debug)]
#[command(name = "chorale", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the layout and write the render recipe as JSON.
    Plan(PlanArgs),
    /// Run the full render pipeline (requires `ffmpeg`/`ffprobe` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Input song JSON.
    #[arg(long = "song")]
    song_path: PathBuf,

    /// Output recipe JSON path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    overrides: OptionOverrides,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input song JSON.
    #[arg(long = "song")]
    song_path: PathBuf,

    /// Directory holding one subdirectory of clips and artifacts per song.
    #[arg(long, default_value = "videos")]
    media_root: PathBuf,

    /// Directory holding the watermark image and reverb impulse responses.
    #[arg(long, default_value = "assets")]
    assets_dir: PathBuf,

    #[command(flatten)]
    overrides: OptionOverrides,
}

/// Optional overrides for the configured render defaults.
#[derive(Args, Debug)]
struct OptionOverrides {
    /// Output canvas width.
    #[arg(long)]
    width: Option<u32>,

    /// Output canvas height.
    #[arg(long)]
    height: Option<u32>,

    /// Reverb wet level, 0..1.
    #[arg(long)]
    reverb: Option<f64>,

    /// Reverb character.
    #[arg(long, value_enum)]
    reverb_type: Option<ReverbChoice>,

    /// Disable per-tile stereo panning.
    #[arg(long)]
    no_panning: bool,

    /// Watermark image file name inside the assets directory.
    #[arg(long)]
    watermark: Option<String>,

    /// Packing margin between tiles, in pixels.
    #[arg(long)]
    margin: Option<u32>,

    /// Do not center the packed tiles on the canvas.
    #[arg(long)]
    no_center: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ReverbChoice {
    Hall,
    Church,
    Room,
    Plate,
}

impl From<ReverbChoice> for ReverbType {
    fn from(choice: ReverbChoice) -> Self {
        match choice {
            ReverbChoice::Hall => ReverbType::Hall,
            ReverbChoice::Church => ReverbType::Church,
            ReverbChoice::Room => ReverbType::Room,
            ReverbChoice::Plate => ReverbType::Plate,
        }
    }
}

impl OptionOverrides {
    fn apply(&self, mut opts: RenderOptions) -> RenderOptions {
        if let Some(width) = self.width {
            opts.width = width;
        }
        if let Some(height) = self.height {
            opts.height = height;
        }
        if let Some(reverb) = self.reverb {
            opts.reverb = reverb;
        }
        if let Some(kind) = self.reverb_type {
            opts.reverb_type = kind.into();
        }
        if self.no_panning {
            opts.panning = false;
        }
        if let Some(watermark) = &self.watermark {
            opts.watermark = watermark.clone();
        }
        if let Some(margin) = self.margin {
            opts.margin = margin;
        }
        if self.no_center {
            opts.center = false;
        }
        opts
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Plan(args) => cmd_plan(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn read_song(path: &Path) -> anyhow::Result<Song> {
    let f = File::open(path).with_context(|| format!("open song '{}'", path.display()))?;
    let r = BufReader::new(f);
    let song: Song = serde_json::from_reader(r).with_context(|| "parse song JSON")?;
    Ok(song)
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let song = read_song(&args.song_path)?;
    let opts = args.overrides.apply(RenderOptions::default());

    let recipe = plan_song(&song, &opts, &ShelfPacker)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let f = File::create(&args.out)
        .with_context(|| format!("create recipe '{}'", args.out.display()))?;
    serde_json::to_writer_pretty(f, &recipe).with_context(|| "serialize recipe JSON")?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let song = read_song(&args.song_path)?;
    let opts = args.overrides.apply(RenderOptions::default());

    let mut engine = FfmpegEngine::new()?;
    let probe = FfprobeProbe;
    let store = ArtifactStore::new(&args.media_root);
    let out = store.mastered(&song.id);

    let mut pipeline = Pipeline::new(
        &song,
        opts,
        store,
        &args.assets_dir,
        &mut engine,
        &probe,
        &ShelfPacker,
    )?;
    pipeline.run()?;

    eprintln!("wrote {}", out.display());
    Ok(())
}
