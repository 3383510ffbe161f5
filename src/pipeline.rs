//! Stage pipeline driver.
//!
//! Strictly sequential: normalize every part, strip its audio, plan the
//! layout, render each row, combine the rows, master, and optionally remux
//! an externally mastered soundtrack. Every artifact-producing stage skips
//! itself when its target is fresh, which is what makes a crashed or
//! partially completed render resumable by re-invocation.

use std::path::PathBuf;

use tracing::{error, info};

use crate::{
    artifact::ArtifactStore,
    config::RenderOptions,
    error::{ChoraleError, ChoraleResult},
    filter::{
        RowStream, combine_graph, master_graph, row::row_height, row_audio_graph, row_video_graph,
    },
    fingerprint::InputStamp,
    layout::plan_song,
    media::{EngineInput, EngineJob, MediaEngine, MediaProbe},
    model::{Recipe, Song, Track},
    pack::RectanglePacker,
    runbook::{RowKey, Runbook},
};

/// Frame rate every clip is normalized to.
pub const NORMALIZE_FPS: u32 = 25;

/// Intermediate resolution clips are scaled into during normalization.
pub const NORMALIZE_SCALE: &str = "640x480";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage submitted work to the media engine.
    Rendered,
    /// Target artifact already fresh; success by skip.
    Fresh,
    /// An optional input was absent (e.g. no externally mastered audio).
    SkippedMissingInput,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageKind {
    Normalize,
    StripAudio,
    RenderRow,
    CombineRows,
    PostProduction,
    RemasterAudio,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StagePolicy {
    Continue,
    Abort,
}

/// The driver's continuation decision table. A missing input (a source clip
/// that never arrived, a row whose member failed to normalize) skips its
/// unit of work, and the driver proceeds to whatever later work is
/// independent of it. Engine, probe, and validation failures abort the
/// song's remaining pipeline.
pub fn continuation(stage: StageKind, err: &ChoraleError) -> StagePolicy {
    match (stage, err) {
        (
            StageKind::Normalize
            | StageKind::StripAudio
            | StageKind::RenderRow
            | StageKind::CombineRows
            | StageKind::PostProduction
            | StageKind::RemasterAudio,
            ChoraleError::MissingInput(_),
        ) => StagePolicy::Continue,
        _ => StagePolicy::Abort,
    }
}

/// Resolves a stage result against the continuation table: skipped stages
/// collapse to `None`, aborting errors propagate.
fn guard(
    stage: StageKind,
    result: ChoraleResult<StageOutcome>,
) -> ChoraleResult<Option<StageOutcome>> {
    match result {
        Ok(outcome) => Ok(Some(outcome)),
        Err(err) if continuation(stage, &err) == StagePolicy::Continue => {
            error!(?stage, %err, "skipping stage");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

pub struct Pipeline<'a> {
    song: &'a Song,
    opts: RenderOptions,
    store: ArtifactStore,
    assets_dir: PathBuf,
    engine: &'a mut dyn MediaEngine,
    probe: &'a dyn MediaProbe,
    packer: &'a dyn RectanglePacker,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        song: &'a Song,
        opts: RenderOptions,
        store: ArtifactStore,
        assets_dir: impl Into<PathBuf>,
        engine: &'a mut dyn MediaEngine,
        probe: &'a dyn MediaProbe,
        packer: &'a dyn RectanglePacker,
    ) -> ChoraleResult<Self> {
        song.validate()?;
        opts.validate()?;
        Ok(Self {
            song,
            opts,
            store,
            assets_dir: assets_dir.into(),
            engine,
            probe,
            packer,
        })
    }

    /// Runs the whole pipeline for one song and returns the recipe it
    /// rendered from.
    #[tracing::instrument(skip(self), fields(song = %self.song.id))]
    pub fn run(&mut self) -> ChoraleResult<Recipe> {
        for track in &self.song.tracks {
            let result = self.normalize_track(track);
            guard(StageKind::Normalize, result)?;
            let result = self.strip_track(track);
            guard(StageKind::StripAudio, result)?;
        }

        let recipe = self.plan()?;
        info!(
            rows = recipe.runbook.rows.len(),
            rows_hash = %recipe.runbook.rows_hash,
            "layout planned"
        );

        for &row in &recipe.runbook.rows {
            let result = self.render_row(&recipe, row);
            guard(StageKind::RenderRow, result)?;
        }
        let result = self.combine_rows(&recipe);
        guard(StageKind::CombineRows, result)?;
        let result = self.post_production(&recipe);
        guard(StageKind::PostProduction, result)?;
        let result = self.remaster_audio(&recipe);
        guard(StageKind::RemasterAudio, result)?;
        Ok(recipe)
    }

    pub fn plan(&self) -> ChoraleResult<Recipe> {
        plan_song(self.song, &self.opts, self.packer)
    }

    /// Converts one raw clip into the uniform intermediate format: fixed
    /// frame rate and resolution, NUT container, PCM audio. Clips missing a
    /// video or audio stream get a synthesized black or silent source.
    pub fn normalize_track(&mut self, track: &Track) -> ChoraleResult<StageOutcome> {
        let source = self.require_source(track)?;
        let target = self.store.normalized_clip(&self.song.id, &track.part_id);

        let mut stamp = InputStamp::new();
        stamp.text("normalize").file(&source)?;
        stamp.u64(u64::from(NORMALIZE_FPS)).text(NORMALIZE_SCALE);
        let fingerprint = stamp.finish();
        if self.store.is_fresh(&target, &fingerprint) {
            info!(part = %track.part_id, "normalized clip already fresh");
            return Ok(StageOutcome::Fresh);
        }

        let streams = self.probe.probe(&source)?;
        info!(
            part = %track.part_id,
            has_video = streams.has_video,
            has_audio = streams.has_audio,
            "normalizing clip"
        );

        let mut job = EngineJob::new(&target);
        job.inputs.push(EngineInput::file(&source));
        if streams.has_video {
            job.video_filters = vec![
                format!("fps=fps={NORMALIZE_FPS}:round=up"),
                format!(
                    "scale={NORMALIZE_SCALE}:force_original_aspect_ratio=decrease:force_divisible_by=2"
                ),
            ];
        } else {
            job.inputs
                .push(EngineInput::lavfi("color=color=black:size=vga"));
        }
        if !streams.has_audio {
            job.inputs.push(EngineInput::lavfi("anullsrc"));
        }
        job.format = Some("nut".into());
        job.output_options = str_args(&[
            "-acodec",
            "pcm_f32le",
            "-vcodec",
            "libx264",
            "-preset",
            "slow",
            "-r",
            "25",
            "-ac",
            "2",
        ]);

        self.engine.submit(&job)?;
        self.store.commit(&target, &fingerprint)?;
        Ok(StageOutcome::Rendered)
    }

    /// Writes one part's audio as a standalone WAV, trimmed to its offset,
    /// for the external mastering workflow.
    pub fn strip_track(&mut self, track: &Track) -> ChoraleResult<StageOutcome> {
        let source = self.require_source(track)?;
        let target = self.store.stripped_audio(&self.song.id, &track.part_id);

        let mut stamp = InputStamp::new();
        stamp.text("strip_audio").file(&source)?;
        stamp.f64(track.offset);
        let fingerprint = stamp.finish();
        if self.store.is_fresh(&target, &fingerprint) {
            info!(part = %track.part_id, "stripped audio already fresh");
            return Ok(StageOutcome::Fresh);
        }

        info!(part = %track.part_id, "stripping audio");
        let mut job = EngineJob::new(&target);
        job.inputs.push(EngineInput::file(&source));
        job.no_video = true;
        job.audio_filters = vec![
            format!("atrim=start={}", track.offset_secs()),
            "asetpts=PTS-STARTPTS".to_string(),
        ];
        job.format = Some("wav".into());

        self.engine.submit(&job)?;
        self.store.commit(&target, &fingerprint)?;
        Ok(StageOutcome::Rendered)
    }

    /// Renders one row's composite from its members' normalized clips. The
    /// sentinel audio-only row carries no video stream at all.
    pub fn render_row(&mut self, recipe: &Recipe, row: RowKey) -> ChoraleResult<StageOutcome> {
        let members = recipe.runbook.slice(row);
        if members.is_empty() {
            return Err(ChoraleError::layout(format!("row {row} has no members")));
        }
        let target = self.store.row_composite(&recipe.song_id, row);
        let audio_only = Runbook::is_audio_only_row(row);

        let graph = if audio_only {
            row_audio_graph(members)
        } else {
            let height = row_height(members)
                .ok_or_else(|| ChoraleError::layout(format!("row {row} has no positioned members")))?;
            row_video_graph(members, self.opts.width, height).merge(row_audio_graph(members))
        };
        graph.validate()?;

        let mut stamp = InputStamp::new();
        stamp.text("render_row").text(&graph.to_filter_complex());
        let mut inputs = Vec::with_capacity(members.len());
        for member in members {
            let clip = self.store.normalized_clip(&recipe.song_id, &member.part_id);
            if !clip.exists() {
                return Err(ChoraleError::missing_input(clip));
            }
            stamp.file(&clip)?;
            inputs.push(EngineInput::file_with_options(
                clip,
                &["-r", "25", "-thread_queue_size", "64"],
            ));
        }
        let fingerprint = stamp.finish();
        if self.store.is_fresh(&target, &fingerprint) {
            info!(row, "row composite already fresh");
            return Ok(StageOutcome::Fresh);
        }

        info!(row, members = members.len(), audio_only, "rendering row");
        let mut job = EngineJob::new(&target);
        job.inputs = inputs;
        job.filtergraph = Some(graph);
        job.no_video = audio_only;
        job.format = Some("nut".into());
        job.output_options = if audio_only {
            str_args(&["-acodec", "pcm_s16le"])
        } else {
            row_composite_output_options()
        };

        self.engine.submit(&job)?;
        self.store.commit(&target, &fingerprint)?;
        Ok(StageOutcome::Rendered)
    }

    /// Stacks the row composites top-to-bottom and mixes their audio.
    pub fn combine_rows(&mut self, recipe: &Recipe) -> ChoraleResult<StageOutcome> {
        let target = self.store.final_composite(&recipe.song_id);

        let streams: Vec<RowStream> = recipe
            .runbook
            .rows
            .iter()
            .enumerate()
            .map(|(index, &row)| RowStream {
                index,
                audio_only: Runbook::is_audio_only_row(row),
            })
            .collect();
        let graph = combine_graph(&streams)?;

        let mut stamp = InputStamp::new();
        stamp.text("combine_rows").text(&graph.to_filter_complex());
        let mut inputs = Vec::with_capacity(recipe.runbook.rows.len());
        for &row in &recipe.runbook.rows {
            let composite = self.store.row_composite(&recipe.song_id, row);
            if !composite.exists() {
                return Err(ChoraleError::missing_input(composite));
            }
            stamp.file(&composite)?;
            inputs.push(EngineInput::file_with_options(
                composite,
                &["-thread_queue_size", "64"],
            ));
        }
        let fingerprint = stamp.finish();
        if self.store.is_fresh(&target, &fingerprint) {
            info!("final composite already fresh");
            return Ok(StageOutcome::Fresh);
        }

        info!(rows = recipe.runbook.rows.len(), "combining rows");
        let mut job = EngineJob::new(&target);
        job.inputs = inputs;
        job.filtergraph = Some(graph);
        job.format = Some("nut".into());
        job.output_options = row_composite_output_options();

        self.engine.submit(&job)?;
        self.store.commit(&target, &fingerprint)?;
        Ok(StageOutcome::Rendered)
    }

    /// Pads the composite onto the final canvas, overlays the watermark, and
    /// applies the impulse-response reverb.
    pub fn post_production(&mut self, recipe: &Recipe) -> ChoraleResult<StageOutcome> {
        let target = self.store.mastered(&recipe.song_id);
        let composite = self.store.final_composite(&recipe.song_id);
        let watermark = self.opts.watermark_path(&self.assets_dir);
        let impulse = self.opts.impulse_path(&self.assets_dir);
        for input in [&composite, &watermark, &impulse] {
            if !input.exists() {
                return Err(ChoraleError::missing_input(input.clone()));
            }
        }

        let graph = master_graph(self.opts.width, self.opts.height, self.opts.reverb);
        let mut stamp = InputStamp::new();
        stamp.text("post_production").text(&graph.to_filter_complex());
        stamp.file(&composite)?.file(&watermark)?.file(&impulse)?;
        let fingerprint = stamp.finish();
        if self.store.is_fresh(&target, &fingerprint) {
            info!("mastered output already fresh");
            return Ok(StageOutcome::Fresh);
        }

        info!(reverb_type = %self.opts.reverb_type, "post production");
        let mut job = EngineJob::new(&target);
        job.inputs = vec![
            EngineInput::file(&composite),
            EngineInput::file(&watermark),
            EngineInput::file(&impulse),
        ];
        job.filtergraph = Some(graph);
        job.format = Some("mp4".into());
        job.output_options = str_args(&[
            "-pix_fmt",
            "yuv420p",
            "-vcodec",
            "libx264",
            "-preset",
            "veryfast",
            "-movflags",
            "+faststart",
        ]);

        self.engine.submit(&job)?;
        self.store.commit(&target, &fingerprint)?;
        Ok(StageOutcome::Rendered)
    }

    /// Remuxes the mastered video with an externally mastered soundtrack,
    /// when one has been delivered. Its absence is not an error.
    pub fn remaster_audio(&mut self, recipe: &Recipe) -> ChoraleResult<StageOutcome> {
        let master_audio = self.store.master_audio(&recipe.song_id);
        if !master_audio.exists() {
            info!(path = %master_audio.display(), "no externally mastered audio, skipping remaster");
            return Ok(StageOutcome::SkippedMissingInput);
        }
        let mastered = self.store.mastered(&recipe.song_id);
        if !mastered.exists() {
            return Err(ChoraleError::missing_input(mastered));
        }
        let target = self.store.audio_remastered(&recipe.song_id);

        let mut stamp = InputStamp::new();
        stamp.text("remaster_audio");
        stamp.file(&mastered)?.file(&master_audio)?;
        let fingerprint = stamp.finish();
        if self.store.is_fresh(&target, &fingerprint) {
            info!("audio remaster already fresh");
            return Ok(StageOutcome::Fresh);
        }

        info!("remuxing externally mastered audio");
        let mut job = EngineJob::new(&target);
        job.inputs = vec![EngineInput::file(&mastered), EngineInput::file(&master_audio)];
        job.maps = vec!["0:v:0".into(), "1:a:0".into()];
        job.output_options = str_args(&["-c:v", "copy", "-c:a", "aac"]);

        self.engine.submit(&job)?;
        self.store.commit(&target, &fingerprint)?;
        Ok(StageOutcome::Rendered)
    }

    fn require_source(&self, track: &Track) -> ChoraleResult<PathBuf> {
        let source = match &track.key {
            Some(key) => self.store.root().join(key),
            None => self.store.source_clip(&self.song.id, &track.part_id),
        };
        if !source.exists() {
            return Err(ChoraleError::missing_input(source));
        }
        Ok(source)
    }
}

fn row_composite_output_options() -> Vec<String> {
    str_args(&[
        "-pix_fmt",
        "yuv420p",
        "-acodec",
        "pcm_s16le",
        "-vcodec",
        "mpeg2video",
        "-r",
        "25",
        "-qscale",
        "1",
        "-qmin",
        "1",
    ])
}

fn str_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
