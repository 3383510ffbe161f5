//! Layout engine: turns a song's tracks into positioned, panned inputs.

use std::collections::BTreeMap;

use crate::{
    config::RenderOptions,
    error::{ChoraleError, ChoraleResult},
    model::{OutputSpec, PositionedInput, Recipe, Song, Track},
    pack::{Container, Rect, RectanglePacker},
    runbook::Runbook,
};

/// Ordering key for packing input: the part id with its characters reversed.
///
/// Part ids are monotonic timestamps, so their leading digits encode recording
/// order. Reversing the string puts the fast-moving trailing digits first,
/// decorrelating the visual layout from when each part was recorded while
/// keeping the ordering fully deterministic for a fixed input set.
pub fn shuffle_key(id: &str) -> String {
    id.chars().rev().collect()
}

/// Computes the deterministic tile placement and per-track stereo pan.
///
/// Visible tracks become rectangles, are ordered by [`shuffle_key`], packed,
/// and merged back by id; hidden tracks are appended unpositioned. Pan is
/// derived from the tile's horizontal center only when panning is enabled.
pub fn layout_song(
    song: &Song,
    opts: &RenderOptions,
    packer: &dyn RectanglePacker,
) -> ChoraleResult<Vec<PositionedInput>> {
    let by_id: BTreeMap<&str, &Track> = song
        .tracks
        .iter()
        .map(|t| (t.part_id.as_str(), t))
        .collect();

    let mut rects: Vec<Rect> = song
        .tracks
        .iter()
        .filter(|t| !t.hidden)
        .map(|t| Rect {
            id: t.part_id.clone(),
            width: t.tile_width(),
            height: t.tile_height(),
            volume: t.volume,
        })
        .collect();
    if rects.is_empty() {
        return Err(ChoraleError::validation(format!(
            "song '{}' has no visible tracks",
            song.id
        )));
    }
    rects.sort_by(|a, b| shuffle_key(&a.id).cmp(&shuffle_key(&b.id)));

    let container = Container {
        width: opts.width,
        height: opts.height,
    };
    let packed = packer.pack(&rects, container, opts.margin, opts.center);

    let mut inputs = Vec::with_capacity(song.tracks.len());
    for rect in packed {
        let track = by_id
            .get(rect.id.as_str())
            .ok_or_else(|| ChoraleError::layout(format!("packer returned unknown id '{}'", rect.id)))?;
        let pan = opts.panning.then(|| {
            2.0 * ((rect.x + f64::from(rect.width) / 2.0) / f64::from(opts.width)) - 1.0
        });
        inputs.push(PositionedInput {
            part_id: rect.id.clone(),
            size: [rect.width, rect.height],
            volume: rect.volume,
            offset: track.offset,
            position: Some([rect.x.floor() as i64, rect.y.floor() as i64]),
            pan,
        });
    }

    for track in song.tracks.iter().filter(|t| t.hidden) {
        inputs.push(PositionedInput {
            part_id: track.part_id.clone(),
            size: [track.tile_width(), track.tile_height()],
            volume: track.volume,
            offset: track.offset,
            position: None,
            pan: None,
        });
    }

    Ok(inputs)
}

/// Builds the full render plan: layout, row grouping, and echoed output spec.
pub fn plan_song(
    song: &Song,
    opts: &RenderOptions,
    packer: &dyn RectanglePacker,
) -> ChoraleResult<Recipe> {
    song.validate()?;
    opts.validate()?;
    let inputs = layout_song(song, opts, packer)?;
    let runbook = Runbook::build(&inputs);
    Ok(Recipe {
        song_id: song.id.clone(),
        output: OutputSpec::from(opts),
        inputs,
        runbook,
    })
}
