//! Per-row filter graph generators.
//!
//! Each row of tiles is rendered as one engine job whose inputs are the
//! members' normalized clips, indexed in slice order. Both generators are
//! pure: they only translate positioned inputs into graph nodes.

use crate::{
    filter::graph::{FilterGraph, FilterNode},
    model::PositionedInput,
};

/// Vertical gap between stacked rows, added to every row's canvas height.
pub const ROW_MARGIN_PX: i64 = 10;

/// Sample rate of the synthesized silence used for rows with no audible part.
pub const SILENCE_SAMPLE_RATE: u32 = 44_100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub top: i64,
    pub bottom: i64,
}

/// Vertical extent of a row's tiles. Heights are rounded down to even, which
/// is what the scale filter actually emits.
pub fn bounding_box(members: &[PositionedInput]) -> Option<BoundingBox> {
    let mut bbox: Option<BoundingBox> = None;
    for member in members {
        let Some(position) = member.position else {
            continue;
        };
        let y = position[1];
        let bottom = y + member.even_height();
        bbox = Some(match bbox {
            None => BoundingBox { top: y, bottom },
            Some(b) => BoundingBox {
                top: b.top.min(y),
                bottom: b.bottom.max(bottom),
            },
        });
    }
    bbox
}

/// Output canvas height for a row: bounding box plus the inter-row margin.
pub fn row_height(members: &[PositionedInput]) -> Option<i64> {
    bounding_box(members).map(|b| b.bottom - b.top + ROW_MARGIN_PX)
}

/// xstack layout string: absolute x offsets, all members on the shared base
/// line, e.g. `0_0|640_0`.
pub fn calc_layout(members: &[PositionedInput]) -> String {
    members
        .iter()
        .filter_map(|m| m.position)
        .map(|p| format!("{}_0", p[0]))
        .collect::<Vec<_>>()
        .join("|")
}

/// Video pipeline for one row: per tile trim → reset timestamps → scale,
/// then either pad a lone tile at its own placement or xstack the tiles and
/// pad the stack to the row canvas. Output label `e0`.
pub fn row_video_graph(
    members: &[PositionedInput],
    out_width: u32,
    out_height: i64,
) -> FilterGraph {
    let mut graph = FilterGraph::new();
    for (i, member) in members.iter().enumerate() {
        graph
            .push(
                FilterNode::new("trim")
                    .input(format!("{i}:v"))
                    .opt("start", member.offset_secs())
                    .output(format!("a{i}")),
            )
            .push(
                FilterNode::new("setpts")
                    .input(format!("a{i}"))
                    .raw_options("PTS-STARTPTS")
                    .output(format!("b{i}")),
            )
            .push(
                FilterNode::new("scale")
                    .input(format!("b{i}"))
                    .opt("width", member.size[0])
                    .opt("height", member.size[1])
                    .opt("force_original_aspect_ratio", "decrease")
                    .opt("force_divisible_by", 2)
                    .output(format!("c{i}")),
            );
    }

    if members.len() == 1 {
        let position = members[0].position.unwrap_or([0, 0]);
        graph.push(
            FilterNode::new("pad")
                .input("c0")
                .opt("width", out_width)
                .opt("height", out_height)
                .opt("x", position[0])
                .opt("y", position[1])
                .output("e0"),
        );
    } else {
        graph
            .push(
                FilterNode::new("xstack")
                    .inputs((0..members.len()).map(|i| format!("c{i}")))
                    .opt("inputs", members.len())
                    .opt("fill", "black")
                    .opt("layout", calc_layout(members))
                    .output("d0"),
            )
            .push(
                FilterNode::new("pad")
                    .input("d0")
                    .opt("width", out_width)
                    .opt("height", out_height)
                    .output("e0"),
            );
    }

    graph.declare_output("e0");
    graph
}

/// Audio pipeline for one row: per audible tile atrim → reset timestamps →
/// volume → stereo pan. No audible tiles synthesizes one second of silence;
/// a single audible tile passes through an identity volume stage so the
/// graph shape stays uniform; multiple tiles mix with a long dropout
/// transition so a stream ending early does not pop. Output label `q0`.
pub fn row_audio_graph(members: &[PositionedInput]) -> FilterGraph {
    let mut graph = FilterGraph::new();
    let mut audible: Vec<usize> = Vec::new();
    for (i, member) in members.iter().enumerate() {
        if member.volume <= 0.0 {
            continue;
        }
        audible.push(i);
        graph
            .push(
                FilterNode::new("atrim")
                    .input(format!("{i}:a"))
                    .opt("start", member.offset_secs())
                    .output(format!("m{i}")),
            )
            .push(
                FilterNode::new("asetpts")
                    .input(format!("m{i}"))
                    .raw_options("PTS-STARTPTS")
                    .output(format!("n{i}")),
            )
            .push(
                // The engine wants the volume as a string; a bare numeric 0
                // misparses.
                FilterNode::new("volume")
                    .input(format!("n{i}"))
                    .raw_options(member.volume.to_string())
                    .output(format!("o{i}")),
            )
            .push(
                FilterNode::new("stereotools")
                    .input(format!("o{i}"))
                    .opt("mpan", member.pan.unwrap_or(0.0))
                    .output(format!("p{i}")),
            );
    }

    if audible.is_empty() {
        // Nothing to mix: synthesize silence so downstream stages never see
        // an empty audio stream. Duration must be explicit, otherwise the
        // source is infinite.
        graph.push(
            FilterNode::new("anullsrc")
                .opt("channel_layout", "stereo")
                .opt("sample_rate", SILENCE_SAMPLE_RATE)
                .opt("duration", 1)
                .output("q0"),
        );
    } else if audible.len() == 1 {
        graph.push(
            FilterNode::new("volume")
                .input(format!("p{}", audible[0]))
                .raw_options("1")
                .output("q0"),
        );
    } else {
        graph.push(
            FilterNode::new("amix")
                .inputs(audible.iter().map(|i| format!("p{i}")))
                .opt("inputs", audible.len())
                .opt("dropout_transition", 180)
                .output("q0"),
        );
    }

    graph.declare_output("q0");
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(
        id: &str,
        offset_ms: f64,
        volume: f64,
        position: Option<[i64; 2]>,
        pan: Option<f64>,
    ) -> PositionedInput {
        PositionedInput {
            part_id: id.to_string(),
            size: [640, 480],
            volume,
            offset: offset_ms,
            position,
            pan,
        }
    }

    #[test]
    fn bounding_box_uses_even_heights() {
        let members = vec![
            PositionedInput {
                size: [640, 481],
                ..member("a", 0.0, 1.0, Some([0, 20]), None)
            },
            member("b", 0.0, 1.0, Some([640, 0]), None),
        ];
        let bbox = bounding_box(&members).unwrap();
        assert_eq!(bbox.top, 0);
        // 481 rounds down to 480.
        assert_eq!(bbox.bottom, 500);
        assert_eq!(row_height(&members), Some(510));
    }

    #[test]
    fn single_tile_row_pads_at_its_own_position() {
        let members = vec![member("a", 1500.0, 1.0, Some([320, 40]), None)];
        let graph = row_video_graph(&members, 1920, 530);
        graph.validate().unwrap();
        assert_eq!(
            graph.to_filter_complex(),
            "[0:v]trim=start=1.5[a0];\
             [a0]setpts=PTS-STARTPTS[b0];\
             [b0]scale=width=640:height=480:force_original_aspect_ratio=decrease:force_divisible_by=2[c0];\
             [c0]pad=width=1920:height=530:x=320:y=40[e0]"
        );
        assert_eq!(graph.outputs, vec!["e0"]);
    }

    #[test]
    fn multi_tile_row_stacks_then_pads() {
        let members = vec![
            member("a", 0.0, 1.0, Some([0, 0]), None),
            member("b", 0.0, 1.0, Some([640, 0]), None),
        ];
        let graph = row_video_graph(&members, 1280, 490);
        graph.validate().unwrap();
        let rendered = graph.to_filter_complex();
        assert!(rendered.contains("[c0][c1]xstack=inputs=2:fill=black:layout=0_0|640_0[d0]"));
        assert!(rendered.ends_with("[d0]pad=width=1280:height=490[e0]"));
    }

    #[test]
    fn silent_row_is_exactly_one_source_node() {
        let members = vec![member("a", 0.0, 0.0, Some([0, 0]), None)];
        let graph = row_audio_graph(&members);
        graph.validate().unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].filter, "anullsrc");
        assert!(graph.nodes.iter().all(|n| n.filter != "amix"));
        assert_eq!(
            graph.to_filter_complex(),
            "anullsrc=channel_layout=stereo:sample_rate=44100:duration=1[q0]"
        );
    }

    #[test]
    fn single_audible_member_passes_through_identity_volume() {
        let members = vec![
            member("a", 250.0, 0.8, Some([0, 0]), Some(-0.5)),
            member("b", 0.0, 0.0, Some([640, 0]), Some(0.5)),
        ];
        let graph = row_audio_graph(&members);
        graph.validate().unwrap();
        let rendered = graph.to_filter_complex();
        assert!(rendered.contains("[0:a]atrim=start=0.25[m0]"));
        assert!(rendered.contains("[n0]volume=0.8[o0]"));
        assert!(rendered.contains("[o0]stereotools=mpan=-0.5[p0]"));
        assert!(rendered.ends_with("[p0]volume=1[q0]"));
        // The muted member contributes no audio nodes at all.
        assert!(!rendered.contains("1:a"));
    }

    #[test]
    fn multiple_audible_members_mix_with_long_dropout() {
        let members = vec![
            member("a", 0.0, 1.0, Some([0, 0]), Some(-0.5)),
            member("b", 0.0, 1.0, Some([640, 0]), Some(0.5)),
        ];
        let graph = row_audio_graph(&members);
        graph.validate().unwrap();
        assert!(
            graph
                .to_filter_complex()
                .ends_with("[p0][p1]amix=inputs=2:dropout_transition=180[q0]")
        );
    }

    #[test]
    fn hidden_member_pans_center() {
        let members = vec![member("a", 0.0, 1.0, None, None)];
        let graph = row_audio_graph(&members);
        assert!(graph.to_filter_complex().contains("stereotools=mpan=0[p0]"));
    }
}
