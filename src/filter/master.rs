//! Post-production graph: final canvas padding, watermark overlay, and
//! impulse-response reverb with a weighted dry/wet mix.

use crate::filter::graph::{FilterGraph, FilterNode};

/// Watermark inset from the bottom-right corner, in pixels.
pub const WATERMARK_INSET_PX: u32 = 20;

/// Inputs, in order: 0 = combined video+audio, 1 = watermark image,
/// 2 = reverb impulse response. `reverb` is the wet weight in 0..1.
pub fn master_graph(out_width: u32, out_height: u32, reverb: f64) -> FilterGraph {
    let mut graph = FilterGraph::new();

    // Video: center the composite on the final canvas, then stamp the
    // watermark near the bottom-right corner.
    graph
        .push(
            FilterNode::new("pad")
                .input("0:v")
                .opt("x", -1)
                .opt("y", -1)
                .opt("width", out_width)
                .opt("height", out_height)
                .output("v1"),
        )
        .push(
            FilterNode::new("overlay")
                .input("v1")
                .input("1")
                .opt("x", format!("W-w-{WATERMARK_INSET_PX}"))
                .opt("y", format!("H-h-{WATERMARK_INSET_PX}"))
                .output("video"),
        );

    // Audio: split the mix, convolve one copy with the impulse response,
    // then blend dry and wet by the configured reverb level.
    graph
        .push(
            FilterNode::new("asplit")
                .input("0:a")
                .output("a1")
                .output("a2"),
        )
        .push(
            FilterNode::new("afir")
                .input("a1")
                .input("2")
                .opt("dry", 10)
                .opt("wet", 10)
                .output("reverb"),
        )
        .push(
            FilterNode::new("amix")
                .input("a2")
                .input("reverb")
                .opt("inputs", 2)
                .opt("dropout_transition", 180)
                .opt("weights", format!("{} {}", 1.0 - reverb, reverb))
                .output("audiomix"),
        );

    graph.declare_output("video");
    graph.declare_output("audiomix");
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_graph_renders_the_full_chain() {
        let graph = master_graph(1920, 1080, 0.05);
        graph.validate().unwrap();
        assert_eq!(
            graph.to_filter_complex(),
            "[0:v]pad=x=-1:y=-1:width=1920:height=1080[v1];\
             [v1][1]overlay=x=W-w-20:y=H-h-20[video];\
             [0:a]asplit[a1][a2];\
             [a1][2]afir=dry=10:wet=10[reverb];\
             [a2][reverb]amix=inputs=2:dropout_transition=180:weights='0.95 0.05'[audiomix]"
        );
        assert_eq!(graph.outputs, vec!["video", "audiomix"]);
    }

    #[test]
    fn reverb_weights_always_sum_to_one() {
        for reverb in [0.0, 0.25, 0.5, 1.0] {
            let graph = master_graph(1280, 720, reverb);
            let rendered = graph.to_filter_complex();
            assert!(rendered.contains(&format!("weights='{} {}'", 1.0 - reverb, reverb)));
        }
    }
}
