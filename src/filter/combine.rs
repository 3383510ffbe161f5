//! Final row-combination graph: stacks pre-rendered row composites
//! top-to-bottom and mixes their soundtracks.

use crate::{
    error::{ChoraleError, ChoraleResult},
    filter::graph::{FilterGraph, FilterNode},
};

/// One engine input in the combination job, in row order.
#[derive(Clone, Copy, Debug)]
pub struct RowStream {
    pub index: usize,
    /// Audio-only rows join the mix but are excluded from the video stack.
    pub audio_only: bool,
}

pub fn combine_graph(rows: &[RowStream]) -> ChoraleResult<FilterGraph> {
    let vparts: Vec<String> = rows
        .iter()
        .filter(|r| !r.audio_only)
        .map(|r| format!("{}:v", r.index))
        .collect();
    let aparts: Vec<String> = rows.iter().map(|r| format!("{}:a", r.index)).collect();

    if vparts.is_empty() {
        return Err(ChoraleError::validation(
            "no video rows to combine (song has no visible tracks)",
        ));
    }

    let mut graph = FilterGraph::new();
    if vparts.len() == 1 {
        // vstack needs at least two inputs; a lone row is copied through.
        graph.push(
            FilterNode::new("copy")
                .input(vparts[0].clone())
                .output("v"),
        );
    } else {
        let count = vparts.len();
        graph.push(
            FilterNode::new("vstack")
                .inputs(vparts)
                .opt("inputs", count)
                .output("v"),
        );
    }

    let count = aparts.len();
    graph.push(
        FilterNode::new("amix")
            .inputs(aparts)
            .opt("inputs", count)
            .opt("dropout_transition", 180)
            .output("a"),
    );

    graph.declare_output("v");
    graph.declare_output("a");
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(flags: &[bool]) -> Vec<RowStream> {
        flags
            .iter()
            .enumerate()
            .map(|(index, &audio_only)| RowStream { index, audio_only })
            .collect()
    }

    #[test]
    fn single_video_row_copies_instead_of_stacking() {
        let graph = combine_graph(&rows(&[false])).unwrap();
        graph.validate().unwrap();
        assert_eq!(
            graph.to_filter_complex(),
            "[0:v]copy[v];[0:a]amix=inputs=1:dropout_transition=180[a]"
        );
        assert_eq!(graph.outputs, vec!["v", "a"]);
    }

    #[test]
    fn multiple_video_rows_vstack_in_row_order() {
        let graph = combine_graph(&rows(&[false, false, false])).unwrap();
        graph.validate().unwrap();
        assert_eq!(
            graph.to_filter_complex(),
            "[0:v][1:v][2:v]vstack=inputs=3[v];\
             [0:a][1:a][2:a]amix=inputs=3:dropout_transition=180[a]"
        );
    }

    #[test]
    fn audio_only_rows_mix_but_do_not_stack() {
        let graph = combine_graph(&rows(&[true, false, false])).unwrap();
        graph.validate().unwrap();
        let rendered = graph.to_filter_complex();
        assert!(rendered.contains("[1:v][2:v]vstack=inputs=2[v]"));
        assert!(rendered.contains("[0:a][1:a][2:a]amix=inputs=3:dropout_transition=180[a]"));
    }

    #[test]
    fn all_audio_only_rows_are_rejected() {
        assert!(matches!(
            combine_graph(&rows(&[true, true])),
            Err(ChoraleError::Validation(_))
        ));
    }
}
