//! Typed filter-graph model.
//!
//! A graph is an ordered list of named filter nodes with explicit input and
//! output labels, plus the labels the whole graph exposes. Generators build
//! these as pure data; only the media engine adapter turns them into the
//! engine's `filter_complex` syntax.

use crate::error::{ChoraleError, ChoraleResult};

#[derive(Clone, Debug, PartialEq)]
pub enum FilterOptions {
    None,
    /// Positional option string, e.g. `PTS-STARTPTS`.
    Raw(String),
    /// Named options in authored order.
    Pairs(Vec<(String, String)>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterNode {
    pub inputs: Vec<String>,
    pub filter: String,
    pub options: FilterOptions,
    pub outputs: Vec<String>,
}

impl FilterNode {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            inputs: Vec::new(),
            filter: filter.into(),
            options: FilterOptions::None,
            outputs: Vec::new(),
        }
    }

    pub fn input(mut self, label: impl Into<String>) -> Self {
        self.inputs.push(label.into());
        self
    }

    pub fn inputs(mut self, labels: impl IntoIterator<Item = String>) -> Self {
        self.inputs.extend(labels);
        self
    }

    pub fn raw_options(mut self, options: impl Into<String>) -> Self {
        self.options = FilterOptions::Raw(options.into());
        self
    }

    pub fn opt(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        match &mut self.options {
            FilterOptions::Pairs(pairs) => pairs.push((key.into(), value.to_string())),
            _ => self.options = FilterOptions::Pairs(vec![(key.into(), value.to_string())]),
        }
        self
    }

    pub fn output(mut self, label: impl Into<String>) -> Self {
        self.outputs.push(label.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterGraph {
    pub nodes: Vec<FilterNode>,
    /// Labels the graph exposes for stream mapping, in declaration order.
    pub outputs: Vec<String>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: FilterNode) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn declare_output(&mut self, label: impl Into<String>) -> &mut Self {
        self.outputs.push(label.into());
        self
    }

    /// Concatenates two independently built graphs (e.g. a row's video and
    /// audio pipelines submitted as one engine job).
    pub fn merge(mut self, other: FilterGraph) -> FilterGraph {
        self.nodes.extend(other.nodes);
        self.outputs.extend(other.outputs);
        self
    }

    /// Structural checks generators are tested against: output labels are
    /// unique across the graph, every non-source input refers to a label
    /// produced earlier, and every declared graph output exists.
    pub fn validate(&self) -> ChoraleResult<()> {
        let mut produced: Vec<&str> = Vec::new();
        for node in &self.nodes {
            for input in &node.inputs {
                let is_source = input
                    .split(':')
                    .next()
                    .is_some_and(|head| head.chars().all(|c| c.is_ascii_digit()));
                if !is_source && !produced.iter().any(|p| *p == input.as_str()) {
                    return Err(ChoraleError::validation(format!(
                        "filter '{}' consumes undefined label '{}'",
                        node.filter, input
                    )));
                }
            }
            for output in &node.outputs {
                if produced.iter().any(|p| *p == output.as_str()) {
                    return Err(ChoraleError::validation(format!(
                        "label '{}' produced twice",
                        output
                    )));
                }
                produced.push(output);
            }
        }
        for output in &self.outputs {
            if !produced.iter().any(|p| *p == output.as_str()) {
                return Err(ChoraleError::validation(format!(
                    "declared graph output '{}' is never produced",
                    output
                )));
            }
        }
        Ok(())
    }

    /// Renders the graph in `filter_complex` syntax.
    pub fn to_filter_complex(&self) -> String {
        let mut chains = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let mut chain = String::new();
            for input in &node.inputs {
                chain.push('[');
                chain.push_str(input);
                chain.push(']');
            }
            chain.push_str(&node.filter);
            match &node.options {
                FilterOptions::None => {}
                FilterOptions::Raw(raw) => {
                    chain.push('=');
                    chain.push_str(&quote_value(raw));
                }
                FilterOptions::Pairs(pairs) => {
                    chain.push('=');
                    let rendered = pairs
                        .iter()
                        .map(|(k, v)| format!("{k}={}", quote_value(v)))
                        .collect::<Vec<_>>()
                        .join(":");
                    chain.push_str(&rendered);
                }
            }
            for output in &node.outputs {
                chain.push('[');
                chain.push_str(output);
                chain.push(']');
            }
            chains.push(chain);
        }
        chains.join(";")
    }
}

/// Values containing spaces (e.g. amix weights) must be quoted inside a
/// filter_complex expression.
fn quote_value(value: &str) -> String {
    if value.contains(' ') {
        format!("'{value}'")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_chains_with_labels_and_options() {
        let mut graph = FilterGraph::new();
        graph
            .push(
                FilterNode::new("trim")
                    .input("0:v")
                    .opt("start", 1.5)
                    .output("a0"),
            )
            .push(
                FilterNode::new("setpts")
                    .input("a0")
                    .raw_options("PTS-STARTPTS")
                    .output("b0"),
            )
            .declare_output("b0");

        assert_eq!(
            graph.to_filter_complex(),
            "[0:v]trim=start=1.5[a0];[a0]setpts=PTS-STARTPTS[b0]"
        );
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn values_with_spaces_are_quoted() {
        let mut graph = FilterGraph::new();
        graph.push(
            FilterNode::new("amix")
                .input("a1")
                .input("a2")
                .opt("inputs", 2)
                .opt("weights", "0.95 0.05")
                .output("out"),
        );
        assert_eq!(
            graph.to_filter_complex(),
            "[a1][a2]amix=inputs=2:weights='0.95 0.05'[out]"
        );
    }

    #[test]
    fn validate_flags_undefined_inputs_and_duplicate_outputs() {
        let mut graph = FilterGraph::new();
        graph.push(FilterNode::new("copy").input("nope").output("v"));
        assert!(graph.validate().is_err());

        let mut graph = FilterGraph::new();
        graph
            .push(FilterNode::new("copy").input("0:v").output("v"))
            .push(FilterNode::new("copy").input("1:v").output("v"));
        assert!(graph.validate().is_err());

        let mut graph = FilterGraph::new();
        graph.push(FilterNode::new("copy").input("0:v").output("v"));
        graph.declare_output("missing");
        assert!(graph.validate().is_err());
    }

    #[test]
    fn merge_preserves_node_and_output_order() {
        let mut video = FilterGraph::new();
        video.push(FilterNode::new("copy").input("0:v").output("v"));
        video.declare_output("v");

        let mut audio = FilterGraph::new();
        audio.push(FilterNode::new("acopy").input("0:a").output("a"));
        audio.declare_output("a");

        let merged = video.merge(audio);
        assert_eq!(merged.outputs, vec!["v", "a"]);
        assert_eq!(
            merged.to_filter_complex(),
            "[0:v]copy[v];[0:a]acopy[a]"
        );
    }
}
