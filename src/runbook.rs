use std::collections::BTreeMap;

use crate::{fingerprint::short_hex, model::PositionedInput};

/// Rows are keyed by the shared vertical coordinate of their members.
pub type RowKey = i64;

/// Sentinel row collecting hidden (audio-only) parts. Packed tiles always
/// land at y >= 0, so the key never collides with a real row.
pub const AUDIO_ONLY_ROW: RowKey = -1;

/// The layout+grouping plan for one song: positioned inputs sliced into rows
/// that are rendered independently and later stacked top-to-bottom.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Runbook {
    pub slices: BTreeMap<RowKey, Vec<PositionedInput>>,
    /// Row keys in ascending numeric order; this is the processing order.
    pub rows: Vec<RowKey>,
    /// Diagnostic fingerprint of the row-key sequence. Never gates work.
    pub rows_hash: String,
}

impl Runbook {
    pub fn build(inputs: &[PositionedInput]) -> Self {
        let mut rows: Vec<RowKey> = Vec::new();
        let mut slices: BTreeMap<RowKey, Vec<PositionedInput>> = BTreeMap::new();
        for input in inputs {
            let key = input.position.map_or(AUDIO_ONLY_ROW, |p| p[1]);
            if !rows.contains(&key) {
                rows.push(key);
                slices.insert(key, Vec::new());
            }
            slices
                .get_mut(&key)
                .expect("slice initialized on first sighting")
                .push(input.clone());
        }
        rows.sort_unstable();

        let joined = rows
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join("-");
        let rows_hash = short_hex(&joined);

        Self {
            slices,
            rows,
            rows_hash,
        }
    }

    pub fn slice(&self, key: RowKey) -> &[PositionedInput] {
        self.slices.get(&key).map_or(&[], Vec::as_slice)
    }

    pub fn is_audio_only_row(key: RowKey) -> bool {
        key == AUDIO_ONLY_ROW
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(id: &str, position: Option<[i64; 2]>) -> PositionedInput {
        PositionedInput {
            part_id: id.to_string(),
            size: [640, 480],
            volume: 1.0,
            offset: 0.0,
            position,
            pan: None,
        }
    }

    #[test]
    fn rows_sort_numerically_not_lexically() {
        let inputs = vec![
            input("a", Some([0, 100])),
            input("b", Some([0, 20])),
            input("c", Some([0, 3])),
        ];
        let runbook = Runbook::build(&inputs);
        assert_eq!(runbook.rows, vec![3, 20, 100]);
    }

    #[test]
    fn every_input_lands_in_exactly_one_slice() {
        let inputs = vec![
            input("a", Some([0, 0])),
            input("b", Some([640, 0])),
            input("c", Some([0, 480])),
            input("d", None),
        ];
        let runbook = Runbook::build(&inputs);
        let total: usize = runbook.slices.values().map(Vec::len).sum();
        assert_eq!(total, inputs.len());
        assert_eq!(runbook.slice(0).len(), 2);
        assert_eq!(runbook.slice(480).len(), 1);
        assert_eq!(runbook.slice(AUDIO_ONLY_ROW).len(), 1);
    }

    #[test]
    fn hidden_inputs_collect_under_the_sentinel_row() {
        let inputs = vec![input("a", None), input("b", Some([0, 0]))];
        let runbook = Runbook::build(&inputs);
        assert_eq!(runbook.rows, vec![AUDIO_ONLY_ROW, 0]);
        assert!(Runbook::is_audio_only_row(runbook.rows[0]));
    }

    #[test]
    fn rows_hash_depends_only_on_the_sorted_key_sequence() {
        let forward = Runbook::build(&[input("a", Some([0, 0])), input("b", Some([0, 480]))]);
        let reversed = Runbook::build(&[input("b", Some([0, 480])), input("a", Some([0, 0]))]);
        assert_eq!(forward.rows_hash, reversed.rows_hash);
        assert_eq!(forward.rows_hash.len(), 8);

        let other = Runbook::build(&[input("a", Some([0, 0]))]);
        assert_ne!(forward.rows_hash, other.rows_hash);
    }
}
