//! Pure filter-graph generators for every pipeline stage.

pub mod combine;
pub mod graph;
pub mod master;
pub mod row;

pub use combine::{RowStream, combine_graph};
pub use graph::{FilterGraph, FilterNode, FilterOptions};
pub use master::master_graph;
pub use row::{row_audio_graph, row_video_graph};
