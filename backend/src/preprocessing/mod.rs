pub mod segmenter;
pub mod tfs;

pub use segmenter::{segment_possessions, Segmentation};
pub use tfs::{extract_tfs, Exclusion, TfsExtraction, TfsValue};
