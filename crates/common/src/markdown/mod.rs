// Markdown post-processing for generated and edited documents.

pub mod normalize;

pub use normalize::{apply_hard_line_breaks, normalize};
