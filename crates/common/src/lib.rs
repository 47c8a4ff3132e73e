// gpulaw-common: shared types and pure document logic for the GPULaw workspace

pub mod markdown;
pub mod prompt;
pub mod types;
