pub mod file;
pub mod metadata;

pub use file::AudioFile;
pub use metadata::{extract_metadata, AudioMetadata};
