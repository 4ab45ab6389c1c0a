use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("empty chunk text for {src}")]
    EmptyChunk { src: String },

    #[error("bad chunk offsets {start}:{end} for {src}")]
    ChunkOffsets { src: String, start: usize, end: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
