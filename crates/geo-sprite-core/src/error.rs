use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Retrieval failed: {0}")]
    Retrieval(String),
    #[error("Malformed annotation: {0}")]
    MalformedAnnotation(String),
    #[error("Sheet would grow to {width}x{height}, past the {max_side} px per-side ceiling")]
    Sizing {
        width: u32,
        height: u32,
        max_side: u32,
    },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Nothing to pack")]
    Empty,
    #[error("Worker pool error: {0}")]
    Pool(String),
}

pub type Result<T> = std::result::Result<T, SpriteError>;
