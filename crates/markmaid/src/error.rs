pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] markmaid_core::Error),

    #[error(transparent)]
    Diagram(#[from] crate::diagram::DiagramError),

    #[error("Refusing to open link with unsupported scheme: {url}")]
    UnsupportedLink { url: String },

    #[error("Invalid link target {url}: {message}")]
    InvalidLink { url: String, message: String },
}
