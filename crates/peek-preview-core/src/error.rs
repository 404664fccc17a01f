use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PreviewError {
    #[error("undecodable transport frame: {0}")]
    #[diagnostic(
        code(peek::decode),
        help("frames are UTF-8 JSON objects tagged by `action`")
    )]
    Decode(#[from] serde_json::Error),

    #[error("transport failure: {0}")]
    #[diagnostic(code(peek::transport))]
    Transport(String),

    #[error("host surface unavailable: {0}")]
    #[diagnostic(
        code(peek::host),
        help("the page must provide the content root and an injected config")
    )]
    Host(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Diagram(#[from] DiagramError),
}

#[derive(Debug, Error, Diagnostic)]
pub enum DiagramError {
    #[error("diagram {render_id} failed to compile: {message}")]
    #[diagnostic(code(peek::diagram::compile))]
    Compile { render_id: String, message: String },

    #[error("compiler produced no graphic for {render_id}")]
    #[diagnostic(code(peek::diagram::empty))]
    Empty { render_id: String },
}

#[derive(Debug, Error, Diagnostic)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    #[diagnostic(code(peek::storage::unavailable))]
    Unavailable(String),

    #[error("failed to write {key}: {message}")]
    #[diagnostic(code(peek::storage::write))]
    Write { key: String, message: String },

    #[error("malformed value under {key}")]
    #[diagnostic(code(peek::storage::malformed))]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T, E = PreviewError> = std::result::Result<T, E>;
