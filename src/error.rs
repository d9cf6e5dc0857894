use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CollectorError {
    #[error("source download failed: {0}")]
    SourceHttp(String),

    #[error("source returned status {status}: {message}")]
    SourceStatus { status: u16, message: String },

    #[error("missing reference file: {0}")]
    MissingReference(Utf8PathBuf),

    #[error("failed to parse country code table {path}: {message}")]
    ReferenceParse { path: Utf8PathBuf, message: String },

    #[error("missing dataset manifest: {0}")]
    #[diagnostic(help("the manifest is never created from scratch; seed it with {{\"regions\": []}}"))]
    MissingManifest(Utf8PathBuf),

    #[error("failed to parse dataset manifest {path}: {message}")]
    ManifestParse { path: Utf8PathBuf, message: String },

    #[error("unexpected dataset manifest layout: {0}")]
    ManifestShape(String),

    #[error("missing config file: {0}")]
    MissingConfig(Utf8PathBuf),

    #[error("failed to parse config file {path}: {message}")]
    ConfigParse { path: Utf8PathBuf, message: String },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("{path}: missing required column `{column}`")]
    MissingColumn { path: Utf8PathBuf, column: String },

    #[error("{path}:{line}: {message}")]
    MalformedRow {
        path: Utf8PathBuf,
        line: u64,
        message: String,
    },

    #[error("entity without data type: {0}")]
    InvalidEntity(String),

    #[error("invalid date `{date}` for {entity}")]
    InvalidDate { entity: String, date: String },

    #[error("no observations for {0}")]
    EmptySeries(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
