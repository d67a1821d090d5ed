use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GeoMapError {
    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid publication id list: {0}")]
    PmidList(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("snapshot I/O failed for {path}: {message}")]
    Snapshot { path: Utf8PathBuf, message: String },

    #[error("snapshot at {path} is not readable: {message}")]
    #[diagnostic(help("delete the snapshot file to refetch from NCBI"))]
    SnapshotFormat { path: Utf8PathBuf, message: String },

    #[error("snapshot at {path} has schema version {found}, expected {expected}")]
    #[diagnostic(help("delete the snapshot file to refetch from NCBI"))]
    SnapshotVersion {
        path: Utf8PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("cannot vectorize an empty corpus")]
    EmptyCorpus,

    #[error("dataset {0} is not referenced by any requested publication")]
    UnreferencedDataset(u64),

    #[error("coordinate matrix has {rows} rows but {ids} dataset ids were given")]
    ShapeMismatch { rows: usize, ids: usize },
}
