use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("write to {path} failed: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no active log file")]
    NoActiveFile,

    #[error("archive {0} already exists")]
    ArchiveExists(PathBuf),

    #[error("archive {path} failed: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to prune {path}: {source}")]
    Prune {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("sink is closed")]
    Closed,

    #[error("writer thread panicked")]
    WriterPanicked,
}

pub type Result<T> = std::result::Result<T, Error>;
