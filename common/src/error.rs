use std::io;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("stage `{stage}` failed on record {record}: {source}")]
    Map {
        stage: String,
        record: usize,
        #[source]
        source: BoxError,
    },

    #[error("cannot encode output record: {0}")]
    Encode(#[from] serde_json::Error),
}
