pub mod config;
pub mod driver;
pub mod error;
pub mod kv;
pub mod logging;
pub mod output;
pub mod shuffle;
pub mod step;

pub use config::{MalformedPolicy, OutputFormat, RunConfig};
pub use driver::{run, run_records, Record, RunSummary};
pub use error::{Error, Result};
pub use kv::{Group, KeyValue};
pub use step::{Chain, Stage, StageStats, Step};
