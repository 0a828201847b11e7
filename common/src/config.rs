use clap::ValueEnum;
use std::fmt;

/// What a stage does with a record its mapper rejects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum MalformedPolicy {
    /// Abort the whole run.
    #[default]
    Fail,
    /// Log a warning, count the record as skipped and keep going.
    Skip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Key and value each JSON-encoded, joined by a tab.
    #[default]
    Json,
    /// Key and value printed as-is, joined by a tab.
    Tsv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Tsv => f.write_str("tsv"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub on_malformed: MalformedPolicy,
    /// Threads used by each reduce phase. 1 reduces on the calling thread.
    pub reduce_workers: usize,
    pub format: OutputFormat,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            on_malformed: MalformedPolicy::Fail,
            reduce_workers: 1,
            format: OutputFormat::Json,
        }
    }
}

impl RunConfig {
    pub fn on_malformed(mut self, policy: MalformedPolicy) -> Self {
        self.on_malformed = policy;
        self
    }

    pub fn reduce_workers(mut self, n: usize) -> Self {
        self.reduce_workers = n.max(1);
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fail_fast() {
        let config = RunConfig::default();
        assert_eq!(config.on_malformed, MalformedPolicy::Fail);
        assert_eq!(config.reduce_workers, 1);
        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn test_zero_workers_clamped() {
        assert_eq!(RunConfig::default().reduce_workers(0).reduce_workers, 1);
    }
}
