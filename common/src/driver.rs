use crate::{KeyValue, OutputFormat, Result, RunConfig, Stage, StageStats};
use serde::Serialize;
use std::{
    fmt::Display,
    io::{self, BufRead, Write},
};
use tracing::info;

/// A final output record.
pub trait Record {
    fn write_to(&self, format: OutputFormat, out: &mut dyn Write) -> Result<()>;
}

impl<K, V> Record for KeyValue<K, V>
where
    K: Display + Serialize,
    V: Display + Serialize,
{
    fn write_to(&self, format: OutputFormat, out: &mut dyn Write) -> Result<()> {
        match format {
            OutputFormat::Json => writeln!(
                out,
                "{}\t{}",
                serde_json::to_string(&self.key)?,
                serde_json::to_string(&self.value)?
            )?,
            OutputFormat::Tsv => writeln!(out, "{self}")?,
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub records_read: usize,
    pub records_skipped: usize,
    pub records_written: usize,
}

/// Runs `job` over every line of `input` and writes the results to `output`.
///
/// Lines are read up front as raw bytes with any trailing `\r` dropped.
/// Decoding is left to the first stage (see [`crate::Step::from_lines`]), so
/// a line that is not valid UTF-8 is handled like any other malformed record.
pub fn run<S, R, W>(job: &S, input: R, output: W, config: &RunConfig) -> Result<RunSummary>
where
    S: Stage<Input = Vec<u8>>,
    S::Output: Record,
    R: BufRead,
    W: Write,
{
    let records = input
        .split(b'\n')
        .map(|line| line.map(strip_cr))
        .collect::<io::Result<Vec<_>>>()?;
    run_records(job, records, output, config)
}

pub fn run_records<S, W>(
    job: &S,
    records: Vec<S::Input>,
    mut output: W,
    config: &RunConfig,
) -> Result<RunSummary>
where
    S: Stage,
    S::Output: Record,
    W: Write,
{
    let records_read = records.len();
    let mut stats = StageStats::default();
    let results = job.execute(records, config, &mut stats)?;

    for record in &results {
        record.write_to(config.format, &mut output)?;
    }
    output.flush()?;

    let summary = RunSummary {
        records_read,
        records_skipped: stats.skipped,
        records_written: results.len(),
    };
    info!(
        read = summary.records_read,
        skipped = summary.records_skipped,
        written = summary.records_written,
        "run finished"
    );
    Ok(summary)
}

fn strip_cr(mut line: Vec<u8>) -> Vec<u8> {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, MalformedPolicy, Step};
    use std::io::Cursor;

    #[derive(Debug, thiserror::Error)]
    #[error("empty line")]
    struct EmptyLine;

    fn word_count() -> Step<Vec<u8>, String, u32, KeyValue<String, usize>> {
        Step::from_lines(
            "wc",
            |line: String| {
                if line.is_empty() {
                    return Err(EmptyLine);
                }
                Ok(line
                    .split_whitespace()
                    .map(|w| KeyValue::new(w.to_string(), 1))
                    .collect())
            },
            |word: &String, ones: Vec<u32>| vec![KeyValue::new(word.clone(), ones.len())],
        )
    }

    #[test]
    fn test_run_writes_json_records() {
        let mut out = Vec::new();
        let summary = run(
            &word_count(),
            Cursor::new("b a\r\na\n"),
            &mut out,
            &RunConfig::default(),
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\"a\"\t2\n\"b\"\t1\n");
        assert_eq!(
            summary,
            RunSummary {
                records_read: 2,
                records_skipped: 0,
                records_written: 2
            }
        );
    }

    #[test]
    fn test_run_writes_tsv_records() {
        let mut out = Vec::new();
        let config = RunConfig::default().format(OutputFormat::Tsv);
        run(&word_count(), Cursor::new("x y x\n"), &mut out, &config).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "x\t2\ny\t1\n");
    }

    #[test]
    fn test_run_fails_fast_and_writes_nothing() {
        let mut out = Vec::new();
        let err = run(
            &word_count(),
            Cursor::new("a\n\nb\n"),
            &mut out,
            &RunConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Map { record: 2, .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_run_skips_when_asked() {
        let mut out = Vec::new();
        let config = RunConfig::default().on_malformed(MalformedPolicy::Skip);
        let summary = run(&word_count(), Cursor::new("a\n\nb\n"), &mut out, &config).unwrap();
        assert_eq!(summary.records_skipped, 1);
        assert_eq!(summary.records_written, 2);
    }

    #[test]
    fn test_empty_input() {
        let mut out = Vec::new();
        let summary = run(&word_count(), Cursor::new(""), &mut out, &RunConfig::default()).unwrap();
        assert_eq!(summary, RunSummary::default());
        assert!(out.is_empty());
    }

    #[test]
    fn test_invalid_utf8_line_reports_record() {
        let mut out = Vec::new();
        let input: &[u8] = b"a\n\xff b\nc\n";
        let err = run(&word_count(), input, &mut out, &RunConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Map { ref stage, record: 2, .. } if stage == "wc"));
        assert!(out.is_empty());
    }
}
