use anyhow::Context;
use clap::Parser;
use common::{
    logging::init_logger, output::OutputTarget, MalformedPolicy, OutputFormat, RunConfig,
};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Read},
    path::PathBuf,
};
use tracing::info;

/// Counts ratings per movie and prints movies in ascending count order.
#[derive(Parser, Debug)]
struct Cli {
    /// Rating files (`user\tmovie\trating\ttimestamp`). Reads stdin when empty.
    input_files: Vec<PathBuf>,

    /// Write results here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip malformed lines with a warning instead of aborting.
    #[arg(long)]
    skip_malformed: bool,

    #[arg(short = 'w', long, default_value_t = 1)]
    reduce_workers: usize,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Write logs to a file in this directory instead of stderr.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        let policy = if self.skip_malformed {
            MalformedPolicy::Skip
        } else {
            MalformedPolicy::Fail
        };
        RunConfig::default()
            .on_malformed(policy)
            .reduce_workers(self.reduce_workers)
            .format(self.format)
    }

    fn open_input(&self) -> anyhow::Result<Box<dyn BufRead>> {
        if self.input_files.is_empty() {
            return Ok(Box::new(io::stdin().lock()));
        }

        let mut readers: Vec<Box<dyn Read>> = Vec::with_capacity(self.input_files.len());
        for path in &self.input_files {
            let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
            readers.push(Box::new(EnsureNewline::new(file)));
        }
        let chained = readers
            .into_iter()
            .reduce(|acc, next| Box::new(acc.chain(next)))
            .unwrap_or_else(|| Box::new(io::empty()));
        Ok(Box::new(BufReader::new(chained)))
    }
}

/// Appends a newline to a file that lacks a final one, so the last line of
/// one file never runs into the first line of the next.
struct EnsureNewline<R> {
    inner: R,
    last: Option<u8>,
    done: bool,
}

impl<R> EnsureNewline<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            last: None,
            done: false,
        }
    }
}

impl<R: Read> Read for EnsureNewline<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.done || buf.is_empty() {
            return Ok(0);
        }
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.last = Some(buf[n - 1]);
            return Ok(n);
        }
        self.done = true;
        match self.last {
            Some(b) if b != b'\n' => {
                buf[0] = b'\n';
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logger(cli.log_dir.as_deref());

    let config = cli.run_config();
    info!(
        inputs = cli.input_files.len(),
        workers = config.reduce_workers,
        format = %config.format,
        on_malformed = ?config.on_malformed,
        "start"
    );

    let input = cli.open_input()?;
    let target = OutputTarget::from(cli.output.clone());
    let summary = target
        .write_with(|out| app_ratings::run(input, out, &config))
        .context("movie ratings job failed")?;

    if let OutputTarget::File(path) = &target {
        info!(path = %path.display(), written = summary.records_written, "output saved");
    }
    Ok(())
}
