use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use ferry_endpoint::{EndpointRegistry, IdMap, Protocol, Resource, Selection, Stat};
use ferry_transfer::{Transfer, TransferError, TransferOptions};
use futures_util::StreamExt;
use indicatif::HumanBytes;
use tracing::info;

use crate::config::Config;
use crate::tracker::ProgressTrackerBuilder;

#[derive(Debug, Parser)]
#[command(name = "ferry", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    /// More log output; repeat for more detail.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// TOML file with `[transfer]` options and `[credentials]`.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "cp", name = "copy", about = "Copy a file or directory between endpoints")]
    Copy(CopyArg),
    #[command(name = "stat", about = "Show the metadata tree of an endpoint path")]
    Stat(StatArg),
}

#[derive(Debug, Args)]
pub struct CopyArg {
    /// Source URI, e.g. file:///data/in or dropbox:///photos
    pub source: String,

    /// Destination URI
    pub destination: String,

    /// Maximum slice length in bytes
    #[arg(long)]
    pub slice_size: Option<usize>,

    /// Files streamed at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Fail when any file is skipped or fails
    #[arg(long)]
    pub strict: bool,

    /// Copy only these paths, relative to the source
    #[arg(long = "file", value_name = "PATH")]
    pub files: Vec<String>,

    /// Hide the progress bar
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug, Args)]
pub struct StatArg {
    pub uri: String,

    /// Print the tree as JSON
    #[arg(long)]
    pub json: bool,
}

impl CopyArg {
    pub fn options(&self, config: &Config) -> TransferOptions {
        let mut options = config.transfer.clone();
        if let Some(size) = self.slice_size {
            options = options.slice_size(size);
        }
        if let Some(files) = self.concurrency {
            options = options.max_concurrent_files(files);
        }
        if self.strict {
            options = options.strict(true);
        }
        options
    }

    pub async fn run(self, config: &Config) -> anyhow::Result<()> {
        let registry = EndpointRegistry::new();
        let source = open(&registry, config, &self.source).await?;
        let destination = open(&registry, config, &self.destination).await?;

        let options = self.options(config);
        let slice_size = options.slice_size;
        let files = self.files.iter().map(IdMap::path).collect();
        let mut run = Transfer::new(source, destination)
            .options(options)
            .files(files)
            .start(slice_size);

        let mut tracker = ProgressTrackerBuilder::default()
            .with_prefix("copy")
            .with_finish("done")
            .hidden(self.quiet)
            .build();
        while let Some(event) = run.next().await {
            match event {
                Ok(snapshot) => {
                    tracker.step(&snapshot);
                }
                Err(e) => {
                    tracker.abandon("failed");
                    return Err(report_error(e));
                }
            }
        }
        let report = match run.finish().await {
            Ok(report) => report,
            Err(e) => {
                tracker.abandon("failed");
                return Err(report_error(e));
            }
        };
        tracker.message(report.to_string());
        tracker.finish();

        for file in report.failed() {
            eprintln!("{}: {:?}", file.path, file.status);
        }
        info!(%report, "copy finished");
        println!("{report}");
        Ok(())
    }
}

fn report_error(e: TransferError) -> anyhow::Error {
    if let TransferError::FilesFailed { report, .. } = &e {
        for file in report.failed() {
            eprintln!("{}: {:?}", file.path, file.status);
        }
    }
    anyhow::Error::new(e).context("Transfer failed")
}

impl StatArg {
    pub async fn run(self, config: &Config) -> anyhow::Result<()> {
        let registry = EndpointRegistry::new();
        let resource = open(&registry, config, &self.uri).await?;
        let stat = resource
            .stat()
            .await
            .with_context(|| format!("Failed to stat {}", self.uri))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stat)?);
        } else {
            print!("{}", render_tree(&stat));
        }
        Ok(())
    }
}

async fn open(registry: &EndpointRegistry, config: &Config, uri: &str) -> anyhow::Result<Arc<dyn Resource>> {
    let scheme = uri.split_once("://").map(|(scheme, _)| scheme).unwrap_or_default();
    let Some(protocol) = Protocol::from_scheme(scheme) else {
        bail!("Unsupported URI {uri}; expected one of {:?}", registry.protocols());
    };
    let session = registry
        .open(uri, config.credential_for(protocol))
        .await
        .with_context(|| format!("Failed to open {uri}"))?;
    let resource = session
        .select(&Selection::root())
        .await
        .with_context(|| format!("Failed to select {uri}"))?;
    Ok(resource)
}

/// Indented listing of a stat tree, one entry per line.
pub fn render_tree(stat: &Stat) -> String {
    let mut out = String::new();
    render(stat, 0, &mut out);
    out
}

fn render(stat: &Stat, depth: usize, out: &mut String) {
    let name = if stat.is_dir { format!("{}/", stat.name) } else { stat.name.clone() };
    let _ = writeln!(out, "{:indent$}{name}  {}", "", HumanBytes(stat.size), indent = depth * 2);
    for child in &stat.children {
        render(child, depth + 1, out);
    }
}
