use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use ferry_endpoint::{Error as EndpointError, IdMap, Protocol, Resource, Stat};
use ferry_telemetry::TransferInfo;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::delegated;
use crate::error::{Result, TransferError};
use crate::options::TransferOptions;
use crate::report::TransferReport;
use crate::strategy::Strategy;
use crate::streaming;
use crate::telemetry::Meter;

/// One move from a source resource to a destination resource.
///
/// # Examples
///
/// ```no_run
/// # async fn demo(src: std::sync::Arc<dyn ferry_endpoint::Resource>, dst: std::sync::Arc<dyn ferry_endpoint::Resource>) -> ferry_transfer::Result<()> {
/// use futures_util::StreamExt;
/// use ferry_transfer::Transfer;
///
/// let mut run = Transfer::new(src, dst).start(64 * 1024);
/// while let Some(info) = run.next().await {
///     println!("{}", info?);
/// }
/// let report = run.finish().await?;
/// println!("{report}");
/// # Ok(())
/// # }
/// ```
pub struct Transfer {
    source:      Arc<dyn Resource>,
    destination: Arc<dyn Resource>,
    options:     TransferOptions,
    files:       Vec<IdMap>,
    source_stat: Option<Stat>,
    expected:    Option<u64>,
}

impl Transfer {
    pub fn new(source: Arc<dyn Resource>, destination: Arc<dyn Resource>) -> Self {
        Self {
            source,
            destination,
            options: TransferOptions::default(),
            files: Vec::new(),
            source_stat: None,
            expected: None,
        }
    }

    #[must_use]
    pub fn options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    /// Move only these entries, resolved relative to the source root and
    /// mirrored below the destination root.
    #[must_use]
    pub fn files(mut self, files: Vec<IdMap>) -> Self {
        self.files = files;
        self
    }

    pub fn strategy(&self) -> Result<Strategy> { Strategy::select(&*self.source, &*self.destination) }

    /// Stat the source now and return the expected total.
    ///
    /// The stat is reused when the transfer starts. The total reported while
    /// running is recomputed from it, so a file list set afterwards is still
    /// reflected.
    pub async fn initialize(&mut self) -> Result<u64> {
        let stat = self.source.stat().await?;
        let total = if self.files.is_empty() {
            stat.size
        } else {
            streaming::plan(&self.source, &stat, &self.files).await?.total
        };
        self.source_stat = Some(stat);
        Ok(total)
    }

    /// Fix the expected total from a size the caller already knows.
    pub fn initialize_upload(&mut self, expected_size: u64) { self.expected = Some(expected_size); }

    /// Start moving data on the current runtime.
    ///
    /// The returned run yields a snapshot per progress update and ends after
    /// the last one, or with the terminal error. Dropping it does not stop the
    /// transfer; use [`TransferRun::cancel`].
    pub fn start(self, slice_size: usize) -> TransferRun {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let meter = Arc::new(Meter::new(tx));
        let task = tokio::spawn(self.drive(slice_size, meter, cancel.clone()));
        TransferRun {
            events: rx,
            task:   Some(task),
            report: None,
            handle: TransferHandle { cancel },
        }
    }

    /// Start with the configured slice size and wait for the report.
    pub async fn run(self) -> Result<TransferReport> {
        let slice_size = self.options.slice_size;
        self.start(slice_size).finish().await
    }

    async fn drive(self, slice_size: usize, meter: Arc<Meter>, cancel: CancellationToken) -> Result<TransferReport> {
        self.options.validate()?;
        if slice_size == 0 {
            return Err(TransferError::InvalidOptions("slice size must be positive".into()));
        }
        let strategy = self.strategy()?;
        info!(
            source = %self.source.path(),
            destination = %self.destination.path(),
            ?strategy,
            "transfer started"
        );

        let result = match strategy {
            Strategy::Streaming => self.stream(slice_size, &meter, cancel).await,
            Strategy::Delegated => self.delegate(&meter, cancel).await,
        };
        let info = meter.stop();

        match result {
            Ok(report) => {
                let report = TransferReport { info, ..report };
                let failed = report.failed_count();
                info!(
                    bytes = info.transferred,
                    elapsed_s = info.elapsed_seconds,
                    files = report.files.len(),
                    failed,
                    "transfer finished"
                );
                if self.options.strict && failed > 0 {
                    return Err(TransferError::FilesFailed {
                        failed,
                        total: report.files.len(),
                        report: Box::new(report),
                    });
                }
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, elapsed_s = info.elapsed_seconds, "transfer failed");
                Err(e)
            }
        }
    }

    async fn stream(&self, slice_size: usize, meter: &Arc<Meter>, cancel: CancellationToken) -> Result<TransferReport> {
        let root = match &self.source_stat {
            Some(stat) => stat.clone(),
            None => self.source.stat().await?,
        };
        let plan = streaming::plan(&self.source, &root, &self.files).await?;
        meter.set_total(self.expected.unwrap_or(plan.total));
        meter.start();
        meter.emit();

        let files = streaming::run(
            plan,
            Arc::clone(&self.destination),
            &self.options,
            slice_size,
            Arc::clone(meter),
            cancel,
        )
        .await?;

        Ok(TransferReport {
            strategy: Strategy::Streaming,
            info: TransferInfo::new(),
            files,
            task_id: None,
        })
    }

    async fn delegate(&self, meter: &Arc<Meter>, cancel: CancellationToken) -> Result<TransferReport> {
        let source = self.source.delegation().ok_or_else(|| unsupported(self.source.protocol()))?;
        let destination = self
            .destination
            .delegation()
            .ok_or_else(|| unsupported(self.destination.protocol()))?;

        let task = delegated::run(source, destination.location, &self.options, Arc::clone(meter), cancel).await?;
        Ok(TransferReport {
            strategy: Strategy::Delegated,
            info: TransferInfo::new(),
            files: Vec::new(),
            task_id: Some(task),
        })
    }
}

fn unsupported(protocol: Protocol) -> TransferError {
    TransferError::Endpoint(EndpointError::Unsupported {
        protocol,
        operation: "delegation",
    })
}

/// Cancels a running transfer. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TransferHandle {
    cancel: CancellationToken,
}

impl TransferHandle {
    /// Stop streaming pipelines between slices, or cancel the remote task of
    /// a delegated transfer before its next poll.
    pub fn cancel(&self) { self.cancel.cancel(); }

    pub fn is_cancelled(&self) -> bool { self.cancel.is_cancelled() }
}

/// A started transfer: a stream of progress snapshots plus its outcome.
///
/// Yields `Ok(info)` per update. After the transfer ends the stream either
/// finishes, leaving the report for [`finish`](Self::finish), or yields the
/// terminal error as its last item.
pub struct TransferRun {
    events: UnboundedReceiver<TransferInfo>,
    task:   Option<JoinHandle<Result<TransferReport>>>,
    report: Option<TransferReport>,
    handle: TransferHandle,
}

impl TransferRun {
    pub fn handle(&self) -> TransferHandle { self.handle.clone() }

    pub fn cancel(&self) { self.handle.cancel(); }

    /// Drain the remaining snapshots and return the report.
    pub async fn finish(mut self) -> Result<TransferReport> {
        while let Some(event) = self.next().await {
            event?;
        }
        self.report
            .take()
            .ok_or_else(|| TransferError::Aborted("transfer ended without a report".into()))
    }
}

impl Stream for TransferRun {
    type Item = Result<TransferInfo>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if let Some(info) = ready!(this.events.poll_recv(cx)) {
            return Poll::Ready(Some(Ok(info)));
        }

        let Some(task) = this.task.as_mut() else {
            return Poll::Ready(None);
        };
        let joined = ready!(Pin::new(task).poll(cx));
        this.task = None;
        match joined {
            Ok(Ok(report)) => {
                this.report = Some(report);
                Poll::Ready(None)
            }
            Ok(Err(e)) => Poll::Ready(Some(Err(e))),
            Err(e) => Poll::Ready(Some(Err(TransferError::Aborted(e.to_string())))),
        }
    }
}
