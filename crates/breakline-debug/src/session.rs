//! Debug session lifecycle: worker threads, pause/resume, event streaming.

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use smol_str::SmolStr;
use tracing::warn;

use breakline_runtime::debug::{BreakpointSpec, DebugControl, RunEvent, SourceFilter};
use breakline_runtime::delegate::{ExecutionDelegate, Input, NoopFrameHook, Output};
use breakline_runtime::error::DelegateError;
use breakline_runtime::graph::CallGraph;

use crate::protocol::ExecutionEvent;

/// How long `dispose` waits for the worker thread before abandoning it.
const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);
const WORKER_JOIN_POLL: Duration = Duration::from_millis(10);

/// Options for one `stream` invocation.
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Raw breakpoint tokens for this segment. Replaces the previous
    /// segment's spec wholesale on resume.
    pub breakpoints: Vec<String>,
    /// Continue the paused session instead of starting a new one.
    pub resume: bool,
}

impl StreamOptions {
    /// Options starting a fresh run with the given breakpoint tokens.
    #[must_use]
    pub fn with_breakpoints<I, S>(breakpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            breakpoints: breakpoints.into_iter().map(Into::into).collect(),
            resume: false,
        }
    }

    /// Options resuming a paused session with a replacement token list.
    #[must_use]
    pub fn resuming<I, S>(breakpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            breakpoints: breakpoints.into_iter().map(Into::into).collect(),
            resume: true,
        }
    }
}

/// State of one live instrumented execution.
struct RunState {
    control: DebugControl,
    events: Arc<Mutex<Receiver<RunEvent>>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl RunState {
    fn stop(&mut self) {
        self.control.stop();
        self.join_worker();
    }

    fn join_worker(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        let deadline = Instant::now() + WORKER_JOIN_TIMEOUT;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(WORKER_JOIN_POLL);
        }
        if handle.is_finished() {
            let _ = handle.join();
        } else {
            // Abandon rather than hang the caller; the leak is reported.
            warn!(
                timeout_ms = WORKER_JOIN_TIMEOUT.as_millis() as u64,
                "debug worker did not stop in time; abandoning thread"
            );
        }
    }
}

/// Debug runtime facade: owns the pause/resume lifecycle of a delegate
/// across repeated [`stream`](DebugSession::stream) invocations.
///
/// Dropping the session disposes it, so callers get guaranteed-release
/// semantics on both success and failure paths.
pub struct DebugSession<D> {
    delegate: Arc<D>,
    filter: SourceFilter,
    /// Present only when a state anchor was configured.
    graph: Option<CallGraph>,
    run: Option<RunState>,
}

/// Configuration builder for [`DebugSession`].
pub struct DebugSessionBuilder<D> {
    delegate: Arc<D>,
    project_root: Option<PathBuf>,
    vendor_markers: Option<Vec<String>>,
    anchor: Option<SmolStr>,
    graph_names: Vec<SmolStr>,
}

impl<D: ExecutionDelegate + 'static> DebugSessionBuilder<D> {
    /// Project root for wildcard (step) instrumentation. Defaults to the
    /// delegate entrypoint's parent directory.
    #[must_use]
    pub fn project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    /// Replace the vendored-path marker segments.
    #[must_use]
    pub fn vendor_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vendor_markers = Some(markers.into_iter().map(Into::into).collect());
        self
    }

    /// Anchor function name of the debugged entrypoint. Without an anchor
    /// the call-graph state reporter stays inert.
    #[must_use]
    pub fn state_anchor(mut self, name: impl Into<SmolStr>) -> Self {
        self.anchor = Some(name.into());
        self
    }

    /// Function names reachable from the entrypoint, as precomputed by the
    /// surrounding discovery tooling.
    #[must_use]
    pub fn call_graph<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.graph_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Finish configuration.
    #[must_use]
    pub fn build(self) -> DebugSession<D> {
        let root = self
            .project_root
            .or_else(|| {
                self.delegate
                    .entrypoint()
                    .and_then(|entry| entry.parent().map(PathBuf::from))
            });
        let mut filter = SourceFilter::new(root);
        if let Some(markers) = self.vendor_markers {
            filter = filter.with_markers(markers);
        }
        let graph = self.anchor.map(|anchor| {
            let mut names = self.graph_names;
            names.push(anchor);
            CallGraph::from_names(names)
        });
        DebugSession {
            delegate: self.delegate,
            filter,
            graph,
            run: None,
        }
    }
}

impl<D: ExecutionDelegate + 'static> DebugSession<D> {
    /// Start configuring a session around `delegate`.
    #[must_use]
    pub fn builder(delegate: D) -> DebugSessionBuilder<D> {
        DebugSessionBuilder {
            delegate: Arc::new(delegate),
            project_root: None,
            vendor_markers: None,
            anchor: None,
            graph_names: Vec::new(),
        }
    }

    /// Build a session with default configuration.
    #[must_use]
    pub fn new(delegate: D) -> Self {
        Self::builder(delegate).build()
    }

    /// Drive one debug segment and yield exactly one event.
    ///
    /// The first call with breakpoints starts the worker; each breakpoint
    /// event leaves the worker parked until the next call passes
    /// `resume = true`. A terminal event discards the session state so an
    /// unrelated later call starts fresh. Errors never escape as `Err`:
    /// delegate failures arrive as [`ExecutionEvent::Failed`].
    pub async fn stream(&mut self, input: &Input, options: StreamOptions) -> ExecutionEvent {
        if options.resume {
            if let Some(run) = &self.run {
                let spec = self.parse_spec(&options.breakpoints);
                run.control.update_breakpoints(spec);
                run.control.resume();
                return self.next_event().await;
            }
            // No live session to resume: fall through to a fresh start.
        } else {
            // A non-resume call supersedes whatever session was live.
            self.dispose();
        }

        let spec = self.parse_spec(&options.breakpoints);
        if spec.is_empty() {
            // Zero-overhead fast path: no instrumentation at all.
            return match self.execute(input).await {
                Ok(output) => ExecutionEvent::Completed { output },
                Err(error) => ExecutionEvent::Failed {
                    error: error.to_string(),
                },
            };
        }

        let control = DebugControl::new(spec, self.filter.clone(), self.graph.clone());
        let (event_tx, event_rx) = channel();
        control.set_event_sender(event_tx);

        let delegate = self.delegate.clone();
        let worker_control = control.clone();
        let input = input.clone();
        let spawned = thread::Builder::new()
            .name("breakline-worker".to_string())
            .spawn(move || {
                let mut hook = worker_control.clone();
                let outcome = delegate.run(&input, &mut hook);
                worker_control.finish(outcome);
            });
        let worker = match spawned {
            Ok(handle) => handle,
            Err(error) => {
                return ExecutionEvent::Failed {
                    error: format!("failed to start debug worker: {error}"),
                }
            }
        };

        self.run = Some(RunState {
            control,
            events: Arc::new(Mutex::new(event_rx)),
            worker: Some(worker),
        });
        self.next_event().await
    }

    /// Run the delegate to completion with no breakpoint support.
    pub async fn execute(&self, input: &Input) -> Result<Output, DelegateError> {
        let delegate = self.delegate.clone();
        let input = input.clone();
        tokio::task::spawn_blocking(move || delegate.run(&input, &mut NoopFrameHook))
            .await
            .map_err(|error| DelegateError::execution(format!("execution task failed: {error}")))?
    }

    /// Tear down any live session: unblock a parked worker and join it with
    /// a bounded wait. Safe to call when nothing was started; idempotent.
    pub fn dispose(&mut self) {
        if let Some(mut run) = self.run.take() {
            run.stop();
        }
    }

    /// Whether an instrumented execution is currently live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.run.is_some()
    }

    fn parse_spec(&self, tokens: &[String]) -> BreakpointSpec {
        BreakpointSpec::parse(tokens, self.delegate.entrypoint().as_deref())
    }

    /// Wait for the next worker event without blocking the caller's
    /// concurrency substrate.
    async fn next_event(&mut self) -> ExecutionEvent {
        let Some(run) = &self.run else {
            return ExecutionEvent::Failed {
                error: "no active debug session".to_string(),
            };
        };
        let events = run.events.clone();
        let received = tokio::task::spawn_blocking(move || {
            let receiver = events.lock().expect("event receiver poisoned");
            receiver.recv()
        })
        .await;
        let event = match received {
            Ok(Ok(event)) => ExecutionEvent::from(event),
            Ok(Err(_)) => ExecutionEvent::Failed {
                error: "debug worker exited without reporting a result".to_string(),
            },
            Err(error) => ExecutionEvent::Failed {
                error: format!("event wait task failed: {error}"),
            },
        };
        if event.is_terminal() {
            if let Some(mut run) = self.run.take() {
                run.stop();
            }
        }
        event
    }
}

impl<D> Drop for DebugSession<D> {
    fn drop(&mut self) {
        if let Some(mut run) = self.run.take() {
            run.stop();
        }
    }
}
