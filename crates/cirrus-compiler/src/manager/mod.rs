//! Incremental compilation of open entry points.
//!
//! Every notified file becomes an entry point. An edit recompiles that
//! entry point, every other one whose last module graph mentions the
//! edited file, and every one still compiling. Compiles run on tokio's blocking pool, at most one per entry
//! point; readers get the last completed [`CompilationSnapshot`] without
//! waiting.

mod state;

pub use state::CompileState;

use crate::compilation::Compilation;
use arc_swap::ArcSwapOption;
use cirrus_ast::{Diagnostic, DiagnosticCode, FileUri, TextSpan};
use cirrus_emit::{EmitError, EmitOptions, EmitResult, TemplateEmitter};
use cirrus_parser::SourceTree;
use cirrus_resolve::ResourceTypeProvider;
use cirrus_workspace::{FileResolver, GraphError, Workspace};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerOptions {
    pub emit: EmitOptions,
}

/// A completed compile of one entry point.
pub struct CompilationSnapshot {
    /// Number of compiles this entry point has completed, this one included.
    pub generation: u64,
    pub compilation: Arc<Compilation>,
    pub emit: EmitResult,
    /// Set when the latest compile faulted; `compilation` and `emit` are
    /// then those of the compile before it.
    pub fault: Option<Diagnostic>,
}

impl CompilationSnapshot {
    /// Entry point diagnostics, including a fault if there is one.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut diagnostics = self.emit.diagnostics.clone();
        diagnostics.extend(self.fault.clone());
        diagnostics
    }
}

/// Internal failures of one compile.
#[derive(Debug, Error)]
enum CompileFault {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Emit(#[from] EmitError),
    #[error("panic: {0}")]
    Panic(String),
}

struct Entry {
    uri: FileUri,
    state: Mutex<CompileState>,
    snapshot: ArcSwapOption<CompilationSnapshot>,
    /// Fault of a compile that had no earlier snapshot to fall back on.
    fault: Mutex<Option<Diagnostic>>,
    generation: AtomicU64,
}

impl Entry {
    fn new(uri: FileUri) -> Self {
        Self {
            uri,
            state: Mutex::new(CompileState::Idle),
            snapshot: ArcSwapOption::empty(),
            fault: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Whether an edit to `uri` can change this entry point's result.
    ///
    /// A running compile may read `uri` through a module graph that is not
    /// known yet, so it always counts.
    fn depends_on(&self, uri: &FileUri) -> bool {
        if self.uri == *uri || !self.state.lock().is_idle() {
            return true;
        }
        match self.snapshot.load().as_ref() {
            Some(snapshot) => snapshot.compilation.graph().mentions(uri),
            None => false,
        }
    }
}

struct Inner {
    workspace: RwLock<Workspace>,
    resolver: Arc<dyn FileResolver>,
    catalog: Arc<dyn ResourceTypeProvider>,
    emitter: TemplateEmitter,
    entries: DashMap<FileUri, Arc<Entry>>,
    runtime: Handle,
    /// Workers currently running.
    running: AtomicUsize,
    idle: Notify,
}

/// Incremental compilation orchestrator.
///
/// Cloning shares the same state.
#[derive(Clone)]
pub struct CompilationManager {
    inner: Arc<Inner>,
}

impl CompilationManager {
    /// Create a manager that runs compiles on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(
        resolver: Arc<dyn FileResolver>,
        catalog: Arc<dyn ResourceTypeProvider>,
        options: ManagerOptions,
    ) -> Self {
        Self::with_handle(Handle::current(), resolver, catalog, options)
    }

    pub fn with_handle(
        runtime: Handle,
        resolver: Arc<dyn FileResolver>,
        catalog: Arc<dyn ResourceTypeProvider>,
        options: ManagerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                workspace: RwLock::new(Workspace::new()),
                resolver,
                catalog,
                emitter: TemplateEmitter::new(options.emit),
                entries: DashMap::new(),
                runtime,
                running: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Replace the text of `uri` and recompile whatever it affects.
    #[instrument(skip_all, fields(uri = %uri))]
    pub fn notify(&self, uri: FileUri, text: impl Into<String>) {
        let tree = Arc::new(SourceTree::parse(uri.clone(), text));
        self.inner.workspace.write().upsert(tree);

        let entry = self
            .inner
            .entries
            .entry(uri.clone())
            .or_insert_with(|| Arc::new(Entry::new(uri.clone())))
            .clone();
        let mut affected = vec![entry];
        affected.extend(
            self.inner
                .entries
                .iter()
                .filter(|item| *item.key() != uri && item.value().depends_on(&uri))
                .map(|item| item.value().clone()),
        );
        debug!(entries = affected.len(), "file changed");
        for entry in affected {
            self.inner.schedule(entry);
        }
    }

    /// Stop tracking `uri` as an open file and entry point. Entry points
    /// that use it are recompiled and read it through the resolver.
    #[instrument(skip_all, fields(uri = %uri))]
    pub fn close(&self, uri: &FileUri) {
        self.inner.workspace.write().remove(uri);
        self.inner.entries.remove(uri);
        let affected: Vec<_> = self
            .inner
            .entries
            .iter()
            .filter(|item| item.value().depends_on(uri))
            .map(|item| item.value().clone())
            .collect();
        for entry in affected {
            self.inner.schedule(entry);
        }
    }

    /// Latest completed snapshot of the entry point `uri`. Never waits for
    /// a running compile.
    pub fn get_compilation(&self, uri: &FileUri) -> Option<Arc<CompilationSnapshot>> {
        let entry = self.inner.entries.get(uri)?;
        entry.snapshot.load_full()
    }

    /// Fault of the latest compile of `uri`, if it failed before any
    /// snapshot existed.
    pub fn last_fault(&self, uri: &FileUri) -> Option<Diagnostic> {
        let entry = self.inner.entries.get(uri)?;
        let fault = entry.fault.lock().clone();
        fault
    }

    pub fn entry_points(&self) -> Vec<FileUri> {
        self.inner
            .entries
            .iter()
            .map(|item| item.key().clone())
            .collect()
    }

    /// Resolve once no compile is running or scheduled.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.inner.running.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Inner {
    fn schedule(self: &Arc<Self>, entry: Arc<Entry>) {
        if !entry.state.lock().on_edit() {
            debug!(uri = %entry.uri, "compile in flight, marked stale");
            return;
        }
        self.running.fetch_add(1, Ordering::AcqRel);
        let inner = Arc::clone(self);
        self.runtime.spawn_blocking(move || inner.run(&entry));
    }

    /// Worker loop: compile until no edit arrived during the last compile.
    fn run(&self, entry: &Entry) {
        loop {
            self.compile_once(entry);
            if !entry.state.lock().on_finished() {
                break;
            }
            debug!(uri = %entry.uri, "running follow-up compile");
        }
        if self.running.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    #[instrument(skip_all, fields(uri = %entry.uri))]
    fn compile_once(&self, entry: &Entry) {
        // Snapshot the workspace so the lock is not held while compiling.
        let workspace = self.workspace.read().clone();
        let generation = entry.generation.fetch_add(1, Ordering::AcqRel) + 1;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.compile(&workspace, &entry.uri)))
            .unwrap_or_else(|payload| Err(CompileFault::Panic(panic_message(payload))));

        match outcome {
            Ok((compilation, emit)) => {
                debug!(generation, status = ?emit.status, "compile finished");
                *entry.fault.lock() = None;
                entry.snapshot.store(Some(Arc::new(CompilationSnapshot {
                    generation,
                    compilation: Arc::new(compilation),
                    emit,
                    fault: None,
                })));
            }
            Err(fault) => {
                warn!(generation, error = %fault, "compile faulted, keeping previous snapshot");
                let diagnostic = Diagnostic::error(
                    DiagnosticCode::InternalFault,
                    TextSpan::empty(0),
                    format!("internal compiler error: {fault}"),
                );
                match entry.snapshot.load_full() {
                    Some(previous) => {
                        entry.snapshot.store(Some(Arc::new(CompilationSnapshot {
                            generation,
                            compilation: previous.compilation.clone(),
                            emit: previous.emit.clone(),
                            fault: Some(diagnostic),
                        })));
                    }
                    None => *entry.fault.lock() = Some(diagnostic),
                }
            }
        }
    }

    fn compile(
        &self,
        workspace: &Workspace,
        uri: &FileUri,
    ) -> Result<(Compilation, EmitResult), CompileFault> {
        let compilation =
            Compilation::build(self.resolver.as_ref(), workspace, self.catalog.as_ref(), uri)?;
        let emit = compilation.emit(&self.emitter)?;
        Ok((compilation, emit))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
