//! The diagnostic object
//!
//! A [`Debugger`] owns one [`Router`] and hands it to the inspector, the
//! tracer, the mutation watcher and the failure pipeline. Tests build their
//! own instances; programs usually go through the process-wide one returned
//! by [`crate::dd`].

use crate::classifier::{classify, ArgKind, CallKind, Classifier};
use crate::exit::{ExitGuard, ExitHooks};
use crate::failure::hook::{self, HookMode, InstalledHook};
use crate::failure::{
    renderers_by_names, ConsoleSession, DebuggerExit, FailureHook, FailurePipeline, FailureReport,
    TerminalKeypress,
};
use crate::inspect::{InspectArg, Inspector};
use crate::instrument::{
    active_scope, AnnouncedFn, CallableMeta, ClassMeta, Instrumented, TracedFn, Tracer,
};
use crate::router::{Router, RouterPhase};
use crate::source::FsSourceProvider;
use crate::watch::{WatchRegistry, Watched};
use ddebug_config::paths::{default_output_folder, temp_log_path};
use ddebug_config::{Config, OutputConfig, TraceConfig};
use ddebug_core::{parse_backtrace, Category, FailureInfo, Result, SourceLocation};
use ddebug_logging::{debug, info, warn};
use ddebug_output::Sink;
use ddebug_ports::{
    EventListenerRef, FailureRendererRef, KeypressSourceRef, PostMortemRef, SessionOutcome,
    SourceProviderRef, UnavailableWatchService, WatchServiceRef,
};
use std::backtrace::Backtrace;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Debugger`]
///
/// # Example
/// ```ignore
/// let debugger = Debugger::builder()
///     .config(config)
///     .source_provider(Arc::new(FsSourceProvider::new()))
///     .without_watch_service()
///     .build();
/// ```
#[derive(Default)]
pub struct DebuggerBuilder {
    config: Option<Config>,
    watch_service: Option<WatchServiceRef>,
    source: Option<SourceProviderRef>,
    renderers: Option<Vec<FailureRendererRef>>,
    keypress: Option<KeypressSourceRef>,
    post_mortem: Option<PostMortemRef>,
    listeners: Vec<EventListenerRef>,
}

impl DebuggerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Use `service` for mutation watching (default: [`WatchRegistry`])
    pub fn watch_service(mut self, service: WatchServiceRef) -> Self {
        self.watch_service = Some(service);
        self
    }

    /// Build without mutation watching; `watch` fails with `CapabilityMissing`
    pub fn without_watch_service(mut self) -> Self {
        self.watch_service = Some(Arc::new(UnavailableWatchService));
        self
    }

    pub fn source_provider(mut self, source: SourceProviderRef) -> Self {
        self.source = Some(source);
        self
    }

    /// Failure renderers in priority order (default: from config)
    pub fn renderers(mut self, renderers: Vec<FailureRendererRef>) -> Self {
        self.renderers = Some(renderers);
        self
    }

    pub fn keypress(mut self, keypress: KeypressSourceRef) -> Self {
        self.keypress = Some(keypress);
        self
    }

    /// Session used after failures and at breakpoints (default: console on stdio)
    pub fn post_mortem(mut self, session: PostMortemRef) -> Self {
        self.post_mortem = Some(session);
        self
    }

    pub fn listener(mut self, listener: EventListenerRef) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn build(self) -> Debugger {
        let config = self.config.unwrap_or_default();
        let exit = Arc::new(ExitHooks::new());
        let router = Arc::new(Router::new(Arc::clone(&exit)));
        router.set_enabled(config.enabled);
        for listener in self.listeners {
            router.add_listener(listener);
        }

        let source: SourceProviderRef = self
            .source
            .unwrap_or_else(|| Arc::new(FsSourceProvider::new()));
        let renderers = self
            .renderers
            .unwrap_or_else(|| renderers_by_names(&config.failure.renderers));
        let session: PostMortemRef = self
            .post_mortem
            .unwrap_or_else(|| Arc::new(ConsoleSession::stdio(Arc::clone(&source))));
        let keypress: KeypressSourceRef = self
            .keypress
            .unwrap_or_else(|| Arc::new(TerminalKeypress));

        let pipeline = Arc::new(FailurePipeline::new(
            Arc::clone(&router),
            Arc::clone(&source),
            renderers,
            config.failure.clone(),
            keypress,
            Arc::clone(&session),
        ));

        debug!(enabled = config.enabled, "Debugger built");
        Debugger {
            inspector: Inspector::new(Arc::clone(&router), config.inspect.clone()),
            tracer: Tracer::new(Arc::clone(&router), config.trace.clone()),
            classifier: Classifier::new(Arc::clone(&source)),
            watch_service: self
                .watch_service
                .unwrap_or_else(|| Arc::new(WatchRegistry::new())),
            output: config.output,
            router,
            exit,
            pipeline,
            session,
            hook: Mutex::new(None),
        }
    }
}

// ============================================================================
// Output folder options
// ============================================================================

/// Options of [`Debugger::use_output_folder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputFolder {
    /// Folder to use; `<program>_log` in the working directory when unset
    pub path: Option<PathBuf>,
    /// Name the derived folder with the current date instead of `log`
    pub with_date: bool,
    /// Also install a failure hook writing `error*.txt` into the folder
    pub with_errors: bool,
}

impl OutputFolder {
    pub fn new() -> Self {
        Self {
            with_errors: true,
            ..Self::default()
        }
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_date(mut self, with_date: bool) -> Self {
        self.with_date = with_date;
        self
    }

    pub fn with_errors(mut self, with_errors: bool) -> Self {
        self.with_errors = with_errors;
        self
    }
}

impl From<&OutputConfig> for OutputFolder {
    fn from(config: &OutputConfig) -> Self {
        Self {
            path: config.folder.clone(),
            with_date: config.with_date,
            with_errors: config.with_errors,
        }
    }
}

// ============================================================================
// Debugger
// ============================================================================

pub struct Debugger {
    router: Arc<Router>,
    exit: Arc<ExitHooks>,
    inspector: Inspector,
    tracer: Tracer,
    classifier: Classifier,
    watch_service: WatchServiceRef,
    pipeline: Arc<FailurePipeline>,
    session: PostMortemRef,
    output: OutputConfig,
    hook: Mutex<Option<InstalledHook>>,
}

impl Default for Debugger {
    fn default() -> Self {
        Self::new()
    }
}

impl Debugger {
    pub fn new() -> Self {
        DebuggerBuilder::new().build()
    }

    pub fn from_config(config: Config) -> Self {
        DebuggerBuilder::new().config(config).build()
    }

    pub fn builder() -> DebuggerBuilder {
        DebuggerBuilder::new()
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn inspector(&self) -> &Inspector {
        &self.inspector
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn pipeline(&self) -> &Arc<FailurePipeline> {
        &self.pipeline
    }

    // ========================================================================
    // Router state
    // ========================================================================

    pub fn enabled(&self) -> bool {
        self.router.enabled()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.router.set_enabled(enabled);
    }

    pub fn set_category_enabled(&self, category: Category, enabled: bool) {
        self.router.set_category_enabled(category, enabled);
    }

    pub fn sink(&self) -> Sink {
        self.router.sink()
    }

    pub fn set_sink(&self, sink: Sink) {
        self.router.set_sink(sink);
    }

    pub fn category_sink(&self, category: Category) -> Sink {
        self.router.category_sink(category)
    }

    pub fn set_category_sink(&self, category: Category, sink: Sink) {
        self.router.set_category_sink(category, sink);
    }

    pub fn phase(&self) -> RouterPhase {
        self.router.phase()
    }

    pub fn add_listener(&self, listener: EventListenerRef) {
        self.router.add_listener(listener);
    }

    /// Show or hide `file:line in scope` in inspection lines.
    pub fn include_context(&self, include: bool) {
        self.inspector.set_include_context(include);
    }

    pub fn trace_config(&self, config: TraceConfig) {
        self.tracer.set_config(config);
    }

    // ========================================================================
    // Inspection and instrumentation
    // ========================================================================

    /// Print one inspection line. The `dd!` macro passes the expressions.
    pub fn inspect(&self, site: &SourceLocation, args: &[InspectArg<'_>]) {
        self.inspector.inspect(site, args);
    }

    /// Classify a runtime diagnostic call at `site` and act on it.
    ///
    /// `first` is the kind of the first argument. A `PlainCall` prints the
    /// inspection line for `args`, or the labeled source-unavailable line
    /// when the calling line cannot be read. A `DecoratorUse` prints
    /// nothing; the caller wraps the definition. See [`crate::classifier`]
    /// for the heuristic.
    pub fn dispatch(
        &self,
        site: &SourceLocation,
        first: Option<ArgKind>,
        args: &[InspectArg<'_>],
    ) -> CallKind {
        let line = self.classifier.source_line(site);
        let kind = classify(first, line.as_deref());
        debug!(site = %site, ?kind, "Classified diagnostic call");
        if kind == CallKind::PlainCall {
            match line {
                Some(_) => self.inspector.inspect(site, args),
                None => self.inspector.degraded(site),
            }
        }
        kind
    }

    /// Wrap `f` so every call records a trace frame.
    pub fn trace<F>(&self, meta: CallableMeta, f: F) -> TracedFn<F> {
        TracedFn::new(f, meta, self.tracer.clone())
    }

    /// Wrap `f` so every call prints one call-announce line.
    pub fn announce<F>(&self, meta: CallableMeta, f: F) -> AnnouncedFn<F> {
        AnnouncedFn::new(f, meta, self.inspector.clone())
    }

    /// Proxy `value` so calls through it report public method calls.
    pub fn instrument<T>(&self, value: T, meta: ClassMeta) -> Instrumented<T> {
        Instrumented::new(value, meta, self.inspector.clone(), self.tracer.clone())
    }

    // ========================================================================
    // Mutation watching
    // ========================================================================

    /// Watch `value` under `alias`; writes through the handle are reported.
    ///
    /// Fails with `CapabilityMissing` when built without a watch service.
    pub fn watch<T: Debug>(&self, value: T, alias: &str) -> Result<Watched<T>> {
        Watched::new(
            value,
            alias,
            Arc::clone(&self.router),
            Arc::clone(&self.watch_service),
            None,
        )
    }

    /// Like [`Debugger::watch`], reporting to `sink` instead of the watch sink.
    pub fn watch_to<T: Debug>(&self, value: T, alias: &str, sink: Sink) -> Result<Watched<T>> {
        Watched::new(
            value,
            alias,
            Arc::clone(&self.router),
            Arc::clone(&self.watch_service),
            Some(sink),
        )
    }

    pub fn watch_count(&self) -> usize {
        self.watch_service.watch_count()
    }

    // ========================================================================
    // Output reconfiguration
    // ========================================================================

    /// Tee every category into a folder of per-category logs.
    ///
    /// Returns the folder. With `with_errors` a failure hook writes its
    /// artifacts there: the immediate hook, or the exit-time hook when this
    /// debugger already has one installed.
    pub fn use_output_folder(&self, options: OutputFolder) -> Result<PathBuf> {
        let folder = options
            .path
            .clone()
            .unwrap_or_else(|| default_output_folder(options.with_date));
        self.router.use_output_folder(&folder)?;

        if options.with_errors {
            let failure_hook = FailureHook::new().artifact_dir(folder.clone());
            if self.failure_hook_mode().is_some() {
                self.install_exit_failure_hook(failure_hook);
            } else {
                self.install_failure_hook(failure_hook);
            }
        }
        Ok(folder)
    }

    /// [`Debugger::use_output_folder`] with the `[output]` config values.
    pub fn use_configured_output_folder(&self) -> Result<PathBuf> {
        self.use_output_folder(OutputFolder::from(&self.output))
    }

    /// Send every category to `ddebug.txt` in the temp directory.
    pub fn use_temporary_file(&self, with_live: bool) -> Result<PathBuf> {
        self.router.use_temporary_file(&temp_log_path(), with_live)
    }

    // ========================================================================
    // Failure hooks
    // ========================================================================

    fn set_hook(&self, mode: HookMode, options: FailureHook) {
        let mut slot = self.hook.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(installed) = slot.take() {
            hook::uninstall(installed, &self.exit);
        }
        *slot = Some(hook::install(&self.pipeline, &self.exit, mode, options));
    }

    /// Render panics as they happen.
    pub fn install_failure_hook(&self, options: FailureHook) {
        self.set_hook(HookMode::Immediate, options);
    }

    /// Record panics and render the last one when exit hooks run.
    pub fn install_exit_failure_hook(&self, options: FailureHook) {
        self.set_hook(HookMode::AtExit, options);
    }

    /// Restore the panic hook that was active before. Returns false when
    /// this debugger had none installed.
    pub fn uninstall_failure_hook(&self) -> bool {
        match self.hook.lock().unwrap_or_else(|p| p.into_inner()).take() {
            Some(installed) => {
                hook::uninstall(installed, &self.exit);
                true
            }
            None => false,
        }
    }

    pub fn failure_hook_mode(&self) -> Option<HookMode> {
        self.hook
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .map(InstalledHook::mode)
    }

    /// Run the full pipeline on an error that reached the top of the program.
    #[track_caller]
    pub fn report_failure(&self, error: &(dyn std::error::Error + 'static)) -> FailureReport {
        let failure = FailureInfo::from_error(error).with_location(self.caller_site());
        self.pipeline.handle(failure)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    #[track_caller]
    fn caller_site(&self) -> SourceLocation {
        let site = SourceLocation::caller();
        match active_scope() {
            Some(scope) => site.with_scope(scope),
            None => site,
        }
    }

    /// Pretty-print `value` on the rendering sink.
    pub fn pprint(&self, value: &dyn Debug) {
        self.router
            .write_line(Category::Rendering, &format!("{:#?}", value));
    }

    /// Print the program frames of the current stack, innermost first,
    /// skipping the `skip` innermost ones.
    pub fn print_stack(&self, skip: usize) {
        if !self.router.is_category_enabled(Category::Rendering) {
            return;
        }
        let backtrace = Backtrace::force_capture().to_string();
        let frames = parse_backtrace(&backtrace)
            .into_iter()
            .filter(|frame| !frame.is_internal())
            .skip(skip);
        let mut lines = vec!["Stack (most recent call first):".to_string()];
        for frame in frames {
            match (&frame.file, frame.line) {
                (Some(file), Some(line)) => {
                    lines.push(format!("  {} at {}:{}", frame.name, file, line))
                }
                _ => lines.push(format!("  {}", frame.name)),
            }
        }
        self.router.write_line(Category::Rendering, &lines.join("\n"));
    }

    /// Run `f` `iterations` times (at least once) and print the mean time.
    ///
    /// Returns the mean in seconds.
    pub fn timeit<R>(&self, label: &str, iterations: usize, mut f: impl FnMut() -> R) -> f64 {
        let iterations = iterations.max(1);
        let started = Instant::now();
        for _ in 0..iterations {
            std::hint::black_box(f());
        }
        let mean = started.elapsed().as_secs_f64() / iterations as f64;
        self.router.write_line(
            Category::Inspection,
            &format!("{:.6} - timeit on {} - (running {} times)", mean, label, iterations),
        );
        mean
    }

    /// Render `error` with the failure renderers, without artifacts or session.
    #[track_caller]
    pub fn print_error(&self, error: &(dyn std::error::Error + 'static)) {
        let failure = FailureInfo::from_error(error).with_location(self.caller_site());
        self.pipeline.print(&failure);
    }

    /// Run `f`; an error is printed with [`Debugger::print_error`] and
    /// returned unchanged.
    #[track_caller]
    pub fn log_error<T, E>(&self, f: impl FnOnce() -> std::result::Result<T, E>) -> std::result::Result<T, E>
    where
        E: std::error::Error + 'static,
    {
        let result = f();
        if let Err(e) = &result {
            self.print_error(e);
        }
        result
    }

    /// Open the post-mortem session at the call site.
    ///
    /// `continue` returns; `quit` unwinds with a [`DebuggerExit`] payload
    /// that failure hooks ignore.
    #[track_caller]
    pub fn breakpoint(&self) {
        if !self.enabled() {
            return;
        }
        let thread = std::thread::current()
            .name()
            .unwrap_or("<unnamed>")
            .to_string();
        let failure = FailureInfo::breakpoint(self.caller_site())
            .with_thread(thread)
            .with_backtrace(Backtrace::force_capture().to_string());
        self.router.flush();
        match self.session.run(&failure) {
            Ok(SessionOutcome::Continue) => {}
            Ok(SessionOutcome::Quit) => {
                info!("Debugger session quit at breakpoint");
                std::panic::resume_unwind(Box::new(DebuggerExit));
            }
            Err(e) => warn!("Breakpoint session failed: {}", e),
        }
    }

    // ========================================================================
    // Exit hooks
    // ========================================================================

    /// Run `hook` once at shutdown (see [`Debugger::exit_guard`]).
    pub fn at_exit<F>(&self, name: impl Into<String>, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.exit.register(name, hook);
    }

    /// Run every pending exit hook now. Returns how many ran.
    pub fn shutdown(&self) -> usize {
        let count = self.exit.run();
        self.router.flush();
        count
    }

    /// Guard that runs the exit hooks when dropped at the end of `main`.
    pub fn exit_guard(&self) -> ExitGuard {
        ExitGuard::new(Arc::clone(&self.exit))
    }
}

impl Drop for Debugger {
    fn drop(&mut self) {
        if let Some(installed) = self.hook.get_mut().unwrap_or_else(|p| p.into_inner()).take() {
            hook::uninstall(installed, &self.exit);
        }
    }
}
