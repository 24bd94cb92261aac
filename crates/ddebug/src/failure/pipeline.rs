//! Failure pipeline: render, persist, offer a post-mortem session

use crate::router::Router;
use ddebug_config::constants::{COMBINED_ARTIFACT_NAME, DECLINE_ANSWERS};
use ddebug_config::{FailureConfig, PostMortemPolicy};
use ddebug_core::{panic_message, Category, DiagnosticEvent, FailureInfo, SourceLocation};
use ddebug_logging::{debug, error, info, warn};
use ddebug_output::Sink;
use ddebug_ports::{
    FailureRendererRef, KeypressSourceRef, PostMortemRef, RenderContext, SessionOutcome,
    SourceProviderRef,
};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

thread_local! {
    static IN_PIPELINE: Cell<bool> = const { Cell::new(false) };
}

/// True while this thread is inside the pipeline (a renderer panicked).
pub(crate) fn in_pipeline() -> bool {
    IN_PIPELINE.with(Cell::get)
}

struct PipelineGuard {
    outer: bool,
}

impl PipelineGuard {
    fn enter() -> Self {
        Self {
            outer: IN_PIPELINE.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for PipelineGuard {
    fn drop(&mut self) {
        let outer = self.outer;
        IN_PIPELINE.with(|flag| flag.set(outer));
    }
}

/// Where the pipeline is in handling a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Rendering,
    AwaitingDecision,
    InteractiveSession,
}

/// What happened to the post-mortem offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostMortemDecision {
    /// Not offered (policy `Never`, no terminal, or output disabled)
    Skipped,
    /// The user answered no
    Declined,
    /// No answer within the prompt window
    TimedOut,
    /// The session ran and ended with this outcome
    Entered(SessionOutcome),
}

/// Result of one renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendering {
    pub renderer: String,
    pub outcome: RenderOutcome,
}

impl Rendering {
    pub fn text(&self) -> Option<&str> {
        match &self.outcome {
            RenderOutcome::Rendered(text) => Some(text),
            RenderOutcome::Failed(_) => None,
        }
    }
}

/// Everything one failure produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub renderings: Vec<Rendering>,
    pub artifacts: Vec<PathBuf>,
    pub decision: PostMortemDecision,
}

impl FailureReport {
    fn empty() -> Self {
        Self {
            renderings: Vec::new(),
            artifacts: Vec::new(),
            decision: PostMortemDecision::Skipped,
        }
    }

    pub fn failed_renderers(&self) -> Vec<&str> {
        self.renderings
            .iter()
            .filter(|r| r.text().is_none())
            .map(|r| r.renderer.as_str())
            .collect()
    }
}

pub struct FailurePipeline {
    router: Arc<Router>,
    source: SourceProviderRef,
    renderers: RwLock<Vec<FailureRendererRef>>,
    config: RwLock<FailureConfig>,
    keypress: KeypressSourceRef,
    post_mortem: PostMortemRef,
    artifact_dir: RwLock<Option<PathBuf>>,
    state: Mutex<PipelineState>,
    last: Mutex<Option<FailureInfo>>,
}

impl FailurePipeline {
    pub fn new(
        router: Arc<Router>,
        source: SourceProviderRef,
        renderers: Vec<FailureRendererRef>,
        config: FailureConfig,
        keypress: KeypressSourceRef,
        post_mortem: PostMortemRef,
    ) -> Self {
        Self {
            router,
            source,
            renderers: RwLock::new(renderers),
            config: RwLock::new(config),
            keypress,
            post_mortem,
            artifact_dir: RwLock::new(None),
            state: Mutex::new(PipelineState::Idle),
            last: Mutex::new(None),
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    pub fn state(&self) -> PipelineState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_state(&self, state: PipelineState) {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = state;
    }

    pub fn config(&self) -> FailureConfig {
        self.config.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn set_config(&self, config: FailureConfig) {
        *self.config.write().unwrap_or_else(|p| p.into_inner()) = config;
    }

    pub fn set_post_mortem_policy(&self, policy: PostMortemPolicy) {
        self.config
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .post_mortem = policy;
    }

    pub fn set_renderers(&self, renderers: Vec<FailureRendererRef>) {
        *self.renderers.write().unwrap_or_else(|p| p.into_inner()) = renderers;
    }

    pub fn renderer_names(&self) -> Vec<String> {
        self.renderers
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(|r| r.name().to_string())
            .collect()
    }

    pub fn artifact_dir(&self) -> Option<PathBuf> {
        self.artifact_dir
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn set_artifact_dir(&self, dir: Option<PathBuf>) {
        *self.artifact_dir.write().unwrap_or_else(|p| p.into_inner()) = dir;
    }

    pub fn source(&self) -> &SourceProviderRef {
        &self.source
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Run every renderer into its own buffer.
    ///
    /// A failing renderer is reported with a `FATAL renderer` notice on the
    /// rendering sink and the next one still runs. Each renderer runs on its
    /// own scoped thread, so a renderer panic is caught even from inside the
    /// panic hook, where this thread is already panicking.
    pub fn render(&self, failure: &FailureInfo) -> Vec<Rendering> {
        let _guard = PipelineGuard::enter();
        let renderers = self
            .renderers
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        let color = self.router.category_sink(Category::Rendering).is_terminal();

        renderers
            .iter()
            .map(|renderer| {
                let outcome = match self.render_one(renderer, failure, color) {
                    Ok(out) => RenderOutcome::Rendered(out),
                    Err(message) => {
                        error!(renderer = %renderer.name(), "Failure renderer failed: {}", message);
                        self.router.write_line(
                            Category::Rendering,
                            &format!("FATAL renderer '{}' failed: {}", renderer.name(), message),
                        );
                        RenderOutcome::Failed(message)
                    }
                };
                Rendering {
                    renderer: renderer.name().to_string(),
                    outcome,
                }
            })
            .collect()
    }

    fn render_one(
        &self,
        renderer: &FailureRendererRef,
        failure: &FailureInfo,
        color: bool,
    ) -> std::result::Result<String, String> {
        let source = self.source.as_ref();
        let joined = std::thread::scope(|scope| {
            let handle = std::thread::Builder::new()
                .name(format!("ddebug-render-{}", renderer.name()))
                .spawn_scoped(scope, move || {
                    let _guard = PipelineGuard::enter();
                    let ctx = RenderContext::new(source).color(color);
                    let mut out = String::new();
                    renderer.render(failure, &ctx, &mut out).map(|()| out)
                });
            match handle {
                Ok(handle) => Some(handle.join()),
                Err(e) => {
                    warn!("Failed to spawn renderer thread: {}", e);
                    None
                }
            }
        });

        match joined {
            Some(Ok(result)) => result.map_err(|e| e.to_string()),
            Some(Err(payload)) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
            // no thread available: run inline, uncaught
            None => {
                let ctx = RenderContext::new(source).color(color);
                let mut out = String::new();
                renderer
                    .render(failure, &ctx, &mut out)
                    .map(|()| out)
                    .map_err(|e| e.to_string())
            }
        }
    }

    /// Send the first successful rendering to the rendering sink.
    fn show_first(&self, failure: &FailureInfo, renderings: &[Rendering]) {
        let Some(text) = renderings.iter().find_map(Rendering::text) else {
            return;
        };
        let location = failure
            .location
            .clone()
            .unwrap_or_else(|| SourceLocation::new("<unknown>", 0));
        let event = DiagnosticEvent::failure(
            location,
            failure.kind.clone(),
            failure.message.clone(),
            text.trim_end_matches('\n').to_string(),
        );
        self.router.emit_to(Category::Rendering, &event);
    }

    /// Write `error-<name>.txt` per rendering and the combined `error.txt`.
    ///
    /// Progress is reported on the rendering sink, one line per file.
    pub fn persist(&self, renderings: &[Rendering], dir: &Path) -> Vec<PathBuf> {
        let config = self.config();
        let mut written = Vec::new();

        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(dir = %dir.display(), "Failed to create artifact folder: {}", e);
            return written;
        }
        self.router.write_line(
            Category::Rendering,
            &format!("now writing error files to {}:", dir.display()),
        );

        let combined_path = dir.join(COMBINED_ARTIFACT_NAME);
        let combined = match Sink::file(&combined_path) {
            Ok(sink) => Some(sink),
            Err(e) => {
                warn!("Failed to create {}: {}", combined_path.display(), e);
                None
            }
        };

        for rendering in renderings {
            let Some(text) = rendering.text() else {
                continue;
            };
            let name = config.artifact_name(&rendering.renderer);
            let path = dir.join(&name);
            match write_artifact(&path, text) {
                Ok(()) => {
                    debug!(path = %path.display(), "Wrote failure artifact");
                    self.router
                        .write_line(Category::Rendering, &format!("done create {} error file", name));
                    written.push(path);
                }
                Err(e) => warn!("Failed to write {}: {}", path.display(), e),
            }
            if let Some(sink) = &combined {
                if let Err(e) = sink.write_str(text).and_then(|_| sink.write_str("\n")) {
                    warn!("Failed to append to {}: {}", combined_path.display(), e);
                }
            }
        }

        if let Some(sink) = combined {
            match sink.close() {
                Ok(()) => self.router.write_line(
                    Category::Rendering,
                    &format!("done create {} error file", COMBINED_ARTIFACT_NAME),
                ),
                Err(e) => warn!("Failed to close {}: {}", combined_path.display(), e),
            }
            written.push(combined_path);
        }
        info!(dir = %dir.display(), count = written.len(), "Failure artifacts written");
        written
    }

    // ========================================================================
    // Handling
    // ========================================================================

    /// Render, persist and offer the post-mortem session.
    ///
    /// Does nothing while the rendering category is disabled.
    pub fn handle(&self, failure: FailureInfo) -> FailureReport {
        if !self.router.is_category_enabled(Category::Rendering) {
            debug!("Rendering disabled, failure not rendered");
            return FailureReport::empty();
        }

        self.set_state(PipelineState::Rendering);
        let renderings = self.render(&failure);
        self.show_first(&failure, &renderings);
        let artifacts = match self.artifact_dir() {
            Some(dir) => self.persist(&renderings, &dir),
            None => Vec::new(),
        };
        self.router.flush();

        self.set_state(PipelineState::AwaitingDecision);
        let decision = self.offer_post_mortem(&failure);
        self.set_state(PipelineState::Idle);

        FailureReport {
            renderings,
            artifacts,
            decision,
        }
    }

    /// Render to the rendering sink only: no artifacts, no session.
    pub fn print(&self, failure: &FailureInfo) -> Vec<Rendering> {
        if !self.router.is_category_enabled(Category::Rendering) {
            return Vec::new();
        }
        let renderings = self.render(failure);
        self.show_first(failure, &renderings);
        renderings
    }

    /// Keep `failure` for a later [`FailurePipeline::replay_last`].
    pub fn record(&self, failure: FailureInfo) {
        debug!(kind = %failure.kind, "Recorded failure for exit-time replay");
        *self.last.lock().unwrap_or_else(|p| p.into_inner()) = Some(failure);
    }

    pub fn has_recorded(&self) -> bool {
        self.last.lock().unwrap_or_else(|p| p.into_inner()).is_some()
    }

    /// Handle the recorded failure, if any. The record is consumed.
    pub fn replay_last(&self) -> Option<FailureReport> {
        let failure = self.last.lock().unwrap_or_else(|p| p.into_inner()).take()?;
        Some(self.handle(failure))
    }

    // ========================================================================
    // Post-mortem
    // ========================================================================

    /// Apply the post-mortem policy; prompt when it is `Prompt`.
    pub fn offer_post_mortem(&self, failure: &FailureInfo) -> PostMortemDecision {
        let config = self.config();
        match config.post_mortem {
            PostMortemPolicy::Never => PostMortemDecision::Skipped,
            PostMortemPolicy::Always => self.enter_session(failure),
            PostMortemPolicy::Prompt => {
                if !self.keypress.is_interactive() {
                    return PostMortemDecision::Skipped;
                }
                let timeout = config.prompt_timeout();
                self.router.write_line(
                    Category::Rendering,
                    &format!(
                        "press enter within {} seconds to start the debugger... > ",
                        timeout.as_secs()
                    ),
                );
                match self.keypress.wait_for_line(timeout) {
                    None => PostMortemDecision::TimedOut,
                    Some(answer) if is_decline(&answer) => PostMortemDecision::Declined,
                    Some(_) => self.enter_session(failure),
                }
            }
        }
    }

    fn enter_session(&self, failure: &FailureInfo) -> PostMortemDecision {
        self.set_state(PipelineState::InteractiveSession);
        info!(session = %self.post_mortem.name(), "Entering post-mortem session");
        let outcome = match self.post_mortem.run(failure) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Post-mortem session failed: {}", e);
                SessionOutcome::Continue
            }
        };
        PostMortemDecision::Entered(outcome)
    }
}

fn write_artifact(path: &Path, text: &str) -> ddebug_core::Result<()> {
    let sink = Sink::file(path)?;
    sink.write_str(text)?;
    sink.close()
}

fn is_decline(answer: &str) -> bool {
    let answer = answer.trim().to_ascii_lowercase();
    DECLINE_ANSWERS.contains(&answer.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::ExitHooks;
    use crate::failure::renderers::{ExplanationRenderer, PlainRenderer};
    use ddebug_core::{Error, EventKind, Result};
    use ddebug_output::{EventRecorder, MemoryBuffer};
    use ddebug_ports::{FailureRenderer, KeypressSource, NoKeypress, NoPostMortem, NoSource, PostMortem};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Broken;

    impl FailureRenderer for Broken {
        fn render(&self, _f: &FailureInfo, _c: &RenderContext<'_>, _o: &mut String) -> Result<()> {
            Err(Error::renderer("broken", "no output today"))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    struct Panicky;

    impl FailureRenderer for Panicky {
        fn render(&self, _f: &FailureInfo, _c: &RenderContext<'_>, _o: &mut String) -> Result<()> {
            panic!("renderer exploded")
        }

        fn name(&self) -> &str {
            "panicky"
        }
    }

    struct Answer(Option<&'static str>);

    impl KeypressSource for Answer {
        fn wait_for_line(&self, _timeout: Duration) -> Option<String> {
            self.0.map(str::to_string)
        }

        fn is_interactive(&self) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct CountingSession(AtomicUsize);

    impl PostMortem for CountingSession {
        fn run(&self, _failure: &FailureInfo) -> Result<SessionOutcome> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(SessionOutcome::Quit)
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn pipeline(
        renderers: Vec<FailureRendererRef>,
        keypress: KeypressSourceRef,
        session: PostMortemRef,
        policy: PostMortemPolicy,
    ) -> (FailurePipeline, MemoryBuffer, Arc<EventRecorder>) {
        let router = Arc::new(Router::new(Arc::new(ExitHooks::new())));
        let (sink, buffer) = Sink::memory();
        router.set_sink(sink);
        let recorder = Arc::new(EventRecorder::default());
        router.add_listener(recorder.clone());
        let config = FailureConfig {
            post_mortem: policy,
            ..FailureConfig::default()
        };
        let pipeline = FailurePipeline::new(router, Arc::new(NoSource), renderers, config, keypress, session);
        (pipeline, buffer, recorder)
    }

    fn quiet(renderers: Vec<FailureRendererRef>) -> (FailurePipeline, MemoryBuffer, Arc<EventRecorder>) {
        pipeline(renderers, Arc::new(NoKeypress), Arc::new(NoPostMortem), PostMortemPolicy::Never)
    }

    fn failure() -> FailureInfo {
        FailureInfo::panic("attempt to divide by zero", Some(SourceLocation::new("src/main.rs", 3)))
            .with_thread("main")
    }

    #[test]
    fn test_failing_renderers_do_not_stop_others() {
        let (pipeline, buffer, _) = quiet(vec![
            Arc::new(Broken),
            Arc::new(Panicky),
            Arc::new(ExplanationRenderer),
        ]);

        let renderings = pipeline.render(&failure());

        assert_eq!(renderings.len(), 3);
        assert_eq!(renderings[0].outcome, RenderOutcome::Failed("Renderer 'broken' failed: no output today".into()));
        assert_eq!(renderings[1].outcome, RenderOutcome::Failed("panicked: renderer exploded".into()));
        assert!(renderings[2].text().unwrap().contains("divid"));
        let notices: Vec<String> = buffer
            .lines()
            .into_iter()
            .filter(|line| line.starts_with("FATAL renderer"))
            .collect();
        assert_eq!(notices.len(), 2);
        assert!(notices[1].starts_with("FATAL renderer 'panicky' failed"));
    }

    #[test]
    fn test_handle_shows_first_success_and_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, buffer, recorder) = quiet(vec![
            Arc::new(Broken),
            Arc::new(PlainRenderer),
            Arc::new(ExplanationRenderer),
        ]);
        pipeline.set_artifact_dir(Some(dir.path().to_path_buf()));

        let report = pipeline.handle(failure());

        assert_eq!(report.failed_renderers(), vec!["broken"]);
        assert_eq!(report.decision, PostMortemDecision::Skipped);
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(buffer.contents().contains("thread 'main' panicked at src/main.rs:3:0:"));
        assert_eq!(recorder.count(EventKind::Exception), 1);

        let plain = std::fs::read_to_string(dir.path().join("error-plain.txt")).unwrap();
        let explanation = std::fs::read_to_string(dir.path().join("error-explanation.txt")).unwrap();
        let combined = std::fs::read_to_string(dir.path().join("error.txt")).unwrap();
        assert!(plain.contains("attempt to divide by zero"));
        assert!(explanation.contains("divid"));
        assert!(combined.contains(&plain));
        assert!(combined.contains(&explanation));
        assert!(!dir.path().join("error-broken.txt").exists());
        assert_eq!(report.artifacts.len(), 3);
    }

    #[test]
    fn test_persist_reports_each_file() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, buffer, _) = quiet(vec![Arc::new(PlainRenderer), Arc::new(ExplanationRenderer)]);
        let renderings = pipeline.render(&failure());

        pipeline.persist(&renderings, dir.path());

        let lines = buffer.lines();
        assert_eq!(lines[0], format!("now writing error files to {}:", dir.path().display()));
        assert_eq!(
            lines[1..],
            [
                "done create error-plain.txt error file".to_string(),
                "done create error-explanation.txt error file".to_string(),
                "done create error.txt error file".to_string(),
            ]
        );
    }

    #[test]
    fn test_disabled_rendering_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, buffer, recorder) = quiet(vec![Arc::new(PlainRenderer)]);
        pipeline.set_artifact_dir(Some(dir.path().join("errors")));
        pipeline.router.set_enabled(false);

        let report = pipeline.handle(failure());

        assert!(report.renderings.is_empty());
        assert!(buffer.is_empty());
        assert!(recorder.is_empty());
        assert!(!dir.path().join("errors").exists());
    }

    #[test]
    fn test_record_and_replay_once() {
        let (pipeline, buffer, _) = quiet(vec![Arc::new(PlainRenderer)]);
        pipeline.record(failure());
        assert!(pipeline.has_recorded());
        assert!(buffer.is_empty());

        assert!(pipeline.replay_last().is_some());
        assert!(pipeline.replay_last().is_none());
        assert!(buffer.contents().contains("attempt to divide by zero"));
    }

    #[test]
    fn test_prompt_decline_and_timeout() {
        let session = Arc::new(CountingSession::default());
        let (declining, buffer, _) = pipeline(
            vec![],
            Arc::new(Answer(Some("No"))),
            session.clone(),
            PostMortemPolicy::Prompt,
        );
        assert_eq!(declining.offer_post_mortem(&failure()), PostMortemDecision::Declined);
        assert!(buffer.contents().contains("press enter within 5 seconds"));

        let (silent, _, _) = pipeline(vec![], Arc::new(Answer(None)), session.clone(), PostMortemPolicy::Prompt);
        assert_eq!(silent.offer_post_mortem(&failure()), PostMortemDecision::TimedOut);
        assert_eq!(session.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_prompt_accept_enters_session() {
        let session = Arc::new(CountingSession::default());
        let (pipeline, _, _) = pipeline(vec![], Arc::new(Answer(Some(""))), session.clone(), PostMortemPolicy::Prompt);
        assert_eq!(
            pipeline.offer_post_mortem(&failure()),
            PostMortemDecision::Entered(SessionOutcome::Quit)
        );
        assert_eq!(session.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_overrides_prompt() {
        let session = Arc::new(CountingSession::default());
        let (always, _, _) = pipeline(vec![], Arc::new(NoKeypress), session.clone(), PostMortemPolicy::Always);
        assert_eq!(
            always.offer_post_mortem(&failure()),
            PostMortemDecision::Entered(SessionOutcome::Quit)
        );
        let (prompt, _, _) = pipeline(vec![], Arc::new(NoKeypress), session.clone(), PostMortemPolicy::Prompt);
        assert_eq!(prompt.offer_post_mortem(&failure()), PostMortemDecision::Skipped);
        assert_eq!(session.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_prompt_shows_with_inspection_disabled() {
        let session = Arc::new(CountingSession::default());
        let (pipeline, buffer, _) = pipeline(vec![], Arc::new(Answer(None)), session, PostMortemPolicy::Prompt);
        pipeline.router.set_category_enabled(Category::Inspection, false);

        assert_eq!(pipeline.offer_post_mortem(&failure()), PostMortemDecision::TimedOut);
        assert!(buffer.contents().contains("press enter within 5 seconds"));
    }
}
