// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The event-driven controller that decides when tests run and when cached results are shown.
//!
//! The orchestrator reacts to two triggers from the host editor: a document being saved, and the
//! active editor changing. A save always re-runs the document's tests; an editor switch restores
//! cached results if there are any, and runs the tests otherwise.
//!
//! Only one run is in flight at a time. A trigger that arrives while a run is in flight is
//! dropped, not queued.

use crate::{
    FileUri,
    config::TestlensConfig,
    errors::{AnnotateError, DisplayErrorChain},
    filesystem::Filesystem,
    messages::{Message, MessageCollection},
    projector::{DecorationProjector, DecorationSink, DiagnosticProjector, DiagnosticSink, EditorId},
    report::{ParsedReport, ReportParser},
    runner::{TestRunner, locate_runner},
};
use indexmap::IndexMap;
use std::{
    fmt,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};
use tracing::{debug, info, warn};

/// An open editor, as seen by a trigger.
#[derive(Clone, Debug)]
pub struct Editor {
    /// The editor's identity.
    pub id: EditorId,

    /// The document shown in the editor.
    pub file: FileUri,

    /// The current text of the document.
    pub text: String,
}

impl Editor {
    /// Creates a new editor.
    pub fn new(id: EditorId, file: impl Into<FileUri>, text: impl Into<String>) -> Self {
        Self {
            id,
            file: file.into(),
            text: text.into(),
        }
    }
}

/// Where an editor is in its annotation lifecycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AnnotationState {
    /// Nothing has been shown yet.
    Unannotated,

    /// A run for this editor is in flight.
    Pending,

    /// Results are shown.
    Annotated,
}

/// What a trigger ended up doing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TriggerOutcome {
    /// The document is not a test file, or is excluded.
    Ineligible,

    /// Another run was in flight, so this trigger was dropped.
    Dropped,

    /// Cached results were shown without running anything.
    Restored,

    /// Tests ran and their results were shown for these files.
    Annotated {
        /// The files whose results were replaced.
        files: Vec<FileUri>,
    },

    /// The run failed. A notice was emitted and cached results were left alone.
    Failed,

    /// The orchestrator has been disposed.
    Disposed,
}

/// The severity of a [`Notice`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NoticeLevel {
    /// Something was skipped but results were still shown.
    Warning,

    /// A run failed.
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeLevel::Warning => write!(f, "warning"),
            NoticeLevel::Error => write!(f, "error"),
        }
    }
}

/// A user-visible message about a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    /// How severe the notice is.
    pub level: NoticeLevel,

    /// The text to show.
    pub message: String,
}

/// Where notices are shown.
pub trait NoticeSink: Send {
    /// Shows `notice` to the user.
    fn notify(&mut self, notice: Notice);
}

/// The host editor surfaces the orchestrator draws on.
pub struct HostSinks {
    /// Receives diagnostics.
    pub diagnostics: Box<dyn DiagnosticSink>,

    /// Receives gutter markers.
    pub decorations: Box<dyn DecorationSink>,

    /// Receives notices.
    pub notices: Box<dyn NoticeSink>,
}

/// Drives test runs and projects their results onto open editors.
pub struct Orchestrator<R, F> {
    config: TestlensConfig,
    runner: R,
    fs: F,
    running: AtomicBool,
    disposed: AtomicBool,
    state: Mutex<OrchestratorState>,
}

struct OrchestratorState {
    messages: MessageCollection,
    diagnostics: DiagnosticProjector,
    decorations: DecorationProjector,
    notices: Box<dyn NoticeSink>,
    editors: IndexMap<EditorId, TrackedEditor>,
}

struct TrackedEditor {
    file: FileUri,
    state: AnnotationState,
}

impl OrchestratorState {
    fn track(&mut self, editor: &Editor) -> AnnotationState {
        let tracked = self
            .editors
            .entry(editor.id)
            .or_insert_with(|| TrackedEditor {
                file: editor.file.clone(),
                state: AnnotationState::Unannotated,
            });
        if tracked.file != editor.file {
            // The editor now shows a different document; the old document's markers must go.
            debug!("{} switched from {} to {}", editor.id, tracked.file, editor.file);
            tracked.file = editor.file.clone();
            tracked.state = AnnotationState::Unannotated;
            self.decorations.clear(editor.id);
        }
        tracked.state
    }

    /// Stops tracking `editor` if it no longer shows an eligible document, removing its markers.
    fn untrack_ineligible(&mut self, editor: &Editor) {
        if self.editors.shift_remove(&editor.id).is_some() {
            debug!("{} now shows ineligible {}, clearing its markers", editor.id, editor.file);
            self.decorations.clear(editor.id);
        }
    }

    fn set_state(&mut self, editor: EditorId, state: AnnotationState) {
        if let Some(tracked) = self.editors.get_mut(&editor) {
            tracked.state = state;
        }
    }

    /// Projects the cache onto `files`: diagnostics for each file, and decorations for each
    /// editor showing one.
    fn project(&mut self, files: &[FileUri]) {
        for file in files {
            self.diagnostics.project(&self.messages, file);
        }
        for (&id, tracked) in &mut self.editors {
            if files.contains(&tracked.file) {
                self.decorations.project(&self.messages, id, &tracked.file);
                tracked.state = AnnotationState::Annotated;
            }
        }
    }
}

impl<R: TestRunner, F: Filesystem> Orchestrator<R, F> {
    /// Creates a new orchestrator.
    ///
    /// Marker styles are created on `sinks.decorations` here, once.
    pub fn new(config: TestlensConfig, runner: R, fs: F, sinks: HostSinks) -> Self {
        let diagnostics =
            DiagnosticProjector::new(sinks.diagnostics, config.annotate.diagnostic_source.clone());
        let decorations = DecorationProjector::new(sinks.decorations);
        Self {
            config,
            runner,
            fs,
            running: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            state: Mutex::new(OrchestratorState {
                messages: MessageCollection::new(),
                diagnostics,
                decorations,
                notices: sinks.notices,
                editors: IndexMap::new(),
            }),
        }
    }

    /// Handles `editor`'s document being about to be saved.
    pub async fn will_save(&self, editor: &Editor) -> TriggerOutcome {
        if self.is_disposed() {
            return TriggerOutcome::Disposed;
        }
        if !self.is_eligible(editor) {
            self.lock().untrack_ineligible(editor);
            return TriggerOutcome::Ineligible;
        }
        self.lock().track(editor);
        self.annotate(editor).await
    }

    /// Handles `editor` becoming the active editor.
    pub async fn active_editor_changed(&self, editor: &Editor) -> TriggerOutcome {
        if self.is_disposed() {
            return TriggerOutcome::Disposed;
        }
        if !self.is_eligible(editor) {
            self.lock().untrack_ineligible(editor);
            return TriggerOutcome::Ineligible;
        }

        {
            let mut state = self.lock();
            state.track(editor);
            if state.messages.has(&editor.file) {
                debug!("restoring cached results for {}", editor.file);
                let state = &mut *state;
                state.decorations.project(&state.messages, editor.id, &editor.file);
                state.diagnostics.project(&state.messages, &editor.file);
                state.set_state(editor.id, AnnotationState::Annotated);
                return TriggerOutcome::Restored;
            }
        }

        self.annotate(editor).await
    }

    /// Stops tracking `editor`. Its file's cached results are kept.
    pub fn editor_closed(&self, editor: EditorId) {
        self.lock().editors.shift_remove(&editor);
    }

    /// Returns the annotation state of `editor`, or `None` if it isn't tracked.
    pub fn editor_state(&self, editor: EditorId) -> Option<AnnotationState> {
        self.lock().editors.get(&editor).map(|tracked| tracked.state)
    }

    /// Returns the cached messages for `file`.
    pub fn messages(&self, file: &FileUri) -> Vec<Message> {
        self.lock().messages.get(file).to_vec()
    }

    /// Releases cached results and clears every diagnostic published so far.
    ///
    /// Later triggers are ignored. Calling this more than once is harmless.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("disposing orchestrator");
        let mut state = self.lock();
        state.messages.dispose();
        state.diagnostics.clear_all();
        state.editors.clear();
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn is_eligible(&self, editor: &Editor) -> bool {
        let eligible = self
            .config
            .annotate
            .is_eligible(editor.file.as_path(), &editor.text);
        if !eligible {
            debug!("{} is not eligible for annotation", editor.file);
        }
        eligible
    }

    fn lock(&self) -> MutexGuard<'_, OrchestratorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn annotate(&self, editor: &Editor) -> TriggerOutcome {
        let Some(_guard) = RunningGuard::acquire(&self.running) else {
            debug!("a run is already in flight, dropping trigger for {}", editor.file);
            return TriggerOutcome::Dropped;
        };

        let previous = {
            let mut state = self.lock();
            let previous = state.track(editor);
            state.set_state(editor.id, AnnotationState::Pending);
            previous
        };

        let result = self.run(&editor.file).await;

        let mut state = self.lock();
        if self.is_disposed() {
            debug!("discarding results for {}: disposed during the run", editor.file);
            return TriggerOutcome::Disposed;
        }

        match result {
            Ok(parsed) => {
                let files = state.messages.put(&parsed.assertions);
                state.project(&files);
                state.set_state(editor.id, AnnotationState::Annotated);
                if !parsed.malformed.is_empty() {
                    state.notices.notify(Notice {
                        level: NoticeLevel::Warning,
                        message: format!(
                            "skipped {} testcases that could not be located in the report for {}",
                            parsed.malformed.len(),
                            editor.file,
                        ),
                    });
                }
                info!("annotated {} files after running {}", files.len(), editor.file);
                TriggerOutcome::Annotated { files }
            }
            Err(error) => {
                state.set_state(editor.id, previous);
                let error = DisplayErrorChain::new(error);
                warn!("failed to annotate {}: {error}", editor.file);
                state.notices.notify(Notice {
                    level: NoticeLevel::Error,
                    message: error.to_string(),
                });
                TriggerOutcome::Failed
            }
        }
    }

    async fn run(&self, target: &FileUri) -> Result<ParsedReport, AnnotateError> {
        let request = locate_runner(&self.fs, &self.config.runner, target).await?;
        let xml = self.runner.run_tests(&request).await?;
        let parsed = ReportParser::new(&self.fs, &self.config.annotate)
            .parse(&xml, Some(target))
            .await?;
        Ok(parsed)
    }
}

/// Holds the running flag for the duration of one run.
struct RunningGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
