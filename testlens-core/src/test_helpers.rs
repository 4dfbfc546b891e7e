// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fakes shared by the unit tests.

use crate::{
    FileUri,
    errors::RunnerExecutionError,
    filesystem::{Filesystem, SearchPath},
    location::Range,
    messages::MessageState,
    orchestrator::{HostSinks, Notice, NoticeSink},
    projector::{
        DecorationSink, DiagnosticSink, EditorId, Marker, MarkerKind, MarkerStyle, StyleHandle,
    },
    report::{Assertion, Diagnostic, Outcome},
    runner::{RunRequest, TestRunner},
};
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    io,
    sync::{Arc, Mutex},
};

/// Builds an assertion anchored at the start of its one-based declaration line.
pub(crate) fn assertion(file: &str, line: u32, outcome: Outcome) -> Assertion {
    let method_name = format!("test_line_{line}");
    Assertion {
        declaring_class: r"Tests\FakeTest".to_owned(),
        qualified_name: format!(r"Tests\FakeTest::{method_name}"),
        method_name,
        file: FileUri::new(file),
        declaration_line: line,
        declaration_range: None,
        range: Range::line(line - 1),
        duration: None,
        outcome,
        failure_message: (outcome != Outcome::Passed).then(String::new),
    }
}

/// An in-memory filesystem. Directories exist if any file lives under them.
#[derive(Clone, Debug)]
pub(crate) struct FakeFilesystem {
    files: BTreeMap<Utf8PathBuf, String>,
    search_path: SearchPath,
    reads: Arc<Mutex<HashMap<Utf8PathBuf, usize>>>,
}

impl FakeFilesystem {
    pub(crate) fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            search_path: SearchPath {
                dirs: Vec::new(),
                suffixes: vec![String::new()],
            },
            reads: Arc::default(),
        }
    }

    pub(crate) fn with_file(mut self, path: &str, text: &str) -> Self {
        self.files.insert(path.into(), text.to_owned());
        self
    }

    pub(crate) fn with_search_path(mut self, search_path: SearchPath) -> Self {
        self.search_path = search_path;
        self
    }

    pub(crate) fn read_count(&self, path: &str) -> usize {
        self.reads
            .lock()
            .unwrap()
            .get(Utf8Path::new(path))
            .copied()
            .unwrap_or_default()
    }
}

impl Filesystem for FakeFilesystem {
    async fn exists(&self, path: &Utf8Path) -> bool {
        self.files.keys().any(|file| file.starts_with(path))
    }

    async fn read_text(&self, path: &Utf8Path) -> io::Result<String> {
        *self
            .reads
            .lock()
            .unwrap()
            .entry(path.to_owned())
            .or_default() += 1;
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{path} not found")))
    }

    fn search_path(&self) -> &SearchPath {
        &self.search_path
    }
}

type FakeResponse = Box<dyn FnOnce() -> Result<String, RunnerExecutionError> + Send>;

/// A runner that replays canned responses in order, and records what it was asked to run.
#[derive(Clone, Default)]
pub(crate) struct FakeRunner {
    responses: Arc<Mutex<VecDeque<FakeResponse>>>,
    requests: Arc<Mutex<Vec<RunRequest>>>,
}

impl FakeRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_report(self, xml: String) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Box::new(move || Ok(xml)));
        self
    }

    pub(crate) fn with_error(
        self,
        error: impl FnOnce() -> RunnerExecutionError + Send + 'static,
    ) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Box::new(move || Err(error())));
        self
    }

    pub(crate) fn requests(&self) -> Vec<RunRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl TestRunner for FakeRunner {
    async fn run_tests(&self, request: &RunRequest) -> Result<String, RunnerExecutionError> {
        self.requests.lock().unwrap().push(request.clone());
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("fake runner has a response queued");
        // Give overlapping triggers a chance to run while this one is in flight.
        tokio::task::yield_now().await;
        response()
    }
}

/// Records every diagnostics publish.
#[derive(Clone, Debug, Default)]
pub(crate) struct RecordingDiagnostics {
    calls: Arc<Mutex<Vec<(FileUri, Vec<Diagnostic>)>>>,
}

impl RecordingDiagnostics {
    pub(crate) fn calls(&self) -> Vec<(FileUri, Vec<Diagnostic>)> {
        self.calls.lock().unwrap().clone()
    }

    /// The diagnostics currently shown for `file`.
    pub(crate) fn current(&self, file: &FileUri) -> Vec<Diagnostic> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(published, _)| published == file)
            .map(|(_, diagnostics)| diagnostics.clone())
            .unwrap_or_default()
    }
}

impl DiagnosticSink for RecordingDiagnostics {
    fn publish(&mut self, file: &FileUri, diagnostics: Vec<Diagnostic>) {
        self.calls
            .lock()
            .unwrap()
            .push((file.clone(), diagnostics));
    }
}

#[derive(Debug, Default)]
struct DecorationState {
    styles: Vec<MarkerStyle>,
    markers: BTreeMap<(EditorId, StyleHandle), Vec<Marker>>,
    apply_count: usize,
}

/// Records marker styles, and the markers currently applied per editor and style.
#[derive(Clone, Debug, Default)]
pub(crate) struct RecordingDecorations {
    state: Arc<Mutex<DecorationState>>,
}

impl RecordingDecorations {
    pub(crate) fn styles(&self) -> Vec<MarkerStyle> {
        self.state.lock().unwrap().styles.clone()
    }

    /// The markers currently applied in `editor` for `state`.
    pub(crate) fn markers(&self, editor: EditorId, state: MessageState) -> Vec<Marker> {
        self.markers_of(editor, MarkerKind::State(state))
    }

    /// The failing-line highlights currently applied in `editor`.
    pub(crate) fn assertion_markers(&self, editor: EditorId) -> Vec<Marker> {
        self.markers_of(editor, MarkerKind::Assertion)
    }

    fn markers_of(&self, editor: EditorId, kind: MarkerKind) -> Vec<Marker> {
        let inner = self.state.lock().unwrap();
        let Some(index) = inner.styles.iter().position(|style| style.kind == kind) else {
            return Vec::new();
        };
        inner
            .markers
            .get(&(editor, StyleHandle(index as u64)))
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn apply_count(&self) -> usize {
        self.state.lock().unwrap().apply_count
    }

    pub(crate) fn snapshot(&self) -> BTreeMap<(EditorId, StyleHandle), Vec<Marker>> {
        self.state.lock().unwrap().markers.clone()
    }
}

impl DecorationSink for RecordingDecorations {
    fn create_marker_style(&mut self, style: &MarkerStyle) -> StyleHandle {
        let mut inner = self.state.lock().unwrap();
        inner.styles.push(style.clone());
        StyleHandle((inner.styles.len() - 1) as u64)
    }

    fn apply_markers(&mut self, editor: EditorId, style: StyleHandle, markers: Vec<Marker>) {
        let mut inner = self.state.lock().unwrap();
        inner.apply_count += 1;
        inner.markers.insert((editor, style), markers);
    }
}

/// Records every notice.
#[derive(Clone, Debug, Default)]
pub(crate) struct RecordingNotices {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotices {
    pub(crate) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl NoticeSink for RecordingNotices {
    fn notify(&mut self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// All three recording sinks, sharing state with the [`HostSinks`] they hand out.
#[derive(Clone, Debug, Default)]
pub(crate) struct RecordingSinks {
    pub(crate) diagnostics: RecordingDiagnostics,
    pub(crate) decorations: RecordingDecorations,
    pub(crate) notices: RecordingNotices,
}

impl RecordingSinks {
    pub(crate) fn host_sinks(&self) -> HostSinks {
        HostSinks {
            diagnostics: Box::new(self.diagnostics.clone()),
            decorations: Box::new(self.decorations.clone()),
            notices: Box::new(self.notices.clone()),
        }
    }
}
