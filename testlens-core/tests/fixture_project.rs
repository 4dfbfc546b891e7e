// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs the orchestrator end to end against the PHPUnit fixture project.

use camino::{Utf8Path, Utf8PathBuf};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use testlens_core::{
    FileUri,
    config::TestlensConfig,
    errors::RunnerExecutionError,
    filesystem::{OsFilesystem, SearchPath},
    location::{Position, Range},
    messages::MessageState,
    orchestrator::{Editor, HostSinks, Notice, NoticeSink, Orchestrator, TriggerOutcome},
    projector::{
        DecorationSink, DiagnosticSink, EditorId, Marker, MarkerKind, MarkerStyle, StyleHandle,
    },
    report::Diagnostic,
    runner::{RunRequest, TestRunner},
};

fn project_dir() -> Utf8PathBuf {
    let dir = Utf8Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures/phpunit-project");
    FileUri::new(dir.as_str()).as_path().to_owned()
}

fn editor(id: u64, relative: &str) -> Editor {
    let path = project_dir().join(relative);
    let text = std::fs::read_to_string(&path).expect("fixture file is readable");
    Editor::new(EditorId(id), path.as_str(), text)
}

/// Serves the recorded report, as PHPUnit would have written it for this checkout.
#[derive(Clone, Default)]
struct RecordedRunner {
    requests: Arc<Mutex<Vec<RunRequest>>>,
}

impl TestRunner for RecordedRunner {
    async fn run_tests(&self, request: &RunRequest) -> Result<String, RunnerExecutionError> {
        self.requests.lock().unwrap().push(request.clone());
        let project = project_dir();
        let report = tokio::fs::read_to_string(project.join("junit.xml")).await?;
        Ok(report.replace("%PROJECT%", project.as_str()))
    }
}

#[derive(Clone, Default)]
struct Host {
    diagnostics: Arc<Mutex<Vec<(FileUri, Vec<Diagnostic>)>>>,
    styles: Arc<Mutex<Vec<MarkerStyle>>>,
    markers: Arc<Mutex<Vec<(EditorId, StyleHandle, Vec<Marker>)>>>,
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl Host {
    fn sinks(&self) -> HostSinks {
        HostSinks {
            diagnostics: Box::new(self.clone()),
            decorations: Box::new(self.clone()),
            notices: Box::new(self.clone()),
        }
    }

    fn diagnostics(&self, file: &FileUri) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(published, _)| published == file)
            .map(|(_, diagnostics)| diagnostics.clone())
            .unwrap_or_default()
    }

    fn marker_ranges(&self, editor: EditorId, kind: MarkerKind) -> Vec<Range> {
        let styles = self.styles.lock().unwrap();
        let handle = StyleHandle(
            styles
                .iter()
                .position(|style| style.kind == kind)
                .expect("style exists") as u64,
        );
        self.markers
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(id, style, _)| *id == editor && *style == handle)
            .map(|(_, _, markers)| markers.iter().map(|marker| marker.range).collect())
            .unwrap_or_default()
    }

    fn marker_lines(&self, editor: EditorId, state: MessageState) -> Vec<u32> {
        self.marker_ranges(editor, MarkerKind::State(state))
            .iter()
            .map(|range| range.start.line)
            .collect()
    }
}

impl DiagnosticSink for Host {
    fn publish(&mut self, file: &FileUri, diagnostics: Vec<Diagnostic>) {
        self.diagnostics
            .lock()
            .unwrap()
            .push((file.clone(), diagnostics));
    }
}

impl DecorationSink for Host {
    fn create_marker_style(&mut self, style: &MarkerStyle) -> StyleHandle {
        let mut styles = self.styles.lock().unwrap();
        styles.push(style.clone());
        StyleHandle(styles.len() as u64 - 1)
    }

    fn apply_markers(&mut self, editor: EditorId, style: StyleHandle, markers: Vec<Marker>) {
        self.markers.lock().unwrap().push((editor, style, markers));
    }
}

impl NoticeSink for Host {
    fn notify(&mut self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

fn range(line: u32, start: u32, end: u32) -> Range {
    Range::new(Position::new(line, start), Position::new(line, end))
}

#[tokio::test]
async fn annotates_fixture_project() {
    let host = Host::default();
    let runner = RecordedRunner::default();
    let orchestrator = Orchestrator::new(
        TestlensConfig::default_config(),
        runner.clone(),
        OsFilesystem::new(SearchPath::default()),
        host.sinks(),
    );

    let project = project_dir();
    let assertions_test = editor(1, "tests/AssertionsTest.php");
    let calculator_test = FileUri::new(project.join("tests/CalculatorTest.php").as_str());

    let outcome = orchestrator.will_save(&assertions_test).await;
    assert_eq!(
        outcome,
        TriggerOutcome::Annotated {
            files: vec![assertions_test.file.clone(), calculator_test.clone()],
        }
    );

    let requests = runner.requests.lock().unwrap().clone();
    assert_eq!(
        requests,
        vec![RunRequest {
            executable: project.join("vendor/bin/phpunit"),
            config_file: Some(project.join("phpunit.xml")),
            target: assertions_test.file.clone(),
            working_dir: project.clone(),
        }]
    );

    let diagnostics = host.diagnostics(&assertions_test.file);
    assert_eq!(
        diagnostics
            .iter()
            .map(|diagnostic| diagnostic.range)
            .collect::<Vec<_>>(),
        vec![range(15, 8, 33), range(20, 8, 76)]
    );
    assert_eq!(
        diagnostics[0].message,
        format!(
            "Tests\\AssertionsTest::test_error\nFailed asserting that false is true.\n\n\
             {project}/tests/AssertionsTest.php:16\n"
        )
    );

    assert_eq!(
        host.diagnostics(&calculator_test)
            .iter()
            .map(|diagnostic| diagnostic.range)
            .collect::<Vec<_>>(),
        vec![
            range(50, 8, 19),
            range(25, 8, 53),
            range(34, 8, 63),
            range(45, 8, 44),
        ]
    );

    let id = assertions_test.id;
    assert_eq!(host.marker_lines(id, MessageState::Passed), vec![8, 31]);
    assert_eq!(host.marker_lines(id, MessageState::Failed), vec![15, 20]);
    assert_eq!(host.marker_lines(id, MessageState::Risky), vec![23, 46]);
    assert_eq!(host.marker_lines(id, MessageState::Skipped), vec![36, 41]);
    assert_eq!(
        host.marker_ranges(id, MarkerKind::Assertion),
        vec![range(15, 8, 33), range(20, 8, 76)]
    );

    let calculator_messages = orchestrator.messages(&calculator_test);
    assert_eq!(
        calculator_messages
            .iter()
            .map(|message| (message.line_number, message.state))
            .collect::<Vec<_>>(),
        vec![
            (50, MessageState::Failed),
            (16, MessageState::Passed),
            (25, MessageState::Failed),
            (31, MessageState::Passed),
            (31, MessageState::Passed),
            (34, MessageState::Failed),
            (45, MessageState::Failed),
        ]
    );
    assert!(host.notices.lock().unwrap().is_empty());

    // The run covered CalculatorTest too, so switching to it needs no run.
    let calculator_editor = editor(2, "tests/CalculatorTest.php");
    assert_eq!(
        orchestrator.active_editor_changed(&calculator_editor).await,
        TriggerOutcome::Restored
    );
    assert_eq!(runner.requests.lock().unwrap().len(), 1);
    assert_eq!(
        host.marker_lines(calculator_editor.id, MessageState::Passed),
        vec![16, 31]
    );
    assert_eq!(
        host.marker_ranges(calculator_editor.id, MarkerKind::Assertion),
        vec![
            range(50, 8, 19),
            range(25, 8, 53),
            range(34, 8, 63),
            range(45, 8, 44),
        ]
    );

    // Source files outside the test markers are never run.
    let calculator = editor(3, "src/Calculator.php");
    assert_eq!(
        orchestrator.will_save(&calculator).await,
        TriggerOutcome::Ineligible
    );

    orchestrator.dispose();
    assert!(host.diagnostics(&assertions_test.file).is_empty());
    assert!(host.diagnostics(&calculator_test).is_empty());
}

#[cfg(unix)]
mod unix {
    use super::*;
    use pretty_assertions::assert_eq;
    use testlens_core::runner::ProcessRunner;

    /// Runs the fixture's stand-in `phpunit` script through `/bin/sh`.
    struct ShellRunner {
        inner: ProcessRunner,
    }

    impl TestRunner for ShellRunner {
        async fn run_tests(&self, request: &RunRequest) -> Result<String, RunnerExecutionError> {
            assert_eq!(request.executable, project_dir().join("vendor/bin/phpunit"));
            let request = RunRequest {
                executable: "/bin/sh".into(),
                config_file: None,
                ..request.clone()
            };
            self.inner.run_tests(&request).await
        }
    }

    #[tokio::test]
    async fn runs_fixture_script() {
        let mut config = TestlensConfig::default_config();
        config.runner.extra_args = vec![project_dir().join("vendor/bin/phpunit").to_string()];
        let runner = ShellRunner {
            inner: ProcessRunner::new(&config.runner),
        };

        let host = Host::default();
        let orchestrator = Orchestrator::new(
            config,
            runner,
            OsFilesystem::new(SearchPath::default()),
            host.sinks(),
        );

        let calculator_test = editor(1, "tests/CalculatorTest.php");
        let outcome = orchestrator.will_save(&calculator_test).await;
        assert!(
            matches!(outcome, TriggerOutcome::Annotated { ref files } if files.len() == 2),
            "unexpected outcome: {outcome:?}, notices: {:?}",
            host.notices.lock().unwrap()
        );
        assert_eq!(host.diagnostics(&calculator_test.file).len(), 4);
        assert_eq!(
            host.marker_lines(calculator_test.id, MessageState::Failed),
            vec![50, 25, 34, 45]
        );
    }
}
