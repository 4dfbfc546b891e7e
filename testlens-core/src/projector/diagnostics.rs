// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    FileUri,
    messages::{MessageCollection, MessageState},
    report::{Diagnostic, Severity},
};
use indexmap::IndexSet;
use tracing::debug;

/// Where diagnostics are published.
pub trait DiagnosticSink: Send {
    /// Replaces every diagnostic shown for `file` with `diagnostics`.
    fn publish(&mut self, file: &FileUri, diagnostics: Vec<Diagnostic>);
}

/// Publishes a diagnostic for every failed message.
pub struct DiagnosticProjector {
    sink: Box<dyn DiagnosticSink>,
    source: String,
    published: IndexSet<FileUri>,
}

impl DiagnosticProjector {
    /// Creates a new projector that labels its diagnostics with `source`.
    pub fn new(sink: Box<dyn DiagnosticSink>, source: impl Into<String>) -> Self {
        Self {
            sink,
            source: source.into(),
            published: IndexSet::new(),
        }
    }

    /// Publishes the diagnostics for `file`.
    ///
    /// The sink is called exactly once, even if there is nothing to show, so that stale
    /// diagnostics are cleared.
    pub fn project(&mut self, collection: &MessageCollection, file: &FileUri) {
        let diagnostics = collection
            .get(file)
            .iter()
            .filter(|message| message.state == MessageState::Failed)
            .map(|message| Diagnostic {
                file: message.file.clone(),
                message: message.failure_text.clone().unwrap_or_default(),
                range: message.range,
                severity: Severity::Error,
                source: self.source.clone(),
            })
            .collect::<Vec<_>>();

        debug!("publishing {} diagnostics for {file}", diagnostics.len());
        self.published.insert(file.clone());
        self.sink.publish(file, diagnostics);
    }

    /// Clears every file this projector has published to.
    pub fn clear_all(&mut self) {
        for file in self.published.drain(..) {
            self.sink.publish(&file, Vec::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        report::Outcome,
        test_helpers::{RecordingDiagnostics, assertion},
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn publishes_failures_only() {
        let sink = RecordingDiagnostics::default();
        let mut projector = DiagnosticProjector::new(Box::new(sink.clone()), "testlens");
        let mut collection = MessageCollection::new();
        collection.put(&[
            assertion("/app/FooTest.php", 9, Outcome::Passed),
            assertion("/app/FooTest.php", 14, Outcome::Failure),
            assertion("/app/FooTest.php", 19, Outcome::Error),
            assertion("/app/FooTest.php", 24, Outcome::Risky),
        ]);

        let file = FileUri::new("/app/FooTest.php");
        projector.project(&collection, &file);

        let calls = sink.calls();
        assert_eq!(calls.len(), 1);
        let (published_file, diagnostics) = &calls[0];
        assert_eq!(published_file, &file);
        assert_eq!(
            diagnostics
                .iter()
                .map(|diagnostic| diagnostic.range.start.line)
                .collect::<Vec<_>>(),
            vec![13, 18]
        );
        assert!(
            diagnostics
                .iter()
                .all(|diagnostic| diagnostic.severity == Severity::Error
                    && diagnostic.source == "testlens")
        );
    }

    #[test]
    fn empty_set_is_still_published() {
        let sink = RecordingDiagnostics::default();
        let mut projector = DiagnosticProjector::new(Box::new(sink.clone()), "testlens");
        let mut collection = MessageCollection::new();
        collection.put(&[assertion("/app/FooTest.php", 9, Outcome::Passed)]);

        let file = FileUri::new("/app/FooTest.php");
        projector.project(&collection, &file);
        assert_eq!(sink.calls(), vec![(file.clone(), Vec::<Diagnostic>::new())]);
    }

    #[test]
    fn clear_all_empties_published_files() {
        let sink = RecordingDiagnostics::default();
        let mut projector = DiagnosticProjector::new(Box::new(sink.clone()), "testlens");
        let mut collection = MessageCollection::new();
        collection.put(&[
            assertion("/app/FooTest.php", 9, Outcome::Failure),
            assertion("/app/BarTest.php", 9, Outcome::Failure),
        ]);

        let foo = FileUri::new("/app/FooTest.php");
        let bar = FileUri::new("/app/BarTest.php");
        projector.project(&collection, &foo);
        projector.project(&collection, &bar);
        projector.clear_all();

        assert!(sink.current(&foo).is_empty());
        assert!(sink.current(&bar).is_empty());
        assert_eq!(sink.calls().len(), 4);

        // Nothing is left to clear.
        projector.clear_all();
        assert_eq!(sink.calls().len(), 4);
    }
}
