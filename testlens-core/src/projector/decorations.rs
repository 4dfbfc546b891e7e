// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    FileUri,
    location::Range,
    messages::{Message, MessageCollection, MessageState},
};
use indexmap::IndexMap;
use std::fmt;
use tracing::debug;

/// Identifies a marker style created by a [`DecorationSink`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct StyleHandle(pub u64);

/// Identifies an open editor.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct EditorId(pub u64);

impl fmt::Display for EditorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "editor {}", self.0)
    }
}

/// What a marker style is used for.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum MarkerKind {
    /// The gutter marker for messages in one state.
    State(MessageState),

    /// The highlight over the line a failing test stopped at.
    Assertion,
}

impl MarkerKind {
    /// Every kind, in the order styles are created.
    pub const ALL: [MarkerKind; 5] = [
        MarkerKind::State(MessageState::Passed),
        MarkerKind::State(MessageState::Failed),
        MarkerKind::State(MessageState::Skipped),
        MarkerKind::State(MessageState::Risky),
        MarkerKind::Assertion,
    ];
}

/// How markers of one kind look.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MarkerStyle {
    /// The kind of marker this style is used for.
    pub kind: MarkerKind,

    /// The name of the gutter icon, if any.
    pub gutter_icon: Option<String>,

    /// The colour shown in the overview ruler.
    pub overview_ruler_color: String,

    /// Whether the decoration spans the whole line.
    pub whole_line: bool,
}

impl MarkerStyle {
    /// Returns the built-in style for `kind`.
    pub fn default_for(kind: MarkerKind) -> Self {
        let (gutter_icon, overview_ruler_color) = match kind {
            MarkerKind::State(MessageState::Passed) => (Some("passed.svg"), "green"),
            MarkerKind::State(MessageState::Failed) => (Some("failed.svg"), "red"),
            MarkerKind::State(MessageState::Skipped) => (Some("skipped.svg"), "darkgrey"),
            MarkerKind::State(MessageState::Risky) => (Some("risky.svg"), "yellow"),
            MarkerKind::Assertion => (None, "red"),
        };
        Self {
            kind,
            gutter_icon: gutter_icon.map(ToOwned::to_owned),
            overview_ruler_color: overview_ruler_color.to_owned(),
            whole_line: kind == MarkerKind::Assertion,
        }
    }
}

/// A single marker.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Marker {
    /// Where the marker is shown.
    pub range: Range,

    /// The hover text.
    pub hover: String,
}

/// Where decorations are drawn.
pub trait DecorationSink: Send {
    /// Creates a marker style, returning a handle to it.
    fn create_marker_style(&mut self, style: &MarkerStyle) -> StyleHandle;

    /// Replaces every marker of `style` in `editor` with `markers`.
    fn apply_markers(&mut self, editor: EditorId, style: StyleHandle, markers: Vec<Marker>);
}

/// Draws one gutter marker per line and state, and highlights the lines failing tests stopped at.
pub struct DecorationProjector {
    sink: Box<dyn DecorationSink>,
    styles: IndexMap<MarkerKind, StyleHandle>,
}

impl DecorationProjector {
    /// Creates a new projector with the built-in styles.
    pub fn new(sink: Box<dyn DecorationSink>) -> Self {
        Self::with_styles(sink, MarkerKind::ALL.map(MarkerStyle::default_for))
    }

    /// Creates a new projector with the given styles.
    ///
    /// Markers of a kind without a style are not drawn.
    pub fn with_styles(
        mut sink: Box<dyn DecorationSink>,
        styles: impl IntoIterator<Item = MarkerStyle>,
    ) -> Self {
        let styles = styles
            .into_iter()
            .map(|style| (style.kind, sink.create_marker_style(&style)))
            .collect();
        Self { sink, styles }
    }

    /// Removes every marker this projector owns from `editor`.
    pub fn clear(&mut self, editor: EditorId) {
        for &style in self.styles.values() {
            self.sink.apply_markers(editor, style, Vec::new());
        }
    }

    /// Redraws the markers in `editor`, which shows `file`.
    pub fn project(&mut self, collection: &MessageCollection, editor: EditorId, file: &FileUri) {
        // Clear first, so that kinds with no messages left lose their markers.
        self.clear(editor);

        let mut gutters: IndexMap<MessageState, IndexMap<u32, Vec<&Message>>> = IndexMap::new();
        let mut assertions: IndexMap<Range, Vec<&Message>> = IndexMap::new();
        for message in collection.get(file) {
            gutters
                .entry(message.state)
                .or_default()
                .entry(message.line_number)
                .or_default()
                .push(message);
            if message.state == MessageState::Failed {
                assertions.entry(message.range).or_default().push(message);
            }
        }

        debug!("decorating {editor} ({file}) with {} states", gutters.len());
        for (state, lines) in gutters {
            let markers = lines
                .into_iter()
                .map(|(line, messages)| Marker {
                    range: Range::line(line),
                    hover: hover_text(state, &messages),
                })
                .collect();
            self.apply(editor, MarkerKind::State(state), markers);
        }

        if !assertions.is_empty() {
            let markers = assertions
                .into_iter()
                .map(|(range, messages)| Marker {
                    range,
                    hover: hover_text(MessageState::Failed, &messages),
                })
                .collect();
            self.apply(editor, MarkerKind::Assertion, markers);
        }
    }

    fn apply(&mut self, editor: EditorId, kind: MarkerKind, markers: Vec<Marker>) {
        let Some(&style) = self.styles.get(&kind) else {
            debug!("no marker style for {kind:?}");
            return;
        };
        self.sink.apply_markers(editor, style, markers);
    }
}

/// Failed markers show the failure texts of every message on them; others show the state name.
fn hover_text(state: MessageState, messages: &[&Message]) -> String {
    if state == MessageState::Failed {
        let texts = messages
            .iter()
            .filter_map(|message| message.failure_text.as_deref())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>();
        if !texts.is_empty() {
            return texts.join("\n\n");
        }
    }
    state.as_str().to_owned()
}
