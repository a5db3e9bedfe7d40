use serde::Serialize;
use tracing::trace;

use crate::frame::Frame;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    LayerAdded,
    LayerRemoved,
    LayerChanged,
    /// A render pass finished drawing the subject layer.
    LayerRendered,
    ViewportChanged,
    ImportFailed,
}

/// Something that happened during a pass, tagged with the pass index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub frame_index: u64,
    pub kind: EventKind,
    /// Usually a layer id.
    pub subject: Option<String>,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(
        &mut self,
        frame: Frame,
        kind: EventKind,
        subject: Option<&str>,
        message: impl Into<String>,
    ) {
        let event = Event {
            frame_index: frame.index,
            kind,
            subject: subject.map(str::to_string),
            message: message.into(),
        };
        trace!(frame = event.frame_index, kind = ?event.kind, subject = ?event.subject, "event");
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Drops all but the newest `keep` events.
    pub fn retain_latest(&mut self, keep: usize) {
        let excess = self.events.len().saturating_sub(keep);
        if excess > 0 {
            self.events.drain(..excess);
        }
    }
}
