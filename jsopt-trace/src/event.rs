//! Event tree model and its JSON record shape.

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

/// Record discriminator for timed events.
const RECORD_TYPE_EVENT: i32 = -2;
/// Record discriminator for timeline marks.
const RECORD_TYPE_MARK: i32 = 11;

/// A category of traced work.
///
/// Categories are plain `const` values so that any crate can declare its
/// own next to the code it instruments. The name and color are what an
/// external viewer shows; `high_volume` marks categories that can be
/// switched off wholesale to save memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventType {
    pub name: &'static str,
    pub color: &'static str,
    pub high_volume: bool,
}

impl EventType {
    pub const fn new(name: &'static str, color: &'static str) -> Self {
        EventType {
            name,
            color,
            high_volume: false,
        }
    }

    /// Same category, flagged as high volume.
    pub const fn high_volume(self) -> Self {
        EventType {
            high_volume: true,
            ..self
        }
    }

    /// Synthetic child recording host pause time (see [`crate::pause`]).
    pub const GC: EventType = EventType::new("Garbage Collection", "#AA5555");

    /// Synthetic child recording time spent inside the logger itself.
    pub const OVERHEAD: EventType = EventType::new("Trace Overhead", "#FF0000");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Typed(EventType),
    /// Zero-duration timeline marker.
    Mark,
}

/// One timed span and everything nested inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub(crate) id: u64,
    kind: EventKind,
    start_nanos: u64,
    duration_nanos: u64,
    closed: bool,
    data: Vec<(String, String)>,
    children: Vec<Event>,
}

impl Event {
    /// `data` must already be validated as key/value pairs.
    pub(crate) fn open(id: u64, kind: EventKind, start_nanos: u64, data: &[&str]) -> Self {
        let mut event = Event {
            id,
            kind,
            start_nanos,
            duration_nanos: 0,
            closed: false,
            data: Vec::new(),
            children: Vec::new(),
        };
        event.push_data(data);
        event
    }

    /// Builds an already-closed event, used for synthetic children.
    pub(crate) fn closed(
        id: u64,
        kind: EventKind,
        start_nanos: u64,
        duration_nanos: u64,
        data: &[&str],
    ) -> Self {
        let mut event = Event::open(id, kind, start_nanos, data);
        event.duration_nanos = duration_nanos;
        event.closed = true;
        event
    }

    pub(crate) fn close(&mut self, end_nanos: u64) {
        debug_assert!(!self.closed, "event closed twice");
        self.duration_nanos = end_nanos.saturating_sub(self.start_nanos);
        self.closed = true;
    }

    pub(crate) fn extend_duration(&mut self, nanos: u64) {
        self.duration_nanos = self.duration_nanos.saturating_add(nanos);
    }

    pub(crate) fn push_data(&mut self, data: &[&str]) {
        for pair in data.chunks_exact(2) {
            self.data.push((pair[0].to_string(), pair[1].to_string()));
        }
    }

    pub(crate) fn push_child(&mut self, child: Event) {
        self.children.push(child);
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Display name of the category, `None` for marks.
    pub fn type_name(&self) -> Option<&'static str> {
        match self.kind {
            EventKind::Typed(ty) => Some(ty.name),
            EventKind::Mark => None,
        }
    }

    pub fn start_nanos(&self) -> u64 {
        self.start_nanos
    }

    pub fn duration_nanos(&self) -> u64 {
        self.duration_nanos
    }

    pub fn end_nanos(&self) -> u64 {
        self.start_nanos.saturating_add(self.duration_nanos)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn children(&self) -> &[Event] {
        &self.children
    }

    pub fn data(&self) -> &[(String, String)] {
        &self.data
    }

    /// Latest value recorded for `key`.
    pub fn datum(&self, key: &str) -> Option<&str> {
        self.data
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Serializes the subtree as a single JSON line (no trailing newline).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

pub(crate) fn nanos_to_millis(nanos: u64) -> f64 {
    nanos as f64 / 1_000_000.0
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.kind {
            EventKind::Typed(ty) => {
                let mut record = serializer.serialize_struct("Event", 7)?;
                record.serialize_field("type", &RECORD_TYPE_EVENT)?;
                record.serialize_field("typeName", ty.name)?;
                record.serialize_field("color", ty.color)?;
                record.serialize_field("time", &nanos_to_millis(self.start_nanos))?;
                record.serialize_field("duration", &nanos_to_millis(self.duration_nanos))?;
                record.serialize_field("data", &DataObject(&self.data))?;
                record.serialize_field("children", &self.children)?;
                record.end()
            }
            EventKind::Mark => {
                let mut record = serializer.serialize_struct("Mark", 4)?;
                record.serialize_field("type", &RECORD_TYPE_MARK)?;
                record.serialize_field("time", &nanos_to_millis(self.start_nanos))?;
                record.serialize_field("duration", &0.0f64)?;
                record.serialize_field("data", &DataObject(&self.data))?;
                record.end()
            }
        }
    }
}

/// Flat JSON object over the recorded pairs. A repeated key keeps its first
/// position and takes its last value.
struct DataObject<'a>(&'a [(String, String)]);

impl Serialize for DataObject<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (index, (key, _)) in self.0.iter().enumerate() {
            if self.0[..index].iter().any(|(k, _)| k == key) {
                continue;
            }
            let value = self.0[index..]
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .unwrap_or_default();
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
