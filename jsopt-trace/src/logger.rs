//! The logger context object.
//!
//! Each thread keeps its own stack of open events inside the logger, so
//! `start`/`end`/`add_data`/`mark` never take a lock. A root event that
//! closes is moved, subtree and all, onto the writer queue.

use std::cell::{RefCell, RefMut};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;
use thread_local::ThreadLocal;

use crate::clock::{self, TimeKeeper};
use crate::config::TraceConfig;
use crate::error::{Result, TraceError, check_pairs};
use crate::event::{Event, EventKind, EventType};
use crate::pause::{PauseSource, PauseTracker};
use crate::writer::{self, WriterMessage, WriterSettings};

pub const MISSED_KEY: &str = "Missed";
pub const MISSED_UNCLOSED: &str = "This event was closed without an explicit call to end()";
pub const MISSED_FELL_OFF: &str = "Fell off the end of the pending events";
pub const MISSED_ABANDONED: &str = "The thread that opened this event exited before closing it";
pub const BASE_TIME_KEY: &str = "baseTime";

/// Process-wide (or test-local) event trace logger.
///
/// Construct one at startup and pass it by reference to the code being
/// instrumented. A disabled logger accepts every call and does nothing.
pub struct TraceLogger {
    active: Option<Active>,
}

struct Active {
    config: TraceConfig,
    /// Cleared when the sink fails or the logger shuts down.
    enabled: Arc<AtomicBool>,
    clock: Box<dyn TimeKeeper>,
    pending: ThreadLocal<RefCell<Pending>>,
    queue: Sender<WriterMessage>,
    writer: Mutex<Option<JoinHandle<()>>>,
    pauses: Option<PauseTracker>,
    next_id: AtomicU64,
}

impl TraceLogger {
    pub fn disabled() -> Self {
        TraceLogger { active: None }
    }

    /// Opens the configured sink. A config without an output path yields a
    /// disabled logger.
    pub fn open(config: TraceConfig) -> Result<Self> {
        let Some(path) = config.output.clone() else {
            return Ok(TraceLogger::disabled());
        };
        let file = File::create(&path)?;
        let label = path.display().to_string();
        Self::start_writer(Box::new(BufWriter::new(file)), label, config)
    }

    /// Like [`TraceLogger::open`], but reports a failure and falls back to a
    /// disabled logger instead of returning it.
    pub fn open_or_disabled(config: TraceConfig) -> Self {
        let target = config
            .output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match Self::open(config) {
            Ok(logger) => logger,
            Err(err) => {
                tracing::error!(sink = %target, error = %err, "unable to open trace log, tracing disabled");
                TraceLogger::disabled()
            }
        }
    }

    /// Enabled logger writing to an arbitrary sink. `config.output` is
    /// ignored.
    pub fn with_sink(sink: Box<dyn Write + Send>, config: TraceConfig) -> Result<Self> {
        Self::start_writer(sink, "<custom sink>".to_string(), config)
    }

    fn start_writer(
        sink: Box<dyn Write + Send>,
        label: String,
        config: TraceConfig,
    ) -> Result<Self> {
        let clock = clock::detect(config.clock)?;
        let enabled = Arc::new(AtomicBool::new(true));
        let settings = WriterSettings {
            label,
            format: config.format,
            flush_interval: config.flush_interval,
        };
        let (queue, handle) = writer::spawn(sink, settings, enabled.clone())?;
        tracing::debug!(clock = config.clock.as_str(), "trace logger started");
        Ok(TraceLogger {
            active: Some(Active {
                config,
                enabled,
                clock,
                pending: ThreadLocal::new(),
                queue,
                writer: Mutex::new(Some(handle)),
                pauses: None,
                next_id: AtomicU64::new(1),
            }),
        })
    }

    /// Installs the collector whose pauses become `GC` children. Only
    /// consulted when `record_pauses` is set.
    pub fn with_pause_source(mut self, source: Box<dyn PauseSource>) -> Self {
        if let Some(active) = self.active.as_mut() {
            active.pauses = Some(PauseTracker::new(source));
        }
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.live().is_some()
    }

    /// False when high-volume categories are being dropped (or nothing is
    /// recorded at all), so callers can skip building their data.
    pub fn high_volume_enabled(&self) -> bool {
        self.live()
            .is_some_and(|active| !active.config.quiet_high_volume)
    }

    fn live(&self) -> Option<&Active> {
        self.active
            .as_ref()
            .filter(|active| active.enabled.load(Ordering::Acquire))
    }

    /// Opens an event nested under the innermost open event of this thread.
    ///
    /// `data` is a flat list of key/value pairs.
    pub fn start(&self, ty: EventType, data: &[&str]) -> Result<EventHandle<'_>> {
        let Some(active) = self.live() else {
            return Ok(EventHandle::dummy(self));
        };
        check_pairs(data)?;
        if ty.high_volume && active.config.quiet_high_volume {
            return Ok(EventHandle::dummy(self));
        }

        let mut stack = active.stack();
        let is_root = stack.is_empty();
        if is_root {
            active.clock.reset_time_base();
        }
        let id = active.next_id();
        let mut event = Event::open(id, EventKind::Typed(ty), active.clock.normalized_nanos(), data);
        if is_root {
            // lets a viewer re-normalize roots against wall time
            let base = active.clock.zero_time_millis().to_string();
            event.push_data(&[BASE_TIME_KEY, &base]);
        }
        stack.push(event);

        Ok(EventHandle {
            logger: self,
            target: Some(Target {
                id,
                thread: thread::current().id(),
            }),
        })
    }

    /// Attaches key/value pairs to the innermost open event of this thread.
    pub fn add_data(&self, data: &[&str]) -> Result<()> {
        let Some(active) = self.live() else {
            return Ok(());
        };
        check_pairs(data)?;
        let mut stack = active.stack();
        let top = stack.last_mut().ok_or(TraceError::NoOpenEvent(
            "tried to add data to an event that never started",
        ))?;
        top.push_data(data);
        Ok(())
    }

    /// Records a zero-duration timeline marker.
    pub fn mark(&self, message: &str) {
        let Some(active) = self.live() else {
            return;
        };
        let mut stack = active.stack();
        if stack.is_empty() {
            active.clock.reset_time_base();
        }
        let mark = Event::closed(
            active.next_id(),
            EventKind::Mark,
            active.clock.normalized_nanos(),
            0,
            &["message", message],
        );
        match stack.last_mut() {
            Some(top) => top.push_child(mark),
            None => {
                drop(stack);
                active.enqueue(mark);
            }
        }
    }

    /// Blocks until everything enqueued so far has reached the sink.
    pub fn flush(&self) {
        let Some(active) = self.live() else {
            return;
        };
        let (reply, done) = mpsc::sync_channel(1);
        if active.queue.send(WriterMessage::Flush(reply)).is_ok() {
            // an error means the writer exited; nothing left to wait for
            let _ = done.recv();
        }
    }

    /// Drains the queue, finishes the sink and stops the writer thread.
    /// Later calls, and calls on a disabled logger, return immediately.
    pub fn shutdown(&self) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        let Some(handle) = active.writer.lock().take() else {
            return;
        };
        let _ = active.queue.send(WriterMessage::Shutdown);
        if handle.join().is_err() {
            tracing::error!("trace writer thread panicked");
        }
        active.enabled.store(false, Ordering::Release);
    }

    fn end_event(&self, target: Target, data: &[&str]) -> Result<()> {
        let Some(active) = self.live() else {
            return Ok(());
        };
        let end_nanos = active.clock.normalized_nanos();
        check_pairs(data)?;
        if target.thread != thread::current().id() {
            return Err(TraceError::WrongThread);
        }

        // polled before borrowing the stack: a pause source is foreign code
        let pauses = match (&active.pauses, active.config.record_pauses) {
            (Some(tracker), true) => tracker.poll(),
            _ => Vec::new(),
        };

        let mut stack = active.stack();
        let mut current = stack.pop().ok_or(TraceError::NoOpenEvent(
            "tried to end an event that never started",
        ))?;
        current.close(end_nanos);

        let mut missed = 0usize;
        while current.id != target.id {
            let Some(mut parent) = stack.pop() else {
                break;
            };
            current.push_data(&[MISSED_KEY, MISSED_UNCLOSED]);
            missed += 1;
            parent.push_child(current);
            parent.close(end_nanos);
            current = parent;
        }
        let fell_off = current.id != target.id;
        if fell_off {
            current.push_data(&[MISSED_KEY, MISSED_FELL_OFF]);
        }
        if missed > 0 || fell_off {
            tracing::warn!(
                event = current.type_name().unwrap_or("mark"),
                missed,
                fell_off,
                "trace events were closed out of order"
            );
        }

        for pause in pauses {
            let start = current.end_nanos().saturating_sub(pause.pause_nanos);
            let count = pause.collection_count.to_string();
            current.push_child(Event::closed(
                active.next_id(),
                EventKind::Typed(EventType::GC),
                start,
                pause.pause_nanos,
                &[
                    "Collector Type",
                    &pause.collector,
                    "Cumulative Collection Count",
                    &count,
                ],
            ));
        }

        current.push_data(data);

        if active.config.record_overhead {
            let overhead_start = current.end_nanos();
            let overhead = active
                .clock
                .normalized_nanos()
                .saturating_sub(overhead_start);
            current.push_child(Event::closed(
                active.next_id(),
                EventKind::Typed(EventType::OVERHEAD),
                overhead_start,
                overhead,
                &[],
            ));
            current.extend_duration(overhead);
        }

        match stack.last_mut() {
            Some(parent) => parent.push_child(current),
            None => {
                drop(stack);
                active.enqueue(current);
            }
        }
        Ok(())
    }
}

impl Drop for TraceLogger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Open events of one thread. `thread_local` hands a slot to a new thread
/// once its previous owner exits, so the owner is recorded alongside.
#[derive(Default)]
struct Pending {
    owner: Option<ThreadId>,
    events: Vec<Event>,
}

impl Active {
    /// The calling thread's open events. Events left behind by an exited
    /// thread that owned the same slot are closed and enqueued first.
    fn stack(&self) -> RefMut<'_, Vec<Event>> {
        let mut pending = self.pending.get_or_default().borrow_mut();
        let me = thread::current().id();
        if pending.owner != Some(me) {
            pending.owner = Some(me);
            let stale = mem::take(&mut pending.events);
            if let Some(root) = settle_abandoned(stale) {
                tracing::warn!(
                    event = root.type_name().unwrap_or("mark"),
                    "trace events were left open by an exited thread"
                );
                self.enqueue(root);
            }
        }
        RefMut::map(pending, |pending| &mut pending.events)
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn enqueue(&self, event: Event) {
        // fails only after the writer gave up, which already disabled us
        let _ = self.queue.send(WriterMessage::Event(event));
    }
}

/// Closes a dead thread's open events innermost first, each at the latest
/// time known inside it, and returns the root.
fn settle_abandoned(mut stale: Vec<Event>) -> Option<Event> {
    let mut current = stale.pop()?;
    let mut end = last_known_nanos(&current);
    current.close(end);
    current.push_data(&[MISSED_KEY, MISSED_ABANDONED]);
    while let Some(mut parent) = stale.pop() {
        end = end.max(parent.start_nanos());
        parent.push_child(current);
        parent.close(end);
        parent.push_data(&[MISSED_KEY, MISSED_ABANDONED]);
        current = parent;
    }
    Some(current)
}

fn last_known_nanos(event: &Event) -> u64 {
    event
        .children()
        .iter()
        .map(Event::end_nanos)
        .fold(event.start_nanos(), u64::max)
}

#[derive(Debug, Clone, Copy)]
struct Target {
    id: u64,
    thread: ThreadId,
}

/// An open event. Close it exactly once with [`EventHandle::end`].
///
/// Handles from a disabled logger (or for a muted category) are dummies
/// whose `end` does nothing.
#[must_use = "an event stays open until `end` is called"]
pub struct EventHandle<'a> {
    logger: &'a TraceLogger,
    target: Option<Target>,
}

impl<'a> EventHandle<'a> {
    fn dummy(logger: &'a TraceLogger) -> Self {
        EventHandle {
            logger,
            target: None,
        }
    }

    pub fn is_dummy(&self) -> bool {
        self.target.is_none()
    }

    /// Closes the event, first closing any inner events left open on this
    /// thread (those are tagged as missed).
    pub fn end(self, data: &[&str]) -> Result<()> {
        match self.target {
            Some(target) => self.logger.end_event(target, data),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::pause::CollectorStats;
    use serde_json::Value;
    use std::io;
    use std::time::Duration;

    const OUTER: EventType = EventType::new("Outer", "#111111");
    const INNER: EventType = EventType::new("Inner", "#222222");
    const NOISY: EventType = EventType::new("Noisy", "#333333").high_volume();

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn records(&self) -> Vec<Value> {
            let bytes = self.0.lock().clone();
            String::from_utf8(bytes)
                .expect("utf8")
                .lines()
                .filter(|line| line.starts_with('{'))
                .map(|line| serde_json::from_str(line).expect("record json"))
                .collect()
        }
    }

    fn raw_config() -> TraceConfig {
        TraceConfig {
            format: OutputFormat::Raw,
            ..TraceConfig::default()
        }
    }

    fn logger_with(config: TraceConfig) -> (TraceLogger, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let logger = TraceLogger::with_sink(Box::new(buffer.clone()), config).expect("logger");
        (logger, buffer)
    }

    fn children(record: &Value) -> &Vec<Value> {
        record["children"].as_array().expect("children array")
    }

    #[test]
    fn nested_events_round_trip() {
        let (logger, buffer) = logger_with(raw_config());
        let outer = logger.start(OUTER, &["phase", "all"]).expect("start outer");
        let inner = logger.start(INNER, &[]).expect("start inner");
        std::thread::sleep(Duration::from_millis(1));
        inner.end(&["result", "ok"]).expect("end inner");
        outer.end(&[]).expect("end outer");
        logger.flush();

        let records = buffer.records();
        assert_eq!(records.len(), 1);
        let a = &records[0];
        assert_eq!(a["typeName"], "Outer");
        assert_eq!(a["data"]["phase"], "all");
        assert!(a["data"][BASE_TIME_KEY].is_string());

        let kids = children(a);
        assert_eq!(kids.len(), 1);
        let b = &kids[0];
        assert_eq!(b["typeName"], "Inner");
        assert_eq!(b["data"]["result"], "ok");
        assert!(b["data"].get(BASE_TIME_KEY).is_none());

        let (a_start, a_dur) = (a["time"].as_f64().unwrap(), a["duration"].as_f64().unwrap());
        let (b_start, b_dur) = (b["time"].as_f64().unwrap(), b["duration"].as_f64().unwrap());
        assert!(a_dur >= b_dur);
        assert!(b_start >= a_start);
        assert!(b_start + b_dur <= a_start + a_dur + 1e-9);
        assert!(b_dur > 0.0);
    }

    #[test]
    fn closing_outer_first_tags_inner_as_missed() {
        let (logger, buffer) = logger_with(raw_config());
        let outer = logger.start(OUTER, &[]).expect("start");
        let _inner = logger.start(INNER, &[]).expect("start");
        outer.end(&[]).expect("end outer");
        logger.flush();

        let records = buffer.records();
        assert_eq!(records.len(), 1, "closing the root must enqueue it");
        let a = &records[0];
        assert!(a["data"].get(MISSED_KEY).is_none());
        let b = &children(a)[0];
        assert_eq!(b["typeName"], "Inner");
        assert_eq!(b["data"][MISSED_KEY], MISSED_UNCLOSED);
    }

    #[test]
    fn stale_handle_falls_off_the_end() {
        let (logger, buffer) = logger_with(raw_config());
        let a = logger.start(OUTER, &[]).expect("start");
        let b = logger.start(INNER, &[]).expect("start");
        a.end(&[]).expect("end a");

        let _c = logger.start(OUTER, &["name", "c"]).expect("start c");
        // b was already closed by a's resync
        b.end(&[]).expect("resync tolerates it");
        logger.flush();

        let records = buffer.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["data"]["name"], "c");
        assert_eq!(records[1]["data"][MISSED_KEY], MISSED_FELL_OFF);
    }

    #[test]
    fn ending_with_nothing_open_is_an_error() {
        let (logger, _buffer) = logger_with(raw_config());
        let a = logger.start(OUTER, &[]).expect("start");
        let b = logger.start(INNER, &[]).expect("start");
        a.end(&[]).expect("end a");
        let err = b.end(&[]).unwrap_err();
        assert!(matches!(err, TraceError::NoOpenEvent(_)));
    }

    #[test]
    fn ending_on_another_thread_is_an_error() {
        let (logger, _buffer) = logger_with(raw_config());
        let handle = logger.start(OUTER, &[]).expect("start");
        let result = std::thread::scope(|scope| {
            scope.spawn(move || handle.end(&[])).join().expect("join")
        });
        assert!(matches!(result, Err(TraceError::WrongThread)));
    }

    #[test]
    fn odd_data_is_rejected() {
        let (logger, _buffer) = logger_with(raw_config());
        assert!(matches!(
            logger.start(OUTER, &["key"]),
            Err(TraceError::UnmatchedData(1))
        ));
        let event = logger.start(OUTER, &[]).expect("start");
        assert!(matches!(
            logger.add_data(&["a", "b", "c"]),
            Err(TraceError::UnmatchedData(3))
        ));
        assert!(matches!(event.end(&["x"]), Err(TraceError::UnmatchedData(1))));
    }

    #[test]
    fn add_data_targets_innermost_event() {
        let (logger, buffer) = logger_with(raw_config());
        assert!(matches!(
            logger.add_data(&["k", "v"]),
            Err(TraceError::NoOpenEvent(_))
        ));
        let outer = logger.start(OUTER, &[]).expect("start");
        let inner = logger.start(INNER, &[]).expect("start");
        logger.add_data(&["where", "inner"]).expect("add");
        inner.end(&[]).expect("end");
        logger.add_data(&["where", "outer"]).expect("add");
        outer.end(&[]).expect("end");
        logger.flush();

        let records = buffer.records();
        assert_eq!(records[0]["data"]["where"], "outer");
        assert_eq!(children(&records[0])[0]["data"]["where"], "inner");
    }

    #[test]
    fn marks_nest_or_stand_alone() {
        let (logger, buffer) = logger_with(raw_config());
        logger.mark("top level");
        let outer = logger.start(OUTER, &[]).expect("start");
        logger.mark("inside");
        outer.end(&[]).expect("end");
        logger.flush();

        let records = buffer.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["type"], 11);
        assert_eq!(records[0]["data"]["message"], "top level");
        let mark = &children(&records[1])[0];
        assert_eq!(mark["type"], 11);
        assert_eq!(mark["duration"], 0.0);
        assert_eq!(mark["data"]["message"], "inside");
    }

    #[test]
    fn overhead_child_extends_duration() {
        let (logger, buffer) = logger_with(TraceConfig {
            record_overhead: true,
            ..raw_config()
        });
        logger.start(OUTER, &[]).expect("start").end(&[]).expect("end");
        logger.flush();

        let record = &buffer.records()[0];
        let overhead = children(record)
            .iter()
            .find(|child| child["typeName"] == EventType::OVERHEAD.name)
            .expect("overhead child");
        let end = record["time"].as_f64().unwrap() + record["duration"].as_f64().unwrap();
        let overhead_end = overhead["time"].as_f64().unwrap() + overhead["duration"].as_f64().unwrap();
        assert!((end - overhead_end).abs() < 1e-6);
    }

    struct OnePause(Mutex<u64>);

    impl PauseSource for OnePause {
        fn collectors(&self) -> Vec<CollectorStats> {
            let mut calls = self.0.lock();
            *calls += 1;
            vec![CollectorStats {
                name: "arena".into(),
                collection_count: *calls,
                total_pause_millis: if *calls > 1 { 2 } else { 0 },
            }]
        }
    }

    #[test]
    fn pause_growth_becomes_gc_children() {
        let (logger, buffer) = logger_with(TraceConfig {
            record_pauses: true,
            ..raw_config()
        });
        let logger = logger.with_pause_source(Box::new(OnePause(Mutex::new(0))));

        logger.start(OUTER, &[]).expect("start").end(&[]).expect("end");
        logger.start(OUTER, &[]).expect("start").end(&[]).expect("end");
        logger.flush();

        let records = buffer.records();
        assert!(children(&records[0]).is_empty());
        let gc = &children(&records[1])[0];
        assert_eq!(gc["typeName"], EventType::GC.name);
        assert_eq!(gc["duration"], 2.0);
        assert_eq!(gc["data"]["Collector Type"], "arena");
        assert_eq!(gc["data"]["Cumulative Collection Count"], "2");
    }

    #[test]
    fn quiet_mode_drops_high_volume_events() {
        let (logger, buffer) = logger_with(TraceConfig {
            quiet_high_volume: true,
            ..raw_config()
        });
        assert!(!logger.high_volume_enabled());
        let outer = logger.start(OUTER, &[]).expect("start");
        let noisy = logger.start(NOISY, &[]).expect("start");
        assert!(noisy.is_dummy());
        noisy.end(&[]).expect("end");
        outer.end(&[]).expect("end");
        logger.flush();

        assert!(children(&buffer.records()[0]).is_empty());
    }

    #[test]
    fn flush_with_empty_queue_returns() {
        let (logger, buffer) = logger_with(raw_config());
        logger.flush();
        logger.flush();
        assert!(buffer.records().is_empty());
    }

    #[test]
    fn shutdown_drains_and_writes_footer() {
        let (logger, buffer) = logger_with(TraceConfig::default());
        for _ in 0..10 {
            logger.start(OUTER, &[]).expect("start").end(&[]).expect("end");
        }
        logger.shutdown();
        logger.shutdown();
        assert!(!logger.is_enabled());

        let text = String::from_utf8(buffer.0.lock().clone()).expect("utf8");
        assert!(text.trim_end().ends_with("</html>"));
        assert_eq!(buffer.records().len(), 10);

        // everything is a no-op afterwards
        let late = logger.start(OUTER, &[]).expect("start");
        assert!(late.is_dummy());
    }

    #[test]
    fn disabled_logger_accepts_everything() {
        let logger = TraceLogger::disabled();
        assert!(!logger.is_enabled());
        assert!(!logger.high_volume_enabled());
        let event = logger.start(OUTER, &["odd"]).expect("no error when disabled");
        assert!(event.is_dummy());
        logger.add_data(&["k"]).expect("no error when disabled");
        logger.mark("ignored");
        event.end(&["x"]).expect("no error when disabled");
        logger.flush();
        logger.shutdown();
    }

    #[test]
    fn config_without_output_opens_disabled() {
        let logger = TraceLogger::open(TraceConfig::default()).expect("open");
        assert!(!logger.is_enabled());
    }

    #[test]
    fn unopenable_path_degrades_to_disabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = TraceConfig::to_path(dir.path().join("missing").join("trace.html"));
        assert!(TraceLogger::open(config.clone()).is_err());
        assert!(!TraceLogger::open_or_disabled(config).is_enabled());
    }

    #[test]
    fn writes_to_file_sink() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("trace.json");
        let logger = TraceLogger::open(TraceConfig {
            format: OutputFormat::Raw,
            ..TraceConfig::to_path(&path)
        })
        .expect("open");
        logger.start(OUTER, &[]).expect("start").end(&[]).expect("end");
        drop(logger);

        let text = std::fs::read_to_string(&path).expect("read trace");
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("\"typeName\":\"Outer\""));
    }
}
