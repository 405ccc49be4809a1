use std::io::{self, Write};
use std::sync::{Arc, Barrier};

use jsopt_trace::{EventType, OutputFormat, TraceConfig, TraceLogger};
use parking_lot::Mutex;
use serde_json::Value;

const ROOT: EventType = EventType::new("Root", "#0000FF");
const STEP: EventType = EventType::new("Step", "#00FF00");

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

#[test]
fn two_threads_produce_independent_subtrees() {
    const PER_THREAD: usize = 1000;

    let buffer = SharedBuffer::default();
    let logger = TraceLogger::with_sink(
        Box::new(buffer.clone()),
        TraceConfig {
            format: OutputFormat::Raw,
            ..TraceConfig::default()
        },
    )
    .expect("logger");

    let barrier = Barrier::new(2);
    std::thread::scope(|scope| {
        for worker in ["left", "right"] {
            let logger = &logger;
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                for i in 0..PER_THREAD {
                    let index = i.to_string();
                    let root = logger
                        .start(ROOT, &["worker", worker, "index", &index])
                        .expect("start root");
                    let step = logger.start(STEP, &["worker", worker]).expect("start step");
                    logger.mark(worker);
                    step.end(&[]).expect("end step");
                    root.end(&[]).expect("end root");
                }
            });
        }
    });
    logger.flush();

    let bytes = buffer.0.lock().clone();
    let text = String::from_utf8(bytes).expect("utf8");
    let records: Vec<Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).expect("record"))
        .collect();
    assert_eq!(records.len(), 2 * PER_THREAD);

    let mut next_index = [0usize; 2];
    for record in &records {
        let worker = record["data"]["worker"].as_str().expect("worker");
        let children = record["children"].as_array().expect("children");
        assert_eq!(children.len(), 1);
        let step = &children[0];
        assert_eq!(step["data"]["worker"], worker);
        let marks = step["children"].as_array().expect("marks");
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0]["data"]["message"], worker);

        // per-thread order survives the shared queue
        let slot = usize::from(worker == "right");
        let index: usize = record["data"]["index"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .expect("index");
        assert_eq!(index, next_index[slot]);
        next_index[slot] += 1;
    }
}

#[test]
fn flush_from_many_threads_does_not_deadlock() {
    let logger = TraceLogger::with_sink(Box::new(io::sink()), TraceConfig::default())
        .expect("logger");
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..50 {
                    logger.start(ROOT, &[]).expect("start").end(&[]).expect("end");
                    logger.flush();
                }
            });
        }
    });
    logger.shutdown();
}
