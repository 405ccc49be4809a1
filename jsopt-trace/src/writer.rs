//! Background writer: the only code that touches the sink.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::OutputFormat;
use crate::error::Result;
use crate::event::Event;

pub(crate) const WRITER_THREAD_NAME: &str = "jsopt-trace writer";

const HTML_HEADER: &str = concat!(
    "<html isdump=\"true\"><body>",
    "<style>body {font-family:Helvetica; margin-left:15px;}</style>",
    "<h2>Performance dump from jsopt</h2>",
    "<div>Open this file with a trace viewer that understands nested timeline records.</div>",
    "<div style=\"display: none\" id=\"traceData\" version=\"0.17\">\n",
);

const HTML_FOOTER: &str = "</div></body></html>\n";

pub(crate) enum WriterMessage {
    /// A closed root event and its subtree.
    Event(Event),
    /// Flush the sink, then reply.
    Flush(SyncSender<()>),
    Shutdown,
}

pub(crate) struct WriterSettings {
    pub label: String,
    pub format: OutputFormat,
    pub flush_interval: Duration,
}

/// Writes the header on the calling thread, then starts the writer.
///
/// A failure here surfaces to whoever is constructing the logger; after
/// this point sink errors only disable the logger.
pub(crate) fn spawn(
    mut sink: Box<dyn Write + Send>,
    settings: WriterSettings,
    enabled: Arc<AtomicBool>,
) -> Result<(Sender<WriterMessage>, JoinHandle<()>)> {
    if settings.format == OutputFormat::Html {
        sink.write_all(HTML_HEADER.as_bytes())?;
    }

    let (sender, receiver) = mpsc::channel();
    let handle = thread::Builder::new()
        .name(WRITER_THREAD_NAME.to_string())
        .spawn(move || run(sink, settings, receiver, enabled))?;
    Ok((sender, handle))
}

fn run(
    mut sink: Box<dyn Write + Send>,
    settings: WriterSettings,
    queue: Receiver<WriterMessage>,
    enabled: Arc<AtomicBool>,
) {
    let mut next_flush = Instant::now() + settings.flush_interval;
    loop {
        let timeout = next_flush.saturating_duration_since(Instant::now());
        let outcome = match queue.recv_timeout(timeout) {
            Ok(WriterMessage::Event(event)) => write_record(&mut sink, &event),
            Ok(WriterMessage::Flush(reply)) => {
                let outcome = sink.flush();
                let _ = reply.send(());
                outcome
            }
            Ok(WriterMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => Ok(()),
        };

        let outcome = outcome.and_then(|()| {
            if Instant::now() >= next_flush {
                next_flush = Instant::now() + settings.flush_interval;
                sink.flush()
            } else {
                Ok(())
            }
        });

        if let Err(err) = outcome {
            // queued flush requests are released when `queue` drops
            fail(&settings.label, &err, &enabled);
            return;
        }
    }

    let finished = finish(&mut sink, settings.format);
    if let Err(err) = finished {
        fail(&settings.label, &err, &enabled);
    }
    tracing::debug!(sink = %settings.label, "trace writer finished");
}

fn write_record(sink: &mut dyn Write, event: &Event) -> io::Result<()> {
    serde_json::to_writer(&mut *sink, event).map_err(io::Error::from)?;
    sink.write_all(b"\n")
}

fn finish(sink: &mut dyn Write, format: OutputFormat) -> io::Result<()> {
    if format == OutputFormat::Html {
        sink.write_all(HTML_FOOTER.as_bytes())?;
    }
    sink.flush()
}

fn fail(label: &str, err: &io::Error, enabled: &AtomicBool) {
    tracing::error!(sink = %label, error = %err, "unable to write trace log, tracing disabled");
    enabled.store(false, Ordering::Release);
}
