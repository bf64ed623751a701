// src/exec/pump.rs

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::buffer::LineBuffer;
use crate::types::StreamKind;

/// Copy `reader` into `buffer` line by line until end of stream.
///
/// Every appended line is followed by one activity signal carrying `kind`.
/// Read errors end the pump like EOF does. Bytes that are not valid UTF-8
/// are replaced rather than dropped.
///
/// Returns the number of lines pumped.
pub async fn pump_lines<R>(
    reader: R,
    kind: StreamKind,
    buffer: LineBuffer,
    activity: mpsc::UnboundedSender<StreamKind>,
) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut raw = Vec::new();
    let mut count = 0usize;

    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw).await {
            Ok(0) => break,
            Ok(_) => {
                let line = decode_line(&raw);
                trace!(stream = %kind, %line, "line");
                buffer.push(line);
                count += 1;
                // The session stops listening once its terminal report is out.
                let _ = activity.send(kind);
            }
            Err(e) => {
                debug!(stream = %kind, error = %e, "read error; treating as end of stream");
                break;
            }
        }
    }

    debug!(stream = %kind, lines = count, "stream closed");
    count
}

fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pumps_every_line_and_signals_each() {
        let input: &[u8] = b"one\r\ntwo\nthree";
        let buffer = LineBuffer::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let n = pump_lines(input, StreamKind::Stdout, buffer.clone(), tx).await;

        assert_eq!(n, 3);
        assert_eq!(buffer.drain_all(), vec!["one", "two", "three"]);

        let mut signals = 0;
        while let Ok(kind) = rx.try_recv() {
            assert_eq!(kind, StreamKind::Stdout);
            signals += 1;
        }
        assert_eq!(signals, 3);
    }

    #[tokio::test]
    async fn keeps_empty_lines_and_replaces_invalid_utf8() {
        let input: &[u8] = b"\n\xffok\n";
        let buffer = LineBuffer::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        pump_lines(input, StreamKind::Stderr, buffer.clone(), tx).await;

        assert_eq!(buffer.drain_all(), vec!["".to_string(), "\u{FFFD}ok".to_string()]);
    }

    #[tokio::test]
    async fn closed_activity_channel_does_not_stop_pumping() {
        let input: &[u8] = b"a\nb\n";
        let buffer = LineBuffer::new();
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        assert_eq!(pump_lines(input, StreamKind::Stdout, buffer.clone(), tx).await, 2);
        assert_eq!(buffer.len(), 2);
    }
}
