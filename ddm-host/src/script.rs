//! NDJSON host scripts.
//!
//! Each non-empty line is one host action, tagged by `op`:
//!
//! ```text
//! {"op":"event","event":{"name":"Viewed Page","page":{"type":"home"}}}
//! {"op":"change","key":"user.id","value":"42"}
//! {"op":"trigger","trigger":"click","setting":".banner","payload":{"id":"b1"}}
//! {"op":"initialize"}
//! {"op":"reset"}
//! {"op":"sleep","ms":250}
//! ```
//!
//! Lines starting with `#` are comments.

use ddm_core::events::{Ingress, IngressSender};
use ddm_sdk::{ChangeOp, Event};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("coordinator stopped before the script finished")]
    Closed,
}

/// One action of a host script.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ScriptLine {
    Event {
        event: Event,
    },
    Change {
        key: String,
        value: Value,
    },
    Trigger {
        trigger: String,
        setting: String,
        #[serde(default)]
        payload: Value,
    },
    Initialize,
    Reset,
    /// Pause the script so the change-detector tick can run.
    Sleep {
        ms: u64,
    },
}

impl ScriptLine {
    pub fn parse(line: &str) -> Result<Option<Self>, serde_json::Error> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        serde_json::from_str(line).map(Some)
    }

    /// The ingress message for this action. `Sleep` has none.
    pub fn into_ingress(self) -> Option<Ingress> {
        match self {
            ScriptLine::Event { event } => Some(Ingress::from(event)),
            ScriptLine::Change { key, value } => Some(Ingress::from(ChangeOp::new(key, value))),
            ScriptLine::Trigger {
                trigger,
                setting,
                payload,
            } => Some(Ingress::Signal {
                trigger,
                setting,
                payload,
            }),
            ScriptLine::Initialize => Some(Ingress::Initialize),
            ScriptLine::Reset => Some(Ingress::Reset),
            ScriptLine::Sleep { .. } => None,
        }
    }
}

/// Feed every line of `reader` to the coordinator, in order.
///
/// Returns the number of actions sent.
pub async fn feed<R>(reader: R, ingress_tx: &IngressSender) -> Result<usize, ScriptError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = LinesStream::new(BufReader::new(reader).lines());
    let mut line_no = 0;
    let mut sent = 0;

    while let Some(line) = lines.next().await {
        line_no += 1;
        let parsed = ScriptLine::parse(&line?).map_err(|source| ScriptError::Parse {
            line: line_no,
            source,
        })?;
        let Some(action) = parsed else {
            continue;
        };

        if let ScriptLine::Sleep { ms } = action {
            debug!(ms, "Script sleeping");
            tokio::time::sleep(Duration::from_millis(ms)).await;
            continue;
        }
        if let Some(message) = action.into_ingress() {
            ingress_tx
                .send(message)
                .await
                .map_err(|_| ScriptError::Closed)?;
            sent += 1;
        }
    }

    info!(lines = line_no, actions = sent, "Script finished");
    Ok(sent)
}

/// Like [`feed`], but gives up as soon as shutdown is requested.
///
/// A reader blocked on an idle stdin would otherwise keep the host alive
/// after the coordinator has stopped. Returns `None` when interrupted.
pub async fn feed_until_shutdown<R>(
    reader: R,
    ingress_tx: &IngressSender,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Option<Result<usize, ScriptError>>
where
    R: AsyncRead + Unpin,
{
    tokio::select! {
        fed = feed(reader, ingress_tx) => Some(fed),
        _ = shutdown_rx.wait_for(|stop| *stop) => {
            info!("Shutdown requested, abandoning script");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddm_core::events::ingress_channel;
    use serde_json::json;

    #[test]
    fn test_parse_lines() {
        let line = ScriptLine::parse(r#"{"op":"event","event":{"name":"Viewed Page","page":"home"}}"#)
            .unwrap()
            .unwrap();
        match line.into_ingress() {
            Some(Ingress::Event(queued)) => {
                assert_eq!(queued.event.name, "Viewed Page");
                assert_eq!(queued.event.field("page"), Some(&json!("home")));
            }
            other => panic!("unexpected: {other:?}"),
        }

        let line = ScriptLine::parse(r#"{"op":"trigger","trigger":"click","setting":".b"}"#)
            .unwrap()
            .unwrap();
        assert!(matches!(
            line.into_ingress(),
            Some(Ingress::Signal { payload: Value::Null, .. })
        ));

        assert!(ScriptLine::parse("   ").unwrap().is_none());
        assert!(ScriptLine::parse("# comment").unwrap().is_none());
        assert!(ScriptLine::parse(r#"{"op":"launch"}"#).is_err());
    }

    #[tokio::test]
    async fn test_feed_sends_actions_in_order() {
        let script = br#"
{"op":"change","key":"user.id","value":"1"}
{"op":"initialize"}
{"op":"sleep","ms":1}
{"op":"reset"}
"#;
        let (tx, mut rx) = ingress_channel();
        let sent = feed(&script[..], &tx).await.unwrap();
        assert_eq!(sent, 3);
        drop(tx);

        assert!(matches!(rx.recv().await, Some(Ingress::Change(c)) if c.key == "user.id"));
        assert!(matches!(rx.recv().await, Some(Ingress::Initialize)));
        assert!(matches!(rx.recv().await, Some(Ingress::Reset)));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_feed_stops_on_shutdown_while_reader_is_idle() {
        let (reader, _writer) = tokio::io::duplex(64);
        let (tx, _rx) = ingress_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move { feed_until_shutdown(reader, &tx, shutdown_rx).await });
        tokio::task::yield_now().await;
        shutdown_tx.send(true).unwrap();

        assert!(task.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_feed_until_shutdown_finishes_script() {
        let (tx, _rx) = ingress_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let fed = feed_until_shutdown(&b"{\"op\":\"initialize\"}\n"[..], &tx, shutdown_rx).await;
        assert!(matches!(fed, Some(Ok(1))));
    }

    #[tokio::test]
    async fn test_feed_reports_bad_line_number() {
        let (tx, _rx) = ingress_channel();
        let err = feed(&b"{\"op\":\"initialize\"}\nnot json\n"[..], &tx)
            .await
            .unwrap_err();
        assert!(matches!(err, ScriptError::Parse { line: 2, .. }));
    }
}
