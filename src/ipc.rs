use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::warn;

use crate::app::Action;
use crate::config::data_dir;
use crate::model::task::Draft;

/// A capture probe is a single short exchange, never retried; a dashboard
/// that cannot answer within this window counts as unreachable.
const PROBE_TIMEOUT: Duration = Duration::from_millis(800);

pub fn socket_path() -> PathBuf {
    data_dir().join("snag.sock")
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum Request {
    Ping,
    Capture { draft: Draft },
}

/// Accept loop for the dashboard side. One JSON line in, one JSON line out:
/// `{"action":"ping"}` answers `{"pong":true}`, `{"action":"capture",...}`
/// answers `{"ok":true}` and forwards the draft to the app.
pub async fn serve(path: PathBuf, tx: mpsc::UnboundedSender<Action>) -> Result<()> {
    if path.exists() {
        // Stale socket from an earlier run; we are the dashboard now.
        let _ = std::fs::remove_file(&path);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let listener = UnixListener::bind(&path)
        .with_context(|| format!("Failed to bind capture socket at {}", path.display()))?;

    loop {
        let stream = match listener.accept().await {
            Ok((stream, _)) => stream,
            Err(err) => {
                warn!(error = %err, "capture socket accept failed");
                continue;
            }
        };
        if let Err(err) = handle_conn(stream, &tx).await {
            warn!(error = %err, "capture socket request failed");
        }
    }
}

async fn handle_conn(stream: UnixStream, tx: &mpsc::UnboundedSender<Action>) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    let Some(line) = lines.next_line().await? else {
        return Ok(());
    };
    match serde_json::from_str::<Request>(&line)? {
        Request::Ping => {
            write.write_all(b"{\"pong\":true}\n").await?;
        }
        Request::Capture { draft } => {
            write.write_all(b"{\"ok\":true}\n").await?;
            let _ = tx.send(Action::CaptureRequested(draft));
        }
    }
    Ok(())
}

/// Is a dashboard listening? Any failure, including a slow answer, is "no".
pub async fn probe(path: &Path) -> bool {
    tokio::time::timeout(PROBE_TIMEOUT, probe_inner(path))
        .await
        .unwrap_or(false)
}

async fn probe_inner(path: &Path) -> bool {
    let Ok(stream) = UnixStream::connect(path).await else {
        return false;
    };
    let (read, mut write) = stream.into_split();
    if write.write_all(b"{\"action\":\"ping\"}\n").await.is_err() {
        return false;
    }
    let mut lines = BufReader::new(read).lines();
    match lines.next_line().await {
        Ok(Some(line)) => serde_json::from_str::<serde_json::Value>(&line)
            .map(|v| v["pong"] == true)
            .unwrap_or(false),
        _ => false,
    }
}

/// Hand a draft to the dashboard that answered the probe.
pub async fn send_draft(path: &Path, draft: &Draft) -> Result<()> {
    let stream = UnixStream::connect(path)
        .await
        .context("No dashboard listening on the capture socket")?;
    let (read, mut write) = stream.into_split();

    let msg = serde_json::to_string(&Request::Capture {
        draft: draft.clone(),
    })?;
    write.write_all(msg.as_bytes()).await?;
    write.write_all(b"\n").await?;

    let mut lines = BufReader::new(read).lines();
    let reply = lines
        .next_line()
        .await?
        .context("Dashboard closed the capture connection")?;
    let v: serde_json::Value = serde_json::from_str(&reply)?;
    ensure!(v["ok"] == true, "Dashboard refused the capture");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn probe_false_without_listener() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!probe(&dir.path().join("absent.sock")).await);
    }

    #[tokio::test]
    async fn probe_pongs_against_a_listener() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snag.sock");
        let (tx, _rx) = mpsc::unbounded_channel();
        tokio::spawn(serve(path.clone(), tx));
        // Give the listener a beat to bind.
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(probe(&path).await);
    }

    #[tokio::test]
    async fn capture_hand_off_reaches_the_app() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snag.sock");
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(serve(path.clone(), tx));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let draft = Draft::new("hand me over", Some("https://discord.com/ch".into()), None);
        send_draft(&path, &draft).await.unwrap();

        match rx.recv().await {
            Some(Action::CaptureRequested(received)) => {
                assert_eq!(received.text, "hand me over");
                assert_eq!(received.source(), crate::model::task::Source::Chat);
            }
            other => panic!("expected capture action, got {other:?}"),
        }
    }
}
