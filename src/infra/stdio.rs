//! JSON-lines transport over standard streams.
//!
//! Each inbound line is one [`InteractionEvent`]. Each outbound line is one
//! [`Frame`] tagged by `op`:
//!
//! ```json
//! {"op":"respond","interaction":"1","view":{"blocks":[]}}
//! {"op":"defer","interaction":"2","kind":"new_message"}
//! {"op":"edit","interaction":"2","view":{"blocks":[]}}
//! ```
//!
//! The transport enforces the acknowledgment protocol: one acknowledgment
//! per interaction, and edits only after a deferred one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::dispatcher::Dispatcher;
use crate::application::transport::{DeferKind, InteractionContext, InteractionEvent, Transport};
use crate::application::views::View;
use crate::cache::Expiring;
use crate::domain::error::NavError;
use crate::infra::error::InfraError;

const SOURCE: &str = "infra::stdio";

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Frame<'a> {
    Respond { interaction: &'a str, view: &'a View },
    Defer { interaction: &'a str, kind: DeferKind },
    Edit { interaction: &'a str, view: &'a View },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Acknowledged {
    Immediate,
    Deferred,
}

#[derive(Debug, Clone, Copy)]
struct AckRecord {
    state: Acknowledged,
    at: Instant,
}

/// [`Transport`] writing frames to any async writer, stdout in production.
pub struct StdioTransport<W> {
    writer: Mutex<W>,
    acknowledged: DashMap<String, AckRecord>,
    retention: Duration,
}

impl StdioTransport<tokio::io::Stdout> {
    pub fn stdout(retention: Duration) -> Self {
        Self::new(tokio::io::stdout(), retention)
    }
}

impl<W> StdioTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// `retention` bounds how long acknowledgment records are kept.
    pub fn new(writer: W, retention: Duration) -> Self {
        Self {
            writer: Mutex::new(writer),
            acknowledged: DashMap::new(),
            retention,
        }
    }

    pub fn pending(&self) -> usize {
        self.acknowledged.len()
    }

    pub async fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn claim(&self, ctx: &InteractionContext, state: Acknowledged) -> Result<(), NavError> {
        use dashmap::mapref::entry::Entry;

        match self.acknowledged.entry(ctx.id.clone()) {
            Entry::Occupied(_) => Err(NavError::transport(format!(
                "interaction `{}` was already acknowledged",
                ctx.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(AckRecord {
                    state,
                    at: Instant::now(),
                });
                Ok(())
            }
        }
    }

    /// Write an acknowledgment frame, dropping the claim if the write fails
    /// so the interaction can still be acknowledged.
    async fn write_acknowledgment(
        &self,
        ctx: &InteractionContext,
        frame: &Frame<'_>,
    ) -> Result<(), NavError> {
        let written = self.write_frame(frame).await;
        if written.is_err() {
            self.acknowledged.remove(&ctx.id);
        }
        written
    }

    async fn write_frame(&self, frame: &Frame<'_>) -> Result<(), NavError> {
        let mut line = serde_json::to_vec(frame)
            .map_err(|err| NavError::transport(format!("failed to encode frame: {err}")))?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|err| NavError::transport(err.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|err| NavError::transport(err.to_string()))
    }
}

#[async_trait]
impl<W> Transport for StdioTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn acknowledge_immediate(
        &self,
        ctx: &InteractionContext,
        view: View,
    ) -> Result<(), NavError> {
        self.claim(ctx, Acknowledged::Immediate)?;
        self.write_acknowledgment(
            ctx,
            &Frame::Respond {
                interaction: &ctx.id,
                view: &view,
            },
        )
        .await
    }

    async fn acknowledge_deferred(
        &self,
        ctx: &InteractionContext,
        kind: DeferKind,
    ) -> Result<(), NavError> {
        self.claim(ctx, Acknowledged::Deferred)?;
        self.write_acknowledgment(
            ctx,
            &Frame::Defer {
                interaction: &ctx.id,
                kind,
            },
        )
        .await
    }

    async fn edit_with_result(
        &self,
        ctx: &InteractionContext,
        view: View,
    ) -> Result<(), NavError> {
        let state = self.acknowledged.get(&ctx.id).map(|record| record.state);
        if state != Some(Acknowledged::Deferred) {
            return Err(NavError::transport(format!(
                "interaction `{}` has no deferred acknowledgment to edit",
                ctx.id
            )));
        }
        self.write_frame(&Frame::Edit {
            interaction: &ctx.id,
            view: &view,
        })
        .await
    }
}

impl<W> Expiring for StdioTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    fn name(&self) -> &'static str {
        "acknowledgments"
    }

    fn purge_expired(&self) -> usize {
        let before = self.acknowledged.len();
        let now = Instant::now();
        self.acknowledged
            .retain(|_, record| now.duration_since(record.at) < self.retention);
        before.saturating_sub(self.acknowledged.len())
    }
}

/// Feed every event line from `reader` to `dispatcher`.
///
/// Returns the number of dispatched events once `reader` is exhausted and
/// every in-flight interaction has finished.
pub async fn serve<R>(dispatcher: Arc<Dispatcher>, reader: R) -> Result<usize, InfraError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut in_flight: Vec<JoinHandle<()>> = Vec::new();
    let mut dispatched = 0usize;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<InteractionEvent>(line) {
            Ok(event) => {
                debug!(target: SOURCE, id = %event.context.id, "event received");
                in_flight.retain(|handle| !handle.is_finished());
                in_flight.push(dispatcher.dispatch(event));
                dispatched += 1;
            }
            Err(err) => {
                warn!(target: SOURCE, error = %err, "skipping malformed event line");
            }
        }
    }

    for handle in in_flight {
        if let Err(err) = handle.await {
            warn!(target: SOURCE, error = %err, "interaction task failed");
        }
    }

    info!(target: SOURCE, dispatched, "input closed");
    Ok(dispatched)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use serde_json::Value;

    use super::*;
    use crate::application::features::RetiredComponent;
    use crate::application::reporting::TransportReporter;
    use crate::application::views::Block;

    fn transport() -> StdioTransport<Vec<u8>> {
        StdioTransport::new(Vec::new(), Duration::from_secs(60))
    }

    fn frames(bytes: &[u8]) -> Vec<Value> {
        std::str::from_utf8(bytes)
            .expect("utf-8 output")
            .lines()
            .map(|line| serde_json::from_str(line).expect("frame is json"))
            .collect()
    }

    fn view() -> View {
        View::new().with(Block::Text {
            text: "hello".to_string(),
        })
    }

    #[tokio::test]
    async fn deferred_then_edit_writes_two_frames() {
        let transport = transport();
        let ctx = InteractionContext::new("7", "u");

        transport
            .acknowledge_deferred(&ctx, DeferKind::NewMessage)
            .await
            .expect("defer");
        transport
            .edit_with_result(&ctx, view())
            .await
            .expect("edit");

        let written = frames(&transport.into_inner().await);
        assert_eq!(written.len(), 2);
        assert_eq!(written[0]["op"], "defer");
        assert_eq!(written[0]["kind"], "new_message");
        assert_eq!(written[1]["op"], "edit");
        assert_eq!(written[1]["interaction"], "7");
        assert_eq!(written[1]["view"]["blocks"][0]["text"], "hello");
    }

    #[tokio::test]
    async fn second_acknowledgment_is_rejected() {
        let transport = transport();
        let ctx = InteractionContext::new("1", "u");

        transport
            .acknowledge_immediate(&ctx, view())
            .await
            .expect("first");
        let err = transport
            .acknowledge_deferred(&ctx, DeferKind::UpdateMessage)
            .await
            .expect_err("second");
        assert_eq!(err.kind(), NavError::transport("").kind());
        assert_eq!(frames(&transport.into_inner().await).len(), 1);
    }

    /// Writer whose first write fails, then behaves like a `Vec<u8>`.
    #[derive(Default)]
    struct FlakyWriter {
        failed_once: bool,
        written: Vec<u8>,
    }

    impl AsyncWrite for FlakyWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if !self.failed_once {
                self.failed_once = true;
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed")));
            }
            self.written.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn failed_write_leaves_the_interaction_unacknowledged() {
        let transport = StdioTransport::new(FlakyWriter::default(), Duration::from_secs(60));
        let ctx = InteractionContext::new("1", "u");

        let err = transport
            .acknowledge_deferred(&ctx, DeferKind::NewMessage)
            .await
            .expect_err("first write fails");
        assert_eq!(err.kind(), NavError::transport("").kind());
        assert_eq!(transport.pending(), 0);

        transport
            .acknowledge_deferred(&ctx, DeferKind::NewMessage)
            .await
            .expect("retry succeeds");
        transport
            .edit_with_result(&ctx, view())
            .await
            .expect("edit after retry");

        let written = frames(&transport.into_inner().await.written);
        assert_eq!(written.len(), 2);
        assert_eq!(written[0]["op"], "defer");
        assert_eq!(written[1]["op"], "edit");
    }

    #[tokio::test]
    async fn edit_requires_deferred_acknowledgment() {
        let transport = transport();
        let ctx = InteractionContext::new("1", "u");

        assert!(transport.edit_with_result(&ctx, view()).await.is_err());

        transport
            .acknowledge_immediate(&ctx, view())
            .await
            .expect("respond");
        assert!(transport.edit_with_result(&ctx, view()).await.is_err());
    }

    #[tokio::test]
    async fn purge_drops_records_past_retention() {
        let transport = StdioTransport::new(Vec::new(), Duration::ZERO);
        let ctx = InteractionContext::new("1", "u");
        transport
            .acknowledge_immediate(&ctx, view())
            .await
            .expect("respond");
        assert_eq!(transport.pending(), 1);

        assert_eq!(transport.purge_expired(), 1);
        assert_eq!(transport.pending(), 0);
    }

    #[tokio::test]
    async fn serve_dispatches_lines_and_skips_garbage() {
        let stdio = Arc::new(transport());
        let reporter = Arc::new(TransportReporter::new(stdio.clone()));
        let mut dispatcher = Dispatcher::new(reporter);
        dispatcher.register_legacy("個人資料", Arc::new(RetiredComponent::new(stdio.clone())));
        let dispatcher = Arc::new(dispatcher);

        let input = concat!(
            "{\"id\":\"1\",\"user_id\":\"u\",\"data\":{\"type\":\"component\",\"custom_id\":\"個人資料|x\"}}\n",
            "\n",
            "not json\n",
            "{\"id\":\"2\",\"user_id\":\"u\",\"data\":{\"type\":\"command\",\"name\":\"unknown\"}}\n",
        );

        let dispatched = serve(dispatcher.clone(), input.as_bytes())
            .await
            .expect("serve");
        assert_eq!(dispatched, 2);

        drop(dispatcher);
        let stdio = Arc::try_unwrap(stdio)
            .ok()
            .expect("dispatcher released the transport");
        let mut written = frames(&stdio.into_inner().await);
        written.sort_by(|a, b| a["interaction"].as_str().cmp(&b["interaction"].as_str()));
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|frame| frame["op"] == "respond"));
    }
}
