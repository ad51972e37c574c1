use crate::fixture::Fixture;
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use resolver_core::Msg;
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::bytes::Bytes;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

pub async fn run(sock_path: &str, fixture: Arc<Fixture>) -> Result<()> {
    let listener =
        UnixListener::bind(sock_path).with_context(|| format!("bind UDS {sock_path}"))?;
    tracing::info!(socket = sock_path, "resolver-agent listening");
    serve(listener, fixture).await
}

/// Accepts forever; every connection gets its own task.
pub async fn serve(listener: UnixListener, fixture: Arc<Fixture>) -> Result<()> {
    loop {
        let (stream, _addr) = listener.accept().await.context("accept")?;
        tracing::debug!("client connected");
        let fixture = Arc::clone(&fixture);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &fixture).await {
                tracing::warn!(error = %format!("{e:#}"), "connection ended with error");
            }
        });
    }
}

async fn handle_connection(stream: UnixStream, fixture: &Fixture) -> Result<()> {
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

    while let Some(frame) = framed.next().await {
        let bytes = frame.context("read frame")?;
        let reply = match serde_json::from_slice::<Msg>(&bytes) {
            Ok(msg) => {
                tracing::debug!(request = ?std::mem::discriminant(&msg), "recv");
                fixture.respond(msg)
            }
            Err(e) => Msg::Error {
                message: format!("decode error: {e}"),
            },
        };
        framed.send(Bytes::from(serde_json::to_vec(&reply)?)).await?;
    }
    Ok(())
}
