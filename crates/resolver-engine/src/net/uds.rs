use crate::data_access::{DalResult, DataAccessError, DataAccessLayer};
use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use resolver_core::{EntityIndex, Msg, RelatedEventsPage, ResolverTree, PROTOCOL_VERSION};
use std::future::Future;
use tokio::net::UnixStream;
use tokio_util::bytes::Bytes;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;

type Conn = Framed<UnixStream, LengthDelimitedCodec>;

/// Talks to `resolver-agent` over a Unix socket, one connection per request.
#[derive(Debug, Clone)]
pub struct UdsDataAccessLayer {
    sock_path: String,
    index_patterns: Vec<String>,
    page_size: Option<usize>,
}

impl UdsDataAccessLayer {
    pub fn new(sock_path: impl Into<String>, index_patterns: Vec<String>) -> Self {
        Self {
            sock_path: sock_path.into(),
            index_patterns,
            page_size: None,
        }
    }

    /// Asks the agent for pages of `page_size` related events.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn sock_path(&self) -> &str {
        &self.sock_path
    }

    fn request<T, F>(
        &self,
        request: Msg,
        cancel: CancellationToken,
        accept: F,
    ) -> BoxFuture<'static, DalResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(Msg) -> DalResult<T> + Send + 'static,
    {
        let sock_path = self.sock_path.clone();
        Box::pin(cancellable(cancel, async move {
            let response = round_trip(&sock_path, request).await?;
            accept(response)
        }))
    }
}

async fn cancellable<T>(
    cancel: CancellationToken,
    work: impl Future<Output = DalResult<T>>,
) -> DalResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DataAccessError::Cancelled),
        result = work => result,
    }
}

async fn send(framed: &mut Conn, msg: &Msg) -> DalResult<()> {
    let bytes = serde_json::to_vec(msg).map_err(|e| DataAccessError::Decode(e.to_string()))?;
    framed
        .send(Bytes::from(bytes))
        .await
        .map_err(|e| DataAccessError::Transport(e.to_string()))
}

async fn recv(framed: &mut Conn) -> DalResult<Msg> {
    let Some(frame) = framed.next().await else {
        return Err(DataAccessError::Transport("agent closed the connection".into()));
    };
    let bytes = frame.map_err(|e| DataAccessError::Transport(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| DataAccessError::Decode(format!("decode error: {e}")))
}

async fn round_trip(sock_path: &str, request: Msg) -> DalResult<Msg> {
    let stream = UnixStream::connect(sock_path)
        .await
        .map_err(|e| DataAccessError::Transport(format!("connect UDS {sock_path}: {e}")))?;
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

    send(
        &mut framed,
        &Msg::Hello {
            version: PROTOCOL_VERSION.into(),
        },
    )
    .await?;
    match recv(&mut framed).await? {
        Msg::Hello { version } if version == PROTOCOL_VERSION => {}
        Msg::Hello { version } => {
            return Err(DataAccessError::Transport(format!(
                "agent speaks {version}, expected {PROTOCOL_VERSION}"
            )));
        }
        Msg::Error { message } => return Err(DataAccessError::Server(message)),
        other => return Err(unexpected(&other)),
    }

    send(&mut framed, &request).await?;
    match recv(&mut framed).await? {
        Msg::Error { message } => Err(DataAccessError::Server(message)),
        response => Ok(response),
    }
}

fn unexpected(msg: &Msg) -> DataAccessError {
    DataAccessError::Decode(format!("unexpected reply: {msg:?}"))
}

impl DataAccessLayer for UdsDataAccessLayer {
    fn index_patterns(&self) -> Vec<String> {
        self.index_patterns.clone()
    }

    fn entities(
        &self,
        document_id: String,
        indices: Vec<String>,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, DalResult<EntityIndex>> {
        self.request(
            Msg::RequestEntities {
                document_id,
                indices,
            },
            cancel,
            |msg| match msg {
                Msg::Entities { entities } => Ok(entities),
                other => Err(unexpected(&other)),
            },
        )
    }

    fn resolver_tree(
        &self,
        entity_id: String,
        indices: Vec<String>,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, DalResult<ResolverTree>> {
        self.request(
            Msg::RequestResolverTree { entity_id, indices },
            cancel,
            |msg| match msg {
                Msg::ResolverTree { tree } => Ok(*tree),
                other => Err(unexpected(&other)),
            },
        )
    }

    fn related_events(
        &self,
        entity_id: String,
        after: Option<String>,
        indices: Vec<String>,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, DalResult<RelatedEventsPage>> {
        self.request(
            Msg::RequestRelatedEvents {
                entity_id,
                after,
                indices,
                limit: self.page_size,
            },
            cancel,
            |msg| match msg {
                Msg::RelatedEvents { page } => Ok(page),
                other => Err(unexpected(&other)),
            },
        )
    }
}
