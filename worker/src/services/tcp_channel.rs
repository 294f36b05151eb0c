//! TCP host channel implementation
//!
//! Speaks length-prefixed JSON frames with the host coordinator: a big-endian
//! `u32` length followed by a serialized [`WorkerFrame`] or [`HostFrame`].
//! A background task dials the host until it accepts, announces the context
//! with a hello frame, then routes responses to waiting callers and commands
//! to the receiver returned by [`TcpHostChannel::connect`].

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;

use shared::{
    context_debug, context_info, context_warn, ContextId, HostCommand, HostFrame, HostMessage, RpcRequest, RpcResponse,
    TransportError, WorkerFrame,
};

use crate::traits::HostChannel;

/// Largest frame either side may send
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

const RECONNECT_DELAY: Duration = Duration::from_millis(500);

type PendingCalls = Arc<Mutex<HashMap<u64, oneshot::Sender<RpcResponse>>>>;

/// Host channel over a single TCP connection
pub struct TcpHostChannel {
    context_id: ContextId,
    writer: Arc<Mutex<Option<OwnedWriteHalf>>>,
    connected: watch::Receiver<bool>,
    pending: PendingCalls,
    next_call_id: AtomicU64,
    connector: JoinHandle<()>,
}

impl TcpHostChannel {
    /// Start dialing `address`; inbound commands arrive on the returned receiver
    pub fn connect(address: SocketAddr, context_id: ContextId) -> (Arc<Self>, mpsc::Receiver<HostCommand>) {
        let (connected_tx, connected) = watch::channel(false);
        let (command_tx, command_rx) = mpsc::channel(64);
        let writer = Arc::new(Mutex::new(None));
        let pending: PendingCalls = Arc::new(Mutex::new(HashMap::new()));

        let connector = tokio::spawn(run_connection(
            address,
            context_id.clone(),
            writer.clone(),
            pending.clone(),
            connected_tx,
            command_tx,
        ));

        let channel = Arc::new(Self {
            context_id,
            writer,
            connected,
            pending,
            next_call_id: AtomicU64::new(1),
            connector,
        });
        (channel, command_rx)
    }

    async fn send(&self, frame: &WorkerFrame) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        let stream = writer.as_mut().ok_or(TransportError::Disconnected)?;
        write_frame(stream, frame).await
    }
}

impl Drop for TcpHostChannel {
    fn drop(&mut self) {
        self.connector.abort();
    }
}

#[async_trait]
impl HostChannel for TcpHostChannel {
    async fn wait_for_connection(&self) {
        let mut connected = self.connected.clone();
        if connected.wait_for(|up| *up).await.is_err() {
            context_warn!(self.context_id, "⚠️ Connector stopped before the host accepted");
        }
    }

    fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    async fn request(&self, request: RpcRequest) -> Result<RpcResponse, TransportError> {
        let call_id = self.next_call_id.fetch_add(1, Ordering::SeqCst);
        let (response_tx, response_rx) = oneshot::channel();
        self.pending.lock().await.insert(call_id, response_tx);

        if let Err(error) = self.send(&WorkerFrame::Request { call_id, request }).await {
            self.pending.lock().await.remove(&call_id);
            return Err(error);
        }

        response_rx.await.map_err(|_| TransportError::Closed)
    }

    async fn post(&self, message: HostMessage) -> Result<(), TransportError> {
        self.send(&WorkerFrame::Message { message }).await
    }
}

async fn run_connection(
    address: SocketAddr,
    context_id: ContextId,
    writer: Arc<Mutex<Option<OwnedWriteHalf>>>,
    pending: PendingCalls,
    connected: watch::Sender<bool>,
    commands: mpsc::Sender<HostCommand>,
) {
    let stream = loop {
        match TcpStream::connect(address).await {
            Ok(stream) => break stream,
            Err(e) => {
                context_debug!(context_id, "🔌 Host at {} not reachable yet: {}", address, e);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    };

    let (mut reader, mut write_half) = stream.into_split();
    if let Err(e) = write_frame(&mut write_half, &WorkerFrame::Hello { id: context_id.clone() }).await {
        context_warn!(context_id, "⚠️ Failed to greet host: {}", e);
        return;
    }
    *writer.lock().await = Some(write_half);
    connected.send_replace(true);
    context_info!(context_id, "🔗 Connected to host at {}", address);

    loop {
        match read_frame::<_, HostFrame>(&mut reader).await {
            Ok(Some(HostFrame::Response { call_id, response })) => match pending.lock().await.remove(&call_id) {
                Some(waiter) => {
                    let _ = waiter.send(response);
                }
                None => context_warn!(context_id, "⚠️ Response for unknown call {}", call_id),
            },
            Ok(Some(HostFrame::Command { command })) => {
                if commands.send(command).await.is_err() {
                    context_debug!(context_id, "📭 Command receiver dropped");
                }
            }
            Ok(None) => {
                context_info!(context_id, "🔌 Host closed the connection");
                break;
            }
            Err(e) => {
                context_warn!(context_id, "⚠️ Host channel failed: {}", e);
                break;
            }
        }
    }

    connected.send_replace(false);
    *writer.lock().await = None;
    // Dropping the waiters fails their calls with `Closed`
    pending.lock().await.clear();
}

/// Write one length-prefixed frame
pub(crate) async fn write_frame<W, T>(writer: &mut W, frame: &T) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let data = serde_json::to_vec(frame).map_err(|e| TransportError::Io {
        message: format!("encode failed: {e}"),
    })?;
    if data.len() > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            size: data.len(),
            limit: MAX_FRAME_SIZE,
        });
    }

    writer.write_all(&(data.len() as u32).to_be_bytes()).await?;
    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame, `None` on a clean end of stream
pub(crate) async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, TransportError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge {
            size: len,
            limit: MAX_FRAME_SIZE,
        });
    }

    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await?;
    serde_json::from_slice(&data).map(Some).map_err(|e| TransportError::Io {
        message: format!("malformed frame: {e}"),
    })
}
