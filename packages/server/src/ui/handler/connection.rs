//! TCP connection handler.
//!
//! One task per accepted socket runs the connection through
//! handshake → attach → streaming → detach. The policy request and a full
//! registry both end the connection after a single reply frame.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::{
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::mpsc,
};
use tokio_util::{
    codec::{FramedRead, FramedWrite},
    sync::CancellationToken,
};

use crate::{
    domain::{MovieId, SlotId},
    infrastructure::CommentChannel,
    ui::state::AppState,
    usecase::{AttachError, PostCommentError},
};
use sajiki_shared::{
    frame::{FrameCodec, FrameError, NET_CONGESTION, POLICY_FILE_REQUEST, POLICY_FILE_RESPONSE},
    time::format_elapsed,
};

type FrameReader = FramedRead<OwnedReadHalf, FrameCodec>;
type FrameWriter = FramedWrite<OwnedWriteHalf, FrameCodec>;

pub async fn handle_connection(stream: TcpStream, peer: SocketAddr, state: Arc<AppState>) {
    let settings = state.connection;
    let codec = FrameCodec::with_max_length(settings.max_frame_length);
    let (read_half, write_half) = stream.into_split();
    let mut reader = FramedRead::new(read_half, codec.clone());
    let mut writer = FramedWrite::new(write_half, codec);

    // HANDSHAKE
    let handshake = match next_frame(&mut reader, settings.idle_timeout).await {
        Some(Ok(frame)) => frame,
        Some(Err(e)) => {
            tracing::warn!("Handshake from {} failed: {}", peer, e);
            return;
        }
        None => {
            tracing::debug!("{} closed before handshake", peer);
            return;
        }
    };

    if handshake == POLICY_FILE_REQUEST {
        tracing::info!("Policy file request from {}", peer);
        if let Err(e) = writer.send(POLICY_FILE_RESPONSE).await {
            tracing::warn!("Failed to send policy file to {}: {}", peer, e);
        }
        return;
    }

    let movie_id = match MovieId::new(handshake) {
        Ok(movie_id) => movie_id,
        Err(e) => {
            tracing::warn!("Rejecting {}: {}", peer, e);
            return;
        }
    };
    tracing::info!("{} requested movie '{}'", peer, movie_id);

    // ATTACHED
    let (tx, rx) = mpsc::unbounded_channel();
    let attached = match state
        .attach_viewer_usecase
        .execute(movie_id.clone(), tx, Some(peer))
        .await
    {
        Ok(attached) => attached,
        Err(AttachError::RegistryFull { capacity }) => {
            tracing::warn!(
                "All {} viewer slots in use, rejecting {} for '{}'",
                capacity,
                peer,
                movie_id
            );
            if let Err(e) = writer.send(NET_CONGESTION).await {
                tracing::warn!("Failed to send rejection to {}: {}", peer, e);
            }
            return;
        }
        Err(e) => {
            tracing::error!("Failed to attach {} to '{}': {}", peer, movie_id, e);
            return;
        }
    };
    let slot_id = attached.slot_id;
    tracing::info!(
        "User ID {} assigned to {} watching '{}'",
        slot_id,
        peer,
        movie_id
    );

    // The snapshot goes out before the pusher task starts, so it precedes
    // every broadcast already queued for this slot.
    match writer.send(attached.snapshot).await {
        Ok(()) => {
            tracing::info!(
                "Sent snapshot to user ID {} (elapsed {})",
                slot_id,
                format_elapsed(attached.elapsed)
            );
            stream_comments(state.clone(), attached.channel, slot_id, reader, writer, rx).await;
        }
        Err(e) => tracing::warn!("Failed to send snapshot to user ID {}: {}", slot_id, e),
    }

    // CLOSED: always release the slot
    if let Err(e) = state.detach_viewer_usecase.execute(slot_id).await {
        tracing::error!("Failed to detach user ID {}: {}", slot_id, e);
    }
    tracing::info!("User ID {} ({}) disconnected", slot_id, peer);
}

/// STREAMING: run until either direction ends, then stop the other.
///
/// The receive side is only stopped between frames, so a comment that was
/// appended is always broadcast.
async fn stream_comments(
    state: Arc<AppState>,
    channel: Arc<CommentChannel>,
    slot_id: SlotId,
    reader: FrameReader,
    writer: FrameWriter,
    rx: mpsc::UnboundedReceiver<String>,
) {
    let cancel = CancellationToken::new();
    let mut recv_task = tokio::spawn(receive_loop(
        state,
        channel,
        slot_id,
        reader,
        cancel.clone(),
    ));
    let mut send_task = pusher_loop(rx, writer);

    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => {
            cancel.cancel();
            if let Err(e) = recv_task.await {
                tracing::error!("Receive task for user ID {} failed: {}", slot_id, e);
            }
        }
    };
}

async fn receive_loop(
    state: Arc<AppState>,
    channel: Arc<CommentChannel>,
    slot_id: SlotId,
    mut reader: FrameReader,
    cancel: CancellationToken,
) {
    let idle_timeout = state.connection.idle_timeout;
    loop {
        let frame = tokio::select! {
            frame = next_frame(&mut reader, idle_timeout) => frame,
            _ = cancel.cancelled() => {
                tracing::debug!("Stopped reading from user ID {}", slot_id);
                break;
            }
        };
        let frame = match frame {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                tracing::warn!("Read from user ID {} failed: {}", slot_id, e);
                break;
            }
            None => break,
        };
        if frame.is_empty() {
            continue;
        }

        tracing::info!("User ID {} on '{}': {}", slot_id, channel.movie_id(), frame);
        match state.post_comment_usecase.execute(&channel, &frame).await {
            Ok(_recipients) => {}
            Err(PostCommentError::Malformed(e)) => {
                tracing::warn!("Dropping comment from user ID {}: {}", slot_id, e);
            }
            Err(e) => {
                tracing::error!("Failed to post comment from user ID {}: {}", slot_id, e);
            }
        }
    }
}

/// Drains this connection's sink into the socket.
///
/// # Returns
///
/// A `JoinHandle` for the spawned task
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut writer: FrameWriter,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = writer.send(frame).await {
                tracing::debug!("Writer stopped: {}", e);
                break;
            }
        }
    })
}

/// Next frame, or `None` at end of stream or after `idle_timeout` of silence
async fn next_frame(
    reader: &mut FrameReader,
    idle_timeout: Option<Duration>,
) -> Option<Result<String, FrameError>> {
    let Some(limit) = idle_timeout else {
        return reader.next().await;
    };
    match tokio::time::timeout(limit, reader.next()).await {
        Ok(frame) => frame,
        Err(_) => {
            tracing::info!("Closing connection idle for {:?}", limit);
            None
        }
    }
}
