//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::{
    infrastructure::ChannelHub,
    usecase::{
        AttachViewerUseCase, DetachViewerUseCase, GetChannelDetailUseCase, GetChannelsUseCase,
        PostCommentUseCase,
    },
};

use super::{
    handler::{get_channel_detail, get_channels, handle_connection, health_check},
    signal::shutdown_signal,
    state::{AppState, ConnectionSettings},
};

/// Live comment server
///
/// Accepts TCP viewers on the comment port and, optionally, serves the
/// diagnostics HTTP API on a separate port.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     hub,
///     attach_viewer_usecase,
///     post_comment_usecase,
///     detach_viewer_usecase,
///     get_channels_usecase,
///     get_channel_detail_usecase,
///     settings,
/// );
/// server.run("0.0.0.0".to_string(), 8081, None).await?;
/// ```
pub struct Server {
    /// ChannelHub（シャットダウン時の一括保存に使用）
    hub: Arc<ChannelHub>,
    state: Arc<AppState>,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `hub` - Channel hub, persisted on shutdown
    /// * `attach_viewer_usecase` - UseCase for viewer attach
    /// * `post_comment_usecase` - UseCase for comment posting
    /// * `detach_viewer_usecase` - UseCase for viewer detach
    /// * `get_channels_usecase` - UseCase for getting live channels
    /// * `get_channel_detail_usecase` - UseCase for getting channel detail
    /// * `connection` - Per-connection limits
    pub fn new(
        hub: Arc<ChannelHub>,
        attach_viewer_usecase: Arc<AttachViewerUseCase>,
        post_comment_usecase: Arc<PostCommentUseCase>,
        detach_viewer_usecase: Arc<DetachViewerUseCase>,
        get_channels_usecase: Arc<GetChannelsUseCase>,
        get_channel_detail_usecase: Arc<GetChannelDetailUseCase>,
        connection: ConnectionSettings,
    ) -> Self {
        let state = Arc::new(AppState {
            attach_viewer_usecase,
            post_comment_usecase,
            detach_viewer_usecase,
            get_channels_usecase,
            get_channel_detail_usecase,
            connection,
        });
        Self { hub, state }
    }

    /// Run the comment server until Ctrl+C or SIGTERM
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "0.0.0.0")
    /// * `port` - The comment port (e.g., 8081)
    /// * `admin_port` - Diagnostics HTTP port, if enabled
    ///
    /// # Errors
    ///
    /// Returns an error if a listener fails to bind or the accept loop fails.
    pub async fn run(
        self,
        host: String,
        port: u16,
        admin_port: Option<u16>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;
        tracing::info!("Comment server listening on {}", listener.local_addr()?);

        let admin_listener = match admin_port {
            Some(admin_port) => {
                let admin_listener = TcpListener::bind(format!("{}:{}", host, admin_port)).await?;
                tracing::info!(
                    "Diagnostics API listening on http://{}",
                    admin_listener.local_addr()?
                );
                Some(admin_listener)
            }
            None => None,
        };
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, admin_listener, shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }

    /// Accept viewers on `listener` until `shutdown` resolves, then persist
    /// every live channel.
    ///
    /// An accept error ends the server.
    pub async fn serve(
        self,
        listener: TcpListener,
        admin_listener: Option<TcpListener>,
        shutdown: impl Future<Output = ()>,
    ) -> std::io::Result<()> {
        let cancel = CancellationToken::new();
        let admin_task = admin_listener.map(|admin_listener| {
            let app = self.router();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if let Err(e) = axum::serve(admin_listener, app)
                    .with_graceful_shutdown(cancel.cancelled_owned())
                    .await
                {
                    tracing::error!("Diagnostics API error: {}", e);
                }
            })
        });

        let result = self.accept_loop(&listener, shutdown).await;

        cancel.cancel();
        if let Some(admin_task) = admin_task
            && let Err(e) = admin_task.await
        {
            tracing::error!("Diagnostics API task failed: {}", e);
        }

        let persisted = self.hub.persist_all().await;
        tracing::info!("Persisted {} live channels", persisted);

        result
    }

    async fn accept_loop(
        &self,
        listener: &TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> std::io::Result<()> {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = accepted.inspect_err(|e| {
                        tracing::error!("Accept failed: {}", e);
                    })?;
                    tracing::info!("Accepted connection from {}", peer);
                    tokio::spawn(handle_connection(stream, peer, self.state.clone()));
                }
                _ = &mut shutdown => {
                    tracing::info!("Stopped accepting connections");
                    return Ok(());
                }
            }
        }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/api/health", get(health_check))
            .route("/api/channels", get(get_channels))
            .route("/api/channels/{movie_id}", get(get_channel_detail))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }
}
