//! Live comment broadcast server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin sajiki-server
//! cargo run --bin sajiki-server -- --port 8081 --max-users 100 --comment-list-dir comments
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use sajiki_server::{
    config::ServerConfig,
    infrastructure::{
        ChannelHub, ViewerRegistry, message_pusher::RegistryMessagePusher,
        repository::FileCommentListStore,
    },
    ui::{Server, state::ConnectionSettings},
    usecase::{
        AttachViewerUseCase, DetachViewerUseCase, GetChannelDetailUseCase, GetChannelsUseCase,
        PostCommentUseCase,
    },
};
use sajiki_shared::{frame::DEFAULT_MAX_FRAME_LENGTH, logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "sajiki-server")]
#[command(about = "Live comment broadcast server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "SAJIKI_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port number to accept viewers on
    #[arg(short = 'p', long, env = "SAJIKI_PORT", default_value = "8081")]
    port: u16,

    /// Maximum number of concurrently attached viewers
    #[arg(short = 'm', long, env = "SAJIKI_MAX_USERS", default_value = "100")]
    max_users: usize,

    /// Directory holding one <movieId>.xml per movie
    #[arg(short = 'd', long, env = "SAJIKI_COMMENT_LIST_DIR", default_value = "comments")]
    comment_list_dir: PathBuf,

    /// Close connections idle for this many seconds (no timeout when unset)
    #[arg(long, env = "SAJIKI_IDLE_TIMEOUT_SECS")]
    idle_timeout_secs: Option<u64>,

    /// Maximum frame length in bytes
    #[arg(long, env = "SAJIKI_MAX_FRAME_LENGTH", default_value_t = DEFAULT_MAX_FRAME_LENGTH)]
    max_frame_length: usize,

    /// Port for the diagnostics HTTP API (disabled when unset)
    #[arg(long, env = "SAJIKI_ADMIN_PORT")]
    admin_port: Option<u16>,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            max_users: args.max_users,
            comment_list_dir: args.comment_list_dir,
            idle_timeout: args.idle_timeout_secs.map(Duration::from_secs),
            max_frame_length: args.max_frame_length,
            admin_port: args.admin_port,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let config = ServerConfig::from(Args::parse());
    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.prepare().await?;
    tracing::info!(
        "Max users: {}, comment lists in {}",
        config.max_users,
        config.comment_list_dir.display()
    );

    // Initialize dependencies in order:
    // 1. Registry, store and channel hub
    // 2. MessagePusher
    // 3. UseCases
    // 4. Server

    // 1. Create Registry, store and channel hub
    let registry = Arc::new(ViewerRegistry::new(config.max_users));
    let store = Arc::new(FileCommentListStore::new(config.comment_list_dir.clone()));
    let hub = Arc::new(ChannelHub::new(
        registry.clone(),
        store,
        Arc::new(SystemClock),
    ));

    // 2. Create MessagePusher (registry implementation)
    let message_pusher = Arc::new(RegistryMessagePusher::new(registry));

    // 3. Create UseCases
    let attach_viewer_usecase = Arc::new(AttachViewerUseCase::new(hub.clone()));
    let post_comment_usecase = Arc::new(PostCommentUseCase::new(message_pusher));
    let detach_viewer_usecase = Arc::new(DetachViewerUseCase::new(hub.clone()));
    let get_channels_usecase = Arc::new(GetChannelsUseCase::new(hub.clone()));
    let get_channel_detail_usecase = Arc::new(GetChannelDetailUseCase::new(hub.clone()));

    // 4. Create and run the server
    let server = Server::new(
        hub,
        attach_viewer_usecase,
        post_comment_usecase,
        detach_viewer_usecase,
        get_channels_usecase,
        get_channel_detail_usecase,
        ConnectionSettings {
            idle_timeout: config.idle_timeout,
            max_frame_length: config.max_frame_length,
        },
    );
    server
        .run(config.host, config.port, config.admin_port)
        .await
}
