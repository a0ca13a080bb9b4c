//! Live comment client.
//!
//! Connects to a comment server, joins a movie's comment stream, prints the
//! history and every new comment, and posts each line typed at the prompt.
//! Exits with status 1 when the server is congested.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin sajiki-client -- --movie-id m1 --user-id alice
//! cargo run --bin sajiki-client -- --policy
//! ```

use clap::Parser;

use sajiki_client::{ClientConfig, error::ClientError, message::CommentTemplate, run_client_session};
use sajiki_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "sajiki-client")]
#[command(about = "Live comment client for the Sajiki comment server", long_about = None)]
struct Args {
    /// Server host
    #[arg(short = 'H', long, env = "SAJIKI_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Server comment port
    #[arg(short = 'p', long, env = "SAJIKI_PORT", default_value = "8081")]
    port: u16,

    /// Movie whose comment stream to join
    #[arg(short = 'm', long, required_unless_present = "policy")]
    movie_id: Option<String>,

    /// User id attached to posted comments
    #[arg(short = 'u', long, default_value = "guest")]
    user_id: String,

    /// Role attached to posted comments
    #[arg(short = 'r', long, default_value = "STUDENT")]
    role: String,

    /// Only request the cross-domain policy document
    #[arg(long)]
    policy: bool,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();
    let config = ClientConfig {
        host: args.host,
        port: args.port,
        movie_id: args.movie_id.unwrap_or_default(),
        template: CommentTemplate::new(args.user_id, args.role),
        policy: args.policy,
    };

    // Run the client
    match run_client_session(config).await {
        Ok(()) => {}
        Err(ClientError::NetCongestion) => {
            eprintln!("Net Congestion: the server has no free viewer slot");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("Client error: {}", e);
            std::process::exit(1);
        }
    }
}
