//! Comment client session management.

use std::time::Instant;

use futures_util::{SinkExt, StreamExt};
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_util::codec::{FramedRead, FramedWrite};

use sajiki_shared::frame::{FrameCodec, POLICY_FILE_REQUEST};

use crate::{
    error::ClientError,
    formatter::MessageFormatter,
    message::{CommentTemplate, ServerMessage},
    ui::redisplay_prompt,
};

/// What the client connects to and how it signs its comments
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub movie_id: String,
    pub template: CommentTemplate,
    /// Send the policy file request instead of joining a movie
    pub policy: bool,
}

/// Run the comment client session
pub async fn run_client_session(config: ClientConfig) -> Result<(), ClientError> {
    let stream = TcpStream::connect((config.host.as_str(), config.port)).await?;
    tracing::info!("Connected to {}:{}", config.host, config.port);
    let (read_half, write_half) = stream.into_split();
    let mut read = FramedRead::new(read_half, FrameCodec::new());
    let mut write = FramedWrite::new(write_half, FrameCodec::new());

    // Handshake
    let handshake = if config.policy {
        POLICY_FILE_REQUEST
    } else {
        config.movie_id.as_str()
    };
    write.send(handshake).await?;
    let reply = read
        .next()
        .await
        .ok_or(ClientError::ClosedDuringHandshake)??;

    let snapshot = match ServerMessage::parse(&reply) {
        ServerMessage::Congestion => return Err(ClientError::NetCongestion),
        ServerMessage::Snapshot(snapshot) if !config.policy => snapshot,
        _ if config.policy => {
            println!("{}", reply);
            return Ok(());
        }
        _ => return Err(ClientError::UnexpectedReply(reply)),
    };
    // Movie time keeps running locally from the server's elapsed time
    let attached_at = Instant::now();
    let elapsed_at_attach = snapshot.elapsed;
    print!(
        "{}",
        MessageFormatter::format_snapshot(&config.movie_id, &snapshot)
    );
    println!("Type a comment and press Enter to send. Press Ctrl+C to exit.\n");

    let prompt = format!("{}> ", config.template.user_id);

    // Spawn a task to handle incoming messages
    let prompt_for_read = prompt.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(frame) = read.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!("Read error: {}", e);
                    return Err(ClientError::from(e));
                }
            };
            let formatted = match ServerMessage::parse(&frame) {
                ServerMessage::Comment(comment) => MessageFormatter::format_comment(&comment),
                _ => MessageFormatter::format_raw_message(&frame),
            };
            print!("{}", formatted);
            redisplay_prompt(&prompt_for_read);
        }
        tracing::info!("Server closed the connection");
        Ok(())
    });

    // Create channel for rustyline input
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    // Spawn a blocking thread for rustyline (synchronous readline)
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            // Channel closed, exit thread
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    // Spawn a task to send typed lines as comments
    let template = config.template;
    let mut write_task = tokio::spawn(async move {
        while let Some(line) = input_rx.recv().await {
            let elapsed = elapsed_at_attach + attached_at.elapsed().as_millis() as i64;
            let frame = template.render(elapsed, &line);
            if let Err(e) = write.send(frame).await {
                tracing::warn!("Failed to send comment: {}", e);
                return Err(ClientError::from(e));
            }
        }
        Ok(())
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        read_result = &mut read_task => {
            write_task.abort();
            read_result.unwrap_or(Ok(()))
        }
        write_result = &mut write_task => {
            read_task.abort();
            write_result.unwrap_or(Ok(()))
        }
    }
}
