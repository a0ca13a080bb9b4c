//! Message formatting utilities for client display.

use sajiki_shared::time::{format_elapsed, timestamp_to_rfc3339};

use crate::message::{CommentView, Snapshot};

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the comment list received after attaching
    ///
    /// # Arguments
    ///
    /// * `movie_id` - The movie this client is watching
    /// * `snapshot` - The comment list received from the server
    ///
    /// # Returns
    ///
    /// A formatted string with the comment history
    pub fn format_snapshot(movie_id: &str, snapshot: &Snapshot) -> String {
        let mut output = String::new();
        output.push_str("\n============================================================\n");
        output.push_str(&format!(
            "Movie '{}' (created at {}, running for {})\n",
            movie_id,
            timestamp_to_rfc3339(snapshot.created_at),
            format_elapsed(snapshot.elapsed)
        ));

        if snapshot.comments.is_empty() {
            output.push_str("(No comments)\n");
        } else {
            for comment in &snapshot.comments {
                output.push_str(&Self::format_comment_line(comment));
                output.push('\n');
            }
        }

        output.push_str("============================================================\n");
        output
    }

    /// Format a broadcast comment
    pub fn format_comment(comment: &CommentView) -> String {
        format!("\n{}\n", Self::format_comment_line(comment))
    }

    /// Format a server frame that is neither a comment list nor a comment
    pub fn format_raw_message(text: &str) -> String {
        format!("\n[raw] {}\n", text)
    }

    fn format_comment_line(comment: &CommentView) -> String {
        format!(
            "[{:>8}s] {} ({}): {}",
            comment.time, comment.user_id, comment.role, comment.value
        )
    }
}
