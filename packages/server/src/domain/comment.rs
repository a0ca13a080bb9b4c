//! Comment entity and its CSV submission format.

use std::str::FromStr;

use super::error::CommentParseError;

/// Number of comma-separated fields in a submitted comment
pub const COMMENT_FIELD_COUNT: usize = 11;

/// Stands in for characters a comment list document cannot hold
pub const REPLACEMENT_CHARACTER: char = '\u{FFFD}';

/// One submitted comment.
///
/// Field order on the wire:
/// `user_id, role, from, time, value, type, target, scope, whisper, fontsize, place`.
/// Values are kept as the client sent them, except that characters outside
/// the XML `Char` production (and `\r`, which XML parsers fold into `\n`)
/// become `REPLACEMENT_CHARACTER`. There is no escaping, so a value
/// containing a comma shifts every later field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub user_id: String,
    pub role: String,
    /// Submission source tag (`from`)
    pub origin: String,
    /// Seconds into the video, as a decimal string (`time`)
    pub timestamp: String,
    /// Comment body (`value`)
    pub text: String,
    /// `type`
    pub comment_type: String,
    pub target: String,
    pub scope: String,
    /// Private-recipient marker, usually empty
    pub whisper: String,
    /// `fontsize`
    pub font_size: String,
    /// `place`
    pub placement: String,
}

impl FromStr for Comment {
    type Err = CommentParseError;

    fn from_str(frame: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = frame.split(',').collect();
        let [
            user_id,
            role,
            origin,
            timestamp,
            text,
            comment_type,
            target,
            scope,
            whisper,
            font_size,
            placement,
        ] = fields.as_slice()
        else {
            return Err(CommentParseError::FieldCount {
                expected: COMMENT_FIELD_COUNT,
                actual: fields.len(),
            });
        };

        Ok(Self {
            user_id: storable(user_id),
            role: storable(role),
            origin: storable(origin),
            timestamp: storable(timestamp),
            text: storable(text),
            comment_type: storable(comment_type),
            target: storable(target),
            scope: storable(scope),
            whisper: storable(whisper),
            font_size: storable(font_size),
            placement: storable(placement),
        })
    }
}

fn storable(field: &str) -> String {
    field
        .chars()
        .map(|c| {
            if is_storable_char(c) {
                c
            } else {
                REPLACEMENT_CHARACTER
            }
        })
        .collect()
}

fn is_storable_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}
