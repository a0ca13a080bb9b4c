//! Comment list document.
//!
//! The channel history is kept as an XML tree (`xmltree`) so it can be
//! delivered and persisted in the layout existing clients read:
//!
//! ```text
//! <root>
//!   <createdTime>1700000000000</createdTime>
//!   <comment>
//!     <user><user_id/><role/><from/></user>
//!     <message><time/><value/><type/><target/><scope/><whisper/></message>
//!     <style><fontsize/><place/></style>
//!   </comment>
//!   ...
//! </root>
//! ```
//!
//! Broadcast frames wrap a single `comment` in a `data` root instead.

use thiserror::Error;
use xmltree::{Element, EmitterConfig, ParserConfig, XMLNode};

use crate::domain::{Comment, Timestamp};

const ROOT: &str = "root";
const CREATED_TIME: &str = "createdTime";
const ELAPSED_TIME: &str = "elapsedTime";
const COMMENT: &str = "comment";
const DATA: &str = "data";

const USER: &str = "user";
const MESSAGE: &str = "message";
const STYLE: &str = "style";

/// Document parse/serialize errors
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to parse comment list: {0}")]
    Parse(String),

    #[error("comment list has no createdTime element")]
    MissingCreatedTime,

    #[error("invalid createdTime '{0}'")]
    InvalidCreatedTime(String),

    #[error("failed to serialize comment list: {0}")]
    Serialize(String),

    #[error("serialized comment list is not UTF-8")]
    NotUtf8(#[from] std::string::FromUtf8Error),
}

/// In-memory comment list of one movie
#[derive(Debug, Clone)]
pub struct CommentDocument {
    root: Element,
    created_at: Timestamp,
}

impl CommentDocument {
    /// Skeleton document holding only the creation time
    pub fn new(created_at: Timestamp) -> Self {
        let mut root = Element::new(ROOT);
        append_text_child(&mut root, CREATED_TIME, &created_at.value().to_string());
        Self { root, created_at }
    }

    /// Parse a persisted document.
    ///
    /// A transient `elapsedTime` left in the input is dropped. Whitespace-only
    /// field text is kept as written.
    pub fn parse(bytes: &[u8]) -> Result<Self, DocumentError> {
        let config = ParserConfig::new().whitespace_to_characters(true);
        let mut root = Element::parse_with_config(bytes, config)
            .map_err(|e| DocumentError::Parse(e.to_string()))?;

        let created_text = root
            .get_child(CREATED_TIME)
            .ok_or(DocumentError::MissingCreatedTime)?
            .get_text()
            .unwrap_or_default()
            .into_owned();
        let created_at = created_text
            .trim()
            .parse::<i64>()
            .map_err(|_| DocumentError::InvalidCreatedTime(created_text.clone()))?;

        while root.take_child(ELAPSED_TIME).is_some() {}

        Ok(Self {
            root,
            created_at: Timestamp::new(created_at),
        })
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Append a comment after all existing ones
    pub fn append(&mut self, comment: &Comment) {
        self.root
            .children
            .push(XMLNode::Element(comment_element(comment)));
    }

    /// Comments in insertion order
    pub fn comments(&self) -> Vec<Comment> {
        self.comment_elements().map(comment_from_element).collect()
    }

    pub fn comment_count(&self) -> usize {
        self.comment_elements().count()
    }

    /// Serialize for the persisted file
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        write_element(&self.root, true)
    }

    /// Serialize for a newly attaching viewer, with a transient `elapsedTime`.
    ///
    /// The element is added to a copy; this document is left untouched.
    pub fn render_snapshot(&self, elapsed_millis: i64) -> Result<String, DocumentError> {
        let mut snapshot = self.root.clone();
        append_text_child(&mut snapshot, ELAPSED_TIME, &elapsed_millis.to_string());
        Ok(String::from_utf8(write_element(&snapshot, true)?)?)
    }

    /// Serialize one comment as a broadcast `data` frame
    pub fn render_broadcast(comment: &Comment) -> Result<String, DocumentError> {
        let mut data = Element::new(DATA);
        data.children.push(XMLNode::Element(comment_element(comment)));
        Ok(String::from_utf8(write_element(&data, false)?)?)
    }

    fn comment_elements(&self) -> impl Iterator<Item = &Element> {
        self.root.children.iter().filter_map(|node| match node {
            XMLNode::Element(element) if element.name == COMMENT => Some(element),
            _ => None,
        })
    }
}

fn append_text_child(parent: &mut Element, name: &str, text: &str) {
    let mut child = Element::new(name);
    if !text.is_empty() {
        child.children.push(XMLNode::Text(text.to_string()));
    }
    parent.children.push(XMLNode::Element(child));
}

fn group(name: &str, fields: &[(&str, &str)]) -> Element {
    let mut element = Element::new(name);
    for (field, text) in fields {
        append_text_child(&mut element, field, text);
    }
    element
}

fn comment_element(comment: &Comment) -> Element {
    let mut element = Element::new(COMMENT);
    let groups = [
        group(
            USER,
            &[
                ("user_id", comment.user_id.as_str()),
                ("role", comment.role.as_str()),
                ("from", comment.origin.as_str()),
            ],
        ),
        group(
            MESSAGE,
            &[
                ("time", comment.timestamp.as_str()),
                ("value", comment.text.as_str()),
                ("type", comment.comment_type.as_str()),
                ("target", comment.target.as_str()),
                ("scope", comment.scope.as_str()),
                ("whisper", comment.whisper.as_str()),
            ],
        ),
        group(
            STYLE,
            &[
                ("fontsize", comment.font_size.as_str()),
                ("place", comment.placement.as_str()),
            ],
        ),
    ];
    element
        .children
        .extend(groups.into_iter().map(XMLNode::Element));
    element
}

fn comment_from_element(element: &Element) -> Comment {
    let text = |group: &str, field: &str| {
        element
            .get_child(group)
            .and_then(|g| g.get_child(field))
            .and_then(|f| f.get_text())
            .map(|t| t.into_owned())
            .unwrap_or_default()
    };

    Comment {
        user_id: text(USER, "user_id"),
        role: text(USER, "role"),
        origin: text(USER, "from"),
        timestamp: text(MESSAGE, "time"),
        text: text(MESSAGE, "value"),
        comment_type: text(MESSAGE, "type"),
        target: text(MESSAGE, "target"),
        scope: text(MESSAGE, "scope"),
        whisper: text(MESSAGE, "whisper"),
        font_size: text(STYLE, "fontsize"),
        placement: text(STYLE, "place"),
    }
}

fn write_element(element: &Element, declaration: bool) -> Result<Vec<u8>, DocumentError> {
    let config = EmitterConfig::new()
        .perform_indent(false)
        .write_document_declaration(declaration);
    let mut buf = Vec::new();
    element
        .write_with_config(&mut buf, config)
        .map_err(|e| DocumentError::Serialize(e.to_string()))?;
    Ok(buf)
}
