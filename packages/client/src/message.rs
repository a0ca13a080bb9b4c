//! Server frames as the client sees them, and the comment submission format.

use xmltree::{Element, ParserConfig, XMLNode};

use sajiki_shared::frame::NET_CONGESTION;

/// Replacement for `,` in typed text; the submission format has no escaping
pub const FULLWIDTH_COMMA: char = '，';

/// One comment as displayed by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentView {
    pub user_id: String,
    pub role: String,
    /// Seconds into the movie, as sent
    pub time: String,
    pub value: String,
}

/// Comment list received right after the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Creation time of the comment list (Unix milliseconds)
    pub created_at: i64,
    /// Milliseconds between creation and this client's attach
    pub elapsed: i64,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Snapshot(Snapshot),
    Comment(CommentView),
    Congestion,
    /// Anything else (e.g. the policy document)
    Other(String),
}

impl ServerMessage {
    pub fn parse(frame: &str) -> Self {
        if frame == NET_CONGESTION {
            return Self::Congestion;
        }
        let config = ParserConfig::new().whitespace_to_characters(true);
        let Ok(root) = Element::parse_with_config(frame.as_bytes(), config) else {
            return Self::Other(frame.to_string());
        };
        match root.name.as_str() {
            "root" => {
                let number = |name: &str| {
                    root.get_child(name)
                        .and_then(|e| e.get_text())
                        .and_then(|t| t.trim().parse::<i64>().ok())
                };
                match number("createdTime") {
                    Some(created_at) => Self::Snapshot(Snapshot {
                        created_at,
                        elapsed: number("elapsedTime").unwrap_or(0),
                        comments: root
                            .children
                            .iter()
                            .filter_map(XMLNode::as_element)
                            .filter(|e| e.name == "comment")
                            .map(comment_view)
                            .collect(),
                    }),
                    None => Self::Other(frame.to_string()),
                }
            }
            "data" => match root.get_child("comment") {
                Some(comment) => Self::Comment(comment_view(comment)),
                None => Self::Other(frame.to_string()),
            },
            _ => Self::Other(frame.to_string()),
        }
    }
}

fn comment_view(comment: &Element) -> CommentView {
    let text = |group: &str, field: &str| {
        comment
            .get_child(group)
            .and_then(|g| g.get_child(field))
            .and_then(|f| f.get_text())
            .map(|t| t.into_owned())
            .unwrap_or_default()
    };
    CommentView {
        user_id: text("user", "user_id"),
        role: text("user", "role"),
        time: text("message", "time"),
        value: text("message", "value"),
    }
}

/// Fixed fields of every comment this client submits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentTemplate {
    pub user_id: String,
    pub role: String,
    pub origin: String,
    pub comment_type: String,
    pub target: String,
    pub scope: String,
    pub font_size: String,
    pub placement: String,
}

impl CommentTemplate {
    pub fn new(user_id: String, role: String) -> Self {
        Self {
            user_id,
            role,
            origin: "subscribe".to_string(),
            comment_type: "SHARE".to_string(),
            target: "live".to_string(),
            scope: "ALL".to_string(),
            font_size: "30".to_string(),
            placement: "100".to_string(),
        }
    }

    /// Build the 11-field submission frame for `text` posted at `elapsed_millis`
    pub fn render(&self, elapsed_millis: i64, text: &str) -> String {
        let value: String = text
            .chars()
            .map(|c| if c == ',' { FULLWIDTH_COMMA } else { c })
            .filter(|c| *c != '\0')
            .collect();
        let time = format!("{:.2}", elapsed_millis as f64 / 1000.0);
        [
            self.user_id.as_str(),
            self.role.as_str(),
            self.origin.as_str(),
            time.as_str(),
            value.as_str(),
            self.comment_type.as_str(),
            self.target.as_str(),
            self.scope.as_str(),
            "",
            self.font_size.as_str(),
            self.placement.as_str(),
        ]
        .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snapshot() {
        // テスト項目: スナップショットから作成時刻・経過時間・コメントが取り出せる
        // given (前提条件):
        let frame = concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "<root><createdTime>1000</createdTime>",
            "<comment><user><user_id>u1</user_id><role>STUDENT</role><from>subscribe</from></user>",
            "<message><time>1.50</time><value>Hello</value><type>SHARE</type><target>live</target>",
            "<scope>ALL</scope><whisper /></message><style><fontsize>30</fontsize><place>100</place></style></comment>",
            "<elapsedTime>2500</elapsedTime></root>",
        );

        // when (操作):
        let message = ServerMessage::parse(frame);

        // then (期待する結果):
        assert_eq!(
            message,
            ServerMessage::Snapshot(Snapshot {
                created_at: 1000,
                elapsed: 2500,
                comments: vec![CommentView {
                    user_id: "u1".to_string(),
                    role: "STUDENT".to_string(),
                    time: "1.50".to_string(),
                    value: "Hello".to_string(),
                }],
            })
        );
    }

    #[test]
    fn test_parse_broadcast_and_literals() {
        // テスト項目: 配信フレーム・Net Congestion・その他の文字列が区別される
        // given (前提条件):
        let broadcast = "<data><comment><user><user_id>u2</user_id></user><message><value>a &amp; b</value></message></comment></data>";

        // when (操作):
        let comment = ServerMessage::parse(broadcast);
        let congestion = ServerMessage::parse(NET_CONGESTION);
        let other = ServerMessage::parse("hello");

        // then (期待する結果):
        match comment {
            ServerMessage::Comment(view) => {
                assert_eq!(view.user_id, "u2");
                assert_eq!(view.value, "a & b");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(congestion, ServerMessage::Congestion);
        assert_eq!(other, ServerMessage::Other("hello".to_string()));
    }

    #[test]
    fn test_render_comment_replaces_commas() {
        // テスト項目: 入力中のカンマは全角に置き換えられ、常に 11 フィールドになる
        // given (前提条件):
        let template = CommentTemplate::new("u1".to_string(), "STUDENT".to_string());

        // when (操作):
        let frame = template.render(12_340, "yes, really");

        // then (期待する結果):
        assert_eq!(
            frame,
            "u1,STUDENT,subscribe,12.34,yes， really,SHARE,live,ALL,,30,100"
        );
        assert_eq!(frame.split(',').count(), 11);
    }
}
