//! UseCase: コメント投稿処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - PostCommentUseCase::execute() メソッド
//! - コメントの解析 → チャンネルへの追記 → 同じ movie の全視聴者への配信
//!
//! ### なぜこのテストが必要か
//! - 送信者を含む全視聴者に配信されることを保証
//! - 追記と配信が 1 つのロックの中で行われ、配信順が追記順と一致することを確認
//! - フィールド数が合わないフレームは追記も配信もされないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：コメントの追記と配信
//! - 異常系：フィールド数不足・過多
//! - エッジケース：並行投稿時の配信順

use std::sync::Arc;

use crate::{
    domain::{Comment, MessagePusher},
    infrastructure::{CommentChannel, CommentDocument},
};

use super::error::PostCommentError;

/// コメント投稿のユースケース
pub struct PostCommentUseCase {
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl PostCommentUseCase {
    /// 新しい PostCommentUseCase を作成
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// コメント投稿を実行
    ///
    /// # Arguments
    ///
    /// * `channel` - 投稿者が接続しているチャンネル
    /// * `frame` - 受信したフレーム（11 フィールドの CSV）
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - 配信できた視聴者数（送信者を含む）
    /// * `Err(PostCommentError::Malformed)` - フィールド数が合わない
    pub async fn execute(
        &self,
        channel: &CommentChannel,
        frame: &str,
    ) -> Result<usize, PostCommentError> {
        // 1. コメントを解析し、配信用 XML を生成
        let comment: Comment = frame.parse()?;
        let rendered = CommentDocument::render_broadcast(&comment)?;

        // 2. 追記と配信は同じロックの中で行う（配信順 = 追記順）
        let mut document = channel.lock().await;
        document.append(&comment);
        let recipients = self
            .message_pusher
            .broadcast(channel.movie_id(), &rendered)
            .await;
        drop(document);

        tracing::debug!(
            "Comment on '{}' delivered to {} viewers",
            channel.movie_id(),
            recipients
        );
        Ok(recipients)
    }
}
