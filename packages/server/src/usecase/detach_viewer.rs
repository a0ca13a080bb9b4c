//! UseCase: 視聴者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DetachViewerUseCase::execute() メソッド
//! - スロットの解放と、最後の視聴者だった場合のコメントリスト保存
//!
//! ### なぜこのテストが必要か
//! - 最後の視聴者が抜けたときだけ保存されることを保証
//! - ハンドシェイク前に切れた接続でもスロットが返却されることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：視聴者が残っている場合（保存しない）、最後の視聴者（保存する）
//! - エッジケース：movie に紐付く前の切断

use std::sync::Arc;

use crate::{
    domain::SlotId,
    infrastructure::{ChannelHub, DetachOutcome, HubError},
};

/// 視聴者切断のユースケース
pub struct DetachViewerUseCase {
    /// ChannelHub（チャンネルのライフサイクル管理）
    hub: Arc<ChannelHub>,
}

impl DetachViewerUseCase {
    /// 新しい DetachViewerUseCase を作成
    pub fn new(hub: Arc<ChannelHub>) -> Self {
        Self { hub }
    }

    /// 視聴者切断を実行
    ///
    /// # Arguments
    ///
    /// * `slot_id` - 解放するスロット
    ///
    /// # Returns
    ///
    /// * `Ok(DetachOutcome)` - 紐付いていた movie と、保存したかどうか
    /// * `Err(HubError)` - 取得されていないスロット
    pub async fn execute(&self, slot_id: SlotId) -> Result<DetachOutcome, HubError> {
        let outcome = self.hub.detach(slot_id).await?;
        match &outcome.movie_id {
            Some(movie_id) => tracing::info!(
                "User ID {} left '{}' ({} viewers remain)",
                slot_id,
                movie_id,
                self.hub.registry().active_count(movie_id).await
            ),
            None => tracing::debug!("User ID {} released before attaching", slot_id),
        }
        Ok(outcome)
    }
}
