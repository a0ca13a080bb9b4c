//! UseCase: 視聴者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - AttachViewerUseCase::execute() メソッド
//! - スロット取得 → チャンネルを開く → movie への紐付け → スナップショット生成
//!
//! ### なぜこのテストが必要か
//! - 満員時に `Net Congestion` を返すための `RegistryFull` が正しく返ることを保証
//! - どの失敗経路でもスロットがリークしないことを確認
//! - 同じ movie の視聴者が 1 つのチャンネルを共有することを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：最初の視聴者（チャンネル作成）、2 人目以降（共有）
//! - 異常系：満員
//! - エッジケース：満員の後、誰かが切断すると再び接続できる

use std::{net::SocketAddr, sync::Arc};

use crate::{
    domain::{FrameSink, MovieId, SlotId},
    infrastructure::{ChannelHub, CommentChannel},
};

use super::error::AttachError;

/// 接続に成功した視聴者
#[derive(Debug)]
pub struct AttachedViewer {
    /// 割り当てられたスロット（= ユーザー ID）
    pub slot_id: SlotId,
    /// 共有のコメントチャンネル
    pub channel: Arc<CommentChannel>,
    /// 新しい視聴者に送るスナップショット（elapsedTime 付き）
    pub snapshot: String,
    /// チャンネル作成からの経過ミリ秒
    pub elapsed: i64,
}

/// 視聴者接続のユースケース
pub struct AttachViewerUseCase {
    /// ChannelHub（チャンネルのライフサイクル管理）
    hub: Arc<ChannelHub>,
}

impl AttachViewerUseCase {
    /// 新しい AttachViewerUseCase を作成
    pub fn new(hub: Arc<ChannelHub>) -> Self {
        Self { hub }
    }

    /// 視聴者接続を実行
    ///
    /// # Arguments
    ///
    /// * `movie_id` - ハンドシェイクで受け取った movie id（Domain Model）
    /// * `sink` - この接続への送信キュー
    /// * `peer` - 接続元アドレス（診断用）
    ///
    /// # Returns
    ///
    /// * `Ok(AttachedViewer)` - 接続成功
    /// * `Err(AttachError::RegistryFull)` - 満員（スロットは割り当てられない）
    /// * `Err(AttachError)` - その他の失敗（取得済みのスロットは解放済み）
    pub async fn execute(
        &self,
        movie_id: MovieId,
        sink: FrameSink,
        peer: Option<SocketAddr>,
    ) -> Result<AttachedViewer, AttachError> {
        // 1. スロットを取得
        let slot_id = self.hub.registry().acquire(sink, peer).await?;

        // 2. チャンネルを開いて紐付け、スナップショットを生成
        match self.hub.attach(slot_id, &movie_id).await {
            Ok(attached) => Ok(AttachedViewer {
                slot_id,
                channel: attached.channel,
                snapshot: attached.snapshot,
                elapsed: attached.elapsed,
            }),
            Err(e) => {
                // 3. 失敗時はスロットを返却
                if let Err(release_error) = self.hub.detach(slot_id).await {
                    tracing::warn!(
                        "Failed to release user ID {} after attach error: {}",
                        slot_id,
                        release_error
                    );
                }
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{ViewerRegistry, repository::InMemoryCommentListStore};
    use sajiki_shared::time::FixedClock;
    use tokio::sync::mpsc;

    fn create_test_hub(capacity: usize) -> Arc<ChannelHub> {
        Arc::new(ChannelHub::new(
            Arc::new(ViewerRegistry::new(capacity)),
            Arc::new(InMemoryCommentListStore::new()),
            Arc::new(FixedClock::new(1_700_000_000_000)),
        ))
    }

    fn movie(id: &str) -> MovieId {
        MovieId::new(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_attach_viewer_success() {
        // テスト項目: 最初の視聴者はスロット 0 に割り当てられ、空のスナップショットを受け取る
        // given (前提条件):
        let hub = create_test_hub(2);
        let usecase = AttachViewerUseCase::new(hub.clone());
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let attached = usecase.execute(movie("m1"), tx, None).await.unwrap();

        // then (期待する結果):
        assert_eq!(attached.slot_id, SlotId::new(0));
        assert_eq!(attached.channel.movie_id(), &movie("m1"));
        assert!(attached.snapshot.contains("<elapsedTime>0</elapsedTime>"));
        assert_eq!(hub.registry().active_count(&movie("m1")).await, 1);
    }

    #[tokio::test]
    async fn test_attach_viewer_shares_channel_per_movie() {
        // テスト項目: 同じ movie の視聴者は同じチャンネルを共有し、別の movie は別チャンネルになる
        // given (前提条件):
        let hub = create_test_hub(3);
        let usecase = AttachViewerUseCase::new(hub);
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let (tx3, _rx3) = mpsc::unbounded_channel();

        // when (操作):
        let a = usecase.execute(movie("m1"), tx1, None).await.unwrap();
        let b = usecase.execute(movie("m1"), tx2, None).await.unwrap();
        let c = usecase.execute(movie("m2"), tx3, None).await.unwrap();

        // then (期待する結果):
        assert!(Arc::ptr_eq(&a.channel, &b.channel));
        assert!(!Arc::ptr_eq(&a.channel, &c.channel));
        assert_eq!(c.slot_id, SlotId::new(2));
    }

    #[tokio::test]
    async fn test_attach_viewer_registry_full() {
        // テスト項目: 満員のときは RegistryFull が返り、スロットは割り当てられない
        // given (前提条件):
        let hub = create_test_hub(1);
        let usecase = AttachViewerUseCase::new(hub.clone());
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        usecase.execute(movie("m1"), tx1, None).await.unwrap();

        // when (操作):
        let result = usecase.execute(movie("m1"), tx2, None).await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(AttachError::RegistryFull { capacity: 1 })
        ));
        assert_eq!(hub.registry().occupied().await, 1);
    }

    #[tokio::test]
    async fn test_attach_viewer_after_slot_freed() {
        // テスト項目: 満員の後、誰かが切断すれば次の接続は成功する
        // given (前提条件):
        let hub = create_test_hub(1);
        let usecase = AttachViewerUseCase::new(hub.clone());
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let (tx3, _rx3) = mpsc::unbounded_channel();
        let first = usecase.execute(movie("m1"), tx1, None).await.unwrap();
        assert!(usecase.execute(movie("m1"), tx2, None).await.is_err());

        // when (操作):
        hub.detach(first.slot_id).await.unwrap();
        let result = usecase.execute(movie("m1"), tx3, None).await;

        // then (期待する結果):
        assert_eq!(result.unwrap().slot_id, SlotId::new(0));
    }
}
