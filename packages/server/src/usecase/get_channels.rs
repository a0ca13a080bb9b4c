//! UseCase: チャンネル一覧・詳細取得（診断 API 用）

use std::sync::Arc;

use crate::{
    domain::MovieId,
    infrastructure::{ChannelDetail, ChannelHub, ChannelSummary},
};

use super::error::GetChannelDetailError;

/// チャンネル一覧取得のユースケース
pub struct GetChannelsUseCase {
    hub: Arc<ChannelHub>,
}

impl GetChannelsUseCase {
    pub fn new(hub: Arc<ChannelHub>) -> Self {
        Self { hub }
    }

    /// 生きているチャンネルの一覧（movie id 順）
    pub async fn execute(&self) -> Vec<ChannelSummary> {
        self.hub.live_channels().await
    }
}

/// チャンネル詳細取得のユースケース
pub struct GetChannelDetailUseCase {
    hub: Arc<ChannelHub>,
}

impl GetChannelDetailUseCase {
    pub fn new(hub: Arc<ChannelHub>) -> Self {
        Self { hub }
    }

    /// # Returns
    ///
    /// * `Ok(ChannelDetail)` - チャンネル詳細（視聴中のスロットを含む）
    /// * `Err(GetChannelDetailError::ChannelNotFound)` - 視聴者がいない movie
    pub async fn execute(&self, movie_id: String) -> Result<ChannelDetail, GetChannelDetailError> {
        let movie_id = MovieId::new(movie_id).map_err(|_| GetChannelDetailError::InvalidMovieId)?;
        self.hub
            .channel_detail(&movie_id)
            .await
            .ok_or(GetChannelDetailError::ChannelNotFound)
    }
}
