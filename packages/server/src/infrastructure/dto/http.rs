//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use crate::infrastructure::channel_hub::{ChannelDetail, ChannelSummary};
use sajiki_shared::time::timestamp_to_rfc3339;

/// Live channel summary (for `/api/channels`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummaryDto {
    pub movie_id: String,
    pub viewers: usize,
    pub comments: usize,
    pub created_at: String,
}

/// Occupied slot (for `/api/channels/{movie_id}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDto {
    pub user_id: usize,
    pub peer: Option<String>,
}

/// Live channel detail (for `/api/channels/{movie_id}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDetailDto {
    pub movie_id: String,
    pub viewers: usize,
    pub comments: usize,
    pub created_at: String,
    pub slots: Vec<SlotDto>,
}

impl From<ChannelSummary> for ChannelSummaryDto {
    fn from(summary: ChannelSummary) -> Self {
        Self {
            movie_id: summary.movie_id.to_string(),
            viewers: summary.viewers,
            comments: summary.comments,
            created_at: timestamp_to_rfc3339(summary.created_at.value()),
        }
    }
}

impl From<ChannelDetail> for ChannelDetailDto {
    fn from(detail: ChannelDetail) -> Self {
        let ChannelSummaryDto {
            movie_id,
            viewers,
            comments,
            created_at,
        } = detail.summary.into();
        Self {
            movie_id,
            viewers,
            comments,
            created_at,
            slots: detail
                .slots
                .into_iter()
                .map(|slot| SlotDto {
                    user_id: slot.slot_id.index(),
                    peer: slot.peer.map(|peer| peer.to_string()),
                })
                .collect(),
        }
    }
}
