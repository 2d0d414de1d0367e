use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A single user-to-video interaction event.
///
/// Append-only and owned by the external store; the engine only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: String,
    pub video_id: String,
    pub action: InteractionAction,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionAction {
    View,
    Like,
    Comment,
    Share,
    Complete,
    NotInterested,
}

impl InteractionAction {
    /// Signal strength used when building weighted interaction vectors.
    pub fn weight(&self) -> f64 {
        match self {
            InteractionAction::View => 1.0,
            InteractionAction::Complete => 2.0,
            InteractionAction::Like => 3.0,
            InteractionAction::Comment => 4.0,
            InteractionAction::Share => 5.0,
            InteractionAction::NotInterested => 1.0,
        }
    }
}

/// Precomputed feature row for one video, loaded wholesale into the
/// `FeatureIndex`. Vector dimension is constant across a deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoFeatures {
    pub video_id: String,
    pub vector: Vec<f32>,
    pub categories: Vec<String>,
    pub primary_category: String,
    pub creator_id: String,
    pub age_in_days: f64,
    pub view_count: u64,
}

/// Per-user preference profile, inferred from history on first access and
/// persisted afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: String,
    /// Ordered by interaction frequency, most frequent first.
    pub categories: Vec<String>,
    pub hashtags: Vec<String>,
    pub favorite_creators: Vec<String>,
    pub avg_duration: f64,
}

/// Partial preference update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceUpdate {
    pub categories: Option<Vec<String>>,
    pub hashtags: Option<Vec<String>>,
    pub favorite_creators: Option<Vec<String>>,
    pub avg_duration: Option<f64>,
}

/// Coarse behavioral classification, recomputed in batch. Last write wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Creator,
    PowerUser,
    Casual,
    Regular,
}

impl Segment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Creator => "creator",
            Segment::PowerUser => "power_user",
            Segment::Casual => "casual",
            Segment::Regular => "regular",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSegment {
    pub user_id: String,
    pub segment: Segment,
    pub updated_at: DateTime<Utc>,
}

/// Tag identifying where a candidate or recommendation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Collaborative,
    Content,
    Trending,
    Model,
    Similar,
    Discovery,
    Viral,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Collaborative => "collaborative",
            Source::Content => "content",
            Source::Trending => "trending",
            Source::Model => "model",
            Source::Similar => "similar",
            Source::Discovery => "discovery",
            Source::Viral => "viral",
        }
    }
}

/// Raw output of a single candidate source, before merging.
#[derive(Debug, Clone)]
pub struct SourceCandidate {
    pub video_id: String,
    pub score: f64,
    /// Similar users backing this candidate (collaborative source only).
    pub supporters: Vec<String>,
}

impl SourceCandidate {
    pub fn new(video_id: impl Into<String>, score: f64) -> Self {
        Self {
            video_id: video_id.into(),
            score,
            supporters: Vec::new(),
        }
    }
}

/// Per-request candidate after the keyed merge: one entry per video with
/// per-source scores and the ordered list of contributing sources.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub video_id: String,
    pub scores: HashMap<Source, f64>,
    pub sources: Vec<Source>,
    pub supporters: Vec<String>,
}

impl Candidate {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            scores: HashMap::new(),
            sources: Vec::new(),
            supporters: Vec::new(),
        }
    }
}

/// Candidate with its fused score and resolved feature row attached.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub final_score: f64,
    pub features: Option<Arc<VideoFeatures>>,
}

/// Full video record as held by the external store. Used for enrichment and
/// preference inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub duration: f64,
    pub view_count: u64,
    pub like_count: u64,
    pub share_count: u64,
    pub creator_id: String,
    pub creator_name: String,
    pub category: Option<String>,
    pub hashtags: Vec<String>,
    pub quality_score: Option<f64>,
    pub trending_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Response-shaped subset of a video record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub duration: f64,
    pub view_count: u64,
    pub like_count: u64,
    pub creator_id: String,
    pub creator_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&VideoRecord> for VideoSummary {
    fn from(video: &VideoRecord) -> Self {
        Self {
            id: video.video_id.clone(),
            title: video.title.clone(),
            thumbnail_url: video.thumbnail_url.clone(),
            duration: video.duration,
            view_count: video.view_count,
            like_count: video.like_count,
            creator_id: video.creator_id.clone(),
            creator_name: video.creator_name.clone(),
            created_at: video.created_at,
        }
    }
}

/// One ranked entry of a recommendation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub video_id: String,
    pub score: f64,
    pub sources: Vec<Source>,
    pub video: VideoSummary,
    pub reason: String,
}

/// Per-video engagement counts over a window, input to the trending
/// aggregate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngagementCounts {
    pub video_id: String,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_weights() {
        assert_eq!(InteractionAction::View.weight(), 1.0);
        assert_eq!(InteractionAction::Complete.weight(), 2.0);
        assert_eq!(InteractionAction::Like.weight(), 3.0);
        assert_eq!(InteractionAction::Comment.weight(), 4.0);
        assert_eq!(InteractionAction::Share.weight(), 5.0);
    }

    #[test]
    fn test_segment_serde_names() {
        let json = serde_json::to_string(&Segment::PowerUser).unwrap();
        assert_eq!(json, "\"power_user\"");
        let back: Segment = serde_json::from_str("\"casual\"").unwrap();
        assert_eq!(back, Segment::Casual);
    }

    #[test]
    fn test_action_serde_names() {
        let json = serde_json::to_string(&InteractionAction::NotInterested).unwrap();
        assert_eq!(json, "\"not-interested\"");
    }
}
