use serde::Deserialize;

/// One episode row. The backend stores more columns (source page, quiz and
/// pdf links) that the player has no use for; serde skips them.
#[derive(Debug, Clone, Deserialize)]
pub struct Episode {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// One timed transcript line. Rows for an episode come back ordered by
/// `start_time` and are assumed non-overlapping; nothing here re-checks that.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptSegment {
    pub id: String,
    pub episode_id: String,
    #[serde(default)]
    pub order: i64,
    pub text: String,
    #[serde(default)]
    pub speaker: Option<String>,
    pub start_time: f64,
    pub end_time: f64,
}

/// System vocabulary shipped with an episode (read-only).
#[derive(Debug, Clone, Deserialize)]
pub struct VocabEntry {
    pub id: String,
    #[serde(default)]
    pub episode_id: Option<String>,
    pub word: String,
    pub definition: String,
    #[serde(default)]
    pub example: Option<String>,
}

/// A word the user saved themselves.
#[derive(Debug, Clone, Deserialize)]
pub struct UserVocabEntry {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub episode_id: Option<String>,
    pub word: String,
    pub definition: String,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub episode_title: Option<String>,
}

/// Rows of `user_favorite_episodes` / `user_learnt_episodes`.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusRow {
    pub episode_id: String,
}
