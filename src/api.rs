use std::{collections::HashSet, sync::mpsc, thread};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::models::{Episode, StatusRow, TranscriptSegment, UserVocabEntry, VocabEntry};

/// UI-facing state of one backend fetch.
#[derive(Debug)]
pub enum Load<T> {
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Load<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Load::Ready(v) => Some(v),
            _ => None,
        }
    }
}

/// Run `f` on a worker thread, reporting its result over a channel the event
/// loop drains. Dropping the receiver abandons the result.
pub fn spawn_fetch<T, F>(f: F) -> mpsc::Receiver<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx
}

pub fn url_encode(s: &str) -> String {
    let mut out = String::new();
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            b' ' => out.push_str("%20"),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// Draft of a user vocabulary row, from the add/edit form.
#[derive(Debug, Clone)]
pub struct VocabDraft {
    pub word: String,
    pub definition: String,
    pub example: String,
    /// `(episode_id, episode_title)` when saved from an episode view.
    pub episode: Option<(String, String)>,
}

/// PostgREST client for the hosted backend. Cheap to clone into worker
/// threads; every call is blocking and belongs off the UI thread.
#[derive(Debug, Clone)]
pub struct Backend {
    base: String,
    api_key: String,
    pub user_id: String,
}

impl Backend {
    pub fn new(base_url: &str, api_key: &str, user_id: &str) -> Self {
        Backend {
            base: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            user_id: user_id.to_string(),
        }
    }

    fn url(&self, table: &str, query: &str) -> String {
        format!("{}/rest/v1/{}?{}", self.base, table, query)
    }

    fn get_rows<T: DeserializeOwned>(&self, table: &str, query: &str) -> Result<Vec<T>> {
        let auth = format!("Bearer {}", self.api_key);
        let mut resp = ureq::get(&self.url(table, query))
            .header("apikey", &self.api_key)
            .header("Authorization", &auth)
            .call()
            .with_context(|| format!("GET {table}"))?;
        let body = resp
            .body_mut()
            .read_to_string()
            .with_context(|| format!("reading {table} response"))?;
        serde_json::from_str(&body).with_context(|| format!("decoding {table} rows"))
    }

    fn insert(&self, table: &str, body: &str) -> Result<()> {
        let auth = format!("Bearer {}", self.api_key);
        ureq::post(&self.url(table, "select=id"))
            .header("apikey", &self.api_key)
            .header("Authorization", &auth)
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .send(body)
            .with_context(|| format!("POST {table}"))?;
        Ok(())
    }

    fn update(&self, table: &str, query: &str, body: &str) -> Result<()> {
        let auth = format!("Bearer {}", self.api_key);
        ureq::patch(&self.url(table, query))
            .header("apikey", &self.api_key)
            .header("Authorization", &auth)
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .send(body)
            .with_context(|| format!("PATCH {table}"))?;
        Ok(())
    }

    fn delete(&self, table: &str, query: &str) -> Result<()> {
        let auth = format!("Bearer {}", self.api_key);
        ureq::delete(&self.url(table, query))
            .header("apikey", &self.api_key)
            .header("Authorization", &auth)
            .call()
            .with_context(|| format!("DELETE {table}"))?;
        Ok(())
    }

    pub fn episodes_page(&self, page: usize, page_size: usize) -> Result<Vec<Episode>> {
        self.get_rows(
            "episodes",
            &format!(
                "select=*&order=id.asc&offset={}&limit={}",
                page * page_size,
                page_size
            ),
        )
    }

    /// Title search; unpaginated, matching the original endpoint.
    pub fn search_episodes(&self, term: &str) -> Result<Vec<Episode>> {
        self.get_rows(
            "episodes",
            &format!("select=*&order=id.asc&title=ilike.*{}*", url_encode(term)),
        )
    }

    pub fn transcripts(&self, episode_id: &str) -> Result<Vec<TranscriptSegment>> {
        self.get_rows(
            "transcripts",
            &format!(
                "select=*&episode_id=eq.{}&order=start_time.asc",
                url_encode(episode_id)
            ),
        )
    }

    pub fn episode_vocab(&self, episode_id: &str) -> Result<Vec<VocabEntry>> {
        self.get_rows(
            "vocab_items",
            &format!("select=*&episode_id=eq.{}", url_encode(episode_id)),
        )
    }

    /// The user's own words, newest first. Scoped to an episode when
    /// `episode_id` is given; word search applies from two characters.
    pub fn user_vocab_page(
        &self,
        episode_id: Option<&str>,
        search: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<UserVocabEntry>> {
        let mut query = format!("select=*&user_id=eq.{}", url_encode(&self.user_id));
        if let Some(id) = episode_id {
            query.push_str(&format!("&episode_id=eq.{}", url_encode(id)));
        }
        let term = search.trim();
        if term.len() >= 2 {
            query.push_str(&format!("&word=ilike.*{}*", url_encode(term)));
        }
        query.push_str(&format!(
            "&order=created_at.desc&offset={}&limit={}",
            page * page_size,
            page_size
        ));
        self.get_rows("user_vocab_items", &query)
    }

    pub fn insert_user_vocab(&self, draft: &VocabDraft) -> Result<()> {
        self.insert("user_vocab_items", &vocab_body(&self.user_id, draft).to_string())
    }

    pub fn update_user_vocab(&self, id: &str, draft: &VocabDraft) -> Result<()> {
        let mut body = vocab_body(&self.user_id, draft);
        if let Some(obj) = body.as_object_mut() {
            obj.remove("user_id");
        }
        self.update(
            "user_vocab_items",
            &format!("id=eq.{}", url_encode(id)),
            &body.to_string(),
        )
    }

    pub fn delete_user_vocab(&self, id: &str) -> Result<()> {
        self.delete("user_vocab_items", &format!("id=eq.{}", url_encode(id)))
    }

    /// Favorite and learned episode-id sets for the configured user.
    pub fn status_sets(&self) -> Result<(HashSet<String>, HashSet<String>)> {
        let query = format!("select=episode_id&user_id=eq.{}", url_encode(&self.user_id));
        let favorites: Vec<StatusRow> = self.get_rows("user_favorite_episodes", &query)?;
        let learned: Vec<StatusRow> = self.get_rows("user_learnt_episodes", &query)?;
        Ok((
            favorites.into_iter().map(|r| r.episode_id).collect(),
            learned.into_iter().map(|r| r.episode_id).collect(),
        ))
    }

    pub fn toggle_favorite(&self, episode_id: &str) -> Result<bool> {
        self.toggle_status("user_favorite_episodes", episode_id)
    }

    pub fn toggle_learned(&self, episode_id: &str) -> Result<bool> {
        self.toggle_status("user_learnt_episodes", episode_id)
    }

    /// Check-then-insert/delete toggle. Returns the new membership state.
    fn toggle_status(&self, table: &str, episode_id: &str) -> Result<bool> {
        let filter = format!(
            "user_id=eq.{}&episode_id=eq.{}",
            url_encode(&self.user_id),
            url_encode(episode_id)
        );
        let existing: Vec<StatusRow> =
            self.get_rows(table, &format!("select=episode_id&{filter}"))?;
        if existing.is_empty() {
            let body = json!({ "user_id": self.user_id, "episode_id": episode_id });
            self.insert(table, &body.to_string())?;
            debug!(table, episode_id, "status toggled on");
            Ok(true)
        } else {
            self.delete(table, &filter)?;
            debug!(table, episode_id, "status toggled off");
            Ok(false)
        }
    }
}

fn vocab_body(user_id: &str, draft: &VocabDraft) -> Value {
    let example = draft.example.trim();
    json!({
        "user_id": user_id,
        "episode_id": draft.episode.as_ref().map(|(id, _)| id.clone()),
        "episode_title": draft.episode.as_ref().map(|(_, title)| title.clone()),
        "word": draft.word.trim(),
        "definition": draft.definition.trim(),
        "example": if example.is_empty() { Value::Null } else { Value::from(example) },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_encode_passes_unreserved_and_escapes_the_rest() {
        assert_eq!(url_encode("ep001"), "ep001");
        assert_eq!(url_encode("tea time"), "tea%20time");
        assert_eq!(url_encode("a&b=c"), "a%26b%3Dc");
    }

    #[test]
    fn vocab_body_nulls_empty_example_and_trims() {
        let draft = VocabDraft {
            word: " rain ".into(),
            definition: "water falling".into(),
            example: "  ".into(),
            episode: Some(("ep001".into(), "Weather".into())),
        };
        let body = vocab_body("u1", &draft);
        assert_eq!(body["word"], "rain");
        assert!(body["example"].is_null());
        assert_eq!(body["episode_id"], "ep001");
        assert_eq!(body["episode_title"], "Weather");
    }

    #[test]
    fn vocab_body_without_episode_scope() {
        let draft = VocabDraft {
            word: "rain".into(),
            definition: "water falling".into(),
            example: "heavy rain".into(),
            episode: None,
        };
        let body = vocab_body("u1", &draft);
        assert!(body["episode_id"].is_null());
        assert_eq!(body["example"], "heavy rain");
    }
}
