use mockito::Matcher;

use lingopod::api::{Backend, VocabDraft};

fn backend(server: &mockito::ServerGuard) -> Backend {
    Backend::new(&server.url(), "test-key", "user-1")
}

#[test]
fn episodes_page_parses_rows_and_skips_unknown_columns() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/rest/v1/episodes")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("order".into(), "id.asc".into()),
            Matcher::UrlEncoded("offset".into(), "0".into()),
            Matcher::UrlEncoded("limit".into(), "20".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[
                {"id":"ep001","title":"Tea Time","description":"a chat about tea",
                 "thumbnail_url":"https://cdn/x.png","audio_url":"https://cdn/x.mp3",
                 "episode_url":"https://site/ep001","pdf_url":null,"quiz_url":null},
                {"id":"ep002","title":"Rainy Days","description":null,
                 "thumbnail_url":null,"audio_url":null}
            ]"#,
        )
        .create();

    let episodes = backend(&server).episodes_page(0, 20).unwrap();
    assert_eq!(episodes.len(), 2);
    assert_eq!(episodes[0].id, "ep001");
    assert_eq!(episodes[0].audio_url.as_deref(), Some("https://cdn/x.mp3"));
    assert_eq!(episodes[1].description, None);
}

#[test]
fn search_filters_by_title_ilike() {
    let mut server = mockito::Server::new();
    let m = server
        .mock("GET", "/rest/v1/episodes")
        .match_query(Matcher::UrlEncoded("title".into(), "ilike.*tea*".into()))
        .with_status(200)
        .with_body(r#"[{"id":"ep001","title":"Tea Time"}]"#)
        .create();

    let found = backend(&server).search_episodes("tea").unwrap();
    assert_eq!(found.len(), 1);
    m.assert();
}

#[test]
fn transcripts_come_back_ordered_by_start_time() {
    let mut server = mockito::Server::new();
    let m = server
        .mock("GET", "/rest/v1/transcripts")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("episode_id".into(), "eq.ep001".into()),
            Matcher::UrlEncoded("order".into(), "start_time.asc".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"[
                {"id":"t1","episode_id":"ep001","order":1,"text":"Hello there.",
                 "speaker":"Anna","start_time":0.0,"end_time":4.5},
                {"id":"t2","episode_id":"ep001","order":2,"text":"Hi!",
                 "speaker":null,"start_time":4.5,"end_time":6.0}
            ]"#,
        )
        .create();

    let segments = backend(&server).transcripts("ep001").unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].speaker.as_deref(), Some("Anna"));
    assert!(segments[0].start_time < segments[1].start_time);
    m.assert();
}

#[test]
fn transcript_fetch_failure_is_an_error_not_a_panic() {
    let mut server = mockito::Server::new();
    let _m = server
        .mock("GET", "/rest/v1/transcripts")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body(r#"{"message":"boom"}"#)
        .create();

    assert!(backend(&server).transcripts("ep001").is_err());
}

#[test]
fn toggle_inserts_when_no_row_exists() {
    let mut server = mockito::Server::new();
    let _get = server
        .mock("GET", "/rest/v1/user_favorite_episodes")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("[]")
        .create();
    let post = server
        .mock("POST", "/rest/v1/user_favorite_episodes")
        .match_query(Matcher::Any)
        .match_body(Matcher::JsonString(
            r#"{"user_id":"user-1","episode_id":"ep001"}"#.into(),
        ))
        .with_status(201)
        .create();

    let now_on = backend(&server).toggle_favorite("ep001").unwrap();
    assert!(now_on);
    post.assert();
}

#[test]
fn toggle_deletes_when_a_row_exists() {
    let mut server = mockito::Server::new();
    let _get = server
        .mock("GET", "/rest/v1/user_learnt_episodes")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"episode_id":"ep001"}]"#)
        .create();
    let delete = server
        .mock("DELETE", "/rest/v1/user_learnt_episodes")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("user_id".into(), "eq.user-1".into()),
            Matcher::UrlEncoded("episode_id".into(), "eq.ep001".into()),
        ]))
        .with_status(204)
        .create();

    let now_on = backend(&server).toggle_learned("ep001").unwrap();
    assert!(!now_on);
    delete.assert();
}

#[test]
fn status_sets_collect_both_tables() {
    let mut server = mockito::Server::new();
    let _fav = server
        .mock("GET", "/rest/v1/user_favorite_episodes")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"episode_id":"ep001"},{"episode_id":"ep002"}]"#)
        .create();
    let _learnt = server
        .mock("GET", "/rest/v1/user_learnt_episodes")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"episode_id":"ep003"}]"#)
        .create();

    let (favorites, learned) = backend(&server).status_sets().unwrap();
    assert!(favorites.contains("ep001") && favorites.contains("ep002"));
    assert!(learned.contains("ep003"));
    assert_eq!(favorites.len(), 2);
}

#[test]
fn user_vocab_insert_and_delete_round_trip() {
    let mut server = mockito::Server::new();
    let post = server
        .mock("POST", "/rest/v1/user_vocab_items")
        .match_query(Matcher::Any)
        .with_status(201)
        .create();
    let delete = server
        .mock("DELETE", "/rest/v1/user_vocab_items")
        .match_query(Matcher::UrlEncoded("id".into(), "eq.v1".into()))
        .with_status(204)
        .create();

    let b = backend(&server);
    let draft = VocabDraft {
        word: "drizzle".into(),
        definition: "light rain".into(),
        example: String::new(),
        episode: Some(("ep001".into(), "Rainy Days".into())),
    };
    b.insert_user_vocab(&draft).unwrap();
    b.delete_user_vocab("v1").unwrap();
    post.assert();
    delete.assert();
}

#[test]
fn user_vocab_page_scopes_to_episode_and_user() {
    let mut server = mockito::Server::new();
    let m = server
        .mock("GET", "/rest/v1/user_vocab_items")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("user_id".into(), "eq.user-1".into()),
            Matcher::UrlEncoded("episode_id".into(), "eq.ep001".into()),
            Matcher::UrlEncoded("order".into(), "created_at.desc".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"[{"id":"v1","user_id":"user-1","episode_id":"ep001","word":"drizzle",
                 "definition":"light rain","example":null,
                 "created_at":"2026-08-01T10:00:00Z","episode_title":"Rainy Days"}]"#,
        )
        .create();

    let rows = backend(&server)
        .user_vocab_page(Some("ep001"), "", 0, 10)
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].word, "drizzle");
    assert_eq!(rows[0].episode_title.as_deref(), Some("Rainy Days"));
    m.assert();
}
