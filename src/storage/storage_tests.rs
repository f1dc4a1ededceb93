use super::*;

/// Every backend that needs no external server.
async fn backends() -> Vec<(&'static str, SharedStore)> {
    let mut out = vec![("memory", SharedStore::memory())];
    #[cfg(feature = "sqlite")]
    out.push(("sqlite", open_store("sqlite3://:memory:").await.unwrap()));
    out
}

#[tokio::test]
async fn survey_upsert_then_get_returns_latest_data() {
    for (name, store) in backends().await {
        assert!(store.get_survey("j").await.unwrap().is_none(), "{name}");
        store.upsert_survey(Survey::new("j", "Q1")).await.unwrap();
        assert_eq!(store.get_survey("j").await.unwrap(), Some(Survey::new("j", "Q1")), "{name}");
        // Second upsert replaces, never duplicates
        store.upsert_survey(Survey::new("j", "Q2")).await.unwrap();
        assert_eq!(store.get_survey("j").await.unwrap().unwrap().data, "Q2", "{name}");
        assert_eq!(store.list_surveys().await.unwrap().len(), 1, "{name}");
    }
}

#[tokio::test]
async fn list_surveys_is_ordered_by_id() {
    for (name, store) in backends().await {
        for id in ["c", "a", "b"] {
            store.upsert_survey(Survey::new(id, format!("data-{id}"))).await.unwrap();
        }
        let ids: Vec<String> = store.list_surveys().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"], "{name}");
    }
}

#[tokio::test]
async fn answer_requires_existing_survey() {
    for (name, store) in backends().await {
        let err = store.upsert_answer(Answer::new("a1", "resp", "missing")).await.unwrap_err();
        assert!(err.is_not_found(), "{name}: unexpected error: {err}");
        assert!(store.get_answer("a1").await.unwrap().is_none(), "{name}");
    }
}

#[tokio::test]
async fn answers_are_listed_per_survey_only() {
    for (name, store) in backends().await {
        store.upsert_survey(Survey::new("s1", "")).await.unwrap();
        store.upsert_survey(Survey::new("s2", "")).await.unwrap();
        store.upsert_answer(Answer::new("a2", "x", "s1")).await.unwrap();
        store.upsert_answer(Answer::new("a1", "y", "s1")).await.unwrap();
        store.upsert_answer(Answer::new("a3", "z", "s2")).await.unwrap();

        let s1: Vec<String> = store.list_answers_by_survey("s1").await.unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(s1, vec!["a1", "a2"], "{name}");
        let s2 = store.list_answers_by_survey("s2").await.unwrap();
        assert_eq!(s2, vec![Answer::new("a3", "z", "s2")], "{name}");
        assert!(store.list_answers_by_survey("nope").await.unwrap().is_empty(), "{name}");
    }
}

#[tokio::test]
async fn answer_upsert_replaces_data_under_same_survey() {
    for (name, store) in backends().await {
        store.upsert_survey(Survey::new("s1", "")).await.unwrap();
        store.upsert_answer(Answer::new("a1", "first", "s1")).await.unwrap();
        store.upsert_answer(Answer::new("a1", "second", "s1")).await.unwrap();
        assert_eq!(store.get_answer("a1").await.unwrap().unwrap().data, "second", "{name}");
        assert_eq!(store.list_answers_by_survey("s1").await.unwrap().len(), 1, "{name}");
    }
}

#[tokio::test]
async fn answer_id_is_global_across_surveys() {
    for (name, store) in backends().await {
        store.upsert_survey(Survey::new("s1", "")).await.unwrap();
        store.upsert_survey(Survey::new("s2", "")).await.unwrap();
        store.upsert_answer(Answer::new("a1", "mine", "s1")).await.unwrap();

        let err = store.upsert_answer(Answer::new("a1", "theirs", "s2")).await.unwrap_err();
        assert_eq!(err.http_status(), 409, "{name}");
        assert_eq!(err.code_str(), "answer_conflict", "{name}");
        // The original row is untouched
        assert_eq!(store.get_answer("a1").await.unwrap(), Some(Answer::new("a1", "mine", "s1")), "{name}");
    }
}

#[tokio::test]
async fn open_store_selects_backend_by_scheme() {
    let store = open_store("memory://").await.unwrap();
    assert!(store.list_surveys().await.unwrap().is_empty());

    let err = open_store("mysql://localhost/db").await.err().unwrap();
    assert_eq!(err.code_str(), "unsupported_database");
    let err = open_store("just-a-path").await.err().unwrap();
    assert_eq!(err.code_str(), "invalid_database_url");
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn sqlite_file_store_persists_across_reopen() {
    let path = std::env::temp_dir().join(format!("surveyd-store-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite3://{}", path.display());

    let store = open_store(&url).await.unwrap();
    store.upsert_survey(Survey::new("s1", "kept")).await.unwrap();
    store.upsert_answer(Answer::new("a1", "r", "s1")).await.unwrap();
    drop(store);

    let reopened = open_store(&url).await.unwrap();
    assert_eq!(reopened.get_survey("s1").await.unwrap().unwrap().data, "kept");
    assert_eq!(reopened.list_answers_by_survey("s1").await.unwrap().len(), 1);
    drop(reopened);
    let _ = std::fs::remove_file(&path);

    let err = open_store("sqlite3://").await.err().unwrap();
    assert_eq!(err.code_str(), "invalid_database_url");
}
