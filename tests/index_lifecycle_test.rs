mod common;

use common::{doc, id_term, memory_index, memory_index_with, search_ids};
use pilum::prelude::*;

#[test]
fn test_add_delete_scenario() {
    let (_storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();

    writer.add_document(doc("1", "Darren", "hello world")).unwrap();
    writer.add_document(doc("2", "Tony", "hello lucene")).unwrap();
    writer.commit().unwrap();

    assert_eq!(search_ids(&directory, "content", "lucene"), vec!["2"]);

    assert_eq!(writer.delete_by_term(&id_term("2")).unwrap(), 1);
    writer.commit().unwrap();

    assert!(search_ids(&directory, "content", "lucene").is_empty());
    assert_eq!(search_ids(&directory, "content", "hello"), vec!["1"]);
}

#[test]
fn test_committed_count_matches_added() {
    let (_storage, directory) = memory_index_with(IndexConfig::default().with_max_buffered_docs(7));
    let mut writer = directory.writer().unwrap();

    for i in 0..50 {
        writer
            .add_document(doc(&i.to_string(), "author", "some shared text"))
            .unwrap();
    }
    assert_eq!(directory.stats().live_docs, 0);
    writer.commit().unwrap();

    let stats = directory.stats();
    assert_eq!(stats.live_docs, 50);
    assert_eq!(stats.total_docs, 50);
    assert_eq!(stats.deleted_docs, 0);
    assert_eq!(stats.segment_count, 8);
    assert_eq!(directory.reader().search_text("content", "shared", 10).unwrap().total_hits, 50);
}

#[test]
fn test_delete_then_search_is_empty() {
    let (_storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();
    writer.add_document(doc("1", "a", "unique token")).unwrap();
    writer.commit().unwrap();

    writer.delete_by_term(&id_term("1")).unwrap();
    assert_eq!(search_ids(&directory, "content", "unique"), vec!["1"]);

    writer.commit().unwrap();
    assert!(search_ids(&directory, "content", "unique").is_empty());
    assert_eq!(directory.stats().deleted_docs, 1);
    assert_eq!(directory.stats().live_docs, 0);
}

#[test]
fn test_delete_unknown_term_is_noop() {
    let (_storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();
    writer.add_document(doc("1", "a", "text")).unwrap();
    let generation = writer.commit().unwrap();

    assert_eq!(writer.delete_by_term(&id_term("404")).unwrap(), 0);
    assert_eq!(writer.commit().unwrap(), generation);
}

#[test]
fn test_delete_applies_to_buffered_docs_added_earlier_only() {
    let (_storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();

    writer.add_document(doc("1", "first", "text")).unwrap();
    assert_eq!(writer.delete_by_term(&id_term("1")).unwrap(), 1);
    writer.add_document(doc("1", "second", "text")).unwrap();
    writer.commit().unwrap();

    let reader = directory.reader();
    let top = reader.search(&TermQuery::new("id", "1"), 10).unwrap();
    assert_eq!(top.total_hits, 1);
    let stored = reader.document(&top.hits[0]).unwrap();
    assert_eq!(stored.get_text("author"), Some("second"));
}

#[test]
fn test_update_is_atomic_on_commit() {
    let (_storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();
    writer.add_document(doc("1", "Darren", "old content")).unwrap();
    writer.commit().unwrap();

    writer
        .update_document(&id_term("1"), doc("1", "Darren", "new content"))
        .unwrap();
    assert_eq!(search_ids(&directory, "content", "old"), vec!["1"]);
    assert!(search_ids(&directory, "content", "new").is_empty());

    writer.commit().unwrap();
    assert!(search_ids(&directory, "content", "old").is_empty());
    assert_eq!(search_ids(&directory, "content", "new"), vec!["1"]);
    assert_eq!(directory.stats().live_docs, 1);
}

#[test]
fn test_invalid_update_changes_nothing() {
    let (_storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();
    writer.add_document(doc("1", "Darren", "content")).unwrap();
    writer.commit().unwrap();

    let invalid = Document::builder()
        .add_text("", "nameless", FieldOptions::STORED_ANALYZED)
        .build();
    let err = writer.update_document(&id_term("1"), invalid).unwrap_err();
    assert!(matches!(err, PilumError::InvalidDocument(_)));
    assert!(!writer.has_uncommitted_changes());
    assert_eq!(writer.pending_stats().live_docs, 1);
}

#[test]
fn test_rollback_restores_committed_stats() {
    let (storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();
    for i in 0..5 {
        writer.add_document(doc(&i.to_string(), "a", "text")).unwrap();
    }
    writer.commit().unwrap();
    let committed = directory.stats();
    let files = storage.list_files().unwrap();

    writer.add_document(doc("9", "b", "more")).unwrap();
    writer.delete_by_term(&id_term("0")).unwrap();
    assert_ne!(writer.pending_stats(), committed);
    writer.merge(1).unwrap();

    writer.rollback().unwrap();
    assert_eq!(writer.pending_stats(), committed);
    assert_eq!(directory.stats(), committed);
    assert_eq!(storage.list_files().unwrap(), files);

    assert_eq!(writer.commit().unwrap(), directory.generation());
    assert_eq!(search_ids(&directory, "id", "0"), vec!["0"]);
}

#[test]
fn test_commit_without_changes_is_idempotent() {
    let (storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();
    assert_eq!(writer.commit().unwrap(), 0);

    writer.add_document(doc("1", "a", "text")).unwrap();
    let generation = writer.commit().unwrap();
    let files = storage.list_files().unwrap();

    assert_eq!(writer.commit().unwrap(), generation);
    assert_eq!(storage.list_files().unwrap(), files);
    assert_eq!(directory.stats().segment_count, 1);
}

#[test]
fn test_second_writer_is_rejected() {
    let (_storage, directory) = memory_index();
    let writer = directory.writer().unwrap();

    let err = directory.writer().unwrap_err();
    assert!(matches!(err, PilumError::WriterLockHeld(_)));

    drop(writer);
    assert!(directory.writer().is_ok());
}

#[test]
fn test_close_commits_and_releases_lock() {
    let (_storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();
    writer.add_document(doc("1", "a", "closing time")).unwrap();
    let generation = writer.close().unwrap();

    assert_eq!(generation, 1);
    assert_eq!(search_ids(&directory, "content", "closing"), vec!["1"]);
    assert!(directory.writer().is_ok());
}

#[test]
fn test_dropped_writer_discards_pending_work() {
    let (storage, directory) = memory_index();
    {
        let mut writer = directory.writer().unwrap();
        writer.add_document(doc("1", "a", "committed")).unwrap();
        writer.commit().unwrap();
        writer.add_document(doc("2", "b", "lost")).unwrap();
        writer.merge(1).unwrap();
    }
    let files = storage.list_files().unwrap();
    assert!(files.iter().all(|f| !f.starts_with("_1") && !f.starts_with("_2")), "{files:?}");

    assert_eq!(directory.stats().live_docs, 1);
    let mut writer = directory.writer().unwrap();
    assert_eq!(writer.pending_stats().live_docs, 1);
    writer.add_document(doc("3", "c", "after")).unwrap();
    writer.commit().unwrap();
    assert_eq!(directory.stats().live_docs, 2);
}

#[test]
fn test_delete_by_query() {
    let (_storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();
    writer.add_document(doc("1", "a", "red fish")).unwrap();
    writer.add_document(doc("2", "b", "blue fish")).unwrap();
    writer.add_document(doc("3", "c", "red car")).unwrap();
    writer.commit().unwrap();

    let parser = QueryParser::new("content", directory.config().analyzer.clone())
        .with_operator(Operator::And);
    let query = parser.parse("red fish").unwrap();
    assert_eq!(writer.delete_by_query(&query).unwrap(), 1);
    assert_eq!(writer.delete_by_query(&query).unwrap(), 0);

    let nothing = TermQuery::new("content", "green");
    assert_eq!(writer.delete_by_query(&nothing).unwrap(), 0);
    writer.commit().unwrap();

    let mut ids = search_ids(&directory, "content", "red fish");
    ids.sort();
    assert_eq!(ids, vec!["2", "3"]);
}

#[test]
fn test_delete_by_query_sees_buffered_docs() {
    let (_storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();
    writer.add_document(doc("1", "a", "buffered only")).unwrap();

    let deleted = writer.delete_by_query(&TermQuery::new("content", "buffered")).unwrap();
    assert_eq!(deleted, 1);
    writer.commit().unwrap();
    assert_eq!(directory.stats().live_docs, 0);
}

#[test]
fn test_stored_fields_omit_unstored() {
    let (_storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();
    writer
        .add_document(
            Document::builder()
                .add_text("id", "1", FieldOptions::STORED_NOT_ANALYZED_NO_NORMS)
                .add_text("title", "Stored Title", FieldOptions::STORED_ANALYZED)
                .add_text("body", "hidden body text", FieldOptions::NOT_STORED_ANALYZED)
                .add_bytes("thumb", vec![0xde, 0xad])
                .build(),
        )
        .unwrap();
    writer.commit().unwrap();

    let reader = directory.reader();
    let top = reader.search_text("body", "hidden", 10).unwrap();
    let stored = reader.document(&top.hits[0]).unwrap();

    let names: Vec<&str> = stored.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["id", "title", "thumb"]);
    assert_eq!(stored.get_text("title"), Some("Stored Title"));
    assert_eq!(stored.get("thumb").unwrap().value.as_bytes(), Some(&[0xde, 0xad][..]));
    assert!(stored.get("body").is_none());
}

#[test]
fn test_invalid_document_is_rejected() {
    let (_storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();

    let neither = Document::builder()
        .add_text(
            "ghost",
            "x",
            FieldOptions {
                stored: false,
                indexed: false,
                tokenized: false,
            },
        )
        .build();
    let tokenized_only = Document::builder()
        .add_text(
            "bad",
            "x",
            FieldOptions {
                stored: true,
                indexed: false,
                tokenized: true,
            },
        )
        .build();

    for document in [neither, tokenized_only] {
        let err = writer.add_document(document).unwrap_err();
        assert!(matches!(err, PilumError::InvalidDocument(_)));
    }
    assert_eq!(writer.pending_stats().total_docs, 0);
    assert_eq!(writer.commit().unwrap(), 0);
}
