mod common;

use std::thread;

use common::{doc, id_term, memory_index, search_ids};
use pilum::prelude::*;

#[test]
fn test_reader_is_isolated_from_later_commits() {
    let (_storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();
    writer.add_document(doc("1", "a", "alpha")).unwrap();
    writer.commit().unwrap();

    let old = directory.reader();
    assert!(old.is_current());

    writer.add_document(doc("2", "b", "alpha beta")).unwrap();
    writer.delete_by_term(&id_term("1")).unwrap();
    writer.commit().unwrap();

    assert!(!old.is_current());
    assert_eq!(old.stats().live_docs, 1);
    let top = old.search_text("content", "alpha", 10).unwrap();
    assert_eq!(common::hit_ids(&old, &top), vec!["1"]);

    let fresh = old.reopen();
    assert!(fresh.is_current());
    assert_eq!(search_ids(&directory, "content", "alpha"), vec!["2"]);
}

#[test]
fn test_reader_survives_merge_of_its_segments() {
    let (storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();
    for i in 0..3 {
        writer.add_document(doc(&i.to_string(), "a", "kept text")).unwrap();
        writer.commit().unwrap();
    }

    let old = directory.reader();
    writer.merge(1).unwrap();
    writer.commit().unwrap();

    assert!(storage.file_exists("_0.post"));
    let top = old.search_text("content", "kept", 10).unwrap();
    assert_eq!(top.total_hits, 3);
    let mut ids = common::hit_ids(&old, &top);
    ids.sort();
    assert_eq!(ids, vec!["0", "1", "2"]);

    drop(old);
    assert!(!storage.file_exists("_0.post"));
    assert_eq!(directory.reader().search_text("content", "kept", 10).unwrap().total_hits, 3);
}

#[test]
fn test_readers_search_concurrently_with_writer() {
    let (_storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();
    writer.add_document(doc("0", "a", "concurrent")).unwrap();
    writer.commit().unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let directory = directory.clone();
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..50 {
                    let reader = directory.reader();
                    let hits = reader.search_text("content", "concurrent", 100).unwrap().total_hits;
                    assert_eq!(hits, reader.stats().live_docs);
                    assert!(hits >= last);
                    last = hits;
                }
            })
        })
        .collect();

    for i in 1..20 {
        writer.add_document(doc(&i.to_string(), "a", "concurrent")).unwrap();
        writer.commit().unwrap();
    }
    for handle in readers {
        handle.join().unwrap();
    }
    assert_eq!(directory.stats().live_docs, 20);
}

#[test]
fn test_ranking_and_top_k() {
    let (_storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();
    writer.add_document(doc("1", "a", "rust rust rust")).unwrap();
    writer.add_document(doc("2", "b", "rust search")).unwrap();
    writer.add_document(doc("3", "c", "search engines")).unwrap();
    writer.add_document(doc("4", "d", "rust")).unwrap();
    writer.commit().unwrap();

    let reader = directory.reader();
    let top = reader.search_text("content", "rust search", DEFAULT_TOP_K).unwrap();
    assert_eq!(top.total_hits, 4);
    // idf(rust) = ln(4/3), idf(search) = ln(2): one of each beats three "rust".
    assert_eq!(common::hit_ids(&reader, &top), vec!["2", "1", "3", "4"]);
    assert!(top.hits.windows(2).all(|w| w[0].score >= w[1].score));

    let limited = reader.search_text("content", "rust", 2).unwrap();
    assert_eq!(limited.total_hits, 3);
    assert_eq!(limited.hits.len(), 2);

    let none = reader.search_text("content", "rust", 0).unwrap();
    assert_eq!(none.total_hits, 3);
    assert!(none.hits.is_empty());

    let and = QueryParser::new("content", directory.config().analyzer.clone())
        .with_operator(Operator::And)
        .parse("rust search")
        .unwrap();
    let top = reader.search(&and, 10).unwrap();
    assert_eq!(common::hit_ids(&reader, &top), vec!["2"]);
}

#[test]
fn test_ties_order_by_doc_id() {
    let (_storage, directory) = memory_index();
    let mut writer = directory.writer().unwrap();
    for i in 0..3 {
        writer.add_document(doc(&i.to_string(), "a", "same")).unwrap();
        writer.add_document(doc(&format!("x{i}"), "a", "other")).unwrap();
        writer.commit().unwrap();
    }

    let reader = directory.reader();
    let top = reader.search_text("content", "same", 10).unwrap();
    let docs: Vec<u64> = top.hits.iter().map(|h| h.doc).collect();
    assert_eq!(docs, vec![0, 2, 4]);
    assert_eq!(common::hit_ids(&reader, &top), vec!["0", "1", "2"]);
}

#[test]
fn test_query_without_terms_is_syntax_error() {
    let (_storage, directory) = memory_index();
    let reader = directory.reader();
    for text in ["", "  ", "!!!"] {
        let err = reader.search_text("content", text, 10).unwrap_err();
        assert!(matches!(err, PilumError::QuerySyntax(_)));
    }
}

#[test]
fn test_per_field_analyzer() {
    let mut analyzer = PerFieldAnalyzer::new(std::sync::Arc::new(StandardAnalyzer::new()));
    analyzer.add_analyzer("tag", std::sync::Arc::new(KeywordAnalyzer::new()));
    let config = IndexConfig::default().with_analyzer(std::sync::Arc::new(analyzer));
    let (_storage, directory) = common::memory_index_with(config);

    let mut writer = directory.writer().unwrap();
    writer
        .add_document(
            Document::builder()
                .add_text("id", "1", FieldOptions::STORED_NOT_ANALYZED)
                .add_text("tag", "New York", FieldOptions::NOT_STORED_ANALYZED)
                .build(),
        )
        .unwrap();
    writer.commit().unwrap();

    assert_eq!(search_ids(&directory, "tag", "New York"), vec!["1"]);
    assert!(search_ids(&directory, "tag", "new").is_empty());
}
