//! SQLite上での並行追記テスト
//!
//! 複数のライターが同じ末尾を奪い合ってもチェーンが分岐しないことを確認する。

use nova_ledger::common::error::LedgerError;
use nova_ledger::db::ledger::SqliteLedgerStore;
use nova_ledger::db::migrations::initialize_database;
use nova_ledger::db::traits::LedgerStore;
use nova_ledger::ledger::{
    verify_chain, AppendMode, LedgerWriter, LedgerWriterConfig, NewLedgerEntry,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

async fn open_store(dir: &tempfile::TempDir) -> Arc<SqliteLedgerStore> {
    let url = format!("sqlite:{}", dir.path().join("ledger.db").display());
    let pool = initialize_database(&url).await.unwrap();
    Arc::new(SqliteLedgerStore::new(pool))
}

fn entry(i: usize) -> NewLedgerEntry {
    NewLedgerEntry::new(
        json!({"prompt": format!("concurrent-{}", i)}),
        json!({"reply": "ok"}),
        if i % 3 == 0 { "BLOCKED" } else { "ALLOWED" },
    )
}

async fn append_concurrently(store: Arc<SqliteLedgerStore>, config: LedgerWriterConfig) -> usize {
    let writer = Arc::new(LedgerWriter::new(store, config));
    let handles: Vec<_> = (0..24)
        .map(|i| {
            let writer = writer.clone();
            tokio::spawn(async move { writer.append(entry(i)).await })
        })
        .collect();

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(LedgerError::ContentionExceeded { .. }) => {}
            Err(e) => panic!("unexpected append error: {}", e),
        }
    }
    committed
}

async fn assert_single_chain(store: &SqliteLedgerStore, expected: usize) {
    let report = verify_chain(store).await.unwrap();
    assert!(report.is_valid(), "chain fault: {:?}", report.fault);
    assert_eq!(report.entries_checked, expected as i64);

    let filter = Default::default();
    let entries = store.list(&filter).await.unwrap();
    let previous: HashSet<_> = entries
        .iter()
        .map(|e| e.previous_entry_hash.clone())
        .collect();
    assert_eq!(previous.len(), entries.len(), "two entries share a predecessor");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn optimistic_writers_produce_a_single_chain() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let config = LedgerWriterConfig {
        mode: AppendMode::Optimistic,
        max_retries: 100,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(20),
    };

    let committed = append_concurrently(store.clone(), config).await;

    assert_eq!(committed, 24);
    assert_single_chain(&store, committed).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn serialized_writer_never_retries() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let config = LedgerWriterConfig {
        mode: AppendMode::Serialized,
        max_retries: 0,
        ..LedgerWriterConfig::default()
    };

    let committed = append_concurrently(store.clone(), config).await;

    assert_eq!(committed, 24);
    assert_single_chain(&store, committed).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_writers_on_shared_database_never_fork() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("ledger.db").display());
    let config = LedgerWriterConfig {
        mode: AppendMode::Optimistic,
        max_retries: 100,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(20),
    };

    // プールを分けて、プロセス内ゲートを共有しない2つのライターを再現する
    let mut handles = Vec::new();
    for writer_id in 0..2 {
        let pool = initialize_database(&url).await.unwrap();
        let writer = Arc::new(LedgerWriter::new(
            Arc::new(SqliteLedgerStore::new(pool)),
            config.clone(),
        ));
        for i in 0..8 {
            let writer = writer.clone();
            handles.push(tokio::spawn(async move {
                writer.append(entry(writer_id * 100 + i)).await
            }));
        }
    }

    let mut committed = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            committed += 1;
        }
    }

    let store = open_store(&dir).await;
    assert_eq!(committed, 16);
    assert_single_chain(&store, committed).await;
}

#[tokio::test]
async fn chain_continues_after_reopening_database() {
    let dir = tempfile::tempdir().unwrap();

    let first = open_store(&dir).await;
    let writer = LedgerWriter::new(first.clone(), LedgerWriterConfig::default());
    let genesis = writer.append(entry(1)).await.unwrap();
    first.pool().close().await;

    let reopened = open_store(&dir).await;
    let writer = LedgerWriter::new(reopened.clone(), LedgerWriterConfig::default());
    let next = writer.append(entry(2)).await.unwrap();

    assert_eq!(next.id, genesis.id + 1);
    assert_eq!(next.previous_entry_hash.as_deref(), Some(genesis.entry_hash.as_str()));
    assert_single_chain(&reopened, 2).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_racing_appends_extend_a_single_entry_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir).await;
    let writer = Arc::new(LedgerWriter::new(store.clone(), LedgerWriterConfig::default()));
    let seed = writer.append(entry(0)).await.unwrap();

    let a = tokio::spawn({
        let writer = writer.clone();
        async move { writer.append(entry(1)).await }
    });
    let b = tokio::spawn({
        let writer = writer.clone();
        async move { writer.append(entry(2)).await }
    });
    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();

    // どちらか一方だけがシードに連結し、もう一方はその後ろに続く
    let mut linked: Vec<_> = vec![a, b];
    linked.sort_by_key(|e| e.id);
    assert_eq!(linked[0].previous_entry_hash.as_deref(), Some(seed.entry_hash.as_str()));
    assert_eq!(
        linked[1].previous_entry_hash.as_deref(),
        Some(linked[0].entry_hash.as_str())
    );
    assert_single_chain(&store, 3).await;
}
