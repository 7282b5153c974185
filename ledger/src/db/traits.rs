//! Repository traitパターン定義
//!
//! 台帳ストアを抽象化し、追記サービスと検証器をストア実装から切り離す。

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::common::error::LedgerResult;
use crate::ledger::types::{
    InsertOutcome, LedgerEntry, LedgerFilter, PendingEntry, VerdictCounts,
};

// ---------------------------------------------------------------------------
// LedgerStore
// ---------------------------------------------------------------------------

/// 台帳ストアのRepository trait
///
/// 実装は `insert_if_tail` を原子的に行わなければならない。
/// 末尾が `expected_tail` と一致する場合のみ挿入し、それ以外は何も書き込まずに
/// `InsertOutcome::TailMoved` を返す。
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// 最新（ID最大）のエントリを取得
    async fn tail(&self) -> LedgerResult<Option<LedgerEntry>>;

    /// IDでエントリを取得
    async fn get(&self, id: i64) -> LedgerResult<Option<LedgerEntry>>;

    /// 末尾ハッシュが `expected_tail` の場合のみエントリを挿入
    ///
    /// `expected_tail` が `None` の場合は台帳が空であることを期待する。
    async fn insert_if_tail(
        &self,
        entry: &PendingEntry,
        expected_tail: Option<&str>,
    ) -> LedgerResult<InsertOutcome>;

    /// 全エントリをID昇順でストリーム取得
    fn scan(&self) -> BoxStream<'_, LedgerResult<LedgerEntry>>;

    /// フィルタ付きでエントリ一覧を取得（新しい順）
    async fn list(&self, filter: &LedgerFilter) -> LedgerResult<Vec<LedgerEntry>>;

    /// フィルタに一致するエントリ数
    async fn count(&self, filter: &LedgerFilter) -> LedgerResult<i64>;

    /// 判定集計を取得
    async fn verdict_counts(&self) -> LedgerResult<VerdictCounts>;
}

/// ページ番号とページサイズを正規化して `(limit, offset)` を返す
pub fn page_bounds(filter: &LedgerFilter) -> (i64, i64) {
    let per_page = filter.per_page.unwrap_or(50).clamp(1, 500);
    let page = filter.page.unwrap_or(1).max(1);
    // 巨大なページ番号はオフセットを飽和させ、空のページとして扱う
    (per_page, (page - 1).saturating_mul(per_page))
}
