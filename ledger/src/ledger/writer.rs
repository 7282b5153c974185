//! 台帳追記サービス
//!
//! 末尾の読み取りからハッシュ計算、条件付き挿入までを1回の追記として扱い、
//! 2つの追記が同じ先行エントリを取り合うことを防ぐ。

use crate::common::error::{CommonError, LedgerError, LedgerResult};
use crate::db::traits::LedgerStore;
use crate::ledger::canonical::CanonicalPayload;
use crate::ledger::hash_chain::compute_entry_hash;
use crate::ledger::types::{InsertOutcome, LedgerEntry, NewLedgerEntry, PendingEntry};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// 追記の並行制御方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppendMode {
    /// 条件付き挿入＋有限回リトライ
    #[default]
    Optimistic,
    /// プロセス内ゲートで末尾読み取りから挿入までを直列化
    Serialized,
}

impl FromStr for AppendMode {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optimistic" => Ok(Self::Optimistic),
            "serialized" | "serialised" => Ok(Self::Serialized),
            other => Err(CommonError::Config(format!(
                "Unknown ledger append mode: {} (expected optimistic or serialized)",
                other
            ))),
        }
    }
}

impl fmt::Display for AppendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimistic => write!(f, "optimistic"),
            Self::Serialized => write!(f, "serialized"),
        }
    }
}

/// 追記サービス設定
#[derive(Debug, Clone)]
pub struct LedgerWriterConfig {
    /// 並行制御方式。デフォルト: Optimistic
    pub mode: AppendMode,
    /// `TailMoved` 後の追加試行回数。デフォルト: 5
    pub max_retries: u32,
    /// 初回リトライ前の待機時間。デフォルト: 10ms
    pub initial_backoff: Duration,
    /// 待機時間の上限。デフォルト: 200ms
    pub max_backoff: Duration,
}

impl Default for LedgerWriterConfig {
    fn default() -> Self {
        Self {
            mode: AppendMode::default(),
            max_retries: 5,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(200),
        }
    }
}

/// 台帳追記サービス
///
/// Clone不要。`Arc<LedgerWriter>` で共有する。
pub struct LedgerWriter {
    store: Arc<dyn LedgerStore>,
    config: LedgerWriterConfig,
    gate: Mutex<()>,
}

impl LedgerWriter {
    /// 新しい追記サービスを作成
    pub fn new(store: Arc<dyn LedgerStore>, config: LedgerWriterConfig) -> Self {
        Self {
            store,
            config,
            gate: Mutex::new(()),
        }
    }

    /// 設定を取得
    pub fn config(&self) -> &LedgerWriterConfig {
        &self.config
    }

    /// エントリを追記し、採番済みのエントリを返す
    ///
    /// 検証・正準化はストアへのアクセス前に行う。失敗時は何も書き込まれない。
    pub async fn append(&self, entry: NewLedgerEntry) -> LedgerResult<LedgerEntry> {
        let payload = CanonicalPayload::from_new_entry(entry)?;

        let _guard = match self.config.mode {
            AppendMode::Serialized => Some(self.gate.lock().await),
            AppendMode::Optimistic => None,
        };

        let max_attempts = self.config.max_retries.saturating_add(1);
        let mut backoff = self.config.initial_backoff;

        for attempt in 1..=max_attempts {
            let previous = self.store.tail().await?.map(|tail| tail.entry_hash);
            let pending = chain_to(&payload, previous.as_deref());

            match self
                .store
                .insert_if_tail(&pending, previous.as_deref())
                .await?
            {
                InsertOutcome::Committed(entry) => {
                    info!(
                        entry_id = entry.id,
                        verdict = %entry.verdict,
                        entry_hash = %entry.entry_hash,
                        attempt,
                        "Ledger entry appended"
                    );
                    return Ok(entry);
                }
                InsertOutcome::TailMoved => {
                    debug!(attempt, max_attempts, "Ledger tail moved during append");
                    if attempt < max_attempts {
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(self.config.max_backoff);
                    }
                }
            }
        }

        warn!(
            attempts = max_attempts,
            "Ledger append gave up after repeated tail contention"
        );
        Err(LedgerError::ContentionExceeded {
            attempts: max_attempts,
        })
    }
}

fn chain_to(payload: &CanonicalPayload, previous: Option<&str>) -> PendingEntry {
    PendingEntry {
        request_data: payload.request_data.clone(),
        response_data: payload.response_data.clone(),
        verdict: payload.verdict.clone(),
        entry_hash: compute_entry_hash(previous, &payload.bytes),
        previous_entry_hash: previous.map(str::to_string),
    }
}
