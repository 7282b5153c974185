//! SHA-256ハッシュチェーン
//!
//! 判定ログの改ざん検知のためのハッシュチェーン実装。
//! 各エントリは `SHA-256(previous_entry_hash || canonical(entry))` を持ち、
//! ジェネシスでは previous に空文字列を用いる。

use crate::common::error::{LedgerError, LedgerResult};
use crate::db::traits::LedgerStore;
use crate::ledger::canonical;
use crate::ledger::types::{ChainFault, LedgerEntry};
use futures::TryStreamExt;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{error, info};

/// エントリハッシュを計算
///
/// `hex(SHA-256(previous.unwrap_or("") || canonical_bytes))`
pub fn compute_entry_hash(previous_entry_hash: Option<&str>, canonical_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous_entry_hash.unwrap_or("").as_bytes());
    hasher.update(canonical_bytes);
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

/// 保存済みエントリのペイロードからハッシュを再計算
pub fn recompute_entry_hash(entry: &LedgerEntry) -> LedgerResult<String> {
    let bytes = canonical::encode_entry(&entry.request_data, &entry.response_data, &entry.verdict)?;
    Ok(compute_entry_hash(
        entry.previous_entry_hash.as_deref(),
        &bytes,
    ))
}

/// チェーン検証結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
    /// 完全に検証できたエントリ数
    pub entries_checked: i64,
    /// 検出された障害（正常時は`None`）
    pub fault: Option<ChainFault>,
}

impl ChainReport {
    /// チェーンが正常か
    pub fn is_valid(&self) -> bool {
        self.fault.is_none()
    }

    /// 障害を `LedgerError::Integrity` に変換
    pub fn into_result(self) -> LedgerResult<i64> {
        match self.fault {
            None => Ok(self.entries_checked),
            Some(fault) => Err(LedgerError::Integrity(fault)),
        }
    }
}

/// 1エントリずつ検証を進める状態機械
#[derive(Debug, Default)]
struct ChainWalker {
    expected_previous: Option<String>,
    checked: i64,
}

impl ChainWalker {
    fn check(&mut self, entry: &LedgerEntry) -> LedgerResult<Option<ChainFault>> {
        if self.checked == 0 {
            if entry.previous_entry_hash.is_some() {
                return Ok(Some(ChainFault::GenesisInvalid { entry_id: entry.id }));
            }
        } else if entry.previous_entry_hash != self.expected_previous {
            return Ok(Some(ChainFault::ChainLinkBroken { entry_id: entry.id }));
        }

        if recompute_entry_hash(entry)? != entry.entry_hash {
            return Ok(Some(ChainFault::TamperDetected { entry_id: entry.id }));
        }

        self.expected_previous = Some(entry.entry_hash.clone());
        self.checked += 1;
        Ok(None)
    }

    fn fail(&self, fault: ChainFault) -> ChainReport {
        error!(
            fault = fault.kind(),
            entry_id = fault.entry_id(),
            entries_checked = self.checked,
            "Ledger integrity fault detected"
        );
        ChainReport {
            entries_checked: self.checked,
            fault: Some(fault),
        }
    }
}

/// 全エントリのハッシュチェーンを検証
///
/// 挿入順にストリームで読み進め、最初の障害で停止する。台帳は変更しない。
pub async fn verify_chain(store: &dyn LedgerStore) -> LedgerResult<ChainReport> {
    let mut walker = ChainWalker::default();
    let mut entries = store.scan();

    loop {
        let entry = match entries.try_next().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            // ペイロードが復元できない行は改ざんとして扱う
            Err(LedgerError::Integrity(fault)) => {
                return Ok(walker.fail(fault));
            }
            Err(e) => return Err(e),
        };
        if let Some(fault) = walker.check(&entry)? {
            return Ok(walker.fail(fault));
        }
    }

    info!(
        entries_checked = walker.checked,
        "Ledger hash chain verified"
    );
    Ok(ChainReport {
        entries_checked: walker.checked,
        fault: None,
    })
}
