//! 判定ログ台帳の型定義

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 許可判定
pub const VERDICT_ALLOWED: &str = "ALLOWED";
/// ブロック判定
pub const VERDICT_BLOCKED: &str = "BLOCKED";

/// 判定ラベルの最大文字数
pub const MAX_VERDICT_LEN: usize = 64;

/// 台帳エントリ（作成後は不変）
///
/// `id` と `created_at` はストアが採番・付与する値で、ハッシュ入力には含まれない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// ストア採番のID（挿入順に単調増加）
    pub id: i64,
    /// リクエストペイロード
    pub request_data: Map<String, Value>,
    /// レスポンスペイロード
    pub response_data: Map<String, Value>,
    /// 判定ラベル（ALLOWED / BLOCKED など）
    pub verdict: String,
    /// 本エントリのSHA-256ハッシュ（16進）
    pub entry_hash: String,
    /// 直前エントリのハッシュ（ジェネシスは`None`）
    pub previous_entry_hash: Option<String>,
    /// 作成日時（参考情報）
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// ジェネシスエントリか
    pub fn is_genesis(&self) -> bool {
        self.previous_entry_hash.is_none()
    }
}

/// 追記リクエスト（生産者が組み立てる論理ペイロード）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLedgerEntry {
    /// リクエストペイロード（JSONオブジェクト）
    #[serde(alias = "request_data")]
    pub request_data: Value,
    /// レスポンスペイロード（JSONオブジェクト）
    #[serde(alias = "response_data")]
    pub response_data: Value,
    /// 判定ラベル
    pub verdict: String,
}

impl NewLedgerEntry {
    /// 新しい追記リクエストを作成
    pub fn new(request_data: Value, response_data: Value, verdict: impl Into<String>) -> Self {
        Self {
            request_data,
            response_data,
            verdict: verdict.into(),
        }
    }
}

/// ハッシュ計算済み・ID未採番のエントリ（条件付き挿入の入力）
///
/// `id` と `created_at` はコミット時にストアが付与する。
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    /// リクエストペイロード
    pub request_data: Map<String, Value>,
    /// レスポンスペイロード
    pub response_data: Map<String, Value>,
    /// 判定ラベル
    pub verdict: String,
    /// 計算済みハッシュ
    pub entry_hash: String,
    /// 直前エントリのハッシュ
    pub previous_entry_hash: Option<String>,
}

/// 条件付き挿入の結果
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// コミット済み（新しい末尾）
    Committed(LedgerEntry),
    /// 読み取り後に末尾が変化していた（何も書き込まれていない）
    TailMoved,
}

/// ハッシュチェーン検証で検出された障害
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fault", rename_all = "snake_case")]
pub enum ChainFault {
    /// 先頭エントリが先行ハッシュを持っている
    GenesisInvalid {
        /// 該当エントリID
        #[serde(rename = "entryId")]
        entry_id: i64,
    },
    /// previous_entry_hash が直前エントリのハッシュと一致しない
    ChainLinkBroken {
        /// 該当エントリID
        #[serde(rename = "entryId")]
        entry_id: i64,
    },
    /// 再計算したハッシュが保存値と一致しない
    TamperDetected {
        /// 該当エントリID
        #[serde(rename = "entryId")]
        entry_id: i64,
    },
}

impl ChainFault {
    /// 障害種別の識別子
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GenesisInvalid { .. } => "genesis_invalid",
            Self::ChainLinkBroken { .. } => "chain_link_broken",
            Self::TamperDetected { .. } => "tamper_detected",
        }
    }

    /// 障害が検出されたエントリID
    pub fn entry_id(&self) -> i64 {
        match self {
            Self::GenesisInvalid { entry_id }
            | Self::ChainLinkBroken { entry_id }
            | Self::TamperDetected { entry_id } => *entry_id,
        }
    }
}

impl std::fmt::Display for ChainFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GenesisInvalid { entry_id } => {
                write!(f, "genesis entry {} has a previous hash", entry_id)
            }
            Self::ChainLinkBroken { entry_id } => {
                write!(f, "chain link broken at entry {}", entry_id)
            }
            Self::TamperDetected { entry_id } => {
                write!(f, "data tampering detected at entry {}", entry_id)
            }
        }
    }
}

/// 一覧取得フィルタ
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerFilter {
    /// 判定ラベルでフィルタ
    pub verdict: Option<String>,
    /// ページ番号（1始まり）
    pub page: Option<i64>,
    /// ページあたり件数
    pub per_page: Option<i64>,
}

/// 判定集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerdictCounts {
    /// 総エントリ数
    pub total: i64,
    /// BLOCKED判定数
    pub blocked: i64,
}
