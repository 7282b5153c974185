//! 判定ログ台帳
//!
//! ハッシュチェーンで連結された追記専用の判定ログ。

pub mod canonical;
pub mod hash_chain;
pub mod types;
pub mod writer;

pub use hash_chain::{compute_entry_hash, verify_chain, ChainReport};
pub use types::{ChainFault, LedgerEntry, NewLedgerEntry};
pub use writer::{AppendMode, LedgerWriter, LedgerWriterConfig};
