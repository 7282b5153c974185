//! verify サブコマンド
//!
//! サーバーを介さずにデータベースのハッシュチェーン全体を検証します。

use crate::common::error::LedgerResult;
use crate::db::ledger::SqliteLedgerStore;
use crate::db::migrations::open_database_read_only;
use crate::ledger::hash_chain::{verify_chain, ChainReport};
use clap::Args;

/// 整合性障害を検出したときの終了コード
pub const EXIT_INTEGRITY_FAULT: i32 = 2;

/// verify サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Database URL of the ledger to audit
    #[arg(long, env = "NOVA_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Print the report as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

/// 検証を実行してレポートを返す
///
/// データベースは読み取り専用で開き、存在しない場合はエラーになる。
pub async fn execute(args: &VerifyArgs) -> LedgerResult<ChainReport> {
    let url = args
        .database_url
        .clone()
        .unwrap_or_else(crate::config::get_database_url);
    let pool = open_database_read_only(&url).await?;
    let store = SqliteLedgerStore::new(pool);

    let report = verify_chain(&store).await?;
    store.pool().close().await;
    Ok(report)
}

/// レポートを標準出力へ書き出し、終了コードを返す
pub fn print_report(report: &ChainReport, as_json: bool) -> LedgerResult<i32> {
    let response = crate::api::logs::VerificationResponse::from(report.clone());
    if as_json {
        let json = serde_json::to_string_pretty(&response)
            .map_err(crate::common::error::CommonError::from)?;
        println!("{}", json);
    } else {
        println!("{} ({} entries checked)", response.message, response.logs_checked);
    }
    Ok(exit_code(report))
}

/// レポートに対応する終了コード
pub fn exit_code(report: &ChainReport) -> i32 {
    if report.is_valid() {
        0
    } else {
        EXIT_INTEGRITY_FAULT
    }
}
