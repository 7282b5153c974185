//! token サブコマンド
//!
//! 設定済みシークレットで署名したベアラートークンを発行します。

use crate::auth::jwt::create_jwt;
use crate::common::error::{CommonError, LedgerResult};
use crate::config::{get_access_token_expire_minutes, get_secret_key};
use clap::Args;

/// token サブコマンドの引数
#[derive(Args, Debug, Clone)]
pub struct TokenArgs {
    /// Subject (`sub` claim) of the token
    #[arg(short, long)]
    pub subject: String,

    /// Token lifetime in minutes (default: NOVA_ACCESS_TOKEN_EXPIRE_MINUTES)
    #[arg(short, long)]
    pub expire_minutes: Option<i64>,
}

/// トークンを発行する
pub fn execute(args: &TokenArgs) -> LedgerResult<String> {
    let secret = get_secret_key().ok_or_else(|| {
        CommonError::Config("NOVA_SECRET_KEY must be set to mint tokens".to_string())
    })?;
    let minutes = args
        .expire_minutes
        .unwrap_or_else(get_access_token_expire_minutes);
    create_jwt(&args.subject, &secret, minutes)
}
