//! 正準エンコーダ
//!
//! エントリの論理ペイロード（request_data / response_data / verdict）を
//! キー挿入順に依存しない固定バイト列へ直列化する。
//!
//! 出力は `json.dumps(obj, sort_keys=True)` と同一のバイト列:
//! - オブジェクトのキーを再帰的にコードポイント順でソート
//! - 区切りは `", "` と `": "`
//! - `0x20..=0x7E` 以外の文字は `\uXXXX`（小文字16進、サロゲートペア）でエスケープ
//! - 浮動小数は最短往復表現。10進指数が `[-4, 16)` なら位置表記（`1.0`）、
//!   それ以外は `1e+16` / `1e-05` 形式

use crate::common::error::{LedgerError, LedgerResult};
use crate::ledger::types::{NewLedgerEntry, MAX_VERDICT_LEN};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Value};
use std::io::{self, Write};

/// ハッシュ入力となる正準化済みペイロード
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalPayload {
    /// リクエストペイロード
    pub request_data: Map<String, Value>,
    /// レスポンスペイロード
    pub response_data: Map<String, Value>,
    /// 判定ラベル
    pub verdict: String,
    /// 正準バイト列
    pub bytes: Vec<u8>,
}

impl CanonicalPayload {
    /// 追記リクエストを検証し正準化する
    ///
    /// ストアへのアクセス前に呼ばれ、失敗は `LedgerError::Encoding` になる。
    pub fn from_new_entry(entry: NewLedgerEntry) -> LedgerResult<Self> {
        let request_data = into_object("requestData", entry.request_data)?;
        let response_data = into_object("responseData", entry.response_data)?;

        let verdict = entry.verdict;
        if verdict.trim().is_empty() {
            return Err(LedgerError::Encoding("verdict must not be empty".to_string()));
        }
        if verdict.chars().count() > MAX_VERDICT_LEN {
            return Err(LedgerError::Encoding(format!(
                "verdict exceeds {} characters",
                MAX_VERDICT_LEN
            )));
        }

        let bytes = encode_entry(&request_data, &response_data, &verdict)?;
        Ok(Self {
            request_data,
            response_data,
            verdict,
            bytes,
        })
    }
}

fn into_object(field: &str, value: Value) -> LedgerResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(LedgerError::Encoding(format!(
            "{} must be a JSON object, got {}",
            field,
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// エントリの3フィールドを正準バイト列へエンコード
pub fn encode_entry(
    request_data: &Map<String, Value>,
    response_data: &Map<String, Value>,
    verdict: &str,
) -> LedgerResult<Vec<u8>> {
    to_canonical_vec(&EntryDocument {
        request_data,
        response_data,
        verdict,
    })
}

/// 任意のJSON値を正準バイト列へエンコード
pub fn encode_value(value: &Value) -> LedgerResult<Vec<u8>> {
    to_canonical_vec(&SortedValue(value))
}

fn to_canonical_vec<T: Serialize>(value: &T) -> LedgerResult<Vec<u8>> {
    let mut out = Vec::with_capacity(256);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, CanonicalFormatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| LedgerError::Encoding(format!("Failed to encode payload: {}", e)))?;
    Ok(out)
}

/// ハッシュ対象のトップレベル文書（キーはソート済みの固定3つ）
struct EntryDocument<'a> {
    request_data: &'a Map<String, Value>,
    response_data: &'a Map<String, Value>,
    verdict: &'a str,
}

impl Serialize for EntryDocument<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("request_data", &SortedMap(self.request_data))?;
        map.serialize_entry("response_data", &SortedMap(self.response_data))?;
        map.serialize_entry("verdict", self.verdict)?;
        map.end()
    }
}

/// キーを再帰的にソートして直列化するラッパー
///
/// `serde_json` の `preserve_order` が他クレート経由で有効化されても
/// 出力が変わらないよう、Mapの内部順序には依存しない。
struct SortedValue<'a>(&'a Value);

struct SortedMap<'a>(&'a Map<String, Value>);

impl Serialize for SortedValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => SortedMap(map).serialize(serializer),
            Value::Array(items) => serializer.collect_seq(items.iter().map(SortedValue)),
            other => other.serialize(serializer),
        }
    }
}

impl Serialize for SortedMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<(&String, &Value)> = self.0.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries {
            map.serialize_entry(key, &SortedValue(value))?;
        }
        map.end()
    }
}

/// 区切り・エスケープ・浮動小数表記を固定するフォーマッタ
struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_f32<W: ?Sized + Write>(&mut self, writer: &mut W, value: f32) -> io::Result<()> {
        self.write_f64(writer, f64::from(value))
    }

    fn write_f64<W: ?Sized + Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(float_repr(value).as_bytes())
    }

    fn write_string_fragment<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        // 制御文字・引用符・バックスラッシュはserde_json側でエスケープ済み
        let mut start = 0;
        for (idx, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(fragment[start..idx].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = idx + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// 浮動小数の最短往復表現
fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if (-4..16).contains(&exponent) {
        let positional = value.to_string();
        if positional.contains('.') {
            positional
        } else {
            format!("{}.0", positional)
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}
