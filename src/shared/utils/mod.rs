pub mod record_id;

use chrono::{NaiveDate, Utc};
use chrono_tz::Asia::Tokyo;

/// 現在の日時をJST（日本標準時）で取得
///
/// # 戻り値
/// JST形式のRFC3339文字列
pub fn get_current_jst_timestamp() -> String {
    let now_jst = Utc::now().with_timezone(&Tokyo);
    now_jst.to_rfc3339()
}

/// 今日の日付をJST基準で取得
///
/// # 戻り値
/// JSTにおける今日の日付
pub fn get_today_jst() -> NaiveDate {
    Utc::now().with_timezone(&Tokyo).date_naive()
}

/// 現在の時刻をJST基準のHH:MM:SS形式で取得（診断ログ用）
///
/// # 戻り値
/// 時刻文字列（例: "14:03:22"）
pub fn get_current_jst_clock() -> String {
    Utc::now().with_timezone(&Tokyo).format("%H:%M:%S").to_string()
}

/// 日付文字列を寛容に解析する
///
/// スプレッドシート側のセルはYYYY-MM-DD形式の他、ISO 8601の日時文字列
/// （例: "2024-01-15T00:00:00.000Z"）で返ってくることがあるため、
/// 先頭10文字の日付部分だけでも解析を試みる。
///
/// # 引数
/// * `value` - 日付らしき文字列
///
/// # 戻り値
/// 解析できた場合は日付、できなかった場合はNone
pub fn parse_date_loose(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    trimmed
        .get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
}

/// 文字列の正規化（前後の空白を削除）
///
/// # 引数
/// * `text` - 正規化対象の文字列
///
/// # 戻り値
/// 正規化された文字列
pub fn normalize_string(text: &str) -> String {
    text.trim().to_string()
}
