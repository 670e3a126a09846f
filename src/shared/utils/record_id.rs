use chrono::Utc;
use nanoid::nanoid;

/// レコードID生成に使用する文字セット（base36）
const ID_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// ランダムサフィックスの長さ
const SUFFIX_LENGTH: usize = 4;

/// サブスクリプションレコード用のIDを生成する
///
/// # 戻り値
/// ミリ秒タイムスタンプとbase36サフィックスを連結したID
/// （例: "1724567890123-x9k2"）
///
/// # 特性
/// - 文字セット: 0-9a-z と区切りのハイフン
/// - タイムスタンプ部で時系列順になり、サフィックス部で同一ミリ秒内の
///   衝突を回避する
pub fn generate_record_id() -> String {
    let millis = Utc::now().timestamp_millis();
    format!("{}-{}", millis, nanoid!(SUFFIX_LENGTH, &ID_ALPHABET))
}

/// このライブラリが生成した形式のIDかどうかを検証する
///
/// リモート側の行に由来するIDは任意の文字列を許容するため、
/// この検証はローカル生成分の形式確認にのみ使用する。
///
/// # 引数
/// * `id` - 検証するID文字列
///
/// # 戻り値
/// 生成形式に一致する場合はtrue
pub fn is_locally_generated_id(id: &str) -> bool {
    match id.split_once('-') {
        Some((millis, suffix)) => {
            !millis.is_empty()
                && millis.chars().all(|c| c.is_ascii_digit())
                && suffix.chars().count() == SUFFIX_LENGTH
                && suffix.chars().all(|c| ID_ALPHABET.contains(&c))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_record_id_format() {
        let id = generate_record_id();
        assert!(is_locally_generated_id(&id));
    }

    #[test]
    fn test_generate_record_id_uniqueness() {
        let id1 = generate_record_id();
        let id2 = generate_record_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_generate_record_id_charset() {
        let id = generate_record_id();
        // ハイフン区切り以外はbase36文字のみを含むことを確認
        assert!(id
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase() || c == '-'));
    }

    #[test]
    fn test_is_locally_generated_id() {
        // 有効な形式
        assert!(is_locally_generated_id("1724567890123-x9k2"));
        assert!(is_locally_generated_id("0-0000"));

        // 無効な形式（区切りなし）
        assert!(!is_locally_generated_id("1724567890123"));

        // 無効な形式（サフィックス長が異なる）
        assert!(!is_locally_generated_id("1724567890123-x9"));
        assert!(!is_locally_generated_id("1724567890123-x9k2a"));

        // 無効な形式（大文字や記号を含む）
        assert!(!is_locally_generated_id("1724567890123-X9K2"));
        assert!(!is_locally_generated_id("abc-x9k2"));
        assert!(!is_locally_generated_id(""));
    }
}
