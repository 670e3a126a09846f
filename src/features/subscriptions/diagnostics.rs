use crate::shared::utils::get_current_jst_clock;

/// 同期処理の診断ログ
///
/// ユーザー向けの警告とは別に、同期処理の経過を時刻付きの文言として
/// 記録する。ストアの生存期間中は追記のみで、件数の上限は設けない。
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    entries: Vec<String>,
}

impl DiagnosticLog {
    /// 空の診断ログを作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// メッセージを時刻付きで追記する
    ///
    /// # 引数
    /// * `message` - 記録する文言
    pub fn append(&mut self, message: &str) {
        let entry = format!("[{}] {}", get_current_jst_clock(), message);
        log::debug!("診断ログ: {entry}");
        self.entries.push(entry);
    }

    /// 記録済みのエントリを取得する
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// 記録済みのエントリ数を取得する
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// エントリが1件もないかどうか
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
