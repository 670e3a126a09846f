use super::models::SubscriptionRecord;
use crate::shared::errors::{AppError, AppResult};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// ローカルミラー
///
/// メモリ上の一覧の写しを1つのJSONファイルとして保持する。
/// 書き込みは常に全件の上書きで、部分更新は行わない。
pub struct LocalMirror {
    path: PathBuf,
}

impl LocalMirror {
    /// 指定パスのミラーを作成する
    ///
    /// # 引数
    /// * `path` - ミラーファイルのパス
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// ミラーファイルのパスを取得する
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// ミラーから全件を読み込む
    ///
    /// # 戻り値
    /// 保存済みの一覧。ファイルが存在しない場合はNone、
    /// 読み込み・解析に失敗した場合はエラー
    pub fn load(&self) -> AppResult<Option<Vec<SubscriptionRecord>>> {
        if !self.path.exists() {
            debug!("ミラーファイルが存在しません: {:?}", self.path);
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| AppError::storage(format!("ミラー読み込み失敗: {e}")))?;

        let records: Vec<SubscriptionRecord> = serde_json::from_str(&contents)
            .map_err(|e| AppError::storage(format!("ミラー解析失敗: {e}")))?;

        debug!(
            "ミラーから{}件を読み込みました: {:?}",
            records.len(),
            self.path
        );
        Ok(Some(records))
    }

    /// 全件をミラーへ上書き保存する
    ///
    /// # 引数
    /// * `records` - 保存する一覧全体
    ///
    /// # 戻り値
    /// 成功時はOk(())、失敗時はエラー
    pub fn save(&self, records: &[SubscriptionRecord]) -> AppResult<()> {
        self.ensure_parent_directory()?;

        let contents = serde_json::to_string_pretty(records)
            .map_err(|e| AppError::storage(format!("ミラーのシリアライズ失敗: {e}")))?;

        fs::write(&self.path, contents)
            .map_err(|e| AppError::storage(format!("ミラー書き込み失敗: {e}")))?;

        debug!(
            "ミラーへ{}件を保存しました: {:?}",
            records.len(),
            self.path
        );
        Ok(())
    }

    /// 親ディレクトリを確認・作成する
    fn ensure_parent_directory(&self) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| AppError::storage(format!("ディレクトリ作成失敗: {e}")))?;
                info!("ミラーディレクトリを作成しました: {parent:?}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::subscriptions::models::BillingCycle;
    use tempfile::TempDir;

    fn sample_records() -> Vec<SubscriptionRecord> {
        vec![
            SubscriptionRecord {
                id: "id-1".to_string(),
                service_name: "Netflix".to_string(),
                monthly_cost: 1490.0,
                billing_cycle: BillingCycle::Monthly,
                category: "アプリ".to_string(),
                created_at: "2024-01-01T00:00:00+09:00".to_string(),
                join_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 15),
                next_renewal: None,
            },
            SubscriptionRecord {
                id: "id-2".to_string(),
                service_name: "Adobe CC".to_string(),
                monthly_cost: 28776.0,
                billing_cycle: BillingCycle::Yearly,
                category: "生成".to_string(),
                created_at: "2024-02-01T00:00:00+09:00".to_string(),
                join_date: None,
                next_renewal: None,
            },
        ]
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let mirror = LocalMirror::new(temp_dir.path().join("subscriptions.json"));

        let records = sample_records();
        mirror.save(&records).unwrap();

        // 保存した内容がそのまま読み込まれることを確認
        let loaded = mirror.load().unwrap();
        assert_eq!(loaded, Some(records));
    }

    #[test]
    fn test_load_missing_file_returns_none() {
        let temp_dir = TempDir::new().unwrap();
        let mirror = LocalMirror::new(temp_dir.path().join("missing.json"));

        assert_eq!(mirror.load().unwrap(), None);
    }

    #[test]
    fn test_load_corrupted_file_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("subscriptions.json");
        std::fs::write(&path, "{ これはJSONではない").unwrap();

        let mirror = LocalMirror::new(path);
        let result = mirror.load();

        assert!(matches!(result, Err(AppError::Storage(_))));
    }

    #[test]
    fn test_save_creates_nested_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir
            .path()
            .join("nested")
            .join("deep")
            .join("subscriptions.json");

        let mirror = LocalMirror::new(path.clone());
        mirror.save(&sample_records()).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_save_overwrites_whole_file() {
        let temp_dir = TempDir::new().unwrap();
        let mirror = LocalMirror::new(temp_dir.path().join("subscriptions.json"));

        // 2件保存した後に1件で上書きすると、読み込み結果も1件になる
        mirror.save(&sample_records()).unwrap();

        let fewer = vec![sample_records().remove(0)];
        mirror.save(&fewer).unwrap();

        let loaded = mirror.load().unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "id-1");
    }

    #[test]
    fn test_save_empty_list() {
        let temp_dir = TempDir::new().unwrap();
        let mirror = LocalMirror::new(temp_dir.path().join("subscriptions.json"));

        // 空の一覧も保存でき、データなしとは区別される
        mirror.save(&[]).unwrap();

        assert_eq!(mirror.load().unwrap(), Some(Vec::new()));
    }
}
