use crate::shared::errors::{AppError, AppResult};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// ライブラリの実行環境を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    /// 開発環境
    Development,
    /// プロダクション環境
    Production,
}

/// 環境変数取得エラー
#[derive(Debug, Clone)]
pub struct EnvVarError {
    /// 変数名
    pub var_name: String,
    /// エラーメッセージ
    pub message: String,
}

impl std::fmt::Display for EnvVarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "環境変数 {} が見つかりません: {}",
            self.var_name, self.message
        )
    }
}

impl std::error::Error for EnvVarError {}

/// 環境変数を取得する（優先順位: 起動時 > コンパイル時 > エラー）
///
/// # 引数
/// * `var_name` - 環境変数名
///
/// # 戻り値
/// 環境変数の値、または見つからない場合はエラー
///
/// # 取得順序
/// 1. 起動時の環境変数（`std::env::var`）
/// 2. コンパイル時の環境変数（`option_env!`マクロ）
/// 3. どちらも見つからない場合はエラー
///
/// # マクロの使用
/// この関数はマクロとして実装されており、コンパイル時に展開されます。
#[macro_export]
macro_rules! get_env_var {
    ($var_name:expr) => {{
        // 1. 起動時の環境変数を確認
        if let Ok(value) = std::env::var($var_name) {
            log::debug!("環境変数 {} を起動時の環境変数から取得しました", $var_name);
            Ok(value)
        }
        // 2. コンパイル時の環境変数を確認
        else if let Some(value) = option_env!($var_name) {
            log::debug!("環境変数 {} をコンパイル時の環境変数から取得しました", $var_name);
            Ok(value.to_string())
        }
        // 3. どちらも見つからない場合はエラー
        else {
            Err($crate::shared::config::environment::EnvVarError {
                var_name: $var_name.to_string(),
                message: format!(
                    "起動時の環境変数 {} もコンパイル時の環境変数も見つかりませんでした",
                    $var_name
                ),
            })
        }
    }};
}

/// 環境変数を取得する（オプション版）
///
/// # 引数
/// * `var_name` - 環境変数名
///
/// # 戻り値
/// 環境変数の値、または見つからない場合はNone
#[macro_export]
macro_rules! get_env_var_optional {
    ($var_name:expr) => {{
        $crate::get_env_var!($var_name).ok()
    }};
}

/// 環境変数を取得する（デフォルト値付き）
///
/// # 引数
/// * `var_name` - 環境変数名
/// * `default_value` - デフォルト値
///
/// # 戻り値
/// 環境変数の値、または見つからない場合はデフォルト値
#[macro_export]
macro_rules! get_env_var_or_default {
    ($var_name:expr, $default_value:expr) => {{
        $crate::get_env_var!($var_name).unwrap_or_else(|_| {
            log::debug!(
                "環境変数 {} が見つからないため、デフォルト値を使用します: {}",
                $var_name,
                $default_value
            );
            $default_value.to_string()
        })
    }};
}

/// 環境設定を管理する構造体
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// 実行環境
    pub environment: String,
    /// デバッグモードの有効/無効
    pub debug_mode: bool,
    /// ログレベル
    pub log_level: String,
}

impl EnvironmentConfig {
    /// 環境変数から設定を読み込む
    ///
    /// # 戻り値
    /// 環境設定
    pub fn from_env() -> Self {
        let environment = get_environment();
        let debug_mode = environment == Environment::Development;
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
            if debug_mode {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

        Self {
            environment: format!("{environment:?}").to_lowercase(),
            debug_mode,
            log_level,
        }
    }

    /// プロダクション環境かどうかを判定
    ///
    /// # 戻り値
    /// プロダクション環境の場合はtrue
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 開発環境かどうかを判定
    ///
    /// # 戻り値
    /// 開発環境の場合はtrue
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

/// 現在の実行環境を判定する
///
/// # 戻り値
/// 現在の実行環境（Development または Production）
///
/// # 判定ロジック
/// 1. 実行時環境変数 ENVIRONMENT を確認
/// 2. デバッグビルドの場合は Development
/// 3. リリースビルドの場合は Production
pub fn get_environment() -> Environment {
    // 実行時環境変数を確認
    if let Ok(env_var) = std::env::var("ENVIRONMENT") {
        let env = match env_var.as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        };
        log::debug!("環境判定: 実行時環境変数を使用 -> {env_var} -> {env:?}");
        return env;
    }

    // フォールバック: ビルド設定に基づく判定
    let env = if cfg!(debug_assertions) {
        Environment::Development
    } else {
        Environment::Production
    };
    log::debug!(
        "環境判定: ビルド設定を使用 -> debug_assertions={} -> {env:?}",
        cfg!(debug_assertions)
    );
    env
}

/// 環境に応じたミラーファイル名を取得する
///
/// # 引数
/// * `env` - 実行環境
///
/// # 戻り値
/// ミラーファイル名
///
/// # ファイル名の規則
/// - 開発環境: "dev_subscriptions.json"
/// - プロダクション環境: "subscriptions.json"
pub fn get_mirror_filename(env: Environment) -> &'static str {
    match env {
        Environment::Development => "dev_subscriptions.json",
        Environment::Production => "subscriptions.json",
    }
}

/// 環境変数の読み込みを確認する
///
/// # 処理内容
/// 1. 開発環境の場合のみ.envファイルを読み込み
/// 2. 本番ビルドでは環境変数は実行時に設定されることを前提とする
///
/// # 注意
/// - 本番環境では.envファイルは読み込まれません（秘匿情報がバイナリに埋め込まれるのを防ぐため）
/// - 本番実行時は環境変数を設定してからアプリケーションを起動してください
pub fn load_environment_variables() {
    // 開発環境かどうかを判定（デバッグビルド）
    let is_development = cfg!(debug_assertions);

    if is_development {
        // 開発環境の場合のみ.envファイルを読み込む
        match dotenv::dotenv() {
            Ok(path) => {
                eprintln!("環境ファイルを読み込みました: {}", path.display());
            }
            Err(e) => {
                eprintln!("環境ファイルの読み込みに失敗: {e}");
                eprintln!("環境変数が設定されていることを確認してください");
            }
        }
    } else {
        // 本番環境では.envファイルを読み込まない
        eprintln!("本番環境: 環境変数は実行時に設定されます");
    }
}

/// ログシステムを初期化する
///
/// # 処理内容
/// 1. 環境設定を取得
/// 2. ログレベルを設定
/// 3. env_loggerを初期化
///
/// # 注意
/// ライブラリとして複数回呼ばれても安全なように、2回目以降の呼び出しは
/// 何もせずに終了します。
pub fn initialize_logging_system() {
    // 環境設定を取得
    let env_config = EnvironmentConfig::from_env();

    // ログレベルを設定
    let log_level = match env_config.log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    // env_loggerを初期化（既に初期化済みの場合は何もしない）
    let initialized = env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .try_init()
        .is_ok();

    if initialized {
        log::info!(
            "ログシステムを初期化しました: level={}, environment={}",
            env_config.log_level,
            env_config.environment
        );
    }
}

/// デフォルトのリクエストタイムアウト（秒）
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// デフォルトの再取得遅延（ミリ秒）
pub const DEFAULT_REFETCH_DELAY_MS: u64 = 3000;

/// Webhookエンドポイント設定
///
/// スプレッドシート連携Webhookの4種類のエンドポイントURLを保持する。
/// 各URLは完全なURLとして指定する（ベースURL+パスの組み立ては行わない）。
#[derive(Debug, Clone)]
pub struct WebhookEndpoints {
    /// 全件取得用URL（GET）
    pub fetch_url: String,
    /// 新規登録用URL（POST）
    pub create_url: String,
    /// 置換更新用URL（PUT）
    pub replace_url: String,
    /// 削除用URL（POST）
    pub delete_url: String,
}

impl WebhookEndpoints {
    /// すべてのエンドポイントURLを検証する
    ///
    /// # 戻り値
    /// すべて有効な場合はOk(())、無効なURLがある場合はエラー
    ///
    /// # 検証規則
    /// - URLとして解析可能であること
    /// - スキームがhttpまたはhttpsであること
    pub fn validate(&self) -> AppResult<()> {
        let entries = [
            ("取得", &self.fetch_url),
            ("登録", &self.create_url),
            ("置換", &self.replace_url),
            ("削除", &self.delete_url),
        ];

        for (name, raw_url) in entries {
            let parsed = Url::parse(raw_url).map_err(|e| {
                AppError::configuration(format!("{name}用エンドポイントのURLが不正です: {e}"))
            })?;

            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AppError::configuration(format!(
                    "{name}用エンドポイントはhttpまたはhttpsである必要があります: {raw_url}"
                )));
            }
        }

        Ok(())
    }
}

/// ストア全体の設定を管理する構造体
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Webhookエンドポイント設定
    pub endpoints: WebhookEndpoints,
    /// ローカルミラーファイルのパス
    pub mirror_path: PathBuf,
    /// Webhookリクエストのタイムアウト
    pub request_timeout: Duration,
    /// リモート変更成功後の再取得までの遅延
    pub refetch_delay: Duration,
    /// 後続の変更があった場合に予約済み再取得をスキップするかどうか
    pub coalesce_refetch: bool,
}

impl StoreConfig {
    /// エンドポイントとミラーパスから設定を作成する（その他はデフォルト値）
    ///
    /// # 引数
    /// * `endpoints` - Webhookエンドポイント設定
    /// * `mirror_path` - ローカルミラーファイルのパス
    ///
    /// # 戻り値
    /// ストア設定
    pub fn new(endpoints: WebhookEndpoints, mirror_path: PathBuf) -> Self {
        Self {
            endpoints,
            mirror_path,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            refetch_delay: Duration::from_millis(DEFAULT_REFETCH_DELAY_MS),
            coalesce_refetch: true,
        }
    }

    /// 環境変数からストア設定を読み込む
    ///
    /// # 戻り値
    /// ストア設定、または必須の環境変数が見つからない場合はエラー
    ///
    /// # 使用する環境変数
    /// - `SUBSC_FETCH_URL` - 全件取得用URL（必須）
    /// - `SUBSC_CREATE_URL` - 新規登録用URL（必須）
    /// - `SUBSC_REPLACE_URL` - 置換更新用URL（必須）
    /// - `SUBSC_DELETE_URL` - 削除用URL（必須）
    /// - `SUBSC_MIRROR_PATH` - ミラーファイルパス（省略時はデータディレクトリ）
    /// - `SUBSC_TIMEOUT_SECONDS` - タイムアウト秒数（省略時は30秒）
    /// - `SUBSC_REFETCH_DELAY_MS` - 再取得遅延ミリ秒（省略時は3000ミリ秒）
    /// - `SUBSC_COALESCE_REFETCH` - 再取得の重複排除（省略時はtrue）
    pub fn from_env() -> AppResult<Self> {
        log::debug!("StoreConfig::from_env() - 環境変数の読み込みを開始");

        let fetch_url = crate::get_env_var!("SUBSC_FETCH_URL")
            .map_err(|e| AppError::configuration(e.to_string()))?;
        let create_url = crate::get_env_var!("SUBSC_CREATE_URL")
            .map_err(|e| AppError::configuration(e.to_string()))?;
        let replace_url = crate::get_env_var!("SUBSC_REPLACE_URL")
            .map_err(|e| AppError::configuration(e.to_string()))?;
        let delete_url = crate::get_env_var!("SUBSC_DELETE_URL")
            .map_err(|e| AppError::configuration(e.to_string()))?;

        // ミラーパス（省略時はOS標準のデータディレクトリ）
        let mirror_path = match crate::get_env_var_optional!("SUBSC_MIRROR_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_mirror_path()?,
        };

        // オプション設定（デフォルト値あり）
        let timeout_seconds: u64 = crate::get_env_var_or_default!("SUBSC_TIMEOUT_SECONDS", "30")
            .parse()
            .unwrap_or_else(|_| {
                log::warn!(
                    "SUBSC_TIMEOUT_SECONDSのパースに失敗しました。デフォルト値30秒を使用します"
                );
                DEFAULT_TIMEOUT_SECONDS
            });

        let refetch_delay_ms: u64 = crate::get_env_var_or_default!("SUBSC_REFETCH_DELAY_MS", "3000")
            .parse()
            .unwrap_or_else(|_| {
                log::warn!(
                    "SUBSC_REFETCH_DELAY_MSのパースに失敗しました。デフォルト値3000ミリ秒を使用します"
                );
                DEFAULT_REFETCH_DELAY_MS
            });

        let coalesce_refetch: bool = crate::get_env_var_or_default!("SUBSC_COALESCE_REFETCH", "true")
            .parse()
            .unwrap_or_else(|_| {
                log::warn!(
                    "SUBSC_COALESCE_REFETCHのパースに失敗しました。デフォルト値trueを使用します"
                );
                true
            });

        let config = Self {
            endpoints: WebhookEndpoints {
                fetch_url,
                create_url,
                replace_url,
                delete_url,
            },
            mirror_path,
            request_timeout: Duration::from_secs(timeout_seconds),
            refetch_delay: Duration::from_millis(refetch_delay_ms),
            coalesce_refetch,
        };

        config.validate()?;

        log::info!(
            "ストア設定を読み込みました: fetch={}, mirror={:?}, timeout={}s, refetch_delay={}ms",
            config.endpoints.fetch_url,
            config.mirror_path,
            timeout_seconds,
            refetch_delay_ms
        );

        Ok(config)
    }

    /// 設定を検証する
    ///
    /// # 戻り値
    /// 設定が有効な場合はOk(())、無効な場合はエラー
    pub fn validate(&self) -> AppResult<()> {
        self.endpoints.validate()?;

        if self.request_timeout.as_secs() == 0 {
            return Err(AppError::configuration(
                "タイムアウトは0より大きい値である必要があります",
            ));
        }

        Ok(())
    }
}

/// デフォルトのミラーファイルパスを取得する
///
/// # 戻り値
/// OS標準のデータディレクトリ配下のミラーファイルパス、
/// またはデータディレクトリが特定できない場合はエラー
///
/// # パスの規則
/// `<データディレクトリ>/orano-subsc/<環境別ファイル名>`
pub fn default_mirror_path() -> AppResult<PathBuf> {
    let base = dirs::data_dir()
        .ok_or_else(|| AppError::configuration("データディレクトリを特定できませんでした"))?;

    Ok(base
        .join("orano-subsc")
        .join(get_mirror_filename(get_environment())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_endpoints() -> WebhookEndpoints {
        WebhookEndpoints {
            fetch_url: "https://example.com/exec?action=fetch".to_string(),
            create_url: "https://example.com/exec?action=create".to_string(),
            replace_url: "https://example.com/exec?action=replace".to_string(),
            delete_url: "https://example.com/exec?action=delete".to_string(),
        }
    }

    #[test]
    fn test_environment_equality() {
        // Environment列挙型の等価性をテスト
        assert_eq!(Environment::Development, Environment::Development);
        assert_eq!(Environment::Production, Environment::Production);
        assert_ne!(Environment::Development, Environment::Production);
    }

    #[test]
    fn test_get_environment() {
        // 現在の環境を取得（実際の値はビルド設定に依存）
        let env = get_environment();

        // デバッグビルドかリリースビルドかのいずれかであることを確認
        assert!(matches!(
            env,
            Environment::Development | Environment::Production
        ));
    }

    #[test]
    fn test_get_mirror_filename() {
        assert_eq!(
            get_mirror_filename(Environment::Development),
            "dev_subscriptions.json"
        );
        assert_eq!(
            get_mirror_filename(Environment::Production),
            "subscriptions.json"
        );
    }

    #[test]
    fn test_environment_config_from_env() {
        let config = EnvironmentConfig::from_env();

        // 設定が適切に読み込まれることを確認
        assert!(config.environment == "development" || config.environment == "production");
        assert!(!config.log_level.is_empty());
    }

    #[test]
    fn test_environment_config_methods() {
        let dev_config = EnvironmentConfig {
            environment: "development".to_string(),
            debug_mode: true,
            log_level: "debug".to_string(),
        };

        let prod_config = EnvironmentConfig {
            environment: "production".to_string(),
            debug_mode: false,
            log_level: "info".to_string(),
        };

        // 開発環境の判定テスト
        assert!(dev_config.is_development());
        assert!(!dev_config.is_production());

        // プロダクション環境の判定テスト
        assert!(!prod_config.is_development());
        assert!(prod_config.is_production());
    }

    #[test]
    fn test_load_environment_variables() {
        // 環境変数読み込み関数が正常に実行されることを確認（パニックしない）
        load_environment_variables();
    }

    #[test]
    fn test_webhook_endpoints_validate() {
        // 有効なエンドポイント
        assert!(test_endpoints().validate().is_ok());

        // URLとして解析できないエンドポイント
        let mut invalid = test_endpoints();
        invalid.create_url = "not a url".to_string();
        assert!(invalid.validate().is_err());

        // http/https以外のスキーム
        let mut wrong_scheme = test_endpoints();
        wrong_scheme.delete_url = "ftp://example.com/exec".to_string();
        assert!(wrong_scheme.validate().is_err());
    }

    #[test]
    fn test_store_config_new_defaults() {
        let config = StoreConfig::new(test_endpoints(), PathBuf::from("/tmp/subscriptions.json"));

        assert_eq!(
            config.request_timeout,
            Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)
        );
        assert_eq!(
            config.refetch_delay,
            Duration::from_millis(DEFAULT_REFETCH_DELAY_MS)
        );
        assert!(config.coalesce_refetch);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_store_config_validate_zero_timeout() {
        let mut config =
            StoreConfig::new(test_endpoints(), PathBuf::from("/tmp/subscriptions.json"));
        config.request_timeout = Duration::from_secs(0);

        assert!(config.validate().is_err());
    }
}
