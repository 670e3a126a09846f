/// 共有エラー型とエラーハンドリング
pub mod errors;

/// Webhookクライアント
pub mod api_client;

/// 共有設定管理
pub mod config;

/// 共有ユーティリティ関数
pub mod utils;

// 便利な再エクスポート
pub use api_client::{decode_remote_payload, RemotePayload, RemoteRow, WebhookClient};
pub use config::{
    default_mirror_path, get_environment, get_mirror_filename, initialize_logging_system,
    load_environment_variables, Environment, EnvironmentConfig, StoreConfig, WebhookEndpoints,
};
pub use errors::{AppError, AppResult, ErrorSeverity};
