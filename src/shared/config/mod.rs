/// 環境設定関連のモジュール
pub mod environment;

// 便利な再エクスポート
pub use environment::{
    default_mirror_path, get_environment, get_mirror_filename, initialize_logging_system,
    load_environment_variables, Environment, EnvironmentConfig, StoreConfig, WebhookEndpoints,
};
