//! サブスクリプション台帳をWebhook連携で同期するストアライブラリ
//!
//! メモリ上の一覧を唯一の表示元とし、ローカルのJSONミラーと
//! スプレッドシート連携Webhookをベストエフォートで追従させます。
//! リモートとの通信が失敗してもローカルの操作は常に完了します。
//!
//! # 使用例
//! ```no_run
//! use orano_subsc::{initialize_logging_system, load_environment_variables, SubscriptionStore};
//!
//! # async fn example() -> Result<(), orano_subsc::AppError> {
//! // .envの読み込み（開発ビルドのみ）とログ初期化を済ませてから設定を解決する
//! load_environment_variables();
//! initialize_logging_system();
//!
//! let store = SubscriptionStore::from_env()?;
//!
//! let loaded = store.load().await?;
//! println!("{}件を読み込みました", loaded.records.len());
//! println!("月額合計: {}円", store.monthly_total()?);
//! # Ok(())
//! # }
//! ```

// 機能モジュール構造
pub mod features;
pub mod shared;

// 公開インターフェース
pub use features::subscriptions::{
    calculate_monthly_total, next_renewal_date, BillingCycle, CategoryKind, DataSource,
    DeleteOutcome, DiagnosticLog, LoadOutcome, LocalMirror, MutationOutcome, NewSubscription,
    RemoteSync, SubscriptionRecord, SubscriptionStore, DEFAULT_CATEGORY,
};

pub use shared::config::environment::{
    default_mirror_path, initialize_logging_system, load_environment_variables, StoreConfig,
    WebhookEndpoints,
};

pub use shared::errors::{AppError, AppResult, ErrorSeverity};
