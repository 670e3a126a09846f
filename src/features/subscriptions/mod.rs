/// サブスクリプション機能モジュール
///
/// このモジュールは、サブスクリプション台帳に関連するすべての機能を提供します：
/// - 一覧の読み込み（リモート取得とミラーフォールバック）
/// - サブスクリプションの登録、置換更新、2段階削除
/// - 次回更新日の計算
/// - 月額合計の計算
/// - 診断ログの蓄積
pub mod diagnostics;
pub mod models;
pub mod renewal;
pub mod repository;
pub mod service;


// 公開インターフェース
pub use diagnostics::DiagnosticLog;

pub use models::{
    calculate_monthly_total, record_from_row, BillingCycle, CategoryKind, DeleteRequest,
    NewSubscription, SubscriptionRecord, DEFAULT_CATEGORY,
};

pub use renewal::next_renewal_date;

pub use repository::LocalMirror;

pub use service::{
    DataSource, DeleteOutcome, LoadOutcome, MutationOutcome, RemoteSync, SubscriptionStore,
};
