//! サブスクリプションストア
//!
//! メモリ上の一覧を唯一の表示元として保持し、ローカルミラーとリモートの
//! スプレッドシートをベストエフォートで追従させる。リモートとの通信が
//! 失敗してもローカルの操作は常に完了する。

use super::diagnostics::DiagnosticLog;
use super::models::{
    calculate_monthly_total, record_from_row, DeleteRequest, NewSubscription, SubscriptionRecord,
};
use super::renewal::next_renewal_date;
use super::repository::LocalMirror;
use crate::shared::api_client::{RemotePayload, WebhookClient};
use crate::shared::config::environment::StoreConfig;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::get_today_jst;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};

/// 一覧データの取得元
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// リモートから取得
    Remote,
    /// ローカルミラーへのフォールバック
    LocalMirror,
}

/// リモート反映の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSync {
    /// リモートへ反映済み
    Synced,
    /// ローカルのみ反映（ユーザー向けの理由つき）
    LocalOnly(String),
}

/// 読み込み操作の結果
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// 読み込まれた一覧
    pub records: Vec<SubscriptionRecord>,
    /// 一覧の取得元
    pub source: DataSource,
}

/// 登録・更新操作の結果
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    /// ローカルに反映されたレコード
    pub record: SubscriptionRecord,
    /// リモート反映の結果
    pub remote: RemoteSync,
}

/// 削除操作の結果
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    /// 削除されたレコード
    pub record: SubscriptionRecord,
    /// リモート反映の結果
    pub remote: RemoteSync,
}

/// ストアの内部状態
///
/// Mutexで保護し、awaitをまたがずに短い同期セクションでのみ触る。
struct StoreState {
    records: Vec<SubscriptionRecord>,
    busy: bool,
    pending_delete: Option<String>,
    refetch_epoch: u64,
    diagnostics: DiagnosticLog,
}

struct StoreShared {
    config: StoreConfig,
    client: WebhookClient,
    mirror: LocalMirror,
    state: Mutex<StoreState>,
}

/// 操作中フラグの解除を保証するガード
struct BusyGuard {
    shared: Arc<StoreShared>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.busy = false;
        }
    }
}

/// サブスクリプションストア
///
/// クローン可能なハンドルで、クローン同士は同じ状態を共有する。
#[derive(Clone)]
pub struct SubscriptionStore {
    shared: Arc<StoreShared>,
}

impl SubscriptionStore {
    /// 新しいストアを作成する
    ///
    /// # 引数
    /// * `config` - ストア設定
    ///
    /// # 戻り値
    /// 空の一覧を持つストア、または設定が不正な場合はエラー
    ///
    /// # 注意
    /// 作成直後の一覧は空。リモートまたはミラーの内容を反映するには
    /// `load`を呼び出す。
    pub fn new(config: StoreConfig) -> AppResult<Self> {
        config.validate()?;

        let client = WebhookClient::new(config.endpoints.clone(), config.request_timeout)?;
        let mirror = LocalMirror::new(config.mirror_path.clone());

        info!(
            "サブスクリプションストアを作成しました: mirror={:?}",
            config.mirror_path
        );

        Ok(Self {
            shared: Arc::new(StoreShared {
                config,
                client,
                mirror,
                state: Mutex::new(StoreState {
                    records: Vec::new(),
                    busy: false,
                    pending_delete: None,
                    refetch_epoch: 0,
                    diagnostics: DiagnosticLog::new(),
                }),
            }),
        })
    }

    /// 環境変数の設定でストアを作成する
    ///
    /// # 戻り値
    /// ストア、または設定の読み込みに失敗した場合はエラー
    pub fn from_env() -> AppResult<Self> {
        Self::new(StoreConfig::from_env()?)
    }

    /// 一覧を読み込む
    ///
    /// リモートの全件取得を試み、行データが得られればメモリとミラーを
    /// まるごと置き換える。データなし・解釈不能・通信失敗の場合は
    /// ミラーの内容へフォールバックする（その場合ミラーは書き換えない）。
    ///
    /// # 戻り値
    /// 読み込んだ一覧と取得元。ネットワーク起因の失敗はエラーにならない
    pub async fn load(&self) -> AppResult<LoadOutcome> {
        let _busy = self.begin_operation("読み込み")?;
        self.load_gated().await
    }

    /// busyガード取得済みの読み込み本体
    async fn load_gated(&self) -> AppResult<LoadOutcome> {
        match self.shared.client.fetch_all().await {
            Ok(RemotePayload::Batch(rows)) => {
                let today = get_today_jst();
                let records: Vec<SubscriptionRecord> = rows
                    .iter()
                    .filter_map(|row| record_from_row(row, today))
                    .collect();

                let dropped = rows.len() - records.len();
                if dropped > 0 {
                    debug!("検品で{dropped}行を除外しました");
                }
                info!("リモートから{}件を取得しました", records.len());

                {
                    let mut state = self.lock_state()?;
                    state.records = records.clone();
                }

                self.save_mirror_best_effort(&records);

                Ok(LoadOutcome {
                    records,
                    source: DataSource::Remote,
                })
            }
            Ok(RemotePayload::NoData) => {
                self.append_diagnostic(
                    "リモート応答がデータなし（Accepted）のためミラーを使用します",
                )?;
                self.fall_back_to_mirror()
            }
            Ok(RemotePayload::Unrecognized) => {
                self.append_diagnostic("リモート応答を解釈できないためミラーを使用します")?;
                self.fall_back_to_mirror()
            }
            Err(e) => {
                warn!("リモート取得に失敗しました: {}", e.details());
                self.append_diagnostic(&format!("リモート取得失敗: {}", e.user_message()))?;
                self.fall_back_to_mirror()
            }
        }
    }

    /// ミラーの内容で一覧を置き換える（フォールバック経路）
    fn fall_back_to_mirror(&self) -> AppResult<LoadOutcome> {
        let saved = match self.shared.mirror.load() {
            Ok(Some(records)) => records,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("ミラーの読み込みに失敗しました: {}", e.details());
                self.append_diagnostic(&format!("ミラー読み込み失敗: {}", e.user_message()))?;
                Vec::new()
            }
        };

        // ミラー保存時から日が進んでいる場合に備えて次回更新日を計算し直す
        let today = get_today_jst();
        let records: Vec<SubscriptionRecord> = saved
            .into_iter()
            .map(|mut record| {
                record.next_renewal = record
                    .join_date
                    .map(|join| next_renewal_date(join, record.billing_cycle, today));
                record
            })
            .collect();

        info!("ミラーから{}件を読み込みました", records.len());

        {
            let mut state = self.lock_state()?;
            state.records = records.clone();
        }

        Ok(LoadOutcome {
            records,
            source: DataSource::LocalMirror,
        })
    }

    /// サブスクリプションを登録する
    ///
    /// リモートへの登録はベストエフォートで、失敗してもローカルには
    /// 必ず反映される（楽観的コミット）。リモート登録に成功した場合は
    /// 遅延後の一覧再取得を予約する。
    ///
    /// # 引数
    /// * `subscription` - 登録内容
    ///
    /// # 戻り値
    /// 登録されたレコードとリモート反映の結果
    pub async fn create(&self, subscription: NewSubscription) -> AppResult<MutationOutcome> {
        subscription.validate()?;

        let _busy = self.begin_operation("登録")?;

        let record = SubscriptionRecord::from_new(&subscription, get_today_jst());
        info!(
            "サブスクリプションを登録します: name={}, cost={}",
            record.service_name, record.monthly_cost
        );

        let remote = match self.shared.client.create_record(&record).await {
            Ok(()) => RemoteSync::Synced,
            Err(e) => {
                warn!("リモート登録に失敗しました: {}", e.details());
                self.append_diagnostic(&format!("リモート登録失敗: {}", e.user_message()))?;
                RemoteSync::LocalOnly(e.user_message().to_string())
            }
        };

        let (snapshot, scheduled_epoch) = {
            let mut state = self.lock_state()?;
            state.records.push(record.clone());
            state.refetch_epoch += 1;
            (state.records.clone(), state.refetch_epoch)
        };

        self.save_mirror_best_effort(&snapshot);

        if matches!(remote, RemoteSync::Synced) {
            self.schedule_refetch(scheduled_epoch);
        }

        Ok(MutationOutcome { record, remote })
    }

    /// サブスクリプションを置換更新する
    ///
    /// 対象はIDで特定し、ID・作成日時以外のフィールドをDTOの内容で
    /// まるごと置き換える。リモートへはPUTで全体を送信するが、失敗しても
    /// ローカルには必ず反映される。
    ///
    /// # 引数
    /// * `id` - 更新対象のレコードID
    /// * `subscription` - 置換後の内容
    ///
    /// # 戻り値
    /// 更新後のレコードとリモート反映の結果。対象が見つからない場合は
    /// 何も変更せずエラー
    pub async fn update(
        &self,
        id: &str,
        subscription: NewSubscription,
    ) -> AppResult<MutationOutcome> {
        subscription.validate()?;

        let _busy = self.begin_operation("更新")?;

        // 対象の存在確認と作成日時の引き継ぎ
        let existing = {
            let mut state = self.lock_state()?;
            match state.records.iter().find(|record| record.id == id) {
                Some(record) => record.clone(),
                None => {
                    state
                        .diagnostics
                        .append(&format!("更新対象が見つかりません: id={id}"));
                    return Err(AppError::not_found(format!("ID {id} のサブスクリプション")));
                }
            }
        };

        let mut updated = SubscriptionRecord::from_new(&subscription, get_today_jst());
        updated.id = existing.id.clone();
        updated.created_at = existing.created_at.clone();

        info!(
            "サブスクリプションを更新します: id={}, name={}",
            updated.id, updated.service_name
        );

        let remote = match self.shared.client.replace_record(&updated).await {
            Ok(()) => RemoteSync::Synced,
            Err(e) => {
                warn!("リモート更新に失敗しました: {}", e.details());
                self.append_diagnostic(&format!("リモート更新失敗: {}", e.user_message()))?;
                RemoteSync::LocalOnly(e.user_message().to_string())
            }
        };

        let (snapshot, scheduled_epoch) = {
            let mut state = self.lock_state()?;
            match state.records.iter_mut().find(|record| record.id == id) {
                Some(slot) => *slot = updated.clone(),
                // 対象が消えていた場合は末尾へ追加する
                None => state.records.push(updated.clone()),
            }
            state.refetch_epoch += 1;
            (state.records.clone(), state.refetch_epoch)
        };

        self.save_mirror_best_effort(&snapshot);

        if matches!(remote, RemoteSync::Synced) {
            self.schedule_refetch(scheduled_epoch);
        }

        Ok(MutationOutcome {
            record: updated,
            remote,
        })
    }

    /// 削除を予約する（2段階削除の1段階目）
    ///
    /// 確定までは一覧に影響しない。既に別の予約がある場合は置き換える。
    ///
    /// # 引数
    /// * `id` - 削除対象のレコードID
    pub fn request_delete(&self, id: &str) -> AppResult<()> {
        let mut state = self.lock_state()?;
        state.pending_delete = Some(id.to_string());
        debug!("削除を予約しました: id={id}");
        Ok(())
    }

    /// 削除の予約を取り消す
    pub fn cancel_delete(&self) -> AppResult<()> {
        let mut state = self.lock_state()?;
        if state.pending_delete.take().is_some() {
            debug!("削除の予約を取り消しました");
        }
        Ok(())
    }

    /// 予約済みの削除対象IDを取得する
    pub fn pending_delete(&self) -> AppResult<Option<String>> {
        Ok(self.lock_state()?.pending_delete.clone())
    }

    /// 予約済みの削除を確定する（2段階削除の2段階目）
    ///
    /// 対象をメモリとミラーから先に取り除き、その後リモートへ削除を
    /// 送信する。リモートの失敗はローカルの削除を取り消さない。
    /// 削除に成功した場合は遅延後の一覧再取得を予約する。
    ///
    /// # 戻り値
    /// 削除されたレコードとリモート反映の結果。予約がない場合と対象が
    /// 一覧にない場合はエラー（どちらの場合も予約はクリアされる）
    pub async fn confirm_delete(&self) -> AppResult<DeleteOutcome> {
        let _busy = self.begin_operation("削除")?;

        let target_id = {
            let mut state = self.lock_state()?;
            state.pending_delete.take()
        };

        let Some(target_id) = target_id else {
            return Err(AppError::validation("削除対象が予約されていません"));
        };

        let (removed, snapshot, scheduled_epoch) = {
            let mut state = self.lock_state()?;
            let Some(position) = state
                .records
                .iter()
                .position(|record| record.id == target_id)
            else {
                state
                    .diagnostics
                    .append(&format!("削除対象が見つかりません: id={target_id}"));
                return Err(AppError::not_found(format!(
                    "ID {target_id} のサブスクリプション"
                )));
            };

            let removed = state.records.remove(position);
            state.refetch_epoch += 1;
            (removed, state.records.clone(), state.refetch_epoch)
        };

        info!(
            "サブスクリプションを削除しました: id={}, name={}",
            removed.id, removed.service_name
        );

        self.save_mirror_best_effort(&snapshot);

        let remote = match self
            .shared
            .client
            .delete_record(&DeleteRequest::for_record(&removed))
            .await
        {
            Ok(()) => RemoteSync::Synced,
            Err(e) => {
                warn!("リモート削除に失敗しました: {}", e.details());
                self.append_diagnostic(&format!("リモート削除失敗: {}", e.user_message()))?;
                RemoteSync::LocalOnly(e.user_message().to_string())
            }
        };

        if matches!(remote, RemoteSync::Synced) {
            self.schedule_refetch(scheduled_epoch);
        }

        Ok(DeleteOutcome {
            record: removed,
            remote,
        })
    }

    /// 現在の一覧のコピーを取得する
    pub fn records(&self) -> AppResult<Vec<SubscriptionRecord>> {
        Ok(self.lock_state()?.records.clone())
    }

    /// 現在の一覧から月額合計を計算する
    ///
    /// 年額課金のレコードは12分の1として合算する。
    pub fn monthly_total(&self) -> AppResult<f64> {
        let state = self.lock_state()?;
        Ok(calculate_monthly_total(&state.records))
    }

    /// 診断ログのコピーを取得する
    pub fn diagnostics(&self) -> AppResult<Vec<String>> {
        Ok(self.lock_state()?.diagnostics.entries().to_vec())
    }

    /// 操作が進行中かどうか
    pub fn is_busy(&self) -> AppResult<bool> {
        Ok(self.lock_state()?.busy)
    }

    /// 操作中フラグを立てる
    ///
    /// 既に別の操作が進行中の場合はエラーを返す。返されたガードが
    /// ドロップされた時点でフラグは解除される。
    fn begin_operation(&self, operation: &str) -> AppResult<BusyGuard> {
        let mut state = self.lock_state()?;

        if state.busy {
            warn!("操作が拒否されました（別の操作が進行中）: {operation}");
            return Err(AppError::concurrency(format!(
                "別の操作が進行中のため{operation}を実行できません"
            )));
        }

        state.busy = true;
        drop(state);

        Ok(BusyGuard {
            shared: Arc::clone(&self.shared),
        })
    }

    /// 内部状態のロックを取得する
    fn lock_state(&self) -> AppResult<MutexGuard<'_, StoreState>> {
        self.shared
            .state
            .lock()
            .map_err(|_| AppError::concurrency("内部状態のロックに失敗しました"))
    }

    /// 診断ログへ1件追記する
    fn append_diagnostic(&self, message: &str) -> AppResult<()> {
        let mut state = self.lock_state()?;
        state.diagnostics.append(message);
        Ok(())
    }

    /// ミラーへ全件を書き込む（失敗しても処理は継続する）
    fn save_mirror_best_effort(&self, records: &[SubscriptionRecord]) {
        if let Err(e) = self.shared.mirror.save(records) {
            warn!("ミラーの更新に失敗しました: {}", e.details());
            if let Ok(mut state) = self.shared.state.lock() {
                state
                    .diagnostics
                    .append(&format!("ミラー更新失敗: {}", e.user_message()));
            }
        }
    }

    /// 遅延付きの一覧再取得を予約する（fire-and-forget）
    ///
    /// 予約時点のエポックを記録し、発火時までに新しい変更が入っていた
    /// 場合は（coalesce_refetch有効時）後続の予約に任せてスキップする。
    /// 発火時に別の操作が進行中であれば、その回の再取得は失敗として
    /// 記録されるだけで再試行はしない。
    fn schedule_refetch(&self, scheduled_epoch: u64) {
        let store = self.clone();
        let delay = self.shared.config.refetch_delay;

        debug!(
            "一覧の再取得を予約しました: delay={:?}, epoch={scheduled_epoch}",
            delay
        );

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let superseded = match store.lock_state() {
                Ok(state) => {
                    store.shared.config.coalesce_refetch && state.refetch_epoch != scheduled_epoch
                }
                Err(_) => return,
            };

            if superseded {
                debug!("予約済み再取得をスキップします（新しい変更あり）: epoch={scheduled_epoch}");
                return;
            }

            match store.load().await {
                Ok(outcome) => debug!(
                    "予約済み再取得が完了しました: {}件, source={:?}",
                    outcome.records.len(),
                    outcome.source
                ),
                Err(e) => {
                    warn!("予約済み再取得に失敗しました: {}", e.details());
                    let _ = store.append_diagnostic(&format!("再取得失敗: {}", e.user_message()));
                }
            }
        });
    }
}
