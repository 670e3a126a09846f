use crate::shared::config::environment::WebhookEndpoints;
use crate::shared::errors::{AppError, AppResult};
use log::{debug, info, warn};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// 全件取得レスポンスの分類結果
///
/// スプレッドシート連携Webhookの応答は形状が安定しないため、
/// フィールドを取り出す前にまず全体をこの3種別に分類する。
#[derive(Debug, Clone, PartialEq)]
pub enum RemotePayload {
    /// データなし（"Accepted"センチネル）
    NoData,
    /// 行データの一括取得
    Batch(Vec<RemoteRow>),
    /// 解釈できない形状
    Unrecognized,
}

/// 正規化済みの行（位置固定のセル列）
///
/// セルの並びは `[id, serviceName, monthlyCost, billingCycle, category,
/// createdAt, joinDate]` を前提とする。
pub type RemoteRow = Vec<Value>;

/// レスポンスボディを分類する
///
/// # 引数
/// * `body` - 全件取得エンドポイントのレスポンスボディ
///
/// # 戻り値
/// 分類結果（この関数がエラーを返すことはない）
///
/// # 分類規則
/// - 生テキストまたはJSON文字列の "Accepted" → `NoData`
/// - JSON配列 → `Batch`
/// - `data` / `values` / `records` キーの下に配列を包むオブジェクト → `Batch`
/// - すべてのキーが数値のオブジェクト → 数値キー順に並べて `Batch`
/// - それ以外 → `Unrecognized`
pub fn decode_remote_payload(body: &str) -> RemotePayload {
    let trimmed = body.trim();

    // GAS系Webhookは正常時にプレーンテキストで"Accepted"とだけ返すことがある
    if trimmed == "Accepted" {
        return RemotePayload::NoData;
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(parsed) => parsed,
        Err(_) => return RemotePayload::Unrecognized,
    };

    classify_json_payload(&value)
}

/// 解析済みJSON値を分類する
fn classify_json_payload(value: &Value) -> RemotePayload {
    match value {
        Value::String(text) if text.trim() == "Accepted" => RemotePayload::NoData,
        Value::Array(items) => RemotePayload::Batch(items.iter().map(normalize_row).collect()),
        Value::Object(map) => {
            // 配列がキーの下に包まれている形
            for key in ["data", "values", "records"] {
                if let Some(Value::Array(items)) = map.get(key) {
                    return RemotePayload::Batch(items.iter().map(normalize_row).collect());
                }
            }

            // 数値キーだけのオブジェクトは配列がシリアライズで崩れた形とみなす
            if let Some(cells) = numeric_keyed_values(map) {
                return RemotePayload::Batch(cells.iter().map(normalize_row).collect());
            }

            RemotePayload::Unrecognized
        }
        _ => RemotePayload::Unrecognized,
    }
}

/// 1行分の値をセル列に正規化する
///
/// 配列はそのままセル列として扱い、数値キーのオブジェクトはキー順に
/// 並べ直す。どちらでもない値は空のセル列になり、後段の検品で除外される。
fn normalize_row(value: &Value) -> RemoteRow {
    match value {
        Value::Array(cells) => cells.clone(),
        Value::Object(map) => numeric_keyed_values(map).unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// すべてのキーが数値のオブジェクトを数値キー順の値列に変換する
///
/// 空のオブジェクトや数値でないキーを含むオブジェクトはNoneを返す。
fn numeric_keyed_values(map: &serde_json::Map<String, Value>) -> Option<Vec<Value>> {
    if map.is_empty() {
        return None;
    }

    let mut keyed: Vec<(u64, &Value)> = Vec::with_capacity(map.len());
    for (key, value) in map {
        let index: u64 = key.parse().ok()?;
        keyed.push((index, value));
    }
    keyed.sort_by_key(|(index, _)| *index);

    Some(keyed.into_iter().map(|(_, value)| value.clone()).collect())
}

/// Webhookクライアント
///
/// スプレッドシート連携Webhookの4エンドポイントとの通信を行う。
/// リトライは行わず、1回の呼び出しにつき1回だけリクエストを送信する。
pub struct WebhookClient {
    client: Client,
    endpoints: WebhookEndpoints,
}

impl WebhookClient {
    /// 新しいWebhookクライアントを作成
    ///
    /// # 引数
    /// * `endpoints` - Webhookエンドポイント設定
    /// * `request_timeout` - リクエスト全体のタイムアウト
    ///
    /// # 戻り値
    /// Webhookクライアント、または初期化失敗時はエラー
    pub fn new(endpoints: WebhookEndpoints, request_timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTPクライアント初期化失敗: {e}")))?;

        Ok(Self { client, endpoints })
    }

    /// 全件取得リクエストを送信
    ///
    /// # 戻り値
    /// 分類済みのレスポンス、または通信失敗・エラーステータス時はエラー
    pub async fn fetch_all(&self) -> AppResult<RemotePayload> {
        info!("GETリクエスト送信: url={}", self.endpoints.fetch_url);

        let response = self
            .client
            .get(&self.endpoints.fetch_url)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalService(format!("Webhookへの接続に失敗しました: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("全件取得がエラーステータスを返しました: status={status}");
            return Err(AppError::ExternalService(format!(
                "Webhookエラー: {}",
                describe_http_status(status.as_u16())
            )));
        }

        let body = response.text().await.map_err(|e| {
            AppError::ExternalService(format!("レスポンスの読み取りに失敗しました: {e}"))
        })?;

        let payload = decode_remote_payload(&body);
        match &payload {
            RemotePayload::NoData => debug!("全件取得レスポンス: データなし（Accepted）"),
            RemotePayload::Batch(rows) => debug!("全件取得レスポンス: {}行のバッチ", rows.len()),
            RemotePayload::Unrecognized => warn!("全件取得レスポンス: 解釈できない形状"),
        }

        Ok(payload)
    }

    /// 新規登録リクエストを送信（POST）
    ///
    /// # 引数
    /// * `body` - 送信するレコード
    pub async fn create_record<B: Serialize>(&self, body: &B) -> AppResult<()> {
        info!("POSTリクエスト送信: url={}", self.endpoints.create_url);

        let response = self
            .client
            .post(&self.endpoints.create_url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalService(format!("Webhookへの接続に失敗しました: {e}"))
            })?;

        Self::ensure_success("登録", response)
    }

    /// 置換更新リクエストを送信（PUT）
    ///
    /// # 引数
    /// * `body` - 置換後のレコード全体
    pub async fn replace_record<B: Serialize>(&self, body: &B) -> AppResult<()> {
        info!("PUTリクエスト送信: url={}", self.endpoints.replace_url);

        let response = self
            .client
            .put(&self.endpoints.replace_url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalService(format!("Webhookへの接続に失敗しました: {e}"))
            })?;

        Self::ensure_success("置換", response)
    }

    /// 削除リクエストを送信（POST）
    ///
    /// # 引数
    /// * `body` - 削除対象を特定するペイロード
    pub async fn delete_record<B: Serialize>(&self, body: &B) -> AppResult<()> {
        info!("POSTリクエスト送信: url={}", self.endpoints.delete_url);

        let response = self
            .client
            .post(&self.endpoints.delete_url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalService(format!("Webhookへの接続に失敗しました: {e}"))
            })?;

        Self::ensure_success("削除", response)
    }

    /// ステータスコードが成功かどうかを確認する
    ///
    /// Webhook側はエラー時に構造化されたボディを返さないため、
    /// ステータスコードのみで判定する。
    fn ensure_success(operation: &str, response: reqwest::Response) -> AppResult<()> {
        let status = response.status();
        if status.is_success() {
            info!("{operation}リクエスト成功: status={status}");
            Ok(())
        } else {
            warn!("{operation}リクエストがエラーステータスを返しました: status={status}");
            Err(AppError::ExternalService(format!(
                "Webhookエラー: {}",
                describe_http_status(status.as_u16())
            )))
        }
    }
}

/// HTTPステータスコードを日本語の説明に変換する
fn describe_http_status(status_code: u16) -> String {
    let description = match status_code {
        400 => "リクエストの形式が正しくありません",
        401 => "認証に失敗しました",
        403 => "この操作を実行する権限がありません",
        404 => "エンドポイントが見つかりません",
        429 => "リクエストが多すぎます。しばらく待ってから再試行してください",
        500 => "サーバー内部エラーが発生しました",
        502 => "Webhookとの通信でエラーが発生しました",
        503 => "Webhookが一時的に利用できません",
        504 => "Webhookからの応答がタイムアウトしました",
        _ => "不明なエラーが発生しました",
    };

    format!("HTTP {status_code} - {description}")
}
