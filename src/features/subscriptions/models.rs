use super::renewal::next_renewal_date;
use crate::shared::api_client::RemoteRow;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::record_id::generate_record_id;
use crate::shared::utils::{get_current_jst_timestamp, normalize_string, parse_date_loose};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// デフォルトのカテゴリ名
pub const DEFAULT_CATEGORY: &str = "その他";

/// 課金サイクル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    /// 月額課金
    #[default]
    Monthly,
    /// 年額課金
    Yearly,
}

impl BillingCycle {
    /// ワイヤ形式の文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
        }
    }

    /// セル値から寛容に解析する
    ///
    /// 過去のワイヤ形式である"annual"も年額として受理し、
    /// 解釈できない値はすべて月額として扱う。
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()) {
            Some(cycle) if cycle == "yearly" || cycle == "annual" => BillingCycle::Yearly,
            _ => BillingCycle::Monthly,
        }
    }
}

/// カテゴリ分類
///
/// カテゴリ名そのものは自由な文字列として保存するため、
/// この分類は表示サポート用の派生値にすぎない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    /// アプリ
    App,
    /// ストレージ
    Storage,
    /// 生成
    Generation,
    /// その他
    Other,
}

impl CategoryKind {
    /// カテゴリ名から分類する（未知の名前はその他）
    pub fn classify(label: &str) -> Self {
        match label.trim() {
            "アプリ" => CategoryKind::App,
            "ストレージ" => CategoryKind::Storage,
            "生成" => CategoryKind::Generation,
            _ => CategoryKind::Other,
        }
    }

    /// 標準のカテゴリ名を取得する
    pub fn label(&self) -> &'static str {
        match self {
            CategoryKind::App => "アプリ",
            CategoryKind::Storage => "ストレージ",
            CategoryKind::Generation => "生成",
            CategoryKind::Other => "その他",
        }
    }
}

/// サブスクリプションレコード
///
/// ワイヤ形式・ミラー形式ともcamelCaseのJSONで表現する。
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub id: String,
    pub service_name: String, // サービス名
    pub monthly_cost: f64,    // 課金サイクルあたりの料金（年額課金なら年額）
    pub billing_cycle: BillingCycle,
    pub category: String, // カテゴリ名（未知の名前もそのまま保持する）
    pub created_at: String, // RFC3339形式（JST）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_date: Option<NaiveDate>, // 加入日
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_renewal: Option<NaiveDate>, // 次回更新日（派生値）
}

impl SubscriptionRecord {
    /// DTOから新規レコードを作成する
    ///
    /// # 引数
    /// * `dto` - 登録内容
    /// * `today` - 次回更新日計算の基準日
    ///
    /// # 戻り値
    /// ID採番・作成日時付与済みのレコード
    pub fn from_new(dto: &NewSubscription, today: NaiveDate) -> Self {
        let category = match dto.category.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => DEFAULT_CATEGORY.to_string(),
        };

        Self {
            id: generate_record_id(),
            service_name: normalize_string(&dto.service_name),
            monthly_cost: dto.monthly_cost,
            billing_cycle: dto.billing_cycle,
            category,
            created_at: get_current_jst_timestamp(),
            join_date: dto.join_date,
            next_renewal: dto
                .join_date
                .map(|join| next_renewal_date(join, dto.billing_cycle, today)),
        }
    }

    /// 表示用の月額換算額を取得する
    ///
    /// 年額課金は12で割って四捨五入する。月額課金はそのまま返す。
    pub fn monthly_equivalent(&self) -> f64 {
        match self.billing_cycle {
            BillingCycle::Monthly => self.monthly_cost,
            BillingCycle::Yearly => (self.monthly_cost / 12.0).round(),
        }
    }

    /// カテゴリ分類を取得する
    pub fn category_kind(&self) -> CategoryKind {
        CategoryKind::classify(&self.category)
    }
}

/// サブスクリプション登録・更新用DTO
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubscription {
    pub service_name: String,
    pub monthly_cost: f64,
    #[serde(default)]
    pub billing_cycle: BillingCycle,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub join_date: Option<NaiveDate>,
}

impl NewSubscription {
    /// 登録内容を検証する
    ///
    /// # 戻り値
    /// 有効な場合はOk(())、無効な場合はエラー
    ///
    /// # バリデーション規則
    /// - サービス名が空白のみでないこと
    /// - 料金が有限かつ0以上の数値であること
    pub fn validate(&self) -> AppResult<()> {
        if self.service_name.trim().is_empty() {
            return Err(AppError::validation("サービス名と料金は必須です"));
        }

        if !self.monthly_cost.is_finite() || self.monthly_cost < 0.0 {
            return Err(AppError::validation(
                "料金は0以上の数値で入力してください",
            ));
        }

        Ok(())
    }
}

/// 削除リクエストのペイロード
///
/// リモート側の削除対象はIDではなく、サービス名と料金の値一致で特定する。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest<'a> {
    pub service_name: &'a str,
    pub monthly_cost: f64,
    pub action: &'static str,
}

impl<'a> DeleteRequest<'a> {
    /// レコードに対する削除リクエストを作成する
    pub fn for_record(record: &'a SubscriptionRecord) -> Self {
        Self {
            service_name: &record.service_name,
            monthly_cost: record.monthly_cost,
            action: "delete",
        }
    }
}

/// リモート行からレコードを復元する
///
/// セルの並びは `[id, serviceName, monthlyCost, billingCycle, category,
/// createdAt, joinDate]` を前提とする。
///
/// # 引数
/// * `row` - 正規化済みのセル列
/// * `today` - 次回更新日計算の基準日
///
/// # 戻り値
/// 復元されたレコード、または検品で除外された場合はNone
///
/// # 検品規則
/// - サービス名が空の行は除外
/// - 料金が解析できない場合は0として扱い、0以下の行は除外
/// - IDが空の場合はローカルで採番し直す
pub fn record_from_row(row: &RemoteRow, today: NaiveDate) -> Option<SubscriptionRecord> {
    let service_name = normalize_string(&cell_string(row.get(1))?);
    if service_name.is_empty() {
        return None;
    }

    let monthly_cost = cell_number(row.get(2)).unwrap_or(0.0);
    if monthly_cost <= 0.0 {
        return None;
    }

    let id = match cell_string(row.get(0)).map(|value| normalize_string(&value)) {
        Some(value) if !value.is_empty() => value,
        _ => generate_record_id(),
    };

    let billing_cycle = BillingCycle::parse_lenient(cell_string(row.get(3)).as_deref());

    let category = match cell_string(row.get(4)).map(|value| normalize_string(&value)) {
        Some(value) if !value.is_empty() => value,
        _ => DEFAULT_CATEGORY.to_string(),
    };

    let created_at = match cell_string(row.get(5)) {
        Some(value) if !value.trim().is_empty() => value,
        _ => get_current_jst_timestamp(),
    };

    let join_date = cell_string(row.get(6))
        .as_deref()
        .and_then(parse_date_loose);

    Some(SubscriptionRecord {
        id,
        service_name,
        monthly_cost,
        billing_cycle,
        category,
        created_at,
        join_date,
        next_renewal: join_date.map(|join| next_renewal_date(join, billing_cycle, today)),
    })
}

/// 月額合計を計算する
///
/// 年額課金のレコードは12分の1として合算する。合算時の丸めは行わない。
///
/// # 引数
/// * `records` - 対象のレコード一覧
///
/// # 戻り値
/// 月額換算の合計
pub fn calculate_monthly_total(records: &[SubscriptionRecord]) -> f64 {
    records.iter().fold(0.0, |acc, record| {
        let monthly_amount = match record.billing_cycle {
            BillingCycle::Monthly => record.monthly_cost,
            BillingCycle::Yearly => record.monthly_cost / 12.0,
        };
        acc + monthly_amount
    })
}

/// セル値を文字列として取り出す
///
/// 数値セルは文字列化して扱う（ID列が数値で返ってくる場合がある）。
fn cell_string(cell: Option<&Value>) -> Option<String> {
    match cell? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// セル値を数値として取り出す
///
/// 数値文字列（"1490"など）も受理する。f64の文字列解析が受理する
/// "NaN"や"inf"のような有限でない表記は解析失敗として扱う。
fn cell_number(cell: Option<&Value>) -> Option<f64> {
    match cell? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|value| value.is_finite()),
        _ => None,
    }
}
