use super::models::BillingCycle;
use chrono::{Months, NaiveDate};

/// 次回更新日を計算する
///
/// 加入日からサイクル幅（月額: 1ヶ月、年額: 12ヶ月）ずつ進めて、
/// 基準日より後になる最初の日付を返す。候補日は常に元の加入日からの
/// 月数加算で求めるため、31日加入が30日までの月で月末に丸められても、
/// 丸めが以降の候補日に引き継がれることはない。
///
/// # 引数
/// * `join` - 加入日
/// * `cycle` - 課金サイクル
/// * `today` - 基準日（この日より後の日付を返す）
///
/// # 戻り値
/// 次回更新日。加入日が基準日より後の場合は加入日自身を返す
pub fn next_renewal_date(join: NaiveDate, cycle: BillingCycle, today: NaiveDate) -> NaiveDate {
    let step_months: u32 = match cycle {
        BillingCycle::Monthly => 1,
        BillingCycle::Yearly => 12,
    };

    let mut cycles: u32 = 0;
    loop {
        let Some(candidate) = join.checked_add_months(Months::new(cycles * step_months)) else {
            // chronoの表現上限に達した場合
            return NaiveDate::MAX;
        };

        if candidate > today {
            return candidate;
        }

        cycles += 1;
    }
}
