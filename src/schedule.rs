//! Amortization engine.
//!
//! Pure functions that turn loan terms into an installment schedule, or
//! recompute interest and balances for a user-edited list of rows. Nothing
//! here fails: missing or malformed terms are read as zero and produce a
//! degenerate schedule.
//!
//! Every monetary step is rounded to cents, halves away from zero:
//!
//! - `interest = round(balance * r)`
//! - `principal = max(0, round(amount - interest))`
//! - `balance = max(0, round(balance - principal))`
//!
//! where `r` is the nominal annual rate divided by 1200.

use chrono::{Datelike as _, Days, Local, NaiveDate};
use rust_decimal::{Decimal, MathematicalOps as _};
use rust_decimal_macros::dec;

use crate::models::{Installment, Loan};
use crate::money::{self, round_cents};

/// Converts a nominal annual percentage into a monthly decimal rate.
///
/// Absent and negative rates become zero.
#[inline]
#[must_use]
pub fn monthly_rate(annual_percent: Option<Decimal>) -> Decimal {
    money::non_negative(annual_percent) / dec!(100) / dec!(12)
}

/// Level payment that repays `amount` over `periods` at monthly `rate`,
/// rounded to cents.
///
/// Uses `amount * r / (1 - (1 + r)^-n)`, or `amount / n` when the rate is
/// zero. Returns zero when `periods` is zero.
#[inline]
#[must_use]
pub fn level_payment(amount: Decimal, rate: Decimal, periods: u32) -> Decimal {
    if periods == 0 {
        return Decimal::ZERO;
    }
    let flat = amount / Decimal::from(periods);
    if rate <= Decimal::ZERO {
        return round_cents(flat);
    }
    // (1 + r)^-n; growth beyond the Decimal range discounts to zero.
    let discount = (Decimal::ONE + rate)
        .checked_powu(u64::from(periods))
        .and_then(|growth| Decimal::ONE.checked_div(growth))
        .unwrap_or(Decimal::ZERO);
    let payment = amount
        .saturating_mul(rate)
        .checked_div(Decimal::ONE - discount)
        .unwrap_or(flat);
    round_cents(payment)
}

/// Adds calendar months to a date, rolling day-of-month overflow into the
/// following month (Jan 31 + 1 month is Mar 2 in a leap year).
///
/// Saturates at [`NaiveDate::MAX`].
#[inline]
#[must_use]
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let total = i64::from(date.year()) * 12 + i64::from(date.month0()) + i64::from(months);
    let first_of_month = i32::try_from(total.div_euclid(12)).ok().and_then(|year| {
        let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;
        NaiveDate::from_ymd_opt(year, month, 1)
    });
    first_of_month
        .and_then(|first| first.checked_add_days(Days::new(u64::from(date.day0()))))
        .unwrap_or(NaiveDate::MAX)
}

/// Computes the schedule for `loan`, using today's local date when the
/// loan has no start date.
#[inline]
#[must_use]
pub fn compute_schedule(loan: &Loan) -> Vec<Installment> {
    compute_schedule_from(loan, Local::now().date_naive())
}

/// Computes the schedule for `loan`, using `today` when the loan has no
/// start date.
///
/// Produces exactly `loan.installments` rows. Row `i` is due `i` months
/// after `first_installment_date` (or `start_date`). The regular amount is
/// `installment_amount` when positive, otherwise the level payment; the
/// first and last rows take their overrides when those are positive.
#[must_use]
pub fn compute_schedule_from(loan: &Loan, today: NaiveDate) -> Vec<Installment> {
    let periods = loan.installments.unwrap_or(0);
    let principal = money::non_negative(loan.amount);
    let rate = monthly_rate(loan.interest_rate);
    let start = loan.first_installment_date.or(loan.start_date).unwrap_or(today);

    let regular = if money::is_positive(loan.installment_amount) {
        money::non_negative(loan.installment_amount)
    } else if principal > Decimal::ZERO && periods > 0 {
        level_payment(principal, rate, periods)
    } else {
        Decimal::ZERO
    };
    let first = positive_override(loan.first_installment_amount);
    let last = positive_override(loan.last_installment_amount);
    let last_offset = periods.saturating_sub(1);

    let rows = (0..periods).map(|offset| {
        let mut amount = regular;
        if offset == 0
            && let Some(value) = first
        {
            amount = value;
        }
        if offset == last_offset
            && let Some(value) = last
        {
            amount = value;
        }
        (add_months(start, offset), amount)
    });
    amortize(principal, rate, rows)
}

/// One row of a user-edited schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEdit {
    /// Position supplied by the caller.
    pub idx: u32,
    /// Due date.
    pub date: NaiveDate,
    /// Cash due; absent or negative reads as zero.
    pub amount: Option<Decimal>,
}

impl From<&Installment> for ScheduleEdit {
    #[inline]
    fn from(row: &Installment) -> Self {
        Self {
            idx: row.idx,
            date: row.date,
            amount: Some(row.amount),
        }
    }
}

/// Recomputes interest, principal and balances for user-edited rows.
///
/// The output has one row per edit, in order, numbered from 1. Row
/// amounts are taken from the edits (clamped to zero and rounded to
/// cents); `loan.installments` is ignored.
#[must_use]
pub fn compute_custom_schedule(loan: &Loan, edits: &[ScheduleEdit]) -> Vec<Installment> {
    let rows = edits
        .iter()
        .map(|edit| (edit.date, round_cents(money::non_negative(edit.amount))));
    amortize(
        money::non_negative(loan.amount),
        monthly_rate(loan.interest_rate),
        rows,
    )
}

/// Returns the override rounded to cents when it is positive.
fn positive_override(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|amount| *amount > Decimal::ZERO).map(round_cents)
}

/// Walks the outstanding balance through `(date, amount)` rows.
fn amortize<I>(principal: Decimal, rate: Decimal, rows: I) -> Vec<Installment>
where
    I: IntoIterator<Item = (NaiveDate, Decimal)>,
{
    let mut balance = principal;
    let mut idx = 0_u32;
    rows.into_iter()
        .map(|(date, amount)| {
            idx = idx.saturating_add(1);
            let pending_amount = balance;
            let interest = round_cents(balance.saturating_mul(rate));
            let principal_part = round_cents(amount - interest).max(Decimal::ZERO);
            balance = round_cents(balance - principal_part).max(Decimal::ZERO);
            Installment {
                idx,
                date,
                amount,
                interest,
                principal: principal_part,
                balance,
                pending_amount,
            }
        })
        .collect()
}
