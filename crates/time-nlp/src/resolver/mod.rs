//! Resolution of one matched span into a concrete instant.
//!
//! [`resolve`] is a pure function of the span, the time base, the context
//! left by the previous span, and the future-bias flag. Callers fold it
//! over the spans of a parse, feeding each returned [`ResolutionContext`]
//! into the next call; that is how `周6下午3点到5点` binds `5点` to the
//! same Saturday afternoon.
//!
//! Unset fields are filled, in priority order, from the context and then
//! from the time base. A span that yields no fields, or fields that do not
//! name a real instant (`2月30日`), resolves to [`Resolution::Unresolved`].

mod grammar;
mod point;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDateTime, TimeZone};
use serde::Serialize;

use crate::matcher::{RawSpan, SpanRole};
use crate::timebase::{last_day_of_month, TimeBase};

pub use point::{Granularity, TimePoint};

/// Epoch milliseconds historically used to mark an unresolved expression:
/// `1970-01-01T00:00:00` read at UTC+8.
pub const LEGACY_SENTINEL_MILLIS: i64 = -28_800_000;

/// The outcome of resolving one span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "time", rename_all = "snake_case")]
pub enum Resolution {
    Resolved(NaiveDateTime),
    Unresolved,
}

/// How an expression relates to its neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionKind {
    /// A single point in time.
    Point,
    /// The opening end of `A到B`.
    RangeStart,
    /// The closing end of `A到B`.
    RangeEnd,
}

impl From<SpanRole> for ExpressionKind {
    fn from(role: SpanRole) -> Self {
        match role {
            SpanRole::Single => ExpressionKind::Point,
            SpanRole::RangeStart => ExpressionKind::RangeStart,
            SpanRole::RangeEnd => ExpressionKind::RangeEnd,
        }
    }
}

/// A recognized time expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedExpression {
    /// The matched text, as it appears in the cleaned input.
    pub text: String,
    /// Byte offsets into the cleaned input.
    pub start: usize,
    pub end: usize,
    pub resolution: Resolution,
    pub kind: ExpressionKind,
    /// The finest calendar field the text itself specified.
    pub granularity: Option<Granularity>,
    /// No hour, minute or second was specified.
    pub all_day: bool,
    /// Calendar fields after context and time-base filling.
    pub fields: TimePoint,
}

impl ResolvedExpression {
    pub fn time(&self) -> Option<NaiveDateTime> {
        match self.resolution {
            Resolution::Resolved(dt) => Some(dt),
            Resolution::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.resolution, Resolution::Resolved(_))
    }

    /// Read the local instant at a fixed UTC offset.
    pub fn at_offset(&self, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
        self.time()
            .and_then(|dt| offset.from_local_datetime(&dt).single())
    }

    /// Epoch milliseconds at a fixed UTC offset, with unresolved
    /// expressions reported as [`LEGACY_SENTINEL_MILLIS`].
    pub fn epoch_millis(&self, offset: FixedOffset) -> i64 {
        self.at_offset(offset)
            .map_or(LEGACY_SENTINEL_MILLIS, |dt| dt.timestamp_millis())
    }
}

/// Fields fixed by the previously resolved span of the same parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionContext {
    pub fields: TimePoint,
}

/// Resolve one span against a time base and the preceding context.
///
/// Returns the expression and the context to hand to the next span. An
/// unresolved span hands on an empty context.
///
/// # Examples
///
/// ```
/// use time_nlp::matcher::RawSpan;
/// use time_nlp::resolver::{resolve, ResolutionContext};
/// use time_nlp::TimeBase;
///
/// let base = TimeBase::parse("2016-05-04-10-00-00").unwrap();
/// let span = |text: &str| RawSpan { text: text.into(), start: 0, end: text.len(), role: Default::default() };
///
/// let (first, ctx) = resolve(&span("周6下午3点"), &base, &ResolutionContext::default(), true);
/// let (second, _) = resolve(&span("5点"), &base, &ctx, true);
/// assert_eq!(first.time().unwrap().to_string(), "2016-05-07 15:00:00");
/// assert_eq!(second.time().unwrap().to_string(), "2016-05-07 17:00:00");
/// ```
pub fn resolve(
    span: &RawSpan,
    time_base: &TimeBase,
    context: &ResolutionContext,
    prefer_future: bool,
) -> (ResolvedExpression, ResolutionContext) {
    let base = time_base.datetime();
    let extraction = grammar::extract(&span.text, &base);
    let mut point = extraction.point;
    let granularity = point.finest();
    let all_day = point.is_all_day();

    if let (Some(coarsest), Some(finest)) = (point.coarsest(), granularity) {
        if coarsest != Granularity::Year {
            if context.fields.any_above(coarsest) {
                point.fill_above(coarsest, &context.fields);
                if coarsest == Granularity::Hour && extraction.day_part.is_none() {
                    inherit_afternoon(&mut point, &context.fields);
                }
            } else if prefer_future {
                prefer_future_period(&mut point, coarsest, finest, &base);
            }
        }
        if extraction.floating_weekday && prefer_future {
            prefer_future_week(&mut point, finest, &base);
        }
        point.fill_above(finest, &TimePoint::from_datetime(&base));
    }

    let resolution = point
        .to_datetime()
        .map_or(Resolution::Unresolved, Resolution::Resolved);

    let expr = ResolvedExpression {
        text: span.text.clone(),
        start: span.start,
        end: span.end,
        resolution,
        kind: span.role.into(),
        granularity,
        all_day,
        fields: point,
    };

    let next = match resolution {
        Resolution::Resolved(_) => ResolutionContext { fields: point },
        Resolution::Unresolved => {
            tracing::debug!(text = %span.text, "span did not resolve to an instant");
            ResolutionContext::default()
        }
    };
    tracing::trace!(text = %span.text, ?resolution, "resolved span");
    (expr, next)
}

/// Move the time base forward to the fields a resolved expression fixed.
/// Unresolved expressions leave the base untouched.
pub fn advance_time_base(time_base: &TimeBase, expr: &ResolvedExpression) -> TimeBase {
    if expr.is_resolved() {
        time_base.overlay(&expr.fields)
    } else {
        *time_base
    }
}

/// `下午3点到5点`: a bare morning-range hour following an afternoon one.
fn inherit_afternoon(point: &mut TimePoint, context: &TimePoint) {
    if let (Some(h), Some(ctx_h)) = (point.hour(), context.hour()) {
        if h < 12 && ctx_h >= 12 {
            point.set_hour(h + 12);
        }
    }
}

/// Fill the fields above `coarsest` from the time base, moving one period
/// later when that would land at or before the base at `finest` precision.
fn prefer_future_period(
    point: &mut TimePoint,
    coarsest: Granularity,
    finest: Granularity,
    base: &NaiveDateTime,
) {
    if !matches!(
        coarsest,
        Granularity::Month | Granularity::Day | Granularity::Hour
    ) {
        return;
    }

    let mut candidate = *point;
    candidate.fill_above(coarsest, &TimePoint::from_datetime(base));
    let threshold = finest.truncate(base);
    if candidate.to_datetime().is_some_and(|dt| dt > threshold) {
        return;
    }

    match coarsest {
        Granularity::Month => {
            if let Some(y) = next_year_with_date(point, base.year()) {
                point.set_year(y);
            }
        }
        Granularity::Day => {
            let Some(day) = point.day() else { return };
            if let Some((y, m)) = next_month_with_day(base, day) {
                point.set_year(y);
                point.set_month(m);
            }
        }
        Granularity::Hour => {
            if let Some(next) = base.date().succ_opt() {
                point.set_date(next);
            }
        }
        _ => {}
    }
}

/// The first year after `year` in which the point's month and day exist.
fn next_year_with_date(point: &TimePoint, year: i32) -> Option<i32> {
    (1..=8).filter_map(|n| year.checked_add(n)).find(|y| {
        let mut candidate = *point;
        candidate.set_year(*y);
        candidate.to_datetime().is_some()
    })
}

/// The first month after the base's month that has `day` in it.
fn next_month_with_day(base: &NaiveDateTime, day: u32) -> Option<(i32, u32)> {
    let (mut y, mut m) = (base.year(), base.month());
    for _ in 0..12 {
        if m == 12 {
            y += 1;
            m = 1;
        } else {
            m += 1;
        }
        if last_day_of_month(y, m)? >= day {
            return Some((y, m));
        }
    }
    None
}

/// A bare weekday at or before the base, at `finest` precision, means
/// next week's.
fn prefer_future_week(point: &mut TimePoint, finest: Granularity, base: &NaiveDateTime) {
    let Some(candidate) = point.to_datetime() else {
        return;
    };
    if candidate <= finest.truncate(base) {
        if let Some(next) = candidate.date().checked_add_signed(Duration::weeks(1)) {
            point.set_date(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tb(s: &str) -> TimeBase {
        TimeBase::parse(s).unwrap()
    }

    fn span(text: &str) -> RawSpan {
        RawSpan {
            text: text.to_string(),
            start: 0,
            end: text.len(),
            role: SpanRole::Single,
        }
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn resolve_alone(text: &str, base: &str, prefer_future: bool) -> ResolvedExpression {
        resolve(&span(text), &tb(base), &ResolutionContext::default(), prefer_future).0
    }

    #[test]
    fn test_fully_specified_expression() {
        for prefer_future in [true, false] {
            let e = resolve_alone("2016年5月4日下午3点", "2020-01-01-00-00-00", prefer_future);
            assert_eq!(e.time(), Some(at(2016, 5, 4, 15, 0, 0)));
            assert_eq!(e.kind, ExpressionKind::Point);
            assert_eq!(e.granularity, Some(Granularity::Hour));
            assert!(!e.all_day);
        }
    }

    #[test]
    fn test_no_fields_is_unresolved() {
        let (e, ctx) = resolve(
            &span("开会"),
            &tb("2016-05-04-10-00-00"),
            &ResolutionContext::default(),
            true,
        );
        assert_eq!(e.resolution, Resolution::Unresolved);
        assert_eq!(e.granularity, None);
        assert!(ctx.fields.is_empty());
    }

    #[test]
    fn test_impossible_date_is_unresolved() {
        let e = resolve_alone("2026年2月30日", "2016-05-04-10-00-00", true);
        assert_eq!(e.resolution, Resolution::Unresolved);
    }

    #[test]
    fn test_hour_before_base_moves_to_tomorrow() {
        let e = resolve_alone("3点", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2016, 5, 5, 3, 0, 0)));
    }

    #[test]
    fn test_hour_equal_to_base_moves_to_tomorrow() {
        let e = resolve_alone("10点", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2016, 5, 5, 10, 0, 0)));
    }

    #[test]
    fn test_later_minute_in_same_hour_stays_today() {
        let e = resolve_alone("10点30", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2016, 5, 4, 10, 30, 0)));
    }

    #[test]
    fn test_hour_after_base_stays_today() {
        let e = resolve_alone("下午3点", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2016, 5, 4, 15, 0, 0)));
    }

    #[test]
    fn test_without_future_bias_hour_stays_today() {
        let e = resolve_alone("3点", "2016-05-04-10-00-00", false);
        assert_eq!(e.time(), Some(at(2016, 5, 4, 3, 0, 0)));
    }

    #[test]
    fn test_day_of_month_rolls_to_next_month() {
        let e = resolve_alone("3号", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2016, 6, 3, 0, 0, 0)));
        let e = resolve_alone("3号", "2016-05-04-10-00-00", false);
        assert_eq!(e.time(), Some(at(2016, 5, 3, 0, 0, 0)));
    }

    #[test]
    fn test_day_of_month_skips_short_months() {
        let e = resolve_alone("31号", "2016-01-31-10-00-00", true);
        assert_eq!(e.time(), Some(at(2016, 3, 31, 0, 0, 0)));
    }

    #[test]
    fn test_month_rolls_to_next_year() {
        let e = resolve_alone("5月", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2017, 5, 1, 0, 0, 0)));
        assert_eq!(e.granularity, Some(Granularity::Month));
        let e = resolve_alone("6月", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2016, 6, 1, 0, 0, 0)));
    }

    #[test]
    fn test_leap_day_rolls_to_next_leap_year() {
        let e = resolve_alone("2月29日", "2016-03-01-10-00-00", true);
        assert_eq!(e.time(), Some(at(2020, 2, 29, 0, 0, 0)));
        let e = resolve_alone("2月29日", "2017-01-10-10-00-00", true);
        assert_eq!(e.time(), Some(at(2020, 2, 29, 0, 0, 0)));
        let e = resolve_alone("2月29日", "2016-03-01-10-00-00", false);
        assert_eq!(e.time(), Some(at(2016, 2, 29, 0, 0, 0)));
        let e = resolve_alone("2月30日", "2016-03-01-10-00-00", true);
        assert_eq!(e.resolution, Resolution::Unresolved);
    }

    #[test]
    fn test_holiday_rolls_to_next_year() {
        let e = resolve_alone("元旦", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2017, 1, 1, 0, 0, 0)));
        let e = resolve_alone("国庆节", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2016, 10, 1, 0, 0, 0)));
    }

    #[test]
    fn test_bare_weekday_future_bias() {
        // 2016-05-04 is a Wednesday.
        let e = resolve_alone("周1", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2016, 5, 9, 0, 0, 0)));
        let e = resolve_alone("周1", "2016-05-04-10-00-00", false);
        assert_eq!(e.time(), Some(at(2016, 5, 2, 0, 0, 0)));
        let e = resolve_alone("周5", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2016, 5, 6, 0, 0, 0)));
    }

    #[test]
    fn test_todays_weekday_compares_against_base_time() {
        let e = resolve_alone("周3", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2016, 5, 11, 0, 0, 0)));
        let e = resolve_alone("周3上午9点", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2016, 5, 11, 9, 0, 0)));
        let e = resolve_alone("周3下午3点", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2016, 5, 4, 15, 0, 0)));
        let e = resolve_alone("周3", "2016-05-04-10-00-00", false);
        assert_eq!(e.time(), Some(at(2016, 5, 4, 0, 0, 0)));
    }

    #[test]
    fn test_week_arithmetic_at_calendar_limits() {
        let ctx = ResolutionContext::default();
        for base in [NaiveDateTime::MIN, NaiveDateTime::MAX] {
            let base = TimeBase::from(base);
            for text in ["下下周7", "上上周1", "周3", "大后天"] {
                let _ = resolve(&span(text), &base, &ctx, true);
            }
        }
    }

    #[test]
    fn test_prefixed_weekday_is_not_ambiguous() {
        let e = resolve_alone("这周1", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2016, 5, 2, 0, 0, 0)));
    }

    #[test]
    fn test_context_binds_bare_hour_to_previous_day() {
        let base = tb("2016-05-04-10-00-00");
        let (first, ctx) = resolve(&span("周63点"), &base, &ResolutionContext::default(), true);
        let (second, _) = resolve(&span("5点"), &base, &ctx, true);
        assert_eq!(first.time(), Some(at(2016, 5, 7, 3, 0, 0)));
        assert_eq!(second.time(), Some(at(2016, 5, 7, 5, 0, 0)));
    }

    #[test]
    fn test_context_carries_afternoon() {
        let base = tb("2016-05-04-10-00-00");
        let (_, ctx) = resolve(&span("明天下午3点"), &base, &ResolutionContext::default(), true);
        let (second, _) = resolve(&span("5点"), &base, &ctx, true);
        assert_eq!(second.time(), Some(at(2016, 5, 5, 17, 0, 0)));
    }

    #[test]
    fn test_context_takes_priority_over_future_bias() {
        let base = tb("2016-05-04-10-00-00");
        let (_, ctx) = resolve(&span("2016年5月4日"), &base, &ResolutionContext::default(), true);
        let (second, _) = resolve(&span("3点"), &base, &ctx, true);
        assert_eq!(second.time(), Some(at(2016, 5, 4, 3, 0, 0)));
    }

    #[test]
    fn test_unresolved_span_clears_context() {
        let base = tb("2016-05-04-10-00-00");
        let (_, ctx) = resolve(&span("周63点"), &base, &ResolutionContext::default(), true);
        let (_, ctx) = resolve(&span("开会"), &base, &ctx, true);
        assert_eq!(ctx, ResolutionContext::default());
    }

    #[test]
    fn test_relative_expressions() {
        let e = resolve_alone("明天", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2016, 5, 5, 0, 0, 0)));
        assert!(e.all_day);
        let e = resolve_alone("3天后", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2016, 5, 7, 0, 0, 0)));
        let e = resolve_alone("30分钟后", "2016-05-04-10-00-00", true);
        assert_eq!(e.time(), Some(at(2016, 5, 4, 10, 30, 0)));
    }

    #[test]
    fn test_kind_follows_span_role() {
        let mut s = span("5点");
        s.role = SpanRole::RangeEnd;
        let (e, _) = resolve(&s, &tb("2016-05-04-10-00-00"), &ResolutionContext::default(), true);
        assert_eq!(e.kind, ExpressionKind::RangeEnd);
    }

    #[test]
    fn test_advance_time_base() {
        let base = tb("2016-05-04-10-00-00");
        let e = resolve_alone("2017年3月", "2016-05-04-10-00-00", true);
        assert_eq!(advance_time_base(&base, &e).to_string(), "2017-03-04-10-00-00");
        let e = resolve_alone("开会", "2016-05-04-10-00-00", true);
        assert_eq!(advance_time_base(&base, &e), base);
    }

    #[test]
    fn test_epoch_millis_and_sentinel() {
        let cst = FixedOffset::east_opt(8 * 3600).unwrap();
        let e = resolve_alone("1970年1月1日8点", "2016-05-04-10-00-00", true);
        assert_eq!(e.epoch_millis(cst), 0);
        let e = resolve_alone("开会", "2016-05-04-10-00-00", true);
        assert_eq!(e.epoch_millis(cst), LEGACY_SENTINEL_MILLIS);
    }
}
