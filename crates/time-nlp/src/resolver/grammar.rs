//! Calendar grammar: the fields a single span's text specifies.
//!
//! Rules run in a fixed order over a working copy of the span text. Rules
//! that consume their match blank it out so later rules do not reread the
//! same digits (`周23点` must not yield hour 23 once `周2` is taken).
//! Relative words and offsets are computed against the time base here;
//! context inheritance and future bias are applied by the caller.

use std::sync::OnceLock;

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};

use super::point::{Granularity, TimePoint};

macro_rules! regex {
    ($re:literal) => {{
        static RE: OnceLock<Regex> = OnceLock::new();
        RE.get_or_init(|| Regex::new($re).expect("invalid regex pattern"))
    }};
}

/// A coarse part of the day, which both defaults and disambiguates the hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPart {
    Dawn,
    EarlyMorning,
    Morning,
    Noon,
    Afternoon,
    Night,
}

impl DayPart {
    fn default_hour(self) -> u32 {
        match self {
            DayPart::Dawn => 3,
            DayPart::EarlyMorning => 8,
            DayPart::Morning => 10,
            DayPart::Noon => 12,
            DayPart::Afternoon => 15,
            DayPart::Night => 18,
        }
    }

    /// Move a 0–23 hour into this part of the day.
    fn adjust(self, hour: u32) -> u32 {
        match self {
            DayPart::Dawn | DayPart::EarlyMorning | DayPart::Morning if (12..=23).contains(&hour) => {
                hour - 12
            }
            DayPart::Noon if hour <= 10 => hour + 12,
            DayPart::Afternoon if hour <= 11 => hour + 12,
            DayPart::Night if (1..=11).contains(&hour) => hour + 12,
            DayPart::Night if hour == 12 => 0,
            _ => hour,
        }
    }
}

/// What the grammar found in one span.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub point: TimePoint,
    pub day_part: Option<DayPart>,
    /// A bare weekday (`周3`) whose week was taken from the time base.
    pub floating_weekday: bool,
}

/// Extract calendar fields from cleaned span text.
pub fn extract(text: &str, base: &NaiveDateTime) -> Extraction {
    let mut ex = Extraction {
        day_part: detect_day_part(text),
        ..Extraction::default()
    };
    let mut work = text.to_string();

    work = consume_full_forms(&work, &mut ex.point);
    work = consume_offsets(&work, base, &mut ex.point);
    work = consume_holidays(&work, &mut ex.point);
    work = consume_relative_words(&work, base, &mut ex);

    set_year(&work, &mut ex.point);
    set_month_and_day(&work, &mut ex.point);
    set_hour(&work, &mut ex.point);
    set_minute(&work, &mut ex.point);
    set_second(&work, &mut ex.point);

    if let Some(part) = ex.day_part {
        match ex.point.hour() {
            Some(h) => ex.point.set_hour(part.adjust(h)),
            None => ex.point.set_hour(part.default_hour()),
        }
    }

    ex
}

// ── Day parts ───────────────────────────────────────────────────────────────

fn detect_day_part(text: &str) -> Option<DayPart> {
    let table: [(DayPart, &Regex); 6] = [
        (DayPart::Dawn, regex!("凌晨")),
        (DayPart::EarlyMorning, regex!("早上|早晨|清晨|今早|明早")),
        (DayPart::Morning, regex!("上午|am|AM")),
        (DayPart::Noon, regex!("中午|午间")),
        (DayPart::Afternoon, regex!("下午|午后|傍晚|pm|PM")),
        (DayPart::Night, regex!("晚上|夜里|夜间|今晚|明晚|昨晚")),
    ];
    table
        .into_iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(part, _)| part)
}

// ── Consuming rules ─────────────────────────────────────────────────────────

/// `h:m[:s]`, `y-m-d`, `y.m.d`, `m/d/y`.
fn consume_full_forms(work: &str, point: &mut TimePoint) -> String {
    let work = regex!("([0-2]?[0-9]):([0-5]?[0-9])(?::([0-5]?[0-9]))?")
        .replace_all(work, |caps: &Captures| {
            if let Some(h) = num(caps, 1).filter(|h| *h <= 23) {
                point.set_hour(h);
            }
            if let Some(m) = num(caps, 2) {
                point.set_minute(m);
            }
            if let Some(s) = num(caps, 3) {
                point.set_second(s);
            }
            " "
        })
        .into_owned();

    let work = regex!("([0-9]{2,4})[-.]([0-9]{1,2})[-.]([0-9]{1,2})")
        .replace_all(&work, |caps: &Captures| {
            set_ymd(point, caps.get(1).map(|m| m.as_str()), num(caps, 2), num(caps, 3));
            " "
        })
        .into_owned();

    regex!("([0-9]{1,2})/([0-9]{1,2})/([0-9]{2,4})")
        .replace_all(&work, |caps: &Captures| {
            set_ymd(point, caps.get(3).map(|m| m.as_str()), num(caps, 1), num(caps, 2));
            " "
        })
        .into_owned()
}

fn set_ymd(point: &mut TimePoint, year: Option<&str>, month: Option<u32>, day: Option<u32>) {
    if let Some(y) = year.and_then(normalize_year) {
        point.set_year(y);
    }
    if let Some(m) = month.filter(|m| (1..=12).contains(m)) {
        point.set_month(m);
    }
    if let Some(d) = day.filter(|d| (1..=31).contains(d)) {
        point.set_day(d);
    }
}

/// `N[个](年|月|周|天|小时|分钟|秒)[以之](前|后)` relative to the time base.
fn consume_offsets(work: &str, base: &NaiveDateTime, point: &mut TimePoint) -> String {
    regex!("([0-9]{1,3})个?(年|月|周|星期|礼拜|天|小时|钟头|分钟|秒钟?)[以之]?(前|后)")
        .replace_all(work, |caps: &Captures| {
            let n = num(caps, 1).map(i64::from);
            let unit = caps.get(2).map_or("", |m| m.as_str());
            let forward = caps.get(3).is_some_and(|m| m.as_str() == "后");
            if let Some((dt, granularity)) = n.and_then(|n| shift(base, n, unit, forward)) {
                for g in &Granularity::ALL[..=granularity.index()] {
                    point.set(*g, g.of(&dt));
                }
            }
            " "
        })
        .into_owned()
}

fn shift(
    base: &NaiveDateTime,
    n: i64,
    unit: &str,
    forward: bool,
) -> Option<(NaiveDateTime, Granularity)> {
    let signed = if forward { n } else { -n };
    match unit {
        "年" => Some((shift_months(base, signed.checked_mul(12)?)?, Granularity::Year)),
        "月" => Some((shift_months(base, signed)?, Granularity::Month)),
        "周" | "星期" | "礼拜" => Some((
            base.checked_add_signed(Duration::try_weeks(signed)?)?,
            Granularity::Day,
        )),
        "天" => Some((
            base.checked_add_signed(Duration::try_days(signed)?)?,
            Granularity::Day,
        )),
        "小时" | "钟头" => Some((
            base.checked_add_signed(Duration::try_hours(signed)?)?,
            Granularity::Hour,
        )),
        "分钟" => Some((
            base.checked_add_signed(Duration::try_minutes(signed)?)?,
            Granularity::Minute,
        )),
        "秒" | "秒钟" => Some((
            base.checked_add_signed(Duration::try_seconds(signed)?)?,
            Granularity::Second,
        )),
        _ => None,
    }
}

fn shift_months(dt: &NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        dt.checked_add_months(magnitude)
    } else {
        dt.checked_sub_months(magnitude)
    }
}

/// Fixed-date solar holidays.
fn consume_holidays(work: &str, point: &mut TimePoint) -> String {
    regex!("元旦|情人节|妇女节|植树节|愚人节|劳动节|青年节|儿童节|建党节|建军节|教师节|国庆节?|万圣节|平安夜|圣诞节?")
        .replace_all(work, |caps: &Captures| {
            if let Some((m, d)) = holiday_date(&caps[0]) {
                point.set_month(m);
                point.set_day(d);
            }
            " "
        })
        .into_owned()
}

fn holiday_date(name: &str) -> Option<(u32, u32)> {
    match name {
        "元旦" => Some((1, 1)),
        "情人节" => Some((2, 14)),
        "妇女节" => Some((3, 8)),
        "植树节" => Some((3, 12)),
        "愚人节" => Some((4, 1)),
        "劳动节" => Some((5, 1)),
        "青年节" => Some((5, 4)),
        "儿童节" => Some((6, 1)),
        "建党节" => Some((7, 1)),
        "建军节" => Some((8, 1)),
        "教师节" => Some((9, 10)),
        "国庆" | "国庆节" => Some((10, 1)),
        "万圣节" => Some((10, 31)),
        "平安夜" => Some((12, 24)),
        "圣诞" | "圣诞节" => Some((12, 25)),
        _ => None,
    }
}

/// 今年/下个月/下周3/明天 and friends, relative to the time base.
fn consume_relative_words(work: &str, base: &NaiveDateTime, ex: &mut Extraction) -> String {
    let point = &mut ex.point;

    let work = regex!("(大前|前|去|今|明|大后|后)年")
        .replace_all(work, |caps: &Captures| {
            let offset = match &caps[1] {
                "大前" => -3,
                "前" => -2,
                "去" => -1,
                "今" => 0,
                "明" => 1,
                "后" => 2,
                _ => 3,
            };
            point.set_year(base.year() + offset);
            " "
        })
        .into_owned();

    let work = regex!("(上上|上|本|这|下下|下)个?月")
        .replace_all(&work, |caps: &Captures| {
            let first = base.date().with_day(1).unwrap_or(base.date());
            let shifted = shift_months(&first.and_time(base.time()), week_word_offset(&caps[1]));
            if let Some(dt) = shifted {
                point.set_year(dt.year());
                point.set_month(dt.month());
            }
            " "
        })
        .into_owned();

    let mut floating = false;
    let work = regex!("(?:(上上|上|下下|下|本|这)个?)?(?:周|星期|礼拜)([1-7])?")
        .replace_all(&work, |caps: &Captures| {
            let prefix = caps.get(1).map(|m| m.as_str());
            let weekday = num(caps, 2);
            if prefix.is_none() && weekday.is_none() {
                return caps[0].to_string();
            }
            let weeks = prefix.map_or(0, week_word_offset);
            if let Some(target) = day_in_week(base.date(), weeks, weekday.unwrap_or(1)) {
                point.set_date(target);
                floating = prefix.is_none();
            }
            " ".to_string()
        })
        .into_owned();
    ex.floating_weekday = floating;

    regex!("大前天|前天|大后天|后天|昨|今|明")
        .replace_all(&work, |caps: &Captures| {
            let offset = match &caps[0] {
                "大前天" => -3,
                "前天" => -2,
                "昨" => -1,
                "今" => 0,
                "明" => 1,
                "后天" => 2,
                _ => 3,
            };
            if let Some(date) = base.date().checked_add_signed(Duration::days(offset)) {
                ex.point.set_date(date);
            }
            " "
        })
        .into_owned()
}

/// Day `weekday` (1 = Monday) of the week `weeks` away from `date`'s week.
fn day_in_week(date: NaiveDate, weeks: i64, weekday: u32) -> Option<NaiveDate> {
    let monday = date
        .checked_sub_signed(Duration::days(i64::from(date.weekday().num_days_from_monday())))?;
    monday
        .checked_add_signed(Duration::try_weeks(weeks)?)?
        .checked_add_signed(Duration::days(i64::from(weekday) - 1))
}

/// Offset in periods for 上上/上/本/这/下/下下.
fn week_word_offset(word: &str) -> i64 {
    match word {
        "上上" => -2,
        "上" => -1,
        "下" => 1,
        "下下" => 2,
        _ => 0,
    }
}

// ── Absolute fields ─────────────────────────────────────────────────────────

fn set_year(work: &str, point: &mut TimePoint) {
    if let Some(y) = first_standalone(regex!("([0-9]{2,4})年"), work)
        .and_then(|caps| caps.get(1).and_then(|m| normalize_year(m.as_str())))
    {
        point.set_year(y);
    }
}

/// Two-digit years: below 30 → 20xx, otherwise 19xx.
fn normalize_year(digits: &str) -> Option<i32> {
    let y: i32 = digits.parse().ok()?;
    match digits.len() {
        2 if y < 30 => Some(2000 + y),
        2 => Some(1900 + y),
        3 | 4 => Some(y),
        _ => None,
    }
}

fn set_month_and_day(work: &str, point: &mut TimePoint) {
    if let Some(caps) = first_standalone(regex!("([0-9]{1,2})月([0-9]{1,2})"), work) {
        set_ymd(point, None, num(&caps, 1), num(&caps, 2));
    }
    if let Some(caps) = first_standalone(regex!("([0-9]{1,2})月"), work) {
        set_ymd(point, None, num(&caps, 1), None);
    }
    if let Some(caps) = first_standalone(regex!("([0-9]{1,2})[日号]"), work) {
        set_ymd(point, None, None, num(&caps, 1));
    }
}

fn set_hour(work: &str, point: &mut TimePoint) {
    if let Some(h) = first_standalone(regex!("([0-2]?[0-9])(?:[点时]|[ap]m|[AP]M)"), work)
        .and_then(|caps| num(&caps, 1))
        .filter(|h| *h <= 23)
    {
        point.set_hour(h);
    }
}

fn set_minute(work: &str, point: &mut TimePoint) {
    if regex!("[点时]半").is_match(work) {
        point.set_minute(30);
        return;
    }
    if let Some(caps) = regex!("[点时]([13])刻").captures(work) {
        point.set_minute(if &caps[1] == "1" { 15 } else { 45 });
        return;
    }
    let after_hour = regex!("[点时]([0-5]?[0-9])(刻|分钟)?")
        .captures_iter(work)
        .find(|caps| caps.get(2).is_none())
        .and_then(|caps| num(&caps, 1));
    let labelled = standalone(regex!("([0-5]?[0-9])分(钟)?"), work)
        .find(|caps| caps.get(2).is_none())
        .and_then(|caps| num(&caps, 1));
    if let Some(m) = after_hour.or(labelled) {
        point.set_minute(m);
    }
}

fn set_second(work: &str, point: &mut TimePoint) {
    let labelled = first_standalone(regex!("([0-5]?[0-9])秒"), work).and_then(|caps| num(&caps, 1));
    let after_minute = regex!("分([0-5]?[0-9])")
        .captures(work)
        .and_then(|caps| num(&caps, 1));
    if let Some(s) = labelled.or(after_minute) {
        point.set_second(s);
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn num(caps: &Captures, group: usize) -> Option<u32> {
    caps.get(group).and_then(|m| m.as_str().parse().ok())
}

/// Matches not immediately preceded by an ASCII digit.
fn standalone<'r, 't>(re: &'r Regex, text: &'t str) -> impl Iterator<Item = Captures<'t>> + 'r
where
    't: 'r,
{
    re.captures_iter(text).filter(move |caps| {
        let start = caps.get(0).map_or(0, |m| m.start());
        !text[..start].ends_with(|c: char| c.is_ascii_digit())
    })
}

fn first_standalone<'t>(re: &Regex, text: &'t str) -> Option<Captures<'t>> {
    standalone(re, text).next()
}
