//! Input cleanup applied before pattern matching.
//!
//! [`clean`] strips whitespace, drops the filler particle `的`, and rewrites
//! numerals into ASCII digits: Chinese numerals (`二十三` → `23`,
//! `二〇一六` → `2016`), full-width digits, and the Sunday/weekend suffixes
//! that follow a week word (`周日`, `星期天`, `周末` → `周7`).
//!
//! Every step is a pure string transform, so `clean(clean(x)) == clean(x)`.

/// Filler particles removed from the input.
const FILLER_PARTICLES: &[char] = &['的'];

/// Week words after which `日`/`天`/`末` mean day 7.
const WEEK_WORDS: &[&str] = &["周", "星期", "礼拜"];

/// Clean raw input text for matching. Never fails; empty in, empty out.
///
/// # Examples
///
/// ```
/// use time_nlp::preprocess::clean;
///
/// assert_eq!(clean("下个 星期天 下午三点半"), "下个星期7下午3点半");
/// assert_eq!(clean("二〇一六年五月四日"), "2016年5月4日");
/// ```
pub fn clean(text: &str) -> String {
    let text = remove_whitespace(text);
    let text = remove_fillers(&text);
    translate_numerals(&text)
}

fn remove_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn remove_fillers(text: &str) -> String {
    text.chars().filter(|c| !FILLER_PARTICLES.contains(c)).collect()
}

/// Rewrite every numeral form into ASCII digits.
pub fn translate_numerals(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if matches!(c, '日' | '天' | '末') && follows_week_word(&out) {
            out.push('7');
            i += 1;
            continue;
        }

        if let Some(d) = full_width_digit(c) {
            out.push(d);
            i += 1;
            continue;
        }
        if c == '：' {
            out.push(':');
            i += 1;
            continue;
        }

        if is_chinese_numeral(c) {
            let start = i;
            while i < chars.len() && is_chinese_numeral(chars[i]) {
                i += 1;
            }
            let run = &chars[start..i];
            match chinese_numeral_to_digits(run) {
                Some(digits) => out.push_str(&digits),
                None => out.extend(run.iter()),
            }
            continue;
        }

        out.push(c);
        i += 1;
    }

    out
}

fn follows_week_word(out: &str) -> bool {
    WEEK_WORDS.iter().any(|w| out.ends_with(w))
}

fn full_width_digit(c: char) -> Option<char> {
    if ('０'..='９').contains(&c) {
        char::from_u32(c as u32 - '０' as u32 + '0' as u32)
    } else {
        None
    }
}

fn digit_value(c: char) -> Option<u64> {
    match c {
        '零' | '〇' => Some(0),
        '一' => Some(1),
        '二' | '两' => Some(2),
        '三' => Some(3),
        '四' => Some(4),
        '五' => Some(5),
        '六' => Some(6),
        '七' => Some(7),
        '八' => Some(8),
        '九' => Some(9),
        _ => None,
    }
}

fn unit_value(c: char) -> Option<u64> {
    match c {
        '十' => Some(10),
        '百' => Some(100),
        '千' => Some(1_000),
        '万' => Some(10_000),
        _ => None,
    }
}

fn is_chinese_numeral(c: char) -> bool {
    digit_value(c).is_some() || unit_value(c).is_some()
}

/// Convert one run of Chinese numeral characters.
///
/// A run without unit characters is read digit by digit (`二〇一六` →
/// `2016`). Otherwise it is read positionally, with a trailing digit after
/// 百/千/万 scaled one place down (`一百五` → `150`, `两千五` → `2500`)
/// unless a `零` intervenes (`一百零五` → `105`). Returns `None` on overflow
/// and for runs led by 百/千/万, which are words rather than numbers
/// (`万圣节`).
fn chinese_numeral_to_digits(run: &[char]) -> Option<String> {
    if matches!(run.first(), Some('百' | '千' | '万')) {
        return None;
    }
    if run.iter().all(|c| unit_value(*c).is_none()) {
        return run
            .iter()
            .map(|c| digit_value(*c).and_then(|d| char::from_digit(d as u32, 10)))
            .collect();
    }

    let mut total: u64 = 0;
    let mut section: u64 = 0;
    let mut pending: Option<u64> = None;
    let mut last_unit: u64 = 1;
    let mut zero_seen = false;

    for &c in run {
        if let Some(d) = digit_value(c) {
            if d == 0 {
                zero_seen = true;
                pending = None;
            } else {
                pending = Some(match pending {
                    Some(p) => p.checked_mul(10)?.checked_add(d)?,
                    None => d,
                });
            }
            continue;
        }

        let unit = unit_value(c)?;
        if unit == 10_000 {
            let head = total
                .checked_add(section)?
                .checked_add(pending.unwrap_or(0))?
                .max(1);
            total = head.checked_mul(unit)?;
            section = 0;
        } else {
            section = section.checked_add(pending.unwrap_or(1).checked_mul(unit)?)?;
        }
        pending = None;
        last_unit = unit;
        zero_seen = false;
    }

    if let Some(d) = pending {
        let scaled = if last_unit > 10 && !zero_seen {
            d.checked_mul(last_unit / 10)?
        } else {
            d
        };
        section = section.checked_add(scaled)?;
    }

    Some(total.checked_add(section)?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_whitespace() {
        assert_eq!(clean(" 明天 \t下午\n3点 "), "明天下午3点");
        assert_eq!(clean("明天\u{3000}下午"), "明天下午");
    }

    #[test]
    fn test_removes_filler_particle() {
        assert_eq!(clean("明天的的下午"), "明天下午");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean(""), "");
        assert_eq!(clean("   "), "");
    }

    #[test]
    fn test_single_digits() {
        assert_eq!(clean("三点"), "3点");
        assert_eq!(clean("两点"), "2点");
        assert_eq!(clean("零点"), "0点");
    }

    #[test]
    fn test_tens() {
        assert_eq!(clean("十点"), "10点");
        assert_eq!(clean("十五号"), "15号");
        assert_eq!(clean("二十三点"), "23点");
        assert_eq!(clean("三十"), "30");
    }

    #[test]
    fn test_hundreds_and_thousands() {
        assert_eq!(clean("一百零五天后"), "105天后");
        assert_eq!(clean("一百五"), "150");
        assert_eq!(clean("两千零一十六年"), "2016年");
        assert_eq!(clean("两千五"), "2500");
    }

    #[test]
    fn test_ten_thousands() {
        assert_eq!(clean("三万五"), "35000");
        assert_eq!(clean("一万"), "10000");
    }

    #[test]
    fn test_unit_led_runs_are_words() {
        assert_eq!(clean("万圣节"), "万圣节");
        assert_eq!(clean("千万"), "千万");
    }

    #[test]
    fn test_digit_by_digit_year() {
        assert_eq!(clean("二〇一六年"), "2016年");
        assert_eq!(clean("二零一六年"), "2016年");
    }

    #[test]
    fn test_full_width_digits_and_colon() {
        assert_eq!(clean("１５：３０"), "15:30");
    }

    #[test]
    fn test_week_suffixes() {
        assert_eq!(clean("周日"), "周7");
        assert_eq!(clean("星期天"), "星期7");
        assert_eq!(clean("礼拜天"), "礼拜7");
        assert_eq!(clean("周末"), "周7");
        assert_eq!(clean("星期一"), "星期1");
        assert_eq!(clean("5月4日"), "5月4日");
    }

    #[test]
    fn test_leaves_other_text_alone() {
        assert_eq!(clean("hello world"), "helloworld");
        assert_eq!(clean("会议室"), "会议室");
    }

    #[test]
    fn test_overflow_keeps_original_run() {
        let run = format!("一{}", "万".repeat(8));
        assert_eq!(clean(&run), run);
    }

    #[test]
    fn test_idempotent_on_clean_text() {
        for s in ["2016年5月4日下午3点", "周7", "下周3", "abc", "", "一百零五"] {
            let once = clean(s);
            assert_eq!(clean(&once), once, "input: {s}");
        }
    }
}
