//! `-p/--pattern` mini-syntax.
//!
//! `prefix:T`, `suffix:T`, `suffix-ext:T`, `replace:FROM=TO[:cs][:word]`,
//! `regex:PAT=REP[:FLAGS]`, `number[:START[:INC[:PAD[:POS[:SEP]]]]]`, `case:STYLE`.
//! File names cannot contain `:`, so it is safe as a separator for everything except a regex
//! pattern, which is split off at its last `=` instead.

use fbatch_core::{CaseStyle, NumberPosition, Pattern};

pub fn parse_pattern_spec(spec: &str) -> Result<Pattern, String> {
    let (kind, rest) = spec.split_once(':').unwrap_or((spec, ""));
    match kind {
        "prefix" => Ok(Pattern::prefix(rest)),
        "suffix" => Ok(Pattern::suffix(rest, true)),
        "suffix-ext" => Ok(Pattern::suffix(rest, false)),
        "replace" => parse_replace(rest),
        "regex" => parse_regex(rest),
        "number" => parse_number(rest),
        "case" => parse_case(rest).map(Pattern::case),
        other => Err(format!("未対応のパターン種別です: {other}")),
    }
}

fn parse_replace(rest: &str) -> Result<Pattern, String> {
    let (search, tail) = rest
        .split_once('=')
        .ok_or_else(|| "replace は FROM=TO の形式で指定してください".to_string())?;
    let mut parts = tail.split(':');
    let replace = parts.next().unwrap_or_default().to_string();
    let mut case_sensitive = false;
    let mut whole_word = false;
    for option in parts {
        match option {
            "cs" => case_sensitive = true,
            "word" => whole_word = true,
            other => return Err(format!("replace の未対応オプションです: {other}")),
        }
    }
    Ok(Pattern::Replace {
        enabled: true,
        search: search.to_string(),
        replace,
        case_sensitive,
        whole_word,
    })
}

fn parse_regex(rest: &str) -> Result<Pattern, String> {
    let (pattern, tail) = rest
        .rsplit_once('=')
        .ok_or_else(|| "regex は PAT=REP の形式で指定してください".to_string())?;
    let (replacement, flags) = tail.split_once(':').unwrap_or((tail, "g"));
    Ok(Pattern::regex(pattern, replacement, flags))
}

fn parse_number(rest: &str) -> Result<Pattern, String> {
    let fields: Vec<&str> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(':').collect()
    };
    let int = |index: usize, default: i64| -> Result<i64, String> {
        match fields.get(index) {
            Some(v) if !v.is_empty() => v
                .parse::<i64>()
                .map_err(|e| format!("number の数値が不正です '{v}': {e}")),
            _ => Ok(default),
        }
    };
    let start = int(0, 1)?;
    let increment = int(1, 1)?;
    let padding = usize::try_from(int(2, 0)?)
        .map_err(|_| "number の桁数は0以上で指定してください".to_string())?;
    let position = match fields.get(3).copied().unwrap_or("prefix") {
        "" | "prefix" => NumberPosition::Prefix,
        "suffix" => NumberPosition::Suffix,
        "replace" => NumberPosition::Replace,
        other => return Err(format!("number の位置が不正です: {other}")),
    };
    let separator = fields.get(4).copied().unwrap_or("_").to_string();
    Ok(Pattern::Numbering {
        enabled: true,
        start,
        increment,
        padding,
        position,
        separator,
    })
}

fn parse_case(rest: &str) -> Result<CaseStyle, String> {
    match rest {
        "lower" => Ok(CaseStyle::Lower),
        "upper" => Ok(CaseStyle::Upper),
        "title" => Ok(CaseStyle::Title),
        "camel" => Ok(CaseStyle::Camel),
        "snake" => Ok(CaseStyle::Snake),
        "kebab" => Ok(CaseStyle::Kebab),
        other => Err(format!("未対応のケースです: {other}")),
    }
}
