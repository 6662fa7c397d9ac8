use crate::error::{PatternKind, TransformError};
use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase};
use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// One configured text transformation rule. List order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pattern {
    Prefix {
        #[serde(default = "default_true")]
        enabled: bool,
        text: String,
    },
    Suffix {
        #[serde(default = "default_true")]
        enabled: bool,
        text: String,
        #[serde(default = "default_true")]
        before_extension: bool,
    },
    Replace {
        #[serde(default = "default_true")]
        enabled: bool,
        search: String,
        #[serde(default)]
        replace: String,
        #[serde(default)]
        case_sensitive: bool,
        #[serde(default)]
        whole_word: bool,
    },
    Regex {
        #[serde(default = "default_true")]
        enabled: bool,
        pattern: String,
        #[serde(default)]
        replacement: String,
        #[serde(default = "default_regex_flags")]
        flags: String,
    },
    Numbering {
        #[serde(default = "default_true")]
        enabled: bool,
        #[serde(default = "default_start")]
        start: i64,
        #[serde(default = "default_increment")]
        increment: i64,
        #[serde(default)]
        padding: usize,
        #[serde(default)]
        position: NumberPosition,
        #[serde(default = "default_separator")]
        separator: String,
    },
    Case {
        #[serde(default = "default_true")]
        enabled: bool,
        style: CaseStyle,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberPosition {
    #[default]
    Prefix,
    Suffix,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStyle {
    Lower,
    Upper,
    Title,
    Camel,
    Snake,
    Kebab,
}

fn default_true() -> bool {
    true
}

fn default_regex_flags() -> String {
    "g".to_string()
}

fn default_start() -> i64 {
    1
}

fn default_increment() -> i64 {
    1
}

fn default_separator() -> String {
    "_".to_string()
}

impl Pattern {
    pub fn kind(&self) -> PatternKind {
        match self {
            Pattern::Prefix { .. } => PatternKind::Prefix,
            Pattern::Suffix { .. } => PatternKind::Suffix,
            Pattern::Replace { .. } => PatternKind::Replace,
            Pattern::Regex { .. } => PatternKind::Regex,
            Pattern::Numbering { .. } => PatternKind::Numbering,
            Pattern::Case { .. } => PatternKind::Case,
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            Pattern::Prefix { enabled, .. }
            | Pattern::Suffix { enabled, .. }
            | Pattern::Replace { enabled, .. }
            | Pattern::Regex { enabled, .. }
            | Pattern::Numbering { enabled, .. }
            | Pattern::Case { enabled, .. } => *enabled,
        }
    }

    pub fn set_enabled(&mut self, value: bool) {
        match self {
            Pattern::Prefix { enabled, .. }
            | Pattern::Suffix { enabled, .. }
            | Pattern::Replace { enabled, .. }
            | Pattern::Regex { enabled, .. }
            | Pattern::Numbering { enabled, .. }
            | Pattern::Case { enabled, .. } => *enabled = value,
        }
    }

    /// Suffix whose text lands after the reattached extension.
    pub fn is_deferred_suffix(&self) -> bool {
        matches!(
            self,
            Pattern::Suffix {
                before_extension: false,
                ..
            }
        )
    }

    pub fn prefix(text: impl Into<String>) -> Self {
        Pattern::Prefix {
            enabled: true,
            text: text.into(),
        }
    }

    pub fn suffix(text: impl Into<String>, before_extension: bool) -> Self {
        Pattern::Suffix {
            enabled: true,
            text: text.into(),
            before_extension,
        }
    }

    pub fn replace(search: impl Into<String>, replace: impl Into<String>) -> Self {
        Pattern::Replace {
            enabled: true,
            search: search.into(),
            replace: replace.into(),
            case_sensitive: false,
            whole_word: false,
        }
    }

    pub fn regex(
        pattern: impl Into<String>,
        replacement: impl Into<String>,
        flags: impl Into<String>,
    ) -> Self {
        Pattern::Regex {
            enabled: true,
            pattern: pattern.into(),
            replacement: replacement.into(),
            flags: flags.into(),
        }
    }

    pub fn numbering(start: i64, increment: i64, padding: usize, position: NumberPosition) -> Self {
        Pattern::Numbering {
            enabled: true,
            start,
            increment,
            padding,
            position,
            separator: default_separator(),
        }
    }

    pub fn case(style: CaseStyle) -> Self {
        Pattern::Case {
            enabled: true,
            style,
        }
    }
}

/// Applies a single pattern to `name`. Compiles any regex on every call; batch callers go
/// through [`PreparedPattern`] instead.
pub fn apply_pattern(name: &str, pattern: &Pattern, index: usize) -> Result<String, TransformError> {
    PreparedPattern::new(pattern).apply(name, index)
}

/// A pattern with its matcher compiled once for a whole batch. A compile failure is kept and
/// reported again for every file the pattern is applied to.
#[derive(Debug)]
pub struct PreparedPattern<'a> {
    pattern: &'a Pattern,
    matcher: Result<Option<Matcher>, TransformError>,
}

#[derive(Debug)]
struct Matcher {
    regex: Regex,
    global: bool,
}

impl<'a> PreparedPattern<'a> {
    pub fn new(pattern: &'a Pattern) -> Self {
        let matcher = match pattern {
            Pattern::Replace {
                search,
                case_sensitive,
                whole_word,
                ..
            } => build_replace_matcher(search, *case_sensitive, *whole_word),
            Pattern::Regex { pattern, flags, .. } => build_user_matcher(pattern, flags).map(Some),
            Pattern::Prefix { .. }
            | Pattern::Suffix { .. }
            | Pattern::Numbering { .. }
            | Pattern::Case { .. } => Ok(None),
        };
        Self { pattern, matcher }
    }

    pub fn pattern(&self) -> &'a Pattern {
        self.pattern
    }

    pub fn apply(&self, name: &str, index: usize) -> Result<String, TransformError> {
        let matcher = self.matcher.as_ref().map_err(Clone::clone)?;
        let out = match self.pattern {
            Pattern::Prefix { text, .. } => format!("{text}{name}"),
            Pattern::Suffix { text, .. } => format!("{name}{text}"),
            Pattern::Replace { replace, .. } => match matcher {
                Some(m) => m.regex.replace_all(name, NoExpand(replace)).into_owned(),
                None => name.to_string(),
            },
            Pattern::Regex { replacement, .. } => match matcher {
                Some(m) if m.global => m.regex.replace_all(name, replacement.as_str()).into_owned(),
                Some(m) => m.regex.replace(name, replacement.as_str()).into_owned(),
                None => name.to_string(),
            },
            Pattern::Numbering {
                start,
                increment,
                padding,
                position,
                separator,
                ..
            } => {
                let number = format_number(*start, *increment, *padding, index);
                match position {
                    NumberPosition::Prefix => format!("{number}{separator}{name}"),
                    NumberPosition::Suffix => format!("{name}{separator}{number}"),
                    NumberPosition::Replace => number,
                }
            }
            Pattern::Case { style, .. } => apply_case(name, *style),
        };
        Ok(out)
    }
}

fn build_replace_matcher(
    search: &str,
    case_sensitive: bool,
    whole_word: bool,
) -> Result<Option<Matcher>, TransformError> {
    if search.is_empty() {
        return Ok(None);
    }

    let escaped = regex::escape(search);
    let source = if whole_word {
        format!(r"\b{escaped}\b")
    } else {
        escaped
    };
    let regex = RegexBuilder::new(&source)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| TransformError::InvalidRegex {
            kind: PatternKind::Replace,
            pattern: search.to_string(),
            reason: e.to_string(),
        })?;
    Ok(Some(Matcher {
        regex,
        global: true,
    }))
}

fn build_user_matcher(pattern: &str, flags: &str) -> Result<Matcher, TransformError> {
    let mut builder = RegexBuilder::new(pattern);
    let mut global = false;
    for flag in flags.chars() {
        match flag {
            'g' => global = true,
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            'u' => {}
            other => return Err(TransformError::UnknownRegexFlag(other)),
        }
    }

    let regex = builder.build().map_err(|e| TransformError::InvalidRegex {
        kind: PatternKind::Regex,
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Matcher { regex, global })
}

fn format_number(start: i64, increment: i64, padding: usize, index: usize) -> String {
    let step = i64::try_from(index)
        .unwrap_or(i64::MAX)
        .saturating_mul(increment);
    let number = start.saturating_add(step);
    if number < 0 {
        format!("-{:0>width$}", number.unsigned_abs(), width = padding)
    } else {
        format!("{:0>width$}", number, width = padding)
    }
}

fn apply_case(name: &str, style: CaseStyle) -> String {
    match style {
        CaseStyle::Lower => name.to_lowercase(),
        CaseStyle::Upper => name.to_uppercase(),
        CaseStyle::Title => title_case(name),
        CaseStyle::Camel => name.to_lower_camel_case(),
        CaseStyle::Snake => name.to_snake_case(),
        CaseStyle::Kebab => name.to_kebab_case(),
    }
}

fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(name: &str, pattern: &Pattern) -> String {
        apply_pattern(name, pattern, 0).expect("pattern must apply")
    }

    #[test]
    fn prefix_and_suffix_concatenate() {
        assert_eq!(apply("report", &Pattern::prefix("Q1_")), "Q1_report");
        assert_eq!(apply("report", &Pattern::suffix("_final", true)), "report_final");
    }

    #[test]
    fn replace_is_case_insensitive_by_default_and_replaces_all() {
        let pattern = Pattern::replace("img", "photo");
        assert_eq!(apply("IMG_img_Img", &pattern), "photo_photo_photo");
    }

    #[test]
    fn replace_case_sensitive_only_matches_exact_case() {
        let pattern = Pattern::Replace {
            enabled: true,
            search: "img".to_string(),
            replace: "photo".to_string(),
            case_sensitive: true,
            whole_word: false,
        };
        assert_eq!(apply("IMG_img", &pattern), "IMG_photo");
    }

    #[test]
    fn replace_whole_word_respects_boundaries() {
        let pattern = Pattern::Replace {
            enabled: true,
            search: "cat".to_string(),
            replace: "dog".to_string(),
            case_sensitive: false,
            whole_word: true,
        };
        assert_eq!(apply("cat catalog cat", &pattern), "dog catalog dog");
    }

    #[test]
    fn replace_treats_search_and_replacement_literally() {
        let pattern = Pattern::replace("a.b", "$1");
        assert_eq!(apply("a.b axb", &pattern), "$1 axb");
    }

    #[test]
    fn replace_with_empty_search_is_noop() {
        assert_eq!(apply("name", &Pattern::replace("", "x")), "name");
    }

    #[test]
    fn regex_global_and_first_only() {
        let global = Pattern::regex(r"\d", "#", "g");
        assert_eq!(apply("a1b2", &global), "a#b#");
        let first = Pattern::regex(r"\d", "#", "");
        assert_eq!(apply("a1b2", &first), "a#b2");
    }

    #[test]
    fn regex_supports_capture_groups_and_ignore_case() {
        let pattern = Pattern::regex(r"img_(\d+)", "photo-$1", "gi");
        assert_eq!(apply("IMG_0042", &pattern), "photo-0042");
    }

    #[test]
    fn invalid_regex_is_an_error_not_a_panic() {
        let err = apply_pattern("name", &Pattern::regex("(", "", "g"), 0)
            .expect_err("invalid regex must fail");
        assert_eq!(err.kind(), PatternKind::Regex);
        assert!(matches!(err, TransformError::InvalidRegex { .. }));
    }

    #[test]
    fn unknown_regex_flag_is_an_error() {
        let err = apply_pattern("name", &Pattern::regex("a", "b", "gq"), 0)
            .expect_err("unknown flag must fail");
        assert_eq!(err, TransformError::UnknownRegexFlag('q'));
    }

    #[test]
    fn numbering_positions_and_padding() {
        let prefix = Pattern::numbering(1, 1, 3, NumberPosition::Prefix);
        assert_eq!(apply_pattern("a", &prefix, 4).expect("apply"), "005_a");

        let suffix = Pattern::Numbering {
            enabled: true,
            start: 10,
            increment: 5,
            padding: 0,
            position: NumberPosition::Suffix,
            separator: "-".to_string(),
        };
        assert_eq!(apply_pattern("a", &suffix, 2).expect("apply"), "a-20");

        let replace = Pattern::numbering(0, 1, 4, NumberPosition::Replace);
        assert_eq!(apply_pattern("anything", &replace, 7).expect("apply"), "0007");
    }

    #[test]
    fn numbering_is_distinct_across_indices() {
        let configs = [(0, 1, 0), (1, 2, 3), (100, -1, 2), (-5, 3, 4)];
        for (start, increment, padding) in configs {
            let pattern = Pattern::numbering(start, increment, padding, NumberPosition::Replace);
            let mut seen = std::collections::HashSet::new();
            for index in 0..200 {
                let out = apply_pattern("x", &pattern, index).expect("apply");
                assert!(seen.insert(out), "duplicate number for {start}/{increment}/{padding}");
            }
        }
    }

    #[test]
    fn case_styles() {
        let name = "hello big World";
        assert_eq!(apply(name, &Pattern::case(CaseStyle::Lower)), "hello big world");
        assert_eq!(apply(name, &Pattern::case(CaseStyle::Upper)), "HELLO BIG WORLD");
        assert_eq!(apply(name, &Pattern::case(CaseStyle::Title)), "Hello Big World");
        assert_eq!(apply(name, &Pattern::case(CaseStyle::Camel)), "helloBigWorld");
        assert_eq!(apply(name, &Pattern::case(CaseStyle::Snake)), "hello_big_world");
        assert_eq!(apply(name, &Pattern::case(CaseStyle::Kebab)), "hello-big-world");
    }

    #[test]
    fn case_styles_are_idempotent() {
        let cases = [
            (CaseStyle::Lower, "already lower"),
            (CaseStyle::Upper, "ALREADY UPPER"),
            (CaseStyle::Title, "Already Title"),
            (CaseStyle::Camel, "alreadyCamel"),
            (CaseStyle::Snake, "already_snake"),
            (CaseStyle::Kebab, "already-kebab"),
        ];
        for (style, name) in cases {
            assert_eq!(apply(name, &Pattern::case(style)), name, "{style:?}");
        }
    }

    #[test]
    fn deserializes_tagged_patterns_with_defaults() {
        let raw = r#"[
            {"kind": "prefix", "text": "Q1_"},
            {"kind": "suffix", "text": ".bak", "before_extension": false},
            {"kind": "numbering", "padding": 3},
            {"kind": "case", "style": "snake", "enabled": false}
        ]"#;
        let patterns: Vec<Pattern> = serde_json::from_str(raw).expect("must parse");
        assert_eq!(patterns[0], Pattern::prefix("Q1_"));
        assert!(patterns[1].is_deferred_suffix());
        assert_eq!(
            patterns[2],
            Pattern::numbering(1, 1, 3, NumberPosition::Prefix)
        );
        assert!(!patterns[3].is_enabled());
    }
}
