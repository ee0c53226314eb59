use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Format used when showing a parsed date back to the user
pub const DISPLAY_FORMAT: &str = "%b %-d %Y, %H:%M";

/// A single accepted date/time layout.
///
/// `pattern` uses chrono's strftime syntax. `has_time` says whether the
/// pattern carries a time of day; date-only layouts resolve to midnight.
/// Input must have as many whitespace-separated words as the pattern, since
/// chrono on its own lets a space in the pattern match no space at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateLayout {
    pub pattern: String,
    pub has_time: bool,
}

impl DateLayout {
    /// Layout that carries both a date and a time of day
    pub fn date_time(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            has_time: true,
        }
    }

    /// Layout that carries only a calendar date
    pub fn date_only(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            has_time: false,
        }
    }

    /// Parse `raw` against this layout alone. The whole input must match.
    fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        if raw.split_whitespace().count() != self.pattern.split_whitespace().count() {
            return None;
        }
        if self.has_time {
            NaiveDateTime::parse_from_str(raw, &self.pattern).ok()
        } else {
            NaiveDate::parse_from_str(raw, &self.pattern)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        }
    }
}

/// The layouts accepted out of the box, in the order they are tried
pub fn default_layouts() -> Vec<DateLayout> {
    vec![
        DateLayout::date_time("%Y-%m-%d %H%M"),
        DateLayout::date_time("%d/%m/%Y %H%M"),
        DateLayout::date_time("%d/%m/%Y %H:%M"),
        DateLayout::date_only("%Y-%m-%d"),
        DateLayout::date_only("%d/%m/%Y"),
    ]
}

/// Tries an ordered list of layouts against user-entered date text.
///
/// The parser never fails: text that matches no layout yields `None` and the
/// caller keeps the raw text for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParser {
    layouts: Vec<DateLayout>,
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new(default_layouts())
    }
}

impl DateParser {
    pub fn new(layouts: Vec<DateLayout>) -> Self {
        Self { layouts }
    }

    pub fn layouts(&self) -> &[DateLayout] {
        &self.layouts
    }

    /// Return the timestamp from the first layout that matches all of `raw`
    pub fn parse(&self, raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        self.layouts.iter().find_map(|layout| layout.parse(raw))
    }
}

/// Render a parsed timestamp for display
pub fn format_for_display(value: &NaiveDateTime) -> String {
    value.format(DISPLAY_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, 0))
            .unwrap()
    }

    #[test]
    fn date_only_input_resolves_to_midnight() {
        let parser = DateParser::default();
        assert_eq!(parser.parse("2024-01-15"), Some(at(2024, 1, 15, 0, 0)));
        assert_eq!(parser.parse("15/1/2024"), Some(at(2024, 1, 15, 0, 0)));
    }

    #[test]
    fn time_bearing_layouts_keep_the_hour() {
        let parser = DateParser::default();
        assert_eq!(parser.parse("2024-01-15 1830"), Some(at(2024, 1, 15, 18, 30)));
        assert_eq!(parser.parse("2/12/2019 1800"), Some(at(2019, 12, 2, 18, 0)));
        assert_eq!(parser.parse("2/12/2019 9:05"), Some(at(2019, 12, 2, 9, 5)));
    }

    #[test]
    fn unmatched_text_is_absent() {
        let parser = DateParser::default();
        assert_eq!(parser.parse("not-a-date"), None);
        assert_eq!(parser.parse(""), None);
        assert_eq!(parser.parse("Mon 2pm"), None);
    }

    #[test]
    fn trailing_garbage_does_not_match() {
        let parser = DateParser::default();
        assert_eq!(parser.parse("2024-01-15 extra"), None);
        assert_eq!(parser.parse("2024-01-15 1830 tomorrow"), None);
    }

    #[test]
    fn spaces_in_the_layout_must_appear_in_the_input() {
        let parser = DateParser::default();
        assert_eq!(parser.parse("2024-01-151830"), None);
        assert_eq!(parser.parse("2/12/20191800"), None);
        assert_eq!(parser.parse("2024-01-15 1830"), Some(at(2024, 1, 15, 18, 30)));
    }

    #[test]
    fn later_layouts_are_tried_after_earlier_ones_fail() {
        let parser = DateParser::new(vec![
            DateLayout::date_only("%Y-%m-%d"),
            DateLayout::date_only("%d.%m.%Y"),
        ]);
        assert_eq!(parser.parse("03.04.2025"), Some(at(2025, 4, 3, 0, 0)));
    }

    #[test]
    fn classification_comes_from_the_flag_not_the_pattern() {
        // %H in a layout flagged date-only can never produce a time of day
        let parser = DateParser::new(vec![DateLayout::date_only("%Y-%m-%d %H")]);
        assert_eq!(parser.parse("2024-01-15 10"), Some(at(2024, 1, 15, 0, 0)));
    }

    #[test]
    fn injected_layouts_replace_the_defaults() {
        let parser = DateParser::new(vec![DateLayout::date_only("%d.%m.%Y")]);
        assert_eq!(parser.parse("2024-01-15"), None);
        assert_eq!(parser.layouts().len(), 1);
    }

    #[test]
    fn display_format_is_human_readable() {
        assert_eq!(format_for_display(&at(2024, 1, 5, 9, 0)), "Jan 5 2024, 09:00");
    }
}
