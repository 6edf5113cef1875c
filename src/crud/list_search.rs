use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::emitter::QueryEmitter;
use super::types::{FilterShape, SearchParams};

/// Characters with a meaning in the search query syntax
const SPECIAL_CHARS: &str = ",.<>{}[]\"':;!@#$%^&*()-+=~|/\\";

/// Search-index query in RediSearch syntax: field clauses joined by spaces
/// (intersection) plus an optional sort.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchQuery {
    clauses: Vec<String>,
    sort: Option<SearchSort>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchSort {
    pub field: String,
    pub desc: bool,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Numeric equality; several values match any of them
    pub fn filter_int(&mut self, field: &str, values: &[i64]) -> &mut Self {
        let ranges: Vec<(i64, i64)> = values.iter().map(|v| (*v, *v)).collect();
        self.numeric_any(field, &ranges)
    }

    pub fn filter_int_min_max(&mut self, field: &str, min: i64, max: i64) -> &mut Self {
        self.numeric_any(field, &[(min, max)])
    }

    /// Datetimes are indexed as Unix seconds
    pub fn filter_date_time(&mut self, field: &str, value: DateTime<Utc>) -> &mut Self {
        let ts = value.timestamp();
        self.numeric_any(field, &[(ts, ts)])
    }

    pub fn filter_date_time_min_max(&mut self, field: &str, min: DateTime<Utc>, max: DateTime<Utc>) -> &mut Self {
        self.numeric_any(field, &[(min.timestamp(), max.timestamp())])
    }

    /// Dates are indexed as Unix seconds of their UTC midnight
    pub fn filter_date(&mut self, field: &str, value: NaiveDate) -> &mut Self {
        let ts = date_timestamp(value);
        self.numeric_any(field, &[(ts, ts)])
    }

    pub fn filter_date_min_max(&mut self, field: &str, min: NaiveDate, max: NaiveDate) -> &mut Self {
        self.numeric_any(field, &[(date_timestamp(min), date_timestamp(max))])
    }

    /// Tag membership; several values match any of them
    pub fn filter_tag<S: AsRef<str>>(&mut self, field: &str, values: &[S]) -> &mut Self {
        let tags: Vec<String> = values
            .iter()
            .map(|v| v.as_ref())
            .filter(|v| !v.is_empty())
            .map(escape_search_string)
            .collect();
        if tags.is_empty() {
            return self;
        }
        self.clauses.push(format!("@{}:{{{}}}", field, tags.join(" | ")));
        self
    }

    pub fn filter_bool(&mut self, field: &str, value: bool) -> &mut Self {
        self.filter_tag(field, &[if value { "true" } else { "false" }])
    }

    pub fn query_field_prefix_match(&mut self, field: &str, value: &str) -> &mut Self {
        let value = value.trim();
        if !value.is_empty() {
            self.clauses.push(format!("@{}:{}*", field, escape_search_string(value)));
        }
        self
    }

    /// Appends an already rendered clause as is
    pub fn append_query_raw(&mut self, raw: impl Into<String>) -> &mut Self {
        self.clauses.push(raw.into());
        self
    }

    pub fn sort(&mut self, field: &str, desc: bool) -> &mut Self {
        self.sort = Some(SearchSort { field: field.to_string(), desc });
        self
    }

    /// Query string, `*` when there is nothing to filter on
    pub fn query(&self) -> String {
        if self.clauses.is_empty() {
            "*".to_string()
        } else {
            self.clauses.join(" ")
        }
    }

    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    pub fn sort_by(&self) -> Option<&SearchSort> {
        self.sort.as_ref()
    }

    fn numeric_any(&mut self, field: &str, ranges: &[(i64, i64)]) -> &mut Self {
        let parts: Vec<String> = ranges
            .iter()
            .map(|(min, max)| format!("@{}:[{} {}]", field, min, max))
            .collect();
        match parts.len() {
            0 => {}
            1 => self.clauses.extend(parts),
            _ => self.clauses.push(format!("({})", parts.join("|"))),
        }
        self
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query())?;
        if let Some(sort) = &self.sort {
            write!(f, " SORTBY {} {}", sort.field, if sort.desc { "DESC" } else { "ASC" })?;
        }
        Ok(())
    }
}

/// Backslash-escapes query syntax characters and whitespace
pub fn escape_search_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if SPECIAL_CHARS.contains(c) || c.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn date_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp()).unwrap_or_default()
}

/// Search-index backend. Translates every filter shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchQueryEmitter;

impl QueryEmitter for SearchQueryEmitter {
    type Output = SearchQuery;

    const BACKEND: &'static str = "search index";

    fn capabilities(&self) -> &'static [FilterShape] {
        &FilterShape::ALL
    }

    // TODO: switch string filters to full-text queries once the index defines TEXT fields
    fn emit(&self, params: &SearchParams) -> SearchQuery {
        let mut query = SearchQuery::new();

        for (field, value) in &params.number_filters {
            query.filter_int(field, &[*value]);
        }
        for (field, values) in &params.array_number_filters {
            query.filter_int(field, values);
        }
        for (field, range) in &params.range_number_filters {
            query.filter_int_min_max(field, range.min, range.max);
        }
        for (field, value) in &params.date_time_filters {
            query.filter_date_time(field, *value);
        }
        for (field, value) in &params.date_filters {
            query.filter_date(field, *value);
        }
        for (field, range) in &params.range_date_time_filters {
            query.filter_date_time_min_max(field, range.min, range.max);
        }
        for (field, range) in &params.range_date_filters {
            query.filter_date_min_max(field, range.min, range.max);
        }
        for (field, value) in &params.tag_filters {
            query.filter_tag(field, &[value]);
        }
        for (field, value) in &params.string_filters {
            query.query_field_prefix_match(field, value);
        }
        for (field, values) in &params.array_string_filters {
            query.filter_tag(field, values.as_slice());
        }
        for (field, value) in &params.boolean_filters {
            query.filter_bool(field, *value);
        }

        let or_statements: Vec<String> = params
            .string_or_filters
            .iter()
            .filter_map(|(field, value)| {
                let value = value.trim();
                if value.is_empty() {
                    return None;
                }
                Some(format!("(@{}:{}*)", field, escape_search_string(value)))
            })
            .collect();
        if !or_statements.is_empty() {
            query.append_query_raw(format!("({})", or_statements.join("|")));
        }

        if let Some(sort) = &params.sort {
            query.sort(&sort.field, !sort.ascending);
        }

        query
    }
}

/// Short form of `SearchQueryEmitter.emit(params)`
pub fn to_search_query(params: &SearchParams) -> SearchQuery {
    SearchQueryEmitter.emit(params)
}
