use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::column::ColumnSchema;
use super::error::FilterError;
use super::types::{FilterType, ListRequest, Range, SearchParams, SearchValue, SortEntry};

/// Millisecond timestamp with offset, e.g. `2021-05-10T10:00:00.000+02:00`
const DATE_TIME_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S.%3f%:z";
/// Same layout with a literal UTC designator, e.g. `2021-05-10T10:00:00.000Z`
const DATE_TIME_LAYOUT_UTC: &str = "%Y-%m-%dT%H:%M:%S.%3fZ";
const DATE_LAYOUT: &str = "%Y-%m-%d";

const MIN_OR_SEARCH_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub default_page_size: u32,
    pub max_page_size: Option<u32>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: None,
        }
    }
}

impl NormalizeOptions {
    pub fn from_config(config: &crate::config::ListConfig) -> Self {
        Self {
            default_page_size: config.default_page_size.max(1),
            max_page_size: config.max_page_size,
        }
    }
}

/// A value that has the right structure for its column but cannot be parsed.
struct Malformed {
    value: String,
    expected: &'static str,
}

impl Malformed {
    fn new(value: &SearchValue, expected: &'static str) -> Self {
        let value = serde_json::to_string(value).unwrap_or_else(|_| format!("{:?}", value));
        Self { value, expected }
    }
}

/// Turns a loosely typed [`ListRequest`] into [`SearchParams`] for one column schema.
pub struct Normalizer<'a> {
    schema: &'a ColumnSchema,
    options: NormalizeOptions,
}

impl<'a> Normalizer<'a> {
    pub fn new(schema: &'a ColumnSchema) -> Self {
        Self { schema, options: NormalizeOptions::default() }
    }

    pub fn with_options(mut self, options: NormalizeOptions) -> Self {
        self.options = options;
        self
    }

    /// Never fails. Anything that does not fit the schema is left out, including
    /// filters with unparseable values.
    pub fn normalize(&self, request: &ListRequest) -> SearchParams {
        let mut params = self.pagination(request);

        for (field, value) in &request.search {
            if let Err(malformed) = self.apply_search(&mut params, field, value) {
                tracing::debug!(
                    field = %field,
                    value = %malformed.value,
                    "dropping filter: expected {}",
                    malformed.expected
                );
            }
        }

        self.apply_search_or(&mut params, request);
        self.apply_sort(&mut params, request);
        params
    }

    /// Like [`normalize`](Self::normalize) but an unparseable value for a known
    /// column is an error instead of an omitted filter.
    pub fn try_normalize(&self, request: &ListRequest) -> Result<SearchParams, FilterError> {
        let mut params = self.pagination(request);

        for (field, value) in &request.search {
            self.apply_search(&mut params, field, value).map_err(|m| FilterError::InvalidValue {
                field: field.clone(),
                value: m.value,
                expected: m.expected,
            })?;
        }

        self.apply_search_or(&mut params, request);
        self.apply_sort(&mut params, request);
        Ok(params)
    }

    fn pagination(&self, request: &ListRequest) -> SearchParams {
        let page = positive(request.page).unwrap_or(1);
        let mut page_size = positive(request.page_size).unwrap_or(self.options.default_page_size);

        if let Some(max) = self.options.max_page_size {
            if page_size > max {
                tracing::warn!("Page size {} exceeds max {}, capping to max", page_size, max);
                page_size = max;
            }
        }

        SearchParams { page, page_size, ..Default::default() }
    }

    /// Stores `value` in the bucket of `field`'s column. Type mismatches and
    /// unknown fields are skipped, unparseable values are reported.
    fn apply_search(&self, params: &mut SearchParams, field: &str, value: &SearchValue) -> Result<(), Malformed> {
        let Some(filter_type) = self.schema.filter_type(field) else {
            return Ok(());
        };
        let key = field.to_string();

        match (filter_type, value) {
            (FilterType::Number, SearchValue::Integer(i)) => {
                params.number_filters.insert(key, *i);
            }
            (FilterType::Number, SearchValue::Float(f)) if f.is_finite() => {
                params.number_filters.insert(key, f.trunc() as i64);
            }
            (FilterType::Number, SearchValue::Text(s)) => {
                if let Ok(i) = s.parse::<i64>() {
                    params.number_filters.insert(key, i);
                }
            }

            (FilterType::SelectInt, SearchValue::Integer(_) | SearchValue::Float(_)) => {
                let number = match value {
                    SearchValue::Integer(i) => *i,
                    SearchValue::Float(f) if f.is_finite() => f.trunc() as i64,
                    _ => return Ok(()),
                };
                let declared = self
                    .schema
                    .int_options(field)
                    .iter()
                    .any(|option| i64::try_from(option.key) == Ok(number));
                if declared {
                    params.number_filters.insert(key, number);
                }
            }

            (FilterType::Boolean, SearchValue::Bool(b)) => {
                params.boolean_filters.insert(key, *b);
            }

            (FilterType::RangeNumber, SearchValue::List(items)) => {
                if let Some((min, max)) = pair(items) {
                    let range = Range::new(parse_int(min)?, parse_int(max)?);
                    params.range_number_filters.insert(key, range);
                }
            }
            (FilterType::RangeDateTime, SearchValue::List(items)) => {
                if let Some((min, max)) = pair(items) {
                    let range = Range::new(parse_date_time(min)?, parse_date_time(max)?);
                    params.range_date_time_filters.insert(key, range);
                }
            }
            (FilterType::RangeDate, SearchValue::List(items)) => {
                if let Some((min, max)) = pair(items) {
                    let range = Range::new(parse_date(min)?, parse_date(max)?);
                    params.range_date_filters.insert(key, range);
                }
            }
            (FilterType::ArrayNumber, SearchValue::List(items)) if !items.is_empty() => {
                let numbers = items.iter().map(parse_int).collect::<Result<Vec<_>, _>>()?;
                params.array_number_filters.insert(key, numbers);
            }
            (FilterType::ArrayString, SearchValue::List(items)) if !items.is_empty() => {
                let mut strings = Vec::with_capacity(items.len());
                for item in items {
                    let text = item.to_text().ok_or_else(|| Malformed::new(item, "a string or number"))?;
                    // an empty tag is not valid index syntax
                    if !text.trim().is_empty() {
                        strings.push(text);
                    }
                }
                if !strings.is_empty() {
                    params.array_string_filters.insert(key, strings);
                }
            }

            (_, SearchValue::Text(s)) if s.is_empty() => {}
            (FilterType::DateTime, SearchValue::Text(_)) => {
                params.date_time_filters.insert(key, parse_date_time(value)?);
            }
            (FilterType::Date, SearchValue::Text(_)) => {
                params.date_filters.insert(key, parse_date(value)?);
            }
            (FilterType::SelectString, SearchValue::Text(s)) => {
                if self.schema.string_options(field).iter().any(|option| &option.key == s) {
                    params.tag_filters.insert(key, s.clone());
                }
            }
            (FilterType::String, SearchValue::Text(s)) => {
                params.string_filters.insert(key, s.clone());
            }

            _ => {}
        }

        Ok(())
    }

    fn apply_search_or(&self, params: &mut SearchParams, request: &ListRequest) {
        for (field, value) in &request.search_or {
            let Some(s) = value.as_text() else { continue };
            if s.len() < MIN_OR_SEARCH_LEN {
                continue;
            }
            if self.schema.filter_type(field) == Some(FilterType::String) {
                params.string_or_filters.insert(field.clone(), s.to_string());
            }
        }
    }

    fn apply_sort(&self, params: &mut SearchParams, request: &ListRequest) {
        if request.sort.len() != 1 {
            return;
        }
        for (field, mode) in &request.sort {
            let ascending = match mode.as_text() {
                Some("asc") => true,
                Some("desc") => false,
                _ => continue,
            };
            if self.schema.is_sortable(field) {
                params.sort = Some(SortEntry { field: field.clone(), ascending });
            }
        }
    }
}

/// Short form of `Normalizer::new(schema).normalize(request)`
pub fn normalize(schema: &ColumnSchema, request: &ListRequest) -> SearchParams {
    Normalizer::new(schema).normalize(request)
}

fn positive(value: Option<i64>) -> Option<u32> {
    value.filter(|v| *v > 0).map(|v| u32::try_from(v).unwrap_or(u32::MAX))
}

fn pair(items: &[SearchValue]) -> Option<(&SearchValue, &SearchValue)> {
    match items {
        [min, max] => Some((min, max)),
        _ => None,
    }
}

fn parse_int(value: &SearchValue) -> Result<i64, Malformed> {
    value.to_i64().ok_or_else(|| Malformed::new(value, "an integer"))
}

fn parse_date_time(value: &SearchValue) -> Result<DateTime<Utc>, Malformed> {
    let expected = "a timestamp like 2006-01-02T15:04:05.000Z";
    let s = value.as_text().ok_or_else(|| Malformed::new(value, expected))?;

    let parsed = if s.ends_with('Z') {
        NaiveDateTime::parse_from_str(s, DATE_TIME_LAYOUT_UTC).map(|naive| naive.and_utc())
    } else {
        DateTime::parse_from_str(s, DATE_TIME_LAYOUT).map(|dt| dt.with_timezone(&Utc))
    };
    parsed.map_err(|_| Malformed::new(value, expected))
}

fn parse_date(value: &SearchValue) -> Result<NaiveDate, Malformed> {
    let expected = "a date like 2006-01-02";
    value
        .as_text()
        .and_then(|s| NaiveDate::parse_from_str(s, DATE_LAYOUT).ok())
        .ok_or_else(|| Malformed::new(value, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crud::types::Column;
    use chrono::TimeZone;
    use serde_json::json;

    fn schema() -> ColumnSchema {
        ColumnSchema::new(vec![
            Column::new("name", "Name").search(FilterType::String).sortable(),
            Column::new("age", "Age").search(FilterType::Number).sortable(),
            Column::new("price", "Price").search(FilterType::RangeNumber),
            Column::new("ids", "IDs").search(FilterType::ArrayNumber),
            Column::new("labels", "Labels").search(FilterType::ArrayString),
            Column::new("active", "Active").search(FilterType::Boolean),
            Column::new("created_at", "Created").search(FilterType::DateTime),
            Column::new("updated_at", "Updated").search(FilterType::RangeDateTime),
            Column::new("birthday", "Birthday").search(FilterType::Date),
            Column::new("period", "Period").search(FilterType::RangeDate),
            Column::new("status", "Status")
                .search(FilterType::SelectString)
                .string_options([("active", "Active"), ("blocked", "Blocked")]),
            Column::new("kind", "Kind")
                .search(FilterType::SelectInt)
                .int_options([(1, "Personal"), (2, "Business")]),
            Column::new("email", "Email").sortable(),
        ])
        .unwrap()
    }

    fn request(value: serde_json::Value) -> ListRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_pagination_defaults() {
        let schema = schema();
        let params = normalize(&schema, &request(json!({})));
        assert_eq!((params.page, params.page_size), (1, 20));

        let params = normalize(&schema, &request(json!({"page": 0, "pageSize": -5})));
        assert_eq!((params.page, params.page_size), (1, 20));

        let params = normalize(&schema, &request(json!({"page": 3, "pageSize": 50})));
        assert_eq!((params.page, params.page_size), (3, 50));
    }

    #[test]
    fn test_page_size_cap() {
        let schema = schema();
        let options = NormalizeOptions { default_page_size: 10, max_page_size: Some(100) };
        let normalizer = Normalizer::new(&schema).with_options(options);

        assert_eq!(normalizer.normalize(&request(json!({}))).page_size, 10);
        assert_eq!(normalizer.normalize(&request(json!({"pageSize": 500}))).page_size, 100);
    }

    #[test]
    fn test_number_filter_variants() {
        let schema = schema();
        let params = normalize(&schema, &request(json!({"search": {"age": 30.0}})));
        assert_eq!(params.number_filters.get("age"), Some(&30));

        let params = normalize(&schema, &request(json!({"search": {"age": "42"}})));
        assert_eq!(params.number_filters.get("age"), Some(&42));

        let params = normalize(&schema, &request(json!({"search": {"age": "forty"}})));
        assert!(params.number_filters.is_empty());
        assert!(params.string_filters.is_empty());
    }

    #[test]
    fn test_select_int_requires_declared_key() {
        let schema = schema();
        let params = normalize(&schema, &request(json!({"search": {"kind": 2}})));
        assert_eq!(params.number_filters.get("kind"), Some(&2));

        let params = normalize(&schema, &request(json!({"search": {"kind": 7}})));
        assert!(params.number_filters.is_empty());
    }

    #[test]
    fn test_select_string_requires_declared_key() {
        let schema = schema();
        let params = normalize(&schema, &request(json!({"search": {"status": "blocked"}})));
        assert_eq!(params.tag_filters.get("status").map(String::as_str), Some("blocked"));

        let params = normalize(&schema, &request(json!({"search": {"status": "deleted"}})));
        assert!(params.tag_filters.is_empty());
        assert!(params.string_filters.is_empty());
    }

    #[test]
    fn test_range_requires_two_elements() {
        let schema = schema();
        let params = normalize(&schema, &request(json!({"search": {"price": [10, "20"]}})));
        assert_eq!(params.range_number_filters.get("price"), Some(&Range::new(10, 20)));

        for bad in [json!([10]), json!([1, 2, 3]), json!([])] {
            let params = normalize(&schema, &request(json!({"search": {"price": bad}})));
            assert!(params.range_number_filters.is_empty());
        }
    }

    #[test]
    fn test_malformed_range_bound_is_dropped_or_rejected() {
        let schema = schema();
        let req = request(json!({"search": {"price": [10, "lots"], "age": 3}}));

        let params = normalize(&schema, &req);
        assert!(params.range_number_filters.is_empty());
        assert_eq!(params.number_filters.get("age"), Some(&3));

        let err = Normalizer::new(&schema).try_normalize(&req).unwrap_err();
        match err {
            FilterError::InvalidValue { field, value, .. } => {
                assert_eq!(field, "price");
                assert_eq!(value, "\"lots\"");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_temporal_filters() {
        let schema = schema();
        let params = normalize(
            &schema,
            &request(json!({"search": {
                "created_at": "2021-05-10T10:00:00.000Z",
                "updated_at": ["2021-05-10T10:00:00.000+02:00", "2021-05-11T10:00:00.500Z"],
                "birthday": "1990-02-03",
                "period": ["2021-01-01", "2021-12-31"]
            }})),
        );

        assert_eq!(
            params.date_time_filters.get("created_at"),
            Some(&Utc.with_ymd_and_hms(2021, 5, 10, 10, 0, 0).unwrap())
        );
        let range = params.range_date_time_filters.get("updated_at").unwrap();
        assert_eq!(range.min, Utc.with_ymd_and_hms(2021, 5, 10, 8, 0, 0).unwrap());
        assert_eq!(range.max.timestamp_subsec_millis(), 500);
        assert_eq!(params.date_filters.get("birthday"), NaiveDate::from_ymd_opt(1990, 2, 3).as_ref());
        assert_eq!(
            params.range_date_filters.get("period"),
            Some(&Range::new(
                NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2021, 12, 31).unwrap()
            ))
        );
    }

    #[test]
    fn test_date_time_without_millis_is_malformed() {
        let schema = schema();
        let req = request(json!({"search": {"created_at": "2021-05-10T10:00:00Z"}}));

        assert!(normalize(&schema, &req).date_time_filters.is_empty());
        assert!(Normalizer::new(&schema).try_normalize(&req).is_err());
    }

    #[test]
    fn test_arrays() {
        let schema = schema();
        let params = normalize(
            &schema,
            &request(json!({"search": {"ids": [1, "2", 3.0], "labels": ["a", 1, true]}})),
        );
        assert_eq!(params.array_number_filters.get("ids"), Some(&vec![1, 2, 3]));
        assert_eq!(
            params.array_string_filters.get("labels"),
            Some(&vec!["a".to_string(), "1".to_string(), "true".to_string()])
        );

        let params = normalize(&schema, &request(json!({"search": {"ids": [], "labels": []}})));
        assert!(params.array_number_filters.is_empty());
        assert!(params.array_string_filters.is_empty());
    }

    #[test]
    fn test_blank_array_string_items_are_skipped() {
        let schema = schema();
        let params = normalize(&schema, &request(json!({"search": {"labels": ["", "a", "  "]}})));
        assert_eq!(params.array_string_filters.get("labels"), Some(&vec!["a".to_string()]));

        let params = normalize(&schema, &request(json!({"search": {"labels": ["", " "]}})));
        assert!(params.array_string_filters.is_empty());
    }

    #[test]
    fn test_type_mismatch_and_unknown_fields_are_dropped() {
        let schema = schema();
        let req = request(json!({"search": {
            "active": "yes",
            "name": ["a"],
            "email": "x@y.z",
            "ghost": "boo",
            "age": null,
            "price": {"min": 1}
        }}));

        assert!(normalize(&schema, &req).shapes().is_empty());
        assert!(Normalizer::new(&schema).try_normalize(&req).is_ok());
    }

    #[test]
    fn test_empty_string_dropped() {
        let schema = schema();
        let params = normalize(&schema, &request(json!({"search": {"name": "", "created_at": ""}})));
        assert!(params.string_filters.is_empty());
        assert!(params.date_time_filters.is_empty());
    }

    #[test]
    fn test_search_or() {
        let schema = schema();
        let params = normalize(
            &schema,
            &request(json!({"searchOR": {"name": "ab", "status": "active", "age": 12}})),
        );
        assert_eq!(params.string_or_filters.len(), 1);
        assert_eq!(params.string_or_filters.get("name").map(String::as_str), Some("ab"));

        let params = normalize(&schema, &request(json!({"searchOR": {"name": "a"}})));
        assert!(params.string_or_filters.is_empty());

        // minimum length is in bytes
        let params = normalize(&schema, &request(json!({"searchOR": {"name": "é"}})));
        assert_eq!(params.string_or_filters.get("name").map(String::as_str), Some("é"));
    }

    #[test]
    fn test_sort() {
        let schema = schema();
        let params = normalize(&schema, &request(json!({"sort": {"name": "asc"}})));
        assert_eq!(params.sort, Some(SortEntry { field: "name".into(), ascending: true }));

        let params = normalize(&schema, &request(json!({"sort": {"email": "desc"}})));
        assert_eq!(params.sort, Some(SortEntry { field: "email".into(), ascending: false }));

        for sort in [
            json!({"name": "bogus"}),
            json!({"name": "ASC"}),
            json!({"name": "asc", "age": "desc"}),
            json!({"price": "asc"}),
            json!({"name": 1}),
        ] {
            let params = normalize(&schema, &request(json!({ "sort": sort })));
            assert_eq!(params.sort, None, "sort accepted");
        }
    }
}
