use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filter widget a listing column accepts. Decides which bucket of
/// [`SearchParams`](super::SearchParams) a search value lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    String,
    ArrayString,
    Boolean,
    RangeNumber,
    ArrayNumber,
    Number,
    SelectString,
    SelectInt,
    DateTime,
    Date,
    RangeDateTime,
    RangeDate,
}

impl FilterType {
    /// Bucket that accepted values of this type are stored in
    pub fn shape(self) -> FilterShape {
        match self {
            FilterType::String => FilterShape::StringPrefix,
            FilterType::ArrayString => FilterShape::ArrayString,
            FilterType::Boolean => FilterShape::Boolean,
            FilterType::RangeNumber => FilterShape::RangeNumber,
            FilterType::ArrayNumber => FilterShape::ArrayNumber,
            FilterType::Number | FilterType::SelectInt => FilterShape::Number,
            FilterType::SelectString => FilterShape::Tag,
            FilterType::DateTime => FilterShape::DateTime,
            FilterType::Date => FilterShape::Date,
            FilterType::RangeDateTime => FilterShape::RangeDateTime,
            FilterType::RangeDate => FilterShape::RangeDate,
        }
    }
}

/// One bucket of normalized filters. Emitters declare the shapes they can translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterShape {
    StringPrefix,
    StringOr,
    Tag,
    ArrayString,
    Number,
    ArrayNumber,
    RangeNumber,
    DateTime,
    Date,
    RangeDateTime,
    RangeDate,
    Boolean,
}

impl FilterShape {
    pub const ALL: [FilterShape; 12] = [
        FilterShape::StringPrefix,
        FilterShape::StringOr,
        FilterShape::Tag,
        FilterShape::ArrayString,
        FilterShape::Number,
        FilterShape::ArrayNumber,
        FilterShape::RangeNumber,
        FilterShape::DateTime,
        FilterShape::Date,
        FilterShape::RangeDateTime,
        FilterShape::RangeDate,
        FilterShape::Boolean,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterShape::StringPrefix => "string prefix",
            FilterShape::StringOr => "OR string",
            FilterShape::Tag => "tag",
            FilterShape::ArrayString => "string array",
            FilterShape::Number => "number",
            FilterShape::ArrayNumber => "number array",
            FilterShape::RangeNumber => "number range",
            FilterShape::DateTime => "datetime",
            FilterShape::Date => "date",
            FilterShape::RangeDateTime => "datetime range",
            FilterShape::RangeDate => "date range",
            FilterShape::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FilterShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringOption {
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntOption {
    pub key: u64,
    pub label: String,
}

/// Column of a listing screen as rendered by the frontend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub filter_type: Option<FilterType>,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub string_options: Vec<StringOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub int_options: Vec<IntOption>,
}

fn default_visible() -> bool {
    true
}

impl Column {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            filter_type: None,
            searchable: false,
            sortable: false,
            visible: true,
            string_options: vec![],
            int_options: vec![],
        }
    }

    /// Searchable column with the given filter widget
    pub fn search(mut self, filter_type: FilterType) -> Self {
        self.filter_type = Some(filter_type);
        self.searchable = true;
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn string_options<K, L>(mut self, options: impl IntoIterator<Item = (K, L)>) -> Self
    where
        K: Into<String>,
        L: Into<String>,
    {
        self.string_options = options
            .into_iter()
            .map(|(key, label)| StringOption { key: key.into(), label: label.into() })
            .collect();
        self
    }

    pub fn int_options<L: Into<String>>(mut self, options: impl IntoIterator<Item = (u64, L)>) -> Self {
        self.int_options = options
            .into_iter()
            .map(|(key, label)| IntOption { key, label: label.into() })
            .collect();
        self
    }
}

/// Search value as decoded from the request body.
///
/// JSON numbers that fit an `i64` become `Integer`, every other number is a `Float`.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<SearchValue>),
    Object(serde_json::Map<String, Value>),
}

impl SearchValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SearchValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer form of a scalar: integers, floats without a fractional part and integer strings
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            SearchValue::Integer(i) => Some(*i),
            SearchValue::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            SearchValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// String form of a scalar; `None` for nulls and containers
    pub fn to_text(&self) -> Option<String> {
        match self {
            SearchValue::Text(s) => Some(s.clone()),
            SearchValue::Integer(i) => Some(i.to_string()),
            SearchValue::Float(f) => Some(format_float(*f)),
            SearchValue::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// Shortest float form, switching to an exponent below 1e-4 and from 1e21 up
/// (`1e+21`, `1.5e-05`), matching what other services print for the same value.
fn format_float(f: f64) -> String {
    if f == 0.0 || !f.is_finite() {
        return f.to_string();
    }
    let sci = format!("{:e}", f);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return f.to_string();
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return f.to_string();
    };
    if (-4..21).contains(&exp) {
        f.to_string()
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    }
}

impl From<Value> for SearchValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => SearchValue::Null,
            Value::Bool(b) => SearchValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SearchValue::Integer(i),
                None => SearchValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => SearchValue::Text(s),
            Value::Array(items) => SearchValue::List(items.into_iter().map(SearchValue::from).collect()),
            Value::Object(obj) => SearchValue::Object(obj),
        }
    }
}

impl From<SearchValue> for Value {
    fn from(value: SearchValue) -> Self {
        match value {
            SearchValue::Null => Value::Null,
            SearchValue::Bool(b) => Value::Bool(b),
            SearchValue::Integer(i) => Value::from(i),
            SearchValue::Float(f) => Value::from(f),
            SearchValue::Text(s) => Value::String(s),
            SearchValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            SearchValue::Object(obj) => Value::Object(obj),
        }
    }
}

impl Serialize for SearchValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::from(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SearchValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(SearchValue::from)
    }
}

impl From<&str> for SearchValue {
    fn from(s: &str) -> Self {
        SearchValue::Text(s.to_string())
    }
}

impl From<i64> for SearchValue {
    fn from(i: i64) -> Self {
        SearchValue::Integer(i)
    }
}

impl From<f64> for SearchValue {
    fn from(f: f64) -> Self {
        SearchValue::Float(f)
    }
}

impl From<bool> for SearchValue {
    fn from(b: bool) -> Self {
        SearchValue::Bool(b)
    }
}

/// Listing request as posted by the frontend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub search: BTreeMap<String, SearchValue>,
    #[serde(default, rename = "searchOR", deserialize_with = "null_as_default")]
    pub search_or: BTreeMap<String, SearchValue>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sort: BTreeMap<String, SearchValue>,
}

/// Frontends send `null` for untouched filter maps
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ListRequest {
    pub fn search(mut self, field: impl Into<String>, value: impl Into<SearchValue>) -> Self {
        self.search.insert(field.into(), value.into());
        self
    }

    pub fn search_or(mut self, field: impl Into<String>, value: impl Into<SearchValue>) -> Self {
        self.search_or.insert(field.into(), value.into());
        self
    }

    pub fn sort(mut self, field: impl Into<String>, mode: impl Into<SearchValue>) -> Self {
        self.sort.insert(field.into(), mode.into());
        self
    }

    pub fn page(mut self, page: i64, page_size: i64) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }
}

/// Inclusive bounds, min first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range<T> {
    pub min: T,
    pub max: T,
}

impl<T> Range<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortEntry {
    pub field: String,
    pub ascending: bool,
}

/// Normalized listing filters, one map per filter shape
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchParams {
    pub page: u32,
    pub page_size: u32,
    pub string_or_filters: BTreeMap<String, String>,
    pub string_filters: BTreeMap<String, String>,
    pub tag_filters: BTreeMap<String, String>,
    pub array_string_filters: BTreeMap<String, Vec<String>>,
    pub number_filters: BTreeMap<String, i64>,
    pub array_number_filters: BTreeMap<String, Vec<i64>>,
    pub range_number_filters: BTreeMap<String, Range<i64>>,
    pub date_time_filters: BTreeMap<String, DateTime<Utc>>,
    pub date_filters: BTreeMap<String, NaiveDate>,
    pub range_date_time_filters: BTreeMap<String, Range<DateTime<Utc>>>,
    pub range_date_filters: BTreeMap<String, Range<NaiveDate>>,
    pub boolean_filters: BTreeMap<String, bool>,
    pub sort: Option<SortEntry>,
}

impl SearchParams {
    /// Every `(field, shape)` pair with a filter present
    pub fn shapes(&self) -> Vec<(&str, FilterShape)> {
        fn keys<'a, V>(map: &'a BTreeMap<String, V>, shape: FilterShape) -> impl Iterator<Item = (&'a str, FilterShape)> + 'a {
            map.keys().map(move |k| (k.as_str(), shape))
        }

        keys(&self.string_filters, FilterShape::StringPrefix)
            .chain(keys(&self.string_or_filters, FilterShape::StringOr))
            .chain(keys(&self.tag_filters, FilterShape::Tag))
            .chain(keys(&self.array_string_filters, FilterShape::ArrayString))
            .chain(keys(&self.number_filters, FilterShape::Number))
            .chain(keys(&self.array_number_filters, FilterShape::ArrayNumber))
            .chain(keys(&self.range_number_filters, FilterShape::RangeNumber))
            .chain(keys(&self.date_time_filters, FilterShape::DateTime))
            .chain(keys(&self.date_filters, FilterShape::Date))
            .chain(keys(&self.range_date_time_filters, FilterShape::RangeDateTime))
            .chain(keys(&self.range_date_filters, FilterShape::RangeDate))
            .chain(keys(&self.boolean_filters, FilterShape::Boolean))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes().is_empty() && self.sort.is_none()
    }

    /// Rows to skip for the current page
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}
