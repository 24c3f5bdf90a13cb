//! Client-side filtering and ordering of loaded list rows.

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};
use shared::protocol::DecompositionPlan;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: String,
    #[serde(default)]
    pub descending: bool,
}

impl SortOrder {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Current filter inputs of a page.
///
/// `status` and every entry of `filters` are categorical: an empty value
/// means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub search: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
}

impl FilterCriteria {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Trimmed search text, `None` when blank.
    pub fn keyword(&self) -> Option<&str> {
        let trimmed = self.search.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Non-blank categorical constraints, `status` first.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &str)> {
        self.status
            .iter()
            .map(|status| ("status", status.as_str()))
            .chain(self.filters.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .filter(|(_, value)| !value.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Int(i64),
    Text(String),
}

/// Row types that can be projected through [`derive`].
pub trait Filterable {
    /// Keys [`Filterable::category`] can answer. Other keys are left to the
    /// backend and do not narrow rows locally.
    const CATEGORY_KEYS: &'static [&'static str];

    fn searchable_fields(&self) -> Vec<&str>;
    fn category(&self, key: &str) -> Option<&str>;
    fn sort_value(&self, field: &str) -> Option<SortValue>;
}

impl Filterable for DecompositionPlan {
    const CATEGORY_KEYS: &'static [&'static str] = &["status", "department", "operator"];

    fn searchable_fields(&self) -> Vec<&str> {
        let mut fields = vec![
            self.plan_no.as_str(),
            self.asset_code.as_str(),
            self.asset_name.as_str(),
        ];
        fields.extend(
            [&self.department, &self.operator, &self.remark]
                .into_iter()
                .flatten()
                .map(String::as_str),
        );
        fields
    }

    fn category(&self, key: &str) -> Option<&str> {
        match key {
            "status" => Some(self.status.as_str()),
            "department" => self.department.as_deref(),
            "operator" => self.operator.as_deref(),
            _ => None,
        }
    }

    fn sort_value(&self, field: &str) -> Option<SortValue> {
        match field {
            "id" => Some(SortValue::Int(self.id.0)),
            "created_at" => Some(SortValue::Int(self.created_at.timestamp_millis())),
            "plan_no" => Some(SortValue::Text(self.plan_no.clone())),
            "asset_code" => Some(SortValue::Text(self.asset_code.clone())),
            "asset_name" => Some(SortValue::Text(self.asset_name.to_lowercase())),
            "status" => Some(SortValue::Text(self.status.as_str().to_string())),
            "department" => self.department.as_ref().map(|d| SortValue::Text(d.to_lowercase())),
            _ => None,
        }
    }
}

/// Returns the rows of `items` matching `criteria`, in criteria order.
///
/// Search is a case-insensitive substring match over any searchable field.
/// Categorical filters apply only to keys the row type knows; a known key
/// with no value on a row excludes that row. Rows without a value for the
/// sort field go last; ties keep input order.
pub fn derive<T: Filterable + Clone>(items: &[T], criteria: &FilterCriteria) -> Vec<T> {
    let needle = criteria.keyword().map(str::to_lowercase);
    let categories: Vec<(&str, &str)> = criteria
        .categories()
        .filter(|(key, _)| T::CATEGORY_KEYS.iter().any(|known| known == key))
        .collect();

    let mut rows: Vec<T> = items
        .iter()
        .filter(|item| matches_search(*item, needle.as_deref()))
        .filter(|item| {
            categories.iter().all(|(key, expected)| {
                item.category(key)
                    .is_some_and(|actual| actual.eq_ignore_ascii_case(expected.trim()))
            })
        })
        .cloned()
        .collect();

    if let Some(sort) = &criteria.sort {
        rows.sort_by(|a, b| {
            match (a.sort_value(&sort.field), b.sort_value(&sort.field)) {
                (Some(a), Some(b)) if sort.descending => b.cmp(&a),
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
    }

    rows
}

fn matches_search<T: Filterable>(item: &T, needle: Option<&str>) -> bool {
    let Some(needle) = needle else {
        return true;
    };
    item.searchable_fields()
        .into_iter()
        .any(|field| field.to_lowercase().contains(needle))
}

struct Memo<T> {
    items: Arc<Vec<T>>,
    criteria: FilterCriteria,
    rows: Arc<Vec<T>>,
}

/// Memoized [`derive`]: recomputes only when the item list is replaced or
/// the criteria value changes.
pub struct FilteredView<T> {
    memo: Option<Memo<T>>,
    recomputations: u64,
}

impl<T> Default for FilteredView<T> {
    fn default() -> Self {
        Self {
            memo: None,
            recomputations: 0,
        }
    }
}

impl<T: Filterable + Clone> FilteredView<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&mut self, items: &Arc<Vec<T>>, criteria: &FilterCriteria) -> Arc<Vec<T>> {
        if let Some(memo) = &self.memo {
            if Arc::ptr_eq(&memo.items, items) && memo.criteria == *criteria {
                return Arc::clone(&memo.rows);
            }
        }

        let rows = Arc::new(derive(items, criteria));
        self.recomputations += 1;
        self.memo = Some(Memo {
            items: Arc::clone(items),
            criteria: criteria.clone(),
            rows: Arc::clone(&rows),
        });
        rows
    }

    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}

#[cfg(test)]
#[path = "tests/filter_tests.rs"]
mod tests;
