use serde::{Deserialize, Serialize};

use crate::models::StockStatus;

/// Active filters for an inventory table. Every field defaults to "no
/// constraint"; filtering is the conjunction of whatever is set, plus a
/// case-insensitive substring search over name and make/category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    pub make: Option<String>,
    pub color: Option<String>,
    pub category: Option<String>,
    pub supplier: Option<String>,
    pub status: Option<StockStatus>,
    pub search: String,
}

impl FilterSet {
    pub fn is_empty(&self) -> bool {
        *self == FilterSet::default()
    }

    pub(crate) fn matches_equality(&self, field: &Option<String>, value: &str) -> bool {
        match field.as_deref() {
            None | Some("") => true,
            Some(wanted) => wanted == value,
        }
    }

    pub(crate) fn matches_status(&self, status: StockStatus) -> bool {
        self.status.map_or(true, |wanted| wanted == status)
    }

    /// Case-insensitive substring match over the given haystacks. An empty
    /// search matches everything.
    pub(crate) fn matches_search(&self, haystacks: &[&str]) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        haystacks
            .iter()
            .any(|h| h.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filters_impose_no_constraint() {
        let filters = FilterSet::default();
        assert!(filters.is_empty());
        assert!(filters.matches_equality(&filters.make, "Toyota"));
        assert!(filters.matches_status(StockStatus::LowStock));
        assert!(filters.matches_search(&["anything"]));
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let filters = FilterSet {
            search: "ToYo".into(),
            ..Default::default()
        };
        assert!(filters.matches_search(&["City Sedan", "Toyota"]));
        assert!(!filters.matches_search(&["City Sedan", "Ford"]));
    }

    #[test]
    fn empty_string_filter_counts_as_unset() {
        let filters = FilterSet {
            make: Some(String::new()),
            ..Default::default()
        };
        assert!(filters.matches_equality(&filters.make, "Mazda"));
    }
}
