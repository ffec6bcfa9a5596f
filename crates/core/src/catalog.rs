//! Filtering, searching, sorting and paging of book listings.
//!
//! The backend returns every listing from `GET /product`; browsing happens
//! on the storefront side over that list.

use std::str::FromStr;

use serde::Serialize;

use crate::models::Product;

/// Listings per catalog page.
pub const PAGE_SIZE: usize = 6;

/// Listings shown in the home page "new arrivals" strip.
pub const NEW_ARRIVALS: usize = 3;

pub const CONDITIONS: &[&str] = &["Excellent", "Good", "Fair"];

pub const CLASS_TYPES: &[&str] = &[
    "B.Tech",
    "B.Sc",
    "B.Com",
    "BA",
    "Class 12",
    "Class 11",
    "Class 10",
    "Other",
];

pub const CATEGORIES: &[&str] = &[
    "Reading Books (Novels)",
    "Exam/Test Preparation Books",
    "Class 1-12",
    "Degree Books",
    "Competitive Exams",
    "Other",
];

/// A multi-select filter on the catalog page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Condition,
    ClassType,
    Category,
}

impl FilterField {
    pub const ALL: [Self; 3] = [Self::Condition, Self::ClassType, Self::Category];

    /// Query-string key.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Condition => "condition",
            Self::ClassType => "classType",
            Self::Category => "category",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Condition => "Condition",
            Self::ClassType => "Class Type",
            Self::Category => "Category",
        }
    }

    #[must_use]
    pub const fn options(&self) -> &'static [&'static str] {
        match self {
            Self::Condition => CONDITIONS,
            Self::ClassType => CLASS_TYPES,
            Self::Category => CATEGORIES,
        }
    }

    fn value_of<'a>(&self, product: &'a Product) -> &'a str {
        match self {
            Self::Condition => &product.condition,
            Self::ClassType => &product.class_type,
            Self::Category => &product.category,
        }
    }
}

/// Catalog sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortOption {
    #[default]
    Newest,
    Oldest,
    PriceLow,
    PriceHigh,
}

impl SortOption {
    pub const ALL: [Self; 4] = [Self::Newest, Self::Oldest, Self::PriceLow, Self::PriceHigh];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Newest => "Newest First",
            Self::Oldest => "Oldest First",
            Self::PriceLow => "Price: Low to High",
            Self::PriceHigh => "Price: High to Low",
        }
    }

    fn sort(self, books: &mut [&Product]) {
        match self {
            Self::Newest => books.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            Self::Oldest => books.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            Self::PriceLow => books.sort_by(|a, b| a.final_price.cmp(&b.final_price)),
            Self::PriceHigh => books.sort_by(|a, b| b.final_price.cmp(&a.final_price)),
        }
    }
}

impl FromStr for SortOption {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|option| option.as_str() == s)
            .ok_or(())
    }
}

/// What the shopper asked the catalog page for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookQuery {
    pub conditions: Vec<String>,
    pub class_types: Vec<String>,
    pub categories: Vec<String>,
    pub search: Option<String>,
    pub sort: SortOption,
    /// 1-based page number.
    pub page: usize,
}

impl Default for BookQuery {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            class_types: Vec::new(),
            categories: Vec::new(),
            search: None,
            sort: SortOption::default(),
            page: 1,
        }
    }
}

impl BookQuery {
    /// Build a query from decoded query-string pairs.
    ///
    /// Filter keys may repeat. Unknown keys and unparseable values are
    /// ignored, and the page is clamped to at least 1.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "condition" => query.conditions.push(value.to_string()),
                "classType" => query.class_types.push(value.to_string()),
                "category" => query.categories.push(value.to_string()),
                "search" => query.search = Some(value.to_string()),
                "sort" => query.sort = value.parse().unwrap_or_default(),
                "page" => query.page = value.parse().unwrap_or(1).max(1),
                _ => {}
            }
        }
        query
    }

    /// Query-string pairs for this query at another page.
    #[must_use]
    pub fn pairs_for_page(&self, page: usize) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        for field in FilterField::ALL {
            for value in self.selected(field) {
                pairs.push((field.key(), value.clone()));
            }
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if self.sort != SortOption::default() {
            pairs.push(("sort", self.sort.as_str().to_string()));
        }
        if page > 1 {
            pairs.push(("page", page.to_string()));
        }
        pairs
    }

    /// Values selected for a filter.
    #[must_use]
    pub fn selected(&self, field: FilterField) -> &[String] {
        match field {
            FilterField::Condition => &self.conditions,
            FilterField::ClassType => &self.class_types,
            FilterField::Category => &self.categories,
        }
    }

    /// Whether a filter option is ticked (case-insensitive).
    #[must_use]
    pub fn is_selected(&self, field: FilterField, option: &str) -> bool {
        self.selected(field)
            .iter()
            .any(|value| value.eq_ignore_ascii_case(option))
    }

    /// Whether a listing passes every active filter and the search term.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let filters_match = FilterField::ALL.into_iter().all(|field| {
            let selected = self.selected(field);
            selected.is_empty()
                || selected
                    .iter()
                    .any(|value| value.eq_ignore_ascii_case(field.value_of(product)))
        });
        filters_match && self.search.as_deref().is_none_or(|term| search_matches(product, term))
    }

    /// Filter, sort and slice the listings into the requested page.
    #[must_use]
    pub fn apply(&self, products: &[Product]) -> BookPage {
        let mut matching: Vec<&Product> = products.iter().filter(|p| self.matches(p)).collect();
        self.sort.sort(&mut matching);

        let page = self.page.max(1);
        let total_results = matching.len();
        let total_pages = total_results.div_ceil(PAGE_SIZE);
        let books = matching
            .into_iter()
            .skip(page.saturating_sub(1).saturating_mul(PAGE_SIZE))
            .take(PAGE_SIZE)
            .cloned()
            .collect();

        BookPage {
            books,
            page,
            total_pages,
            total_results,
        }
    }
}

fn search_matches(product: &Product, term: &str) -> bool {
    let term = term.to_lowercase();
    [
        &product.title,
        &product.author,
        &product.category,
        &product.subject,
    ]
    .into_iter()
    .any(|field| field.to_lowercase().contains(&term))
}

/// One page of catalog results.
#[derive(Debug, Clone, PartialEq)]
pub struct BookPage {
    pub books: Vec<Product>,
    pub page: usize,
    pub total_pages: usize,
    pub total_results: usize,
}

impl BookPage {
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// The most recently listed books, newest first.
#[must_use]
pub fn newest(products: &[Product], limit: usize) -> Vec<Product> {
    let mut books: Vec<&Product> = products.iter().collect();
    SortOption::Newest.sort(&mut books);
    books.into_iter().take(limit).cloned().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::pricing::ShippingCharge;
    use crate::types::{Price, ProductId};

    fn book(id: &str, title: &str, condition: &str, final_price: i64, day: u32) -> Product {
        Product {
            id: ProductId::new(id),
            title: title.to_string(),
            images: vec![],
            subject: "Mathematics".to_string(),
            category: "Degree Books".to_string(),
            condition: condition.to_string(),
            class_type: "B.Sc".to_string(),
            price: Price::rupees(500),
            final_price: Price::rupees(final_price),
            shipping_charge: ShippingCharge::Free,
            author: "R. D. Sharma".to_string(),
            edition: None,
            description: None,
            seller: None,
            payment_mode: None,
            payment_details: None,
            created_at: Some(Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap()),
        }
    }

    fn shelf() -> Vec<Product> {
        vec![
            book("p1", "Linear Algebra", "Good", 300, 1),
            book("p2", "Calculus", "excellent", 150, 3),
            book("p3", "Real Analysis", "Fair", 220, 2),
        ]
    }

    #[test]
    fn test_from_pairs_collects_repeated_filters() {
        let query = BookQuery::from_pairs([
            ("condition", "Good"),
            ("condition", "Excellent"),
            ("sort", "price-high"),
            ("page", "0"),
            ("search", "  "),
            ("utm_source", "mail"),
        ]);
        assert_eq!(query.conditions, vec!["Good", "Excellent"]);
        assert_eq!(query.sort, SortOption::PriceHigh);
        assert_eq!(query.page, 1);
        assert_eq!(query.search, None);
    }

    #[test]
    fn test_filters_are_case_insensitive() {
        let query = BookQuery::from_pairs([("condition", "Excellent")]);
        let page = query.apply(&shelf());
        assert_eq!(page.total_results, 1);
        assert_eq!(page.books[0].id.as_str(), "p2");
    }

    #[test]
    fn test_search_covers_title_author_category_subject() {
        let shelf = shelf();
        for term in ["calc", "sharma", "degree", "MATHEMATICS"] {
            let query = BookQuery {
                search: Some(term.to_string()),
                ..BookQuery::default()
            };
            assert!(query.apply(&shelf).total_results >= 1, "term {term}");
        }
    }

    #[test]
    fn test_sort_orders() {
        let shelf = shelf();
        let ids = |sort| {
            let query = BookQuery {
                sort,
                ..BookQuery::default()
            };
            query
                .apply(&shelf)
                .books
                .into_iter()
                .map(|b| b.id.to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(SortOption::Newest), ["p2", "p3", "p1"]);
        assert_eq!(ids(SortOption::Oldest), ["p1", "p3", "p2"]);
        assert_eq!(ids(SortOption::PriceLow), ["p2", "p3", "p1"]);
        assert_eq!(ids(SortOption::PriceHigh), ["p1", "p3", "p2"]);
    }

    #[test]
    fn test_pagination() {
        let shelf: Vec<Product> = (1..=14)
            .map(|day| book(&format!("p{day}"), "Book", "Good", 100, day))
            .collect();
        let query = BookQuery {
            page: 3,
            ..BookQuery::default()
        };
        let page = query.apply(&shelf);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.books.len(), 2);
        assert!(page.has_previous());
        assert!(!page.has_next());
    }

    #[test]
    fn test_page_zero_is_the_first_page() {
        let query = BookQuery {
            page: 0,
            ..BookQuery::default()
        };
        let page = query.apply(&shelf());
        assert_eq!(page.page, 1);
        assert_eq!(page.books.len(), 3);
        assert!(!page.has_previous());
    }

    #[test]
    fn test_pairs_for_page_round_trips_filters() {
        let query = BookQuery::from_pairs([("category", "Other"), ("sort", "oldest")]);
        let pairs = query.pairs_for_page(2);
        assert_eq!(
            pairs,
            vec![
                ("category", "Other".to_string()),
                ("sort", "oldest".to_string()),
                ("page", "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_newest() {
        let books = newest(&shelf(), 2);
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].id.as_str(), "p2");
    }
}
