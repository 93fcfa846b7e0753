//! Paginated resource definitions.
//!
//! Every list screen of the back office is one instance of the same pattern:
//! an endpoint, a fixed page size, a response shape and a filter schema. The
//! schema is the complete set of parameters that may reach the wire; anything
//! else in the parameter set is ignored when building requests.

use backoffice_api_types::{
    CategoryRecord, NewsRecord, OrderRecord, OrderStatus, PageRecord, ProductRecord,
    RecipeRecord, RecruitmentRecord, RecruitmentStatus, UserRecord, UserRole,
};
use serde::{Serialize, de::DeserializeOwned};

/// Parameter key for the 1-based page cursor.
pub const PAGE_KEY: &str = "page";
pub const KEYWORD_KEY: &str = "keyword";
pub const STATUS_KEY: &str = "status";
pub const TYPE_KEY: &str = "type";
pub const CATEGORY_NAMES_KEY: &str = "categoryNames";
pub const ROLE_KEY: &str = "role";

/// How a list endpoint shapes its response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseShape {
    /// `{ content, totalElements, pageable: { pageNumber } }`
    Paged,
    /// A bare JSON array; pagination happens client-side.
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Free text committed explicitly.
    Text,
    /// One value out of a fixed option list.
    Select(&'static [&'static str]),
    /// Any subset of values, encoded as one delimited parameter.
    MultiSelect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterField {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FilterKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSpec {
    pub name: &'static str,
    pub endpoint: &'static str,
    pub page_size: u32,
    pub shape: ResponseShape,
    pub filters: &'static [FilterField],
}

impl ResourceSpec {
    pub fn filter(&self, key: &str) -> Option<&'static FilterField> {
        self.filters.iter().find(|field| field.key == key)
    }

    pub fn accepts(&self, key: &str) -> bool {
        self.filter(key).is_some()
    }

    pub fn item_path(&self, id: i64) -> String {
        format!("{}/{id}", self.endpoint)
    }
}

/// A back-office entity reachable through a paginated list endpoint.
pub trait Resource: Send + Sync + 'static {
    type Record: DeserializeOwned + Serialize + Clone + Send + Sync + 'static;

    const SPEC: ResourceSpec;
}

const KEYWORD: FilterField = FilterField {
    key: KEYWORD_KEY,
    label: "Keyword",
    kind: FilterKind::Text,
};

const CATEGORY_NAMES: FilterField = FilterField {
    key: CATEGORY_NAMES_KEY,
    label: "Categories",
    kind: FilterKind::MultiSelect,
};

pub const NEWS_TYPES: &[&str] = &["NEWS", "PROMOTION", "EVENT"];
pub const CATEGORY_TYPES: &[&str] = &["PRODUCT", "RECIPE", "NEWS"];

pub struct Orders;
pub struct Products;
pub struct Recipes;
pub struct News;
pub struct Categories;
pub struct Recruitment;
pub struct Users;
pub struct Pages;

impl Resource for Orders {
    type Record = OrderRecord;

    const SPEC: ResourceSpec = ResourceSpec {
        name: "orders",
        endpoint: "orders",
        page_size: 10,
        shape: ResponseShape::Paged,
        filters: &[
            KEYWORD,
            FilterField {
                key: STATUS_KEY,
                label: "Status",
                kind: FilterKind::Select(&OrderStatus::FILTERABLE),
            },
        ],
    };
}

impl Resource for Products {
    type Record = ProductRecord;

    const SPEC: ResourceSpec = ResourceSpec {
        name: "products",
        endpoint: "products",
        page_size: 10,
        shape: ResponseShape::Paged,
        filters: &[KEYWORD, CATEGORY_NAMES],
    };
}

impl Resource for Recipes {
    type Record = RecipeRecord;

    const SPEC: ResourceSpec = ResourceSpec {
        name: "recipes",
        endpoint: "recipes",
        page_size: 10,
        shape: ResponseShape::Paged,
        filters: &[KEYWORD, CATEGORY_NAMES],
    };
}

impl Resource for News {
    type Record = NewsRecord;

    const SPEC: ResourceSpec = ResourceSpec {
        name: "news",
        endpoint: "news",
        page_size: 10,
        shape: ResponseShape::Paged,
        filters: &[
            KEYWORD,
            FilterField {
                key: TYPE_KEY,
                label: "Type",
                kind: FilterKind::Select(NEWS_TYPES),
            },
            CATEGORY_NAMES,
        ],
    };
}

impl Resource for Categories {
    type Record = CategoryRecord;

    const SPEC: ResourceSpec = ResourceSpec {
        name: "categories",
        endpoint: "categories",
        page_size: 100,
        shape: ResponseShape::Flat,
        filters: &[
            KEYWORD,
            FilterField {
                key: TYPE_KEY,
                label: "Type",
                kind: FilterKind::Select(CATEGORY_TYPES),
            },
        ],
    };
}

impl Resource for Recruitment {
    type Record = RecruitmentRecord;

    const SPEC: ResourceSpec = ResourceSpec {
        name: "recruitment",
        endpoint: "recruitments",
        page_size: 10,
        shape: ResponseShape::Paged,
        filters: &[
            KEYWORD,
            FilterField {
                key: STATUS_KEY,
                label: "Status",
                kind: FilterKind::Select(&RecruitmentStatus::FILTERABLE),
            },
        ],
    };
}

impl Resource for Users {
    type Record = UserRecord;

    const SPEC: ResourceSpec = ResourceSpec {
        name: "users",
        endpoint: "users",
        page_size: 20,
        shape: ResponseShape::Paged,
        filters: &[
            KEYWORD,
            FilterField {
                key: ROLE_KEY,
                label: "Role",
                kind: FilterKind::Select(&UserRole::FILTERABLE),
            },
        ],
    };
}

impl Resource for Pages {
    type Record = PageRecord;

    const SPEC: ResourceSpec = ResourceSpec {
        name: "pages",
        endpoint: "pages",
        page_size: 100,
        shape: ResponseShape::Flat,
        filters: &[KEYWORD],
    };
}
