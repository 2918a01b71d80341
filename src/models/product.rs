use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub category_id: i64,
    pub name: String,
}

/// Catalog product joined with its category name.
///
/// Field names on the wire follow the storefront page's existing contract,
/// which reads the column-style names (`Product_ID`, `Price`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    #[serde(rename = "Product_ID")]
    pub product_id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: Option<String>,
    #[serde(rename = "Price")]
    pub price: Decimal,
    #[serde(rename = "Category_ID")]
    pub category_id: i64,
    #[serde(rename = "Image_URL")]
    pub image_url: Option<String>,
    pub category_name: String,
}

/// Filters for querying the catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductFilters {
    pub category: Option<String>,
}

impl ProductFilters {
    /// Filter on an exact category name. Blank names mean "no filter".
    pub fn by_category(category: Option<String>) -> Self {
        Self {
            category: category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        }
    }

    pub fn is_filtered(&self) -> bool {
        self.category.is_some()
    }
}

/// Sample product used when seeding the catalog
#[derive(Debug, Clone)]
pub struct SeedProduct {
    pub name: &'static str,
    pub description: &'static str,
    pub price: Decimal,
    pub category: &'static str,
    pub image_url: Option<&'static str>,
}
