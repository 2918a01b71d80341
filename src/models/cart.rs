use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Line item of a cart joined with product details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartItem {
    #[serde(rename = "Cart_ID")]
    pub cart_id: i64,
    #[serde(rename = "Product_ID")]
    pub product_id: i64,
    #[serde(rename = "Quantity")]
    pub quantity: i32,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Price")]
    pub price: Decimal,
}

/// A customer's cart as read inside one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    pub cart_id: i64,
    pub customer_id: i64,
    pub items: Vec<CartItem>,
}

/// Outcome of removing a line item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveItemOutcome {
    pub cart_id: i64,
    pub item_removed: bool,
    pub cart_deleted: bool,
}

/// Request model for adding an item to cart
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartItemRequest {
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Response model for `GET /api/cart/:customer_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub cart_id: i64,
    pub items: Vec<CartItem>,
    pub total_items: i64,
    pub total_price: Decimal,
}

/// Plain `{ message }` acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Cart {
    /// Get the total number of units in the cart
    pub fn total_items(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }

    /// Get the total price of all items in the cart
    pub fn total_price(&self) -> Decimal {
        self.items.iter().map(CartItem::total_price).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get_item(&self, product_id: i64) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    pub fn into_response(self) -> CartResponse {
        let total_items = self.total_items();
        let total_price = self.total_price();
        CartResponse {
            cart_id: self.cart_id,
            items: self.items,
            total_items,
            total_price,
        }
    }
}

impl CartItem {
    /// Get the total price for this line (price * quantity)
    pub fn total_price(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}
