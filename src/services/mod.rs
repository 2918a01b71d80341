// Services module - business logic layer

pub mod auth_service;
pub mod cart_service;
pub mod catalog_service;

pub use auth_service::AuthService;
pub use cart_service::CartService;
pub use catalog_service::CatalogService;
