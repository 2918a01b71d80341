pub mod admin;
pub mod api;
pub mod auth;
pub mod frontend;
pub mod health;
pub mod metrics;
pub mod middleware;

pub use admin::*;
pub use api::*;
pub use auth::*;
pub use frontend::*;
pub use health::*;
pub use metrics::*;
pub use middleware::*;
