//! Data structures representing database entities.

pub mod category;
pub mod inquiry;
pub mod order;
pub mod product;
pub mod purchase_log;
pub mod review;
pub mod user;

pub use category::Category;
pub use inquiry::Inquiry;
pub use order::{Order, OrderLine, OrderStatus};
pub use product::Product;
pub use purchase_log::PurchaseLog;
pub use review::Review;
pub use user::User;
