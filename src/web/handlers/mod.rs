pub mod auth_handlers;
pub mod blog_handlers;
pub mod checkout_handlers;
pub mod contact_handlers;
pub mod order_handlers;
pub mod product_handlers;
pub mod review_handlers;
pub mod webhook_handlers;
