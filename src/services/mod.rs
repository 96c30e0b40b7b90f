//! Business services behind the HTTP layer: the checkout workflow and its
//! collaborators (payment gateway, reconciliation, notifications, auth).

pub mod auth;
pub mod checkout;
pub mod gateway;
pub mod history;
pub mod notifier;
pub mod reconciliation;

#[cfg(test)]
pub mod test_support;
