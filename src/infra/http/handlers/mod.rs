pub mod accounts;
pub mod blog;
pub mod catalog;
