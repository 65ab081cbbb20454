pub mod accounts;
pub mod catalog;
pub mod crud;
pub mod engagement;
