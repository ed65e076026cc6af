pub mod auth;
pub mod crm;
pub mod employee;
pub mod indiamart;
pub mod master;
pub mod menu;
pub mod product;
pub mod quotation;
pub mod rbac;
pub mod user;
