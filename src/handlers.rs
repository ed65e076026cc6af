pub mod auth;
pub mod employees;
pub mod indiamart;
pub mod leads;
pub mod master;
pub mod menus;
pub mod products;
pub mod quotations;
pub mod roles;
pub mod series;
pub mod users;
