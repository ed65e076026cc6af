pub mod auth;
pub mod employee_service;
pub mod indiamart_service;
pub mod product_service;
pub mod quotation_service;
pub mod rbac_service;
