pub mod crm_repo;
pub mod employee_repo;
pub mod master_repo;
pub mod menu_repo;
pub mod product_repo;
pub mod quotation_repo;
pub mod rbac_repo;
pub mod series_repo;
pub mod user_repo;

pub use crm_repo::CrmRepository;
pub use employee_repo::EmployeeRepository;
pub use master_repo::MasterRepository;
pub use menu_repo::MenuRepository;
pub use product_repo::ProductRepository;
pub use quotation_repo::QuotationRepository;
pub use rbac_repo::RbacRepository;
pub use series_repo::SeriesRepository;
pub use user_repo::UserRepository;
