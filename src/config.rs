// src/config.rs

use std::{env, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        CrmRepository, EmployeeRepository, MenuRepository, ProductRepository,
        QuotationRepository, RbacRepository, SeriesRepository, UserRepository,
    },
    services::{
        auth::AuthService, employee_service::EmployeeService,
        indiamart_service::IndiaMartService, product_service::ProductService,
        quotation_service::QuotationService, rbac_service::RbacService,
    },
};

pub const DEFAULT_INDIAMART_URL: &str = "https://mapi.indiamart.com/wservce/crm/crmListing/v2/";

#[derive(Debug, Clone)]
pub struct IndiaMartConfig {
    pub base_url: String,
    pub max_retries: u32,
    pub backoff: Duration,
    /// Upper bound for any single wait between retries, `Retry-After` included.
    pub max_retry_delay: Duration,
    pub timeout: Duration,
    pub snapshot_path: PathBuf,
}

impl Default for IndiaMartConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_INDIAMART_URL.to_string(),
            max_retries: 3,
            backoff: Duration::from_millis(2000),
            max_retry_delay: Duration::from_secs(60),
            timeout: Duration::from_secs(30),
            snapshot_path: PathBuf::from("data/indiamart_leads.json"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub db_max_connections: u32,
    pub upload_dir: PathBuf,
    pub indiamart: IndiaMartConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        let defaults = IndiaMartConfig::default();
        let indiamart = IndiaMartConfig {
            base_url: env::var("INDIAMART_BASE_URL").unwrap_or(defaults.base_url),
            max_retries: env_or("INDIAMART_MAX_RETRIES", defaults.max_retries)?,
            backoff: Duration::from_millis(env_or("INDIAMART_BACKOFF_MS", 2000u64)?),
            max_retry_delay: Duration::from_secs(env_or("INDIAMART_MAX_RETRY_DELAY_SECS", 60u64)?),
            timeout: Duration::from_secs(env_or("INDIAMART_TIMEOUT_SECS", 30u64)?),
            snapshot_path: env::var("INDIAMART_SNAPSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_path),
        };

        Ok(Self {
            database_url,
            jwt_secret,
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 5u32)?,
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            indiamart,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,

    pub user_repo: UserRepository,
    pub employee_repo: EmployeeRepository,
    pub menu_repo: MenuRepository,
    pub rbac_repo: RbacRepository,
    pub product_repo: ProductRepository,
    pub series_repo: SeriesRepository,
    pub quotation_repo: QuotationRepository,
    pub crm_repo: CrmRepository,

    pub auth_service: AuthService,
    pub employee_service: EmployeeService,
    pub rbac_service: RbacService,
    pub product_service: ProductService,
    pub quotation_service: QuotationService,
    pub indiamart_service: IndiaMartService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Database connection established");

        Self::from_pool(db_pool, config)
    }

    /// Wires the dependency graph around an existing pool.
    pub fn from_pool(db_pool: PgPool, config: Config) -> anyhow::Result<Self> {
        let user_repo = UserRepository::new(db_pool.clone());
        let employee_repo = EmployeeRepository::new(db_pool.clone());
        let menu_repo = MenuRepository::new(db_pool.clone());
        let rbac_repo = RbacRepository::new(db_pool.clone());
        let product_repo = ProductRepository::new(db_pool.clone());
        let series_repo = SeriesRepository::new(db_pool.clone());
        let quotation_repo = QuotationRepository::new(db_pool.clone());
        let crm_repo = CrmRepository::new(db_pool.clone());

        let auth_service = AuthService::new(user_repo.clone(), config.jwt_secret.clone());
        let employee_service =
            EmployeeService::new(user_repo.clone(), employee_repo.clone(), db_pool.clone());
        let rbac_service = RbacService::new(rbac_repo.clone(), menu_repo.clone(), db_pool.clone());
        let product_service = ProductService::new(product_repo.clone(), db_pool.clone());
        let quotation_service =
            QuotationService::new(quotation_repo.clone(), series_repo.clone(), db_pool.clone());
        let indiamart_service = IndiaMartService::new(config.indiamart.clone(), crm_repo.clone())?;

        Ok(Self {
            db_pool,
            config: Arc::new(config),
            user_repo,
            employee_repo,
            menu_repo,
            rbac_repo,
            product_repo,
            series_repo,
            quotation_repo,
            crm_repo,
            auth_service,
            employee_service,
            rbac_service,
            product_service,
            quotation_service,
            indiamart_service,
        })
    }
}
