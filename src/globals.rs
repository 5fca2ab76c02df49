use crate::domains::report::repository::{
    ReportMembershipRepository, ReportRepository, SqliteReportMembershipRepository, SqliteReportRepository,
};
use crate::domains::report::service::{ReportPermissionService, ReportPermissionServiceImpl};
use crate::errors::DbError;
use crate::ffi::error::{FFIError, FFIResult};
use lazy_static::lazy_static;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Environment variable holding the database URL for [`initialize_from_env`]
pub const DB_URL_ENV: &str = "REPORT_PERMISSIONS_DB_URL";
/// Environment variable holding the device id for [`initialize_from_env`]
pub const DEVICE_ID_ENV: &str = "REPORT_PERMISSIONS_DEVICE_ID";
/// Environment variable toggling offline mode for [`initialize_from_env`]
pub const OFFLINE_MODE_ENV: &str = "REPORT_PERMISSIONS_OFFLINE";

const MAX_CONNECTIONS: u32 = 5;

// Global state definitions
lazy_static! {
    static ref INIT_MUTEX: tokio::sync::Mutex<()> = tokio::sync::Mutex::new(());
    static ref INITIALIZED: AtomicBool = AtomicBool::new(false);

    static ref DB_POOL: Mutex<Option<SqlitePool>> = Mutex::new(None);
    static ref DEVICE_ID: Mutex<Option<String>> = Mutex::new(None);
    static ref OFFLINE_MODE: Mutex<bool> = Mutex::new(false);

    // Report Domain
    static ref REPORT_REPO: Mutex<Option<Arc<dyn ReportRepository>>> = Mutex::new(None);
    static ref MEMBERSHIP_REPO: Mutex<Option<Arc<dyn ReportMembershipRepository>>> = Mutex::new(None);
    static ref REPORT_PERMISSION_SERVICE: Mutex<Option<Arc<ReportPermissionServiceImpl>>> = Mutex::new(None);
}

// --- Getter Functions ---

pub fn get_db_pool() -> FFIResult<SqlitePool> {
    DB_POOL.lock().map_err(|_| FFIError::internal("DB_POOL lock poisoned".to_string()))?.clone().ok_or_else(|| FFIError::internal("Database pool not initialized".to_string()))
}
pub fn get_device_id() -> FFIResult<String> {
    DEVICE_ID.lock().map_err(|_| FFIError::internal("DEVICE_ID lock poisoned".to_string()))?.clone().ok_or_else(|| FFIError::internal("Device ID not initialized".to_string()))
}
pub fn is_offline_mode() -> bool { OFFLINE_MODE.lock().map(|guard| *guard).unwrap_or(false) }
pub fn set_offline_mode(offline: bool) { if let Ok(mut guard) = OFFLINE_MODE.lock() { *guard = offline; } }

pub fn get_report_repo() -> FFIResult<Arc<dyn ReportRepository>> {
    REPORT_REPO.lock().map_err(|_| FFIError::internal("REPORT_REPO lock poisoned".to_string()))?.clone().ok_or_else(|| FFIError::internal("ReportRepository not initialized".to_string()))
}
pub fn get_membership_repo() -> FFIResult<Arc<dyn ReportMembershipRepository>> {
    MEMBERSHIP_REPO.lock().map_err(|_| FFIError::internal("MEMBERSHIP_REPO lock poisoned".to_string()))?.clone().ok_or_else(|| FFIError::internal("ReportMembershipRepository not initialized".to_string()))
}
/// Concrete service, usable both as [`ReportPermissionService`] and as a permission writer
pub fn get_report_permission_service_impl() -> FFIResult<Arc<ReportPermissionServiceImpl>> {
    REPORT_PERMISSION_SERVICE.lock().map_err(|_| FFIError::internal("REPORT_PERMISSION_SERVICE lock poisoned".to_string()))?.clone().ok_or_else(|| FFIError::internal("ReportPermissionService not initialized".to_string()))
}
pub fn get_report_permission_service() -> FFIResult<Arc<dyn ReportPermissionService>> {
    let service: Arc<dyn ReportPermissionService> = get_report_permission_service_impl()?;
    Ok(service)
}

/// Initialize global state. Safe to call more than once; later calls are no-ops.
pub async fn initialize(
    db_url: &str,
    device_id_str: &str,
    offline_mode_flag: bool,
) -> FFIResult<()> {
    // Acquire the async mutex to ensure single initialization
    let _guard = INIT_MUTEX.lock().await;

    if INITIALIZED.load(Ordering::Acquire) {
        return Ok(());
    }

    let result = initialize_internal(db_url, device_id_str, offline_mode_flag).await;

    // Mark as initialized only if successful
    if result.is_ok() {
        INITIALIZED.store(true, Ordering::Release);
    }

    result
}

/// Initialize from environment variables, reading a `.env` file when present
pub async fn initialize_from_env() -> FFIResult<()> {
    let _ = dotenv::dotenv();

    let db_url = std::env::var(DB_URL_ENV)
        .map_err(|_| FFIError::invalid_argument(&format!("{} is not set", DB_URL_ENV)))?;
    let device_id = std::env::var(DEVICE_ID_ENV).unwrap_or_else(|_| "local-device".to_string());
    let offline_mode = std::env::var(OFFLINE_MODE_ENV)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    initialize(&db_url, &device_id, offline_mode).await
}

async fn initialize_internal(
    db_url: &str,
    device_id_str: &str,
    offline_mode_flag: bool,
) -> FFIResult<()> {
    // Initialize logging first
    if std::env::var("RUST_LOG").is_err() {
        #[cfg(debug_assertions)]
        std::env::set_var("RUST_LOG", "debug");
        #[cfg(not(debug_assertions))]
        std::env::set_var("RUST_LOG", "info");
    }

    // Initialize env_logger if not already initialized
    let _ = env_logger::try_init();

    log::info!("Starting internal initialization");
    log::debug!("Database URL: {}", db_url);
    log::debug!("Device ID: {}", device_id_str);
    log::debug!("Offline mode: {}", offline_mode_flag);

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(db_url)
        .await
        .map_err(|e| {
            log::error!("Database connection failed: {}", e);
            DbError::ConnectionPool(format!("Database connection failed: {}", e))
        })?;
    log::debug!("Database connection established");

    // Store the pool first so migrations can find it
    *DB_POOL.lock().map_err(|_| FFIError::internal("DB_POOL lock poisoned".to_string()))? = Some(pool.clone());

    // Run database migrations BEFORE creating services
    crate::db_migration::initialize_database().await
        .map_err(|e| {
            log::error!("Database initialization failed: {}", e);
            e
        })?;

    // Store device ID and offline mode
    *DEVICE_ID.lock().map_err(|_| FFIError::internal("DEVICE_ID lock poisoned".to_string()))? = Some(device_id_str.to_string());
    *OFFLINE_MODE.lock().map_err(|_| FFIError::internal("OFFLINE_MODE lock poisoned".to_string()))? = offline_mode_flag;

    // Repositories
    let report_repo: Arc<dyn ReportRepository> = Arc::new(SqliteReportRepository::new(pool.clone()));
    let membership_repo: Arc<dyn ReportMembershipRepository> = Arc::new(SqliteReportMembershipRepository::new(pool.clone()));

    // Services
    let report_permission_service = Arc::new(ReportPermissionServiceImpl::new(
        report_repo.clone(),
        membership_repo.clone(),
    ));

    *REPORT_REPO.lock().map_err(|_| FFIError::internal("REPORT_REPO lock poisoned".to_string()))? = Some(report_repo);
    *MEMBERSHIP_REPO.lock().map_err(|_| FFIError::internal("MEMBERSHIP_REPO lock poisoned".to_string()))? = Some(membership_repo);
    *REPORT_PERMISSION_SERVICE.lock().map_err(|_| FFIError::internal("REPORT_PERMISSION_SERVICE lock poisoned".to_string()))? = Some(report_permission_service);

    log::info!("Initialization complete");
    Ok(())
}
