//! Salon Cash Registry
//!
//! Shift balance recording, cash/online variance reconciliation and the
//! daily verification workflow for the salon point-of-sale. Persistence,
//! sales and expenses live in the salon backend; this crate validates,
//! derives and orchestrates.
//!
//! Typical wiring:
//!
//! ```no_run
//! # async fn wire() -> Result<(), salon_cash_registry::RegistryError> {
//! use salon_cash_registry::{ApiClient, CashRegistry, RegistryConfig, RegistryError};
//!
//! let config = RegistryConfig::from_env()?;
//! let _log_guard = salon_cash_registry::init_logging(&config.logging);
//! let session = salon_cash_registry::storage::load_session().ok_or(RegistryError::Unauthorized)?;
//! let registry = CashRegistry::new(ApiClient::new(&config, session)?);
//! let today = chrono::Local::now().date_naive();
//! let summary = registry.daily_summary(today).await?;
//! println!("cash difference: {}", summary.cash_difference);
//! # Ok(())
//! # }
//! ```

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod api;
pub mod commands;
pub mod config;
pub mod denominations;
pub mod error;
pub mod registry;
pub mod session;
pub mod shifts;
pub mod storage;
pub mod summary;
pub mod variance;
pub mod verification;

pub use api::ApiClient;
pub use config::{LoggingConfig, RegistryConfig};
pub use denominations::{DenominationLedger, DenominationLine, SUPPORTED_DENOMINATIONS};
pub use error::{RegistryError, RegistryResult};
pub use registry::{CashRegistry, VerifiedDay};
pub use session::{Operator, OperatorRole, Session};
pub use shifts::{RecordShiftBalance, ShiftEntry, ShiftType};
pub use summary::DailySummary;
pub use verification::{DayState, VerifyRequest};

pub const BUILD_GIT_SHA: &str = env!("BUILD_GIT_SHA");
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");

// ============================================================================
// Logging
// ============================================================================

/// Initialize structured logging (console + daily rolling file).
///
/// The returned guard flushes the file writer when dropped; keep it alive for
/// the lifetime of the process. Calling this twice is harmless: the second
/// global subscriber install is ignored.
pub fn init_logging(config: &LoggingConfig) -> WorkerGuard {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    std::fs::create_dir_all(&config.log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "cash-registry");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_target(true);
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_sha = BUILD_GIT_SHA,
        built_at = BUILD_TIMESTAMP,
        "Salon cash registry starting"
    );

    guard
}
