//! Database initialization and table definitions
//!
//! This module handles the setup of the embedded redb database that backs
//! the coupon store, and the application state shared by request handlers.

use redb::{Database, TableDefinition};
use std::sync::Arc;

use crate::error::Result;
use crate::service::CouponService;
use crate::store::RedbCouponStore;

/// Main table for coupon documents
///
/// Key: coupon id
/// Value: JSON-serialized Coupon
///
/// Example:
/// - Key: "Xk29fLm01QaZ"
/// - Value: '{"id":"Xk29fLm01QaZ","code":"SAVE10","usageCount":0,...}'
pub const TABLE_COUPONS: TableDefinition<&str, &str> = TableDefinition::new("coupons_v1");

/// Unique index from upper-cased coupon code to coupon id
///
/// Example:
/// - Key: "SAVE10"
/// - Value: "Xk29fLm01QaZ"
pub const TABLE_CODE_INDEX: TableDefinition<&str, &str> = TableDefinition::new("coupon_codes_v1");

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Coupon engine over the shared store
    pub coupons: CouponService,

    /// Key required on administrative routes; `None` disables the check
    pub admin_key: Option<Arc<str>>,
}

impl AppState {
    /// Builds the state over an already-initialized database
    pub fn new(db: Database, admin_key: Option<String>) -> Self {
        let store = RedbCouponStore::new(Arc::new(db));
        AppState {
            coupons: CouponService::new(Arc::new(store)),
            admin_key: admin_key.map(Arc::from),
        }
    }
}

/// Initializes the embedded database and creates required tables
///
/// # Example
///
/// ```no_run
/// # use coupons::database::init_db;
/// let db = init_db("coupons.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_COUPONS)?;
        write_txn.open_table(TABLE_CODE_INDEX)?;
    }
    write_txn.commit()?;

    Ok(db)
}
