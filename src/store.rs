//! Coupon persistence
//!
//! The engine only talks to [`CouponStore`], a narrow document-store
//! interface. [`RedbCouponStore`] implements it on top of the embedded redb
//! database: documents live in [`TABLE_COUPONS`] as JSON and the unique
//! code index lives in [`TABLE_CODE_INDEX`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable};

use crate::database::{TABLE_CODE_INDEX, TABLE_COUPONS};
use crate::error::{Error, Result};
use crate::model::{normalize_code, Coupon};

/// In-place change applied to a coupon inside an atomic update.
///
/// Returning an error aborts the update and leaves the stored document
/// untouched.
pub type Mutation<'a> = &'a mut dyn FnMut(&mut Coupon) -> Result<()>;

pub trait CouponStore: Send + Sync {
    /// Stores a new coupon. Fails with [`Error::DuplicateCode`] if its code is taken.
    fn insert(&self, coupon: &Coupon) -> Result<()>;

    fn find_by_id(&self, id: &str) -> Result<Option<Coupon>>;

    /// Case-insensitive exact lookup, regardless of `is_active`
    fn find_by_code(&self, code: &str) -> Result<Option<Coupon>>;

    /// Every coupon that is currently valid at `now`, in no particular order
    fn find_active(&self, now: DateTime<Utc>) -> Result<Vec<Coupon>>;

    /// Reads, mutates and writes back one coupon as a single atomic step
    ///
    /// Returns `Ok(None)` when no coupon has this id.
    fn update_atomic(&self, id: &str, mutation: Mutation<'_>) -> Result<Option<Coupon>>;
}

/// [`CouponStore`] backed by redb
///
/// redb serializes write transactions, so the read-modify-write of
/// [`CouponStore::update_atomic`] cannot interleave with another update.
#[derive(Clone)]
pub struct RedbCouponStore {
    db: Arc<Database>,
}

impl RedbCouponStore {
    pub fn new(db: Arc<Database>) -> Self {
        RedbCouponStore { db }
    }
}

impl CouponStore for RedbCouponStore {
    fn insert(&self, coupon: &Coupon) -> Result<()> {
        let record_json = serde_json::to_string(coupon)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut codes = write_txn.open_table(TABLE_CODE_INDEX)?;
            if codes.get(coupon.code.as_str())?.is_some() {
                return Err(Error::DuplicateCode(coupon.code.clone()));
            }
            codes.insert(coupon.code.as_str(), coupon.id.as_str())?;

            let mut table = write_txn.open_table(TABLE_COUPONS)?;
            table.insert(coupon.id.as_str(), record_json.as_str())?;
        }
        write_txn.commit()?;

        Ok(())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Coupon>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_COUPONS)?;

        let coupon = match table.get(id)? {
            Some(value) => Some(serde_json::from_str::<Coupon>(value.value())?),
            None => None,
        };
        Ok(coupon)
    }

    fn find_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let code = normalize_code(code);

        let read_txn = self.db.begin_read()?;
        let codes = read_txn.open_table(TABLE_CODE_INDEX)?;
        let id = match codes.get(code.as_str())? {
            Some(value) => value.value().to_string(),
            None => return Ok(None),
        };

        let table = read_txn.open_table(TABLE_COUPONS)?;
        let coupon = match table.get(id.as_str())? {
            Some(value) => Some(serde_json::from_str::<Coupon>(value.value())?),
            None => None,
        };
        Ok(coupon)
    }

    fn find_active(&self, now: DateTime<Utc>) -> Result<Vec<Coupon>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_COUPONS)?;

        // Full scan; the collection is small and has no window index.
        let mut coupons = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let coupon = serde_json::from_str::<Coupon>(value.value())?;
            if coupon.is_currently_valid(now) {
                coupons.push(coupon);
            }
        }
        Ok(coupons)
    }

    fn update_atomic(&self, id: &str, mutation: Mutation<'_>) -> Result<Option<Coupon>> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(TABLE_COUPONS)?;
            let current = match table.get(id)? {
                Some(value) => value.value().to_string(),
                None => return Ok(None),
            };

            let mut coupon = serde_json::from_str::<Coupon>(&current)?;
            let previous_code = coupon.code.clone();
            mutation(&mut coupon)?;
            coupon.id = id.to_string();

            if coupon.code != previous_code {
                let mut codes = write_txn.open_table(TABLE_CODE_INDEX)?;
                if codes.get(coupon.code.as_str())?.is_some() {
                    return Err(Error::DuplicateCode(coupon.code.clone()));
                }
                codes.remove(previous_code.as_str())?;
                codes.insert(coupon.code.as_str(), id)?;
            }

            let record_json = serde_json::to_string(&coupon)?;
            table.insert(id, record_json.as_str())?;
            coupon
        };
        write_txn.commit()?;

        Ok(Some(updated))
    }
}
