//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `sub_systems` - Sub-system records (key: id)
//! - `treasuries` - Treasury records (key: id)
//! - `vouchers` - Voucher records (key: id)
//! - `intermediaries` - Intermediary account records (key: id)
//! - `reconciliations` - Reconciliation records (key: id)
//! - `counters` - Voucher number sequences (key: business || sub_system || direction)
//! - `indices` - Secondary indices for scoped scans and uniqueness checks
//!
//! Every multi-key mutation commits through a single `WriteBatch`, so a
//! transfer, a voucher confirmation, or a reconciliation decision is
//! all-or-nothing at the storage level.

use crate::{
    error::{Error, Result},
    types::{
        BusinessId, Currency, IntermediaryAccount, Reconciliation, SubSystem, Treasury, Voucher,
        VoucherDirection,
    },
    Config,
};
use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Options, WriteBatch, DB};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_SUB_SYSTEMS: &str = "sub_systems";
const CF_TREASURIES: &str = "treasuries";
const CF_VOUCHERS: &str = "vouchers";
const CF_INTERMEDIARIES: &str = "intermediaries";
const CF_RECONCILIATIONS: &str = "reconciliations";
const CF_COUNTERS: &str = "counters";
const CF_INDICES: &str = "indices";

/// Index key namespace tags (first byte of every `indices` key)
const TAG_SUB_SYSTEM: u8 = b's';
const TAG_SUB_SYSTEM_CODE: u8 = b'd';
const TAG_TREASURY: u8 = b't';
const TAG_TREASURY_CODE: u8 = b'c';
const TAG_VOUCHER: u8 = b'v';
const TAG_UNRECONCILED: u8 = b'u';
const TAG_INTERMEDIARY: u8 = b'i';
const TAG_PAIR_LOOKUP: u8 = b'p';
const TAG_RECONCILIATION: u8 = b'q';
const TAG_RECONCILED_PAIR: u8 = b'r';

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
    // Column family handles live in DB, accessed by name
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        // Universal compaction for a write-heavy posting workload
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_SUB_SYSTEMS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_TREASURIES, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_VOUCHERS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_INTERMEDIARIES, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_RECONCILIATIONS, Self::cf_options_records()),
            ColumnFamilyDescriptor::new(CF_COUNTERS, Self::cf_options_counters()),
            ColumnFamilyDescriptor::new(CF_INDICES, Self::cf_options_indices()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?} with 7 column families", path);

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_records() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_counters() -> Options {
        // Tiny fixed-size values, compression buys nothing
        Options::default()
    }

    fn cf_options_indices() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Indices benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false); // 10 bits per key
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Index key helpers

    fn index_key_sub_system(business_id: BusinessId, id: Uuid) -> Vec<u8> {
        let mut key = vec![TAG_SUB_SYSTEM];
        key.extend_from_slice(&business_id.as_i64().to_be_bytes());
        key.extend_from_slice(id.as_bytes());
        key
    }

    fn index_key_sub_system_code(business_id: BusinessId, code: &str) -> Vec<u8> {
        let mut key = vec![TAG_SUB_SYSTEM_CODE];
        key.extend_from_slice(&business_id.as_i64().to_be_bytes());
        key.extend_from_slice(code.as_bytes());
        key
    }

    fn index_key_treasury(business_id: BusinessId, sub_system_id: Uuid, id: Uuid) -> Vec<u8> {
        let mut key = vec![TAG_TREASURY];
        key.extend_from_slice(&business_id.as_i64().to_be_bytes());
        key.extend_from_slice(sub_system_id.as_bytes());
        key.extend_from_slice(id.as_bytes());
        key
    }

    fn index_key_treasury_code(
        business_id: BusinessId,
        sub_system_id: Uuid,
        code: &str,
    ) -> Vec<u8> {
        let mut key = vec![TAG_TREASURY_CODE];
        key.extend_from_slice(&business_id.as_i64().to_be_bytes());
        key.extend_from_slice(sub_system_id.as_bytes());
        key.extend_from_slice(code.as_bytes());
        key
    }

    fn index_key_voucher(business_id: BusinessId, sub_system_id: Uuid, id: Uuid) -> Vec<u8> {
        let mut key = vec![TAG_VOUCHER];
        key.extend_from_slice(&business_id.as_i64().to_be_bytes());
        key.extend_from_slice(sub_system_id.as_bytes());
        key.extend_from_slice(id.as_bytes());
        key
    }

    fn index_key_unreconciled(business_id: BusinessId, id: Uuid) -> Vec<u8> {
        let mut key = vec![TAG_UNRECONCILED];
        key.extend_from_slice(&business_id.as_i64().to_be_bytes());
        key.extend_from_slice(id.as_bytes());
        key
    }

    fn index_key_intermediary(business_id: BusinessId, id: Uuid) -> Vec<u8> {
        let mut key = vec![TAG_INTERMEDIARY];
        key.extend_from_slice(&business_id.as_i64().to_be_bytes());
        key.extend_from_slice(id.as_bytes());
        key
    }

    fn index_key_pair_lookup(
        business_id: BusinessId,
        low: Uuid,
        high: Uuid,
        currency: Currency,
    ) -> Vec<u8> {
        let mut key = vec![TAG_PAIR_LOOKUP];
        key.extend_from_slice(&business_id.as_i64().to_be_bytes());
        key.extend_from_slice(low.as_bytes());
        key.extend_from_slice(high.as_bytes());
        key.extend_from_slice(currency.code().as_bytes());
        key
    }

    fn index_key_reconciliation(business_id: BusinessId, id: Uuid) -> Vec<u8> {
        let mut key = vec![TAG_RECONCILIATION];
        key.extend_from_slice(&business_id.as_i64().to_be_bytes());
        key.extend_from_slice(id.as_bytes());
        key
    }

    fn index_key_reconciled_pair(payment_id: Uuid, receipt_id: Uuid) -> Vec<u8> {
        let mut key = vec![TAG_RECONCILED_PAIR];
        key.extend_from_slice(payment_id.as_bytes());
        key.extend_from_slice(receipt_id.as_bytes());
        key
    }

    fn business_prefix(tag: u8, business_id: BusinessId) -> Vec<u8> {
        let mut key = vec![tag];
        key.extend_from_slice(&business_id.as_i64().to_be_bytes());
        key
    }

    /// Last 16 bytes of an index key are the entity id
    fn uuid_suffix(key: &[u8]) -> Result<Uuid> {
        if key.len() < 16 {
            return Err(Error::Storage("index key too short".to_string()));
        }
        Uuid::from_slice(&key[key.len() - 16..])
            .map_err(|e| Error::Storage(format!("corrupt index key: {}", e)))
    }

    fn uuid_value(value: &[u8]) -> Result<Uuid> {
        Uuid::from_slice(value).map_err(|e| Error::Storage(format!("corrupt index value: {}", e)))
    }

    /// Collect entity ids from a prefix scan over the indices family.
    ///
    /// The iterator seeks to the prefix but does not stop at its end, so
    /// the scan breaks on the first non-matching key.
    fn scan_ids(&self, prefix: &[u8]) -> Result<Vec<Uuid>> {
        let cf = self.cf_handle(CF_INDICES)?;
        let iter = self.db.prefix_iterator_cf(&cf, prefix);

        let mut ids = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            ids.push(Self::uuid_suffix(&key)?);
        }
        Ok(ids)
    }

    // Sub-system operations

    /// Insert a sub-system with its business and code indices (atomic)
    pub fn create_sub_system_atomic(&self, sub_system: &SubSystem) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf = self.cf_handle(CF_SUB_SYSTEMS)?;
        batch.put_cf(&cf, sub_system.id.as_bytes(), bincode::serialize(sub_system)?);

        let cf_indices = self.cf_handle(CF_INDICES)?;
        batch.put_cf(
            &cf_indices,
            Self::index_key_sub_system(sub_system.business_id, sub_system.id),
            b"",
        );
        batch.put_cf(
            &cf_indices,
            Self::index_key_sub_system_code(sub_system.business_id, &sub_system.code),
            sub_system.id.as_bytes(),
        );

        self.db.write(batch)?;
        Ok(())
    }

    /// Overwrite a sub-system record (code is immutable, indices stand)
    pub fn put_sub_system(&self, sub_system: &SubSystem) -> Result<()> {
        let cf = self.cf_handle(CF_SUB_SYSTEMS)?;
        self.db
            .put_cf(&cf, sub_system.id.as_bytes(), bincode::serialize(sub_system)?)?;
        Ok(())
    }

    /// Get sub-system by ID
    pub fn get_sub_system(&self, id: Uuid) -> Result<SubSystem> {
        let cf = self.cf_handle(CF_SUB_SYSTEMS)?;
        let value = self
            .db
            .get_cf(&cf, id.as_bytes())?
            .ok_or_else(|| Error::NotFound(format!("sub-system {}", id)))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Remove a sub-system and its indices (atomic)
    pub fn delete_sub_system_atomic(&self, sub_system: &SubSystem) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf = self.cf_handle(CF_SUB_SYSTEMS)?;
        batch.delete_cf(&cf, sub_system.id.as_bytes());

        let cf_indices = self.cf_handle(CF_INDICES)?;
        batch.delete_cf(
            &cf_indices,
            Self::index_key_sub_system(sub_system.business_id, sub_system.id),
        );
        batch.delete_cf(
            &cf_indices,
            Self::index_key_sub_system_code(sub_system.business_id, &sub_system.code),
        );

        self.db.write(batch)?;
        Ok(())
    }

    /// Sub-system id registered under a code, if any
    pub fn find_sub_system_by_code(
        &self,
        business_id: BusinessId,
        code: &str,
    ) -> Result<Option<Uuid>> {
        let cf = self.cf_handle(CF_INDICES)?;
        let value = self
            .db
            .get_cf(&cf, Self::index_key_sub_system_code(business_id, code))?;
        value.as_deref().map(Self::uuid_value).transpose()
    }

    /// All sub-systems of a business, in creation order
    pub fn list_sub_systems(&self, business_id: BusinessId) -> Result<Vec<SubSystem>> {
        let prefix = Self::business_prefix(TAG_SUB_SYSTEM, business_id);
        self.scan_ids(&prefix)?
            .into_iter()
            .map(|id| self.get_sub_system(id))
            .collect()
    }

    // Treasury operations

    /// Insert a treasury with its sub-system and code indices (atomic)
    pub fn create_treasury_atomic(&self, treasury: &Treasury) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf = self.cf_handle(CF_TREASURIES)?;
        batch.put_cf(&cf, treasury.id.as_bytes(), bincode::serialize(treasury)?);

        let cf_indices = self.cf_handle(CF_INDICES)?;
        batch.put_cf(
            &cf_indices,
            Self::index_key_treasury(treasury.business_id, treasury.sub_system_id, treasury.id),
            b"",
        );
        batch.put_cf(
            &cf_indices,
            Self::index_key_treasury_code(
                treasury.business_id,
                treasury.sub_system_id,
                &treasury.code,
            ),
            treasury.id.as_bytes(),
        );

        self.db.write(batch)?;

        tracing::debug!(
            treasury_id = %treasury.id,
            code = %treasury.code,
            "Treasury created"
        );

        Ok(())
    }

    /// Overwrite a treasury record (code is immutable, indices stand)
    pub fn put_treasury(&self, treasury: &Treasury) -> Result<()> {
        let cf = self.cf_handle(CF_TREASURIES)?;
        self.db
            .put_cf(&cf, treasury.id.as_bytes(), bincode::serialize(treasury)?)?;
        Ok(())
    }

    /// Get treasury by ID
    pub fn get_treasury(&self, id: Uuid) -> Result<Treasury> {
        let cf = self.cf_handle(CF_TREASURIES)?;
        let value = self
            .db
            .get_cf(&cf, id.as_bytes())?
            .ok_or_else(|| Error::NotFound(format!("treasury {}", id)))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Remove a treasury and its indices (atomic)
    pub fn delete_treasury_atomic(&self, treasury: &Treasury) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf = self.cf_handle(CF_TREASURIES)?;
        batch.delete_cf(&cf, treasury.id.as_bytes());

        let cf_indices = self.cf_handle(CF_INDICES)?;
        batch.delete_cf(
            &cf_indices,
            Self::index_key_treasury(treasury.business_id, treasury.sub_system_id, treasury.id),
        );
        batch.delete_cf(
            &cf_indices,
            Self::index_key_treasury_code(
                treasury.business_id,
                treasury.sub_system_id,
                &treasury.code,
            ),
        );

        self.db.write(batch)?;
        Ok(())
    }

    /// Treasury id registered under a code, if any
    pub fn find_treasury_by_code(
        &self,
        business_id: BusinessId,
        sub_system_id: Uuid,
        code: &str,
    ) -> Result<Option<Uuid>> {
        let cf = self.cf_handle(CF_INDICES)?;
        let value = self.db.get_cf(
            &cf,
            Self::index_key_treasury_code(business_id, sub_system_id, code),
        )?;
        value.as_deref().map(Self::uuid_value).transpose()
    }

    /// Treasuries of a business, optionally narrowed to one sub-system
    pub fn list_treasuries(
        &self,
        business_id: BusinessId,
        sub_system_id: Option<Uuid>,
    ) -> Result<Vec<Treasury>> {
        let mut prefix = Self::business_prefix(TAG_TREASURY, business_id);
        if let Some(sub) = sub_system_id {
            prefix.extend_from_slice(sub.as_bytes());
        }
        self.scan_ids(&prefix)?
            .into_iter()
            .map(|id| self.get_treasury(id))
            .collect()
    }

    // Voucher operations

    /// Insert a draft voucher and advance its number sequence (atomic)
    pub fn create_voucher_atomic(&self, voucher: &Voucher, sequence: u64) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf = self.cf_handle(CF_VOUCHERS)?;
        batch.put_cf(&cf, voucher.id.as_bytes(), bincode::serialize(voucher)?);

        let cf_indices = self.cf_handle(CF_INDICES)?;
        batch.put_cf(
            &cf_indices,
            Self::index_key_voucher(voucher.business_id, voucher.sub_system_id, voucher.id),
            b"",
        );

        let cf_counters = self.cf_handle(CF_COUNTERS)?;
        batch.put_cf(
            &cf_counters,
            Self::counter_key(voucher.business_id, voucher.sub_system_id, voucher.direction),
            sequence.to_be_bytes(),
        );

        self.db.write(batch)?;

        tracing::debug!(
            voucher_id = %voucher.id,
            number = %voucher.number,
            direction = %voucher.direction,
            "Voucher created"
        );

        Ok(())
    }

    /// Overwrite a voucher record (draft edits, cancellation)
    pub fn put_voucher(&self, voucher: &Voucher) -> Result<()> {
        let cf = self.cf_handle(CF_VOUCHERS)?;
        self.db
            .put_cf(&cf, voucher.id.as_bytes(), bincode::serialize(voucher)?)?;
        Ok(())
    }

    /// Get voucher by ID
    pub fn get_voucher(&self, id: Uuid) -> Result<Voucher> {
        let cf = self.cf_handle(CF_VOUCHERS)?;
        let value = self
            .db
            .get_cf(&cf, id.as_bytes())?
            .ok_or_else(|| Error::NotFound(format!("voucher {}", id)))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Persist a voucher confirmation with its treasury posting (atomic).
    ///
    /// Intermediary-linked vouchers enter the unreconciled index so the
    /// matcher can find them without a full scan.
    pub fn confirm_voucher_atomic(&self, voucher: &Voucher, treasury: &Treasury) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_vouchers = self.cf_handle(CF_VOUCHERS)?;
        batch.put_cf(&cf_vouchers, voucher.id.as_bytes(), bincode::serialize(voucher)?);

        let cf_treasuries = self.cf_handle(CF_TREASURIES)?;
        batch.put_cf(
            &cf_treasuries,
            treasury.id.as_bytes(),
            bincode::serialize(treasury)?,
        );

        if voucher.intermediary_id().is_some() {
            let cf_indices = self.cf_handle(CF_INDICES)?;
            batch.put_cf(
                &cf_indices,
                Self::index_key_unreconciled(voucher.business_id, voucher.id),
                b"",
            );
        }

        self.db.write(batch)?;
        Ok(())
    }

    /// Vouchers of a business, optionally narrowed to one sub-system
    pub fn list_vouchers(
        &self,
        business_id: BusinessId,
        sub_system_id: Option<Uuid>,
    ) -> Result<Vec<Voucher>> {
        let mut prefix = Self::business_prefix(TAG_VOUCHER, business_id);
        if let Some(sub) = sub_system_id {
            prefix.extend_from_slice(sub.as_bytes());
        }
        self.scan_ids(&prefix)?
            .into_iter()
            .map(|id| self.get_voucher(id))
            .collect()
    }

    /// Confirmed, unreconciled, intermediary-linked vouchers of a business
    pub fn list_unreconciled(&self, business_id: BusinessId) -> Result<Vec<Voucher>> {
        let prefix = Self::business_prefix(TAG_UNRECONCILED, business_id);
        self.scan_ids(&prefix)?
            .into_iter()
            .map(|id| self.get_voucher(id))
            .collect()
    }

    // Counter operations

    fn counter_key(
        business_id: BusinessId,
        sub_system_id: Uuid,
        direction: VoucherDirection,
    ) -> Vec<u8> {
        let mut key = business_id.as_i64().to_be_bytes().to_vec();
        key.extend_from_slice(sub_system_id.as_bytes());
        key.push(match direction {
            VoucherDirection::Payment => b'P',
            VoucherDirection::Receipt => b'R',
        });
        key
    }

    /// Last assigned voucher sequence for (business, sub-system, direction)
    pub fn current_sequence(
        &self,
        business_id: BusinessId,
        sub_system_id: Uuid,
        direction: VoucherDirection,
    ) -> Result<u64> {
        let cf = self.cf_handle(CF_COUNTERS)?;
        let value = self
            .db
            .get_cf(&cf, Self::counter_key(business_id, sub_system_id, direction))?;
        match value {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::Storage("corrupt counter value".to_string()))?;
                Ok(u64::from_be_bytes(arr))
            }
            None => Ok(0),
        }
    }

    // Intermediary operations

    /// Get intermediary account by ID
    pub fn get_intermediary(&self, id: Uuid) -> Result<IntermediaryAccount> {
        let cf = self.cf_handle(CF_INTERMEDIARIES)?;
        let value = self
            .db
            .get_cf(&cf, id.as_bytes())?
            .ok_or_else(|| Error::NotFound(format!("intermediary account {}", id)))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Clearing account id for (business, unordered pair, currency), if any
    pub fn find_intermediary(
        &self,
        business_id: BusinessId,
        low: Uuid,
        high: Uuid,
        currency: Currency,
    ) -> Result<Option<Uuid>> {
        let cf = self.cf_handle(CF_INDICES)?;
        let value = self
            .db
            .get_cf(&cf, Self::index_key_pair_lookup(business_id, low, high, currency))?;
        value.as_deref().map(Self::uuid_value).transpose()
    }

    /// Intermediary accounts of a business, in creation order
    pub fn list_intermediaries(&self, business_id: BusinessId) -> Result<Vec<IntermediaryAccount>> {
        let prefix = Self::business_prefix(TAG_INTERMEDIARY, business_id);
        self.scan_ids(&prefix)?
            .into_iter()
            .map(|id| self.get_intermediary(id))
            .collect()
    }

    // Transfer posting

    /// Commit one transfer orchestration as a single batch: both confirmed
    /// vouchers (with their indices and number sequences), both treasury
    /// balances, and the intermediary posting. Nothing is observable until
    /// the batch lands.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_transfer_atomic(
        &self,
        payment: &Voucher,
        receipt: &Voucher,
        from_treasury: &Treasury,
        to_treasury: &Treasury,
        intermediary: &IntermediaryAccount,
        intermediary_is_new: bool,
        payment_sequence: u64,
        receipt_sequence: u64,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_vouchers = self.cf_handle(CF_VOUCHERS)?;
        batch.put_cf(&cf_vouchers, payment.id.as_bytes(), bincode::serialize(payment)?);
        batch.put_cf(&cf_vouchers, receipt.id.as_bytes(), bincode::serialize(receipt)?);

        let cf_treasuries = self.cf_handle(CF_TREASURIES)?;
        batch.put_cf(
            &cf_treasuries,
            from_treasury.id.as_bytes(),
            bincode::serialize(from_treasury)?,
        );
        batch.put_cf(
            &cf_treasuries,
            to_treasury.id.as_bytes(),
            bincode::serialize(to_treasury)?,
        );

        let cf_intermediaries = self.cf_handle(CF_INTERMEDIARIES)?;
        batch.put_cf(
            &cf_intermediaries,
            intermediary.id.as_bytes(),
            bincode::serialize(intermediary)?,
        );

        let cf_indices = self.cf_handle(CF_INDICES)?;
        for voucher in [payment, receipt] {
            batch.put_cf(
                &cf_indices,
                Self::index_key_voucher(voucher.business_id, voucher.sub_system_id, voucher.id),
                b"",
            );
            batch.put_cf(
                &cf_indices,
                Self::index_key_unreconciled(voucher.business_id, voucher.id),
                b"",
            );
        }
        if intermediary_is_new {
            batch.put_cf(
                &cf_indices,
                Self::index_key_intermediary(intermediary.business_id, intermediary.id),
                b"",
            );
            batch.put_cf(
                &cf_indices,
                Self::index_key_pair_lookup(
                    intermediary.business_id,
                    intermediary.low_sub_system_id,
                    intermediary.high_sub_system_id,
                    intermediary.currency,
                ),
                intermediary.id.as_bytes(),
            );
        }

        let cf_counters = self.cf_handle(CF_COUNTERS)?;
        batch.put_cf(
            &cf_counters,
            Self::counter_key(payment.business_id, payment.sub_system_id, payment.direction),
            payment_sequence.to_be_bytes(),
        );
        batch.put_cf(
            &cf_counters,
            Self::counter_key(receipt.business_id, receipt.sub_system_id, receipt.direction),
            receipt_sequence.to_be_bytes(),
        );

        self.db.write(batch)?;

        tracing::info!(
            payment = %payment.number,
            receipt = %receipt.number,
            intermediary = %intermediary.code,
            amount = %payment.amount,
            "Transfer posted"
        );

        Ok(())
    }

    // Reconciliation operations

    /// Get reconciliation by ID
    pub fn get_reconciliation(&self, id: Uuid) -> Result<Reconciliation> {
        let cf = self.cf_handle(CF_RECONCILIATIONS)?;
        let value = self
            .db
            .get_cf(&cf, id.as_bytes())?
            .ok_or_else(|| Error::NotFound(format!("reconciliation {}", id)))?;
        Ok(bincode::deserialize(&value)?)
    }

    /// Reconciliation id recorded for a voucher pair, if any.
    ///
    /// Present rows (any status, including rejected) block re-proposal.
    pub fn find_reconciliation_for_pair(
        &self,
        payment_id: Uuid,
        receipt_id: Uuid,
    ) -> Result<Option<Uuid>> {
        let cf = self.cf_handle(CF_INDICES)?;
        let value = self
            .db
            .get_cf(&cf, Self::index_key_reconciled_pair(payment_id, receipt_id))?;
        value.as_deref().map(Self::uuid_value).transpose()
    }

    /// Insert a pending proposal with its business and pair indices (atomic)
    pub fn insert_reconciliation_atomic(&self, reconciliation: &Reconciliation) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf = self.cf_handle(CF_RECONCILIATIONS)?;
        batch.put_cf(
            &cf,
            reconciliation.id.as_bytes(),
            bincode::serialize(reconciliation)?,
        );

        let cf_indices = self.cf_handle(CF_INDICES)?;
        batch.put_cf(
            &cf_indices,
            Self::index_key_reconciliation(reconciliation.business_id, reconciliation.id),
            b"",
        );
        batch.put_cf(
            &cf_indices,
            Self::index_key_reconciled_pair(
                reconciliation.payment_voucher_id,
                reconciliation.receipt_voucher_id,
            ),
            reconciliation.id.as_bytes(),
        );

        self.db.write(batch)?;
        Ok(())
    }

    /// Overwrite a reconciliation record (reject, notes)
    pub fn put_reconciliation(&self, reconciliation: &Reconciliation) -> Result<()> {
        let cf = self.cf_handle(CF_RECONCILIATIONS)?;
        self.db.put_cf(
            &cf,
            reconciliation.id.as_bytes(),
            bincode::serialize(reconciliation)?,
        )?;
        Ok(())
    }

    /// Persist a confirmed reconciliation with both voucher updates and
    /// their removal from the unreconciled index (atomic)
    pub fn confirm_reconciliation_atomic(
        &self,
        reconciliation: &Reconciliation,
        payment: &Voucher,
        receipt: &Voucher,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf = self.cf_handle(CF_RECONCILIATIONS)?;
        batch.put_cf(
            &cf,
            reconciliation.id.as_bytes(),
            bincode::serialize(reconciliation)?,
        );

        let cf_vouchers = self.cf_handle(CF_VOUCHERS)?;
        batch.put_cf(&cf_vouchers, payment.id.as_bytes(), bincode::serialize(payment)?);
        batch.put_cf(&cf_vouchers, receipt.id.as_bytes(), bincode::serialize(receipt)?);

        let cf_indices = self.cf_handle(CF_INDICES)?;
        batch.delete_cf(
            &cf_indices,
            Self::index_key_unreconciled(payment.business_id, payment.id),
        );
        batch.delete_cf(
            &cf_indices,
            Self::index_key_unreconciled(receipt.business_id, receipt.id),
        );

        self.db.write(batch)?;

        tracing::info!(
            reconciliation_id = %reconciliation.id,
            payment = %payment.number,
            receipt = %receipt.number,
            "Reconciliation confirmed"
        );

        Ok(())
    }

    /// Remove a rejected reconciliation and its pair exclusion (atomic)
    pub fn clear_rejection_atomic(&self, reconciliation: &Reconciliation) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf = self.cf_handle(CF_RECONCILIATIONS)?;
        batch.delete_cf(&cf, reconciliation.id.as_bytes());

        let cf_indices = self.cf_handle(CF_INDICES)?;
        batch.delete_cf(
            &cf_indices,
            Self::index_key_reconciliation(reconciliation.business_id, reconciliation.id),
        );
        batch.delete_cf(
            &cf_indices,
            Self::index_key_reconciled_pair(
                reconciliation.payment_voucher_id,
                reconciliation.receipt_voucher_id,
            ),
        );

        self.db.write(batch)?;
        Ok(())
    }

    /// Reconciliations of a business, in creation order
    pub fn list_reconciliations(&self, business_id: BusinessId) -> Result<Vec<Reconciliation>> {
        let prefix = Self::business_prefix(TAG_RECONCILIATION, business_id);
        self.scan_ids(&prefix)?
            .into_iter()
            .map(|id| self.get_reconciliation(id))
            .collect()
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            sub_systems: self.approximate_count(CF_SUB_SYSTEMS)?,
            treasuries: self.approximate_count(CF_TREASURIES)?,
            vouchers: self.approximate_count(CF_VOUCHERS)?,
            intermediaries: self.approximate_count(CF_INTERMEDIARIES)?,
            reconciliations: self.approximate_count(CF_RECONCILIATIONS)?,
        })
    }

    fn approximate_count(&self, cf_name: &str) -> Result<u64> {
        let cf = self.cf_handle(cf_name)?;
        // RocksDB property for approximate count
        let prop = self
            .db
            .property_int_value_cf(&cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);
        Ok(prop)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

/// Storage statistics (approximate key counts)
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Sub-system records
    pub sub_systems: u64,
    /// Treasury records
    pub treasuries: u64,
    /// Voucher records
    pub vouchers: u64,
    /// Intermediary account records
    pub intermediaries: u64,
    /// Reconciliation records
    pub reconciliations: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Counterpart, TreasuryDetails, TreasuryKind, VoucherStatus,
    };
    use chrono::Utc;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Storage::open(&config).unwrap(), temp_dir)
    }

    fn test_sub_system(business_id: BusinessId, code: &str) -> SubSystem {
        SubSystem {
            id: Uuid::now_v7(),
            business_id,
            code: code.to_string(),
            name: format!("Sub-system {}", code),
            description: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn test_treasury(business_id: BusinessId, sub_system_id: Uuid, code: &str) -> Treasury {
        Treasury {
            id: Uuid::now_v7(),
            business_id,
            sub_system_id,
            code: code.to_string(),
            name: format!("Treasury {}", code),
            description: None,
            kind: TreasuryKind::Bank,
            currency: Currency::USD,
            opening_balance: Decimal::new(100000, 2),
            balance: Decimal::new(100000, 2),
            overdraft_allowed: false,
            is_active: true,
            details: TreasuryDetails::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_voucher(
        business_id: BusinessId,
        sub_system_id: Uuid,
        treasury_id: Uuid,
        direction: VoucherDirection,
    ) -> Voucher {
        Voucher {
            id: Uuid::now_v7(),
            business_id,
            sub_system_id,
            treasury_id,
            number: format!("{}-000001", direction.number_prefix()),
            direction,
            amount: Decimal::new(25000, 2),
            currency: Currency::USD,
            counterpart: Counterpart::Entity {
                name: "Utility Co".to_string(),
            },
            description: None,
            voucher_date: Utc::now(),
            status: VoucherStatus::Draft,
            reconciled: false,
            reconciled_with: None,
            reconciled_at: None,
            transfer_ref: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_storage_open() {
        let (storage, _temp) = test_storage();
        assert!(storage.db.cf_handle(CF_SUB_SYSTEMS).is_some());
        assert!(storage.db.cf_handle(CF_VOUCHERS).is_some());
        assert!(storage.db.cf_handle(CF_INDICES).is_some());
    }

    #[test]
    fn test_sub_system_roundtrip_and_code_lookup() {
        let (storage, _temp) = test_storage();
        let business = BusinessId::new(7);

        let sub = test_sub_system(business, "OPS");
        storage.create_sub_system_atomic(&sub).unwrap();

        let retrieved = storage.get_sub_system(sub.id).unwrap();
        assert_eq!(retrieved.code, "OPS");

        let found = storage.find_sub_system_by_code(business, "OPS").unwrap();
        assert_eq!(found, Some(sub.id));
        assert_eq!(storage.find_sub_system_by_code(business, "HR").unwrap(), None);

        // Other tenants never see it
        let other = BusinessId::new(8);
        assert_eq!(storage.find_sub_system_by_code(other, "OPS").unwrap(), None);
        assert!(storage.list_sub_systems(other).unwrap().is_empty());
    }

    #[test]
    fn test_treasury_scoped_listing() {
        let (storage, _temp) = test_storage();
        let business = BusinessId::new(1);

        let sub_a = test_sub_system(business, "A");
        let sub_b = test_sub_system(business, "B");
        storage.create_sub_system_atomic(&sub_a).unwrap();
        storage.create_sub_system_atomic(&sub_b).unwrap();

        storage
            .create_treasury_atomic(&test_treasury(business, sub_a.id, "CASH"))
            .unwrap();
        storage
            .create_treasury_atomic(&test_treasury(business, sub_a.id, "BANK"))
            .unwrap();
        storage
            .create_treasury_atomic(&test_treasury(business, sub_b.id, "CASH"))
            .unwrap();

        assert_eq!(storage.list_treasuries(business, None).unwrap().len(), 3);
        assert_eq!(
            storage.list_treasuries(business, Some(sub_a.id)).unwrap().len(),
            2
        );
        assert_eq!(
            storage.list_treasuries(business, Some(sub_b.id)).unwrap().len(),
            1
        );

        let found = storage
            .find_treasury_by_code(business, sub_a.id, "CASH")
            .unwrap();
        assert!(found.is_some());
        // Same code under the other sub-system is a different treasury
        let found_b = storage
            .find_treasury_by_code(business, sub_b.id, "CASH")
            .unwrap();
        assert_ne!(found, found_b);
    }

    #[test]
    fn test_voucher_create_advances_counter() {
        let (storage, _temp) = test_storage();
        let business = BusinessId::new(1);
        let sub = test_sub_system(business, "OPS");
        storage.create_sub_system_atomic(&sub).unwrap();
        let treasury = test_treasury(business, sub.id, "MAIN");
        storage.create_treasury_atomic(&treasury).unwrap();

        assert_eq!(
            storage
                .current_sequence(business, sub.id, VoucherDirection::Payment)
                .unwrap(),
            0
        );

        let voucher = test_voucher(business, sub.id, treasury.id, VoucherDirection::Payment);
        storage.create_voucher_atomic(&voucher, 1).unwrap();

        assert_eq!(
            storage
                .current_sequence(business, sub.id, VoucherDirection::Payment)
                .unwrap(),
            1
        );
        // Receipt sequence is independent
        assert_eq!(
            storage
                .current_sequence(business, sub.id, VoucherDirection::Receipt)
                .unwrap(),
            0
        );

        let retrieved = storage.get_voucher(voucher.id).unwrap();
        assert_eq!(retrieved.number, "PV-000001");
        assert_eq!(retrieved.status, VoucherStatus::Draft);
    }

    #[test]
    fn test_confirm_voucher_updates_treasury_atomically() {
        let (storage, _temp) = test_storage();
        let business = BusinessId::new(1);
        let sub = test_sub_system(business, "OPS");
        storage.create_sub_system_atomic(&sub).unwrap();
        let mut treasury = test_treasury(business, sub.id, "MAIN");
        storage.create_treasury_atomic(&treasury).unwrap();

        let mut voucher = test_voucher(business, sub.id, treasury.id, VoucherDirection::Receipt);
        storage.create_voucher_atomic(&voucher, 1).unwrap();

        voucher.mark_confirmed().unwrap();
        treasury.post(voucher.signed_amount(), Utc::now()).unwrap();
        storage.confirm_voucher_atomic(&voucher, &treasury).unwrap();

        let stored_treasury = storage.get_treasury(treasury.id).unwrap();
        assert_eq!(stored_treasury.balance, Decimal::new(125000, 2));
        let stored_voucher = storage.get_voucher(voucher.id).unwrap();
        assert_eq!(stored_voucher.status, VoucherStatus::Confirmed);

        // Plain counterpart vouchers never enter the unreconciled index
        assert!(storage.list_unreconciled(business).unwrap().is_empty());
    }

    #[test]
    fn test_pair_index_blocks_and_clears() {
        let (storage, _temp) = test_storage();
        let business = BusinessId::new(1);
        let payment_id = Uuid::now_v7();
        let receipt_id = Uuid::now_v7();

        assert_eq!(
            storage
                .find_reconciliation_for_pair(payment_id, receipt_id)
                .unwrap(),
            None
        );

        let rec = Reconciliation {
            id: Uuid::now_v7(),
            business_id: business,
            payment_voucher_id: payment_id,
            receipt_voucher_id: receipt_id,
            amount: Decimal::new(25000, 2),
            currency: Currency::USD,
            confidence: crate::types::Confidence::Medium,
            status: crate::types::ReconciliationStatus::Pending,
            notes: None,
            created_at: Utc::now(),
            confirmed_by: None,
            confirmed_at: None,
        };
        storage.insert_reconciliation_atomic(&rec).unwrap();

        assert_eq!(
            storage
                .find_reconciliation_for_pair(payment_id, receipt_id)
                .unwrap(),
            Some(rec.id)
        );
        assert_eq!(storage.list_reconciliations(business).unwrap().len(), 1);

        storage.clear_rejection_atomic(&rec).unwrap();
        assert_eq!(
            storage
                .find_reconciliation_for_pair(payment_id, receipt_id)
                .unwrap(),
            None
        );
        assert!(storage.list_reconciliations(business).unwrap().is_empty());
    }
}
