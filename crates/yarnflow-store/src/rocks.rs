//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};
use serde::de::DeserializeOwned;
use yarnflow_core::{ContractId, OrderId, OrderNumber, UserId};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::types::{AuditEntry, ChatMessage, Contract, Order, OrderStatus, Role, User};
use crate::{Store, WriteOp};

/// RocksDB-backed storage implementation.
///
/// Reads go straight to the database. Writes take `write_lock` so the
/// read-check-write of unique indexes cannot interleave.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)?;
        tracing::debug!("opened rocksdb store");

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_record<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Follow a unique lookup index to its primary record.
    fn get_by_lookup<T: DeserializeOwned>(
        &self,
        index_cf: &'static str,
        primary_cf: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.cf(index_cf)?;
        let Some(value) = self.db.get_cf(&cf, key)? else {
            return Ok(None);
        };
        let id = keys::id_value(&value).ok_or(StoreError::CorruptKey(index_cf))?;
        self.get_record(primary_cf, &id)
    }

    /// Collect every key of `cf_name` that starts with `prefix`.
    fn scan_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Box<[u8]>>> {
        let cf = self.cf(cf_name)?;
        let mut found = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            let (key, _) = item?;

            // Stop if we're past the prefix
            if !key.starts_with(prefix) {
                break;
            }
            found.push(key);
        }

        Ok(found)
    }

    /// Resolve index keys ending in a record id to the primary records.
    fn records_by_index<T: DeserializeOwned>(
        &self,
        index_cf: &'static str,
        primary_cf: &str,
        prefix: &[u8],
    ) -> Result<Vec<T>> {
        let mut records = Vec::new();
        for key in self.scan_prefix(index_cf, prefix)? {
            let id = keys::trailing_id(&key).ok_or(StoreError::CorruptKey(index_cf))?;
            if let Some(record) = self.get_record(primary_cf, &id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn list_all<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            records.push(Self::deserialize(&value)?);
        }
        Ok(records)
    }

    /// Fail with `Conflict` if `key` in `index_cf` maps to an id other than
    /// `owner`.
    fn check_unique(
        &self,
        index_cf: &'static str,
        key: &[u8],
        owner: &[u8; 16],
        taken: impl FnOnce() -> String,
    ) -> Result<()> {
        let cf = self.cf(index_cf)?;
        match self.db.get_cf(&cf, key)? {
            Some(value) if value.as_slice() != owner.as_slice() => {
                Err(StoreError::Conflict(taken()))
            }
            _ => Ok(()),
        }
    }

    fn require_order(&self, order_id: &OrderId) -> Result<()> {
        let cf = self.cf(cf::ORDERS)?;
        if self.db.get_cf(&cf, keys::id_key(order_id))?.is_none() {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Batch Staging
    //
    // Callers hold `write_lock` from the first stage to `db.write`.
    // =========================================================================

    fn stage_user(&self, batch: &mut WriteBatch, user: &User) -> Result<()> {
        let cf_users = self.cf(cf::USERS)?;
        let cf_by_username = self.cf(cf::USERS_BY_USERNAME)?;
        let cf_by_email = self.cf(cf::USERS_BY_EMAIL)?;
        let cf_by_role = self.cf(cf::USERS_BY_ROLE)?;

        let user_key = keys::id_key(&user.user_id);
        let username_key = keys::lookup_key(&user.username);
        let email_key = keys::lookup_key(&user.email);

        self.check_unique(
            cf::USERS_BY_USERNAME,
            &username_key,
            user.user_id.as_bytes(),
            || format!("username {} is taken", user.username),
        )?;
        self.check_unique(
            cf::USERS_BY_EMAIL,
            &email_key,
            user.user_id.as_bytes(),
            || format!("email {} is already registered", user.email),
        )?;

        let value = Self::serialize(user)?;
        let old: Option<User> = self.get_record(cf::USERS, &user_key)?;

        if let Some(old) = old {
            let old_username = keys::lookup_key(&old.username);
            if old_username != username_key {
                batch.delete_cf(&cf_by_username, &old_username);
            }
            let old_email = keys::lookup_key(&old.email);
            if old_email != email_key {
                batch.delete_cf(&cf_by_email, &old_email);
            }
            if old.role != user.role {
                batch.delete_cf(
                    &cf_by_role,
                    keys::role_user_key(old.role.as_u8(), &user.user_id),
                );
            }
        }

        batch.put_cf(&cf_users, &user_key, &value);
        batch.put_cf(&cf_by_username, &username_key, user.user_id.as_bytes());
        batch.put_cf(&cf_by_email, &email_key, user.user_id.as_bytes());
        batch.put_cf(
            &cf_by_role,
            keys::role_user_key(user.role.as_u8(), &user.user_id),
            [],
        );
        Ok(())
    }

    fn stage_order(&self, batch: &mut WriteBatch, order: &Order) -> Result<()> {
        let cf_orders = self.cf(cf::ORDERS)?;
        let cf_by_number = self.cf(cf::ORDERS_BY_NUMBER)?;
        let cf_by_status = self.cf(cf::ORDERS_BY_STATUS)?;
        let cf_by_creator = self.cf(cf::ORDERS_BY_CREATOR)?;

        let order_key = keys::id_key(&order.order_id);
        let number_key = keys::order_number_key(order.order_number);

        self.check_unique(
            cf::ORDERS_BY_NUMBER,
            &number_key,
            order.order_id.as_bytes(),
            || format!("order number {} is already in use", order.order_number),
        )?;

        let value = Self::serialize(order)?;

        // Check if the order exists to handle index updates
        let old: Option<Order> = self.get_record(cf::ORDERS, &order_key)?;

        if let Some(old) = old {
            if old.status != order.status {
                batch.delete_cf(
                    &cf_by_status,
                    keys::status_order_key(old.status.as_u8(), &order.order_id),
                );
            }
            if old.order_number != order.order_number {
                batch.delete_cf(&cf_by_number, keys::order_number_key(old.order_number));
            }
        }

        batch.put_cf(&cf_orders, &order_key, &value);
        batch.put_cf(&cf_by_number, &number_key, order.order_id.as_bytes());
        batch.put_cf(
            &cf_by_status,
            keys::status_order_key(order.status.as_u8(), &order.order_id),
            [],
        );
        batch.put_cf(
            &cf_by_creator,
            keys::creator_order_key(&order.created_by, &order.order_id),
            [],
        );
        Ok(())
    }

    fn stage_delete_order(
        &self,
        batch: &mut WriteBatch,
        order_id: &OrderId,
    ) -> Result<Vec<Contract>> {
        let cf_orders = self.cf(cf::ORDERS)?;
        let cf_by_number = self.cf(cf::ORDERS_BY_NUMBER)?;
        let cf_by_status = self.cf(cf::ORDERS_BY_STATUS)?;
        let cf_by_creator = self.cf(cf::ORDERS_BY_CREATOR)?;
        let cf_messages = self.cf(cf::MESSAGES)?;
        let cf_messages_by_order = self.cf(cf::MESSAGES_BY_ORDER)?;
        let cf_contracts = self.cf(cf::CONTRACTS)?;
        let cf_contracts_by_order = self.cf(cf::CONTRACTS_BY_ORDER)?;

        let order: Order = self
            .get_record(cf::ORDERS, &keys::id_key(order_id))?
            .ok_or(StoreError::NotFound)?;
        let prefix = keys::id_prefix(order_id);

        batch.delete_cf(&cf_orders, keys::id_key(order_id));
        batch.delete_cf(&cf_by_number, keys::order_number_key(order.order_number));
        batch.delete_cf(
            &cf_by_status,
            keys::status_order_key(order.status.as_u8(), order_id),
        );
        batch.delete_cf(
            &cf_by_creator,
            keys::creator_order_key(&order.created_by, order_id),
        );

        for key in self.scan_prefix(cf::MESSAGES_BY_ORDER, &prefix)? {
            let message_id =
                keys::trailing_id(&key).ok_or(StoreError::CorruptKey(cf::MESSAGES_BY_ORDER))?;
            batch.delete_cf(&cf_messages, message_id);
            batch.delete_cf(&cf_messages_by_order, &key);
        }

        let contracts = self.list_contracts_by_order(order_id)?;
        for contract in &contracts {
            batch.delete_cf(&cf_contracts, keys::id_key(&contract.contract_id));
            batch.delete_cf(
                &cf_contracts_by_order,
                keys::order_contract_key(order_id, &contract.contract_id),
            );
        }

        Ok(contracts)
    }

    fn stage_message(&self, batch: &mut WriteBatch, message: &ChatMessage) -> Result<()> {
        let cf_messages = self.cf(cf::MESSAGES)?;
        let cf_by_order = self.cf(cf::MESSAGES_BY_ORDER)?;

        self.require_order(&message.order_id)?;
        let value = Self::serialize(message)?;

        batch.put_cf(&cf_messages, keys::id_key(&message.message_id), &value);
        batch.put_cf(
            &cf_by_order,
            keys::order_message_key(&message.order_id, &message.created_at, &message.message_id),
            [],
        );
        Ok(())
    }

    fn stage_contract(&self, batch: &mut WriteBatch, contract: &Contract) -> Result<()> {
        let cf_contracts = self.cf(cf::CONTRACTS)?;
        let cf_by_order = self.cf(cf::CONTRACTS_BY_ORDER)?;

        self.require_order(&contract.order_id)?;
        let value = Self::serialize(contract)?;

        batch.put_cf(&cf_contracts, keys::id_key(&contract.contract_id), &value);
        batch.put_cf(
            &cf_by_order,
            keys::order_contract_key(&contract.order_id, &contract.contract_id),
            [],
        );
        Ok(())
    }

    fn stage_audit(&self, batch: &mut WriteBatch, entry: &AuditEntry) -> Result<()> {
        let cf = self.cf(cf::AUDIT_LOG)?;
        let key = keys::audit_key(&entry.created_at, &entry.audit_id);
        batch.put_cf(&cf, key, Self::serialize(entry)?);
        Ok(())
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Batched Writes
    // =========================================================================

    fn commit(&self, ops: &[WriteOp<'_>]) -> Result<()> {
        let _guard = self.write_lock.lock();

        let mut batch = WriteBatch::default();
        for op in ops {
            match op {
                WriteOp::PutUser(user) => self.stage_user(&mut batch, user)?,
                WriteOp::PutOrder(order) => self.stage_order(&mut batch, order)?,
                WriteOp::PutMessage(message) => self.stage_message(&mut batch, message)?,
                WriteOp::PutContract(contract) => self.stage_contract(&mut batch, contract)?,
                WriteOp::AppendAudit(entry) => self.stage_audit(&mut batch, entry)?,
            }
        }

        self.db.write(batch)?;
        tracing::trace!(ops = ops.len(), "committed write batch");
        Ok(())
    }

    // =========================================================================
    // User Operations
    // =========================================================================

    fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        self.get_record(cf::USERS, &keys::id_key(user_id))
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.get_by_lookup(cf::USERS_BY_USERNAME, cf::USERS, &keys::lookup_key(username))
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.get_by_lookup(cf::USERS_BY_EMAIL, cf::USERS, &keys::lookup_key(email))
    }

    fn list_users(&self) -> Result<Vec<User>> {
        self.list_all(cf::USERS)
    }

    fn list_users_by_role(&self, role: Role) -> Result<Vec<User>> {
        self.records_by_index(
            cf::USERS_BY_ROLE,
            cf::USERS,
            &keys::byte_prefix(role.as_u8()),
        )
    }

    fn count_users_by_role(&self, role: Role) -> Result<u32> {
        let found = self.scan_prefix(cf::USERS_BY_ROLE, &keys::byte_prefix(role.as_u8()))?;
        Ok(u32::try_from(found.len()).unwrap_or(u32::MAX))
    }

    // =========================================================================
    // Order Operations
    // =========================================================================

    fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        self.get_record(cf::ORDERS, &keys::id_key(order_id))
    }

    fn get_order_by_number(&self, number: OrderNumber) -> Result<Option<Order>> {
        self.get_by_lookup(
            cf::ORDERS_BY_NUMBER,
            cf::ORDERS,
            &keys::order_number_key(number),
        )
    }

    fn list_orders(&self) -> Result<Vec<Order>> {
        self.list_all(cf::ORDERS)
    }

    fn list_orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        self.records_by_index(
            cf::ORDERS_BY_STATUS,
            cf::ORDERS,
            &keys::byte_prefix(status.as_u8()),
        )
    }

    fn list_orders_by_creator(&self, user_id: &UserId) -> Result<Vec<Order>> {
        self.records_by_index(cf::ORDERS_BY_CREATOR, cf::ORDERS, &keys::id_prefix(user_id))
    }

    fn delete_order(&self, order_id: &OrderId, audit: &AuditEntry) -> Result<Vec<Contract>> {
        let _guard = self.write_lock.lock();

        let mut batch = WriteBatch::default();
        let contracts = self.stage_delete_order(&mut batch, order_id)?;
        self.stage_audit(&mut batch, audit)?;

        self.db.write(batch)?;
        Ok(contracts)
    }

    // =========================================================================
    // Chat Operations
    // =========================================================================

    fn list_messages_by_order(&self, order_id: &OrderId) -> Result<Vec<ChatMessage>> {
        self.records_by_index(
            cf::MESSAGES_BY_ORDER,
            cf::MESSAGES,
            &keys::id_prefix(order_id),
        )
    }

    fn list_recent_messages(&self, limit: usize) -> Result<Vec<ChatMessage>> {
        let mut messages: Vec<ChatMessage> = self.list_all(cf::MESSAGES)?;
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        messages.truncate(limit);
        Ok(messages)
    }

    // =========================================================================
    // Contract Operations
    // =========================================================================

    fn get_contract(&self, contract_id: &ContractId) -> Result<Option<Contract>> {
        self.get_record(cf::CONTRACTS, &keys::id_key(contract_id))
    }

    fn list_contracts_by_order(&self, order_id: &OrderId) -> Result<Vec<Contract>> {
        let mut contracts: Vec<Contract> = self.records_by_index(
            cf::CONTRACTS_BY_ORDER,
            cf::CONTRACTS,
            &keys::id_prefix(order_id),
        )?;
        contracts.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
        Ok(contracts)
    }

    // =========================================================================
    // Audit Operations
    // =========================================================================

    fn list_audit(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let cf = self.cf(cf::AUDIT_LOG)?;
        let mut entries = Vec::new();

        for item in self.db.iterator_cf(&cf, IteratorMode::End).take(limit) {
            let (_, value) = item?;
            entries.push(Self::deserialize(&value)?);
        }

        Ok(entries)
    }
}
