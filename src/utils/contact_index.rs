//! In-memory index of taken mobile numbers and e-mail addresses.
//!
//! The cuckoo filter gives fast "definitely free" answers; the moka cache
//! gives fast "taken, and by whom" answers. Neither is authoritative: a
//! miss in the cache falls back to the store. When a user and a teacher
//! share a value the cache names the user.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use anyhow::Result;
use autoscale_cuckoo_filter::CuckooFilter;
use moka::future::Cache;
use strum_macros::{AsRefStr, Display};

use crate::model::owner::OwnerKind;
use crate::model::teacher::Teacher;
use crate::model::user::User;
use crate::store::Collection;

const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;
const CACHE_CAPACITY: u64 = 500_000;
const CACHE_TTL: Duration = Duration::from_secs(86_400);

/// Which contact field a value belongs to. Also the document field name.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ContactField {
    Mobile,
    Email,
}

impl ContactField {
    /// Canonical stored form: trimmed, and lowercased for e-mail.
    pub fn normalize(self, value: &str) -> String {
        match self {
            ContactField::Mobile => value.trim().to_string(),
            ContactField::Email => value.trim().to_lowercase(),
        }
    }
}

pub struct ContactIndex {
    filter: RwLock<CuckooFilter<String>>,
    owners: Cache<String, OwnerKind>,
}

#[inline]
fn key(field: ContactField, value: &str) -> String {
    format!("{}:{}", field.as_ref(), field.normalize(value))
}

impl ContactIndex {
    pub fn new() -> Self {
        Self {
            filter: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
            owners: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    /// `false` means the value is certainly not taken.
    pub fn might_exist(&self, field: ContactField, value: &str) -> bool {
        self.filter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key(field, value))
    }

    pub async fn cached_owner(&self, field: ContactField, value: &str) -> Option<OwnerKind> {
        self.owners.get(&key(field, value)).await
    }

    /// Marks `value` as taken by `owner`. A cached user is kept when a
    /// teacher is remembered for the same value.
    pub async fn remember(&self, field: ContactField, value: &str, owner: OwnerKind) {
        let key = self.add_key(field, value);
        if owner == OwnerKind::Teacher && self.owners.get(&key).await == Some(OwnerKind::User) {
            return;
        }
        self.owners.insert(key, owner).await;
    }

    /// Marks `value` as taken by `owner`, replacing whichever owner was cached.
    pub async fn reassign(&self, field: ContactField, value: &str, owner: OwnerKind) {
        let key = self.add_key(field, value);
        self.owners.insert(key, owner).await;
    }

    fn add_key(&self, field: ContactField, value: &str) -> String {
        let key = key(field, value);
        let mut filter = self.filter.write().unwrap_or_else(PoisonError::into_inner);
        if !filter.contains(&key) {
            filter.add(&key);
        }
        key
    }

    /// Drops a value no account holds any more.
    pub async fn forget(&self, field: ContactField, value: &str) {
        let key = key(field, value);
        self.filter
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        self.owners.invalidate(&key).await;
    }

    fn insert_batch(&self, keys: &[String]) {
        let mut filter = self.filter.write().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            if !filter.contains(key) {
                filter.add(key);
            }
        }
    }

    /// Loads every stored user and teacher contact in batches.
    pub async fn warm_up(
        &self,
        users: &Collection<User>,
        teachers: &Collection<Teacher>,
        batch_size: usize,
    ) -> Result<()> {
        let mut owners: HashMap<String, OwnerKind> = HashMap::new();
        for teacher in teachers.all().await? {
            for (field, value) in [
                (ContactField::Mobile, teacher.doc.mobile),
                (ContactField::Email, teacher.doc.email),
            ] {
                if let Some(value) = value {
                    owners.insert(key(field, &value), OwnerKind::Teacher);
                }
            }
        }
        // users overwrite teachers on shared values
        for user in users.all().await? {
            for (field, value) in [
                (ContactField::Mobile, user.doc.mobile),
                (ContactField::Email, user.doc.email),
            ] {
                if let Some(value) = value {
                    owners.insert(key(field, &value), OwnerKind::User);
                }
            }
        }

        let contacts: Vec<(String, OwnerKind)> = owners.into_iter().collect();
        for chunk in contacts.chunks(batch_size.max(1)) {
            let keys: Vec<String> = chunk.iter().map(|(key, _)| key.clone()).collect();
            self.insert_batch(&keys);

            let inserts = chunk
                .iter()
                .map(|(key, owner)| self.owners.insert(key.clone(), *owner));
            futures::future::join_all(inserts).await;
        }

        log::info!("Contact index warmup complete: {} contacts", contacts.len());
        Ok(())
    }
}

impl Default for ContactIndex {
    fn default() -> Self {
        Self::new()
    }
}
