//! Paired creation of an auth identity and the domain record that points at it.
//!
//! The two writes land in different subsystems, so there is no transaction.
//! Order is duplicate check, identity, record; a failed record write deletes
//! the identity again. If that delete fails too the identity is orphaned: it is
//! logged as critical and counted, and the caller still gets the record error.

use std::sync::Arc;

use async_trait::async_trait;
use backend::AuthAdminClient;
use common::metrics::{COMPENSATIONS_TOTAL, COMPENSATION_FAILURES_TOTAL, PROVISIONING_ATTEMPTS_TOTAL};
use models::identity::{Identity, NewIdentity};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::{ServiceError, ServiceResult};

/// Auth subsystem operations needed for provisioning.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn create_identity(&self, identity: &NewIdentity) -> ServiceResult<Identity>;
    async fn delete_identity(&self, id: Uuid) -> ServiceResult<()>;
    async fn get_identity(&self, id: Uuid) -> ServiceResult<Option<Identity>>;
}

/// Domain-side half of a provisioning unit, parameterised by the request plan `P`.
#[async_trait]
pub trait RecordStore<P: Sync>: Send + Sync {
    type Record: Send;

    /// Label for logs and metrics.
    fn kind(&self) -> &'static str;

    /// Conflict message when a record with the same unique handle exists.
    async fn find_duplicate(&self, plan: &P) -> ServiceResult<Option<String>>;

    async fn insert(&self, plan: &P, identity: &Identity) -> ServiceResult<Self::Record>;
}

#[derive(Debug, Clone)]
pub struct Provisioned<R> {
    pub record: R,
    pub identity_id: Uuid,
}

pub struct Provisioner<I: IdentityStore> {
    identities: Arc<I>,
}

impl<I: IdentityStore> Clone for Provisioner<I> {
    fn clone(&self) -> Self { Self { identities: self.identities.clone() } }
}

impl<I: IdentityStore> Provisioner<I> {
    pub fn new(identities: Arc<I>) -> Self { Self { identities } }

    pub fn identities(&self) -> &Arc<I> { &self.identities }

    /// Run duplicate check, identity creation and record write as one unit.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use models::identity::{IdentityHandle, NewIdentity};
    /// use service::provisioning::{Provisioner, mock::{MockIdentityStore, MockRecordStore}};
    ///
    /// let identities = Arc::new(MockIdentityStore::default());
    /// let records = MockRecordStore::default();
    /// let provisioner = Provisioner::new(identities.clone());
    /// let identity = NewIdentity {
    ///     handle: IdentityHandle::Phone("+919876543210".into()),
    ///     password: "secret1".into(),
    ///     metadata: serde_json::json!({}),
    /// };
    /// let done = tokio_test::block_on(provisioner.provision(&records, &"9876543210".to_string(), identity)).unwrap();
    /// assert_eq!(done.record, "9876543210");
    /// assert_eq!(identities.len(), 1);
    /// ```
    #[instrument(skip_all, fields(kind = store.kind(), handle = identity.handle.as_str()))]
    pub async fn provision<P, S>(&self, store: &S, plan: &P, identity: NewIdentity) -> ServiceResult<Provisioned<S::Record>>
    where
        P: Sync,
        S: RecordStore<P>,
    {
        let kind = store.kind();

        if let Some(message) = store.find_duplicate(plan).await? {
            PROVISIONING_ATTEMPTS_TOTAL.with_label_values(&[kind, "duplicate"]).inc();
            return Err(ServiceError::Conflict(message));
        }

        let created = match self.identities.create_identity(&identity).await {
            Ok(created) => created,
            Err(e) => {
                PROVISIONING_ATTEMPTS_TOTAL.with_label_values(&[kind, "identity_failed"]).inc();
                return Err(e);
            }
        };

        match store.insert(plan, &created).await {
            Ok(record) => {
                PROVISIONING_ATTEMPTS_TOTAL.with_label_values(&[kind, "created"]).inc();
                info!(event = "provisioned", kind, identity_id = %created.id, "identity and record created");
                Ok(Provisioned { record, identity_id: created.id })
            }
            Err(err) => {
                PROVISIONING_ATTEMPTS_TOTAL.with_label_values(&[kind, "rolled_back"]).inc();
                self.compensate(kind, created.id, &err).await;
                Err(err)
            }
        }
    }

    async fn compensate(&self, kind: &'static str, identity_id: Uuid, cause: &ServiceError) {
        COMPENSATIONS_TOTAL.inc();
        match self.identities.delete_identity(identity_id).await {
            Ok(()) => {
                warn!(event = "compensated", kind, %identity_id, cause = %cause, "record write failed; identity deleted");
            }
            Err(e) => {
                COMPENSATION_FAILURES_TOTAL.inc();
                error!(
                    critical = true,
                    event = "compensation_failed",
                    kind,
                    %identity_id,
                    cause = %cause,
                    error = %e,
                    "CRITICAL: identity left without a record; manual cleanup required"
                );
            }
        }
    }
}

/// `IdentityStore` over the auth admin API.
#[derive(Clone)]
pub struct BackendIdentityStore {
    client: AuthAdminClient,
}

impl BackendIdentityStore {
    pub fn new(client: AuthAdminClient) -> Self { Self { client } }
}

#[async_trait]
impl IdentityStore for BackendIdentityStore {
    async fn create_identity(&self, identity: &NewIdentity) -> ServiceResult<Identity> {
        // The auth API reports taken handles as 422, never as a table conflict.
        self.client.create_user(identity).await.map_err(|e| {
            let mapped = ServiceError::from(e);
            ServiceError::Upstream(format!("Auth Error: {mapped}"))
        })
    }

    async fn delete_identity(&self, id: Uuid) -> ServiceResult<()> {
        self.client.delete_user(id).await.map_err(ServiceError::from)
    }

    async fn get_identity(&self, id: Uuid) -> ServiceResult<Option<Identity>> {
        self.client.get_user(id).await.map_err(ServiceError::from)
    }
}

/// In-memory stores for tests and doc examples
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockIdentityStore {
        identities: Mutex<HashMap<Uuid, Identity>>,
        pub fail_create: AtomicBool,
        pub fail_delete: AtomicBool,
    }

    impl MockIdentityStore {
        pub fn len(&self) -> usize { self.identities.lock().unwrap().len() }

        pub fn is_empty(&self) -> bool { self.len() == 0 }
    }

    #[async_trait]
    impl IdentityStore for MockIdentityStore {
        async fn create_identity(&self, identity: &NewIdentity) -> ServiceResult<Identity> {
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(ServiceError::Upstream("Auth Error: identity service unavailable".into()));
            }
            let mut map = self.identities.lock().unwrap();
            let handle = identity.handle.as_str();
            if map.values().any(|i| i.email.as_deref() == Some(handle) || i.phone.as_deref() == Some(handle)) {
                return Err(ServiceError::Upstream("Auth Error: handle already registered".into()));
            }
            let created = Identity {
                id: Uuid::new_v4(),
                email: matches!(identity.handle, models::identity::IdentityHandle::Email(_)).then(|| handle.to_string()),
                phone: matches!(identity.handle, models::identity::IdentityHandle::Phone(_)).then(|| handle.to_string()),
                user_metadata: identity.metadata.clone(),
            };
            map.insert(created.id, created.clone());
            Ok(created)
        }

        async fn delete_identity(&self, id: Uuid) -> ServiceResult<()> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(ServiceError::Upstream("delete failed".into()));
            }
            self.identities.lock().unwrap().remove(&id);
            Ok(())
        }

        async fn get_identity(&self, id: Uuid) -> ServiceResult<Option<Identity>> {
            Ok(self.identities.lock().unwrap().get(&id).cloned())
        }
    }

    /// Records keyed by a plain string handle.
    #[derive(Default)]
    pub struct MockRecordStore {
        handles: Mutex<HashSet<String>>,
        pub fail_insert: AtomicBool,
    }

    impl MockRecordStore {
        pub fn contains(&self, handle: &str) -> bool { self.handles.lock().unwrap().contains(handle) }
    }

    #[async_trait]
    impl RecordStore<String> for MockRecordStore {
        type Record = String;

        fn kind(&self) -> &'static str { "mock" }

        async fn find_duplicate(&self, plan: &String) -> ServiceResult<Option<String>> {
            Ok(self.contains(plan).then(|| format!("{plan} already exists")))
        }

        async fn insert(&self, plan: &String, _identity: &Identity) -> ServiceResult<String> {
            if self.fail_insert.load(Ordering::SeqCst) {
                return Err(ServiceError::Upstream("Database Insert Failed: connection reset".into()));
            }
            self.handles.lock().unwrap().insert(plan.clone());
            Ok(plan.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;
    use models::identity::IdentityHandle;
    use std::sync::atomic::Ordering;

    fn identity(handle: &str) -> NewIdentity {
        NewIdentity {
            handle: IdentityHandle::Phone(handle.into()),
            password: "secret1".into(),
            metadata: serde_json::json!({ "role": "customer" }),
        }
    }

    #[tokio::test]
    async fn second_provision_with_same_handle_conflicts_without_writes() {
        let identities = Arc::new(MockIdentityStore::default());
        let records = MockRecordStore::default();
        let p = Provisioner::new(identities.clone());

        p.provision(&records, &"9876543210".to_string(), identity("+919876543210")).await.unwrap();
        let err = p.provision(&records, &"9876543210".to_string(), identity("+919876543210")).await.unwrap_err();

        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(identities.len(), 1);
    }

    #[tokio::test]
    async fn identity_failure_skips_record_write() {
        let identities = Arc::new(MockIdentityStore::default());
        identities.fail_create.store(true, Ordering::SeqCst);
        let records = MockRecordStore::default();
        let p = Provisioner::new(identities.clone());

        let err = p.provision(&records, &"a".to_string(), identity("+911111111111")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Upstream(_)));
        assert!(!records.contains("a"));
    }

    #[tokio::test]
    async fn record_failure_deletes_identity_and_returns_original_error() {
        let identities = Arc::new(MockIdentityStore::default());
        let records = MockRecordStore::default();
        records.fail_insert.store(true, Ordering::SeqCst);
        let p = Provisioner::new(identities.clone());

        let err = p.provision(&records, &"a".to_string(), identity("+912222222222")).await.unwrap_err();
        assert!(err.to_string().contains("Database Insert Failed"));
        assert!(identities.is_empty());
    }

    #[tokio::test]
    async fn failed_compensation_is_counted_and_original_error_kept() {
        let identities = Arc::new(MockIdentityStore::default());
        identities.fail_delete.store(true, Ordering::SeqCst);
        let records = MockRecordStore::default();
        records.fail_insert.store(true, Ordering::SeqCst);
        let p = Provisioner::new(identities.clone());

        let before = COMPENSATION_FAILURES_TOTAL.get();
        let err = p.provision(&records, &"a".to_string(), identity("+913333333333")).await.unwrap_err();

        assert!(err.to_string().contains("Database Insert Failed"));
        assert_eq!(identities.len(), 1);
        assert!(COMPENSATION_FAILURES_TOTAL.get() > before);
    }
}
