use std::sync::Arc;

use async_trait::async_trait;
use backend::{Backend, Query, TableClient};
use chrono::Utc;
use models::assignment::{SchedulePaymentRequest, UpdateAssignmentsRequest};
use models::identity::{Identity, IdentityHandle, NewIdentity};
use models::profile::{NewProfile, Role};
use models::staff::{AddFieldStaffRequest, CreateStaffRequest, NewStaff, NewStaffMetadata, Staff, StaffListing, StaffStatus};
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ServiceError, ServiceResult};
use crate::provisioning::{IdentityStore, Provisioner, RecordStore};

/// `profiles` + `staff` as the record half of office staff provisioning.
#[derive(Clone)]
pub struct StaffRecords {
    profiles: TableClient,
    staff: TableClient,
}

impl StaffRecords {
    pub fn new(backend: &Backend) -> Self { Self { profiles: backend.table("profiles"), staff: backend.table("staff") } }
}

#[async_trait]
impl RecordStore<CreateStaffRequest> for StaffRecords {
    type Record = Staff;

    fn kind(&self) -> &'static str { "staff" }

    async fn find_duplicate(&self, req: &CreateStaffRequest) -> ServiceResult<Option<String>> {
        let query = Query::new().select("id").eq("username", req.normalized_username());
        let hit: Option<Value> = self.staff.select_first(&query).await?;
        Ok(hit.map(|_| "Staff with this username already exists".to_string()))
    }

    // staff.id references profiles.id, so the profile goes first. Deleting the
    // identity on a later failure cascades to the profile row.
    async fn insert(&self, req: &CreateStaffRequest, identity: &Identity) -> ServiceResult<Staff> {
        let now = Utc::now();
        let profile = NewProfile {
            id: identity.id,
            role: Role::for_staff(&req.role),
            full_name: req.name.trim().to_string(),
            username: Some(req.normalized_username()),
            phone: req.phone.clone(),
            login_enabled: true,
            staff_type: Some(req.role.clone()),
            created_at: now,
            updated_at: now,
        };
        self.profiles
            .insert::<_, Value>(&profile)
            .await
            .map_err(ServiceError::upstream("Profile Creation Failed"))?;

        let row = NewStaff::from_request(req, identity.id);
        self.staff.insert(&row).await.map_err(ServiceError::upstream("Database Insert Failed"))
    }
}

/// `profiles` + `staff_metadata` for field staff.
#[derive(Clone)]
pub struct FieldStaffRecords {
    profiles: TableClient,
    metadata: TableClient,
}

impl FieldStaffRecords {
    pub fn new(backend: &Backend) -> Self {
        Self { profiles: backend.table("profiles"), metadata: backend.table("staff_metadata") }
    }
}

#[async_trait]
impl RecordStore<AddFieldStaffRequest> for FieldStaffRecords {
    type Record = Uuid;

    fn kind(&self) -> &'static str { "field_staff" }

    async fn find_duplicate(&self, req: &AddFieldStaffRequest) -> ServiceResult<Option<String>> {
        let query = Query::new().select("id").eq("phone", req.phone.trim());
        let hit: Option<Value> = self.profiles.select_first(&query).await?;
        Ok(hit.map(|_| "A profile with this phone already exists".to_string()))
    }

    async fn insert(&self, req: &AddFieldStaffRequest, identity: &Identity) -> ServiceResult<Uuid> {
        let now = Utc::now();
        let profile = NewProfile {
            id: identity.id,
            role: Role::for_field_staff(&req.staff_type),
            full_name: req.full_name.trim().to_string(),
            username: None,
            phone: Some(req.phone.trim().to_string()),
            login_enabled: true,
            staff_type: Some(req.staff_type.clone()),
            created_at: now,
            updated_at: now,
        };
        self.profiles
            .insert::<_, Value>(&profile)
            .await
            .map_err(ServiceError::upstream("Profile Creation Failed"))?;

        let meta = NewStaffMetadata {
            user_id: identity.id,
            staff_type: req.staff_type.clone(),
            daily_target: req.daily_target,
            is_active: true,
        };
        self.metadata
            .insert::<_, Value>(&meta)
            .await
            .map_err(ServiceError::upstream("Staff Metadata Failed"))?;
        Ok(identity.id)
    }
}

pub struct StaffService<I: IdentityStore> {
    backend: Backend,
    staff: StaffRecords,
    field_staff: FieldStaffRecords,
    provisioner: Provisioner<I>,
}

impl<I: IdentityStore> StaffService<I> {
    pub fn new(backend: Backend, identities: Arc<I>) -> Self {
        Self {
            staff: StaffRecords::new(&backend),
            field_staff: FieldStaffRecords::new(&backend),
            provisioner: Provisioner::new(identities),
            backend,
        }
    }

    /// Office staff sign in with `<username>@staff.local`.
    #[instrument(skip(self, req), fields(username = %req.username))]
    pub async fn create(&self, req: CreateStaffRequest) -> ServiceResult<Staff> {
        req.validate()?;
        let identity = NewIdentity {
            handle: IdentityHandle::Email(req.synthetic_email()),
            password: req.password.clone(),
            metadata: json!({ "full_name": req.name.trim(), "role": req.role, "is_staff": true }),
        };
        let done = self.provisioner.provision(&self.staff, &req, identity).await?;
        info!(staff_id = %done.record.id, "staff_created");
        Ok(done.record)
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn add_field_staff(&self, req: AddFieldStaffRequest) -> ServiceResult<Uuid> {
        req.validate()?;
        let identity = NewIdentity {
            handle: IdentityHandle::Email(req.email.trim().to_lowercase()),
            password: req.password.clone(),
            metadata: json!({ "full_name": req.full_name.trim() }),
        };
        let done = self.provisioner.provision(&self.field_staff, &req, identity).await?;
        info!(user_id = %done.record, "field_staff_created");
        Ok(done.record)
    }

    /// Directory from the remote function, filtered here on name, username and code.
    pub async fn list(&self, needle: Option<&str>) -> ServiceResult<Vec<StaffListing>> {
        let data = self.backend.functions().invoke_data("list-staff", &json!({})).await?;
        let entries: Vec<StaffListing> = match data {
            Value::Null => Vec::new(),
            other => serde_json::from_value(other)
                .map_err(|e| ServiceError::Upstream(format!("unexpected staff list shape: {e}")))?,
        };
        Ok(match needle {
            Some(q) => entries.into_iter().filter(|s| s.matches(q)).collect(),
            None => entries,
        })
    }

    pub async fn toggle_status(&self, id: Uuid, current: Option<StaffStatus>) -> ServiceResult<Value> {
        Ok(self
            .backend
            .functions()
            .invoke("toggle-staff-status", &json!({ "id": id, "currentStatus": current }))
            .await?)
    }

    pub async fn details(&self, id: Uuid) -> ServiceResult<Value> {
        let data = self.backend.functions().invoke_data("get-staff-details", &json!({ "id": id })).await?;
        if data.is_null() {
            return Err(ServiceError::not_found("Staff not found"));
        }
        Ok(data)
    }

    pub async fn update_assignments(&self, staff_id: Uuid, req: UpdateAssignmentsRequest) -> ServiceResult<Value> {
        Ok(self
            .backend
            .functions()
            .invoke("update-staff-assignments", &json!({ "staffId": staff_id, "customerIds": req.customer_ids }))
            .await?)
    }

    pub async fn schedule_payment(&self, staff_id: Uuid, req: SchedulePaymentRequest) -> ServiceResult<Value> {
        req.validate()?;
        Ok(self.backend.functions().invoke("schedule-payment", &req.payload(staff_id)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provisioning::mock::MockIdentityStore;
    use backend::BackendSettings;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer, identities: Arc<MockIdentityStore>) -> StaffService<MockIdentityStore> {
        let backend = Backend::new(BackendSettings::new(server.uri(), "eyJanon", "eyJservice")).unwrap();
        StaffService::new(backend, identities)
    }

    fn staff_request() -> CreateStaffRequest {
        serde_json::from_value(json!({ "name": "Meera", "username": " Meera ", "password": "secret1" })).unwrap()
    }

    #[tokio::test]
    async fn create_writes_profile_then_staff() {
        let server = MockServer::start().await;
        let staff_id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path("/rest/v1/staff"))
            .and(query_param("username", "eq.meera"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/profiles"))
            .and(body_partial_json(json!({ "role": "office_staff", "username": "meera", "staff_type": "staff" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": Uuid::new_v4() })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/staff"))
            .and(body_partial_json(json!({ "email": "meera@staff.local", "status": "active" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": staff_id, "username": "meera" })))
            .expect(1)
            .mount(&server)
            .await;

        let identities = Arc::new(MockIdentityStore::default());
        let staff = service(&server, identities.clone()).create(staff_request()).await.unwrap();
        assert_eq!(staff.id, staff_id);
        assert_eq!(identities.len(), 1);
    }

    #[tokio::test]
    async fn taken_username_conflicts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/staff"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": Uuid::new_v4() }])))
            .mount(&server)
            .await;

        let identities = Arc::new(MockIdentityStore::default());
        let err = service(&server, identities.clone()).create(staff_request()).await.unwrap_err();
        assert_eq!(err.to_string(), "Staff with this username already exists");
        assert!(identities.is_empty());
    }

    #[tokio::test]
    async fn profile_failure_rolls_back_identity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/staff"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "message": "violates check constraint \"profiles_role_check\"" })))
            .mount(&server)
            .await;

        let identities = Arc::new(MockIdentityStore::default());
        let err = service(&server, identities.clone()).create(staff_request()).await.unwrap_err();
        assert!(err.to_string().starts_with("Profile Creation Failed"));
        assert!(identities.is_empty());
    }

    #[tokio::test]
    async fn field_staff_gets_collection_role_and_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/profiles"))
            .and(body_partial_json(json!({ "role": "collection_staff" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/staff_metadata"))
            .and(body_partial_json(json!({ "staff_type": "collection", "daily_target": 5000.0, "is_active": true })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let req: AddFieldStaffRequest = serde_json::from_value(json!({
            "email": "Ravi@Example.com", "fullName": "Ravi", "phone": "9876543210",
            "staffType": "collection", "dailyTarget": 5000, "password": "secret1"
        }))
        .unwrap();
        let identities = Arc::new(MockIdentityStore::default());
        let user_id = service(&server, identities.clone()).add_field_staff(req).await.unwrap();
        let identity = identities.get_identity(user_id).await.unwrap().unwrap();
        assert_eq!(identity.email.as_deref(), Some("ravi@example.com"));
    }

    #[tokio::test]
    async fn list_filters_function_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/functions/v1/admin-action"))
            .and(body_partial_json(json!({ "action": "list-staff" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [
                { "name": "Meera", "username": "meera", "staff_code": "STF001" },
                { "name": "Ravi", "username": "ravi", "staff_code": "STF002" }
            ]})))
            .mount(&server)
            .await;

        let svc = service(&server, Arc::new(MockIdentityStore::default()));
        assert_eq!(svc.list(None).await.unwrap().len(), 2);
        let hits = svc.list(Some("stf002")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name.as_deref(), Some("Ravi"));
    }

    #[tokio::test]
    async fn toggle_sends_current_status() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path("/functions/v1/admin-action"))
            .and(body_partial_json(json!({ "action": "toggle-staff-status", "payload": { "id": id, "currentStatus": "active" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let svc = service(&server, Arc::new(MockIdentityStore::default()));
        svc.toggle_status(id, Some(StaffStatus::Active)).await.unwrap();
    }
}
