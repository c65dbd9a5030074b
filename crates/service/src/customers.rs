use std::sync::Arc;

use async_trait::async_trait;
use backend::{Backend, Query, TableClient};
use chrono::Utc;
use models::customer::{
    AccessActivation, CreateCustomerRequest, Customer, CustomerAccessRequest, NewCustomer, OfficeCustomerRequest,
    WhitelistEntry,
};
use models::enrollment::NewEnrollment;
use models::identity::{Identity, IdentityHandle, NewIdentity};
use models::phone::{digits_only, phone_candidates, to_e164};
use models::profile::Profile;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ServiceError, ServiceResult};
use crate::provisioning::{IdentityStore, Provisioner, RecordStore};

pub const CUSTOMER_CODE_PREFIX: &str = "CUS";

/// `CUS` followed by six random digits.
pub fn generate_customer_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("{CUSTOMER_CODE_PREFIX}{n}")
}

/// Validated request plus the code assigned to it.
#[derive(Debug, Clone)]
pub struct CustomerPlan {
    pub request: CreateCustomerRequest,
    pub customer_code: String,
}

/// `customers` table as the record half of customer provisioning.
#[derive(Clone)]
pub struct CustomerRecords {
    customers: TableClient,
}

impl CustomerRecords {
    pub fn new(backend: &Backend) -> Self { Self { customers: backend.table("customers") } }
}

#[async_trait]
impl RecordStore<CustomerPlan> for CustomerRecords {
    type Record = Customer;

    fn kind(&self) -> &'static str { "customer" }

    async fn find_duplicate(&self, plan: &CustomerPlan) -> ServiceResult<Option<String>> {
        let req = &plan.request;
        // the phone may be stored in any of its historical formats
        let candidates = phone_candidates(req.phone.trim());
        let mut pairs: Vec<(&str, &str)> = candidates.iter().map(|c| ("phone", c.as_str())).collect();
        pairs.push(("aadhaar_number", req.aadhaar_number.trim()));
        let query = Query::new().select("id").or_eq(&pairs);
        let hit: Option<Value> = self.customers.select_first(&query).await?;
        Ok(hit.map(|_| "Customer with this Phone or Aadhaar already exists".to_string()))
    }

    async fn insert(&self, plan: &CustomerPlan, identity: &Identity) -> ServiceResult<Customer> {
        let row = NewCustomer::from_request(&plan.request, identity.id, plan.customer_code.clone());
        self.customers.insert(&row).await.map_err(ServiceError::upstream("Database Insert Failed"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedCustomer {
    pub customer: Customer,
    pub identity_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrolled_scheme_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessGranted {
    pub customer: Customer,
    pub profile_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct SchemeMatch {
    id: Uuid,
    #[serde(default)]
    emi_amount: Option<f64>,
}

pub struct CustomerService<I: IdentityStore> {
    backend: Backend,
    records: CustomerRecords,
    provisioner: Provisioner<I>,
}

impl<I: IdentityStore> CustomerService<I> {
    pub fn new(backend: Backend, identities: Arc<I>) -> Self {
        Self { records: CustomerRecords::new(&backend), provisioner: Provisioner::new(identities), backend }
    }

    /// Onboard a customer with a phone login, then try to enroll them in the named scheme.
    #[instrument(skip(self, req), fields(phone = %req.phone))]
    pub async fn create(&self, req: CreateCustomerRequest) -> ServiceResult<CreatedCustomer> {
        req.validate()?;
        if digits_only(&req.phone).is_empty() {
            return Err(ServiceError::validation("phone", "Phone number must contain digits"));
        }

        let identity = NewIdentity {
            handle: IdentityHandle::Phone(to_e164(&req.phone)),
            password: req.password.clone(),
            metadata: json!({ "full_name": req.full_name.trim(), "role": "customer" }),
        };
        let plan = CustomerPlan { customer_code: generate_customer_code(), request: req };
        let done = self.provisioner.provision(&self.records, &plan, identity).await?;

        let enrolled_scheme_id = match plan.request.scheme_type.as_deref() {
            Some(scheme_type) => self.auto_enroll(done.record.id, scheme_type).await,
            None => None,
        };
        info!(customer_id = %done.record.id, code = %plan.customer_code, "customer_created");
        Ok(CreatedCustomer { customer: done.record, identity_id: done.identity_id, enrolled_scheme_id })
    }

    /// Best effort; the customer stays created whatever happens here.
    async fn auto_enroll(&self, customer_id: Uuid, scheme_type: &str) -> Option<Uuid> {
        let query = Query::new().select("id,emi_amount").ilike("name", scheme_type).eq("is_active", true);
        let scheme = match self.backend.table("schemes").select_first::<SchemeMatch>(&query).await {
            Ok(Some(s)) => s,
            Ok(None) => {
                warn!(%customer_id, scheme_type, "scheme not found or inactive; customer created without enrollment");
                return None;
            }
            Err(e) => {
                warn!(%customer_id, scheme_type, error = %e, "scheme lookup failed; skipping enrollment");
                return None;
            }
        };
        let row = NewEnrollment::auto(customer_id, scheme.id, scheme.emi_amount.unwrap_or_default(), Utc::now().date_naive());
        match self.backend.table("user_schemes").insert::<_, Value>(&row).await {
            Ok(_) => {
                info!(%customer_id, scheme_id = %scheme.id, "customer auto-enrolled");
                Some(scheme.id)
            }
            Err(e) => {
                warn!(%customer_id, scheme_id = %scheme.id, error = %e, "auto-enrollment failed");
                None
            }
        }
    }

    /// Turn on login for the customer owning `phone`, in whatever format it was stored.
    #[instrument(skip(self, req))]
    pub async fn activate_access(&self, req: CustomerAccessRequest, acting_admin: Option<Uuid>) -> ServiceResult<AccessGranted> {
        let phone = req
            .target_phone()
            .ok_or_else(|| ServiceError::validation("phone", "Phone number is required"))?;
        let candidates = phone_candidates(phone);
        let by_phone = Query::new().select("*").is_in("phone", &candidates);

        let customers = self.backend.table("customers");
        let found: Option<Customer> = customers
            .select_first(&by_phone)
            .await
            .map_err(ServiceError::upstream("Database error"))?;

        let Some(customer) = found else {
            return Err(self.explain_missing_customer(&candidates).await);
        };

        let updated: Vec<Customer> = customers
            .update(&Query::new().eq("id", customer.id), &AccessActivation::at(Utc::now()))
            .await
            .map_err(|e| {
                warn!(customer_id = %customer.id, error = %e, "activation update failed");
                ServiceError::Upstream("Failed to update customer record".into())
            })?;
        let updated = updated
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Upstream("Failed to update customer record".into()))?;

        let entry = WhitelistEntry {
            phone: customer.phone.clone().unwrap_or_else(|| phone.to_string()),
            active: true,
            added_by: acting_admin.or(req.admin_id),
            updated_at: Utc::now(),
        };
        self.backend
            .table("phone_whitelist")
            .upsert::<_, Value>("phone", &entry)
            .await
            .map_err(|e| {
                warn!(customer_id = %customer.id, error = %e, "whitelist upsert failed");
                ServiceError::Upstream("Failed to whitelist phone number".into())
            })?;

        info!(customer_id = %customer.id, "customer access activated");
        Ok(AccessGranted { customer: updated, profile_id: customer.id })
    }

    async fn explain_missing_customer(&self, candidates: &[String]) -> ServiceError {
        let query = Query::new().select("id,phone,full_name,role").is_in("phone", candidates);
        match self.backend.table("profiles").select_first::<Profile>(&query).await {
            Ok(Some(profile)) => ServiceError::NotFound(format!(
                "Phone number exists for {} \"{}\", but no Customer record found. Please create a Customer profile first.",
                profile.role.as_deref().unwrap_or("User"),
                profile.full_name.as_deref().unwrap_or_default()
            )),
            Ok(None) => ServiceError::not_found("Customer not found. Please create customer first."),
            Err(e) => {
                warn!(error = %e, "profile diagnostic lookup failed");
                ServiceError::not_found("Customer not found. Please create customer first.")
            }
        }
    }

    /// Customer directory from the remote function.
    pub async fn list(&self) -> ServiceResult<Value> {
        Ok(self.backend.functions().invoke("list-customers", &json!({})).await?)
    }

    /// Office quick-add; returns the new customer id when the function reports one.
    #[instrument(skip(self, req))]
    pub async fn office_add(&self, req: OfficeCustomerRequest) -> ServiceResult<Option<Value>> {
        req.validate()?;
        let body = self.backend.functions().invoke("add-customer", &req).await?;
        Ok(body
            .get("customerId")
            .or_else(|| body.pointer("/data/id"))
            .filter(|v| !v.is_null())
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provisioning::mock::MockIdentityStore;
    use backend::BackendSettings;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer, identities: Arc<MockIdentityStore>) -> CustomerService<MockIdentityStore> {
        let backend = Backend::new(BackendSettings::new(server.uri(), "eyJanon", "eyJservice")).unwrap();
        CustomerService::new(backend, identities)
    }

    fn create_request() -> CreateCustomerRequest {
        serde_json::from_value(json!({
            "full_name": "Asha Rao", "phone": "9876543210", "password": "secret1",
            "aadhaar_number": "123412341234", "scheme_type": "gold"
        }))
        .unwrap()
    }

    #[test]
    fn customer_codes_have_six_digits() {
        for _ in 0..50 {
            let code = generate_customer_code();
            assert!(code.starts_with("CUS"));
            assert_eq!(code.len(), 9);
            assert!(code[3..].chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn create_provisions_and_auto_enrolls() {
        let server = MockServer::start().await;
        let customer_id = Uuid::new_v4();
        let scheme_id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path("/rest/v1/customers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/customers"))
            .and(body_partial_json(json!({ "phone": "9876543210", "login_enabled": true, "is_active": true })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": customer_id, "phone": "9876543210" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/schemes"))
            .and(query_param("name", "ilike.*gold*"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": scheme_id, "emi_amount": 1000.0 }])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/user_schemes"))
            .and(body_partial_json(json!({ "status": "active", "total_grams": 0.0 })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": Uuid::new_v4() })))
            .expect(1)
            .mount(&server)
            .await;

        let identities = Arc::new(MockIdentityStore::default());
        let created = service(&server, identities.clone()).create(create_request()).await.unwrap();
        assert_eq!(created.customer.id, customer_id);
        assert_eq!(created.enrolled_scheme_id, Some(scheme_id));
        let identity = identities.get_identity(created.identity_id).await.unwrap().unwrap();
        assert_eq!(identity.phone.as_deref(), Some("+919876543210"));
    }

    #[tokio::test]
    async fn existing_phone_or_aadhaar_conflicts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/customers"))
            .and(query_param(
                "or",
                r#"(phone.eq."9876543210",phone.eq."919876543210",phone.eq."+919876543210",aadhaar_number.eq."123412341234")"#,
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": Uuid::new_v4() }])))
            .mount(&server)
            .await;

        let identities = Arc::new(MockIdentityStore::default());
        let err = service(&server, identities.clone()).create(create_request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!(identities.is_empty());
    }

    #[tokio::test]
    async fn phone_stored_in_e164_still_conflicts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/customers"))
            .and(|req: &wiremock::Request| {
                req.url.query_pairs().any(|(k, v)| k == "or" && v.contains(r#"phone.eq."+919876543210""#))
            })
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": Uuid::new_v4(), "phone": "+919876543210" }])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/customers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let identities = Arc::new(MockIdentityStore::default());
        let err = service(&server, identities.clone()).create(create_request()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "Customer with this Phone or Aadhaar already exists"));
        assert!(identities.is_empty());
    }

    #[tokio::test]
    async fn failed_insert_rolls_back_identity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/customers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/customers"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "code": "22P02", "message": "invalid input syntax for type date" })))
            .mount(&server)
            .await;

        let identities = Arc::new(MockIdentityStore::default());
        let err = service(&server, identities.clone()).create(create_request()).await.unwrap_err();
        assert_eq!(err.to_string(), "Database Insert Failed: invalid input syntax for type date");
        assert!(identities.is_empty());
    }

    #[tokio::test]
    async fn missing_fields_fail_before_any_call() {
        let server = MockServer::start().await;
        let req: CreateCustomerRequest = serde_json::from_value(json!({ "full_name": "Asha" })).unwrap();
        let err = service(&server, Arc::new(MockIdentityStore::default())).create(req).await.unwrap_err();
        match err {
            ServiceError::Validation(fields) => {
                assert!(fields.get("phone").is_some());
                assert!(fields.get("aadhaar_number").is_some());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn access_activation_updates_and_whitelists() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();
        let admin = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path("/rest/v1/customers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": id, "phone": "+919876543210" }])))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/customers"))
            .and(query_param("id", format!("eq.{id}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": id, "phone": "+919876543210", "login_enabled": true, "is_active": true }])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/phone_whitelist"))
            .and(body_partial_json(json!({ "phone": "+919876543210", "active": true, "added_by": admin })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "phone": "+919876543210" })))
            .expect(1)
            .mount(&server)
            .await;

        let req = CustomerAccessRequest { customer_phone: Some("98765 43210".into()), ..Default::default() };
        let granted = service(&server, Arc::new(MockIdentityStore::default()))
            .activate_access(req, Some(admin))
            .await
            .unwrap();
        assert!(granted.customer.login_enabled);
        assert_eq!(granted.profile_id, id);
    }

    #[tokio::test]
    async fn profile_only_match_explains_role() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/customers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": Uuid::new_v4(), "role": "collection_staff", "full_name": "Ravi", "phone": "9876543210" }
            ])))
            .mount(&server)
            .await;

        let req = CustomerAccessRequest { phone: Some("9876543210".into()), ..Default::default() };
        let err = service(&server, Arc::new(MockIdentityStore::default()))
            .activate_access(req, None)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Phone number exists for collection_staff \"Ravi\", but no Customer record found. Please create a Customer profile first."
        );
    }

    #[tokio::test]
    async fn unknown_phone_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let req = CustomerAccessRequest { phone: Some("9000000000".into()), ..Default::default() };
        let err = service(&server, Arc::new(MockIdentityStore::default()))
            .activate_access(req, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(ref m) if m == "Customer not found. Please create customer first."));
    }

    #[tokio::test]
    async fn missing_phone_is_validation_error() {
        let server = MockServer::start().await;
        let err = service(&server, Arc::new(MockIdentityStore::default()))
            .activate_access(CustomerAccessRequest::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
