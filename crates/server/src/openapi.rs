use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String, pub service: String, pub version: String }

/// Every non-2xx body; `fields` only on validation failures.
#[derive(ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[schema(value_type = Option<Object>)]
    pub fields: Option<serde_json::Value>,
}

#[derive(ToSchema)]
pub struct LoginRequestDoc {
    /// `admin`, an email address or a phone number
    pub identifier: String,
    pub password: String,
    /// `admin` or `office`
    pub portal: String,
}

#[derive(ToSchema)]
pub struct CreateCustomerDoc {
    pub full_name: String,
    pub phone: String,
    pub password: String,
    pub aadhaar_number: String,
    pub scheme_type: Option<String>,
    pub status: Option<String>,
}

#[derive(ToSchema)]
pub struct CustomerAccessDoc { pub customer_phone: Option<String>, pub phone: Option<String>, pub admin_id: Option<Uuid> }

#[derive(ToSchema)]
pub struct CreateStaffDoc {
    pub name: String,
    pub username: String,
    pub password: String,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub designation: Option<String>,
    pub salary: Option<f64>,
}

#[derive(ToSchema)]
#[allow(non_snake_case)]
pub struct AddFieldStaffDoc {
    pub email: String,
    pub fullName: String,
    pub phone: String,
    pub staffType: Option<String>,
    pub dailyTarget: Option<f64>,
    pub password: String,
}

#[derive(ToSchema)]
pub struct CreateSchemeDoc {
    pub name: String,
    pub installment_amount: f64,
    pub duration_months: i32,
    pub description: Option<String>,
    pub target_grams: Option<f64>,
    pub active: Option<bool>,
    /// `gold` or `silver`
    pub asset_type: Option<String>,
}

#[derive(ToSchema)]
pub struct PublishRateDoc { pub gold_rate_per_gram: f64, pub silver_rate_per_gram: f64, pub date: Option<String> }

#[derive(ToSchema)]
pub struct AssignStaffDoc { pub customer_id: Uuid, pub staff_id: Uuid }

#[derive(ToSchema)]
pub struct EnrollDoc {
    pub customer_id: Uuid,
    pub scheme_id: Uuid,
    pub payment_frequency: Option<String>,
    pub min_amount: f64,
    pub max_amount: f64,
    pub start_date: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::public_stats,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::check_auth,
        crate::routes::admin::create_customer,
        crate::routes::admin::activate_access,
        crate::routes::admin::list_customers,
        crate::routes::admin::create_staff,
        crate::routes::admin::add_field_staff,
        crate::routes::admin::list_staff,
        crate::routes::admin::toggle_staff_status,
        crate::routes::admin::staff_details,
        crate::routes::admin::update_staff_assignments,
        crate::routes::admin::schedule_payment,
        crate::routes::admin::list_schemes,
        crate::routes::admin::create_scheme,
        crate::routes::admin::list_market_rates,
        crate::routes::admin::publish_market_rate,
        crate::routes::admin::admin_list_withdrawals,
        crate::routes::admin::admin_process_withdrawal,
        crate::routes::admin::admin_stats,
        crate::routes::admin::dashboard,
        crate::routes::office::list_withdrawals,
        crate::routes::office::approve_withdrawal,
        crate::routes::office::process_withdrawal,
        crate::routes::office::reject_withdrawal,
        crate::routes::office::assign_staff,
        crate::routes::office::enroll,
        crate::routes::office::add_customer,
        crate::routes::office::office_stats,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorBody,
            LoginRequestDoc,
            CreateCustomerDoc,
            CustomerAccessDoc,
            CreateStaffDoc,
            AddFieldStaffDoc,
            CreateSchemeDoc,
            PublishRateDoc,
            AssignStaffDoc,
            EnrollDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "public"),
        (name = "auth"),
        (name = "admin"),
        (name = "office")
    )
)]
pub struct ApiDoc;
