use backend::{Backend, Query};
use models::stats::AdminStats;
use serde_json::{json, Value};
use tracing::instrument;

use crate::errors::ServiceResult;

#[derive(Clone)]
pub struct StatsService {
    backend: Backend,
}

impl StatsService {
    pub fn new(backend: &Backend) -> Self { Self { backend: backend.clone() } }

    /// Exact counts of the four overview tables, fetched concurrently.
    #[instrument(skip(self))]
    pub async fn admin_stats(&self) -> ServiceResult<AdminStats> {
        let all = Query::new();
        let customers = self.backend.table("customers");
        let schemes = self.backend.table("schemes");
        let withdrawals = self.backend.table("withdrawals");
        let payments = self.backend.table("payments");
        let (c, s, w, p) = tokio::join!(
            customers.count(&all),
            schemes.count(&all),
            withdrawals.count(&all),
            payments.count(&all),
        );
        Ok(AdminStats { total_customers: c?, total_schemes: s?, total_withdrawals: w?, total_payments: p? })
    }

    pub async fn public_stats(&self) -> ServiceResult<Value> {
        Ok(self.backend.functions().invoke("get-stats", &json!({})).await?)
    }

    /// Live office figures; an empty result becomes `{}`.
    pub async fn office_stats(&self) -> ServiceResult<Value> {
        let data: Value = self.backend.rpc("get_live_stats", &json!({})).await?;
        Ok(if data.is_null() { json!({}) } else { data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend::BackendSettings;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer) -> StatsService {
        StatsService::new(&Backend::new(BackendSettings::new(server.uri(), "eyJanon", "eyJservice")).unwrap())
    }

    async fn mount_count(server: &MockServer, table: &str, total: u64) {
        Mock::given(method("HEAD"))
            .and(path(format!("/rest/v1/{table}")))
            .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", format!("*/{total}").as_str()))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn admin_stats_counts_every_table() {
        let server = MockServer::start().await;
        mount_count(&server, "customers", 120).await;
        mount_count(&server, "schemes", 4).await;
        mount_count(&server, "withdrawals", 9).await;
        mount_count(&server, "payments", 3051).await;

        let stats = service(&server).admin_stats().await.unwrap();
        assert_eq!(
            stats,
            AdminStats { total_customers: 120, total_schemes: 4, total_withdrawals: 9, total_payments: 3051 }
        );
    }

    #[tokio::test]
    async fn one_failed_count_fails_the_call() {
        let server = MockServer::start().await;
        mount_count(&server, "customers", 1).await;
        mount_count(&server, "schemes", 1).await;
        mount_count(&server, "withdrawals", 1).await;
        Mock::given(method("HEAD"))
            .and(path("/rest/v1/payments"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(service(&server).admin_stats().await.is_err());
    }

    #[tokio::test]
    async fn null_live_stats_become_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/get_live_stats"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        assert_eq!(service(&server).office_stats().await.unwrap(), json!({}));
    }
}
