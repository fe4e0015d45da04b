use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use super::{BackendApi, MaterialQuery, NewActivityEntry, NewSaleRequest, Page};
use crate::auth::AuthSession;
use crate::errors::ServiceError;
use crate::models::{
    Accessory, AccessoryPatch, ActivityLogEntry, Cab, CabPatch, Customer, CustomerPatch, Material,
    MaterialPatch, NewAccessory, NewCab, NewCustomer, NewMaterial, NewUser, Sale, User, UserPatch,
};

/// Error body shape the backend uses for non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Typed client for the REST backend. Attaches the session bearer token to
/// every request; the backend decides which routes require it.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
    auth: Arc<AuthSession>,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        auth: Arc<AuthSession>,
    ) -> Result<Self, ServiceError> {
        let base = Url::parse(base_url)
            .map_err(|e| ServiceError::ConfigError(format!("invalid backend URL: {}", e)))?;
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(ServiceError::Network)?;
        Ok(Self { client, base, auth })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.base
            .join(path)
            .map_err(|e| ServiceError::ConfigError(format!("invalid endpoint {}: {}", path, e)))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.auth.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ServiceError> {
        let response = self.authorize(builder).send().await?;
        let response = Self::check(response).await?;
        response.json::<T>().await.map_err(ServiceError::Network)
    }

    async fn send_unit(&self, builder: RequestBuilder) -> Result<(), ServiceError> {
        let response = self.authorize(builder).send().await?;
        Self::check(response).await.map(|_| ())
    }

    async fn check(response: Response) -> Result<Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| status.to_string());
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::AuthError(message),
            StatusCode::NOT_FOUND => ServiceError::NotFound(message),
            s if s.is_client_error() => ServiceError::ValidationError(message),
            _ => ServiceError::Backend(message),
        })
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    #[instrument(skip(self))]
    async fn list_cabs(&self) -> Result<Vec<Cab>, ServiceError> {
        self.send_json(self.client.get(self.endpoint("/api/cabs")?))
            .await
    }

    #[instrument(skip(self, input))]
    async fn create_cab(&self, input: NewCab) -> Result<Cab, ServiceError> {
        self.send_json(self.client.post(self.endpoint("/api/cabs")?).json(&input))
            .await
    }

    #[instrument(skip(self, patch))]
    async fn update_cab(&self, id: i64, patch: CabPatch) -> Result<Cab, ServiceError> {
        self.send_json(
            self.client
                .put(self.endpoint(&format!("/api/cabs/{}", id))?)
                .json(&patch),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_cab(&self, id: i64) -> Result<(), ServiceError> {
        self.send_unit(self.client.delete(self.endpoint(&format!("/api/cabs/{}", id))?))
            .await
    }

    #[instrument(skip(self))]
    async fn list_accessories(&self) -> Result<Vec<Accessory>, ServiceError> {
        self.send_json(self.client.get(self.endpoint("/api/accessories")?))
            .await
    }

    #[instrument(skip(self, input))]
    async fn create_accessory(&self, input: NewAccessory) -> Result<Accessory, ServiceError> {
        self.send_json(
            self.client
                .post(self.endpoint("/api/accessories")?)
                .json(&input),
        )
        .await
    }

    #[instrument(skip(self, patch))]
    async fn update_accessory(
        &self,
        id: i64,
        patch: AccessoryPatch,
    ) -> Result<Accessory, ServiceError> {
        self.send_json(
            self.client
                .put(self.endpoint(&format!("/api/accessories/{}", id))?)
                .json(&patch),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_accessory(&self, id: i64) -> Result<(), ServiceError> {
        self.send_unit(
            self.client
                .delete(self.endpoint(&format!("/api/accessories/{}", id))?),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list_materials(&self) -> Result<Vec<Material>, ServiceError> {
        self.send_json(self.client.get(self.endpoint("/api/materials")?))
            .await
    }

    #[instrument(skip(self, query))]
    async fn list_materials_paginated(
        &self,
        query: MaterialQuery,
    ) -> Result<Page<Material>, ServiceError> {
        self.send_json(
            self.client
                .get(self.endpoint("/api/materials/paginated")?)
                .query(&query),
        )
        .await
    }

    #[instrument(skip(self, input))]
    async fn create_material(&self, input: NewMaterial) -> Result<Material, ServiceError> {
        self.send_json(
            self.client
                .post(self.endpoint("/api/materials")?)
                .json(&input),
        )
        .await
    }

    #[instrument(skip(self, patch))]
    async fn update_material(
        &self,
        id: i64,
        patch: MaterialPatch,
    ) -> Result<Material, ServiceError> {
        self.send_json(
            self.client
                .put(self.endpoint(&format!("/api/materials/{}", id))?)
                .json(&patch),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_material(&self, id: i64) -> Result<(), ServiceError> {
        self.send_unit(
            self.client
                .delete(self.endpoint(&format!("/api/materials/{}", id))?),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list_customers(&self) -> Result<Vec<Customer>, ServiceError> {
        self.send_json(self.client.get(self.endpoint("/api/customers")?))
            .await
    }

    #[instrument(skip(self, input))]
    async fn create_customer(&self, input: NewCustomer) -> Result<Customer, ServiceError> {
        self.send_json(
            self.client
                .post(self.endpoint("/api/customers")?)
                .json(&input),
        )
        .await
    }

    #[instrument(skip(self, patch))]
    async fn update_customer(
        &self,
        id: i64,
        patch: CustomerPatch,
    ) -> Result<Customer, ServiceError> {
        self.send_json(
            self.client
                .put(self.endpoint(&format!("/api/customers/{}", id))?)
                .json(&patch),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_customer(&self, id: i64) -> Result<(), ServiceError> {
        self.send_unit(
            self.client
                .delete(self.endpoint(&format!("/api/customers/{}", id))?),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        self.send_json(self.client.get(self.endpoint("/api/users")?))
            .await
    }

    #[instrument(skip(self, input))]
    async fn create_user(&self, input: NewUser) -> Result<User, ServiceError> {
        self.send_json(self.client.post(self.endpoint("/api/users")?).json(&input))
            .await
    }

    #[instrument(skip(self))]
    async fn get_user(&self, id: i64) -> Result<User, ServiceError> {
        self.send_json(self.client.get(self.endpoint(&format!("/api/users/{}", id))?))
            .await
    }

    #[instrument(skip(self, patch))]
    async fn update_user(&self, id: i64, patch: UserPatch) -> Result<User, ServiceError> {
        self.send_json(
            self.client
                .put(self.endpoint(&format!("/api/users/{}", id))?)
                .json(&patch),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: i64) -> Result<(), ServiceError> {
        self.send_unit(
            self.client
                .delete(self.endpoint(&format!("/api/users/{}", id))?),
        )
        .await
    }

    #[instrument(skip(self, request), fields(cab_id = request.cab_id, customer_id = request.customer_id))]
    async fn record_sale(&self, request: NewSaleRequest) -> Result<Sale, ServiceError> {
        self.send_json(self.client.post(self.endpoint("/api/sales")?).json(&request))
            .await
    }

    #[instrument(skip(self))]
    async fn void_sale(&self, id: Uuid) -> Result<(), ServiceError> {
        self.send_unit(self.client.delete(self.endpoint(&format!("/api/sales/{}", id))?))
            .await
    }

    #[instrument(skip(self, entry))]
    async fn append_activity(
        &self,
        entry: NewActivityEntry,
    ) -> Result<ActivityLogEntry, ServiceError> {
        self.send_json(
            self.client
                .post(self.endpoint("/api/activity-logs")?)
                .json(&entry),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn list_activity(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<Page<ActivityLogEntry>, ServiceError> {
        self.send_json(
            self.client
                .get(self.endpoint("/api/activity-logs")?)
                .query(&[("page", page), ("limit", limit)]),
        )
        .await
    }
}
