//! Single-record operations for every resource.
//!
//! Writes go straight to the backend and then drop the resource's cached
//! list pages, so the next list load reflects the change.

use serde_json::Value;
use tracing::info;

use crate::application::error::ApiError;
use crate::application::fetcher::ListFetcher;
use crate::application::pagination::ResultPage;
use crate::application::params::ParamSet;
use crate::application::transport::{Transport, WriteMethod};
use crate::domain::resources::Resource;

pub struct RecordService<T> {
    fetcher: ListFetcher<T>,
}

impl<T> Clone for RecordService<T> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
        }
    }
}

impl<T: Transport> RecordService<T> {
    pub fn new(fetcher: ListFetcher<T>) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &ListFetcher<T> {
        &self.fetcher
    }

    pub async fn list<R: Resource>(
        &self,
        params: &ParamSet,
    ) -> Result<ResultPage<R::Record>, ApiError> {
        self.fetcher.fetch::<R>(params).await
    }

    pub async fn get<R: Resource>(&self, id: i64) -> Result<R::Record, ApiError> {
        let body = self
            .fetcher
            .transport()
            .get_json(&R::SPEC.item_path(id), &[])
            .await?;
        serde_json::from_value(body)
            .map_err(|err| ApiError::Decode(format!("{} record {id}: {err}", R::SPEC.name)))
    }

    pub async fn create<R: Resource>(&self, body: &Value) -> Result<Value, ApiError> {
        self.write::<R>(WriteMethod::Post, R::SPEC.endpoint.to_string(), Some(body))
            .await
    }

    pub async fn update<R: Resource>(&self, id: i64, body: &Value) -> Result<Value, ApiError> {
        self.write::<R>(WriteMethod::Put, R::SPEC.item_path(id), Some(body))
            .await
    }

    pub async fn delete<R: Resource>(&self, id: i64) -> Result<(), ApiError> {
        self.write::<R>(WriteMethod::Delete, R::SPEC.item_path(id), None)
            .await
            .map(|_| ())
    }

    async fn write<R: Resource>(
        &self,
        method: WriteMethod,
        path: String,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        if let Some(body) = body {
            if !body.is_object() {
                return Err(ApiError::InvalidRequest(format!(
                    "{} payload must be a JSON object",
                    R::SPEC.name
                )));
            }
        }
        let response = self
            .fetcher
            .transport()
            .send_json(method, &path, body)
            .await?;
        let evicted = self.fetcher.invalidate(R::SPEC.endpoint);
        info!(resource = R::SPEC.name, ?method, path = %path, evicted, "record written");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use httpmock::MockServer;
    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::application::session::Session;
    use crate::config::Settings;
    use crate::domain::resources::{News, Products};
    use crate::infra::http::ApiClient;

    fn service(server: &MockServer) -> RecordService<ApiClient> {
        let mut settings = Settings::default();
        settings.api.base_url = Url::parse(&server.url("/api/")).expect("mock url");
        let session = Arc::new(Session::in_memory("/login", Some("t".to_string())));
        let client = ApiClient::new(&settings.api, session).expect("client");
        RecordService::new(ListFetcher::new(Arc::new(client), &settings.cache))
    }

    #[tokio::test]
    async fn get_decodes_typed_record() -> Result<(), ApiError> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/api/news/5");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"id":5,"title":"Khai trương","type":"EVENT","createdAt":"2024-05-01"}"#);
        });

        let record = service(&server).get::<News>(5).await?;
        assert_eq!(record.title, "Khai trương");
        assert_eq!(record.news_type.as_deref(), Some("EVENT"));
        assert_eq!(record.attributes["createdAt"], "2024-05-01");
        Ok(())
    }

    #[tokio::test]
    async fn write_invalidates_cached_list() -> Result<(), ApiError> {
        let server = MockServer::start();
        let list = server.mock(|when, then| {
            when.method("GET").path("/api/products");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"content":[],"totalElements":0,"pageable":{"pageNumber":0}}"#);
        });
        let update = server.mock(|when, then| {
            when.method("PUT")
                .path("/api/products/3")
                .json_body_includes(r#"{"name":"Trà sữa"}"#);
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"id":3,"name":"Trà sữa"}"#);
        });

        let service = service(&server);
        service.list::<Products>(&ParamSet::new()).await?;
        service.list::<Products>(&ParamSet::new()).await?;
        list.assert_calls(1);

        service
            .update::<Products>(3, &json!({ "name": "Trà sữa" }))
            .await?;
        update.assert();

        service.list::<Products>(&ParamSet::new()).await?;
        list.assert_calls(2);
        Ok(())
    }

    #[tokio::test]
    async fn non_object_payload_is_rejected_locally() {
        let server = MockServer::start();
        let err = service(&server)
            .create::<Products>(&json!(["not", "an", "object"]))
            .await
            .expect_err("array payload");
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }
}
