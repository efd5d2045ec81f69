//! Generic routes for catalog and platform records
//!
//! A [`CatalogResource`] gets list / get / create / update / delete under
//! `/{plural}`. Bodies are JSON objects: creation fills in the base fields,
//! updates merge the given top-level keys into the stored record. Deletes
//! are soft.

use crate::core::auth::{AuthContext, AuthPolicy};
use crate::core::entity::Data;
use crate::core::error::{DerlgResult, ValidationError};
use crate::core::events::{EntityEvent, EventBus};
use crate::core::extractors::PathId;
use crate::core::query::{PaginatedResponse, QueryParams};
use crate::core::response::ApiResponse;
use crate::core::service::{find_or_404, DataService};
use crate::core::store::QueryableStore;
use crate::server::entity_registry::EntityDescriptor;
use crate::storage::Stores;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

/// Keys a client can never set
const PROTECTED_KEYS: [&str; 5] = ["id", "type", "created_at", "updated_at", "deleted_at"];

pub trait CatalogResource: Data + Serialize + DeserializeOwned {
    fn store(stores: &Stores) -> Arc<dyn DataService<Self>>;

    fn default_status() -> &'static str {
        "active"
    }

    /// Domain checks run before every write
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn mark_deleted(&mut self);

    /// Who a change notification is addressed to
    fn recipient(&self) -> Option<Uuid> {
        None
    }
}

/// Store plus read / write policies of one resource
pub struct CatalogState<T: CatalogResource> {
    pub store: Arc<dyn DataService<T>>,
    pub events: Arc<EventBus>,
    pub read: AuthPolicy,
    pub write: AuthPolicy,
}

impl<T: CatalogResource> Clone for CatalogState<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            events: self.events.clone(),
            read: self.read.clone(),
            write: self.write.clone(),
        }
    }
}

impl<T: CatalogResource> CatalogState<T> {
    /// Public read, super-admin write
    pub fn new(stores: &Stores, events: Arc<EventBus>) -> Self {
        Self {
            store: T::store(stores),
            events,
            read: AuthPolicy::Public,
            write: AuthPolicy::AdminOnly,
        }
    }

    pub fn with_read(mut self, policy: AuthPolicy) -> Self {
        self.read = policy;
        self
    }

    pub fn with_write(mut self, policy: AuthPolicy) -> Self {
        self.write = policy;
        self
    }
}

/// Build a new record from a client payload
pub fn materialize<T: CatalogResource>(payload: Value) -> DerlgResult<T> {
    let Value::Object(mut fields) = payload else {
        return Err(not_an_object());
    };
    for key in PROTECTED_KEYS {
        fields.remove(key);
    }

    let now = Value::String(Utc::now().to_rfc3339());
    fields.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
    fields.insert("type".into(), Value::String(T::resource_name_singular().to_string()));
    fields.insert("created_at".into(), now.clone());
    fields.insert("updated_at".into(), now);
    fields.insert("deleted_at".into(), Value::Null);
    fields
        .entry("status")
        .or_insert_with(|| Value::String(T::default_status().to_string()));

    decode(fields)
}

/// Merge a client payload into a stored record
pub fn merge<T: CatalogResource>(existing: &T, payload: Value) -> DerlgResult<T> {
    let Value::Object(patch) = payload else {
        return Err(not_an_object());
    };
    let Value::Object(mut fields) = serde_json::to_value(existing).map_err(anyhow::Error::from)? else {
        return Err(not_an_object());
    };

    for (key, value) in patch {
        if !PROTECTED_KEYS.contains(&key.as_str()) {
            fields.insert(key, value);
        }
    }
    fields.insert("updated_at".into(), Value::String(Utc::now().to_rfc3339()));

    decode(fields)
}

fn decode<T: CatalogResource>(fields: Map<String, Value>) -> DerlgResult<T> {
    let record: T = serde_json::from_value(Value::Object(fields)).map_err(|e| ValidationError::InvalidJson {
        message: e.to_string(),
    })?;
    record.check()?;
    Ok(record)
}

fn not_an_object() -> crate::core::error::DerlgError {
    ValidationError::InvalidJson {
        message: "expected a JSON object".to_string(),
    }
    .into()
}

/// Live records matching `filter`, sorted by `sort` (newest first by default)
pub async fn query_records<T: CatalogResource>(
    store: &dyn DataService<T>,
    params: &QueryParams,
) -> DerlgResult<PaginatedResponse<T>> {
    let mut records: Vec<T> = store.list().await?.into_iter().filter(|r| !r.is_deleted()).collect();
    if let Some(filter) = params.filter_value() {
        records = store.apply_filters(records, &filter);
    }
    records = match &params.sort {
        Some(sort) => store.apply_sort(records, sort),
        None => store.apply_sort(records, "created_at:desc"),
    };
    Ok(PaginatedResponse::from_items(records, params))
}

pub async fn list<T: CatalogResource>(
    State(state): State<CatalogState<T>>,
    auth: AuthContext,
    Query(params): Query<QueryParams>,
) -> DerlgResult<Json<PaginatedResponse<T>>> {
    state.read.enforce(&auth)?;
    Ok(Json(query_records(state.store.as_ref(), &params).await?))
}

pub async fn fetch<T: CatalogResource>(
    State(state): State<CatalogState<T>>,
    auth: AuthContext,
    PathId(id): PathId,
) -> DerlgResult<ApiResponse<T>> {
    state.read.enforce(&auth)?;
    Ok(ApiResponse::ok(find_or_404(state.store.as_ref(), &id).await?))
}

pub async fn create<T: CatalogResource>(
    State(state): State<CatalogState<T>>,
    auth: AuthContext,
    Json(payload): Json<Value>,
) -> DerlgResult<ApiResponse<T>> {
    state.write.enforce(&auth)?;
    let record = state.store.create(materialize::<T>(payload)?).await?;

    tracing::info!(entity = T::resource_name_singular(), id = %record.id(), actor = %auth.actor(), "created");
    state.events.publish(EntityEvent::Created {
        entity_type: T::resource_name_singular().to_string(),
        entity_id: record.id(),
        recipient_id: record.recipient(),
    });
    Ok(ApiResponse::created(record))
}

pub async fn update<T: CatalogResource>(
    State(state): State<CatalogState<T>>,
    auth: AuthContext,
    PathId(id): PathId,
    Json(payload): Json<Value>,
) -> DerlgResult<ApiResponse<T>> {
    state.write.enforce(&auth)?;
    let existing = find_or_404(state.store.as_ref(), &id).await?;
    let record = state.store.update(&id, merge(&existing, payload)?).await?;

    state.events.publish(EntityEvent::Updated {
        entity_type: T::resource_name_singular().to_string(),
        entity_id: id,
        recipient_id: record.recipient(),
    });
    Ok(ApiResponse::ok(record))
}

pub async fn remove<T: CatalogResource>(
    State(state): State<CatalogState<T>>,
    auth: AuthContext,
    PathId(id): PathId,
) -> DerlgResult<StatusCode> {
    state.write.enforce(&auth)?;
    let mut record = find_or_404(state.store.as_ref(), &id).await?;
    record.mark_deleted();
    state.store.update(&id, record).await?;

    tracing::info!(entity = T::resource_name_singular(), %id, actor = %auth.actor(), "deleted");
    state.events.publish(EntityEvent::Deleted {
        entity_type: T::resource_name_singular().to_string(),
        entity_id: id,
    });
    Ok(StatusCode::NO_CONTENT)
}

/// `/{plural}` and `/{plural}/{id}` for `T`
pub fn routes<T: CatalogResource>(state: CatalogState<T>) -> Router {
    let plural = T::resource_name();
    Router::new()
        .route(&format!("/{}", plural), get(list::<T>).post(create::<T>))
        .route(
            &format!("/{}/{{id}}", plural),
            get(fetch::<T>).put(update::<T>).delete(remove::<T>),
        )
        .with_state(state)
}

/// Descriptor for a resource served by the generic routes, plus extras
pub struct CatalogDescriptor<T: CatalogResource> {
    state: CatalogState<T>,
    extra: Option<Router>,
    _marker: PhantomData<T>,
}

impl<T: CatalogResource> CatalogDescriptor<T> {
    pub fn new(state: CatalogState<T>) -> Self {
        Self {
            state,
            extra: None,
            _marker: PhantomData,
        }
    }

    /// Routes served next to the generic ones
    pub fn with_routes(mut self, router: Router) -> Self {
        self.extra = Some(router);
        self
    }
}

impl<T: CatalogResource> EntityDescriptor for CatalogDescriptor<T> {
    fn entity_type(&self) -> &str {
        T::resource_name_singular()
    }

    fn plural(&self) -> &str {
        T::resource_name()
    }

    fn build_routes(&self) -> Router {
        let generic = routes(self.state.clone());
        match &self.extra {
            Some(extra) => generic.merge(extra.clone()),
            None => generic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::catalog::{guide_status, Guide};
    use axum::http::{HeaderName, HeaderValue};
    use axum_test::TestServer;
    use serde_json::json;

    fn server() -> (TestServer, Stores) {
        let stores = Stores::in_memory();
        let state = CatalogState::<Guide>::new(&stores, Arc::new(EventBus::default()));
        (TestServer::new(routes(state)), stores)
    }

    fn as_admin(request: axum_test::TestRequest, admin_id: Uuid) -> axum_test::TestRequest {
        request
            .add_header(
                HeaderName::from_static("x-user-id"),
                HeaderValue::from_str(&admin_id.to_string()).unwrap(),
            )
            .add_header(
                HeaderName::from_static("x-user-role"),
                HeaderValue::from_static("super_admin"),
            )
    }

    #[test]
    fn test_materialize_fills_base_fields() {
        let guide: Guide = materialize(json!({
            "id": "not-a-uuid",
            "name": "Sokha",
            "phone": "+85512345678",
            "languages": ["en", "km"]
        }))
        .unwrap();
        assert_eq!(guide.status, guide_status::AVAILABLE);
        assert_eq!(guide.entity_type, "guide");
        assert!(guide.deleted_at.is_none());
    }

    #[test]
    fn test_merge_keeps_identity() {
        let guide: Guide = materialize(json!({"name": "Sokha", "phone": "+85512345678"})).unwrap();
        let merged: Guide = merge(&guide, json!({"id": Uuid::new_v4(), "bio": "Temple expert"})).unwrap();
        assert_eq!(merged.id, guide.id);
        assert_eq!(merged.bio.as_deref(), Some("Temple expert"));
    }

    #[test]
    fn test_rejects_non_objects() {
        assert!(materialize::<Guide>(json!([1, 2])).is_err());
    }

    #[tokio::test]
    async fn test_public_read_admin_write() {
        let (server, _) = server();
        let admin_id = Uuid::new_v4();

        let anonymous = server
            .post("/guides")
            .json(&json!({"name": "Sokha", "phone": "+85512345678"}))
            .await;
        anonymous.assert_status(StatusCode::UNAUTHORIZED);

        let created = as_admin(server.post("/guides"), admin_id)
            .json(&json!({"name": "Sokha", "phone": "+85512345678", "languages": ["en"]}))
            .await;
        created.assert_status(StatusCode::CREATED);
        let id = created.json::<Value>()["data"]["id"].as_str().unwrap().to_string();

        let listed = server.get("/guides").await;
        listed.assert_status_ok();
        assert_eq!(listed.json::<Value>()["pagination"]["total"], 1);

        as_admin(server.delete(&format!("/guides/{}", id)), admin_id)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server.get(&format!("/guides/{}", id)).await.assert_status_not_found();
    }
}
