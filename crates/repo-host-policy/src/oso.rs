//! Oso Cloud client
//!
//! HTTP client for a hosted policy service speaking the Oso Cloud v1 API.
//! Implements both [`FactStore`] and [`PolicyEvaluator`], so the gateway can
//! use the hosted service in place of the local role-table evaluator.
//!
//! Every transport error, timeout, non-success status or undecodable body is
//! returned as an error. Nothing here ever turns a failure into "allowed".

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::evaluator::PolicyEvaluator;
use crate::fact::{FactStore, RoleAssignment, HAS_ROLE};
use crate::ids::{ActorId, ResourceId};
use crate::polar::POLICY_FILE_NAME;
use crate::role::{Permission, Role};
use crate::{ACTOR_TYPE, RESOURCE_TYPE};

pub const DEFAULT_OSO_URL: &str = "https://cloud.osohq.com";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for the hosted policy service.
#[derive(Debug, Clone)]
pub struct OsoCloudConfig {
    pub url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl OsoCloudConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            url: DEFAULT_OSO_URL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A typed value in a fact's argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TypedValue {
    #[serde(rename = "type")]
    kind: String,
    id: String,
}

impl TypedValue {
    fn new(kind: &str, id: &str) -> Self {
        Self {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Fact {
    predicate: String,
    args: Vec<TypedValue>,
}

impl From<&RoleAssignment> for Fact {
    fn from(fact: &RoleAssignment) -> Self {
        Self {
            predicate: HAS_ROLE.to_string(),
            args: vec![
                TypedValue::new(ACTOR_TYPE, fact.actor.as_str()),
                TypedValue::new("String", fact.role.as_ref()),
                TypedValue::new(RESOURCE_TYPE, fact.resource.as_str()),
            ],
        }
    }
}

#[derive(Debug, Serialize)]
struct AuthorizeRequest<'a> {
    actor_type: &'a str,
    actor_id: &'a str,
    action: &'a str,
    resource_type: &'a str,
    resource_id: &'a str,
    context_facts: Vec<Fact>,
}

#[derive(Debug, Deserialize)]
struct AuthorizeResponse {
    allowed: bool,
}

#[derive(Debug, Serialize)]
struct PolicyRequest<'a> {
    filename: &'a str,
    src: &'a str,
}

#[derive(Clone)]
pub struct OsoCloudClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OsoCloudClient {
    pub fn new(config: OsoCloudConfig) -> Result<Self, PolicyError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("repo-host/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PolicyError::Unavailable(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, PolicyError> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| PolicyError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), %body, "policy service rejected request");
        Err(PolicyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    /// Replace the policy held by the service.
    pub async fn push_policy(&self, src: &str) -> Result<(), PolicyError> {
        let body = PolicyRequest {
            filename: POLICY_FILE_NAME,
            src,
        };
        self.send(self.client.post(self.url("/policy")).json(&body))
            .await?;
        tracing::info!(url = %self.base_url, "policy pushed to hosted service");
        Ok(())
    }

    /// Delete every fact held by the service.
    pub async fn clear_data(&self) -> Result<(), PolicyError> {
        self.send(self.client.post(self.url("/clear_data"))).await?;
        tracing::info!(url = %self.base_url, "hosted facts cleared");
        Ok(())
    }
}

#[async_trait]
impl FactStore for OsoCloudClient {
    async fn tell(&self, fact: &RoleAssignment) -> Result<(), PolicyError> {
        let body = Fact::from(fact);
        self.send(self.client.post(self.url("/facts")).json(&body))
            .await?;
        tracing::debug!(%fact, "tell (hosted)");
        Ok(())
    }

    async fn retract(&self, fact: &RoleAssignment) -> Result<(), PolicyError> {
        let body = Fact::from(fact);
        self.send(self.client.delete(self.url("/facts")).json(&body))
            .await?;
        tracing::debug!(%fact, "retract (hosted)");
        Ok(())
    }

    async fn roles_for(
        &self,
        actor: &ActorId,
        resource: &ResourceId,
    ) -> Result<BTreeSet<Role>, PolicyError> {
        let query = [
            ("predicate", HAS_ROLE),
            ("args.0.type", ACTOR_TYPE),
            ("args.0.id", actor.as_str()),
            ("args.2.type", RESOURCE_TYPE),
            ("args.2.id", resource.as_str()),
        ];
        let facts: Vec<Fact> = self
            .send(self.client.get(self.url("/facts")).query(&query))
            .await?
            .json()
            .await
            .map_err(|e| PolicyError::Decode(e.to_string()))?;

        let mut roles = BTreeSet::new();
        for fact in facts {
            let Some(role) = fact.args.get(1) else {
                continue;
            };
            match Role::parse(&role.id) {
                Ok(role) => {
                    roles.insert(role);
                }
                // Roles outside the table grant nothing.
                Err(e) => tracing::warn!(error = %e, "ignoring hosted fact"),
            }
        }
        Ok(roles)
    }
}

#[async_trait]
impl PolicyEvaluator for OsoCloudClient {
    async fn authorize(
        &self,
        actor: &ActorId,
        permission: Permission,
        resource: &ResourceId,
    ) -> Result<bool, PolicyError> {
        let body = AuthorizeRequest {
            actor_type: ACTOR_TYPE,
            actor_id: actor.as_str(),
            action: permission.as_ref(),
            resource_type: RESOURCE_TYPE,
            resource_id: resource.as_str(),
            context_facts: Vec::new(),
        };
        let decision: AuthorizeResponse = self
            .send(self.client.post(self.url("/authorize")).json(&body))
            .await?
            .json()
            .await
            .map_err(|e| PolicyError::Decode(e.to_string()))?;

        tracing::debug!(
            %actor,
            %permission,
            %resource,
            allowed = decision.allowed,
            "policy decision (hosted)"
        );
        Ok(decision.allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Query, State},
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const TEST_KEY: &str = "test-api-key";

    /// Minimal stand-in for the hosted service.
    #[derive(Default)]
    struct MockService {
        facts: Mutex<Vec<Fact>>,
        policies: Mutex<Vec<String>>,
        /// `None` makes `/api/authorize` answer 500.
        allow: Option<bool>,
    }

    type Shared = Arc<MockService>;

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {TEST_KEY}"))
            .unwrap_or(false)
    }

    async fn post_fact(
        State(svc): State<Shared>,
        headers: HeaderMap,
        Json(fact): Json<Fact>,
    ) -> StatusCode {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED;
        }
        svc.facts.lock().unwrap().push(fact);
        StatusCode::OK
    }

    async fn delete_fact(State(svc): State<Shared>, Json(fact): Json<Fact>) -> StatusCode {
        svc.facts.lock().unwrap().retain(|f| f != &fact);
        StatusCode::OK
    }

    async fn get_facts(
        State(svc): State<Shared>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Vec<Fact>> {
        let facts = svc.facts.lock().unwrap();
        let matching = facts
            .iter()
            .filter(|f| Some(&f.args[0].id) == params.get("args.0.id"))
            .filter(|f| Some(&f.args[2].id) == params.get("args.2.id"))
            .cloned()
            .collect();
        Json(matching)
    }

    async fn authorize(
        State(svc): State<Shared>,
        Json(body): Json<serde_json::Value>,
    ) -> Result<Json<serde_json::Value>, StatusCode> {
        assert_eq!(body["actor_type"], "User");
        assert_eq!(body["resource_type"], "Repository");
        match svc.allow {
            Some(allowed) => Ok(Json(serde_json::json!({ "allowed": allowed }))),
            None => Err(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    async fn post_policy(
        State(svc): State<Shared>,
        Json(body): Json<serde_json::Value>,
    ) -> StatusCode {
        assert_eq!(body["filename"], POLICY_FILE_NAME);
        let src = body["src"].as_str().unwrap_or_default().to_string();
        svc.policies.lock().unwrap().push(src);
        StatusCode::OK
    }

    async fn spawn_mock(allow: Option<bool>) -> (OsoCloudClient, Shared) {
        let svc = Arc::new(MockService {
            allow,
            ..Default::default()
        });
        let app = Router::new()
            .route(
                "/api/facts",
                post(post_fact).delete(delete_fact).get(get_facts),
            )
            .route("/api/authorize", post(authorize))
            .route("/api/policy", post(post_policy))
            .with_state(svc.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = OsoCloudClient::new(
            OsoCloudConfig::new(TEST_KEY).with_url(format!("http://{addr}/")),
        )
        .unwrap();
        (client, svc)
    }

    fn owner_fact() -> RoleAssignment {
        RoleAssignment::owner(
            ActorId::new("alice").unwrap(),
            ResourceId::new("notes").unwrap(),
        )
    }

    #[test]
    fn fact_wire_shape() {
        let wire = serde_json::to_value(Fact::from(&owner_fact())).unwrap();
        assert_eq!(
            wire,
            serde_json::json!({
                "predicate": "has_role",
                "args": [
                    { "type": "User", "id": "alice" },
                    { "type": "String", "id": "owner" },
                    { "type": "Repository", "id": "notes" },
                ]
            })
        );
    }

    #[tokio::test]
    async fn tell_then_roles_for_then_retract() {
        let (client, svc) = spawn_mock(Some(true)).await;
        let fact = owner_fact();

        client.tell(&fact).await.unwrap();
        assert_eq!(svc.facts.lock().unwrap().len(), 1);

        let roles = client.roles_for(&fact.actor, &fact.resource).await.unwrap();
        assert_eq!(roles, BTreeSet::from([Role::Owner]));

        client.retract(&fact).await.unwrap();
        assert!(svc.facts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn authorize_returns_service_decision() {
        let (client, _svc) = spawn_mock(Some(false)).await;
        let fact = owner_fact();
        let allowed = client
            .authorize(&fact.actor, Permission::UploadFile, &fact.resource)
            .await
            .unwrap();
        assert!(!allowed);
    }

    #[tokio::test]
    async fn server_error_is_not_an_allow() {
        let (client, _svc) = spawn_mock(None).await;
        let fact = owner_fact();
        let result = client
            .authorize(&fact.actor, Permission::ListDirectories, &fact.resource)
            .await;
        assert!(matches!(result, Err(PolicyError::Rejected { status: 500, .. })));
    }

    #[tokio::test]
    async fn wrong_key_is_rejected() {
        let (client, _svc) = spawn_mock(Some(true)).await;
        let client = OsoCloudClient {
            api_key: "wrong".into(),
            ..client
        };
        let result = client.tell(&owner_fact()).await;
        assert!(matches!(result, Err(PolicyError::Rejected { status: 401, .. })));
    }

    #[tokio::test]
    async fn push_policy_sends_rendered_source() {
        let (client, svc) = spawn_mock(Some(true)).await;
        let src = crate::polar::render_polar();
        client.push_policy(&src).await.unwrap();
        assert_eq!(svc.policies.lock().unwrap().as_slice(), &[src]);
    }

    #[tokio::test]
    async fn unreachable_service_fails_closed() {
        let client = OsoCloudClient::new(
            OsoCloudConfig::new(TEST_KEY)
                .with_url("http://127.0.0.1:1")
                .with_timeout(Duration::from_secs(2)),
        )
        .unwrap();
        let fact = owner_fact();
        let result = client
            .authorize(&fact.actor, Permission::DownloadFile, &fact.resource)
            .await;
        assert!(matches!(result, Err(PolicyError::Unavailable(_))));
    }
}
