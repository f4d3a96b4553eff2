//! Stateless HTTP request builder and response parser for the todo service.
//!
//! # Design
//! `TodoClient` holds only a `base_url` and an `IdPolicy`. Each operation is
//! split into a `build_*` method that produces an `HttpRequest` and a
//! `parse_*` method that validates an `HttpResponse` into typed data. The
//! caller executes the actual HTTP round-trip in between.
//!
//! # Id compensation
//! The public mock backend ignores client ids on create and echoes a fixed
//! id (`255`) for every new record. Trusting that id would give every
//! created record the same key in the local store, so under
//! `IdPolicy::KeepRequestId` the parsers rewrite the returned id to the id
//! the request was made for. This is specific to that backend; a service
//! that assigns real ids should run with `IdPolicy::TrustServer`.

use serde::de::DeserializeOwned;

use crate::config::IdPolicy;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{PageRequest, Todo, TodoBody, TodoPage};

/// Synchronous, stateless client for the todo service.
#[derive(Debug, Clone)]
pub struct TodoClient {
    base_url: String,
    id_policy: IdPolicy,
}

impl TodoClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            id_policy: IdPolicy::default(),
        }
    }

    pub fn with_id_policy(mut self, id_policy: IdPolicy) -> Self {
        self.id_policy = id_policy;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn id_policy(&self) -> IdPolicy {
        self.id_policy
    }

    pub fn build_list_todos(&self, page: PageRequest) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!(
                "{}/todos?limit={}&skip={}",
                self.base_url, page.limit, page.skip
            ),
            headers: json_headers(),
            body: None,
        }
    }

    pub fn build_get_todo(&self, id: u64) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}/todos/{id}", self.base_url),
            headers: json_headers(),
            body: None,
        }
    }

    pub fn build_create_todo(&self, todo: &Todo) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/todos/add", self.base_url),
            headers: json_headers(),
            body: Some(encode_body(todo)?),
        })
    }

    pub fn build_update_todo(&self, id: u64, todo: &Todo) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest {
            method: HttpMethod::Put,
            path: format!("{}/todos/{id}", self.base_url),
            headers: json_headers(),
            body: Some(encode_body(todo)?),
        })
    }

    pub fn build_delete_todo(&self, id: u64) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            path: format!("{}/todos/{id}", self.base_url),
            headers: json_headers(),
            body: None,
        }
    }

    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<TodoPage, ApiError> {
        check_status(&response)?;
        parse_body(&response)
    }

    pub fn parse_get_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        check_status(&response)?;
        parse_body(&response)
    }

    /// Parse a create response. The returned record is marked confirmed and
    /// its id is compensated against `requested_id`.
    pub fn parse_create_todo(
        &self,
        response: HttpResponse,
        requested_id: Option<u64>,
    ) -> Result<Todo, ApiError> {
        check_status(&response)?;
        let mut todo: Todo = parse_body(&response)?;
        todo.is_local_only = false;
        self.compensate_id(&mut todo, requested_id);
        Ok(todo)
    }

    pub fn parse_update_todo(
        &self,
        response: HttpResponse,
        requested_id: Option<u64>,
    ) -> Result<Todo, ApiError> {
        check_status(&response)?;
        let mut todo: Todo = parse_body(&response)?;
        self.compensate_id(&mut todo, requested_id);
        Ok(todo)
    }

    /// Parse a delete response. An empty 2xx body yields `None`.
    pub fn parse_delete_todo(
        &self,
        response: HttpResponse,
        requested_id: Option<u64>,
    ) -> Result<Option<Todo>, ApiError> {
        check_status(&response)?;
        if response.body.trim().is_empty() {
            return Ok(None);
        }
        let mut todo: Todo = parse_body(&response)?;
        self.compensate_id(&mut todo, requested_id);
        Ok(Some(todo))
    }

    /// Rewrite a service-returned id to the id the request was made for.
    ///
    /// No-op under `IdPolicy::TrustServer` or when the request carried no id.
    pub fn compensate_id(&self, todo: &mut Todo, requested_id: Option<u64>) {
        if let (IdPolicy::KeepRequestId, Some(id)) = (self.id_policy, requested_id) {
            if todo.id != id {
                tracing::trace!(returned = todo.id, requested = id, "compensating service id");
                todo.id = id;
            }
        }
    }
}

fn json_headers() -> Vec<(String, String)> {
    vec![("content-type".to_string(), "application/json".to_string())]
}

fn encode_body(todo: &Todo) -> Result<String, ApiError> {
    serde_json::to_string(&TodoBody::from(todo)).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn parse_body<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::InvalidBody(e.to_string()))
}

/// Map non-2xx status codes to `ApiError::Status`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::Status {
        status: response.status,
        body: response.body.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TodoClient {
        TodoClient::new("http://localhost:3000")
    }

    fn milk() -> Todo {
        Todo {
            id: 7,
            text: "buy milk".to_string(),
            completed: false,
            owner_tag: 3,
            is_local_only: true,
        }
    }

    #[test]
    fn build_list_todos_carries_window() {
        let req = client().build_list_todos(PageRequest { limit: 10, skip: 20 });
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:3000/todos?limit=10&skip=20");
        assert!(req.body.is_none());
    }

    #[test]
    fn every_request_is_json() {
        let c = client();
        let requests = [
            c.build_list_todos(PageRequest::default()),
            c.build_get_todo(1),
            c.build_create_todo(&milk()).unwrap(),
            c.build_update_todo(7, &milk()).unwrap(),
            c.build_delete_todo(7),
        ];
        for req in requests {
            assert_eq!(
                req.headers,
                vec![("content-type".to_string(), "application/json".to_string())],
                "{} {}",
                req.method,
                req.path
            );
        }
    }

    #[test]
    fn build_create_todo_omits_id() {
        let req = client().build_create_todo(&milk()).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/todos/add");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"todo": "buy milk", "completed": false, "userId": 3})
        );
    }

    #[test]
    fn build_update_todo_targets_id_path() {
        let req = client().build_update_todo(7, &milk().toggled()).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "http://localhost:3000/todos/7");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["completed"], true);
        assert!(body.get("id").is_none());
    }

    #[test]
    fn build_delete_todo_has_no_body() {
        let req = client().build_delete_todo(2);
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path, "http://localhost:3000/todos/2");
        assert!(req.body.is_none());
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = TodoClient::new("http://localhost:3000/");
        assert_eq!(client.build_get_todo(1).path, "http://localhost:3000/todos/1");
    }

    #[test]
    fn parse_list_todos_success() {
        let response = HttpResponse::new(
            200,
            r#"{"todos":[{"id":1,"todo":"Test","completed":false,"userId":5}],"total":150,"skip":0,"limit":1}"#,
        );
        let page = client().parse_list_todos(response).unwrap();
        assert_eq!(page.todos.len(), 1);
        assert_eq!(page.todos[0].text, "Test");
        assert_eq!(page.total, 150);
    }

    #[test]
    fn parse_list_todos_missing_todos_is_invalid() {
        let response = HttpResponse::new(200, r#"{"items":[]}"#);
        let err = client().parse_list_todos(response).unwrap_err();
        assert!(matches!(err, ApiError::InvalidBody(_)));
    }

    #[test]
    fn parse_list_todos_bad_json() {
        let err = client()
            .parse_list_todos(HttpResponse::new(200, "not json"))
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidBody(_)));
    }

    #[test]
    fn parse_create_todo_keeps_request_id() {
        let response = HttpResponse::new(
            201,
            r#"{"id":255,"todo":"buy milk","completed":false,"userId":3}"#,
        );
        let todo = client().parse_create_todo(response, Some(7)).unwrap();
        assert_eq!(todo.id, 7);
        assert!(!todo.is_local_only);
    }

    #[test]
    fn parse_create_todo_trusts_server_when_asked() {
        let response = HttpResponse::new(
            201,
            r#"{"id":255,"todo":"buy milk","completed":false,"userId":3}"#,
        );
        let todo = client()
            .with_id_policy(IdPolicy::TrustServer)
            .parse_create_todo(response, Some(7))
            .unwrap();
        assert_eq!(todo.id, 255);
    }

    #[test]
    fn parse_create_todo_wrong_status() {
        let err = client()
            .parse_create_todo(HttpResponse::new(500, "internal error"), Some(7))
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 500, .. }));
    }

    #[test]
    fn parse_update_todo_success() {
        let response = HttpResponse::new(
            200,
            r#"{"id":7,"todo":"Updated","completed":true,"userId":3}"#,
        );
        let todo = client().parse_update_todo(response, Some(7)).unwrap();
        assert_eq!(todo.text, "Updated");
        assert!(todo.completed);
    }

    #[test]
    fn parse_get_todo_not_found() {
        let err = client()
            .parse_get_todo(HttpResponse::new(404, r#"{"message":"not found"}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 404, .. }));
    }

    #[test]
    fn parse_delete_todo_with_body() {
        let response = HttpResponse::new(
            200,
            r#"{"id":2,"todo":"x","completed":false,"userId":1,"isDeleted":true,"deletedOn":"2024-01-01T00:00:00Z"}"#,
        );
        let todo = client().parse_delete_todo(response, Some(2)).unwrap();
        assert_eq!(todo.map(|t| t.id), Some(2));
    }

    #[test]
    fn parse_delete_todo_empty_body() {
        let todo = client()
            .parse_delete_todo(HttpResponse::new(204, ""), Some(2))
            .unwrap();
        assert!(todo.is_none());
    }
}
