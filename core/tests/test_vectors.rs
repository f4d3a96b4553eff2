//! Fixture checks for `TodoClient` against the JSON files in `test-vectors/`.
//!
//! A case names the request the client should build and the response the
//! service sends back. Bodies are compared as parsed JSON so key order in
//! the fixtures does not matter.

use serde_json::Value;
use todo_sync::{ApiError, HttpRequest, HttpResponse, PageRequest, Todo, TodoClient, TodoPage};

const BASE_URL: &str = "http://localhost:3000";

fn cases(raw: &str) -> Vec<Value> {
    let file: Value = serde_json::from_str(raw).expect("fixture is valid JSON");
    file["cases"].as_array().expect("fixture has cases").clone()
}

fn name(case: &Value) -> &str {
    case["name"].as_str().unwrap_or("<unnamed>")
}

/// Compare a built request with `expected_request`. A missing `body` means
/// the request must not carry one; a missing `headers` is not checked.
fn assert_request(case: &Value, req: &HttpRequest) {
    let name = name(case);
    let expected = &case["expected_request"];

    assert_eq!(req.method.as_str(), expected["method"], "{name}: method");
    assert_eq!(
        req.path.strip_prefix(BASE_URL),
        expected["path"].as_str(),
        "{name}: path"
    );

    match (&expected["body"], req.body.as_deref()) {
        (Value::Null, None) => {}
        (Value::Null, Some(body)) => panic!("{name}: unexpected body {body}"),
        (want, Some(body)) => {
            let got: Value = serde_json::from_str(body).unwrap();
            assert_eq!(&got, want, "{name}: body");
        }
        (_, None) => panic!("{name}: missing body"),
    }

    if let Some(headers) = expected["headers"].as_array() {
        let want: Vec<(String, String)> = headers
            .iter()
            .map(|pair| {
                (
                    pair[0].as_str().unwrap().to_string(),
                    pair[1].as_str().unwrap().to_string(),
                )
            })
            .collect();
        assert_eq!(req.headers, want, "{name}: headers");
    }
}

fn response(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse::new(
        sim["status"].as_u64().unwrap() as u16,
        sim["body"].as_str().unwrap(),
    )
}

/// Check a parse outcome against `expected_result` or `expected_error`.
fn assert_outcome<T>(case: &Value, got: Result<T, ApiError>)
where
    T: std::fmt::Debug + PartialEq + serde::de::DeserializeOwned,
{
    let name = name(case);
    match (case["expected_error"].as_str(), got) {
        (Some("Status"), Err(ApiError::Status { .. })) => {}
        (Some("InvalidBody"), Err(ApiError::InvalidBody(_))) => {}
        (Some(kind), other) => panic!("{name}: expected {kind} error, got {other:?}"),
        (None, Err(err)) => panic!("{name}: unexpected error {err}"),
        (None, Ok(value)) => {
            let want: T = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(value, want, "{name}: parsed result");
        }
    }
}

#[test]
fn list_vectors() {
    let client = TodoClient::new(BASE_URL);
    for case in cases(include_str!("../../test-vectors/list.json")) {
        let page = PageRequest {
            limit: case["input"]["limit"].as_u64().unwrap() as u32,
            skip: case["input"]["skip"].as_u64().unwrap() as u32,
        };
        assert_request(&case, &client.build_list_todos(page));
        assert_outcome::<TodoPage>(&case, client.parse_list_todos(response(&case)));
    }
}

#[test]
fn create_vectors() {
    let client = TodoClient::new(BASE_URL);
    for case in cases(include_str!("../../test-vectors/create.json")) {
        let input: Todo = serde_json::from_value(case["input"].clone()).unwrap();
        assert_request(&case, &client.build_create_todo(&input).unwrap());
        // The echoed id is replaced by the id the request was made for.
        assert_outcome::<Todo>(&case, client.parse_create_todo(response(&case), Some(input.id)));
    }
}

#[test]
fn update_vectors() {
    let client = TodoClient::new(BASE_URL);
    for case in cases(include_str!("../../test-vectors/update.json")) {
        let id = case["input_id"].as_u64().unwrap();
        let input: Todo = serde_json::from_value(case["input"].clone()).unwrap();
        assert_request(&case, &client.build_update_todo(id, &input).unwrap());
        assert_outcome::<Todo>(&case, client.parse_update_todo(response(&case), Some(id)));
    }
}

#[test]
fn delete_vectors() {
    let client = TodoClient::new(BASE_URL);
    for case in cases(include_str!("../../test-vectors/delete.json")) {
        let id = case["input_id"].as_u64().unwrap();
        assert_request(&case, &client.build_delete_todo(id));
        assert_outcome::<Option<Todo>>(&case, client.parse_delete_todo(response(&case), Some(id)));
    }
}
