//! Long-running operation poller for Azure Resource Manager
//!
//! A [`Poller`] is created from the first response of a long-running PUT,
//! PATCH, POST, or DELETE. It decides where to poll from the response status
//! and the `Azure-AsyncOperation` / `Location` headers, then tracks the
//! operation state until it reaches `Succeeded`, `Failed`, or `Canceled`.
//!
//! A poller that has not finished can be serialized with
//! [`Poller::resume_token`] and rebuilt later with [`Poller::from_resume_token`].

use std::marker::PhantomData;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ClientError, ResponseError};
use crate::pipeline::Pipeline;
use crate::request::{Request, Response};

const HEADER_ASYNC_OPERATION: &str = "azure-asyncoperation";
const HEADER_LOCATION: &str = "location";

pub const STATE_IN_PROGRESS: &str = "InProgress";
pub const STATE_SUCCEEDED: &str = "Succeeded";
pub const STATE_FAILED: &str = "Failed";
pub const STATE_CANCELED: &str = "Canceled";

/// Statuses a polling endpoint may answer with while the operation is healthy
const POLLING_CODES: [u16; 4] = [200, 201, 202, 204];

/// Where the final result of an operation is fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinalStateVia {
    AzureAsyncOperation,
    Location,
    OriginalUri,
}

/// How the operation status is being tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollingMethod {
    #[serde(rename = "AsyncOperation")]
    AsyncOperation,
    #[serde(rename = "Location")]
    Location,
    #[serde(rename = "RequestURI")]
    RequestUri,
}

/// Result type for operations that produce no resource, such as deletes.
/// Any response body is accepted and discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NoContent;

impl<'de> Deserialize<'de> for NoContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde::de::IgnoredAny::deserialize(deserializer).map(|_| NoContent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Put,
    Patch,
    Post,
    Delete,
}

impl Verb {
    fn parse(method: &str) -> Result<Self, ClientError> {
        match method.to_ascii_uppercase().as_str() {
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            _ => Err(ClientError::poller(format!("unsupported HTTP method {method}"))),
        }
    }
}

/// Serializable poller state; this is the resume token format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PollerState {
    poller_type: String,
    method: String,
    #[serde(default)]
    polling_method: Option<PollingMethod>,
    #[serde(rename = "pollingURI", default)]
    polling_uri: String,
    #[serde(default)]
    lro_state: String,
    #[serde(rename = "resultURI", default)]
    result_uri: String,
    #[serde(default)]
    final_state_via: Option<FinalStateVia>,
    #[serde(rename = "originalURI", default)]
    original_uri: String,
}

/// Tracks a long-running operation whose result decodes into `T`.
pub struct Poller<T> {
    pipeline: Pipeline,
    verb: Verb,
    state: PollerState,
    latest: Option<Response>,
    _result: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for Poller<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<T: DeserializeOwned> Poller<T> {
    /// Build a poller from the initial response of a long-running operation.
    pub fn new(
        pipeline: Pipeline,
        poller_type: &str,
        resp: Response,
        final_state_via: Option<FinalStateVia>,
    ) -> Result<Self, ClientError> {
        let verb = Verb::parse(resp.method().as_str())?;
        let body = body_object(&resp)?;

        let lro_state = match resp.status().as_u16() {
            200 => match provisioning_state(&body) {
                Some(ps) => {
                    if is_failed(&ps) {
                        return Err(ResponseError::from_response(&resp).into());
                    }
                    ps
                }
                None => STATE_SUCCEEDED.to_string(),
            },
            201 => provisioning_state(&body).unwrap_or_else(|| STATE_IN_PROGRESS.to_string()),
            202 => STATE_IN_PROGRESS.to_string(),
            204 => STATE_SUCCEEDED.to_string(),
            _ => return Err(ResponseError::from_response(&resp).into()),
        };

        let mut poller = Self {
            pipeline,
            verb,
            state: PollerState {
                poller_type: poller_type.to_string(),
                method: resp.method().to_string(),
                polling_method: None,
                polling_uri: String::new(),
                lro_state,
                result_uri: String::new(),
                final_state_via,
                original_uri: resp.url().to_string(),
            },
            latest: None,
            _result: PhantomData,
        };
        poller.init_polling_method(&resp)?;
        poller.update_polling_method(&resp)?;
        debug!(
            poller_type,
            state = %poller.state.lro_state,
            polling_uri = %poller.state.polling_uri,
            "long-running operation started"
        );
        poller.latest = Some(resp);
        Ok(poller)
    }

    /// Rebuild a poller from a token produced by [`Poller::resume_token`].
    pub fn from_resume_token(
        pipeline: Pipeline,
        poller_type: &str,
        token: &str,
    ) -> Result<Self, ClientError> {
        let raw: Value = serde_json::from_str(token)?;
        let found = raw.get("pollerType").and_then(Value::as_str).unwrap_or_default();
        if found != poller_type {
            return Err(ClientError::poller(format!(
                "cannot resume from this poller type: expected {poller_type}, received {found}"
            )));
        }
        let method = raw
            .get("method")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::poller("resume token is missing the 'method' property"))?;
        let verb = Verb::parse(method)
            .map_err(|_| ClientError::poller(format!("unsupported method '{method}'")))?;
        let state: PollerState = serde_json::from_value(raw)?;

        Ok(Self {
            pipeline,
            verb,
            state,
            latest: None,
            _result: PhantomData,
        })
    }

    /// Whether the operation reached a terminal state.
    pub fn done(&self) -> bool {
        is_terminal(&self.state.lro_state)
    }

    /// The operation state as last reported by the service.
    pub fn status(&self) -> &str {
        &self.state.lro_state
    }

    /// The most recent response, if any has been received by this instance.
    pub fn latest_response(&self) -> Option<&Response> {
        self.latest.as_ref()
    }

    pub fn polling_method(&self) -> Option<PollingMethod> {
        self.state.polling_method
    }

    /// Serialize the poller so polling can continue elsewhere.
    pub fn resume_token(&self) -> Result<String, ClientError> {
        if self.done() {
            return Err(ClientError::poller(
                "cannot create a resume token from a poller in a terminal state",
            ));
        }
        Ok(serde_json::to_string(&self.state)?)
    }

    /// Poll the operation once.
    pub async fn poll(&mut self) -> Result<&Response, ClientError> {
        if self.done() {
            return self
                .latest
                .as_ref()
                .ok_or_else(|| ClientError::poller("operation finished without a response"));
        }
        if self.state.polling_uri.is_empty() {
            return Err(ClientError::poller("no polling URL for this operation"));
        }

        let request = Request::get(&self.state.polling_uri)?;
        let resp = self.pipeline.send(&request).await?;

        if !resp.has_status(&POLLING_CODES) {
            self.state.lro_state = STATE_FAILED.to_string();
            let err = ResponseError::from_response(&resp);
            self.latest = Some(resp);
            return Err(err.into());
        }

        let body = body_object(&resp)?;
        self.check_for_errors(&resp, &body)?;
        self.update_polling_state(&resp, &body);
        debug!(
            poller_type = %self.state.poller_type,
            state = %self.state.lro_state,
            status = resp.status().as_u16(),
            "polled long-running operation"
        );

        if is_failed(&self.state.lro_state) {
            let err = ResponseError::from_response(&resp);
            self.latest = Some(resp);
            return Err(err.into());
        }

        self.refresh_location(&resp)?;
        let latest = self.latest.insert(resp);
        Ok(&*latest)
    }

    /// Fetch the operation result. Only valid once [`Poller::done`] is true.
    pub async fn result(&mut self) -> Result<T, ClientError> {
        if !self.done() {
            return Err(ClientError::poller(
                "cannot return a final response from a poller in a non-terminal state",
            ));
        }
        if is_failed(&self.state.lro_state) {
            return Err(match &self.latest {
                Some(resp) => ResponseError::from_response(resp).into(),
                None => ClientError::poller(format!(
                    "operation finished with state {}",
                    self.state.lro_state
                )),
            });
        }

        if matches!(self.verb, Verb::Put | Verb::Patch)
            && self.state.polling_method != Some(PollingMethod::AsyncOperation)
        {
            if let Some(resp) = &self.latest {
                if resp.has_status(&[200, 201]) && !resp.body().is_empty() {
                    return resp.json();
                }
            }
        }

        self.set_final_state();
        if self.state.result_uri.is_empty() {
            return match &self.latest {
                Some(resp) => resp.json(),
                None => Err(ClientError::poller("missing URL for retrieving result")),
            };
        }

        debug!(url = %self.state.result_uri, "fetching long-running operation result");
        let request = Request::get(&self.state.result_uri)?.accept_json();
        let resp = self.pipeline.send(&request).await?;
        if !resp.has_status(&POLLING_CODES) {
            return Err(ResponseError::from_response(&resp).into());
        }
        let result = resp.json();
        self.latest = Some(resp);
        result
    }

    /// Poll until the operation finishes, then return its result.
    ///
    /// Waits for `Retry-After` when the service sends it, else `frequency`.
    pub async fn poll_until_done(&mut self, frequency: Duration) -> Result<T, ClientError> {
        if let Some(delay) = self.latest.as_ref().and_then(Response::retry_after) {
            if !self.done() {
                tokio::time::sleep(delay).await;
            }
        }
        while !self.done() {
            let delay = self.poll().await?.retry_after().unwrap_or(frequency);
            if self.done() {
                break;
            }
            tokio::time::sleep(delay).await;
        }
        self.result().await
    }

    fn init_polling_method(&mut self, resp: &Response) -> Result<(), ClientError> {
        if let Some(ao) = header_url(resp, HEADER_ASYNC_OPERATION)? {
            self.state.polling_uri = ao;
            self.state.polling_method = Some(PollingMethod::AsyncOperation);
        } else if let Some(loc) = header_url(resp, HEADER_LOCATION)? {
            self.state.polling_uri = loc;
            self.state.polling_method = Some(PollingMethod::Location);
        }
        Ok(())
    }

    /// A Location-polled operation may hand out a new URL with each 202.
    fn refresh_location(&mut self, resp: &Response) -> Result<(), ClientError> {
        if self.state.polling_method != Some(PollingMethod::Location) || resp.status().as_u16() != 202
        {
            return Ok(());
        }
        if let Some(loc) = header_url(resp, HEADER_LOCATION)? {
            self.state.polling_uri = loc;
        }
        Ok(())
    }

    fn update_polling_method(&mut self, resp: &Response) -> Result<(), ClientError> {
        let status = resp.status().as_u16();
        match self.verb {
            Verb::Put | Verb::Patch => {
                let request_uri = resp.url().to_string();
                if self.state.polling_uri.is_empty() {
                    self.state.polling_uri = request_uri.clone();
                }
                if self.state.result_uri.is_empty() {
                    self.state.result_uri = request_uri;
                }
                if self.state.polling_method.is_none() {
                    self.state.polling_method = Some(PollingMethod::RequestUri);
                }
                if status == 201 {
                    if let Some(ao) = header_url(resp, HEADER_ASYNC_OPERATION)? {
                        self.state.polling_uri = ao;
                        self.state.polling_method = Some(PollingMethod::AsyncOperation);
                    }
                }
                if status == 202 {
                    self.use_accepted_headers(resp, false)?;
                }
            }
            Verb::Post | Verb::Delete => {
                if status == 201 {
                    let loc = header_url(resp, HEADER_LOCATION)?.ok_or_else(|| {
                        ClientError::poller("missing Location header in 201 response")
                    })?;
                    self.state.polling_uri = loc.clone();
                    self.state.result_uri = loc;
                    self.state.polling_method = Some(PollingMethod::Location);
                }
                if status == 202 {
                    self.use_accepted_headers(resp, true)?;
                }
            }
        }
        Ok(())
    }

    /// Prefer `Azure-AsyncOperation` on a 202, falling back to `Location`.
    fn use_accepted_headers(
        &mut self,
        resp: &Response,
        location_is_result: bool,
    ) -> Result<(), ClientError> {
        let ao = header_url(resp, HEADER_ASYNC_OPERATION)?;
        if let Some(ao) = &ao {
            self.state.polling_uri = ao.clone();
            self.state.polling_method = Some(PollingMethod::AsyncOperation);
        }

        // A malformed Location only matters when it is the sole polling URL.
        let loc = match header_url(resp, HEADER_LOCATION) {
            Ok(loc) => loc,
            Err(e) if self.state.polling_uri.is_empty() => return Err(e),
            Err(_) => None,
        };
        if let Some(loc) = loc {
            if ao.is_none() {
                self.state.polling_uri = loc.clone();
                self.state.polling_method = Some(PollingMethod::Location);
            }
            if location_is_result {
                self.state.result_uri = loc;
            }
        }

        if self.state.polling_uri.is_empty() {
            return Err(ClientError::poller(
                "didn't get any suitable polling URLs in 202 response",
            ));
        }
        Ok(())
    }

    fn check_for_errors(
        &self,
        resp: &Response,
        body: &serde_json::Map<String, Value>,
    ) -> Result<(), ClientError> {
        if self.state.polling_method == Some(PollingMethod::AsyncOperation) {
            if resp.body().is_empty() {
                return Err(ClientError::poller(
                    "for Azure-AsyncOperation response body cannot be empty",
                ));
            }
            if !body.contains_key("status") {
                return Err(ClientError::poller(
                    "missing status property in Azure-AsyncOperation response body",
                ));
            }
        }
        if self.state.polling_method == Some(PollingMethod::RequestUri)
            && resp.has_status(&[200, 201])
            && body.is_empty()
        {
            return Err(ClientError::poller("the response did not contain a body"));
        }
        Ok(())
    }

    /// 202 keeps the operation running and 204 ends it. Other statuses report
    /// the provisioning state, defaulting to Succeeded.
    fn update_polling_state(&mut self, resp: &Response, body: &serde_json::Map<String, Value>) {
        let status = resp.status().as_u16();
        let async_status = body.get("status").and_then(Value::as_str);

        self.state.lro_state = match async_status {
            Some(s) if self.state.polling_method == Some(PollingMethod::AsyncOperation) => {
                s.to_string()
            }
            _ if status == 202 => STATE_IN_PROGRESS.to_string(),
            _ if status == 204 => STATE_SUCCEEDED.to_string(),
            _ => provisioning_state(body).unwrap_or_else(|| STATE_SUCCEEDED.to_string()),
        };
    }

    /// Route the final GET according to `FinalStateVia`. A missing header on
    /// the latest response keeps the URL chosen while polling.
    fn set_final_state(&mut self) {
        let Some(via) = self.state.final_state_via else {
            return;
        };
        let from_header = |name: &str| {
            self.latest
                .as_ref()
                .and_then(|resp| header_url(resp, name).ok().flatten())
        };
        let target = match via {
            FinalStateVia::AzureAsyncOperation => from_header(HEADER_ASYNC_OPERATION),
            FinalStateVia::Location => from_header(HEADER_LOCATION),
            FinalStateVia::OriginalUri => Some(self.state.original_uri.clone()),
        };
        if let Some(uri) = target {
            self.state.result_uri = uri;
        }
    }
}

/// Read the poller type recorded in a resume token.
pub fn peek_poller_type(token: &str) -> Result<String, ClientError> {
    let raw: Value = serde_json::from_str(token)?;
    raw.get("pollerType")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| ClientError::poller("resume token is missing the 'pollerType' property"))
}

fn is_terminal(state: &str) -> bool {
    [STATE_SUCCEEDED, STATE_FAILED, STATE_CANCELED]
        .iter()
        .any(|s| s.eq_ignore_ascii_case(state))
}

fn is_failed(state: &str) -> bool {
    state.eq_ignore_ascii_case(STATE_FAILED) || state.eq_ignore_ascii_case(STATE_CANCELED)
}

fn body_object(resp: &Response) -> Result<serde_json::Map<String, Value>, ClientError> {
    if resp.body().iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Map::new());
    }
    match serde_json::from_slice(resp.body())? {
        Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

fn provisioning_state(body: &serde_json::Map<String, Value>) -> Option<String> {
    body.get("properties")?
        .get("provisioningState")?
        .as_str()
        .map(String::from)
}

/// A polling header value, which must be an absolute URL.
fn header_url(resp: &Response, name: &str) -> Result<Option<String>, ClientError> {
    let Some(value) = resp.header(name).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    match reqwest::Url::parse(value) {
        Ok(_) => Ok(Some(value.to_string())),
        Err(_) => Err(ClientError::poller(format!("invalid polling URL '{value}'"))),
    }
}

/// Build a response for a method without a network round trip.
#[cfg(test)]
pub(crate) fn test_response(
    method: reqwest::Method,
    url: &str,
    status: u16,
    headers: &[(&'static str, &str)],
    body: &str,
) -> Response {
    use reqwest::header::{HeaderMap, HeaderValue};

    let mut map = HeaderMap::new();
    for (k, v) in headers {
        map.insert(*k, HeaderValue::from_str(v).unwrap());
    }
    Response::new(
        reqwest::StatusCode::from_u16(status).unwrap(),
        map,
        body.to_string().into(),
        method,
        url.parse().unwrap(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{AuthPolicy, ClientOptions};
    use reqwest::Method;

    const URL: &str = "https://management.azure.com/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1?api-version=2023-09-01";
    const AO: &str = "https://management.azure.com/operations/op1";
    const LOC: &str = "https://management.azure.com/locations/op1";

    fn pipeline() -> Pipeline {
        Pipeline::new(AuthPolicy::None, ClientOptions::default())
    }

    fn poller(
        method: Method,
        status: u16,
        headers: &[(&'static str, &str)],
        body: &str,
    ) -> Result<Poller<Value>, ClientError> {
        Poller::new(
            pipeline(),
            "TestPoller",
            test_response(method, URL, status, headers, body),
            None,
        )
    }

    #[test]
    fn test_put_200_with_provisioning_state() {
        let p = poller(
            Method::PUT,
            200,
            &[],
            r#"{"properties":{"provisioningState":"Updating"}}"#,
        )
        .unwrap();
        assert_eq!(p.status(), "Updating");
        assert!(!p.done());
        assert_eq!(p.polling_method(), Some(PollingMethod::RequestUri));
        assert_eq!(p.state.polling_uri, URL);
    }

    #[test]
    fn test_put_200_without_state_is_succeeded() {
        let p = poller(Method::PUT, 200, &[], r#"{"name":"vm1"}"#).unwrap();
        assert!(p.done());
        assert_eq!(p.status(), STATE_SUCCEEDED);
    }

    #[test]
    fn test_put_200_failed_state_is_error() {
        let err = poller(
            Method::PUT,
            200,
            &[],
            r#"{"properties":{"provisioningState":"Failed"}}"#,
        )
        .unwrap_err();
        assert_eq!(err.status(), Some(200));
    }

    #[test]
    fn test_put_201_prefers_async_operation() {
        let p = poller(
            Method::PUT,
            201,
            &[("azure-asyncoperation", AO), ("location", LOC)],
            "",
        )
        .unwrap();
        assert_eq!(p.status(), STATE_IN_PROGRESS);
        assert_eq!(p.polling_method(), Some(PollingMethod::AsyncOperation));
        assert_eq!(p.state.polling_uri, AO);
        assert_eq!(p.state.result_uri, URL);
    }

    #[test]
    fn test_patch_202_falls_back_to_location() {
        let p = poller(Method::PATCH, 202, &[("location", LOC)], "").unwrap();
        assert_eq!(p.polling_method(), Some(PollingMethod::Location));
        assert_eq!(p.state.polling_uri, LOC);
        assert_eq!(p.state.result_uri, URL);
    }

    #[test]
    fn test_delete_202_both_headers_uses_location_for_result() {
        let p = poller(
            Method::DELETE,
            202,
            &[("azure-asyncoperation", AO), ("location", LOC)],
            "",
        )
        .unwrap();
        assert_eq!(p.polling_method(), Some(PollingMethod::AsyncOperation));
        assert_eq!(p.state.polling_uri, AO);
        assert_eq!(p.state.result_uri, LOC);
    }

    #[test]
    fn test_delete_202_without_headers_is_error() {
        let err = poller(Method::DELETE, 202, &[], "").unwrap_err();
        assert!(err.to_string().contains("didn't get any suitable polling URLs"));
    }

    #[test]
    fn test_post_201_requires_location() {
        let err = poller(Method::POST, 201, &[], "").unwrap_err();
        assert!(err.to_string().contains("missing Location header in 201 response"));
    }

    #[test]
    fn test_delete_204_is_done() {
        let p = poller(Method::DELETE, 204, &[], "").unwrap();
        assert!(p.done());
        assert!(p.resume_token().is_err());
    }

    #[test]
    fn test_relative_polling_url_is_rejected() {
        let err = poller(Method::POST, 202, &[("azure-asyncoperation", "/relative")], "")
            .unwrap_err();
        assert!(err.to_string().contains("invalid polling URL '/relative'"));
    }

    #[test]
    fn test_invalid_location_ignored_when_async_operation_present() {
        let p = poller(
            Method::POST,
            202,
            &[("azure-asyncoperation", AO), ("location", "not a url")],
            "",
        )
        .unwrap();
        assert_eq!(p.state.polling_uri, AO);
    }

    #[test]
    fn test_unsupported_method_and_status() {
        let err = poller(Method::GET, 200, &[], "").unwrap_err();
        assert!(err.to_string().contains("unsupported HTTP method GET"));
        let err = poller(Method::PUT, 500, &[], "").unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_resume_token_roundtrip() {
        let p = poller(
            Method::DELETE,
            202,
            &[("azure-asyncoperation", AO), ("location", LOC)],
            "",
        )
        .unwrap();
        let token = p.resume_token().unwrap();
        let json: Value = serde_json::from_str(&token).unwrap();
        assert_eq!(json["pollerType"], "TestPoller");
        assert_eq!(json["method"], "DELETE");
        assert_eq!(json["pollingMethod"], "AsyncOperation");
        assert_eq!(json["pollingURI"], AO);
        assert_eq!(json["resultURI"], LOC);
        assert_eq!(json["lroState"], STATE_IN_PROGRESS);
        assert_eq!(peek_poller_type(&token).unwrap(), "TestPoller");

        let resumed: Poller<Value> =
            Poller::from_resume_token(pipeline(), "TestPoller", &token).unwrap();
        assert_eq!(resumed.state.polling_uri, AO);
        assert!(!resumed.done());
        assert!(resumed.latest_response().is_none());
    }

    #[test]
    fn test_resume_token_rejections() {
        let err = Poller::<Value>::from_resume_token(pipeline(), "A", "{not json").unwrap_err();
        assert!(matches!(err, ClientError::Json(_)));

        let err = Poller::<Value>::from_resume_token(
            pipeline(),
            "A",
            r#"{"pollerType":"B","method":"PUT"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("expected A, received B"));

        let err =
            Poller::<Value>::from_resume_token(pipeline(), "A", r#"{"pollerType":"A"}"#)
                .unwrap_err();
        assert!(err.to_string().contains("missing the 'method' property"));

        let err = Poller::<Value>::from_resume_token(
            pipeline(),
            "A",
            r#"{"pollerType":"A","method":"GET"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unsupported method 'GET'"));
    }

    #[test]
    fn test_final_state_via_serialization() {
        assert_eq!(
            serde_json::to_string(&FinalStateVia::AzureAsyncOperation).unwrap(),
            "\"azure-async-operation\""
        );
        assert_eq!(
            serde_json::to_string(&FinalStateVia::OriginalUri).unwrap(),
            "\"original-uri\""
        );
    }

    #[test]
    fn test_no_content_accepts_anything() {
        let _: NoContent = serde_json::from_str(r#"{"a":[1,2]}"#).unwrap();
        let _: NoContent = serde_json::from_str("null").unwrap();
    }

    #[tokio::test]
    async fn test_result_before_done_is_error() {
        let mut p = poller(Method::PUT, 202, &[("location", LOC)], "").unwrap();
        let err = p.result().await.unwrap_err();
        assert!(err.to_string().contains("non-terminal state"));
    }

    #[tokio::test]
    async fn test_result_from_initial_put_response() {
        let mut p = poller(Method::PUT, 200, &[], r#"{"name":"vm1"}"#).unwrap();
        let value = p.result().await.unwrap();
        assert_eq!(value["name"], "vm1");
    }
}
