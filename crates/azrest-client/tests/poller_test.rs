//! Long-running operations end to end against a mock resource manager

mod common;

use azrest_client::arm::compute::{VirtualMachine, VirtualMachinesClient};
use azrest_client::arm::network::{VirtualNetwork, VirtualNetworksClient};
use azrest_client::arm::resources::ResourceGroupsClient;
use std::time::Duration;

use azrest_client::error::ClientError;
use azrest_client::pipeline::{AuthPolicy, Pipeline};
use azrest_client::poller::{
    NoContent, Poller, PollingMethod, STATE_IN_PROGRESS, STATE_SUCCEEDED, peek_poller_type,
};
use azrest_client::request::Request;
use common::{POLL, arm_options, credential, fast_options};
use reqwest::Method;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VM_PATH: &str =
    "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Compute/virtualMachines/vm1";

#[tokio::test]
async fn test_resource_group_delete_via_location() {
    let server = MockServer::start().await;
    let location = format!("{}/operationresults/op1", server.uri());

    Mock::given(method("DELETE"))
        .and(path("/subscriptions/sub1/resourcegroups/rg1"))
        .and(query_param("api-version", "2021-04-01"))
        .respond_with(ResponseTemplate::new(202).insert_header("Location", location.as_str()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operationresults/op1"))
        .respond_with(ResponseTemplate::new(202).insert_header("Location", location.as_str()))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operationresults/op1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = ResourceGroupsClient::new("sub1", credential(), arm_options(&server.uri())).unwrap();
    let mut poller = client.begin_delete("rg1").await.unwrap();
    assert_eq!(poller.status(), STATE_IN_PROGRESS);
    assert_eq!(poller.polling_method(), Some(PollingMethod::Location));

    poller.poll_until_done(POLL).await.unwrap();
    assert!(poller.done());
}

#[tokio::test]
async fn test_vm_create_via_async_operation() {
    let server = MockServer::start().await;
    let operation = format!("{}/operations/create1", server.uri());

    Mock::given(method("PUT"))
        .and(path(VM_PATH))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Azure-AsyncOperation", operation.as_str())
                .set_body_json(json!({"name": "vm1", "location": "westeurope",
                    "properties": {"provisioningState": "Creating"}})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/create1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "InProgress"})))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/create1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(VM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "vm1", "location": "westeurope",
            "properties": {"provisioningState": "Succeeded", "vmId": "abc"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = VirtualMachinesClient::new("sub1", credential(), arm_options(&server.uri())).unwrap();
    let vm = VirtualMachine {
        location: "westeurope".into(),
        ..Default::default()
    };
    let mut poller = client.begin_create_or_update("rg1", "vm1", &vm).await.unwrap();
    assert_eq!(poller.polling_method(), Some(PollingMethod::AsyncOperation));
    assert_eq!(poller.status(), "Creating");

    let created = poller.poll_until_done(POLL).await.unwrap();
    assert_eq!(created.properties.unwrap().vm_id.as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_vm_power_off_resumes_from_token() {
    let server = MockServer::start().await;
    let operation = format!("{}/operations/off1", server.uri());

    Mock::given(method("POST"))
        .and(path(format!("{VM_PATH}/powerOff")))
        .and(query_param("skipShutdown", "true"))
        .respond_with(ResponseTemplate::new(202).insert_header("Azure-AsyncOperation", operation.as_str()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/off1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
        .mount(&server)
        .await;

    let client = VirtualMachinesClient::new("sub1", credential(), arm_options(&server.uri())).unwrap();
    let token = client
        .begin_power_off("rg1", "vm1", true)
        .await
        .unwrap()
        .resume_token()
        .unwrap();
    assert_eq!(peek_poller_type(&token).unwrap(), "VirtualMachinesClient.PowerOff");

    // A token from one operation cannot resume another.
    assert!(client.resume_start(&token).is_err());

    let mut resumed = client.resume_power_off(&token).unwrap();
    assert!(!resumed.done());
    resumed.poll_until_done(POLL).await.unwrap();
    assert!(resumed.done());
}

#[tokio::test]
async fn test_failed_operation_surfaces_response_error() {
    let server = MockServer::start().await;
    let operation = format!("{}/operations/bad", server.uri());

    Mock::given(method("DELETE"))
        .and(path(VM_PATH))
        .respond_with(ResponseTemplate::new(202).insert_header("Azure-AsyncOperation", operation.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/bad"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Failed",
            "error": {"code": "OperationPreempted", "message": "preempted"}
        })))
        .mount(&server)
        .await;

    let client = VirtualMachinesClient::new("sub1", credential(), arm_options(&server.uri())).unwrap();
    let mut poller = client.begin_delete("rg1", "vm1", false).await.unwrap();
    let err = poller.poll_until_done(POLL).await.unwrap_err();
    let ClientError::Response(resp) = &err else {
        panic!("expected a response error, got {err:?}");
    };
    assert_eq!(resp.error_code.as_deref(), Some("OperationPreempted"));
    assert!(poller.done());
}

#[tokio::test]
async fn test_initial_error_status_is_not_a_poller() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {"code": "Conflict", "message": "busy"}
        })))
        .mount(&server)
        .await;

    let client = VirtualNetworksClient::new("sub1", credential(), arm_options(&server.uri())).unwrap();
    let err = client
        .begin_create_or_update("rg1", "vnet1", &VirtualNetwork::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.response_error().unwrap().message(), "busy");
}

#[tokio::test]
async fn test_vnet_create_final_state_via_async_operation() {
    let server = MockServer::start().await;
    let operation = format!("{}/operations/vnet1", server.uri());
    let vnet_path =
        "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Network/virtualNetworks/vnet1";

    Mock::given(method("PUT"))
        .and(path(vnet_path))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Azure-AsyncOperation", operation.as_str())
                .set_body_json(json!({"name": "vnet1", "properties": {"provisioningState": "Updating"}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/vnet1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(vnet_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "vnet1",
            "properties": {"provisioningState": "Succeeded", "addressSpace": {"addressPrefixes": ["10.1.0.0/16"]}}
        })))
        .mount(&server)
        .await;

    let client = VirtualNetworksClient::new("sub1", credential(), arm_options(&server.uri())).unwrap();
    let created = client
        .begin_create_or_update("rg1", "vnet1", &VirtualNetwork::default())
        .await
        .unwrap()
        .poll_until_done(POLL)
        .await
        .unwrap();
    assert_eq!(
        created.properties.unwrap().address_space.unwrap().address_prefixes,
        vec!["10.1.0.0/16"]
    );
}

#[tokio::test]
async fn test_patch_polled_by_request_uri_ends_with_no_content() {
    let server = MockServer::start().await;
    let url = format!("{}/widgets/w1", server.uri());

    Mock::given(method("PATCH"))
        .and(path("/widgets/w1"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "properties": {"provisioningState": "Started"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/widgets/w1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "properties": {"provisioningState": "Updating"}
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/widgets/w1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(AuthPolicy::None, fast_options());
    let request = Request::new(Method::PATCH, &url)
        .unwrap()
        .with_json(&json!({"tags": {"env": "test"}}))
        .unwrap();
    let resp = pipeline.send(&request).await.unwrap();
    let mut poller: Poller<Value> = Poller::new(pipeline, "WidgetsClient.Update", resp, None).unwrap();
    assert_eq!(poller.status(), "Started");
    assert_eq!(poller.polling_method(), Some(PollingMethod::RequestUri));

    poller.poll().await.unwrap();
    assert_eq!(poller.status(), "Updating");

    let result = poller.poll_until_done(POLL).await.unwrap();
    assert_eq!(poller.status(), STATE_SUCCEEDED);
    assert_eq!(result, Value::Null);
}

#[tokio::test]
async fn test_delete_location_poll_answered_with_201_is_done() {
    let server = MockServer::start().await;
    let location = format!("{}/operationresults/op201", server.uri());

    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(202).insert_header("Location", location.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operationresults/op201"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let client = ResourceGroupsClient::new("sub1", credential(), arm_options(&server.uri())).unwrap();
    let mut poller = client.begin_delete("rg1").await.unwrap();
    let result: NoContent = poller.poll_until_done(POLL).await.unwrap();
    assert_eq!(result, NoContent);
    assert_eq!(poller.status(), STATE_SUCCEEDED);
}

#[tokio::test]
async fn test_canceled_operation_surfaces_response_error() {
    let server = MockServer::start().await;
    let operation = format!("{}/operations/start1", server.uri());

    Mock::given(method("POST"))
        .and(path(format!("{VM_PATH}/start")))
        .respond_with(ResponseTemplate::new(202).insert_header("Azure-AsyncOperation", operation.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/start1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Canceled",
            "error": {"code": "OperationCanceled", "message": "canceled by user"}
        })))
        .mount(&server)
        .await;

    let client = VirtualMachinesClient::new("sub1", credential(), arm_options(&server.uri())).unwrap();
    let mut poller = client.begin_start("rg1", "vm1").await.unwrap();
    let err = poller.poll_until_done(POLL).await.unwrap_err();
    let ClientError::Response(resp) = &err else {
        panic!("expected a response error, got {err:?}");
    };
    assert_eq!(resp.error_code.as_deref(), Some("OperationCanceled"));
    assert_eq!(poller.status(), "Canceled");
    assert!(poller.done());
}

#[tokio::test]
async fn test_poll_until_done_prefers_retry_after() {
    let server = MockServer::start().await;
    let location = format!("{}/operationresults/slow", server.uri());

    Mock::given(method("DELETE"))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", location.as_str())
                .insert_header("Retry-After", "0"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operationresults/slow"))
        .respond_with(
            ResponseTemplate::new(202)
                .insert_header("Location", location.as_str())
                .insert_header("Retry-After", "0"),
        )
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operationresults/slow"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = ResourceGroupsClient::new("sub1", credential(), arm_options(&server.uri())).unwrap();
    let mut poller = client.begin_delete("rg1").await.unwrap();
    // Without the service hint each wait would be a minute.
    tokio::time::timeout(Duration::from_secs(5), poller.poll_until_done(Duration::from_secs(60)))
        .await
        .expect("Retry-After should replace the polling frequency")
        .unwrap();
    assert!(poller.done());
}

#[tokio::test]
async fn test_async_operation_poll_ignores_location_header() {
    let server = MockServer::start().await;
    let operation = format!("{}/operations/restart1", server.uri());
    let elsewhere = format!("{}/somewhere/else", server.uri());

    Mock::given(method("POST"))
        .and(path(format!("{VM_PATH}/restart")))
        .respond_with(ResponseTemplate::new(202).insert_header("Azure-AsyncOperation", operation.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/restart1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Location", elsewhere.as_str())
                .set_body_json(json!({"status": "InProgress"})),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/restart1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/somewhere/else"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = VirtualMachinesClient::new("sub1", credential(), arm_options(&server.uri())).unwrap();
    let mut poller = client.begin_restart("rg1", "vm1").await.unwrap();
    poller.poll().await.unwrap();
    assert_eq!(poller.polling_method(), Some(PollingMethod::AsyncOperation));
    assert_eq!(poller.status(), STATE_IN_PROGRESS);

    poller.poll_until_done(POLL).await.unwrap();
    assert!(poller.done());
}
