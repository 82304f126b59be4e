// Contract tests for the Asaas v3 HTTP client
//
// Each test stands up a mock Asaas API and checks the request shape the
// client sends and how it maps the response.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use disputepay::core::AppError;
use disputepay::modules::gateways::{
    AsaasClient, ChargeRequest, ChargeSplit, CustomerProfile, GatewayEnvironment, PaymentGateway,
};

fn client(server: &MockServer, key: &str) -> AsaasClient {
    AsaasClient::with_base_url(
        format!("{}/v3", server.uri()),
        key,
        GatewayEnvironment::Sandbox,
        Duration::from_secs(5),
    )
    .unwrap()
}

/// POST /payments carries the split and the access token header
#[tokio::test]
async fn test_create_charge_contract() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/payments"))
        .and(header("access_token", "platform-key"))
        .and(body_partial_json(json!({
            "customer": "cus_000001",
            "billingType": "PIX",
            "dueDate": "2024-06-15",
            "split": [
                {"walletId": "wallet-partner", "fixedValue": 18},
                {"walletId": "wallet-dispatcher", "fixedValue": 106.5}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pay_080225913252",
            "status": "PENDING",
            "invoiceUrl": "https://sandbox.asaas.com/i/080225913252"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut request = ChargeRequest::pix(
        "cus_000001".to_string(),
        dec!(150.00),
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        "Recurso Gravissima - Maria Souza".to_string(),
    );
    request.split = vec![
        ChargeSplit {
            wallet_id: "wallet-partner".to_string(),
            fixed_value: dec!(18),
        },
        ChargeSplit {
            wallet_id: "wallet-dispatcher".to_string(),
            fixed_value: dec!(106.5),
        },
    ];

    let created = client(&server, "platform-key")
        .create_charge(&request)
        .await
        .unwrap();

    assert_eq!(created.id, "pay_080225913252");
    assert_eq!(
        created.invoice_url.as_deref(),
        Some("https://sandbox.asaas.com/i/080225913252")
    );
}

/// Error bodies map to Gateway errors with the first error item
#[tokio::test]
async fn test_error_body_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/customers"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [
                {"code": "invalid_cpfCnpj", "description": "O CPF/CNPJ informado é inválido."}
            ]
        })))
        .mount(&server)
        .await;

    let result = client(&server, "platform-key")
        .create_customer(&CustomerProfile {
            name: "Maria Souza".to_string(),
            cpf_cnpj: "111".to_string(),
            email: None,
            mobile_phone: None,
            external_reference: None,
        })
        .await;

    match result {
        Err(AppError::Gateway {
            status,
            code,
            description,
        }) => {
            assert_eq!(status, 400);
            assert_eq!(code.as_deref(), Some("invalid_cpfCnpj"));
            assert_eq!(description, "O CPF/CNPJ informado é inválido.");
        }
        other => panic!("expected gateway error, got {:?}", other),
    }
}

/// Missing charges surface as 404 gateway errors; 5xx are retryable
#[tokio::test]
async fn test_fetch_charge_status_codes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/payments/pay_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{"code": "invalid_object", "description": "Cobrança não encontrada."}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/payments/pay_flaky"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let asaas = client(&server, "platform-key");

    let missing = asaas.fetch_charge("pay_missing").await.unwrap_err();
    assert!(matches!(missing, AppError::Gateway { status: 404, .. }));
    assert!(!missing.is_retryable());

    let flaky = asaas.fetch_charge("pay_flaky").await.unwrap_err();
    assert!(flaky.is_retryable());
}

/// GET /payments pages with offset and limit
#[tokio::test]
async fn test_list_charges_contract() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/payments"))
        .and(query_param("offset", "20"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "hasMore": true,
            "totalCount": 31,
            "limit": 10,
            "offset": 20,
            "data": [{
                "object": "payment",
                "id": "pay_21",
                "customer": "cus_000005",
                "value": 150.00,
                "netValue": 148.01,
                "status": "RECEIVED",
                "billingType": "PIX",
                "description": "Recurso Gravissima - Maria Souza",
                "externalReference": "svc=svc-1;co=co-1",
                "dueDate": "2024-06-15",
                "paymentDate": "2024-06-14",
                "clientPaymentDate": "2024-06-14",
                "dateCreated": "2024-06-12",
                "deleted": false
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server, "platform-key")
        .list_charges(20, 10)
        .await
        .unwrap();

    assert!(page.has_more);
    assert_eq!(page.total_count, 31);
    let mut charges = page.charges();
    assert_eq!(charges.len(), 1);

    let charge = charges.remove(0).unwrap();
    assert_eq!(charge.value, dec!(150.00));
    assert_eq!(charge.settled_on(), NaiveDate::from_ymd_opt(2024, 6, 14));
    assert_eq!(charge.customer.as_deref(), Some("cus_000005"));
    assert_eq!(charge.reference().company_id.as_deref(), Some("co-1"));
}

/// Sub-account clients send their own key
#[tokio::test]
async fn test_subaccount_key_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v3/payments/pay_sub/pixQrCode"))
        .and(header("access_token", "subaccount-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "encodedImage": "iVBORw0KGgo=",
            "payload": "00020101021226820014br.gov.bcb.pix",
            "expirationDate": "2024-06-16 23:59:59"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let scoped = client(&server, "platform-key").with_api_key("subaccount-key");
    let qr = scoped.fetch_qr_code("pay_sub").await.unwrap();

    assert_eq!(qr.encoded_image, "iVBORw0KGgo=");
    assert_eq!(qr.payload, "00020101021226820014br.gov.bcb.pix");
}

/// POST /payments/{id}/receiveInCash records a cash settlement
#[tokio::test]
async fn test_receive_in_cash_contract() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/payments/pay_cash/receiveInCash"))
        .and(body_partial_json(json!({
            "paymentDate": "2024-06-14",
            "notifyCustomer": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "pay_cash",
            "status": "RECEIVED_IN_CASH"
        })))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, "platform-key")
        .mark_paid_manually(
            "pay_cash",
            NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
            dec!(150.00),
        )
        .await
        .unwrap();
}
