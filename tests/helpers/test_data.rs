// Test Data Factory
//
// Builds parties, pricing rows, gateway snapshots and webhook payloads.
// Ids carry a UUID suffix so tests never collide.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

use disputepay::modules::gateways::{ChargeReference, ChargeSnapshot, CustomerSnapshot};
use disputepay::modules::ledger::models::{
    ChargeStatus, Client, Company, NewPayment, NewServiceOrder, PixData, ServicePricing,
    SeverityTier, SplitMetadata, Subaccount, UpdateSource,
};

pub const PLATFORM_WALLET: &str = "wallet-platform";

/// Test data factory for generating unique fixtures
pub struct TestDataFactory;

impl TestDataFactory {
    pub fn random_id(prefix: &str) -> String {
        format!("{}-{}", prefix, Uuid::new_v4())
    }

    pub fn company(wallet_id: Option<&str>) -> Company {
        Company {
            id: Self::random_id("co"),
            name: "Despachante Central".to_string(),
            tax_id: "12345678000190".to_string(),
            wallet_id: wallet_id.map(str::to_string),
            asaas_customer_id: None,
        }
    }

    pub fn subaccount(company_id: &str, wallet_id: Option<&str>, api_key: Option<&str>) -> Subaccount {
        Subaccount {
            id: Self::random_id("sub"),
            company_id: company_id.to_string(),
            wallet_id: wallet_id.map(str::to_string),
            api_key: api_key.map(str::to_string),
            status: "approved".to_string(),
        }
    }

    pub fn client(company_id: &str, asaas_customer_id: Option<&str>) -> Client {
        Client {
            id: Self::random_id("client"),
            company_id: company_id.to_string(),
            name: "Maria Souza".to_string(),
            tax_id: "12345678909".to_string(),
            email: Some("maria@example.com".to_string()),
            phone: Some("11999990000".to_string()),
            asaas_customer_id: asaas_customer_id.map(str::to_string),
            placeholder: false,
            created_at: Utc::now(),
        }
    }

    /// 18 / 18 / 7.50 service, floor 43.50
    pub fn pricing(partner_company_id: Option<&str>) -> ServicePricing {
        ServicePricing {
            id: Self::random_id("svc"),
            name: "Recurso Gravissima".to_string(),
            severity_tier: SeverityTier::Gravissima,
            partner_company_id: partner_company_id.map(str::to_string),
            primary_fee: dec!(18.00),
            secondary_fee: dec!(18.00),
            fixed_fee: dec!(7.50),
            suggested_price: dec!(150.00),
            active: true,
        }
    }

    pub fn customer(id: &str, tax_id: &str) -> CustomerSnapshot {
        CustomerSnapshot {
            id: id.to_string(),
            name: Some("João Pereira".to_string()),
            cpf_cnpj: Some(tax_id.to_string()),
            email: None,
            mobile_phone: None,
            external_reference: None,
            deleted: false,
        }
    }

    pub fn charge_snapshot(
        id: &str,
        customer: &str,
        value: Decimal,
        status: &str,
        reference: Option<ChargeReference>,
    ) -> ChargeSnapshot {
        ChargeSnapshot {
            id: id.to_string(),
            customer: Some(customer.to_string()),
            value,
            net_value: None,
            status: status.to_string(),
            billing_type: Some("PIX".to_string()),
            description: Some("Recurso Gravissima - João Pereira".to_string()),
            external_reference: reference.map(|r| r.to_string()),
            due_date: NaiveDate::from_ymd_opt(2024, 6, 15),
            payment_date: None,
            confirmed_date: None,
            client_payment_date: None,
            date_created: NaiveDate::from_ymd_opt(2024, 6, 12),
            invoice_url: None,
            deleted: false,
        }
    }

    pub fn new_payment(external_id: &str, company_id: &str, status: ChargeStatus) -> NewPayment {
        NewPayment {
            asaas_payment_id: external_id.to_string(),
            company_id: company_id.to_string(),
            customer_id: None,
            amount: dec!(150.00),
            status,
            pix: PixData::default(),
            due_date: NaiveDate::from_ymd_opt(2024, 6, 15),
            confirmed_at: None,
            description: None,
            observed_at: Utc::now(),
            source: UpdateSource::ChargeCreation,
        }
    }

    pub fn new_service_order(
        external_id: &str,
        client: &Client,
        pricing: &ServicePricing,
        status: ChargeStatus,
    ) -> NewServiceOrder {
        NewServiceOrder {
            asaas_payment_id: external_id.to_string(),
            payment_id: None,
            client_id: client.id.clone(),
            company_id: client.company_id.clone(),
            service_id: pricing.id.clone(),
            severity_tier: pricing.severity_tier,
            amount: dec!(150.00),
            payment_status: status,
            pix: PixData::default(),
            confirmed_at: None,
            split_metadata: SplitMetadata::reconstructed(pricing.cost_model(), dec!(150.00)),
            raw_payload: None,
            observed_at: Utc::now(),
            source: UpdateSource::ChargeCreation,
        }
    }

    pub fn webhook(event: &str, payment_id: &str) -> Value {
        json!({
            "id": Self::random_id("evt"),
            "event": event,
            "payment": {
                "object": "payment",
                "id": payment_id,
                "status": "RECEIVED",
                "billingType": "PIX",
                "value": 150.00,
            }
        })
    }

    pub fn webhook_with_pix(event: &str, payment_id: &str, qr: &str, copy_paste: &str) -> Value {
        let mut body = Self::webhook(event, payment_id);
        body["payment"]["pixQrCode"] = json!({
            "encodedImage": qr,
            "payload": copy_paste,
        });
        body
    }
}
