// Scripted PaymentGateway
//
// Holds charges and customers in memory, records every call, and can be
// told to fail specific operations. Clones made through `with_api_key`
// share state so sub-account calls are visible to the test.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use disputepay::core::{AppError, Result};
use disputepay::modules::gateways::{
    ChargePage, ChargeRequest, ChargeSnapshot, CreatedCharge, CustomerProfile, CustomerSnapshot,
    GatewayEnvironment, PaymentGateway, PixQrCode,
};

#[derive(Default)]
struct State {
    customers: HashMap<String, CustomerSnapshot>,
    /// Listing order, newest first
    charges: Vec<ChargeSnapshot>,
    /// Listed after `charges`, as the gateway would send them
    raw_listing: Vec<serde_json::Value>,
    qr_codes: HashMap<String, PixQrCode>,
    created_customers: Vec<CustomerProfile>,
    charge_requests: Vec<ChargeRequest>,
    manual_payments: Vec<(String, NaiveDate, Decimal)>,
    /// Remaining transient failures per operation name
    transient_failures: HashMap<String, u32>,
    /// Operations that always fail with the given HTTP status
    hard_failures: HashMap<String, u16>,
    /// API key used for each call, in order
    keys_used: Vec<Option<String>>,
    list_calls: Vec<(u32, u32)>,
    next_id: u32,
}

#[derive(Clone, Default)]
pub struct FakeGateway {
    state: Arc<Mutex<State>>,
    api_key: Option<String>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_customer(&self, customer: CustomerSnapshot) {
        self.state
            .lock()
            .unwrap()
            .customers
            .insert(customer.id.clone(), customer);
    }

    pub fn add_charge(&self, charge: ChargeSnapshot) {
        self.state.lock().unwrap().charges.push(charge);
    }

    /// List an entry verbatim, e.g. one that does not decode as a charge
    pub fn add_raw_listing_entry(&self, entry: serde_json::Value) {
        self.state.lock().unwrap().raw_listing.push(entry);
    }

    pub fn set_qr_code(&self, external_id: &str, encoded_image: &str, payload: &str) {
        self.state.lock().unwrap().qr_codes.insert(
            external_id.to_string(),
            PixQrCode {
                encoded_image: encoded_image.to_string(),
                payload: payload.to_string(),
                expiration_date: None,
            },
        );
    }

    /// Fail the next `times` calls of `operation` with a 503
    pub fn fail_transiently(&self, operation: &str, times: u32) {
        self.state
            .lock()
            .unwrap()
            .transient_failures
            .insert(operation.to_string(), times);
    }

    /// Fail every call of `operation` with `status`
    pub fn fail_always(&self, operation: &str, status: u16) {
        self.state
            .lock()
            .unwrap()
            .hard_failures
            .insert(operation.to_string(), status);
    }

    pub fn charge_requests(&self) -> Vec<ChargeRequest> {
        self.state.lock().unwrap().charge_requests.clone()
    }

    pub fn created_customers(&self) -> Vec<CustomerProfile> {
        self.state.lock().unwrap().created_customers.clone()
    }

    pub fn manual_payments(&self) -> Vec<(String, NaiveDate, Decimal)> {
        self.state.lock().unwrap().manual_payments.clone()
    }

    pub fn keys_used(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().keys_used.clone()
    }

    pub fn list_calls(&self) -> Vec<(u32, u32)> {
        self.state.lock().unwrap().list_calls.clone()
    }

    fn enter(&self, operation: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.keys_used.push(self.api_key.clone());

        if let Some(status) = state.hard_failures.get(operation).copied() {
            return Err(AppError::Gateway {
                status,
                code: Some("scripted".to_string()),
                description: format!("{} rejected", operation),
            });
        }

        if let Some(remaining) = state.transient_failures.get_mut(operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(AppError::Gateway {
                    status: 503,
                    code: None,
                    description: format!("{} temporarily unavailable", operation),
                });
            }
        }

        Ok(())
    }

    fn not_found(what: &str, id: &str) -> AppError {
        AppError::Gateway {
            status: 404,
            code: Some("invalid_object".to_string()),
            description: format!("{} {} not found", what, id),
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_customer(&self, profile: &CustomerProfile) -> Result<String> {
        self.enter("create_customer")?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("cus_{:06}", state.next_id);

        state.created_customers.push(profile.clone());
        state.customers.insert(
            id.clone(),
            CustomerSnapshot {
                id: id.clone(),
                name: Some(profile.name.clone()),
                cpf_cnpj: Some(profile.cpf_cnpj.clone()),
                email: profile.email.clone(),
                mobile_phone: profile.mobile_phone.clone(),
                external_reference: profile.external_reference.clone(),
                deleted: false,
            },
        );
        Ok(id)
    }

    async fn fetch_customer(&self, customer_id: &str) -> Result<CustomerSnapshot> {
        self.enter("fetch_customer")?;
        self.state
            .lock()
            .unwrap()
            .customers
            .get(customer_id)
            .cloned()
            .ok_or_else(|| Self::not_found("Customer", customer_id))
    }

    async fn create_charge(&self, request: &ChargeRequest) -> Result<CreatedCharge> {
        self.enter("create_charge")?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("pay_{:06}", state.next_id);

        state.charge_requests.push(request.clone());
        state.charges.insert(
            0,
            ChargeSnapshot {
                id: id.clone(),
                customer: Some(request.customer.clone()),
                value: request.value,
                net_value: None,
                status: "PENDING".to_string(),
                billing_type: Some(request.billing_type.clone()),
                description: Some(request.description.clone()),
                external_reference: request.external_reference.clone(),
                due_date: Some(request.due_date),
                payment_date: None,
                confirmed_date: None,
                client_payment_date: None,
                date_created: Some(Utc::now().date_naive()),
                invoice_url: Some(format!("https://sandbox.asaas.com/i/{}", id)),
                deleted: false,
            },
        );
        state.qr_codes.entry(id.clone()).or_insert_with(|| PixQrCode {
            encoded_image: format!("qr-image-{}", id),
            payload: format!("pix-payload-{}", id),
            expiration_date: None,
        });

        Ok(CreatedCharge {
            invoice_url: Some(format!("https://sandbox.asaas.com/i/{}", id)),
            status: Some("PENDING".to_string()),
            id,
        })
    }

    async fn fetch_qr_code(&self, external_id: &str) -> Result<PixQrCode> {
        self.enter("fetch_qr_code")?;
        self.state
            .lock()
            .unwrap()
            .qr_codes
            .get(external_id)
            .cloned()
            .ok_or_else(|| Self::not_found("QR code of", external_id))
    }

    async fn fetch_charge(&self, external_id: &str) -> Result<ChargeSnapshot> {
        self.enter("fetch_charge")?;
        self.state
            .lock()
            .unwrap()
            .charges
            .iter()
            .find(|c| c.id == external_id)
            .cloned()
            .ok_or_else(|| Self::not_found("Payment", external_id))
    }

    async fn list_charges(&self, offset: u32, limit: u32) -> Result<ChargePage> {
        self.enter("list_charges")?;
        let mut state = self.state.lock().unwrap();
        state.list_calls.push((offset, limit));

        let listing: Vec<serde_json::Value> = state
            .charges
            .iter()
            .map(|c| serde_json::to_value(c).unwrap())
            .chain(state.raw_listing.iter().cloned())
            .collect();
        let total = listing.len() as u32;
        let data: Vec<serde_json::Value> = listing
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok(ChargePage {
            has_more: offset + (data.len() as u32) < total,
            total_count: total as u64,
            limit,
            offset,
            data,
        })
    }

    async fn mark_paid_manually(
        &self,
        external_id: &str,
        payment_date: NaiveDate,
        value: Decimal,
    ) -> Result<()> {
        self.enter("mark_paid_manually")?;
        let mut state = self.state.lock().unwrap();
        state
            .manual_payments
            .push((external_id.to_string(), payment_date, value));
        if let Some(charge) = state.charges.iter_mut().find(|c| c.id == external_id) {
            charge.status = "RECEIVED_IN_CASH".to_string();
            charge.payment_date = Some(payment_date);
        }
        Ok(())
    }

    fn environment(&self) -> GatewayEnvironment {
        GatewayEnvironment::Sandbox
    }

    fn with_api_key(&self, api_key: &str) -> Arc<dyn PaymentGateway> {
        Arc::new(FakeGateway {
            state: self.state.clone(),
            api_key: Some(api_key.to_string()),
        })
    }
}
