use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Payer data sent when creating a gateway customer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub name: String,
    pub cpf_cnpj: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<String>,
    /// Local client id, so the gateway record points back at us
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
}

/// Customer record as returned by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSnapshot {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cpf_cnpj: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile_phone: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

/// Wire form of one split entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeSplit {
    pub wallet_id: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub fixed_value: Decimal,
}

/// PIX charge creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRequest {
    pub customer: String,
    pub billing_type: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub value: Decimal,
    pub due_date: NaiveDate,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub split: Vec<ChargeSplit>,
}

impl ChargeRequest {
    pub fn pix(
        customer: impl Into<String>,
        value: Decimal,
        due_date: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        Self {
            customer: customer.into(),
            billing_type: "PIX".to_string(),
            value,
            due_date,
            description: description.into(),
            external_reference: None,
            split: Vec::new(),
        }
    }
}

/// Identifiers returned by a successful charge creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedCharge {
    pub id: String,
    #[serde(default)]
    pub invoice_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// PIX QR code of a charge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixQrCode {
    /// Base64 PNG
    pub encoded_image: String,
    /// Copy-paste payload
    pub payload: String,
    #[serde(default)]
    pub expiration_date: Option<String>,
}

/// Charge as returned by the gateway's payment endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeSnapshot {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub value: Decimal,
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    pub net_value: Option<Decimal>,
    pub status: String,
    #[serde(default)]
    pub billing_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub confirmed_date: Option<NaiveDate>,
    #[serde(default)]
    pub client_payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub date_created: Option<NaiveDate>,
    #[serde(default)]
    pub invoice_url: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

impl ChargeSnapshot {
    /// Settlement date reported by the gateway, most specific first
    pub fn settled_on(&self) -> Option<NaiveDate> {
        self.client_payment_date
            .or(self.payment_date)
            .or(self.confirmed_date)
    }

    pub fn reference(&self) -> ChargeReference {
        self.external_reference
            .as_deref()
            .map(ChargeReference::parse)
            .unwrap_or_default()
    }
}

/// One page of the gateway's payment listing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargePage {
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    /// Raw entries; decode with [`ChargePage::charges`]
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
}

/// Listed entry that does not decode as a charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndecodedCharge {
    /// Gateway id when the entry carries one, else its listing position
    pub id: String,
    pub error: String,
}

impl ChargePage {
    /// Decode entries one by one so a malformed entry only loses itself
    pub fn charges(&self) -> Vec<std::result::Result<ChargeSnapshot, UndecodedCharge>> {
        self.data
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                serde_json::from_value::<ChargeSnapshot>(raw.clone()).map_err(|e| {
                    UndecodedCharge {
                        id: raw
                            .get("id")
                            .and_then(|v| v.as_str())
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("offset@{}", self.offset as usize + index)),
                        error: e.to_string(),
                    }
                })
            })
            .collect()
    }
}

/// Local identity carried in a charge's `externalReference`
/// as `svc=<serviceId>;co=<companyId>`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChargeReference {
    pub service_id: Option<String>,
    pub company_id: Option<String>,
}

impl ChargeReference {
    pub fn new(service_id: impl Into<String>, company_id: impl Into<String>) -> Self {
        Self {
            service_id: Some(service_id.into()),
            company_id: Some(company_id.into()),
        }
    }

    /// Parse a reference string; unknown keys and malformed pairs are ignored
    pub fn parse(raw: &str) -> Self {
        let mut reference = ChargeReference::default();

        for pair in raw.split(';') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "svc" => reference.service_id = Some(value.to_string()),
                "co" => reference.company_id = Some(value.to_string()),
                _ => {}
            }
        }

        reference
    }

    pub fn is_empty(&self) -> bool {
        self.service_id.is_none() && self.company_id.is_none()
    }
}

impl std::fmt::Display for ChargeReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::with_capacity(2);
        if let Some(service_id) = &self.service_id {
            parts.push(format!("svc={}", service_id));
        }
        if let Some(company_id) = &self.company_id {
            parts.push(format!("co={}", company_id));
        }
        write!(f, "{}", parts.join(";"))
    }
}
