use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::ChargeStatus;

/// PIX fields of a charge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixData {
    /// Base64 QR image
    pub qr_code: Option<String>,
    /// Copy-paste payload
    pub copy_paste: Option<String>,
}

impl PixData {
    pub fn new(qr_code: impl Into<String>, copy_paste: impl Into<String>) -> Self {
        Self {
            qr_code: Some(qr_code.into()),
            copy_paste: Some(copy_paste.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.qr_code.is_none() && self.copy_paste.is_none()
    }
}

/// Where an observation of a charge came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateSource {
    ChargeCreation,
    Webhook,
    ForceSync,
    ManualPayment,
}

/// One observation of an external charge, applied identically to both ledgers
#[derive(Debug, Clone)]
pub struct ChargeUpdate {
    pub external_id: String,
    /// Target status; `None` records the observation without a transition
    pub status: Option<ChargeStatus>,
    pub pix: PixData,
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Gateway payload kept on the service order for audit
    pub raw_payload: Option<serde_json::Value>,
    pub observed_at: DateTime<Utc>,
    pub source: UpdateSource,
}

impl ChargeUpdate {
    pub fn new(external_id: impl Into<String>, source: UpdateSource) -> Self {
        Self {
            external_id: external_id.into(),
            status: None,
            pix: PixData::default(),
            confirmed_at: None,
            raw_payload: None,
            observed_at: Utc::now(),
            source,
        }
    }

    pub fn with_status(mut self, status: ChargeStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_pix(mut self, pix: PixData) -> Self {
        self.pix = pix;
        self
    }

    pub fn with_confirmed_at(mut self, confirmed_at: Option<DateTime<Utc>>) -> Self {
        self.confirmed_at = confirmed_at;
        self
    }

    pub fn with_raw_payload(mut self, payload: serde_json::Value) -> Self {
        self.raw_payload = Some(payload);
        self
    }

    pub fn observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }
}

/// What merging one update changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub status_changed: bool,
    pub pix_changed: bool,
    /// The update was older than the newest applied observation
    pub stale: bool,
    /// A settled status refused to reopen
    pub regression_rejected: bool,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        self.status_changed || self.pix_changed
    }
}

/// Charge fields shared by the `Payment` and `ServiceOrder` projections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeState {
    pub status: ChargeStatus,
    pub pix_qr_code: Option<String>,
    pub pix_copy_paste: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
}

impl ChargeState {
    /// Merge an observation into this state.
    ///
    /// A stale observation only changes status when it settles a charge that
    /// is still open; it never reorders settled states and only fills PIX
    /// fields that are still empty. A settled status only moves to another
    /// settled one, last write wins. PIX fields keep the latest non-null value.
    pub fn merge(&mut self, update: &ChargeUpdate) -> MergeOutcome {
        let stale = self
            .last_event_at
            .map(|last| update.observed_at < last)
            .unwrap_or(false);

        let mut outcome = MergeOutcome {
            stale,
            ..MergeOutcome::default()
        };

        if let Some(next) = update.status {
            let settles_open_charge = next.is_settled() && !self.status.is_settled();
            if stale && !settles_open_charge {
                tracing::debug!(
                    external_id = %update.external_id,
                    status = %next,
                    "Ignoring stale status observation"
                );
            } else if !self.status.can_transition_to(next) {
                outcome.regression_rejected = true;
                tracing::info!(
                    external_id = %update.external_id,
                    current = %self.status,
                    rejected = %next,
                    "Settled charge refused to reopen"
                );
            } else if self.status != next {
                self.status = next;
                outcome.status_changed = true;
            }
        }

        outcome.pix_changed |= merge_pix_field(&mut self.pix_qr_code, &update.pix.qr_code, stale);
        outcome.pix_changed |=
            merge_pix_field(&mut self.pix_copy_paste, &update.pix.copy_paste, stale);

        if let Some(confirmed_at) = update.confirmed_at {
            if self.status == ChargeStatus::Paid
                && (self.confirmed_at.is_none() || outcome.status_changed)
            {
                self.confirmed_at = Some(confirmed_at);
            }
        }

        if !stale {
            self.last_event_at = Some(update.observed_at);
        }

        outcome
    }
}

fn merge_pix_field(current: &mut Option<String>, incoming: &Option<String>, stale: bool) -> bool {
    let Some(value) = incoming.as_ref().filter(|v| !v.is_empty()) else {
        return false;
    };

    if stale && current.is_some() {
        return false;
    }

    if current.as_ref() == Some(value) {
        return false;
    }

    *current = Some(value.clone());
    true
}
