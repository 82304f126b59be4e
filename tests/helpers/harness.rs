// Service Harness
//
// Wires the real services to the in-memory store and scripted gateway.

use reqwest_retry::policies::ExponentialBackoff;
use std::sync::Arc;
use std::time::Duration;

use disputepay::modules::charges::{BillingSettings, ChargeService};
use disputepay::modules::gateways::PaymentGateway;
use disputepay::modules::ledger::models::{Client, Company, ServicePricing};
use disputepay::modules::ledger::LedgerStore;
use disputepay::modules::reconciliation::{ForceSyncService, SyncSettings};
use disputepay::modules::webhooks::WebhookService;

use super::fake_gateway::FakeGateway;
use super::memory_store::InMemoryLedgerStore;
use super::test_data::{TestDataFactory, PLATFORM_WALLET};

/// Millisecond backoff so retry paths stay fast
pub fn fast_retry() -> ExponentialBackoff {
    ExponentialBackoff::builder()
        .retry_bounds(Duration::from_millis(1), Duration::from_millis(5))
        .build_with_max_retries(3)
}

pub struct TestHarness {
    pub store: Arc<InMemoryLedgerStore>,
    pub gateway: FakeGateway,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryLedgerStore::new()),
            gateway: FakeGateway::new(),
        }
    }

    fn store_handle(&self) -> Arc<dyn LedgerStore> {
        self.store.clone()
    }

    fn gateway_handle(&self) -> Arc<dyn PaymentGateway> {
        Arc::new(self.gateway.clone())
    }

    pub fn charge_service(&self) -> ChargeService {
        ChargeService::new(
            self.gateway_handle(),
            self.store_handle(),
            BillingSettings {
                platform_wallet_id: PLATFORM_WALLET.to_string(),
                charge_due_days: 3,
                read_retry: fast_retry(),
            },
        )
    }

    pub fn webhook_service(&self, token: Option<&str>) -> WebhookService {
        WebhookService::new(self.store_handle(), token.map(str::to_string))
    }

    pub fn force_sync_service(&self, page_size: u32) -> ForceSyncService {
        ForceSyncService::new(
            self.gateway_handle(),
            self.store_handle(),
            SyncSettings {
                page_size,
                read_retry: fast_retry(),
            },
        )
    }

    /// Dispatcher with a wallet, partner with a wallet, one client, one service
    pub fn seed_parties(&self) -> Seeded {
        let dispatcher = TestDataFactory::company(Some("wallet-dispatcher"));
        let partner = TestDataFactory::company(Some("wallet-partner"));
        let client = TestDataFactory::client(&dispatcher.id, None);
        let pricing = TestDataFactory::pricing(Some(&partner.id));

        self.store.add_company(dispatcher.clone());
        self.store.add_company(partner.clone());
        self.store.add_client(client.clone());
        self.store.add_pricing(pricing.clone());

        Seeded {
            dispatcher,
            partner,
            client,
            pricing,
        }
    }
}

pub struct Seeded {
    pub dispatcher: Company,
    pub partner: Company,
    pub client: Client,
    pub pricing: ServicePricing,
}
