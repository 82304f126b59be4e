pub mod ledger_store;
pub mod mysql_ledger_store;

pub use ledger_store::{LedgerStore, Upserted};
pub use mysql_ledger_store::MySqlLedgerStore;
