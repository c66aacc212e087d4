pub mod engine;
pub mod ledger;
pub mod profile;
pub mod update_loop;
