pub mod arrears;
pub mod audit;
pub mod contractors;
pub mod ledger;
pub mod maintenance;
pub mod notifications;
