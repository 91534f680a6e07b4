pub mod account_categories;
pub mod account_kinds;
pub mod accounts;
pub mod activity;
pub mod amounts;
pub mod balance_sheet;
pub mod cash_flows;
pub mod chart;
pub mod database;
pub mod errors;
pub mod exporters;
pub mod formatters;
pub mod hledger;
pub mod income_statement;
pub mod ledger;
pub mod notifications;
pub mod periods;
pub mod repositories;
pub mod statements;
pub mod transactions;
pub mod trees;
pub mod trial_balance;
pub mod users;
