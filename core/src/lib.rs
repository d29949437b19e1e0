pub mod allocator;
pub mod calculator;
pub mod cap_ledger;
pub mod catalog;
pub mod category_tree;
pub mod config;
pub mod error;
pub mod marginal;
pub mod portfolio;
pub mod recommendation;
pub mod returns;
pub mod rng;
pub mod rule_resolver;
pub mod sample;
pub mod store;
pub mod types;
pub mod valuation;
