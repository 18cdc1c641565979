//! Caja - payment processing backend for the Wompi gateway
//!
//! This library provides the core functionality for the Caja payment
//! service: checkout signature generation/verification, idempotent webhook
//! ingestion, the transactional payment ledger, payment-source
//! registration with encrypted gateway tokens, and course-registration
//! handling around those payments.

pub mod config;
pub mod crypto;
pub mod db;
pub mod email;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod payments;
pub mod util;
