//! Core traits for cloudns
//!
//! This module defines the abstract interface every DNS backend implements.
//!
//! - [`DnsGateway`]: Read and change an address record set at a provider

pub mod dns_gateway;

pub use dns_gateway::{ChangeReceipt, ChangeRequest, ChangeStatus, DnsGateway, DnsGatewayFactory};
