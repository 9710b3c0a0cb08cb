// # cloudns-core
//
// Core library for keeping one DNS address record in sync with operator intent.
//
// ## Architecture Overview
//
// - **DnsGateway**: Trait for reading and changing record sets at a provider
// - **AddressSet**: Ordered, duplicate-free address collection with merge/diff
// - **Reconciler**: Computes and submits one change, then waits for it to commit
// - **RetryPolicy**: Bounded, fixed-delay retry around a reconciliation attempt
// - **RecordEngine**: Caller-facing `add` / `remove` operations
// - **GatewayRegistry**: Plugin-based registry for gateway implementations
//
// ## Design Principles
//
// 1. **Provider is the source of truth**: current state is re-read on every attempt
// 2. **Plugin-Based**: gateways are registered by name, the core never branches on provider
// 3. **Library-First**: the CLI is a thin layer over this crate
// 4. **Explicit configuration**: immutable config passed into constructors, no globals

pub mod address_set;
pub mod config;
pub mod engine;
pub mod error;
pub mod reconciler;
pub mod registry;
pub mod retry;
pub mod traits;

// Re-export core types for convenience
pub use address_set::{AddressSet, diff, merge};
pub use config::{ProviderConfig, RecordType, RetryConfig};
pub use engine::RecordEngine;
pub use error::{Error, Operation, Result};
pub use reconciler::{ChangeOutcome, DomainTarget, Intent, Reconciler};
pub use registry::GatewayRegistry;
pub use retry::RetryPolicy;
pub use traits::{ChangeReceipt, ChangeRequest, ChangeStatus, DnsGateway, DnsGatewayFactory};
