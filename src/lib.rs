pub mod types;
pub mod error;
pub mod codec;
pub mod hashing;
pub mod data_items;
pub mod signing;
pub mod verify;
pub mod client;
pub mod config;
pub mod metrics;
pub mod prometheus_metrics;

pub use client::{ClientSignature, SessionKeys};
pub use error::SignatureError;
pub use signing::Secp;
pub use types::{
    DataItem, JsonRpcRequest, ReceiptCreateRequest, ReceiptUpdate, SignatureStatus,
    VerificationKeyAssertion, WorkOrderRequest, WorkOrderResponse, WorkerDetails,
};
