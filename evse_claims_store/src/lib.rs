//! evse_claims_store
//!
//! Device-facing layer around `evse_claims_core`:
//! - mirrors the device claim list in an observable cell
//! - talks to the device through the `HttpApi` seam
//! - classifies in-band error replies
//! - provides a serial queue for callers that need ordered mutations
//!
//! Arbitration policy lives in core; nothing here re-ranks claims.

pub mod claims;
pub mod error;
pub mod mock;
pub mod queue;
pub mod reactive;
pub mod response;
pub mod transport;

pub use claims::{ClaimStore, ClaimsState, StoreConfig};
pub use error::{Result, StoreError};
pub use mock::{MockApi, MockReply, RecordedRequest};
pub use queue::SerialQueue;
pub use reactive::{Observable, SubscriptionId};
pub use response::classify;
pub use transport::{ApiConfig, HttpApi, Method, ReqwestApi};
