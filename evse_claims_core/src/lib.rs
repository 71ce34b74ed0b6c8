pub mod clients;
pub mod claim;

pub mod cfg;
pub mod mutation;
pub mod resolve;

pub use clients::{builtin_clients, ClientIdentity, ClientRegistry, RegistryError};
pub use claim::{Claim, ClaimSet, ClaimState};

pub use cfg::{ResolveCfg, TieBreak};
pub use mutation::{apply_release, apply_upload, claim_from_payload, phase_of, ClaimPhase, UploadMode};
pub use resolve::{arbitrate, resolve, Arbitration};
