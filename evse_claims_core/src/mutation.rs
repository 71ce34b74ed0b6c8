use serde_json::{Map, Value};

use crate::claim::{Claim, ClaimSet};

/// How an upload treats an existing claim for the same client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadMode {
    /// Fields in the payload overwrite, everything else is kept.
    #[default]
    Merge,
    /// The payload becomes the whole claim.
    Replace,
}

/// Per-client position in the claim lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimPhase {
    Unclaimed,
    Claimed,
}

pub fn phase_of(set: &ClaimSet, client: u32) -> ClaimPhase {
    if set.contains(client) {
        ClaimPhase::Claimed
    } else {
        ClaimPhase::Unclaimed
    }
}

// Returns the keys that were refused (see `Claim::set_field`).
fn absorb(claim: &mut Claim, payload: &Map<String, Value>) -> Vec<String> {
    let mut refused = Vec::new();
    for (k, v) in payload {
        if !claim.set_field(k.as_str(), v.clone()) {
            refused.push(k.clone());
        }
    }
    refused
}

/// Build the claim an upload of `payload` for `client` would create.
///
/// The target client comes from the request path; a `client` key in the
/// payload is ignored, as are a `state`/`priority` of the wrong type.
pub fn claim_from_payload(client: u32, payload: &Map<String, Value>) -> Claim {
    let mut claim = Claim::new(client);
    absorb(&mut claim, payload);
    claim
}

/// Apply an acknowledged upload to `set`.
///
/// Unclaimed clients get a fresh claim (state `active` unless the payload
/// says otherwise). Claimed clients are merged or replaced per `mode`.
/// Returns the payload keys that were not applied.
pub fn apply_upload(
    set: &mut ClaimSet,
    client: u32,
    payload: &Map<String, Value>,
    mode: UploadMode,
) -> Vec<String> {
    if mode == UploadMode::Merge {
        if let Some(existing) = set.get_mut(client) {
            return absorb(existing, payload);
        }
    }
    let mut claim = Claim::new(client);
    let refused = absorb(&mut claim, payload);
    set.insert(claim);
    refused
}

/// Apply an acknowledged release. Releasing an absent claim is a no-op.
pub fn apply_release(set: &mut ClaimSet, client: u32) -> Option<Claim> {
    set.remove(client)
}
