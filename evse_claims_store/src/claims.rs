//! Claim store.
//!
//! Local mirror of the device's claim list:
//! - `download` replaces it wholesale (confirmed path)
//! - acknowledged `upload`/`release` patch it in place (proposed path)
//! - the next `download` always supersedes proposed edits
//!
//! Failures never touch local state. The boolean methods log the reason and
//! return `false`; the `try_*` variants hand it back instead.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use evse_claims_core::{
    apply_release, apply_upload, arbitrate, clients, phase_of, Arbitration, Claim, ClaimPhase,
    ClaimSet, ClientRegistry, ResolveCfg, UploadMode,
};

use crate::error::{Result, StoreError};
use crate::reactive::{Observable, SubscriptionId};
use crate::response::classify;
use crate::transport::{HttpApi, Method};

const CLAIMS_PATH: &str = "/claims";

fn claim_path(client: u32) -> String {
    format!("{CLAIMS_PATH}/{client}")
}

/// Claim store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Client id used when upload/release are called without one (default: manual)
    pub own_client: u32,
    /// Apply acknowledged mutations locally before the next download
    pub optimistic: bool,
    /// How an optimistic upload combines with an existing claim
    pub upload_mode: UploadMode,
    pub resolve: ResolveCfg,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            own_client: clients::MANUAL,
            optimistic: true,
            upload_mode: UploadMode::Merge,
            resolve: ResolveCfg::default(),
        }
    }
}

/// What subscribers observe.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClaimsState {
    pub claims: ClaimSet,
    /// Clients whose local claim differs from the last download.
    pub proposed: BTreeSet<u32>,
    /// True once any confirmed write has happened.
    pub synced: bool,
}

pub struct ClaimStore<A> {
    api: A,
    config: StoreConfig,
    registry: ClientRegistry,
    state: Observable<ClaimsState>,
}

impl<A: HttpApi> ClaimStore<A> {
    pub fn new(api: A, config: StoreConfig) -> Self {
        Self {
            api,
            config,
            registry: ClientRegistry::default(),
            state: Observable::default(),
        }
    }

    pub fn with_registry(mut self, registry: ClientRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn own_client(&self) -> u32 {
        self.config.own_client
    }

    // ==================== Observation ====================

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ClaimsState) + Send + Sync + 'static,
    {
        self.state.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.unsubscribe(id)
    }

    pub fn state(&self) -> ClaimsState {
        self.state.get()
    }

    pub fn snapshot(&self) -> ClaimSet {
        self.state.with(|s| s.claims.clone())
    }

    pub fn get_claim(&self, client: u32) -> Option<Claim> {
        self.state.with(|s| s.claims.get(client).cloned())
    }

    pub fn is_proposed(&self, client: u32) -> bool {
        self.state.with(|s| s.proposed.contains(&client))
    }

    /// Whether `client` holds a claim in the local snapshot.
    pub fn phase(&self, client: u32) -> ClaimPhase {
        self.state.with(|s| phase_of(&s.claims, client))
    }

    /// Run `f` against the arbitration of the current snapshot.
    ///
    /// The snapshot is copied first, so `f` may call back into the store.
    pub fn with_arbitration<R>(&self, f: impl FnOnce(&Arbitration<'_>) -> R) -> R {
        let claims = self.snapshot();
        let arb = arbitrate(&claims, &self.registry, &self.config.resolve);
        f(&arb)
    }

    /// The claim currently in control, if any.
    pub fn controller(&self) -> Option<Claim> {
        self.with_arbitration(|arb| arb.controller().cloned())
    }

    // ==================== Local writes ====================

    /// Confirmed write: replace everything and drop pending proposals.
    pub fn set(&self, claims: ClaimSet) {
        self.state.set(ClaimsState {
            claims,
            proposed: BTreeSet::new(),
            synced: true,
        });
    }

    /// Forget all claims, as before the first download.
    pub fn clear(&self) {
        self.state.set(ClaimsState::default());
    }

    /// Drop one payload field from a claim without contacting the device.
    pub fn remove_claim_prop(&self, client: u32, prop: &str) -> Option<Value> {
        let removed = self.state.update(|s| {
            let removed = s.claims.get_mut(client)?.remove_field(prop);
            if removed.is_some() {
                s.proposed.insert(client);
            }
            removed
        });
        debug!(client, prop, removed = removed.is_some(), "claim prop removed locally");
        removed
    }

    // ==================== Device API ====================

    /// Fetch the full claim list. Returns the number of claims now held.
    pub async fn try_download(&self) -> Result<usize> {
        let value = classify(self.api.request(Method::Get, CLAIMS_PATH, None).await?)?;

        if !value.is_array() {
            return Err(StoreError::Malformed(format!(
                "expected a list of claims, got {value}"
            )));
        }
        let claims: ClaimSet = serde_json::from_value(value)?;

        for c in &claims {
            if self.registry.lookup_by_id(c.client).is_none() {
                debug!(client = c.client, "claim from unregistered client");
            }
        }

        let n = claims.len();
        self.set(claims);
        info!(claims = n, "claims downloaded");
        Ok(n)
    }

    pub async fn download(&self) -> bool {
        match self.try_download().await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "claims download failed");
                false
            }
        }
    }

    /// Assert a claim for `client` (own identity when `None`).
    ///
    /// Returns the device acknowledgement.
    pub async fn try_upload<P>(&self, payload: &P, client: Option<u32>) -> Result<Value>
    where
        P: Serialize + ?Sized,
    {
        let client = client.unwrap_or(self.config.own_client);
        let body = serde_json::to_string(payload)?;

        let ack = classify(
            self.api
                .request(Method::Post, &claim_path(client), Some(body))
                .await?,
        )?;

        if self.config.optimistic {
            match serde_json::to_value(payload)? {
                Value::Object(fields) => {
                    let mode = self.config.upload_mode;
                    let refused = self.state.update(|s| {
                        let refused = apply_upload(&mut s.claims, client, &fields, mode);
                        s.proposed.insert(client);
                        refused
                    });
                    if !refused.is_empty() {
                        debug!(client, fields = ?refused, "payload fields not applied locally");
                    }
                }
                other => debug!(client, payload = %other, "non-object claim payload not applied locally"),
            }
        }

        info!(client, "claim uploaded");
        Ok(ack)
    }

    pub async fn upload<P>(&self, payload: &P, client: Option<u32>) -> bool
    where
        P: Serialize + ?Sized,
    {
        match self.try_upload(payload, client).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "claim upload failed");
                false
            }
        }
    }

    /// Release the claim of `client` (own identity when `None`).
    ///
    /// The request is always sent, even if no local claim exists; the
    /// device's answer decides the result.
    pub async fn try_release(&self, client: Option<u32>) -> Result<Value> {
        let client = client.unwrap_or(self.config.own_client);
        if self.phase(client) == ClaimPhase::Unclaimed {
            debug!(client, "releasing a client with no local claim");
        }

        let ack = classify(
            self.api
                .request(Method::Delete, &claim_path(client), None)
                .await?,
        )?;

        if self.config.optimistic {
            self.state.update(|s| {
                if apply_release(&mut s.claims, client).is_some() {
                    s.proposed.insert(client);
                }
            });
        }

        info!(client, "claim released");
        Ok(ack)
    }

    pub async fn release(&self, client: Option<u32>) -> bool {
        match self.try_release(client).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "claim release failed");
                false
            }
        }
    }
}

impl<A> std::fmt::Debug for ClaimStore<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimStore")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
