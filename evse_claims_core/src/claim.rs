use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clients::ClientRegistry;

/// Lifecycle state of a claim as reported by the device.
///
/// States the firmware may add later are kept verbatim in `Other` so a
/// download followed by an upload does not rewrite them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClaimState {
    #[default]
    Active,
    Disabled,
    Other(String),
}

impl ClaimState {
    pub fn as_str(&self) -> &str {
        match self {
            ClaimState::Active => "active",
            ClaimState::Disabled => "disabled",
            ClaimState::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for ClaimState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "active" => ClaimState::Active,
            "disabled" => ClaimState::Disabled,
            _ => ClaimState::Other(s),
        }
    }
}

impl From<&str> for ClaimState {
    fn from(s: &str) -> Self {
        ClaimState::from(s.to_string())
    }
}

impl From<ClaimState> for String {
    fn from(s: ClaimState) -> Self {
        match s {
            ClaimState::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ClaimState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One control source's current assertion on the charging current.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub client: u32,
    #[serde(default)]
    pub state: ClaimState,
    /// Priority as sent by the device. `None` means "use the registry".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    /// Source-specific fields (`charge_current`, `max_current`, `auto_release`, ...).
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Claim {
    pub fn new(client: u32) -> Self {
        Self {
            client,
            state: ClaimState::Active,
            priority: None,
            payload: Map::new(),
        }
    }

    pub fn with_state(mut self, state: impl Into<ClaimState>) -> Self {
        self.state = state.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Builder form of [`Claim::set_field`]; refused fields are dropped.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_field(key, value);
        self
    }

    /// Set one top-level field.
    ///
    /// `state` and `priority` go to their typed slots. `client`, and a
    /// `state`/`priority` of the wrong type, are refused and `false` is
    /// returned, so `payload` never shadows a typed key.
    pub fn set_field(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        let value = value.into();
        match key.as_str() {
            "client" => false,
            "state" => match value {
                Value::String(s) => {
                    self.state = s.into();
                    true
                }
                _ => false,
            },
            "priority" => match value.as_i64().and_then(|p| i32::try_from(p).ok()) {
                Some(p) => {
                    self.priority = Some(p);
                    true
                }
                None => false,
            },
            _ => {
                self.payload.insert(key, value);
                true
            }
        }
    }

    #[inline]
    pub fn is_disabled(&self) -> bool {
        self.state == ClaimState::Disabled
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn remove_field(&mut self, key: &str) -> Option<Value> {
        self.payload.remove(key)
    }

    /// Priority used for ranking: the device-supplied value, else the
    /// registry weight of `client`, else `fallback`.
    pub fn effective_priority(&self, registry: &ClientRegistry, fallback: i32) -> i32 {
        self.priority
            .or_else(|| registry.priority_of(self.client))
            .unwrap_or(fallback)
    }
}

/// Claims keyed by client id, in the order the device listed them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Claim>", into = "Vec<Claim>")]
pub struct ClaimSet {
    claims: Vec<Claim>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list. A repeated client id replaces the earlier claim
    /// but keeps its position.
    pub fn from_claims<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Claim>,
    {
        let mut set = ClaimSet::new();
        for c in iter {
            set.insert(c);
        }
        set
    }

    /// Insert or replace the claim for `claim.client`. Returns the replaced claim.
    pub fn insert(&mut self, claim: Claim) -> Option<Claim> {
        match self.claims.iter_mut().find(|c| c.client == claim.client) {
            Some(slot) => Some(std::mem::replace(slot, claim)),
            None => {
                self.claims.push(claim);
                None
            }
        }
    }

    pub fn remove(&mut self, client: u32) -> Option<Claim> {
        let idx = self.claims.iter().position(|c| c.client == client)?;
        Some(self.claims.remove(idx))
    }

    pub fn get(&self, client: u32) -> Option<&Claim> {
        self.claims.iter().find(|c| c.client == client)
    }

    pub fn get_mut(&mut self, client: u32) -> Option<&mut Claim> {
        self.claims.iter_mut().find(|c| c.client == client)
    }

    pub fn contains(&self, client: u32) -> bool {
        self.get(client).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Claim> {
        self.claims.iter()
    }

    pub fn clients(&self) -> impl Iterator<Item = u32> + '_ {
        self.claims.iter().map(|c| c.client)
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

impl From<Vec<Claim>> for ClaimSet {
    fn from(v: Vec<Claim>) -> Self {
        ClaimSet::from_claims(v)
    }
}

impl From<ClaimSet> for Vec<Claim> {
    fn from(s: ClaimSet) -> Self {
        s.claims
    }
}

impl<'a> IntoIterator for &'a ClaimSet {
    type Item = &'a Claim;
    type IntoIter = std::slice::Iter<'a, Claim>;

    fn into_iter(self) -> Self::IntoIter {
        self.claims.iter()
    }
}

impl FromIterator<Claim> for ClaimSet {
    fn from_iter<I: IntoIterator<Item = Claim>>(iter: I) -> Self {
        ClaimSet::from_claims(iter)
    }
}
