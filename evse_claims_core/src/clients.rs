use std::collections::HashMap;

// ---------------------------------------------------------------------
// Client registry: the fixed set of control sources that may claim the
// charging current, each with a stable id and a priority weight.
// ---------------------------------------------------------------------

pub const MANUAL: u32 = 65537;
pub const DIVERT: u32 = 65538;
pub const BOOST: u32 = 65539;
pub const TIMER: u32 = 65540;
pub const LIMIT: u32 = 65542;
pub const ERROR: u32 = 65543;
pub const OHM: u32 = 65544;
pub const OCPP: u32 = 65545;
pub const RFID: u32 = 65546;
pub const MQTT: u32 = 65547;
pub const SHAPER: u32 = 65548;

/// One control source known to the device.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClientIdentity {
    pub name: String,
    pub id: u32,
    /// Higher wins arbitration. Not unique: two clients may share a weight.
    pub priority: i32,
}

impl ClientIdentity {
    pub fn new(name: impl Into<String>, id: u32, priority: i32) -> Self {
        Self {
            name: name.into(),
            id,
            priority,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate client id {0}")]
    DuplicateId(u32),
    #[error("duplicate client name {0:?}")]
    DuplicateName(String),
}

/// Immutable lookup table over [`ClientIdentity`] records.
///
/// Iteration order is the order the table was built in.
#[derive(Clone, Debug)]
pub struct ClientRegistry {
    clients: Vec<ClientIdentity>,
    by_id: HashMap<u32, usize>,
    by_name: HashMap<String, usize>,
}

impl ClientRegistry {
    /// Build a registry, rejecting tables with repeated ids or names.
    pub fn new(clients: Vec<ClientIdentity>) -> Result<Self, RegistryError> {
        let mut by_id = HashMap::with_capacity(clients.len());
        let mut by_name = HashMap::with_capacity(clients.len());

        for (idx, c) in clients.iter().enumerate() {
            if by_id.insert(c.id, idx).is_some() {
                return Err(RegistryError::DuplicateId(c.id));
            }
            if by_name.insert(c.name.clone(), idx).is_some() {
                return Err(RegistryError::DuplicateName(c.name.clone()));
            }
        }

        Ok(Self {
            clients,
            by_id,
            by_name,
        })
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<&ClientIdentity> {
        self.by_name.get(name).map(|&i| &self.clients[i])
    }

    pub fn lookup_by_id(&self, id: u32) -> Option<&ClientIdentity> {
        self.by_id.get(&id).map(|&i| &self.clients[i])
    }

    pub fn all(&self) -> &[ClientIdentity] {
        &self.clients
    }

    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.lookup_by_id(id).map(|c| c.name.as_str())
    }

    pub fn priority_of(&self, id: u32) -> Option<i32> {
        self.lookup_by_id(id).map(|c| c.priority)
    }

    /// Resolve a user-supplied client reference: a registry name or a
    /// numeric id. Numeric ids outside the registry are passed through.
    pub fn resolve_ref(&self, reference: &str) -> Option<u32> {
        if let Some(c) = self.lookup_by_name(reference) {
            return Some(c.id);
        }
        reference.trim().parse::<u32>().ok()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        builtin_clients()
    }
}

/// The control sources shipped with the charging controller firmware.
pub fn builtin_clients() -> ClientRegistry {
    let table = vec![
        // Manual override from the panel.
        ClientIdentity::new("manual", MANUAL, 1000),
        // Solar divert: lowest, yields to everything.
        ClientIdentity::new("divert", DIVERT, 50),
        ClientIdentity::new("boost", BOOST, 200),
        ClientIdentity::new("timer", TIMER, 100),
        ClientIdentity::new("limit", LIMIT, 1100),
        // Fault handling always wins.
        ClientIdentity::new("error", ERROR, 10000),
        ClientIdentity::new("ohm", OHM, 500),
        ClientIdentity::new("ocpp", OCPP, 1050),
        ClientIdentity::new("rfid", RFID, 1030),
        ClientIdentity::new("mqtt", MQTT, 500),
        ClientIdentity::new("shaper", SHAPER, 5000),
    ];

    match ClientRegistry::new(table) {
        Ok(r) => r,
        // The table above is static; a duplicate is a programming error.
        Err(e) => unreachable!("builtin client table is invalid: {e}"),
    }
}
