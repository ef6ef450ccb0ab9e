use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The capability tag for a caller, resolved by the layer that authenticated
/// the request. The engine never consults a user directory; it trusts the
/// role it is handed and checks only slot/booking ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn provider(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Provider,
        }
    }

    pub fn requester(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Requester,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Provider,
    Requester,
}
