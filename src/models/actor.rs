use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActorRole {
    Customer,
    Laboratory,
    Courier,
    Admin,
}

impl ActorRole {
    pub const ALL: [ActorRole; 4] = [
        ActorRole::Customer,
        ActorRole::Laboratory,
        ActorRole::Courier,
        ActorRole::Admin,
    ];
}
