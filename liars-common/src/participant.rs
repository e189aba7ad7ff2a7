use serde::{Deserialize, Serialize};

/// Identity of an agent in the simulated network.
///
/// `address` is a libp2p multiaddr string. It is both the listen address of the
/// agent's endpoint and the vault key holding its claimed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub address: String,
}

impl Participant {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_record_shape() {
        let p = Participant::new("agent-0", "/ip4/127.0.0.1/tcp/41000");
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"name":"agent-0","address":"/ip4/127.0.0.1/tcp/41000"}"#);
    }
}
