//! ICE server configuration.
//!
//! STUN/TURN endpoint descriptors handed to both endpoints of a call so
//! they can bootstrap their peer connections. Treated as an opaque
//! configuration blob: nothing here talks to these servers.

use serde::{Deserialize, Serialize};

/// One STUN or TURN endpoint descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServer {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }

    pub fn turn(
        url: impl Into<String>,
        username: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            urls: vec![url.into()],
            username: Some(username.into()),
            credential: Some(credential.into()),
        }
    }
}

/// Public STUN servers used when no dedicated infrastructure is
/// configured.
pub fn default_stun_servers() -> Vec<IceServer> {
    [
        "stun:stun01.sipphone.com",
        "stun:stun.ekiga.net",
        "stun:stun.fwdnet.net",
        "stun:stun.ideasip.com",
        "stun:stun.iptel.org",
        "stun:stun.rixtelecom.se",
        "stun:stun.schlund.de",
        "stun:stun.l.google.com:19302",
        "stun:stun1.l.google.com:19302",
        "stun:stun2.l.google.com:19302",
        "stun:stun3.l.google.com:19302",
        "stun:stun4.l.google.com:19302",
        "stun:stunserver.org",
        "stun:stun.softjoys.com",
        "stun:stun.voiparound.com",
        "stun:stun.voipbuster.com",
        "stun:stun.voipstunt.com",
        "stun:stun.voxgratia.org",
        "stun:stun.xten.com",
    ]
    .into_iter()
    .map(IceServer::stun)
    .collect()
}

/// The ICE configuration provider: default STUN list plus any TURN
/// servers supplied by deployment config.
#[derive(Debug, Clone)]
pub struct IceConfig {
    stun: Vec<IceServer>,
    turn: Vec<IceServer>,
}

impl Default for IceConfig {
    fn default() -> Self {
        Self {
            stun: default_stun_servers(),
            turn: Vec::new(),
        }
    }
}

impl IceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_turn(mut self, server: IceServer) -> Self {
        self.turn.push(server);
        self
    }

    /// Merged STUN + TURN descriptor list. Pure read, no side effects.
    pub fn ice_servers(&self) -> Vec<IceServer> {
        self.stun.iter().chain(self.turn.iter()).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_stun_only() {
        let config = IceConfig::default();
        let servers = config.ice_servers();
        assert_eq!(servers.len(), default_stun_servers().len());
        assert!(servers.iter().all(|s| s.username.is_none()));
    }

    #[test]
    fn turn_servers_are_appended() {
        let config = IceConfig::default().with_turn(IceServer::turn(
            "turn:turn.example.com",
            "user",
            "secret",
        ));
        let servers = config.ice_servers();
        let last = servers.last().unwrap();
        assert_eq!(last.urls, vec!["turn:turn.example.com"]);
        assert_eq!(last.username.as_deref(), Some("user"));
    }

    #[test]
    fn credentials_omitted_from_stun_json() {
        let json = serde_json::to_string(&IceServer::stun("stun:stun.example.com")).unwrap();
        assert_eq!(json, r#"{"urls":["stun:stun.example.com"]}"#);
    }
}
