//! Gateway configuration.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use telemed_signal_core::{IceConfig, IceServer};

/// Runtime configuration for the signaling gateway.
#[derive(Debug, Clone, Parser)]
#[command(name = "signal-gateway", about = "Telemedicine WebRTC signaling gateway")]
pub struct GatewayConfig {
    /// Address the HTTP/WebSocket server binds to.
    #[arg(long, env = "SIGNAL_BIND", default_value = "0.0.0.0:8090")]
    pub bind: SocketAddr,

    /// Seconds an ended call session stays resolvable before purge.
    #[arg(long, env = "SIGNAL_SESSION_GRACE_SECS", default_value_t = 300)]
    pub session_grace_secs: u64,

    /// Optional TURN server URL (requires username and credential).
    #[arg(long, env = "SIGNAL_TURN_URL")]
    pub turn_url: Option<String>,

    #[arg(long, env = "SIGNAL_TURN_USERNAME")]
    pub turn_username: Option<String>,

    #[arg(long, env = "SIGNAL_TURN_CREDENTIAL")]
    pub turn_credential: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::parse_from(["signal-gateway"])
    }
}

impl GatewayConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.session_grace_secs)
    }

    /// ICE configuration: the default STUN list plus a TURN entry when
    /// fully specified.
    pub fn ice_config(&self) -> IceConfig {
        let mut config = IceConfig::default();
        if let (Some(url), Some(user), Some(credential)) = (
            &self.turn_url,
            &self.turn_username,
            &self.turn_credential,
        ) {
            config = config.with_turn(IceServer::turn(url, user, credential));
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.bind.port(), 8090);
        assert_eq!(config.grace_period(), Duration::from_secs(300));
        assert!(config.turn_url.is_none());
    }

    #[test]
    fn turn_requires_all_three_fields() {
        let partial = GatewayConfig::parse_from([
            "signal-gateway",
            "--turn-url",
            "turn:turn.example.com",
        ]);
        let stun_only = IceConfig::default().ice_servers().len();
        assert_eq!(partial.ice_config().ice_servers().len(), stun_only);

        let full = GatewayConfig::parse_from([
            "signal-gateway",
            "--turn-url",
            "turn:turn.example.com",
            "--turn-username",
            "u",
            "--turn-credential",
            "c",
        ]);
        assert_eq!(full.ice_config().ice_servers().len(), stun_only + 1);
    }
}
