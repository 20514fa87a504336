use application::{ConnectionRegistry, RelayService};
use config::HeartbeatConfig;

#[derive(Clone)]
pub struct AppState {
    pub relay: RelayService,
    pub heartbeat: HeartbeatConfig,
}

impl AppState {
    pub fn new(relay: RelayService, heartbeat: HeartbeatConfig) -> Self {
        Self { relay, heartbeat }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        self.relay.registry()
    }
}
