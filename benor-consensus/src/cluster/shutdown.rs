use tracing::info;

use crate::cluster::core::Process;

impl Process {
    /// Permanently stops protocol activity on this instance. Idempotent.
    pub async fn stop(&self) {
        let mut engine = self.engine.lock().await;
        if engine.state().alive {
            engine.kill();
            info!("🔴 [{}] stopped", self.id);
        }
    }
}
