//! HTTP gate server command: `lessongate serve`.

use anyhow::Result;
use lessongate::config::GateConfig;

pub async fn cmd_serve(config: &GateConfig) -> Result<()> {
    lessongate::gate::server::start_server(config).await
}
