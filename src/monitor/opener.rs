use anyhow::Result;
use tracing::info;

/// "Open resource" side effect for accepted tokens with auto-open requested.
pub trait LinkOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Logs the link instead of launching anything.
#[derive(Debug, Clone, Default)]
pub struct LogOpener;

impl LinkOpener for LogOpener {
    fn open(&self, url: &str) -> Result<()> {
        info!("🔗 Auto-open: {}", url);
        Ok(())
    }
}
