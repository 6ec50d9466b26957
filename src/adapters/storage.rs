use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::path::PathBuf;

/// 攝取報告輸出目錄，不存在時自動建立
#[derive(Debug, Clone)]
pub struct LocalStorage {
    report_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
        }
    }
}

impl Storage for LocalStorage {
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let target = self.report_dir.join(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&target, data).await?;
        tracing::debug!("💾 Wrote {} bytes to {}", data.len(), target.display());
        Ok(())
    }
}
