use super::Interceptor;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Writes each exchange to `<base>/query_<timestamp>_<seq>.md`.
#[derive(Debug)]
pub struct FileInterceptor {
    base_path: PathBuf,
    seq: AtomicUsize,
}

impl FileInterceptor {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into(), seq: AtomicUsize::new(0) }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[async_trait]
impl Interceptor for FileInterceptor {
    async fn save(&self, prompt: &str, response: &str) -> std::io::Result<()> {
        let timestamp = Utc::now();
        // Sequence number keeps same-millisecond calls from overwriting each other
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let filename = format!("query_{}_{:04}.md", timestamp.format("%Y%m%d_%H%M%S_%3f"), seq);

        fs::create_dir_all(&self.base_path).await?;

        let content = format!(
            "# Prompt\n\n{}\n\n# Response\n\n{}\n",
            prompt,
            response
        );

        let mut file = fs::File::create(self.base_path.join(filename)).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}
