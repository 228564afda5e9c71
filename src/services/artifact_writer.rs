use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    domain::{
        job::ArtifactHandle,
        place::{PlaceRow, COLUMNS},
    },
    error::ArtifactWriteError,
};

#[async_trait]
pub trait ArtifactWriter: Send + Sync {
    async fn write(
        &self,
        job_id: Uuid,
        rows: &[PlaceRow],
    ) -> Result<ArtifactHandle, ArtifactWriteError>;
}

/// Writes `<output_dir>/<job_id>.csv`.
pub struct CsvArtifactWriter {
    output_dir: PathBuf,
}

impl CsvArtifactWriter {
    pub fn new(output_dir: PathBuf) -> Self {
        CsvArtifactWriter { output_dir }
    }
}

pub fn render_csv(rows: &[PlaceRow]) -> Result<Vec<u8>, ArtifactWriteError> {
    let mut writer = csv::Writer::from_writer(vec![]);

    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.write_record(row.to_record())?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(bytes)
}

#[async_trait]
impl ArtifactWriter for CsvArtifactWriter {
    async fn write(
        &self,
        job_id: Uuid,
        rows: &[PlaceRow],
    ) -> Result<ArtifactHandle, ArtifactWriteError> {
        let bytes = render_csv(rows)?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let file_name = format!("{}.csv", job_id);
        let path = self.output_dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;

        log::info!("Wrote {} rows to {}", rows.len(), path.display());

        Ok(ArtifactHandle { file_name, path })
    }
}
