use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Write rows as a CSV file with a header derived from the row type.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use track_consistency::{ConsistencyRecord, VideoScore};

    #[test]
    fn test_write_records() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("consistency_results.csv");
        write_csv(
            &path,
            &[
                ConsistencyRecord::new("video_0001".to_string(), 0, 3, 0.95),
                ConsistencyRecord::new("video_0001".to_string(), 2, 0, 1.0),
            ],
        )?;
        let contents = std::fs::read_to_string(&path)?;
        assert_eq!(
            contents,
            "video_name,frame,object_id,score\nvideo_0001,0,3,0.95\nvideo_0001,2,0,1.0\n"
        );
        Ok(())
    }

    #[test]
    fn test_write_scores() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("video_scores.csv");
        write_csv(&path, &[VideoScore::new("video_0002".to_string(), 1.5, 2)])?;
        let contents = std::fs::read_to_string(&path)?;
        assert_eq!(
            contents,
            "video_name,percentage,score_sum,attempted\nvideo_0002,75.0,1.5,2\n"
        );
        Ok(())
    }
}
