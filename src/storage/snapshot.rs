//! 快照写入
//!
//! 先写临时文件，再 rename 覆盖正式文件。
//! 进程在两步之间崩溃时，正式文件仍是上一份完整快照。

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::PersistenceError;
use crate::models::Collection;

/// 题库快照写入器
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    path: PathBuf,
    temp_path: PathBuf,
}

impl SnapshotWriter {
    /// 临时文件与正式文件位于同一目录（`questions.json` → `questions.json.tmp`），保证 rename 不跨文件系统
    ///
    /// 后缀是追加而不是替换扩展名，正式文件本身以 `.tmp` 结尾时两者也不会重名。
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut temp_path = OsString::from(path.as_os_str());
        temp_path.push(".tmp");
        Self {
            path,
            temp_path: PathBuf::from(temp_path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// 写入完整快照
    pub async fn save(&self, collection: &Collection) -> Result<(), PersistenceError> {
        self.stage(collection).await?;
        self.commit().await
    }

    /// 第一步：序列化并写入临时文件，落盘后返回
    pub async fn stage(&self, collection: &Collection) -> Result<(), PersistenceError> {
        let json = collection
            .to_json_pretty()
            .map_err(PersistenceError::Serialize)?;

        let write_err = |source| PersistenceError::Write {
            path: self.temp_path.display().to_string(),
            source,
        };

        let mut file = fs::File::create(&self.temp_path).await.map_err(write_err)?;
        file.write_all(json.as_bytes()).await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;

        debug!("临时快照已写入: {} ({} 字节)", self.temp_path.display(), json.len());
        Ok(())
    }

    /// 第二步：用临时文件原子替换正式文件
    pub async fn commit(&self) -> Result<(), PersistenceError> {
        fs::rename(&self.temp_path, &self.path)
            .await
            .map_err(|source| PersistenceError::Rename {
                from: self.temp_path.display().to_string(),
                to: self.path.display().to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Enrichment, Record, RecordId};
    use serde_json::Map;

    fn sample() -> Collection {
        let records = (1..=3)
            .map(|i| Record {
                id: RecordId::Number(i),
                question: format!("Q{}", i),
                options: vec!["yes".into(), "no".into()],
                correct_answer: 0,
                scenario: Some("某公司向第三国传输数据".into()),
                explanation: None,
                legal_reference: None,
                analysis: None,
                extra: Map::new(),
            })
            .collect();
        Collection::new(records).unwrap()
    }

    fn read_back(path: &Path) -> Collection {
        let content = std::fs::read_to_string(path).unwrap();
        Collection::from_json_str(&content, "test").unwrap()
    }

    #[tokio::test]
    async fn save_then_load_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path().join("questions.json"));
        let collection = sample();

        writer.save(&collection).await.unwrap();

        assert_eq!(read_back(writer.path()), collection);
        assert!(!writer.temp_path().exists());
    }

    #[test]
    fn temp_path_sits_next_to_target() {
        let writer = SnapshotWriter::new("references/questions.json");
        assert_eq!(writer.temp_path(), Path::new("references/questions.json.tmp"));
    }

    #[tokio::test]
    async fn target_ending_in_tmp_still_stages_separately() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path().join("questions.tmp"));
        assert_ne!(writer.temp_path(), writer.path());
        assert_eq!(writer.temp_path(), dir.path().join("questions.tmp.tmp"));

        let before = sample();
        writer.save(&before).await.unwrap();

        let mut after = before.clone();
        after.apply(
            &RecordId::Number(2),
            Enrichment {
                legal_reference: "GDPR Article 46".into(),
                analysis: "适当保障措施".into(),
            },
        );
        writer.stage(&after).await.unwrap();

        // 未 commit 前正式文件仍是上一份快照
        assert_eq!(read_back(writer.path()), before);

        writer.commit().await.unwrap();
        assert_eq!(read_back(writer.path()), after);
        assert!(!writer.temp_path().exists());
    }

    #[tokio::test]
    async fn crash_before_commit_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path().join("questions.json"));
        let before = sample();
        writer.save(&before).await.unwrap();

        let mut after = before.clone();
        after.apply(
            &RecordId::Number(2),
            Enrichment {
                legal_reference: "GDPR Article 44".into(),
                analysis: "传输的一般原则".into(),
            },
        );
        writer.stage(&after).await.unwrap();

        // 模拟进程在 stage 与 commit 之间退出
        assert!(writer.temp_path().exists());
        assert_eq!(read_back(writer.path()), before);

        writer.commit().await.unwrap();
        assert_eq!(read_back(writer.path()), after);
    }

    #[tokio::test]
    async fn torn_temp_file_never_reaches_target() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path().join("questions.json"));
        let before = sample();
        writer.save(&before).await.unwrap();

        std::fs::write(writer.temp_path(), "[{\"id\": 1, \"quest").unwrap();

        assert_eq!(read_back(writer.path()), before);
    }

    #[tokio::test]
    async fn missing_directory_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path().join("missing").join("questions.json"));
        let err = writer.save(&sample()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Write { .. }));
    }
}
