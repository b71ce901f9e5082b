use std::collections::HashMap;

use crate::error::FileError;
use crate::models::record::{Enrichment, Record, RecordId};

/// 题库集合
///
/// 保持文件中的原始顺序，同时维护 ID → 下标的索引，合并结果为 O(1)。
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    records: Vec<Record>,
    index: HashMap<RecordId, usize>,
}

impl Collection {
    /// 由记录列表构建集合，ID 重复时报错
    pub fn new(records: Vec<Record>) -> Result<Self, FileError> {
        let mut index = HashMap::with_capacity(records.len());
        for (pos, record) in records.iter().enumerate() {
            if index.insert(record.id.clone(), pos).is_some() {
                return Err(FileError::DuplicateId {
                    id: record.id.to_string(),
                });
            }
        }
        Ok(Self { records, index })
    }

    /// 从 JSON 文本解析，`origin` 仅用于错误信息
    pub fn from_json_str(content: &str, origin: &str) -> Result<Self, FileError> {
        let records: Vec<Record> =
            serde_json::from_str(content).map_err(|source| FileError::JsonParseFailed {
                path: origin.to_string(),
                source,
            })?;
        Self::new(records)
    }

    /// 序列化为带缩进的 JSON（非 ASCII 字符不转义）
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.index.get(id).map(|&pos| &self.records[pos])
    }

    /// 筛选出待处理的题目（按原始顺序）
    pub fn pending(&self, threshold: usize) -> Vec<Record> {
        self.records
            .iter()
            .filter(|r| r.needs_enrichment(threshold))
            .cloned()
            .collect()
    }

    /// 写入一道题的生成结果，ID 不存在时返回 false
    pub fn apply(&mut self, id: &RecordId, enrichment: Enrichment) -> bool {
        match self.index.get(id) {
            Some(&pos) => {
                self.records[pos].apply(enrichment);
                true
            }
            None => false,
        }
    }
}
