use serde::{Deserialize, Serialize};

/// 从导出文件解析出的一条文献记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    #[serde(default, with = "authors_column")]
    pub authors: Vec<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    #[serde(default, alias = "year published")]
    pub year_published: String,
    #[serde(default, alias = "DOI")]
    pub doi: String,
}

impl ArticleRecord {
    /// 记录是否没有任何内容
    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
            && self.title.is_empty()
            && self.abstract_text.is_empty()
            && self.year_published.is_empty()
            && self.doi.is_empty()
    }

    /// 评分所需的输入
    pub fn payload(&self) -> ArticlePayload {
        ArticlePayload {
            title: self.title.clone(),
            abstract_text: self.abstract_text.clone(),
        }
    }
}

/// 评分服务需要的输入：标题 + 摘要
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticlePayload {
    pub title: String,
    pub abstract_text: String,
}

/// 一个评分任务
///
/// `index` 等于该记录在原始输入中的位置，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub index: usize,
    pub payload: ArticlePayload,
}

impl Job {
    pub fn new(index: usize, payload: ArticlePayload) -> Self {
        Self { index, payload }
    }

    /// 按顺序把记录转换为任务列表
    pub fn from_records(records: &[ArticleRecord]) -> Vec<Job> {
        records
            .iter()
            .enumerate()
            .map(|(index, record)| Job::new(index, record.payload()))
            .collect()
    }
}

/// 一个任务的最终结果，每个任务恰好一个
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobResult {
    pub index: usize,
    /// 1-10 的分数；失败时为空
    pub score: Option<u8>,
    pub failed: bool,
    /// 实际发起的调用次数
    pub attempts: u32,
}

impl JobResult {
    pub fn succeeded(index: usize, score: u8, attempts: u32) -> Self {
        Self {
            index,
            score: Some(score),
            failed: false,
            attempts,
        }
    }

    pub fn failed(index: usize, attempts: u32) -> Self {
        Self {
            index,
            score: None,
            failed: true,
            attempts,
        }
    }
}

/// 整批评分的统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_results(results: &[JobResult]) -> Self {
        let failed = results.iter().filter(|r| r.failed).count();
        Self {
            total: results.len(),
            succeeded: results.len() - failed,
            failed,
        }
    }
}

// CSV 中作者列为 "A; B; C"
mod authors_column {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(authors: &[String], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&authors.join("; "))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(raw
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }
}
