pub mod article;
pub mod loaders;

pub use article::{ArticlePayload, ArticleRecord, Job, JobResult, RunSummary};
pub use loaders::{load_export, load_records_csv, parse_export, write_records_csv};
