use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Input directory does not exist: {0}")]
    MissingInputDir(PathBuf),

    #[error("No PDF files found in {0}")]
    NoPdfs(PathBuf),

    #[error("`--num-files` must be a positive number or -1, got {0}")]
    InvalidFileLimit(i64),

    #[error("`--jobs` must be at least 1")]
    ZeroJobs,
}
