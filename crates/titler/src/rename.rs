use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use titler_core::filename::stem;
use titler_core::report::{self, LOG_TIMESTAMP_FORMAT};
use titler_core::{dedupe_filename, format_filename, normalize, Config, LogRow, Status, Summary, TitleExtraction};

use crate::ocr::{self, OcrProvider};
use crate::pipeline::{self, Analysis};
use crate::prelude::{eprintln, println, *};
use crate::translate::Translator;

#[derive(Debug, Clone, clap::Args)]
pub struct RenameOptions {
    /// Directory containing the PDF files to rename
    input_dir: PathBuf,

    /// Directory the renamed copies and the CSV log are written to
    output_dir: PathBuf,

    /// Number of files to process, in name order (-1 for all)
    #[arg(short, long, env = "TITLER_NUM_FILES", default_value = "5", allow_negative_numbers = true)]
    num_files: i64,

    /// Number of files processed concurrently
    #[arg(short, long, env = "TITLER_JOBS", default_value = "4")]
    jobs: usize,

    /// Keep titles in their original language
    #[arg(long)]
    no_translate: bool,

    /// Do not OCR pages without a text layer
    #[arg(long)]
    no_ocr: bool,

    /// Write the log without copying any file
    #[arg(long)]
    dry_run: bool,
}

/// What happened to one input file before copying.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    /// A title was found and turned into `new_name`.
    Named {
        source: PathBuf,
        result: TitleExtraction,
        new_name: String,
    },
    /// No usable title; the file is skipped.
    Untitled {
        source: PathBuf,
        result: TitleExtraction,
    },
    /// Processing failed outright.
    Error { source: PathBuf, reason: String },
}

impl FileOutcome {
    fn source(&self) -> &Path {
        match self {
            FileOutcome::Named { source, .. }
            | FileOutcome::Untitled { source, .. }
            | FileOutcome::Error { source, .. } => source,
        }
    }
}

/// Everything the per-file tasks share.
struct Batch {
    config: Config,
    ocr: Option<Arc<dyn OcrProvider>>,
    translator: Translator,
}

pub async fn run(options: RenameOptions, global: crate::Global) -> Result<()> {
    if options.jobs == 0 {
        return Err(Error::ZeroJobs.into());
    }

    let config = crate::settings::from_global(&global)?;
    let files = find_pdfs(&options.input_dir, options.num_files)?;

    std::fs::create_dir_all(&options.output_dir).wrap_err_with(|| {
        format!(
            "Failed to create output directory {}",
            options.output_dir.display()
        )
    })?;

    if global.verbose {
        println!(
            "Processing {} file(s) from {} with {} job(s)",
            files.len(),
            options.input_dir.display(),
            options.jobs
        );
    }

    let batch = Arc::new(Batch {
        translator: Translator::from_config(
            &config,
            global.translate_api_key.clone(),
            !options.no_translate,
        )?,
        ocr: (!options.no_ocr).then(|| ocr::system_provider(&config)),
        config,
    });

    let progress = progress_bar(files.len());
    let outcomes = process_all(files, batch, options.jobs, &progress).await;
    progress.finish_and_clear();

    let rows = place_files(outcomes, &options.output_dir, options.dry_run);
    let log_path = write_log(&options.output_dir, &rows)?;

    print_rows(&rows);
    let summary = Summary::from_rows(&rows);
    println!("\n{}", summary.to_string().bold());
    if summary.errors > 0 {
        eprintln!("{} file(s) failed, see the log for details", summary.errors);
    }
    println!("Log written to {}", log_path.display());

    Ok(())
}

/// `*.pdf` files directly inside `dir`, sorted by name and limited to
/// `limit` entries (`-1` for all).
pub fn find_pdfs(dir: &Path, limit: i64) -> Result<Vec<PathBuf>> {
    let limit = match limit {
        -1 => None,
        n if n > 0 => Some(n as usize),
        n => return Err(Error::InvalidFileLimit(n).into()),
    };

    if !dir.is_dir() {
        return Err(Error::MissingInputDir(dir.to_path_buf()).into());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .wrap_err_with(|| format!("Failed to read directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    if files.is_empty() {
        return Err(Error::NoPdfs(dir.to_path_buf()).into());
    }

    files.sort();
    if let Some(limit) = limit {
        files.truncate(limit);
    }

    Ok(files)
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(std::time::Duration::from_millis(100));
    bar
}

/// Run every file through the pipeline, `jobs` at a time. Outcomes come
/// back in input order.
async fn process_all(
    files: Vec<PathBuf>,
    batch: Arc<Batch>,
    jobs: usize,
    progress: &ProgressBar,
) -> Vec<FileOutcome> {
    let mut outcomes: Vec<(usize, FileOutcome)> = stream::iter(files.into_iter().enumerate())
        .map(|(index, path)| {
            let batch = Arc::clone(&batch);
            async move { (index, process_file(path, batch).await) }
        })
        .buffer_unordered(jobs)
        .inspect(|(_, outcome)| {
            progress.inc(1);
            progress.set_message(display_name(outcome.source()));
        })
        .collect()
        .await;

    outcomes.sort_by_key(|(index, _)| *index);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

async fn process_file(path: PathBuf, batch: Arc<Batch>) -> FileOutcome {
    log::info!("processing {}", path.display());

    // PDF parsing and OCR are blocking work.
    let task = tokio::task::spawn_blocking({
        let path = path.clone();
        let batch = Arc::clone(&batch);
        move || -> Result<Analysis> {
            let bytes = std::fs::read(&path)
                .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
            Ok(pipeline::analyze(&bytes, &batch.config, batch.ocr.as_deref())?)
        }
    });

    let analysis = match task.await {
        Ok(Ok(analysis)) => analysis,
        Ok(Err(e)) => {
            log::warn!("{}: {:#}", path.display(), e);
            return FileOutcome::Error {
                source: path,
                reason: format!("{e:#}"),
            };
        }
        Err(e) => {
            return FileOutcome::Error {
                source: path,
                reason: format!("Processing aborted: {e}"),
            }
        }
    };

    name_file(path, analysis, &batch.translator).await
}

/// Translate if needed and derive the new file name.
async fn name_file(source: PathBuf, analysis: Analysis, translator: &Translator) -> FileOutcome {
    let Analysis {
        extraction, plan, ..
    } = analysis;

    let (Some(plan), Some(title)) = (plan, extraction.title().map(str::to_string)) else {
        return FileOutcome::Untitled {
            source,
            result: extraction,
        };
    };

    let translation = translator.run(&plan, &title).await;
    let result = normalize::apply(extraction, &plan, translation);

    match result.title().map(format_filename) {
        Some(new_name) if !stem(&new_name).is_empty() => FileOutcome::Named {
            source,
            result,
            new_name,
        },
        _ => {
            log::warn!(
                "{}: title {:?} has no characters usable in a file name",
                source.display(),
                result.title()
            );
            FileOutcome::Untitled { source, result }
        }
    }
}

/// Copy named files into `output_dir` in input order, making names unique,
/// and build the log rows.
fn place_files(outcomes: Vec<FileOutcome>, output_dir: &Path, dry_run: bool) -> Vec<LogRow> {
    let mut assigned: HashSet<String> = HashSet::new();

    outcomes
        .into_iter()
        .map(|outcome| {
            let original = display_name(outcome.source());
            match outcome {
                FileOutcome::Named {
                    source,
                    result,
                    new_name,
                } => {
                    let name = dedupe_filename(&new_name, |candidate| {
                        assigned.contains(candidate) || output_dir.join(candidate).exists()
                    });

                    if !dry_run {
                        if let Err(e) = std::fs::copy(&source, output_dir.join(&name)) {
                            return LogRow::error(original, format!("Failed to copy file: {e}"));
                        }
                    }

                    log::info!("{} -> {}", original, name);
                    assigned.insert(name.clone());
                    LogRow::from_extraction(original, Some(&name), &result)
                }
                FileOutcome::Untitled { result, .. } => {
                    LogRow::from_extraction(original, None, &result)
                }
                FileOutcome::Error { reason, .. } => LogRow::error(original, reason),
            }
        })
        .collect()
}

fn write_log(output_dir: &Path, rows: &[LogRow]) -> Result<PathBuf> {
    let timestamp = chrono::Local::now().format(LOG_TIMESTAMP_FORMAT).to_string();
    let path = output_dir.join(report::log_file_name(&timestamp));

    let file = std::fs::File::create(&path)
        .wrap_err_with(|| format!("Failed to create log file {}", path.display()))?;
    report::write_log(std::io::BufWriter::new(file), rows)
        .wrap_err_with(|| format!("Failed to write log file {}", path.display()))?;

    Ok(path)
}

fn print_rows(rows: &[LogRow]) {
    let mut table = new_table();
    table.set_titles(prettytable::row![
        "File".bold(),
        "New name".bold(),
        "Method".bold(),
        "Score".bold(),
        "Status".bold()
    ]);

    for row in rows {
        let status = match row.status {
            Status::Success => "success".green(),
            Status::Skipped => "skipped".yellow(),
            Status::Error => "error".red(),
        };
        table.add_row(prettytable::row![
            row.original_name,
            row.transformed_name,
            row.method.as_str().bright_black(),
            format!("{:.2}", row.score),
            status
        ]);
    }

    table.printstd();
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
