//! Batch identify and convert.
//!
//! The CLI's positional arguments become a list of [`Job`]s
//! ([`plan_jobs`]), which [`run_batch`] processes in parallel on the rayon
//! pool, one [`Wand`] per job. Progress is reported as [`BatchEvent`]s over
//! an optional channel so the caller decides how to print them.
//!
//! ## Planning
//!
//! ```text
//! identify a.png b.jpg          → a.png, b.jpg (no outputs)
//! convert  a.png out.webp       → a.png → out.webp
//! convert  a.png b.jpg outdir   → a.png → outdir/a.png, b.jpg → outdir/b.jpg
//! convert  photos/ outdir       → every decodable file under photos/,
//!                                 mirrored below outdir/
//! ```
//!
//! ## Filters
//!
//! Applied before every conversion, in this order: RGBA normalisation,
//! strip, add comments, set comments, crop, resize, compression level.

use crate::codec::{CodecError, CodecRegistry};
use crate::imaging::ResizeStrategy;
use crate::wand::{DEFAULT_FORMAT, STDIO_PATH, Wand};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("{0}")]
    Usage(String),
}

/// One input and, for conversions, where it goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub input: String,
    pub output: Option<String>,
    /// Create the output's parent directories before writing.
    pub make_dirs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Print one expanded template line per image.
    Identify { template: String },
    /// Apply the filters and write each image to its output.
    Convert { default_format: String },
}

impl Action {
    pub fn convert() -> Self {
        Self::Convert {
            default_format: DEFAULT_FORMAT.to_string(),
        }
    }
}

/// `WxH+X+Y`; offsets may be negative and default to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropGeometry {
    pub width: u32,
    pub height: u32,
    pub x: i64,
    pub y: i64,
}

/// `WxH` for an exact size or `@AREA` for a pixel budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeGeometry {
    Exact { width: u32, height: u32 },
    MaxArea(u64),
}

/// Per-image edits applied by [`Action::Convert`].
#[derive(Debug, Clone, Default)]
pub struct FilterArgs {
    pub strip: bool,
    pub add_comments: Vec<String>,
    /// Replaces every comment when set, after `add_comments`.
    pub set_comments: Option<Vec<String>>,
    pub crop: Option<CropGeometry>,
    pub resize: Option<ResizeGeometry>,
    pub resize_filter: ResizeStrategy,
    pub compression_level: Option<i32>,
    /// Fail on malformed metadata chunks instead of dropping them.
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Identified {
        input: String,
        line: String,
    },
    Converted {
        input: String,
        output: String,
        format: String,
    },
    Failed {
        input: String,
        stage: Stage,
        error: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Write,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Read => "ReadImage",
            Self::Write => "WriteImage",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

// ============================================================================
// Geometry
// ============================================================================

fn parse_size(s: &str, original: &str) -> Result<(u32, u32), BatchError> {
    let invalid = || BatchError::InvalidGeometry(original.to_string());
    let (w, h) = s.split_once(['x', 'X']).ok_or_else(invalid)?;
    Ok((w.parse().map_err(|_| invalid())?, h.parse().map_err(|_| invalid())?))
}

impl FromStr for CropGeometry {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BatchError::InvalidGeometry(s.to_string());
        let (size, offsets) = match s.find(['+', '-']) {
            Some(i) => s.split_at(i),
            None => (s, ""),
        };
        let (width, height) = parse_size(size, s)?;
        let (x, y) = if offsets.is_empty() {
            (0, 0)
        } else {
            let split = offsets[1..]
                .find(['+', '-'])
                .map(|i| i + 1)
                .ok_or_else(invalid)?;
            let (x, y) = offsets.split_at(split);
            (x.parse().map_err(|_| invalid())?, y.parse().map_err(|_| invalid())?)
        };
        Ok(Self { width, height, x, y })
    }
}

impl FromStr for ResizeGeometry {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix('@') {
            Some(area) => area
                .parse()
                .map(Self::MaxArea)
                .map_err(|_| BatchError::InvalidGeometry(s.to_string())),
            None => parse_size(s, s).map(|(width, height)| Self::Exact { width, height }),
        }
    }
}

// ============================================================================
// Planning
// ============================================================================

/// Turn positional arguments into jobs.
///
/// For [`Action::Convert`] the last argument is the output. It names a
/// directory when there is more than one input or any input is a directory.
/// Directory inputs expand to the files below them whose extension names a
/// decodable codec, in sorted order.
pub fn plan_jobs(
    registry: &CodecRegistry,
    args: &[String],
    action: &Action,
) -> Result<Vec<Job>, BatchError> {
    let (inputs, output) = match action {
        Action::Identify { .. } => (args, None),
        Action::Convert { .. } => match args.split_last() {
            Some((output, inputs)) if !inputs.is_empty() => (inputs, Some(output)),
            _ => {
                return Err(BatchError::Usage(
                    "convert needs at least one input and an output path".into(),
                ));
            }
        },
    };

    let mut expanded: Vec<(String, Option<PathBuf>)> = Vec::new();
    let mut saw_dir = false;
    for input in inputs {
        let path = Path::new(input);
        if input != STDIO_PATH && path.is_dir() {
            saw_dir = true;
            for file in decodable_files(registry, path)? {
                let relative = file.strip_prefix(path).unwrap_or(&file).to_path_buf();
                expanded.push((file.to_string_lossy().into_owned(), Some(relative)));
            }
        } else {
            expanded.push((input.clone(), None));
        }
    }

    let Some(output) = output else {
        return Ok(expanded
            .into_iter()
            .map(|(input, _)| Job { input, output: None, make_dirs: false })
            .collect());
    };

    let into_dir = saw_dir || inputs.len() > 1;
    let jobs = expanded
        .into_iter()
        .map(|(input, relative)| {
            if !into_dir {
                return Job { input, output: Some(output.clone()), make_dirs: false };
            }
            let relative = relative.unwrap_or_else(|| {
                Path::new(&input)
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(&input))
            });
            let target = Path::new(output).join(relative);
            Job {
                input,
                output: Some(target.to_string_lossy().into_owned()),
                make_dirs: true,
            }
        })
        .collect();
    Ok(jobs)
}

fn decodable_files(registry: &CodecRegistry, dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let decodable = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| registry.can_decode(&ext.to_ascii_lowercase()));
        if decodable {
            files.push(entry.into_path());
        }
    }
    debug!(dir = %dir.display(), files = files.len(), "expanded input directory");
    Ok(files)
}

// ============================================================================
// Execution
// ============================================================================

/// Apply `filters` to `wand` in their fixed order.
pub fn apply_filters(wand: &mut Wand, filters: &FilterArgs) {
    wand.force_rgba();
    if filters.strip {
        wand.strip();
    }
    for comment in &filters.add_comments {
        wand.add_comment(comment.clone());
    }
    if let Some(comments) = &filters.set_comments {
        wand.set_comments(comments.clone());
    }
    if let Some(crop) = filters.crop {
        wand.crop(crop.width, crop.height, crop.x, crop.y);
    }
    match filters.resize {
        Some(ResizeGeometry::Exact { width, height }) => {
            wand.resize(width, height, filters.resize_filter)
        }
        Some(ResizeGeometry::MaxArea(area)) => wand.resize_max_area(area, filters.resize_filter),
        None => {}
    }
    if let Some(level) = filters.compression_level {
        wand.set_compression_level(level);
    }
}

/// Process every job on the current rayon pool.
///
/// Each job reports exactly one event. Failures do not stop the batch.
pub fn run_batch(
    registry: &CodecRegistry,
    jobs: &[Job],
    action: &Action,
    filters: &FilterArgs,
    events: Option<Sender<BatchEvent>>,
) -> BatchSummary {
    info!(jobs = jobs.len(), "batch started");
    let outcomes: Vec<bool> = jobs
        .par_iter()
        .map(|job| {
            let event = run_job(registry, job, action, filters);
            let ok = !matches!(event, BatchEvent::Failed { .. });
            if let Some(tx) = &events {
                tx.send(event).ok();
            }
            ok
        })
        .collect();

    let succeeded = outcomes.iter().filter(|ok| **ok).count();
    let summary = BatchSummary {
        succeeded,
        failed: outcomes.len() - succeeded,
    };
    info!(succeeded = summary.succeeded, failed = summary.failed, "batch finished");
    summary
}

fn run_job(registry: &CodecRegistry, job: &Job, action: &Action, filters: &FilterArgs) -> BatchEvent {
    let failed = |stage, error: BatchError| BatchEvent::Failed {
        input: job.input.clone(),
        stage,
        error: error.to_string(),
    };

    let mut wand = Wand::new();
    wand.set_strict(filters.strict);
    if let Err(e) = wand.read_image(registry, &job.input) {
        return failed(Stage::Read, e.into());
    }

    match action {
        Action::Identify { template } => BatchEvent::Identified {
            input: job.input.clone(),
            line: wand.format_string(template),
        },
        Action::Convert { default_format } => {
            let Some(output) = &job.output else {
                return failed(Stage::Write, BatchError::Usage("no output path".into()));
            };
            apply_filters(&mut wand, filters);
            match write_output(registry, &wand, job, output, default_format) {
                Ok(format) => {
                    debug!(input = %job.input, output = %output, %format, "converted");
                    BatchEvent::Converted {
                        input: job.input.clone(),
                        output: output.clone(),
                        format,
                    }
                }
                Err(e) => failed(Stage::Write, e),
            }
        }
    }
}

fn write_output(
    registry: &CodecRegistry,
    wand: &Wand,
    job: &Job,
    output: &str,
    default_format: &str,
) -> Result<String, BatchError> {
    if job.make_dirs {
        if let Some(parent) = Path::new(output).parent() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(wand.write_image_or(registry, output, default_format)?)
}
