//! Output folder management: moving, annotating, correcting and renumbering
//! integrated diffractograms.
//!
//! A batch is not transactional. If the process stops part way, files that
//! were already moved stay in the destination folder and the rest are absent;
//! rerunning the batch overwrites them one by one.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::SequencingConfig;
use crate::core::loaders::{load_data_file, DataLine, LoaderError};
use crate::core::naming::{self, FrameStride, PatternParseError};

/// Errors that can occur while sequencing outputs.
#[derive(Debug, Error)]
pub enum SequencingError {
    #[error("filesystem error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Load(#[from] LoaderError),

    #[error(transparent)]
    Pattern(#[from] PatternParseError),

    #[error("'{}' did not appear after the move", .path.display())]
    IncompleteMove { path: PathBuf },
}

/// Result type for sequencing operations.
pub type Result<T> = std::result::Result<T, SequencingError>;

fn io_error(path: &Path) -> impl Fn(io::Error) -> SequencingError + '_ {
    move |source| SequencingError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Create `path` if it is missing. Returns true when the folder was created.
pub fn ensure_folder(path: &Path) -> Result<bool> {
    if path.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(path).map_err(io_error(path))?;
    info!("Created folder {}", path.display());
    Ok(true)
}

/// Files of `folder` with `extension` (case-insensitive), sorted by name.
pub fn list_files(folder: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let wanted = extension.trim_start_matches('.');
    let mut files: Vec<PathBuf> = fs::read_dir(folder)
        .map_err(io_error(folder))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case(wanted))
                    .unwrap_or(false)
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Rename `from` to `to`, replacing an existing `to`.
///
/// If the first attempt fails while `to` exists, `to` is deleted and the
/// rename retried once.
pub fn rename_overwriting(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) if to.exists() => {
            fs::remove_file(to).map_err(io_error(to))?;
            fs::rename(from, to).map_err(io_error(from))
        }
        Err(e) => Err(SequencingError::Io {
            path: from.to_path_buf(),
            source: e,
        }),
    }
}

/// Move a file, falling back to copy and delete across filesystems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if rename_overwriting(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to).map_err(io_error(to))?;
    fs::remove_file(from).map_err(io_error(from))
}

/// Move each named file from `source_dir` into `dest_dir`, overwriting
/// same-named files.
///
/// Names missing from `source_dir` (images whose integration failed) are
/// skipped with a warning.
///
/// # Returns
///
/// Destination paths of the files actually moved.
pub fn move_results(source_dir: &Path, dest_dir: &Path, filenames: &[String]) -> Result<Vec<PathBuf>> {
    let mut moved = Vec::with_capacity(filenames.len());

    for name in filenames {
        let src = source_dir.join(name);
        if !src.is_file() {
            warn!("Nothing to move for {}: file not found", src.display());
            continue;
        }

        let dest = dest_dir.join(name);
        move_file(&src, &dest)?;
        debug!("Moved {} -> {}", src.display(), dest.display());
        moved.push(dest);
    }

    Ok(moved)
}

/// Block until every path is visible, polling as configured.
pub fn wait_until_visible(paths: &[PathBuf], config: &SequencingConfig) -> Result<()> {
    let attempts = config.move_check_attempts.max(1);

    for path in paths {
        let mut seen = path.exists();
        let mut tries = 1;
        while !seen && tries < attempts {
            thread::sleep(config.move_check_interval());
            seen = path.exists();
            tries += 1;
        }
        if !seen {
            return Err(SequencingError::IncompleteMove { path: path.clone() });
        }
    }

    Ok(())
}

/// Scoped `<file>.bak` replacement.
///
/// The backup is written next to the target and swapped in by a single
/// rename on commit. Dropping an uncommitted swap removes the backup and
/// leaves the target untouched.
struct BackupSwap {
    target: PathBuf,
    backup: PathBuf,
    committed: bool,
}

impl BackupSwap {
    fn create(target: &Path) -> Result<(Self, BufWriter<File>)> {
        let mut backup = target.as_os_str().to_owned();
        backup.push(".bak");
        let backup = PathBuf::from(backup);

        let file = File::create(&backup).map_err(io_error(&backup))?;
        let swap = Self {
            target: target.to_path_buf(),
            backup,
            committed: false,
        };
        Ok((swap, BufWriter::new(file)))
    }

    fn commit(mut self, writer: BufWriter<File>) -> Result<()> {
        let file = writer.into_inner().map_err(|e| SequencingError::Io {
            path: self.backup.clone(),
            source: e.into_error(),
        })?;
        file.sync_all().map_err(io_error(&self.backup))?;
        drop(file);

        rename_overwriting(&self.backup, &self.target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for BackupSwap {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.backup);
        }
    }
}

/// Insert `lines` at the top of a text file, keeping the rest verbatim.
pub fn prepend_lines(file: &Path, lines: &[String]) -> Result<()> {
    let source = File::open(file).map_err(io_error(file))?;
    let (swap, mut writer) = BackupSwap::create(file)?;
    let backup = swap.backup.clone();
    let fail = io_error(&backup);

    for line in lines {
        writeln!(writer, "{}", line).map_err(&fail)?;
    }

    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf).map_err(io_error(file))?;
        if read == 0 {
            break;
        }
        writer.write_all(&buf).map_err(&fail)?;
    }
    drop(reader);

    swap.commit(writer)
}

/// Add `offset` to every intensity column of a diffractogram.
///
/// Comment lines are written back unchanged. Numeric rows keep their angle
/// token as written; intensities are written with 4 decimals, like the
/// integrated profiles, so successive offsets add up exactly.
///
/// # Errors
///
/// Returns [`SequencingError::Load`] wrapping a malformed-row error when a
/// data row has fewer than two columns or a non-numeric value; the file is
/// then left untouched.
pub fn apply_intensity_offset(file: &Path, offset: f64) -> Result<()> {
    let data = load_data_file(file)?;
    let (swap, mut writer) = BackupSwap::create(file)?;
    let backup = swap.backup.clone();
    let fail = io_error(&backup);

    for line in &data.lines {
        match line {
            DataLine::Passthrough(text) => writeln!(writer, "{}", text).map_err(&fail)?,
            DataLine::Row { angle, intensities } => {
                write!(writer, "{}", angle).map_err(&fail)?;
                for intensity in intensities {
                    write!(writer, "\t{:.4}", intensity + offset).map_err(&fail)?;
                }
                writeln!(writer).map_err(&fail)?;
            }
        }
    }

    swap.commit(writer)
}

/// Apply an intensity offset to every listed file of `folder`.
pub fn apply_offset_to_all(folder: &Path, filenames: &[String], offset: f64) -> Result<usize> {
    let mut corrected = 0;
    for name in filenames {
        let path = folder.join(name);
        if !path.is_file() {
            continue;
        }
        debug!("Intensity correction of {}", path.display());
        apply_intensity_offset(&path, offset)?;
        corrected += 1;
    }
    Ok(corrected)
}

/// One pending rename of a renumbering pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRename {
    pub index: u64,
    pub from: String,
    pub to: String,
}

/// Compute the new names of `filenames`, sorted by ascending index.
///
/// Nothing is touched on disk, so a name that does not follow `pattern`
/// is reported before any file has been changed.
pub fn plan_renames(filenames: &[String], pattern: &str, stride: FrameStride) -> Result<Vec<PlannedRename>> {
    let mut plan = Vec::with_capacity(filenames.len());

    for name in filenames {
        let stem = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name);
        plan.push(PlannedRename {
            index: naming::index_after_pattern(stem, pattern)?,
            from: name.clone(),
            to: naming::rename(name, pattern, stride)?,
        });
    }

    plan.sort_by_key(|entry| entry.index);
    Ok(plan)
}

/// Carry out a rename plan inside `folder`, skipping sources that are gone.
///
/// Entries are handled in plan order, so with an ascending plan a new name
/// never lands on a file that has not been renamed yet.
///
/// # Returns
///
/// Final paths of the renamed files, in processing order.
pub fn apply_renames(folder: &Path, plan: &[PlannedRename]) -> Result<Vec<PathBuf>> {
    let mut renamed = Vec::with_capacity(plan.len());

    for entry in plan {
        let source = folder.join(&entry.from);
        if !source.is_file() {
            continue;
        }
        let target = folder.join(&entry.to);
        if entry.from != entry.to {
            rename_overwriting(&source, &target)?;
            debug!("Renamed {} -> {}", entry.from, entry.to);
        }
        renamed.push(target);
    }

    Ok(renamed)
}

/// Renumber the listed files of `folder` to `<pattern>_<index / stride>.<ext>`.
///
/// Names missing from `folder` are ignored. Every present name is checked
/// against `pattern` before the first rename.
pub fn renumber(folder: &Path, filenames: &[String], pattern: &str, stride: FrameStride) -> Result<Vec<PathBuf>> {
    let present: Vec<String> = filenames
        .iter()
        .filter(|name| folder.join(name).is_file())
        .cloned()
        .collect();

    let plan = plan_renames(&present, pattern, stride)?;
    apply_renames(folder, &plan)
}
