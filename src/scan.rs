//! Concurrent scan of desktop entry directories
//!
//! Each directory gets its own listing thread which opens every candidate
//! file and pushes it onto a shared work channel. A fixed pool of parser
//! workers drains that channel and files results into the slot of the
//! directory the file came from:
//! - Outer result order always matches the input directory order
//! - Inner order is whatever order the directory listing produced
//! - The first error wins; everything still queued is closed unparsed

use crate::desktop::{self, DEFAULT_LINE_LIMIT, LineBuffer, SectionMode};
use crate::error::ScanError;
use crate::model::Entry;
use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

const EXTENSION: &str = ".desktop";

/// Knobs for a scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Parser threads; 0 means one per available CPU
    pub workers: usize,

    /// Longest accepted line in bytes, terminator included
    pub line_limit: usize,

    /// How headers after `[Desktop Entry]` are treated
    pub mode: SectionMode,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            workers: 0,
            line_limit: DEFAULT_LINE_LIMIT,
            mode: SectionMode::default(),
        }
    }
}

/// Scans `dirs` with default options.
///
/// Returns one vector per input directory, in input order. Missing
/// directories yield an empty vector; any other failure aborts the scan.
pub fn scan<P: AsRef<Path>>(dirs: &[P]) -> Result<Vec<Vec<Entry>>, ScanError> {
    Scanner::default().scan(dirs)
}

#[derive(Debug, Default)]
pub struct Scanner {
    options: ScanOptions,
}

/// An opened candidate file, tagged with the index of its directory
struct Candidate {
    dir: usize,
    path: PathBuf,
    file: File,
}

/// Count of outstanding work units. `done` fires once when it drops to zero.
struct Pending {
    count: AtomicUsize,
    done: Sender<()>,
}

impl Pending {
    fn add(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _ = self.done.send(());
        }
    }
}

/// Finishes one unit of pending work when dropped
struct WorkGuard<'a> {
    pending: &'a Pending,
}

impl<'a> WorkGuard<'a> {
    fn new(pending: &'a Pending) -> Self {
        Self { pending }
    }
}

impl Drop for WorkGuard<'_> {
    fn drop(&mut self) {
        self.pending.finish();
    }
}

/// State shared by the listing threads and the worker pool
struct Shared {
    slots: Mutex<Vec<Vec<Entry>>>,
    pending: Pending,
    cancelled: AtomicBool,
    errors: Sender<ScanError>,
}

impl Shared {
    fn fail(&self, err: ScanError) {
        self.cancelled.store(true, Ordering::Release);
        let _ = self.errors.send(err);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Scanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    fn worker_count(&self) -> usize {
        if self.options.workers > 0 {
            return self.options.workers;
        }
        thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    }

    /// Non-recursively scans `dirs` for desktop entries and parses them.
    pub fn scan<P: AsRef<Path>>(&self, dirs: &[P]) -> Result<Vec<Vec<Entry>>, ScanError> {
        if dirs.is_empty() {
            return Ok(Vec::new());
        }

        let (done_tx, done_rx) = bounded(1);
        let (err_tx, err_rx) = unbounded();
        let (work_tx, work_rx) = unbounded();

        // Every listing thread is one unit of work until it has queued its files.
        let shared = Arc::new(Shared {
            slots: Mutex::new(vec![Vec::new(); dirs.len()]),
            pending: Pending {
                count: AtomicUsize::new(dirs.len()),
                done: done_tx,
            },
            cancelled: AtomicBool::new(false),
            errors: err_tx,
        });

        let workers = self.worker_count();
        debug!("Starting {} parser workers for {} directories", workers, dirs.len());
        for id in 0..workers {
            let work_rx = work_rx.clone();
            let shared_clone = Arc::clone(&shared);
            let (line_limit, mode) = (self.options.line_limit, self.options.mode);
            let spawned = thread::Builder::new()
                .name(format!("deskscan-worker-{}", id))
                .spawn(move || worker_loop(work_rx, shared_clone, line_limit, mode));
            if let Err(source) = spawned {
                shared.cancelled.store(true, Ordering::Release);
                return Err(ScanError::Spawn {
                    name: format!("parser worker {}", id),
                    source,
                });
            }
        }
        drop(work_rx);

        for (index, dir) in dirs.iter().enumerate() {
            let dir = dir.as_ref().to_path_buf();
            let work_tx = work_tx.clone();
            let shared_clone = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("deskscan-list-{}", index))
                .spawn(move || list_dir(index, &dir, &work_tx, &shared_clone));
            if let Err(source) = spawned {
                shared.cancelled.store(true, Ordering::Release);
                return Err(ScanError::Spawn {
                    name: format!("listing thread for directory {}", index),
                    source,
                });
            }
        }
        drop(work_tx);

        select! {
            recv(err_rx) -> err => {
                if let Ok(err) = err {
                    return Err(err);
                }
            }
            recv(done_rx) -> _ => {}
        }

        // Errors are reported before their work unit finishes, so one that
        // raced the completion signal is already queued here.
        if let Ok(err) = err_rx.try_recv() {
            return Err(err);
        }

        let entries = mem::take(&mut *shared.slots.lock().unwrap_or_else(PoisonError::into_inner));
        info!(
            "Found {} desktop entries in {} directories",
            entries.iter().map(Vec::len).sum::<usize>(),
            entries.len()
        );
        Ok(entries)
    }
}

fn worker_loop(
    work: Receiver<Candidate>,
    shared: Arc<Shared>,
    line_limit: usize,
    mode: SectionMode,
) {
    let mut buf = LineBuffer::new(line_limit);

    for candidate in work.iter() {
        let _guard = WorkGuard::new(&shared.pending);
        if shared.is_cancelled() {
            continue;
        }

        let Candidate { dir, path, file } = candidate;
        let parsed = desktop::parse(&file, &mut buf, mode);
        drop(file);

        match parsed {
            Ok(Some(entry)) => {
                let mut slots = shared.slots.lock().unwrap_or_else(PoisonError::into_inner);
                slots[dir].push(entry);
            }
            Ok(None) => debug!("{:?} is hidden, skipping", path),
            Err(source) => {
                warn!("Failed to parse {:?}: {}", path, source);
                shared.fail(ScanError::Parse { path, source });
                return;
            }
        }
    }
}

fn list_dir(index: usize, dir: &Path, work: &Sender<Candidate>, shared: &Shared) {
    let _guard = WorkGuard::new(&shared.pending);

    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!("{:?} does not exist, skipping", dir);
            return;
        }
        Err(source) => {
            shared.fail(ScanError::List {
                dir: dir.to_path_buf(),
                source,
            });
            return;
        }
    };

    debug!("Scanning desktop files in {:?}", dir);
    for item in read_dir {
        if shared.is_cancelled() {
            return;
        }

        let item = match item {
            Ok(item) => item,
            Err(source) => {
                shared.fail(ScanError::List {
                    dir: dir.to_path_buf(),
                    source,
                });
                return;
            }
        };
        if !is_candidate(&item) {
            continue;
        }

        let path = item.path();
        let file = match File::open(&path) {
            Ok(file) => file,
            // Removed between listing and opening
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(source) => {
                shared.fail(ScanError::Open { path, source });
                return;
            }
        };

        shared.pending.add();
        if work.send(Candidate { dir: index, path, file }).is_err() {
            // Every worker has stopped; the unsent file is closed here.
            shared.pending.finish();
            return;
        }
    }
}

fn is_candidate(item: &fs::DirEntry) -> bool {
    if !item.file_name().to_string_lossy().to_lowercase().ends_with(EXTENSION) {
        return false;
    }
    match item.file_type() {
        Ok(file_type) if file_type.is_symlink() => match fs::metadata(item.path()) {
            Ok(meta) => meta.is_file(),
            Err(err) => err.kind() != io::ErrorKind::NotFound,
        },
        Ok(file_type) => file_type.is_file(),
        // Let the open report it
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn empty_directory_list() {
        let entries = scan::<PathBuf>(&[]).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn only_desktop_files_are_parsed() {
        let dir = tempdir().unwrap();
        write(dir.path(), "app.desktop", "[Desktop Entry]\nName=App\n");
        write(dir.path(), "LOUD.DESKTOP", "[Desktop Entry]\nName=Loud\n");
        write(dir.path(), "notes.txt", "not an entry");
        write(dir.path(), "broken.desktop.bak", "not an entry");
        fs::create_dir(dir.path().join("sub.desktop")).unwrap();
        write(&dir.path().join("sub.desktop"), "nested.desktop", "[Desktop Entry]\nName=Nested\n");

        let entries = scan(&[dir.path()]).unwrap();
        let mut names: Vec<_> = entries[0].iter().map(|e| e.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["App", "Loud"]);
    }

    #[test]
    fn single_worker_handles_many_files() {
        let dir = tempdir().unwrap();
        for i in 0..50 {
            let content = format!("[Desktop Entry]\nName=App {i}\n");
            write(dir.path(), &format!("app{i}.desktop"), &content);
        }
        let scanner = Scanner::new(ScanOptions {
            workers: 1,
            ..Default::default()
        });
        let entries = scanner.scan(&[dir.path()]).unwrap();
        assert_eq!(entries[0].len(), 50);
    }

    #[test]
    fn main_only_mode_is_used_by_workers() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "app.desktop",
            "[Desktop Entry]\nExec=app 100%%\n[Desktop Action x]\nName=X\n",
        );
        let scanner = Scanner::new(ScanOptions {
            mode: SectionMode::MainOnly,
            ..Default::default()
        });
        let entries = scanner.scan(&[dir.path()]).unwrap();
        assert_eq!(entries[0][0].exec, "app 100%");
        assert!(entries[0][0].actions.is_empty());
    }

    #[test]
    fn line_limit_is_applied_per_worker() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "long.desktop",
            &format!("[Desktop Entry]\nComment={}\n", "x".repeat(200)),
        );
        let scanner = Scanner::new(ScanOptions {
            line_limit: 64,
            ..Default::default()
        });
        let err = scanner.scan(&[dir.path()]).unwrap_err();
        assert!(matches!(err, ScanError::Parse { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_followed() {
        let dir = tempdir().unwrap();
        let target = tempdir().unwrap();
        write(target.path(), "real.desktop", "[Desktop Entry]\nName=Linked\n");
        let link = dir.path().join("link.desktop");
        std::os::unix::fs::symlink(target.path().join("real.desktop"), link).unwrap();
        let dangling = dir.path().join("dangling.desktop");
        std::os::unix::fs::symlink(dir.path().join("gone"), dangling).unwrap();

        let entries = scan(&[dir.path()]).unwrap();
        assert_eq!(entries[0].len(), 1);
        assert_eq!(entries[0][0].name, "Linked");
    }

    #[cfg(unix)]
    #[test]
    fn listing_a_file_is_fatal() {
        let dir = tempdir().unwrap();
        write(dir.path(), "plain", "");
        let err = scan(&[dir.path().join("plain")]).unwrap_err();
        assert!(matches!(err, ScanError::List { .. }));
    }
}
