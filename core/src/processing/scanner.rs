use crate::archive_interface::grid::{GridKeys, ObservationGrid};
use crate::archive_interface::reader::SourceOpener;
use crate::archive_interface::record::MatchRecord;
use crate::prelude::{CoreResult, GeodeticPoint};
use crate::processing::matcher::{validate_radius, SpatialMatcher};
use crate::processing::status::StatusDecoder;
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::{Metrics, ScanMetrics};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

type NameFilter = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// File found during discovery, tagged with its (directory, file) listing order.
struct Candidate {
    order: (usize, usize),
    path: PathBuf,
}

/// Walks `root/<directory>/<file>` archives and collects observations near a
/// target.
///
/// Unreadable or malformed files are logged, counted in [`ScanMetrics`] and
/// skipped; they never abort a scan.
pub struct ArchiveScanner<O> {
    opener: O,
    keys: GridKeys,
    matcher: SpatialMatcher,
    decoder: StatusDecoder,
    directory_filter: Option<NameFilter>,
    metrics: ScanMetrics,
    logger: LogManager,
}

impl<O: SourceOpener> ArchiveScanner<O> {
    pub fn new(opener: O) -> Self {
        Self {
            opener,
            keys: GridKeys::default(),
            matcher: SpatialMatcher::default(),
            decoder: StatusDecoder::default(),
            directory_filter: None,
            metrics: ScanMetrics::new(),
            logger: LogManager::new("scanner"),
        }
    }

    pub fn with_keys(mut self, keys: GridKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_matcher(mut self, matcher: SpatialMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_decoder(mut self, decoder: StatusDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Restricts which subdirectories of the root are walked.
    pub fn with_directory_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.directory_filter = Some(Box::new(filter));
        self
    }

    /// Counters of the most recent scan.
    pub fn metrics(&self) -> Metrics {
        self.metrics.snapshot()
    }

    /// Matches in discovery order: directories and files in listing order,
    /// observations in time then channel order.
    pub fn scan<P>(
        &self,
        root: &Path,
        name_predicate: P,
        target: GeodeticPoint,
        radius_km: f64,
    ) -> CoreResult<Vec<MatchRecord>>
    where
        P: Fn(&str) -> bool,
    {
        validate_radius(radius_km)?;
        self.metrics.reset();
        let candidates = self.discover(root, &name_predicate);

        let mut records = Vec::new();
        for candidate in &candidates {
            records.extend(self.scan_candidate(&candidate.path, target, radius_km)?);
        }
        self.summarize(candidates.len(), records.len());
        Ok(records)
    }

    /// Scans a single file without recovering from malformed sources.
    pub fn scan_file(
        &self,
        path: &Path,
        target: GeodeticPoint,
        radius_km: f64,
    ) -> CoreResult<Vec<MatchRecord>> {
        self.logger.detail(&format!("opening {}", path.display()));
        ObservationGrid::with_open(&self.opener, path, &self.keys, |grid| {
            let mut records = Vec::new();
            for hit in self.matcher.find_within_radius(grid, target, radius_km)? {
                let observation = grid.at(hit.key)?;
                let statuses = self.decoder.decode(observation.status_word)?;
                self.logger.record(&format!(
                    "match in {} PRN {} t={} ch={} at {:.2} km [{}]",
                    path.display(),
                    observation.signal_id,
                    hit.key.time_index,
                    hit.key.channel_index,
                    hit.distance_km,
                    statuses.display_text()
                ));
                records.push(MatchRecord::new(path, &observation, hit.distance_km, statuses));
            }
            Ok(records)
        })
    }

    fn scan_candidate(
        &self,
        path: &Path,
        target: GeodeticPoint,
        radius_km: f64,
    ) -> CoreResult<Vec<MatchRecord>> {
        match self.scan_file(path, target, radius_km) {
            Ok(records) => {
                self.metrics.record_scanned(records.len());
                Ok(records)
            }
            Err(err) if err.is_malformed_source() => {
                self.logger.warn(&format!("skipping unreadable file: {}", err));
                self.metrics.record_failure(path);
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    fn discover(&self, root: &Path, name_predicate: &dyn Fn(&str) -> bool) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        let directories = match list(root) {
            Ok(entries) => entries,
            Err(err) => {
                self.logger
                    .warn(&format!("cannot list archive root {}: {}", root.display(), err));
                return candidates;
            }
        };

        let selected = directories.into_iter().filter(|(name, path)| {
            path.is_dir() && self.directory_filter.as_ref().map_or(true, |keep| keep(name))
        });
        for (dir_index, (_, directory)) in selected.enumerate() {
            let files = match list(&directory) {
                Ok(entries) => entries,
                Err(err) => {
                    self.logger
                        .warn(&format!("cannot list {}: {}", directory.display(), err));
                    continue;
                }
            };
            let selected = files
                .into_iter()
                .filter(|(name, path)| path.is_file() && name_predicate(name));
            for (file_index, (_, path)) in selected.enumerate() {
                candidates.push(Candidate {
                    order: (dir_index, file_index),
                    path,
                });
            }
        }
        self.logger.detail(&format!(
            "found {} candidate files under {}",
            candidates.len(),
            root.display()
        ));
        candidates
    }

    fn summarize(&self, files: usize, matches: usize) {
        self.logger
            .record(&format!("scanned {} files, {} matches", files, matches));
    }
}

impl<O: SourceOpener + 'static> ArchiveScanner<O> {
    /// Same result as [`ArchiveScanner::scan`], with files opened on up to
    /// `workers` blocking threads. Must be awaited inside a tokio runtime.
    pub async fn scan_concurrent<P>(
        self: Arc<Self>,
        root: &Path,
        name_predicate: P,
        target: GeodeticPoint,
        radius_km: f64,
        workers: usize,
    ) -> CoreResult<Vec<MatchRecord>>
    where
        P: Fn(&str) -> bool,
    {
        validate_radius(radius_km)?;
        self.metrics.reset();
        let candidates = self.discover(root, &name_predicate);
        let files = candidates.len();

        let permits = Arc::new(Semaphore::new(workers.max(1)));
        let mut tasks = JoinSet::new();
        for candidate in candidates {
            let scanner = Arc::clone(&self);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let path = candidate.path;
                let result = tokio::task::spawn_blocking(move || {
                    scanner.scan_candidate(&path, target, radius_km)
                })
                .await;
                (candidate.order, result)
            });
        }

        let mut batches = Vec::with_capacity(files);
        while let Some(joined) = tasks.join_next().await {
            let (order, worker) = match joined {
                Ok(done) => done,
                Err(err) => std::panic::resume_unwind(err.into_panic()),
            };
            match worker {
                Ok(batch) => batches.push((order, batch)),
                Err(err) => std::panic::resume_unwind(err.into_panic()),
            }
        }
        batches.sort_by_key(|(order, _)| *order);

        let mut records = Vec::new();
        for (_, batch) in batches {
            records.extend(batch?);
        }
        self.summarize(files, records.len());
        Ok(records)
    }
}

fn list(directory: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        entries.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive_interface::grid::fixtures::store;
    use crate::archive_interface::reader::JsonArchive;
    use crate::prelude::CoreError;
    use tempfile::TempDir;

    const SUFFIX: &str = "_CorDDM_v2.0_nc";

    fn is_archive(name: &str) -> bool {
        name.ends_with(SUFFIX)
    }

    fn write_grid(dir: &Path, name: &str, locations: &[Vec<(f64, f64)>]) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, store(locations).to_json().unwrap()).unwrap();
        path
    }

    fn target() -> GeodeticPoint {
        GeodeticPoint::new(10.0, 80.0)
    }

    #[test]
    fn single_cell_at_target_yields_one_record() {
        let root = TempDir::new().unwrap();
        let path = write_grid(
            &root.path().join("20250107"),
            &format!("TRITON_185832{}", SUFFIX),
            &[vec![(10.0, 80.0)]],
        );

        let scanner = ArchiveScanner::new(JsonArchive);
        let records = scanner.scan(root.path(), is_archive, target(), 1.0).unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.source_file, path);
        assert!(record.distance_km.abs() < 1e-9);
        assert_eq!(
            record.active_statuses,
            StatusDecoder::default().decode(record.status_word).unwrap()
        );
        assert_eq!(scanner.metrics().files_scanned, 1);
    }

    #[test]
    fn corrupt_file_is_skipped_and_reported() {
        let root = TempDir::new().unwrap();
        let day = root.path().join("20250107");
        write_grid(
            &day,
            &format!("TRITON_A{}", SUFFIX),
            &[vec![(10.0, 80.0), (10.2, 80.0)], vec![(60.0, 0.0), (10.0, 80.1)]],
        );
        let corrupt = day.join(format!("TRITON_B{}", SUFFIX));
        fs::write(&corrupt, b"\x89HDF\r\n\x1a\n truncated").unwrap();

        let scanner = ArchiveScanner::new(JsonArchive);
        let records = scanner.scan(root.path(), is_archive, target(), 25.0).unwrap();

        let keys = records
            .iter()
            .map(|r| (r.key.time_index, r.key.channel_index))
            .collect::<Vec<_>>();
        assert_eq!(keys, vec![(0, 0), (0, 1), (1, 1)]);
        assert!(records.iter().all(|r| r.source_file != corrupt));

        let metrics = scanner.metrics();
        assert_eq!(metrics.files_scanned, 1);
        assert_eq!(metrics.matches, 3);
        assert_eq!(metrics.failed_files, vec![corrupt]);
    }

    #[test]
    fn file_missing_an_array_is_skipped() {
        let root = TempDir::new().unwrap();
        let day = root.path().join("20250108");
        fs::create_dir_all(&day).unwrap();
        let mut arrays = store(&[vec![(10.0, 80.0)]]);
        arrays.remove("DopplerShift");
        fs::write(day.join(format!("x{}", SUFFIX)), arrays.to_json().unwrap()).unwrap();

        let scanner = ArchiveScanner::new(JsonArchive);
        let records = scanner.scan(root.path(), is_archive, target(), 10.0).unwrap();
        assert!(records.is_empty());
        assert_eq!(scanner.metrics().failed_files.len(), 1);
    }

    #[test]
    fn fill_channels_do_not_discard_the_file() {
        let root = TempDir::new().unwrap();
        let day = root.path().join("20250107");
        fs::create_dir_all(&day).unwrap();
        let mut arrays = store(&[vec![(10.0, 80.0), (f64::NAN, f64::NAN)]]);
        let mut prn = arrays.remove("PRN").unwrap();
        prn[[0, 1]] = f64::NAN;
        arrays.insert("PRN", prn);
        fs::write(day.join(format!("a{}", SUFFIX)), arrays.to_json().unwrap()).unwrap();

        let scanner = ArchiveScanner::new(JsonArchive);
        let records = scanner.scan(root.path(), is_archive, target(), 1.0).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key.channel_index, 0);
        assert!(scanner.metrics().failed_files.is_empty());

        let everything = scanner
            .scan(root.path(), is_archive, target(), 20_100.0)
            .unwrap();
        assert_eq!(everything.len(), 1);
    }

    #[test]
    fn metrics_describe_only_the_latest_scan() {
        let root = TempDir::new().unwrap();
        let day = root.path().join("20250107");
        write_grid(&day, &format!("good{}", SUFFIX), &[vec![(10.0, 80.0)]]);
        fs::write(day.join(format!("bad{}", SUFFIX)), b"").unwrap();

        let scanner = ArchiveScanner::new(JsonArchive);
        for _ in 0..3 {
            scanner.scan(root.path(), is_archive, target(), 1.0).unwrap();
            let metrics = scanner.metrics();
            assert_eq!(metrics.files_scanned, 1);
            assert_eq!(metrics.matches, 1);
            assert_eq!(metrics.failed_files.len(), 1);
        }
    }

    #[test]
    fn empty_or_missing_root_yields_nothing() {
        let root = TempDir::new().unwrap();
        let scanner = ArchiveScanner::new(JsonArchive);
        assert!(scanner
            .scan(root.path(), is_archive, target(), 100.0)
            .unwrap()
            .is_empty());
        assert!(scanner
            .scan(&root.path().join("missing"), is_archive, target(), 100.0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn filters_select_directories_and_files() {
        let root = TempDir::new().unwrap();
        let here = vec![vec![(10.0, 80.0)]];
        write_grid(&root.path().join("20250107"), &format!("a{}", SUFFIX), &here);
        write_grid(&root.path().join("20250107"), "a_CorDDM_v2.0_nc.png", &here);
        write_grid(&root.path().join("20241231"), &format!("b{}", SUFFIX), &here);
        fs::write(root.path().join(format!("stray{}", SUFFIX)), b"{}").unwrap();

        let scanner = ArchiveScanner::new(JsonArchive)
            .with_directory_filter(|name| name.starts_with("202501"));
        let records = scanner.scan(root.path(), is_archive, target(), 1.0).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].source_file.ends_with(format!("20250107/a{}", SUFFIX)));
        assert!(scanner.metrics().failed_files.is_empty());
    }

    #[test]
    fn negative_radius_fails_before_scanning() {
        let root = TempDir::new().unwrap();
        let scanner = ArchiveScanner::new(JsonArchive);
        assert!(matches!(
            scanner.scan(root.path(), is_archive, target(), -5.0),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn concurrent_scan_matches_sequential_order() {
        let root = TempDir::new().unwrap();
        for day in ["20250101", "20250102", "20250103"] {
            for file in 0..4 {
                let offset = file as f64 * 0.01;
                write_grid(
                    &root.path().join(day),
                    &format!("TRITON_{}{}", file, SUFFIX),
                    &[
                        vec![(10.0 + offset, 80.0), (45.0, 45.0)],
                        vec![(10.0, 80.0 + offset), (10.05, 80.05)],
                    ],
                );
            }
            fs::write(root.path().join(day).join(format!("broken{}", SUFFIX)), b"").unwrap();
        }

        let scanner = Arc::new(ArchiveScanner::new(JsonArchive));
        let sequential = scanner.scan(root.path(), is_archive, target(), 20.0).unwrap();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .build()
            .unwrap();
        let concurrent = runtime
            .block_on(Arc::clone(&scanner).scan_concurrent(
                root.path(),
                is_archive,
                target(),
                20.0,
                3,
            ))
            .unwrap();

        assert_eq!(sequential.len(), 12 * 3);
        assert_eq!(concurrent, sequential);
        assert_eq!(scanner.metrics().failed_files.len(), 3);
    }
}
