//! The sample pool and its partitioning into batch windows.

use crate::{
    common::*,
    error::{Error, Result},
};

/// What happens to the final window when the sample count is not a multiple of
/// the batch size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Drop the partial window.
    Drop,
    /// Complete the partial window with samples from the start of the epoch order.
    Pad,
}

impl Default for RemainderPolicy {
    fn default() -> Self {
        Self::Drop
    }
}

/// Ordered sample identifiers, optionally backed by a text file with one
/// identifier per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplePool {
    path: Option<PathBuf>,
    ids: Vec<String>,
}

impl SamplePool {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(Error::io(path))?;
        let ids = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        Ok(Self {
            path: Some(path.to_owned()),
            ids,
        })
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: None,
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Apply a uniform random permutation.
    pub fn shuffle<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        self.ids.shuffle(rng);
    }

    /// Overwrite the backing file with the current order.
    pub fn save(&self) -> Result<()> {
        let path = self.path.as_deref().ok_or_else(|| {
            Error::InvalidConfig("the sample pool has no backing file".into())
        })?;
        self.save_to(path)
    }

    /// Write the identifiers to a sibling temporary file, then rename it over
    /// `path`. The previous file content survives an interrupted write.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = {
            let file_name = path.file_name().ok_or_else(|| {
                Error::InvalidConfig(format!("'{}' is not a file path", path.display()))
            })?;
            let mut tmp_name = std::ffi::OsString::from(".");
            tmp_name.push(file_name);
            tmp_name.push(".tmp");
            path.with_file_name(tmp_name)
        };

        let write = || -> io::Result<()> {
            let mut writer = BufWriter::new(fs::File::create(&tmp_path)?);
            for id in &self.ids {
                writeln!(writer, "{}", id)?;
            }
            writer.into_inner()?.sync_all()
        };
        if let Err(err) = write() {
            let _ = fs::remove_file(&tmp_path);
            return Err(Error::io(&tmp_path)(err));
        }
        fs::rename(&tmp_path, path).map_err(Error::io(path))
    }
}

/// The partition of one epoch into batch windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochPlan {
    /// Number of leading pool entries taking part in the epoch.
    pub num_samples: usize,
    pub batch_size: usize,
    pub num_windows: usize,
}

impl EpochPlan {
    pub fn new(
        pool_len: usize,
        sample_limit: usize,
        batch_size: NonZeroUsize,
        remainder: RemainderPolicy,
    ) -> Self {
        let batch_size = batch_size.get();
        let num_samples = pool_len.min(sample_limit);
        let num_windows = match remainder {
            RemainderPolicy::Drop => num_samples / batch_size,
            RemainderPolicy::Pad => (num_samples + batch_size - 1) / batch_size,
        };

        Self {
            num_samples,
            batch_size,
            num_windows,
        }
    }

    /// Identifiers of the `index`-th window, or `None` if `index` is past the
    /// last window or `ids` is shorter than the epoch.
    pub fn window(&self, index: usize, ids: &[String]) -> Option<Vec<String>> {
        if index >= self.num_windows || ids.len() < self.num_samples {
            return None;
        }

        let start = index * self.batch_size;
        let window = (start..start + self.batch_size)
            .map(|pos| ids[pos % self.num_samples].clone())
            .collect();
        Some(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn numbered(count: usize) -> SamplePool {
        SamplePool::from_ids((0..count).map(|index| format!("{:06}", index)))
    }

    #[test]
    fn epoch_drops_partial_window() {
        let pool = numbered(6000);
        let plan = EpochPlan::new(
            pool.len(),
            5000,
            NonZeroUsize::new(32).unwrap(),
            RemainderPolicy::Drop,
        );
        assert_eq!(plan.num_windows, 156);

        let ids: Vec<_> = (0..plan.num_windows)
            .flat_map(|index| plan.window(index, pool.ids()).unwrap())
            .collect();
        let distinct: HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), 4992);
        assert_eq!(distinct.len(), 4992);
        assert_eq!(ids[..], pool.ids()[..4992]);
    }

    #[test]
    fn epoch_pads_partial_window() {
        let pool = numbered(10);
        let plan = EpochPlan::new(
            pool.len(),
            5000,
            NonZeroUsize::new(4).unwrap(),
            RemainderPolicy::Pad,
        );
        assert_eq!(plan.num_samples, 10);
        assert_eq!(plan.num_windows, 3);
        assert_eq!(
            plan.window(2, pool.ids()).unwrap(),
            ["000008", "000009", "000000", "000001"]
        );
        assert_eq!(plan.window(3, pool.ids()), None);
        assert_eq!(plan.window(0, &pool.ids()[..9]), None);
    }

    #[test]
    fn small_pool_yields_no_dropped_window() {
        let plan = EpochPlan::new(
            3,
            5000,
            NonZeroUsize::new(4).unwrap(),
            RemainderPolicy::Drop,
        );
        assert_eq!(plan.num_windows, 0);
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let mut lhs = numbered(100);
        let mut rhs = numbered(100);
        lhs.shuffle(&mut StdRng::seed_from_u64(7));
        rhs.shuffle(&mut StdRng::seed_from_u64(7));
        assert_eq!(lhs, rhs);
        assert_ne!(lhs, numbered(100));

        let mut sorted = lhs.ids().to_vec();
        sorted.sort();
        assert_eq!(sorted, numbered(100).ids());
    }

    #[test]
    fn shuffle_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trainval.txt");
        let content: String = (0..50).map(|index| format!("{:06}\n", index)).collect();
        fs::write(&path, &content).unwrap();

        let mut pool = SamplePool::open(&path).unwrap();
        assert_eq!(pool.len(), 50);
        pool.shuffle(&mut StdRng::seed_from_u64(1));
        pool.save().unwrap();

        let saved = fs::read_to_string(&path).unwrap();
        assert_eq!(saved.lines().count(), 50);
        assert_ne!(saved, content);
        assert_eq!(SamplePool::open(&path).unwrap().ids(), pool.ids());
    }

    #[test]
    fn open_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.txt");
        fs::write(&path, "a\r\n\n b \nc").unwrap();
        assert_eq!(SamplePool::open(&path).unwrap().ids(), ["a", "b", "c"]);
    }

    #[test]
    fn save_replaces_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trainval.txt");
        fs::write(&path, "stale\n").unwrap();

        let pool = numbered(5);
        pool.save_to(&path).unwrap();

        assert_eq!(SamplePool::open(&path).unwrap().ids(), pool.ids());
        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, ["trainval.txt"]);
    }

    #[test]
    fn failed_save_keeps_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trainval.txt");
        fs::write(&path, "a\nb\n").unwrap();
        // a directory in place of the temporary file makes the write fail
        fs::create_dir(dir.path().join(".trainval.txt.tmp")).unwrap();

        assert!(matches!(
            numbered(5).save_to(&path),
            Err(Error::Io { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn save_without_backing_file_fails() {
        assert!(numbered(3).save().is_err());
    }
}
