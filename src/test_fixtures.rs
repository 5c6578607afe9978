// Coldstash cold-storage backup.
// Copyright 2016-2026 Martin Pool.

//! Utilities to set up test environments.
//!
//! Fixtures that create directories will be automatically deleted when the object
//! is deleted.

use std::fs;
use std::io::{self, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use time::OffsetDateTime;

use crate::compress::tar_snappy::TarSnappy;
use crate::compress::{CompressError, CompressRequest, Outcome};
use crate::gateway::record::{Call, Verb};
use crate::gateway::{self, check_receipt, ErrorKind};
use crate::*;

/// A temporary metadata store, deleted when it goes out of scope.
///
/// The ScratchStore can be treated as a [JsonStore].
#[derive(Debug)]
pub struct ScratchStore {
    _tempdir: TempDir, // held only for cleanup
    store: Arc<JsonStore>,
}

impl ScratchStore {
    pub fn new() -> ScratchStore {
        let tempdir = TempDir::new().unwrap();
        let store = Arc::new(JsonStore::open(&tempdir.path().join("db")).unwrap());
        ScratchStore {
            _tempdir: tempdir,
            store,
        }
    }

    /// A shared handle to the store, to put in a [Session].
    pub fn arc(&self) -> Arc<dyn MetadataStore> {
        self.store.clone()
    }

    /// Record a vault directly, without asking any gateway.
    pub fn add_vault(&self, name: &str) {
        self.store
            .create_vault(Vault {
                name: name.to_owned(),
                location: format!("fake://vaults/{name}"),
                created: OffsetDateTime::now_utc(),
            })
            .unwrap();
    }

    /// Assert that no bundle in the vault has more than one active version.
    pub fn assert_single_active(&self, vault: &str) {
        let mut active: Vec<String> = self
            .store
            .list_versions(vault)
            .unwrap()
            .into_iter()
            .filter(BundleVersion::is_active)
            .map(|v| v.bundle_name)
            .collect();
        let n = active.len();
        active.sort();
        active.dedup();
        assert_eq!(active.len(), n, "some bundle has several active versions");
    }
}

impl Deref for ScratchStore {
    type Target = JsonStore;

    fn deref(&self) -> &JsonStore {
        &self.store
    }
}

impl Default for ScratchStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A scratch store whose next few inserts or retirements fail, as if the
/// store could not be written.
#[derive(Debug, Default)]
pub struct FlakyStore {
    scratch: ScratchStore,
    failing_inserts: AtomicUsize,
    failing_marks: AtomicUsize,
}

impl FlakyStore {
    /// A store holding one vault.
    pub fn with_vault(vault: &str) -> Arc<FlakyStore> {
        let store = FlakyStore::default();
        store.scratch.add_vault(vault);
        Arc::new(store)
    }

    pub fn fail_next_inserts(&self, n: usize) {
        self.failing_inserts.store(n, Ordering::Relaxed);
    }

    pub fn fail_next_marks(&self, n: usize) {
        self.failing_marks.store(n, Ordering::Relaxed);
    }

    fn check(&self, counter: &AtomicUsize) -> Result<()> {
        match counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1)) {
            Ok(_) => Err(Error::WriteStore {
                path: self.scratch.path().to_owned(),
                source: io::Error::new(io::ErrorKind::Other, "simulated write failure"),
            }),
            Err(_) => Ok(()),
        }
    }
}

impl Deref for FlakyStore {
    type Target = ScratchStore;

    fn deref(&self) -> &ScratchStore {
        &self.scratch
    }
}

impl MetadataStore for FlakyStore {
    fn create_vault(&self, vault: Vault) -> Result<()> {
        self.scratch.create_vault(vault)
    }

    fn vault_by_name(&self, name: &str) -> Result<Option<Vault>> {
        self.scratch.vault_by_name(name)
    }

    fn list_vaults(&self) -> Result<Vec<Vault>> {
        self.scratch.list_vaults()
    }

    fn most_recent_version(&self, vault: &str, bundle_name: &str) -> Result<Option<BundleVersion>> {
        self.scratch.most_recent_version(vault, bundle_name)
    }

    fn list_versions(&self, vault: &str) -> Result<Vec<BundleVersion>> {
        self.scratch.list_versions(vault)
    }

    fn insert_version(&self, version: BundleVersion) -> Result<BundleVersion> {
        self.check(&self.failing_inserts)?;
        self.scratch.insert_version(version)
    }

    fn mark_pending_deletion(
        &self,
        vault: &str,
        bundle_name: &str,
        keep_archive_id: &str,
    ) -> Result<Vec<BundleVersion>> {
        self.check(&self.failing_marks)?;
        self.scratch
            .mark_pending_deletion(vault, bundle_name, keep_archive_id)
    }

    fn list_pending_deletion(&self, vault: &str) -> Result<Vec<BundleVersion>> {
        self.scratch.list_pending_deletion(vault)
    }

    fn remove_version(&self, archive_id: &str) -> Result<()> {
        self.scratch.remove_version(archive_id)
    }
}

/// A gateway that keeps nothing, records its calls, and fails on request.
#[derive(Debug, Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicU64,
    fail_uploads: AtomicBool,
    fail_uploads_of: Mutex<Vec<String>>,
    fail_deletes: AtomicBool,
    wrong_checksums: AtomicBool,
}

impl FakeGateway {
    pub fn new() -> FakeGateway {
        FakeGateway::default()
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, verb: Verb) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.verb == verb)
            .count()
    }

    /// Descriptions of every upload attempted, in order.
    pub fn uploaded_names(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.verb == Verb::Upload)
            .map(|c| c.target.clone())
            .collect()
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::Relaxed);
    }

    /// Fail uploads of one bundle name.
    pub fn fail_uploads_of(&self, bundle_name: &str) {
        self.fail_uploads_of
            .lock()
            .unwrap()
            .push(bundle_name.to_owned());
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::Relaxed);
    }

    /// Report a checksum that doesn't match what was sent.
    pub fn wrong_checksums(&self, wrong: bool) {
        self.wrong_checksums.store(wrong, Ordering::Relaxed);
    }

    fn record(&self, verb: Verb, vault: &str, target: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(Call::new(verb, vault, target));
    }
}

impl ArchiveGateway for FakeGateway {
    fn create_vault(&self, name: &str) -> gateway::Result<String> {
        self.record(Verb::CreateVault, name, name);
        Ok(format!("fake://vaults/{name}"))
    }

    fn upload(
        &self,
        vault: &str,
        description: &str,
        bundle: &Path,
        tree_hash: &TreeHash,
    ) -> gateway::Result<UploadReceipt> {
        self.record(Verb::Upload, vault, description);
        assert!(bundle.is_file(), "bundle {bundle:?} does not exist");
        if self.fail_uploads.load(Ordering::Relaxed)
            || self
                .fail_uploads_of
                .lock()
                .unwrap()
                .iter()
                .any(|n| n == description)
        {
            return Err(gateway::Error::new(ErrorKind::Upload, vault));
        }
        let checksum = if self.wrong_checksums.load(Ordering::Relaxed) {
            TreeHash::of_bytes(b"something else")
        } else {
            TreeHash::of_file(bundle).unwrap()
        };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let archive_id = format!("fake-{id}");
        let receipt = UploadReceipt {
            location: format!("fake://{vault}/{archive_id}"),
            archive_id,
            checksum,
        };
        check_receipt(vault, receipt, tree_hash)
    }

    fn delete(&self, vault: &str, archive_id: &str) -> gateway::Result<()> {
        self.record(Verb::Delete, vault, archive_id);
        if self.fail_deletes.load(Ordering::Relaxed) {
            Err(gateway::Error::new(ErrorKind::Delete, vault))
        } else {
            Ok(())
        }
    }
}

/// A compressor that always fails as a fatal tool error would.
#[derive(Debug)]
pub struct FailingCompressor;

impl Compressor for FailingCompressor {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn extension(&self) -> &'static str {
        ".fail"
    }

    fn compress(&self, _request: &CompressRequest<'_>) -> std::result::Result<Outcome, CompressError> {
        Err(CompressError::Fatal { tool: "failing" })
    }
}

/// A compressor that writes tar-snappy bundles but reports, as 7-Zip does for
/// locked files, that some files were left out.
#[derive(Debug)]
pub struct WarningCompressor;

impl Compressor for WarningCompressor {
    fn name(&self) -> &'static str {
        "warning"
    }

    fn extension(&self) -> &'static str {
        TarSnappy.extension()
    }

    fn compress(&self, request: &CompressRequest<'_>) -> std::result::Result<Outcome, CompressError> {
        TarSnappy.compress(request)?;
        Ok(Outcome::CompletedWithWarnings)
    }
}

/// A session using a scratch store holding one vault, a fake gateway, and the
/// tar-snappy compressor.
pub fn session_with_vault(vault: &str) -> (ScratchStore, Arc<FakeGateway>, Session) {
    let gateway = Arc::new(FakeGateway::new());
    let (store, session) = session_with_gateway(vault, gateway.clone());
    (store, gateway, session)
}

/// Like [session_with_vault] with a given gateway.
pub fn session_with_gateway(vault: &str, gateway: Arc<FakeGateway>) -> (ScratchStore, Session) {
    let store = ScratchStore::new();
    store.add_vault(vault);
    let session = Session::new(store.arc(), gateway, CompressorKind::TarSnappy.compressor());
    (store, session)
}

/// A temporary tree for running a test.
///
/// Created in a temporary directory and automatically disposed when done.
pub struct TreeFixture {
    pub root: PathBuf,
    _tempdir: TempDir, // held only for cleanup
}

impl TreeFixture {
    pub fn new() -> TreeFixture {
        let tempdir = TempDir::new().unwrap();
        let root = tempdir.path().to_path_buf();
        TreeFixture {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Make a file in the tree, with arbitrary contents. Returns the full path.
    pub fn create_file(&self, relative_path: &str) -> PathBuf {
        self.create_file_with_contents(relative_path, b"contents")
    }

    /// Make a file in the tree, with given contents. Returns the full path.
    pub fn create_file_with_contents(&self, relative_path: &str, contents: &[u8]) -> PathBuf {
        let full_path = self.root.join(relative_path);
        let mut f = fs::File::create(&full_path).unwrap();
        f.write_all(contents).unwrap();
        full_path
    }

    pub fn create_dir(&self, relative_path: &str) {
        fs::create_dir(self.root.join(relative_path)).unwrap();
    }

    #[cfg(unix)]
    pub fn create_symlink(&self, relative_path: &str, target: &str) {
        use std::os::unix::fs as unix_fs;

        unix_fs::symlink(target, self.root.join(relative_path)).unwrap();
    }

    /// Symlinks are just not present on Windows.
    #[cfg(windows)]
    pub fn create_symlink(&self, _relative_path: &str, _target: &str) {}

    pub fn source_tree(&self) -> SourceTree {
        SourceTree::open(self.path()).unwrap()
    }
}

impl Default for TreeFixture {
    fn default() -> Self {
        Self::new()
    }
}
