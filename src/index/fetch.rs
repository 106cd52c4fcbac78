// src/index/fetch.rs

//! Index and package transfer
//!
//! Fetches index documents and package binaries over http(s) or from
//! file:// repositories, rotating through the canonical address and the
//! known mirrors. Transport failures move on to the next candidate; trust
//! and format failures are terminal and never trigger failover. A
//! conditional fetch that reports "not modified" short-circuits the whole
//! pipeline before any signature work.

use crate::config::Config;
use crate::db::models::{Apk, RepoMirror, Repository};
use crate::error::{Error, Result};
use crate::index::{INDEX_NAME, INDEX_SIG_NAME};
use crate::trust::{self, SignatureEnvelope, SignedIndex};
use flate2::read::GzDecoder;
use indicatif::ProgressBar;
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default rotations through the mirror list for package downloads
const MAX_RETRIES: u32 = 3;

/// Delay between mirror rotations in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// Buffer size for streaming downloads (8 KB)
const STREAM_BUFFER_SIZE: usize = 8192;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A fetched and decompressed index with its signature envelope
///
/// `index` holds the exact bytes the envelope signs. Mirror outcomes are
/// reported back so the caller can update the per-mirror health counters.
#[derive(Debug)]
pub struct FetchedIndex {
    pub index: Vec<u8>,
    pub envelope: SignatureEnvelope,
    /// Validator for the next conditional fetch
    pub etag: Option<String>,
    /// Address that served the index
    pub mirror: String,
    /// Addresses that failed before one answered
    pub failed_mirrors: Vec<String>,
}

/// A downloaded and hash-verified package binary
#[derive(Debug)]
pub struct FetchedPackage {
    pub path: PathBuf,
    /// Address that served the binary (the cache, if nothing was fetched)
    pub mirror: Option<String>,
    pub failed_mirrors: Vec<String>,
}

/// Transfer client with mirror rotation
pub struct IndexFetcher {
    client: Client,
    retries: u32,
}

impl IndexFetcher {
    /// Create a fetcher with default timeouts
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            retries: MAX_RETRIES,
        })
    }

    /// Create a fetcher honoring the network configuration section
    pub fn with_config(config: &Config) -> Result<Self> {
        let mut builder = Client::builder().timeout(config.http_timeout());
        if let Some(proxy) = &config.network.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| Error::Config(format!("invalid proxy '{proxy}': {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            retries: config.network.retries.max(1),
        })
    }

    /// Fetch a repository's index and signature envelope
    ///
    /// Tries the canonical address first, then each known mirror in health
    /// order. The stored etag is offered to every candidate; a "not
    /// modified" answer wins immediately and surfaces as
    /// [`Error::NotModified`]. When every candidate fails with a transport
    /// error the last cause is reported as [`Error::Unreachable`].
    pub fn fetch_index(&self, repo: &Repository, mirrors: &[RepoMirror]) -> Result<FetchedIndex> {
        let etag = repo.etag.as_deref();
        let mut failed: Vec<String> = Vec::new();
        let mut last_error: Option<Error> = None;

        for base in candidate_addresses(repo, mirrors) {
            debug!("fetching index for {} via {}", repo.address, base);
            match self.fetch_index_from(&base, etag) {
                Ok((index, envelope, etag)) => {
                    info!("fetched index for {} from {}", repo.address, base);
                    return Ok(FetchedIndex {
                        index,
                        envelope,
                        etag,
                        mirror: base,
                        failed_mirrors: failed,
                    });
                }
                Err(Error::NotModified) => return Err(Error::NotModified),
                Err(e) if e.is_retryable() => {
                    warn!("index fetch via {} failed: {}", base, e);
                    failed.push(base);
                    last_error = Some(e);
                }
                // Trust and format failures are terminal, a different
                // mirror must not be allowed to paper over them
                Err(e) => return Err(e),
            }
        }

        Err(Error::Unreachable {
            repo: repo.address.clone(),
            last: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no usable address".to_string()),
        })
    }

    /// Fetch index bytes plus envelope from one base address
    fn fetch_index_from(
        &self,
        base: &str,
        etag: Option<&str>,
    ) -> Result<(Vec<u8>, SignatureEnvelope, Option<String>)> {
        let index_url = join_url(base, INDEX_NAME);
        let (raw, new_etag) = self.get_bytes(&index_url, etag)?;
        let bytes = maybe_decompress(&index_url, raw)?;

        // Embedded form: envelope and payload travel in one document
        if let Ok(wrapper) = serde_json::from_slice::<SignedIndex>(&bytes) {
            let index = wrapper.decode_payload()?;
            return Ok((index, wrapper.envelope, new_etag));
        }

        let sig_url = join_url(base, INDEX_SIG_NAME);
        let (sig_raw, _) = self.get_bytes(&sig_url, None)?;
        let sig_bytes = maybe_decompress(&sig_url, sig_raw)?;
        let envelope = SignatureEnvelope::from_json(&sig_bytes)?;

        Ok((bytes, envelope, new_etag))
    }

    /// Download one package binary into `dest_dir`, verifying its content
    /// hash against the trusted index metadata
    ///
    /// The binary streams into a temporary file and only reaches its final
    /// name after the hash checks out, so the cache never holds unverified
    /// content. A verified file already in the cache is reused without any
    /// network traffic. Hash mismatches are terminal; transport failures
    /// rotate through the mirrors with backoff.
    pub fn download_package(
        &self,
        apk: &Apk,
        repo: &Repository,
        mirrors: &[RepoMirror],
        dest_dir: &Path,
        progress: Option<&ProgressBar>,
    ) -> Result<FetchedPackage> {
        let file_name = safe_file_name(&apk.apk_name)?;
        let dest = dest_dir.join(file_name);
        fs::create_dir_all(dest_dir)?;

        if dest.exists() && trust::verify_apk_file(&dest, apk).is_ok() {
            debug!("cache hit for {}", dest.display());
            return Ok(FetchedPackage {
                path: dest,
                mirror: None,
                failed_mirrors: Vec::new(),
            });
        }

        let mut failed: Vec<String> = Vec::new();
        let mut last_error: Option<Error> = None;

        for attempt in 1..=self.retries {
            for base in candidate_addresses(repo, mirrors) {
                let url = apk.download_url(&base);
                match self.download_to(&url, &dest, dest_dir, apk, progress) {
                    Ok(()) => {
                        info!("downloaded {} from {}", dest.display(), url);
                        return Ok(FetchedPackage {
                            path: dest,
                            mirror: Some(base),
                            failed_mirrors: failed,
                        });
                    }
                    Err(e) if e.is_retryable() => {
                        warn!("download attempt via {} failed: {}", url, e);
                        if !failed.contains(&base) {
                            failed.push(base);
                        }
                        last_error = Some(e);
                    }
                    Err(e) => return Err(e),
                }
            }
            if attempt < self.retries {
                std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
            }
        }

        Err(Error::Unreachable {
            repo: repo.address.clone(),
            last: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no usable address".to_string()),
        })
    }

    /// Stream one URL into `dest`, verifying before the atomic rename
    fn download_to(
        &self,
        url: &str,
        dest: &Path,
        dest_dir: &Path,
        apk: &Apk,
        progress: Option<&ProgressBar>,
    ) -> Result<()> {
        let tmp = tempfile::Builder::new()
            .prefix(".kiosk-dl-")
            .tempfile_in(dest_dir)?;

        let written = if is_file_url(url) {
            let source = file_url_path(url)?;
            let mut reader = File::open(&source).map_err(|e| Error::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            let total = reader.metadata().map(|m| m.len()).unwrap_or(0);
            stream_to_file(&mut reader, tmp.as_file(), total, progress, &apk.apk_name, url)?
        } else {
            let response = self.client.get(url).send().map_err(|e| Error::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            if !response.status().is_success() {
                return Err(Error::Transport {
                    url: url.to_string(),
                    reason: format!("HTTP {}", response.status()),
                });
            }
            let total = response.content_length().unwrap_or(0);
            let mut reader = response;
            stream_to_file(&mut reader, tmp.as_file(), total, progress, &apk.apk_name, url)?
        };
        debug!("streamed {} bytes from {}", written, url);

        // The temporary file deletes itself if verification fails
        trust::verify_apk_file(tmp.path(), apk)?;

        tmp.as_file().sync_all()?;
        tmp.persist(dest).map_err(|e| e.error)?;

        if let Some(pb) = progress {
            pb.finish_with_message(format!("{} [done]", apk.apk_name));
        }
        Ok(())
    }

    /// Fetch raw bytes from one URL, dispatching on the scheme
    fn get_bytes(&self, url: &str, etag: Option<&str>) -> Result<(Vec<u8>, Option<String>)> {
        if is_file_url(url) {
            file_get(url, etag)
        } else {
            self.http_get(url, etag)
        }
    }

    fn http_get(&self, url: &str, etag: Option<&str>) -> Result<(Vec<u8>, Option<String>)> {
        let mut request = self.client.get(url);
        if let Some(etag) = etag {
            request = request.header(reqwest::header::IF_NONE_MATCH, etag);
        }

        let response = request.send().map_err(|e| Error::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if response.status() == reqwest::StatusCode::NOT_MODIFIED {
            return Err(Error::NotModified);
        }
        if !response.status().is_success() {
            return Err(Error::Transport {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let new_etag = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let bytes = response.bytes().map_err(|e| Error::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok((bytes.to_vec(), new_etag))
    }
}

/// Canonical address first, then mirrors in stored health order
fn candidate_addresses(repo: &Repository, mirrors: &[RepoMirror]) -> Vec<String> {
    let mut candidates = vec![repo.address.clone()];
    for mirror in mirrors {
        if mirror.url != repo.address {
            candidates.push(mirror.url.clone());
        }
    }
    candidates
}

fn is_file_url(url: &str) -> bool {
    url.starts_with("file://")
}

fn file_url_path(url: &str) -> Result<PathBuf> {
    let parsed = url::Url::parse(url).map_err(|e| Error::Transport {
        url: url.to_string(),
        reason: format!("invalid file url: {e}"),
    })?;
    parsed.to_file_path().map_err(|_| Error::Transport {
        url: url.to_string(),
        reason: "file url has no local path".to_string(),
    })
}

/// Read a local file, answering "not modified" from its metadata
///
/// file:// repositories get the same conditional-fetch contract as HTTP
/// ones; the validator is derived from length and mtime.
fn file_get(url: &str, etag: Option<&str>) -> Result<(Vec<u8>, Option<String>)> {
    let path = file_url_path(url)?;
    let metadata = fs::metadata(&path).map_err(|e| Error::Transport {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let current = file_etag(&metadata);
    if etag == Some(current.as_str()) {
        return Err(Error::NotModified);
    }

    let bytes = fs::read(&path).map_err(|e| Error::Transport {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    Ok((bytes, Some(current)))
}

fn file_etag(metadata: &fs::Metadata) -> String {
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("\"file-{}-{}\"", metadata.len(), mtime)
}

fn join_url(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name)
}

/// Transparently unwrap a gzip-compressed document
fn maybe_decompress(url: &str, bytes: Vec<u8>) -> Result<Vec<u8>> {
    if bytes.len() >= 2 && bytes[..2] == GZIP_MAGIC {
        let mut decoder = GzDecoder::new(bytes.as_slice());
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).map_err(|e| Error::Transport {
            url: url.to_string(),
            reason: format!("gzip decompression failed: {e}"),
        })?;
        debug!("decompressed {} bytes -> {} bytes", bytes.len(), out.len());
        return Ok(out);
    }
    Ok(bytes)
}

/// Final path component of a published apk name
///
/// Index entries name files relative to the repository address. Only the
/// file name itself lands in the local cache; anything trying to traverse
/// out of it is rejected.
fn safe_file_name(apk_name: &str) -> Result<&str> {
    let name = apk_name.rsplit('/').next().unwrap_or("");
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::MalformedIndex(format!(
            "unusable apk file name '{apk_name}'"
        )));
    }
    Ok(name)
}

/// Stream a reader into a file with optional progress tracking
///
/// Always copies in chunks, never buffering the whole transfer in memory.
fn stream_to_file<R: Read>(
    reader: &mut R,
    mut file: &File,
    total_size: u64,
    progress_bar: Option<&ProgressBar>,
    display_name: &str,
    url: &str,
) -> Result<u64> {
    if let Some(pb) = progress_bar {
        if total_size > 0 {
            pb.set_length(total_size);
            pb.set_message(display_name.to_string());
        } else {
            pb.set_message(format!("{} (unknown size)", display_name));
        }
    }

    let mut written: u64 = 0;
    let mut buffer = [0u8; STREAM_BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer).map_err(|e| Error::Transport {
            url: url.to_string(),
            reason: format!("read failed: {e}"),
        })?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])?;
        written += bytes_read as u64;

        if let Some(pb) = progress_bar {
            pb.set_position(written);
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash;
    use crate::trust::signing::SigningKeyPair;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use serde_json::json;
    use tempfile::TempDir;

    fn index_bytes() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "repo": {"name": "Test Repo", "timestamp": 1_700_000_000_000i64, "version": 1},
            "apps": [{"packageName": "org.example.app"}],
            "packages": {
                "org.example.app": [{
                    "versionCode": 7,
                    "apkName": "org.example.app_7.apk",
                    "hash": hash::sha256(b"apk bytes"),
                    "hashType": "sha256"
                }]
            }
        }))
        .unwrap()
    }

    /// Lay out a signed file:// repository and return its address
    fn publish_repo(dir: &TempDir, index: &[u8]) -> (String, SigningKeyPair) {
        let keypair = SigningKeyPair::generate();
        let envelope = keypair.sign_index(index);
        std::fs::write(dir.path().join(INDEX_NAME), index).unwrap();
        std::fs::write(
            dir.path().join(INDEX_SIG_NAME),
            serde_json::to_vec(&envelope).unwrap(),
        )
        .unwrap();
        let address = url::Url::from_file_path(dir.path()).unwrap().to_string();
        (address.trim_end_matches('/').to_string(), keypair)
    }

    #[test]
    fn test_fetch_index_detached_signature() {
        let dir = TempDir::new().unwrap();
        let index = index_bytes();
        let (address, keypair) = publish_repo(&dir, &index);

        let fetcher = IndexFetcher::new().unwrap();
        let repo = Repository::new(&address);
        let fetched = fetcher.fetch_index(&repo, &[]).unwrap();

        assert_eq!(fetched.index, index);
        assert!(fetched.etag.is_some());
        assert_eq!(fetched.mirror, address);
        assert!(fetched.failed_mirrors.is_empty());
        crate::trust::verify_index(&fetched.index, &fetched.envelope, Some(&keypair.fingerprint()))
            .unwrap();
    }

    #[test]
    fn test_fetch_index_embedded_envelope() {
        let dir = TempDir::new().unwrap();
        let index = index_bytes();
        let keypair = SigningKeyPair::generate();
        let wrapper = SignedIndex::new(keypair.sign_index(&index), &index);
        std::fs::write(
            dir.path().join(INDEX_NAME),
            serde_json::to_vec(&wrapper).unwrap(),
        )
        .unwrap();
        let address = url::Url::from_file_path(dir.path()).unwrap().to_string();

        let fetcher = IndexFetcher::new().unwrap();
        let repo = Repository::new(address.trim_end_matches('/'));
        let fetched = fetcher.fetch_index(&repo, &[]).unwrap();

        assert_eq!(fetched.index, index);
        crate::trust::verify_index(&fetched.index, &fetched.envelope, None).unwrap();
    }

    #[test]
    fn test_fetch_index_not_modified() {
        let dir = TempDir::new().unwrap();
        let index = index_bytes();
        let (address, _) = publish_repo(&dir, &index);

        let fetcher = IndexFetcher::new().unwrap();
        let mut repo = Repository::new(&address);
        let fetched = fetcher.fetch_index(&repo, &[]).unwrap();

        repo.etag = fetched.etag;
        let err = fetcher.fetch_index(&repo, &[]).unwrap_err();
        assert!(matches!(err, Error::NotModified));
    }

    #[test]
    fn test_fetch_index_gzip() {
        let dir = TempDir::new().unwrap();
        let index = index_bytes();
        let keypair = SigningKeyPair::generate();
        // The signature covers the decompressed bytes
        let envelope = keypair.sign_index(&index);

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&index).unwrap();
        std::fs::write(dir.path().join(INDEX_NAME), encoder.finish().unwrap()).unwrap();
        std::fs::write(
            dir.path().join(INDEX_SIG_NAME),
            serde_json::to_vec(&envelope).unwrap(),
        )
        .unwrap();
        let address = url::Url::from_file_path(dir.path()).unwrap().to_string();

        let fetcher = IndexFetcher::new().unwrap();
        let repo = Repository::new(address.trim_end_matches('/'));
        let fetched = fetcher.fetch_index(&repo, &[]).unwrap();
        assert_eq!(fetched.index, index);
    }

    #[test]
    fn test_fetch_index_mirror_failover() {
        let dir = TempDir::new().unwrap();
        let index = index_bytes();
        let (good, _) = publish_repo(&dir, &index);
        let bad = "file:///nonexistent/kiosk-test-repo".to_string();

        let fetcher = IndexFetcher::new().unwrap();
        let repo = Repository::new(&bad);
        let mirror = RepoMirror::new(1, &good, false);
        let fetched = fetcher.fetch_index(&repo, &[mirror]).unwrap();

        assert_eq!(fetched.mirror, good);
        assert_eq!(fetched.failed_mirrors, vec![bad]);
    }

    #[test]
    fn test_fetch_index_all_unreachable() {
        let fetcher = IndexFetcher::new().unwrap();
        let repo = Repository::new("file:///nonexistent/kiosk-test-repo");
        let err = fetcher.fetch_index(&repo, &[]).unwrap_err();
        assert!(matches!(err, Error::Unreachable { .. }));
    }

    #[test]
    fn test_fetch_index_missing_signature() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(INDEX_NAME), index_bytes()).unwrap();
        let address = url::Url::from_file_path(dir.path()).unwrap().to_string();

        let fetcher = IndexFetcher::new().unwrap();
        let repo = Repository::new(address.trim_end_matches('/'));
        // No .sig and no embedded envelope means the candidate is unusable
        let err = fetcher.fetch_index(&repo, &[]).unwrap_err();
        assert!(matches!(err, Error::Unreachable { .. }));
    }

    fn publish_apk(dir: &TempDir, name: &str, content: &[u8]) -> (String, Apk) {
        std::fs::write(dir.path().join(name), content).unwrap();
        let address = url::Url::from_file_path(dir.path()).unwrap().to_string();
        let apk = Apk::new(
            "org.example.app",
            1,
            7,
            name,
            hash::sha256(content),
            "sha256",
        );
        (address.trim_end_matches('/').to_string(), apk)
    }

    #[test]
    fn test_download_package_verifies_and_caches() {
        let repo_dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let (address, apk) = publish_apk(&repo_dir, "org.example.app_7.apk", b"apk bytes");

        let fetcher = IndexFetcher::new().unwrap();
        let repo = Repository::new(&address);
        let fetched = fetcher
            .download_package(&apk, &repo, &[], cache_dir.path(), None)
            .unwrap();

        assert!(fetched.path.exists());
        assert_eq!(fetched.mirror.as_deref(), Some(address.as_str()));
        assert_eq!(std::fs::read(&fetched.path).unwrap(), b"apk bytes");

        // Second call reuses the verified cache entry even if the source
        // disappears
        std::fs::remove_file(repo_dir.path().join("org.example.app_7.apk")).unwrap();
        let cached = fetcher
            .download_package(&apk, &repo, &[], cache_dir.path(), None)
            .unwrap();
        assert_eq!(cached.mirror, None);
        assert_eq!(cached.path, fetched.path);
    }

    #[test]
    fn test_download_package_rejects_wrong_hash() {
        let repo_dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let (address, mut apk) = publish_apk(&repo_dir, "org.example.app_7.apk", b"apk bytes");
        apk.hash = hash::sha256(b"different bytes");

        let fetcher = IndexFetcher::new().unwrap();
        let repo = Repository::new(&address);
        let err = fetcher
            .download_package(&apk, &repo, &[], cache_dir.path(), None)
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Trust(crate::error::TrustError::HashMismatch { .. })
        ));
        // Nothing unverified may remain in the cache
        assert_eq!(std::fs::read_dir(cache_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_download_package_mirror_failover() {
        let repo_dir = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let (good, apk) = publish_apk(&repo_dir, "org.example.app_7.apk", b"apk bytes");

        let fetcher = IndexFetcher::new().unwrap();
        let repo = Repository::new("file:///nonexistent/kiosk-test-repo");
        let mirror = RepoMirror::new(1, &good, false);
        let fetched = fetcher
            .download_package(&apk, &repo, &[mirror], cache_dir.path(), None)
            .unwrap();

        assert_eq!(fetched.mirror.as_deref(), Some(good.as_str()));
        assert!(!fetched.failed_mirrors.is_empty());
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("app_7.apk").unwrap(), "app_7.apk");
        assert_eq!(safe_file_name("nested/path/app.apk").unwrap(), "app.apk");
        assert!(safe_file_name("").is_err());
        assert!(safe_file_name("dir/..").is_err());
    }

    #[test]
    fn test_candidate_addresses_skip_duplicate_canonical() {
        let repo = Repository::new("https://repo.example.org/repo");
        let mirrors = vec![
            RepoMirror::new(1, "https://repo.example.org/repo", false),
            RepoMirror::new(1, "https://mirror.example.org/repo", false),
        ];
        let candidates = candidate_addresses(&repo, &mirrors);
        assert_eq!(
            candidates,
            vec![
                "https://repo.example.org/repo".to_string(),
                "https://mirror.example.org/repo".to_string(),
            ]
        );
    }
}
