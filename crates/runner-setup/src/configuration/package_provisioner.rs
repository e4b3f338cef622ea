// PackageProvisioner: makes sure the pinned runner archive is cached and
// unpacked in the runner home, downloading it at most once.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use runner_common::constants::path;
use runner_common::host_context::HostContext;
use runner_common::tracing::Tracing;
use runner_sdk::TraceWriter;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use crate::errors::{DownloadError, ProvisionError};

/// Which archive to provision and where.
#[derive(Debug, Clone)]
pub struct PackageSettings {
    pub version: String,
    pub platform: String,
    /// Release download base; `/v{version}/{file_name}` is appended.
    pub download_base_url: String,
    pub cache_dir: PathBuf,
    /// Expected lower-case hex SHA-256 of the archive, if known.
    pub sha256: Option<String>,
}

impl PackageSettings {
    /// `actions-runner-{platform}-{version}.tar.gz`
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}-{}.{}",
            path::ARCHIVE_PREFIX,
            self.platform,
            self.version,
            path::ARCHIVE_EXTENSION
        )
    }

    /// `{download_base_url}/v{version}/{file_name}`
    pub fn download_url(&self) -> String {
        format!(
            "{}/v{}/{}",
            self.download_base_url.trim_end_matches('/'),
            self.version,
            self.file_name()
        )
    }
}

/// A provisioned runner: the cached archive and the directory it was
/// unpacked into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerPackage {
    pub version: String,
    pub platform: String,
    pub file_name: String,
    pub archive_path: PathBuf,
    pub home_dir: PathBuf,
}

impl RunnerPackage {
    pub fn config_script(&self) -> PathBuf {
        self.home_dir.join(path::CONFIG_SCRIPT)
    }

    pub fn service_script(&self) -> PathBuf {
        self.home_dir.join(path::SERVICE_SCRIPT)
    }
}

/// Source of a ready-to-configure runner package.
#[async_trait]
pub trait PackageSource: Send + Sync {
    async fn ensure_package(&self) -> Result<RunnerPackage, ProvisionError>;
}

/// Downloads, verifies and extracts the runner archive.
pub struct PackageProvisioner {
    settings: PackageSettings,
    client: Client,
    trace: Tracing,
}

impl PackageProvisioner {
    pub fn new(context: Arc<HostContext>, settings: PackageSettings, client: Client) -> Self {
        let trace = context.get_trace("PackageProvisioner");
        Self {
            settings,
            client,
            trace,
        }
    }

    fn package(&self) -> RunnerPackage {
        let file_name = self.settings.file_name();
        RunnerPackage {
            version: self.settings.version.clone(),
            platform: self.settings.platform.clone(),
            archive_path: self.settings.cache_dir.join(&file_name),
            file_name,
            home_dir: self.settings.cache_dir.clone(),
        }
    }

    /// Stream the archive to `{archive}.part`, then rename it into place.
    async fn download(&self, url: &str, archive: &Path) -> Result<(), ProvisionError> {
        let partial = partial_path(archive);
        let result = self.download_to(url, &partial).await;

        match result {
            Ok(digest) => {
                if let Err(e) = self.verify_digest(archive, &digest) {
                    remove_quietly(&partial);
                    return Err(e);
                }
                fs::rename(&partial, archive).map_err(|e| {
                    remove_quietly(&partial);
                    ProvisionError::io(format!("failed to move download into {}", archive.display()), e)
                })
            }
            Err(e) => {
                remove_quietly(&partial);
                Err(e)
            }
        }
    }

    /// Returns the hex SHA-256 of what was written. A body shorter than its
    /// `Content-Length` surfaces as a stream error from the client.
    async fn download_to(&self, url: &str, partial: &Path) -> Result<String, ProvisionError> {
        let transport = |e: reqwest::Error| DownloadError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let mut file = tokio::fs::File::create(partial)
            .await
            .map_err(|e| ProvisionError::io(format!("failed to create {}", partial.display()), e))?;

        let mut hasher = Sha256::new();
        let mut received: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(transport)?;
            hasher.update(&chunk);
            received += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|e| ProvisionError::io(format!("failed to write {}", partial.display()), e))?;
        }
        file.flush()
            .await
            .map_err(|e| ProvisionError::io(format!("failed to write {}", partial.display()), e))?;
        drop(file);

        self.trace
            .info(&format!("Downloaded {} bytes from {}", received, url));
        Ok(hex::encode(hasher.finalize()))
    }

    fn verify_digest(&self, archive: &Path, actual: &str) -> Result<(), ProvisionError> {
        let Some(ref expected) = self.settings.sha256 else {
            return Ok(());
        };
        if !expected.eq_ignore_ascii_case(actual) {
            return Err(ProvisionError::ChecksumMismatch {
                path: archive.to_path_buf(),
                expected: expected.clone(),
                actual: actual.to_string(),
            });
        }
        self.trace.info("Archive checksum verified");
        Ok(())
    }

    fn verify_cached(&self, archive: &Path) -> Result<(), ProvisionError> {
        if self.settings.sha256.is_none() {
            return Ok(());
        }
        let actual = file_sha256(archive)
            .map_err(|e| ProvisionError::io(format!("failed to read {}", archive.display()), e))?;
        let result = self.verify_digest(archive, &actual);
        if result.is_err() {
            remove_quietly(archive);
        }
        result
    }

    /// Unpack into the runner home. A corrupt archive is removed so the next
    /// run fetches a fresh copy.
    fn extract(&self, package: &RunnerPackage) -> Result<(), ProvisionError> {
        self.trace.info(&format!(
            "Extracting {} into {}",
            package.archive_path.display(),
            package.home_dir.display()
        ));

        let unpacked = fs::File::open(&package.archive_path).and_then(|file| {
            let decoder = flate2::read::GzDecoder::new(file);
            let mut archive = tar::Archive::new(decoder);
            archive.unpack(&package.home_dir)
        });

        if let Err(e) = unpacked {
            remove_quietly(&package.archive_path);
            return Err(ProvisionError::ExtractError {
                path: package.archive_path.clone(),
                reason: e.to_string(),
            });
        }

        if !package.config_script().is_file() {
            remove_quietly(&package.archive_path);
            return Err(ProvisionError::ExtractError {
                path: package.archive_path.clone(),
                reason: format!("unexpected archive contents: no {}", path::CONFIG_SCRIPT),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl PackageSource for PackageProvisioner {
    async fn ensure_package(&self) -> Result<RunnerPackage, ProvisionError> {
        let package = self.package();

        fs::create_dir_all(&package.home_dir).map_err(|e| {
            ProvisionError::io(format!("failed to create {}", package.home_dir.display()), e)
        })?;

        if package.archive_path.is_file() {
            self.trace.info(&format!(
                "Using cached runner package {}",
                package.archive_path.display()
            ));
            self.verify_cached(&package.archive_path)?;
            if !package.config_script().is_file() {
                self.extract(&package)?;
            }
            return Ok(package);
        }

        let url = self.settings.download_url();
        self.trace
            .info(&format!("Downloading runner package from {}", url));
        self.download(&url, &package.archive_path).await?;
        self.extract(&package)?;

        Ok(package)
    }
}

fn partial_path(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_os_string();
    name.push(path::PARTIAL_SUFFIX);
    PathBuf::from(name)
}

fn file_sha256(file: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut reader = fs::File::open(file)?;
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

fn remove_quietly(file: &Path) {
    let _ = fs::remove_file(file);
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tokio::io::AsyncWriteExt as _;

    const VERSION: &str = "2.321.0";
    const PLATFORM: &str = "linux-x64";
    const URL_PATH: &str = "/v2.321.0/actions-runner-linux-x64-2.321.0.tar.gz";

    fn runner_archive(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder
                .append_data(&mut header, name, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn valid_archive() -> Vec<u8> {
        runner_archive(&[("config.sh", "#!/bin/sh\n"), ("bin/Runner.Listener", "bin")])
    }

    fn provisioner(base: &str, cache_dir: &Path, sha256: Option<String>) -> PackageProvisioner {
        let context = HostContext::new(cache_dir);
        let settings = PackageSettings {
            version: VERSION.to_string(),
            platform: PLATFORM.to_string(),
            download_base_url: base.to_string(),
            cache_dir: cache_dir.to_path_buf(),
            sha256,
        };
        let client = Client::builder().no_proxy().build().unwrap();
        PackageProvisioner::new(context, settings, client)
    }

    fn sha256_hex(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    #[test]
    fn test_file_name_and_url() {
        let settings = PackageSettings {
            version: VERSION.to_string(),
            platform: PLATFORM.to_string(),
            download_base_url: "https://github.com/actions/runner/releases/download/".to_string(),
            cache_dir: PathBuf::from("/tmp"),
            sha256: None,
        };
        assert_eq!(settings.file_name(), "actions-runner-linux-x64-2.321.0.tar.gz");
        assert_eq!(
            settings.download_url(),
            "https://github.com/actions/runner/releases/download/v2.321.0/actions-runner-linux-x64-2.321.0.tar.gz"
        );
    }

    #[tokio::test]
    async fn test_second_call_uses_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", URL_PATH)
            .with_status(200)
            .with_body(valid_archive())
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("actions-runner");
        let provisioner = provisioner(&server.url(), &cache, None);

        let first = provisioner.ensure_package().await.unwrap();
        let second = provisioner.ensure_package().await.unwrap();

        assert_eq!(first, second);
        assert!(first.archive_path.is_file());
        assert!(first.config_script().is_file());
        assert!(cache.join("bin/Runner.Listener").is_file());
        assert!(!partial_path(&first.archive_path).exists());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", URL_PATH)
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = provisioner(&server.url(), dir.path(), None)
            .ensure_package()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProvisionError::Download(DownloadError::Status { status: 404, .. })
        ));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_truncated_body_leaves_no_archive() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 1024];
                let _ = tokio::io::AsyncReadExt::read(&mut socket, &mut request).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\ntruncated")
                    .await;
                let _ = socket.shutdown().await;
            }
        });

        let dir = tempfile::tempdir().unwrap();
        let err = provisioner(&format!("http://{}", addr), dir.path(), None)
            .ensure_package()
            .await
            .unwrap_err();

        assert!(
            matches!(err, ProvisionError::Download(DownloadError::Transport { .. })),
            "{err:?}"
        );
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_archive_is_removed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", URL_PATH)
            .with_status(200)
            .with_body("definitely not gzip")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let provisioner = provisioner(&server.url(), dir.path(), None);
        let err = provisioner.ensure_package().await.unwrap_err();

        assert!(matches!(err, ProvisionError::ExtractError { .. }));
        assert!(!provisioner.package().archive_path.exists());
    }

    #[tokio::test]
    async fn test_archive_without_entry_point() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", URL_PATH)
            .with_status(200)
            .with_body(runner_archive(&[("README.md", "hello")]))
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = provisioner(&server.url(), dir.path(), None)
            .ensure_package()
            .await
            .unwrap_err();

        match err {
            ProvisionError::ExtractError { reason, .. } => {
                assert!(reason.contains("unexpected archive contents"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_checksum_verified_on_download() {
        let body = valid_archive();
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", URL_PATH)
            .with_status(200)
            .with_body(body.clone())
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let good = provisioner(&server.url(), dir.path(), Some(sha256_hex(&body)));
        assert!(good.ensure_package().await.is_ok());

        let other = tempfile::tempdir().unwrap();
        let bad = provisioner(&server.url(), other.path(), Some("0".repeat(64)));
        let err = bad.ensure_package().await.unwrap_err();
        assert!(matches!(err, ProvisionError::ChecksumMismatch { .. }));
        assert_eq!(fs::read_dir(other.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_reextracts_without_network() {
        let dir = tempfile::tempdir().unwrap();
        // Nothing listens here; any network access would fail the test.
        let provisioner = provisioner("http://127.0.0.1:9", dir.path(), None);
        let archive = provisioner.package().archive_path;
        fs::write(&archive, valid_archive()).unwrap();

        let package = provisioner.ensure_package().await.unwrap();
        assert!(package.config_script().is_file());
    }

    #[tokio::test]
    async fn test_cached_archive_with_wrong_checksum_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let provisioner = provisioner("http://127.0.0.1:9", dir.path(), Some("f".repeat(64)));
        let archive = provisioner.package().archive_path;
        fs::write(&archive, valid_archive()).unwrap();

        let err = provisioner.ensure_package().await.unwrap_err();
        assert!(matches!(err, ProvisionError::ChecksumMismatch { .. }));
        assert!(!archive.exists());
    }
}
