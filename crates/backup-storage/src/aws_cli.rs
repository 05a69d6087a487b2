use crate::retention::DELETE_BATCH_LIMIT;
use crate::traits::{ObjectStorage, StorageError, StorageResult, StoredObject};
use async_trait::async_trait;
use backup_core::{Destination, StorageBackend};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Instant;
use tokio::process::Command;

/// Items requested per `list-objects-v2` call; the CLI hands back a `NextToken`
/// when more remain.
const LIST_PAGE_ITEMS: usize = 1000;

/// Storage backed by the `aws` command-line client.
///
/// Every call passes the destination's endpoint and region as flags and its
/// credentials through the child's environment, so destinations with different
/// accounts can coexist in one process.
#[derive(Clone)]
pub struct AwsCliStorage {
    cli_path: String,
    bucket: String,
    endpoint_url: Option<String>,
    region: Option<String>,
    access_key: Option<String>,
    secret_key: Option<String>,
}

impl AwsCliStorage {
    pub fn new(cli_path: impl Into<String>, destination: &Destination) -> Self {
        AwsCliStorage {
            cli_path: cli_path.into(),
            bucket: destination.bucket.clone(),
            endpoint_url: destination.endpoint.clone(),
            region: destination.region.clone(),
            access_key: destination.access_key.clone(),
            secret_key: destination.secret_key.clone(),
        }
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.cli_path);
        cmd.args(args);

        if let Some(ref endpoint) = self.endpoint_url {
            cmd.arg("--endpoint-url").arg(endpoint);
            cmd.env("AWS_ENDPOINT_URL", endpoint);
        }
        if let Some(ref region) = self.region {
            cmd.arg("--region").arg(region);
            cmd.env("AWS_DEFAULT_REGION", region);
        }
        if let Some(ref access_key) = self.access_key {
            cmd.env("AWS_ACCESS_KEY_ID", access_key);
        }
        if let Some(ref secret_key) = self.secret_key {
            cmd.env("AWS_SECRET_ACCESS_KEY", secret_key);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run the command, mapping spawn failures and non-zero exits through `fail`.
    async fn run(
        &self,
        mut cmd: Command,
        operation: &'static str,
        fail: fn(String) -> StorageError,
    ) -> StorageResult<Output> {
        let start = Instant::now();
        let output = cmd
            .output()
            .await
            .map_err(|e| fail(format!("failed to execute {}: {}", self.cli_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(
                operation,
                bucket = %self.bucket,
                status = %output.status,
                stderr = %stderr.trim(),
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "aws CLI call failed"
            );
            return Err(fail(format!(
                "aws {} exited with {}: {}",
                operation,
                output.status,
                stderr.trim()
            )));
        }

        tracing::debug!(
            operation,
            bucket = %self.bucket,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "aws CLI call succeeded"
        );
        Ok(output)
    }
}

#[async_trait]
impl ObjectStorage for AwsCliStorage {
    async fn upload_file(&self, local_path: &Path, key: &str) -> StorageResult<()> {
        let target = self.uri(key);
        let cmd = self.command([
            OsStr::new("s3"),
            OsStr::new("cp"),
            local_path.as_os_str(),
            OsStr::new(&target),
            OsStr::new("--only-show-errors"),
        ]);
        self.run(cmd, "s3 cp", StorageError::UploadFailed).await?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<StoredObject>> {
        let prefix = prefix.trim_start_matches('/');
        let page_items = LIST_PAGE_ITEMS.to_string();
        let mut objects = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut args = vec![
                "s3api",
                "list-objects-v2",
                "--bucket",
                self.bucket.as_str(),
                "--prefix",
                prefix,
                "--max-items",
                page_items.as_str(),
                "--output",
                "json",
            ];
            if let Some(ref t) = token {
                args.push("--starting-token");
                args.push(t.as_str());
            }

            let output = self
                .run(self.command(&args), "s3api list-objects-v2", StorageError::ListFailed)
                .await?;
            let page = parse_listing(&output.stdout)?;
            objects.extend(page.contents.into_iter().map(StoredObject::from));

            match page.next_token {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => break,
            }
        }

        Ok(objects)
    }

    async fn delete_batch(&self, keys: &[String]) -> StorageResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        if keys.len() > DELETE_BATCH_LIMIT {
            return Err(StorageError::BatchTooLarge(keys.len()));
        }

        let body = delete_request_body(keys)?;
        let cmd = self.command([
            "s3api",
            "delete-objects",
            "--bucket",
            self.bucket.as_str(),
            "--delete",
            body.as_str(),
            "--output",
            "json",
        ]);
        let output = self
            .run(cmd, "s3api delete-objects", StorageError::DeleteFailed)
            .await?;

        let errors = parse_delete_errors(&output.stdout)?;
        if let Some(first) = errors.first() {
            return Err(StorageError::DeleteFailed(format!(
                "{} of {} keys not deleted, first: {} ({}: {})",
                errors.len(),
                keys.len(),
                first.key,
                first.code.as_deref().unwrap_or("unknown"),
                first.message.as_deref().unwrap_or("")
            )));
        }
        Ok(())
    }

    fn uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key.trim_start_matches('/'))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::AwsCli
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListPage {
    #[serde(default)]
    contents: Vec<ListedObject>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedObject {
    key: String,
    last_modified: DateTime<Utc>,
    #[serde(default)]
    size: u64,
    #[serde(default, rename = "ETag")]
    etag: Option<String>,
}

impl From<ListedObject> for StoredObject {
    fn from(o: ListedObject) -> Self {
        StoredObject {
            key: o.key,
            last_modified: o.last_modified,
            size: o.size,
            etag: o.etag.map(|e| e.trim_matches('"').to_string()),
        }
    }
}

/// An empty bucket prefix produces no output at all rather than an empty document.
fn parse_listing(stdout: &[u8]) -> StorageResult<ListPage> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(ListPage::default());
    }
    serde_json::from_slice(stdout)
        .map_err(|e| StorageError::ListFailed(format!("unexpected list-objects-v2 output: {}", e)))
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteRequest<'a> {
    objects: Vec<DeleteKey<'a>>,
    quiet: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteKey<'a> {
    key: &'a str,
}

fn delete_request_body(keys: &[String]) -> StorageResult<String> {
    let request = DeleteRequest {
        objects: keys.iter().map(|k| DeleteKey { key: k }).collect(),
        quiet: true,
    };
    serde_json::to_string(&request).map_err(|e| StorageError::BackendError(e.to_string()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteResponse {
    #[serde(default)]
    errors: Vec<DeleteErrorEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteErrorEntry {
    key: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Quiet deletes only report failures; a clean run prints nothing.
fn parse_delete_errors(stdout: &[u8]) -> StorageResult<Vec<DeleteErrorEntry>> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let response: DeleteResponse = serde_json::from_slice(stdout).map_err(|e| {
        StorageError::DeleteFailed(format!("unexpected delete-objects output: {}", e))
    })?;
    Ok(response.errors)
}
