use anyhow::{Context, anyhow};
use bank_utils::{
    aggregate::slug,
    store::{DocumentStore, WriteOp},
};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use schema::{Asset, AssetKind, collections};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AssetKindArg {
    Image,
    Ebook,
}

impl From<AssetKindArg> for AssetKind {
    fn from(arg: AssetKindArg) -> Self {
        match arg {
            AssetKindArg::Image => AssetKind::Image,
            AssetKindArg::Ebook => AssetKind::Ebook,
        }
    }
}

#[derive(clap::Args, Clone, Debug)]
pub struct UploadArgs {
    #[arg(long)]
    pub file: PathBuf,
    #[arg(long, value_enum)]
    pub kind: AssetKindArg,
    #[arg(long)]
    pub subject: Option<String>,
    #[arg(long)]
    pub title: Option<String>,
    /// Overrides S3_BUCKET_NAME
    #[arg(long)]
    pub bucket: Option<String>,
}

pub fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("epub") => "application/epub+zip",
        _ => "application/octet-stream",
    }
}

/// `{kind}s/{subject}/{fileName}`, the subject segment only when given.
pub fn storage_key(kind: AssetKind, subject: Option<&str>, file_name: &str) -> String {
    match subject.map(slug).filter(|s| !s.is_empty()) {
        Some(subject) => format!("{}s/{subject}/{file_name}", kind.as_str()),
        None => format!("{}s/{file_name}", kind.as_str()),
    }
}

/// Metadata for `path`; the id depends only on the kind and file stem, so a
/// re-upload replaces the same record.
pub fn describe_asset(
    path: &Path,
    kind: AssetKind,
    subject: Option<&str>,
    title: Option<&str>,
    bucket: &str,
    size_bytes: u64,
    uploaded_at: DateTime<Utc>,
) -> anyhow::Result<Asset> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);

    Ok(Asset {
        id: format!("{}_{}", kind.as_str(), slug(stem)),
        kind,
        file_name: file_name.to_string(),
        bucket: bucket.to_string(),
        storage_key: storage_key(kind, subject, file_name),
        content_type: content_type(path).to_string(),
        size_bytes,
        subject: subject.map(str::to_string),
        title: title.map(str::to_string),
        uploaded_at,
    })
}

/// Puts the file in the bucket, then upserts its metadata record.
#[tracing::instrument(skip_all, fields(file = %args.file.display()), err(Debug))]
pub async fn upload_asset<S: DocumentStore>(
    s3: &aws_sdk_s3::Client,
    store: &S,
    args: &UploadArgs,
    bucket_name: &str,
) -> anyhow::Result<Asset> {
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("unable to read {}", args.file.display()))?;
    let asset = describe_asset(
        &args.file,
        args.kind.into(),
        args.subject.as_deref(),
        args.title.as_deref(),
        bucket_name,
        bytes.len() as u64,
        Utc::now(),
    )?;

    let put_object_output = s3
        .put_object()
        .bucket(bucket_name)
        .key(&asset.storage_key)
        .content_type(&asset.content_type)
        .body(bytes.into())
        .send()
        .await
        .map_err(|e| anyhow!("unable to upload {}: {e:?}", asset.storage_key))?;
    info!(key = %asset.storage_key, e_tag = ?put_object_output.e_tag, "uploaded");

    store
        .commit(&[WriteOp::upsert(collections::ASSETS, &asset.id, &asset)?])
        .await?;
    info!(id = %asset.id, "asset recorded");
    Ok(asset)
}
