use futures::StreamExt;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;

const PROGRESS_STEP: u64 = 50 * 1024 * 1024;

/// Downloads publicly shared files from Google Drive.
#[derive(Clone)]
pub struct DriveService {
    client: Client,
    download_url: Url,
}

#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("Invalid download URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Drive returned a page without a download link (file not public or quota exceeded)")]
    ConfirmationNotFound,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file that finished downloading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

impl DriveService {
    pub fn new(download_url: &str) -> Result<Self, DriveError> {
        Self::with_client(Client::new(), download_url)
    }

    pub fn with_client(client: Client, download_url: &str) -> Result<Self, DriveError> {
        Ok(Self {
            client,
            download_url: Url::parse(download_url)?,
        })
    }

    pub fn file_url(&self, file_id: &str) -> Url {
        let mut url = self.download_url.clone();
        url.query_pairs_mut()
            .append_pair("id", file_id)
            .append_pair("export", "download");
        url
    }

    /// Streams the file to `<dest>.part` and renames it to `dest` once complete.
    pub async fn download(&self, file_id: &str, dest: &Path) -> Result<DownloadedFile, DriveError> {
        let url = self.file_url(file_id);
        log::info!("Downloading {} to {}", url, dest.display());

        let mut response = self.get(url.clone()).await?;

        if is_html(&response) {
            let page = response.text().await?;
            let confirmed = confirmation_url(&url, &page).ok_or(DriveError::ConfirmationNotFound)?;
            log::info!("Large file, following Drive confirmation link");
            response = self.get(confirmed).await?;
            if is_html(&response) {
                return Err(DriveError::ConfirmationNotFound);
            }
        }

        let part_path = part_path(dest);
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let result = stream_to_file(response, &part_path, dest).await;
        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&part_path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Could not remove {}: {}", part_path.display(), e);
                }
            }
        }
        result
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, DriveError> {
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(DriveError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

/// Writes the body to `part_path`, hashing as it goes, then moves it to `dest`.
async fn stream_to_file(
    response: reqwest::Response,
    part_path: &Path,
    dest: &Path,
) -> Result<DownloadedFile, DriveError> {
    let total = response.content_length();
    let mut file = tokio::fs::File::create(part_path).await?;
    let mut hasher = Sha256::new();
    let mut size = 0u64;
    let mut next_report = PROGRESS_STEP;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        hasher.update(&chunk);
        file.write_all(&chunk).await?;
        size += chunk.len() as u64;

        if size >= next_report {
            match total {
                Some(total) => log::info!(
                    "Downloaded {} / {} MiB",
                    size / (1024 * 1024),
                    total / (1024 * 1024)
                ),
                None => log::info!("Downloaded {} MiB", size / (1024 * 1024)),
            }
            next_report += PROGRESS_STEP;
        }
    }

    file.flush().await?;
    drop(file);
    tokio::fs::rename(part_path, dest).await?;

    let sha256 = hex::encode(hasher.finalize());
    log::info!("Downloaded {} bytes (sha256 {})", size, sha256);

    Ok(DownloadedFile {
        path: dest.to_path_buf(),
        size,
        sha256,
    })
}

/// SHA-256 of a file on disk, streamed rather than read into memory.
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn is_html(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/html"))
        .unwrap_or(false)
}

/// Finds the link behind Drive's "can't scan this file for viruses" page.
///
/// Newer pages carry a `download-form` with hidden inputs; older ones an
/// `href` containing `confirm=`.
pub fn confirmation_url(base: &Url, page: &str) -> Option<Url> {
    form_url(page).or_else(|| legacy_confirm_url(base, page))
}

fn form_url(page: &str) -> Option<Url> {
    let form_start = page.find("<form")?;
    let form = &page[form_start..];
    let form_end = form.find("</form>").unwrap_or(form.len());
    let form = &form[..form_end];

    let form_tag = &form[..form.find('>')?];
    let action = attribute(form_tag, "action")?;
    let mut url = Url::parse(&unescape(action)).ok()?;

    let mut has_inputs = false;
    {
        let mut query = url.query_pairs_mut();
        for (idx, _) in form.match_indices("<input") {
            let tag = &form[idx..];
            let tag = &tag[..tag.find('>').unwrap_or(tag.len())];
            if attribute(tag, "type") != Some("hidden") {
                continue;
            }
            if let (Some(name), Some(value)) = (attribute(tag, "name"), attribute(tag, "value")) {
                query.append_pair(name, &unescape(value));
                has_inputs = true;
            }
        }
    }

    has_inputs.then_some(url)
}

fn legacy_confirm_url(base: &Url, page: &str) -> Option<Url> {
    for (idx, _) in page.match_indices("href=\"") {
        let start = idx + "href=\"".len();
        let end = start + page[start..].find('"')?;
        let href = unescape(&page[start..end]);
        if href.contains("confirm=") {
            return base.join(&href).ok();
        }
    }
    None
}

fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{name}=\"");
    let mut search = tag;
    loop {
        let idx = search.find(&needle)?;
        let preceded_by_space = idx == 0
            || search[..idx]
                .chars()
                .next_back()
                .map(char::is_whitespace)
                .unwrap_or(true);
        let start = idx + needle.len();
        if preceded_by_space {
            let len = search[start..].find('"')?;
            return Some(&search[start..start + len]);
        }
        search = &search[start..];
    }
}

fn unescape(value: &str) -> String {
    value
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}
