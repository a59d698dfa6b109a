use std::path::{Path, PathBuf};

use teloxide::{net::Download, requests::Requester, types::UserId, Bot, DownloadError, RequestError};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("could not resolve file: {0}")]
    Request(#[from] RequestError),
    #[error("could not download file: {0}")]
    Download(#[from] DownloadError),
    #[error("could not write file: {0}")]
    Io(#[from] std::io::Error),
}

/// One photo per user; a new upload replaces the previous one.
pub fn photo_path(data_dir: &Path, user: UserId) -> PathBuf {
    data_dir.join(format!("parcel_{user}.jpg"))
}

async fn ensure_parent(path: &Path) -> Result<(), PhotoError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !tokio::fs::try_exists(parent).await? {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    PathBuf::from(partial)
}

async fn download(bot: &Bot, file_id: &str, dst_path: &Path) -> Result<(), PhotoError> {
    let file = bot.get_file(file_id).await?;
    let mut dst = tokio::fs::File::create(dst_path).await?;
    bot.download_file(&file.path, &mut dst).await?;
    dst.flush().await?;
    Ok(())
}

/// Downloads next to `path` and renames over it, so a failed download
/// leaves the previous photo in place.
pub async fn save_photo(bot: &Bot, file_id: &str, path: &Path) -> Result<(), PhotoError> {
    ensure_parent(path).await?;

    let partial = partial_path(path);
    if let Err(err) = download(bot, file_id, &partial).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(err);
    }
    tokio::fs::rename(&partial, path).await?;
    Ok(())
}
