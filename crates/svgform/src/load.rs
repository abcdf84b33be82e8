//! Document loading: the only asynchronous boundary of the pipeline.
//!
//! Nothing here orders concurrent requests. A caller that issues a newer load must discard the
//! result of any older one that completes later.

use futures::FutureExt as _;
use futures::future::BoxFuture;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to fetch: {reason}")]
    Fetch { reason: String },

    #[error("Invalid document URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Text(String),
    Url(Url),
}

impl DocumentSource {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn url(raw: &str) -> Result<Self, LoadError> {
        Url::parse(raw)
            .map(Self::Url)
            .map_err(|err| LoadError::InvalidUrl {
                url: raw.to_string(),
                message: err.to_string(),
            })
    }
}

/// Retrieves document text for a URL. The error string becomes the `<reason>` of
/// [`LoadError::Fetch`].
pub trait DocumentFetcher {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<String, String>>;
}

/// Reads `file://` URLs from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl DocumentFetcher for FileFetcher {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<String, String>> {
        async move {
            if url.scheme() != "file" {
                return Err(format!("unsupported URL scheme `{}`", url.scheme()));
            }
            let path = url
                .to_file_path()
                .map_err(|()| format!("{url} is not a local file path"))?;
            std::fs::read_to_string(&path).map_err(|err| format!("{}: {err}", path.display()))
        }
        .boxed()
    }
}

/// Resolves `source` to document text.
pub async fn load_document<F>(source: &DocumentSource, fetcher: &F) -> Result<String, LoadError>
where
    F: DocumentFetcher + ?Sized,
{
    match source {
        DocumentSource::Text(text) => Ok(text.clone()),
        DocumentSource::Url(url) => {
            tracing::debug!(%url, "fetching document");
            fetcher
                .fetch(url)
                .await
                .map_err(|reason| LoadError::Fetch { reason })
        }
    }
}
