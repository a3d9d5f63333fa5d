//! Input sources
//!
//! HTML can come from a URL, a local file or standard input. URLs go
//! through [`FetchClient`] (or a [`Renderer`], after validation); local
//! sources are read with the same 5 MiB ceiling.

use crate::client::FetchClient;
use crate::error::{Error, InputError};
use crate::render::Renderer;
use std::fmt;
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// Size ceiling for file and stdin input (5 MiB)
pub const MAX_INPUT_BYTES: u64 = 5 * 1024 * 1024;

/// Where the HTML comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Url(String),
    File(PathBuf),
    Stdin,
}

impl InputSource {
    /// Label used when reporting on this input
    pub fn label(&self) -> String {
        match self {
            InputSource::Url(url) => url.clone(),
            InputSource::File(path) => path.display().to_string(),
            InputSource::Stdin => "stdin".to_string(),
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Load the HTML for `source`
///
/// URL inputs are rendered when a renderer is supplied, fetched otherwise.
/// Either way the URL is validated first. Blank documents are rejected.
pub async fn resolve_input(
    source: &InputSource,
    client: &FetchClient,
    renderer: Option<&dyn Renderer>,
) -> Result<String, Error> {
    debug!(source = %source, rendered = renderer.is_some(), "Resolving input");

    let html = match source {
        InputSource::Url(url) => match renderer {
            Some(renderer) => {
                let target = client.validate(url).await?;
                renderer.render(&target).await?
            }
            None => client.fetch(url).await?,
        },
        InputSource::File(path) => {
            let size = tokio::fs::metadata(path).await.map_err(InputError::from)?.len();
            if size > MAX_INPUT_BYTES {
                return Err(InputError::TooLarge {
                    limit: MAX_INPUT_BYTES,
                    size,
                }
                .into());
            }
            let file = tokio::fs::File::open(path).await.map_err(InputError::from)?;
            read_bounded(file, MAX_INPUT_BYTES).await?
        }
        InputSource::Stdin => read_bounded(tokio::io::stdin(), MAX_INPUT_BYTES).await?,
    };

    if html.trim().is_empty() {
        return Err(InputError::Empty.into());
    }
    Ok(html)
}

/// Read `reader` to the end as text, failing once more than `limit` bytes arrive
pub async fn read_bounded<R>(reader: R, limit: u64) -> Result<String, InputError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader.take(limit.saturating_add(1)).read_to_end(&mut buf).await?;

    let size = buf.len() as u64;
    if size > limit {
        return Err(InputError::TooLarge { limit, size });
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
