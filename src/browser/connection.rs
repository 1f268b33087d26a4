use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use crate::error::SessionError;

/// Connect to a running browser on the given devtools port and obtain a
/// page, preferring an existing tab whose title matches `target_title`.
pub async fn connect_to_browser_and_page(
    port: u16,
    target_url: Option<&str>,
    target_title: Option<&str>,
) -> Result<(Browser, Page), SessionError> {
    let browser_url = format!("http://localhost:{port}");
    info!("connecting to browser at {browser_url}");

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("browser connection failed: {e}");
        SessionError::connection_failed(port, e)
    })?;

    // Browser events must be pumped for the connection to stay usable.
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    // Give the browser a moment to sync its target list.
    sleep(Duration::from_millis(300)).await;

    let pages = browser
        .pages()
        .await
        .map_err(|e| SessionError::connection_failed(port, e))?;
    debug!("browser exposes {} pages", pages.len());

    if let Some(title) = target_title {
        for page in pages.iter() {
            if let Ok(Some(page_title)) = page.get_title().await {
                if page_title.contains(title) {
                    info!("✓ attached to existing page: {page_title}");
                    return Ok((browser, page.clone()));
                }
            }
        }
        debug!("no page titled like '{title}', opening a new one");
    }

    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| SessionError::connection_failed(port, e))?;

    if let Some(url) = target_url {
        page.goto(url)
            .await
            .map_err(|e| SessionError::navigation_failed(url, e))?;
        info!("navigated to {url}");
    }

    Ok((browser, page))
}
