//! Async-friendly capture API (worker-backed abstraction)
//!
//! The worker thread owns a synchronous [`CdpPage`](crate::cdp::CdpPage) and
//! executes commands sent from async tasks, so callers get an async interface
//! without the backend needing to be `Send`. Because every session funnels
//! through the one worker, at most one capture runs against the browser at a
//! time.

use crate::cdp::CdpPage;
use crate::{CaptureConfig, Error, Result};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Goto(String, oneshot::Sender<Result<()>>),
    Capture(oneshot::Sender<Result<Vec<u8>>>),
    CaptureToFile(PathBuf, oneshot::Sender<Result<PathBuf>>),
    Close(oneshot::Sender<Result<()>>),
}

/// Handle to a browser owned by a background worker thread.
#[derive(Clone)]
pub struct Browser {
    cmd_tx: Sender<Command>,
}

/// A page handle backed by the same worker thread.
#[derive(Clone)]
pub struct Page {
    cmd_tx: Sender<Command>,
}

impl Browser {
    /// Launch a browser on a background worker thread.
    pub async fn new(config: Option<CaptureConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx): (oneshot::Sender<Result<()>>, oneshot::Receiver<Result<()>>) =
            oneshot::channel();

        thread::spawn(move || {
            let mut page = match CdpPage::new(&config) {
                Ok(p) => p,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };

            let _ = init_tx.send(Ok(()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Goto(url, resp) => {
                        let _ = resp.send(page.goto(&url));
                    }
                    Command::Capture(resp) => {
                        let _ = resp.send(crate::walk_and_stitch(&mut page, &config));
                    }
                    Command::CaptureToFile(dir, resp) => {
                        let res = crate::walk_and_stitch(&mut page, &config)
                            .and_then(|png| crate::output::save_png(&png, &dir));
                        let _ = resp.send(res);
                    }
                    Command::Close(resp) => {
                        let _ = resp.send(page.close());
                        break;
                    }
                }
            }
        });

        let init_res = init_rx
            .await
            .map_err(|e| Error::Other(format!("Worker init canceled: {}", e)))?;
        init_res?;

        Ok(Self { cmd_tx })
    }

    /// Open a page handle backed by the same worker thread.
    pub async fn new_page(&self) -> Result<Page> {
        Ok(Page {
            cmd_tx: self.cmd_tx.clone(),
        })
    }

    /// Shut down the background worker and close the browser.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Close(tx));
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))?
    }
}

impl Page {
    /// Navigate to a URL.
    pub async fn goto(&self, url: &str) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Goto(url.to_string(), tx));
        rx.await
            .map_err(|e| Error::Other(format!("Goto canceled: {}", e)))?
    }

    /// Capture a full-page screenshot of the current page as PNG bytes.
    pub async fn capture_full_page(&self) -> Result<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Capture(tx));
        rx.await
            .map_err(|e| Error::Other(format!("Capture canceled: {}", e)))?
    }

    /// Capture a full-page screenshot and save it under `dir`, returning the
    /// written path.
    pub async fn capture_to_file(&self, dir: impl Into<PathBuf>) -> Result<PathBuf> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::CaptureToFile(dir.into(), tx));
        rx.await
            .map_err(|e| Error::Other(format!("CaptureToFile canceled: {}", e)))?
    }
}
