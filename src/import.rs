//! Background import of picked images.
//!
//! Thumbnail generation for a batch of picked images runs off the
//! interaction thread and reports back over a channel. The owning screen
//! polls for updates; if it has been dismantled in the meantime the worker's
//! sends simply go nowhere. Cancellation is cooperative via a shared flag,
//! set explicitly or by dropping the task handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::ThumbnailError;
use crate::thumbnails;

/// One image handed over by the host's picker.
#[derive(Debug, Clone)]
pub struct PickedImage {
    pub asset_identifier: String,
    pub data: Vec<u8>,
}

/// A picked image with its generated thumbnail, ready for
/// [`EditContext::add_photo`](crate::store::EditContext::add_photo).
#[derive(Debug, Clone)]
pub struct ImportedImage {
    pub asset_identifier: String,
    pub data: Vec<u8>,
    pub thumbnail: Vec<u8>,
}

#[derive(Debug)]
pub enum ImportUpdate {
    Imported(ImportedImage),
    /// This item failed; the batch continues.
    Failed {
        asset_identifier: String,
        error: ThumbnailError,
    },
    Finished {
        imported: usize,
    },
    Cancelled,
}

/// Handle to a running import. Dropping it cancels the remaining work.
pub struct ImportTask {
    receiver: mpsc::Receiver<ImportUpdate>,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ImportTask {
    /// Drain all updates that arrived since the last poll.
    pub fn poll_updates(&self) -> Vec<ImportUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = self.receiver.try_recv() {
            updates.push(update);
        }
        updates
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Block until the worker finishes and return the remaining updates.
    pub fn wait(mut self) -> Vec<ImportUpdate> {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        let mut updates = Vec::new();
        while let Ok(update) = self.receiver.try_recv() {
            updates.push(update);
        }
        updates
    }
}

impl Drop for ImportTask {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

/// Generate thumbnails for a batch of picked images on a worker thread.
pub fn spawn(items: Vec<PickedImage>) -> ImportTask {
    spawn_sized(
        items,
        thumbnails::THUMBNAIL_WIDTH,
        thumbnails::THUMBNAIL_HEIGHT,
    )
}

pub fn spawn_sized(items: Vec<PickedImage>, max_width: u32, max_height: u32) -> ImportTask {
    let (sender, receiver) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_flag = cancel.clone();

    let worker = thread::spawn(move || {
        let mut imported = 0usize;
        for item in items {
            if cancel_flag.load(Ordering::SeqCst) {
                let _ = sender.send(ImportUpdate::Cancelled);
                return;
            }
            match thumbnails::generate_sized(&item.data, max_width, max_height) {
                Ok(thumbnail) => {
                    imported += 1;
                    let _ = sender.send(ImportUpdate::Imported(ImportedImage {
                        asset_identifier: item.asset_identifier,
                        data: item.data,
                        thumbnail,
                    }));
                }
                Err(error) => {
                    tracing::warn!(
                        asset = %item.asset_identifier,
                        "failed to create a thumbnail for the picked image: {error}"
                    );
                    let _ = sender.send(ImportUpdate::Failed {
                        asset_identifier: item.asset_identifier,
                        error,
                    });
                }
            }
        }
        let _ = sender.send(ImportUpdate::Finished { imported });
    });

    ImportTask {
        receiver,
        cancel,
        worker: Some(worker),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thumbnails::test_png;

    #[test]
    fn test_batch_imports_and_finishes() {
        let items = vec![
            PickedImage {
                asset_identifier: "asset-1".into(),
                data: test_png(320, 240),
            },
            PickedImage {
                asset_identifier: "asset-2".into(),
                data: b"broken".to_vec(),
            },
            PickedImage {
                asset_identifier: "asset-3".into(),
                data: test_png(64, 64),
            },
        ];

        let updates = spawn(items).wait();

        let imported: Vec<&ImportedImage> = updates
            .iter()
            .filter_map(|update| match update {
                ImportUpdate::Imported(image) => Some(image),
                _ => None,
            })
            .collect();
        assert_eq!(imported.len(), 2);
        assert_eq!(imported[0].asset_identifier, "asset-1");
        assert!(!imported[0].thumbnail.is_empty());

        assert!(updates.iter().any(|update| matches!(
            update,
            ImportUpdate::Failed { asset_identifier, .. } if asset_identifier == "asset-2"
        )));
        assert!(updates
            .iter()
            .any(|update| matches!(update, ImportUpdate::Finished { imported: 2 })));
    }

    #[test]
    fn test_empty_batch_finishes_immediately() {
        let updates = spawn_sized(Vec::new(), 64, 64).wait();
        assert!(matches!(
            updates.as_slice(),
            [ImportUpdate::Finished { imported: 0 }]
        ));
    }

    #[test]
    fn test_cancelled_batch_terminates() {
        let items = vec![PickedImage {
            asset_identifier: "asset-1".into(),
            data: test_png(32, 32),
        }];
        let task = spawn(items);
        task.cancel();
        let updates = task.wait();

        // Either the worker saw the flag before the item (Cancelled, no
        // Finished) or it had already completed the batch; both terminate.
        let cancelled = updates
            .iter()
            .any(|update| matches!(update, ImportUpdate::Cancelled));
        let finished = updates
            .iter()
            .any(|update| matches!(update, ImportUpdate::Finished { .. }));
        assert!(cancelled != finished);
    }
}
