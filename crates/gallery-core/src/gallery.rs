//! Gallery workflow.
//!
//! Lists the session's bucket, keeps image keys only, signs a URL per image
//! and orders the result newest first. The gallery follows configuration
//! changes on its own once [`GalleryWorkflow::watch_configuration`] runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::try_join_all;
use gallery_models::{is_image_key, ObjectEntry, ObjectSummary};
use gallery_storage::{ProviderReason, StorageError};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::session::SessionManager;

/// Fallback interval between configuration status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GalleryErrorKind {
    NotConfigured,
    BucketMissing,
    AccessDenied,
    Network,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct GalleryError {
    pub kind: GalleryErrorKind,
    pub message: String,
}

impl GalleryError {
    fn new(kind: GalleryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_configured() -> Self {
        Self::new(
            GalleryErrorKind::NotConfigured,
            "Storage service is not configured. Please configure storage settings first.",
        )
    }
}

impl From<&StorageError> for GalleryError {
    fn from(err: &StorageError) -> Self {
        match err.reason() {
            Some(ProviderReason::BucketMissing) => Self::new(
                GalleryErrorKind::BucketMissing,
                "The specified bucket does not exist. Please verify your configuration.",
            ),
            Some(ProviderReason::AccessDenied) => Self::new(
                GalleryErrorKind::AccessDenied,
                "Access denied. Please check your storage permissions and credentials.",
            ),
            Some(ProviderReason::Network) => Self::new(
                GalleryErrorKind::Network,
                "Network error. Please check your internet connection and try again.",
            ),
            _ if matches!(err, StorageError::NotInitialized | StorageError::NotConfigured) => {
                Self::not_configured()
            }
            _ => Self::new(GalleryErrorKind::Storage, err.to_string()),
        }
    }
}

/// What a gallery UI renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryView {
    pub prefix: String,
    pub loading: bool,
    /// Session state seen by the most recent load or status check
    pub initialized: bool,
    pub images: Vec<ObjectSummary>,
    /// The listing had more keys than its first page
    pub is_truncated: bool,
    pub error: Option<GalleryError>,
}

pub struct GalleryWorkflow {
    session: Arc<SessionManager>,
    view_tx: watch::Sender<GalleryView>,
    /// Latest load; older loads finishing late do not touch the view
    load_seq: AtomicU64,
}

impl GalleryWorkflow {
    pub fn new(session: Arc<SessionManager>) -> Arc<Self> {
        let (view_tx, _) = watch::channel(GalleryView::default());
        Arc::new(Self {
            session,
            view_tx,
            load_seq: AtomicU64::new(0),
        })
    }

    pub fn view(&self) -> GalleryView {
        self.view_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GalleryView> {
        self.view_tx.subscribe()
    }

    pub fn prefix(&self) -> String {
        self.view_tx.borrow().prefix.clone()
    }

    /// List, filter, sign and sort the current prefix.
    pub async fn load(&self) -> Result<GalleryView, GalleryError> {
        self.load_prefix(self.prefix()).await
    }

    /// Switch to `prefix` and list it unconditionally.
    ///
    /// The returned view is the one this call built, even when a newer load
    /// has since replaced the shared view.
    pub async fn browse(&self, prefix: impl Into<String>) -> Result<GalleryView, GalleryError> {
        self.load_prefix(prefix.into()).await
    }

    /// Change the prefix; re-lists only when it differs from the current one.
    pub async fn set_prefix(&self, prefix: impl Into<String>) -> Result<GalleryView, GalleryError> {
        let prefix = prefix.into();
        if self.prefix() != prefix {
            return self.load_prefix(prefix).await;
        }

        let view = self.view();
        match view.error {
            Some(e) => Err(e),
            None => Ok(view),
        }
    }

    pub async fn retry(&self) -> Result<GalleryView, GalleryError> {
        self.load().await
    }

    async fn load_prefix(&self, prefix: String) -> Result<GalleryView, GalleryError> {
        let seq = self.load_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let initialized = self.session.status().initialized;

        self.view_tx.send_modify(|view| {
            view.prefix = prefix.clone();
            view.loading = true;
            view.initialized = initialized;
            view.error = None;
        });

        let result = self.fetch(&prefix, initialized).await;
        let is_latest = self.load_seq.load(Ordering::SeqCst) == seq;

        match result {
            Ok((images, is_truncated)) => {
                debug!(prefix = %prefix, count = images.len(), "Gallery loaded");
                if is_latest {
                    self.view_tx.send_modify(|view| {
                        view.loading = false;
                        view.images = images.clone();
                        view.is_truncated = is_truncated;
                    });
                }
                Ok(GalleryView {
                    prefix,
                    loading: false,
                    initialized,
                    images,
                    is_truncated,
                    error: None,
                })
            }
            Err(e) => {
                error!(prefix = %prefix, error = %e, "Error loading images");
                if is_latest {
                    self.view_tx.send_modify(|view| {
                        view.loading = false;
                        view.images.clear();
                        view.is_truncated = false;
                        view.error = Some(e.clone());
                    });
                }
                Err(e)
            }
        }
    }

    /// Reload whenever the session becomes usable or switches bucket.
    ///
    /// Driven by the session's status broadcast, with a status check every
    /// `poll_interval` as a fallback. The task runs until aborted.
    pub fn watch_configuration(self: &Arc<Self>, poll_interval: Duration) -> JoinHandle<()> {
        let workflow = Arc::clone(self);
        let mut status_rx = self.session.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut seen: (bool, Option<String>) = (false, None);

            loop {
                tokio::select! {
                    changed = status_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {}
                }

                let status = workflow.session.status();
                let current = (status.initialized, status.bucket.clone());
                if current == seen {
                    continue;
                }
                seen = current;

                if status.initialized {
                    info!(bucket = ?status.bucket, "Storage configured; reloading gallery");
                    let _ = workflow.load().await;
                } else {
                    workflow.load_seq.fetch_add(1, Ordering::SeqCst);
                    workflow.view_tx.send_modify(|view| {
                        view.initialized = false;
                        view.images.clear();
                        view.is_truncated = false;
                    });
                }
            }
        })
    }

    async fn fetch(
        &self,
        prefix: &str,
        initialized: bool,
    ) -> Result<(Vec<ObjectSummary>, bool), GalleryError> {
        if !initialized {
            return Err(GalleryError::not_configured());
        }

        let listing = self
            .session
            .list_files(prefix)
            .await
            .map_err(|e| GalleryError::from(&e))?;

        let mut entries: Vec<ObjectEntry> = listing
            .entries
            .into_iter()
            .filter(|entry| is_image_key(&entry.key))
            .collect();
        sort_newest_first(&mut entries);

        let urls = try_join_all(
            entries
                .iter()
                .map(|entry| self.session.file_url(&entry.key, None)),
        )
        .await
        .map_err(|e| GalleryError::from(&e))?;

        let images = entries
            .into_iter()
            .zip(urls)
            .map(|(entry, url)| ObjectSummary {
                key: entry.key,
                last_modified: entry.last_modified,
                url,
            })
            .collect();

        Ok((images, listing.is_truncated))
    }
}

/// Stable sort, newest first. Entries without a timestamp go last.
fn sort_newest_first(entries: &mut [ObjectEntry]) {
    entries.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use gallery_models::StorageConfig;
    use gallery_storage::error::codes;
    use gallery_storage::{Gateway, MemoryConnector, MemoryStore, Operation};

    use super::*;
    use crate::persist::MemoryConfigStore;

    fn config() -> StorageConfig {
        StorageConfig::new("AKIAEXAMPLE", "secret", "us-east-1", "photos")
    }

    fn setup(configured: bool) -> (Arc<GalleryWorkflow>, Arc<SessionManager>, Arc<MemoryStore>) {
        let objects = Arc::new(MemoryStore::new().with_bucket("photos"));
        let session = Arc::new(SessionManager::new(
            Gateway::new(MemoryConnector::new(Arc::clone(&objects))),
            Arc::new(MemoryConfigStore::new()),
        ));
        if configured {
            assert!(session.configure(&config(), false));
        }
        (GalleryWorkflow::new(Arc::clone(&session)), session, objects)
    }

    fn seed(objects: &MemoryStore, key: &str, minute: u32) {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap();
        objects.insert_object("photos", key, "image/jpeg", vec![0u8; 4], ts);
    }

    fn keys(images: &[ObjectSummary]) -> Vec<&str> {
        images.iter().map(|image| image.key.as_str()).collect()
    }

    #[tokio::test]
    async fn test_filters_non_images() {
        let (gallery, _, objects) = setup(true);
        seed(&objects, "a.jpg", 1);
        seed(&objects, "b.pdf", 2);
        seed(&objects, "c.PNG", 3);

        let images = gallery.load().await.unwrap().images;
        let mut listed = keys(&images);
        listed.sort();
        assert_eq!(listed, vec!["a.jpg", "c.PNG"]);
    }

    #[tokio::test]
    async fn test_orders_newest_first() {
        let (gallery, _, objects) = setup(true);
        seed(&objects, "old.jpg", 1);
        seed(&objects, "new.jpg", 2);

        let images = gallery.load().await.unwrap().images;
        assert_eq!(keys(&images), vec!["new.jpg", "old.jpg"]);
        assert_eq!(gallery.view().images, images);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let entry = |key: &str, last_modified| ObjectEntry {
            key: key.to_string(),
            last_modified,
            size: 0,
        };
        let mut entries = vec![
            entry("undated.jpg", None),
            entry("b.jpg", Some(ts)),
            entry("a.jpg", Some(ts)),
        ];
        sort_newest_first(&mut entries);

        let order: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(order, vec!["b.jpg", "a.jpg", "undated.jpg"]);
    }

    #[tokio::test]
    async fn test_each_image_gets_signed_url() {
        let (gallery, _, objects) = setup(true);
        seed(&objects, "x.gif", 1);

        let images = gallery.load().await.unwrap().images;
        assert_eq!(images[0].url, "memory://photos/x.gif?X-Amz-Expires=3600");
    }

    #[tokio::test]
    async fn test_unconfigured_load() {
        let (gallery, _, objects) = setup(false);

        let err = gallery.load().await.unwrap_err();
        assert_eq!(err, GalleryError::not_configured());
        assert_eq!(objects.call_count(), 0);
        assert!(!gallery.view().initialized);
    }

    #[tokio::test]
    async fn test_missing_bucket_message() {
        let (gallery, _, objects) = setup(true);
        objects.fail_next(Operation::List, codes::NO_SUCH_BUCKET);

        let err = gallery.load().await.unwrap_err();
        assert_eq!(err.kind, GalleryErrorKind::BucketMissing);
        assert_eq!(
            err.message,
            "The specified bucket does not exist. Please verify your configuration."
        );
        assert_eq!(gallery.view().error, Some(err));

        assert!(gallery.retry().await.is_ok());
        assert_eq!(gallery.view().error, None);
    }

    #[tokio::test]
    async fn test_signing_failure_fails_the_load() {
        let (gallery, _, objects) = setup(true);
        seed(&objects, "a.jpg", 1);
        objects.fail_next(Operation::SignUrl, codes::ACCESS_DENIED);

        let err = gallery.load().await.unwrap_err();
        assert_eq!(err.kind, GalleryErrorKind::AccessDenied);
        assert!(gallery.view().images.is_empty());
    }

    #[tokio::test]
    async fn test_prefix_change_relists() {
        let (gallery, _, objects) = setup(true);
        seed(&objects, "2023/a.jpg", 1);
        seed(&objects, "2024/b.jpg", 2);

        let images = gallery.set_prefix("2024/").await.unwrap().images;
        assert_eq!(keys(&images), vec!["2024/b.jpg"]);
        let calls = objects.call_count();

        let again = gallery.set_prefix("2024/").await.unwrap();
        assert_eq!(again.images, images);
        assert_eq!(objects.call_count(), calls);

        let images = gallery.set_prefix("2023/").await.unwrap().images;
        assert_eq!(keys(&images), vec!["2023/a.jpg"]);
        assert_eq!(gallery.prefix(), "2023/");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reloads_once_configured() {
        let (gallery, session, objects) = setup(false);
        seed(&objects, "cat.jpg", 1);
        let watcher = gallery.watch_configuration(DEFAULT_POLL_INTERVAL);
        let mut view_rx = gallery.subscribe();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(gallery.view().images.is_empty());

        assert!(session.configure(&config(), false));
        view_rx
            .wait_for(|view| !view.loading && view.images.len() == 1)
            .await
            .unwrap();
        assert!(gallery.view().initialized);

        session.clear_configuration();
        view_rx
            .wait_for(|view| !view.initialized)
            .await
            .unwrap();
        assert!(gallery.view().images.is_empty());

        watcher.abort();
    }
}
