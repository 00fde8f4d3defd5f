//! Serialized entry points over one document.
//!
//! DESIGN
//! ======
//! `WidgetEngine` owns the document host behind a `tokio::sync::Mutex`. Every
//! public operation takes the lock for its whole duration, so a push event
//! and the polling fallback can both call [`WidgetEngine::sync_all`] without
//! interleaving their writes. Animation frames run while the lock is held.
//!
//! The shape-kind resolver is shared (`Arc`) so fallbacks learned by one
//! engine carry over to another engine on the same host type.
//!
//! ERROR HANDLING
//! ==============
//! Explicit actions (`insert_widget`, `set_binding`) return [`WidgetError`].
//! Reconciliation never fails because of one page: per-page failures land in
//! the [`TickReport`]. A failed flush for one kind is logged by `sync_all`
//! and the remaining kinds still run.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::binding::{DocumentBinding, bind_page};
use crate::capability::ShapeKindResolver;
use crate::config::EngineConfig;
use crate::drivers::{self, InsertRequest, SyncContext, TickReport};
use crate::error::WidgetError;
use crate::host::{DocumentHost, HostError, PageId};
use crate::kind::WidgetKind;

pub struct WidgetEngine<H> {
    host: Mutex<H>,
    resolver: Arc<ShapeKindResolver>,
    frame_delay: Duration,
}

impl<H: DocumentHost> WidgetEngine<H> {
    #[must_use]
    pub fn new(host: H, config: &EngineConfig) -> Self {
        Self::with_resolver(host, Arc::new(ShapeKindResolver::new()), config.frame_delay)
    }

    #[must_use]
    pub fn with_resolver(host: H, resolver: Arc<ShapeKindResolver>, frame_delay: Duration) -> Self {
        Self { host: Mutex::new(host), resolver, frame_delay }
    }

    #[must_use]
    pub fn resolver(&self) -> &Arc<ShapeKindResolver> {
        &self.resolver
    }

    /// Run `f` with exclusive access to the host.
    pub async fn with_host<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        let mut host = self.host.lock().await;
        f(&mut *host)
    }

    pub fn into_host(self) -> H {
        self.host.into_inner()
    }

    // =========================================================================
    // EXPLICIT ACTIONS
    // =========================================================================

    /// Insert a `kind` widget on the selected page, replacing any widget of
    /// the same kind already there. Returns the page.
    ///
    /// # Errors
    ///
    /// [`WidgetError::NoSelectedPage`], or a host failure (partially created
    /// shapes are removed first).
    pub async fn insert_widget(&self, kind: WidgetKind, request: InsertRequest<'_>) -> Result<PageId, WidgetError> {
        let mut host = self.host.lock().await;
        let page = host.selected_page().ok_or(WidgetError::NoSelectedPage)?;
        let host = &mut *host;
        let resolver = self.resolver.as_ref();
        let shapes = match kind {
            WidgetKind::Qna | WidgetKind::Discussion => {
                drivers::qna::insert(host, resolver, &page, kind, &request)?.shape_ids().len()
            }
            WidgetKind::Poll => drivers::poll::insert(host, resolver, &page, &request)?.shape_ids().len(),
            WidgetKind::WordCloud => drivers::word_cloud::insert(host, resolver, &page, &request)?.shape_ids().len(),
        };
        host.flush().await?;
        info!(%kind, page = %page, shapes, session_id = ?request.session_id, "widget inserted");
        Ok(page)
    }

    /// Bind the `kind` widget on the selected page to `session_id` and
    /// optionally a resource (prompt, poll or cloud id). Returns the page.
    ///
    /// # Errors
    ///
    /// [`WidgetError::NoSelectedPage`], [`WidgetError::NoWidget`], or a host
    /// failure.
    pub async fn set_binding(
        &self,
        kind: WidgetKind,
        session_id: &str,
        resource_id: Option<&str>,
    ) -> Result<PageId, WidgetError> {
        let mut host = self.host.lock().await;
        let page = host.selected_page().ok_or(WidgetError::NoSelectedPage)?;
        bind_page(&mut *host, &page, kind, session_id, resource_id)?;
        host.flush().await?;
        info!(%kind, page = %page, session_id, resource_id, "widget bound");
        Ok(page)
    }

    pub async fn document_binding(&self) -> Option<DocumentBinding> {
        DocumentBinding::read(&*self.host.lock().await)
    }

    /// # Errors
    ///
    /// Host write or flush failures.
    pub async fn set_document_binding(&self, binding: &DocumentBinding) -> Result<(), HostError> {
        let mut host = self.host.lock().await;
        binding.write(&mut *host)?;
        host.flush().await
    }

    // =========================================================================
    // RECONCILIATION
    // =========================================================================

    /// Reconcile every widget of `kind` in the document.
    ///
    /// # Errors
    ///
    /// Only the kind's flush; page failures are in the report.
    pub async fn update_widget(&self, kind: WidgetKind, sync: &SyncContext<'_>) -> Result<TickReport, HostError> {
        let mut host = self.host.lock().await;
        self.update_locked(&mut *host, kind, sync).await
    }

    /// Reconcile every kind, one flush per kind.
    pub async fn sync_all(&self, sync: &SyncContext<'_>) -> TickReport {
        let mut host = self.host.lock().await;
        let mut report = TickReport::default();
        for kind in WidgetKind::ALL {
            match self.update_locked(&mut *host, kind, sync).await {
                Ok(kind_report) => report.merge(kind_report),
                Err(err) => warn!(%kind, error = %err, "flush failed; continuing with next kind"),
            }
        }
        if report.failed() > 0 {
            warn!(session_id = sync.session_id, failed = report.failed(), "tick finished with failed pages");
        }
        report
    }

    async fn update_locked(&self, host: &mut H, kind: WidgetKind, sync: &SyncContext<'_>) -> Result<TickReport, HostError> {
        match kind {
            WidgetKind::Qna | WidgetKind::Discussion => drivers::qna::update(host, kind, sync).await,
            WidgetKind::Poll => drivers::poll::update(host, sync).await,
            WidgetKind::WordCloud => drivers::word_cloud::update(host, &self.resolver, sync, self.frame_delay).await,
        }
    }
}
