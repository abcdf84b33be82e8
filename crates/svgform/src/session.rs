//! The field-binding pipeline: scan → (render) → resolve → synchronize.

use crate::load::{DocumentFetcher, DocumentSource, LoadError, load_document};
use serde_json::Value;
use svgform_core::{FormConfig, MatchRule, RuleProblem, ScanOptions, ScanResult, scan};
use svgform_overlay::{
    Diagnostics, DocumentChange, FieldValues, FormHost, OverlayKey, OverlayOptions,
    OverlaySynchronizer, OverlayView, RenderedDocument, ResolvedField, SyncError, SyncReport,
    resolve_fields,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// One form bound to one diagram.
///
/// The session reflects only the most recently completed load. Rendering is the host's job:
/// after `load_text` the host renders the document and hands it back through
/// [`FormSession::attach`].
pub struct FormSession<V: OverlayView> {
    config: FormConfig,
    rules: Vec<MatchRule>,
    problems: Vec<RuleProblem>,
    scan: Option<ScanResult>,
    load_error: Option<LoadError>,
    fields: Vec<ResolvedField>,
    synchronizer: OverlaySynchronizer<V>,
}

impl<V: OverlayView> FormSession<V> {
    pub fn new(config: FormConfig, view: V, options: OverlayOptions) -> Self {
        let compiled = config.compile();
        if !compiled.is_valid() {
            tracing::warn!(
                problems = compiled.problems.len(),
                "invalid rules were skipped"
            );
        }
        Self {
            config,
            rules: compiled.rules,
            problems: compiled.problems,
            scan: None,
            load_error: None,
            fields: Vec::new(),
            synchronizer: OverlaySynchronizer::new(view, options),
        }
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    pub fn rules(&self) -> &[MatchRule] {
        &self.rules
    }

    pub fn problems(&self) -> &[RuleProblem] {
        &self.problems
    }

    pub fn scan_result(&self) -> Option<&ScanResult> {
        self.scan.as_ref()
    }

    /// Fields of the last resolve pass.
    pub fn fields(&self) -> &[ResolvedField] {
        &self.fields
    }

    pub fn synchronizer(&self) -> &OverlaySynchronizer<V> {
        &self.synchronizer
    }

    pub fn view(&self) -> &V {
        self.synchronizer.view()
    }

    /// Every problem to show the user: rule problems, then the load or scan errors.
    pub fn errors(&self) -> Vec<String> {
        let mut out: Vec<String> = self.problems.iter().map(ToString::to_string).collect();
        if let Some(err) = &self.load_error {
            out.push(err.to_string());
        }
        if let Some(scan) = &self.scan {
            out.extend(scan.error_messages());
        }
        out
    }

    fn scan_options(&self) -> ScanOptions {
        self.config.scan_options()
    }

    /// Scans `text`, replacing whatever the previous load produced.
    pub fn load_text(&mut self, text: &str) -> &ScanResult {
        self.load_error = None;
        let result = scan(text, &self.rules, &self.scan_options());
        tracing::debug!(
            dialect = %result.metadata.dialect,
            mappings = result.mappings.len(),
            errors = result.errors.len(),
            "document loaded"
        );
        self.scan.insert(result)
    }

    /// Loads from `source`. A failed fetch is terminal for this attempt: the previous scan is
    /// dropped rather than kept around as a partial result.
    pub async fn load<F>(&mut self, source: &DocumentSource, fetcher: &F) -> Result<&ScanResult>
    where
        F: DocumentFetcher + ?Sized,
    {
        match load_document(source, fetcher).await {
            Ok(text) => Ok(self.load_text(&text)),
            Err(err) => {
                tracing::warn!(error = %err, "document load failed");
                self.scan = None;
                self.load_error = Some(err.clone());
                Err(err.into())
            }
        }
    }

    /// The host rendered (or re-rendered) the loaded document: every overlay is rebuilt.
    pub fn attach<D, H>(&mut self, document: &D, host: &mut H) -> SyncReport
    where
        D: RenderedDocument + ?Sized,
        H: FormHost + ?Sized,
    {
        self.resolve_and_sync(document, DocumentChange::Replaced, host)
    }

    /// Same rendered document, geometry may have moved: overlays are repositioned in place.
    pub fn refresh<D, H>(&mut self, document: &D, host: &mut H) -> SyncReport
    where
        D: RenderedDocument + ?Sized,
        H: FormHost + ?Sized,
    {
        self.resolve_and_sync(document, DocumentChange::Unchanged, host)
    }

    fn resolve_and_sync<D, H>(
        &mut self,
        document: &D,
        change: DocumentChange,
        host: &mut H,
    ) -> SyncReport
    where
        D: RenderedDocument + ?Sized,
        H: FormHost + ?Sized,
    {
        let mappings = self
            .scan
            .as_ref()
            .map(|scan| scan.mappings.as_slice())
            .unwrap_or_default();
        self.fields = resolve_fields(document, mappings, &self.config.conventions);
        let report = self.synchronizer.sync(&self.fields, change, host);

        let mut errors = self.errors();
        errors.extend(report.errors.iter().cloned());
        let diagnostics = Diagnostics::collect(
            &self.fields,
            self.scan.as_ref().map(|scan| scan.metadata.dialect),
            document.dimensions(),
            errors,
        );
        host.on_diagnostics(&diagnostics);
        report
    }

    /// Applies a value typed into an input overlay.
    pub fn set_input<H>(&mut self, key: &OverlayKey, value: Value, host: &mut H) -> Result<()>
    where
        H: FormHost + ?Sized,
    {
        Ok(self.synchronizer.handle_input(key, value, host)?)
    }

    /// Replaces the input state from the host side.
    pub fn set_values<H>(&mut self, values: FieldValues, host: &mut H)
    where
        H: FormHost + ?Sized,
    {
        self.synchronizer.set_values(values, host);
    }

    pub fn inputs(&self) -> &FieldValues {
        self.synchronizer.inputs()
    }

    pub fn outputs(&self) -> &FieldValues {
        self.synchronizer.outputs()
    }

    /// Unmounts every overlay.
    pub fn close(&mut self) -> SyncReport {
        self.fields.clear();
        self.synchronizer.teardown()
    }
}
