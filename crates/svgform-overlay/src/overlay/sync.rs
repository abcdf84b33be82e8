use super::plan::{OverlayEffect, OverlaySnapshot, plan_overlays};
use super::view::{ControlKind, ControlUpdate, MountRequest, OverlayView};
use super::OverlayKey;
use crate::error::SyncError;
use crate::geom::Rect;
use crate::host::{FieldValues, FormHost};
use crate::resolve::ResolvedField;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use svgform_core::FieldType;

/// Which field types get the host's custom renderer instead of the default control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayOptions {
    pub custom_input: bool,
    pub custom_output: bool,
}

impl OverlayOptions {
    fn control_for(self, field_type: FieldType) -> ControlKind {
        let custom = match field_type {
            FieldType::Input => self.custom_input,
            FieldType::Output => self.custom_output,
        };
        if custom {
            ControlKind::Custom
        } else {
            ControlKind::Default
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentChange {
    /// Same rendered document; geometry may have moved.
    Unchanged,
    /// The rendered document was replaced; every overlay is rebuilt.
    Replaced,
}

/// Outcome of one synchronization pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub rebuilt: bool,
    pub created: usize,
    pub repositioned: usize,
    pub destroyed: usize,
    /// Overlays that fell back to the default control.
    pub fallbacks: Vec<OverlayKey>,
    /// Swallowed view-layer failures.
    pub errors: Vec<String>,
}

struct Mounted<H> {
    handle: H,
    control: ControlKind,
    field: ResolvedField,
    rect: Rect,
}

/// Owns the live overlays and keeps them in step with resolved geometry and field values.
pub struct OverlaySynchronizer<V: OverlayView> {
    view: V,
    options: OverlayOptions,
    snapshot: OverlaySnapshot,
    mounted: IndexMap<OverlayKey, Mounted<V::Handle>>,
    inputs: FieldValues,
    outputs: FieldValues,
}

impl<V: OverlayView> OverlaySynchronizer<V> {
    pub fn new(view: V, options: OverlayOptions) -> Self {
        Self {
            view,
            options,
            snapshot: OverlaySnapshot::default(),
            mounted: IndexMap::new(),
            inputs: FieldValues::new(),
            outputs: FieldValues::new(),
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn inputs(&self) -> &FieldValues {
        &self.inputs
    }

    pub fn outputs(&self) -> &FieldValues {
        &self.outputs
    }

    /// Keys of mounted overlays, in mount order.
    pub fn keys(&self) -> impl Iterator<Item = &OverlayKey> {
        self.mounted.keys()
    }

    pub fn is_mounted(&self, key: &OverlayKey) -> bool {
        self.mounted.contains_key(key)
    }

    pub fn control_kind(&self, key: &OverlayKey) -> Option<ControlKind> {
        self.mounted.get(key).map(|m| m.control)
    }

    pub fn rect(&self, key: &OverlayKey) -> Option<Rect> {
        self.mounted.get(key).map(|m| m.rect)
    }

    /// Reconciles the live overlays with `fields`.
    ///
    /// Tear-down of stale overlays always completes before any new overlay of the same pass is
    /// mounted. View failures never abort the pass: they are logged, reported, and the affected
    /// overlay alone is skipped or falls back to the default control.
    pub fn sync<H: FormHost + ?Sized>(
        &mut self,
        fields: &[ResolvedField],
        change: DocumentChange,
        host: &mut H,
    ) -> SyncReport {
        let plan = plan_overlays(&self.snapshot, fields, change == DocumentChange::Replaced);
        let mut report = SyncReport {
            rebuilt: plan.rebuild,
            ..SyncReport::default()
        };

        if plan.rebuild {
            self.outputs = host.compute_outputs(&self.inputs);
        }

        for effect in plan.effects {
            match effect {
                OverlayEffect::Destroy(key) => {
                    if self.destroy(&key, &mut report) {
                        report.destroyed += 1;
                    }
                }
                OverlayEffect::Reposition { key, rect } => {
                    let Some(mounted) = self.mounted.get_mut(&key) else {
                        continue;
                    };
                    if let Err(err) = self.view.update(&mounted.handle, ControlUpdate::Position(rect)) {
                        tracing::warn!(overlay = %key, error = %err, "failed to reposition overlay");
                        report.errors.push(format!("{key}: {err}"));
                    }
                    mounted.rect = rect;
                    mounted.field.rect = Some(rect);
                    report.repositioned += 1;
                }
                OverlayEffect::Create { key, index, rect } => {
                    if self.mount(key, &fields[index], rect, &mut report) {
                        report.created += 1;
                    }
                }
            }
        }

        let mut next = plan.next;
        next.placed.retain(|key, _| self.mounted.contains_key(key));
        self.snapshot = next;

        tracing::debug!(
            rebuilt = report.rebuilt,
            created = report.created,
            repositioned = report.repositioned,
            destroyed = report.destroyed,
            fallbacks = report.fallbacks.len(),
            "overlays synchronized"
        );
        report
    }

    /// Applies a value typed into the input overlay `origin`.
    ///
    /// The value is mirrored into every other input overlay of the same name, reported to the
    /// host, and outputs are recomputed.
    pub fn handle_input<H: FormHost + ?Sized>(
        &mut self,
        origin: &OverlayKey,
        value: Value,
        host: &mut H,
    ) -> Result<(), SyncError> {
        if !self.mounted.contains_key(origin) {
            return Err(SyncError::UnknownOverlay(origin.clone()));
        }
        if origin.field_type != FieldType::Input {
            return Err(SyncError::NotAnInput(origin.clone()));
        }

        self.inputs.insert(origin.name.clone(), value.clone());
        let mirrors: Vec<OverlayKey> = self
            .mounted
            .keys()
            .filter(|k| k.field_type == FieldType::Input && k.name == origin.name && *k != origin)
            .cloned()
            .collect();
        for key in mirrors {
            self.push_value(&key, Some(&value));
        }

        host.on_field_change(&origin.name, &value, &self.inputs);
        self.recompute_outputs(host);
        Ok(())
    }

    /// Replaces the input state wholesale. Host-originated, so `on_field_change` is not fired.
    pub fn set_values<H: FormHost + ?Sized>(&mut self, values: FieldValues, host: &mut H) {
        self.inputs = values;
        let keys: Vec<OverlayKey> = self
            .mounted
            .keys()
            .filter(|k| k.field_type == FieldType::Input)
            .cloned()
            .collect();
        for key in keys {
            let value = self.inputs.get(&key.name).cloned();
            self.push_value(&key, value.as_ref());
        }
        self.recompute_outputs(host);
    }

    /// Unmounts every overlay and forgets the previous pass.
    pub fn teardown(&mut self) -> SyncReport {
        let mut report = SyncReport::default();
        let keys: Vec<OverlayKey> = self.mounted.keys().cloned().collect();
        for key in keys {
            if self.destroy(&key, &mut report) {
                report.destroyed += 1;
            }
        }
        self.snapshot = OverlaySnapshot::default();
        report
    }

    pub fn into_view(mut self) -> V {
        self.teardown();
        self.view
    }

    fn recompute_outputs<H: FormHost + ?Sized>(&mut self, host: &mut H) {
        self.outputs = host.compute_outputs(&self.inputs);
        let keys: Vec<OverlayKey> = self
            .mounted
            .keys()
            .filter(|k| k.field_type == FieldType::Output)
            .cloned()
            .collect();
        for key in keys {
            let value = self.outputs.get(&key.name).cloned();
            self.push_value(&key, value.as_ref());
        }
    }

    fn destroy(&mut self, key: &OverlayKey, report: &mut SyncReport) -> bool {
        let Some(mounted) = self.mounted.shift_remove(key) else {
            return false;
        };
        if let Err(err) = self.view.unmount(mounted.handle) {
            tracing::warn!(overlay = %key, error = %err, "failed to unmount overlay");
            report.errors.push(format!("{key}: {err}"));
        }
        true
    }

    fn mount(
        &mut self,
        key: OverlayKey,
        field: &ResolvedField,
        rect: Rect,
        report: &mut SyncReport,
    ) -> bool {
        let value = match key.field_type {
            FieldType::Input => self.inputs.get(&key.name),
            FieldType::Output => self.outputs.get(&key.name),
        };
        let mut control = self.options.control_for(key.field_type);
        let mut request = MountRequest {
            key: &key,
            field,
            rect,
            value,
            control,
        };

        let result = match self.view.mount(request) {
            Err(err) if control == ControlKind::Custom => {
                tracing::warn!(overlay = %key, error = %err, "custom renderer failed, using default control");
                report.errors.push(format!("{key}: {err}"));
                report.fallbacks.push(key.clone());
                control = ControlKind::Default;
                request.control = control;
                self.view.mount(request)
            }
            other => other,
        };

        match result {
            Ok(handle) => {
                self.mounted.insert(
                    key,
                    Mounted {
                        handle,
                        control,
                        field: field.clone(),
                        rect,
                    },
                );
                true
            }
            Err(err) => {
                tracing::warn!(overlay = %key, error = %err, "failed to mount overlay");
                report.errors.push(format!("{key}: {err}"));
                false
            }
        }
    }

    /// Pushes a value into one control. A custom control that rejects the update is replaced by
    /// the default control, mounted with the same geometry and value.
    fn push_value(&mut self, key: &OverlayKey, value: Option<&Value>) {
        let Some(mounted) = self.mounted.get(key) else {
            return;
        };
        let Err(err) = self.view.update(&mounted.handle, ControlUpdate::Value(value)) else {
            return;
        };
        tracing::warn!(overlay = %key, error = %err, "failed to update overlay value");
        if mounted.control != ControlKind::Custom {
            return;
        }

        let Some(stale) = self.mounted.shift_remove(key) else {
            return;
        };
        if let Err(err) = self.view.unmount(stale.handle) {
            tracing::warn!(overlay = %key, error = %err, "failed to unmount overlay");
        }
        let request = MountRequest {
            key,
            field: &stale.field,
            rect: stale.rect,
            value,
            control: ControlKind::Default,
        };
        match self.view.mount(request) {
            Ok(handle) => {
                self.mounted.insert(
                    key.clone(),
                    Mounted {
                        handle,
                        control: ControlKind::Default,
                        field: stale.field,
                        rect: stale.rect,
                    },
                );
            }
            Err(err) => {
                tracing::warn!(overlay = %key, error = %err, "failed to mount default control");
                self.snapshot.placed.shift_remove(key);
            }
        }
    }
}
