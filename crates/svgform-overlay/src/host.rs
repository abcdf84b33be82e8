//! Host callbacks.

use crate::diagnostics::Diagnostics;
use indexmap::IndexMap;
use serde_json::Value;

/// Field values by field name, in insertion order.
pub type FieldValues = IndexMap<String, Value>;

/// Callbacks into the application hosting the form. All methods have no-op defaults.
pub trait FormHost {
    /// An input control changed. `all` already contains the new value.
    fn on_field_change(&mut self, name: &str, value: &Value, all: &FieldValues) {
        let _ = (name, value, all);
    }

    /// Derives output values from the current inputs. Called whenever inputs change and again
    /// whenever the field set is rebuilt; it should be a pure function of `inputs`.
    fn compute_outputs(&mut self, inputs: &FieldValues) -> FieldValues {
        let _ = inputs;
        FieldValues::new()
    }

    fn on_diagnostics(&mut self, diagnostics: &Diagnostics) {
        let _ = diagnostics;
    }
}

/// A host that ignores every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHost;

impl FormHost for NoopHost {}

impl<H: FormHost + ?Sized> FormHost for &mut H {
    fn on_field_change(&mut self, name: &str, value: &Value, all: &FieldValues) {
        (**self).on_field_change(name, value, all);
    }

    fn compute_outputs(&mut self, inputs: &FieldValues) -> FieldValues {
        (**self).compute_outputs(inputs)
    }

    fn on_diagnostics(&mut self, diagnostics: &Diagnostics) {
        (**self).on_diagnostics(diagnostics);
    }
}
