//! Change gate - skips re-composition when the inputs of a render are unchanged.

use std::sync::Arc;

use crate::error::RenderError;
use crate::node::Node;
use crate::schema_field::{render, FormInputs};

/// Whether `next` needs a new composition after `prev`.
///
/// Compares every input structurally except the identity schema, which is
/// derived from the path and the schema. Registries compare by identity.
pub fn should_recompose(prev: &FormInputs, next: &FormInputs) -> bool {
    let FormInputs {
        schema,
        ui_schema,
        form_data,
        error_schema,
        id_schema: _,
        name,
        required,
        disabled,
        read_only,
        auto_focus,
        registry,
    } = prev;

    !(schema == &next.schema
        && ui_schema == &next.ui_schema
        && form_data == &next.form_data
        && error_schema == &next.error_schema
        && name == &next.name
        && required == &next.required
        && disabled == &next.disabled
        && read_only == &next.read_only
        && auto_focus == &next.auto_focus
        && Arc::ptr_eq(registry, &next.registry))
}

/// A form that re-renders only when [`should_recompose`] says so.
#[derive(Debug, Default)]
pub struct MemoizedForm {
    last: Option<(FormInputs, Node)>,
    renders: usize,
}

impl MemoizedForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `inputs`, reusing the previous tree when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` from the composition. The cached tree is dropped.
    pub fn render(&mut self, inputs: FormInputs) -> Result<&Node, RenderError> {
        match self.last.take() {
            Some((prev, node)) if !should_recompose(&prev, &inputs) => {
                log::debug!("inputs unchanged, reusing composed tree");
                let (_, node) = self.last.insert((inputs, node));
                Ok(node)
            }
            _ => {
                let node = render(&inputs)?;
                self.renders += 1;
                let (_, node) = self.last.insert((inputs, node));
                Ok(node)
            }
        }
    }

    /// Number of compositions performed so far.
    pub fn render_count(&self) -> usize {
        self.renders
    }
}
