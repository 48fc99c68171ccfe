//! The scanner's view of a sandboxed document.
//!
//! The scanner only observes the page; it has no privileged API. [`Dom`] is
//! the seam a page binding implements, and [`MemoryDocument`] is the
//! in-process document used by [`SandboxPage`](super::SandboxPage).

// ============================================================================
// Imports
// ============================================================================

use crate::identifiers::{FieldId, FormId};
use crate::protocol::Geometry;

// ============================================================================
// InputKind
// ============================================================================

/// The `type` attribute of an input, as far as detection cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// `text`, or no type at all.
    Text,
    /// `email`
    Email,
    /// `tel`
    Tel,
    /// `password`
    Password,
    /// Anything else (`checkbox`, `hidden`, `submit`, …).
    Other(String),
}

impl InputKind {
    /// Parses a `type` attribute value the way browsers do (case-insensitive,
    /// missing means text).
    #[must_use]
    pub fn from_attribute(value: Option<&str>) -> Self {
        let value = value.map(str::trim).unwrap_or_default().to_ascii_lowercase();
        match value.as_str() {
            "" | "text" => Self::Text,
            "email" => Self::Email,
            "tel" => Self::Tel,
            "password" => Self::Password,
            _ => Self::Other(value),
        }
    }

    /// Returns `true` for the kinds a username may live in.
    #[inline]
    #[must_use]
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Text | Self::Email | Self::Tel)
    }
}

// ============================================================================
// InputSnapshot
// ============================================================================

/// Attributes of one connected input element at scan time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSnapshot {
    /// Element reference.
    pub field: FieldId,
    /// Parsed `type`.
    pub kind: InputKind,
    /// `name` attribute.
    pub name: String,
    /// `id` attribute.
    pub html_id: String,
    /// `placeholder` attribute.
    pub placeholder: String,
    /// `autocomplete` attribute.
    pub autocomplete: String,
    /// Enclosing form, if any.
    pub form: Option<FormId>,
}

// ============================================================================
// Dom
// ============================================================================

/// Read access to a page, plus the one write the scanner performs.
pub trait Dom {
    /// Absolute URL of the document.
    fn location(&self) -> &str;

    /// Connected input elements in document order.
    fn inputs(&self) -> Vec<InputSnapshot>;

    /// The input that currently has focus.
    fn active_field(&self) -> Option<FieldId>;

    /// Bounding rectangle of a field in surface-local coordinates, or
    /// `None` if it is no longer in the document.
    fn field_rect(&self, field: FieldId) -> Option<Geometry>;

    /// Writes a value into a field. Returns `false` if the field is gone.
    fn set_field_value(&mut self, field: FieldId, value: &str) -> bool;
}

// ============================================================================
// InputSpec
// ============================================================================

/// Description of an input to add to a [`MemoryDocument`].
#[derive(Debug, Clone, Default)]
pub struct InputSpec {
    input_type: Option<String>,
    name: Option<String>,
    html_id: Option<String>,
    placeholder: Option<String>,
    autocomplete: Option<String>,
    rect: Geometry,
}

impl InputSpec {
    /// An input with the given `type` attribute.
    #[must_use]
    pub fn of_type(input_type: impl Into<String>) -> Self {
        Self {
            input_type: Some(input_type.into()),
            ..Self::default()
        }
    }

    /// `<input type="text">`
    #[must_use]
    pub fn text() -> Self {
        Self::of_type("text")
    }

    /// `<input type="password">`
    #[must_use]
    pub fn password() -> Self {
        Self::of_type("password")
    }

    /// Sets `name`.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets `id`.
    #[must_use]
    pub fn html_id(mut self, id: impl Into<String>) -> Self {
        self.html_id = Some(id.into());
        self
    }

    /// Sets `placeholder`.
    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Sets `autocomplete`.
    #[must_use]
    pub fn autocomplete(mut self, autocomplete: impl Into<String>) -> Self {
        self.autocomplete = Some(autocomplete.into());
        self
    }

    /// Sets the layout rectangle.
    #[must_use]
    pub fn rect(mut self, rect: Geometry) -> Self {
        self.rect = rect;
        self
    }
}

// ============================================================================
// MemoryDocument
// ============================================================================

#[derive(Debug, Clone)]
struct MemoryInput {
    field: FieldId,
    form: Option<FormId>,
    spec: InputSpec,
    value: String,
}

/// A minimal in-memory document: inputs, forms, focus and values.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    url: String,
    ready: bool,
    inputs: Vec<MemoryInput>,
    next_field: u32,
    next_form: u32,
    focused: Option<FieldId>,
}

impl MemoryDocument {
    /// Creates an empty, not-yet-ready document at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ready: false,
            inputs: Vec::new(),
            next_field: 1,
            next_form: 1,
            focused: None,
        }
    }

    /// Adds a form element.
    pub fn add_form(&mut self) -> FormId {
        let form = FormId::new(self.next_form);
        self.next_form += 1;
        form
    }

    /// Appends an input at the end of the document.
    pub fn add_input(&mut self, spec: InputSpec, form: Option<FormId>) -> FieldId {
        let field = FieldId::new(self.next_field);
        self.next_field += 1;
        self.inputs.push(MemoryInput {
            field,
            form,
            spec,
            value: String::new(),
        });
        field
    }

    /// Detaches an input. Returns `false` if it was not present.
    pub fn remove_input(&mut self, field: FieldId) -> bool {
        let before = self.inputs.len();
        self.inputs.retain(|input| input.field != field);
        if self.focused == Some(field) {
            self.focused = None;
        }
        self.inputs.len() != before
    }

    /// Current value of an input.
    #[must_use]
    pub fn value(&self, field: FieldId) -> Option<&str> {
        self.find(field).map(|input| input.value.as_str())
    }

    /// Moves focus to `field`. Returns `false` if it is not present.
    pub fn focus(&mut self, field: FieldId) -> bool {
        if self.find(field).is_some() {
            self.focused = Some(field);
            true
        } else {
            false
        }
    }

    /// Clears focus.
    pub fn blur(&mut self) {
        self.focused = None;
    }

    /// Marks the document as ready (`DOMContentLoaded`).
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Returns `true` once the document is ready.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    fn find(&self, field: FieldId) -> Option<&MemoryInput> {
        self.inputs.iter().find(|input| input.field == field)
    }
}

impl Dom for MemoryDocument {
    fn location(&self) -> &str {
        &self.url
    }

    fn inputs(&self) -> Vec<InputSnapshot> {
        self.inputs
            .iter()
            .map(|input| InputSnapshot {
                field: input.field,
                kind: InputKind::from_attribute(input.spec.input_type.as_deref()),
                name: input.spec.name.clone().unwrap_or_default(),
                html_id: input.spec.html_id.clone().unwrap_or_default(),
                placeholder: input.spec.placeholder.clone().unwrap_or_default(),
                autocomplete: input.spec.autocomplete.clone().unwrap_or_default(),
                form: input.form,
            })
            .collect()
    }

    fn active_field(&self) -> Option<FieldId> {
        self.focused
    }

    fn field_rect(&self, field: FieldId) -> Option<Geometry> {
        self.find(field).map(|input| input.spec.rect)
    }

    fn set_field_value(&mut self, field: FieldId, value: &str) -> bool {
        match self.inputs.iter_mut().find(|input| input.field == field) {
            Some(input) => {
                input.value = value.to_string();
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
