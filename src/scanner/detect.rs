//! Login field detection and username inference.
//!
//! Pure functions over an [`InputSnapshot`] list, so the rules can be tested
//! without a page.

// ============================================================================
// Imports
// ============================================================================

use crate::identifiers::{FieldId, FormId};

use super::dom::{InputKind, InputSnapshot};

// ============================================================================
// Constants
// ============================================================================

/// Substrings that mark a text input as the username field.
pub const USERNAME_TOKENS: [&str; 3] = ["user", "email", "login"];

/// Autocomplete substring that marks a text input as a password field.
const PASSWORD_HINT: &str = "password";

// ============================================================================
// Types
// ============================================================================

/// Inferred role of a detected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Account name input.
    Username,
    /// Password input.
    Password,
}

/// Attribute a username token was found in. Checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedAttribute {
    /// `name`
    Name,
    /// `id`
    Id,
    /// `placeholder`
    Placeholder,
    /// `autocomplete`
    Autocomplete,
}

/// A detected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRecord {
    /// Element reference.
    pub field: FieldId,
    /// Inferred role.
    pub role: FieldRole,
    /// Discovery order within the scan.
    pub order: usize,
}

/// A password field and the username field inferred for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginPair {
    /// Password input.
    pub password: FieldId,
    /// Username input, if one was found.
    pub username: Option<FieldId>,
    /// Enclosing form of the password input.
    pub form: Option<FormId>,
}

/// Result of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    /// Every tracked field, each listed once.
    pub records: Vec<FieldRecord>,
    /// One entry per password field.
    pub pairs: Vec<LoginPair>,
}

impl Detection {
    /// Returns `true` if no login field was found.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns `true` if `field` is tracked.
    #[must_use]
    pub fn tracks(&self, field: FieldId) -> bool {
        self.records.iter().any(|record| record.field == field)
    }

    /// Returns the pair `field` belongs to.
    #[must_use]
    pub fn pair_for(&self, field: FieldId) -> Option<&LoginPair> {
        self.pairs
            .iter()
            .find(|pair| pair.password == field || pair.username == Some(field))
    }
}

// ============================================================================
// Detection
// ============================================================================

/// Finds password fields and their username fields.
#[must_use]
pub fn detect(inputs: &[InputSnapshot]) -> Detection {
    let mut detection = Detection::default();

    for password in inputs.iter().filter(|input| is_password_candidate(input)) {
        push_record(&mut detection, password.field, FieldRole::Password);

        let username = infer_username(inputs, password).map(|(field, _)| field);
        if let Some(field) = username {
            push_record(&mut detection, field, FieldRole::Username);
        }

        detection.pairs.push(LoginPair {
            password: password.field,
            username,
            form: password.form,
        });
    }

    detection
}

/// `type="password"`, or a text input whose autocomplete hint mentions
/// passwords.
#[must_use]
pub fn is_password_candidate(input: &InputSnapshot) -> bool {
    match input.kind {
        InputKind::Password => true,
        InputKind::Text => input
            .autocomplete
            .to_ascii_lowercase()
            .contains(PASSWORD_HINT),
        _ => false,
    }
}

/// Finds the username field for `password`.
///
/// Scans the password's form in document order, or the whole page when it
/// has no form, and returns the first textual input with a username token
/// in its name, id, placeholder or autocomplete.
#[must_use]
pub fn infer_username(
    inputs: &[InputSnapshot],
    password: &InputSnapshot,
) -> Option<(FieldId, MatchedAttribute)> {
    inputs
        .iter()
        .filter(|input| input.field != password.field)
        .filter(|input| input.kind.is_textual() && !is_password_candidate(input))
        .filter(|input| password.form.is_none() || input.form == password.form)
        .find_map(|input| username_match(input).map(|attribute| (input.field, attribute)))
}

/// Returns the first attribute of `input` carrying a username token.
#[must_use]
pub fn username_match(input: &InputSnapshot) -> Option<MatchedAttribute> {
    [
        (MatchedAttribute::Name, &input.name),
        (MatchedAttribute::Id, &input.html_id),
        (MatchedAttribute::Placeholder, &input.placeholder),
        (MatchedAttribute::Autocomplete, &input.autocomplete),
    ]
    .into_iter()
    .find(|(_, value)| contains_username_token(value))
    .map(|(attribute, _)| attribute)
}

fn contains_username_token(value: &str) -> bool {
    let value = value.to_ascii_lowercase();
    USERNAME_TOKENS.iter().any(|token| value.contains(token))
}

fn push_record(detection: &mut Detection, field: FieldId, role: FieldRole) {
    if detection.tracks(field) {
        return;
    }
    let order = detection.records.len();
    detection.records.push(FieldRecord { field, role, order });
}

// ============================================================================
// Tests
// ============================================================================
