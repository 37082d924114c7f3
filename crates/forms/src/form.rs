//! Form engine: one live form instance and its submission lifecycle.
//!
//! `Form<M>` is a cheap, cloneable handle (like a component's form hook)
//! around the state of exactly one form. `M` is the typed model the form
//! produces once validation passes; the model also supplies the schema, so
//! the field-name-to-type mapping is fixed at construction.
//!
//! Lifecycle of `submit`:
//!   1. Rejected as [`SubmitOutcome::Busy`] while another submit's action is
//!      still running, even if the form was reset since.
//!   2. Every field is marked touched and the schema validator runs.
//!   3. On validation errors: `Failed(Validation)`, no action is invoked.
//!   4. Otherwise `Submitting`, the caller's async action runs with the typed
//!      model, and its result becomes `Succeeded` / `Failed(Remote)` plus a
//!      notification.
//!
//! A `reset` while an action is in flight makes the late result stale: it is
//! discarded instead of overwriting the fresh state.

use std::fmt::Display;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use notify::{Notifier, Toast};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    FieldState, FieldValue, FormError, FormField, FormState, FormValues, Schema, Submission,
    SubmitFailure, ValidationErrors,
};

/// Typed view of a form's values.
pub trait FormModel: Sized + Send + 'static {
    /// Stable form identifier used in logs.
    const NAME: &'static str;

    fn schema() -> Schema;

    /// Build the model from values that already passed validation.
    fn from_values(values: &FormValues) -> Result<Self, FormError>;
}

/// Result of one `submit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Succeeded,
    /// Validation failed; the action was not called.
    Invalid(ValidationErrors),
    /// The action ran and failed with this message.
    Rejected(String),
    /// Another submission was still in flight; nothing happened.
    Busy,
    /// The form was reset while the action ran; its result was dropped.
    Discarded,
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Succeeded)
    }
}

struct Slot {
    state: FormState,
    // Bumped on every reset so late results of an older submission can be detected.
    epoch: u64,
    // Set while an action runs. Survives `reset`, unlike `state.submission`.
    in_flight: bool,
}

/// Clears `Slot::in_flight` when the action ends, also if the submit future is dropped.
struct InFlight<'a> {
    slot: &'a Mutex<Slot>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.slot.lock().in_flight = false;
    }
}

struct Inner {
    schema: Schema,
    slot: Mutex<Slot>,
    notifier: Notifier,
}

pub struct Form<M: FormModel> {
    inner: Arc<Inner>,
    _model: PhantomData<fn() -> M>,
}

impl<M: FormModel> Clone for Form<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _model: PhantomData,
        }
    }
}

impl<M: FormModel> Form<M> {
    pub fn new(notifier: Notifier) -> Self {
        let schema = M::schema();
        let state = FormState::from_schema(&schema);
        Self {
            inner: Arc::new(Inner {
                schema,
                slot: Mutex::new(Slot {
                    state,
                    epoch: 0,
                    in_flight: false,
                }),
                notifier,
            }),
            _model: PhantomData,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> FormState {
        self.inner.slot.lock().state.clone()
    }

    pub fn submission(&self) -> Submission {
        self.inner.slot.lock().state.submission.clone()
    }

    pub fn values(&self) -> FormValues {
        self.inner.slot.lock().state.values()
    }

    pub fn field(&self, name: &str) -> Option<FieldState> {
        self.inner.slot.lock().state.field(name).cloned()
    }

    fn declared(&self, name: &str) -> Result<&FormField, FormError> {
        self.inner
            .schema
            .field(name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))
    }

    /// Change a field's value. Does not mark it touched and does not validate.
    pub fn set_field_value(
        &self,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), FormError> {
        let value = value.into();
        let field = self.declared(name)?;
        if !field.accepts(&value) {
            return Err(FormError::TypeMismatch {
                field: name.to_string(),
                expected: field.expected_type(),
            });
        }
        let mut slot = self.inner.slot.lock();
        if let Some(state) = slot.state.field_mut(name) {
            state.value = value;
        }
        Ok(())
    }

    /// Mark a field as touched (blur). Idempotent.
    pub fn set_field_touched(&self, name: &str) -> Result<(), FormError> {
        self.declared(name)?;
        let mut slot = self.inner.slot.lock();
        if let Some(state) = slot.state.field_mut(name) {
            state.touched = true;
        }
        Ok(())
    }

    /// Run the validator against the current values and store the errors.
    /// Touched flags and the submission state are left alone.
    pub fn validate(&self) -> ValidationErrors {
        let mut slot = self.inner.slot.lock();
        let errors = self.inner.schema.validate(&slot.state.values());
        slot.state.apply_errors(&errors);
        errors
    }

    /// Restore declared defaults, clear touched/errors, back to `Idle`.
    ///
    /// A submission still running keeps the form busy until its action ends;
    /// its result is then discarded.
    pub fn reset(&self) {
        let mut slot = self.inner.slot.lock();
        slot.state = FormState::from_schema(&self.inner.schema);
        slot.epoch += 1;
        debug!(form = M::NAME, "form reset");
    }

    /// Submit the form.
    ///
    /// `action` receives the typed model and returns the toast to show on
    /// success, or an error whose message is shown instead.
    pub async fn submit<F, Fut, E>(&self, action: F) -> SubmitOutcome
    where
        F: FnOnce(M) -> Fut,
        Fut: Future<Output = Result<Toast, E>>,
        E: Display,
    {
        let (model, epoch) = {
            let mut slot = self.inner.slot.lock();
            if slot.in_flight {
                debug!(form = M::NAME, "submit ignored; submission already in flight");
                return SubmitOutcome::Busy;
            }
            slot.state.submit_count += 1;
            slot.state.touch_all();

            let values = slot.state.values();
            let mut errors = self.inner.schema.validate(&values);
            let model = if errors.is_empty() {
                match M::from_values(&values) {
                    Ok(model) => Some(model),
                    Err(e) => {
                        warn!(form = M::NAME, error = %e, "validated values do not fit the model");
                        let field = match &e {
                            FormError::UnknownField(f)
                            | FormError::MissingValue(f)
                            | FormError::TypeMismatch { field: f, .. }
                            | FormError::InvalidChoice { field: f, .. } => f.clone(),
                        };
                        errors.push(field, e.to_string());
                        None
                    }
                }
            } else {
                None
            };
            slot.state.apply_errors(&errors);

            let Some(model) = model else {
                debug!(form = M::NAME, fields = errors.len(), "validation failed");
                slot.state.submission = Submission::Failed(SubmitFailure::Validation);
                return SubmitOutcome::Invalid(errors);
            };
            slot.state.submission = Submission::Submitting;
            slot.in_flight = true;
            (model, slot.epoch)
        };

        let in_flight = InFlight {
            slot: &self.inner.slot,
        };
        let result = action(model).await;
        drop(in_flight);

        let mut slot = self.inner.slot.lock();
        if slot.epoch != epoch {
            debug!(form = M::NAME, "form was reset during submission; result discarded");
            return SubmitOutcome::Discarded;
        }
        match result {
            Ok(toast) => {
                slot.state.submission = Submission::Succeeded;
                drop(slot);
                info!(form = M::NAME, "submission succeeded");
                self.inner.notifier.notify(toast);
                SubmitOutcome::Succeeded
            }
            Err(e) => {
                let message = e.to_string();
                slot.state.submission = Submission::Failed(SubmitFailure::Remote(message.clone()));
                drop(slot);
                warn!(form = M::NAME, error = %message, "submission failed");
                self.inner.notifier.error(message.clone());
                SubmitOutcome::Rejected(message)
            }
        }
    }

    /// Binding for rendering one field.
    pub fn bind(&self, name: &str) -> Result<FieldBinding<'_, M>, FormError> {
        let field = self.declared(name)?;
        Ok(FieldBinding { form: self, field })
    }
}

/// Capability handed to whatever renders a field: current value, change and
/// blur handlers, and the errors that should be visible right now.
pub struct FieldBinding<'a, M: FormModel> {
    form: &'a Form<M>,
    field: &'a FormField,
}

impl<'a, M: FormModel> FieldBinding<'a, M> {
    pub fn name(&self) -> &'a str {
        &self.field.key
    }

    pub fn field(&self) -> &'a FormField {
        self.field
    }

    pub fn value(&self) -> FieldValue {
        self.state().value
    }

    pub fn display_value(&self) -> String {
        self.field.display_value(&self.value())
    }

    pub fn on_change(&self, value: impl Into<FieldValue>) -> Result<(), FormError> {
        self.form.set_field_value(&self.field.key, value)
    }

    pub fn on_blur(&self) -> Result<(), FormError> {
        self.form.set_field_touched(&self.field.key)
    }

    /// `touched && !valid`
    pub fn is_invalid(&self) -> bool {
        self.state().is_invalid()
    }

    /// Errors to render; empty until the field was touched.
    pub fn errors(&self) -> Vec<String> {
        self.state().visible_errors().to_vec()
    }

    fn state(&self) -> FieldState {
        self.form
            .field(&self.field.key)
            .unwrap_or_else(|| FieldState {
                value: self.field.default.clone(),
                touched: false,
                errors: Vec::new(),
            })
    }
}
