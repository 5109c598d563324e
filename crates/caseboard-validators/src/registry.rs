//! Validator discovery.

use crate::builtin::{AuditCompletenessValidator, PhiValidator, SchemaValidator};
use crate::error::ValidatorResult;
use crate::validator::Validator;
use std::sync::Arc;

/// Validators in registration (discovery) order.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: Vec<Arc<dyn Validator>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in validators: `SCHEMA_VALID`, `PHI_SCAN`, `AUDIT_COMPLETE`.
    pub fn builtin() -> ValidatorResult<Self> {
        Ok(Self::new()
            .with(Arc::new(SchemaValidator))
            .with(Arc::new(PhiValidator::new()?))
            .with(Arc::new(AuditCompletenessValidator)))
    }

    /// Register a validator. A validator with the same code is replaced in place.
    pub fn register(&mut self, validator: Arc<dyn Validator>) {
        match self
            .validators
            .iter()
            .position(|v| v.code() == validator.code())
        {
            Some(i) => self.validators[i] = validator,
            None => self.validators.push(validator),
        }
    }

    pub fn with(mut self, validator: Arc<dyn Validator>) -> Self {
        self.register(validator);
        self
    }

    /// Registered validators in discovery order.
    pub fn discover(&self) -> Vec<Arc<dyn Validator>> {
        self.validators.clone()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.validators.iter().map(|v| v.code()).collect()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("validators", &self.codes())
            .finish()
    }
}
