//! # Model Selector
//!
//! Owns the ordered registry of models the bot may use and the single current selection.
//! It knows nothing about how a reply is produced; the response service only asks it for
//! [`ModelSelector::current`].
//!
//! Registry order is preference order: [`ModelSelector::advance`] walks it to fall back to the
//! next model (e.g. when a free model hits its rate limit).
//!
//! Registry and selection sit behind one `RwLock`, so a reader never sees a selection that is
//! not a registry member, nor a half-applied switch.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dbot_core::{DbotError, ModelId, Result};
use tracing::{info, warn};

#[derive(Debug)]
struct Inner {
    models: Vec<ModelId>,
    current: usize,
}

impl Inner {
    fn position(&self, model: &str) -> Option<usize> {
        self.models.iter().position(|m| m == model)
    }
}

#[derive(Debug)]
pub struct ModelSelector {
    inner: RwLock<Inner>,
}

impl ModelSelector {
    /// Builds a selector from the configured registry.
    ///
    /// Duplicate ids are dropped (first occurrence wins). `default` must be a registry member;
    /// without one the first model is selected.
    ///
    /// # Errors
    ///
    /// - [`DbotError::EmptyRegistry`] when `models` is empty.
    /// - [`DbotError::UnknownModel`] when `default` is not in the registry.
    pub fn new(models: Vec<ModelId>, default: Option<ModelId>) -> Result<Self> {
        let mut unique: Vec<ModelId> = Vec::with_capacity(models.len());
        for model in models {
            if unique.contains(&model) {
                warn!(model = %model, "Duplicate model in registry ignored");
            } else {
                unique.push(model);
            }
        }
        if unique.is_empty() {
            return Err(DbotError::EmptyRegistry);
        }

        let current = match default {
            Some(default) => unique
                .iter()
                .position(|m| *m == default)
                .ok_or_else(|| DbotError::UnknownModel(default.to_string()))?,
            None => 0,
        };

        info!(
            models = unique.len(),
            current = %unique[current],
            "Model selector initialized"
        );

        Ok(Self {
            inner: RwLock::new(Inner {
                models: unique,
                current,
            }),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The active model; always a registry member.
    pub fn current(&self) -> ModelId {
        let inner = self.read();
        inner.models[inner.current].clone()
    }

    /// Makes `model` the current selection.
    ///
    /// On [`DbotError::UnknownModel`] the selection is left unchanged.
    pub fn switch_to(&self, model: &str) -> Result<ModelId> {
        let mut inner = self.write();
        let index = inner
            .position(model)
            .ok_or_else(|| DbotError::UnknownModel(model.to_string()))?;
        let previous = std::mem::replace(&mut inner.current, index);
        info!(
            from = %inner.models[previous],
            to = %inner.models[index],
            "Model switched"
        );
        Ok(inner.models[index].clone())
    }

    /// Copy of the registry in configured order.
    pub fn list_available(&self) -> Vec<ModelId> {
        self.read().models.clone()
    }

    /// Moves to the next model in registry order and returns it.
    ///
    /// Returns `None`, leaving the selection where it is, when the current model is the last one.
    pub fn advance(&self) -> Option<ModelId> {
        let mut inner = self.write();
        let next = inner.current + 1;
        if next >= inner.models.len() {
            return None;
        }
        inner.current = next;
        info!(to = %inner.models[next], "Model advanced to next in registry");
        Some(inner.models[next].clone())
    }

    /// Moves past `failed` after it could not answer, wrapping to the first model after the last.
    ///
    /// Only moves if `failed` is still the current model; when another caller already moved the
    /// selection, returns the current model unchanged, so concurrent failures of one model skip
    /// it only once. Returns `None` when the registry has no other model.
    pub fn advance_from(&self, failed: &str) -> Option<ModelId> {
        let mut inner = self.write();
        if inner.models[inner.current] != failed {
            return Some(inner.models[inner.current].clone());
        }
        if inner.models.len() < 2 {
            return None;
        }
        let next = (inner.current + 1) % inner.models.len();
        inner.current = next;
        info!(from = %failed, to = %inner.models[next], "Model advanced after failure");
        Some(inner.models[next].clone())
    }

    /// Whether [`advance`](Self::advance) would move to another model.
    pub fn has_more(&self) -> bool {
        let inner = self.read();
        inner.current + 1 < inner.models.len()
    }

    /// Selects the first (most preferred) model and returns it.
    pub fn reset_to_first(&self) -> ModelId {
        let mut inner = self.write();
        inner.current = 0;
        inner.models[0].clone()
    }

    /// Appends `model` to the registry. Returns false if it was already registered.
    pub fn add(&self, model: ModelId) -> bool {
        let mut inner = self.write();
        if inner.position(model.as_str()).is_some() {
            return false;
        }
        info!(model = %model, "Model added to registry");
        inner.models.push(model);
        true
    }

    /// Removes `model` from the registry.
    ///
    /// If it was the current selection, the selection falls back to the first remaining model.
    ///
    /// # Errors
    ///
    /// - [`DbotError::UnknownModel`] when `model` is not registered.
    /// - [`DbotError::EmptyRegistry`] when `model` is the only one left.
    pub fn remove(&self, model: &str) -> Result<()> {
        let mut inner = self.write();
        let index = inner
            .position(model)
            .ok_or_else(|| DbotError::UnknownModel(model.to_string()))?;
        if inner.models.len() == 1 {
            return Err(DbotError::EmptyRegistry);
        }

        inner.models.remove(index);
        if index == inner.current {
            inner.current = 0;
            warn!(
                removed = %model,
                fallback = %inner.models[0],
                "Current model removed, falling back to first"
            );
        } else if index < inner.current {
            inner.current -= 1;
        }
        Ok(())
    }
}
