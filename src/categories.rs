//! Multiple categories
//!
//! Kolab objects store their categories as one comma separated string,
//! while most clients only handle a single category per object.
//! Loading keeps the first category visible and stashes the full list,
//! saving restores the full list unless the visible category was changed meanwhile.

use crate::value::{Object, Value};

pub const CATEGORIES: &str = "categories";
/// The complete, original category string
pub const ALL_CATEGORIES: &str = "_categories_all";
/// The category that was made visible on load
pub const PRIMARY_CATEGORY: &str = "_categories_primary";

/// A store of known categories, e.g. the preferences of the user
pub trait CategoryManager {
    /// Make sure a category exists.
    /// Returns `false` if it does not and cannot be created (e.g. because the store is locked)
    fn ensure(&mut self, category: &str) -> bool;
}

/// Split the categories of a freshly loaded object.
///
/// Every category is registered into `manager`, the first one it accepts becomes visible.
/// When it refuses them all, the visible category is empty
pub fn load_categories(object: &mut Object, mut manager: Option<&mut dyn CategoryManager>) {
    let all = match object.get_str(CATEGORIES) {
        Some(all) if !all.is_empty() => all.to_string(),
        _ => return,
    };

    let tokens: Vec<&str> = all.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    let mut primary = None;
    for token in &tokens {
        let accepted = match manager.as_mut() {
            Some(manager) => manager.ensure(token),
            None => true,
        };
        if accepted && primary.is_none() {
            primary = Some(token.to_string());
        }
    }

    if tokens.len() < 2 {
        if primary.is_none() && !tokens.is_empty() {
            log::debug!("Category {:?} was refused", all);
            object.insert(CATEGORIES, "");
        }
        return;
    }

    let primary = primary.unwrap_or_default();
    log::debug!("Object has {} categories, {:?} becomes the primary one", tokens.len(), primary);
    object.insert(CATEGORIES, primary.clone());
    object.insert(ALL_CATEGORIES, all);
    object.insert(PRIMARY_CATEGORY, primary);
}

/// Merge the categories back into a single string before an object is saved.
/// The bookkeeping keys are removed in any case
pub fn save_categories(object: &mut Object) {
    let all = object.remove(ALL_CATEGORIES);
    let primary = object.remove(PRIMARY_CATEGORY);

    if let (Some(Value::String(all)), Some(Value::String(primary))) = (all, primary) {
        if object.get_str(CATEGORIES) == Some(primary.as_str()) {
            object.insert(CATEGORIES, all);
        }
    }
}
