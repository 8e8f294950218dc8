//! Support for library configuration options

use std::sync::{Arc, Mutex};
use once_cell::sync::Lazy;

/// The product identifier written into the `<product-id>` element of every saved object.
/// Feel free to override it when initing this library.
pub static PRODUCT_ID: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("Horde::Kolab".to_string())));

/// Kolab format version written as the `version` attribute of the root element
pub const ROOT_VERSION: &str = "1.0";

/// Root element name of objects that have no specific type
pub const DEFAULT_ROOT_NAME: &str = "kolab";

/// File name of the XML attachment that carries a Kolab object
pub const ATTACHMENT_NAME: &str = "kolab.xml";

/// Returns the current product identifier
pub fn product_id() -> String {
    match PRODUCT_ID.lock() {
        Ok(id) => id.clone(),
        // A panic while the id was being replaced leaves a valid String behind anyway
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Replace the product identifier written by subsequent saves
pub fn set_product_id<S: ToString>(id: S) {
    let mut guard = match PRODUCT_ID.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = id.to_string();
}
