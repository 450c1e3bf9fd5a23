//! Opt-in safety gate.
//!
//! Automation may only touch containers that explicitly opted in via a
//! label. This is the single authorization check in the engine; there
//! is no secondary confirmation beyond logging.

use crate::runtime::ContainerRef;

/// Check whether a container is eligible for automated remediation.
///
/// True iff the container carries `allowed_label_key` with the exact
/// value `"true"`. A missing key, a missing label map, or any other
/// value (including case variants like `"TRUE"`) all fail closed.
pub fn is_eligible(container: &ContainerRef, allowed_label_key: &str) -> bool {
    container
        .labels
        .get(allowed_label_key)
        .is_some_and(|value| value == "true")
}
