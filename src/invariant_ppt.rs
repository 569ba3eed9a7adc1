//! Runtime invariant checks with contract-test support.
//!
//! Production code asserts an invariant with [`assert_invariant!`]; tests can
//! then require that a given invariant was actually exercised:
//!
//! ```rust,ignore
//! use crabcapture::invariant_ppt::contract_test;
//!
//! assert_invariant!(
//!     self.current.is_none(),
//!     "At most one pipeline binding holds the hardware",
//!     "PipelineBinder::bind"
//! );
//!
//! #[test]
//! fn contract_single_binding() {
//!     // ... drive the binder ...
//!     contract_test("single binding", &["At most one pipeline binding holds the hardware"]);
//! }
//! ```

use std::cell::RefCell;
use std::collections::HashSet;
use std::thread_local;

thread_local! {
    static CHECKED: RefCell<HashSet<String>> = RefCell::new(HashSet::new());
}

/// Assert an invariant and record that it was checked.
///
/// # Panics
/// Panics if the condition is false.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $message:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, None)
    };
    ($condition:expr, $message:expr, $context:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, Some($context))
    };
}

#[doc(hidden)]
pub fn __assert_invariant_impl(condition: bool, message: &str, context: Option<&str>) {
    CHECKED.with(|checked| {
        checked.borrow_mut().insert(message.to_string());
    });

    if !condition {
        let ctx = context.unwrap_or("unknown");
        log::error!("invariant violated [{}]: {}", ctx, message);
        panic!("INVARIANT VIOLATION [{}]: {}", ctx, message);
    }
}

/// Require that each listed invariant was checked on this thread.
///
/// # Panics
/// Panics naming every invariant that was never checked.
pub fn contract_test(test_name: &str, required_invariants: &[&str]) {
    let checked = CHECKED.with(|checked| checked.borrow().clone());

    let missing: Vec<&str> = required_invariants
        .iter()
        .copied()
        .filter(|inv| !checked.contains(*inv))
        .collect();

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: The following invariants were not checked:\n  - {}",
            test_name,
            missing.join("\n  - ")
        );
    }
}

pub fn clear_invariant_log() {
    CHECKED.with(|checked| checked.borrow_mut().clear());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_invariant_satisfies_contract() {
        clear_invariant_log();
        crate::assert_invariant!(true, "always holds", "tests");
        contract_test("always", &["always holds"]);
    }

    #[test]
    #[should_panic(expected = "CONTRACT FAILURE")]
    fn test_unchecked_invariant_fails_contract() {
        clear_invariant_log();
        contract_test("never", &["never checked"]);
    }

    #[test]
    #[should_panic(expected = "INVARIANT VIOLATION [tests]")]
    fn test_violation_panics() {
        crate::assert_invariant!(false, "must fail", "tests");
    }
}
