//! Assertions over `TouchResult` for unit tests.

use crate::error::{TouchError, TouchResult};
use crate::queue::RecordKey;

/// # Panics
/// Panics unless `result` failed with `expected_sqlstate`.
pub fn assert_error_sqlstate<T>(result: TouchResult<T>, expected_sqlstate: &str) {
    match result {
        Err(e) => assert_eq!(
            e.sqlstate(),
            expected_sqlstate,
            "touch error carries SQLSTATE {} instead of {expected_sqlstate}: {e}",
            e.sqlstate()
        ),
        Ok(_) => panic!("expected a touch error with SQLSTATE {expected_sqlstate}, got Ok"),
    }
}

/// # Panics
/// Panics unless `result` failed with a message containing `expected_substring`.
pub fn assert_error_contains<T>(result: TouchResult<T>, expected_substring: &str) {
    match result {
        Err(e) => {
            let message = e.to_string();
            assert!(
                message.contains(expected_substring),
                "touch error '{message}' does not mention '{expected_substring}'"
            );
        }
        Ok(_) => panic!("expected a touch error mentioning '{expected_substring}', got Ok"),
    }
}

/// # Panics
/// Panics unless `result` failed with a record-level error (not persisted,
/// in use, callback failure) for exactly `expected`.
pub fn assert_record_error<T>(result: TouchResult<T>, expected_sqlstate: &str, expected: &RecordKey) {
    let err = match result {
        Err(e) => e,
        Ok(_) => panic!("expected a touch error for {} row {}, got Ok", expected.table, expected.pk),
    };

    let key = match &err {
        TouchError::RecordNotPersisted { table, pk }
        | TouchError::RecordInUse { table, pk }
        | TouchError::CallbackFailed { table, pk, .. } => RecordKey::new(table, *pk),
        other => panic!("expected a record-level touch error, got {other:?}"),
    };

    assert_eq!(&key, expected, "touch error names the wrong record: {err}");
    assert_eq!(err.sqlstate(), expected_sqlstate, "wrong SQLSTATE for {err}");
}
