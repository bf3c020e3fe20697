//! `interpret_backend_error` (spec.md §6.1, §7): maps a backend error's
//! SQLSTATE plus its field dictionary into a [`LanguageError`], independent
//! of whichever internal [`diagnostics::Error`] variant (if any) produced
//! the query that triggered it — the backend is a separate process and
//! reports failures in its own vocabulary (Postgres error fields), not
//! ours.

use diagnostics::{ErrorCode, LanguageError, LanguageErrorCategory};

use crate::snapshot::Snapshot;

/// The subset of a Postgres `ErrorResponse`'s field dictionary this
/// compiler cares about (field codes per the wire protocol: `C` severity-
/// independent SQLSTATE code, `M` message, `D` detail, `H` hint, `n`
/// constraint name, `c` column name, `t` table name).
#[derive(Debug, Clone, Default)]
pub struct BackendErrorFields {
    pub sqlstate: String,
    pub message: String,
    pub detail: Option<String>,
    pub hint: Option<String>,
    pub constraint_name: Option<String>,
    pub column_name: Option<String>,
    pub table_name: Option<String>,
}

fn pointer_name_for_column(snapshot: &Snapshot, table: &str, column: &str) -> Option<String> {
    snapshot
        .catalog()
        .objects_iter()
        .find(|obj| ql_sqlgen::object_view_name(snapshot.catalog(), obj.id) == table)
        .and_then(|obj| snapshot.catalog().find_pointer(obj.id, column))
        .map(|ptr| ptr.name.clone())
}

/// Maps a backend error's SQLSTATE + field dictionary to a [`LanguageError`]
/// (spec.md §6.1). `snapshot` lets constraint/unique-violation translation
/// recover the Language-level pointer name behind a SQL column name.
pub fn interpret_backend_error(snapshot: &Snapshot, fields: &BackendErrorFields) -> LanguageError {
    let code = ErrorCode(fields_hash(&fields.sqlstate));
    match fields.sqlstate.as_str() {
        // unique_violation
        "23505" => {
            let ptr_name = match (&fields.table_name, &fields.column_name) {
                (Some(t), Some(c)) => pointer_name_for_column(snapshot, t, c),
                _ => None,
            };
            let mut message = format!("value violates the exclusivity constraint on `{}`", ptr_name.as_deref().unwrap_or("<unknown>"));
            if let Some(name) = &fields.constraint_name {
                message = format!("{message} (constraint `{name}`)");
            }
            let mut err = LanguageError::new(LanguageErrorCategory::ConstraintViolationError, code, message);
            if let Some(detail) = &fields.detail {
                err = err.with_details(detail.clone());
            }
            err
        }
        // check_violation: the constraint's own author-supplied message is
        // already in `message` by the time it reaches us (spec.md §7: "a
        // backend check-violation raised by a constraint's lowered
        // expression is reported with the constraint's author-supplied
        // message").
        "23514" => LanguageError::new(LanguageErrorCategory::ConstraintViolationError, code, fields.message.clone()),
        // not_null_violation, foreign_key_violation, restrict_violation
        "23502" | "23503" | "23001" => {
            LanguageError::new(LanguageErrorCategory::InvalidValueError, code, fields.message.clone())
        }
        // numeric_value_out_of_range
        "22003" => LanguageError::new(LanguageErrorCategory::NumericOutOfRangeError, code, fields.message.clone()),
        // serialization_failure, deadlock_detected, in_failed_sql_transaction
        "40001" | "40P01" | "25P02" => {
            LanguageError::new(LanguageErrorCategory::TransactionError, code, fields.message.clone())
        }
        // insufficient_privilege
        "42501" => LanguageError::new(LanguageErrorCategory::AccessPolicyError, code, fields.message.clone()),
        // undefined_column, undefined_table
        "42703" | "42P01" => {
            LanguageError::new(LanguageErrorCategory::InvalidReferenceError, code, fields.message.clone())
        }
        // invalid_text_representation, datatype_mismatch
        "22P02" | "42804" => LanguageError::new(LanguageErrorCategory::InvalidTypeError, code, fields.message.clone()),
        _ => LanguageError::new(LanguageErrorCategory::InternalServerError, code, fields.message.clone()),
    }
    .with_hint_opt(fields.hint.clone())
}

/// A stable, deterministic code for a SQLSTATE the compiler doesn't
/// special-case numerically (spec.md §6.5: "a stable **error code** (a
/// 32-bit integer)"); folds the five-character SQLSTATE into 32 bits so
/// distinct states reliably map to distinct codes.
fn fields_hash(sqlstate: &str) -> u32 {
    sqlstate.bytes().fold(0x0800_0000u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
}

trait WithHintOpt {
    fn with_hint_opt(self, hint: Option<String>) -> Self;
}

impl WithHintOpt for LanguageError {
    fn with_hint_opt(self, hint: Option<String>) -> Self {
        match hint {
            Some(h) => self.with_hint(h),
            None => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ql_catalog::CatalogBuilder;

    fn snapshot() -> Snapshot {
        Snapshot::new(CatalogBuilder::new().build().unwrap())
    }

    #[test]
    fn unique_violation_maps_to_constraint_violation() {
        let snap = snapshot();
        let fields = BackendErrorFields {
            sqlstate: "23505".into(),
            message: "duplicate key value violates unique constraint".into(),
            ..Default::default()
        };
        let err = interpret_backend_error(&snap, &fields);
        assert_eq!(err.category, LanguageErrorCategory::ConstraintViolationError);
    }

    #[test]
    fn serialization_failure_maps_to_transaction_error() {
        let snap = snapshot();
        let fields = BackendErrorFields { sqlstate: "40001".into(), message: "could not serialize".into(), ..Default::default() };
        let err = interpret_backend_error(&snap, &fields);
        assert_eq!(err.category, LanguageErrorCategory::TransactionError);
    }

    #[test]
    fn unrecognized_sqlstate_falls_back_to_internal() {
        let snap = snapshot();
        let fields = BackendErrorFields { sqlstate: "99999".into(), message: "???".into(), ..Default::default() };
        let err = interpret_backend_error(&snap, &fields);
        assert_eq!(err.category, LanguageErrorCategory::InternalServerError);
    }
}
