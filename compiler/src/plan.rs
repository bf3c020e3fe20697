//! `Plan` (spec.md §6.1): the executable artifact `compile` returns for one
//! statement — rendered SQL text plus everything a caller needs to bind
//! parameters and decode the result.

use ql_ir::{Cardinality, IrType, ScopingMode};
use ql_sqlgen::{GeneratedQuery, ParamInfo, SqlValue};

#[derive(Debug, Clone)]
pub struct Plan {
    pub sql: String,
    pub parameters: Vec<ParamInfo>,
    pub param_count: usize,
    pub literal_params: Vec<(usize, SqlValue)>,
    pub result_type: IrType,
    pub cardinality: Cardinality,
    /// The scoping mode this statement was actually compiled under
    /// (spec.md §4.4's cache-key note; also what `warn_old_scoping`
    /// compares against).
    pub scoping_mode: ScopingMode,
}

impl Plan {
    pub(crate) fn from_generated(generated: GeneratedQuery, result_type: IrType, cardinality: Cardinality, scoping_mode: ScopingMode) -> Self {
        Plan {
            sql: generated.sql,
            parameters: generated.parameters,
            param_count: generated.param_count,
            literal_params: generated.literal_params,
            result_type,
            cardinality,
            scoping_mode,
        }
    }
}

/// The estimated-shape result of `analyze <stmt>` (SPEC_FULL.md C.1):
/// compiles the statement through every phase but never pretends a
/// backend ran it — there is no row count, no timing, only the static
/// shape a cost-based planner downstream could start from.
#[derive(Debug, Clone)]
pub struct QueryPlanInfo {
    pub sql: String,
    pub result_type: IrType,
    pub cardinality: Cardinality,
    pub parameter_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ql_sqlgen::ParamInfo;

    #[test]
    fn from_generated_copies_every_field_through_unchanged() {
        let generated = GeneratedQuery {
            sql: "select $1".into(),
            literal_params: vec![],
            parameters: vec![ParamInfo { name: "limit".into(), index: 0, optional: false }],
            param_count: 1,
        };
        let plan = Plan::from_generated(generated, IrType::FreeObject(vec![]), Cardinality::One, ScopingMode::Simple);
        assert_eq!(plan.sql, "select $1");
        assert_eq!(plan.parameters.len(), 1);
        assert_eq!(plan.parameters[0].name, "limit");
        assert_eq!(plan.param_count, 1);
        assert_eq!(plan.cardinality, Cardinality::One);
        assert_eq!(plan.scoping_mode, ScopingMode::Simple);
    }
}
