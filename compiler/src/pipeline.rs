//! The phase pipeline itself: `compile`, script compilation, and
//! `analyze` (spec.md §6.1; script/`analyze` shapes per SPEC_FULL.md C.1,
//! C.2). Each public entry point here walks L → P → S (already built into
//! the [`Snapshot`] it's handed) → {N, I} → G in order, per spec.md §2's
//! dependency note, and is cancellable at the start of each phase and
//! between script statements (spec.md §5).

use diagnostics::{CompileWarning, Error, NameError, NameErrorKind, SyntaxError, WarningSink};
use ql_catalog::Catalog;
use ql_ir::{Arena, BuildConfig, IrBuilder, ScopingMode, StatementIr};
use ql_lexer::{Token, TokenKind};
use ql_parser::ast::{ConfigureStmt, Script, Statement, TransactionStmt};
use ql_sqlgen::Generator;
use tracing::instrument;

use crate::cancellation::CancellationToken;
use crate::options::CompileOptions;
use crate::plan::{Plan, QueryPlanInfo};
use crate::snapshot::Snapshot;

/// One compiled statement out of a script (SPEC_FULL.md C.2). Transaction
/// control, `configure`, and schema commands are recognized and carried
/// through rather than lowered to SQL — they belong to collaborators
/// outside the compiler (spec.md §1).
#[derive(Debug, Clone)]
pub enum CompiledStatement {
    Query(Plan),
    Transaction(TransactionStmt),
    Configure(ConfigureStmt),
    SchemaCommand,
    Analyze(QueryPlanInfo),
}

/// `compile` (spec.md §6.1): compiles exactly one query/DML statement.
/// Use [`compile_script`] for a semicolon-separated script.
#[instrument(skip_all)]
pub fn compile(
    snapshot: &Snapshot,
    source: &str,
    options: &CompileOptions,
    warnings: &mut dyn WarningSink,
    cancel: &CancellationToken,
) -> Result<Plan, Vec<Error>> {
    cancel.check().map_err(|e| vec![e])?;
    let stmt = ql_parser::parse_statement(source).map_err(|e| vec![Error::from(e)])?;
    reject_parameterized_ddl(source, &stmt)?;
    cancel.check().map_err(|e| vec![e])?;
    match stmt {
        Statement::Query(expr) => compile_query_statement(snapshot, source, &Statement::Query(expr), options, warnings, cancel),
        other => Err(vec![Error::from(SyntaxError::parse(
            statement_span(&other),
            "compile() accepts a single query or DML statement; DDL, SDL, transaction-control, and configure statements are not plans",
        ))]),
    }
}

/// `compile`'s multi-statement sibling (SPEC_FULL.md C.2): one catalog
/// snapshot, one top-level `with`-scope shared across the whole script,
/// sequential per-statement compilation. Cancellable between statements.
#[instrument(skip_all)]
pub fn compile_script(
    snapshot: &Snapshot,
    source: &str,
    options: &CompileOptions,
    warnings: &mut dyn WarningSink,
    cancel: &CancellationToken,
) -> Result<Vec<CompiledStatement>, Vec<Error>> {
    cancel.check().map_err(|e| vec![e])?;
    let script = ql_parser::parse_script(source).map_err(|e| vec![Error::from(e)])?;
    for stmt in &script.statements {
        reject_parameterized_ddl(source, stmt)?;
    }

    let scoping_mode = options.query_scoping_mode(snapshot.catalog());
    let builder = IrBuilder::new(snapshot.catalog(), BuildConfig { default_module: options.default_module.clone(), scoping_mode });
    let program = builder.build_script(&script).map_err(|e| vec![e])?;

    let mut out = Vec::with_capacity(program.statements.len());
    for stmt_ir in &program.statements {
        cancel.check().map_err(|e| vec![e])?;
        out.push(lower_statement_ir(snapshot.catalog(), &program.arena, stmt_ir, scoping_mode)?);
    }

    if options.warn_old_scoping {
        warn_on_scoping_divergence(snapshot, source, options, &script, scoping_mode, warnings);
    }

    Ok(out)
}

/// `analyze <stmt>` (SPEC_FULL.md C.1): runs the full pipeline but returns
/// the static shape instead of pretending anything executed.
#[instrument(skip_all)]
pub fn analyze(snapshot: &Snapshot, source: &str, options: &CompileOptions, cancel: &CancellationToken) -> Result<QueryPlanInfo, Vec<Error>> {
    let mut sink = diagnostics::NullWarningSink;
    let plan = compile(snapshot, source, options, &mut sink, cancel)?;
    Ok(QueryPlanInfo {
        sql: plan.sql.clone(),
        result_type: plan.result_type.clone(),
        cardinality: plan.cardinality,
        parameter_count: plan.param_count,
    })
}

fn compile_query_statement(
    snapshot: &Snapshot,
    _source: &str,
    stmt: &Statement,
    options: &CompileOptions,
    warnings: &mut dyn WarningSink,
    cancel: &CancellationToken,
) -> Result<Plan, Vec<Error>> {
    cancel.check().map_err(|e| vec![e])?;
    let scoping_mode = options.query_scoping_mode(snapshot.catalog());
    // One statement is still driven through `build_script` rather than
    // `build_expr` directly so single-statement and script compilation
    // share the exact same IR-construction path (params, scope, binding
    // keys) end to end.
    let script = Script { statements: vec![stmt.clone()] };
    let builder = IrBuilder::new(snapshot.catalog(), BuildConfig { default_module: options.default_module.clone(), scoping_mode });
    let program = builder.build_script(&script).map_err(|e| vec![e])?;

    cancel.check().map_err(|e| vec![e])?;
    let StatementIr::Query(root_id) = &program.statements[0] else {
        return Err(vec![Error::from(NameError { kind: NameErrorKind::Unresolved, span: diagnostics::Span::DUMMY, message: "expected a query/DML statement".into() })]);
    };
    let root_id = *root_id;

    if options.warn_old_scoping {
        warn_on_scoping_divergence_single(snapshot, stmt, options, scoping_mode, warnings);
    }

    let mut generator = Generator::new(snapshot.catalog(), &program.arena);
    let select = generator.lower_root(root_id).map_err(|e| vec![Error::from(e)])?;
    let generated = generator.finish(select);

    let node = program.arena.get(root_id);
    Ok(Plan::from_generated(generated, node.ty.clone(), node.cardinality, scoping_mode))
}

fn lower_statement_ir(catalog: &Catalog, arena: &Arena, stmt_ir: &StatementIr, scoping_mode: ScopingMode) -> Result<CompiledStatement, Vec<Error>> {
    match stmt_ir {
        StatementIr::Query(root_id) => {
            let mut generator = Generator::new(catalog, arena);
            let select = generator.lower_root(*root_id).map_err(|e| vec![Error::from(e)])?;
            let generated = generator.finish(select);
            let node = arena.get(*root_id);
            Ok(CompiledStatement::Query(Plan::from_generated(generated, node.ty.clone(), node.cardinality, scoping_mode)))
        }
        StatementIr::Transaction(t) => Ok(CompiledStatement::Transaction(t.clone())),
        StatementIr::Configure(c) => Ok(CompiledStatement::Configure(c.clone())),
        StatementIr::SchemaCommand(_) => Ok(CompiledStatement::SchemaCommand),
        StatementIr::Analyze(inner) => {
            let compiled = lower_statement_ir(catalog, arena, inner, scoping_mode)?;
            match compiled {
                CompiledStatement::Query(plan) => Ok(CompiledStatement::Analyze(QueryPlanInfo {
                    sql: plan.sql,
                    result_type: plan.result_type,
                    cardinality: plan.cardinality,
                    parameter_count: plan.param_count,
                })),
                other => Ok(other),
            }
        }
    }
}

fn statement_span(stmt: &Statement) -> diagnostics::Span {
    match stmt {
        Statement::Query(e) => e.span(),
        Statement::Ddl(d) => d.span,
        Statement::Transaction(_) | Statement::Configure(_) => diagnostics::Span::DUMMY,
        Statement::Sdl(_) => diagnostics::Span::DUMMY,
        Statement::Analyze(inner) => statement_span(inner),
    }
}

/// Parameters protocol (spec.md §6.2): "DDL and `configure` may not [be
/// parameterized]." Re-tokenizes the whole script once and rejects any
/// DDL/SDL/configure statement whose span contains a `$name` parameter
/// token.
fn reject_parameterized_ddl(source: &str, stmt: &Statement) -> Result<(), Vec<Error>> {
    let disallowed_span = match stmt {
        Statement::Ddl(d) => Some(d.span),
        Statement::Configure(c) => Some(c.span),
        _ => None,
    };
    let Some(span) = disallowed_span else { return Ok(()) };
    let tokens = ql_lexer::Lexer::tokenize(source).unwrap_or_default();
    if tokens.iter().any(|t: &Token| matches!(t.kind, TokenKind::Parameter(_)) && t.span.start >= span.start && t.span.end <= span.end) {
        return Err(vec![Error::from(SyntaxError::parse(span, "DDL and `configure` statements may not be parameterized (spec.md §6.2)"))]);
    }
    Ok(())
}

/// The `warn_old_scoping` second traversal (spec.md §9: "a second
/// traversal that simulates both and reports divergence"): recompiles the
/// same script under the *other* scoping mode and warns per divergent
/// statement when the generated SQL differs.
fn warn_on_scoping_divergence(
    snapshot: &Snapshot,
    _source: &str,
    options: &CompileOptions,
    script: &Script,
    chosen: ScopingMode,
    warnings: &mut dyn WarningSink,
) {
    let other = match chosen {
        ScopingMode::Legacy => ScopingMode::Simple,
        ScopingMode::Simple => ScopingMode::Legacy,
    };
    let other_builder = IrBuilder::new(snapshot.catalog(), BuildConfig { default_module: options.default_module.clone(), scoping_mode: other });
    let Ok(other_program) = other_builder.build_script(script) else { return };
    let chosen_builder = IrBuilder::new(snapshot.catalog(), BuildConfig { default_module: options.default_module.clone(), scoping_mode: chosen });
    let Ok(chosen_program) = chosen_builder.build_script(script) else { return };

    for (chosen_stmt, other_stmt) in chosen_program.statements.iter().zip(other_program.statements.iter()) {
        let (StatementIr::Query(chosen_id), StatementIr::Query(other_id)) = (chosen_stmt, other_stmt) else { continue };
        let chosen_sql = render_for_comparison(snapshot.catalog(), &chosen_program.arena, *chosen_id);
        let other_sql = render_for_comparison(snapshot.catalog(), &other_program.arena, *other_id);
        if chosen_sql != other_sql {
            let span = chosen_program.arena.get(*chosen_id).span;
            warnings.warn(CompileWarning::old_scoping_divergence(
                span,
                "this query's meaning differs between legacy and simple path-factoring scope",
            ));
        }
    }
}

fn warn_on_scoping_divergence_single(snapshot: &Snapshot, stmt: &Statement, options: &CompileOptions, chosen: ScopingMode, warnings: &mut dyn WarningSink) {
    let script = Script { statements: vec![stmt.clone()] };
    warn_on_scoping_divergence(snapshot, "", options, &script, chosen, warnings);
}

fn render_for_comparison(catalog: &Catalog, arena: &Arena, root: ql_ir::NodeId) -> Option<String> {
    let mut generator = Generator::new(catalog, arena);
    let select = generator.lower_root(root).ok()?;
    Some(generator.finish(select).sql)
}
