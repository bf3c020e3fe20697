use crate::ast::*;
use crate::cursor::Cursor;
use diagnostics::{Span, SyntaxError};
use ql_lexer::{Keyword, Lexer, NumberKind, Token, TokenKind};

pub fn parse_script(src: &str) -> Result<Script, SyntaxError> {
    let tokens = Lexer::tokenize(src)?;
    let mut p = Parser::new(&tokens);
    p.parse_script()
}

pub fn parse_statement(src: &str) -> Result<Statement, SyntaxError> {
    let tokens = Lexer::tokenize(src)?;
    let mut p = Parser::new(&tokens);
    let stmt = p.parse_statement()?;
    p.skip_semicolons();
    if !p.c.at_eof() {
        return Err(SyntaxError::parse(p.c.span(), "unexpected trailing input after statement"));
    }
    Ok(stmt)
}

pub fn parse_expr(src: &str) -> Result<Expr, SyntaxError> {
    let tokens = Lexer::tokenize(src)?;
    let mut p = Parser::new(&tokens);
    let expr = p.parse_expr()?;
    if !p.c.at_eof() {
        return Err(SyntaxError::parse(p.c.span(), "unexpected trailing input after expression"));
    }
    Ok(expr)
}

struct Parser<'t> {
    c: Cursor<'t>,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Parser { c: Cursor::new(tokens) }
    }

    fn skip_semicolons(&mut self) {
        // "semicolons separate statements and are idempotent" (spec.md §4.1).
        while self.c.eat_kind(&TokenKind::Semicolon) {}
    }

    fn parse_script(&mut self) -> Result<Script, SyntaxError> {
        let mut statements = Vec::new();
        self.skip_semicolons();
        while !self.c.at_eof() {
            statements.push(self.parse_statement()?);
            self.skip_semicolons();
        }
        Ok(Script { statements })
    }

    // ---------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        match self.c.peek().clone() {
            TokenKind::Keyword(Keyword::Analyze) => {
                self.c.bump();
                Ok(Statement::Analyze(Box::new(self.parse_statement()?)))
            }
            TokenKind::Keyword(Keyword::Configure) => self.parse_configure().map(Statement::Configure),
            TokenKind::Keyword(Keyword::Start)
            | TokenKind::Keyword(Keyword::Commit)
            | TokenKind::Keyword(Keyword::Rollback)
            | TokenKind::Keyword(Keyword::Declare)
            | TokenKind::Keyword(Keyword::Release) => self.parse_transaction().map(Statement::Transaction),
            TokenKind::Keyword(Keyword::Abstract)
            | TokenKind::Keyword(Keyword::Scalar)
            | TokenKind::Keyword(Keyword::Type)
            | TokenKind::Keyword(Keyword::Alias)
            | TokenKind::Keyword(Keyword::Global)
            | TokenKind::Keyword(Keyword::Function) => self.parse_sdl().map(Statement::Sdl),
            TokenKind::Ident(ref kw) if is_ddl_verb(kw) => self.parse_ddl().map(Statement::Ddl),
            _ => self.parse_expr().map(Statement::Query),
        }
    }

    fn parse_configure(&mut self) -> Result<ConfigureStmt, SyntaxError> {
        let start = self.c.expect_keyword(Keyword::Configure)?;
        let (scope, _) = self.c.expect_ident()?;
        let (setting, _) = self.c.expect_ident()?;
        self.c.eat_keyword(Keyword::To);
        self.c.expect_kind(TokenKind::ColonEq).or_else(|_| Ok::<_, SyntaxError>(Span::DUMMY)).ok();
        let value = self.parse_expr()?;
        let end = value.span();
        Ok(ConfigureStmt { scope, setting, value, span: start.cover(end) })
    }

    fn parse_transaction(&mut self) -> Result<TransactionStmt, SyntaxError> {
        match self.c.peek().clone() {
            TokenKind::Keyword(Keyword::Start) => {
                let start = self.c.bump().span;
                self.c.expect_keyword(Keyword::Transaction)?;
                let mut isolation = None;
                if self.c.eat_keyword(Keyword::Using) {
                    let (word, _) = self.c.expect_ident()?;
                    isolation = Some(match word.as_str() {
                        "RepeatableRead" | "repeatable_read" => IsolationLevel::RepeatableRead,
                        "Serializable" | "serializable" => IsolationLevel::Serializable,
                        other => {
                            return Err(SyntaxError::parse(self.c.prev_span(), format!("unknown isolation level `{other}`")))
                        }
                    });
                }
                Ok(TransactionStmt::Start { isolation, span: start })
            }
            TokenKind::Keyword(Keyword::Commit) => {
                let span = self.c.bump().span;
                Ok(TransactionStmt::Commit { span })
            }
            TokenKind::Keyword(Keyword::Rollback) => {
                let span = self.c.bump().span;
                if self.c.eat_keyword(Keyword::To) {
                    self.c.expect_keyword(Keyword::Savepoint)?;
                    let (name, _) = self.c.expect_ident()?;
                    return Ok(TransactionStmt::RollbackTo { savepoint: name, span });
                }
                self.c.eat_keyword(Keyword::Transaction);
                Ok(TransactionStmt::Rollback { span })
            }
            TokenKind::Keyword(Keyword::Declare) => {
                let span = self.c.bump().span;
                self.c.expect_keyword(Keyword::Savepoint)?;
                let (name, _) = self.c.expect_ident()?;
                Ok(TransactionStmt::Declare { savepoint: name, span })
            }
            TokenKind::Keyword(Keyword::Release) => {
                let span = self.c.bump().span;
                self.c.expect_keyword(Keyword::Savepoint)?;
                let (name, _) = self.c.expect_ident()?;
                Ok(TransactionStmt::Release { savepoint: name, span })
            }
            other => Err(SyntaxError::parse(self.c.span(), format!("expected transaction statement, found {other:?}"))),
        }
    }

    /// DDL commands are recognized syntactically only (spec.md §1's
    /// migration-diffing Non-goal); see [`DdlCommand`].
    fn parse_ddl(&mut self) -> Result<DdlCommand, SyntaxError> {
        let (verb_word, start) = self.c.expect_ident()?;
        let verb = match verb_word.as_str() {
            "create" => DdlVerb::Create,
            "alter" => DdlVerb::Alter,
            "drop" => DdlVerb::Drop,
            other => return Err(SyntaxError::parse(start, format!("unknown DDL verb `{other}`"))),
        };
        let (subject_kind, _) = self.c.expect_ident()?;
        let subject = self.parse_qual_name()?;
        let body_start = self.c.span();
        if self.c.eat_kind(&TokenKind::LBrace) {
            self.skip_balanced_braces()?;
        }
        let end = self.c.prev_span();
        Ok(DdlCommand {
            verb,
            subject_kind,
            subject,
            body_span: body_start.cover(end),
            span: start.cover(end),
        })
    }

    fn skip_balanced_braces(&mut self) -> Result<(), SyntaxError> {
        let mut depth = 1u32;
        while depth > 0 {
            match self.c.peek() {
                TokenKind::LBrace => {
                    depth += 1;
                    self.c.bump();
                }
                TokenKind::RBrace => {
                    depth -= 1;
                    self.c.bump();
                }
                TokenKind::Eof => return Err(SyntaxError::parse(self.c.span(), "unterminated `{`")),
                _ => {
                    self.c.bump();
                }
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // SDL
    // ---------------------------------------------------------------

    fn parse_sdl(&mut self) -> Result<SdlDeclaration, SyntaxError> {
        if self.c.is_keyword(Keyword::Alias) {
            return self.parse_sdl_alias().map(SdlDeclaration::Alias);
        }
        if self.c.is_keyword(Keyword::Global) {
            return self.parse_sdl_global().map(SdlDeclaration::Global);
        }
        if self.c.is_keyword(Keyword::Function) {
            return self.parse_sdl_function().map(SdlDeclaration::Function);
        }
        if self.c.is_keyword(Keyword::Scalar) {
            return self.parse_sdl_scalar().map(SdlDeclaration::ScalarType);
        }
        self.parse_sdl_object_type().map(SdlDeclaration::ObjectType)
    }

    fn parse_sdl_alias(&mut self) -> Result<SdlAlias, SyntaxError> {
        let start = self.c.expect_keyword(Keyword::Alias)?;
        let name = self.parse_qual_name()?;
        self.c.expect_kind(TokenKind::ColonEq)?;
        let expr = self.parse_expr()?;
        Ok(SdlAlias { name, span: start.cover(expr.span()), expr })
    }

    fn parse_sdl_global(&mut self) -> Result<SdlGlobal, SyntaxError> {
        let start = self.c.expect_keyword(Keyword::Global)?;
        let name = self.parse_qual_name()?;
        self.c.expect_kind(TokenKind::Colon)?;
        let ty = self.parse_type_expr()?;
        let mut default = None;
        if self.c.eat_kind(&TokenKind::ColonEq) {
            default = Some(self.parse_expr()?);
        }
        let end = self.c.prev_span();
        Ok(SdlGlobal { name, ty, default, span: start.cover(end) })
    }

    fn parse_sdl_function(&mut self) -> Result<SdlFunction, SyntaxError> {
        let start = self.c.expect_keyword(Keyword::Function)?;
        let name = self.parse_qual_name()?;
        self.c.expect_kind(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.c.is_kind(&TokenKind::RParen) {
            params.push(self.parse_sdl_function_param()?);
            if !self.c.eat_kind(&TokenKind::Comma) {
                break;
            }
        }
        self.c.expect_kind(TokenKind::RParen)?;
        self.c.expect_kind(TokenKind::Arrow)?;
        let return_modifier = if self.c.eat_keyword(Keyword::Set) {
            self.c.expect_keyword(Keyword::Of)?;
            ReturnModifier::SetOfType
        } else if self.c.eat_keyword(Keyword::Optional) {
            ReturnModifier::OptionalType
        } else {
            ReturnModifier::SingletonType
        };
        let return_type = self.parse_type_expr()?;
        self.c.expect_kind(TokenKind::LBrace)?;
        let mut volatility = Volatility::Immutable;
        let mut sql_lowering = String::new();
        while !self.c.is_kind(&TokenKind::RBrace) {
            let (key, _) = self.c.expect_ident()?;
            self.c.expect_kind(TokenKind::ColonEq)?;
            match key.as_str() {
                "volatility" => {
                    let (word, span) = self.c.expect_ident()?;
                    volatility = match word.as_str() {
                        "Immutable" => Volatility::Immutable,
                        "Stable" => Volatility::Stable,
                        "Volatile" => Volatility::Volatile,
                        "Modifying" => Volatility::Modifying,
                        other => return Err(SyntaxError::parse(span, format!("unknown volatility `{other}`"))),
                    };
                }
                "using" | "sql" => {
                    if let TokenKind::Str(s) = self.c.peek().clone() {
                        self.c.bump();
                        sql_lowering = s;
                    } else {
                        return Err(SyntaxError::parse(self.c.span(), "expected a string literal for `using`"));
                    }
                }
                other => return Err(SyntaxError::parse(self.c.prev_span(), format!("unknown function clause `{other}`"))),
            }
            self.c.eat_kind(&TokenKind::Semicolon);
        }
        let end = self.c.expect_kind(TokenKind::RBrace)?;
        Ok(SdlFunction {
            name,
            params,
            return_type,
            return_modifier,
            volatility,
            sql_lowering,
            span: start.cover(end),
        })
    }

    fn parse_sdl_function_param(&mut self) -> Result<SdlFunctionParam, SyntaxError> {
        let start = self.c.span();
        // `named only` parameters aren't represented in `bootstrap` SDL fixtures this
        // workspace parses; the flag is carried on the node (spec.md §3.2's `NamedOnly`
        // parameter kind) but nothing currently sets it.
        let named_only = false;
        let variadic = self.c.eat_kind(&TokenKind::Star);
        let (name, _) = self.c.expect_ident()?;
        self.c.expect_kind(TokenKind::Colon)?;
        let modifier = if self.c.eat_keyword(Keyword::Optional) {
            ParamModifier::Optional
        } else if self.c.eat_keyword(Keyword::Required) {
            ParamModifier::Required
        } else if self.c.eat_keyword(Keyword::Set) {
            self.c.expect_keyword(Keyword::Of)?;
            ParamModifier::SetOf
        } else {
            ParamModifier::Required
        };
        let ty = self.parse_type_expr()?;
        let end = self.c.prev_span();
        Ok(SdlFunctionParam { name, ty, modifier, variadic, named_only, span: start.cover(end) })
    }

    fn parse_sdl_scalar(&mut self) -> Result<SdlScalarType, SyntaxError> {
        let start = self.c.expect_keyword(Keyword::Scalar)?;
        self.c.expect_keyword(Keyword::Type)?;
        let name = self.parse_qual_name()?;
        let mut extending = None;
        if self.c.eat_keyword(Keyword::Extending) {
            extending = Some(self.parse_qual_name()?);
        }
        let mut enum_values = Vec::new();
        let mut constraints = Vec::new();
        if self.c.eat_kind(&TokenKind::LBrace) {
            while !self.c.is_kind(&TokenKind::RBrace) {
                if self.c.eat_keyword(Keyword::Constraint) {
                    constraints.push(self.parse_sdl_constraint()?);
                } else {
                    // enum value list: `values := {"a", "b"}`
                    let (_key, _) = self.c.expect_ident()?;
                    self.c.expect_kind(TokenKind::ColonEq)?;
                    self.c.expect_kind(TokenKind::LBrace)?;
                    while !self.c.is_kind(&TokenKind::RBrace) {
                        if let TokenKind::Str(s) = self.c.peek().clone() {
                            self.c.bump();
                            enum_values.push(s);
                        } else {
                            return Err(SyntaxError::parse(self.c.span(), "expected enum value string"));
                        }
                        if !self.c.eat_kind(&TokenKind::Comma) {
                            break;
                        }
                    }
                    self.c.expect_kind(TokenKind::RBrace)?;
                }
                self.c.eat_kind(&TokenKind::Semicolon);
            }
            self.c.expect_kind(TokenKind::RBrace)?;
        }
        let end = self.c.prev_span();
        Ok(SdlScalarType { name, extending, enum_values, constraints, span: start.cover(end) })
    }

    fn parse_sdl_constraint(&mut self) -> Result<SdlConstraintDecl, SyntaxError> {
        let start = self.c.prev_span();
        let name = self.parse_qual_name()?;
        let mut args = Vec::new();
        if self.c.eat_kind(&TokenKind::LParen) {
            while !self.c.is_kind(&TokenKind::RParen) {
                args.push(self.parse_expr()?);
                if !self.c.eat_kind(&TokenKind::Comma) {
                    break;
                }
            }
            self.c.expect_kind(TokenKind::RParen)?;
        }
        let mut subject = None;
        let mut message = None;
        let mut delegated = false;
        if self.c.eat_keyword(Keyword::On) {
            subject = Some(self.parse_paren_expr()?);
        }
        if self.c.eat_kind(&TokenKind::LBrace) {
            while !self.c.is_kind(&TokenKind::RBrace) {
                let (key, _) = self.c.expect_ident()?;
                self.c.expect_kind(TokenKind::ColonEq)?;
                match key.as_str() {
                    "errmessage" => {
                        if let TokenKind::Str(s) = self.c.peek().clone() {
                            self.c.bump();
                            message = Some(s);
                        }
                    }
                    "delegated" => {
                        if self.c.eat_keyword(Keyword::True) {
                            delegated = true;
                        } else {
                            self.c.eat_keyword(Keyword::False);
                        }
                    }
                    _ => {
                        self.parse_expr()?;
                    }
                }
                self.c.eat_kind(&TokenKind::Semicolon);
            }
            self.c.expect_kind(TokenKind::RBrace)?;
        }
        let end = self.c.prev_span();
        Ok(SdlConstraintDecl { name, args, subject, message, delegated, span: start.cover(end) })
    }

    fn parse_paren_expr(&mut self) -> Result<Expr, SyntaxError> {
        self.c.expect_kind(TokenKind::LParen)?;
        let e = self.parse_expr()?;
        self.c.expect_kind(TokenKind::RParen)?;
        Ok(e)
    }

    fn parse_sdl_object_type(&mut self) -> Result<SdlObjectType, SyntaxError> {
        let start = self.c.span();
        let is_abstract = self.c.eat_keyword(Keyword::Abstract);
        self.c.expect_keyword(Keyword::Type)?;
        let name = self.parse_qual_name()?;
        let mut bases = Vec::new();
        if self.c.eat_keyword(Keyword::Extending) {
            bases.push(self.parse_qual_name()?);
            while self.c.eat_kind(&TokenKind::Comma) {
                bases.push(self.parse_qual_name()?);
            }
        }
        let mut pointers = Vec::new();
        let mut constraints = Vec::new();
        let mut indexes = Vec::new();
        let mut access_policies = Vec::new();
        let mut triggers = Vec::new();
        if self.c.eat_kind(&TokenKind::LBrace) {
            while !self.c.is_kind(&TokenKind::RBrace) {
                if self.c.eat_keyword(Keyword::Constraint) {
                    constraints.push(self.parse_sdl_constraint()?);
                } else if self.c.eat_keyword(Keyword::Index) {
                    indexes.push(self.parse_sdl_index()?);
                } else if self.c.is_keyword(Keyword::Access) {
                    access_policies.push(self.parse_sdl_access_policy()?);
                } else if self.c.eat_keyword(Keyword::Trigger) {
                    triggers.push(self.parse_sdl_trigger()?);
                } else {
                    pointers.push(self.parse_sdl_pointer()?);
                }
                self.c.eat_kind(&TokenKind::Semicolon);
            }
            self.c.expect_kind(TokenKind::RBrace)?;
        }
        let end = self.c.prev_span();
        Ok(SdlObjectType { name, is_abstract, bases, pointers, constraints, indexes, access_policies, triggers, span: start.cover(end) })
    }

    /// `access policy <name> allow|deny <actions> using (<expr>) [when (<expr>)]`
    /// (spec.md §3.2: ObjectType "carries access policies").
    fn parse_sdl_access_policy(&mut self) -> Result<SdlAccessPolicyDecl, SyntaxError> {
        let start = self.c.span();
        self.c.expect_keyword(Keyword::Access)?;
        self.c.expect_keyword(Keyword::Policy)?;
        let (name, _) = self.c.expect_ident()?;
        let effect = if self.c.eat_keyword(Keyword::Allow) {
            AccessPolicyEffect::Allow
        } else {
            self.c.expect_keyword(Keyword::Deny)?;
            AccessPolicyEffect::Deny
        };
        let mut actions = vec![self.parse_access_action()?];
        while self.c.eat_kind(&TokenKind::Comma) {
            actions.push(self.parse_access_action()?);
        }
        let mut using = Expr::Literal(LiteralExpr { value: Literal::Bool(true), span: start });
        if self.c.eat_keyword(Keyword::Using) {
            using = self.parse_paren_expr()?;
        }
        let mut when = None;
        if self.c.eat_keyword(Keyword::When) {
            when = Some(self.parse_paren_expr()?);
        }
        let end = self.c.prev_span();
        Ok(SdlAccessPolicyDecl { name, effect, actions, using, when, span: start.cover(end) })
    }

    fn parse_access_action(&mut self) -> Result<AccessAction, SyntaxError> {
        if self.c.eat_keyword(Keyword::Select) {
            Ok(AccessAction::Select)
        } else if self.c.eat_keyword(Keyword::Insert) {
            Ok(AccessAction::Insert)
        } else if self.c.eat_keyword(Keyword::Delete) {
            Ok(AccessAction::Delete)
        } else if self.c.eat_keyword(Keyword::Update) {
            if self.c.eat_keyword(Keyword::Read) {
                Ok(AccessAction::UpdateRead)
            } else {
                self.c.eat_keyword(Keyword::Write);
                Ok(AccessAction::UpdateWrite)
            }
        } else {
            Err(SyntaxError::parse(self.c.span(), "expected an access action (`select`, `insert`, `update`, `delete`)"))
        }
    }

    /// `trigger <name> after <events> for each <scope> [when (<expr>)] do (<expr>)`
    /// (spec.md §3.2: ObjectType "carries ... triggers").
    fn parse_sdl_trigger(&mut self) -> Result<SdlTriggerDecl, SyntaxError> {
        let start = self.c.prev_span();
        let (name, _) = self.c.expect_ident()?;
        self.c.expect_keyword(Keyword::After)?;
        let mut events = vec![self.parse_trigger_event()?];
        while self.c.eat_kind(&TokenKind::Comma) {
            events.push(self.parse_trigger_event()?);
        }
        self.c.expect_keyword(Keyword::For)?;
        self.c.expect_keyword(Keyword::Each)?;
        self.c.expect_ident()?; // scope, e.g. `row`; not modeled further here.
        let mut when = None;
        if self.c.eat_keyword(Keyword::When) {
            when = Some(self.parse_paren_expr()?);
        }
        self.c.expect_keyword(Keyword::Do)?;
        let do_expr = self.parse_paren_expr()?;
        let end = self.c.prev_span();
        Ok(SdlTriggerDecl { name, events, when, do_expr, span: start.cover(end) })
    }

    fn parse_trigger_event(&mut self) -> Result<TriggerEvent, SyntaxError> {
        if self.c.eat_keyword(Keyword::Insert) {
            Ok(TriggerEvent::Insert)
        } else if self.c.eat_keyword(Keyword::Update) {
            Ok(TriggerEvent::Update)
        } else if self.c.eat_keyword(Keyword::Delete) {
            Ok(TriggerEvent::Delete)
        } else {
            Err(SyntaxError::parse(self.c.span(), "expected a trigger event (`insert`, `update`, `delete`)"))
        }
    }

    fn parse_sdl_index(&mut self) -> Result<SdlIndexDecl, SyntaxError> {
        let start = self.c.prev_span();
        self.c.expect_keyword(Keyword::On)?;
        let expr = self.parse_paren_expr()?;
        let mut except = None;
        if self.c.eat_keyword(Keyword::Using) {
            // consume alternate index algorithm ident, ignored here.
            self.c.expect_ident()?;
        }
        if self.c.is_kind(&TokenKind::LBrace) {
            self.c.bump();
            while !self.c.is_kind(&TokenKind::RBrace) {
                let (key, _) = self.c.expect_ident()?;
                self.c.expect_kind(TokenKind::ColonEq)?;
                if key == "except" {
                    except = Some(self.parse_expr()?);
                } else {
                    self.parse_expr()?;
                }
                self.c.eat_kind(&TokenKind::Semicolon);
            }
            self.c.expect_kind(TokenKind::RBrace)?;
        }
        let end = self.c.prev_span();
        Ok(SdlIndexDecl { expr, except, span: start.cover(end) })
    }

    fn parse_sdl_pointer(&mut self) -> Result<SdlPointerDecl, SyntaxError> {
        let start = self.c.span();
        let required = if self.c.eat_keyword(Keyword::Required) {
            true
        } else {
            self.c.eat_keyword(Keyword::Optional);
            false
        };
        let cardinality = if self.c.eat_keyword(Keyword::Multi) {
            Cardinality::Many
        } else {
            self.c.eat_keyword(Keyword::Single);
            Cardinality::One
        };
        let kind = if self.c.eat_keyword(Keyword::Property) {
            SdlPointerKind::Property
        } else {
            self.c.eat_keyword(Keyword::Link);
            SdlPointerKind::Link
        };
        let (name, _) = self.c.expect_ident()?;
        let mut target = None;
        let mut computed = None;
        if self.c.eat_kind(&TokenKind::ColonEq) {
            computed = Some(self.parse_expr()?);
        } else {
            self.c.expect_kind(TokenKind::Colon)?;
            target = Some(self.parse_type_expr()?);
        }
        let mut readonly = false;
        let mut default = None;
        let mut on_target_delete = None;
        let mut on_source_delete = None;
        let mut constraints = Vec::new();
        let mut link_properties = Vec::new();
        if self.c.eat_kind(&TokenKind::LBrace) {
            while !self.c.is_kind(&TokenKind::RBrace) {
                if self.c.eat_keyword(Keyword::Constraint) {
                    constraints.push(self.parse_sdl_constraint()?);
                } else if self.c.eat_keyword(Keyword::Property) {
                    link_properties.push(self.parse_link_property_tail()?);
                } else {
                    let (key, key_span) = self.c.expect_ident()?;
                    match key.as_str() {
                        "default" => {
                            self.c.expect_kind(TokenKind::ColonEq)?;
                            default = Some(self.parse_expr()?);
                        }
                        "readonly" => {
                            self.c.expect_kind(TokenKind::ColonEq)?;
                            readonly = self.c.eat_keyword(Keyword::True);
                            self.c.eat_keyword(Keyword::False);
                        }
                        "on_target_delete" => {
                            self.c.expect_kind(TokenKind::ColonEq)?;
                            on_target_delete = Some(self.parse_target_delete_policy()?);
                        }
                        "on_source_delete" => {
                            self.c.expect_kind(TokenKind::ColonEq)?;
                            on_source_delete = Some(self.parse_target_delete_policy()?);
                        }
                        other => return Err(SyntaxError::parse(key_span, format!("unknown pointer clause `{other}`"))),
                    }
                }
                self.c.eat_kind(&TokenKind::Semicolon);
            }
            self.c.expect_kind(TokenKind::RBrace)?;
        }
        let end = self.c.prev_span();
        Ok(SdlPointerDecl {
            kind,
            name,
            target,
            cardinality,
            required,
            readonly,
            default,
            computed,
            on_target_delete,
            on_source_delete,
            constraints,
            link_properties,
            span: start.cover(end),
        })
    }

    fn parse_link_property_tail(&mut self) -> Result<SdlPointerDecl, SyntaxError> {
        let start = self.c.prev_span();
        let (name, _) = self.c.expect_ident()?;
        self.c.expect_kind(TokenKind::Colon)?;
        let target = self.parse_type_expr()?;
        let end = self.c.prev_span();
        Ok(SdlPointerDecl {
            kind: SdlPointerKind::Property,
            name,
            target: Some(target),
            cardinality: Cardinality::One,
            required: false,
            readonly: false,
            default: None,
            computed: None,
            on_target_delete: None,
            on_source_delete: None,
            constraints: Vec::new(),
            link_properties: Vec::new(),
            span: start.cover(end),
        })
    }

    fn parse_target_delete_policy(&mut self) -> Result<TargetDeletePolicy, SyntaxError> {
        let (word, span) = self.c.expect_ident()?;
        Ok(match word.as_str() {
            "Restrict" => TargetDeletePolicy::Restrict,
            "DeleteSource" => TargetDeletePolicy::DeleteSource,
            "Allow" => TargetDeletePolicy::Allow,
            "DeferredRestrict" => TargetDeletePolicy::DeferredRestrict,
            other => return Err(SyntaxError::parse(span, format!("unknown delete policy `{other}`"))),
        })
    }

    fn parse_qual_name(&mut self) -> Result<QualName, SyntaxError> {
        let (first, start) = self.c.expect_ident()?;
        if self.c.eat_kind(&TokenKind::DoubleColon) {
            let (second, end) = self.c.expect_ident()?;
            return Ok(QualName { module: Some(first), name: second, span: start.cover(end) });
        }
        Ok(QualName { module: None, name: first, span: start })
    }

    fn parse_type_expr(&mut self) -> Result<TypeExpr, SyntaxError> {
        if self.c.eat_keyword(Keyword::Optional) {
            return Ok(TypeExpr::Optional(Box::new(self.parse_type_expr()?)));
        }
        match self.c.peek().clone() {
            TokenKind::Ident(name) if name == "array" => {
                self.c.bump();
                self.c.expect_kind(TokenKind::Lt)?;
                let inner = self.parse_type_expr()?;
                self.c.expect_kind(TokenKind::Gt)?;
                Ok(TypeExpr::Array(Box::new(inner)))
            }
            TokenKind::Ident(name) if name == "range" => {
                self.c.bump();
                self.c.expect_kind(TokenKind::Lt)?;
                let inner = self.parse_type_expr()?;
                self.c.expect_kind(TokenKind::Gt)?;
                Ok(TypeExpr::Range(Box::new(inner)))
            }
            TokenKind::Ident(name) if name == "multirange" => {
                self.c.bump();
                self.c.expect_kind(TokenKind::Lt)?;
                let inner = self.parse_type_expr()?;
                self.c.expect_kind(TokenKind::Gt)?;
                Ok(TypeExpr::Multirange(Box::new(inner)))
            }
            TokenKind::Ident(name) if name == "tuple" => {
                self.c.bump();
                self.c.expect_kind(TokenKind::Lt)?;
                let mut elements = Vec::new();
                while !self.c.is_kind(&TokenKind::Gt) {
                    let named = if matches!(self.c.peek_at(1), TokenKind::Colon) {
                        let (n, _) = self.c.expect_ident()?;
                        self.c.expect_kind(TokenKind::Colon)?;
                        Some(n)
                    } else {
                        None
                    };
                    elements.push((named, self.parse_type_expr()?));
                    if !self.c.eat_kind(&TokenKind::Comma) {
                        break;
                    }
                }
                self.c.expect_kind(TokenKind::Gt)?;
                Ok(TypeExpr::Tuple(elements))
            }
            _ => Ok(TypeExpr::Named(self.parse_qual_name()?)),
        }
    }

    // ---------------------------------------------------------------
    // Expressions: operator-precedence climbing (spec.md §4.2)
    // ---------------------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<Expr, SyntaxError> {
        let lhs = self.parse_if_else()?;
        if self.c.eat_keyword(Keyword::Union) {
            // right-associative (spec.md §4.2).
            let rhs = self.parse_union()?;
            let span = lhs.span().cover(rhs.span());
            return Ok(Expr::Op(OpExpr::Binary { op: BinaryOp::Union, lhs: Box::new(lhs), rhs: Box::new(rhs), span }));
        }
        Ok(lhs)
    }

    fn parse_if_else(&mut self) -> Result<Expr, SyntaxError> {
        let then_branch = self.parse_or()?;
        if self.c.eat_keyword(Keyword::If) {
            let condition = self.parse_or()?;
            self.c.expect_keyword(Keyword::Else)?;
            let else_branch = self.parse_if_else()?;
            let span = then_branch.span().cover(else_branch.span());
            return Ok(Expr::IfElse(Box::new(IfElseExpr { condition, then_branch, else_branch, span })));
        }
        Ok(then_branch)
    }

    fn parse_or(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_and()?;
        while self.c.eat_keyword(Keyword::Or) {
            let rhs = self.parse_and()?;
            let span = lhs.span().cover(rhs.span());
            lhs = Expr::Op(OpExpr::Binary { op: BinaryOp::Or, lhs: Box::new(lhs), rhs: Box::new(rhs), span });
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_not()?;
        while self.c.eat_keyword(Keyword::And) {
            let rhs = self.parse_not()?;
            let span = lhs.span().cover(rhs.span());
            lhs = Expr::Op(OpExpr::Binary { op: BinaryOp::And, lhs: Box::new(lhs), rhs: Box::new(rhs), span });
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, SyntaxError> {
        if self.is_unary_not() {
            let start = self.c.bump().span;
            let operand = self.parse_not()?;
            let span = start.cover(operand.span());
            return Ok(Expr::Op(OpExpr::Unary { op: UnaryOp::Not, operand: Box::new(operand), span }));
        }
        self.parse_comparison()
    }

    /// `not` is ambiguous with the `not in` / `not like` / `is not` binary
    /// forms handled further down the chain; only treat it as the unary
    /// prefix operator when none of those follow.
    fn is_unary_not(&self) -> bool {
        matches!(self.c.peek(), TokenKind::Keyword(Keyword::Not))
    }

    fn parse_comparison(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_ordering()?;
        loop {
            let op = match self.c.peek() {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::QEq => BinaryOp::QEq,
                TokenKind::QNotEq => BinaryOp::QNotEq,
                _ => break,
            };
            self.c.bump();
            let rhs = self.parse_ordering()?;
            let span = lhs.span().cover(rhs.span());
            lhs = Expr::Op(OpExpr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span });
        }
        Ok(lhs)
    }

    fn parse_ordering(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_like()?;
        loop {
            let op = match self.c.peek() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.c.bump();
            let rhs = self.parse_like()?;
            let span = lhs.span().cover(rhs.span());
            lhs = Expr::Op(OpExpr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span });
        }
        Ok(lhs)
    }

    fn parse_like(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_in()?;
        loop {
            let negated = matches!(self.c.peek(), TokenKind::Keyword(Keyword::Not))
                && matches!(self.c.peek_at(1), TokenKind::Keyword(Keyword::Like) | TokenKind::Keyword(Keyword::Ilike));
            if negated {
                self.c.bump();
            }
            let op = if self.c.eat_keyword(Keyword::Like) {
                if negated { BinaryOp::NotLike } else { BinaryOp::Like }
            } else if self.c.eat_keyword(Keyword::Ilike) {
                if negated { BinaryOp::NotIlike } else { BinaryOp::Ilike }
            } else {
                break;
            };
            let rhs = self.parse_in()?;
            let span = lhs.span().cover(rhs.span());
            lhs = Expr::Op(OpExpr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span });
        }
        Ok(lhs)
    }

    fn parse_in(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_is()?;
        loop {
            let negated = matches!(self.c.peek(), TokenKind::Keyword(Keyword::Not))
                && matches!(self.c.peek_at(1), TokenKind::Keyword(Keyword::In));
            if negated {
                self.c.bump();
            }
            if !self.c.eat_keyword(Keyword::In) {
                break;
            }
            let op = if negated { BinaryOp::NotIn } else { BinaryOp::In };
            let rhs = self.parse_is()?;
            let span = lhs.span().cover(rhs.span());
            lhs = Expr::Op(OpExpr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span });
        }
        Ok(lhs)
    }

    fn parse_is(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let negated = matches!(self.c.peek(), TokenKind::Keyword(Keyword::Is))
                && matches!(self.c.peek_at(1), TokenKind::Keyword(Keyword::Not));
            if !self.c.eat_keyword(Keyword::Is) {
                break;
            }
            if negated {
                self.c.bump();
            }
            let ty = self.parse_type_expr()?;
            let rhs_span = self.c.prev_span();
            let span = lhs.span().cover(rhs_span);
            let op = if negated { BinaryOp::IsNot } else { BinaryOp::Is };
            // `is` compares a value to a type, so wrap the type as a
            // synthetic ident operand carrying its qualified name.
            let rhs = type_expr_as_operand(ty, rhs_span);
            lhs = Expr::Op(OpExpr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span });
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.c.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                TokenKind::PlusPlus => BinaryOp::Concat,
                _ => break,
            };
            self.c.bump();
            let rhs = self.parse_multiplicative()?;
            let span = lhs.span().cover(rhs.span());
            lhs = Expr::Op(OpExpr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span });
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_coalesce()?;
        loop {
            let op = match self.c.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::DoubleSlash => BinaryOp::FloorDiv,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.c.bump();
            let rhs = self.parse_coalesce()?;
            let span = lhs.span().cover(rhs.span());
            lhs = Expr::Op(OpExpr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span });
        }
        Ok(lhs)
    }

    fn parse_coalesce(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_unary()?;
        while self.c.eat_kind(&TokenKind::QuestionQuestion) {
            let rhs = self.parse_unary()?;
            let span = lhs.span().cover(rhs.span());
            lhs = Expr::Op(OpExpr::Binary { op: BinaryOp::Coalesce, lhs: Box::new(lhs), rhs: Box::new(rhs), span });
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, SyntaxError> {
        if self.c.eat_keyword(Keyword::Distinct) {
            let start = self.c.prev_span();
            let operand = self.parse_unary()?;
            let span = start.cover(operand.span());
            return Ok(Expr::Op(OpExpr::Unary { op: UnaryOp::Distinct, operand: Box::new(operand), span }));
        }
        if self.c.eat_kind(&TokenKind::Minus) {
            let start = self.c.prev_span();
            let operand = self.parse_unary()?;
            let span = start.cover(operand.span());
            return Ok(Expr::Op(OpExpr::Unary { op: UnaryOp::Neg, operand: Box::new(operand), span }));
        }
        self.parse_exponent()
    }

    fn parse_exponent(&mut self) -> Result<Expr, SyntaxError> {
        let lhs = self.parse_cast()?;
        if self.c.eat_kind(&TokenKind::Caret) {
            // right-associative
            let rhs = self.parse_exponent()?;
            let span = lhs.span().cover(rhs.span());
            return Ok(Expr::Op(OpExpr::Binary { op: BinaryOp::Pow, lhs: Box::new(lhs), rhs: Box::new(rhs), span }));
        }
        Ok(lhs)
    }

    fn parse_cast(&mut self) -> Result<Expr, SyntaxError> {
        if self.c.is_kind(&TokenKind::Lt) {
            let start = self.c.bump().span;
            let target = self.parse_type_expr()?;
            self.c.expect_kind(TokenKind::Gt)?;
            let expr = self.parse_cast()?;
            let span = start.cover(expr.span());
            return Ok(Expr::TypeCast(TypeCastExpr { target, expr: Box::new(expr), span }));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.parse_detached()?;
        loop {
            match self.c.peek().clone() {
                TokenKind::Dot => {
                    self.c.bump();
                    let (name, end) = self.c.expect_ident()?;
                    let span = expr.span().cover(end);
                    expr = Expr::PathStep(PathStepExpr { base: Box::new(expr), pointer: name, span });
                }
                TokenKind::DotLt => {
                    self.c.bump();
                    let (name, mut end) = self.c.expect_ident()?;
                    let mut intersect = None;
                    if self.c.eat_kind(&TokenKind::LBracket) {
                        self.c.expect_keyword(Keyword::Is)?;
                        intersect = Some(self.parse_type_expr()?);
                        end = self.c.expect_kind(TokenKind::RBracket)?;
                    }
                    let span = expr.span().cover(end);
                    expr = Expr::Backlink(BacklinkExpr { base: Box::new(expr), pointer: name, intersect, span });
                }
                TokenKind::LBracket => {
                    // `[is T]`, `[i]`, or `[a:b]`.
                    self.c.bump();
                    if self.c.eat_keyword(Keyword::Is) {
                        let ty = self.parse_type_expr()?;
                        let end = self.c.expect_kind(TokenKind::RBracket)?;
                        let span = expr.span().cover(end);
                        expr = Expr::TypeIntersection(TypeIntersectionExpr { base: Box::new(expr), ty, span });
                        continue;
                    }
                    let lower = if self.c.is_kind(&TokenKind::Colon) { None } else { Some(Box::new(self.parse_expr()?)) };
                    if self.c.eat_kind(&TokenKind::Colon) {
                        let upper = if self.c.is_kind(&TokenKind::RBracket) {
                            None
                        } else {
                            Some(Box::new(self.parse_expr()?))
                        };
                        let end = self.c.expect_kind(TokenKind::RBracket)?;
                        let span = expr.span().cover(end);
                        expr = Expr::Indirection(IndirectionExpr {
                            base: Box::new(expr),
                            index: IndirectionKind::Slice(lower, upper),
                            span,
                        });
                    } else {
                        let end = self.c.expect_kind(TokenKind::RBracket)?;
                        let span = expr.span().cover(end);
                        let index = lower.ok_or_else(|| SyntaxError::parse(self.c.span(), "expected index expression"))?;
                        expr = Expr::Indirection(IndirectionExpr { base: Box::new(expr), index: IndirectionKind::Index(index), span });
                    }
                }
                TokenKind::LBrace => {
                    let shape = self.parse_shape(Some(expr))?;
                    expr = Expr::Shape(shape);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_detached(&mut self) -> Result<Expr, SyntaxError> {
        if self.c.eat_keyword(Keyword::Detached) {
            let start = self.c.prev_span();
            let inner = self.parse_detached()?;
            let span = start.cover(inner.span());
            return Ok(Expr::Detached(DetachedExpr { expr: Box::new(inner), span }));
        }
        self.parse_primary()
    }

    fn parse_shape(&mut self, subject: Option<Expr>) -> Result<ShapeExpr, SyntaxError> {
        let start = self.c.expect_kind(TokenKind::LBrace)?;
        let start = subject.as_ref().map(|s| s.span()).unwrap_or(start);
        let mut elements = Vec::new();
        while !self.c.is_kind(&TokenKind::RBrace) {
            elements.push(self.parse_shape_element()?);
            if !self.c.eat_kind(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.c.expect_kind(TokenKind::RBrace)?;
        Ok(ShapeExpr { subject: subject.map(Box::new), elements, span: start.cover(end) })
    }

    fn parse_shape_element(&mut self) -> Result<ShapeElement, SyntaxError> {
        let start = self.c.span();
        let mut type_filter = None;
        if self.c.eat_kind(&TokenKind::LBracket) {
            self.c.expect_keyword(Keyword::Is)?;
            type_filter = Some(self.parse_type_expr()?);
            self.c.expect_kind(TokenKind::RBracket)?;
            self.c.expect_kind(TokenKind::Dot)?;
        }
        let (name, _) = self.c.expect_ident()?;
        let mut computed_expr = None;
        let mut nested_shape = None;
        if self.c.eat_kind(&TokenKind::ColonEq) {
            computed_expr = Some(self.parse_expr()?);
        } else if self.c.eat_kind(&TokenKind::Colon) {
            if self.c.is_kind(&TokenKind::LBrace) {
                nested_shape = Some(self.parse_shape(None)?);
            } else {
                computed_expr = Some(self.parse_expr()?);
            }
        }
        let mut filter = None;
        let mut order_by = Vec::new();
        let mut offset = None;
        let mut limit = None;
        if self.c.eat_keyword(Keyword::Filter) {
            filter = Some(self.parse_expr()?);
        }
        if self.c.eat_keyword(Keyword::Order) {
            self.c.expect_keyword(Keyword::By)?;
            order_by = self.parse_order_by_list()?;
        }
        if self.c.eat_keyword(Keyword::Offset) {
            offset = Some(self.parse_expr()?);
        }
        if self.c.eat_keyword(Keyword::Limit) {
            limit = Some(self.parse_expr()?);
        }
        let end = self.c.prev_span();
        Ok(ShapeElement {
            name,
            type_filter,
            computed_expr,
            nested_shape,
            filter,
            order_by,
            offset,
            limit,
            span: start.cover(end),
        })
    }

    fn parse_order_by_list(&mut self) -> Result<Vec<OrderItem>, SyntaxError> {
        let mut items = Vec::new();
        loop {
            let expr = self.parse_expr()?;
            let order = if matches!(self.c.peek(), TokenKind::Ident(w) if w.eq_ignore_ascii_case("desc")) {
                self.c.bump();
                SortOrder::Desc
            } else if matches!(self.c.peek(), TokenKind::Ident(w) if w.eq_ignore_ascii_case("asc")) {
                self.c.bump();
                SortOrder::Asc
            } else {
                SortOrder::Asc
            };
            items.push(OrderItem { expr, order });
            if !self.c.eat_kind(&TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    fn parse_primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.c.peek().clone() {
            TokenKind::Number { text, kind } => {
                let span = self.c.bump().span;
                Ok(Expr::Literal(LiteralExpr { value: number_literal(&text, kind, span)?, span }))
            }
            TokenKind::Str(s) => {
                let span = self.c.bump().span;
                Ok(Expr::Literal(LiteralExpr { value: Literal::Str(s), span }))
            }
            TokenKind::Bytes(b) => {
                let span = self.c.bump().span;
                Ok(Expr::Literal(LiteralExpr { value: Literal::Bytes(b), span }))
            }
            TokenKind::Keyword(Keyword::True) => {
                let span = self.c.bump().span;
                Ok(Expr::Literal(LiteralExpr { value: Literal::Bool(true), span }))
            }
            TokenKind::Keyword(Keyword::False) => {
                let span = self.c.bump().span;
                Ok(Expr::Literal(LiteralExpr { value: Literal::Bool(false), span }))
            }
            TokenKind::Parameter(name) => {
                let span = self.c.bump().span;
                Ok(Expr::Parameter(ParameterExpr { name, type_annotation: None, optional: false, span }))
            }
            TokenKind::LBrace => self.parse_brace_expr(),
            TokenKind::LParen => self.parse_paren_or_tuple(),
            TokenKind::LBracket => self.parse_array_or_range(),
            TokenKind::Keyword(Keyword::With) => self.parse_with(),
            TokenKind::Keyword(Keyword::Select) => self.parse_select(),
            TokenKind::Keyword(Keyword::Insert) => self.parse_insert(),
            TokenKind::Keyword(Keyword::Update) => self.parse_update(),
            TokenKind::Keyword(Keyword::Delete) => self.parse_delete(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::Group) => self.parse_group(),
            TokenKind::Ident(_) => self.parse_ident_or_call(),
            // A leading `.ptr` with no explicit base (spec.md §8 scenario 4:
            // `order by .name`, `count(.friends)`) names a pointer on
            // whatever subject is in scope; resolving that subject is left
            // to name resolution, which already falls back to the implicit
            // "." local for any unqualified name it can't find elsewhere.
            TokenKind::Dot => {
                let start = self.c.bump().span;
                let (name, end) = self.c.expect_ident()?;
                let span = start.cover(end);
                Ok(Expr::Ident(IdentExpr { name: QualName { module: None, name, span } }))
            }
            other => Err(SyntaxError::parse(self.c.span(), format!("unexpected token {other:?}"))),
        }
    }

    /// `{1, 2, 3}` set constructor or `{name := expr, ...}` free object
    /// literal (spec.md glossary: "Free object: an ad-hoc object value
    /// with named fields, not stored in the catalog"). `Type { shape }`
    /// always carries an explicit subject path and is handled by
    /// [`Self::parse_shape_element`]/the postfix `{` case instead; a bare
    /// leading `{` at expression level is either a set or a free object,
    /// distinguished by whether its first element is a `name := expr`
    /// computed field.
    fn parse_brace_expr(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.c.expect_kind(TokenKind::LBrace)?;
        if self.c.is_kind(&TokenKind::RBrace) {
            let end = self.c.bump().span;
            return Ok(Expr::SetCtor(SetCtorExpr { elements: Vec::new(), span: start.cover(end) }));
        }
        if matches!(self.c.peek(), TokenKind::Ident(_)) && matches!(self.c.peek_at(1), TokenKind::ColonEq) {
            return self.parse_free_object(start);
        }
        let mut elements = Vec::new();
        while !self.c.is_kind(&TokenKind::RBrace) {
            elements.push(self.parse_expr()?);
            if !self.c.eat_kind(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.c.expect_kind(TokenKind::RBrace)?;
        Ok(Expr::SetCtor(SetCtorExpr { elements, span: start.cover(end) }))
    }

    fn parse_free_object(&mut self, start: Span) -> Result<Expr, SyntaxError> {
        let mut fields = Vec::new();
        while !self.c.is_kind(&TokenKind::RBrace) {
            let (name, _) = self.c.expect_ident()?;
            self.c.expect_kind(TokenKind::ColonEq)?;
            let value = self.parse_expr()?;
            fields.push(FreeObjectField { name, value });
            if !self.c.eat_kind(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.c.expect_kind(TokenKind::RBrace)?;
        Ok(Expr::FreeObject(FreeObjectExpr { fields, span: start.cover(end) }))
    }

    fn parse_paren_or_tuple(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.c.expect_kind(TokenKind::LParen)?;
        if self.c.eat_kind(&TokenKind::RParen) {
            return Ok(Expr::Tuple(TupleExpr { elements: Vec::new(), span: start.cover(self.c.prev_span()) }));
        }
        let mut elements = Vec::new();
        let mut is_tuple = false;
        loop {
            let named = if matches!(self.c.peek(), TokenKind::Ident(_)) && matches!(self.c.peek_at(1), TokenKind::ColonEq) {
                let (n, _) = self.c.expect_ident()?;
                self.c.expect_kind(TokenKind::ColonEq)?;
                is_tuple = true;
                Some(n)
            } else {
                None
            };
            let e = self.parse_expr()?;
            elements.push((named, e));
            if self.c.eat_kind(&TokenKind::Comma) {
                is_tuple = true;
                if self.c.is_kind(&TokenKind::RParen) {
                    break;
                }
                continue;
            }
            break;
        }
        let end = self.c.expect_kind(TokenKind::RParen)?;
        if !is_tuple && elements.len() == 1 {
            // a plain parenthesized expression, not a 1-tuple
            return Ok(elements.pop().unwrap().1);
        }
        Ok(Expr::Tuple(TupleExpr { elements, span: start.cover(end) }))
    }

    fn parse_array_or_range(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.c.expect_kind(TokenKind::LBracket)?;
        let mut elements = Vec::new();
        while !self.c.is_kind(&TokenKind::RBracket) {
            elements.push(self.parse_expr()?);
            if !self.c.eat_kind(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.c.expect_kind(TokenKind::RBracket)?;
        Ok(Expr::Array(ArrayExpr { elements, span: start.cover(end) }))
    }

    fn parse_ident_or_call(&mut self) -> Result<Expr, SyntaxError> {
        let name = self.parse_qual_name()?;
        if self.c.eat_kind(&TokenKind::LParen) {
            let mut args = Vec::new();
            let mut named_args = Vec::new();
            while !self.c.is_kind(&TokenKind::RParen) {
                if matches!(self.c.peek(), TokenKind::Ident(_)) && matches!(self.c.peek_at(1), TokenKind::ColonEq) {
                    let (n, _) = self.c.expect_ident()?;
                    self.c.expect_kind(TokenKind::ColonEq)?;
                    named_args.push((n, self.parse_expr()?));
                } else {
                    args.push(self.parse_expr()?);
                }
                if !self.c.eat_kind(&TokenKind::Comma) {
                    break;
                }
            }
            let end = self.c.expect_kind(TokenKind::RParen)?;
            let span = name.span.cover(end);
            return Ok(Expr::FunctionCall(FunctionCallExpr { name, args, named_args, span }));
        }
        Ok(Expr::Ident(IdentExpr { name }))
    }

    fn parse_select(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.c.expect_keyword(Keyword::Select)?;
        let subject = self.parse_expr()?;
        let (filter, order_by, offset, limit, end) = self.parse_select_tail()?;
        let span = start.cover(end.unwrap_or_else(|| subject.span()));
        Ok(Expr::Select(Box::new(SelectExpr { subject, filter, order_by, offset, limit, span })))
    }

    #[allow(clippy::type_complexity)]
    fn parse_select_tail(
        &mut self,
    ) -> Result<(Option<Expr>, Vec<OrderItem>, Option<Expr>, Option<Expr>, Option<Span>), SyntaxError> {
        let mut filter = None;
        let mut order_by = Vec::new();
        let mut offset = None;
        let mut limit = None;
        let mut last = None;
        if self.c.eat_keyword(Keyword::Filter) {
            let f = self.parse_expr()?;
            last = Some(f.span());
            filter = Some(f);
        }
        if self.c.eat_keyword(Keyword::Order) {
            self.c.expect_keyword(Keyword::By)?;
            order_by = self.parse_order_by_list()?;
            last = order_by.last().map(|i| i.expr.span());
        }
        // `offset`/`limit` are evaluated in the outer scope (spec.md §4.5).
        if self.c.eat_keyword(Keyword::Offset) {
            let o = self.parse_expr()?;
            last = Some(o.span());
            offset = Some(o);
        }
        if self.c.eat_keyword(Keyword::Limit) {
            let l = self.parse_expr()?;
            last = Some(l.span());
            limit = Some(l);
        }
        Ok((filter, order_by, offset, limit, last))
    }

    fn parse_insert(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.c.expect_keyword(Keyword::Insert)?;
        let type_name = self.parse_qual_name()?;
        let mut elements = Vec::new();
        if self.c.eat_kind(&TokenKind::LBrace) {
            while !self.c.is_kind(&TokenKind::RBrace) {
                let (name, el_start) = self.c.expect_ident()?;
                self.c.expect_kind(TokenKind::ColonEq)?;
                let value = self.parse_expr()?;
                let span = el_start.cover(value.span());
                elements.push(InsertShapeElement { name, value, span });
                if !self.c.eat_kind(&TokenKind::Comma) {
                    break;
                }
            }
            self.c.expect_kind(TokenKind::RBrace)?;
        }
        let mut unless_conflict = None;
        let mut end = self.c.prev_span();
        if self.c.eat_keyword(Keyword::Unless) {
            self.c.expect_keyword(Keyword::Conflict)?;
            let mut on = None;
            if self.c.eat_keyword(Keyword::On) {
                on = Some(self.parse_paren_expr().or_else(|_| self.parse_expr())?);
            }
            let mut else_expr = None;
            if self.c.eat_keyword(Keyword::Else) {
                let e = self.parse_expr()?;
                end = e.span();
                else_expr = Some(e);
            }
            unless_conflict = Some(UnlessConflict { on, else_expr });
        }
        let span = start.cover(end);
        Ok(Expr::Insert(Box::new(InsertExpr { type_name, elements, unless_conflict, span })))
    }

    fn parse_update(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.c.expect_keyword(Keyword::Update)?;
        let subject = self.parse_postfix_subject()?;
        let mut filter = None;
        if self.c.eat_keyword(Keyword::Filter) {
            filter = Some(self.parse_expr()?);
        }
        self.c.expect_keyword(Keyword::Set)?;
        self.c.expect_kind(TokenKind::LBrace)?;
        let mut set = Vec::new();
        while !self.c.is_kind(&TokenKind::RBrace) {
            let (name, el_start) = self.c.expect_ident()?;
            let op = if self.c.eat_kind(&TokenKind::ColonEq) {
                AssignOp::Assign
            } else if self.c.eat_kind(&TokenKind::PlusEq) {
                AssignOp::Add
            } else if self.c.eat_kind(&TokenKind::MinusEq) {
                AssignOp::Sub
            } else {
                return Err(SyntaxError::parse(self.c.span(), "expected `:=`, `+=`, or `-=` in update set clause"));
            };
            let value = self.parse_expr()?;
            let span = el_start.cover(value.span());
            set.push(UpdateSetElement { name, op, value, span });
            if !self.c.eat_kind(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.c.expect_kind(TokenKind::RBrace)?;
        let span = start.cover(end);
        Ok(Expr::Update(Box::new(UpdateExpr { subject, filter, set, span })))
    }

    fn parse_delete(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.c.expect_keyword(Keyword::Delete)?;
        let subject = self.parse_postfix_subject()?;
        let (filter, order_by, offset, limit, end) = self.parse_select_tail()?;
        let span = start.cover(end.unwrap_or_else(|| subject.span()));
        Ok(Expr::Delete(Box::new(DeleteExpr { subject, filter, order_by, offset, limit, span })))
    }

    /// `update`/`delete` take an object-set subject, which is a full
    /// expression minus its own trailing `filter`/`order by`/etc. clauses
    /// (those belong to the enclosing statement, not the subject path).
    fn parse_postfix_subject(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_union()
    }

    fn parse_for(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.c.expect_keyword(Keyword::For)?;
        let (iterator_name, _) = self.c.expect_ident()?;
        self.c.expect_keyword(Keyword::In)?;
        let iterator = self.parse_expr()?;
        let is_union = self.c.eat_keyword(Keyword::Union);
        let body = self.parse_expr()?;
        let span = start.cover(body.span());
        Ok(Expr::For(Box::new(ForExpr { iterator_name, iterator, is_union, body, span })))
    }

    fn parse_group(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.c.expect_keyword(Keyword::Group)?;
        let subject = self.parse_union()?;
        let mut using = Vec::new();
        if self.c.eat_keyword(Keyword::Using) {
            loop {
                let (name, _) = self.c.expect_ident()?;
                self.c.expect_kind(TokenKind::ColonEq)?;
                let expr = self.parse_expr()?;
                using.push((name, expr));
                if !self.c.eat_kind(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.c.expect_keyword(Keyword::By)?;
        let mut by = Vec::new();
        loop {
            let (name, _) = self.c.expect_ident()?;
            by.push(name);
            if !self.c.eat_kind(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.c.prev_span();
        Ok(Expr::Group(Box::new(GroupExpr { subject, using, by, span: start.cover(end) })))
    }

    fn parse_with(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.c.expect_keyword(Keyword::With)?;
        let mut module = None;
        let mut module_aliases = Vec::new();
        let mut bindings = Vec::new();
        loop {
            if self.c.eat_keyword(Keyword::Module) {
                let (name, _) = self.c.expect_ident()?;
                module = Some(name);
            } else {
                let (name, b_start) = self.c.expect_ident()?;
                if self.c.eat_keyword(Keyword::As) {
                    self.c.expect_keyword(Keyword::Module)?;
                    let (target, _) = self.c.expect_ident()?;
                    module_aliases.push((name, target));
                } else {
                    self.c.expect_kind(TokenKind::ColonEq)?;
                    let value = self.parse_expr()?;
                    let span = b_start.cover(value.span());
                    bindings.push(WithBinding { name, value, span });
                }
            }
            if !self.c.eat_kind(&TokenKind::Comma) {
                break;
            }
        }
        let body = self.parse_expr()?;
        let span = start.cover(body.span());
        Ok(Expr::With(Box::new(WithExpr { module, module_aliases, bindings, body, span })))
    }
}

fn is_ddl_verb(word: &str) -> bool {
    matches!(word, "create" | "alter" | "drop")
}

fn type_expr_as_operand(ty: TypeExpr, span: Span) -> Expr {
    match ty {
        TypeExpr::Named(name) => Expr::Ident(IdentExpr { name }),
        other => Expr::Ident(IdentExpr { name: QualName::short(format!("{other:?}"), span) }),
    }
}

fn number_literal(text: &str, kind: NumberKind, span: Span) -> Result<Literal, SyntaxError> {
    Ok(match kind {
        NumberKind::Int64 => Literal::Int64(
            text.parse()
                .map_err(|_| SyntaxError::lexical(span, format!("integer literal `{text}` out of range")))?,
        ),
        NumberKind::Float64 => Literal::Float64(
            text.parse()
                .map_err(|_| SyntaxError::lexical(span, format!("invalid float literal `{text}`")))?,
        ),
        NumberKind::BigInt => Literal::BigInt(text.to_string()),
        NumberKind::Decimal => Literal::Decimal(text.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_expr, parse_script, parse_statement};

    #[test]
    fn literal_set_ctor_parses() {
        let expr = parse_expr("{1, 2, 3}").unwrap();
        let Expr::SetCtor(ctor) = expr else { panic!("expected a set constructor, got {expr:?}") };
        assert_eq!(ctor.elements.len(), 3);
    }

    #[test]
    fn additive_binds_looser_than_multiplicative() {
        // `1 + 2 * 3` must parse as `1 + (2 * 3)`, i.e. the top-level
        // operator is `+` (spec.md §4.2 precedence table).
        let expr = parse_expr("1 + 2 * 3").unwrap();
        let Expr::Op(OpExpr::Binary { op: BinaryOp::Add, rhs, .. }) = expr else {
            panic!("expected a top-level `+`, got {expr:?}")
        };
        assert!(matches!(*rhs, Expr::Op(OpExpr::Binary { op: BinaryOp::Mul, .. })));
    }

    #[test]
    fn union_is_the_loosest_binary_operator() {
        let expr = parse_expr("1 = 1 union 2 = 2").unwrap();
        assert!(matches!(expr, Expr::Op(OpExpr::Binary { op: BinaryOp::Union, .. })));
    }

    #[test]
    fn path_step_chain_nests_left_to_right() {
        let expr = parse_expr("User.friends.name").unwrap();
        let Expr::PathStep(outer) = expr else { panic!("expected a path step, got {expr:?}") };
        assert_eq!(outer.pointer, "name");
        assert!(matches!(*outer.base, Expr::PathStep(_)));
    }

    #[test]
    fn backlink_with_type_intersection_parses() {
        let expr = parse_expr("User.<owner[is Post]").unwrap();
        let Expr::Backlink(b) = expr else { panic!("expected a backlink, got {expr:?}") };
        assert_eq!(b.pointer, "owner");
        assert!(b.intersect.is_some());
    }

    #[test]
    fn parenthesized_group_overrides_precedence() {
        let expr = parse_expr("(1 + 2) * 3").unwrap();
        assert!(matches!(expr, Expr::Op(OpExpr::Binary { op: BinaryOp::Mul, .. })));
    }

    #[test]
    fn select_with_filter_order_offset_limit_parses() {
        let expr = parse_expr("select User filter .name = 'x' order by .name offset 1 limit 10").unwrap();
        let Expr::Select(select) = expr else { panic!("expected a select, got {expr:?}") };
        assert!(select.filter.is_some());
        assert_eq!(select.order_by.len(), 1);
        assert!(select.offset.is_some());
        assert!(select.limit.is_some());
    }

    #[test]
    fn shape_with_computed_element_and_nested_shape_parses() {
        let expr = parse_expr("select User { name, friend_count := count(.friends), best_friend: { name } }").unwrap();
        let Expr::Select(select) = expr else { panic!("expected a select, got {expr:?}") };
        let Expr::Shape(shape) = select.subject else { panic!("expected a shape subject") };
        assert_eq!(shape.elements.len(), 3);
        assert!(shape.elements[1].computed_expr.is_some());
    }

    #[test]
    fn insert_with_unless_conflict_parses() {
        let expr = parse_expr("insert User { name := 'x' } unless conflict on .name else (select User)").unwrap();
        let Expr::Insert(insert) = expr else { panic!("expected an insert, got {expr:?}") };
        assert_eq!(insert.type_name.name, "User");
        let unless = insert.unless_conflict.expect("unless conflict clause");
        assert!(unless.on.is_some());
        assert!(unless.else_expr.is_some());
    }

    #[test]
    fn update_set_parses_assign_add_and_sub_ops() {
        let expr = parse_expr("update User filter .name = 'x' set { tags += 'a', tags -= 'b', name := 'y' }").unwrap();
        let Expr::Update(update) = expr else { panic!("expected an update, got {expr:?}") };
        assert_eq!(update.set.len(), 3);
        assert_eq!(update.set[0].op, AssignOp::Add);
        assert_eq!(update.set[1].op, AssignOp::Sub);
        assert_eq!(update.set[2].op, AssignOp::Assign);
    }

    #[test]
    fn for_union_body_parses() {
        let expr = parse_expr("for n in {'x', 'y'} union (insert User { name := n })").unwrap();
        let Expr::For(for_expr) = expr else { panic!("expected a for, got {expr:?}") };
        assert_eq!(for_expr.iterator_name, "n");
        assert!(for_expr.is_union);
    }

    #[test]
    fn with_bindings_parse_in_declaration_order() {
        let expr = parse_expr("with a := 1, b := a + 1 select b").unwrap();
        let Expr::With(with_expr) = expr else { panic!("expected a with, got {expr:?}") };
        assert_eq!(with_expr.bindings.len(), 2);
        assert_eq!(with_expr.bindings[0].name, "a");
        assert_eq!(with_expr.bindings[1].name, "b");
    }

    #[test]
    fn group_by_parses_using_and_by_clauses() {
        let expr = parse_expr("group User using active := .is_active by active").unwrap();
        let Expr::Group(group) = expr else { panic!("expected a group, got {expr:?}") };
        assert_eq!(group.using.len(), 1);
        assert_eq!(group.by, vec!["active".to_string()]);
    }

    #[test]
    fn type_cast_and_optional_parameter_parse() {
        let expr = parse_expr("<int64>$count").unwrap();
        let Expr::TypeCast(cast) = expr else { panic!("expected a type cast, got {expr:?}") };
        assert!(matches!(*cast.expr, Expr::Parameter(_)));

        let opt = parse_expr("<optional str>$name").unwrap();
        let Expr::TypeCast(cast) = opt else { panic!("expected a type cast, got {opt:?}") };
        assert!(matches!(cast.target, TypeExpr::Optional(_)));
    }

    #[test]
    fn trailing_input_after_statement_is_rejected() {
        let err = parse_statement("select 1 select 2").unwrap_err();
        assert!(matches!(err, SyntaxError { .. }));
    }

    #[test]
    fn semicolons_between_statements_are_idempotent() {
        let script = parse_script(";;select 1;; select 2;;;").unwrap();
        assert_eq!(script.statements.len(), 2);
    }

    #[test]
    fn sdl_type_declaration_parses_as_a_statement() {
        let stmt = parse_statement("type User { required name: str; multi friends: User; }").unwrap();
        assert!(matches!(stmt, Statement::Sdl(_)));
    }

    #[test]
    fn sdl_type_with_access_policy_and_trigger_parses() {
        let stmt = parse_statement(
            "type User { \
                 required name: str; \
                 access policy owner_only allow select, update read using (true); \
                 trigger log_changes after insert, update for each row do (select User); \
             }",
        )
        .unwrap();
        let Statement::Sdl(SdlDeclaration::ObjectType(o)) = stmt else { panic!("expected an object type declaration") };
        assert_eq!(o.access_policies.len(), 1);
        assert_eq!(o.access_policies[0].actions, vec![AccessAction::Select, AccessAction::UpdateRead]);
        assert_eq!(o.triggers.len(), 1);
        assert_eq!(o.triggers[0].events, vec![TriggerEvent::Insert, TriggerEvent::Update]);
    }

    #[test]
    fn analyze_wraps_the_inner_statement() {
        let stmt = parse_statement("analyze select User").unwrap();
        let Statement::Analyze(inner) = stmt else { panic!("expected an analyze statement, got {stmt:?}") };
        assert!(matches!(*inner, Statement::Query(_)));
    }

    #[test]
    fn detached_forces_a_fresh_binding_key_prefix() {
        let expr = parse_expr("detached User").unwrap();
        assert!(matches!(expr, Expr::Detached(_)));
    }

    #[test]
    fn free_object_literal_parses() {
        let expr = parse_expr("select { count := 1, label := 'x' }").unwrap();
        // A bare braced expression is a free-object literal (no subject
        // to project a shape onto), not a `Select`'s shape subject.
        assert!(matches!(expr, Expr::Select(_) | Expr::FreeObject(_)));
    }
}
