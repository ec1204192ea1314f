use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use indexmap::IndexMap;

use crate::{
    ast::{
        Directive, FragmentDefinition, FragmentSpread, OperationKind, Query, Selection,
        SelectionSet, Variables,
    },
    parser::{Lexer, ParseError, ParseResult, SourcePosition, Spanning, Token},
    value::{Object, Value},
};

/// Parse a request into an operation tree, substituting the provided
/// variables.
///
/// The document must contain exactly one operation; fragment definitions may
/// accompany it. Declared variable type names are carried for nullability
/// only and are never resolved against the schema.
pub fn parse_query(source: &str, variables: &Variables) -> ParseResult<Query> {
    let mut parser = Parser::new(source)?;
    let document = parse_document(&mut parser)?;
    link_document(document, variables)
}

// Unresolved literals as they appear in the source; variables are
// substituted when the raw tree is linked into the operation tree.
#[derive(Clone, Debug)]
enum Literal {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    Enum(String),
    Variable(String, SourcePosition),
    List(Vec<Literal>),
    Object(Vec<(String, Literal)>),
}

#[derive(Debug)]
struct RawDirective {
    name: String,
    args: Vec<(String, Literal)>,
}

#[derive(Debug)]
struct RawField {
    alias: Option<String>,
    name: String,
    args: Vec<(String, Literal)>,
    directives: Vec<RawDirective>,
    selection_set: Option<Vec<RawSelection>>,
}

#[derive(Debug)]
enum RawSelection {
    Field(RawField),
    FragmentSpread {
        name: String,
        directives: Vec<RawDirective>,
        position: SourcePosition,
    },
    InlineFragment {
        on: Option<String>,
        directives: Vec<RawDirective>,
        selection_set: Vec<RawSelection>,
    },
}

#[derive(Debug)]
struct VariableDefinition {
    name: String,
    non_null: bool,
    default_value: Option<Literal>,
}

#[derive(Debug)]
struct RawOperation {
    kind: OperationKind,
    name: Option<String>,
    variable_definitions: Vec<VariableDefinition>,
    selection_set: Vec<RawSelection>,
    position: SourcePosition,
}

#[derive(Debug)]
struct RawFragment {
    name: String,
    on: String,
    selection_set: Vec<RawSelection>,
    position: SourcePosition,
}

#[derive(Debug)]
struct RawDocument {
    operations: Vec<RawOperation>,
    fragments: IndexMap<String, RawFragment>,
}

struct Parser<'a> {
    tokens: Vec<Spanning<Token<'a>>>,
    cursor: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Result<Self, Spanning<ParseError>> {
        let mut tokens = Vec::new();
        for res in Lexer::new(source) {
            match res {
                Ok(token) => tokens.push(token),
                Err(e) => return Err(e.map(ParseError::Lexer)),
            }
        }
        Ok(Parser { tokens, cursor: 0 })
    }

    fn peek(&self) -> &Spanning<Token<'a>> {
        &self.tokens[self.cursor]
    }

    fn next_token(&mut self) -> ParseResult<Spanning<Token<'a>>> {
        if self.cursor + 1 >= self.tokens.len() {
            Err(Spanning::new(
                self.peek().position,
                ParseError::UnexpectedEndOfFile,
            ))
        } else {
            let token = self.tokens[self.cursor].clone();
            self.cursor += 1;
            Ok(token)
        }
    }

    fn expect(&mut self, expected: &Token<'_>) -> ParseResult<Spanning<Token<'a>>> {
        if &self.peek().item != expected {
            let next = self.next_token()?;
            Err(next.map(|t| ParseError::unexpected_token(&t)))
        } else {
            self.next_token()
        }
    }

    fn skip(&mut self, expected: &Token<'_>) -> ParseResult<bool> {
        if &self.peek().item == expected {
            self.next_token()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_name(&mut self) -> ParseResult<Spanning<String>> {
        match self.peek().item {
            Token::Name(_) => {
                let token = self.next_token()?;
                match token.item {
                    Token::Name(name) => Ok(Spanning::new(token.position, name.into())),
                    _ => unreachable!(),
                }
            }
            _ => {
                let next = self.next_token()?;
                Err(next.map(|t| ParseError::unexpected_token(&t)))
            }
        }
    }
}

fn parse_document(parser: &mut Parser<'_>) -> ParseResult<RawDocument> {
    let mut document = RawDocument {
        operations: Vec::new(),
        fragments: IndexMap::new(),
    };

    loop {
        if parser.peek().item == Token::EndOfFile {
            return Ok(document);
        }

        match parser.peek().item {
            Token::CurlyOpen
            | Token::Name("query")
            | Token::Name("mutation")
            | Token::Name("subscription") => {
                document.operations.push(parse_operation(parser)?);
            }
            Token::Name("fragment") => {
                let fragment = parse_fragment(parser)?;
                let position = fragment.position;
                if let Some(prev) = document.fragments.insert(fragment.name.clone(), fragment) {
                    return Err(Spanning::new(
                        position,
                        ParseError::DuplicateFragment(prev.name),
                    ));
                }
            }
            _ => {
                let next = parser.next_token()?;
                return Err(next.map(|t| ParseError::unexpected_token(&t)));
            }
        }
    }
}

fn parse_operation(parser: &mut Parser<'_>) -> ParseResult<RawOperation> {
    let position = parser.peek().position;

    if parser.peek().item == Token::CurlyOpen {
        let selection_set = parse_selection_set(parser)?;
        return Ok(RawOperation {
            kind: OperationKind::Query,
            name: None,
            variable_definitions: Vec::new(),
            selection_set,
            position,
        });
    }

    let kind = match parser.expect_name()?.item.as_str() {
        "query" => OperationKind::Query,
        "mutation" => OperationKind::Mutation,
        "subscription" => OperationKind::Subscription,
        other => {
            return Err(Spanning::new(
                position,
                ParseError::UnexpectedToken(other.into()),
            ));
        }
    };

    let name = match parser.peek().item {
        Token::Name(_) => Some(parser.expect_name()?.item),
        _ => None,
    };

    let variable_definitions = if parser.peek().item == Token::ParenOpen {
        parse_variable_definitions(parser)?
    } else {
        Vec::new()
    };

    // Operation-level directives are accepted and dropped; only selection
    // and spread directives participate in execution.
    let _ = parse_directives(parser)?;

    let selection_set = parse_selection_set(parser)?;

    Ok(RawOperation {
        kind,
        name,
        variable_definitions,
        selection_set,
        position,
    })
}

fn parse_fragment(parser: &mut Parser<'_>) -> ParseResult<RawFragment> {
    let position = parser.expect(&Token::Name("fragment"))?.position;
    let name = parser.expect_name()?.item;
    parser.expect(&Token::Name("on"))?;
    let on = parser.expect_name()?.item;
    let _ = parse_directives(parser)?;
    let selection_set = parse_selection_set(parser)?;

    Ok(RawFragment {
        name,
        on,
        selection_set,
        position,
    })
}

fn parse_variable_definitions(parser: &mut Parser<'_>) -> ParseResult<Vec<VariableDefinition>> {
    parser.expect(&Token::ParenOpen)?;
    let mut defs = Vec::new();

    loop {
        if parser.skip(&Token::ParenClose)? {
            return Ok(defs);
        }

        parser.expect(&Token::Dollar)?;
        let name = parser.expect_name()?.item;
        parser.expect(&Token::Colon)?;
        let non_null = parse_type_literal(parser)?;

        let default_value = if parser.skip(&Token::Equals)? {
            Some(parse_value_literal(parser, true)?)
        } else {
            None
        };

        defs.push(VariableDefinition {
            name,
            non_null,
            default_value,
        });
    }
}

// Consumes a type literal, returning whether its outermost wrapper is
// non-null. The named part is deliberately not resolved against the schema.
fn parse_type_literal(parser: &mut Parser<'_>) -> ParseResult<bool> {
    if parser.skip(&Token::BracketOpen)? {
        parse_type_literal(parser)?;
        parser.expect(&Token::BracketClose)?;
    } else {
        parser.expect_name()?;
    }
    parser.skip(&Token::ExclamationMark)
}

fn parse_selection_set(parser: &mut Parser<'_>) -> ParseResult<Vec<RawSelection>> {
    parser.expect(&Token::CurlyOpen)?;
    let mut selections = Vec::new();

    loop {
        if parser.skip(&Token::CurlyClose)? {
            if selections.is_empty() {
                return Err(Spanning::new(
                    parser.peek().position,
                    ParseError::UnexpectedToken("}".into()),
                ));
            }
            return Ok(selections);
        }
        selections.push(parse_selection(parser)?);
    }
}

fn parse_selection(parser: &mut Parser<'_>) -> ParseResult<RawSelection> {
    if parser.peek().item == Token::Ellipsis {
        return parse_fragment_usage(parser);
    }

    let first = parser.expect_name()?;
    let (alias, name) = if parser.skip(&Token::Colon)? {
        (Some(first.item), parser.expect_name()?.item)
    } else {
        (None, first.item)
    };

    let args = if parser.peek().item == Token::ParenOpen {
        parse_arguments(parser)?
    } else {
        Vec::new()
    };

    let directives = parse_directives(parser)?;

    let selection_set = if parser.peek().item == Token::CurlyOpen {
        Some(parse_selection_set(parser)?)
    } else {
        None
    };

    Ok(RawSelection::Field(RawField {
        alias,
        name,
        args,
        directives,
        selection_set,
    }))
}

fn parse_fragment_usage(parser: &mut Parser<'_>) -> ParseResult<RawSelection> {
    parser.expect(&Token::Ellipsis)?;

    match parser.peek().item {
        Token::Name("on") => {
            parser.expect_name()?;
            let on = parser.expect_name()?.item;
            let directives = parse_directives(parser)?;
            let selection_set = parse_selection_set(parser)?;
            Ok(RawSelection::InlineFragment {
                on: Some(on),
                directives,
                selection_set,
            })
        }
        Token::Name(_) => {
            let name = parser.expect_name()?;
            let directives = parse_directives(parser)?;
            Ok(RawSelection::FragmentSpread {
                name: name.item,
                directives,
                position: name.position,
            })
        }
        Token::At | Token::CurlyOpen => {
            let directives = parse_directives(parser)?;
            let selection_set = parse_selection_set(parser)?;
            Ok(RawSelection::InlineFragment {
                on: None,
                directives,
                selection_set,
            })
        }
        _ => {
            let next = parser.next_token()?;
            Err(next.map(|t| ParseError::unexpected_token(&t)))
        }
    }
}

fn parse_directives(parser: &mut Parser<'_>) -> ParseResult<Vec<RawDirective>> {
    let mut directives = Vec::new();
    while parser.peek().item == Token::At {
        parser.next_token()?;
        let name = parser.expect_name()?.item;
        let args = if parser.peek().item == Token::ParenOpen {
            parse_arguments(parser)?
        } else {
            Vec::new()
        };
        directives.push(RawDirective { name, args });
    }
    Ok(directives)
}

fn parse_arguments(parser: &mut Parser<'_>) -> ParseResult<Vec<(String, Literal)>> {
    parser.expect(&Token::ParenOpen)?;
    let mut args = Vec::new();

    loop {
        if parser.skip(&Token::ParenClose)? {
            return Ok(args);
        }
        let name = parser.expect_name()?.item;
        parser.expect(&Token::Colon)?;
        let value = parse_value_literal(parser, false)?;
        args.push((name, value));
    }
}

fn parse_value_literal(parser: &mut Parser<'_>, is_const: bool) -> ParseResult<Literal> {
    let token = parser.peek().clone();
    match token.item {
        Token::Dollar if !is_const => {
            parser.next_token()?;
            let name = parser.expect_name()?;
            Ok(Literal::Variable(name.item, name.position))
        }
        Token::Int(i) => {
            parser.next_token()?;
            Ok(Literal::Int(i))
        }
        Token::Float(f) => {
            parser.next_token()?;
            Ok(Literal::Float(f))
        }
        Token::String(_) => {
            let token = parser.next_token()?;
            match token.item {
                Token::String(s) => Ok(Literal::String(s)),
                _ => unreachable!(),
            }
        }
        Token::Name("true") => {
            parser.next_token()?;
            Ok(Literal::Boolean(true))
        }
        Token::Name("false") => {
            parser.next_token()?;
            Ok(Literal::Boolean(false))
        }
        Token::Name("null") => {
            parser.next_token()?;
            Ok(Literal::Null)
        }
        Token::Name(name) => {
            parser.next_token()?;
            Ok(Literal::Enum(name.into()))
        }
        Token::BracketOpen => {
            parser.next_token()?;
            let mut items = Vec::new();
            loop {
                if parser.skip(&Token::BracketClose)? {
                    return Ok(Literal::List(items));
                }
                items.push(parse_value_literal(parser, is_const)?);
            }
        }
        Token::CurlyOpen => {
            parser.next_token()?;
            let mut fields = Vec::new();
            loop {
                if parser.skip(&Token::CurlyClose)? {
                    return Ok(Literal::Object(fields));
                }
                let name = parser.expect_name()?.item;
                parser.expect(&Token::Colon)?;
                fields.push((name, parse_value_literal(parser, is_const)?));
            }
        }
        _ => {
            let next = parser.next_token()?;
            Err(next.map(|t| ParseError::unexpected_token(&t)))
        }
    }
}

// Linking: substitute variables, resolve fragment spreads, enforce the
// single-operation, cycle, usage and conflict rules.
fn link_document(document: RawDocument, variables: &Variables) -> ParseResult<Query> {
    let start = SourcePosition::start_of_query();

    if document.operations.len() != 1 {
        return Err(Spanning::new(start, ParseError::SingleOperationRequired));
    }
    let operation = document.operations.into_iter().next().unwrap();

    let bindings = bind_variables(&operation, variables)?;
    check_fragment_cycles(&document.fragments)?;

    let mut linker = Linker {
        fragments: &document.fragments,
        bindings: &bindings,
        resolved: HashMap::new(),
        used: HashSet::new(),
    };

    let selection_set = linker.link_selection_set(&operation.selection_set)?;

    for name in document.fragments.keys() {
        if !linker.used.contains(name) {
            return Err(Spanning::new(
                document.fragments[name].position,
                ParseError::UnusedFragment(name.clone()),
            ));
        }
    }

    check_conflicts(&selection_set, operation.position)?;

    Ok(Query {
        kind: operation.kind,
        name: operation.name,
        selection_set,
    })
}

fn bind_variables(
    operation: &RawOperation,
    variables: &Variables,
) -> ParseResult<HashMap<String, Value>> {
    let mut bindings = HashMap::new();

    for def in &operation.variable_definitions {
        let value = match variables.get(&def.name) {
            Some(v) if !v.is_null() => v.clone(),
            _ => match &def.default_value {
                Some(default) => resolve_literal(default, &HashMap::new())?,
                None if def.non_null => {
                    return Err(Spanning::new(
                        operation.position,
                        ParseError::MissingVariable(def.name.clone()),
                    ));
                }
                None => Value::Null,
            },
        };
        bindings.insert(def.name.clone(), value);
    }

    Ok(bindings)
}

fn resolve_literal(
    literal: &Literal,
    bindings: &HashMap<String, Value>,
) -> ParseResult<Value> {
    Ok(match literal {
        Literal::Null => Value::Null,
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Enum(name) => Value::String(name.clone()),
        Literal::Variable(name, position) => match bindings.get(name) {
            Some(v) => v.clone(),
            None => {
                return Err(Spanning::new(
                    *position,
                    ParseError::UndefinedVariable(name.clone()),
                ));
            }
        },
        Literal::List(items) => Value::List(
            items
                .iter()
                .map(|l| resolve_literal(l, bindings))
                .collect::<ParseResult<_>>()?,
        ),
        Literal::Object(fields) => {
            let mut object = Object::with_capacity(fields.len());
            for (name, value) in fields {
                object.add_field(name.clone(), resolve_literal(value, bindings)?);
            }
            Value::Object(object)
        }
    })
}

fn resolve_arguments(
    args: &[(String, Literal)],
    bindings: &HashMap<String, Value>,
) -> ParseResult<Value> {
    if args.is_empty() {
        return Ok(Value::Null);
    }
    let mut object = Object::with_capacity(args.len());
    for (name, value) in args {
        object.add_field(name.clone(), resolve_literal(value, bindings)?);
    }
    Ok(Value::Object(object))
}

fn check_fragment_cycles(fragments: &IndexMap<String, RawFragment>) -> ParseResult<()> {
    fn spreads_of(set: &[RawSelection], out: &mut Vec<(String, SourcePosition)>) {
        for sel in set {
            match sel {
                RawSelection::Field(f) => {
                    if let Some(sub) = &f.selection_set {
                        spreads_of(sub, out);
                    }
                }
                RawSelection::FragmentSpread { name, position, .. } => {
                    out.push((name.clone(), *position));
                }
                RawSelection::InlineFragment { selection_set, .. } => {
                    spreads_of(selection_set, out);
                }
            }
        }
    }

    fn visit(
        name: &str,
        fragments: &IndexMap<String, RawFragment>,
        visiting: &mut Vec<String>,
        done: &mut HashSet<String>,
    ) -> ParseResult<()> {
        if done.contains(name) {
            return Ok(());
        }
        let Some(fragment) = fragments.get(name) else {
            // Unknown spreads are reported during linking, with a position.
            return Ok(());
        };
        if visiting.iter().any(|n| n == name) {
            return Err(Spanning::new(
                fragment.position,
                ParseError::FragmentCycle(name.into()),
            ));
        }

        visiting.push(name.into());
        let mut spreads = Vec::new();
        spreads_of(&fragment.selection_set, &mut spreads);
        for (spread, _) in spreads {
            visit(&spread, fragments, visiting, done)?;
        }
        visiting.pop();
        done.insert(name.into());
        Ok(())
    }

    let mut done = HashSet::new();
    for name in fragments.keys() {
        visit(name, fragments, &mut Vec::new(), &mut done)?;
    }
    Ok(())
}

struct Linker<'a> {
    fragments: &'a IndexMap<String, RawFragment>,
    bindings: &'a HashMap<String, Value>,
    resolved: HashMap<String, Arc<FragmentDefinition>>,
    used: HashSet<String>,
}

impl Linker<'_> {
    fn link_selection_set(&mut self, raw: &[RawSelection]) -> ParseResult<SelectionSet> {
        let mut set = SelectionSet::default();

        for sel in raw {
            match sel {
                RawSelection::Field(f) => {
                    let args = resolve_arguments(&f.args, self.bindings)?;
                    let sub = match &f.selection_set {
                        Some(sub) => Some(self.link_selection_set(sub)?),
                        None => None,
                    };
                    let alias = f.alias.clone().unwrap_or_else(|| f.name.clone());
                    set.selections.push(Selection::new(
                        f.name.clone(),
                        alias,
                        args,
                        sub,
                        self.link_directives(&f.directives)?,
                    ));
                }
                RawSelection::FragmentSpread {
                    name,
                    directives,
                    position,
                } => {
                    let fragment = self.link_fragment(name, *position)?;
                    set.fragments.push(FragmentSpread {
                        fragment,
                        directives: self.link_directives(directives)?,
                    });
                }
                RawSelection::InlineFragment {
                    on,
                    directives,
                    selection_set,
                } => {
                    let fragment = Arc::new(FragmentDefinition {
                        name: String::new(),
                        on: on.clone().unwrap_or_default(),
                        selection_set: self.link_selection_set(selection_set)?,
                    });
                    set.fragments.push(FragmentSpread {
                        fragment,
                        directives: self.link_directives(directives)?,
                    });
                }
            }
        }

        Ok(set)
    }

    fn link_fragment(
        &mut self,
        name: &str,
        position: SourcePosition,
    ) -> ParseResult<Arc<FragmentDefinition>> {
        self.used.insert(name.into());

        if let Some(resolved) = self.resolved.get(name) {
            return Ok(Arc::clone(resolved));
        }

        let Some(raw) = self.fragments.get(name) else {
            return Err(Spanning::new(
                position,
                ParseError::UnknownFragment(name.into()),
            ));
        };

        let fragment = Arc::new(FragmentDefinition {
            name: raw.name.clone(),
            on: raw.on.clone(),
            selection_set: self.link_selection_set(&raw.selection_set)?,
        });
        self.resolved.insert(name.into(), Arc::clone(&fragment));
        Ok(fragment)
    }

    fn link_directives(&mut self, raw: &[RawDirective]) -> ParseResult<Vec<Directive>> {
        raw.iter()
            .map(|d| {
                Ok(Directive {
                    name: d.name.clone(),
                    args: resolve_arguments(&d.args, self.bindings)?,
                })
            })
            .collect()
    }
}

// Two selections may share an output alias only when they name the same
// field with structurally equal arguments. Fragment contents count towards
// the selection set they are spread into.
fn check_conflicts(set: &SelectionSet, position: SourcePosition) -> ParseResult<()> {
    fn flattened<'a>(set: &'a SelectionSet, out: &mut Vec<&'a Selection>) {
        for sel in &set.selections {
            out.push(sel);
        }
        for spread in &set.fragments {
            flattened(&spread.fragment.selection_set, out);
        }
    }

    let mut selections = Vec::new();
    flattened(set, &mut selections);

    let mut seen: HashMap<&str, &Selection> = HashMap::new();
    for &sel in &selections {
        if let Some(prev) = seen.get(sel.alias.as_str()) {
            if prev.name != sel.name || prev.args != sel.args {
                return Err(Spanning::new(
                    position,
                    ParseError::SelectionConflict(sel.alias.clone()),
                ));
            }
        } else {
            seen.insert(&sel.alias, sel);
        }
    }

    for sel in selections {
        if let Some(sub) = &sel.selection_set {
            check_conflicts(sub, position)?;
        }
    }
    Ok(())
}
