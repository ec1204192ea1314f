//! The operation tree produced by the parser.
//!
//! A parsed request is a [`Query`] holding a [`SelectionSet`]. Selection sets
//! separate plain selections from fragment spreads because GraphQL allows
//! multiple spreads of the same fragment; inline fragments are modeled as
//! spreads of an unnamed fragment definition carrying the type condition.

use std::{
    any::Any,
    fmt,
    sync::{Arc, OnceLock},
};

use indexmap::IndexMap;

use crate::value::Value;

/// The variable bindings supplied alongside a request.
pub type Variables = IndexMap<String, Value>;

/// The typed, type-erased argument record produced by a field's argument
/// parser. Resolver adapters downcast it back to the concrete record type.
pub type ParsedArgs = Arc<dyn Any + Send + Sync>;

/// The kind of operation a request performs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperationKind {
    /// A read-only query; sibling selections may run in any order.
    Query,
    /// A mutation; top-level selections run sequentially in source order.
    Mutation,
    /// A subscription; one selection executes per delivered event.
    Subscription,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        })
    }
}

/// A parsed operation, ready for validation and execution.
#[derive(Debug)]
pub struct Query {
    /// Whether this is a query, mutation or subscription.
    pub kind: OperationKind,
    /// The operation name, when one was given.
    pub name: Option<String>,
    /// The root selection set.
    pub selection_set: SelectionSet,
}

/// An ordered list of selections plus an ordered list of fragment spreads.
#[derive(Debug, Default)]
pub struct SelectionSet {
    /// Plain field selections, in source order.
    pub selections: Vec<Selection>,
    /// Fragment spreads (named and inline), in source order.
    pub fragments: Vec<FragmentSpread>,
}

impl SelectionSet {
    /// Whether this selection set selects nothing at all.
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty() && self.fragments.is_empty()
    }
}

/// One selected field.
///
/// The selection `me: user(id: 166) { name }` has name `user` (the schema
/// field to resolve), alias `me` (the output key), args `{id: 166}` and a
/// subselection on the resulting object.
pub struct Selection {
    /// The schema field name.
    pub name: String,
    /// The output key; defaults to the field name.
    pub alias: String,
    /// Raw arguments, variables already substituted.
    pub args: Value,
    /// The subselection, for composite result types.
    pub selection_set: Option<SelectionSet>,
    /// Directives attached at this position.
    pub directives: Vec<Directive>,

    // Coerced exactly once by the validator, then reused on every execution.
    parsed_args: OnceLock<ParsedArgs>,
}

impl Selection {
    /// Create a selection with no parsed arguments yet.
    pub fn new(
        name: String,
        alias: String,
        args: Value,
        selection_set: Option<SelectionSet>,
        directives: Vec<Directive>,
    ) -> Self {
        Selection {
            name,
            alias,
            args,
            selection_set,
            directives,
            parsed_args: OnceLock::new(),
        }
    }

    /// The coerced argument record, when the validator has produced it.
    pub fn parsed_args(&self) -> Option<&ParsedArgs> {
        self.parsed_args.get()
    }

    /// Store the coerced argument record. Later calls are no-ops, which is
    /// what makes re-validating a shared fragment harmless.
    pub fn set_parsed_args(&self, args: ParsedArgs) {
        let _ = self.parsed_args.set(args);
    }

    /// Whether arguments were already coerced for this selection.
    pub fn is_parsed(&self) -> bool {
        self.parsed_args.get().is_some()
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("args", &self.args)
            .field("selection_set", &self.selection_set)
            .field("directives", &self.directives)
            .field("parsed", &self.is_parsed())
            .finish()
    }
}

/// A reusable part of a query, spread by name or inline.
///
/// `on` holds the type condition; it is empty for inline fragments without
/// one, and the fragment then applies to the enclosing type unconditionally.
#[derive(Debug)]
pub struct FragmentDefinition {
    /// The fragment name; empty for inline fragments.
    pub name: String,
    /// The type condition, empty when absent.
    pub on: String,
    /// The fragment body.
    pub selection_set: SelectionSet,
}

/// A usage of a fragment, carrying the directives applied at the spread
/// site rather than at the definition site.
#[derive(Clone, Debug)]
pub struct FragmentSpread {
    /// The spread fragment.
    pub fragment: Arc<FragmentDefinition>,
    /// Directives attached at the spread position.
    pub directives: Vec<Directive>,
}

/// A directive applied to a selection or fragment spread.
#[derive(Clone, Debug, PartialEq)]
pub struct Directive {
    /// The directive name, without the leading `@`.
    pub name: String,
    /// The directive arguments, variables already substituted.
    pub args: Value,
}
