//! Static checks of an operation tree against the schema.
//!
//! The validator walks the selection tree once, checks every selection
//! against the declared fields, enforces the leaf and composite selection
//! rules, and coerces each selection's arguments through the field's
//! argument parser. Coercion happens exactly once per selection; execution
//! reuses the cached record. The first broken rule fails the request.

use crate::{
    ast::{Directive, OperationKind, Query, SelectionSet},
    errors::{Error, PathSegment},
    schema::{
        meta::MetaType,
        model::{Schema, SchemaType},
    },
    value::Value,
};

/// Validate `query` against `schema`, coercing all selection arguments.
pub fn validate_query(schema: &Schema, query: &Query) -> Result<(), Error> {
    let schema = schema.schema_type();

    let root = match query.kind {
        OperationKind::Query => Some(schema.query_type()),
        OperationKind::Mutation => schema.mutation_type(),
        OperationKind::Subscription => schema.subscription_type(),
    };
    let Some(root) = root else {
        return Err(Error::new(format!("schema has no {} type", query.kind)));
    };

    let validator = Validator { schema };
    let mut path = Vec::new();
    validator.validate_set(root, &query.selection_set, &mut path)
}

struct Validator<'a> {
    schema: &'a SchemaType,
}

impl Validator<'_> {
    fn validate_set(
        &self,
        parent: &MetaType,
        set: &SelectionSet,
        path: &mut Vec<PathSegment>,
    ) -> Result<(), Error> {
        for sel in &set.selections {
            self.check_directives(&sel.directives, path)?;

            if sel.name == "__typename" {
                if sel.selection_set.is_some() {
                    return Err(
                        Error::new("\"__typename\" must not have a subselection")
                            .at(path.clone()),
                    );
                }
                continue;
            }

            if let MetaType::Union(u) = parent {
                return Err(Error::new(format!(
                    "cannot directly query field \"{}\" on union \"{}\"; \
                     use an inline fragment on a member type",
                    sel.name, u.name,
                ))
                .at(path.clone()));
            }

            let Some(field) = parent.field_by_name(&sel.name) else {
                return Err(Error::new(format!(
                    "unknown field \"{}\" on type \"{}\"",
                    sel.name,
                    parent.name(),
                ))
                .at(path.clone()));
            };

            path.push(PathSegment::Field(sel.alias.clone()));

            if !sel.is_parsed() {
                match (field.parse_arguments)(&sel.args, self.schema.input_context()) {
                    Ok(parsed) => sel.set_parsed_args(parsed),
                    Err(e) => return Err(Error::from(e).at(path.clone())),
                }
            }

            let inner_name = field.field_type.innermost_name();
            let Some(inner) = self.schema.concrete_type_by_name(inner_name) else {
                return Err(Error::new(format!(
                    "type \"{inner_name}\" missing from schema",
                ))
                .at(path.clone()));
            };

            match (&sel.selection_set, inner.is_leaf()) {
                (Some(_), true) => {
                    return Err(Error::new(format!(
                        "field \"{}\" of type {} must not have a subselection",
                        sel.name, field.field_type,
                    ))
                    .at(path.clone()));
                }
                (None, false) => {
                    return Err(Error::new(format!(
                        "field \"{}\" of type {} must have a subselection",
                        sel.name, field.field_type,
                    ))
                    .at(path.clone()));
                }
                (Some(sub), false) => self.validate_set(inner, sub, path)?,
                (None, true) => {}
            }

            path.pop();
        }

        for spread in &set.fragments {
            self.check_directives(&spread.directives, path)?;

            match self.fragment_target(parent, &spread.fragment.on, path)? {
                Some(target) => {
                    self.validate_set(target, &spread.fragment.selection_set, path)?;
                }
                // Incompatible type condition: legal, just never selected.
                None => {}
            }
        }

        Ok(())
    }

    // Resolves the type a fragment's selections validate against, or None
    // when the condition can never match the parent.
    fn fragment_target<'s>(
        &'s self,
        parent: &'s MetaType,
        on: &str,
        path: &[PathSegment],
    ) -> Result<Option<&'s MetaType>, Error> {
        if on.is_empty() || on == parent.name().as_str() {
            return Ok(Some(parent));
        }

        let Some(target) = self.schema.concrete_type_by_name(on) else {
            return Err(Error::new(format!(
                "unknown type \"{on}\" in fragment condition",
            ))
            .at(path.to_vec()));
        };

        let compatible = match parent {
            // Interface fragments apply on objects implementing them.
            MetaType::Object(o) => o.interfaces.iter().any(|i| i.as_str() == on),
            MetaType::Interface(i) => i.possible_types.iter().any(|m| m.name.as_str() == on),
            MetaType::Union(u) => u.members.iter().any(|m| m.name.as_str() == on),
            _ => false,
        };

        Ok(compatible.then_some(target))
    }

    fn check_directives(
        &self,
        directives: &[Directive],
        path: &[PathSegment],
    ) -> Result<(), Error> {
        for directive in directives {
            if directive.name != "skip" && directive.name != "include" {
                continue;
            }
            let condition = directive
                .args
                .as_object()
                .and_then(|o| o.get_field_value("if"));
            match condition {
                Some(Value::Boolean(_)) => {}
                Some(_) => {
                    return Err(Error::new(format!(
                        "the \"if\" argument of @{} must be a Boolean",
                        directive.name,
                    ))
                    .at(path.to_vec()));
                }
                None => {
                    return Err(Error::new(format!(
                        "directive @{} requires an \"if\" argument",
                        directive.name,
                    ))
                    .at(path.to_vec()));
                }
            }
        }
        Ok(())
    }
}
