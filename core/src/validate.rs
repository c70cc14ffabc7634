//! Whole-specification definition checks.
//!
//! The classifier validates each field on its own; the checks here need the
//! full tree: the tokenizer has a single flat namespace, so field names and
//! option spellings must be unique across every nested group, mutually
//! exclusive groups may only hold plain optional flags and scalars, and
//! positionals must appear in an order the tokenizer can split.
//!
//! # Examples
//!
//! ```
//! use cfgspec_core::*;
//!
//! assert!(validate_option_name("-v").is_ok());
//! assert!(validate_option_name("--dry-run").is_ok());
//! assert!(validate_option_name("verbose").is_err());
//! assert!(validate_option_name("-vv").is_err());
//! ```

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::descriptor::{OptionDescriptor, Shape};
use crate::error::DefinitionError;
use crate::spec::{GroupPolicy, Specification};

static FIELD_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex must compile")
});

static OPTION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-[A-Za-z0-9]|--[A-Za-z0-9][A-Za-z0-9_-]*)$").expect("static regex must compile")
});

static SUBMODE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("static regex must compile")
});

/// Option spellings the tokenizer claims for itself.
pub const RESERVED_OPTION_NAMES: [&str; 2] = ["-h", "--help"];

/// Checks that `option` is a short (`-x`) or long (`--name`) spelling.
///
/// # Errors
///
/// Returns the rejected spelling.
pub fn validate_option_name(option: &str) -> Result<(), String> {
    if OPTION_NAME.is_match(option) {
        Ok(())
    } else {
        Err(option.to_string())
    }
}

/// Validates a built specification tree.
///
/// Returns every problem found; an empty list means the tree is valid.
pub fn validate_specification(spec: &Specification) -> Vec<DefinitionError> {
    let mut errors = validate_levels(spec);

    let members = spec.all_members();
    errors.extend(validate_flat_names(&members));
    errors.extend(validate_positionals(&members));
    errors
}

/// Validates the submodes registered next to a root specification.
///
/// Each submode shares the root's namespace, so its names must not collide
/// with the root's; sibling submodes may reuse names. The root may not take
/// a positional list, which would swallow the submode name.
pub fn validate_submodes<'a, I>(root: &Specification, submodes: I) -> Vec<DefinitionError>
where
    I: IntoIterator<Item = (&'a str, &'a Specification)>,
{
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut count = 0;

    let root_members = root.all_members();
    for member in &root_members {
        if member.shape() == Shape::PositionalList {
            errors.push(DefinitionError::PositionalOrder {
                name: member.name().to_string(),
                reason: "is a positional list and would consume the submode name".to_string(),
            });
        }
    }

    for (name, spec) in submodes {
        count += 1;
        if !SUBMODE_NAME.is_match(name) || !seen.insert(name) {
            errors.push(DefinitionError::InvalidSubmodeName(name.to_string()));
            continue;
        }

        // Root options are claimed first so only cross-collisions surface.
        let mut options: HashSet<&str> = root_members
            .iter()
            .flat_map(|member| member.option_names())
            .map(String::as_str)
            .collect();
        let mut keys: HashSet<&str> = root_members.iter().map(|member| member.name()).collect();
        for member in spec.all_members() {
            if !keys.insert(member.name()) {
                errors.push(DefinitionError::DuplicateName(member.name().to_string()));
            }
            for option in member.option_names() {
                if !options.insert(option.as_str()) {
                    errors.push(DefinitionError::DuplicateName(option.clone()));
                }
            }
        }
    }

    if count == 0 {
        errors.push(DefinitionError::NoSubmodes);
    }
    errors
}

// Field names and group shape, one specification level at a time.
fn validate_levels(spec: &Specification) -> Vec<DefinitionError> {
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    let fields = spec
        .members()
        .iter()
        .map(OptionDescriptor::name)
        .chain(spec.subspecs().iter().map(|sub| sub.name()));
    for field in fields {
        if !FIELD_NAME.is_match(field) {
            errors.push(DefinitionError::InvalidFieldName(field.to_string()));
        } else if !seen.insert(field) {
            errors.push(DefinitionError::DuplicateName(field.to_string()));
        }
    }

    if spec.policy() == GroupPolicy::MutuallyExclusive {
        errors.extend(validate_exclusive_group(spec));
    }

    for sub in spec.subspecs() {
        errors.extend(validate_levels(sub.spec()));
    }

    errors
}

fn validate_exclusive_group(spec: &Specification) -> Vec<DefinitionError> {
    let group = spec.schema_name();

    let nested = spec
        .subspecs()
        .iter()
        .map(|sub| DefinitionError::ExclusiveGroupNested {
            group: group.to_string(),
            nested: sub.name().to_string(),
        });

    let members = spec.members().iter().filter_map(|member| {
        let reason = if member.shape().is_positional() {
            "positional"
        } else if member.shape().is_list() {
            "list"
        } else if member.is_transformed() {
            "transformed"
        } else if member.is_required() {
            "required"
        } else {
            return None;
        };
        Some(DefinitionError::ExclusiveGroupMember {
            group: group.to_string(),
            member: member.name().to_string(),
            reason,
        })
    });

    nested.chain(members).collect()
}

// Namespace keys and option spellings across the flattened tree.
fn validate_flat_names(members: &[&OptionDescriptor]) -> Vec<DefinitionError> {
    let mut errors = Vec::new();
    let mut keys: HashSet<&str> = HashSet::new();
    let mut options: HashSet<&str> = HashSet::new();

    for member in members {
        if !keys.insert(member.name()) {
            errors.push(DefinitionError::DuplicateName(member.name().to_string()));
        }

        for option in member.option_names() {
            if let Err(option) = validate_option_name(option) {
                errors.push(DefinitionError::InvalidOptionName {
                    name: member.name().to_string(),
                    option,
                });
            } else if RESERVED_OPTION_NAMES.contains(&option.as_str()) {
                errors.push(DefinitionError::ReservedOptionName(option.clone()));
            } else if !options.insert(option.as_str()) {
                errors.push(DefinitionError::DuplicateName(option.clone()));
            }
        }
    }

    errors
}

fn validate_positionals(members: &[&OptionDescriptor]) -> Vec<DefinitionError> {
    let mut errors = Vec::new();
    let mut seen_optional = false;
    let mut seen_list: Option<&str> = None;

    for member in members.iter().filter(|m| m.shape().is_positional()) {
        if let Some(list) = seen_list {
            errors.push(DefinitionError::PositionalOrder {
                name: member.name().to_string(),
                reason: format!("follows positional list {list}"),
            });
        } else if member.is_required() && seen_optional {
            errors.push(DefinitionError::PositionalOrder {
                name: member.name().to_string(),
                reason: "is required but follows an optional positional".to_string(),
            });
        }
        seen_optional |= !member.is_required();
        if member.shape() == Shape::PositionalList {
            seen_list = Some(member.name());
        }
    }

    errors
}
