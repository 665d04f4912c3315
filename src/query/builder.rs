//! Filter expression builder

use super::predicate::Predicate;
use super::types::{FilterExpression, TraversalFilter, PARENT_ID_VAR};
use crate::types::ListMode;

/// Build the listing expression for a traversal filter.
///
/// Clause order is fixed: parent membership, then the folder clause
/// (only for `DIRECTORIES`), then the trash clause (unless trashed files
/// are included).
pub fn build_filter(filter: &TraversalFilter) -> FilterExpression {
    if filter.use_custom_query {
        return FilterExpression::Custom(filter.custom_query.clone().unwrap_or_default());
    }

    let mut query = format!("'{{{{ {PARENT_ID_VAR} }}}}' in parents");
    if filter.list_mode == ListMode::Directories {
        query.push_str(" and ");
        query.push_str(&Predicate::IsFolder.render());
    }
    if !filter.include_trashed_files {
        query.push_str(" and ");
        query.push_str(&Predicate::NotTrashed.render());
    }

    FilterExpression::Template(query)
}
