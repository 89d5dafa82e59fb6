//! Status query synthesis for a batch of report tokens

use std::fmt::Write as _;

use reportflow_domain::constants::REPORT_TOKEN_KEY;
use serde_json::{Map, Value};

/// GraphQL query plus its variable bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusQuery {
    pub query: String,
    pub variables: Map<String, Value>,
}

/// Build one query asking for the status and download links of every token.
///
/// Token `i` (1-based) is bound to `$reportToken{i}` and aliased `report{i}`.
/// An empty batch yields a valid query with no variables.
pub fn build_status_query<S: AsRef<str>>(tokens: &[S]) -> StatusQuery {
    if tokens.is_empty() {
        return StatusQuery {
            query: "query { partner { __typename } }".to_string(),
            variables: Map::new(),
        };
    }

    let mut declarations = Vec::with_capacity(tokens.len());
    let mut selections = String::new();
    let mut variables = Map::new();

    for (index, token) in tokens.iter().enumerate() {
        let n = index + 1;
        let name = format!("{REPORT_TOKEN_KEY}{n}");
        declarations.push(format!("${name}: String!"));
        // Writing to a String never fails.
        let _ = write!(
            selections,
            " report{n}: reportFile(reportToken: ${name}) \
             {{ status downloadLinks {{ edges {{ node {{ link }} }} }} }}"
        );
        variables.insert(name, Value::String(token.as_ref().to_string()));
    }

    StatusQuery {
        query: format!("query ({}) {{ partner {{{selections} }} }}", declarations.join(", ")),
        variables,
    }
}
