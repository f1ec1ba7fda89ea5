//! Wire types returned by the node

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::NodeError;

/// One line of the `add` response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AddedObject {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Hash")]
    pub hash: String,
    // The node reports sizes as decimal strings
    #[serde(rename = "Size", default)]
    pub size: String,
}

/// One line of the `refs/local` response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocalRef {
    #[serde(rename = "Ref")]
    pub reference: String,
    #[serde(rename = "Err", default)]
    pub err: String,
}

/// Error body the node sends with non-success statuses
#[derive(Debug, Deserialize)]
pub(crate) struct RpcErrorBody {
    #[serde(rename = "Message")]
    pub message: String,
}

/// Parse a newline-delimited JSON body, skipping blank lines
pub(crate) fn parse_ndjson<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, NodeError> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| NodeError::Decode(format!("{}: {}", e, line)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_ndjson, AddedObject, LocalRef};

    #[test]
    fn parses_multi_line_refs_and_skips_blanks() {
        let body = "{\"Ref\":\"QmA\",\"Err\":\"\"}\n\n{\"Ref\":\"QmB\"}\n";
        let refs: Vec<LocalRef> = parse_ndjson(body).unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].reference, "QmA");
        assert_eq!(refs[1].err, "");
    }

    #[test]
    fn empty_body_parses_to_no_items() {
        let refs: Vec<LocalRef> = parse_ndjson("").unwrap();
        assert!(refs.is_empty());
    }

    #[test]
    fn malformed_line_reports_the_line() {
        let err = parse_ndjson::<AddedObject>("{\"Name\":\"a\"}").unwrap_err();
        assert!(err.to_string().contains("Hash"));
    }
}
