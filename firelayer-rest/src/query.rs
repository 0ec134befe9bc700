//! Translation of store primitives into REST locations and query parameters.

use serde_json::Value;

/// The URL of the JSON document at `path` below `base`.
pub(crate) fn location_url(base: &str, path: &str) -> String {
    format!("{}/{}.json", base.trim_end_matches('/'), path.trim_matches('/'))
}

/// Server-side selection of a collection read.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ReadQuery<'a> {
    /// Every child.
    All,
    /// The first `n` children in key order.
    FirstByKey(usize),
    /// Children whose `property` equals `value`.
    Equal { property: &'a str, value: &'a Value },
}

impl ReadQuery<'_> {
    /// Query parameters selecting the children. String parameters are JSON-encoded, as the
    /// protocol requires.
    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            ReadQuery::All => Vec::new(),
            ReadQuery::FirstByKey(limit) => vec![
                ("orderBy", quoted("$key")),
                ("limitToFirst", limit.to_string()),
            ],
            ReadQuery::Equal { property, value } => vec![
                ("orderBy", quoted(property)),
                ("equalTo", value.to_string()),
            ],
        }
    }
}

fn quoted(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn locations_end_in_json() {
        assert_eq!(
            location_url("https://demo.firebaseio.com/", "shop/orders/-Nab"),
            "https://demo.firebaseio.com/shop/orders/-Nab.json"
        );
    }

    #[test]
    fn limited_reads_order_by_key() {
        assert_eq!(
            ReadQuery::FirstByKey(2).params(),
            vec![("orderBy", "\"$key\"".to_string()), ("limitToFirst", "2".to_string())]
        );
        assert!(ReadQuery::All.params().is_empty());
    }

    #[test]
    fn equality_queries_encode_json_operands() {
        let value = json!("Henrique");
        let params = ReadQuery::Equal { property: "name", value: &value }.params();
        assert_eq!(
            params,
            vec![("orderBy", "\"name\"".to_string()), ("equalTo", "\"Henrique\"".to_string())]
        );

        let value = json!(28);
        let params = ReadQuery::Equal { property: "age", value: &value }.params();
        assert_eq!(params[1], ("equalTo", "28".to_string()));
    }
}
