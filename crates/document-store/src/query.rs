use serde_json::Value;

/// Ordering of query results by insertion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest first.
    #[default]
    Oldest,
    /// Newest first.
    Newest,
}

/// Builder for constructing document queries.
///
/// A document matches when its body *contains* the filter, with the same
/// semantics as PostgreSQL's `jsonb @>` operator: every key of a filter
/// object must be present with a containing value, and every element of a
/// filter array must be contained by some element of the document array.
#[derive(Debug, Clone)]
pub struct DocumentQuery {
    /// The collection to search.
    pub collection: String,

    /// Containment filter applied to document bodies.
    pub filter: Value,

    /// Result ordering.
    pub sort: SortOrder,

    /// Maximum number of documents to return.
    pub limit: Option<usize>,

    /// Number of documents to skip.
    pub offset: Option<usize>,
}

impl DocumentQuery {
    /// Creates a query matching every document of a collection.
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filter: Value::Object(serde_json::Map::new()),
            sort: SortOrder::default(),
            limit: None,
            offset: None,
        }
    }

    /// Requires the body field `field` to contain `value`.
    ///
    /// Calls accumulate: `where_eq("a", 1).where_eq("b", 2)` matches bodies
    /// with both fields.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        if let Value::Object(ref mut map) = self.filter {
            map.insert(field.into(), value.into());
        }
        self
    }

    /// Replaces the whole containment filter.
    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = filter;
        self
    }

    /// Returns newest documents first.
    pub fn newest_first(mut self) -> Self {
        self.sort = SortOrder::Newest;
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if `body` satisfies the filter.
    pub fn matches(&self, body: &Value) -> bool {
        json_contains(body, &self.filter)
    }
}

/// Returns true if `doc` contains `pattern`.
pub fn json_contains(doc: &Value, pattern: &Value) -> bool {
    match (doc, pattern) {
        (Value::Object(doc), Value::Object(pattern)) => pattern.iter().all(|(key, expected)| {
            doc.get(key)
                .is_some_and(|actual| json_contains(actual, expected))
        }),
        (Value::Array(doc), Value::Array(pattern)) => pattern
            .iter()
            .all(|expected| doc.iter().any(|actual| json_contains(actual, expected))),
        (doc, pattern) => doc == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_filter_matches_everything() {
        let query = DocumentQuery::collection("orders");
        assert!(query.matches(&json!({"status": "pending"})));
        assert!(query.matches(&json!({})));
    }

    #[test]
    fn where_eq_accumulates_fields() {
        let query = DocumentQuery::collection("users")
            .where_eq("role", "rider")
            .where_eq("is_approved", true);

        assert!(query.matches(&json!({"role": "rider", "is_approved": true, "name": "R"})));
        assert!(!query.matches(&json!({"role": "rider", "is_approved": false})));
        assert!(!query.matches(&json!({"role": "admin", "is_approved": true})));
        assert!(!query.matches(&json!({"role": "rider"})));
    }

    #[test]
    fn nested_array_containment() {
        let body = json!({
            "variants": [
                {"color": "black", "size": "standard"},
                {"color": "white", "size": "slim"}
            ]
        });

        assert!(json_contains(&body, &json!({"variants": [{"color": "white"}]})));
        assert!(json_contains(
            &body,
            &json!({"variants": [{"color": "black"}, {"size": "slim"}]})
        ));
        assert!(!json_contains(&body, &json!({"variants": [{"color": "red"}]})));
    }

    #[test]
    fn scalar_mismatch_does_not_match() {
        assert!(!json_contains(&json!({"n": 1}), &json!({"n": "1"})));
        assert!(json_contains(&json!({"n": null}), &json!({"n": null})));
    }

    #[test]
    fn builder_sets_paging() {
        let query = DocumentQuery::collection("orders")
            .newest_first()
            .limit(10)
            .offset(5);
        assert_eq!(query.sort, SortOrder::Newest);
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(5));
    }
}
