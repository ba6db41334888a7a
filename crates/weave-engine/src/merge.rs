use serde_json::json;

use weave_core::Value;

/// One branch's output, tagged with its declaration index.
#[derive(Debug, Clone)]
pub struct BranchOutput {
    pub index: usize,
    pub value: Value,
}

/// Combines parallel branch results into one value, always in branch
/// declaration order — never completion order. This is what keeps
/// downstream behavior deterministic despite concurrent execution.
///
/// Not invoked when any branch failed; under fail-fast the merge itself
/// fails instead.
pub trait MergeAggregator: Send + Sync + 'static {
    fn combine(&self, branches: Vec<BranchOutput>) -> Value;
}

/// Default policy: order-preserving text concatenation with a separator
/// at each branch boundary.
pub struct ConcatAggregator {
    separator: String,
}

impl ConcatAggregator {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }
}

impl Default for ConcatAggregator {
    fn default() -> Self {
        Self::new("\n---\n")
    }
}

impl MergeAggregator for ConcatAggregator {
    fn combine(&self, branches: Vec<BranchOutput>) -> Value {
        let parts: Vec<String> = branches.iter().map(|b| b.value.render()).collect();
        Value::text(parts.join(&self.separator))
    }
}

/// Structured alternative: branch results as a labeled, ordered JSON
/// array for handlers that want per-branch access.
pub struct LabeledAggregator;

impl MergeAggregator for LabeledAggregator {
    fn combine(&self, branches: Vec<BranchOutput>) -> Value {
        let items: Vec<serde_json::Value> = branches
            .iter()
            .map(|b| {
                let value = match &b.value {
                    Value::Json { value } => value.clone(),
                    other => json!(other.render()),
                };
                json!({ "branch": b.index, "value": value })
            })
            .collect();
        Value::json(serde_json::Value::Array(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outputs() -> Vec<BranchOutput> {
        vec![
            BranchOutput {
                index: 0,
                value: Value::text("alpha"),
            },
            BranchOutput {
                index: 1,
                value: Value::text("beta"),
            },
            BranchOutput {
                index: 2,
                value: Value::json(serde_json::json!({"n": 3})),
            },
        ]
    }

    #[test]
    fn test_concat_declaration_order() {
        let combined = ConcatAggregator::default().combine(outputs());
        assert_eq!(
            combined.as_text(),
            Some("alpha\n---\nbeta\n---\n{\"n\":3}")
        );
    }

    #[test]
    fn test_concat_custom_separator() {
        let combined = ConcatAggregator::new(" | ").combine(outputs());
        assert_eq!(combined.as_text(), Some("alpha | beta | {\"n\":3}"));
    }

    #[test]
    fn test_labeled_keeps_every_branch() {
        let combined = LabeledAggregator.combine(outputs());
        let Value::Json { value } = combined else {
            panic!("expected json value");
        };
        let arr = value.as_array().unwrap();
        assert_eq!(arr.len(), 3);
        assert_eq!(arr[0]["branch"], 0);
        assert_eq!(arr[0]["value"], "alpha");
        assert_eq!(arr[2]["value"]["n"], 3);
    }
}
