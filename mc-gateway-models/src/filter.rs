use std::collections::HashMap;

/// True when every selector entry is present in `labels` with the same value.
/// An empty selector matches everything.
pub fn labels_match(selector: &HashMap<String, String>, labels: &HashMap<String, String>) -> bool {
    selector
        .iter()
        .all(|(k, v)| labels.get(k).is_some_and(|value| value == v))
}

/// Decides which gateways this controller instance runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipFilter {
    pub ids: Vec<String>,
    pub labels: HashMap<String, String>,
}

impl OwnershipFilter {
    pub fn new(ids: Vec<String>, labels: HashMap<String, String>) -> Self {
        Self { ids, labels }
    }

    /// With nothing configured every gateway is owned. Otherwise a gateway
    /// is owned when its id is listed or its labels satisfy the selector.
    pub fn is_mine(&self, id: &str, labels: &HashMap<String, String>) -> bool {
        if self.ids.is_empty() && self.labels.is_empty() {
            return true;
        }
        if self.ids.iter().any(|owned| owned == id) {
            return true;
        }
        !self.labels.is_empty() && labels_match(&self.labels, labels)
    }
}
