/// An urlencoded form body with repeated keys preserved in submission order.
#[derive(Debug, Clone, Default)]
pub struct FormPayload {
    pairs: Vec<(String, String)>,
}

impl FormPayload {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// First value submitted under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Trimmed value, empty when absent.
    pub fn text(&self, key: &str) -> String {
        self.get(key).map(str::trim).unwrap_or_default().to_string()
    }

    /// Field of the row announced with `row_id` at position `index`.
    ///
    /// `field:{row_id}` wins; otherwise the `index`-th repeated `field` value.
    pub fn row_field(&self, field: &str, row_id: &str, index: usize) -> Option<&str> {
        self.get(&format!("{field}:{row_id}"))
            .or_else(|| self.get_all(field).get(index).copied())
    }

    /// Trimmed row field, empty when absent.
    pub fn row_text(&self, field: &str, row_id: &str, index: usize) -> String {
        self.row_field(field, row_id, index)
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    }
}

impl From<Vec<(String, String)>> for FormPayload {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::new(pairs)
    }
}

/// Site-relative redirect target, or `fallback` for anything else.
pub fn sanitize_return_to(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => fallback.to_string(),
    }
}

/// Non-empty trimmed lines.
pub fn split_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Comma-separated entries, trimmed, first occurrence kept.
pub fn split_comma_set(raw: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !items.iter().any(|existing| existing == item) {
            items.push(item.to_string());
        }
    }
    items
}

/// Integer form value; anything unparseable is zero.
pub fn parse_sort_order(raw: Option<&str>) -> i32 {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}
