use serde_json::Value;
use std::cmp::Ordering;

/// Comparison supported by the hosted REST layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Gte => "gte",
            FilterOp::Lte => "lte",
        }
    }
}

/// Single column predicate, e.g. `church_id=eq.<uuid>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    pub fn eq(column: &str, value: impl ToString) -> Self {
        Self { column: column.to_string(), op: FilterOp::Eq, value: value.to_string() }
    }

    pub fn gte(column: &str, value: impl ToString) -> Self {
        Self { column: column.to_string(), op: FilterOp::Gte, value: value.to_string() }
    }

    pub fn lte(column: &str, value: impl ToString) -> Self {
        Self { column: column.to_string(), op: FilterOp::Lte, value: value.to_string() }
    }

    /// Render as a query-string pair (`column`, `op.value`).
    pub fn to_query_pair(&self) -> (String, String) {
        (self.column.clone(), format!("{}.{}", self.op.as_str(), self.value))
    }

    /// Evaluate the predicate against a JSON row.
    ///
    /// Numbers compare numerically; everything else compares as text, which
    /// is correct for ISO dates and UUIDs. A missing column never matches.
    pub fn matches(&self, row: &Value) -> bool {
        let Some(cell) = row.get(&self.column) else {
            return false;
        };
        let ordering = compare_cell(cell, &self.value);
        match self.op {
            FilterOp::Eq => ordering == Some(Ordering::Equal),
            FilterOp::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        }
    }
}

fn cell_text(cell: &Value) -> Option<String> {
    match cell {
        Value::Null => Some("null".to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn compare_cell(cell: &Value, expected: &str) -> Option<Ordering> {
    if let (Some(left), Ok(right)) = (cell.as_f64(), expected.parse::<f64>()) {
        return left.partial_cmp(&right);
    }
    cell_text(cell).map(|text| text.as_str().cmp(expected))
}

/// Sort key for a select.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Row read against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl SelectQuery {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Column projection, including embedded joins such as
    /// `*,members(member_name,phone)`.
    pub fn columns(mut self, columns: &str) -> Self {
        self.columns = columns.split_whitespace().collect::<Vec<_>>().join("");
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &str, value: impl ToString) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn gte(self, column: &str, value: impl ToString) -> Self {
        self.filter(Filter::gte(column, value))
    }

    pub fn lte(self, column: &str, value: impl ToString) -> Self {
        self.filter(Filter::lte(column, value))
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(Order { column: column.to_string(), ascending });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }

    /// Render the REST query string (without the leading `?`).
    pub fn to_query_string(&self) -> String {
        let mut parts = vec![format!("select={}", urlencoding::encode(&self.columns))];
        parts.extend(filters_to_query(&self.filters));
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
                .collect::<Vec<_>>()
                .join(",");
            parts.push(format!("order={}", order));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("limit={}", limit));
        }
        parts.join("&")
    }
}

/// Render filters for update/delete/count requests.
pub fn filters_to_query(filters: &[Filter]) -> Vec<String> {
    filters
        .iter()
        .map(|f| {
            let (column, value) = f.to_query_pair();
            format!("{}={}", urlencoding::encode(&column), urlencoding::encode(&value))
        })
        .collect()
}

/// Compare two rows by a sort key, used by in-process evaluators.
pub fn compare_rows(a: &Value, b: &Value, order: &Order) -> Ordering {
    let left = a.get(&order.column).cloned().unwrap_or(Value::Null);
    let right = b.get(&order.column).cloned().unwrap_or(Value::Null);
    let ordering = match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        _ => cell_text(&left).cmp(&cell_text(&right)),
    };
    if order.ascending { ordering } else { ordering.reverse() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_string_rendering() {
        let query = SelectQuery::new("donations")
            .columns("*, members (member_name, phone)")
            .eq("church_id", "abc")
            .gte("donation_date", "2025-01-01")
            .lte("donation_date", "2025-01-31")
            .order("donation_date", false)
            .limit(10);

        assert_eq!(
            query.to_query_string(),
            "select=%2A%2Cmembers%28member_name%2Cphone%29\
             &church_id=eq.abc\
             &donation_date=gte.2025-01-01\
             &donation_date=lte.2025-01-31\
             &order=donation_date.desc\
             &limit=10"
        );
    }

    #[test]
    fn test_filter_matching() {
        let row = json!({ "church_id": "abc", "donation_date": "2025-01-12", "amount": 2000, "is_active": true });

        assert!(Filter::eq("church_id", "abc").matches(&row));
        assert!(!Filter::eq("church_id", "xyz").matches(&row));
        assert!(Filter::gte("donation_date", "2025-01-01").matches(&row));
        assert!(!Filter::lte("donation_date", "2025-01-05").matches(&row));
        assert!(Filter::gte("amount", "1000").matches(&row));
        assert!(Filter::eq("is_active", true).matches(&row));
        assert!(!Filter::eq("missing", "x").matches(&row));
    }

    #[test]
    fn test_compare_rows_descending() {
        let a = json!({ "donation_date": "2025-01-05" });
        let b = json!({ "donation_date": "2025-01-12" });
        let order = Order { column: "donation_date".into(), ascending: false };
        assert_eq!(compare_rows(&a, &b, &order), Ordering::Greater);
    }
}
