//! Filter builder for the table REST interface.
//!
//! Filters are plain query parameters: `column=op.value`. Values inside
//! `in.(...)` and `or=(...)` lists are double-quoted so commas, dots and
//! parentheses in user input cannot break the list syntax.

use std::fmt::Display;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self { Self::default() }

    pub fn select(self, columns: &str) -> Self { self.push("select", columns.to_string()) }

    pub fn eq(self, column: &str, value: impl Display) -> Self { self.push(column, format!("eq.{value}")) }

    /// `column=in.("a","b")`
    pub fn is_in<I, S>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list = values.into_iter().map(|v| quote(v.as_ref())).collect::<Vec<_>>().join(",");
        self.push(column, format!("in.({list})"))
    }

    /// Case-insensitive substring match.
    pub fn ilike(self, column: &str, needle: &str) -> Self {
        let cleaned: String = needle.chars().filter(|c| !matches!(c, '*' | '%' | ',' | '(' | ')')).collect();
        self.push(column, format!("ilike.*{cleaned}*"))
    }

    /// `or=(a.eq."x",b.eq."y")`: any of the column equalities.
    pub fn or_eq(self, pairs: &[(&str, &str)]) -> Self {
        let inner = pairs
            .iter()
            .map(|(col, val)| format!("{col}.eq.{}", quote(val)))
            .collect::<Vec<_>>()
            .join(",");
        self.push("or", format!("({inner})"))
    }

    /// Repeated calls add tie-breakers: `order=a.desc,b.desc`.
    pub fn order_desc(mut self, column: &str) -> Self {
        match self.params.iter_mut().find(|(k, _)| k == "order") {
            Some((_, v)) => {
                v.push_str(&format!(",{column}.desc"));
                self
            }
            None => self.push("order", format!("{column}.desc")),
        }
    }

    pub fn limit(self, n: usize) -> Self { self.push("limit", n.to_string()) }

    pub fn on_conflict(self, columns: &str) -> Self { self.push("on_conflict", columns.to_string()) }

    pub fn params(&self) -> &[(String, String)] { &self.params }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn push(mut self, key: &str, value: String) -> Self {
        self.params.push((key.to_string(), value));
        self
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_clauses_are_joined() {
        let q = Query::new().order_desc("date").order_desc("created_at");
        assert_eq!(q.get("order"), Some("date.desc,created_at.desc"));
    }

    #[test]
    fn in_list_is_quoted() {
        let q = Query::new().is_in("phone", ["9876543210", "+919876543210"]).limit(1);
        assert_eq!(q.get("phone"), Some(r#"in.("9876543210","+919876543210")"#));
        assert_eq!(q.get("limit"), Some("1"));
    }

    #[test]
    fn or_filter_quotes_each_value() {
        let q = Query::new().or_eq(&[("phone", "98765,43210"), ("aadhaar_number", "1234")]);
        assert_eq!(q.get("or"), Some(r#"(phone.eq."98765,43210",aadhaar_number.eq."1234")"#));
    }

    #[test]
    fn quotes_inside_values_are_escaped() {
        let q = Query::new().is_in("name", [r#"a"b"#]);
        assert_eq!(q.get("name"), Some(r#"in.("a\"b")"#));
    }

    #[test]
    fn ilike_strips_wildcards() {
        let q = Query::new().ilike("name", "gold*%");
        assert_eq!(q.get("name"), Some("ilike.*gold*"));
    }

    #[test]
    fn params_keep_insertion_order() {
        let q = Query::new().select("*").eq("status", "pending").order_desc("created_at");
        let keys: Vec<_> = q.params().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["select", "status", "order"]);
    }
}
