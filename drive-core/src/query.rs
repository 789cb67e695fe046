use std::fmt;

/// Search expression for `files.list`, terms joined with `and`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    terms: Vec<String>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent_in(mut self, parent_id: &str) -> Self {
        self.terms.push(format!("{} in parents", quote(parent_id)));
        self
    }

    pub fn title_eq(mut self, title: &str) -> Self {
        self.terms.push(format!("title = {}", quote(title)));
        self
    }

    pub fn trashed(mut self, trashed: bool) -> Self {
        self.terms.push(format!("trashed = {trashed}"));
        self
    }

    pub fn shared_with_me(mut self) -> Self {
        self.terms.push("sharedWithMe = true".to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.terms.join(" and "))
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        if matches!(ch, '\\' | '\'') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_terms_with_and() {
        let query = Query::new().parent_in("root").title_eq("A").trashed(false);
        assert_eq!(
            query.to_string(),
            "'root' in parents and title = 'A' and trashed = false"
        );
    }

    #[test]
    fn escapes_quotes_and_backslashes() {
        let query = Query::new().title_eq(r"it's a\b");
        assert_eq!(query.to_string(), r"title = 'it\'s a\\b'");
    }

    #[test]
    fn shared_with_me_alone() {
        assert_eq!(Query::new().shared_with_me().to_string(), "sharedWithMe = true");
        assert!(Query::new().is_empty());
    }
}
