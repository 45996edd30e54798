//! Text accumulators shared by the query and search builders.

use super::escape::escape;

/// Comma-joined, escaped select list in insertion order.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct SelectList {
    text: String,
}

impl SelectList {
    /// Append `field`. `*` clears the list so the caller falls back to
    /// every schema field.
    pub fn push(&mut self, field: &str) {
        if field == "*" {
            self.text.clear();
            return;
        }
        if !self.text.is_empty() {
            self.text.push_str(", ");
        }
        self.text.push_str(&escape(field));
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Boolean expression built from joined terms and parenthesized groups.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Expression {
    text: String,
    /// Set right after a group opens, until its first term arrives.
    at_group_start: bool,
}

/// Position of an open group, handed back to `end_group`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GroupMark {
    len: usize,
    at_group_start: bool,
}

impl Expression {
    /// Insert a join token unless this is the first term of the expression
    /// or of the current group.
    pub fn join(&mut self, token: &str) {
        if !self.text.is_empty() && !self.at_group_start {
            self.text.push_str(token);
        }
    }

    pub fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
        self.at_group_start = false;
    }

    /// Open a group and return the mark needed to close it.
    pub fn begin_group(&mut self, token: &str) -> GroupMark {
        let mark = GroupMark {
            len: self.text.len(),
            at_group_start: self.at_group_start,
        };
        self.join(token);
        self.text.push('(');
        self.at_group_start = true;
        mark
    }

    /// Close a group. A group that received no terms is removed entirely.
    pub fn end_group(&mut self, mark: GroupMark) {
        if self.at_group_start {
            self.text.truncate(mark.len);
            self.at_group_start = mark.at_group_start;
        } else {
            self.text.push(')');
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_star_resets() {
        let mut select = SelectList::default();
        select.push("Id");
        select.push("Phone");
        select.push("*");
        select.push("Name");
        assert_eq!(select.as_str(), "Name");
    }

    #[test]
    fn test_group_without_leading_join() {
        let mut expr = Expression::default();
        let mark = expr.begin_group(" AND ");
        expr.join(" AND ");
        expr.push_str("a = 1");
        expr.join(" OR ");
        expr.push_str("b = 2");
        expr.end_group(mark);
        assert_eq!(expr.as_str(), "(a = 1 OR b = 2)");
    }

    #[test]
    fn test_empty_group_is_dropped() {
        let mut expr = Expression::default();
        expr.push_str("a = 1");
        let mark = expr.begin_group(" OR ");
        expr.end_group(mark);
        assert_eq!(expr.as_str(), "a = 1");
    }

    #[test]
    fn test_term_ending_in_paren_still_joins() {
        let mut expr = Expression::default();
        expr.join(" AND ");
        expr.push_str("acme(");
        expr.join(" AND ");
        expr.push_str("globex");
        assert_eq!(expr.as_str(), "acme( AND globex");
    }

    #[test]
    fn test_empty_nested_group_restores_outer_start() {
        let mut expr = Expression::default();
        let outer = expr.begin_group(" AND ");
        let inner = expr.begin_group(" AND ");
        expr.end_group(inner);
        expr.join(" OR ");
        expr.push_str("a = 1");
        expr.end_group(outer);
        assert_eq!(expr.as_str(), "(a = 1)");
    }
}
