//! Structured replacement for the got/expected pair of an error.

use super::indent_into;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryItem {
    pub label: String,
    pub value: String,
    pub explain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorSummary {
    Text(String),
    /// Labelled lines, labels right-aligned on the longest one.
    Items(Vec<SummaryItem>),
}

impl ErrorSummary {
    pub fn text(text: impl Into<String>) -> Self {
        ErrorSummary::Text(text.into())
    }

    pub fn item(label: impl Into<String>, value: impl Into<String>) -> Self {
        ErrorSummary::Items(vec![SummaryItem {
            label: label.into(),
            value: value.into(),
            explain: None,
        }])
    }

    /// Appends another labelled line, turning a text summary into an item.
    pub fn push(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let item = SummaryItem {
            label: label.into(),
            value: value.into(),
            explain: None,
        };
        match self {
            ErrorSummary::Items(items) => items.push(item),
            ErrorSummary::Text(text) => {
                let first = SummaryItem {
                    label: String::new(),
                    value: std::mem::take(text),
                    explain: None,
                };
                *self = ErrorSummary::Items(vec![first, item]);
            }
        }
    }

    /// Attaches an explanation line to the last item.
    pub fn explain(mut self, explain: impl Into<String>) -> Self {
        if let ErrorSummary::Items(items) = &mut self {
            if let Some(last) = items.last_mut() {
                last.explain = Some(explain.into());
            }
        }
        self
    }

    pub(crate) fn append(&self, buf: &mut String, prefix: &str) {
        match self {
            ErrorSummary::Text(text) => {
                buf.push_str(prefix);
                indent_into(buf, text, prefix);
            }
            ErrorSummary::Items(items) => {
                let width = items.iter().map(|i| i.label.len()).max().unwrap_or(0);
                let pad = " ".repeat(width + 2);
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        buf.push('\n');
                    }
                    buf.push_str(prefix);
                    buf.push_str(&" ".repeat(width - item.label.len()));
                    buf.push_str(&item.label);
                    buf.push_str(": ");
                    let inner = format!("{}{}", prefix, pad);
                    indent_into(buf, &item.value, &inner);
                    if let Some(explain) = &item.explain {
                        buf.push('\n');
                        buf.push_str(&inner);
                        indent_into(buf, explain, &inner);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_align_on_longest_label() {
        let mut s = ErrorSummary::item("Missing item", "1");
        s.push("Extra 2 items", "(2,\n 3)");
        let mut buf = String::new();
        s.append(&mut buf, "\t");
        assert_eq!(
            buf,
            "\t Missing item: 1\n\tExtra 2 items: (2,\n\t                3)"
        );
    }

    #[test]
    fn text_is_indented() {
        let mut buf = String::new();
        ErrorSummary::text("a\nb").append(&mut buf, "\t");
        assert_eq!(buf, "\ta\n\tb");
    }

    #[test]
    fn explain_follows_value() {
        let s = ErrorSummary::item("value", "12").explain("should be odd");
        let mut buf = String::new();
        s.append(&mut buf, "");
        assert_eq!(buf, "value: 12\n       should be odd");
    }
}
