use super::error::FilterSyntaxError;
use super::tree::Filter;
use crate::fields::{FieldLookup, Registry};
use chrono::{DateTime, Local};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// `field<op>value` with an inline comparison operator instead of `=`.
static COMPARISON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([_A-Za-z][_A-Za-z0-9]*)(<[>=]?|>=?|!=|~)(.*)$").expect("valid comparison regex")
});

/// Comma separated values, keeping commas inside `/regex/` literals.
static VALUES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(!?/[^/]*/|[^,]+)(?:,|$)").expect("valid value split regex"));

/// Rewrite an inline comparison into the signed literal the leaf filters understand.
fn rewrite_comparison(operator: &str, values: &str) -> String {
    match operator {
        "<" => format!("-{values}"),
        "<=" => format!("!+{values}"),
        ">" => format!("+{values}"),
        ">=" => format!("!-{values}"),
        "~" => format!("/{values}/"),
        // "<>" and "!="
        _ => format!("!{values}"),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Term(String),
    Group(Vec<Node>),
}

/// Render a token tree back to text, for error messages.
fn nodes_text(nodes: &[Node]) -> String {
    nodes
        .iter()
        .map(|node| match node {
            Node::Term(term) => term.clone(),
            Node::Group(group) => format!("[ {} ]", nodes_text(group)),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turns condition expressions into [`Filter`] trees.
///
/// ```text
/// name=*ubuntu*              glob on a text field
/// ratio=+1 size=-4g          conjunction of two conditions
/// kind=flac,mp3              comma means OR on the same field
/// is_complete=no OR done>50  disjunction
/// [ a=1 OR b=2 ] NOT c=3     groups, and NOT at the start of a group
/// size>=1g  alias!=foo       inline comparison operators
/// ```
pub struct ConditionParser<'a> {
    lookup: &'a dyn FieldLookup,
    default_field: Option<String>,
    now: DateTime<Local>,
}

impl<'a> ConditionParser<'a> {
    pub fn new(lookup: &'a dyn FieldLookup) -> Self {
        Self {
            lookup,
            default_field: None,
            now: Local::now(),
        }
    }

    /// Field to compare bare tokens against (tokens with neither `=` nor an operator).
    pub fn with_default_field(mut self, field: Option<&str>) -> Self {
        self.default_field = field.map(str::to_string);
        self
    }

    /// Reference time for relative time literals; defaults to the creation time.
    pub fn with_now(mut self, now: DateTime<Local>) -> Self {
        self.now = now;
        self
    }

    /// Parse a condition string, split into tokens the way a shell would.
    pub fn parse(&self, conditions: &str) -> Result<Filter, FilterSyntaxError> {
        let tokens = split_preserving_quotes(conditions)?;
        self.parse_with_text(&tokens, conditions)
    }

    /// Parse an already tokenized condition.
    pub fn parse_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Filter, FilterSyntaxError> {
        let tokens: Vec<String> = tokens.iter().map(|t| t.as_ref().to_string()).collect();
        self.parse_with_text(&tokens, &tokens.join(" "))
    }

    fn parse_with_text(&self, tokens: &[String], text: &str) -> Result<Filter, FilterSyntaxError> {
        let mut stack: Vec<Vec<Node>> = vec![Vec::new()];
        for token in tokens {
            match token.as_str() {
                "[" => stack.push(Vec::new()),
                "]" => {
                    let group = stack.pop().unwrap_or_default();
                    let Some(parent) = stack.last_mut() else {
                        return Err(FilterSyntaxError::TooManyClosing(text.to_string()));
                    };
                    parent.push(Node::Group(group));
                }
                _ => {
                    if let Some(current) = stack.last_mut() {
                        current.push(Node::Term(token.clone()));
                    }
                }
            }
        }
        if stack.len() > 1 {
            return Err(FilterSyntaxError::TooManyOpening(text.to_string()));
        }
        let nodes = stack.pop().unwrap_or_default();

        let root = self.parse_group(&nodes, text)?;
        debug!(condition = text, filter = %root, "parsed filter condition");
        Ok(root)
    }

    fn parse_group(&self, nodes: &[Node], text: &str) -> Result<Filter, FilterSyntaxError> {
        let (negate, nodes) = match nodes.split_first() {
            None => return Err(FilterSyntaxError::Empty),
            Some((Node::Term(first), rest)) if first == "NOT" => {
                if rest.is_empty() {
                    return Err(FilterSyntaxError::DanglingNot);
                }
                (true, rest)
            }
            Some(_) => (false, nodes),
        };

        let mut runs: Vec<Vec<Filter>> = Vec::new();
        let mut current: Vec<Filter> = Vec::new();
        for node in nodes {
            match node {
                Node::Term(term) if term == "OR" => {
                    if current.is_empty() {
                        return Err(FilterSyntaxError::MissingLeftOperand(text.to_string()));
                    }
                    runs.push(std::mem::take(&mut current));
                }
                Node::Term(term) => current.push(self.create_filter(term)?),
                Node::Group(group) => current.push(self.parse_group(group, &nodes_text(group))?),
            }
        }
        if current.is_empty() {
            return Err(FilterSyntaxError::MissingRightOperand(text.to_string()));
        }

        let root = if runs.is_empty() {
            Filter::All(current)
        } else {
            runs.push(current);
            Filter::Any(
                runs.into_iter()
                    .map(|mut run| {
                        if run.len() == 1 {
                            run.remove(0)
                        } else {
                            Filter::All(run)
                        }
                    })
                    .collect(),
            )
        };

        Ok(if negate { Filter::Not(Box::new(root)) } else { root })
    }

    /// Build the filter for a single `field=value[,value...]` condition.
    fn create_filter(&self, condition: &str) -> Result<Filter, FilterSyntaxError> {
        let (name, values) = if let Some(caps) = COMPARISON_RE.captures(condition) {
            let values = &caps[3];
            if let Some(sign) = values.chars().next().filter(|c| *c == '+' || *c == '-') {
                return Err(FilterSyntaxError::AmbiguousSign {
                    sign,
                    condition: condition.to_string(),
                });
            }
            (caps[1].to_string(), rewrite_comparison(&caps[2], values))
        } else if let Some((name, values)) = condition.split_once('=') {
            (name.to_string(), values.to_string())
        } else if let Some(default_field) = &self.default_field {
            (default_field.clone(), condition.to_string())
        } else {
            return Err(FilterSyntaxError::MissingFieldName(condition.to_string()));
        };

        let field = self
            .lookup
            .lookup(&name)
            .map_err(|source| FilterSyntaxError::Field {
                field: name.clone(),
                condition: condition.to_string(),
                source,
            })?
            .ok_or_else(|| FilterSyntaxError::UnknownField {
                field: name.clone(),
                condition: condition.to_string(),
            })?;
        let matcher = field
            .matcher
            .ok_or_else(|| FilterSyntaxError::NotFilterable { field: name.clone() })?;

        let split_values: Vec<&str> = if values.is_empty() {
            vec![""]
        } else {
            VALUES_RE
                .captures_iter(&values)
                .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
                .collect()
        };
        if split_values.is_empty() {
            return Err(FilterSyntaxError::NoValues {
                values: values.clone(),
                condition: condition.to_string(),
            });
        }

        let mut filters = split_values
            .into_iter()
            .map(|value| {
                let (negate, literal) = match value.strip_prefix('!') {
                    Some(literal) => (true, literal),
                    None => (false, value),
                };
                let leaf = Filter::leaf_at(matcher, field.clone(), literal, self.now)?;
                Ok(if negate { Filter::Not(Box::new(leaf)) } else { leaf })
            })
            .collect::<Result<Vec<Filter>, FilterSyntaxError>>()?;

        Ok(if filters.len() > 1 {
            Filter::Any(filters)
        } else {
            filters.remove(0)
        })
    }
}

/// Parse `condition` against the global registry.
pub fn parse(condition: &str, default_field: Option<&str>) -> Result<Filter, FilterSyntaxError> {
    ConditionParser::new(Registry::global())
        .with_default_field(default_field)
        .parse(condition)
}

/// Split a string by whitespace, honoring shell-style quotes and backslash escapes.
///
/// Quotes are removed; `''` and `""` yield an empty token.
fn split_preserving_quotes(s: &str) -> Result<Vec<String>, FilterSyntaxError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') => quote = None,
            (Some('"'), '"') => quote = None,
            (Some('"'), '\\') => match chars.next() {
                Some(next @ ('"' | '\\')) => current.push(next),
                Some(next) => {
                    current.push('\\');
                    current.push(next);
                }
                None => return Err(FilterSyntaxError::UnterminatedQuote(s.to_string())),
            },
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_token = true;
            }
            (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    parts.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return Err(FilterSyntaxError::UnterminatedQuote(s.to_string()));
    }
    if in_token {
        parts.push(current);
    }

    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple() {
        assert_eq!(
            split_preserving_quotes("  a=1\tb=2 ").unwrap(),
            vec!["a=1", "b=2"]
        );
    }

    #[test]
    fn test_split_quotes() {
        assert_eq!(
            split_preserving_quotes(r#"name="foo bar" 'x y'z "" "#).unwrap(),
            vec!["name=foo bar", "x yz", ""]
        );
        assert_eq!(
            split_preserving_quotes(r#"a="say \"hi\"" b=c\ d"#).unwrap(),
            vec![r#"a=say "hi""#, "b=c d"]
        );
    }

    #[test]
    fn test_split_unterminated_quote() {
        let err = split_preserving_quotes("name='foo").unwrap_err();
        assert!(matches!(err, FilterSyntaxError::UnterminatedQuote(_)));
    }

    #[test]
    fn test_rewrite_comparison() {
        assert_eq!(rewrite_comparison("<", "5"), "-5");
        assert_eq!(rewrite_comparison("<=", "5"), "!+5");
        assert_eq!(rewrite_comparison(">", "5"), "+5");
        assert_eq!(rewrite_comparison(">=", "5"), "!-5");
        assert_eq!(rewrite_comparison("<>", "x"), "!x");
        assert_eq!(rewrite_comparison("!=", "x"), "!x");
        assert_eq!(rewrite_comparison("~", "x.*"), "/x.*/");
    }

    #[test]
    fn test_value_split_keeps_regex_commas() {
        let values: Vec<&str> = VALUES_RE
            .captures_iter("a,/x,y/,!/p,q/,b")
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();
        assert_eq!(values, vec!["a", "/x,y/", "!/p,q/", "b"]);
    }

    #[test]
    fn test_nodes_text() {
        let nodes = vec![
            Node::Term("a=1".to_string()),
            Node::Group(vec![
                Node::Term("b=2".to_string()),
                Node::Term("OR".to_string()),
                Node::Term("c=3".to_string()),
            ]),
        ];
        assert_eq!(nodes_text(&nodes), "a=1 [ b=2 OR c=3 ]");
    }
}
