// ── Filter expressions ──
//
// `FilterCompiler` turns user text into a predicate. The session only
// depends on the trait; `TextFilter` is the flow-specific grammar used by
// the controller and the CLI.
//
// Grammar: whitespace-separated terms, all of which must match.
//
//   term     := ["!"] (field ":" value | text)
//   field    := method | host | path | status | kind | marked
//
// `status:` takes a code (`404`) or a class (`4xx`). `marked:` takes
// `true`/`false` or a marker label. Bare text matches anywhere in the
// flow's summary line, ignoring case.

use std::sync::Arc;

use crate::error::CoreError;
use crate::model::{Flow, FlowKind};
use crate::store::Predicate;

/// Compiles filter text into a predicate over `T`.
pub trait FilterCompiler<T>: Send + Sync {
    fn compile(&self, expression: &str) -> Result<Predicate<T>, CoreError>;
}

impl<T, F> FilterCompiler<T> for F
where
    F: Fn(&str) -> Result<Predicate<T>, CoreError> + Send + Sync,
{
    fn compile(&self, expression: &str) -> Result<Predicate<T>, CoreError> {
        self(expression)
    }
}

/// The default flow filter grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFilter;

impl FilterCompiler<Flow> for TextFilter {
    fn compile(&self, expression: &str) -> Result<Predicate<Flow>, CoreError> {
        let terms = expression
            .split_whitespace()
            .map(|raw| Term::parse(expression, raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Arc::new(move |flow: &Flow| terms.iter().all(|t| t.matches(flow))))
    }
}

// ── Terms ───────────────────────────────────────────────────────────

#[derive(Debug)]
struct Term {
    negate: bool,
    matcher: Matcher,
}

#[derive(Debug)]
enum Matcher {
    Method(String),
    Host(String),
    Path(String),
    Status(StatusMatch),
    Kind(FlowKind),
    Marked(MarkMatch),
    Text(String),
}

#[derive(Debug)]
enum StatusMatch {
    Exact(u16),
    /// Leading digit of a `Nxx` class.
    Class(u16),
}

#[derive(Debug)]
enum MarkMatch {
    Any(bool),
    Label(String),
}

impl Term {
    fn parse(expression: &str, raw: &str) -> Result<Self, CoreError> {
        let (negate, body) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        if body.is_empty() {
            return Err(CoreError::compile(expression, "`!` must be followed by a term"));
        }

        let matcher = match field_split(body) {
            Some((field, value)) => Matcher::field(expression, field, value)?,
            None => Matcher::Text(body.to_lowercase()),
        };
        Ok(Self { negate, matcher })
    }

    fn matches(&self, flow: &Flow) -> bool {
        self.matcher.matches(flow) != self.negate
    }
}

/// Split `name:value` when `name` looks like a field name. URLs such as
/// `https://host` stay bare text.
fn field_split(body: &str) -> Option<(&str, &str)> {
    let (name, value) = body.split_once(':')?;
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic()) || value.starts_with("//")
    {
        return None;
    }
    Some((name, value))
}

impl Matcher {
    fn field(expression: &str, field: &str, value: &str) -> Result<Self, CoreError> {
        if value.is_empty() {
            return Err(CoreError::compile(expression, format!("`{field}:` needs a value")));
        }
        let matcher = match field.to_ascii_lowercase().as_str() {
            "method" => Self::Method(value.to_ascii_uppercase()),
            "host" => Self::Host(value.to_lowercase()),
            "path" => Self::Path(value.to_lowercase()),
            "status" => Self::Status(parse_status(expression, value)?),
            "kind" => Self::Kind(value.parse().map_err(|_| {
                CoreError::compile(expression, format!("unknown flow kind `{value}`"))
            })?),
            "marked" => Self::Marked(match value.to_ascii_lowercase().as_str() {
                "true" | "yes" => MarkMatch::Any(true),
                "false" | "no" => MarkMatch::Any(false),
                _ => MarkMatch::Label(value.to_owned()),
            }),
            other => {
                return Err(CoreError::compile(
                    expression,
                    format!("unknown field `{other}:`"),
                ));
            }
        };
        Ok(matcher)
    }

    fn matches(&self, flow: &Flow) -> bool {
        match self {
            Self::Method(m) => flow.method().is_some_and(|v| v.eq_ignore_ascii_case(m)),
            Self::Host(h) => flow.host().is_some_and(|v| v.to_lowercase().contains(h)),
            Self::Path(p) => flow.path().is_some_and(|v| v.to_lowercase().contains(p)),
            Self::Status(StatusMatch::Exact(code)) => flow.status_code() == Some(*code),
            Self::Status(StatusMatch::Class(class)) => {
                flow.status_code().is_some_and(|c| c / 100 == *class)
            }
            Self::Kind(kind) => flow.kind == *kind,
            Self::Marked(MarkMatch::Any(want)) => flow.is_marked() == *want,
            Self::Marked(MarkMatch::Label(label)) => flow.marked.as_deref() == Some(label.as_str()),
            Self::Text(needle) => flow.summary_line().to_lowercase().contains(needle),
        }
    }
}

fn parse_status(expression: &str, value: &str) -> Result<StatusMatch, CoreError> {
    let lower = value.to_ascii_lowercase();
    if let Some(class) = lower.strip_suffix("xx") {
        if let Ok(digit @ 1..=5) = class.parse::<u16>() {
            return Ok(StatusMatch::Class(digit));
        }
    }
    value
        .parse::<u16>()
        .map(StatusMatch::Exact)
        .map_err(|_| CoreError::compile(expression, format!("status must be numeric, got `{value}`")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::flow::fixtures::http_flow;

    fn matches(expr: &str, flow: &Flow) -> bool {
        TextFilter.compile(expr).unwrap()(flow)
    }

    #[test]
    fn bare_text_matches_summary_case_insensitively() {
        let flow = http_flow("a", "GET", "Example.com", "/api/users", Some(200));
        assert!(matches("example", &flow));
        assert!(matches("API/USERS", &flow));
        assert!(!matches("admin", &flow));
    }

    #[test]
    fn terms_are_anded_and_can_be_negated() {
        let flow = http_flow("a", "POST", "api.test", "/login", Some(401));
        assert!(matches("method:post host:api", &flow));
        assert!(!matches("method:post !host:api", &flow));
        assert!(matches("!method:get", &flow));
    }

    #[test]
    fn status_accepts_codes_and_classes() {
        let flow = http_flow("a", "GET", "h", "/", Some(404));
        assert!(matches("status:404", &flow));
        assert!(matches("status:4xx", &flow));
        assert!(!matches("status:5xx", &flow));

        let pending = http_flow("b", "GET", "h", "/", None);
        assert!(!matches("status:4xx", &pending));
    }

    #[test]
    fn marked_matches_flag_and_label() {
        let mut flow = http_flow("a", "GET", "h", "/", None);
        assert!(matches("marked:false", &flow));
        flow.marked = Some(":star:".into());
        assert!(matches("marked:true", &flow));
        assert!(matches("marked::star:", &flow));
    }

    #[test]
    fn urls_are_bare_text() {
        let flow = http_flow("a", "GET", "example.com", "/", None);
        assert!(matches("https://example.com", &flow));
    }

    #[test]
    fn malformed_expressions_are_compile_errors() {
        for bad in ["!", "status:abc", "color:red", "kind:smtp", "host:"] {
            let err = TextFilter.compile(bad).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::Compile, "{bad}");
        }
    }

    #[test]
    fn closures_are_compilers() {
        let compiler = |expr: &str| -> Result<Predicate<u32>, CoreError> {
            let limit: u32 = expr.parse().map_err(|_| CoreError::compile(expr, "nan"))?;
            Ok(Arc::new(move |v: &u32| *v > limit))
        };
        let pred = FilterCompiler::compile(&compiler, "3").unwrap();
        assert!(pred(&4));
        assert!(!pred(&3));
    }
}
