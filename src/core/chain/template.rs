// Placeholder expansion for built-in message and variable actions.
//
// Supported placeholders:
// - `$user`          name of the invoking user
// - `$args`          all arguments joined by spaces
// - `$args[N]`       the N-th argument (empty when missing)
// - `$server[key]`   server-scoped variable
// - `$global[key]`   global-scoped variable
//
// Anything else after a `$` is copied through untouched.

use super::chain_models::Subject;
use crate::core::variables::{Scope, Variables};

pub fn render(template: &str, subject: &Subject, args: &[String], vars: &Variables) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        match expand(tail, subject, args, vars) {
            Some((text, used)) => {
                out.push_str(&text);
                rest = &tail[used..];
            }
            None => {
                out.push('$');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Expand the placeholder at the start of `tail`, returning the text and
/// how many bytes of `tail` it consumed.
fn expand(tail: &str, subject: &Subject, args: &[String], vars: &Variables) -> Option<(String, usize)> {
    if tail.starts_with("user") {
        let name = subject.user().map(|u| u.name.clone()).unwrap_or_default();
        return Some((name, "user".len()));
    }

    if let Some(after) = tail.strip_prefix("args") {
        return Some(match bracketed(after) {
            Some((inner, used)) => {
                let arg = inner
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| args.get(i).cloned())
                    .unwrap_or_default();
                (arg, "args".len() + used)
            }
            None => (args.join(" "), "args".len()),
        });
    }

    for (prefix, scope) in [("server", Scope::Server), ("global", Scope::Global)] {
        if let Some(after) = tail.strip_prefix(prefix) {
            let (key, used) = bracketed(after)?;
            let graph = vars.scope(scope);
            let text = graph
                .get(key.trim())
                .map(|value| graph.display(value))
                .unwrap_or_default();
            return Some((text, prefix.len() + used));
        }
    }

    None
}

fn bracketed(s: &str) -> Option<(&str, usize)> {
    let inner = s.strip_prefix('[')?;
    let end = inner.find(']')?;
    Some((&inner[..end], end + 2))
}
