//! Canonical spelling for SQL expressions and type names.
//!
//! The declared side and the introspector write the same thing differently
//! (`'a'::text` vs `'a'`, `character varying(20)` vs `varchar(20)`). Both
//! sides pass through these functions before entities are compared.

use std::sync::LazyLock;

use regex_lite::Regex;

static LITERAL_CAST: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"('(?:[^']|'')*')::(?:text|character varying|varchar|bpchar)(?:\[\])?").ok()
});

/// Normalize an expression: collapse whitespace outside quotes, lowercase
/// unquoted text, drop casts of string literals to text types and strip
/// parentheses wrapping the whole expression.
pub fn normalize_expression(expr: &str) -> String {
    let collapsed = collapse(expr.trim());
    let uncast = match LITERAL_CAST.as_ref() {
        Some(re) => re.replace_all(&collapsed, "$1").into_owned(),
        None => collapsed,
    };
    strip_outer_parens(uncast.trim()).to_string()
}

fn collapse(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut chars = expr.chars().peekable();
    let mut pending_space = false;

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                flush_space(&mut out, &mut pending_space, c);
                out.push(c);
                // Copy the quoted run verbatim; a doubled quote is an escape.
                while let Some(q) = chars.next() {
                    out.push(q);
                    if q == c {
                        if chars.peek() == Some(&c) {
                            out.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            c if c.is_whitespace() => pending_space = true,
            ',' => {
                out.push(',');
                pending_space = true;
            }
            ')' => {
                pending_space = false;
                out.push(')');
            }
            c => {
                flush_space(&mut out, &mut pending_space, c);
                out.extend(c.to_lowercase());
            }
        }
    }
    out
}

fn flush_space(out: &mut String, pending: &mut bool, next: char) {
    if *pending && !out.is_empty() && !out.ends_with('(') && next != ',' {
        out.push(' ');
    }
    *pending = false;
}

fn strip_outer_parens(mut expr: &str) -> &str {
    while expr.starts_with('(') && expr.ends_with(')') && wraps_whole(expr) {
        expr = expr[1..expr.len() - 1].trim();
    }
    expr
}

/// Whether the opening paren at 0 closes at the last byte.
fn wraps_whole(expr: &str) -> bool {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in expr.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return i == expr.len() - 1;
                    }
                }
                _ => {}
            },
        }
    }
    false
}

/// Split trailing `[]` pairs off a type: `text[][]` → (`text`, 2).
pub fn split_array_type(sql_type: &str) -> (&str, u32) {
    let mut base = sql_type.trim();
    let mut dims = 0;
    while let Some(rest) = base.strip_suffix("[]") {
        base = rest.trim_end();
        dims += 1;
    }
    (base, dims)
}

/// Canonical type name: lowercase, catalog aliases folded to the short
/// spelling (`character varying(n)` → `varchar(n)`, `int4` → `integer`,
/// `timestamp(3) without time zone` → `timestamp(3)`).
pub fn normalize_type(sql_type: &str) -> String {
    let lowered = sql_type.trim().to_ascii_lowercase();
    let lowered = lowered.replace(" without time zone", "");

    let (base, args) = match lowered.find('(') {
        Some(open) => {
            let close = lowered.rfind(')').unwrap_or(lowered.len());
            let args: String = lowered[open..close.min(lowered.len())]
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            let tail = lowered.get(close + 1..).unwrap_or("").trim();
            let base = format!("{} {}", lowered[..open].trim(), tail);
            (base.trim().to_string(), format!("{})", args))
        }
        None => (lowered, String::new()),
    };

    let canonical = match base.as_str() {
        "character varying" => "varchar",
        "character" | "bpchar" => "char",
        "int" | "int4" => "integer",
        "int8" => "bigint",
        "int2" => "smallint",
        "bool" => "boolean",
        "float8" => "double precision",
        "float4" => "real",
        "decimal" => "numeric",
        "timestamp with time zone" => "timestamptz",
        "time with time zone" => "timetz",
        other => other,
    };

    format!("{}{}", canonical, args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_expression_whitespace_and_case() {
        assert_eq!(normalize_expression("  LOWER( email )  "), "lower(email)");
        assert_eq!(
            normalize_expression("price   >   0 AND qty>0"),
            "price > 0 and qty>0"
        );
        assert_eq!(normalize_expression("coalesce(a ,b)"), "coalesce(a, b)");
    }

    #[test]
    fn test_normalize_expression_keeps_quoted_text() {
        assert_eq!(
            normalize_expression("status = 'Active  Now'"),
            "status = 'Active  Now'"
        );
        assert_eq!(normalize_expression("\"MixedCase\" > 1"), "\"MixedCase\" > 1");
        assert_eq!(normalize_expression("'it''s'"), "'it''s'");
    }

    #[test]
    fn test_normalize_expression_strips_casts_and_parens() {
        assert_eq!(normalize_expression("'draft'::text"), "'draft'");
        assert_eq!(
            normalize_expression("'x'::character varying"),
            "'x'"
        );
        assert_eq!(normalize_expression("((price > 0))"), "price > 0");
        assert_eq!(normalize_expression("(a) + (b)"), "(a) + (b)");
    }

    #[test]
    fn test_normalize_type_aliases() {
        assert_eq!(normalize_type("character varying(255)"), "varchar(255)");
        assert_eq!(normalize_type("INT4"), "integer");
        assert_eq!(normalize_type("timestamp(3) without time zone"), "timestamp(3)");
        assert_eq!(normalize_type("timestamp with time zone"), "timestamptz");
        assert_eq!(normalize_type("numeric(10, 2)"), "numeric(10,2)");
        assert_eq!(normalize_type("text"), "text");
    }

    #[test]
    fn test_split_array_type() {
        assert_eq!(split_array_type("text[][]"), ("text", 2));
        assert_eq!(split_array_type("integer"), ("integer", 0));
    }
}
