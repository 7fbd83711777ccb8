//! Command and file template rendering
//!
//! Templates carry `{{ name }}` / `{{ name|filter }}` interpolations and
//! `{% if cond %} ... {% else %} ... {% endif %}` blocks. Command templates
//! are multi-line for readability and collapse to a single shell line when
//! rendered; file templates keep their whitespace.

use regex::Regex;

use crate::error::{RenderError, RenderResult};
use crate::runner::expr;
use crate::runner::scope::VariableStore;

/// Render a command template into a single shell command line
///
/// All whitespace runs (including newlines) collapse to single spaces.
/// Escaped characters such as `\"` are ordinary text and pass through.
pub fn render_command(template: &str, scope: &VariableStore) -> RenderResult<String> {
    let rendered = render_text(template, scope)?;
    Ok(rendered.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Render a template preserving its whitespace (file templates, paths,
/// variable values)
pub fn render_text(template: &str, scope: &VariableStore) -> RenderResult<String> {
    let chunks = lex(template);
    let nodes = parse(&chunks)?;
    render_nodes(&nodes, scope)
}

#[derive(Debug, Clone, PartialEq)]
enum Chunk {
    Text(String),
    /// Contents of a `{{ ... }}` interpolation
    Expr(String),
    /// Contents of a `{% ... %}` tag
    Tag(String),
}

fn lex(template: &str) -> Vec<Chunk> {
    // Tags never nest, so non-greedy matching is enough
    let re = Regex::new(r"(?s)\{\{(.*?)\}\}|\{%(.*?)%\}").unwrap();

    let mut chunks = Vec::new();
    let mut last = 0;

    for caps in re.captures_iter(template) {
        let whole = caps.get(0).unwrap();
        if whole.start() > last {
            chunks.push(Chunk::Text(template[last..whole.start()].to_string()));
        }
        if let Some(expr) = caps.get(1) {
            chunks.push(Chunk::Expr(expr.as_str().trim().to_string()));
        } else if let Some(tag) = caps.get(2) {
            chunks.push(Chunk::Tag(tag.as_str().trim().to_string()));
        }
        last = whole.end();
    }

    if last < template.len() {
        chunks.push(Chunk::Text(template[last..].to_string()));
    }

    chunks
}

#[derive(Debug)]
enum Node {
    Text(String),
    Interp { var: String, filters: Vec<String> },
    If { cond: String, then: Vec<Node>, els: Vec<Node> },
}

fn parse(chunks: &[Chunk]) -> RenderResult<Vec<Node>> {
    let mut pos = 0;
    let nodes = parse_block(chunks, &mut pos)?;
    if pos != chunks.len() {
        // parse_block only stops early on else/endif
        return Err(RenderError::InvalidSyntax(
            "'{% else %}' or '{% endif %}' outside a conditional block".to_string(),
        ));
    }
    Ok(nodes)
}

/// Parse until the end of input or an `else`/`endif` tag (left unconsumed
/// for the caller)
fn parse_block(chunks: &[Chunk], pos: &mut usize) -> RenderResult<Vec<Node>> {
    let mut nodes = Vec::new();

    while let Some(chunk) = chunks.get(*pos) {
        match chunk {
            Chunk::Text(text) => {
                nodes.push(Node::Text(text.clone()));
                *pos += 1;
            }
            Chunk::Expr(contents) => {
                nodes.push(parse_interp(contents)?);
                *pos += 1;
            }
            Chunk::Tag(tag) => {
                if let Some(cond) = tag.strip_prefix("if ") {
                    *pos += 1;
                    nodes.push(parse_if(cond.trim(), chunks, pos)?);
                } else if tag == "else" || tag == "endif" {
                    // Left unconsumed; parse() flags it when not inside an if
                    return Ok(nodes);
                } else {
                    return Err(RenderError::InvalidSyntax(format!(
                        "unknown tag '{{% {} %}}'",
                        tag
                    )));
                }
            }
        }
    }

    Ok(nodes)
}

fn parse_if(cond: &str, chunks: &[Chunk], pos: &mut usize) -> RenderResult<Node> {
    if cond.is_empty() {
        return Err(RenderError::InvalidSyntax(
            "'{% if %}' with an empty condition".to_string(),
        ));
    }

    let then = parse_block(chunks, pos)?;

    let mut els = Vec::new();
    match chunks.get(*pos) {
        Some(Chunk::Tag(tag)) if tag == "else" => {
            *pos += 1;
            els = parse_block(chunks, pos)?;
            match chunks.get(*pos) {
                Some(Chunk::Tag(tag)) if tag == "endif" => {
                    *pos += 1;
                }
                _ => {
                    return Err(RenderError::InvalidSyntax(format!(
                        "'{{% if {} %}}' is missing '{{% endif %}}'",
                        cond
                    )))
                }
            }
        }
        Some(Chunk::Tag(tag)) if tag == "endif" => {
            *pos += 1;
        }
        _ => {
            return Err(RenderError::InvalidSyntax(format!(
                "'{{% if {} %}}' is missing '{{% endif %}}'",
                cond
            )))
        }
    }

    Ok(Node::If {
        cond: cond.to_string(),
        then,
        els,
    })
}

fn parse_interp(contents: &str) -> RenderResult<Node> {
    let mut parts = contents.split('|').map(str::trim);
    let var = parts.next().unwrap_or("").to_string();
    if var.is_empty() {
        return Err(RenderError::InvalidSyntax(
            "empty '{{ }}' interpolation".to_string(),
        ));
    }
    let filters: Vec<String> = parts.map(str::to_string).collect();
    if filters.iter().any(String::is_empty) {
        return Err(RenderError::InvalidSyntax(format!(
            "empty filter in '{{{{ {} }}}}'",
            contents
        )));
    }
    Ok(Node::Interp { var, filters })
}

fn render_nodes(nodes: &[Node], scope: &VariableStore) -> RenderResult<String> {
    let mut out = String::new();

    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Interp { var, filters } => {
                let mut value = scope.lookup(var)?.render();
                for filter in filters {
                    value = apply_filter(filter, value)?;
                }
                out.push_str(&value);
            }
            Node::If { cond, then, els } => {
                let branch = if expr::evaluate(cond, scope)? { then } else { els };
                out.push_str(&render_nodes(branch, scope)?);
            }
        }
    }

    Ok(out)
}

fn apply_filter(name: &str, value: String) -> RenderResult<String> {
    match name {
        "upper" => Ok(value.to_uppercase()),
        "lower" => Ok(value.to_lowercase()),
        _ => Err(RenderError::UnknownFilter(name.to_string())),
    }
}
