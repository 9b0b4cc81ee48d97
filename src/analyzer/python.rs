//! Python analyzer
//!
//! Extracts module-scope structure from Python source files using tree-sitter.
//! Compound statements at module scope are entered; function and class
//! bodies are not, except one level into class bodies for methods and
//! instance attributes.

use crate::{Error, Result};
use super::{ClassOutline, FileOutcome, FunctionOutline, ModuleOutline, SkipReason};
use std::collections::HashSet;
use tree_sitter::{Node, Parser};

/// Decorators that make a method's first parameter something other than the instance
const NON_INSTANCE_DECORATORS: &[&str] = &["staticmethod", "classmethod"];

/// Python 2 statements the grammar still accepts but a Python 3 parser rejects
const LEGACY_STATEMENTS: &[&str] = &["print_statement", "exec_statement"];

/// Nodes that open a scope of their own at module level
const SCOPED_EXPRESSIONS: &[&str] = &[
    "lambda",
    "list_comprehension",
    "set_comprehension",
    "dictionary_comprehension",
    "generator_expression",
];

/// Python analyzer.
///
/// Holds nothing but the parser itself, so a fresh analyzer per commit
/// guarantees no state carries over from one revision to the next.
pub struct PythonAnalyzer {
    parser: Parser,
}

impl PythonAnalyzer {
    /// Create a new Python analyzer
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| Error::Parse(format!("Failed to set language: {}", e)))?;
        Ok(Self { parser })
    }

    /// Analyze one file given its path segments and raw content
    pub fn analyze(&mut self, path: &[String], content: &[u8]) -> FileOutcome {
        let source = match std::str::from_utf8(content) {
            Ok(s) => s.strip_prefix('\u{feff}').unwrap_or(s),
            Err(e) => {
                return FileOutcome::Skipped(SkipReason::Decode { valid_up_to: e.valid_up_to() });
            }
        };

        let Some(tree) = self.parser.parse(source, None) else {
            return FileOutcome::Skipped(SkipReason::NoTree);
        };

        let root = tree.root_node();
        if root.has_error() {
            return FileOutcome::Skipped(SkipReason::Syntax { line: first_error_line(root) });
        }
        if let Some(legacy) = first_legacy_statement(root) {
            return FileOutcome::Skipped(SkipReason::Syntax { line: start_line(legacy) });
        }

        let mut outline = ModuleOutline::new(path.join("/"));
        let mut seen = HashSet::new();

        // The first binding of a name decides what the name is
        for (name, binding) in module_bindings(root, source) {
            if !seen.insert(name) {
                continue;
            }
            match binding {
                Binding::Class(node) => {
                    if let Some(class) = extract_class(node, source) {
                        outline.classes.push(class);
                    }
                }
                Binding::Function(node) => {
                    if let Some(function) = extract_function(node, source) {
                        outline.functions.push(function);
                    }
                }
                Binding::Name => outline.attributes.push(name.to_string()),
                Binding::Import => {}
            }
        }

        FileOutcome::Parsed(outline)
    }
}

/// What bound a module-scope name
#[derive(Debug, Clone, Copy)]
enum Binding<'t> {
    Class(Node<'t>),
    Function(Node<'t>),
    /// Assignment, loop variable, `as` target or walrus
    Name,
    Import,
}

/// Every name bound at module scope, in source order, with what bound it.
///
/// `if`, `for`, `while`, `try`, `with` and `match` blocks are entered.
/// Function and class bodies, lambdas and comprehensions are not.
fn module_bindings<'t, 's>(root: Node<'t>, source: &'s str) -> Vec<(&'s str, Binding<'t>)> {
    let mut bindings = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        match node.kind() {
            "class_definition" | "function_definition" => {
                if let Some(name) = node.child_by_field_name("name").and_then(|n| node_text(n, source)) {
                    let binding = if node.kind() == "class_definition" {
                        Binding::Class(node)
                    } else {
                        Binding::Function(node)
                    };
                    bindings.push((name, binding));
                }
                continue;
            }
            kind if SCOPED_EXPRESSIONS.contains(&kind) => continue,
            "assignment" | "augmented_assignment" | "for_statement" => {
                if let Some(left) = node.child_by_field_name("left") {
                    bind_targets(left, source, &mut bindings);
                }
            }
            "named_expression" => {
                if let Some(name) = node.child_by_field_name("name") {
                    bind_targets(name, source, &mut bindings);
                }
            }
            "as_pattern" => {
                if let Some(alias) = node.child_by_field_name("alias") {
                    bind_targets(alias, source, &mut bindings);
                }
            }
            "except_clause" | "except_group_clause" => {
                if let Some(alias) = except_alias(node) {
                    bind_targets(alias, source, &mut bindings);
                }
            }
            "import_statement" | "import_from_statement" => {
                bindings.extend(imported_names(node, source).into_iter().map(|name| (name, Binding::Import)));
                continue;
            }
            _ => {}
        }

        // Push children in reverse so they pop in source order
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    bindings
}

/// Record the plain names among an assignment target's leaves
fn bind_targets<'t, 's>(target: Node<'t>, source: &'s str, out: &mut Vec<(&'s str, Binding<'t>)>) {
    let mut targets = Vec::new();
    flatten_targets(target, &mut targets);
    out.extend(
        targets
            .into_iter()
            .filter(|t| t.kind() == "identifier")
            .filter_map(|t| node_text(t, source))
            .map(|name| (name, Binding::Name)),
    );
}

/// The target after `as` (or the legacy `,`) in an except clause
fn except_alias(clause: Node) -> Option<Node> {
    if let Some(alias) = clause.child_by_field_name("alias") {
        return Some(alias);
    }
    let mut cursor = clause.walk();
    let keyword = clause.children(&mut cursor).find(|c| !c.is_named() && matches!(c.kind(), "as" | ","))?;
    keyword.next_named_sibling()
}

/// Names an import statement binds: the alias if any, else the first dotted segment
fn imported_names<'s>(statement: Node, source: &'s str) -> Vec<&'s str> {
    let mut cursor = statement.walk();
    let names: Vec<&str> = statement
        .children_by_field_name("name", &mut cursor)
        .filter_map(|name| {
            let bound = match name.kind() {
                "aliased_import" => name.child_by_field_name("alias")?,
                "dotted_name" => name.named_child(0)?,
                _ => name,
            };
            node_text(bound, source)
        })
        .collect();
    names
}

/// Extract a top-level class, its methods and its instance attributes
fn extract_class(node: Node, source: &str) -> Option<ClassOutline> {
    let name = node_text(node.child_by_field_name("name")?, source)?;
    let mut class = ClassOutline {
        name: name.to_string(),
        start_lineno: start_line(node),
        end_lineno: end_line(node),
        instance_attributes: Vec::new(),
        methods: Vec::new(),
    };

    let Some(body) = node.child_by_field_name("body") else {
        return Some(class);
    };

    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        let Some(method) = unwrap_decorated(child) else {
            continue;
        };
        if method.kind() != "function_definition" {
            continue;
        }
        if let Some(method_name) = method.child_by_field_name("name").and_then(|n| node_text(n, source)) {
            class.methods.push(method_name.to_string());
        }

        if is_instance_method(child, source) {
            if let Some(receiver) = first_parameter(method, source) {
                collect_instance_attributes(method, receiver, source, &mut class.instance_attributes);
            }
        }
    }

    Some(class)
}

/// Extract a top-level function with its own line span
fn extract_function(node: Node, source: &str) -> Option<FunctionOutline> {
    let name = node_text(node.child_by_field_name("name")?, source)?;
    Some(FunctionOutline {
        name: name.to_string(),
        start_lineno: start_line(node),
        end_lineno: end_line(node),
    })
}

/// Strip decorators, returning the class or function definition underneath
fn unwrap_decorated(node: Node) -> Option<Node> {
    match node.kind() {
        "decorated_definition" => node.child_by_field_name("definition"),
        "class_definition" | "function_definition" => Some(node),
        _ => None,
    }
}

/// A method is an instance method unless decorated as static or class method
fn is_instance_method(node: Node, source: &str) -> bool {
    if node.kind() != "decorated_definition" {
        return true;
    }
    let mut cursor = node.walk();
    let decorated_away = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
        .filter_map(|d| d.named_child(0))
        .filter_map(|expr| node_text(expr, source))
        .any(|name| NON_INSTANCE_DECORATORS.contains(&name));
    !decorated_away
}

/// Name of the first positional parameter of a function
fn first_parameter<'s>(function: Node, source: &'s str) -> Option<&'s str> {
    let params = function.child_by_field_name("parameters")?;
    let mut cursor = params.walk();
    let first = params
        .named_children(&mut cursor)
        .find(|p| p.kind() != "comment")?;

    parameter_name(first)
        .filter(|n| n.kind() == "identifier")
        .and_then(|n| node_text(n, source))
}

/// Whether a function or lambda declares a parameter called `name`
fn declares_parameter(function: Node, name: &str, source: &str) -> bool {
    let Some(params) = function.child_by_field_name("parameters") else {
        return false;
    };
    let mut cursor = params.walk();
    let declared = params
        .named_children(&mut cursor)
        .filter_map(|p| match p.kind() {
            "list_splat_pattern" | "dictionary_splat_pattern" => p.named_child(0),
            _ => parameter_name(p),
        })
        .any(|n| node_text(n, source) == Some(name));
    declared
}

/// The name node of a single parameter; splats yield their pattern, not a name
fn parameter_name(param: Node) -> Option<Node> {
    match param.kind() {
        "identifier" => Some(param),
        "typed_parameter" => param.named_child(0),
        "default_parameter" | "typed_default_parameter" => param.child_by_field_name("name"),
        _ => None,
    }
}

/// Collect `<receiver>.<name>` assignment targets inside a method body.
///
/// Nested functions and lambdas see the receiver through their closure and
/// are entered, unless one of their own parameters shadows it. Nested
/// classes are not entered.
fn collect_instance_attributes(method: Node, receiver: &str, source: &str, out: &mut Vec<String>) {
    let Some(body) = method.child_by_field_name("body") else {
        return;
    };

    let mut stack = vec![body];
    let mut targets = Vec::new();

    while let Some(node) = stack.pop() {
        match node.kind() {
            "class_definition" => continue,
            "function_definition" | "lambda" if declares_parameter(node, receiver, source) => continue,
            "assignment" | "augmented_assignment" => {
                if let Some(left) = node.child_by_field_name("left") {
                    targets.clear();
                    flatten_targets(left, &mut targets);
                    for target in &targets {
                        if let Some(name) = instance_attribute_name(*target, receiver, source) {
                            if !out.iter().any(|existing| existing == name) {
                                out.push(name.to_string());
                            }
                        }
                    }
                }
            }
            _ => {}
        }

        // Push children in reverse so they pop in source order
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
}

fn instance_attribute_name<'s>(target: Node, receiver: &str, source: &'s str) -> Option<&'s str> {
    if target.kind() != "attribute" {
        return None;
    }
    let object = target.child_by_field_name("object")?;
    if object.kind() != "identifier" || node_text(object, source)? != receiver {
        return None;
    }
    node_text(target.child_by_field_name("attribute")?, source)
}

/// Flatten tuple/list patterns into their individual targets
fn flatten_targets<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    match node.kind() {
        "pattern_list" | "tuple_pattern" | "list_pattern" | "list_splat_pattern"
        | "parenthesized_expression" | "tuple" | "list" | "list_splat" | "expression_list"
        | "as_pattern_target" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                flatten_targets(child, out);
            }
        }
        _ => out.push(node),
    }
}

/// First Python 2 only statement anywhere in the tree, in document order
fn first_legacy_statement(root: Node) -> Option<Node> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if LEGACY_STATEMENTS.contains(&node.kind()) {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

/// Line of the first error or missing node, in document order
fn first_error_line(root: Node) -> u32 {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return start_line(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node
            .children(&mut cursor)
            .filter(|c| c.has_error() || c.is_missing())
            .collect();
        stack.extend(children.into_iter().rev());
    }
    start_line(root)
}

fn node_text<'s>(node: Node, source: &'s str) -> Option<&'s str> {
    source.get(node.byte_range())
}

fn start_line(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// Last line a node occupies; a node ending at column 0 ends on the previous line
fn end_line(node: Node) -> u32 {
    let end = node.end_position();
    let start = node.start_position();
    if end.column == 0 && end.row > start.row {
        end.row as u32
    } else {
        end.row as u32 + 1
    }
}
