//! libxml2 backend: parsing and XPath 1.0 evaluation

use crate::backend::{DocumentTree, ParseError, QueryError, TreeBackend};
use libxml::parser::{Parser, ParserOptions};
use libxml::tree::{Document, Node, NodeType};
use libxml::xpath::Context;
use std::sync::Once;

static INIT: Once = Once::new();

/// Parses and queries with libxml2
#[derive(Debug)]
pub struct LibxmlBackend;

impl LibxmlBackend {
    pub fn new() -> Self {
        // libxml2 sets up its globals on first use; do that on this thread
        // before worker threads parse concurrently.
        INIT.call_once(|| {
            let _ = Parser::default().parse_string("<init/>");
        });
        Self
    }
}

impl Default for LibxmlBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBackend for LibxmlBackend {
    fn name(&self) -> &str {
        "libxml"
    }

    fn parse<'t>(&self, text: &'t str) -> Result<Box<dyn DocumentTree + 't>, ParseError> {
        // Well-formedness errors are fatal and nothing is printed to stderr
        let options = ParserOptions {
            recover: false,
            no_error: true,
            no_warning: true,
            ..ParserOptions::default()
        };
        let doc = Parser::default()
            .parse_string_with_options(text, options)
            .map_err(|e| ParseError::Xml(format!("document is not well-formed ({e:?})")))?;
        if doc.get_root_element().is_none() {
            return Err(ParseError::Xml("document has no root element".to_string()));
        }
        Ok(Box::new(LibxmlTree { doc }))
    }

    fn check_query(&self, expr: &str) -> Result<(), QueryError> {
        let tree = self
            .parse("<check/>")
            .map_err(|e| QueryError::Evaluation(e.to_string()))?;
        tree.query(expr).map(|_| ())
    }
}

struct LibxmlTree {
    doc: Document,
}

impl LibxmlTree {
    /// Context rooted at the document element, with the root's own
    /// prefix declarations registered.
    fn context(&self) -> Result<Context, QueryError> {
        let mut ctx = Context::new(&self.doc)
            .map_err(|_| QueryError::Evaluation("could not create XPath context".to_string()))?;
        if let Some(root) = self.doc.get_root_element() {
            for ns in root.get_namespace_declarations() {
                let prefix = ns.get_prefix();
                if prefix.is_empty() {
                    continue;
                }
                ctx.register_namespace(&prefix, &ns.get_href()).map_err(|_| {
                    QueryError::Evaluation(format!("could not register prefix '{}'", prefix))
                })?;
            }
            ctx.set_context_node(&root)
                .map_err(|_| QueryError::Evaluation("could not set context node".to_string()))?;
        }
        Ok(ctx)
    }
}

impl DocumentTree for LibxmlTree {
    fn query(&self, expr: &str) -> Result<Vec<String>, QueryError> {
        let ctx = self.context()?;
        let nodes = ctx
            .evaluate(expr)
            .map_err(|_| QueryError::Syntax(format!("libxml2 rejected '{}'", expr)))?
            .get_nodes_as_vec();

        // Numbers, strings and booleans come back as an empty node list;
        // count() only accepts node-sets.
        if nodes.is_empty() && ctx.evaluate(&format!("count({})", expr)).is_err() {
            return Err(QueryError::Evaluation(format!(
                "'{}' does not select nodes",
                expr
            )));
        }

        Ok(nodes.iter().map(node_text).collect())
    }
}

/// Leading text of an element, or the content of any other node.
fn node_text(node: &Node) -> String {
    match node.get_type() {
        Some(NodeType::ElementNode) => match node.get_first_child() {
            Some(child)
                if matches!(
                    child.get_type(),
                    Some(NodeType::TextNode) | Some(NodeType::CDataSectionNode)
                ) =>
            {
                child.get_content().trim().to_string()
            }
            _ => String::new(),
        },
        _ => node.get_content().trim().to_string(),
    }
}
