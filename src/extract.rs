//! Port, parameter, and instance extraction from the Verilog syntax tree.
//!
//! Port attributes come from two independent places in the tree: standalone
//! declarations in the module body (non-ANSI style) and the formal port list
//! itself (ANSI style, where a port declaration establishes direction and
//! type for the trailing bare identifiers). [`ports_of`] reconciles both
//! sources by name and emits one record per port-list occurrence.

use crate::interface::{Direction, Module, Parameter, Port, TypeDimension};
use crate::syntax::{Node, VeribleParser};
use indexmap::IndexMap;
use std::path::PathBuf;
use tracing::{debug, error, warn};

const IDENTIFIER_TAGS: &[&str] = &["SymbolIdentifier", "EscapedIdentifier"];

/// Appends all declaration dimensions found under `node` to `dimensions`, in
/// document order.
///
/// A range form `[A:B]` keeps both bound expressions verbatim. A scalar form
/// `[N]` is sugar for a zero-based range of size N and is normalized to
/// `[0:N-1]` by literal string concatenation, never by evaluation.
pub fn collect_dimensions(node: &Node, dimensions: &mut Vec<TypeDimension>) {
    for declared in node.find_all(&["kDeclarationDimensions"]) {
        for dimension in declared.find_all(&["kDimensionRange", "kDimensionScalar"]) {
            if dimension.tag == "kDimensionRange" {
                let bounds = dimension.find_all_within(&["kExpression"], 1);
                if let [left, right, ..] = bounds.as_slice() {
                    dimensions.push(TypeDimension::new(left.text(), right.text()));
                }
            } else if let Some(size) = dimension.find(&["kExpressionList"]) {
                dimensions.push(TypeDimension::new("0", format!("{}-1", size.text())));
            }
        }
    }
}

#[derive(Default)]
struct DeclaredAttrs {
    dimensions: Option<Vec<TypeDimension>>,
    direction: Option<Direction>,
    datatype: Option<String>,
}

/// First pass: collects per-identifier attributes from the declarations in
/// the module body. A later declaration of the same identifier fills only
/// the attributes still missing, it never overwrites one already recorded.
fn body_declarations(module: &Node) -> IndexMap<String, DeclaredAttrs> {
    let mut declared = IndexMap::new();
    let Some(items) = module.find(&["kModuleItemList"]) else {
        return declared;
    };
    let decl_tags = ["kModulePortDeclaration", "kNetDeclaration", "kDataDeclaration"];
    for decl in items.find_all(&decl_tags) {
        for name in decl.find_all(IDENTIFIER_TAGS) {
            let entry: &mut DeclaredAttrs = declared.entry(name.text().to_owned()).or_default();
            if decl.tag == "kModulePortDeclaration" {
                if entry.direction.is_none() {
                    if let Some(first) = decl.children.first() {
                        entry.direction = Some(Direction::parse(first.text()));
                    }
                }
            } else if entry.datatype.is_none() {
                // a port direction declaration carries at most packed
                // dimensions in its type subtree, not a data type
                entry.datatype = declared_datatype(decl);
            }
            if entry.dimensions.is_none() {
                let mut dimensions = Vec::new();
                collect_dimensions(decl, &mut dimensions);
                if !dimensions.is_empty() {
                    entry.dimensions = Some(dimensions);
                }
            }
        }
    }
    declared
}

fn declared_datatype(decl: &Node) -> Option<String> {
    let datatype = decl.find(&["kDataType"])?;
    if datatype.children.is_empty() {
        return None;
    }
    if let Some(primitive) = decl.find(&["kDataTypePrimitive"]) {
        return Some(primitive.text().to_owned());
    }
    (!datatype.text().is_empty()).then(|| datatype.text().to_owned())
}

/// Extracts the ports of one module, in port-list order.
///
/// Duplicate names are not deduplicated: every occurrence in the port list
/// produces its own record, so comma-separated lists sharing one declaration
/// (`output c, c1`) yield independent records. Unpacked dimensions always
/// precede packed dimensions in the merged dimension list.
pub fn ports_of(module: &Node) -> Vec<Port> {
    let declared = body_declarations(module);
    let mut ports = Vec::new();
    let mut last_decl: Option<&Node> = None;
    for port in module.find_all(&["kPortDeclaration", "kPort"]) {
        if port.tag == "kPortDeclaration" {
            last_decl = Some(port);
        }
        let name = port.find(IDENTIFIER_TAGS).map_or("undefined_port", Node::text);

        let mut direction = Direction::default();
        let mut datatype = None;
        let mut dimensions = Vec::new();
        if let Some(decl) = last_decl {
            // unpacked dimensions first
            if port.tag == "kPort" {
                collect_dimensions(port, &mut dimensions);
            } else {
                for unpacked in port.find_all(&["kUnpackedDimensions"]) {
                    collect_dimensions(unpacked, &mut dimensions);
                }
            }
            // packed dimensions of the governing declaration follow
            for packed in decl.find_all(&["kPackedDimensions"]) {
                collect_dimensions(packed, &mut dimensions);
            }
            datatype = decl
                .find(&["kDataTypePrimitive"])
                .map(|primitive| primitive.text().to_owned())
                .or_else(|| declared_datatype(decl));
            if let Some(first) = decl.children.first() {
                direction = Direction::parse(first.text());
            }
        } else if let Some(attrs) = declared.get(name) {
            direction = attrs.direction.unwrap_or_default();
            datatype = attrs.datatype.clone();
            if let Some(declared_dimensions) = &attrs.dimensions {
                dimensions = declared_dimensions.clone();
            }
        }
        ports.push(Port {
            name: name.to_owned(),
            direction,
            datatype,
            dimensions: (!dimensions.is_empty()).then_some(dimensions),
        });
    }
    ports
}

/// Extracts the formal parameters of one module, in declaration order.
pub fn parameters_of(module: &Node) -> Vec<Parameter> {
    let mut parameters = Vec::new();
    let Some(list) = module.find(&["kFormalParameterList"]) else {
        return parameters;
    };
    for decl in list.find_all(&["kParamDeclaration"]) {
        let name = decl
            .find(&["kUnqualifiedId", "SymbolIdentifier", "EscapedIdentifier"])
            .map_or("undefined_parameter", Node::text);
        let mut dimensions = Vec::new();
        collect_dimensions(decl, &mut dimensions);
        let datatype = decl
            .find(&["kTypeInfo"])
            .map(Node::text)
            .filter(|text| !text.is_empty())
            .map(str::to_owned)
            .or_else(|| decl.find(&["kDataTypePrimitive"]).map(|n| n.text().to_owned()));
        let value = decl
            .find(&["kTrailingAssign"])
            .and_then(|assign| assign.find(&["kExpression"]))
            .map(|expression| expression.text().to_owned());
        parameters.push(Parameter {
            name: name.to_owned(),
            datatype,
            dimensions: (!dimensions.is_empty()).then_some(dimensions),
            value,
        });
    }
    parameters
}

/// Extracts the names of modules instantiated by `module`, or `None` when it
/// instantiates nothing.
pub fn instances_of(module: &Node) -> Option<Vec<String>> {
    let mut instances = Vec::new();
    for instantiation in module.find_all(&["kInstantiationBase"]) {
        if instantiation.find(&["kGateInstance"]).is_none() {
            continue;
        }
        let Some(instantiated) = instantiation.find(&["kInstantiationType"]) else {
            continue;
        };
        let Some(name) = instantiated.find(&["kUnqualifiedId"]) else {
            continue;
        };
        if let Some(first) = name.children.first() {
            if first.tag == "SymbolIdentifier" {
                instances.push(first.text().to_owned());
            }
        }
    }
    (!instances.is_empty()).then_some(instances)
}

/// Parses a batch of source files and extracts every module found.
///
/// A file that fails to parse is logged and skipped; the batch continues
/// with the remaining files. Root and leaf flags are classified only after
/// the whole batch is known.
pub fn process_files(parser: &VeribleParser, files: &[PathBuf]) -> Vec<Module> {
    let mut modules = Vec::new();
    for file in files {
        let tree = match parser.parse_file(file) {
            Ok(tree) => tree,
            Err(err) => {
                error!("failed to parse {}: {err:#}", file.display());
                continue;
            }
        };
        for decl in tree.find_all(&["kModuleDeclaration"]) {
            let name = decl
                .find(&["kModuleHeader"])
                .and_then(|header| header.find(IDENTIFIER_TAGS))
                .map(|identifier| identifier.text().to_owned());
            let Some(name) = name else {
                warn!("skipping unnamed module in {}", file.display());
                continue;
            };
            debug!("[{name}]");
            let ports = ports_of(decl);
            for port in &ports {
                debug!("\t{port}");
            }
            let parameters = parameters_of(decl);
            for parameter in &parameters {
                debug!("\t# {parameter}");
            }
            let instances = instances_of(decl);
            for instance in instances.iter().flatten() {
                debug!("\t[{instance}]");
            }
            modules.push(Module {
                name,
                path: file.clone(),
                ports,
                parameters,
                instances,
                is_leaf: false,
                is_root: false,
            });
        }
    }
    crate::hierarchy::classify_modules(&mut modules);
    modules
}
