//! IP-XACT 1685-2014 component documents.
//!
//! Builds a fresh component for an extracted module or splices the module's
//! view, instantiation, ports, and file set into an existing component
//! document. Structural inconsistencies in an existing document (missing
//! VLNV elements, duplicate view/instantiation/file-set names) are logged
//! and the offending insertion skipped; they never abort the whole update.

use crate::hierarchy::files_in_hierarchy;
use crate::interface::{Module, Parameter, Port};
use crate::xml::Element;
use eyre::{bail, Result};
use std::path::Path;
use tracing::{error, warn};

/// IP-XACT 1685-2014 namespace.
pub const NS_IPXACT: &str = "http://www.accellera.org/XMLSchema/IPXACT/1685-2014";
/// XML Schema instance namespace.
pub const NS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "http://www.accellera.org/XMLSchema/IPXACT/1685-2014 \
                               http://www.accellera.org/XMLSchema/IPXACT/1685-2014/index.xsd";

const VIEW_NAME: &str = "rtl";
const INSTANTIATION_NAME: &str = "rtl_implementation";
const FILE_SET_NAME: &str = "rtl_files";

/// Schema order of the direct children of `ipxact:component`.
const COMPONENT_ELEMENT_ORDER: &[&str] = &[
    "vendor",
    "library",
    "name",
    "version",
    "busInterfaces",
    "indirectInterfaces",
    "channels",
    "remapStates",
    "addressSpaces",
    "memoryMaps",
    "model",
    "componentGenerators",
    "choices",
    "fileSets",
    "whiteboxElements",
    "cpus",
    "otherClockDrivers",
    "resetTypes",
    "description",
    "parameters",
    "assertions",
    "vendorExtensions",
];

fn tag(name: &str) -> String {
    format!("ipxact:{name}")
}

/// User-provided VLNV header values; unset fields take documented defaults
/// (`vendor`, `library`, `0.0.0`). The component name is always the root
/// module name.
#[derive(Clone, Debug, Default)]
pub struct VlnvOptions {
    /// `--xact-vendor` value.
    pub vendor: Option<String>,
    /// `--xact-library` value.
    pub library: Option<String>,
    /// `--xact-version` value.
    pub version: Option<String>,
}

impl VlnvOptions {
    fn user_value(&self, name: &str) -> Option<&str> {
        match name {
            "vendor" => self.vendor.as_deref(),
            "library" => self.library.as_deref(),
            "version" => self.version.as_deref(),
            _ => None,
        }
    }

    fn text_for(&self, name: &str, module_name: &str) -> String {
        if name == "name" {
            return module_name.to_owned();
        }
        if let Some(value) = self.user_value(name) {
            return value.to_owned();
        }
        match name {
            "version" => "0.0.0".to_owned(),
            other => other.to_owned(),
        }
    }
}

/// Builds a fresh component document describing `module`.
pub fn component_document(
    module: &Module,
    modules: &[Module],
    vlnv: &VlnvOptions,
    base_dir: Option<&Path>,
) -> Result<Element> {
    let mut component = Element::new(tag("component"));
    component.attributes.push(("xmlns:xsi".to_owned(), NS_XSI.to_owned()));
    component.attributes.push(("xmlns:ipxact".to_owned(), NS_IPXACT.to_owned()));
    component.attributes.push(("xsi:schemaLocation".to_owned(), SCHEMA_LOCATION.to_owned()));
    for name in ["vendor", "library", "name", "version"] {
        component.children.push(Element::with_text(tag(name), vlnv.text_for(name, &module.name)));
    }
    component.children.push(model_element(module));
    component.children.push(file_sets_element(module, modules, base_dir)?);
    Ok(component)
}

/// Splices `module` into an existing component document.
pub fn update_component(
    component: &mut Element,
    module: &Module,
    modules: &[Module],
    vlnv: &VlnvOptions,
    base_dir: Option<&Path>,
) -> Result<()> {
    if component.local_name() != "component" {
        bail!("expecting an `ipxact:component` document root, found `{}`", component.name);
    }
    ensure_vlnv(component, vlnv, &module.name);

    // refuse insertions that would duplicate an existing name
    let model = component.child("model");
    if let Some(views) = model.and_then(|model| model.child("views")) {
        if views.children_named("view").any(|view| view.child_text("name") == Some(VIEW_NAME)) {
            error!("view `{VIEW_NAME}` already exists");
            return Ok(());
        }
    }
    if let Some(instantiations) = model.and_then(|model| model.child("instantiations")) {
        if instantiations
            .children_named("componentInstantiation")
            .any(|inst| inst.child_text("name") == Some(INSTANTIATION_NAME))
        {
            error!("component instantiation `{INSTANTIATION_NAME}` already exists");
            return Ok(());
        }
    }
    if let Some(file_sets) = component.child("fileSets") {
        if file_sets
            .children_named("fileSet")
            .any(|set| set.child_text("name") == Some(FILE_SET_NAME))
        {
            error!("file set `{FILE_SET_NAME}` already exists");
            return Ok(());
        }
    }

    if component.child("model").is_none() {
        warn!("no `ipxact:model` element found");
        insert_in_order(component, Element::new(tag("model")));
    }
    let model = component.child_mut("model").unwrap();
    if model.child("views").is_none() {
        warn!("no `ipxact:views` element found");
        model.children.insert(0, Element::new(tag("views")));
    }
    model.child_mut("views").unwrap().children.push(view_element());

    if model.child("instantiations").is_none() {
        warn!("no `ipxact:instantiations` element found");
        let index =
            model.children.iter().position(|child| child.local_name() == "views").map_or(0, |i| i + 1);
        model.children.insert(index, Element::new(tag("instantiations")));
    }
    model.child_mut("instantiations").unwrap().children.push(instantiation_element(module));

    if model.child("ports").is_none() {
        model.children.push(Element::new(tag("ports")));
    }
    let ports = model.child_mut("ports").unwrap();
    for port in &module.ports {
        if ports.children_named("port").any(|known| known.child_text("name") == Some(&port.name)) {
            error!("port `{}` already exists", port.name);
            continue;
        }
        ports.children.push(port_element(port));
    }

    if component.child("fileSets").is_none() {
        warn!("no `ipxact:fileSets` element found");
        insert_in_order(component, Element::new(tag("fileSets")));
    }
    component
        .child_mut("fileSets")
        .unwrap()
        .children
        .push(file_set_element(module, modules, base_dir)?);
    Ok(())
}

/// Verifies the VLNV header of an existing document, inserting missing
/// elements at their canonical positions.
fn ensure_vlnv(component: &mut Element, vlnv: &VlnvOptions, module_name: &str) {
    for (index, name) in ["vendor", "library", "name", "version"].iter().enumerate() {
        match component.child(name) {
            None => {
                let text = if *name == "name" {
                    module_name.to_owned()
                } else if let Some(value) = vlnv.user_value(name) {
                    value.to_owned()
                } else {
                    error!("missing `ipxact:{name}` element and no value given");
                    (*name).to_owned()
                };
                warn!("inserting missing `ipxact:{name}` element `{text}`");
                let index = index.min(component.children.len());
                component.children.insert(index, Element::with_text(tag(name), text));
            }
            Some(existing) => {
                if let Some(value) = vlnv.user_value(name) {
                    if existing.text.as_deref() != Some(value) {
                        error!(
                            "`ipxact:{name}` value `{value}` does not match `{}` in the document",
                            existing.text.as_deref().unwrap_or_default()
                        );
                    }
                }
            }
        }
    }
}

/// Inserts a direct child of `ipxact:component` at its schema position.
fn insert_in_order(component: &mut Element, element: Element) {
    let rank = COMPONENT_ELEMENT_ORDER
        .iter()
        .position(|&name| name == element.local_name())
        .unwrap_or(COMPONENT_ELEMENT_ORDER.len());
    let predecessors = &COMPONENT_ELEMENT_ORDER[..rank];
    let index = component
        .children
        .iter()
        .position(|child| !predecessors.contains(&child.local_name()));
    match index {
        Some(index) => component.children.insert(index, element),
        None => component.children.push(element),
    }
}

fn model_element(module: &Module) -> Element {
    let mut model = Element::new(tag("model"));
    let mut views = Element::new(tag("views"));
    views.children.push(view_element());
    model.children.push(views);
    let mut instantiations = Element::new(tag("instantiations"));
    instantiations.children.push(instantiation_element(module));
    model.children.push(instantiations);
    let mut ports = Element::new(tag("ports"));
    for port in &module.ports {
        ports.children.push(port_element(port));
    }
    model.children.push(ports);
    model
}

fn view_element() -> Element {
    let mut view = Element::new(tag("view"));
    view.children.push(Element::with_text(tag("name"), VIEW_NAME));
    view.children.push(Element::with_text(tag("componentInstantiationRef"), INSTANTIATION_NAME));
    view
}

fn instantiation_element(module: &Module) -> Element {
    let mut instantiation = Element::new(tag("componentInstantiation"));
    instantiation.children.push(Element::with_text(tag("name"), INSTANTIATION_NAME));
    let mut parameters = Element::new(tag("moduleParameters"));
    for parameter in &module.parameters {
        parameters.children.push(parameter_element(parameter));
    }
    instantiation.children.push(parameters);
    let mut file_set_ref = Element::new(tag("fileSetRef"));
    file_set_ref.children.push(Element::with_text(tag("localName"), FILE_SET_NAME));
    instantiation.children.push(file_set_ref);
    instantiation
}

fn port_element(port: &Port) -> Element {
    let mut element = Element::new(tag("port"));
    element.children.push(Element::with_text(tag("name"), port.name.as_str()));
    let mut wire = Element::new(tag("wire"));
    wire.children.push(Element::with_text(tag("direction"), port.direction.as_xact()));
    if let Some(dimensions) = &port.dimensions {
        let mut vectors = Element::new(tag("vectors"));
        for dimension in dimensions {
            let mut vector = Element::new(tag("vector"));
            vector.children.push(Element::with_text(tag("left"), dimension.left.as_str()));
            vector.children.push(Element::with_text(tag("right"), dimension.right.as_str()));
            vectors.children.push(vector);
        }
        wire.children.push(vectors);
    }
    if let Some(datatype) = &port.datatype {
        let mut type_defs = Element::new(tag("wireTypeDefs"));
        let mut type_def = Element::new(tag("wireTypeDef"));
        type_def.children.push(Element::with_text(tag("typeName"), datatype.as_str()));
        type_defs.children.push(type_def);
        wire.children.push(type_defs);
    }
    element.children.push(wire);
    element
}

fn parameter_element(parameter: &Parameter) -> Element {
    let mut element = Element::new(tag("moduleParameter"));
    if let Some(datatype) = &parameter.datatype {
        element.attributes.push(("dataType".to_owned(), datatype.clone()));
    }
    element.children.push(Element::with_text(tag("name"), parameter.name.as_str()));
    // with no default, the parameter name stands in as a symbolic value
    let value = parameter.value.as_deref().unwrap_or(&parameter.name);
    element.children.push(Element::with_text(tag("value"), value));
    element
}

fn file_sets_element(
    module: &Module,
    modules: &[Module],
    base_dir: Option<&Path>,
) -> Result<Element> {
    let mut file_sets = Element::new(tag("fileSets"));
    file_sets.children.push(file_set_element(module, modules, base_dir)?);
    Ok(file_sets)
}

fn file_set_element(
    module: &Module,
    modules: &[Module],
    base_dir: Option<&Path>,
) -> Result<Element> {
    let mut file_set = Element::new(tag("fileSet"));
    file_set.children.push(Element::with_text(tag("name"), FILE_SET_NAME));
    for path in files_in_hierarchy(modules, &module.name)? {
        let mut file = Element::new(tag("file"));
        file.children.push(Element::with_text(tag("name"), relativized(&path, base_dir)));
        file.children.push(Element::with_text(tag("fileType"), file_type(&path)));
        file_set.children.push(file);
    }
    Ok(file_set)
}

fn relativized(path: &Path, base_dir: Option<&Path>) -> String {
    match base_dir {
        Some(base) => path.strip_prefix(base).unwrap_or(path).display().to_string(),
        None => path.display().to_string(),
    }
}

fn file_type(path: &Path) -> &'static str {
    match path.extension().and_then(|extension| extension.to_str()) {
        Some("v" | "vh") => "verilogSource",
        _ => "systemVerilogSource",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::classify_modules;
    use crate::interface::{Direction, TypeDimension};
    use std::path::PathBuf;

    fn sample_modules() -> Vec<Module> {
        let mut modules = vec![
            Module {
                name: "top".to_owned(),
                path: PathBuf::from("rtl/top.sv"),
                ports: vec![
                    Port {
                        name: "clk".to_owned(),
                        direction: Direction::Input,
                        datatype: Some("logic".to_owned()),
                        dimensions: None,
                    },
                    Port {
                        name: "data".to_owned(),
                        direction: Direction::Output,
                        datatype: Some("logic".to_owned()),
                        dimensions: Some(vec![
                            TypeDimension::new("1", "3"),
                            TypeDimension::new("7", "0"),
                        ]),
                    },
                ],
                parameters: vec![
                    Parameter {
                        name: "WIDTH".to_owned(),
                        datatype: Some("int".to_owned()),
                        dimensions: None,
                        value: Some("8".to_owned()),
                    },
                    Parameter {
                        name: "DEPTH".to_owned(),
                        datatype: None,
                        dimensions: None,
                        value: None,
                    },
                ],
                instances: Some(vec!["leaf".to_owned()]),
                ..Module::default()
            },
            Module {
                name: "leaf".to_owned(),
                path: PathBuf::from("rtl/leaf.v"),
                ..Module::default()
            },
        ];
        classify_modules(&mut modules);
        modules
    }

    #[test]
    fn fresh_document_carries_vlnv_model_and_file_set() {
        let modules = sample_modules();
        let vlnv = VlnvOptions { vendor: Some("acme".to_owned()), ..VlnvOptions::default() };
        let component = component_document(&modules[0], &modules, &vlnv, None).unwrap();

        assert_eq!(component.name, "ipxact:component");
        assert_eq!(component.child_text("vendor"), Some("acme"));
        assert_eq!(component.child_text("library"), Some("library"));
        assert_eq!(component.child_text("name"), Some("top"));
        assert_eq!(component.child_text("version"), Some("0.0.0"));

        let model = component.child("model").unwrap();
        let view = model.child("views").unwrap().child("view").unwrap();
        assert_eq!(view.child_text("name"), Some("rtl"));
        assert_eq!(view.child_text("componentInstantiationRef"), Some("rtl_implementation"));

        let instantiation =
            model.child("instantiations").unwrap().child("componentInstantiation").unwrap();
        assert_eq!(instantiation.child_text("name"), Some("rtl_implementation"));
        assert_eq!(
            instantiation.child("fileSetRef").unwrap().child_text("localName"),
            Some("rtl_files")
        );
        let parameters: Vec<_> = instantiation
            .child("moduleParameters")
            .unwrap()
            .children_named("moduleParameter")
            .collect();
        assert_eq!(parameters[0].child_text("value"), Some("8"));
        // no default value, so the name stands in symbolically
        assert_eq!(parameters[1].child_text("value"), Some("DEPTH"));

        let ports: Vec<_> = model.child("ports").unwrap().children_named("port").collect();
        assert_eq!(ports.len(), 2);
        let wire = ports[1].child("wire").unwrap();
        assert_eq!(wire.child_text("direction"), Some("out"));
        let vectors: Vec<_> = wire.child("vectors").unwrap().children_named("vector").collect();
        assert_eq!(vectors[0].child_text("left"), Some("1"));
        assert_eq!(vectors[0].child_text("right"), Some("3"));
        assert_eq!(vectors[1].child_text("left"), Some("7"));
        assert_eq!(
            wire.child("wireTypeDefs").unwrap().child("wireTypeDef").unwrap().child_text("typeName"),
            Some("logic")
        );

        let files: Vec<_> =
            component.child("fileSets").unwrap().child("fileSet").unwrap().children_named("file").collect();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].child_text("name"), Some("rtl/leaf.v"));
        assert_eq!(files[0].child_text("fileType"), Some("verilogSource"));
        assert_eq!(files[1].child_text("name"), Some("rtl/top.sv"));
        assert_eq!(files[1].child_text("fileType"), Some("systemVerilogSource"));
    }

    #[test]
    fn file_paths_are_relativized_against_the_base_directory() {
        let modules = sample_modules();
        let component = component_document(
            &modules[0],
            &modules,
            &VlnvOptions::default(),
            Some(Path::new("rtl")),
        )
        .unwrap();
        let file_set = component.child("fileSets").unwrap().child("fileSet").unwrap();
        let names: Vec<_> =
            file_set.children_named("file").filter_map(|file| file.child_text("name")).collect();
        assert_eq!(names, ["leaf.v", "top.sv"]);
    }

    #[test]
    fn update_splices_into_an_existing_component() {
        let modules = sample_modules();
        let mut component = Element::parse(
            "<ipxact:component>\
               <ipxact:vendor>acme</ipxact:vendor>\
               <ipxact:library>ip</ipxact:library>\
               <ipxact:name>top</ipxact:name>\
               <ipxact:version>1.2</ipxact:version>\
               <ipxact:memoryMaps/>\
               <ipxact:description>widget</ipxact:description>\
             </ipxact:component>",
        )
        .unwrap();
        update_component(&mut component, &modules[0], &modules, &VlnvOptions::default(), None)
            .unwrap();

        // model lands after memoryMaps, fileSets after model, both before
        // description
        let order: Vec<_> = component.children.iter().map(Element::local_name).collect();
        assert_eq!(
            order,
            ["vendor", "library", "name", "version", "memoryMaps", "model", "fileSets", "description"]
        );
        let model = component.child("model").unwrap();
        assert_eq!(model.children[0].local_name(), "views");
        assert_eq!(model.children[1].local_name(), "instantiations");
        assert_eq!(model.child("ports").unwrap().children.len(), 2);
    }

    #[test]
    fn update_refuses_a_duplicate_view() {
        let modules = sample_modules();
        let original = Element::parse(
            "<ipxact:component>\
               <ipxact:vendor>acme</ipxact:vendor>\
               <ipxact:library>ip</ipxact:library>\
               <ipxact:name>top</ipxact:name>\
               <ipxact:version>1.2</ipxact:version>\
               <ipxact:model>\
                 <ipxact:views>\
                   <ipxact:view><ipxact:name>rtl</ipxact:name></ipxact:view>\
                 </ipxact:views>\
               </ipxact:model>\
             </ipxact:component>",
        )
        .unwrap();
        let mut component = original.clone();
        update_component(&mut component, &modules[0], &modules, &VlnvOptions::default(), None)
            .unwrap();
        assert_eq!(component, original);
    }

    #[test]
    fn update_inserts_missing_vlnv_elements() {
        let modules = sample_modules();
        let mut component = Element::parse(
            "<ipxact:component>\
               <ipxact:library>ip</ipxact:library>\
             </ipxact:component>",
        )
        .unwrap();
        let vlnv = VlnvOptions { vendor: Some("acme".to_owned()), ..VlnvOptions::default() };
        update_component(&mut component, &modules[0], &modules, &vlnv, None).unwrap();
        assert_eq!(component.child_text("vendor"), Some("acme"));
        assert_eq!(component.child_text("name"), Some("top"));
        assert_eq!(component.child_text("version"), Some("version"));
        let order: Vec<_> = component.children.iter().map(Element::local_name).take(4).collect();
        assert_eq!(order, ["vendor", "library", "name", "version"]);
    }

    #[test]
    fn update_rejects_a_non_component_root() {
        let modules = sample_modules();
        let mut root = Element::new("ipxact:catalog");
        let result =
            update_component(&mut root, &modules[0], &modules, &VlnvOptions::default(), None);
        assert!(result.is_err());
    }
}
