//! Extracted module interface records.

use std::fmt;
use std::path::PathBuf;

/// One packed or unpacked dimension of a port or parameter type.
///
/// The endpoints are expression text carried verbatim from the source; they
/// are never evaluated, so parametrized widths like `WIDTH-1` survive as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDimension {
    /// Left (most significant) bound expression.
    pub left: String,
    /// Right (least significant) bound expression.
    pub right: String,
}

impl TypeDimension {
    /// Creates a dimension from its two bound expressions.
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self { left: left.into(), right: right.into() }
    }
}

impl fmt::Display for TypeDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.left, self.right)
    }
}

/// Port direction. A port with no explicit direction is an input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    /// `input` port.
    #[default]
    Input,
    /// `output` port.
    Output,
    /// `inout` port.
    Inout,
}

impl Direction {
    /// Classifies a direction token. Surrounding whitespace is ignored and
    /// any unrecognized string maps to [`Direction::Input`].
    pub fn parse(token: &str) -> Self {
        match token.trim() {
            "input" => Self::Input,
            "output" => Self::Output,
            "inout" => Self::Inout,
            other => {
                tracing::warn!("unknown port direction `{other}`, assuming input");
                Self::Input
            }
        }
    }

    /// The IP-XACT wire direction string.
    pub fn as_xact(self) -> &'static str {
        match self {
            Self::Input => "in",
            Self::Output => "out",
            Self::Inout => "inout",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
            Self::Inout => write!(f, "inout"),
        }
    }
}

/// A single port of a Verilog module.
///
/// One record is produced per port-list occurrence, in port-list order.
/// Dimensions are ordered unpacked-first, then packed, each group in declared
/// left-to-right order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Port {
    /// Port identifier.
    pub name: String,
    /// Port direction.
    pub direction: Direction,
    /// Declared data type, e.g. `logic`, if any.
    pub datatype: Option<String>,
    /// Merged unpacked and packed dimensions, if any.
    pub dimensions: Option<Vec<TypeDimension>>,
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.direction)?;
        if let Some(datatype) = &self.datatype {
            write!(f, " {datatype}")?;
        }
        if let Some(dimensions) = &self.dimensions {
            write!(f, " ")?;
            for dimension in dimensions {
                write!(f, "{dimension}")?;
            }
        }
        write!(f, " {}", self.name)
    }
}

/// A single parameter of a Verilog module.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter identifier.
    pub name: String,
    /// Declared data type, if any.
    pub datatype: Option<String>,
    /// Declared dimensions, if any.
    pub dimensions: Option<Vec<TypeDimension>>,
    /// Default value expression text, if any.
    pub value: Option<String>,
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(datatype) = &self.datatype {
            write!(f, "{datatype} ")?;
        }
        if let Some(dimensions) = &self.dimensions {
            for dimension in dimensions {
                write!(f, "{dimension}")?;
            }
            write!(f, " ")?;
        }
        write!(f, "{}", self.name)?;
        if let Some(value) = &self.value {
            write!(f, " = {value}")?;
        }
        Ok(())
    }
}

/// The interface of one Verilog module extracted from a source file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Module {
    /// Module identifier.
    pub name: String,
    /// Source file the module was extracted from.
    pub path: PathBuf,
    /// Ports in port-list order.
    pub ports: Vec<Port>,
    /// Parameters in formal-parameter-list order.
    pub parameters: Vec<Parameter>,
    /// Names of instantiated modules, `None` when the module instantiates
    /// nothing.
    pub instances: Option<Vec<String>>,
    /// Whether the module instantiates nothing.
    pub is_leaf: bool,
    /// Whether no other module in the batch instantiates this one.
    pub is_root: bool,
}
