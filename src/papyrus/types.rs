//! A minimal value-type model. The full AST lives outside the core; the
//! builder only needs enough typing to name locals and temporaries.

use std::fmt::{Display, Formatter};

use crate::pex::file::PexFile;
use crate::pex::value::PexString;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PapyrusType {
  None,
  Bool,
  Int,
  Float,
  String,
  Var,
  Array(Box<PapyrusType>),
  Object(String),
}

impl PapyrusType {
  pub fn is_array(&self) -> bool {
    matches!(self, PapyrusType::Array(_))
  }

  pub fn element_type(&self) -> Option<&PapyrusType> {
    match self {
      PapyrusType::Array(element) => Some(element),
      _ => None,
    }
  }

  /// The type name as it appears in PEX local/temp declarations.
  pub fn pex_name(&self) -> String {
    match self {
      PapyrusType::None => "None".to_owned(),
      PapyrusType::Bool => "Bool".to_owned(),
      PapyrusType::Int => "Int".to_owned(),
      PapyrusType::Float => "Float".to_owned(),
      PapyrusType::String => "String".to_owned(),
      PapyrusType::Var => "Var".to_owned(),
      PapyrusType::Array(element) => format!("{}[]", element.pex_name()),
      PapyrusType::Object(name) => name.clone(),
    }
  }

  pub fn to_pex(&self, file: &mut PexFile) -> PexString {
    file.get_string(&self.pex_name())
  }
}

impl Display for PapyrusType {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.pex_name())
  }
}
