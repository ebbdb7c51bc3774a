/*!

  Values flowing through PEX instructions.

  `PexLabel` and `PexTempVar` are small-integer handles into tables owned by
  the function builder: placing a label or binding a temporary writes into
  the table slot, and every live handle observes the update through the
  table rather than through shared mutable pointers.

*/

use std::fmt::{Display, Formatter};

/// An index into a `PexFile`'s string table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PexString(pub u16);

impl Display for PexString {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "s#{}", self.0)
  }
}

/// A symbolic instruction-stream position, lowered to a signed relative
/// offset during function finalization.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PexLabel(pub(crate) u32);

/// An unbound temporary; the builder rewrites it to an `Identifier` when the
/// instruction that first writes it is finalized.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PexTempVar(pub(crate) u32);

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PexValue {
  /// The "result" of a call that returns nothing. Kept representable so
  /// that using one as an operand can be diagnosed.
  Invalid,
  None,
  Identifier(PexString),
  String(PexString),
  Integer(i32),
  Float(f32),
  Bool(bool),
  Label(PexLabel),
  TemporaryVar(PexTempVar),
}

impl PexValue {
  pub fn is_invalid(&self) -> bool {
    matches!(self, PexValue::Invalid)
  }

  pub fn as_identifier(&self) -> Option<PexString> {
    match self {
      PexValue::Identifier(s) => Some(*s),
      _ => None,
    }
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PexLocalVariable {
  pub name: PexString,
  pub tp: PexString,
}
