/*!

  The PEX instruction set.

  Each instruction carries a fixed argument list (up to five values) and,
  for the three call forms, a variadic tail of parameters. Opcodes that
  write a local carry the written slot's index in a fixed table consulted
  during instruction fixup.

*/

use smallvec::SmallVec;

use super::value::PexValue;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PexOpCode {
  Nop,
  IAdd,
  FAdd,
  ISub,
  FSub,
  IMul,
  FMul,
  IDiv,
  FDiv,
  IMod,
  Not,
  INeg,
  FNeg,
  Assign,
  Cast,
  CmpEq,
  CmpLt,
  CmpLte,
  CmpGt,
  CmpGte,
  Jmp,
  JmpT,
  JmpF,
  CallMethod,
  CallParent,
  CallStatic,
  Return,
  StrCat,
  PropGet,
  PropSet,
  ArrayCreate,
  ArrayLength,
  ArrayGetElement,
  ArraySetElement,
  ArrayFindElement,
  ArrayRFindElement,
  Is,
  StructCreate,
  StructGet,
  StructSet,
  ArrayFindStruct,
  ArrayRFindStruct,
  ArrayAdd,
  ArrayInsert,
  ArrayRemoveLast,
  ArrayRemove,
  ArrayClear,
}

impl PexOpCode {
  /// The fixed-argument slot this opcode writes, if any. An unbound
  /// temporary in this slot gets its backing local allocated at fixup time.
  pub fn dest_arg_index(self) -> Option<usize> {
    use PexOpCode::*;
    match self {
      | IAdd | FAdd | ISub | FSub | IMul | FMul | IDiv | FDiv | IMod
      | Not | INeg | FNeg | Assign | Cast
      | CmpEq | CmpLt | CmpLte | CmpGt | CmpGte
      | StrCat
      | ArrayCreate | ArrayLength | ArrayGetElement
      | ArrayFindElement | ArrayRFindElement
      | Is | StructCreate | StructGet => Some(0),

      | CallParent | ArrayFindStruct | ArrayRFindStruct => Some(1),

      | PropGet | CallMethod | CallStatic => Some(2),

      | Nop | Jmp | JmpT | JmpF | Return
      | PropSet | StructSet | ArraySetElement
      | ArrayAdd | ArrayInsert | ArrayRemoveLast | ArrayRemove | ArrayClear => None,
    }
  }
}

pub type PexArgs = SmallVec<[PexValue; 4]>;

#[derive(Clone, Debug)]
pub struct PexInstruction {
  pub op_code: PexOpCode,
  pub args: PexArgs,
  pub variadic_args: Vec<PexValue>,
}

impl PexInstruction {
  pub fn new(op_code: PexOpCode, args: PexArgs) -> Self {
    PexInstruction { op_code, args, variadic_args: Vec::new() }
  }

  pub fn with_variadic(op_code: PexOpCode, args: PexArgs, variadic_args: Vec<PexValue>) -> Self {
    PexInstruction { op_code, args, variadic_args }
  }
}
