/*!

  Streaming construction of one PEX function body.

  A builder is created per function, fed typed opcode values through
  `emit`, and torn down by `populate_function`, which transfers the
  finished instruction list and locals into the `PexFunction` and produces
  the instruction→line debug map.

  Temporaries are pooled: a non-long-lived temp is returned to its type's
  free list the moment an emitted instruction consumes it, so a function
  that burns through many short-lived values of one type ends up with a
  single `::tempN` local. Labels and temporaries are handles into builder
  tables; every structural misuse (unplaced label, unbound temp, invalid
  operand) is a compiler bug and dies on the spot.

*/

use std::cell::RefCell;
use std::collections::HashMap;

use smallvec::smallvec;

use crate::common::limits::{MAX_DEBUG_LINE, MAX_TEMP_VARS};
use crate::common::reporting::{ReportingContext, SourceLocation};
use crate::papyrus::types::PapyrusType;

use super::file::{PexDebugFunctionInfo, PexFile, PexFunction};
use super::instruction::{PexInstruction, PexOpCode};
use super::value::{PexLabel, PexLocalVariable, PexString, PexTempVar, PexValue};

/// Typed opcode input to `PexFunctionBuilder::emit`, one variant per opcode.
#[derive(Clone, Debug)]
pub enum Op {
  Nop,
  IAdd { dest: PexValue, arg1: PexValue, arg2: PexValue },
  FAdd { dest: PexValue, arg1: PexValue, arg2: PexValue },
  ISub { dest: PexValue, arg1: PexValue, arg2: PexValue },
  FSub { dest: PexValue, arg1: PexValue, arg2: PexValue },
  IMul { dest: PexValue, arg1: PexValue, arg2: PexValue },
  FMul { dest: PexValue, arg1: PexValue, arg2: PexValue },
  IDiv { dest: PexValue, arg1: PexValue, arg2: PexValue },
  FDiv { dest: PexValue, arg1: PexValue, arg2: PexValue },
  IMod { dest: PexValue, arg1: PexValue, arg2: PexValue },
  Not { dest: PexValue, src: PexValue },
  INeg { dest: PexValue, src: PexValue },
  FNeg { dest: PexValue, src: PexValue },
  Assign { dest: PexValue, src: PexValue },
  Cast { dest: PexValue, src: PexValue },
  CmpEq { dest: PexValue, arg1: PexValue, arg2: PexValue },
  CmpLt { dest: PexValue, arg1: PexValue, arg2: PexValue },
  CmpLte { dest: PexValue, arg1: PexValue, arg2: PexValue },
  CmpGt { dest: PexValue, arg1: PexValue, arg2: PexValue },
  CmpGte { dest: PexValue, arg1: PexValue, arg2: PexValue },
  Jmp { target: PexLabel },
  JmpT { cond: PexValue, target: PexLabel },
  JmpF { cond: PexValue, target: PexLabel },
  CallMethod { name: PexString, base: PexValue, dest: PexValue, args: Vec<PexValue> },
  CallParent { name: PexString, dest: PexValue, args: Vec<PexValue> },
  CallStatic { class: PexString, name: PexString, dest: PexValue, args: Vec<PexValue> },
  Ret { val: PexValue },
  StrCat { dest: PexValue, arg1: PexValue, arg2: PexValue },
  PropGet { name: PexString, base: PexValue, dest: PexValue },
  PropSet { name: PexString, base: PexValue, val: PexValue },
  ArrayCreate { dest: PexValue, length: PexValue },
  ArrayLength { dest: PexValue, arr: PexValue },
  ArrayGetElement { dest: PexValue, arr: PexValue, index: PexValue },
  ArraySetElement { arr: PexValue, index: PexValue, val: PexValue },
  ArrayFindElement { dest: PexValue, arr: PexValue, element: PexValue, start_index: PexValue },
  ArrayRFindElement { dest: PexValue, arr: PexValue, element: PexValue, start_index: PexValue },
  Is { dest: PexValue, src: PexValue, tp: PexValue },
  StructCreate { dest: PexValue },
  StructGet { dest: PexValue, base: PexValue, member: PexString },
  StructSet { base: PexValue, member: PexString, val: PexValue },
  ArrayFindStruct { arr: PexValue, dest: PexValue, member: PexString, value: PexValue, start_index: PexValue },
  ArrayRFindStruct { arr: PexValue, dest: PexValue, member: PexString, value: PexValue, start_index: PexValue },
  ArrayAdd { arr: PexValue, element: PexValue, count: PexValue },
  ArrayInsert { arr: PexValue, element: PexValue, index: PexValue },
  ArrayRemoveLast { arr: PexValue },
  ArrayRemove { arr: PexValue, index: PexValue, count: PexValue },
  ArrayClear { arr: PexValue },
}

struct TempVarRef {
  tp: PexString,           //< Type name for the local allocated on first write.
  var: Option<PexString>,  //< Bound local name, set at fixup time.
}

#[derive(Default)]
struct TempVarDescriptor {
  free_vars: Vec<PexString>, //< Reusable locals of this type (keyed by type name).
  local_var: Option<PexLocalVariable>, //< The live local (keyed by var name).
  is_long_lived_temp_var: bool,
}

#[derive(Copy, Clone)]
struct BreakContinueScope {
  break_target: PexLabel,
  continue_target: PexLabel,
}

type TempVarMap = HashMap<PexString, TempVarDescriptor>;

thread_local! {
  /// Workers build many functions back to back; the descriptor map is
  /// recycled within a thread instead of reallocated per function.
  static TEMP_VAR_MAP_CACHE: RefCell<Vec<TempVarMap>> = RefCell::new(Vec::new());
}

pub struct PexFunctionBuilder<'r, 'f> {
  reporting: &'r mut ReportingContext,
  file: &'f mut PexFile,
  current_location: SourceLocation,
  instructions: Vec<PexInstruction>,
  instruction_locations: Vec<SourceLocation>, //< Parallel to `instructions`.
  locals: Vec<PexLocalVariable>,
  labels: Vec<Option<usize>>, //< Placed instruction index per label handle.
  temp_var_refs: Vec<TempVarRef>,
  temp_var_map: TempVarMap,
  current_temp_i: u32,
  break_continue_scopes: Vec<BreakContinueScope>,
}

impl<'r, 'f> PexFunctionBuilder<'r, 'f> {
  pub fn new(reporting: &'r mut ReportingContext, location: SourceLocation, file: &'f mut PexFile) -> Self {
    PexFunctionBuilder {
      reporting,
      file,
      current_location: location,
      instructions: Vec::new(),
      instruction_locations: Vec::new(),
      locals: Vec::new(),
      labels: Vec::new(),
      temp_var_refs: Vec::new(),
      temp_var_map: TEMP_VAR_MAP_CACHE
        .with(|cache| cache.borrow_mut().pop())
        .unwrap_or_default(),
      current_temp_i: 0,
      break_continue_scopes: Vec::new(),
    }
  }

  /// The source location attributed to subsequently emitted instructions.
  pub fn set_location(&mut self, loc: SourceLocation) -> &mut Self {
    self.current_location = loc;
    self
  }

  /// Interns into the owning file's bytecode string table.
  pub fn string(&mut self, s: &str) -> PexString {
    self.file.get_string(s)
  }

  pub fn instruction_count(&self) -> usize {
    self.instructions.len()
  }

  // region Labels

  pub fn alloc_label(&mut self) -> PexLabel {
    let label = PexLabel(self.labels.len() as u32);
    self.labels.push(None);
    label
  }

  /// Positions `label` at the next instruction to be emitted.
  pub fn place_label(&mut self, label: PexLabel) {
    let target = self.instructions.len();
    let slot = &mut self.labels[label.0 as usize];
    if slot.is_some() {
      ReportingContext::logical_fatal("A label can only be placed once!");
    }
    *slot = Some(target);
  }

  // endregion

  // region Break/continue scopes

  pub fn push_break_continue_scope(&mut self, break_target: PexLabel, continue_target: PexLabel) {
    self.break_continue_scopes.push(BreakContinueScope { break_target, continue_target });
  }

  pub fn pop_break_continue_scope(&mut self) {
    if self.break_continue_scopes.pop().is_none() {
      ReportingContext::logical_fatal("Popped an empty break/continue scope stack!");
    }
  }

  pub fn break_target(&self) -> PexLabel {
    match self.break_continue_scopes.last() {
      Some(scope) => scope.break_target,
      None => ReportingContext::logical_fatal("Attempted to break outside of a loop or switch!"),
    }
  }

  pub fn continue_target(&self) -> PexLabel {
    match self.break_continue_scopes.last() {
      Some(scope) => scope.continue_target,
      None => ReportingContext::logical_fatal("Attempted to continue outside of a loop!"),
    }
  }

  // endregion

  // region Temporaries and locals

  /// A pooled temporary of `tp`. The backing local is chosen (or created)
  /// when the instruction that first writes it is finalized.
  pub fn alloc_temp(&mut self, tp: &PapyrusType) -> PexValue {
    let tp = tp.to_pex(self.file);
    let handle = PexTempVar(self.temp_var_refs.len() as u32);
    self.temp_var_refs.push(TempVarRef { tp, var: None });
    PexValue::TemporaryVar(handle)
  }

  /// A temp that survives across instruction emissions. Bound to a local
  /// immediately; must be released with `free_long_lived_temp`.
  pub fn alloc_long_lived_temp(&mut self, tp: &PapyrusType) -> PexValue {
    let tp = tp.to_pex(self.file);
    let name = self.internal_allocate_temp_var(tp);
    self.temp_var_map.entry(name).or_default().is_long_lived_temp_var = true;
    PexValue::Identifier(name)
  }

  pub fn free_long_lived_temp(&mut self, v: PexValue) {
    let name = match v {
      PexValue::Identifier(name) => name,
      _ => ReportingContext::logical_fatal("Attempted to free a long-lived temp that is not an identifier!"),
    };
    if let Some(desc) = self.temp_var_map.get_mut(&name) {
      desc.is_long_lived_temp_var = false;
    }
    self.free_value_if_temp(PexValue::Identifier(name));
  }

  /// A stable named local. Not pooled.
  pub fn alloc_local(&mut self, name: &str, tp: &PapyrusType) -> PexValue {
    let tp = tp.to_pex(self.file);
    let name = self.file.get_string(name);
    self.locals.push(PexLocalVariable { name, tp });
    PexValue::Identifier(name)
  }

  fn internal_allocate_temp_var(&mut self, tp: PexString) -> PexString {
    if let Some(desc) = self.temp_var_map.get_mut(&tp) {
      if let Some(name) = desc.free_vars.pop() {
        return name;
      }
    }

    if self.current_temp_i > MAX_TEMP_VARS {
      ReportingContext::logical_fatal("Exceeded the maximum number of temp vars possible in a function!");
    }
    let name_str = format!("::temp{}", self.current_temp_i);
    self.current_temp_i += 1;

    let name = self.file.get_string(&name_str);
    let local = PexLocalVariable { name, tp };
    self.temp_var_map.entry(name).or_default().local_var = Some(local);
    self.locals.push(local);
    name
  }

  /// Returns a consumed, non-long-lived temp to its type's free list.
  fn free_value_if_temp(&mut self, v: PexValue) {
    let var_name = match v {
      PexValue::Identifier(name) => name,
      PexValue::TemporaryVar(handle) => match self.temp_var_refs[handle.0 as usize].var {
        Some(name) => name,
        None => return,
      },
      _ => return,
    };

    let freed = match self.temp_var_map.get(&var_name) {
      Some(desc) if !desc.is_long_lived_temp_var => desc.local_var,
      _ => None,
    };
    if let Some(local) = freed {
      self.temp_var_map.entry(local.tp).or_default().free_vars.push(local.name);
    }
  }

  // endregion

  // region Emission

  pub fn emit(&mut self, op: Op) -> &mut Self {
    use PexOpCode::*;
    let instr = match op {
      Op::Nop => PexInstruction::new(Nop, smallvec![]),
      Op::IAdd { dest, arg1, arg2 } => PexInstruction::new(IAdd, smallvec![dest, arg1, arg2]),
      Op::FAdd { dest, arg1, arg2 } => PexInstruction::new(FAdd, smallvec![dest, arg1, arg2]),
      Op::ISub { dest, arg1, arg2 } => PexInstruction::new(ISub, smallvec![dest, arg1, arg2]),
      Op::FSub { dest, arg1, arg2 } => PexInstruction::new(FSub, smallvec![dest, arg1, arg2]),
      Op::IMul { dest, arg1, arg2 } => PexInstruction::new(IMul, smallvec![dest, arg1, arg2]),
      Op::FMul { dest, arg1, arg2 } => PexInstruction::new(FMul, smallvec![dest, arg1, arg2]),
      Op::IDiv { dest, arg1, arg2 } => PexInstruction::new(IDiv, smallvec![dest, arg1, arg2]),
      Op::FDiv { dest, arg1, arg2 } => PexInstruction::new(FDiv, smallvec![dest, arg1, arg2]),
      Op::IMod { dest, arg1, arg2 } => PexInstruction::new(IMod, smallvec![dest, arg1, arg2]),
      Op::Not { dest, src } => PexInstruction::new(Not, smallvec![dest, src]),
      Op::INeg { dest, src } => PexInstruction::new(INeg, smallvec![dest, src]),
      Op::FNeg { dest, src } => PexInstruction::new(FNeg, smallvec![dest, src]),
      Op::Assign { dest, src } => PexInstruction::new(Assign, smallvec![dest, src]),
      Op::Cast { dest, src } => PexInstruction::new(Cast, smallvec![dest, src]),
      Op::CmpEq { dest, arg1, arg2 } => PexInstruction::new(CmpEq, smallvec![dest, arg1, arg2]),
      Op::CmpLt { dest, arg1, arg2 } => PexInstruction::new(CmpLt, smallvec![dest, arg1, arg2]),
      Op::CmpLte { dest, arg1, arg2 } => PexInstruction::new(CmpLte, smallvec![dest, arg1, arg2]),
      Op::CmpGt { dest, arg1, arg2 } => PexInstruction::new(CmpGt, smallvec![dest, arg1, arg2]),
      Op::CmpGte { dest, arg1, arg2 } => PexInstruction::new(CmpGte, smallvec![dest, arg1, arg2]),
      Op::Jmp { target } => PexInstruction::new(Jmp, smallvec![PexValue::Label(target)]),
      Op::JmpT { cond, target } => PexInstruction::new(JmpT, smallvec![cond, PexValue::Label(target)]),
      Op::JmpF { cond, target } => PexInstruction::new(JmpF, smallvec![cond, PexValue::Label(target)]),
      Op::CallMethod { name, base, dest, args } => {
        PexInstruction::with_variadic(CallMethod, smallvec![PexValue::String(name), base, dest], args)
      }
      Op::CallParent { name, dest, args } => {
        PexInstruction::with_variadic(CallParent, smallvec![PexValue::String(name), dest], args)
      }
      Op::CallStatic { class, name, dest, args } => {
        PexInstruction::with_variadic(
          CallStatic,
          smallvec![PexValue::String(class), PexValue::String(name), dest],
          args,
        )
      }
      Op::Ret { val } => PexInstruction::new(Return, smallvec![val]),
      Op::StrCat { dest, arg1, arg2 } => PexInstruction::new(StrCat, smallvec![dest, arg1, arg2]),
      Op::PropGet { name, base, dest } => {
        PexInstruction::new(PropGet, smallvec![PexValue::String(name), base, dest])
      }
      Op::PropSet { name, base, val } => {
        PexInstruction::new(PropSet, smallvec![PexValue::String(name), base, val])
      }
      Op::ArrayCreate { dest, length } => PexInstruction::new(ArrayCreate, smallvec![dest, length]),
      Op::ArrayLength { dest, arr } => PexInstruction::new(ArrayLength, smallvec![dest, arr]),
      Op::ArrayGetElement { dest, arr, index } => {
        PexInstruction::new(ArrayGetElement, smallvec![dest, arr, index])
      }
      Op::ArraySetElement { arr, index, val } => {
        PexInstruction::new(ArraySetElement, smallvec![arr, index, val])
      }
      Op::ArrayFindElement { dest, arr, element, start_index } => {
        PexInstruction::new(ArrayFindElement, smallvec![dest, arr, element, start_index])
      }
      Op::ArrayRFindElement { dest, arr, element, start_index } => {
        PexInstruction::new(ArrayRFindElement, smallvec![dest, arr, element, start_index])
      }
      Op::Is { dest, src, tp } => PexInstruction::new(Is, smallvec![dest, src, tp]),
      Op::StructCreate { dest } => PexInstruction::new(StructCreate, smallvec![dest]),
      Op::StructGet { dest, base, member } => {
        PexInstruction::new(StructGet, smallvec![dest, base, PexValue::String(member)])
      }
      Op::StructSet { base, member, val } => {
        PexInstruction::new(StructSet, smallvec![base, PexValue::String(member), val])
      }
      Op::ArrayFindStruct { arr, dest, member, value, start_index } => {
        PexInstruction::new(ArrayFindStruct, smallvec![arr, dest, PexValue::String(member), value, start_index])
      }
      Op::ArrayRFindStruct { arr, dest, member, value, start_index } => {
        PexInstruction::new(ArrayRFindStruct, smallvec![arr, dest, PexValue::String(member), value, start_index])
      }
      Op::ArrayAdd { arr, element, count } => {
        PexInstruction::new(ArrayAdd, smallvec![arr, element, count])
      }
      Op::ArrayInsert { arr, element, index } => {
        PexInstruction::new(ArrayInsert, smallvec![arr, element, index])
      }
      Op::ArrayRemoveLast { arr } => PexInstruction::new(ArrayRemoveLast, smallvec![arr]),
      Op::ArrayRemove { arr, index, count } => {
        PexInstruction::new(ArrayRemove, smallvec![arr, index, count])
      }
      Op::ArrayClear { arr } => PexInstruction::new(ArrayClear, smallvec![arr]),
    };
    self.fixup(instr);
    self
  }

  fn check_usable(&mut self, v: PexValue) {
    if v.is_invalid() {
      self.reporting.fatal(
        self.current_location,
        "Attempted to use an invalid value as a value! (perhaps you tried to use the return \
         value of a function that doesn't return?)",
      );
    }
  }

  /// Binds temporaries, releases consumed ones, and appends the instruction.
  fn fixup(&mut self, mut instr: PexInstruction) {
    for i in 0..instr.args.len() {
      let v = instr.args[i];
      self.check_usable(v);
      if let PexValue::TemporaryVar(handle) = v {
        if let Some(name) = self.temp_var_refs[handle.0 as usize].var {
          instr.args[i] = PexValue::Identifier(name);
        }
      }
      self.free_value_if_temp(instr.args[i]);
    }
    for i in 0..instr.variadic_args.len() {
      let v = instr.variadic_args[i];
      self.check_usable(v);
      if let PexValue::TemporaryVar(handle) = v {
        if let Some(name) = self.temp_var_refs[handle.0 as usize].var {
          instr.variadic_args[i] = PexValue::Identifier(name);
        }
      }
      self.free_value_if_temp(instr.variadic_args[i]);
    }

    // A still-unbound temporary in the destination slot gets its backing
    // local here; that makes a local freed by this same instruction
    // immediately reusable as its destination.
    if let Some(dest_index) = instr.op_code.dest_arg_index() {
      if let PexValue::TemporaryVar(handle) = instr.args[dest_index] {
        let tp = self.temp_var_refs[handle.0 as usize].tp;
        let name = self.internal_allocate_temp_var(tp);
        self.temp_var_refs[handle.0 as usize].var = Some(name);
        instr.args[dest_index] = PexValue::Identifier(name);
      }
    }

    for v in instr.args.iter().chain(instr.variadic_args.iter()) {
      if let PexValue::TemporaryVar(_) = v {
        self.reporting.fatal(
          self.current_location,
          "Attempted to use a temporary var before it's been assigned!",
        );
      }
    }

    self.instruction_locations.push(self.current_location);
    self.instructions.push(instr);
  }

  // endregion

  /// Finalizes the body: lowers labels to relative offsets, transfers
  /// instructions and locals into `func`, and builds the debug line map.
  pub fn populate_function(mut self, func: &mut PexFunction, debug_info: &mut PexDebugFunctionInfo) {
    for (index, instr) in self.instructions.iter_mut().enumerate() {
      for v in instr.args.iter_mut().chain(instr.variadic_args.iter_mut()) {
        if let PexValue::Label(label) = *v {
          match self.labels[label.0 as usize] {
            Some(target) => *v = PexValue::Integer(target as i32 - index as i32),
            None => ReportingContext::logical_fatal("Unresolved label!"),
          }
        }
      }
    }

    for slot in &self.labels {
      if slot.is_none() {
        ReportingContext::logical_fatal("Unused unresolved label!");
      }
    }
    for temp in &self.temp_var_refs {
      if temp.var.is_none() {
        ReportingContext::logical_fatal("Unresolved tmp var!");
      }
    }

    func.instructions = std::mem::take(&mut self.instructions);
    func.locals = std::mem::take(&mut self.locals);

    debug_info.instruction_line_map.reserve(func.instructions.len());
    let mut line = 0usize;
    for &loc in &self.instruction_locations {
      line = self.reporting.get_location_line(loc, line);
      if line > MAX_DEBUG_LINE {
        self.reporting.fatal(
          loc,
          "The file has too many lines for the debug info to be able to map correctly!",
        );
      }
      // The engine requires a non-decreasing line map.
      if let Some(&prev) = debug_info.instruction_line_map.last() {
        if prev as usize > line {
          line = prev as usize;
        }
      }
      debug_info.instruction_line_map.push(line as u16);
    }

    tracing::debug!(
      instructions = func.instructions.len(),
      locals = func.locals.len(),
      "finalized function body"
    );

    self.temp_var_map.clear();
    TEMP_VAR_MAP_CACHE.with(|cache| cache.borrow_mut().push(std::mem::take(&mut self.temp_var_map)));
  }
}

#[cfg(test)]
mod test {
  use std::path::Path;

  use crate::common::config::CompilerConfig;

  use super::*;

  fn fixtures() -> (ReportingContext, PexFile) {
    (
      ReportingContext::new("test.psc"),
      PexFile::new(&CompilerConfig::default(), Path::new("test.psc")),
    )
  }

  #[test]
  fn label_offsets_are_relative() {
    let (mut reporting, mut file) = fixtures();
    let mut bldr = PexFunctionBuilder::new(&mut reporting, SourceLocation::default(), &mut file);

    let label = bldr.alloc_label();
    bldr.emit(Op::Jmp { target: label });
    bldr.emit(Op::Nop);
    bldr.emit(Op::Nop);
    bldr.place_label(label);
    bldr.emit(Op::Nop);

    let mut func = PexFunction::default();
    let mut debug = PexDebugFunctionInfo::default();
    bldr.populate_function(&mut func, &mut debug);

    // Placed at index 3, referenced from index 0.
    assert_eq!(func.instructions[0].args[0], PexValue::Integer(3));
    for instr in &func.instructions {
      for v in instr.args.iter().chain(instr.variadic_args.iter()) {
        assert!(!matches!(v, PexValue::Label(_)));
      }
    }
  }

  #[test]
  fn backward_jump_offset_is_negative() {
    let (mut reporting, mut file) = fixtures();
    let mut bldr = PexFunctionBuilder::new(&mut reporting, SourceLocation::default(), &mut file);

    let top = bldr.alloc_label();
    bldr.place_label(top);
    bldr.emit(Op::Nop);
    bldr.emit(Op::Nop);
    bldr.emit(Op::Jmp { target: top });

    let mut func = PexFunction::default();
    let mut debug = PexDebugFunctionInfo::default();
    bldr.populate_function(&mut func, &mut debug);

    assert_eq!(func.instructions[2].args[0], PexValue::Integer(-2));
  }

  #[test]
  fn temps_are_pooled_per_type() {
    let (mut reporting, mut file) = fixtures();
    let mut bldr = PexFunctionBuilder::new(&mut reporting, SourceLocation::default(), &mut file);

    // Write a temp, consume it, then allocate another of the same type: the
    // second allocation must reuse the first local.
    let t1 = bldr.alloc_temp(&PapyrusType::Int);
    bldr.emit(Op::Assign { dest: t1, src: PexValue::Integer(0) });
    bldr.emit(Op::Ret { val: t1 });

    let t2 = bldr.alloc_temp(&PapyrusType::Int);
    bldr.emit(Op::Assign { dest: t2, src: PexValue::Integer(1) });
    bldr.emit(Op::Ret { val: t2 });

    let mut func = PexFunction::default();
    let mut debug = PexDebugFunctionInfo::default();
    bldr.populate_function(&mut func, &mut debug);

    assert_eq!(func.locals.len(), 1);
    assert_eq!(file.string(func.locals[0].name), "::temp0");
    assert_eq!(file.string(func.locals[0].tp), "Int");
  }

  #[test]
  fn distinct_types_get_distinct_locals() {
    let (mut reporting, mut file) = fixtures();
    let mut bldr = PexFunctionBuilder::new(&mut reporting, SourceLocation::default(), &mut file);

    let ti = bldr.alloc_temp(&PapyrusType::Int);
    bldr.emit(Op::Assign { dest: ti, src: PexValue::Integer(0) });
    let tb = bldr.alloc_temp(&PapyrusType::Bool);
    bldr.emit(Op::Assign { dest: tb, src: PexValue::Bool(true) });

    let mut func = PexFunction::default();
    let mut debug = PexDebugFunctionInfo::default();
    bldr.populate_function(&mut func, &mut debug);

    assert_eq!(func.locals.len(), 2);
    assert_eq!(file.string(func.locals[0].name), "::temp0");
    assert_eq!(file.string(func.locals[1].name), "::temp1");
  }

  #[test]
  fn long_lived_temps_skip_auto_release() {
    let (mut reporting, mut file) = fixtures();
    let mut bldr = PexFunctionBuilder::new(&mut reporting, SourceLocation::default(), &mut file);

    let counter = bldr.alloc_long_lived_temp(&PapyrusType::Int);
    bldr.emit(Op::Assign { dest: counter, src: PexValue::Integer(0) });
    // Using it does not return it to the pool...
    bldr.emit(Op::IAdd { dest: counter, arg1: counter, arg2: PexValue::Integer(1) });
    let other = bldr.alloc_temp(&PapyrusType::Int);
    bldr.emit(Op::Assign { dest: other, src: PexValue::Integer(2) });

    let mut func = PexFunction::default();
    let mut debug = PexDebugFunctionInfo::default();
    bldr.populate_function(&mut func, &mut debug);

    // ...so the short-lived temp needed a second local.
    assert_eq!(func.locals.len(), 2);
  }

  #[test]
  fn freed_long_lived_temp_is_reusable() {
    let (mut reporting, mut file) = fixtures();
    let mut bldr = PexFunctionBuilder::new(&mut reporting, SourceLocation::default(), &mut file);

    let counter = bldr.alloc_long_lived_temp(&PapyrusType::Int);
    bldr.emit(Op::Assign { dest: counter, src: PexValue::Integer(0) });
    bldr.free_long_lived_temp(counter);

    let t = bldr.alloc_temp(&PapyrusType::Int);
    bldr.emit(Op::Assign { dest: t, src: PexValue::Integer(1) });

    let mut func = PexFunction::default();
    let mut debug = PexDebugFunctionInfo::default();
    bldr.populate_function(&mut func, &mut debug);

    assert_eq!(func.locals.len(), 1);
  }

  #[test]
  fn debug_line_map_is_monotonic() {
    let (mut reporting, mut file) = fixtures();
    // Lines start at offsets 0, 10, 20.
    reporting.push_next_line_offset(10);
    reporting.push_next_line_offset(20);

    let mut bldr = PexFunctionBuilder::new(&mut reporting, SourceLocation::default(), &mut file);
    bldr.set_location(SourceLocation::new(12, 13));
    bldr.emit(Op::Nop);
    bldr.set_location(SourceLocation::new(22, 23));
    bldr.emit(Op::Nop);
    // An instruction attributed to an earlier line gets pinned forward.
    bldr.set_location(SourceLocation::new(2, 3));
    bldr.emit(Op::Nop);

    let mut func = PexFunction::default();
    let mut debug = PexDebugFunctionInfo::default();
    bldr.populate_function(&mut func, &mut debug);

    assert_eq!(debug.instruction_line_map, vec![2, 3, 3]);
  }

  #[test]
  #[should_panic(expected = "Unresolved label!")]
  fn unplaced_label_is_fatal() {
    let (mut reporting, mut file) = fixtures();
    let mut bldr = PexFunctionBuilder::new(&mut reporting, SourceLocation::default(), &mut file);
    let label = bldr.alloc_label();
    bldr.emit(Op::Jmp { target: label });

    let mut func = PexFunction::default();
    let mut debug = PexDebugFunctionInfo::default();
    bldr.populate_function(&mut func, &mut debug);
  }

  #[test]
  #[should_panic(expected = "A label can only be placed once!")]
  fn double_placement_is_fatal() {
    let (mut reporting, mut file) = fixtures();
    let mut bldr = PexFunctionBuilder::new(&mut reporting, SourceLocation::default(), &mut file);
    let label = bldr.alloc_label();
    bldr.place_label(label);
    bldr.emit(Op::Nop);
    bldr.place_label(label);
  }

  #[test]
  #[should_panic(expected = "before it's been assigned")]
  fn reading_an_unassigned_temp_is_fatal() {
    let (mut reporting, mut file) = fixtures();
    let mut bldr = PexFunctionBuilder::new(&mut reporting, SourceLocation::default(), &mut file);
    let t = bldr.alloc_temp(&PapyrusType::Int);
    // `Return` has no destination slot, so the temp is still unbound.
    bldr.emit(Op::Ret { val: t });
  }

  #[test]
  #[should_panic(expected = "invalid value")]
  fn invalid_operands_are_fatal() {
    let (mut reporting, mut file) = fixtures();
    let mut bldr = PexFunctionBuilder::new(&mut reporting, SourceLocation::default(), &mut file);
    bldr.emit(Op::Ret { val: PexValue::Invalid });
  }

  #[test]
  #[should_panic(expected = "Unresolved tmp var!")]
  fn never_written_temp_is_fatal() {
    let (mut reporting, mut file) = fixtures();
    let mut bldr = PexFunctionBuilder::new(&mut reporting, SourceLocation::default(), &mut file);
    let _ = bldr.alloc_temp(&PapyrusType::Int);
    bldr.emit(Op::Nop);

    let mut func = PexFunction::default();
    let mut debug = PexDebugFunctionInfo::default();
    bldr.populate_function(&mut func, &mut debug);
  }

  #[test]
  fn break_continue_scopes_nest() {
    let (mut reporting, mut file) = fixtures();
    let mut bldr = PexFunctionBuilder::new(&mut reporting, SourceLocation::default(), &mut file);

    let outer_break = bldr.alloc_label();
    let outer_continue = bldr.alloc_label();
    let inner_break = bldr.alloc_label();
    let inner_continue = bldr.alloc_label();

    bldr.push_break_continue_scope(outer_break, outer_continue);
    bldr.push_break_continue_scope(inner_break, inner_continue);
    assert_eq!(bldr.break_target(), inner_break);
    assert_eq!(bldr.continue_target(), inner_continue);
    bldr.pop_break_continue_scope();
    assert_eq!(bldr.break_target(), outer_break);
    bldr.pop_break_continue_scope();

    for label in [outer_break, outer_continue, inner_break, inner_continue].iter() {
      bldr.place_label(*label);
    }
    let mut func = PexFunction::default();
    let mut debug = PexDebugFunctionInfo::default();
    bldr.populate_function(&mut func, &mut debug);
  }
}
