/*!

  Lowering helpers for the surface-language loops.

  The AST proper lives outside the core; these helpers take closures for
  the expression-dependent pieces (loading the iterable, emitting the body)
  and drive the builder through the canonical instruction shapes.

*/

use crate::common::reporting::SourceLocation;
use crate::pex::builder::{Op, PexFunctionBuilder};
use crate::pex::value::PexValue;

use super::types::PapyrusType;

/// Emits a `foreach` loop over an array or a `GetCount`/`GetAt` collection.
///
/// Non-array iteration assumes semantic validation has already checked that
/// the iterable's type exposes `GetCount(): Int` and `GetAt(Int)`; the
/// semantic pass substitutes `None` for the element type and reports when it
/// does not.
pub fn build_foreach<'r, 'f, L, B>(
  bldr: &mut PexFunctionBuilder<'r, 'f>,
  loc: SourceLocation,
  iterable_type: &PapyrusType,
  load_iterable: L,
  element_name: &str,
  element_type: &PapyrusType,
  body: B,
) where
  L: FnOnce(&mut PexFunctionBuilder<'r, 'f>) -> PexValue,
  B: FnOnce(&mut PexFunctionBuilder<'r, 'f>, PexValue),
{
  let before_condition = bldr.alloc_label();
  let after_all = bldr.alloc_label();
  let continue_label = bldr.alloc_label();
  bldr.push_break_continue_scope(after_all, continue_label);

  let counter = bldr.alloc_long_lived_temp(&PapyrusType::Int);
  let iter_val = bldr.alloc_long_lived_temp(iterable_type);

  bldr.set_location(loc);
  bldr.emit(Op::Assign { dest: counter, src: PexValue::Integer(0) });
  let base_val = load_iterable(bldr);
  bldr.set_location(loc);
  bldr.emit(Op::Assign { dest: iter_val, src: base_val });

  bldr.place_label(before_condition);
  let count_temp = bldr.alloc_temp(&PapyrusType::Int);
  if iterable_type.is_array() {
    bldr.emit(Op::ArrayLength { dest: count_temp, arr: iter_val });
  } else {
    let get_count = bldr.string("GetCount");
    bldr.emit(Op::CallMethod { name: get_count, base: iter_val, dest: count_temp, args: vec![] });
  }
  let cond_temp = bldr.alloc_temp(&PapyrusType::Bool);
  bldr.emit(Op::CmpLt { dest: cond_temp, arg1: counter, arg2: count_temp });
  bldr.emit(Op::JmpF { cond: cond_temp, target: after_all });

  let element = bldr.alloc_local(element_name, element_type);
  bldr.set_location(loc);
  if iterable_type.is_array() {
    bldr.emit(Op::ArrayGetElement { dest: element, arr: iter_val, index: counter });
  } else {
    let get_at = bldr.string("GetAt");
    bldr.emit(Op::CallMethod { name: get_at, base: iter_val, dest: element, args: vec![counter] });
  }

  body(bldr, element);

  bldr.set_location(loc);
  bldr.place_label(continue_label);
  bldr.emit(Op::IAdd { dest: counter, arg1: counter, arg2: PexValue::Integer(1) });
  bldr.emit(Op::Jmp { target: before_condition });

  bldr.free_long_lived_temp(iter_val);
  bldr.free_long_lived_temp(counter);
  bldr.pop_break_continue_scope();
  bldr.place_label(after_all);
}

/// Emits a `while` loop: condition at the top, `jmpf` out, back-edge `jmp`.
pub fn build_while<'r, 'f, C, B>(
  bldr: &mut PexFunctionBuilder<'r, 'f>,
  loc: SourceLocation,
  condition: C,
  body: B,
) where
  C: FnOnce(&mut PexFunctionBuilder<'r, 'f>) -> PexValue,
  B: FnOnce(&mut PexFunctionBuilder<'r, 'f>),
{
  let before_condition = bldr.alloc_label();
  let after_all = bldr.alloc_label();
  bldr.push_break_continue_scope(after_all, before_condition);

  bldr.place_label(before_condition);
  bldr.set_location(loc);
  let cond = condition(bldr);
  bldr.emit(Op::JmpF { cond, target: after_all });

  body(bldr);

  bldr.emit(Op::Jmp { target: before_condition });
  bldr.pop_break_continue_scope();
  bldr.place_label(after_all);
}

#[cfg(test)]
mod test {
  use std::path::Path;

  use crate::common::config::CompilerConfig;
  use crate::common::reporting::ReportingContext;
  use crate::pex::file::{PexDebugFunctionInfo, PexFile, PexFunction};
  use crate::pex::instruction::PexOpCode;
  use crate::pex::value::PexValue;

  use super::*;

  fn finish(bldr: PexFunctionBuilder) -> (PexFunction, PexDebugFunctionInfo) {
    let mut func = PexFunction::default();
    let mut debug = PexDebugFunctionInfo::default();
    bldr.populate_function(&mut func, &mut debug);
    (func, debug)
  }

  #[test]
  fn foreach_over_an_array() {
    let mut reporting = ReportingContext::new("test.psc");
    let mut file = PexFile::new(&CompilerConfig::default(), Path::new("test.psc"));
    let mut bldr = PexFunctionBuilder::new(&mut reporting, SourceLocation::default(), &mut file);

    let array_type = PapyrusType::Array(Box::new(PapyrusType::Int));
    let arr = bldr.alloc_local("items", &array_type);
    build_foreach(
      &mut bldr,
      SourceLocation::default(),
      &array_type,
      |_| arr,
      "item",
      &PapyrusType::Int,
      |bldr, element| {
        bldr.emit(Op::Ret { val: element });
      },
    );

    let (func, debug) = finish(bldr);
    let ops: Vec<PexOpCode> = func.instructions.iter().map(|i| i.op_code).collect();
    assert_eq!(
      ops,
      vec![
        PexOpCode::Assign,          // counter = 0
        PexOpCode::Assign,          // iterVal = items
        PexOpCode::ArrayLength,     // count = len(iterVal)
        PexOpCode::CmpLt,           // cond = counter < count
        PexOpCode::JmpF,            // exit
        PexOpCode::ArrayGetElement, // item = iterVal[counter]
        PexOpCode::Return,          // body
        PexOpCode::IAdd,            // counter += 1
        PexOpCode::Jmp,             // back edge
      ]
    );
    assert_eq!(debug.instruction_line_map.len(), func.instructions.len());

    // The back edge targets the arraylength, the exit jump lands one past
    // the end.
    assert_eq!(func.instructions[8].args[0], PexValue::Integer(2 - 8));
    assert_eq!(func.instructions[4].args[1], PexValue::Integer(9 - 4));

    // Locals: the iterated array, counter + iterVal + count + cond temps,
    // and the element.
    assert_eq!(func.locals.len(), 6);
  }

  #[test]
  fn foreach_over_a_collection_calls_getcount_and_getat() {
    let mut reporting = ReportingContext::new("test.psc");
    let mut file = PexFile::new(&CompilerConfig::default(), Path::new("test.psc"));
    let mut bldr = PexFunctionBuilder::new(&mut reporting, SourceLocation::default(), &mut file);

    let list_type = PapyrusType::Object("FormList".to_owned());
    let list = bldr.alloc_local("list", &list_type);
    build_foreach(
      &mut bldr,
      SourceLocation::default(),
      &list_type,
      |_| list,
      "entry",
      &PapyrusType::Object("Form".to_owned()),
      |_, _| {},
    );

    let (func, _) = finish(bldr);
    let calls: Vec<&str> = func
      .instructions
      .iter()
      .filter(|i| i.op_code == PexOpCode::CallMethod)
      .map(|i| match i.args[0] {
        PexValue::String(s) => file.string(s),
        _ => "?",
      })
      .collect();
    assert_eq!(calls, vec!["GetCount", "GetAt"]);

    // GetAt receives the counter as its single parameter.
    let get_at = func
      .instructions
      .iter()
      .find(|i| i.op_code == PexOpCode::CallMethod && file.string(match i.args[0] {
        PexValue::String(s) => s,
        _ => unreachable!(),
      }) == "GetAt")
      .expect("GetAt call present");
    assert_eq!(get_at.variadic_args.len(), 1);
  }

  #[test]
  fn foreach_temps_are_released() {
    let mut reporting = ReportingContext::new("test.psc");
    let mut file = PexFile::new(&CompilerConfig::default(), Path::new("test.psc"));
    let mut bldr = PexFunctionBuilder::new(&mut reporting, SourceLocation::default(), &mut file);

    let array_type = PapyrusType::Array(Box::new(PapyrusType::Int));
    let arr = bldr.alloc_local("items", &array_type);
    build_foreach(
      &mut bldr,
      SourceLocation::default(),
      &array_type,
      |_| arr,
      "item",
      &PapyrusType::Int,
      |_, _| {},
    );

    // Counter and iterVal are back in the pool: two more Int-typed temps
    // must not create new locals beyond the count temp already pooled.
    let before = {
      let t = bldr.alloc_temp(&PapyrusType::Int);
      bldr.emit(Op::Assign { dest: t, src: PexValue::Integer(0) });
      let t2 = bldr.alloc_temp(&PapyrusType::Int);
      bldr.emit(Op::Assign { dest: t2, src: PexValue::Integer(0) });
      bldr.instruction_count()
    };
    assert!(before > 0);

    let (func, _) = finish(bldr);
    // items, counter, iterVal(Int[]), count, cond, item: 6 locals, and the
    // two trailing temps reused pooled Ints.
    assert_eq!(func.locals.len(), 6);
  }

  #[test]
  fn while_loop_shape() {
    let mut reporting = ReportingContext::new("test.psc");
    let mut file = PexFile::new(&CompilerConfig::default(), Path::new("test.psc"));
    let mut bldr = PexFunctionBuilder::new(&mut reporting, SourceLocation::default(), &mut file);

    let flag = bldr.alloc_local("flag", &PapyrusType::Bool);
    build_while(
      &mut bldr,
      SourceLocation::default(),
      |_| flag,
      |bldr| {
        bldr.emit(Op::Nop);
      },
    );

    let (func, _) = finish(bldr);
    let ops: Vec<PexOpCode> = func.instructions.iter().map(|i| i.op_code).collect();
    assert_eq!(ops, vec![PexOpCode::JmpF, PexOpCode::Nop, PexOpCode::Jmp]);
    // Exit jump past the end; back edge to the condition.
    assert_eq!(func.instructions[0].args[1], PexValue::Integer(3));
    assert_eq!(func.instructions[2].args[0], PexValue::Integer(-2));
  }
}
