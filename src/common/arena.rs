/*!

  Bump-allocated storage for identifier and literal bytes.

  One arena lives per compiled source file. Token payloads and IR string
  values borrow from it (or from the source buffer directly), and the whole
  region is freed as a single unit after `.pex` serialization completes. No
  uniqueness is imposed here; the string table inside `PexFile` dedups
  downstream.

*/

use bumpalo::collections::String as ArenaString;
use bumpalo::Bump;

pub struct IdentifierArena {
  bump: Bump,
}

impl IdentifierArena {
  pub fn new() -> Self {
    IdentifierArena { bump: Bump::new() }
  }

  /// A zeroed, writable byte region of length `len`.
  pub fn allocate(&self, len: usize) -> &mut [u8] {
    self.bump.alloc_slice_fill_copy(len, 0u8)
  }

  /// Copies `s` into the arena and returns the stable copy.
  pub fn intern<'a>(&'a self, s: &str) -> &'a str {
    self.bump.alloc_str(s)
  }

  /// An incremental string builder backed by the arena. Finish it with
  /// `into_bump_str()`.
  pub fn builder(&self, capacity: usize) -> ArenaString<'_> {
    ArenaString::with_capacity_in(capacity, &self.bump)
  }

  pub fn allocated_bytes(&self) -> usize {
    self.bump.allocated_bytes()
  }
}

impl Default for IdentifierArena {
  fn default() -> Self {
    IdentifierArena::new()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn intern_copies() {
    let arena = IdentifierArena::new();
    let a = arena.intern("hello");
    let b = arena.intern("hello");
    assert_eq!(a, "hello");
    assert_eq!(a, b);
    // Duplicates are allowed; distinct storage is fine.
    assert!(!std::ptr::eq(a, b));
  }

  #[test]
  fn allocate_is_zeroed() {
    let arena = IdentifierArena::new();
    let region = arena.allocate(16);
    assert_eq!(region.len(), 16);
    assert!(region.iter().all(|&b| b == 0));
  }

  #[test]
  fn builder_produces_arena_str() {
    let arena = IdentifierArena::new();
    let mut b = arena.builder(8);
    b.push_str("a\n");
    b.push('b');
    assert_eq!(b.into_bump_str(), "a\nb");
  }
}
