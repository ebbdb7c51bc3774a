//! Compilation settings, passed explicitly to the components that need them.

/// The game a compilation targets. Gates the keyword set and the PEX header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GameId {
  Skyrim,
  Fallout4,
  Fallout76,
  Starfield,
}

#[derive(Clone, Debug)]
pub struct CompilerConfig {
  pub game: GameId,
  /// Accept the extended keyword set (`for`, `foreach`, `switch`, ...) and
  /// `e+` float exponents.
  pub enable_language_extensions: bool,
  /// Accept identifiers with a leading `::`, as emitted by the compiler
  /// itself for synthesized names.
  pub allow_compiler_identifiers: bool,
  /// Accept a `#`-suffixed run on identifiers, as found in decompiled
  /// sources referencing structs.
  pub allow_decompiled_struct_name_refs: bool,
  pub emit_debug_info: bool,
  /// Blank out user/computer names and anonymize source paths in PEX
  /// headers.
  pub anonymize_output: bool,
}

impl Default for CompilerConfig {
  fn default() -> Self {
    CompilerConfig {
      game: GameId::Fallout4,
      enable_language_extensions: false,
      allow_compiler_identifiers: false,
      allow_decompiled_struct_name_refs: false,
      emit_debug_info: true,
      anonymize_output: false,
    }
  }
}
