/*!

  `pexc` — a compiler core for the Papyrus scripting language.

  Papyrus is the scripting language of Bethesda's game titles (Skyrim,
  Fallout 4/76, Starfield); source files are `.psc`, the compiled form is
  `.pex`. This crate houses the hard middle of the compiler:

  * a byte-level lexer with caseless, game-gated keywords and a bounded
    token peek buffer ([`papyrus::lexer`]);
  * the shared namespace tree with shadowing type resolution
    ([`papyrus::namespaces`]);
  * the streaming PEX function builder with pooled temporaries, label
    fixups, and the instruction→line debug map ([`pex::builder`]).

  The CLI driver, the parser grammar, the AST hierarchy, and the `.pex`
  serializer are external; they talk to this core through the token stream,
  the [`Workspace`](papyrus::namespaces::Workspace), and
  [`PexFunctionBuilder`](pex::builder::PexFunctionBuilder).

  Compilation is file-parallel and intra-file serial: each worker owns its
  arena, lexer, and builders, and only the `Workspace` is shared. Builder
  invariant violations are compiler bugs and panic; a driver isolates them
  per file with `catch_unwind`.

*/

pub mod common;
pub mod papyrus;
pub mod pex;

pub use common::arena::IdentifierArena;
pub use common::config::{CompilerConfig, GameId};
pub use common::reporting::{ReportingContext, SourceLocation};
pub use papyrus::lexer::{PapyrusLexer, Token, TokenKind, TokenValue};
pub use papyrus::namespaces::{ResolvedType, Workspace};
pub use papyrus::types::PapyrusType;
pub use pex::builder::{Op, PexFunctionBuilder};
pub use pex::file::{PexDebugFunctionInfo, PexFile, PexFunction};
pub use pex::value::{PexLabel, PexLocalVariable, PexString, PexValue};
