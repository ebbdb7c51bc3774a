/*!

  The Papyrus lexer: an already-mapped byte buffer in, a token stream out.

  The scanner works a byte at a time with one character of lookahead and a
  bounded token peek buffer on top. Identifiers and keywords are ASCII and
  compare caselessly; string and documentation-comment payloads land in the
  per-file arena when they need unescaping or normalization, and borrow the
  source buffer directly otherwise.

  Malformed input is reported through the `ReportingContext` and the scanner
  resynchronizes by dropping one character and trying again; it never stops
  early. Every stream ends with a synthetic `Eol` followed by `End`.

*/

use smallvec::SmallVec;

use crate::common::arena::IdentifierArena;
use crate::common::caseless::to_lower_ascii;
use crate::common::config::{CompilerConfig, GameId};
use crate::common::limits::MAX_SOURCE_LEN;
use crate::common::reporting::{ReportingContext, SourceLocation};
use crate::common::stats::{LexStats, PhaseTimer};

// region Token kinds

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
  Unknown,
  Eol,
  End,

  Identifier,
  DocComment,
  String,
  Integer,
  Float,

  LParen,
  RParen,
  LSquare,
  RSquare,
  Dot,
  Comma,
  Equal,
  Exclaim,
  Plus,
  PlusEqual,
  Minus,
  MinusEqual,
  Mul,
  MulEqual,
  Div,
  DivEqual,
  Mod,
  ModEqual,
  CmpEq,
  CmpNeq,
  CmpLt,
  CmpLte,
  CmpGt,
  CmpGte,
  BooleanOr,
  BooleanAnd,

  KwAs,
  KwAuto,
  KwAutoReadOnly,
  KwBool,
  KwElse,
  KwElseIf,
  KwEndEvent,
  KwEndFunction,
  KwEndIf,
  KwEndProperty,
  KwEndState,
  KwEndWhile,
  KwEvent,
  KwExtends,
  KwFalse,
  KwFloat,
  KwFunction,
  KwGlobal,
  KwIf,
  KwImport,
  KwInt,
  KwIs,
  KwLength,
  KwNative,
  KwNew,
  KwNone,
  KwParent,
  KwProperty,
  KwReturn,
  KwScriptName,
  KwSelf,
  KwState,
  KwString,
  KwTrue,
  KwWhile,

  // Fallout 4 / Fallout 76
  KwBetaOnly,
  KwConst,
  KwCustomEvent,
  KwCustomEventName,
  KwDebugOnly,
  KwEndGroup,
  KwEndStruct,
  KwGroup,
  KwScriptEventName,
  KwStruct,
  KwVar,

  // Starfield
  KwGuard,
  KwEndGuard,
  KwTryGuard,

  // Language extensions
  KwBreak,
  KwCase,
  KwContinue,
  KwDefault,
  KwDo,
  KwEndFor,
  KwEndForEach,
  KwEndSwitch,
  KwFor,
  KwForEach,
  KwIn,
  KwLoopWhile,
  KwStep,
  KwSwitch,
  KwTo,
}

impl std::fmt::Display for TokenKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    use TokenKind::*;
    let name = match self {
      Unknown => "Unknown",
      Eol => "EOL",
      End => "EOF",
      Identifier => "Identifier",
      DocComment => "Documentation Comment",
      String => "String",
      Integer => "Integer",
      Float => "Float",
      LParen => "(",
      RParen => ")",
      LSquare => "[",
      RSquare => "]",
      Dot => ".",
      Comma => ",",
      Equal => "=",
      Exclaim => "!",
      Plus => "+",
      PlusEqual => "+=",
      Minus => "-",
      MinusEqual => "-=",
      Mul => "*",
      MulEqual => "*=",
      Div => "/",
      DivEqual => "/=",
      Mod => "%",
      ModEqual => "%=",
      CmpEq => "==",
      CmpNeq => "!=",
      CmpLt => "<",
      CmpLte => "<=",
      CmpGt => ">",
      CmpGte => ">=",
      BooleanOr => "||",
      BooleanAnd => "&&",
      KwAs => "As",
      KwAuto => "Auto",
      KwAutoReadOnly => "AutoReadOnly",
      KwBool => "Bool",
      KwElse => "Else",
      KwElseIf => "ElseIf",
      KwEndEvent => "EndEvent",
      KwEndFunction => "EndFunction",
      KwEndIf => "EndIf",
      KwEndProperty => "EndProperty",
      KwEndState => "EndState",
      KwEndWhile => "EndWhile",
      KwEvent => "Event",
      KwExtends => "Extends",
      KwFalse => "False",
      KwFloat => "Float",
      KwFunction => "Function",
      KwGlobal => "Global",
      KwIf => "If",
      KwImport => "Import",
      KwInt => "Int",
      KwIs => "Is",
      KwLength => "Length",
      KwNative => "Native",
      KwNew => "New",
      KwNone => "None",
      KwParent => "Parent",
      KwProperty => "Property",
      KwReturn => "Return",
      KwScriptName => "ScriptName",
      KwSelf => "Self",
      KwState => "State",
      KwString => "String",
      KwTrue => "True",
      KwWhile => "While",
      KwBetaOnly => "BetaOnly",
      KwConst => "Const",
      KwCustomEvent => "CustomEvent",
      KwCustomEventName => "CustomEventName",
      KwDebugOnly => "DebugOnly",
      KwEndGroup => "EndGroup",
      KwEndStruct => "EndStruct",
      KwGroup => "Group",
      KwScriptEventName => "ScriptEventName",
      KwStruct => "Struct",
      KwVar => "Var",
      KwGuard => "Guard",
      KwEndGuard => "EndGuard",
      KwTryGuard => "TryGuard",
      KwBreak => "Break",
      KwCase => "Case",
      KwContinue => "Continue",
      KwDefault => "Default",
      KwDo => "Do",
      KwEndFor => "EndFor",
      KwEndForEach => "EndForEach",
      KwEndSwitch => "EndSwitch",
      KwFor => "For",
      KwForEach => "ForEach",
      KwIn => "In",
      KwLoopWhile => "LoopWhile",
      KwStep => "Step",
      KwSwitch => "Switch",
      KwTo => "To",
    };
    write!(f, "{}", name)
  }
}

/// Whether `kind`, when it is a keyword, is active for `game`. Keywords
/// gated out for the target game lex as plain identifiers.
pub fn keyword_in_game(kind: TokenKind, game: GameId) -> bool {
  use TokenKind::*;
  match kind {
    | KwBetaOnly | KwConst | KwCustomEvent | KwCustomEventName | KwDebugOnly
    | KwEndGroup | KwEndStruct | KwGroup | KwScriptEventName | KwStruct | KwVar => {
      game != GameId::Skyrim
    }

    KwGuard | KwEndGuard | KwTryGuard => game == GameId::Starfield,

    _ => true,
  }
}

static KEYWORD_MAP: phf::Map<&'static str, TokenKind> = phf::phf_map! {
  "as"              => TokenKind::KwAs,
  "auto"            => TokenKind::KwAuto,
  "autoreadonly"    => TokenKind::KwAutoReadOnly,
  "bool"            => TokenKind::KwBool,
  "else"            => TokenKind::KwElse,
  "elseif"          => TokenKind::KwElseIf,
  "endevent"        => TokenKind::KwEndEvent,
  "endfunction"     => TokenKind::KwEndFunction,
  "endif"           => TokenKind::KwEndIf,
  "endproperty"     => TokenKind::KwEndProperty,
  "endstate"        => TokenKind::KwEndState,
  "endwhile"        => TokenKind::KwEndWhile,
  "event"           => TokenKind::KwEvent,
  "extends"         => TokenKind::KwExtends,
  "false"           => TokenKind::KwFalse,
  "float"           => TokenKind::KwFloat,
  "function"        => TokenKind::KwFunction,
  "global"          => TokenKind::KwGlobal,
  "if"              => TokenKind::KwIf,
  "import"          => TokenKind::KwImport,
  "int"             => TokenKind::KwInt,
  "is"              => TokenKind::KwIs,
  "length"          => TokenKind::KwLength,
  "native"          => TokenKind::KwNative,
  "new"             => TokenKind::KwNew,
  "none"            => TokenKind::KwNone,
  "parent"          => TokenKind::KwParent,
  "property"        => TokenKind::KwProperty,
  "return"          => TokenKind::KwReturn,
  "scriptname"      => TokenKind::KwScriptName,
  "self"            => TokenKind::KwSelf,
  "state"           => TokenKind::KwState,
  "string"          => TokenKind::KwString,
  "true"            => TokenKind::KwTrue,
  "while"           => TokenKind::KwWhile,

  // Fallout 4 / Fallout 76
  "betaonly"        => TokenKind::KwBetaOnly,
  "const"           => TokenKind::KwConst,
  "customevent"     => TokenKind::KwCustomEvent,
  "customeventname" => TokenKind::KwCustomEventName,
  "debugonly"       => TokenKind::KwDebugOnly,
  "endgroup"        => TokenKind::KwEndGroup,
  "endstruct"       => TokenKind::KwEndStruct,
  "group"           => TokenKind::KwGroup,
  "scripteventname" => TokenKind::KwScriptEventName,
  "struct"          => TokenKind::KwStruct,
  "var"             => TokenKind::KwVar,

  // Starfield
  "guard"           => TokenKind::KwGuard,
  "endguard"        => TokenKind::KwEndGuard,
  "tryguard"        => TokenKind::KwTryGuard,
};

static LANGUAGE_EXTENSIONS_KEYWORD_MAP: phf::Map<&'static str, TokenKind> = phf::phf_map! {
  "break"      => TokenKind::KwBreak,
  "case"       => TokenKind::KwCase,
  "continue"   => TokenKind::KwContinue,
  "default"    => TokenKind::KwDefault,
  "do"         => TokenKind::KwDo,
  "endfor"     => TokenKind::KwEndFor,
  "endforeach" => TokenKind::KwEndForEach,
  "endswitch"  => TokenKind::KwEndSwitch,
  "for"        => TokenKind::KwFor,
  "foreach"    => TokenKind::KwForEach,
  "in"         => TokenKind::KwIn,
  "loopwhile"  => TokenKind::KwLoopWhile,
  "step"       => TokenKind::KwStep,
  "switch"     => TokenKind::KwSwitch,
  "to"         => TokenKind::KwTo,
};

// endregion

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TokenValue<'a> {
  None,
  Int(i32),
  Float(f32),
  Str(&'a str),
}

#[derive(Copy, Clone, Debug)]
pub struct Token<'a> {
  pub kind: TokenKind,
  pub location: SourceLocation,
  pub val: TokenValue<'a>,
}

impl<'a> Token<'a> {
  fn new(kind: TokenKind, location: SourceLocation) -> Self {
    Token { kind, location, val: TokenValue::None }
  }

  pub fn int_value(&self) -> i32 {
    match self.val {
      TokenValue::Int(i) => i,
      _ => ReportingContext::logical_fatal("Requested the integer value of a non-integer token!"),
    }
  }

  pub fn float_value(&self) -> f32 {
    match self.val {
      TokenValue::Float(f) => f,
      _ => ReportingContext::logical_fatal("Requested the float value of a non-float token!"),
    }
  }

  pub fn str_value(&self) -> &'a str {
    match self.val {
      TokenValue::Str(s) => s,
      _ => ReportingContext::logical_fatal("Requested the string value of a valueless token!"),
    }
  }
}

/// Upper bound on `peek_kind` distance.
pub const MAX_PEEKED_TOKENS: usize = 8;

pub struct PapyrusLexer<'a, 'r> {
  config: &'a CompilerConfig,
  source: &'a str,
  alloc: &'a IdentifierArena,
  reporting: &'r mut ReportingContext,
  offset: usize, //< Cursor into `source`.
  cur: Token<'a>,
  peeked: SmallVec<[Token<'a>; MAX_PEEKED_TOKENS]>,
  stats: LexStats,
  timer: PhaseTimer,
  eof_eol_emitted: bool,
  finished: bool,
}

impl<'a, 'r> PapyrusLexer<'a, 'r> {
  pub fn new(
    config: &'a CompilerConfig,
    source: &'a str,
    alloc: &'a IdentifierArena,
    reporting: &'r mut ReportingContext,
  ) -> Self {
    if source.len() > MAX_SOURCE_LEN {
      ReportingContext::logical_fatal("The source file is too large to lex!");
    }
    PapyrusLexer {
      config,
      source,
      alloc,
      reporting,
      offset: 0,
      cur: Token::new(TokenKind::Unknown, SourceLocation::default()),
      peeked: SmallVec::new(),
      stats: LexStats::default(),
      timer: PhaseTimer::start(),
      eof_eol_emitted: false,
      finished: false,
    }
  }

  pub fn current(&self) -> &Token<'a> {
    &self.cur
  }

  pub fn stats(&self) -> &LexStats {
    &self.stats
  }

  /// Advances to the next token.
  pub fn consume(&mut self) {
    self.stats.consumed_token_count += 1;
    if !self.peeked.is_empty() {
      self.cur = self.peeked.remove(0);
      return;
    }
    self.real_consume();
  }

  /// The kind of the `distance`-th upcoming token, without consuming
  /// anything. `distance` 0 is the token the next `consume` will yield.
  pub fn peek_kind(&mut self, distance: usize) -> TokenKind {
    debug_assert!(distance < MAX_PEEKED_TOKENS);
    if distance < self.peeked.len() {
      return self.peeked[distance].kind;
    }

    let saved = self.cur;
    while self.peeked.len() <= distance {
      self.stats.peeked_token_count += 1;
      self.real_consume();
      let token = self.cur;
      self.peeked.push(token);
    }
    self.cur = saved;

    self.peeked[distance].kind
  }

  // region Character access

  fn peek_char(&self) -> Option<u8> {
    self.source.as_bytes().get(self.offset).copied()
  }

  fn get_char(&mut self) -> Option<u8> {
    let c = self.peek_char();
    if c.is_some() {
      self.offset += 1;
    }
    c
  }

  /// Zero-width location at the cursor, for errors with no natural span.
  fn here(&self) -> SourceLocation {
    SourceLocation::new(self.offset as u32, self.offset as u32)
  }

  /// Makes `cur` a token of `kind` spanning from `base` to the cursor after
  /// consuming `extra` more characters.
  fn set_tok(&mut self, kind: TokenKind, base: usize, extra: usize) {
    self.offset += extra;
    self.cur = Token::new(kind, SourceLocation::new(base as u32, self.offset as u32));
  }

  // endregion

  fn real_consume(&mut self) {
    loop {
      let base = self.offset;
      let c = match self.get_char() {
        Some(c) => c,
        None => {
          // Every stream ends with a synthetic EOL, then END.
          if self.eof_eol_emitted {
            return self.set_tok(TokenKind::End, base, 0);
          }
          self.eof_eol_emitted = true;
          if !self.finished {
            self.finished = true;
            self.stats.lex_time = self.timer.elapsed();
            tracing::debug!(
              consumed = self.stats.consumed_token_count,
              peeked = self.stats.peeked_token_count,
              "reached end of stream"
            );
          }
          return self.set_tok(TokenKind::Eol, base, 0);
        }
      };

      match c {
        b'(' => return self.set_tok(TokenKind::LParen, base, 0),
        b')' => return self.set_tok(TokenKind::RParen, base, 0),
        b'[' => return self.set_tok(TokenKind::LSquare, base, 0),
        b']' => return self.set_tok(TokenKind::RSquare, base, 0),
        b'.' => return self.set_tok(TokenKind::Dot, base, 0),
        b',' => return self.set_tok(TokenKind::Comma, base, 0),

        b'=' => {
          if self.peek_char() == Some(b'=') {
            return self.set_tok(TokenKind::CmpEq, base, 1);
          }
          return self.set_tok(TokenKind::Equal, base, 0);
        }
        b'!' => {
          if self.peek_char() == Some(b'=') {
            return self.set_tok(TokenKind::CmpNeq, base, 1);
          }
          return self.set_tok(TokenKind::Exclaim, base, 0);
        }
        b'+' => {
          if self.peek_char() == Some(b'=') {
            return self.set_tok(TokenKind::PlusEqual, base, 1);
          }
          return self.set_tok(TokenKind::Plus, base, 0);
        }
        b'-' => {
          if self.peek_char() == Some(b'=') {
            return self.set_tok(TokenKind::MinusEqual, base, 1);
          }
          if self.peek_char().map_or(false, |c2| c2.is_ascii_digit()) {
            return self.lex_number(base);
          }
          return self.set_tok(TokenKind::Minus, base, 0);
        }
        b'*' => {
          if self.peek_char() == Some(b'=') {
            return self.set_tok(TokenKind::MulEqual, base, 1);
          }
          return self.set_tok(TokenKind::Mul, base, 0);
        }
        b'/' => {
          if self.peek_char() == Some(b'=') {
            return self.set_tok(TokenKind::DivEqual, base, 1);
          }
          return self.set_tok(TokenKind::Div, base, 0);
        }
        b'%' => {
          if self.peek_char() == Some(b'=') {
            return self.set_tok(TokenKind::ModEqual, base, 1);
          }
          return self.set_tok(TokenKind::Mod, base, 0);
        }
        b'<' => {
          if self.peek_char() == Some(b'=') {
            return self.set_tok(TokenKind::CmpLte, base, 1);
          }
          return self.set_tok(TokenKind::CmpLt, base, 0);
        }
        b'>' => {
          if self.peek_char() == Some(b'=') {
            return self.set_tok(TokenKind::CmpGte, base, 1);
          }
          return self.set_tok(TokenKind::CmpGt, base, 0);
        }

        b'|' => {
          if self.peek_char() == Some(b'|') {
            return self.set_tok(TokenKind::BooleanOr, base, 1);
          }
          self.reporting.error(
            SourceLocation::new(base as u32, self.offset as u32),
            "Bitwise OR is unsupported. Did you intend to use a logical or (\"||\") instead?",
          );
          return self.set_tok(TokenKind::BooleanOr, base, 0);
        }
        b'&' => {
          if self.peek_char() == Some(b'&') {
            return self.set_tok(TokenKind::BooleanAnd, base, 1);
          }
          self.reporting.error(
            SourceLocation::new(base as u32, self.offset as u32),
            "Bitwise AND is unsupported. Did you intend to use a logical and (\"&&\") instead?",
          );
          return self.set_tok(TokenKind::BooleanAnd, base, 0);
        }

        b'0'..=b'9' => return self.lex_number(base),

        b':' | b'_' | b'a'..=b'z' | b'A'..=b'Z' => return self.lex_identifier(base, c),

        b'"' => return self.lex_string(base),

        b';' => {
          if self.peek_char() == Some(b'/') {
            // Multiline comment.
            self.get_char();
            let mut terminated = false;
            while self.peek_char().is_some() {
              if matches!(self.peek_char(), Some(b'\r') | Some(b'\n')) {
                let c2 = self.get_char();
                if c2 == Some(b'\r') && self.peek_char() == Some(b'\n') {
                  self.get_char();
                }
                self.reporting.push_next_line_offset(self.offset as u32);
              }
              if self.get_char() == Some(b'/') && self.peek_char() == Some(b';') {
                self.get_char();
                terminated = true;
                break;
              }
            }
            if !terminated {
              self.reporting.error(self.here(), "Unexpected EOF before the end of a multiline comment!");
            }
            continue;
          }

          // Single line comment.
          while !matches!(self.peek_char(), None | Some(b'\r') | Some(b'\n')) {
            self.get_char();
          }
          continue;
        }

        b'{' => return self.lex_doc_comment(base),

        b'\\' => {
          // A backslash only continues a line; anything else after it is an
          // error either way.
          self.real_consume();
          if self.cur.kind != TokenKind::Eol {
            self.reporting.error(
              SourceLocation::new(base as u32, base as u32 + 1),
              "Unexpected '\\'! Division is done with a forward slash '/'.",
            );
          }
          continue;
        }

        b'\r' | b'\n' => {
          if c == b'\r' && self.peek_char() == Some(b'\n') {
            self.get_char();
          }
          self.reporting.push_next_line_offset(self.offset as u32);
          return self.set_tok(TokenKind::Eol, base, 0);
        }

        b' ' | b'\t' => {
          while matches!(self.peek_char(), Some(b' ') | Some(b'\t')) {
            self.get_char();
          }
          continue;
        }

        _ => {
          self.reporting.error(
            SourceLocation::new(base as u32, self.offset as u32),
            format!("Unexpected character '{}'!", c as char),
          );
          continue;
        }
      }
    }
  }

  // region Literal scanners

  fn lex_number(&mut self, base: usize) {
    let bytes = self.source.as_bytes();

    // Hex.
    if bytes[base] == b'0' && matches!(self.peek_char(), Some(b'x') | Some(b'X')) {
      self.get_char();
      while self.peek_char().map_or(false, |c| c.is_ascii_hexdigit()) {
        self.get_char();
      }
      let mut value: u32 = 0;
      for &b in &bytes[base + 2..self.offset] {
        value = value
          .wrapping_mul(16)
          .wrapping_add((b as char).to_digit(16).unwrap_or(0));
      }
      self.set_tok(TokenKind::Integer, base, 0);
      self.cur.val = TokenValue::Int(value as i32);
      return;
    }

    while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
      self.get_char();
    }

    // A fraction makes it a float.
    if self.peek_char() == Some(b'.') {
      self.get_char();
      while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
        self.get_char();
      }

      if self.peek_char() == Some(b'e') {
        if !self.config.enable_language_extensions {
          // Exponents are an extension; plain Papyrus stops at the fraction.
          let frac_end = self.offset;
          self.reporting.error(self.here(), "Unexpected character 'e'!");
          self.get_char();
          self.set_tok(TokenKind::Float, base, 0);
          let value = self.source[base..frac_end].parse::<f32>().unwrap_or(0.0);
          self.cur.val = TokenValue::Float(value);
          return;
        }

        let e_index = self.offset;
        self.get_char();
        // Only `e+` is accepted; on anything else, report and recover as if
        // `e+` had been written (the stray character is dropped).
        let mut recovered: Option<std::string::String> = None;
        if self.get_char() != Some(b'+') {
          self.reporting.error(self.here(), "Unexpected character 'e'!");
          recovered = Some(format!("{}+", &self.source[base..=e_index]));
        }
        let digits_start = self.offset;
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
          self.get_char();
        }
        let value = match recovered {
          Some(mut text) => {
            text.push_str(&self.source[digits_start..self.offset]);
            text.parse::<f32>().unwrap_or(0.0)
          }
          None => self.source[base..self.offset].parse::<f32>().unwrap_or(0.0),
        };
        self.set_tok(TokenKind::Float, base, 0);
        self.cur.val = TokenValue::Float(value);
        return;
      }

      self.set_tok(TokenKind::Float, base, 0);
      let value = self.source[base..self.offset].parse::<f32>().unwrap_or(0.0);
      self.cur.val = TokenValue::Float(value);
      return;
    }

    // Integer when the magnitude fits in 32 bits (signed low end, unsigned
    // high end, wrapping reinterpretation); otherwise silently a float.
    let text = &self.source[base..self.offset];
    match text.parse::<i64>() {
      Ok(v) if v >= i32::MIN as i64 && v <= u32::MAX as i64 => {
        self.set_tok(TokenKind::Integer, base, 0);
        self.cur.val = TokenValue::Int(v as u32 as i32);
      }
      _ => {
        let value = text.parse::<f32>().unwrap_or(f32::INFINITY);
        self.set_tok(TokenKind::Float, base, 0);
        self.cur.val = TokenValue::Float(value);
      }
    }
  }

  fn lex_identifier(&mut self, base: usize, c: u8) {
    if c == b':' {
      // Only the compiler's own synthesized names start with `::`.
      if self.config.allow_compiler_identifiers && self.peek_char() == Some(b':') {
        self.get_char();
      } else {
        self.reporting.error(
          SourceLocation::new(base as u32, base as u32 + 1),
          "Unexpected character ':'!",
        );
        if self.peek_char() == Some(b':') {
          self.get_char();
        }
      }
    }

    while self
      .peek_char()
      .map_or(false, |ch| ch == b'_' || ch == b':' || ch.is_ascii_alphanumeric())
    {
      self.get_char();
    }

    if self.config.allow_decompiled_struct_name_refs && self.peek_char() == Some(b'#') {
      self.get_char();
      while self
        .peek_char()
        .map_or(false, |ch| ch == b'_' || ch.is_ascii_alphanumeric())
      {
        self.get_char();
      }
    }

    let lexeme = &self.source[base..self.offset];

    // Keyword lookup is caseless.
    let lowered: SmallVec<[u8; 32]> = lexeme.bytes().map(to_lower_ascii).collect();
    if let Ok(lowered) = std::str::from_utf8(&lowered) {
      if let Some(&kind) = KEYWORD_MAP.get(lowered) {
        if keyword_in_game(kind, self.config.game) {
          return self.set_tok(kind, base, 0);
        }
      }
      if self.config.enable_language_extensions {
        if let Some(&kind) = LANGUAGE_EXTENSIONS_KEYWORD_MAP.get(lowered) {
          return self.set_tok(kind, base, 0);
        }
      }
    }

    self.set_tok(TokenKind::Identifier, base, 0);
    self.cur.val = TokenValue::Str(lexeme);
  }

  fn lex_string(&mut self, base: usize) {
    let content_start = self.offset;
    let mut chars_required: usize = 0;

    loop {
      match self.peek_char() {
        None | Some(b'"') | Some(b'\r') | Some(b'\n') => break,

        Some(b'\\') => {
          self.get_char();
          match self.get_char() {
            Some(b'n') | Some(b't') | Some(b'\\') | Some(b'"') => chars_required += 1,
            None => {
              self.reporting.error(self.here(), "Unexpected EOF before the end of the string.");
            }
            Some(other) => {
              self.reporting.error(
                self.here(),
                format!("Unrecognized escape sequence: '\\{}'", other as char),
              );
              // The payload keeps the raw pair.
              chars_required += 2;
            }
          }
        }

        Some(_) => {
          self.get_char();
          chars_required += 1;
        }
      }
    }

    let content_end = self.offset;
    if self.peek_char() == Some(b'"') {
      self.get_char();
    } else {
      self.reporting.error(self.here(), "Unclosed string!");
    }

    self.set_tok(TokenKind::String, base, 0);
    let raw = &self.source[content_start..content_end];
    if chars_required == raw.len() {
      self.cur.val = TokenValue::Str(raw);
      return;
    }

    // Unescape into the arena.
    let mut buf = self.alloc.builder(chars_required);
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
      if ch != '\\' {
        buf.push(ch);
        continue;
      }
      match chars.next() {
        Some('n') => buf.push('\n'),
        Some('t') => buf.push('\t'),
        Some('\\') => buf.push('\\'),
        Some('"') => buf.push('"'),
        Some(other) => {
          buf.push('\\');
          buf.push(other);
        }
        None => buf.push('\\'),
      }
    }
    self.cur.val = TokenValue::Str(buf.into_bump_str());
  }

  fn lex_doc_comment(&mut self, base: usize) {
    // Skip leading whitespace, keeping the line ledger accurate.
    loop {
      match self.peek_char() {
        Some(b'\r') | Some(b'\n') => {
          let c2 = self.get_char();
          if c2 == Some(b'\r') && self.peek_char() == Some(b'\n') {
            self.get_char();
          }
          self.reporting.push_next_line_offset(self.offset as u32);
        }
        Some(b' ') | Some(b'\t') | Some(0x0B) | Some(0x0C) => {
          self.get_char();
        }
        _ => break,
      }
    }

    let content_start = self.offset;
    loop {
      match self.peek_char() {
        None | Some(b'}') => break,
        Some(b'\r') => {
          self.get_char();
          if self.peek_char() == Some(b'\n') {
            self.get_char();
          }
          self.reporting.push_next_line_offset(self.offset as u32);
        }
        Some(b'\n') => {
          self.get_char();
          self.reporting.push_next_line_offset(self.offset as u32);
        }
        Some(_) => {
          self.get_char();
        }
      }
    }

    let content_end = self.offset;
    if self.peek_char() == Some(b'}') {
      self.get_char();
    } else {
      self.reporting.error(self.here(), "Unexpected EOF before the end of a documentation comment!");
    }

    self.set_tok(TokenKind::DocComment, base, 0);
    let raw = self.source[content_start..content_end]
      .trim_end_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r'));
    // Doc comments carry unix newlines only.
    if raw.contains("\r\n") {
      let normalized = raw.replace("\r\n", "\n");
      self.cur.val = TokenValue::Str(self.alloc.intern(&normalized));
    } else {
      self.cur.val = TokenValue::Str(raw);
    }
  }

  // endregion
}
