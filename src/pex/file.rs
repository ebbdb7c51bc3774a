/*!

  The in-memory `.pex` module under construction.

  Only the pieces the compiler core touches live here: the bytecode-level
  string table (exact-bytes dedup, distinct from the per-file identifier
  arena) and the header fields the serializer will write out. Function
  bodies arrive through `PexFunctionBuilder::populate_function`.

*/

use std::collections::HashMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::common::config::{CompilerConfig, GameId};
use crate::common::limits::MAX_STRING_TABLE;
use crate::common::os::{anonymize_path, get_computer_name, get_user_name};
use crate::common::reporting::ReportingContext;

use super::instruction::PexInstruction;
use super::value::{PexLocalVariable, PexString};

pub struct PexFile {
  pub source_file_name: String,
  pub user_name: String,
  pub computer_name: String,
  pub compilation_time: u64, //< Seconds since the epoch.
  pub game: GameId,
  strings: Vec<String>,
  string_map: HashMap<String, u16>,
}

impl PexFile {
  pub fn new(config: &CompilerConfig, source_path: &Path) -> Self {
    let source_file_name = if config.anonymize_output {
      anonymize_path(source_path)
    } else {
      source_path.to_path_buf()
    };
    let (user_name, computer_name) = if config.anonymize_output {
      (String::new(), String::new())
    } else {
      (get_user_name(), get_computer_name())
    };

    PexFile {
      source_file_name: source_file_name.to_string_lossy().into_owned(),
      user_name,
      computer_name,
      compilation_time: SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0),
      game: config.game,
      strings: Vec::new(),
      string_map: HashMap::new(),
    }
  }

  /// Interns `s` in the bytecode string table. Dedup is by exact bytes; the
  /// engine's loader is the one that treats identifiers caselessly.
  pub fn get_string(&mut self, s: &str) -> PexString {
    if let Some(&index) = self.string_map.get(s) {
      return PexString(index);
    }
    if self.strings.len() >= MAX_STRING_TABLE {
      ReportingContext::logical_fatal(format!(
        "The PEX string table is limited to {} entries!",
        MAX_STRING_TABLE
      ));
    }
    let index = self.strings.len() as u16;
    self.strings.push(s.to_owned());
    self.string_map.insert(s.to_owned(), index);
    PexString(index)
  }

  pub fn string(&self, id: PexString) -> &str {
    &self.strings[id.0 as usize]
  }

  pub fn string_count(&self) -> usize {
    self.strings.len()
  }
}

#[derive(Debug, Default)]
pub struct PexFunction {
  pub instructions: Vec<PexInstruction>,
  pub locals: Vec<PexLocalVariable>,
}

#[derive(Debug, Default)]
pub struct PexDebugFunctionInfo {
  /// One 1-based source line per instruction, non-decreasing.
  pub instruction_line_map: Vec<u16>,
}

#[cfg(test)]
mod test {
  use super::*;

  fn test_file() -> PexFile {
    PexFile::new(&CompilerConfig::default(), Path::new("test.psc"))
  }

  #[test]
  fn string_table_dedups_exact_bytes() {
    let mut file = test_file();
    let a = file.get_string("GetCount");
    let b = file.get_string("GetCount");
    assert_eq!(a, b);
    assert_eq!(file.string_count(), 1);
    assert_eq!(file.string(a), "GetCount");

    // Case differences are distinct entries at this level.
    let c = file.get_string("getcount");
    assert_ne!(a, c);
    assert_eq!(file.string_count(), 2);
  }

  #[test]
  fn anonymized_header_blanks_names() {
    let config = CompilerConfig { anonymize_output: true, ..CompilerConfig::default() };
    let file = PexFile::new(&config, Path::new("/home/carol/scripts/a.psc"));
    assert_eq!(file.user_name, "");
    assert_eq!(file.computer_name, "");
    assert_eq!(file.source_file_name, "/home/<USERNAME>/scripts/a.psc");
  }
}
