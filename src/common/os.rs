//! Portable facade over the pieces of the host environment that end up in
//! `.pex` headers, plus the debug-output path anonymization.

use std::env;
use std::path::{Component, Path, PathBuf};

pub const USERNAME_PLACEHOLDER: &str = "<USERNAME>";

pub fn get_computer_name() -> String {
  env::var("COMPUTERNAME")
    .or_else(|_| env::var("HOSTNAME"))
    .unwrap_or_default()
}

pub fn get_user_name() -> String {
  env::var("USERNAME")
    .or_else(|_| env::var("USER"))
    .unwrap_or_default()
}

/// Replaces the user segment of an absolute path with `<USERNAME>`.
///
/// Debug info wants full path names, but they must not leak the user name.
/// Paths that contain one start with `C:\Users\<user>`, `/home/<user>`, or
/// `/Users/<user>`; anything else is returned unchanged.
pub fn anonymize_path(path: &Path) -> PathBuf {
  if !path.is_absolute() {
    return path.to_path_buf();
  }

  let components: Vec<Component> = path.components().collect();
  let first_normal = components.iter().position(|c| matches!(c, Component::Normal(_)));

  if let Some(i) = first_normal {
    if let Component::Normal(name) = components[i] {
      let is_user_root = matches!(name.to_str(), Some("Users") | Some("home"));
      if is_user_root && components.len() > i + 1 {
        let mut out = PathBuf::new();
        for c in &components[..=i] {
          out.push(c.as_os_str());
        }
        out.push(USERNAME_PLACEHOLDER);
        for c in &components[i + 2..] {
          out.push(c.as_os_str());
        }
        return out;
      }
    }
  }

  path.to_path_buf()
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn home_paths_are_anonymized() {
    assert_eq!(
      anonymize_path(Path::new("/home/alice/dev/script.psc")),
      PathBuf::from("/home/<USERNAME>/dev/script.psc")
    );
    assert_eq!(
      anonymize_path(Path::new("/Users/bob/project/a.psc")),
      PathBuf::from("/Users/<USERNAME>/project/a.psc")
    );
  }

  #[test]
  fn other_paths_pass_through() {
    assert_eq!(
      anonymize_path(Path::new("/opt/scripts/a.psc")),
      PathBuf::from("/opt/scripts/a.psc")
    );
    assert_eq!(
      anonymize_path(Path::new("relative/home/alice/a.psc")),
      PathBuf::from("relative/home/alice/a.psc")
    );
    // A bare `/home` has no user segment to replace.
    assert_eq!(anonymize_path(Path::new("/home")), PathBuf::from("/home"));
  }
}
