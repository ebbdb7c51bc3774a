/*!

  The namespace tree shared by every file in a compilation.

  Discovery populates the tree concurrently: workers walk/create child
  namespaces and attach each namespace's object map (unqualified type name →
  full file path) to its terminal node. After discovery the tree is
  logically frozen and the compile phase only reads it, so the `children`
  maps are sharded concurrent maps and `objects` is write-once. Nodes are
  never removed.

  Lookup is shadowing: resolution starts at the node for the requesting
  file's namespace and falls outward toward the root, so an inner namespace
  wins over an outer one. A `Type:Member` reference only resolves as a
  struct when `Type` is not itself a child namespace along the way.

*/

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::common::caseless::{CaselessConcurrentMap, CaselessIdentMap, CaselessStr, CaselessString};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedType {
  pub full_name: String,
  pub file_path: String,
  /// Set when the reference named a struct inside the resolved object.
  pub struct_name: Option<String>,
}

pub struct PapyrusNamespace {
  full_name: String, //< `':'`-joined chain from the root; empty for the root.
  name: String,
  children: CaselessConcurrentMap<Arc<PapyrusNamespace>>,
  /// Unqualified object name → full path to the defining file.
  objects: OnceCell<CaselessIdentMap<String>>,
}

impl PapyrusNamespace {
  fn new(name: &str, full_name: String) -> Self {
    PapyrusNamespace {
      full_name,
      name: name.to_owned(),
      children: CaselessConcurrentMap::default(),
      objects: OnceCell::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn full_name(&self) -> &str {
    &self.full_name
  }

  fn qualify(&self, name: &str) -> String {
    if self.full_name.is_empty() {
      name.to_owned()
    } else {
      format!("{}:{}", self.full_name, name)
    }
  }

  fn create_namespace(&self, cur_piece: &str, map: CaselessIdentMap<String>) {
    if cur_piece.is_empty() {
      if self.objects.set(map).is_err() {
        // Discovery pushes each namespace once; keep the first contents.
        tracing::debug!(namespace = %self.full_name, "namespace contents pushed twice");
      }
      return;
    }

    let (cur, rest) = match cur_piece.find(':') {
      Some(split) => (&cur_piece[..split], &cur_piece[split + 1..]),
      None => (cur_piece, ""),
    };

    let child = {
      let entry = self.children.entry(CaselessString::from(cur)).or_insert_with(|| {
        Arc::new(PapyrusNamespace::new(cur, self.qualify(cur)))
      });
      Arc::clone(&*entry)
    };
    child.create_namespace(rest, map);
  }

  /// Resolution within this node only; the outward ancestor walk lives in
  /// `Workspace::try_find_type`.
  fn try_find_type(&self, type_name: &str) -> Option<ResolvedType> {
    let split = match type_name.find(':') {
      None => {
        let path = self.objects.get()?.get(CaselessStr::new(type_name))?;
        return Some(ResolvedType {
          full_name: self.qualify(type_name),
          file_path: path.clone(),
          struct_name: None,
        });
      }
      Some(split) => split,
    };

    // It's a partially qualified type name, or else is referencing a
    // struct.
    let base_name = &type_name[..split];
    let sub_name = &type_name[split + 1..];

    if let Some(child) = self.children.get(CaselessStr::new(base_name)) {
      let child = Arc::clone(&*child);
      return child.try_find_type(sub_name);
    }

    // `sub_name` is still qualified, so it can't be referencing a struct in
    // this namespace.
    if sub_name.contains(':') {
      return None;
    }

    let path = self.objects.get()?.get(CaselessStr::new(base_name))?;
    Some(ResolvedType {
      full_name: self.qualify(base_name),
      file_path: path.clone(),
      struct_name: Some(sub_name.to_owned()),
    })
  }
}

/// The root of the namespace tree. One per compilation; shared by all
/// workers.
pub struct Workspace {
  root: Arc<PapyrusNamespace>,
}

impl Workspace {
  pub fn new() -> Self {
    Workspace { root: Arc::new(PapyrusNamespace::new("", String::new())) }
  }

  /// Registers one namespace's full object map. `namespace_name` is a
  /// possibly empty `':'`-separated chain; missing nodes are created.
  pub fn push_namespace_full_contents(&self, namespace_name: &str, map: CaselessIdentMap<String>) {
    tracing::trace!(namespace = namespace_name, objects = map.len(), "registering namespace");
    self.root.create_namespace(namespace_name, map);
  }

  /// Resolves `type_name` from the namespace `base_namespace`, trying each
  /// enclosing namespace from innermost to the root. Fails outright when
  /// `base_namespace` itself does not exist.
  pub fn try_find_type(&self, base_namespace: &str, type_name: &str) -> Option<ResolvedType> {
    let mut chain: Vec<Arc<PapyrusNamespace>> = Vec::new();
    let mut cur = Arc::clone(&self.root);
    chain.push(Arc::clone(&cur));

    if !base_namespace.is_empty() {
      for piece in base_namespace.split(':') {
        let next = {
          let child = cur.children.get(CaselessStr::new(piece))?;
          Arc::clone(&*child)
        };
        chain.push(Arc::clone(&next));
        cur = next;
      }
    }

    chain.iter().rev().find_map(|ns| ns.try_find_type(type_name))
  }
}

impl Default for Workspace {
  fn default() -> Self {
    Workspace::new()
  }
}
