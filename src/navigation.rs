use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::{
    error::NavigationError,
    models::{RenderNode, Role},
};

/// Deepest nesting accepted by `NavTree::build`. Resolution recurses once per level.
pub const MAX_DEPTH: usize = 8;

/// NavNodeDef
///
/// Raw menu definition as written by hand (or deserialized). Exactly one of
/// `path` or a non-empty `children` is expected; `NavTree::build` enforces it.
#[derive(Debug, Clone, Deserialize)]
pub struct NavNodeDef {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub children: Option<Vec<NavNodeDef>>,
}

impl NavNodeDef {
    pub fn leaf(id: &str, label: &str, icon: &str, path: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            icon: icon.to_string(),
            path: Some(path.to_string()),
            children: None,
        }
    }

    pub fn branch(id: &str, label: &str, icon: &str, children: Vec<NavNodeDef>) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            icon: icon.to_string(),
            path: None,
            children: Some(children),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavKind {
    Leaf { path: String },
    Branch { children: Vec<NavNode> },
}

/// NavNode
///
/// A validated menu entry. Leaf/branch is a tagged variant, so a leaf without a
/// path or a branch with its own path cannot exist past `NavTree::build`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavNode {
    pub id: String,
    pub label: String,
    pub icon: String,
    pub kind: NavKind,
}

impl NavNode {
    pub fn is_branch(&self) -> bool {
        matches!(self.kind, NavKind::Branch { .. })
    }

    /// The href of a leaf. Rendering a branch as a link is a menu defect.
    pub fn link_path(&self) -> Result<&str, NavigationError> {
        match &self.kind {
            NavKind::Leaf { path } => Ok(path.as_str()),
            NavKind::Branch { .. } => Err(NavigationError::BranchAsLink(self.id.clone())),
        }
    }

    pub fn children(&self) -> &[NavNode] {
        match &self.kind {
            NavKind::Leaf { .. } => &[],
            NavKind::Branch { children } => children,
        }
    }

    fn contains_path(&self, current_path: &str) -> bool {
        match &self.kind {
            NavKind::Leaf { path } => path == current_path,
            NavKind::Branch { children } => children.iter().any(|c| c.contains_path(current_path)),
        }
    }
}

/// NavTree
///
/// A validated sidebar menu plus the section that starts expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavTree {
    roots: Vec<NavNode>,
    default_expanded: Option<String>,
}

impl NavTree {
    /// build
    ///
    /// Validates raw definitions: every node is either a leaf with a path or a
    /// branch with children, ids are unique across the whole tree, and nesting
    /// stays within `MAX_DEPTH`. `default_expanded`, when given, must name a branch.
    pub fn build(
        defs: Vec<NavNodeDef>,
        default_expanded: Option<&str>,
    ) -> Result<Self, NavigationError> {
        let mut seen = HashSet::new();
        let roots = defs
            .into_iter()
            .map(|def| build_node(def, 1, &mut seen))
            .collect::<Result<Vec<_>, _>>()?;

        let tree = Self {
            roots,
            default_expanded: default_expanded.map(str::to_string),
        };

        if let Some(id) = default_expanded {
            if !tree.find(id).is_some_and(NavNode::is_branch) {
                return Err(NavigationError::UnknownBranch(id.to_string()));
            }
        }

        Ok(tree)
    }

    pub fn roots(&self) -> &[NavNode] {
        &self.roots
    }

    pub fn default_expanded(&self) -> Option<&str> {
        self.default_expanded.as_deref()
    }

    /// Depth-first lookup by id.
    pub fn find(&self, id: &str) -> Option<&NavNode> {
        fn walk<'a>(nodes: &'a [NavNode], id: &str) -> Option<&'a NavNode> {
            nodes.iter().find_map(|node| {
                if node.id == id {
                    Some(node)
                } else {
                    walk(node.children(), id)
                }
            })
        }
        walk(&self.roots, id)
    }

    /// Every leaf `(path, label)` in depth-first order.
    pub fn leaves(&self) -> Vec<(&str, &str)> {
        fn walk<'a>(nodes: &'a [NavNode], out: &mut Vec<(&'a str, &'a str)>) {
            for node in nodes {
                match &node.kind {
                    NavKind::Leaf { path } => out.push((path.as_str(), node.label.as_str())),
                    NavKind::Branch { children } => walk(children, out),
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.roots, &mut out);
        out
    }

    pub fn leaf_paths(&self) -> Vec<&str> {
        self.leaves().into_iter().map(|(path, _)| path).collect()
    }

    /// Flips a branch open or closed. Returns the new expanded state.
    pub fn toggle(&self, expanded: &mut ExpansionSet, id: &str) -> Result<bool, NavigationError> {
        match self.find(id) {
            Some(node) if node.is_branch() => Ok(expanded.toggle(id)),
            _ => Err(NavigationError::UnknownBranch(id.to_string())),
        }
    }

    pub fn resolve(&self, current_path: &str, expanded: &ExpansionSet) -> Vec<RenderNode> {
        resolve(self, current_path, expanded)
    }
}

fn build_node(
    def: NavNodeDef,
    depth: usize,
    seen: &mut HashSet<String>,
) -> Result<NavNode, NavigationError> {
    if depth > MAX_DEPTH {
        return Err(NavigationError::TooDeep(MAX_DEPTH));
    }
    if !seen.insert(def.id.clone()) {
        return Err(NavigationError::DuplicateId(def.id));
    }

    // An empty children list counts as absent.
    let children = def.children.filter(|c| !c.is_empty());

    let kind = match (def.path, children) {
        (Some(_), Some(_)) => return Err(NavigationError::BranchWithPath(def.id)),
        (None, None) => return Err(NavigationError::LeafWithoutPath(def.id)),
        (Some(path), None) => NavKind::Leaf { path },
        (None, Some(children)) => NavKind::Branch {
            children: children
                .into_iter()
                .map(|child| build_node(child, depth + 1, seen))
                .collect::<Result<Vec<_>, _>>()?,
        },
    };

    Ok(NavNode {
        id: def.id,
        label: def.label,
        icon: def.icon,
        kind,
    })
}

/// ExpansionSet
///
/// Ids of the open sidebar branches. Only `toggle` changes it, and toggling the
/// same id twice leaves it as it was.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionSet(BTreeSet<String>);

impl ExpansionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial state for a tree: just its default section, if any.
    pub fn for_tree(tree: &NavTree) -> Self {
        let mut set = Self::new();
        if let Some(id) = tree.default_expanded() {
            set.0.insert(id.to_string());
        }
        set
    }

    pub fn toggle(&mut self, id: &str) -> bool {
        if self.0.remove(id) {
            false
        } else {
            self.0.insert(id.to_string());
            true
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for ExpansionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// resolve
///
/// Computes the render state of every node for `current_path`. A leaf is active
/// on an exact path match only; a branch is active when any descendant leaf is.
/// Expansion comes from `expanded` alone, never from activeness.
pub fn resolve(tree: &NavTree, current_path: &str, expanded: &ExpansionSet) -> Vec<RenderNode> {
    tree.roots()
        .iter()
        .map(|node| render_node(node, current_path, expanded))
        .collect()
}

fn render_node(node: &NavNode, current_path: &str, expanded: &ExpansionSet) -> RenderNode {
    match &node.kind {
        NavKind::Leaf { path } => RenderNode {
            id: node.id.clone(),
            label: node.label.clone(),
            icon: node.icon.clone(),
            path: Some(path.clone()),
            active: path == current_path,
            expanded: false,
            children: Vec::new(),
        },
        NavKind::Branch { children } => RenderNode {
            id: node.id.clone(),
            label: node.label.clone(),
            icon: node.icon.clone(),
            path: None,
            active: node.contains_path(current_path),
            expanded: expanded.contains(&node.id),
            children: children
                .iter()
                .map(|child| render_node(child, current_path, expanded))
                .collect(),
        },
    }
}

/// Menus
///
/// The sidebar definition of each role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Menus {
    admin: NavTree,
    client: NavTree,
}

/// NavigationState
///
/// The shared handle stored in `AppState`.
pub type NavigationState = Arc<Menus>;

impl Menus {
    pub fn new(admin: NavTree, client: NavTree) -> Self {
        Self { admin, client }
    }

    /// The built-in Medialab menus. Settings (admin) and Account (client) start open.
    pub fn standard() -> Result<Self, NavigationError> {
        let admin = NavTree::build(
            vec![
                NavNodeDef::leaf("dashboard", "Dashboard", "home", "/admin/dashboard"),
                NavNodeDef::leaf("projects", "Projects", "film", "/admin/projects"),
                NavNodeDef::leaf("courses", "Courses", "book", "/admin/courses"),
                NavNodeDef::leaf("podcasts", "Podcasts", "mic", "/admin/podcasts"),
                NavNodeDef::branch(
                    "settings",
                    "Settings",
                    "settings",
                    vec![
                        NavNodeDef::leaf("general", "General", "sliders", "/admin/settings/general"),
                        NavNodeDef::leaf("units", "Units", "layers", "/admin/settings/units"),
                        NavNodeDef::leaf("users", "Users", "users", "/admin/settings/users"),
                        NavNodeDef::leaf("security", "Security", "shield", "/admin/settings/security"),
                    ],
                ),
            ],
            Some("settings"),
        )?;

        let client = NavTree::build(
            vec![
                NavNodeDef::leaf("dashboard", "Dashboard", "home", "/client/dashboard"),
                NavNodeDef::leaf("projects", "My Projects", "film", "/client/projects"),
                NavNodeDef::leaf("courses", "Courses", "book", "/client/courses"),
                NavNodeDef::leaf("podcasts", "Podcasts", "mic", "/client/podcasts"),
                NavNodeDef::branch(
                    "account",
                    "Account",
                    "user",
                    vec![
                        NavNodeDef::leaf("profile", "Profile", "id-card", "/client/settings/profile"),
                        NavNodeDef::leaf("password", "Password", "key", "/client/settings/password"),
                    ],
                ),
            ],
            Some("account"),
        )?;

        Ok(Self { admin, client })
    }

    pub fn for_role(&self, role: Role) -> &NavTree {
        match role {
            Role::Admin => &self.admin,
            Role::Client => &self.client,
        }
    }
}
