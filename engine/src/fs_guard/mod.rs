use sdk::errors::EngineError;
use sdk::ToolError;
use std::path::{Component, Path, PathBuf};

/// FileSystemGuard keeps capability file access inside the project workspace.
///
/// Paths handed to capabilities come from the model and are resolved
/// relative to the workspace. A path is accepted only if it resolves, after
/// following symlinks, to a location inside the workspace and does not touch
/// a credential file.
///
/// # Resolution
///
/// 1. Check deny list on the raw path
/// 2. Join relative paths onto the workspace
/// 3. Canonicalize the longest existing prefix, then append the rest
///    lexically (targets of `WriteFileTool` may not exist yet)
/// 4. Check deny list again and verify the workspace boundary
#[derive(Debug, Clone)]
pub struct FileSystemGuard {
    workspace: PathBuf,
    deny_list: Vec<PathBuf>,
}

impl FileSystemGuard {
    /// Creates a guard rooted at `workspace`, which must exist.
    pub fn new(workspace: impl AsRef<Path>) -> Result<Self, EngineError> {
        let workspace = workspace.as_ref();
        let workspace = workspace.canonicalize().map_err(|e| {
            EngineError::Config(format!(
                "Workspace {} is not accessible: {}",
                workspace.display(),
                e
            ))
        })?;

        let deny_list = vec![
            PathBuf::from(".ssh"),
            PathBuf::from(".env"),
            PathBuf::from(".aws"),
            PathBuf::from(".gnupg"),
            PathBuf::from("id_rsa"),
            PathBuf::from("id_ed25519"),
            PathBuf::from(".netrc"),
            PathBuf::from(".pypirc"),
        ];

        Ok(Self {
            workspace,
            deny_list,
        })
    }

    /// Resolves a model-supplied path to an absolute path inside the workspace.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::PathOutsideWorkspace` for denied paths and for
    /// paths escaping the workspace.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        let raw = Path::new(path);
        if self.is_denied(raw) {
            return Err(ToolError::PathOutsideWorkspace(format!(
                "{} is not accessible",
                path
            )));
        }

        let joined = if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.workspace.join(raw)
        };
        let resolved = canonicalize_lenient(&joined);

        if self.is_denied(&resolved) {
            return Err(ToolError::PathOutsideWorkspace(format!(
                "{} is not accessible",
                path
            )));
        }
        if !resolved.starts_with(&self.workspace) {
            return Err(ToolError::PathOutsideWorkspace(path.to_string()));
        }

        Ok(resolved)
    }

    /// Returns the canonical workspace root.
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Path relative to the workspace, for results shown to the model
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.workspace)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    fn is_denied(&self, path: &Path) -> bool {
        self.deny_list.iter().any(|denied| {
            path.ends_with(denied)
                || path
                    .components()
                    .any(|c| Path::new(c.as_os_str()) == denied.as_path())
        })
    }
}

/// Canonicalize the longest existing prefix of `path` and append the
/// remaining components with `.` and `..` resolved lexically.
fn canonicalize_lenient(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut rest: Vec<Component<'_>> = Vec::new();
    let components: Vec<Component<'_>> = path.components().collect();
    let mut split = components.len();

    while split > 0 {
        if let Ok(canonical) = existing.canonicalize() {
            let mut out = canonical;
            for component in &rest {
                match component {
                    Component::ParentDir => {
                        out.pop();
                    }
                    Component::CurDir => {}
                    other => out.push(other.as_os_str()),
                }
            }
            return out;
        }
        split -= 1;
        rest.insert(0, components[split]);
        existing.pop();
    }

    lexical_normalize(path)
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}
