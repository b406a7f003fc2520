//! Options files: argument lists persisted on disk.
//!
//! `--options PATH` appends the tokens of PATH to the argument stream before
//! any flag is parsed. `--generate-options PATH` writes the current stream
//! out instead and suppresses the run.

use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::registry::{self, Flag};
use std::path::{Path, PathBuf};

pub const DEFAULT_OPTIONS_FILE: &str = "spec/spec.opts";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Load,
    Generate,
}

impl FileAction {
    fn flag(self) -> Flag {
        match self {
            FileAction::Load => Flag::OptionsFile,
            FileAction::Generate => Flag::GenerateOptions,
        }
    }
}

/// Removes every occurrence of the action's flag (and its path) from `argv`.
/// When the flag is given more than once the last path wins.
pub fn take_path(argv: &mut Vec<String>, action: FileAction) -> Result<Option<PathBuf>> {
    let spellings = registry::spellings_of(action.flag());
    let mut path = None;
    let mut i = 0;

    while i < argv.len() {
        let token = argv[i].clone();
        if token == "--" {
            break;
        }

        if spellings.contains(&token.as_str()) {
            if i + 1 >= argv.len() {
                return Err(Error::MissingArgument(token));
            }
            argv.remove(i);
            path = Some(PathBuf::from(argv.remove(i)));
            continue;
        }

        if let Some(attached) = spellings.iter().find_map(|s| long_attached(&token, s)) {
            path = Some(PathBuf::from(attached));
            argv.remove(i);
            continue;
        }

        if let Some(found) = in_short_cluster(&token, spellings) {
            let value = match found.attached {
                Some(value) => value,
                None if i + 1 < argv.len() => argv.remove(i + 1),
                None => return Err(Error::MissingArgument(found.flag)),
            };
            path = Some(PathBuf::from(value));
            match found.kept {
                Some(kept) => {
                    argv[i] = kept;
                    i += 1;
                }
                None => {
                    argv.remove(i);
                }
            }
            continue;
        }

        i += 1;
    }

    Ok(path)
}

/// `--options=PATH`.
fn long_attached<'a>(token: &'a str, spelling: &str) -> Option<&'a str> {
    if !spelling.starts_with("--") {
        return None;
    }
    token
        .strip_prefix(spelling)?
        .strip_prefix('=')
        .filter(|value| !value.is_empty())
}

struct ClusterMatch {
    flag: String,
    /// The cluster with the flag and its value cut off, if anything remains.
    kept: Option<String>,
    attached: Option<String>,
}

/// Finds a short spelling inside a cluster such as `-cOfile` or `-cO`. Only
/// switches may precede it; a value-taking flag swallows the rest.
fn in_short_cluster(token: &str, spellings: &[&str]) -> Option<ClusterMatch> {
    let cluster = token.strip_prefix('-').filter(|c| !c.starts_with('-'))?;

    for (offset, c) in cluster.char_indices() {
        let flag = format!("-{}", c);
        if spellings.contains(&flag.as_str()) {
            let before = &cluster[..offset];
            let after = &cluster[offset + c.len_utf8()..];
            return Some(ClusterMatch {
                flag,
                kept: (!before.is_empty()).then(|| format!("-{}", before)),
                attached: (!after.is_empty()).then(|| after.to_string()),
            });
        }
        match registry::lookup(&flag) {
            Some(spec) if !spec.takes_value() => continue,
            _ => return None,
        }
    }
    None
}

/// Resolves `action` against `argv`, returning the path acted upon.
///
/// For [`FileAction::Load`] without an explicit path, `default_path` is used
/// when it exists and `argv` contains no flag-like token at all.
pub fn resolve(
    argv: &mut Vec<String>,
    action: FileAction,
    fs: &dyn FileSystem,
    default_path: Option<&Path>,
) -> Result<Option<PathBuf>> {
    let mut path = take_path(argv, action)?;
    let explicit = path.is_some();

    if action == FileAction::Load && path.is_none() {
        if let Some(default_path) = default_path {
            let has_flags = argv.iter().any(|arg| arg.starts_with('-'));
            if !has_flags && fs.exists(default_path) {
                path = Some(default_path.to_path_buf());
            }
        }
    }

    let Some(path) = path else {
        return Ok(None);
    };

    match action {
        FileAction::Load => {
            if explicit && !fs.exists(&path) {
                return Err(Error::OptionsFileMissing { path });
            }
            let tokens = read_tokens(&path, fs)?;
            tracing::debug!(path = %path.display(), count = tokens.len(), "loaded options file");
            // Loaded tokens are flags, so they must stay in front of `--`.
            let end = argv.iter().position(|arg| arg == "--").unwrap_or(argv.len());
            argv.splice(end..end, tokens);
        }
        FileAction::Generate => {
            write_tokens(&path, argv, fs)?;
            tracing::debug!(path = %path.display(), "generated options file");
        }
    }

    Ok(Some(path))
}

pub fn read_tokens(path: &Path, fs: &dyn FileSystem) -> Result<Vec<String>> {
    let content = fs
        .read_to_string(path)
        .map_err(|source| Error::ReadOptionsFile {
            path: path.to_path_buf(),
            source,
        })?;

    let mut tokens = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let words = shell_words::split(line).map_err(|e| Error::ParseOptionsFile {
            path: path.to_path_buf(),
            message: format!("line {}: {}", index + 1, e),
        })?;
        tokens.extend(words);
    }
    Ok(tokens)
}

/// One token per line, quoted so that `read_tokens` gives back `argv`.
pub fn write_tokens(path: &Path, argv: &[String], fs: &dyn FileSystem) -> Result<()> {
    let mut content = argv
        .iter()
        .map(|arg| shell_words::quote(arg))
        .collect::<Vec<_>>()
        .join("\n");
    content.push('\n');

    fs.write(path, &content)
        .map_err(|source| Error::WriteOptionsFile {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFileSystem;
    use std::fs;
    use tempfile::TempDir;

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn workspace(opts: Option<&str>) -> (TempDir, OsFileSystem) {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("spec")).unwrap();
        if let Some(content) = opts {
            fs::write(tmp.path().join(DEFAULT_OPTIONS_FILE), content).unwrap();
        }
        let fs = OsFileSystem::new(tmp.path());
        (tmp, fs)
    }

    #[test]
    fn test_explicit_options_file_is_appended() {
        let (_tmp, fs) = workspace(Some("-f progress -c\n"));
        let mut args = argv(&["spec/a_spec.rb", "-O", "spec/spec.opts", "-R"]);

        let path = resolve(&mut args, FileAction::Load, &fs, None).unwrap();

        assert_eq!(path, Some(PathBuf::from("spec/spec.opts")));
        assert_eq!(args, argv(&["spec/a_spec.rb", "-R", "-f", "progress", "-c"]));
    }

    #[test]
    fn test_attached_spellings() {
        let (_tmp, fs) = workspace(Some("-c\n"));
        let mut args = argv(&["--options=spec/spec.opts"]);
        resolve(&mut args, FileAction::Load, &fs, None).unwrap();
        assert_eq!(args, argv(&["-c"]));

        let mut args = argv(&["-Ospec/spec.opts"]);
        resolve(&mut args, FileAction::Load, &fs, None).unwrap();
        assert_eq!(args, argv(&["-c"]));
    }

    #[test]
    fn test_missing_explicit_file_is_fatal() {
        let (_tmp, fs) = workspace(None);
        let mut args = argv(&["-O", "nope.opts"]);
        let err = resolve(&mut args, FileAction::Load, &fs, None).unwrap_err();
        assert!(matches!(err, Error::OptionsFileMissing { .. }));
    }

    #[test]
    fn test_flag_without_path() {
        let (_tmp, fs) = workspace(None);
        let mut args = argv(&["spec/a_spec.rb", "--options"]);
        let err = resolve(&mut args, FileAction::Load, &fs, None).unwrap_err();
        assert_eq!(err.to_string(), "missing argument: --options");
    }

    #[test]
    fn test_default_file_used_without_flags() {
        let (_tmp, fs) = workspace(Some("--reverse\n"));
        let default = Path::new(DEFAULT_OPTIONS_FILE);
        let mut args = argv(&["spec/a_spec.rb"]);

        let path = resolve(&mut args, FileAction::Load, &fs, Some(default)).unwrap();

        assert_eq!(path.as_deref(), Some(default));
        assert_eq!(args, argv(&["spec/a_spec.rb", "--reverse"]));
    }

    #[test]
    fn test_default_file_ignored_when_any_flag_present() {
        let (_tmp, fs) = workspace(Some("--reverse\n"));
        let default = Path::new(DEFAULT_OPTIONS_FILE);
        let mut args = argv(&["spec/a_spec.rb", "-c"]);

        let path = resolve(&mut args, FileAction::Load, &fs, Some(default)).unwrap();

        assert_eq!(path, None);
        assert_eq!(args, argv(&["spec/a_spec.rb", "-c"]));
    }

    #[test]
    fn test_missing_default_file_is_skipped() {
        let (_tmp, fs) = workspace(None);
        let mut args = argv(&["spec/a_spec.rb"]);
        let path = resolve(
            &mut args,
            FileAction::Load,
            &fs,
            Some(Path::new(DEFAULT_OPTIONS_FILE)),
        )
        .unwrap();
        assert_eq!(path, None);
    }

    #[test]
    fn test_generate_writes_remaining_argv() {
        let (tmp, fs) = workspace(None);
        let mut args = argv(&["-e", "adds numbers", "-G", "out.opts", "spec/math_spec.rb"]);

        let path = resolve(&mut args, FileAction::Generate, &fs, None).unwrap();

        assert_eq!(path, Some(PathBuf::from("out.opts")));
        let written = fs::read_to_string(tmp.path().join("out.opts")).unwrap();
        assert_eq!(written, "-e\n'adds numbers'\nspec/math_spec.rb\n");
        assert_eq!(
            read_tokens(Path::new("out.opts"), &fs).unwrap(),
            argv(&["-e", "adds numbers", "spec/math_spec.rb"])
        );
    }

    #[test]
    fn test_generate_never_uses_default_file() {
        let (_tmp, fs) = workspace(Some("spec/a_spec.rb\n"));
        let mut args = argv(&["spec/b_spec.rb"]);
        let path = resolve(
            &mut args,
            FileAction::Generate,
            &fs,
            Some(Path::new(DEFAULT_OPTIONS_FILE)),
        )
        .unwrap();
        assert_eq!(path, None);
    }

    #[test]
    fn test_unterminated_quote_is_reported() {
        let (_tmp, fs) = workspace(Some("-e \"unterminated\n"));
        let err = read_tokens(Path::new(DEFAULT_OPTIONS_FILE), &fs).unwrap_err();
        assert!(matches!(err, Error::ParseOptionsFile { .. }));
    }

    #[test]
    fn test_tokens_after_double_dash_are_left_alone() {
        let (_tmp, fs) = workspace(None);
        let mut args = argv(&["--", "-O", "weird-file"]);
        let path = resolve(&mut args, FileAction::Load, &fs, None).unwrap();
        assert_eq!(path, None);
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_loaded_tokens_go_before_double_dash() {
        let (_tmp, fs) = workspace(Some("-c\n-f progress\n"));
        let mut args = argv(&["-O", "spec/spec.opts", "--", "-weird_spec.rb"]);

        resolve(&mut args, FileAction::Load, &fs, None).unwrap();

        assert_eq!(args, argv(&["-c", "-f", "progress", "--", "-weird_spec.rb"]));
    }

    #[test]
    fn test_path_flag_inside_short_cluster() {
        let (_tmp, fs) = workspace(Some("--reverse\n"));
        let mut args = argv(&["-cO", "spec/spec.opts", "a_spec.rb"]);
        resolve(&mut args, FileAction::Load, &fs, None).unwrap();
        assert_eq!(args, argv(&["-c", "a_spec.rb", "--reverse"]));

        let mut args = argv(&["-RcOspec/spec.opts"]);
        resolve(&mut args, FileAction::Load, &fs, None).unwrap();
        assert_eq!(args, argv(&["-Rc", "--reverse"]));
    }

    #[test]
    fn test_cluster_value_is_not_a_path_flag() {
        // `-fO` is `--format O`, not an options file.
        let mut args = argv(&["-fO", "a_spec.rb"]);
        assert_eq!(take_path(&mut args, FileAction::Load).unwrap(), None);
        assert_eq!(args, argv(&["-fO", "a_spec.rb"]));

        let mut args = argv(&["-cG"]);
        let err = take_path(&mut args, FileAction::Generate).unwrap_err();
        assert_eq!(err.to_string(), "missing argument: -G");
    }
}
