use directories::BaseDirs;
use log::debug;
use std::env;
use std::path::{Path, PathBuf};

const FALLBACK_DIRS: [&str; 2] = ["/usr/local/share/applications", "/usr/share/applications"];

/// Directories that hold desktop entries, most specific first.
///
/// The user's data home (`$XDG_DATA_HOME`, else `~/.local/share`) comes first,
/// followed by every entry of `$XDG_DATA_DIRS`. When the latter yields nothing
/// the two conventional system directories are used instead.
pub fn data_dirs() -> Vec<PathBuf> {
    let data_home = BaseDirs::new()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.local/share"));
    let system = env::var("XDG_DATA_DIRS").ok();

    let dirs = resolve(&data_home, system.as_deref());
    debug!("Desktop entry directories: {:?}", dirs);
    dirs
}

/// Builds the directory list from an already known data home and the raw
/// value of `$XDG_DATA_DIRS`.
pub fn resolve(data_home: &Path, xdg_data_dirs: Option<&str>) -> Vec<PathBuf> {
    let mut dirs = vec![data_home.join("applications")];

    for dir in xdg_data_dirs.unwrap_or_default().split(':') {
        let dir = dir.trim();
        if dir.is_empty() {
            continue;
        }
        dirs.push(Path::new(dir).join("applications"));
    }

    if dirs.len() == 1 {
        dirs.extend(FALLBACK_DIRS.iter().map(PathBuf::from));
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_dirs_follow_data_home() {
        let dirs = resolve(Path::new("/home/u/.local/share"), Some("/opt/share: /usr/share ::"));
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/home/u/.local/share/applications"),
                PathBuf::from("/opt/share/applications"),
                PathBuf::from("/usr/share/applications"),
            ]
        );
    }

    #[test]
    fn falls_back_when_system_dirs_are_unset() {
        for system in [None, Some(""), Some(" : ")] {
            let dirs = resolve(Path::new("/data"), system);
            assert_eq!(
                dirs,
                vec![
                    PathBuf::from("/data/applications"),
                    PathBuf::from("/usr/local/share/applications"),
                    PathBuf::from("/usr/share/applications"),
                ]
            );
        }
    }

    #[test]
    fn data_dirs_starts_with_user_applications() {
        let dirs = data_dirs();
        assert!(dirs.len() >= 2);
        assert!(dirs[0].ends_with("applications"));
    }
}
