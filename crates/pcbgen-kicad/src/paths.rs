//! Default locations of KiCad's bundled tools, overridable through the
//! environment.

use std::path::PathBuf;

pub const PYTHON_ENV: &str = "KICAD_PYTHON_INTERPRETER";
pub const SITE_PACKAGES_ENV: &str = "KICAD_PYTHON_SITE_PACKAGES";
pub const SYMBOL_DIR_ENV: &str = "KICAD_SYMBOL_DIR";

fn expand_home(path: String) -> PathBuf {
    match path.strip_prefix("~") {
        Some(rest) => {
            let home = dirs::home_dir().unwrap_or_default();
            home.join(rest.trim_start_matches(['/', '\\']))
        }
        None => PathBuf::from(path),
    }
}

#[cfg(target_os = "macos")]
mod defaults {
    pub(super) const PYTHON: &str =
        "/Applications/KiCad/KiCad.app/Contents/Frameworks/Python.framework/Versions/Current/bin/python3";
    pub(super) const SITE_PACKAGES: &str =
        "/Applications/KiCad/KiCad.app/Contents/Frameworks/Python.framework/Versions/Current/lib/python3.9/site-packages";
}

#[cfg(target_os = "windows")]
mod defaults {
    pub(super) const PYTHON: &str = r"C:\Program Files\KiCad\9.0\bin\python.exe";
    pub(super) const SITE_PACKAGES: &str = r"~\Documents\KiCad\9.0\3rdparty\Python311\site-packages";
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
mod defaults {
    pub(super) const PYTHON: &str = "/usr/bin/python3";
    pub(super) const SITE_PACKAGES: &str = "/usr/lib/python3/dist-packages";
}

pub fn python_interpreter() -> PathBuf {
    expand_home(std::env::var(PYTHON_ENV).unwrap_or_else(|_| defaults::PYTHON.to_string()))
}

pub fn python_site_packages() -> PathBuf {
    expand_home(
        std::env::var(SITE_PACKAGES_ENV).unwrap_or_else(|_| defaults::SITE_PACKAGES.to_string()),
    )
}

fn symbol_dir_candidates() -> Vec<PathBuf> {
    if cfg!(target_os = "macos") {
        vec![
            PathBuf::from("/Applications/KiCad/KiCad.app/Contents/SharedSupport/symbols"),
            PathBuf::from("/Library/Application Support/kicad/symbols"),
            dirs::home_dir()
                .map(|h| h.join("Library/Application Support/kicad/symbols"))
                .unwrap_or_default(),
        ]
    } else if cfg!(target_os = "windows") {
        vec![
            PathBuf::from(r"C:\Program Files\KiCad\9.0\share\kicad\symbols"),
            PathBuf::from(r"C:\Program Files\KiCad\share\kicad\symbols"),
            dirs::config_dir()
                .map(|c| c.join(r"kicad\symbols"))
                .unwrap_or_default(),
        ]
    } else {
        vec![
            PathBuf::from("/usr/share/kicad/symbols"),
            PathBuf::from("/usr/local/share/kicad/symbols"),
            PathBuf::from("/opt/kicad/share/kicad/symbols"),
            dirs::data_dir()
                .map(|d| d.join("kicad/symbols"))
                .unwrap_or_default(),
        ]
    }
}

/// KiCad's symbol library directory: `KICAD_SYMBOL_DIR` first, then the
/// platform install locations. Only existing directories are returned.
pub fn find_symbol_dir() -> Option<PathBuf> {
    let from_env = std::env::var(SYMBOL_DIR_ENV).ok().map(PathBuf::from);
    from_env
        .into_iter()
        .chain(symbol_dir_candidates())
        .find(|p| !p.as_os_str().is_empty() && p.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_symbol_dir_env_override() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var(SYMBOL_DIR_ENV, dir.path());
        let found = find_symbol_dir();
        std::env::remove_var(SYMBOL_DIR_ENV);
        assert_eq!(found.as_deref(), Some(dir.path()));
    }

    #[test]
    #[serial]
    fn test_python_env_override() {
        std::env::set_var(PYTHON_ENV, "/opt/kicad/bin/python3");
        let python = python_interpreter();
        std::env::remove_var(PYTHON_ENV);
        assert_eq!(python, PathBuf::from("/opt/kicad/bin/python3"));
    }

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().unwrap_or_default();
        assert_eq!(expand_home("~/kicad".to_string()), home.join("kicad"));
        assert_eq!(expand_home("/abs".to_string()), PathBuf::from("/abs"));
    }
}
