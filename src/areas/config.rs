//! Repository configuration (`.git/config`)
//!
//! Only the pieces the checkout engine needs: which remote names are
//! configured, so `<remote>/<branch>` targets can be recognized.

use anyhow::Context;
use derive_new::new;
use std::io::Write;
use std::path::Path;

const REMOTE_SECTION_REGEX: &str = r#"^\[remote "([^"]+)"\]"#;

#[derive(Debug, new)]
pub struct Config {
    path: Box<Path>,
}

impl Config {
    /// Names of all `[remote "<name>"]` sections, in file order. A
    /// missing config file means no remotes.
    pub fn remote_names(&self) -> anyhow::Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read config file at {:?}", self.path))?;
        let section = regex::Regex::new(REMOTE_SECTION_REGEX)?;

        Ok(content
            .lines()
            .filter_map(|line| section.captures(line.trim()))
            .map(|captures| captures[1].to_string())
            .collect())
    }

    pub fn has_remote(&self, name: &str) -> anyhow::Result<bool> {
        Ok(self.remote_names()?.iter().any(|remote| remote == name))
    }

    /// Append a `[remote "<name>"]` section with its url.
    pub fn add_remote(&self, name: &str, url: &str) -> anyhow::Result<()> {
        let mut config_file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("failed to open config file at {:?}", self.path))?;

        writeln!(config_file, "[remote \"{name}\"]")?;
        writeln!(config_file, "\turl = {url}")?;

        Ok(())
    }
}
