use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use crate::classpath::{ClassPathRoot, SearchPath};
use crate::cli::Cli;

pub const CLASSPATH_ENV: &str = "CLASSPATH";

pub fn resolve_search_path(cli: &Cli) -> Result<SearchPath> {
    let mut search_path = match base_classpath(cli) {
        Some(list) => SearchPath::parse(&list)
            .with_context(|| format!("Failed to parse class path: {list}"))?,
        None => SearchPath::from_roots([ClassPathRoot::Directory(PathBuf::from("."))]),
    };

    for lib in &cli.libs {
        if !lib.is_dir() {
            anyhow::bail!("Library directory does not exist: {}", lib.display());
        }
        let added = search_path.add_jars_under(lib);
        tracing::debug!(dir = %lib.display(), jars = added, "added library jars");
    }

    if let Some(m2) = resolve_m2_repo(cli)? {
        let added = search_path.add_jars_under(&m2);
        tracing::debug!(repo = %m2.display(), jars = added, "added Maven repository jars");
    }

    if search_path.is_empty() {
        tracing::warn!("search path is empty, nothing will be found");
    }
    tracing::debug!(roots = search_path.len(), "search path resolved");
    Ok(search_path)
}

fn base_classpath(cli: &Cli) -> Option<String> {
    if let Some(cp) = cli.classpath.clone() {
        return Some(cp);
    }
    env::var(CLASSPATH_ENV).ok().filter(|cp| !cp.trim().is_empty())
}

pub fn resolve_m2_repo(cli: &Cli) -> Result<Option<PathBuf>> {
    if let Some(p) = cli.m2_repo.clone() {
        return Ok(Some(p));
    }
    if cli.m2 {
        return default_m2_repository().map(Some);
    }
    Ok(None)
}

pub fn default_m2_repository() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Failed to resolve home directory"))?;
    Ok(home.join(".m2").join("repository"))
}
