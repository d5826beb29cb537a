//! Lazy header-dependency scanner.
//!
//! Discovers the transitive include graph of a C source by tokenizing it,
//! resolving each textual `#include` against the configured search path,
//! and recursing into the headers it finds. Results are memoized in the
//! build context so a header referenced from many sources is scanned once
//! per run.
//!
//! This is deliberately not a preprocessor: `#if` expressions are never
//! evaluated, so every textual include counts as a dependency whether or
//! not the compiler would see it. Overapproximating keeps the scanner
//! simple and at worst rebuilds a little too eagerly.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::builder::context::BuildCtx;
use crate::core::config::BuildConfig;
use crate::lexer::Tokenizer;
use crate::util::fs::{read_entire_file, DEFAULT_FILE_LIMIT};

/// Directives whose bodies are skipped as preprocessor expressions (with
/// line-continuation handling) rather than tokenized.
const SKIPPED_DIRECTIVES: &[&[u8]] = &[
    b"define", b"undef", b"if", b"elif", b"ifdef", b"ifndef", b"else", b"endif",
];

/// Return the ordered transitive set of resolved header paths `file`
/// depends on, resolving includes against `config`'s search path.
///
/// `cache_key` is the memo key: callers scanning a source file pass the
/// source path itself; recursive calls use the resolved header path. The
/// returned list is deduplicated but order-preserving: each direct include
/// followed by its transitive dependencies, in discovery order.
pub fn included_dependencies(
    ctx: &mut BuildCtx,
    config: &BuildConfig,
    file: &Path,
    cache_key: &str,
) -> Result<Vec<PathBuf>> {
    if let Some(deps) = ctx.included_deps.get(cache_key) {
        return Ok(deps.clone());
    }

    let buf = read_entire_file(file, DEFAULT_FILE_LIMIT)
        .with_context(|| format!("while scanning includes of {}", file.display()))?;
    let raw_includes = direct_includes(&buf);

    // Tentative empty entry: an include cycle terminates here instead of
    // recursing forever.
    ctx.included_deps.put(cache_key.to_string(), Vec::new());

    let mut resolved: Vec<PathBuf> = Vec::new();
    for name in raw_includes {
        match resolve_include(config, &name)? {
            Some(header) => {
                if !resolved.contains(&header) {
                    resolved.push(header.clone());
                }
                let key = header.to_string_lossy().into_owned();
                for transitive in included_dependencies(ctx, config, &header, &key)? {
                    if !resolved.contains(&transitive) {
                        resolved.push(transitive);
                    }
                }
            }
            None => {
                // Not on the search path (a system header, usually).
                // Memoize under the raw form so we never probe it again.
                if !ctx.included_deps.contains(name.as_str()) {
                    tracing::debug!("unresolved include `{}` in {}", name, file.display());
                    ctx.included_deps.put(name, Vec::new());
                }
            }
        }
    }

    ctx.included_deps.put(cache_key.to_string(), resolved.clone());
    Ok(resolved)
}

/// Extract the raw include names (`add.h`, `sys/io.h`) from a buffer, in
/// textual order.
fn direct_includes(buf: &[u8]) -> Vec<String> {
    let mut tokenizer = Tokenizer::new(buf);
    let mut names = Vec::new();

    while let Some(token) = tokenizer.next() {
        let Some(word) = token.directive_word() else {
            continue;
        };
        if word == b"include" {
            let rest = tokenizer.rest_of_line();
            let name: String = String::from_utf8_lossy(rest)
                .trim_matches(|c: char| c.is_ascii_whitespace() || matches!(c, '"' | '<' | '>'))
                .to_string();
            if !name.is_empty() {
                names.push(name);
            }
        } else if SKIPPED_DIRECTIVES.contains(&word) {
            tokenizer.rest_of_directive();
        }
    }
    names
}

/// Probe the search path for `name`, returning the first directory where
/// it exists as a file. Not-found is `Ok(None)`; any other I/O failure
/// propagates.
fn resolve_include(config: &BuildConfig, name: &str) -> Result<Option<PathBuf>> {
    for dir in config.include_search_dirs() {
        let candidate = Path::new(dir).join(name);
        match std::fs::metadata(&candidate) {
            Ok(meta) if meta.is_file() => return Ok(Some(candidate)),
            Ok(_) => continue,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to probe include: {}", candidate.display()))
            }
        }
    }
    Ok(None)
}
