use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::command::BackendCommand;
use super::{LanguagePair, TranslationBackend};
use crate::config::ArgosConfig;
use crate::error::{Result, SubtransError};

/// Environment variable Argos reads its package directory from
pub const PACKAGES_DIR_ENV: &str = "ARGOS_PACKAGES_DIR";

/// Name `argospm` uses for the translation package of `pair`
pub fn package_name(pair: &LanguagePair) -> String {
    format!("translate-{}_{}", pair.from_code, pair.to_code)
}

/// Read the pair out of one `argospm list` or `argospm search` line, e.g.
/// `translate-en_fr` or `translate-en_fr: English -> French`.
pub fn parse_package_line(line: &str) -> Option<LanguagePair> {
    let name = line.split_whitespace().next()?.trim_end_matches(':');
    let (from_code, to_code) = name.strip_prefix("translate-")?.split_once('_')?;
    if from_code.is_empty() || to_code.is_empty() {
        return None;
    }
    Some(LanguagePair::new(from_code, to_code))
}

/// Translation packages in an `argospm` listing; other package types are skipped
pub fn parse_package_listing(output: &str) -> Vec<LanguagePair> {
    output.lines().filter_map(parse_package_line).collect()
}

/// Split `argos-translate` output back into one translation per input text.
///
/// Argos translates its input paragraph by paragraph and joins the results with
/// newlines, so a batch goes in newline-joined and every text takes back as many
/// lines as it contributed.
pub fn regroup_paragraphs(texts: &[String], output: &str) -> Result<Vec<String>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    // `print` adds exactly one newline
    let body = output.strip_suffix('\n').unwrap_or(output);
    let paragraphs: Vec<&str> = body.split('\n').collect();
    let expected: usize = texts.iter().map(|t| t.split('\n').count()).sum();

    if paragraphs.len() != expected {
        return Err(SubtransError::TranslationFailure(format!(
            "Argos translation returned {} lines for {} input lines",
            paragraphs.len(),
            expected
        )));
    }

    let mut rest = paragraphs.as_slice();
    let mut translated = Vec::with_capacity(texts.len());
    for text in texts {
        let (own, tail) = rest.split_at(text.split('\n').count());
        translated.push(own.join("\n"));
        rest = tail;
    }

    Ok(translated)
}

/// Argos Translate backend.
///
/// Packages are managed by `argospm`; translation runs through the
/// `argos-translate` CLI. Both see the same `ARGOS_PACKAGES_DIR` when a
/// package directory is configured.
pub struct ArgosBackend {
    config: ArgosConfig,
    installed: OnceCell<Vec<LanguagePair>>,
    index_updated: OnceCell<()>,
}

impl ArgosBackend {
    pub fn new(config: ArgosConfig) -> Result<Self> {
        Ok(Self {
            config,
            installed: OnceCell::new(),
            index_updated: OnceCell::new(),
        })
    }

    fn command(&self, binary: &str, description: &str) -> BackendCommand {
        let cmd = BackendCommand::new(binary, description);
        match &self.config.packages_dir {
            Some(dir) => cmd.env_path(PACKAGES_DIR_ENV, dir),
            None => cmd,
        }
    }

    fn package_command(&self, subcommand: &str) -> BackendCommand {
        self.command(&self.config.package_binary, &format!("argospm {}", subcommand))
            .arg(subcommand)
    }

    async fn query_installed(&self) -> Result<Vec<LanguagePair>> {
        let output = self.package_command("list").execute().await?;
        Ok(parse_package_listing(&output))
    }

    /// Refresh the package index at most once per run
    async fn update_index(&self) -> Result<()> {
        self.index_updated
            .get_or_try_init(|| async {
                self.package_command("update").execute().await?;
                debug!("Argos package index updated");
                Ok::<(), SubtransError>(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TranslationBackend for ArgosBackend {
    fn name(&self) -> &'static str {
        "Argos Translate"
    }

    async fn check_availability(&self) -> Result<()> {
        let installed = self.installed.get_or_try_init(|| self.query_installed()).await?;
        debug!("{} is available, {} packages installed", self.config.package_binary, installed.len());
        Ok(())
    }

    async fn list_installed(&self) -> Result<Vec<LanguagePair>> {
        let installed = self.installed.get_or_try_init(|| self.query_installed()).await?;
        Ok(installed.clone())
    }

    async fn list_available(&self) -> Result<Vec<LanguagePair>> {
        self.update_index().await?;
        let output = self.package_command("search").execute().await?;
        Ok(parse_package_listing(&output))
    }

    async fn install(&self, pair: &LanguagePair) -> Result<()> {
        self.update_index().await?;

        let name = package_name(pair);
        self.package_command("install").arg(name.as_str()).execute().await?;

        // argospm exits 0 for names it does not know
        if !self.query_installed().await?.contains(pair) {
            return Err(SubtransError::TranslationFailure(format!(
                "argospm install {} finished but the package is not installed",
                name
            )));
        }

        info!("Installed Argos package {}", name);
        Ok(())
    }

    async fn translate(&self, pair: &LanguagePair, text: &str) -> Result<String> {
        let mut translated = self.translate_batch(pair, &[text.to_string()]).await?;
        Ok(translated.pop().unwrap_or_default())
    }

    async fn translate_batch(&self, pair: &LanguagePair, texts: &[String]) -> Result<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let output = self
            .command(&self.config.translate_binary, "Argos translation")
            .arg("--from-lang")
            .arg(pair.from_code.as_str())
            .arg("--to-lang")
            .arg(pair.to_code.as_str())
            .stdin(texts.join("\n"))
            .execute()
            .await?;

        regroup_paragraphs(texts, &output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn lines(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    fn backend_in(temp_dir: &TempDir) -> ArgosBackend {
        ArgosBackend::new(ArgosConfig {
            translate_binary: "/nonexistent/argos-translate".to_string(),
            package_binary: "/nonexistent/argospm".to_string(),
            packages_dir: Some(temp_dir.path().join("packages")),
        })
        .unwrap()
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join(name);
        std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script.to_string_lossy().to_string()
    }

    /// argospm stand-in that records every subcommand in `$ARGOS_PACKAGES_DIR/calls`
    #[cfg(unix)]
    fn fake_argospm(temp_dir: &TempDir, install_body: &str) -> String {
        std::fs::create_dir_all(temp_dir.path().join("packages")).unwrap();
        write_script(
            temp_dir.path(),
            "argospm",
            &format!(
                r#"echo "$1" >> "$ARGOS_PACKAGES_DIR/calls"
case "$1" in
  list) cat "$ARGOS_PACKAGES_DIR/installed" 2>/dev/null || true ;;
  update) ;;
  search) echo "translate-en_fr: English -> French"; echo "sbd-en: English sentence boundaries" ;;
  install) {} ;;
esac"#,
                install_body
            ),
        )
    }

    #[test]
    fn test_package_name() {
        assert_eq!(package_name(&LanguagePair::new("EN", "fr")), "translate-en_fr");
    }

    #[test]
    fn test_parse_package_lines() {
        assert_eq!(parse_package_line("translate-en_fr"), Some(LanguagePair::new("en", "fr")));
        assert_eq!(
            parse_package_line("translate-pt_es: Portuguese -> Spanish"),
            Some(LanguagePair::new("pt", "es"))
        );
        assert_eq!(parse_package_line("sbd-en"), None);
        assert_eq!(parse_package_line("translate-en"), None);
        assert_eq!(parse_package_line(""), None);
    }

    #[test]
    fn test_regroup_keeps_multi_line_cues_together() {
        let texts = lines(&["hello", "two\nlines", "world"]);
        let translated = regroup_paragraphs(&texts, "bonjour\ndeux\nlignes\nmonde\n").unwrap();
        assert_eq!(translated, vec!["bonjour", "deux\nlignes", "monde"]);
    }

    #[test]
    fn test_regroup_removes_exactly_one_trailing_newline() {
        let texts = lines(&["ends with a break\n"]);
        let translated = regroup_paragraphs(&texts, "finit par un saut\n\n").unwrap();
        assert_eq!(translated, vec!["finit par un saut\n"]);
    }

    #[test]
    fn test_regroup_rejects_line_count_mismatch() {
        let err = regroup_paragraphs(&lines(&["one", "two"]), "un\n").unwrap_err();
        assert_eq!(err.kind(), "TranslationFailure");
        assert_eq!(err.to_string(), "Argos translation returned 1 lines for 2 input lines");
    }

    #[tokio::test]
    async fn test_missing_argospm_is_backend_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let err = backend_in(&temp_dir).check_availability().await.unwrap_err();
        assert_eq!(err.kind(), "BackendUnavailable");
        assert!(err.to_string().contains("/nonexistent/argospm not available"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_installed_listing_is_queried_once_per_run() {
        let temp_dir = TempDir::new().unwrap();
        let mut backend = backend_in(&temp_dir);
        backend.config.package_binary = fake_argospm(&temp_dir, "true");
        std::fs::write(temp_dir.path().join("packages/installed"), "translate-de_en\nsbd-de\n").unwrap();

        backend.check_availability().await.unwrap();
        let installed = backend.list_installed().await.unwrap();

        assert_eq!(installed, vec![LanguagePair::new("de", "en")]);
        let calls = std::fs::read_to_string(temp_dir.path().join("packages/calls")).unwrap();
        assert_eq!(calls, "list\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_index_is_updated_once_for_search_and_install() {
        let temp_dir = TempDir::new().unwrap();
        let mut backend = backend_in(&temp_dir);
        backend.config.package_binary =
            fake_argospm(&temp_dir, r#"echo "$2" >> "$ARGOS_PACKAGES_DIR/installed""#);

        let available = backend.list_available().await.unwrap();
        assert_eq!(available, vec![LanguagePair::new("en", "fr")]);

        backend.install(&LanguagePair::new("en", "fr")).await.unwrap();

        let calls = std::fs::read_to_string(temp_dir.path().join("packages/calls")).unwrap();
        assert_eq!(calls, "update\nsearch\ninstall\nlist\n");
        let installed = std::fs::read_to_string(temp_dir.path().join("packages/installed")).unwrap();
        assert_eq!(installed, "translate-en_fr\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_install_that_does_not_land_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let mut backend = backend_in(&temp_dir);
        backend.config.package_binary = fake_argospm(&temp_dir, "true");

        let err = backend.install(&LanguagePair::new("en", "fr")).await.unwrap_err();

        assert_eq!(err.kind(), "TranslationFailure");
        assert!(err.to_string().contains("translate-en_fr"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_translate_passes_pair_and_strips_final_newline() {
        let temp_dir = TempDir::new().unwrap();
        let mut backend = backend_in(&temp_dir);
        backend.config.translate_binary =
            write_script(temp_dir.path(), "argos-translate", r#"echo "[$2>$4] $(cat)""#);

        let output = backend.translate(&LanguagePair::new("en", "fr"), "hello").await.unwrap();
        assert_eq!(output, "[en>fr] hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_batch_runs_argos_translate_once() {
        let temp_dir = TempDir::new().unwrap();
        let calls = temp_dir.path().join("translate-calls");
        let mut backend = backend_in(&temp_dir);
        backend.config.translate_binary = write_script(
            temp_dir.path(),
            "argos-translate",
            &format!("echo run >> {:?}\ntr '[:lower:]' '[:upper:]'", calls),
        );

        let translated = backend
            .translate_batch(&LanguagePair::new("en", "fr"), &lines(&["hello", "two\nlines", "world"]))
            .await
            .unwrap();

        assert_eq!(translated, vec!["HELLO", "TWO\nLINES", "WORLD"]);
        assert_eq!(std::fs::read_to_string(&calls).unwrap(), "run\n");
    }
}
