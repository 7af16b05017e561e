use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::models::{CorpusFile, Feature};
use crate::segmentation::CorpusFormat;

/// `.txt` files directly inside `dir`, sorted by file name
pub fn list_transcripts(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ConfigError::CorpusUnavailable {
            path: dir.to_path_buf(),
        }
        .into());
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read directory: {:?}", dir))? {
        let path = entry
            .with_context(|| format!("Failed to read entry in {:?}", dir))?
            .path();
        let is_txt = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
        if path.is_file() && is_txt {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}

/// Load every transcript in `dir`, keeping only the target speaker's texts.
///
/// Unreadable files and files the format rejects are skipped with a warning.
/// A missing directory, or one with no transcripts, is an error.
pub fn load_corpus(dir: &Path, format: &CorpusFormat) -> Result<Vec<CorpusFile>> {
    let paths = list_transcripts(dir)?;
    if paths.is_empty() {
        return Err(ConfigError::CorpusUnavailable {
            path: dir.to_path_buf(),
        }
        .into());
    }

    let mut corpus = Vec::with_capacity(paths.len());
    for path in paths {
        match load_transcript(&path, format) {
            Ok(file) => {
                debug!("{:?}: {} text(s), {} word(s)", path, file.texts.len(), file.word_count());
                corpus.push(file);
            }
            Err(e) => warn!("Skipping {:?}: {:#}", path, e),
        }
    }

    info!(
        "Loaded {} {} file(s) from {:?}",
        corpus.len(),
        format.label(),
        dir
    );
    Ok(corpus)
}

/// Read one transcript and extract the target speaker's texts
pub fn load_transcript(path: &Path, format: &CorpusFormat) -> Result<CorpusFile> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    let texts = format
        .extract_texts(&content)
        .with_context(|| format!("Failed to segment file: {:?}", path))?;

    Ok(CorpusFile {
        path: path.to_path_buf(),
        texts,
    })
}

/// Load a feature bank saved as a JSON array of feature records
pub fn load_feature_bank(path: &Path) -> Result<Vec<Feature>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    let features: Vec<Feature> =
        serde_json::from_str(&content).context("Failed to parse feature bank JSON")?;

    for (index, feature) in features.iter().enumerate() {
        let missing = feature.missing_fields();
        if !missing.is_empty() {
            anyhow::bail!(
                "Feature {} ('{}') is missing {}",
                index,
                feature.name,
                missing.join(", ")
            );
        }
    }

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::MissingHostPolicy;
    use std::fs;
    use tempfile::TempDir;

    const EPISODE: &str = "\
1 (0m0s):
Welcome to the Huberman Lab podcast, I'm your host.

0 (0m10s):
Happy to be here.
";

    fn strict_format() -> CorpusFormat {
        CorpusFormat::HeaderTagged {
            host_phrase: Some("Welcome to the Huberman Lab podcast".to_string()),
            missing_host: MissingHostPolicy::Fail,
            target_speaker: 0,
        }
    }

    #[test]
    fn test_load_corpus_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), EPISODE).unwrap();
        fs::write(dir.path().join("a.TXT"), EPISODE).unwrap();
        fs::write(dir.path().join("notes.md"), EPISODE).unwrap();
        fs::create_dir(dir.path().join("nested.txt")).unwrap();

        let corpus = load_corpus(dir.path(), &CorpusFormat::default()).unwrap();

        let names: Vec<String> = corpus
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.TXT", "b.txt"]);
        assert_eq!(
            corpus[0].texts,
            vec!["Welcome to the Huberman Lab podcast, I'm your host.".to_string()]
        );
    }

    #[test]
    fn test_load_corpus_skips_rejected_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("good.txt"), EPISODE).unwrap();
        fs::write(dir.path().join("no_host.txt"), "0 (0m0s):\nHello.\n").unwrap();

        let corpus = load_corpus(dir.path(), &strict_format()).unwrap();

        assert_eq!(corpus.len(), 1);
        assert!(corpus[0].path.ends_with("good.txt"));
    }

    #[test]
    fn test_load_corpus_missing_or_empty_dir() {
        let dir = TempDir::new().unwrap();

        let err = load_corpus(dir.path(), &CorpusFormat::Paragraphs).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::CorpusUnavailable { .. })
        ));

        assert!(load_corpus(&dir.path().join("absent"), &CorpusFormat::Paragraphs).is_err());
    }

    #[test]
    fn test_load_feature_bank_validates_fields() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("bank.json");
        fs::write(
            &good,
            r#"[{"name": "Warmth", "description": "d", "description_min_value": "cold", "description_max_value": "warm"}]"#,
        )
        .unwrap();
        let blank = dir.path().join("blank.json");
        fs::write(
            &blank,
            r#"[{"name": "Warmth", "description": " ", "description_min_value": "cold", "description_max_value": "warm"}]"#,
        )
        .unwrap();

        assert_eq!(load_feature_bank(&good).unwrap()[0].name, "Warmth");
        let err = load_feature_bank(&blank).unwrap_err();
        assert!(err.to_string().contains("description"));
    }
}
