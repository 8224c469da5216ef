//! Text recognition for screen captures
//!
//! The [`OcrEngine`] port turns an image into text for a language spec
//! such as `eng+chi_sim`. [`TesseractOcr`] runs the `tesseract` binary.

use crate::error::{PopAskError, Result};
use crate::storage::{keys, load_json, KeyValueStore};
use async_trait::async_trait;
use regex::Regex;
use std::borrow::Cow;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::process::Command;

/// Language used when none is configured
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

/// Recognized text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcrResult {
    pub text: String,
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize the text in `image`
    ///
    /// # Arguments
    ///
    /// * `image` - Path of the image to read
    /// * `language_spec` - Language codes joined by `+`
    async fn recognize(&self, image: &str, language_spec: &str) -> Result<OcrResult>;
}

/// OCR through the `tesseract` command line tool
pub struct TesseractOcr {
    binary: String,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &str, language_spec: &str) -> Result<OcrResult> {
        tracing::debug!("Running {} on {} ({})", self.binary, image, language_spec);

        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(language_spec)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PopAskError::Ocr(format!("Failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PopAskError::Ocr(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            ))
            .into());
        }

        Ok(OcrResult {
            text: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

/// Join configured languages with `+`, defaulting to English
pub fn language_spec(languages: &[String]) -> String {
    let languages: Vec<&str> = languages
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    if languages.is_empty() {
        DEFAULT_OCR_LANGUAGE.to_string()
    } else {
        languages.join("+")
    }
}

/// OCR languages saved in settings
pub fn stored_languages(store: &dyn KeyValueStore) -> Vec<String> {
    load_json(store, keys::OCR_LANG).unwrap_or_default()
}

/// Whitespace run between two CJK ideographs, kana or hangul syllables
const CJK_GAP_PATTERN: &str = r"([\x{4e00}-\x{9fa5}\x{3040}-\x{30ff}\x{ac00}-\x{d7af}])\s+([\x{4e00}-\x{9fa5}\x{3040}-\x{30ff}\x{ac00}-\x{d7af}])";

fn cjk_gap() -> Option<&'static Regex> {
    static CJK_GAP: OnceLock<Option<Regex>> = OnceLock::new();
    CJK_GAP
        .get_or_init(|| match Regex::new(CJK_GAP_PATTERN) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::error!("Invalid CJK whitespace pattern: {}", e);
                None
            }
        })
        .as_ref()
}

/// Remove whitespace runs sitting between two CJK, kana or hangul characters
///
/// OCR output puts spaces between ideographs; whitespace next to any other
/// character is kept.
///
/// # Examples
///
/// ```
/// use popask::selection::ocr::collapse_cjk_whitespace;
///
/// assert_eq!(collapse_cjk_whitespace("你 好 world"), "你好 world");
/// ```
pub fn collapse_cjk_whitespace(text: &str) -> String {
    let Some(gap) = cjk_gap() else {
        return text.to_string();
    };

    // A match consumes both neighbours, so "你 好 吗" needs a second pass
    let mut collapsed = text.to_string();
    loop {
        match gap.replace_all(&collapsed, "$1$2") {
            Cow::Borrowed(_) => return collapsed,
            Cow::Owned(next) => collapsed = next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{save_json, MemoryStore};

    #[test]
    fn test_language_spec() {
        assert_eq!(language_spec(&[]), "eng");
        assert_eq!(language_spec(&["chi_sim".to_string()]), "chi_sim");
        assert_eq!(
            language_spec(&["eng".to_string(), " ".to_string(), "jpn".to_string()]),
            "eng+jpn"
        );
    }

    #[test]
    fn test_stored_languages() {
        let store = MemoryStore::new();
        assert!(stored_languages(&store).is_empty());
        save_json(&store, keys::OCR_LANG, &["eng", "chi_sim"]);
        assert_eq!(language_spec(&stored_languages(&store)), "eng+chi_sim");
    }

    #[test]
    fn test_collapse_between_cjk() {
        assert_eq!(collapse_cjk_whitespace("这 是  测\t试"), "这是测试");
        assert_eq!(collapse_cjk_whitespace("こ ん に ち は"), "こんにちは");
        assert_eq!(collapse_cjk_whitespace("안 녕"), "안녕");
        assert_eq!(collapse_cjk_whitespace("カ タ"), "カタ");
    }

    #[test]
    fn test_collapse_runs_of_single_characters() {
        assert_eq!(collapse_cjk_whitespace("你 好 吗"), "你好吗");
        assert_eq!(collapse_cjk_whitespace("我 是\n学 生 world"), "我是学生 world");
    }

    #[test]
    fn test_keeps_other_whitespace() {
        assert_eq!(collapse_cjk_whitespace("hello world"), "hello world");
        assert_eq!(collapse_cjk_whitespace("中 a 文"), "中 a 文");
        assert_eq!(collapse_cjk_whitespace("  中文  "), "  中文  ");
        assert_eq!(collapse_cjk_whitespace(""), "");
    }

    #[tokio::test]
    async fn test_missing_binary_is_ocr_error() {
        let engine = TesseractOcr::new("/nonexistent/tesseract-binary");
        let err = engine.recognize("shot.png", "eng").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PopAskError>(),
            Some(PopAskError::Ocr(_))
        ));
    }
}
