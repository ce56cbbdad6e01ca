//! One text file per article.

use super::Sink;
use crate::error::SinkError;
use crate::models::Article;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, instrument};

/// File name for an article: path separators become `_`, extension `.txt`.
pub fn article_file_name(url: &str) -> String {
    format!("{}.txt", url.replace(['/', '\\'], "_"))
}

pub struct ArticleFileSink {
    output_dir: PathBuf,
}

impl ArticleFileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl Sink for ArticleFileSink {
    fn name(&self) -> &'static str {
        "article-file"
    }

    #[instrument(level = "debug", skip_all, fields(url = %article.url))]
    async fn deliver_article(&self, _site: &str, article: &Article) -> Result<(), SinkError> {
        fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(article_file_name(&article.url));
        fs::write(&path, &article.content).await?;
        debug!(path = %path.display(), "Wrote article file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_file_name() {
        assert_eq!(
            article_file_name("https://x.test/section/a/1"),
            "https:__x.test_section_a_1.txt"
        );
        assert_eq!(article_file_name(r"a\b/c"), "a_b_c.txt");
    }

    #[tokio::test]
    async fn test_writes_content() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = ArticleFileSink::new(tmp.path());
        let mut article = Article::new("https://x.test/a/1");
        article.set_content("Body text".to_string());

        sink.deliver_article("x.test", &article).await.unwrap();
        sink.deliver_article("x.test", &article).await.unwrap();

        let path = tmp.path().join("https:__x.test_a_1.txt");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "Body text");
    }
}
