//! Generative-text collaborator seam.
//!
//! Translation, transcription and summarization are provided by an external
//! model behind [`TextService`]; the pipeline only depends on the trait.
//! Calls are expensive and flaky, so callers wrap them in [`with_retry`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::warn;

use pressroom_common::{FetchClient, Result};

use crate::dom;
use crate::extractor::{BodyRegion, Extractor, ScrapedDocument};

/// Base backoff delay; the jitter factor stretches it to roughly 5-12 s.
pub const TEXT_RETRY_DELAY: Duration = Duration::from_secs(5);
/// Additional attempts per text-service call.
pub const TEXT_RETRIES: u32 = 2;

const JITTER_RANGE: std::ops::Range<f64> = 1.0..2.4;

/// Generative operations the pipeline may invoke.
#[async_trait]
pub trait TextService: Send + Sync {
    /// Translate an HTML body into the secondary language, preserving markup.
    async fn translate_html(&self, html: &str) -> Result<String>;

    /// Transcribe podcast audio to text.
    async fn transcribe_audio(&self, audio: &[u8]) -> Result<String>;

    /// Produce an article-style summary from shownotes plus transcript.
    async fn summarize_episode(&self, shownotes: &str, transcript: &str) -> Result<String>;
}

/// Run `op` up to `max_retries` additional times, sleeping a jittered
/// multiple of `base_delay` between attempts. Returns the last error when
/// every attempt fails.
pub async fn with_retry<T, F, Fut>(max_retries: u32, base_delay: Duration, op: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt >= max_retries => return Err(e),
            Err(e) => {
                attempt += 1;
                let factor = rand::thread_rng().gen_range(JITTER_RANGE);
                let delay = base_delay.mul_f64(factor);
                warn!(attempt, error = %e, "text service call failed, backing off");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Translate a body region into the secondary language.
///
/// The title rides along as a leading `<h1>` so the archived secondary file
/// carries its own heading; the heading of the translated markup is then
/// read back as the secondary title.
pub async fn translate_body(
    service: &dyn TextService,
    title: &str,
    body: &BodyRegion,
) -> Result<(BodyRegion, Option<String>)> {
    let source = format!("<h1>{}</h1>\n{}", dom::escape_text(title), body.html);
    let translated = with_retry(TEXT_RETRIES, TEXT_RETRY_DELAY, || {
        service.translate_html(&source)
    })
    .await?;

    let parsed = dom::parse_document(&translated);
    let title_zh = dom::first_heading(&parsed).filter(|t| !t.is_empty());
    let text = dom::select_region(&parsed, "body")
        .map(|r| r.text)
        .unwrap_or_default();
    Ok((
        BodyRegion {
            html: translated,
            text,
        },
        title_zh,
    ))
}

/// Fetch-and-extract with a translated secondary variant, shared by the
/// article extractors that hold an optional [`TextService`]. Translation
/// failure is logged and the primary document kept; the merge ratchet
/// tolerates an absent secondary variant.
pub async fn scrape_translated(
    extractor: &(impl Extractor + ?Sized),
    service: Option<&dyn TextService>,
    client: &FetchClient,
    url: &str,
) -> Result<ScrapedDocument> {
    let page_html = client.get_text(url).await?;
    let meta = extractor.extract_metadata(url, &page_html);
    let body = extractor.extract_body(&page_html);
    let mut doc = ScrapedDocument {
        meta,
        page_html,
        body,
        body_zh: None,
        title_zh: None,
    };

    if let (Some(service), Some(body)) = (service, doc.body.clone()) {
        match translate_body(service, &doc.meta.title, &body).await {
            Ok((body_zh, title_zh)) => {
                doc.body_zh = Some(body_zh);
                doc.title_zh = title_zh;
            }
            Err(e) => {
                warn!(url = %url, error = %e, "translation failed, archiving primary only");
            }
        }
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use pressroom_common::PressroomError;

    use super::*;

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let out = with_retry(3, Duration::ZERO, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(PressroomError::Extraction("flaky".into()))
            } else {
                Ok(42)
            }
        })
        .await
        .unwrap();
        assert_eq!(out, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let out: Result<()> = with_retry(2, Duration::ZERO, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(PressroomError::Extraction("always".into()))
        })
        .await;
        assert!(out.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    struct CannedTranslator;

    #[async_trait]
    impl TextService for CannedTranslator {
        async fn translate_html(&self, html: &str) -> Result<String> {
            assert!(html.starts_with("<h1>"));
            Ok("<h1>思想的形状</h1>\n<p>翻译后的正文。</p>".to_string())
        }
        async fn transcribe_audio(&self, _audio: &[u8]) -> Result<String> {
            Err(PressroomError::Extraction("not a podcast".into()))
        }
        async fn summarize_episode(&self, _shownotes: &str, _transcript: &str) -> Result<String> {
            Err(PressroomError::Extraction("not a podcast".into()))
        }
    }

    #[tokio::test]
    async fn translated_heading_becomes_the_secondary_title() {
        let body = BodyRegion {
            html: "<article><p>The original prose.</p></article>".to_string(),
            text: "The original prose.".to_string(),
        };
        let (zh, title_zh) = translate_body(&CannedTranslator, "The Shape of Thought", &body)
            .await
            .unwrap();
        assert_eq!(title_zh.as_deref(), Some("思想的形状"));
        assert!(zh.html.contains("<h1>思想的形状</h1>"));
        assert!(zh.text.contains("翻译后的正文"));
    }
}
