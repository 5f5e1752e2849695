//! Ordered extractor registry: first claim wins.

use std::sync::Arc;

use crate::extractor::Extractor;
use crate::sources::{
    AeonExtractor, NautilusExtractor, NewYorkerExtractor, WechatExtractor, XiaoyuzhouExtractor,
};
use crate::textgen::TextService;

pub struct Registry {
    extractors: Vec<Arc<dyn Extractor>>,
}

impl Registry {
    pub fn new(extractors: Vec<Arc<dyn Extractor>>) -> Self {
        Self { extractors }
    }

    /// The built-in source set, in claim order. The text service, when
    /// given, enables translated variants for the article sources and
    /// transcription for podcasts.
    pub fn with_default_sources(text_service: Option<Arc<dyn TextService>>) -> Self {
        Self::new(vec![
            Arc::new(NewYorkerExtractor::new(text_service.clone())),
            Arc::new(AeonExtractor::new(text_service.clone())),
            Arc::new(NautilusExtractor::new(text_service.clone())),
            Arc::new(WechatExtractor::new()),
            Arc::new(XiaoyuzhouExtractor::new(text_service)),
        ])
    }

    /// First extractor claiming the URL, `None` when the URL is unsupported.
    pub fn resolve(&self, url: &str) -> Option<Arc<dyn Extractor>> {
        self.extractors.iter().find(|x| x.claims(url)).cloned()
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}
