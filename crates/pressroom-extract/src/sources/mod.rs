//! Concrete extractors, one module per publication.

pub mod aeon;
pub mod nautilus;
pub mod newyorker;
pub mod wechat;
pub mod xiaoyuzhou;

pub use aeon::AeonExtractor;
pub use nautilus::NautilusExtractor;
pub use newyorker::NewYorkerExtractor;
pub use wechat::WechatExtractor;
pub use xiaoyuzhou::XiaoyuzhouExtractor;
