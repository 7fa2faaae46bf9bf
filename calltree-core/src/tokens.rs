//! Marker tokens shared by the extractor and the example renderers.

pub const CALL_OPEN: &str = "#<call>";
pub const CALL_CLOSE: &str = "</call>";
pub const BEGIN_CODE: &str = "<begin_code>";
pub const END_CODE: &str = "<end_code>";
pub const ARTIFACTS_OPEN: &str = "<artifacts>";
pub const ARTIFACTS_CLOSE: &str = "</artifacts>";
pub const NODE_OPEN: &str = "<node>";
pub const NODE_CLOSE: &str = "</node>";
pub const EMB: &str = "<emb>";
pub const PAD: &str = "<pad>";
pub const MASK: &str = "<mask>";

/// Tokens a downstream tokenizer must register as special tokens.
pub const SPECIAL_TOKENS: &[&str] = &[PAD, MASK, NODE_OPEN, NODE_CLOSE, CALL_OPEN, CALL_CLOSE, EMB];
