pub mod extraction; // Text Extractor: text layer, OCR fallback
pub mod analysis; // Prompt, model client, reply parsing, reconciliation
pub mod history; // History Store + Lookup Responder
