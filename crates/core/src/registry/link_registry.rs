//! Registry backed by a `TextStore`.

use std::sync::Arc;

use tracing::{debug, info};

use crate::store::TextStore;

use super::error::RegistryError;
use super::types::{parse_line, Annotation, LinkRecord, ANNOTATION_SEPARATOR};

/// An ordered registry of links persisted as a text document.
///
/// Reads parse the whole document; annotation rewrites the whole document
/// through the store so a crash never leaves a half-written line.
#[derive(Clone)]
pub struct LinkRegistry {
    store: Arc<dyn TextStore>,
}

impl LinkRegistry {
    pub fn new(store: Arc<dyn TextStore>) -> Self {
        Self { store }
    }

    pub fn location(&self) -> String {
        self.store.location()
    }

    /// Loads all records in file order. An absent document is an empty registry.
    pub fn load(&self) -> Result<Vec<LinkRecord>, RegistryError> {
        match self.store.read()? {
            Some(raw) => self.parse(&raw),
            None => Ok(Vec::new()),
        }
    }

    /// Loads all records, failing if the document does not exist.
    pub fn load_required(&self) -> Result<Vec<LinkRecord>, RegistryError> {
        match self.store.read()? {
            Some(raw) => self.parse(&raw),
            None => Err(RegistryError::Missing {
                location: self.location(),
            }),
        }
    }

    /// First record for the given URL, if any.
    pub fn find(&self, url: &str) -> Result<Option<LinkRecord>, RegistryError> {
        let url = url.trim();
        Ok(self.load()?.into_iter().find(|r| r.url == url))
    }

    /// Replaces the document with the given records, one per line.
    pub fn write_records(&self, records: &[LinkRecord]) -> Result<(), RegistryError> {
        let mut out = String::new();
        for record in records {
            out.push_str(&record.to_line());
            out.push('\n');
        }
        self.store.write(&out)?;
        debug!(registry = %self.location(), records = records.len(), "registry written");
        Ok(())
    }

    /// Appends an annotation to every unannotated line whose trimmed content is `url`.
    ///
    /// Comments, blank lines and line endings are preserved. Returns the
    /// number of lines changed; the document is only rewritten when that is
    /// nonzero.
    pub fn annotate(&self, url: &str, annotation: &Annotation) -> Result<usize, RegistryError> {
        let url = url.trim();
        let Some(raw) = self.store.read()? else {
            return Ok(0);
        };

        let mut changed = 0usize;
        let mut out = String::with_capacity(raw.len() + 16);

        for piece in raw.split_inclusive('\n') {
            let (body, terminator) = split_terminator(piece);
            if body.trim() == url {
                out.push_str(url);
                out.push_str(ANNOTATION_SEPARATOR);
                out.push_str(annotation.marker());
                changed += 1;
            } else {
                out.push_str(body);
            }
            out.push_str(terminator);
        }

        if changed > 0 {
            self.store.write(&out)?;
            info!(
                registry = %self.location(),
                url,
                annotation = %annotation,
                lines = changed,
                "registry entry annotated"
            );
        }

        Ok(changed)
    }

    fn parse(&self, raw: &str) -> Result<Vec<LinkRecord>, RegistryError> {
        let mut records = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            match parse_line(line) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(reason) => {
                    return Err(RegistryError::Corruption {
                        location: self.location(),
                        line: idx + 1,
                        reason,
                    })
                }
            }
        }
        Ok(records)
    }
}

/// Splits a line produced by `split_inclusive('\n')` into body and terminator.
fn split_terminator(piece: &str) -> (&str, &str) {
    if let Some(body) = piece.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = piece.strip_suffix('\n') {
        (body, "\n")
    } else {
        (piece, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn registry(contents: &str) -> (LinkRegistry, MemoryStore) {
        let mem = MemoryStore::with_contents("links", contents);
        (LinkRegistry::new(Arc::new(mem.clone())), mem)
    }

    #[test]
    fn test_load_preserves_order_and_duplicates() {
        let (reg, _) = registry("# links\nhttps://a\n\nhttps://b\nhttps://a\n");
        let urls: Vec<_> = reg.load().unwrap().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["https://a", "https://b", "https://a"]);
    }

    #[test]
    fn test_load_absent_is_empty_but_required_fails() {
        let reg = LinkRegistry::new(Arc::new(MemoryStore::new("links")));
        assert!(reg.load().unwrap().is_empty());
        assert!(matches!(
            reg.load_required(),
            Err(RegistryError::Missing { .. })
        ));
    }

    #[test]
    fn test_load_reports_corrupt_line_number() {
        let (reg, _) = registry("https://a\nhttps://b https://c\n");
        match reg.load() {
            Err(RegistryError::Corruption { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corruption, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_annotate_rewrites_every_matching_line() {
        let (reg, mem) = registry("# keep me\nhttps://a\nhttps://b\n  https://a  \n");
        let changed = reg.annotate("https://a", &Annotation::LargeFile).unwrap();
        assert_eq!(changed, 2);
        assert_eq!(
            mem.snapshot().unwrap(),
            "# keep me\nhttps://a - LARGE FILE\nhttps://b\nhttps://a - LARGE FILE\n"
        );

        let records = reg.load().unwrap();
        assert!(!records[0].is_processable());
        assert!(records[1].is_processable());
    }

    #[test]
    fn test_annotate_preserves_crlf_and_missing_final_newline() {
        let (reg, mem) = registry("https://a\r\nhttps://b");
        reg.annotate("https://b", &Annotation::LargeFile).unwrap();
        assert_eq!(mem.snapshot().unwrap(), "https://a\r\nhttps://b - LARGE FILE");
    }

    #[test]
    fn test_annotate_leaves_already_annotated_lines() {
        let (reg, mem) = registry("https://a - SKIPPED\n");
        assert_eq!(reg.annotate("https://a", &Annotation::LargeFile).unwrap(), 0);
        assert_eq!(mem.write_count(), 0);
        assert_eq!(mem.snapshot().unwrap(), "https://a - SKIPPED\n");
    }

    #[test]
    fn test_annotate_missing_document_is_noop() {
        let reg = LinkRegistry::new(Arc::new(MemoryStore::new("links")));
        assert_eq!(reg.annotate("https://a", &Annotation::LargeFile).unwrap(), 0);
    }

    #[test]
    fn test_write_records_round_trip() {
        let (reg, _) = registry("");
        let records = vec![
            LinkRecord::new("https://a"),
            LinkRecord::annotated("https://b", Annotation::LargeFile),
        ];
        reg.write_records(&records).unwrap();
        assert_eq!(reg.load().unwrap(), records);
        assert_eq!(
            reg.find("https://b").unwrap().unwrap().annotation,
            Some(Annotation::LargeFile)
        );
    }
}
